//! Probe resolution for the primary container.
//!
//! Each slot (readiness, liveness, startup) is resolved independently: a
//! missing probe or the empty sentinel (a probe with no fields set) yields the
//! platform default for that slot, anything else is installed verbatim.

use k8s_openapi::{
    api::core::v1::{HTTPGetAction, Probe},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::crd::AppComponent;

/// The fully resolved probe set for a component. Only produced when the
/// descriptor opts into probes at all.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedProbes {
    pub readiness: Probe,
    pub liveness: Probe,
    pub startup: Probe,
}

/// Resolves the three probe slots, or returns `None` when the descriptor has
/// no probes sub-spec (in which case the container carries no probes).
pub fn resolved_probes(component: &AppComponent) -> Option<ResolvedProbes> {
    let probes = component.spec.probes.as_ref()?;

    Some(ResolvedProbes {
        readiness: resolve_slot(
            &probes.readiness,
            default_probe(component, "/health/ready", Some(10), 10),
        ),
        liveness: resolve_slot(
            &probes.liveness,
            default_probe(component, "/health/live", Some(60), 3),
        ),
        startup: resolve_slot(
            &probes.startup,
            default_probe(component, "/health/started", None, 20),
        ),
    })
}

/// Serverless platforms manage the probe port themselves and reject explicit
/// values; this zeroes the HTTP/TCP port fields while keeping the handler type
/// and path intact.
pub fn clear_probe_ports(probe: &mut Probe) {
    if let Some(http_get) = &mut probe.http_get {
        http_get.port = IntOrString::Int(0);
    }
    if let Some(tcp_socket) = &mut probe.tcp_socket {
        tcp_socket.port = IntOrString::Int(0);
    }
}

fn resolve_slot(supplied: &Option<Probe>, default: Probe) -> Probe {
    match supplied {
        Some(probe) if *probe != Probe::default() => probe.clone(),
        _ => default,
    }
}

fn default_probe(
    component: &AppComponent,
    path: &str,
    initial_delay_seconds: Option<i32>,
    failure_threshold: i32,
) -> Probe {
    let port = component
        .spec
        .service
        .as_ref()
        .map(|service| service.port)
        .unwrap_or_default();
    let scheme = if component.manages_tls() { "HTTPS" } else { "HTTP" };

    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_owned()),
            port: IntOrString::Int(port),
            scheme: Some(scheme.to_owned()),
            ..HTTPGetAction::default()
        }),
        initial_delay_seconds,
        period_seconds: Some(10),
        timeout_seconds: Some(2),
        failure_threshold: Some(failure_threshold),
        ..Probe::default()
    }
}

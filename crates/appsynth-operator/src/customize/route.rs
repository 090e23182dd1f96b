//! Route synthesis and its four-state TLS termination machine.
//!
//! The termination is modelled as a sum type with an explicit reset-then-apply
//! transition: every invocation rebuilds the TLS block for the current state,
//! so no certificate material carries over when the state changes.

use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::ResourceExt;

use crate::{
    crd::{
        AppComponent, TlsTermination,
        route::{Route, RoutePort, RouteTargetReference, TlsConfig},
    },
    kvp,
};

/// Certificate material extracted from the referenced Secret.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TlsMaterial {
    pub key: Option<String>,
    pub certificate: Option<String>,
    pub ca_certificate: Option<String>,
    pub destination_ca_certificate: Option<String>,
}

impl TlsMaterial {
    /// Reads the material from the Secret's data keys. Missing keys stay
    /// `None`, a missing Secret is represented by [`TlsMaterial::default`].
    pub fn from_secret(secret: &Secret) -> Self {
        let read = |key: &str| {
            secret
                .data
                .as_ref()
                .and_then(|data| data.get(key))
                .map(|ByteString(bytes)| String::from_utf8_lossy(bytes).into_owned())
        };

        Self {
            key: read("key"),
            certificate: read("crt"),
            ca_certificate: read("ca"),
            destination_ca_certificate: read("destCA"),
        }
    }
}

/// The resolved termination state for one reconcile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TerminationState {
    /// No termination configured; the platform default (reencrypt without
    /// certificate material) applies.
    Unset,
    Edge(TlsMaterial),
    Reencrypt(TlsMaterial),
    Passthrough,
}

impl TerminationState {
    pub fn resolve(component: &AppComponent, material: TlsMaterial) -> Self {
        match component
            .spec
            .route
            .as_ref()
            .and_then(|route| route.termination)
        {
            None => Self::Unset,
            Some(TlsTermination::Edge) => Self::Edge(material),
            Some(TlsTermination::Reencrypt) => Self::Reencrypt(material),
            Some(TlsTermination::Passthrough) => Self::Passthrough,
        }
    }

    fn termination(&self) -> TlsTermination {
        match self {
            Self::Unset | Self::Reencrypt(_) => TlsTermination::Reencrypt,
            Self::Edge(_) => TlsTermination::Edge,
            Self::Passthrough => TlsTermination::Passthrough,
        }
    }

    /// Builds the full TLS block for this state. The insecure edge policy only
    /// applies to edge and reencrypt.
    fn tls_config(&self, insecure_edge_termination_policy: Option<String>) -> TlsConfig {
        let base = TlsConfig {
            termination: self.termination().to_string(),
            ..TlsConfig::default()
        };

        match self {
            Self::Unset | Self::Passthrough => base,
            Self::Edge(material) => TlsConfig {
                key: material.key.clone(),
                certificate: material.certificate.clone(),
                ca_certificate: material.ca_certificate.clone(),
                insecure_edge_termination_policy,
                ..base
            },
            Self::Reencrypt(material) => TlsConfig {
                key: material.key.clone(),
                certificate: material.certificate.clone(),
                ca_certificate: material.ca_certificate.clone(),
                destination_ca_certificate: material.destination_ca_certificate.clone(),
                insecure_edge_termination_policy,
                ..base
            },
        }
    }
}

pub fn customize_route(route: &mut Route, component: &AppComponent, material: TlsMaterial) {
    kvp::apply_metadata(&mut route.metadata, component);

    let config = component.spec.route.clone().unwrap_or_default();
    kvp::merge_into(
        &mut route.metadata.annotations,
        &config.annotations.clone().unwrap_or_default(),
    );

    if let Some(host) = &config.host {
        route.spec.host = Some(host.clone());
    }
    if let Some(path) = &config.path {
        route.spec.path = Some(path.clone());
    }

    route.spec.to = Some(RouteTargetReference {
        kind: Some("Service".to_owned()),
        name: Some(component.name_any()),
        weight: Some(100),
    });

    // Numeric target ports are invalid for passthrough, so the port is always
    // addressed by name.
    route.spec.port = component.spec.service.as_ref().map(|service| RoutePort {
        target_port: Some(
            k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::String(
                service.resolved_port_name(),
            ),
        ),
    });

    let state = TerminationState::resolve(component, material);
    route.spec.tls = Some(state.tls_config(config.insecure_edge_termination_policy));
}

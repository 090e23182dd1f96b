//! Service synthesis. The port list is pure recomputation: primary plus
//! additional ports are rebuilt from the descriptor on every call and replace
//! the existing list atomically, so stale entries never survive a reconcile.

use k8s_openapi::{
    api::core::v1::{Service, ServicePort},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::{crd::AppComponent, kvp};

pub fn customize_service(service: &mut Service, component: &AppComponent) {
    kvp::apply_metadata(&mut service.metadata, component);

    let Some(config) = &component.spec.service else {
        return;
    };

    let spec = service.spec.get_or_insert_with(Default::default);
    spec.selector = Some(kvp::instance_selector(component));
    // The type follows the same rebuild rule as the port list: dropping it
    // from the descriptor drops it from the Service.
    spec.type_ = config.type_.clone();

    let mut ports = vec![ServicePort {
        name: Some(config.resolved_port_name()),
        port: config.port,
        target_port: Some(IntOrString::Int(config.resolved_target_port())),
        node_port: config.node_port,
        ..ServicePort::default()
    }];
    for additional in config.ports.iter().flatten() {
        let mut port = additional.clone();
        if port.name.as_deref().unwrap_or_default().is_empty() {
            port.name = Some(format!("{port}-tcp", port = port.port));
        }
        ports.push(port);
    }
    spec.ports = Some(ports);
}

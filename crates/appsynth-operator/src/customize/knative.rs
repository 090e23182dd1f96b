//! Knative Service synthesis: the serverless rendering of the component.
//!
//! Reuses the container composition of the workload assembler, then strips
//! the probe ports (the serverless platform manages the port itself and
//! rejects explicit values).

use k8s_openapi::api::core::v1::Container;
use kube::{ResourceExt, api::ObjectMeta};

use crate::{
    crd::{
        APP_CONTAINER_NAME, AppComponent,
        serving::Service as KnativeService,
    },
    customize::{probe::clear_probe_ports, workload::customize_container},
    kvp,
};

pub const VISIBILITY_LABEL: &str = "serving.knative.dev/visibility";
pub const CLUSTER_LOCAL_VISIBILITY: &str = "cluster-local";

pub fn customize_knative_service(service: &mut KnativeService, component: &AppComponent) {
    // Labels are rebuilt each call, so dropping the visibility label when the
    // component becomes exposed happens automatically.
    let mut labels = kvp::component_labels(component);
    if !component.is_exposed() {
        labels.insert(
            VISIBILITY_LABEL.to_owned(),
            CLUSTER_LOCAL_VISIBILITY.to_owned(),
        );
    }
    service.metadata.labels = Some(labels);
    kvp::merge_into(&mut service.metadata.annotations, component.annotations());

    let template = &mut service.spec.template;
    template
        .metadata
        .get_or_insert_with(ObjectMeta::default)
        .labels = Some(kvp::component_labels(component));

    let revision = &mut template.spec;
    revision.service_account_name = Some(component.effective_service_account_name());
    revision.volumes = component.spec.volumes.clone();

    if revision.containers.is_empty() {
        revision.containers.push(Container {
            name: APP_CONTAINER_NAME.to_owned(),
            ..Container::default()
        });
    }
    let container = &mut revision.containers[0];
    customize_container(container, component);

    for probe in [
        container.readiness_probe.as_mut(),
        container.liveness_probe.as_mut(),
        container.startup_probe.as_mut(),
    ]
    .into_iter()
    .flatten()
    {
        clear_probe_ports(probe);
    }
}

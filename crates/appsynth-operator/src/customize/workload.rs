//! Workload synthesis: Deployment, StatefulSet and the shared pod template.

use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentStrategy, StatefulSet, StatefulSetUpdateStrategy},
        core::v1::{
            Capabilities, Container, ContainerPort, PersistentVolumeClaim,
            PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, SecurityContext, VolumeMount,
            VolumeResourceRequirements,
        },
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::LabelSelector},
};
use kube::{ResourceExt, api::ObjectMeta};

use crate::{
    crd::{APP_CONTAINER_NAME, AppComponent},
    customize::{affinity::compose_affinity, probe::resolved_probes},
    kvp,
};

const ROLLING_UPDATE_STRATEGY: &str = "RollingUpdate";

/// Name of the claim synthesized when no full claim template is supplied.
const DEFAULT_CLAIM_NAME: &str = "pvc";

pub fn customize_deployment(deployment: &mut Deployment, component: &AppComponent) {
    kvp::apply_metadata(&mut deployment.metadata, component);

    let spec = deployment.spec.get_or_insert_with(Default::default);
    spec.replicas = component.spec.replicas;
    spec.selector = LabelSelector {
        match_labels: Some(kvp::instance_selector(component)),
        ..LabelSelector::default()
    };
    spec.strategy = Some(
        component
            .spec
            .deployment
            .as_ref()
            .and_then(|deployment| deployment.update_strategy.clone())
            .unwrap_or_else(|| DeploymentStrategy {
                type_: Some(ROLLING_UPDATE_STRATEGY.to_owned()),
                ..DeploymentStrategy::default()
            }),
    );

    customize_pod_template(&mut spec.template, component);
}

pub fn customize_stateful_set(stateful_set: &mut StatefulSet, component: &AppComponent) {
    kvp::apply_metadata(&mut stateful_set.metadata, component);

    let spec = stateful_set.spec.get_or_insert_with(Default::default);
    spec.replicas = component.spec.replicas;
    spec.selector = LabelSelector {
        match_labels: Some(kvp::instance_selector(component)),
        ..LabelSelector::default()
    };
    spec.service_name = Some(component.name_any());
    spec.update_strategy = Some(
        component
            .spec
            .stateful_set
            .as_ref()
            .and_then(|stateful_set| stateful_set.update_strategy.clone())
            .unwrap_or_else(|| StatefulSetUpdateStrategy {
                type_: Some(ROLLING_UPDATE_STRATEGY.to_owned()),
                ..StatefulSetUpdateStrategy::default()
            }),
    );

    customize_pod_template(&mut spec.template, component);
    customize_persistence(stateful_set, component);
}

/// Applies the pod-level annotation precedence: StatefulSet annotations win
/// over Deployment annotations when both sub-specs exist, and the maps are
/// never combined. The winner is merged over the component annotations.
fn pod_annotations(component: &AppComponent) -> BTreeMap<String, String> {
    let selected = if let Some(stateful_set) = &component.spec.stateful_set {
        stateful_set.annotations.clone()
    } else if let Some(deployment) = &component.spec.deployment {
        deployment.annotations.clone()
    } else {
        None
    };

    let mut annotations = component.annotations().clone();
    annotations.extend(selected.unwrap_or_default());
    annotations
}

fn customize_pod_template(template: &mut PodTemplateSpec, component: &AppComponent) {
    let metadata = template.metadata.get_or_insert_with(ObjectMeta::default);
    metadata.labels = Some(kvp::component_labels(component));
    metadata.annotations = Some(pod_annotations(component));

    customize_pod_spec(template.spec.get_or_insert_with(PodSpec::default), component);
}

/// Synthesizes the pod spec shared by Deployment and StatefulSet: the single
/// primary container, service account, volumes and affinity.
pub fn customize_pod_spec(pod_spec: &mut PodSpec, component: &AppComponent) {
    pod_spec.service_account_name = Some(component.effective_service_account_name());
    pod_spec.volumes = component.spec.volumes.clone();
    pod_spec.affinity = compose_affinity(component);

    customize_container(primary_container(&mut pod_spec.containers), component);
}

/// Populates the primary container from the descriptor. Shared with the
/// serverless variant, which post-processes the probes afterwards.
pub(crate) fn customize_container(container: &mut Container, component: &AppComponent) {
    container.image = Some(component.spec.application_image.clone());
    container.image_pull_policy = component.spec.pull_policy.clone();
    container.env = component.spec.env.clone();
    container.env_from = component.spec.env_from.clone();
    container.resources = component.spec.resources.clone();
    container.volume_mounts = component.spec.volume_mounts.clone();
    container.security_context = Some(
        component
            .spec
            .security_context
            .clone()
            .unwrap_or_else(default_security_context),
    );

    container.ports = component.spec.service.as_ref().map(|service| {
        vec![ContainerPort {
            container_port: service.resolved_target_port(),
            ..ContainerPort::default()
        }]
    });

    if let Some(probes) = resolved_probes(component) {
        container.readiness_probe = Some(probes.readiness);
        container.liveness_probe = Some(probes.liveness);
        container.startup_probe = Some(probes.startup);
    }
}

/// The secure baseline applied when the descriptor supplies no security
/// context of its own. A supplied context replaces this entirely, there is no
/// field-level merge.
pub fn default_security_context() -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_owned()]),
            ..Capabilities::default()
        }),
        privileged: Some(false),
        read_only_root_filesystem: Some(true),
        run_as_non_root: Some(true),
        ..SecurityContext::default()
    }
}

/// Reconciles the StatefulSet's claim template and the matching volume mount.
/// Without a `storage` sub-spec existing templates and mounts stay untouched.
pub fn customize_persistence(stateful_set: &mut StatefulSet, component: &AppComponent) {
    let Some(storage) = component
        .spec
        .stateful_set
        .as_ref()
        .and_then(|stateful_set| stateful_set.storage.as_ref())
    else {
        return;
    };

    let template = storage.volume_claim_template.clone().unwrap_or_else(|| {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(DEFAULT_CLAIM_NAME.to_owned()),
                ..ObjectMeta::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_owned()]),
                resources: storage.size.as_ref().map(|size| VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_owned(),
                        Quantity(size.clone()),
                    )])),
                    ..VolumeResourceRequirements::default()
                }),
                ..PersistentVolumeClaimSpec::default()
            }),
            ..PersistentVolumeClaim::default()
        }
    });
    let claim_name = template
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_CLAIM_NAME.to_owned());

    let spec = stateful_set.spec.get_or_insert_with(Default::default);
    let templates = spec.volume_claim_templates.get_or_insert_with(Vec::new);
    match templates.first_mut() {
        Some(slot) => *slot = template,
        None => templates.push(template),
    }

    let container = primary_container(
        &mut spec.template.spec.get_or_insert_with(PodSpec::default).containers,
    );
    let mount_path = storage.mount_path.clone().unwrap_or_default();
    let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
    match mounts.iter_mut().find(|mount| mount.name == claim_name) {
        Some(mount) => mount.mount_path = mount_path,
        None => mounts.push(VolumeMount {
            name: claim_name,
            mount_path,
            ..VolumeMount::default()
        }),
    }
}

/// Returns the primary container, creating it when the pod has none yet.
fn primary_container(containers: &mut Vec<Container>) -> &mut Container {
    let index = match containers
        .iter()
        .position(|container| container.name == APP_CONTAINER_NAME)
    {
        Some(index) => index,
        None => {
            containers.push(Container {
                name: APP_CONTAINER_NAME.to_owned(),
                ..Container::default()
            });
            containers.len() - 1
        }
    };
    &mut containers[index]
}

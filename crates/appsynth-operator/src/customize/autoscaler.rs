//! HorizontalPodAutoscaler synthesis. The scale target kind follows the
//! workload shape: StatefulSet when persistence is configured, Deployment
//! otherwise.

use k8s_openapi::api::autoscaling::v1::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
};
use kube::ResourceExt;

use crate::{crd::AppComponent, kvp};

const WORKLOAD_API_VERSION: &str = "apps/v1";

pub fn customize_hpa(hpa: &mut HorizontalPodAutoscaler, component: &AppComponent) {
    kvp::apply_metadata(&mut hpa.metadata, component);

    let Some(config) = &component.spec.autoscaling else {
        return;
    };

    let kind = if component.has_persistence() {
        "StatefulSet"
    } else {
        "Deployment"
    };

    hpa.spec = Some(HorizontalPodAutoscalerSpec {
        max_replicas: config.max_replicas,
        min_replicas: config.min_replicas,
        target_cpu_utilization_percentage: config.target_cpu_utilization_percentage,
        scale_target_ref: CrossVersionObjectReference {
            api_version: Some(WORKLOAD_API_VERSION.to_owned()),
            kind: kind.to_owned(),
            name: component.name_any(),
        },
    });
}

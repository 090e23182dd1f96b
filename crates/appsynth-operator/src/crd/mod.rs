//! The `AppComponent` custom resource and its sub-specs.
//!
//! An `AppComponent` is a unified, higher-level application descriptor from
//! which the synthesizers in [`crate::customize`] derive the platform-native
//! workload resources (Deployment/StatefulSet, Service, Route/Ingress,
//! NetworkPolicy, HorizontalPodAutoscaler, ServiceAccount, ServiceMonitor and
//! a Knative Service variant).

use std::collections::BTreeMap;

use k8s_openapi::api::{
    apps::v1::{DeploymentStrategy, StatefulSetUpdateStrategy},
    core::v1::{
        EnvFromSource, EnvVar, NodeAffinity, PersistentVolumeClaim, PodAffinity, PodAntiAffinity,
        Probe, ResourceRequirements, SecurityContext, Volume, VolumeMount,
    },
};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::status::StatusCondition;

pub mod monitoring;
pub mod route;
pub mod serving;

/// Name of the single primary container in every synthesized pod template.
pub const APP_CONTAINER_NAME: &str = "app";

#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "apps.appsynth.dev",
    version = "v1beta1",
    kind = "AppComponent",
    namespaced,
    status = "AppComponentStatus",
    shortname = "appc"
)]
#[serde(rename_all = "camelCase")]
pub struct AppComponentSpec {
    /// The container image the primary container runs.
    pub application_image: String,

    /// Groups multiple components into one logical application. Falls back to
    /// the component's own name when unset.
    pub application_name: Option<String>,

    pub application_version: Option<String>,

    pub replicas: Option<i32>,

    /// Expose the component outside of the cluster (Route/Ingress, cluster-wide
    /// NetworkPolicy peers, public Knative visibility).
    pub expose: Option<bool>,

    /// Deploy as a Knative Service instead of a Deployment/StatefulSet.
    pub create_knative_service: Option<bool>,

    /// Whether the component terminates TLS on its service port. Defaults to
    /// true; drives the scheme of the synthesized default probes.
    pub manage_tls: Option<bool>,

    pub service_account_name: Option<String>,
    pub pull_secret: Option<String>,
    pub pull_policy: Option<String>,

    /// Replaces the secure default security context entirely when set, no
    /// field-level merge.
    pub security_context: Option<SecurityContext>,

    pub resources: Option<ResourceRequirements>,
    pub env: Option<Vec<EnvVar>>,
    pub env_from: Option<Vec<EnvFromSource>>,
    pub volumes: Option<Vec<Volume>>,
    pub volume_mounts: Option<Vec<VolumeMount>>,

    pub service: Option<ServiceConfig>,
    pub route: Option<RouteConfig>,
    pub network_policy: Option<NetworkPolicyConfig>,
    pub affinity: Option<AffinityConfig>,
    pub probes: Option<ProbesConfig>,
    pub autoscaling: Option<AutoscalingConfig>,
    pub monitoring: Option<MonitoringConfig>,
    pub deployment: Option<DeploymentConfig>,
    pub stateful_set: Option<StatefulSetConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppComponentStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,

    /// Names of secondary objects the operator tracks for this component, e.g.
    /// the service-account pull secret under `saPullSecretName`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub port: i32,

    #[serde(rename = "type")]
    pub type_: Option<String>,

    pub target_port: Option<i32>,
    pub node_port: Option<i32>,
    pub port_name: Option<String>,

    /// Ports exposed in addition to the primary one. The synthesized Service
    /// port list is rebuilt from this list on every reconcile.
    pub ports: Option<Vec<k8s_openapi::api::core::v1::ServicePort>>,
}

impl ServiceConfig {
    /// The port traffic is forwarded to, defaulting to the service port.
    pub fn resolved_target_port(&self) -> i32 {
        self.target_port.unwrap_or(self.port)
    }

    /// The name of the primary port, `"<port>-tcp"` unless overridden.
    pub fn resolved_port_name(&self) -> String {
        self.port_name
            .clone()
            .unwrap_or_else(|| format!("{port}-tcp", port = self.port))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub host: Option<String>,
    pub path: Option<String>,

    /// Path type for the synthesized Ingress, `ImplementationSpecific` unless set.
    pub path_type: Option<String>,

    pub termination: Option<TlsTermination>,
    pub insecure_edge_termination_policy: Option<String>,

    /// Secret holding the serving certificate, referenced by the Ingress TLS
    /// entry and read by the reconcile loop to populate the Route TLS block.
    pub certificate_secret_ref: Option<String>,

    pub annotations: Option<BTreeMap<String, String>>,
}

/// Route TLS termination strategy.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TlsTermination {
    Edge,
    Reencrypt,
    Passthrough,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyConfig {
    /// Replaces the default namespace selector of the ingress rule when set.
    pub namespace_labels: Option<BTreeMap<String, String>>,

    /// Replaces the default pod selector of the ingress rule when set.
    pub from_labels: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityConfig {
    pub node_affinity: Option<NodeAffinity>,
    pub pod_affinity: Option<PodAffinity>,
    pub pod_anti_affinity: Option<PodAntiAffinity>,

    /// CPU architectures the component can be scheduled on. Becomes one
    /// required match expression on every node selector term and one
    /// preferred term at weight 1.
    pub architecture: Option<Vec<String>>,

    /// Node labels the component requires. Values are comma-separated lists.
    pub node_affinity_labels: Option<BTreeMap<String, String>>,
}

/// A probe with no fields set is the sentinel for "use the platform default
/// for this slot".
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbesConfig {
    pub readiness: Option<Probe>,
    pub liveness: Option<Probe>,
    pub startup: Option<Probe>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingConfig {
    pub max_replicas: i32,
    pub min_replicas: Option<i32>,
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    /// Extra labels the ServiceMonitor is decorated with.
    pub labels: Option<BTreeMap<String, String>>,

    /// Scrape endpoints, copied onto the ServiceMonitor verbatim.
    pub endpoints: Option<Vec<monitoring::Endpoint>>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub update_strategy: Option<DeploymentStrategy>,
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetConfig {
    pub update_strategy: Option<StatefulSetUpdateStrategy>,
    pub annotations: Option<BTreeMap<String, String>>,
    pub storage: Option<StorageConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Requested storage size, a Kubernetes resource quantity. Required unless
    /// a full claim template is supplied.
    pub size: Option<String>,

    pub mount_path: Option<String>,

    /// Full claim template override. Installed verbatim when set; otherwise a
    /// single ReadWriteOnce claim of `size` is synthesized.
    pub volume_claim_template: Option<PersistentVolumeClaim>,
}

impl AppComponent {
    /// The logical application this component belongs to, falling back to the
    /// component name.
    pub fn application_name(&self) -> String {
        self.spec
            .application_name
            .clone()
            .unwrap_or_else(|| self.name_any())
    }

    /// The service account the pod template runs under, falling back to the
    /// component name.
    pub fn effective_service_account_name(&self) -> String {
        self.spec
            .service_account_name
            .clone()
            .unwrap_or_else(|| self.name_any())
    }

    pub fn is_exposed(&self) -> bool {
        self.spec.expose == Some(true)
    }

    pub fn manages_tls(&self) -> bool {
        self.spec.manage_tls != Some(false)
    }

    /// Whether StatefulSet persistence is configured. Decides the scale target
    /// kind of the autoscaler.
    pub fn has_persistence(&self) -> bool {
        self.spec
            .stateful_set
            .as_ref()
            .is_some_and(|stateful_set| stateful_set.storage.is_some())
    }
}

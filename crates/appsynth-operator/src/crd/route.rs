//! Typed declaration of the OpenShift `route.openshift.io/v1 Route` kind.
//!
//! Routes are not part of `k8s-openapi`, so the fields this engine reads and
//! writes are declared here, the same way foreign kinds are declared for the
//! kube client elsewhere in the ecosystem.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(group = "route.openshift.io", version = "v1", kind = "Route", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub host: Option<String>,
    pub path: Option<String>,
    pub to: Option<RouteTargetReference>,
    pub port: Option<RoutePort>,
    pub tls: Option<TlsConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub weight: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: Option<k8s_openapi::apimachinery::pkg::util::intstr::IntOrString>,
}

/// The TLS block of a Route. Re-invocation of the synthesizer with a different
/// termination fully resets this block, no field carries over between states.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    pub termination: String,
    pub certificate: Option<String>,
    pub key: Option<String>,
    pub ca_certificate: Option<String>,
    #[serde(rename = "destinationCACertificate")]
    pub destination_ca_certificate: Option<String>,
    pub insecure_edge_termination_policy: Option<String>,
}

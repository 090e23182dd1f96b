//! Typed declaration of the Knative `serving.knative.dev/v1 Service` kind,
//! restricted to the fields the serverless synthesizer populates.

use k8s_openapi::api::core::v1::{Container, Volume};
use kube::{CustomResource, api::ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(group = "serving.knative.dev", version = "v1", kind = "Service", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub template: RevisionTemplateSpec,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTemplateSpec {
    pub metadata: Option<ObjectMeta>,
    pub spec: RevisionSpec,
}

/// A Knative revision spec embeds a pod spec; only the parts the engine owns
/// are declared.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
    pub service_account_name: Option<String>,
    pub volumes: Option<Vec<Volume>>,
}

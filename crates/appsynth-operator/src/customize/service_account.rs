//! ServiceAccount synthesis: image-pull-secret merging.
//!
//! References are only ever appended, never removed, so pull secrets attached
//! by other controllers survive reconciles. The secondary secret tracked in
//! the component status is resolved through the injected secret source; lookup
//! failures degrade to "secret absent" with a warning.

use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use kube::ResourceExt;

use crate::{client::SecretSource, crd::AppComponent, kvp};

/// Status reference key under which the tracked pull secret name is stored.
pub const PULL_SECRET_REFERENCE_KEY: &str = "saPullSecretName";

pub async fn customize_service_account(
    service_account: &mut ServiceAccount,
    component: &AppComponent,
    secrets: &impl SecretSource,
) {
    kvp::apply_metadata(&mut service_account.metadata, component);

    if let Some(pull_secret) = &component.spec.pull_secret {
        append_pull_secret(service_account, pull_secret);
    }

    let Some(tracked) = component
        .status
        .as_ref()
        .and_then(|status| status.references.get(PULL_SECRET_REFERENCE_KEY))
    else {
        return;
    };

    let namespace = component.namespace().unwrap_or_default();
    match secrets.get_secret(&namespace, tracked).await {
        Ok(Some(_)) => append_pull_secret(service_account, tracked),
        Ok(None) => (),
        Err(error) => {
            tracing::warn!(
                %error,
                secret = %tracked,
                "failed to look up tracked pull secret, skipping it"
            );
        }
    }
}

fn append_pull_secret(service_account: &mut ServiceAccount, name: &str) {
    let secrets = service_account.image_pull_secrets.get_or_insert_with(Vec::new);
    if !secrets
        .iter()
        .any(|reference| reference.name == name)
    {
        secrets.push(LocalObjectReference {
            name: name.to_owned(),
        });
    }
}

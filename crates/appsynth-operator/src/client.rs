//! The thin cluster-access seam the synthesizers depend on.
//!
//! Only the service-account synthesizer needs to read from the cluster (to
//! resolve tracked pull secrets), so the seam is a single-method trait that a
//! [`kube::Client`] satisfies and tests replace with an in-memory map.

use std::future::Future;

use k8s_openapi::api::core::v1::Secret;
use kube::Api;

/// Read access to namespaced secrets.
pub trait SecretSource {
    /// Fetches the secret, returning `None` when it does not exist.
    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Secret>, kube::Error>> + Send;
}

impl SecretSource for kube::Client {
    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Secret>, kube::Error>> + Send {
        let secrets: Api<Secret> = Api::namespaced(self.clone(), namespace);
        let name = name.to_owned();
        async move { secrets.get_opt(&name).await }
    }
}

//! Workload synthesis engine for the `AppComponent` operator.
//!
//! Given an [`AppComponent`](crate::crd::AppComponent) and an existing (possibly
//! previously reconciled) native object, the functions in [`customize`] mutate
//! the object in place so that a subsequent apply converges the cluster to the
//! desired state. All synthesizers are pure, reentrant and idempotent; the
//! surrounding reconcile loop owns fetching, persisting and scheduling.

pub mod client;
pub mod crd;
pub mod customize;
pub mod kvp;
pub mod logging;
pub mod namespace;
pub mod status;
pub mod validation;

// External re-exports
pub use k8s_openapi;
pub use kube;
pub use schemars;

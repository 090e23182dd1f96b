//! The synthesizers: pure functions mutating a native target object from an
//! [`AppComponent`](crate::crd::AppComponent) descriptor.
//!
//! Every function here is reentrant, side-effect-free and idempotent; the
//! derived parts of each target are recomputed from the descriptor on every
//! call and replace the previous values atomically. The surrounding reconcile
//! loop owns fetching, persisting and scheduling.

pub mod affinity;
pub mod autoscaler;
pub mod ingress;
pub mod knative;
pub mod monitoring;
pub mod network_policy;
pub mod probe;
pub mod route;
pub mod service;
pub mod service_account;
pub mod workload;

pub use affinity::compose_affinity;
pub use autoscaler::customize_hpa;
pub use ingress::customize_ingress;
pub use knative::customize_knative_service;
pub use monitoring::customize_service_monitor;
pub use network_policy::customize_network_policy;
pub use probe::{ResolvedProbes, resolved_probes};
pub use route::{TerminationState, TlsMaterial, customize_route};
pub use service::customize_service;
pub use service_account::{PULL_SECRET_REFERENCE_KEY, customize_service_account};
pub use workload::{
    customize_deployment, customize_persistence, customize_pod_spec, customize_stateful_set,
    default_security_context,
};

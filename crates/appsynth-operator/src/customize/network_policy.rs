//! NetworkPolicy synthesis: one ingress rule whose peers depend on exposure,
//! platform flavor and the descriptor's selector overrides.

use std::collections::BTreeMap;

use k8s_openapi::{
    api::networking::v1::{
        NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
    },
    apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString},
};
use kube::ResourceExt;

use crate::{crd::AppComponent, kvp};

const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";
const OPENSHIFT_POLICY_GROUP_LABEL: &str = "network.openshift.io/policy-group";
const OPENSHIFT_INGRESS_POLICY_GROUP_LABEL: &str = "policy-group.network.openshift.io/ingress";

pub fn customize_network_policy(
    policy: &mut NetworkPolicy,
    is_openshift: bool,
    component: &AppComponent,
) {
    kvp::apply_metadata(&mut policy.metadata, component);

    let spec = policy.spec.get_or_insert_with(Default::default);
    spec.pod_selector = Some(LabelSelector {
        match_labels: Some(kvp::instance_selector(component)),
        ..LabelSelector::default()
    });

    let ports = component.spec.service.as_ref().map(|service| {
        vec![NetworkPolicyPort {
            port: Some(IntOrString::Int(service.port)),
            ..NetworkPolicyPort::default()
        }]
    });

    spec.ingress = Some(vec![NetworkPolicyIngressRule {
        from: Some(peers(is_openshift, component)),
        ports,
    }]);
}

fn peers(is_openshift: bool, component: &AppComponent) -> Vec<NetworkPolicyPeer> {
    let config = component.spec.network_policy.clone().unwrap_or_default();

    // Custom selectors replace the defaults wholesale, including the
    // OpenShift-specific monitoring peer.
    if config.namespace_labels.is_some() || config.from_labels.is_some() {
        return vec![NetworkPolicyPeer {
            namespace_selector: Some(LabelSelector {
                match_labels: config.namespace_labels,
                ..LabelSelector::default()
            }),
            pod_selector: Some(LabelSelector {
                match_labels: config.from_labels,
                ..LabelSelector::default()
            }),
            ..NetworkPolicyPeer::default()
        }];
    }

    if component.is_exposed() {
        let namespace_selector = if is_openshift {
            LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    OPENSHIFT_INGRESS_POLICY_GROUP_LABEL.to_owned(),
                    String::new(),
                )])),
                ..LabelSelector::default()
            }
        } else {
            LabelSelector::default()
        };
        return vec![NetworkPolicyPeer {
            namespace_selector: Some(namespace_selector),
            ..NetworkPolicyPeer::default()
        }];
    }

    let mut peers = vec![NetworkPolicyPeer {
        namespace_selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([(
                NAMESPACE_NAME_LABEL.to_owned(),
                component.namespace().unwrap_or_default(),
            )])),
            ..LabelSelector::default()
        }),
        pod_selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([(
                kvp::K8S_APP_PART_OF_KEY.to_owned(),
                component.application_name(),
            )])),
            ..LabelSelector::default()
        }),
        ..NetworkPolicyPeer::default()
    }];

    if is_openshift {
        peers.push(NetworkPolicyPeer {
            namespace_selector: Some(LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    OPENSHIFT_POLICY_GROUP_LABEL.to_owned(),
                    "monitoring".to_owned(),
                )])),
                ..LabelSelector::default()
            }),
            ..NetworkPolicyPeer::default()
        });
    }

    peers
}

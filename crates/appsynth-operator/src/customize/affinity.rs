//! Affinity composition for the pod template.
//!
//! Native NodeAffinity/PodAffinity/PodAntiAffinity structures pass through
//! verbatim; on top of that, architecture constraints and node affinity
//! labels become `In` match expressions on every required node selector term.

use k8s_openapi::api::core::v1::{
    Affinity, NodeSelectorRequirement, NodeSelectorTerm, PreferredSchedulingTerm,
};

use crate::crd::AppComponent;

pub const ARCHITECTURE_LABEL: &str = "kubernetes.io/arch";
const IN_OPERATOR: &str = "In";

/// Composes the pod affinity from the descriptor, or `None` when no affinity
/// sub-spec is configured. The result is recomputed from scratch each call.
pub fn compose_affinity(component: &AppComponent) -> Option<Affinity> {
    let config = component.spec.affinity.as_ref()?;

    let mut affinity = Affinity {
        node_affinity: config.node_affinity.clone(),
        pod_affinity: config.pod_affinity.clone(),
        pod_anti_affinity: config.pod_anti_affinity.clone(),
    };

    let mut required_expressions = Vec::new();
    let mut preferred_terms = Vec::new();

    if let Some(architecture) = config
        .architecture
        .as_ref()
        .filter(|architecture| !architecture.is_empty())
    {
        let requirement = NodeSelectorRequirement {
            key: ARCHITECTURE_LABEL.to_owned(),
            operator: IN_OPERATOR.to_owned(),
            values: Some(architecture.clone()),
        };
        preferred_terms.push(PreferredSchedulingTerm {
            preference: NodeSelectorTerm {
                match_expressions: Some(vec![requirement.clone()]),
                ..NodeSelectorTerm::default()
            },
            weight: 1,
        });
        required_expressions.push(requirement);
    }

    // BTreeMap iteration keeps the expression order deterministic across
    // reconciles.
    for (key, value) in config.node_affinity_labels.iter().flatten() {
        required_expressions.push(NodeSelectorRequirement {
            key: key.clone(),
            operator: IN_OPERATOR.to_owned(),
            values: Some(value.split(',').map(|token| token.trim().to_owned()).collect()),
        });
    }

    if !required_expressions.is_empty() {
        let node_affinity = affinity.node_affinity.get_or_insert_with(Default::default);
        let required = node_affinity
            .required_during_scheduling_ignored_during_execution
            .get_or_insert_with(Default::default);
        if required.node_selector_terms.is_empty() {
            required.node_selector_terms.push(NodeSelectorTerm::default());
        }
        for term in &mut required.node_selector_terms {
            term.match_expressions
                .get_or_insert_with(Vec::new)
                .extend(required_expressions.iter().cloned());
        }
        if !preferred_terms.is_empty() {
            node_affinity
                .preferred_during_scheduling_ignored_during_execution
                .get_or_insert_with(Vec::new)
                .extend(preferred_terms);
        }
    }

    Some(affinity)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{NodeAffinity, NodeSelector};

    use super::*;
    use crate::{
        crd::{AffinityConfig, AppComponentSpec},
        customize::fixture,
    };

    fn component_with_affinity(affinity: AffinityConfig) -> AppComponent {
        fixture::component(AppComponentSpec {
            affinity: Some(affinity),
            ..Default::default()
        })
    }

    #[test]
    fn no_affinity_sub_spec_composes_nothing() {
        let component = fixture::component(Default::default());
        assert_eq!(compose_affinity(&component), None);
    }

    #[test]
    fn architecture_becomes_required_and_preferred_terms() {
        let component = component_with_affinity(AffinityConfig {
            architecture: Some(vec!["ppc64le".to_owned()]),
            ..Default::default()
        });

        let affinity = compose_affinity(&component).expect("affinity is configured");
        let node_affinity = affinity.node_affinity.expect("node affinity must be built");

        let required = node_affinity
            .required_during_scheduling_ignored_during_execution
            .expect("required terms must be built");
        assert_eq!(required.node_selector_terms.len(), 1);
        let expressions = required.node_selector_terms[0]
            .match_expressions
            .as_deref()
            .expect("match expressions must be built");
        assert_eq!(expressions.len(), 1);
        assert_eq!(expressions[0].key, ARCHITECTURE_LABEL);
        assert_eq!(expressions[0].operator, "In");
        assert_eq!(expressions[0].values.as_deref(), Some(&["ppc64le".to_owned()][..]));

        let preferred = node_affinity
            .preferred_during_scheduling_ignored_during_execution
            .expect("preferred terms must be built");
        assert_eq!(preferred.len(), 1);
        assert_eq!(preferred[0].weight, 1);
    }

    #[test]
    fn architecture_is_appended_to_every_existing_required_term() {
        let user_term = NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: "disktype".to_owned(),
                operator: "In".to_owned(),
                values: Some(vec!["ssd".to_owned()]),
            }]),
            ..NodeSelectorTerm::default()
        };
        let component = component_with_affinity(AffinityConfig {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: vec![user_term.clone(), user_term],
                }),
                ..NodeAffinity::default()
            }),
            architecture: Some(vec!["amd64".to_owned(), "arm64".to_owned()]),
            ..Default::default()
        });

        let affinity = compose_affinity(&component).expect("affinity is configured");
        let required = affinity
            .node_affinity
            .and_then(|node| node.required_during_scheduling_ignored_during_execution)
            .expect("required terms must be kept");

        assert_eq!(required.node_selector_terms.len(), 2);
        for term in &required.node_selector_terms {
            let expressions = term.match_expressions.as_deref().expect("expressions kept");
            assert_eq!(expressions.len(), 2);
            assert_eq!(expressions[0].key, "disktype");
            assert_eq!(expressions[1].key, ARCHITECTURE_LABEL);
            assert_eq!(
                expressions[1].values.as_deref(),
                Some(&["amd64".to_owned(), "arm64".to_owned()][..])
            );
        }
    }

    #[test]
    fn node_affinity_label_values_are_split_and_trimmed() {
        let component = component_with_affinity(AffinityConfig {
            node_affinity_labels: Some(BTreeMap::from([(
                "topology.kubernetes.io/zone".to_owned(),
                "eu-1a , eu-1b,eu-1c".to_owned(),
            )])),
            ..Default::default()
        });

        let affinity = compose_affinity(&component).expect("affinity is configured");
        let required = affinity
            .node_affinity
            .and_then(|node| node.required_during_scheduling_ignored_during_execution)
            .expect("required terms must be built");
        let expressions = required.node_selector_terms[0]
            .match_expressions
            .as_deref()
            .expect("match expressions must be built");

        assert_eq!(expressions.len(), 1);
        assert_eq!(expressions[0].key, "topology.kubernetes.io/zone");
        assert_eq!(
            expressions[0].values.as_deref(),
            Some(&["eu-1a".to_owned(), "eu-1b".to_owned(), "eu-1c".to_owned()][..])
        );
    }

    #[test]
    fn pass_through_structures_are_copied_verbatim() {
        let node_affinity = NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm::default()],
            }),
            ..NodeAffinity::default()
        };
        let component = component_with_affinity(AffinityConfig {
            node_affinity: Some(node_affinity.clone()),
            ..Default::default()
        });

        let affinity = compose_affinity(&component).expect("affinity is configured");
        assert_eq!(affinity.node_affinity, Some(node_affinity));
        assert_eq!(affinity.pod_affinity, None);
    }
}

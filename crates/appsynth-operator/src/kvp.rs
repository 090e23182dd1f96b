//! The label/identity fabric shared by every derived resource.
//!
//! Each synthesized object carries the canonical `app.kubernetes.io` identity
//! labels computed from the component, and selectors always key on the
//! instance label, which is the component name and never recomputed from
//! anything else.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{ResourceExt, api::ObjectMeta};

use crate::crd::AppComponent;

pub const K8S_APP_INSTANCE_KEY: &str = "app.kubernetes.io/instance";
pub const K8S_APP_NAME_KEY: &str = "app.kubernetes.io/name";
pub const K8S_APP_VERSION_KEY: &str = "app.kubernetes.io/version";
pub const K8S_APP_PART_OF_KEY: &str = "app.kubernetes.io/part-of";
pub const K8S_APP_MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";

pub const OPERATOR_NAME: &str = "appsynth-operator";

/// The canonical label set applied to every derived resource: the owned
/// identity labels plus the user-supplied component labels. User labels never
/// override the owned keys.
pub fn component_labels(component: &AppComponent) -> BTreeMap<String, String> {
    let name = component.name_any();

    let mut labels = BTreeMap::from([
        (K8S_APP_INSTANCE_KEY.to_owned(), name.clone()),
        (K8S_APP_NAME_KEY.to_owned(), name),
        (K8S_APP_MANAGED_BY_KEY.to_owned(), OPERATOR_NAME.to_owned()),
        (K8S_APP_PART_OF_KEY.to_owned(), component.application_name()),
    ]);

    if let Some(version) = &component.spec.application_version {
        labels.insert(K8S_APP_VERSION_KEY.to_owned(), version.clone());
    }

    for (key, value) in component.labels() {
        labels
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    labels
}

/// The selector map used by Service, NetworkPolicy and ServiceMonitor. Always
/// keys on the instance label.
pub fn instance_selector(component: &AppComponent) -> BTreeMap<String, String> {
    BTreeMap::from([(K8S_APP_INSTANCE_KEY.to_owned(), component.name_any())])
}

/// Merges `additions` into `target`, overriding on conflict but preserving
/// entries the engine does not own.
pub fn merge_into(target: &mut Option<BTreeMap<String, String>>, additions: &BTreeMap<String, String>) {
    let target = target.get_or_insert_with(BTreeMap::new);
    for (key, value) in additions {
        target.insert(key.clone(), value.clone());
    }
}

/// Merges the canonical labels and the component annotations onto an object's
/// metadata, keeping entries already present on the target that the engine
/// does not own.
pub fn apply_metadata(metadata: &mut ObjectMeta, component: &AppComponent) {
    merge_into(&mut metadata.labels, &component_labels(component));
    merge_into(&mut metadata.annotations, component.annotations());
}

/// Installs the owner reference on the object's metadata. An existing
/// reference with the same UID is updated in place, anything else is left
/// alone.
pub fn ensure_owner_reference(metadata: &mut ObjectMeta, reference: OwnerReference) {
    let references = metadata.owner_references.get_or_insert_with(Vec::new);
    match references
        .iter_mut()
        .find(|existing| existing.uid == reference.uid)
    {
        Some(existing) => *existing = reference,
        None => references.push(reference),
    }
}

const OCI_SOURCE_ANNOTATION: &str = "image.opencontainers.org/source";
const OCI_REVISION_ANNOTATION: &str = "image.opencontainers.org/revision";
const OPENSHIFT_VCS_URI_ANNOTATION: &str = "app.openshift.io/vcs-uri";
const OPENSHIFT_VCS_REF_ANNOTATION: &str = "app.openshift.io/vcs-ref";

/// Translates the Open Container Initiative source annotations carried by the
/// component into their OpenShift console counterparts. Annotations without a
/// counterpart are ignored.
pub fn openshift_annotations(component: &AppComponent) -> BTreeMap<String, String> {
    [
        (OCI_SOURCE_ANNOTATION, OPENSHIFT_VCS_URI_ANNOTATION),
        (OCI_REVISION_ANNOTATION, OPENSHIFT_VCS_REF_ANNOTATION),
    ]
    .into_iter()
    .filter_map(|(from, to)| {
        component
            .annotations()
            .get(from)
            .map(|value| (to.to_owned(), value.clone()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customize::fixture;

    #[test]
    fn user_labels_never_override_owned_keys() {
        let mut component = fixture::component(Default::default());
        component
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(K8S_APP_INSTANCE_KEY.to_owned(), "spoofed".to_owned());

        let labels = component_labels(&component);
        assert_eq!(labels[K8S_APP_INSTANCE_KEY], "my-app");
        assert_eq!(labels["key1"], "value1");
        assert_eq!(labels[K8S_APP_MANAGED_BY_KEY], OPERATOR_NAME);
    }

    #[test]
    fn part_of_falls_back_to_component_name() {
        let component = fixture::component(Default::default());
        assert_eq!(component_labels(&component)[K8S_APP_PART_OF_KEY], "my-app");

        let component = fixture::component(crate::crd::AppComponentSpec {
            application_name: Some("my-application".to_owned()),
            ..Default::default()
        });
        assert_eq!(
            component_labels(&component)[K8S_APP_PART_OF_KEY],
            "my-application"
        );
    }

    #[test]
    fn apply_metadata_keeps_foreign_labels() {
        let component = fixture::component(Default::default());
        let mut metadata = kube::api::ObjectMeta {
            labels: Some(BTreeMap::from([("other".to_owned(), "kept".to_owned())])),
            ..Default::default()
        };

        apply_metadata(&mut metadata, &component);

        let labels = metadata.labels.expect("labels must be set");
        assert_eq!(labels["other"], "kept");
        assert_eq!(labels[K8S_APP_INSTANCE_KEY], "my-app");
    }

    fn owner_reference(uid: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "apps.appsynth.dev/v1beta1".to_owned(),
            kind: "AppComponent".to_owned(),
            name: name.to_owned(),
            uid: uid.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn owner_reference_is_appended_once() {
        let mut metadata = ObjectMeta::default();
        ensure_owner_reference(&mut metadata, owner_reference("uid-1", "my-app"));
        ensure_owner_reference(&mut metadata, owner_reference("uid-1", "my-app"));

        let references = metadata.owner_references.expect("references must be set");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "my-app");
    }

    #[test]
    fn owner_reference_with_same_uid_is_updated_in_place() {
        let mut metadata = ObjectMeta {
            owner_references: Some(vec![
                owner_reference("uid-other", "someone-else"),
                owner_reference("uid-1", "my-app"),
            ]),
            ..Default::default()
        };

        ensure_owner_reference(&mut metadata, owner_reference("uid-1", "my-app-renamed"));

        let references = metadata.owner_references.expect("references must be set");
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].name, "someone-else");
        assert_eq!(references[1].name, "my-app-renamed");
    }

    #[test]
    fn oci_source_annotations_map_to_openshift_console_keys() {
        let mut component = fixture::component(Default::default());
        component.metadata.annotations = Some(BTreeMap::from([
            (
                "image.opencontainers.org/source".to_owned(),
                "https://github.com/acme/my-app".to_owned(),
            ),
            (
                "image.opencontainers.org/revision".to_owned(),
                "abc123".to_owned(),
            ),
            ("unrelated".to_owned(), "kept-out".to_owned()),
        ]));

        let annotations = openshift_annotations(&component);
        assert_eq!(
            annotations["app.openshift.io/vcs-uri"],
            "https://github.com/acme/my-app"
        );
        assert_eq!(annotations["app.openshift.io/vcs-ref"], "abc123");
        assert_eq!(annotations.len(), 2);
    }

    #[test]
    fn components_without_oci_annotations_map_to_nothing() {
        let component = fixture::component(Default::default());
        assert!(openshift_annotations(&component).is_empty());
    }

    #[test]
    fn annotation_merge_preserves_foreign_entries() {
        let component = fixture::component_with_annotations(Default::default());
        let mut annotations = Some(BTreeMap::from([(
            "other-controller/state".to_owned(),
            "kept".to_owned(),
        )]));

        merge_into(&mut annotations, component.annotations());

        let annotations = annotations.expect("annotations must be set");
        assert_eq!(annotations["other-controller/state"], "kept");
        assert_eq!(annotations["key2"], "value2");
    }
}

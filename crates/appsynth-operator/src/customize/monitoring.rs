//! ServiceMonitor synthesis. Scrape endpoints are pass-through and replaced
//! wholesale from the descriptor.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;

use crate::{
    crd::{AppComponent, monitoring::ServiceMonitor},
    kvp,
};

/// Services opt into scraping by carrying this label.
pub const MONITORING_ENABLED_LABEL: &str = "monitor.apps.appsynth.dev/enabled";

pub fn customize_service_monitor(monitor: &mut ServiceMonitor, component: &AppComponent) {
    let mut labels = kvp::component_labels(component);
    if let Some(extra) = component
        .spec
        .monitoring
        .as_ref()
        .and_then(|monitoring| monitoring.labels.as_ref())
    {
        labels.extend(extra.clone());
    }
    kvp::merge_into(&mut monitor.metadata.labels, &labels);
    kvp::merge_into(&mut monitor.metadata.annotations, component.annotations());

    monitor.spec.selector = LabelSelector {
        match_labels: Some(BTreeMap::from([
            (MONITORING_ENABLED_LABEL.to_owned(), "true".to_owned()),
            (kvp::K8S_APP_INSTANCE_KEY.to_owned(), component.name_any()),
        ])),
        ..LabelSelector::default()
    };
    monitor.spec.endpoints = component
        .spec
        .monitoring
        .as_ref()
        .and_then(|monitoring| monitoring.endpoints.clone())
        .unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crd::{AppComponentSpec, MonitoringConfig, monitoring::Endpoint},
        customize::fixture,
    };

    fn component(monitoring: MonitoringConfig) -> AppComponent {
        fixture::component(AppComponentSpec {
            monitoring: Some(monitoring),
            ..Default::default()
        })
    }

    #[test]
    fn selector_keys_on_the_opt_in_label_and_instance() {
        let mut monitor = ServiceMonitor::new("my-app", Default::default());
        customize_service_monitor(&mut monitor, &component(MonitoringConfig::default()));

        let match_labels = monitor
            .spec
            .selector
            .match_labels
            .expect("selector must be built");
        assert_eq!(match_labels[MONITORING_ENABLED_LABEL], "true");
        assert_eq!(match_labels["app.kubernetes.io/instance"], "my-app");
    }

    #[test]
    fn monitoring_labels_decorate_the_component_labels() {
        let mut monitor = ServiceMonitor::new("my-app", Default::default());
        customize_service_monitor(
            &mut monitor,
            &component(MonitoringConfig {
                labels: Some(BTreeMap::from([(
                    "release".to_owned(),
                    "prometheus".to_owned(),
                )])),
                ..Default::default()
            }),
        );

        let labels = monitor.metadata.labels.expect("labels must be built");
        assert_eq!(labels["release"], "prometheus");
        assert_eq!(labels["app.kubernetes.io/instance"], "my-app");
        assert_eq!(labels["key1"], "value1");
    }

    #[test]
    fn endpoints_are_replaced_wholesale() {
        let mut monitor = ServiceMonitor::new("my-app", Default::default());
        monitor.spec.endpoints = vec![Endpoint {
            port: Some("stale".to_owned()),
            ..Default::default()
        }];

        customize_service_monitor(
            &mut monitor,
            &component(MonitoringConfig {
                endpoints: Some(vec![Endpoint {
                    port: Some("web".to_owned()),
                    interval: Some("30s".to_owned()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        );

        assert_eq!(monitor.spec.endpoints.len(), 1);
        assert_eq!(monitor.spec.endpoints[0].port.as_deref(), Some("web"));
        assert_eq!(monitor.spec.endpoints[0].interval.as_deref(), Some("30s"));
    }

    #[test]
    fn missing_endpoints_clear_the_list() {
        let mut monitor = ServiceMonitor::new("my-app", Default::default());
        monitor.spec.endpoints = vec![Endpoint::default()];

        customize_service_monitor(&mut monitor, &component(MonitoringConfig::default()));
        assert!(monitor.spec.endpoints.is_empty());
    }
}

//! Ingress synthesis for platforms without the Route API.

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressTLS, ServiceBackendPort,
};
use kube::ResourceExt;

use crate::{crd::AppComponent, kvp};

const DEFAULT_PATH: &str = "/";
const DEFAULT_PATH_TYPE: &str = "ImplementationSpecific";

pub fn customize_ingress(ingress: &mut Ingress, component: &AppComponent) {
    kvp::apply_metadata(&mut ingress.metadata, component);

    let config = component.spec.route.clone().unwrap_or_default();
    kvp::merge_into(
        &mut ingress.metadata.annotations,
        &config.annotations.clone().unwrap_or_default(),
    );

    let backend_port = component
        .spec
        .service
        .as_ref()
        .map(|service| ServiceBackendPort {
            name: Some(service.resolved_port_name()),
            number: None,
        });

    let rule = IngressRule {
        host: config.host.clone(),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some(
                    config
                        .path
                        .clone()
                        .filter(|path| !path.is_empty())
                        .unwrap_or_else(|| DEFAULT_PATH.to_owned()),
                ),
                path_type: config
                    .path_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PATH_TYPE.to_owned()),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: component.name_any(),
                        port: backend_port,
                    }),
                    ..IngressBackend::default()
                },
            }],
        }),
    };

    let spec = ingress.spec.get_or_insert_with(Default::default);
    spec.rules = Some(vec![rule]);
    spec.tls = config.certificate_secret_ref.as_ref().map(|secret_name| {
        vec![IngressTLS {
            hosts: config.host.clone().map(|host| vec![host]),
            secret_name: Some(secret_name.clone()),
        }]
    });
}

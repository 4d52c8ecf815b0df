//! Service enumeration
//!
//! Lists services namespace by namespace, applies the [`ServiceFilter`] and
//! extracts one external address per service.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use svcsync_core::config::ServiceFilter;
use svcsync_core::model::ObservedService;
use svcsync_core::traits::ServiceProvider;
use svcsync_core::{Error, Result};
use tracing::{debug, warn};

use crate::client::KubeClient;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Namespace {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Service {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
    #[serde(default)]
    pub status: ServiceStatus,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServiceSpec {
    #[serde(rename = "type", default)]
    pub service_type: String,
    #[serde(rename = "externalIPs", default)]
    pub external_ips: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServiceStatus {
    #[serde(rename = "loadBalancer", default)]
    pub load_balancer: LoadBalancerStatus,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoadBalancerStatus {
    #[serde(default)]
    pub ingress: Vec<LoadBalancerIngress>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoadBalancerIngress {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Service {
    /// The address the service is reachable on from outside the cluster
    ///
    /// First load-balancer ingress IP, else its hostname, else the first
    /// `spec.externalIPs` entry.
    pub(crate) fn external_address(&self) -> Option<&str> {
        if let Some(ingress) = self.status.load_balancer.ingress.first() {
            if let Some(ip) = non_empty(&ingress.ip) {
                return Some(ip);
            }
            if let Some(hostname) = non_empty(&ingress.hostname) {
                return Some(hostname);
            }
        }

        self.spec
            .external_ips
            .first()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Apply the filter and extract the address
    pub(crate) fn observe(&self, filter: &ServiceFilter) -> Option<ObservedService> {
        let meta = &self.metadata;
        if !filter.matches(
            &meta.namespace,
            &self.spec.service_type,
            &meta.annotations,
            &meta.labels,
        ) {
            return None;
        }

        let address = self.external_address()?;
        Some(ObservedService::new(&meta.name, &meta.namespace, address))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// ServiceProvider backed by the Kubernetes API
#[derive(Debug, Clone)]
pub struct KubernetesServiceProvider {
    client: KubeClient,
}

impl KubernetesServiceProvider {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }

    async fn namespaces(&self, filter: &ServiceFilter) -> Result<Vec<String>> {
        if !filter.namespaces.is_empty() {
            return Ok(filter.namespaces.clone());
        }

        let list: ObjectList<Namespace> = self
            .client
            .get("/api/v1/namespaces")
            .await
            .map_err(|e| Error::service_provider(format!("Cannot list namespaces: {}", e)))?;

        Ok(list.items.into_iter().map(|ns| ns.metadata.name).collect())
    }
}

#[async_trait]
impl ServiceProvider for KubernetesServiceProvider {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ObservedService>> {
        let mut observed = Vec::new();

        for namespace in self.namespaces(filter).await? {
            let path = format!("/api/v1/namespaces/{}/services", namespace);
            let list: ObjectList<Service> = match self.client.get(&path).await {
                Ok(list) => list,
                Err(e) => {
                    warn!("Failed to list services in namespace {}: {}", namespace, e);
                    continue;
                }
            };

            let before = observed.len();
            observed.extend(list.items.iter().filter_map(|svc| svc.observe(filter)));
            debug!(
                "Namespace {}: {} of {} service(s) selected",
                namespace,
                observed.len() - before,
                list.items.len()
            );
        }

        Ok(observed)
    }

    fn provider_name(&self) -> &'static str {
        "kubernetes"
    }
}

//! Configuration types for the sync system
//!
//! This module defines all configuration structures used throughout the
//! workspace. Values are normally read from the environment by `svcsyncd`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cluster name, used in registry descriptions
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Which services make up the desired state
    #[serde(default)]
    pub filter: ServiceFilter,

    /// IPAM registry connection
    pub registry: RegistryConfig,

    /// Kubernetes API connection
    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    /// Where the prefix list is persisted
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Plan only: no registry mutations, no save
    #[serde(default)]
    pub dry_run: bool,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration for the given registry with defaults elsewhere
    pub fn new(registry: RegistryConfig) -> Self {
        Self {
            cluster: default_cluster(),
            filter: ServiceFilter::default(),
            registry,
            kubernetes: KubernetesConfig::default(),
            state_store: StateStoreConfig::default(),
            dry_run: false,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.cluster.trim().is_empty() {
            return Err(crate::Error::config("Cluster name cannot be empty"));
        }

        self.registry.validate()?;
        self.kubernetes.validate()?;
        self.state_store.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Predicates selecting the services that make up the desired state
///
/// Every category is an allow-list or a set of required pairs; an empty
/// category accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFilter {
    /// Namespaces to enumerate (empty = all namespaces)
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Service types to accept, e.g. `LoadBalancer` (empty = all types)
    #[serde(default)]
    pub service_types: Vec<String>,

    /// Annotations that must all be present with these values
    #[serde(default)]
    pub annotations: Vec<(String, String)>,

    /// Labels that must all be present with these values
    #[serde(default)]
    pub labels: Vec<(String, String)>,
}

impl ServiceFilter {
    pub fn accepts_namespace(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.iter().any(|n| n == namespace)
    }

    pub fn accepts_type(&self, service_type: &str) -> bool {
        self.service_types.is_empty() || self.service_types.iter().any(|t| t == service_type)
    }

    pub fn matches_annotations(&self, annotations: &HashMap<String, String>) -> bool {
        required_pairs_match(&self.annotations, annotations)
    }

    pub fn matches_labels(&self, labels: &HashMap<String, String>) -> bool {
        required_pairs_match(&self.labels, labels)
    }

    /// Apply every predicate to one service
    pub fn matches(
        &self,
        namespace: &str,
        service_type: &str,
        annotations: &HashMap<String, String>,
        labels: &HashMap<String, String>,
    ) -> bool {
        self.accepts_namespace(namespace)
            && self.accepts_type(service_type)
            && self.matches_annotations(annotations)
            && self.matches_labels(labels)
    }
}

// A missing key compares as the empty string, so a required pair with an
// empty value also accepts objects that lack the key.
fn required_pairs_match(required: &[(String, String)], actual: &HashMap<String, String>) -> bool {
    required.iter().all(|(key, value)| {
        actual.get(key).map(String::as_str).unwrap_or("") == value.as_str()
    })
}

/// IPAM registry (NetBox) configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL, e.g. `https://netbox.example.com`
    pub url: String,

    /// API token
    pub api_token: String,

    /// Custom fields attached to every created prefix
    #[serde(default)]
    pub custom_fields: Vec<(String, String)>,
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_token: api_token.into(),
            custom_fields: Vec::new(),
        }
    }

    /// Validate the registry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("Registry URL cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Registry URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.api_token.is_empty() {
            return Err(crate::Error::config("Registry API token cannot be empty"));
        }
        Ok(())
    }
}

// Hides the API token
impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url)
            .field("api_token", &"<REDACTED>")
            .field("custom_fields", &self.custom_fields)
            .finish()
    }
}

/// Kubernetes API connection
///
/// With no explicit URL the in-cluster service account is used.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    /// Explicit API server URL (e.g. `http://127.0.0.1:8001` behind `kubectl proxy`)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the explicit API server
    #[serde(default)]
    pub api_token: Option<String>,
}

impl KubernetesConfig {
    /// Validate the Kubernetes configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(url) = &self.api_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "Kubernetes API URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }
        if self.api_token.is_some() && self.api_url.is_none() {
            return Err(crate::Error::config(
                "Kubernetes API token given without an API URL",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for KubernetesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// A ConfigMap holding the document under `prefixes.json`
    ConfigMap {
        /// ConfigMap namespace
        namespace: String,
        /// ConfigMap name
        name: String,
    },

    /// A JSON file on local disk
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    Memory,
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::ConfigMap { namespace, name } => {
                if namespace.is_empty() || name.is_empty() {
                    return Err(crate::Error::config(
                        "ConfigMap state store needs both a namespace and a name",
                    ));
                }
                Ok(())
            }
            StateStoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("State file path cannot be empty"));
                }
                Ok(())
            }
            StateStoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StateStoreConfig::ConfigMap { .. } => "configmap",
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::ConfigMap {
            namespace: "default".to_string(),
            name: DEFAULT_CONFIGMAP_NAME.to_string(),
        }
    }
}

/// Default name of the state ConfigMap
pub const DEFAULT_CONFIGMAP_NAME: &str = "kubernetes-service-netbox-syncer";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the event channel
    ///
    /// When full, events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_cluster() -> String {
    "default".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Parse a comma-separated list, dropping empty items
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `key:value,key2:value2` into ordered pairs
///
/// Only the first `:` separates key from value, so values may contain `:`.
pub fn parse_key_value_list(input: &str) -> Result<Vec<(String, String)>, crate::Error> {
    parse_list(input)
        .into_iter()
        .map(|item| {
            let (key, value) = item.split_once(':').ok_or_else(|| {
                crate::Error::config(format!("Expected key:value, got '{}'", item))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(crate::Error::config(format!("Empty key in '{}'", item)));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = ServiceFilter::default();
        assert!(filter.matches("any", "ClusterIP", &HashMap::new(), &HashMap::new()));
    }

    #[test]
    fn type_and_namespace_allow_lists() {
        let filter = ServiceFilter {
            namespaces: vec!["prod".to_string()],
            service_types: vec!["LoadBalancer".to_string()],
            ..Default::default()
        };

        assert!(filter.matches("prod", "LoadBalancer", &HashMap::new(), &HashMap::new()));
        assert!(!filter.matches("dev", "LoadBalancer", &HashMap::new(), &HashMap::new()));
        assert!(!filter.matches("prod", "NodePort", &HashMap::new(), &HashMap::new()));
    }

    #[test]
    fn all_required_annotations_and_labels_must_match() {
        let filter = ServiceFilter {
            annotations: vec![
                ("netbox/sync".to_string(), "true".to_string()),
                ("team".to_string(), "edge".to_string()),
            ],
            labels: vec![("app".to_string(), "web".to_string())],
            ..Default::default()
        };

        let annotations = map(&[("netbox/sync", "true"), ("team", "edge"), ("extra", "x")]);
        let labels = map(&[("app", "web")]);
        assert!(filter.matches("ns", "LoadBalancer", &annotations, &labels));

        let partial = map(&[("netbox/sync", "true")]);
        assert!(!filter.matches("ns", "LoadBalancer", &partial, &labels));

        let wrong_label = map(&[("app", "api")]);
        assert!(!filter.matches("ns", "LoadBalancer", &annotations, &wrong_label));
    }

    #[test]
    fn key_value_lists() {
        let pairs = parse_key_value_list("a:1, b:2 ,url:http://x").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("url".to_string(), "http://x".to_string()),
            ]
        );

        assert!(parse_key_value_list("").unwrap().is_empty());
        assert!(parse_key_value_list("novalue").is_err());
        assert!(parse_key_value_list(":v").is_err());
    }

    #[test]
    fn lists_drop_empty_items() {
        assert_eq!(parse_list("a,,b , "), vec!["a".to_string(), "b".to_string()]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn validation() {
        let config = SyncConfig::new(RegistryConfig::new("https://netbox.example.com", "t0ken"));
        assert!(config.validate().is_ok());

        let config = SyncConfig::new(RegistryConfig::new("netbox.example.com", "t0ken"));
        assert!(config.validate().is_err());

        let config = SyncConfig::new(RegistryConfig::new("https://netbox.example.com", ""));
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new(RegistryConfig::new("https://n.example.com", "t"));
        config.state_store = StateStoreConfig::File {
            path: String::new(),
        };
        assert!(config.validate().is_err());

        config.state_store = StateStoreConfig::Memory;
        config.kubernetes.api_token = Some("tok".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let registry = RegistryConfig::new("https://netbox.example.com", "secret_netbox_token");
        let kube = KubernetesConfig {
            api_url: Some("https://10.0.0.1".to_string()),
            api_token: Some("secret_kube_token".to_string()),
        };

        let out = format!("{:?} {:?}", registry, kube);
        assert!(!out.contains("secret_netbox_token"));
        assert!(!out.contains("secret_kube_token"));
        assert!(out.contains("<REDACTED>"));
    }
}

// # NetBox Registry Gateway
//
// RegistryGateway implementation backed by the NetBox IPAM REST API.
//
// ## Behavior
//
// - One HTTP request per gateway call
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - No retry logic: a failed call is a per-item failure for the reconciler,
//   and the next run retries it
// - No caching: the persisted prefix list is owned by the StateStore
//
// ## Security
//
// - API token never appears in logs or `Debug` output
// - Gateway fails fast if the token is empty
//
// ## API Reference
//
// - Create prefix: POST `/api/ipam/prefixes/`
// - Delete prefix: DELETE `/api/ipam/prefixes/:id/`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use svcsync_core::config::RegistryConfig;
use svcsync_core::model::{PrefixId, PrefixRequest};
use svcsync_core::traits::RegistryGateway;
use svcsync_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the prefix collection, relative to the base URL
const PREFIXES_PATH: &str = "/api/ipam/prefixes/";

/// NetBox prefix gateway
///
/// Stateless and single-shot. Each created prefix is marked active, not a
/// pool, and fully utilized, and carries the configured custom fields.
pub struct NetboxGateway {
    /// Base URL without trailing slash
    base_url: String,

    /// NetBox API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Cluster name used in prefix descriptions
    cluster: String,

    /// Custom fields attached to every created prefix
    custom_fields: Vec<(String, String)>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Hides the API token
impl std::fmt::Debug for NetboxGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetboxGateway")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .field("cluster", &self.cluster)
            .field("custom_fields", &self.custom_fields)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedPrefix {
    id: PrefixId,
}

impl NetboxGateway {
    /// Create a gateway for the given registry and cluster
    ///
    /// # Errors
    ///
    /// - Empty API token or malformed URL
    /// - HTTP client construction failure
    pub fn new(config: &RegistryConfig, cluster: impl Into<String>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            cluster: cluster.into(),
            custom_fields: config.custom_fields.clone(),
            client,
        })
    }

    fn prefixes_url(&self) -> String {
        format!("{}{}", self.base_url, PREFIXES_PATH)
    }

    fn prefix_url(&self, prefix_id: PrefixId) -> String {
        format!("{}{}{}/", self.base_url, PREFIXES_PATH, prefix_id)
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.api_token)
    }

    /// Human-readable description stored on the prefix
    ///
    /// `{ip}-{service}-{namespace}-{cluster}` for an IP literal,
    /// `{ip}-{hostname}-{service}-{namespace}-{cluster}` for a resolved name.
    pub fn description(&self, request: &PrefixRequest) -> String {
        if request.resolved_from_dns {
            format!(
                "{}-{}-{}-{}-{}",
                request.address,
                request.external_address,
                request.service_name,
                request.namespace,
                self.cluster
            )
        } else {
            format!(
                "{}-{}-{}-{}",
                request.address, request.service_name, request.namespace, self.cluster
            )
        }
    }

    /// JSON body of the create call
    pub fn create_payload(&self, request: &PrefixRequest) -> Value {
        let custom_fields: Map<String, Value> = self
            .custom_fields
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        json!({
            "prefix": request.prefix,
            "description": self.description(request),
            "status": "active",
            "is_pool": false,
            "mark_utilized": true,
            "custom_fields": custom_fields,
        })
    }
}

/// Map a non-success response to an error
async fn status_error(response: reqwest::Response, action: &str) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "NetBox rejected the API token or it lacks permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", action, status)),
        429 => Error::rate_limited(format!("NetBox rate limit exceeded. Status: {}", status)),
        500..=599 => Error::backend(
            "netbox",
            format!("NetBox server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::backend(
            "netbox",
            format!("{} failed: {} - {}", action, status, error_text),
        ),
    }
}

#[async_trait]
impl RegistryGateway for NetboxGateway {
    /// Create one prefix
    ///
    /// ```http
    /// POST /api/ipam/prefixes/
    /// Authorization: Token <token>
    /// {"prefix": "198.51.100.7/32", "description": "...", "status": "active", ...}
    /// ```
    async fn create_prefix(&self, request: &PrefixRequest) -> Result<PrefixId> {
        let payload = self.create_payload(request);
        tracing::debug!("Creating NetBox prefix {}", request.prefix);

        let response = self
            .client
            .post(self.prefixes_url())
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(response, &format!("Create prefix {}", request.prefix)).await);
        }

        let created: CreatedPrefix = response.json().await.map_err(|e| {
            Error::backend("netbox", format!("Failed to parse create response: {}", e))
        })?;

        Ok(created.id)
    }

    /// Delete one prefix by id
    ///
    /// ```http
    /// DELETE /api/ipam/prefixes/:id/
    /// Authorization: Token <token>
    /// ```
    async fn delete_prefix(&self, prefix_id: PrefixId) -> Result<()> {
        tracing::debug!("Deleting NetBox prefix {}", prefix_id);

        let response = self
            .client
            .delete(self.prefix_url(prefix_id))
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(response, &format!("Delete prefix {}", prefix_id)).await);
        }

        Ok(())
    }

    fn gateway_name(&self) -> &'static str {
        "netbox"
    }
}

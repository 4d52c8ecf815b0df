//! Minimal Kubernetes REST client
//!
//! Only the handful of core/v1 calls the syncer needs: JSON in, JSON out,
//! status codes mapped onto [`svcsync_core::Error`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use svcsync_core::config::KubernetesConfig;
use svcsync_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Service account mount inside a pod
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Kubernetes API client
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct KubeClient {
    /// API server URL without trailing slash
    base_url: String,

    /// Bearer token
    /// ⚠️ NEVER log this value
    token: Option<String>,

    client: reqwest::Client,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl KubeClient {
    /// Build a client from configuration
    ///
    /// An explicit `api_url` wins; otherwise the in-cluster service account
    /// is used.
    pub async fn from_config(config: &KubernetesConfig) -> Result<Self> {
        match &config.api_url {
            Some(url) => Self::explicit(url, config.api_token.clone()),
            None => Self::in_cluster().await,
        }
    }

    /// Client for an explicit API server URL
    pub fn explicit(url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Client using the pod's service account
    ///
    /// Reads `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`, the mounted
    /// token, and the cluster CA certificate.
    pub async fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            Error::config("KUBERNETES_SERVICE_HOST is not set; not running inside a cluster?")
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = tokio::fs::read_to_string(dir.join("token"))
            .await
            .map_err(|e| Error::config(format!("Cannot read service account token: {}", e)))?;
        let ca = tokio::fs::read(dir.join("ca.crt"))
            .await
            .map_err(|e| Error::config(format!("Cannot read cluster CA certificate: {}", e)))?;
        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| Error::config(format!("Invalid cluster CA certificate: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .add_root_certificate(certificate)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: in_cluster_url(&host, &port),
            token: Some(token.trim().to_string()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET a JSON object
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;
        Self::parse(response, path).await
    }

    /// POST a JSON object (create)
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;
        Self::parse(response, path).await
    }

    /// PUT a JSON object (replace)
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;
        Self::parse(response, path).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "Kubernetes API denied {}: {} - {}",
                    path, status, error_text
                )),
                404 => Error::not_found(format!("Kubernetes object not found: {}", path)),
                429 => {
                    Error::rate_limited(format!("Kubernetes API throttled {}: {}", path, status))
                }
                _ => Error::backend(
                    "kubernetes",
                    format!("{} returned {} - {}", path, status, error_text),
                ),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::backend("kubernetes", format!("Failed to parse {}: {}", path, e)))
    }
}

fn in_cluster_url(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{}]:{}", host, port)
    } else {
        format!("https://{}:{}", host, port)
    }
}

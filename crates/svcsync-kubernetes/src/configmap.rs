// # ConfigMap State Store
//
// Keeps the prefix list in a ConfigMap, so the syncer needs no volume.
//
// ## Document
//
// `data["prefixes.json"]` holds the JSON array, pretty-printed with a
// two-space indent. A missing ConfigMap is created on first load with `[]`.

use async_trait::async_trait;
use serde_json::{Value, json};
use svcsync_core::model::{PrefixRecord, parse_document};
use svcsync_core::traits::StateStore;
use svcsync_core::{Error, Result};
use tracing::info;

use crate::client::KubeClient;

/// Key of the document inside the ConfigMap
pub const DOCUMENT_KEY: &str = "prefixes.json";

/// StateStore backed by a single ConfigMap
#[derive(Debug, Clone)]
pub struct ConfigMapStateStore {
    client: KubeClient,
    namespace: String,
    name: String,
}

impl ConfigMapStateStore {
    pub fn new(client: KubeClient, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn collection_path(&self) -> String {
        format!("/api/v1/namespaces/{}/configmaps", self.namespace)
    }

    fn object_path(&self) -> String {
        format!("{}/{}", self.collection_path(), self.name)
    }

    fn new_object(&self, document: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
            },
            "data": { DOCUMENT_KEY: document },
        })
    }

    async fn create(&self, document: &str) -> Result<()> {
        let _: Value = self
            .client
            .post(&self.collection_path(), &self.new_object(document))
            .await?;
        Ok(())
    }
}

/// Parse the document stored in a ConfigMap object
///
/// A missing `data` section, missing key, empty value or `null` document is
/// an empty list.
pub fn decode_document(object: &Value) -> Result<Vec<PrefixRecord>> {
    match object
        .get("data")
        .and_then(|data| data.get(DOCUMENT_KEY))
        .and_then(Value::as_str)
    {
        Some(document) => Ok(parse_document(document)?),
        None => Ok(Vec::new()),
    }
}

/// Serialize records into the stored document
pub fn encode_document(records: &[PrefixRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[async_trait]
impl StateStore for ConfigMapStateStore {
    async fn load(&self) -> Result<Vec<PrefixRecord>> {
        match self.client.get::<Value>(&self.object_path()).await {
            Ok(object) => {
                let records = decode_document(&object).map_err(|e| {
                    Error::state_store(format!(
                        "ConfigMap {}/{} holds an unreadable document: {}",
                        self.namespace, self.name, e
                    ))
                })?;
                info!(
                    "Loaded {} prefix(es) from ConfigMap {}/{}",
                    records.len(),
                    self.namespace,
                    self.name
                );
                Ok(records)
            }
            Err(e) if e.is_not_found() => {
                self.create("[]").await.map_err(|e| {
                    Error::state_store(format!(
                        "Cannot create ConfigMap {}/{}: {}",
                        self.namespace, self.name, e
                    ))
                })?;
                info!(
                    "Created new ConfigMap {}/{} with empty prefix list",
                    self.namespace, self.name
                );
                Ok(Vec::new())
            }
            Err(e) => Err(Error::state_store(format!(
                "Cannot read ConfigMap {}/{}: {}",
                self.namespace, self.name, e
            ))),
        }
    }

    async fn save(&self, records: &[PrefixRecord]) -> Result<()> {
        let document = encode_document(records)?;

        match self.client.get::<Value>(&self.object_path()).await {
            Ok(mut object) => {
                object["data"] = json!({ DOCUMENT_KEY: document });
                let _: Value = self
                    .client
                    .put(&self.object_path(), &object)
                    .await
                    .map_err(|e| {
                        Error::state_store(format!(
                            "Cannot update ConfigMap {}/{}: {}",
                            self.namespace, self.name, e
                        ))
                    })?;
                info!("Updated ConfigMap {}/{}", self.namespace, self.name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.create(&document).await.map_err(|e| {
                    Error::state_store(format!(
                        "Cannot create ConfigMap {}/{}: {}",
                        self.namespace, self.name, e
                    ))
                })?;
                info!("Created ConfigMap {}/{}", self.namespace, self.name);
                Ok(())
            }
            Err(e) => Err(Error::state_store(format!(
                "Cannot read ConfigMap {}/{}: {}",
                self.namespace, self.name, e
            ))),
        }
    }

    fn store_name(&self) -> &'static str {
        "configmap"
    }
}

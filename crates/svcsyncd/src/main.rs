// # svcsyncd - Service Sync Daemon
//
// Thin integration layer: all reconciliation logic lives in svcsync-core.
// Configuration is via environment variables only. Each invocation performs
// exactly one sync; schedule it with a CronJob or a systemd timer.
//
// The svcsyncd binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the Kubernetes provider, NetBox gateway and state store
// 4. Running the sync engine once and mapping the outcome to an exit code
//
// ## Configuration
//
// ### NetBox
// - `NETBOX_URL`: NetBox base URL (required)
// - `NETBOX_API_TOKEN`: API token (required)
// - `NETBOX_CUSTOM_FIELD`: `key:value,...` custom fields set on each prefix
//
// ### Kubernetes
// - `KUBERNETES_CLUSTER`: Cluster name used in prefix descriptions (default: default)
// - `KUBERNETES_NAMESPACE_FILTER`: Comma-separated namespaces (default: all)
// - `KUBERNETES_TYPE_FILTER`: Comma-separated service types (default: LoadBalancer)
// - `KUBERNETES_SERVICE_ANNOTATION_FILTER`: Required annotations, `key:value,...`
// - `KUBERNETES_SERVICE_LABEL_FILTER`: Required labels, `key:value,...`
// - `KUBERNETES_API_URL`: Explicit API server URL (default: in-cluster)
// - `KUBERNETES_API_TOKEN`: Bearer token for the explicit API server
//
// ### State Store
// - `SYNC_STATE_STORE_TYPE`: configmap, file or memory (default: configmap)
// - `KUBERNETES_CONFIGMAP_NAME`: State ConfigMap name
// - `KUBERNETES_CONFIGMAP_NAMESPACE`: State ConfigMap namespace (default: default)
// - `SYNC_STATE_STORE_PATH`: Path to state file (for file store)
//
// ### Run
// - `SYNC_MODE`: live or dry-run (default: live)
// - `SYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export NETBOX_URL=https://netbox.example.com
// export NETBOX_API_TOKEN=0123456789abcdef0123456789abcdef01234567
// export KUBERNETES_CLUSTER=prod-eu
// export KUBERNETES_SERVICE_ANNOTATION_FILTER=netbox.io/sync:true
//
// svcsyncd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use svcsync_core::config::{
    DEFAULT_CONFIGMAP_NAME, KubernetesConfig, RegistryConfig, ServiceFilter, StateStoreConfig,
    SyncConfig, parse_key_value_list, parse_list,
};
use svcsync_core::state::{FileStateStore, MemoryStateStore};
use svcsync_core::traits::StateStore;
use svcsync_core::{SyncEngine, SyncEvent, SyncReport};
use svcsync_kubernetes::{ConfigMapStateStore, KubeClient, KubernetesServiceProvider};
use svcsync_netbox::NetboxGateway;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible run outcomes
///
/// - 0: Every item reconciled
/// - 1: Configuration or startup error
/// - 2: Runtime error (state unreadable, listing failed, save failed)
/// - 3: Run completed but some items failed; they are retried next run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    Clean = 0,
    ConfigError = 1,
    RuntimeError = 2,
    PartialFailure = 3,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    netbox_url: String,
    netbox_api_token: String,
    netbox_custom_fields: String,
    cluster: String,
    namespace_filter: String,
    type_filter: String,
    annotation_filter: String,
    label_filter: String,
    api_url: Option<String>,
    api_token: Option<String>,
    state_store_type: String,
    configmap_name: String,
    configmap_namespace: String,
    state_store_path: Option<String>,
    mode: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            netbox_url: or("NETBOX_URL", ""),
            netbox_api_token: or("NETBOX_API_TOKEN", ""),
            netbox_custom_fields: or("NETBOX_CUSTOM_FIELD", ""),
            cluster: or("KUBERNETES_CLUSTER", "default"),
            namespace_filter: or("KUBERNETES_NAMESPACE_FILTER", ""),
            type_filter: or("KUBERNETES_TYPE_FILTER", "LoadBalancer"),
            annotation_filter: or("KUBERNETES_SERVICE_ANNOTATION_FILTER", ""),
            label_filter: or("KUBERNETES_SERVICE_LABEL_FILTER", ""),
            api_url: lookup("KUBERNETES_API_URL").filter(|s| !s.is_empty()),
            api_token: lookup("KUBERNETES_API_TOKEN").filter(|s| !s.is_empty()),
            state_store_type: or("SYNC_STATE_STORE_TYPE", "configmap"),
            configmap_name: or("KUBERNETES_CONFIGMAP_NAME", DEFAULT_CONFIGMAP_NAME),
            configmap_namespace: or("KUBERNETES_CONFIGMAP_NAMESPACE", "default"),
            state_store_path: lookup("SYNC_STATE_STORE_PATH"),
            mode: or("SYNC_MODE", "live"),
            log_level: or("SYNC_LOG_LEVEL", "info"),
        }
    }

    /// Validate the configuration
    ///
    /// Checks required fields, placeholder tokens, enumerated values and the
    /// file store path. URL schemes and filter syntax are checked when the
    /// typed configuration is built.
    fn validate(&self) -> Result<()> {
        if self.netbox_url.is_empty() {
            anyhow::bail!(
                "NETBOX_URL is required. \
                Set it via: export NETBOX_URL=https://netbox.example.com"
            );
        }

        if self.netbox_api_token.is_empty() {
            anyhow::bail!(
                "NETBOX_API_TOKEN is required. \
                Set it via: export NETBOX_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.netbox_api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("changeme")
            || token_lower == "token"
        {
            anyhow::bail!(
                "NETBOX_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your NetBox user profile."
            );
        }

        if self.cluster.trim().is_empty() {
            anyhow::bail!("KUBERNETES_CLUSTER cannot be empty");
        }

        match self.state_store_type.as_str() {
            "configmap" => {
                if self.configmap_name.is_empty() || self.configmap_namespace.is_empty() {
                    anyhow::bail!(
                        "KUBERNETES_CONFIGMAP_NAME and KUBERNETES_CONFIGMAP_NAMESPACE \
                        cannot be empty when SYNC_STATE_STORE_TYPE=configmap"
                    );
                }
            }
            "file" => match self.state_store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "SYNC_STATE_STORE_PATH is required when SYNC_STATE_STORE_TYPE=file. \
                    Set it via: export SYNC_STATE_STORE_PATH=/var/lib/svcsync/prefixes.json"
                ),
                Some(_) => {}
            },
            "memory" => {}
            _ => anyhow::bail!(
                "SYNC_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: configmap, file, memory",
                self.state_store_type
            ),
        }

        match self.mode.as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "SYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the typed configuration used by the engine and adapters
    fn to_sync_config(&self) -> Result<SyncConfig> {
        let mut registry = RegistryConfig::new(&self.netbox_url, &self.netbox_api_token);
        registry.custom_fields = parse_key_value_list(&self.netbox_custom_fields)
            .map_err(|e| anyhow::anyhow!("NETBOX_CUSTOM_FIELD: {}", e))?;

        let filter = ServiceFilter {
            namespaces: parse_list(&self.namespace_filter),
            service_types: parse_list(&self.type_filter),
            annotations: parse_key_value_list(&self.annotation_filter)
                .map_err(|e| anyhow::anyhow!("KUBERNETES_SERVICE_ANNOTATION_FILTER: {}", e))?,
            labels: parse_key_value_list(&self.label_filter)
                .map_err(|e| anyhow::anyhow!("KUBERNETES_SERVICE_LABEL_FILTER: {}", e))?,
        };

        let state_store = match self.state_store_type.as_str() {
            "file" => StateStoreConfig::File {
                path: self.state_store_path.clone().unwrap_or_default(),
            },
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::ConfigMap {
                namespace: self.configmap_namespace.clone(),
                name: self.configmap_name.clone(),
            },
        };

        let mut config = SyncConfig::new(registry);
        config.cluster = self.cluster.clone();
        config.filter = filter;
        config.kubernetes = KubernetesConfig {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
        };
        config.state_store = state_store;
        config.dry_run = self.mode == "dry-run";

        config.validate()?;
        Ok(config)
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let sync_config = match config.to_sync_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting svcsyncd for cluster {}", sync_config.cluster);
    if sync_config.dry_run {
        warn!("Running in DRY-RUN mode - NetBox and the state store will not be modified");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(sync_config)).into()
}

/// Build the components and run one sync
async fn run(config: SyncConfig) -> SyncExitCode {
    let (engine, events) = match build_engine(&config).await {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {}", e);
            return SyncExitCode::ConfigError;
        }
    };

    let result = engine.run_once().await;
    drop(engine);
    log_events(events).await;

    match result {
        Ok(report) => exit_code_for(&report),
        Err(e) => {
            error!("Sync failed: {}", e);
            SyncExitCode::RuntimeError
        }
    }
}

async fn build_engine(config: &SyncConfig) -> Result<(SyncEngine, mpsc::Receiver<SyncEvent>)> {
    let kube = KubeClient::from_config(&config.kubernetes).await?;
    info!("Kubernetes API: {}", kube.base_url());

    let state_store: Box<dyn StateStore> = match &config.state_store {
        StateStoreConfig::ConfigMap { namespace, name } => {
            Box::new(ConfigMapStateStore::new(kube.clone(), namespace, name))
        }
        StateStoreConfig::File { path } => Box::new(FileStateStore::new(path).await?),
        StateStoreConfig::Memory => {
            warn!("Memory state store selected: every service is treated as new on each run");
            Box::new(MemoryStateStore::new())
        }
    };
    info!("State store type: {}", config.state_store.type_name());

    let provider = Box::new(KubernetesServiceProvider::new(kube));
    let gateway = Box::new(NetboxGateway::new(&config.registry, &config.cluster)?);

    Ok(SyncEngine::new(provider, gateway, state_store, config)?)
}

async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

fn exit_code_for(report: &SyncReport) -> SyncExitCode {
    if report.dry_run {
        info!(
            "Dry run finished in {} ms: {} service(s) would be created, {} prefix(es) deleted",
            report.duration().num_milliseconds(),
            report.planned_creates.len(),
            report.planned_deletes.len()
        );
    } else {
        info!(
            "Sync finished in {} ms: {} created, {} deleted, {} tracked",
            report.duration().num_milliseconds(),
            report.created.len(),
            report.deleted.len(),
            report.records.len()
        );
    }

    if report.is_clean() {
        return SyncExitCode::Clean;
    }

    for failure in &report.errors {
        warn!("Not reconciled: {}", failure);
    }
    SyncExitCode::PartialFailure
}

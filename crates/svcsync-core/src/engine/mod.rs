//! One-shot sync engine
//!
//! The SyncEngine is responsible for:
//! - Loading the prior record set from the StateStore
//! - Listing the desired services via the ServiceProvider
//! - Reconciling the two through the RegistryGateway
//! - Persisting the resulting record set
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────────┐
//! │ StateStore  │   │ ServiceProvider │
//! │ (load)      │   │ (list)          │
//! └─────────────┘   └─────────────────┘
//!        │                   │
//!        └─────────┬─────────┘
//!                  ▼
//!          ┌──────────────┐        ┌─────────────────┐
//!          │  SyncEngine  │───────▶│ RegistryGateway │
//!          └──────────────┘        │ (create/delete) │
//!                  │               └─────────────────┘
//!        ┌─────────┴─────────┐
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │ StateStore  │     │   Events    │
//! │ (save)      │     │  (notify)   │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Failure Policy
//!
//! 1. Load or list fails: the run aborts, nothing is mutated or saved
//! 2. A single create/delete fails: recorded, the run continues
//! 3. After reconciliation the state is always saved, whatever failed

pub mod expand;
pub mod reconcile;

pub use expand::{Expansion, expand_service};
pub use reconcile::{ReconcileOutcome, ReconcilePlan, Reconciler, plan};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::address::SystemResolver;
use crate::config::{ServiceFilter, SyncConfig};
use crate::error::{Error, ReconcileError, Result};
use crate::model::{ObservedService, PrefixId, PrefixRecord};
use crate::traits::{AddressResolver, RegistryGateway, ServiceProvider, StateStore};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Prior state loaded
    Started { prior_records: usize },

    /// Desired state listed
    DesiredStateListed { services: usize },

    /// A prefix was created in the registry
    PrefixCreated {
        prefix_id: PrefixId,
        prefix: String,
        external_address: String,
    },

    /// A prefix was deleted from the registry
    PrefixDeleted { prefix_id: PrefixId, prefix: String },

    /// Dry-run: a service would be created
    CreatePlanned { external_address: String },

    /// Dry-run: a record would be deleted
    DeletePlanned { prefix_id: PrefixId },

    /// A single create/delete/resolution failed
    ItemFailed { error: ReconcileError },

    /// The record set was persisted
    StateSaved { records: usize },

    /// The run finished
    Finished {
        created: usize,
        deleted: usize,
        failed: usize,
    },
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Number of prior records loaded
    pub prior_records: usize,
    /// Number of desired services listed
    pub desired_services: usize,
    /// Records created this run
    pub created: Vec<PrefixRecord>,
    /// Records deleted this run
    pub deleted: Vec<PrefixRecord>,
    /// Services that would be created (dry-run only)
    pub planned_creates: Vec<ObservedService>,
    /// Records that would be deleted (dry-run only)
    pub planned_deletes: Vec<PrefixRecord>,
    /// The record set persisted at the end of the run (prior set on dry-run)
    pub records: Vec<PrefixRecord>,
    /// Per-item failures
    pub errors: Vec<ReconcileError>,
}

impl SyncReport {
    /// True when no per-item failure occurred
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

/// Core sync engine
///
/// The engine performs exactly one reconciliation per [`SyncEngine::run_once()`]
/// call. It keeps no state between runs: everything it knows about the
/// registry comes from the StateStore.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run_once()`]
/// 3. Drop
pub struct SyncEngine {
    /// Desired-state source
    provider: Box<dyn ServiceProvider>,

    /// Registry mutations
    gateway: Box<dyn RegistryGateway>,

    /// Prior-state persistence
    state_store: Box<dyn StateStore>,

    /// DNS resolution for hostname addresses
    resolver: Box<dyn AddressResolver>,

    /// Which services to list
    filter: ServiceFilter,

    /// Plan only
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `provider`: service provider implementation
    /// - `gateway`: registry gateway implementation
    /// - `state_store`: state store implementation
    /// - `config`: sync configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        provider: Box<dyn ServiceProvider>,
        gateway: Box<dyn RegistryGateway>,
        state_store: Box<dyn StateStore>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            provider,
            gateway,
            state_store,
            resolver: Box::new(SystemResolver::new()),
            filter: config.filter.clone(),
            dry_run: config.dry_run,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Replace the system resolver
    pub fn with_resolver(mut self, resolver: Box<dyn AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: the run completed; per-item failures are in
    ///   `report.errors`
    /// - `Err(Error)`: loading, listing or saving failed
    pub async fn run_once(&self) -> Result<SyncReport> {
        let started_at = Utc::now();

        let prior = self.state_store.load().await.map_err(|e| {
            error!("Cannot load prior state from {}: {}", self.state_store.store_name(), e);
            Error::state_store(format!("load failed: {}", e))
        })?;
        info!("Loaded {} prefix record(s)", prior.len());
        self.emit_event(SyncEvent::Started {
            prior_records: prior.len(),
        });

        let desired = self.provider.list_services(&self.filter).await.map_err(|e| {
            error!("Cannot list services from {}: {}", self.provider.provider_name(), e);
            Error::service_provider(format!("listing failed: {}", e))
        })?;
        info!("Fetched {} service(s)", desired.len());
        self.emit_event(SyncEvent::DesiredStateListed {
            services: desired.len(),
        });

        if self.dry_run {
            return Ok(self.dry_run_report(started_at, prior, desired));
        }

        let reconciler = Reconciler::new(self.gateway.as_ref(), self.resolver.as_ref());
        let outcome = reconciler.reconcile(&prior, &desired).await;

        for record in &outcome.created {
            self.emit_event(SyncEvent::PrefixCreated {
                prefix_id: record.prefix_id,
                prefix: record.prefix.clone(),
                external_address: record.external_address.clone(),
            });
        }
        for record in &outcome.deleted {
            self.emit_event(SyncEvent::PrefixDeleted {
                prefix_id: record.prefix_id,
                prefix: record.prefix.clone(),
            });
        }
        for error in &outcome.errors {
            self.emit_event(SyncEvent::ItemFailed {
                error: error.clone(),
            });
        }

        info!("Saving {} prefix record(s)", outcome.records.len());
        self.state_store.save(&outcome.records).await.map_err(|e| {
            error!(
                "Cannot save {} prefix record(s) to {}: {}",
                outcome.records.len(),
                self.state_store.store_name(),
                e
            );
            Error::state_store(format!("save failed: {}", e))
        })?;
        self.emit_event(SyncEvent::StateSaved {
            records: outcome.records.len(),
        });

        if !outcome.errors.is_empty() {
            warn!("Run finished with {} failed item(s)", outcome.errors.len());
        }
        self.emit_event(SyncEvent::Finished {
            created: outcome.created.len(),
            deleted: outcome.deleted.len(),
            failed: outcome.errors.len(),
        });

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: false,
            prior_records: prior.len(),
            desired_services: desired.len(),
            created: outcome.created,
            deleted: outcome.deleted,
            planned_creates: Vec::new(),
            planned_deletes: Vec::new(),
            records: outcome.records,
            errors: outcome.errors,
        })
    }

    fn dry_run_report(
        &self,
        started_at: DateTime<Utc>,
        prior: Vec<PrefixRecord>,
        desired: Vec<ObservedService>,
    ) -> SyncReport {
        let plan = plan(&prior, &desired);

        for service in &plan.to_create {
            info!("[DRY-RUN] Would create prefix(es) for {}", service);
            self.emit_event(SyncEvent::CreatePlanned {
                external_address: service.external_address.clone(),
            });
        }
        for record in &plan.to_delete {
            info!(
                "[DRY-RUN] Would delete prefix {} ({})",
                record.prefix_id, record.prefix
            );
            self.emit_event(SyncEvent::DeletePlanned {
                prefix_id: record.prefix_id,
            });
        }

        let planned_creates: Vec<ObservedService> =
            plan.to_create.into_iter().cloned().collect();
        let planned_deletes: Vec<PrefixRecord> = plan.to_delete.into_iter().cloned().collect();

        self.emit_event(SyncEvent::Finished {
            created: 0,
            deleted: 0,
            failed: 0,
        });

        SyncReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: true,
            prior_records: prior.len(),
            desired_services: desired.len(),
            created: Vec::new(),
            deleted: Vec::new(),
            planned_creates,
            planned_deletes,
            records: prior,
            errors: Vec::new(),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}

//! Test doubles and common utilities for contract tests
//!
//! Every double is `Clone` and shares its counters between clones, so a test
//! can hand one clone to the engine and inspect the other afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use svcsync_core::config::{RegistryConfig, ServiceFilter, StateStoreConfig, SyncConfig};
use svcsync_core::error::{Error, Result};
use svcsync_core::model::{ObservedService, PrefixId, PrefixRecord, PrefixRequest};
use svcsync_core::traits::{AddressResolver, RegistryGateway, ServiceProvider, StateStore};

/// A registry gateway that assigns sequential ids and can be told to fail
#[derive(Clone)]
pub struct MockGateway {
    next_id: Arc<AtomicI64>,
    create_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    created: Arc<Mutex<Vec<PrefixRequest>>>,
    deleted: Arc<Mutex<Vec<PrefixId>>>,
    failing_prefixes: Arc<Mutex<HashSet<String>>>,
    failing_ids: Arc<Mutex<HashSet<PrefixId>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::starting_at(100)
    }

    /// Assign ids starting at `first_id`
    pub fn starting_at(first_id: PrefixId) -> Self {
        Self {
            next_id: Arc::new(AtomicI64::new(first_id)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            created: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            failing_prefixes: Arc::new(Mutex::new(HashSet::new())),
            failing_ids: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make create calls for this CIDR fail
    pub fn fail_create(&self, prefix: &str) {
        self.failing_prefixes
            .lock()
            .unwrap()
            .insert(prefix.to_string());
    }

    /// Make delete calls for this id fail
    pub fn fail_delete(&self, prefix_id: PrefixId) {
        self.failing_ids.lock().unwrap().insert(prefix_id);
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn total_call_count(&self) -> usize {
        self.create_call_count() + self.delete_call_count()
    }

    /// Requests the registry accepted
    pub fn created(&self) -> Vec<PrefixRequest> {
        self.created.lock().unwrap().clone()
    }

    /// Ids the registry deleted
    pub fn deleted(&self) -> Vec<PrefixId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryGateway for MockGateway {
    async fn create_prefix(&self, request: &PrefixRequest) -> Result<PrefixId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_prefixes.lock().unwrap().contains(&request.prefix) {
            return Err(Error::backend("mock", format!("create {} refused", request.prefix)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(request.clone());
        Ok(id)
    }

    async fn delete_prefix(&self, prefix_id: PrefixId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_ids.lock().unwrap().contains(&prefix_id) {
            return Err(Error::backend("mock", format!("delete {} refused", prefix_id)));
        }

        self.deleted.lock().unwrap().push(prefix_id);
        Ok(())
    }

    fn gateway_name(&self) -> &'static str {
        "mock"
    }
}

/// A resolver backed by a fixed table; unknown names fail to resolve
#[derive(Clone, Default)]
pub struct MockResolver {
    table: Arc<HashMap<String, Vec<Ipv4Addr>>>,
    calls: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn new(entries: &[(&str, &[[u8; 4]])]) -> Self {
        let table = entries
            .iter()
            .map(|(name, ips)| {
                (
                    name.to_string(),
                    ips.iter().map(|octets| Ipv4Addr::from(*octets)).collect(),
                )
            })
            .collect();

        Self {
            table: Arc::new(table),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressResolver for MockResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(host)
            .cloned()
            .ok_or_else(|| Error::resolution(format!("no such host: {}", host)))
    }
}

/// A service provider returning a fixed list, or failing
#[derive(Clone)]
pub struct StaticServiceProvider {
    services: Arc<Vec<ObservedService>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    last_filter: Arc<Mutex<Option<ServiceFilter>>>,
}

impl StaticServiceProvider {
    pub fn new(services: Vec<ObservedService>) -> Self {
        Self {
            services: Arc::new(services),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            last_filter: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<ServiceFilter> {
        self.last_filter.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceProvider for StaticServiceProvider {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ObservedService>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());

        if self.fail {
            return Err(Error::service_provider("cluster unreachable"));
        }
        Ok(self.services.as_ref().clone())
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}

/// A state store that tracks calls and can fail on load or save
#[derive(Clone)]
pub struct MockStateStore {
    records: Arc<Mutex<Vec<PrefixRecord>>>,
    load_calls: Arc<AtomicUsize>,
    save_calls: Arc<AtomicUsize>,
    fail_load: bool,
    fail_save: bool,
}

impl MockStateStore {
    pub fn new(records: Vec<PrefixRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            load_calls: Arc::new(AtomicUsize::new(0)),
            save_calls: Arc::new(AtomicUsize::new(0)),
            fail_load: false,
            fail_save: false,
        }
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_save(records: Vec<PrefixRecord>) -> Self {
        Self {
            fail_save: true,
            ..Self::new(records)
        }
    }

    pub fn records(&self) -> Vec<PrefixRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn load_call_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn save_call_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn load(&self) -> Result<Vec<PrefixRecord>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(Error::state_store("store unreadable"));
        }
        Ok(self.records())
    }

    async fn save(&self, records: &[PrefixRecord]) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(Error::state_store("store unwritable"));
        }
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}

/// Build a prior record with a predictable prefix
pub fn record(prefix_id: PrefixId, prefix: &str, external_address: &str) -> PrefixRecord {
    PrefixRecord {
        prefix_id,
        prefix: prefix.to_string(),
        external_address: external_address.to_string(),
        service_name: format!("svc-{}", prefix_id),
        namespace: "default".to_string(),
    }
}

/// Build a desired service in the `default` namespace
pub fn service(name: &str, external_address: &str) -> ObservedService {
    ObservedService::new(name, "default", external_address)
}

/// Sorted external addresses of a record set
pub fn addresses(records: &[PrefixRecord]) -> Vec<String> {
    let mut out: Vec<String> = records.iter().map(|r| r.external_address.clone()).collect();
    out.sort();
    out
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    let mut config = SyncConfig::new(RegistryConfig::new(
        "https://netbox.test",
        "test-token",
    ));
    config.state_store = StateStoreConfig::Memory;
    config.filter.service_types = vec!["LoadBalancer".to_string()];
    config
}

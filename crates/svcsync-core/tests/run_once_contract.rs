//! Contract Test: One-Shot Run
//!
//! Verifies the ordering and failure policy of `SyncEngine::run_once()`.
//!
//! Constraints verified:
//! - Load or list failure aborts before any registry call and skips the save
//! - After reconciliation the state is saved even if items failed
//! - A save failure is reported after the mutations happened
//! - Dry-run makes no registry calls and does not save
//! - Events describe what happened
//!
//! If this test fails, the daemon can lose track of registry objects.

mod common;

use common::*;
use svcsync_core::{ReconcileError, SyncEngine, SyncEvent};

fn engine(
    provider: &StaticServiceProvider,
    gateway: &MockGateway,
    store: &MockStateStore,
    resolver: &MockResolver,
    dry_run: bool,
) -> (SyncEngine, tokio::sync::mpsc::Receiver<SyncEvent>) {
    let mut config = minimal_config();
    config.dry_run = dry_run;

    let (engine, rx) = SyncEngine::new(
        Box::new(provider.clone()),
        Box::new(gateway.clone()),
        Box::new(store.clone()),
        &config,
    )
    .expect("valid config");

    (engine.with_resolver(Box::new(resolver.clone())), rx)
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn load_failure_aborts_before_any_mutation() {
    let provider = StaticServiceProvider::new(vec![service("a", "10.0.0.1")]);
    let gateway = MockGateway::new();
    let store = MockStateStore::failing_load();
    let resolver = MockResolver::default();

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);
    let result = engine.run_once().await;

    assert!(result.is_err());
    assert_eq!(provider.call_count(), 0, "listing happens after loading");
    assert_eq!(gateway.total_call_count(), 0);
    assert_eq!(store.save_call_count(), 0);
}

#[tokio::test]
async fn list_failure_aborts_before_any_mutation() {
    let provider = StaticServiceProvider::failing();
    let gateway = MockGateway::new();
    let store = MockStateStore::new(vec![record(1, "10.0.0.1/32", "10.0.0.1")]);
    let resolver = MockResolver::default();

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);
    let result = engine.run_once().await;

    assert!(result.is_err());
    assert_eq!(store.load_call_count(), 1);
    assert_eq!(
        gateway.total_call_count(),
        0,
        "an empty listing must not be mistaken for an empty cluster"
    );
    assert_eq!(store.save_call_count(), 0);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn state_is_saved_despite_item_failures() {
    let provider = StaticServiceProvider::new(vec![
        service("a", "10.1.0.1"),
        service("b", "10.1.0.2"),
    ]);
    let gateway = MockGateway::new();
    gateway.fail_create("10.1.0.2/32");
    gateway.fail_delete(1);
    let store = MockStateStore::new(vec![record(1, "10.0.0.1/32", "10.0.0.1")]);
    let resolver = MockResolver::default();

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);
    let report = engine.run_once().await.unwrap();

    assert_eq!(report.errors.len(), 2);
    assert!(!report.is_clean());
    assert_eq!(store.save_call_count(), 1);

    let saved = store.records();
    assert_eq!(saved, report.records);
    assert_eq!(
        addresses(&saved),
        vec!["10.0.0.1".to_string(), "10.1.0.1".to_string()]
    );
}

#[tokio::test]
async fn save_failure_is_reported_after_mutations() {
    let provider = StaticServiceProvider::new(vec![service("a", "10.1.0.1")]);
    let gateway = MockGateway::new();
    let store = MockStateStore::failing_save(Vec::new());
    let resolver = MockResolver::default();

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);
    let result = engine.run_once().await;

    assert!(result.is_err());
    assert_eq!(gateway.create_call_count(), 1);
    assert_eq!(store.save_call_count(), 1);
}

#[tokio::test]
async fn dry_run_plans_without_mutating() {
    let provider = StaticServiceProvider::new(vec![
        service("a", "10.1.0.1"),
        service("b", "svc.example.com"),
    ]);
    let gateway = MockGateway::new();
    let prior = vec![record(1, "10.0.0.1/32", "10.0.0.1")];
    let store = MockStateStore::new(prior.clone());
    let resolver = MockResolver::new(&[("svc.example.com", &[[192, 0, 2, 1]])]);

    let (engine, mut rx) = engine(&provider, &gateway, &store, &resolver, true);
    let report = engine.run_once().await.unwrap();

    assert!(report.dry_run);
    assert_eq!(gateway.total_call_count(), 0);
    assert_eq!(resolver.call_count(), 0);
    assert_eq!(store.save_call_count(), 0);
    assert_eq!(report.records, prior);
    assert_eq!(report.planned_creates.len(), 2);
    assert_eq!(report.planned_deletes, prior);

    let events = drain(&mut rx);
    assert!(events.contains(&SyncEvent::DeletePlanned { prefix_id: 1 }));
    assert!(events.contains(&SyncEvent::CreatePlanned {
        external_address: "svc.example.com".to_string()
    }));
}

#[tokio::test]
async fn consecutive_runs_are_idempotent() {
    let provider = StaticServiceProvider::new(vec![
        service("a", "198.51.100.7"),
        service("b", "svc.example.com"),
    ]);
    let gateway = MockGateway::new();
    let store = MockStateStore::new(Vec::new());
    let resolver = MockResolver::new(&[("svc.example.com", &[[192, 0, 2, 1], [192, 0, 2, 2]])]);

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);

    let first = engine.run_once().await.unwrap();
    assert_eq!(first.created.len(), 3);
    let calls = gateway.total_call_count();

    let second = engine.run_once().await.unwrap();
    assert!(second.is_clean());
    assert!(second.created.is_empty());
    assert!(second.deleted.is_empty());
    assert_eq!(gateway.total_call_count(), calls);
    assert_eq!(store.records(), first.records);
    assert_eq!(store.save_call_count(), 2);
}

#[tokio::test]
async fn events_follow_the_run() {
    let provider = StaticServiceProvider::new(vec![service("a", "10.1.0.1")]);
    let gateway = MockGateway::starting_at(40);
    let store = MockStateStore::new(vec![record(3, "10.0.0.3/32", "10.0.0.3")]);
    let resolver = MockResolver::default();
    gateway.fail_delete(3);

    let (engine, mut rx) = engine(&provider, &gateway, &store, &resolver, false);
    engine.run_once().await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&SyncEvent::Started { prior_records: 1 }));
    assert!(events.contains(&SyncEvent::DesiredStateListed { services: 1 }));
    assert!(events.contains(&SyncEvent::PrefixCreated {
        prefix_id: 40,
        prefix: "10.1.0.1/32".to_string(),
        external_address: "10.1.0.1".to_string(),
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::ItemFailed {
            error: ReconcileError::RegistryDeleteFailed { prefix_id: 3, .. }
        }
    )));
    assert!(events.contains(&SyncEvent::StateSaved { records: 2 }));
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Finished {
            created: 1,
            deleted: 0,
            failed: 1,
        })
    );
}

#[tokio::test]
async fn filter_is_passed_to_the_provider() {
    let provider = StaticServiceProvider::new(Vec::new());
    let gateway = MockGateway::new();
    let store = MockStateStore::new(Vec::new());
    let resolver = MockResolver::default();

    let (engine, _rx) = engine(&provider, &gateway, &store, &resolver, false);
    engine.run_once().await.unwrap();

    let filter = provider.last_filter().unwrap();
    assert_eq!(filter.service_types, vec!["LoadBalancer".to_string()]);
}

#[tokio::test]
async fn dropped_event_receiver_does_not_fail_the_run() {
    let provider = StaticServiceProvider::new(vec![service("a", "10.1.0.1")]);
    let gateway = MockGateway::new();
    let store = MockStateStore::new(Vec::new());
    let resolver = MockResolver::default();

    let (engine, rx) = engine(&provider, &gateway, &store, &resolver, false);
    drop(rx);

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.created.len(), 1);
}

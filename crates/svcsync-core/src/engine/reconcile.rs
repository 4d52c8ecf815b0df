//! Desired-vs-recorded reconciliation
//!
//! Both sides are joined on the exact `external_address` string. No
//! normalization is applied: `2001:db8::1` and `2001:DB8::1` are different
//! keys, as are `Svc.example.com` and `svc.example.com`.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::engine::expand::{Expansion, expand_service};
use crate::error::ReconcileError;
use crate::model::{ObservedService, PrefixId, PrefixRecord, sort_records};
use crate::traits::{AddressResolver, RegistryGateway};

/// The create-set and delete-set for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<'a> {
    /// Desired services whose address has no prior record, in input order
    pub to_create: Vec<&'a ObservedService>,
    /// Prior records whose address no desired service has, in input order
    pub to_delete: Vec<&'a PrefixRecord>,
}

impl ReconcilePlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Compute the create-set and delete-set
///
/// Duplicate desired addresses are not collapsed: two services sharing an
/// unrecorded address both land in the create-set.
pub fn plan<'a>(prior: &'a [PrefixRecord], desired: &'a [ObservedService]) -> ReconcilePlan<'a> {
    let recorded: HashSet<&str> = prior.iter().map(|r| r.external_address.as_str()).collect();
    let wanted: HashSet<&str> = desired.iter().map(|s| s.external_address.as_str()).collect();

    ReconcilePlan {
        to_create: desired
            .iter()
            .filter(|s| !recorded.contains(s.external_address.as_str()))
            .collect(),
        to_delete: prior
            .iter()
            .filter(|r| !wanted.contains(r.external_address.as_str()))
            .collect(),
    }
}

/// Everything one reconciliation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The new persisted set: prior minus deleted, plus created
    pub records: Vec<PrefixRecord>,
    /// Records the registry accepted this run (including partial expansions)
    pub created: Vec<PrefixRecord>,
    /// Prior records the registry confirmed deleted
    pub deleted: Vec<PrefixRecord>,
    /// Desired services skipped because their address is unrecognized
    pub skipped: Vec<ObservedService>,
    /// Per-item failures
    pub errors: Vec<ReconcileError>,
}

/// Drives registry calls for a plan and assembles the new record set
///
/// Calls are issued one at a time: all creations, then all deletions. A
/// failing item never stops the others.
pub struct Reconciler<'a> {
    gateway: &'a dyn RegistryGateway,
    resolver: &'a dyn AddressResolver,
}

impl<'a> Reconciler<'a> {
    pub fn new(gateway: &'a dyn RegistryGateway, resolver: &'a dyn AddressResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Reconcile `prior` against `desired`
    pub async fn reconcile(
        &self,
        prior: &[PrefixRecord],
        desired: &[ObservedService],
    ) -> ReconcileOutcome {
        let plan = plan(prior, desired);
        let mut outcome = ReconcileOutcome::default();

        debug!(
            "Plan: {} service(s) to create, {} record(s) to delete",
            plan.to_create.len(),
            plan.to_delete.len()
        );

        for service in &plan.to_create {
            self.create_service(service, &mut outcome).await;
        }

        let mut deleted_ids: HashSet<PrefixId> = HashSet::new();
        for record in &plan.to_delete {
            match self.gateway.delete_prefix(record.prefix_id).await {
                Ok(()) => {
                    info!(
                        "Deleted prefix {} ({}) from {}",
                        record.prefix_id,
                        record.prefix,
                        self.gateway.gateway_name()
                    );
                    deleted_ids.insert(record.prefix_id);
                    outcome.deleted.push((*record).clone());
                }
                Err(e) => {
                    warn!("Error deleting prefix {}: {}", record.prefix_id, e);
                    outcome.errors.push(ReconcileError::RegistryDeleteFailed {
                        prefix_id: record.prefix_id,
                        cause: e.to_string(),
                    });
                }
            }
        }

        outcome.records = prior
            .iter()
            .filter(|r| !deleted_ids.contains(&r.prefix_id))
            .cloned()
            .chain(outcome.created.iter().cloned())
            .collect();
        sort_records(&mut outcome.records);

        outcome
    }

    async fn create_service(&self, service: &ObservedService, outcome: &mut ReconcileOutcome) {
        let requests = match expand_service(service, self.resolver).await {
            Ok(Expansion::Requests(requests)) => requests,
            Ok(Expansion::Skipped) => {
                debug!("Skipping {}: address is neither an IP nor a DNS name", service);
                outcome.skipped.push(service.clone());
                return;
            }
            Err(e) => {
                warn!("Error expanding {}: {}", service, e);
                outcome.errors.push(e);
                return;
            }
        };

        if requests.is_empty() {
            warn!("{} resolved to no IPv4 addresses, nothing to create", service);
            return;
        }

        info!("Creating {} prefix(es) for {}", requests.len(), service);

        // Stop at the first failure but keep what was already created: those
        // prefixes exist in the registry and must stay tracked.
        for request in &requests {
            match self.gateway.create_prefix(request).await {
                Ok(prefix_id) => {
                    info!(
                        "Created prefix {} ({}) in {}",
                        prefix_id,
                        request.prefix,
                        self.gateway.gateway_name()
                    );
                    outcome
                        .created
                        .push(PrefixRecord::from_request(prefix_id, request));
                }
                Err(e) => {
                    warn!("Error creating prefix {} for {}: {}", request.prefix, service, e);
                    outcome.errors.push(ReconcileError::RegistryCreateFailed {
                        address: service.external_address.clone(),
                        cause: e.to_string(),
                    });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: PrefixId, address: &str) -> PrefixRecord {
        PrefixRecord {
            prefix_id: id,
            prefix: format!("10.0.0.{}/32", id),
            external_address: address.to_string(),
            service_name: format!("svc-{}", id),
            namespace: "default".to_string(),
        }
    }

    #[test]
    fn plan_for_disjoint_sets_creates_and_deletes_everything() {
        let prior = vec![record(1, "10.0.0.1"), record(2, "old.example.com")];
        let desired = vec![
            ObservedService::new("a", "ns", "10.1.0.1"),
            ObservedService::new("b", "ns", "new.example.com"),
        ];

        let plan = plan(&prior, &desired);
        assert_eq!(plan.to_create, desired.iter().collect::<Vec<_>>());
        assert_eq!(plan.to_delete, prior.iter().collect::<Vec<_>>());
    }

    #[test]
    fn plan_for_identical_addresses_is_empty() {
        let prior = vec![
            record(1, "10.0.0.1"),
            record(2, "lb.example.com"),
            record(3, "lb.example.com"),
        ];
        let desired = vec![
            ObservedService::new("a", "ns", "10.0.0.1"),
            ObservedService::new("b", "ns", "lb.example.com"),
        ];

        assert!(plan(&prior, &desired).is_empty());
    }

    #[test]
    fn plan_matches_on_exact_strings() {
        let prior = vec![record(1, "2001:db8::1"), record(2, "LB.example.com")];
        let desired = vec![
            ObservedService::new("a", "ns", "2001:DB8::1"),
            ObservedService::new("b", "ns", "lb.example.com"),
        ];

        let plan = plan(&prior, &desired);
        assert_eq!(plan.to_create.len(), 2);
        assert_eq!(plan.to_delete.len(), 2);
    }

    #[test]
    fn plan_keeps_duplicate_desired_addresses() {
        let desired = vec![
            ObservedService::new("a", "ns1", "10.0.0.9"),
            ObservedService::new("b", "ns2", "10.0.0.9"),
        ];

        let plan = plan(&[], &desired);
        assert_eq!(plan.to_create.len(), 2);
    }
}

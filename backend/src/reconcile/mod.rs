//! Update-mode reconciliation of incoming records against stored workers.
//!
//! ```text
//! incoming ──▶ identifier sets ──▶ fetch (tenant scoped) ──▶ candidates
//!                  (per kind)         one query per kind      dedup by id
//!
//! for each record:  ExternalId ─▶ Email ─▶ Phone   first hit wins
//! ```
//!
//! The priority list is plain data ([`MATCH_PRIORITY`]) so callers and tests
//! can swap it. When several candidates share the same identifier value, the
//! lowest entity id is chosen to keep runs reproducible.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::api::logs::{log_info, log_info_indent, log_warning};
use crate::error::RepositoryResult;
use crate::models::{IdentifierKind, StoredWorker, Worker};
use crate::store::WorkerRepository;

/// Identifier kinds tried in order, most trusted first.
pub const MATCH_PRIORITY: [IdentifierKind; 3] = [
    IdentifierKind::ExternalId,
    IdentifierKind::Email,
    IdentifierKind::Phone,
];

/// An incoming record paired with the entity it updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRecord {
    pub id: Uuid,
    pub record: Worker,
    pub matched_by: IdentifierKind,
}

/// An update-mode record with no stored counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFound {
    pub label: String,
    /// Normalized identifiers that were tried.
    pub identifiers: BTreeMap<IdentifierKind, String>,
}

impl NotFound {
    pub fn for_record(record: &Worker, priority: &[IdentifierKind]) -> Self {
        Self {
            label: record.label(),
            identifiers: priority
                .iter()
                .filter_map(|kind| record.identifier(*kind).map(|v| (*kind, v)))
                .collect(),
        }
    }
}

/// Partition of an incoming batch.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub matched: Vec<MatchedRecord>,
    pub unmatched: Vec<Worker>,
    priority: Vec<IdentifierKind>,
}

impl Reconciliation {
    /// Report entries for every unmatched record, in input order.
    pub fn not_found(&self) -> Vec<NotFound> {
        self.unmatched
            .iter()
            .map(|r| NotFound::for_record(r, &self.priority))
            .collect()
    }
}

pub struct Reconciler<'a> {
    repo: &'a dyn WorkerRepository,
    priority: Vec<IdentifierKind>,
}

impl<'a> Reconciler<'a> {
    pub fn new(repo: &'a dyn WorkerRepository) -> Self {
        Self {
            repo,
            priority: MATCH_PRIORITY.to_vec(),
        }
    }

    /// Use a custom identifier order. Duplicates are ignored.
    pub fn with_priority(mut self, priority: &[IdentifierKind]) -> Self {
        let mut seen = BTreeSet::new();
        self.priority = priority.iter().copied().filter(|k| seen.insert(*k)).collect();
        self
    }

    pub fn priority(&self) -> &[IdentifierKind] {
        &self.priority
    }

    /// Match each record to at most one stored worker of `tenant_id`.
    pub async fn reconcile(
        &self,
        incoming: Vec<Worker>,
        tenant_id: Uuid,
    ) -> RepositoryResult<Reconciliation> {
        let candidates = self.fetch_candidates(&incoming, tenant_id).await?;
        log_info(format!(
            "🔎 {} existing worker(s) share an identifier with the file",
            candidates.len()
        ));

        let index = self.build_index(&candidates);

        let mut result = Reconciliation {
            priority: self.priority.clone(),
            ..Default::default()
        };
        for record in incoming {
            match self.find_match(&record, &index) {
                Some((id, kind)) => result.matched.push(MatchedRecord {
                    id,
                    record,
                    matched_by: kind,
                }),
                None => result.unmatched.push(record),
            }
        }

        log_info_indent(format!("{} matched", result.matched.len()), 1);
        if !result.unmatched.is_empty() {
            log_warning(format!("{} record(s) matched no existing worker", result.unmatched.len()));
        }

        Ok(result)
    }

    /// One lookup per identifier kind, skipped when the file has none of that kind.
    async fn fetch_candidates(
        &self,
        incoming: &[Worker],
        tenant_id: Uuid,
    ) -> RepositoryResult<BTreeMap<Uuid, StoredWorker>> {
        let mut candidates = BTreeMap::new();

        for kind in &self.priority {
            let values: Vec<String> = incoming
                .iter()
                .filter_map(|r| r.identifier(*kind))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if values.is_empty() {
                continue;
            }

            let found = self.repo.find_by_identifiers(tenant_id, *kind, &values).await?;
            for worker in found.into_iter().filter(|w| w.tenant_id() == tenant_id) {
                candidates.entry(worker.id).or_insert(worker);
            }
        }

        Ok(candidates)
    }

    /// identifier kind → value → entity id. Candidates are visited in id
    /// order, so the first insert is the lowest id.
    fn build_index(
        &self,
        candidates: &BTreeMap<Uuid, StoredWorker>,
    ) -> HashMap<IdentifierKind, HashMap<String, Uuid>> {
        let mut index: HashMap<IdentifierKind, HashMap<String, Uuid>> = HashMap::new();
        for (id, stored) in candidates {
            for kind in &self.priority {
                if let Some(value) = stored.worker.identifier(*kind) {
                    index.entry(*kind).or_default().entry(value).or_insert(*id);
                }
            }
        }
        index
    }

    fn find_match(
        &self,
        record: &Worker,
        index: &HashMap<IdentifierKind, HashMap<String, Uuid>>,
    ) -> Option<(Uuid, IdentifierKind)> {
        self.priority.iter().find_map(|kind| {
            let value = record.identifier(*kind)?;
            index.get(kind)?.get(&value).map(|id| (*id, *kind))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn stored(tenant: Uuid, worker: Worker) -> StoredWorker {
        StoredWorker::new(Worker { tenant_id: tenant, ..worker })
    }

    fn incoming(tenant: Uuid) -> Worker {
        Worker::new(tenant, "Ada", "Lovelace")
    }

    #[tokio::test]
    async fn test_external_id_beats_email() {
        let tenant = Uuid::new_v4();
        let a = stored(tenant, incoming(tenant).with_external_id("EMP-1"));
        let b = stored(tenant, incoming(tenant).with_email("ada@example.org"));
        let store = MemoryStore::with_workers(vec![a.clone(), b]);

        let record = incoming(tenant)
            .with_external_id("EMP-1")
            .with_email("ada@example.org");
        let result = Reconciler::new(&store).reconcile(vec![record], tenant).await.unwrap();

        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].id, a.id);
        assert_eq!(result.matched[0].matched_by, IdentifierKind::ExternalId);
    }

    #[tokio::test]
    async fn test_falls_back_to_email_then_phone() {
        let tenant = Uuid::new_v4();
        let by_email = stored(tenant, incoming(tenant).with_email("ada@example.org"));
        let by_phone = stored(tenant, incoming(tenant).with_phone("+33612345678"));
        let store = MemoryStore::with_workers(vec![by_email.clone(), by_phone.clone()]);

        let records = vec![
            incoming(tenant)
                .with_external_id("EMP-404")
                .with_email("Ada@Example.org"),
            incoming(tenant).with_phone("+33 6 12 34 56 78"),
        ];
        let result = Reconciler::new(&store).reconcile(records, tenant).await.unwrap();

        assert_eq!(result.matched[0].id, by_email.id);
        assert_eq!(result.matched[0].matched_by, IdentifierKind::Email);
        assert_eq!(result.matched[1].id, by_phone.id);
        assert_eq!(result.matched[1].matched_by, IdentifierKind::Phone);
    }

    #[tokio::test]
    async fn test_every_unmatched_record_is_reported_once() {
        let tenant = Uuid::new_v4();
        let store = MemoryStore::new();

        let records = vec![
            incoming(tenant).with_external_id("EMP-1"),
            incoming(tenant),
            incoming(tenant).with_email("ghost@example.org"),
        ];
        let result = Reconciler::new(&store).reconcile(records, tenant).await.unwrap();

        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched.len(), 3);

        let not_found = result.not_found();
        assert_eq!(not_found.len(), 3);
        assert_eq!(
            not_found[0].identifiers.get(&IdentifierKind::ExternalId).map(String::as_str),
            Some("EMP-1")
        );
        assert!(not_found[1].identifiers.is_empty());
    }

    #[tokio::test]
    async fn test_other_tenants_are_invisible() {
        let (tenant, other) = (Uuid::new_v4(), Uuid::new_v4());
        let foreign = stored(other, incoming(other).with_external_id("EMP-1"));
        let store = MemoryStore::with_workers(vec![foreign]);

        let result = Reconciler::new(&store)
            .reconcile(vec![incoming(tenant).with_external_id("EMP-1")], tenant)
            .await
            .unwrap();

        assert!(result.matched.is_empty());
        assert_eq!(result.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_lowest_id_wins_on_shared_identifier() {
        let tenant = Uuid::new_v4();
        let first = stored(tenant, incoming(tenant).with_email("team@example.org"));
        let second = stored(tenant, incoming(tenant).with_email("team@example.org"));
        let lowest = first.id.min(second.id);
        let store = MemoryStore::with_workers(vec![first, second]);

        let result = Reconciler::new(&store)
            .reconcile(vec![incoming(tenant).with_email("team@example.org")], tenant)
            .await
            .unwrap();

        assert_eq!(result.matched[0].id, lowest);
    }

    #[tokio::test]
    async fn test_custom_priority() {
        let tenant = Uuid::new_v4();
        let a = stored(tenant, incoming(tenant).with_external_id("EMP-1"));
        let b = stored(tenant, incoming(tenant).with_email("ada@example.org"));
        let store = MemoryStore::with_workers(vec![a, b.clone()]);

        let record = incoming(tenant)
            .with_external_id("EMP-1")
            .with_email("ada@example.org");
        let reconciler = Reconciler::new(&store)
            .with_priority(&[IdentifierKind::Email, IdentifierKind::ExternalId, IdentifierKind::Email]);
        assert_eq!(reconciler.priority().len(), 2);

        let result = reconciler.reconcile(vec![record], tenant).await.unwrap();
        assert_eq!(result.matched[0].id, b.id);
    }
}

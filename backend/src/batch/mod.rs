//! Chunked execution of create/update operations.
//!
//! Operations are split into consecutive chunks of `batch_size` and run one
//! chunk at a time, in input order. Within a chunk every create goes through a
//! single [`WorkerRepository::create_many`] call; when it fails, the failure is
//! recorded against each create of that chunk. Updates run one by one so a
//! failing update never affects its siblings.
//!
//! Nothing in here returns an error: every failure ends up in
//! [`BatchOutcome::failed`].

use serde::Serialize;
use uuid::Uuid;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{Worker, WorkerPatch};
use crate::reconcile::NotFound;
use crate::store::WorkerRepository;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A unit of work for the executor. Records are plain data.
#[derive(Debug, Clone)]
pub enum Operation {
    Create(Worker),
    Update { id: Uuid, patch: WorkerPatch },
}

impl Operation {
    pub fn label(&self) -> String {
        match self {
            Operation::Create(record) => record.label(),
            Operation::Update { patch, .. } => patch.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSuccess {
    pub id: Uuid,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Entity id for updates; creates have none.
    pub id: Option<Uuid>,
    pub label: String,
    pub error: String,
}

/// Accumulated result of one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub successful: Vec<RecordSuccess>,
    pub failed: Vec<RecordFailure>,
    pub not_found: Vec<NotFound>,
}

impl BatchOutcome {
    pub fn with_not_found(mut self, not_found: Vec<NotFound>) -> Self {
        self.not_found.extend(not_found);
        self
    }

    pub fn processed(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

pub struct BatchExecutor<'a> {
    repo: &'a dyn WorkerRepository,
    batch_size: usize,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(repo: &'a dyn WorkerRepository) -> Self {
        Self {
            repo,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Chunk size; zero falls back to [`DEFAULT_BATCH_SIZE`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn execute(&self, operations: Vec<Operation>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let total_batches = operations.len().div_ceil(self.batch_size);
        if total_batches > 0 {
            log_info(format!(
                "💾 Executing {} operation(s) in {} batch(es) of up to {}",
                operations.len(),
                total_batches,
                self.batch_size
            ));
        }

        let mut operations = operations.into_iter().peekable();
        let mut batch_number = 0;
        while operations.peek().is_some() {
            batch_number += 1;
            let chunk: Vec<Operation> = operations.by_ref().take(self.batch_size).collect();

            let before = (outcome.successful.len(), outcome.failed.len());
            self.execute_chunk(chunk, &mut outcome).await;
            let ok = outcome.successful.len() - before.0;
            let failed = outcome.failed.len() - before.1;

            if failed == 0 {
                log_success(format!("Batch {}/{}: {} ok", batch_number, total_batches, ok));
            } else {
                log_warning(format!(
                    "Batch {}/{}: {} ok, {} failed",
                    batch_number, total_batches, ok, failed
                ));
            }
        }

        outcome
    }

    async fn execute_chunk(&self, chunk: Vec<Operation>, outcome: &mut BatchOutcome) {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        for op in chunk {
            match op {
                Operation::Create(record) => creates.push(record),
                Operation::Update { id, patch } => updates.push((id, patch)),
            }
        }

        if !creates.is_empty() {
            let labels: Vec<String> = creates.iter().map(Worker::label).collect();
            match self.repo.create_many(creates).await {
                Ok(created) => {
                    outcome.successful.extend(created.into_iter().map(|s| RecordSuccess {
                        label: s.worker.label(),
                        id: s.id,
                    }));
                }
                Err(e) => {
                    let error = e.to_string();
                    log_info_indent(format!("bulk create failed: {}", error), 1);
                    outcome.failed.extend(labels.into_iter().map(|label| RecordFailure {
                        id: None,
                        label,
                        error: error.clone(),
                    }));
                }
            }
        }

        for (id, patch) in updates {
            let label = patch.label();
            match self.repo.update(id, patch).await {
                Ok(updated) => outcome.successful.push(RecordSuccess {
                    id: updated.id,
                    label,
                }),
                Err(e) => outcome.failed.push(RecordFailure {
                    id: Some(id),
                    label,
                    error: e.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RepositoryError, RepositoryResult};
    use crate::models::{IdentifierKind, StoredWorker};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Rejects every `create_many` call whose first record matches `poison`
    /// and counts calls.
    struct FlakyRepo {
        inner: MemoryStore,
        poison: &'static str,
        create_calls: AtomicUsize,
    }

    #[async_trait]
    impl WorkerRepository for FlakyRepo {
        async fn find_by_identifiers(
            &self,
            tenant_id: Uuid,
            kind: IdentifierKind,
            values: &[String],
        ) -> RepositoryResult<Vec<StoredWorker>> {
            self.inner.find_by_identifiers(tenant_id, kind, values).await
        }

        async fn create_many(&self, workers: Vec<Worker>) -> RepositoryResult<Vec<StoredWorker>> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if workers.iter().any(|w| w.first_name == self.poison) {
                return Err(RepositoryError::Storage("disk full".into()));
            }
            self.inner.create_many(workers).await
        }

        async fn update(&self, id: Uuid, patch: WorkerPatch) -> RepositoryResult<StoredWorker> {
            if patch.record.first_name == self.poison {
                return Err(RepositoryError::Storage("row locked".into()));
            }
            self.inner.update(id, patch).await
        }

        async fn list(&self, tenant_id: Uuid) -> RepositoryResult<Vec<StoredWorker>> {
            self.inner.list(tenant_id).await
        }
    }

    fn flaky(poison: &'static str) -> FlakyRepo {
        FlakyRepo {
            inner: MemoryStore::new(),
            poison,
            create_calls: AtomicUsize::new(0),
        }
    }

    fn creates(tenant: Uuid, names: &[&str]) -> Vec<Operation> {
        names
            .iter()
            .map(|n| Operation::Create(Worker::new(tenant, *n, "Test")))
            .collect()
    }

    #[tokio::test]
    async fn test_creates_are_chunked() {
        let repo = flaky("nobody");
        let tenant = Uuid::new_v4();
        let executor = BatchExecutor::new(&repo).with_batch_size(2);

        let outcome = executor
            .execute(creates(tenant, &["Ada", "Grace", "Alan", "Edsger", "Barbara"]))
            .await;

        assert_eq!(outcome.successful.len(), 5);
        assert!(outcome.failed.is_empty());
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_create_failure_covers_its_chunk_only() {
        let repo = flaky("Alan");
        let tenant = Uuid::new_v4();
        let executor = BatchExecutor::new(&repo).with_batch_size(2);

        let outcome = executor
            .execute(creates(tenant, &["Ada", "Grace", "Alan", "Edsger", "Barbara"]))
            .await;

        assert_eq!(outcome.successful.len(), 3);
        let failed: Vec<&str> = outcome.failed.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(failed, vec!["Alan Test", "Edsger Test"]);
        assert!(outcome.failed.iter().all(|f| f.error.contains("disk full")));
        assert!(outcome.failed.iter().all(|f| f.id.is_none()));
    }

    #[tokio::test]
    async fn test_update_failure_is_isolated() {
        let repo = flaky("Grace");
        let tenant = Uuid::new_v4();
        let stored = repo
            .inner
            .create_many(vec![
                Worker::new(tenant, "Ada", "Test"),
                Worker::new(tenant, "Grace", "Test"),
                Worker::new(tenant, "Alan", "Test"),
            ])
            .await
            .unwrap();

        let updates = stored
            .iter()
            .map(|s| Operation::Update {
                id: s.id,
                patch: WorkerPatch::replace(s.worker.clone()),
            })
            .collect();
        let outcome = BatchExecutor::new(&repo).execute(updates).await;

        assert_eq!(outcome.successful.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, Some(stored[1].id));
        assert_eq!(outcome.failed[0].error, "Storage error: row locked");
    }

    #[tokio::test]
    async fn test_empty_run() {
        let repo = flaky("nobody");
        let outcome = BatchExecutor::new(&repo).execute(Vec::new()).await;
        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_batch_size_falls_back() {
        let repo = MemoryStore::new();
        assert_eq!(BatchExecutor::new(&repo).with_batch_size(0).batch_size(), DEFAULT_BATCH_SIZE);
    }
}

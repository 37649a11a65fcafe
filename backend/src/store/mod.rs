//! Worker persistence gateway.
//!
//! The pipeline only talks to [`WorkerRepository`]. Two implementations ship
//! with the crate:
//!
//! - [`MemoryStore`] - process-local, used by tests and `dry-run` style tooling
//! - [`FileStore`] - one JSON file per tenant under a data directory
//!
//! ```text
//! .staffload/
//! ├── 3f2c…-tenant-a.json   [StoredWorker, …]
//! └── 9b71…-tenant-b.json
//! ```
//!
//! Both keep external ids unique within a tenant. Lookups compare
//! normalized identifiers (see [`IdentifierKind::normalize`]).
//!
//! Tenant files are replaced through a `<tenant>.json.tmp` sibling and a
//! rename, so a crash never leaves a half written file behind.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{IdentifierKind, StoredWorker, Worker, WorkerPatch};

/// Default directory of the file-backed store (relative to current dir).
pub const DEFAULT_DATA_DIR: &str = ".staffload";

// =============================================================================
// Gateway trait
// =============================================================================

#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// Workers of `tenant_id` whose identifier of `kind` is one of `values`.
    ///
    /// `values` are expected in normalized form.
    async fn find_by_identifiers(
        &self,
        tenant_id: Uuid,
        kind: IdentifierKind,
        values: &[String],
    ) -> RepositoryResult<Vec<StoredWorker>>;

    /// Insert all workers or none of them, across every tenant of the batch.
    async fn create_many(&self, workers: Vec<Worker>) -> RepositoryResult<Vec<StoredWorker>>;

    /// Merge `patch` into an existing worker of the patch's tenant.
    ///
    /// Fields outside `patch.columns` keep their stored value.
    async fn update(&self, id: Uuid, patch: WorkerPatch) -> RepositoryResult<StoredWorker>;

    /// All workers of one tenant.
    async fn list(&self, tenant_id: Uuid) -> RepositoryResult<Vec<StoredWorker>>;
}

// =============================================================================
// Shared table logic
// =============================================================================

/// Workers of a single tenant, keyed by entity id.
#[derive(Debug, Clone, Default)]
struct WorkerTable {
    workers: BTreeMap<Uuid, StoredWorker>,
}

impl WorkerTable {
    fn from_workers(workers: Vec<StoredWorker>) -> Self {
        Self {
            workers: workers.into_iter().map(|w| (w.id, w)).collect(),
        }
    }

    fn find(&self, kind: IdentifierKind, values: &[String]) -> Vec<StoredWorker> {
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        self.workers
            .values()
            .filter(|w| {
                w.worker
                    .identifier(kind)
                    .is_some_and(|id| wanted.contains(id.as_str()))
            })
            .cloned()
            .collect()
    }

    fn external_id_taken(&self, external_id: &str, except: Option<Uuid>) -> bool {
        self.workers.values().any(|w| {
            Some(w.id) != except
                && w.worker.identifier(IdentifierKind::ExternalId).as_deref() == Some(external_id)
        })
    }

    /// Validate the whole batch before touching the table.
    fn insert_many(&mut self, workers: Vec<Worker>) -> RepositoryResult<Vec<StoredWorker>> {
        let mut seen = HashSet::new();
        for worker in &workers {
            if let Some(external_id) = worker.identifier(IdentifierKind::ExternalId) {
                if self.external_id_taken(&external_id, None) || !seen.insert(external_id.clone()) {
                    return Err(RepositoryError::Conflict(format!(
                        "external id '{}' already exists",
                        external_id
                    )));
                }
            }
        }

        let stored: Vec<StoredWorker> = workers.into_iter().map(StoredWorker::new).collect();
        for worker in &stored {
            self.workers.insert(worker.id, worker.clone());
        }
        Ok(stored)
    }

    fn update(&mut self, id: Uuid, patch: &WorkerPatch) -> RepositoryResult<StoredWorker> {
        let mut merged = self
            .workers
            .get(&id)
            .ok_or(RepositoryError::NotFound(id))?
            .worker
            .clone();
        patch.apply_to(&mut merged);

        if let Some(external_id) = merged.identifier(IdentifierKind::ExternalId) {
            if self.external_id_taken(&external_id, Some(id)) {
                return Err(RepositoryError::Conflict(format!(
                    "external id '{}' belongs to another worker",
                    external_id
                )));
            }
        }

        let existing = self
            .workers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        existing.worker = merged;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }
}

/// Split a batch by tenant, keeping input order inside each group.
fn group_by_tenant(workers: Vec<Worker>) -> Vec<(Uuid, Vec<Worker>)> {
    let mut groups: Vec<(Uuid, Vec<Worker>)> = Vec::new();
    for worker in workers {
        match groups.iter_mut().find(|(t, _)| *t == worker.tenant_id) {
            Some((_, group)) => group.push(worker),
            None => groups.push((worker.tenant_id, vec![worker])),
        }
    }
    groups
}

/// Apply a batch to several tenant tables atomically.
fn insert_grouped(
    tables: &mut HashMap<Uuid, WorkerTable>,
    workers: Vec<Worker>,
) -> RepositoryResult<(Vec<Uuid>, Vec<StoredWorker>)> {
    let groups = group_by_tenant(workers);

    // Work on copies so a conflict in a later tenant leaves everything untouched.
    let mut staged = Vec::with_capacity(groups.len());
    let mut created = Vec::new();
    for (tenant_id, group) in groups {
        let mut table = tables.get(&tenant_id).cloned().unwrap_or_default();
        created.extend(table.insert_many(group)?);
        staged.push((tenant_id, table));
    }

    let touched = staged.iter().map(|(t, _)| *t).collect();
    for (tenant_id, table) in staged {
        tables.insert(tenant_id, table);
    }
    Ok((touched, created))
}

fn tenant_of(tables: &HashMap<Uuid, WorkerTable>, id: Uuid) -> Option<Uuid> {
    tables
        .iter()
        .find(|(_, table)| table.workers.contains_key(&id))
        .map(|(tenant_id, _)| *tenant_id)
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local repository.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Uuid, WorkerTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with already persisted workers.
    pub fn with_workers(workers: Vec<StoredWorker>) -> Self {
        let mut tables: HashMap<Uuid, Vec<StoredWorker>> = HashMap::new();
        for worker in workers {
            tables.entry(worker.tenant_id()).or_default().push(worker);
        }
        Self {
            tables: RwLock::new(
                tables
                    .into_iter()
                    .map(|(t, w)| (t, WorkerTable::from_workers(w)))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl WorkerRepository for MemoryStore {
    async fn find_by_identifiers(
        &self,
        tenant_id: Uuid,
        kind: IdentifierKind,
        values: &[String],
    ) -> RepositoryResult<Vec<StoredWorker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&tenant_id)
            .map(|t| t.find(kind, values))
            .unwrap_or_default())
    }

    async fn create_many(&self, workers: Vec<Worker>) -> RepositoryResult<Vec<StoredWorker>> {
        let mut tables = self.tables.write().await;
        insert_grouped(&mut tables, workers).map(|(_, created)| created)
    }

    async fn update(&self, id: Uuid, patch: WorkerPatch) -> RepositoryResult<StoredWorker> {
        let mut tables = self.tables.write().await;
        let tenant_id = patch.tenant_id();
        if tenant_of(&tables, id) != Some(tenant_id) {
            return Err(RepositoryError::NotFound(id));
        }
        tables
            .get_mut(&tenant_id)
            .ok_or(RepositoryError::NotFound(id))?
            .update(id, &patch)
    }

    async fn list(&self, tenant_id: Uuid) -> RepositoryResult<Vec<StoredWorker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&tenant_id)
            .map(|t| t.workers.values().cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Repository persisting each tenant's workers to `<dir>/<tenant>.json`.
///
/// All tenant files are loaded on construction. Every successful write
/// rewrites the touched tenant files. When one of several files cannot be
/// replaced, the files already replaced are put back, so memory and disk
/// keep agreeing.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    tables: RwLock<HashMap<Uuid, WorkerTable>>,
}

impl FileStore {
    /// Open the store in the default directory.
    pub fn new() -> RepositoryResult<Self> {
        Self::with_dir(DEFAULT_DATA_DIR)
    }

    /// Open the store in a custom directory, loading existing tenant files.
    pub fn with_dir(dir: impl AsRef<Path>) -> RepositoryResult<Self> {
        let data_dir = PathBuf::from(dir.as_ref());
        let tables = Self::load_all(&data_dir)?;
        Ok(Self {
            data_dir,
            tables: RwLock::new(tables),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every `<uuid>.json` file of the data directory.
    fn load_all(dir: &Path) -> RepositoryResult<HashMap<Uuid, WorkerTable>> {
        let mut tables = HashMap::new();
        if !dir.exists() {
            return Ok(tables);
        }

        for entry in fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let Some(tenant_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            let workers: Vec<StoredWorker> = serde_json::from_str(&content)?;
            if let Some(stray) = workers.iter().find(|w| w.tenant_id() != tenant_id) {
                return Err(RepositoryError::Storage(format!(
                    "{} contains worker {} of another tenant",
                    path.display(),
                    stray.id
                )));
            }
            tables.insert(tenant_id, WorkerTable::from_workers(workers));
        }

        Ok(tables)
    }

    fn tenant_path(&self, tenant_id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{}.json", tenant_id))
    }

    fn temp_path(&self, tenant_id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{}.json.tmp", tenant_id))
    }

    async fn write_temp(&self, tenant_id: Uuid, table: &WorkerTable) -> RepositoryResult<()> {
        let workers: Vec<&StoredWorker> = table.workers.values().collect();
        let content = serde_json::to_string_pretty(&workers)?;
        tokio::fs::write(self.temp_path(tenant_id), content).await?;
        Ok(())
    }

    async fn replace_file(&self, tenant_id: Uuid, table: &WorkerTable) -> RepositoryResult<()> {
        self.write_temp(tenant_id, table).await?;
        tokio::fs::rename(self.temp_path(tenant_id), self.tenant_path(tenant_id)).await?;
        Ok(())
    }

    async fn discard_temps(&self, tenants: &[Uuid]) {
        for tenant_id in tenants {
            tokio::fs::remove_file(self.temp_path(*tenant_id)).await.ok();
        }
    }

    /// Write the `touched` tenants of `staged` to disk, then into `tables`.
    ///
    /// All temp files are written before the first rename. A failed rename
    /// restores the files renamed before it.
    async fn persist(
        &self,
        tables: &mut HashMap<Uuid, WorkerTable>,
        staged: &HashMap<Uuid, WorkerTable>,
        touched: &[Uuid],
    ) -> RepositoryResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        for (i, tenant_id) in touched.iter().enumerate() {
            let Some(table) = staged.get(tenant_id) else {
                continue;
            };
            if let Err(e) = self.write_temp(*tenant_id, table).await {
                self.discard_temps(&touched[..=i]).await;
                return Err(e);
            }
        }

        for (i, tenant_id) in touched.iter().enumerate() {
            let renamed =
                tokio::fs::rename(self.temp_path(*tenant_id), self.tenant_path(*tenant_id)).await;
            if let Err(e) = renamed {
                self.discard_temps(&touched[i..]).await;
                self.roll_back(tables, staged, &touched[..i]).await;
                return Err(e.into());
            }
        }

        for tenant_id in touched {
            if let Some(table) = staged.get(tenant_id) {
                tables.insert(*tenant_id, table.clone());
            }
        }
        Ok(())
    }

    /// Put back the previous content of already replaced tenant files.
    /// A file that cannot be restored keeps its new content in memory too.
    async fn roll_back(
        &self,
        tables: &mut HashMap<Uuid, WorkerTable>,
        staged: &HashMap<Uuid, WorkerTable>,
        renamed: &[Uuid],
    ) {
        for tenant_id in renamed {
            let restored = match tables.get(tenant_id) {
                Some(previous) => self.replace_file(*tenant_id, previous).await,
                None => tokio::fs::remove_file(self.tenant_path(*tenant_id))
                    .await
                    .map_err(RepositoryError::from),
            };
            if restored.is_err() {
                if let Some(table) = staged.get(tenant_id) {
                    tables.insert(*tenant_id, table.clone());
                }
            }
        }
    }
}

#[async_trait]
impl WorkerRepository for FileStore {
    async fn find_by_identifiers(
        &self,
        tenant_id: Uuid,
        kind: IdentifierKind,
        values: &[String],
    ) -> RepositoryResult<Vec<StoredWorker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&tenant_id)
            .map(|t| t.find(kind, values))
            .unwrap_or_default())
    }

    async fn create_many(&self, workers: Vec<Worker>) -> RepositoryResult<Vec<StoredWorker>> {
        let mut tables = self.tables.write().await;
        let mut staged = HashMap::clone(&tables);
        let (touched, created) = insert_grouped(&mut staged, workers)?;

        self.persist(&mut tables, &staged, &touched).await?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: WorkerPatch) -> RepositoryResult<StoredWorker> {
        let mut tables = self.tables.write().await;
        let tenant_id = patch.tenant_id();
        if tenant_of(&tables, id) != Some(tenant_id) {
            return Err(RepositoryError::NotFound(id));
        }

        let mut table = tables.get(&tenant_id).cloned().unwrap_or_default();
        let updated = table.update(id, &patch)?;
        let staged = HashMap::from([(tenant_id, table)]);
        self.persist(&mut tables, &staged, &[tenant_id]).await?;
        Ok(updated)
    }

    async fn list(&self, tenant_id: Uuid) -> RepositoryResult<Vec<StoredWorker>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&tenant_id)
            .map(|t| t.workers.values().cloned().collect())
            .unwrap_or_default())
    }
}

//! High-level import API: one call from file bytes to an [`ImportReport`].
//!
//! ```text
//! bytes ─▶ parse ─▶ resolve headers ─▶ validate ─┬─ validate ─────────────▶ report
//!                                                ├─ dry-run ─▶ transform ──▶ counts
//!                                                ├─ create ──▶ transform ──▶ executor
//!                                                └─ update ──▶ transform ──▶ reconcile ─▶ executor
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use staffload::store::MemoryStore;
//! use staffload::transform::pipeline::{import_file, ImportMode, ImportOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let options = ImportOptions::new(ImportMode::Create, tenant_id);
//!     let report = import_file("workers.csv", &store, &options).await?;
//!
//!     println!("{} created", report.outcome.unwrap().successful.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::record::to_domain_records;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::batch::{BatchExecutor, BatchOutcome, Operation, DEFAULT_BATCH_SIZE};
use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Worker, WorkerPatch};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};
use crate::reconcile::Reconciler;
use crate::store::WorkerRepository;
use crate::validation::{validate, worker_rules, RuleSet, ValidatedRow, ValidationResult};

/// Findings echoed to the log before the rest is summarized.
const LOGGED_FINDINGS: usize = 10;

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImportMode {
    /// Report findings only.
    #[default]
    Validate,
    /// Transform without persisting, report counts.
    DryRun,
    Create,
    Update,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Validate => "validate",
            ImportMode::DryRun => "dry-run",
            ImportMode::Create => "create",
            ImportMode::Update => "update",
        }
    }

    /// Whether this mode writes to the repository.
    pub fn persists(&self) -> bool {
        matches!(self, ImportMode::Create | ImportMode::Update)
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "validate" => Ok(ImportMode::Validate),
            "dry-run" | "dryrun" => Ok(ImportMode::DryRun),
            "create" => Ok(ImportMode::Create),
            "update" => Ok(ImportMode::Update),
            other => Err(format!(
                "unknown import mode '{}' (expected validate, dry-run, create or update)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub mode: ImportMode,
    pub tenant_id: Uuid,
    pub batch_size: usize,
    /// Persist accepted rows even when other rows failed validation.
    pub allow_partial: bool,
}

impl ImportOptions {
    pub fn new(mode: ImportMode, tenant_id: Uuid) -> Self {
        Self {
            mode,
            tenant_id,
            batch_size: DEFAULT_BATCH_SIZE,
            allow_partial: true,
        }
    }

    pub fn from_config(config: &AppConfig, mode: ImportMode, tenant_id: Uuid) -> Self {
        Self {
            mode,
            tenant_id,
            batch_size: config.batch_size,
            allow_partial: config.allow_partial,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Information about the parsed file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub headers: Vec<String>,
    /// Headers that map to no known column; their cells are ignored.
    pub unknown_headers: Vec<String>,
}

impl CsvInfo {
    fn new(parsed: &ParseResult, rules: &RuleSet) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: format_delimiter(parsed.delimiter),
            row_count: parsed.rows.len(),
            headers: parsed.headers.clone(),
            unknown_headers: parsed
                .headers
                .iter()
                .filter(|h| !h.is_empty() && rules.resolve_header(h).is_none())
                .cloned()
                .collect(),
        }
    }
}

/// Counts reported by a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunCounts {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    /// Domain records that would be handed to the executor.
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub job_id: Uuid,
    pub mode: ImportMode,
    pub csv_info: CsvInfo,
    pub validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<DryRunCounts>,
}

impl ImportReport {
    /// "ready" when nothing needs attention, "warning" for advisory findings or
    /// partial persistence failures, "error" when rows were rejected.
    pub fn status(&self) -> &'static str {
        let failed = self.outcome.as_ref().is_some_and(|o| !o.failed.is_empty());
        let not_found = self.outcome.as_ref().is_some_and(|o| !o.not_found.is_empty());

        if !self.validation.success {
            "error"
        } else if failed || not_found || self.validation.summary.warning_rows > 0 {
            "warning"
        } else {
            "ready"
        }
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Import a file from disk.
pub async fn import_file<P: AsRef<Path>>(
    path: P,
    repo: &dyn WorkerRepository,
    options: &ImportOptions,
) -> PipelineResult<ImportReport> {
    log_info(format!("📖 Reading {}", path.as_ref().display()));
    let parsed = parse_file_auto(path)?;
    import_parsed(parsed, repo, options).await
}

/// Import raw bytes (e.g. from an upload).
pub async fn import_bytes(
    bytes: &[u8],
    repo: &dyn WorkerRepository,
    options: &ImportOptions,
) -> PipelineResult<ImportReport> {
    log_info(format!("📖 Reading upload ({} bytes)", bytes.len()));
    let parsed = parse_bytes_auto(bytes)?;
    import_parsed(parsed, repo, options).await
}

/// Validate bytes without touching any repository.
pub fn validate_bytes(bytes: &[u8]) -> PipelineResult<ImportReport> {
    let parsed = parse_bytes_auto(bytes)?;
    let rules = worker_rules();
    let (csv_info, validation) = validate_parsed(parsed, &rules);
    Ok(ImportReport {
        job_id: Uuid::new_v4(),
        mode: ImportMode::Validate,
        csv_info,
        validation,
        outcome: None,
        dry_run: None,
    })
}

/// Run an already parsed file through the selected mode.
pub async fn import_parsed(
    parsed: ParseResult,
    repo: &dyn WorkerRepository,
    options: &ImportOptions,
) -> PipelineResult<ImportReport> {
    let rules = worker_rules();
    let (csv_info, validation) = validate_parsed(parsed, &rules);

    let mut report = ImportReport {
        job_id: Uuid::new_v4(),
        mode: options.mode,
        csv_info,
        validation,
        outcome: None,
        dry_run: None,
    };

    if options.mode == ImportMode::Validate {
        return Ok(report);
    }

    if report.validation.has_missing_columns() {
        log_error("Required columns are missing, nothing was transformed");
        return Ok(report);
    }

    if options.mode.persists() && !options.allow_partial && !report.validation.success {
        log_error("Partial imports are disabled, fix the rejected rows first");
        return Err(PipelineError::ValidationFailed {
            error_rows: report.validation.summary.error_rows,
        });
    }

    log_info("⚙️  Transforming accepted rows...");
    let records = to_domain_records(&report.validation.accepted_rows, options.tenant_id);
    log_success(format!("{} worker record(s)", records.len()));

    match options.mode {
        ImportMode::Validate => {}
        ImportMode::DryRun => {
            let summary = report.validation.summary;
            report.dry_run = Some(DryRunCounts {
                total_rows: summary.total_rows,
                valid_rows: summary.valid_rows,
                error_rows: summary.error_rows,
                warning_rows: summary.warning_rows,
                records: records.len(),
            });
        }
        ImportMode::Create => {
            let operations = records.into_iter().map(Operation::Create).collect();
            report.outcome = Some(execute(repo, options, operations).await);
        }
        ImportMode::Update => {
            let columns = patched_columns(&report.validation.accepted_rows);
            report.outcome = Some(update(repo, options, records, columns).await?);
        }
    }

    if let Some(ref outcome) = report.outcome {
        log_outcome(outcome);
    }

    Ok(report)
}

// =============================================================================
// Steps
// =============================================================================

fn validate_parsed(parsed: ParseResult, rules: &RuleSet) -> (CsvInfo, ValidationResult) {
    let csv_info = CsvInfo::new(&parsed, rules);
    log_success(format!("Detected encoding: {}", csv_info.encoding));
    log_success(format!("Detected separator: '{}'", csv_info.delimiter));
    log_success(format!("Read {} rows", csv_info.row_count));
    if !csv_info.unknown_headers.is_empty() {
        log_warning(format!("Ignoring unknown columns: {}", csv_info.unknown_headers.join(", ")));
    }

    log_info("✔️  Validating rows...");
    let rows = rules.resolve_headers(parsed.rows);
    let validation = validate(&rows, rules);
    log_validation(&validation);

    (csv_info, validation)
}

async fn execute(
    repo: &dyn WorkerRepository,
    options: &ImportOptions,
    operations: Vec<Operation>,
) -> BatchOutcome {
    BatchExecutor::new(repo)
        .with_batch_size(options.batch_size)
        .execute(operations)
        .await
}

/// Columns the file carries for its accepted rows. Only these are written on update.
fn patched_columns(rows: &[ValidatedRow]) -> BTreeSet<String> {
    rows.iter().flat_map(|row| row.values.keys().cloned()).collect()
}

async fn update(
    repo: &dyn WorkerRepository,
    options: &ImportOptions,
    records: Vec<Worker>,
    columns: BTreeSet<String>,
) -> PipelineResult<BatchOutcome> {
    log_info("🔗 Reconciling with existing workers...");
    let reconciliation = Reconciler::new(repo)
        .reconcile(records, options.tenant_id)
        .await?;

    let not_found = reconciliation.not_found();
    let operations = reconciliation
        .matched
        .into_iter()
        .map(|m| Operation::Update {
            id: m.id,
            patch: WorkerPatch::new(m.record, columns.clone()),
        })
        .collect();

    Ok(execute(repo, options, operations).await.with_not_found(not_found))
}

fn log_validation(validation: &ValidationResult) {
    let summary = validation.summary;
    if validation.success {
        log_success(format!("{} of {} rows valid", summary.valid_rows, summary.total_rows));
    } else {
        log_warning(format!(
            "{} of {} rows valid, {} rejected",
            summary.valid_rows, summary.total_rows, summary.error_rows
        ));
    }
    if summary.warning_rows > 0 {
        log_info_indent(format!("{} row(s) with warnings", summary.warning_rows), 1);
    }

    for finding in validation.blocking().take(LOGGED_FINDINGS) {
        log_warning_indent(finding.to_string(), 1);
    }
    let remaining = validation.blocking().count().saturating_sub(LOGGED_FINDINGS);
    if remaining > 0 {
        log_info_indent(format!("... and {} more", remaining), 1);
    }
}

fn log_outcome(outcome: &BatchOutcome) {
    log_info(format!(
        "📊 {} succeeded, {} failed, {} not found",
        outcome.successful.len(),
        outcome.failed.len(),
        outcome.not_found.len()
    ));
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

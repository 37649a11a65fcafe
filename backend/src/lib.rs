//! # Staffload - Bulk worker import and reconciliation
//!
//! Staffload ingests tabular worker files, validates every cell and row
//! against a declarative rule set, converts accepted rows into nested worker
//! records and persists them, either as new workers or as updates matched to
//! existing ones.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐
//! │ CSV File │──▶│  Parser  │──▶│ Validation │──▶│ Transform │──▶│ Reconcile  │──▶│  Batch   │
//! │(ISO/UTF8)│   │(auto-enc)│   │ (RuleSet)  │   │ (Worker)  │   │(update only│   │ Executor │
//! └──────────┘   └──────────┘   └────────────┘   └───────────┘   └────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use staffload::{import_file, ImportMode, ImportOptions, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let options = ImportOptions::new(ImportMode::Validate, uuid::Uuid::nil());
//!     let report = import_file("workers.csv", &store, &options).await.unwrap();
//!     println!("{} valid rows", report.validation.summary.valid_rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment configuration
//! - [`models`] - Domain models (Worker and its sub-structures)
//! - [`parser`] - CSV parsing with auto-detection
//! - [`validation`] - Rule-set driven row validation
//! - [`transform`] - Record mapping and the import pipeline
//! - [`reconcile`] - Update-mode matching against stored workers
//! - [`batch`] - Chunked create/update execution
//! - [`store`] - Persistence gateway and implementations
//! - [`template`] - Template and sample file generation
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Persistence
pub mod batch;
pub mod reconcile;
pub mod store;

// Templates
pub mod template;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, PipelineError, RepositoryError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{IdentifierKind, StoredWorker, Worker, WorkerPatch};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file_auto,
    ParseResult, RawRow,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate, worker_rules, ErrorCode, RuleSet, Severity, ValidationError, ValidationResult,
    ValidationSummary,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    import_bytes, import_file, import_parsed, validate_bytes, CsvInfo, DryRunCounts, ImportMode,
    ImportOptions, ImportReport,
};
pub use transform::record::to_domain_records;

// =============================================================================
// Re-exports - Reconciliation and execution
// =============================================================================

pub use batch::{BatchExecutor, BatchOutcome, Operation, DEFAULT_BATCH_SIZE};
pub use reconcile::{Reconciler, Reconciliation, MATCH_PRIORITY};
pub use store::{FileStore, MemoryStore, WorkerRepository};

// =============================================================================
// Re-exports - Templates
// =============================================================================

pub use template::{generate_sample, generate_template, worker_sample, worker_template};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}

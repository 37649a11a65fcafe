//! Row validation for bulk worker files.
//!
//! - [`primitives`] - Single-cell format checks and value transformers
//! - [`engine`] - Generic rule-set driven validation engine
//! - [`worker`] - The worker rule set (columns, contextual and cross-field rules)
//!
//! # Example
//!
//! ```rust,ignore
//! use staffload::parser::RawRow;
//! use staffload::validation::{validate, worker_rules};
//!
//! let row: RawRow = [("first_name", "Ada"), ("last_name", "Lovelace"), ("phone", "+44 20 7946 0018")]
//!     .into_iter()
//!     .collect();
//!
//! let result = validate(&[row], &worker_rules());
//! assert!(result.success);
//! assert_eq!(result.summary.valid_rows, 1);
//! ```

pub mod engine;
pub mod primitives;
pub mod worker;

pub use engine::{
    row_number, validate, CellContext, CellValue, Check, ColumnRule, CrossFieldValidator,
    ErrorCode, RuleSet, Severity, ValidatedRow, ValidationError, ValidationResult,
    ValidationSummary, HEADER_ROW,
};
pub use worker::{sample_rows, worker_rules, worker_rules_at};

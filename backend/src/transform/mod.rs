//! Transformation module.
//!
//! This module turns validated rows into persisted workers:
//! - Record: accepted rows to nested [`crate::models::Worker`] records
//! - Pipeline: parse, validate, transform and execute per import mode

pub mod pipeline;
pub mod record;

pub use pipeline::*;
pub use record::{to_domain_record, to_domain_records};

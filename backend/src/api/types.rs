//! REST API types.
//!
//! Every import endpoint answers with an [`ImportResponse`]: the full report
//! plus a coarse status the UI can switch on.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::ImportReport;

/// Response sent after an upload was processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Status: "ready", "warning", "error"
    pub status: String,

    /// Uploaded file name, if the client sent one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Carries the job id, mode, CSV info, validation and outcome
    #[serde(flatten)]
    pub report: ImportReport,
}

impl ImportResponse {
    pub fn new(report: ImportReport, file_name: Option<String>) -> Self {
        Self {
            status: report.status().to_string(),
            file_name,
            report,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

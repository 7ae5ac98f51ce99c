use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// One parsed `/execute` submission. Immutable once parsed, dropped when the
/// request completes.
#[derive(Debug, Default)]
pub struct ExecutionRequest {
    pub script: Option<String>,
    /// Field order from the form is preserved.
    pub args: Vec<String>,
    pub files: Vec<UploadedFile>,
}

/// A file part from the multipart form. The name is already reduced to its
/// final path component.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The serialization contract handed back to the HTTP layer:
/// `{error?, stdout?, stderr?}` plus the status code.
#[derive(Debug, Serialize)]
pub struct Envelope {
    #[serde(skip)]
    pub status: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl Envelope {
    /// A zero-exit, clean-stderr script run.
    pub fn success(stdout: String) -> Self {
        Self {
            status: StatusCode::OK,
            error: None,
            stdout: Some(stdout),
            stderr: None,
        }
    }

    pub fn from_error(err: &GatewayError) -> Self {
        Self {
            status: err.status(),
            error: Some(err.to_string()),
            stdout: None,
            stderr: err.stderr().map(str::to_string),
        }
    }

    /// Serialize per the verbosity policy: quiet mode returns only the
    /// status code with an empty body so stdout/stderr never leak to callers
    /// that shouldn't see them.
    pub fn into_response(self, verbose: bool) -> Response {
        if verbose {
            (self.status, Json(self)).into_response()
        } else {
            self.status.into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub scripts: u64,
    pub files_dir_ready: bool,
}

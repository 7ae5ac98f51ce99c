use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can stop a request before it produces script output.
///
/// The `Display` text of each variant is the client-visible message; any
/// server-side detail (I/O errors, raw panic strings) is logged where the
/// error is raised and never carried here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidScript(String),

    #[error("{0}")]
    InvalidArgs(String),

    #[error("{0}")]
    InvalidFiles(String),

    #[error("The script \"{0}\" is not executable.")]
    NotExecutable(String),

    #[error("Could not save files: {}.", .0.join(", "))]
    SaveFailed(Vec<String>),

    #[error("Failed to run the script, check permissions.")]
    ExecFailed { stderr: String },

    #[error("The script timed out after {0} seconds.")]
    Timeout(u64),

    /// Anything escaping the pipeline: multipart decode failures, broken
    /// pipes, and other surprises. The detail string is for the server log.
    #[error("Internal server error.")]
    Unexpected(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidScript(_)
            | GatewayError::InvalidArgs(_)
            | GatewayError::InvalidFiles(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotExecutable(_) => StatusCode::FORBIDDEN,
            GatewayError::SaveFailed(_)
            | GatewayError::ExecFailed { .. }
            | GatewayError::Timeout(_)
            | GatewayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Captured stderr to attach to the response envelope, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GatewayError::ExecFailed { stderr } if !stderr.is_empty() => Some(stderr.as_str()),
            _ => None,
        }
    }
}

use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use tracing::{error, info};

use crate::config::Config;
use crate::error::GatewayError;
use crate::exec::{self, Outcome};
use crate::files;
use crate::validate;

use super::models::{Envelope, ExecutionRequest, HealthResponse, UploadedFile};
use super::AppState;

// ── Health ──────────────────────────────────────────────────────────

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let scripts = std::fs::read_dir(&state.config.scripts_dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_file())
                .count() as u64
        })
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        scripts,
        files_dir_ready: state.config.files_dir.is_dir(),
    })
}

// ── Execute ─────────────────────────────────────────────────────────

/// POST /execute
///
/// The outermost boundary: every pipeline failure is converted to an
/// envelope here, and nothing below this point writes the response.
pub async fn execute(State(state): State<AppState>, multipart: Multipart) -> Response {
    let verbose = state.config.verbose;
    let envelope = match run_pipeline(&state.config, multipart).await {
        Ok(envelope) => envelope,
        Err(err) => {
            match &err {
                GatewayError::Unexpected(detail) => {
                    error!("unexpected failure: {detail}");
                }
                other => info!("request rejected: {other}"),
            }
            Envelope::from_error(&err)
        }
    };
    envelope.into_response(verbose)
}

/// The validation-and-execution pipeline. Order matters: all three
/// validators must pass before any file is written or any process spawned.
async fn run_pipeline(config: &Config, multipart: Multipart) -> Result<Envelope, GatewayError> {
    let request = parse_request(multipart).await?;

    let script_path = validate::script_errors(request.script.as_deref(), config)
        .map_err(GatewayError::InvalidScript)?;
    validate::args_errors(&request.args, config).map_err(GatewayError::InvalidArgs)?;
    validate::file_errors(&request.files, config).map_err(GatewayError::InvalidFiles)?;

    if !request.files.is_empty() {
        files::ensure_files_dir(&config.files_dir);
        let saved = files::save_all(&config.files_dir, &request.files);
        let failed: Vec<String> = saved
            .iter()
            .filter(|s| s.bytes_written == 0)
            .map(|s| s.name.clone())
            .collect();
        if !failed.is_empty() {
            return Err(GatewayError::SaveFailed(failed));
        }
        info!(count = saved.len(), "uploads persisted");
    }

    if !exec::is_executable(&script_path) {
        let name = request.script.unwrap_or_default();
        info!(script = %name, "execution refused, no execute permission");
        return Err(GatewayError::NotExecutable(name));
    }

    let output = exec::run(&script_path, &request.args, config.exec_timeout()).await?;
    match output.outcome {
        Outcome::Success => Ok(Envelope::success(output.stdout)),
        Outcome::Failure => {
            error!(
                script = %script_path.display(),
                "script failed: {}",
                output.stderr.trim_end()
            );
            Err(GatewayError::ExecFailed {
                stderr: output.stderr,
            })
        }
    }
}

/// Pull `script`, `args` and `files` fields out of the multipart form.
/// Unknown fields are ignored; decode failures are server-boundary errors.
async fn parse_request(mut multipart: Multipart) -> Result<ExecutionRequest, GatewayError> {
    let mut request = ExecutionRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(decode_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("script") => {
                let data = field.bytes().await.map_err(decode_error)?;
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    GatewayError::InvalidScript("The script has illegal characters.".to_string())
                })?;
                request.script = Some(text);
            }
            Some("args") => {
                let data = field.bytes().await.map_err(decode_error)?;
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    GatewayError::InvalidArgs("The args must be plain text.".to_string())
                })?;
                request.args.push(text);
            }
            Some("files") => {
                let name = field
                    .file_name()
                    .map(basename)
                    .unwrap_or_else(|| "unknown".to_string());
                let data = field.bytes().await.map_err(decode_error)?;
                request.files.push(UploadedFile { name, data });
            }
            _ => {}
        }
    }

    Ok(request)
}

fn decode_error(e: axum::extract::multipart::MultipartError) -> GatewayError {
    GatewayError::Unexpected(format!("multipart decode failed: {e}"))
}

/// Uploads land in a flat namespace: strip any path the client sent along.
fn basename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .to_string()
}

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{error, warn};

use crate::error::GatewayError;

/// Captured stdout/stderr are truncated to this many bytes each.
pub const MAX_OUTPUT_BYTES: usize = 65536;

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// What a finished script produced. A non-zero exit or anything on stderr
/// counts as a failure.
#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub outcome: Outcome,
}

/// Permission probe: does the resolved script carry an execute bit?
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Run the resolved script with the argument list as a discrete argv array.
///
/// Nothing is shell-interpreted: an argument containing `;`, `$()` or spaces
/// reaches the script as a single literal argv entry. The wait is bounded by
/// `limit`; on expiry the child is SIGKILLed (via `kill_on_drop`) and a
/// timeout error is returned.
pub async fn run(
    path: &Path,
    args: &[String],
    limit: Duration,
) -> Result<ExecOutput, GatewayError> {
    let child = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            error!("failed to spawn {}: {}", path.display(), e);
            GatewayError::ExecFailed {
                stderr: String::new(),
            }
        })?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(waited) => waited.map_err(|e| {
            error!("failed waiting on {}: {}", path.display(), e);
            GatewayError::Unexpected(e.to_string())
        })?,
        Err(_) => {
            // Dropping the timed-out future drops the child handle, which
            // kills the process.
            warn!(
                "script {} timed out after {}s, child killed",
                path.display(),
                limit.as_secs()
            );
            return Err(GatewayError::Timeout(limit.as_secs()));
        }
    };

    let stdout = truncated(&output.stdout);
    let stderr = truncated(&output.stderr);
    let outcome = if output.status.success() && stderr.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failure
    };

    Ok(ExecOutput {
        stdout,
        stderr,
        outcome,
    })
}

fn truncated(bytes: &[u8]) -> String {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    // Back the cut off any UTF-8 continuation bytes so truncation never
    // leaves half a code point behind.
    let mut end = MAX_OUTPUT_BYTES;
    while end > 0 && bytes[end] & 0xC0 == 0x80 {
        end -= 1;
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

//! Subprocess execution shared by the command-line adapters.
//!
//! Every tool runs with `kill_on_drop(true)`: if the pipeline future is
//! dropped (client disconnect, request deadline) the child is killed instead
//! of running on unattended. A per-invocation timeout caps tools that hang on
//! malformed input.

use crate::error::AdapterError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Longest stderr excerpt kept in [`AdapterError::CommandFailed`].
const MAX_STDERR_CHARS: usize = 2000;

/// Run `program` with `args`, waiting at most `timeout`.
///
/// Returns the captured output when the process exits successfully.
pub async fn run_command<I, S>(
    program: &Path,
    args: I,
    timeout: Duration,
) -> Result<Output, AdapterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", cmd.as_std());
    let child = cmd.spawn()?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            error!("{} timed out after {}s", program.display(), timeout.as_secs());
            return Err(AdapterError::Timeout {
                program: program.display().to_string(),
                secs: timeout.as_secs(),
            });
        }
    };

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = tail(String::from_utf8_lossy(&output.stderr).trim());
        error!(
            "{} exited with {:?}: {}",
            program.display(),
            output.status.code(),
            stderr
        );
        Err(AdapterError::CommandFailed {
            program: program.display().to_string(),
            code: output.status.code(),
            stderr,
        })
    }
}

/// Keep the last `MAX_STDERR_CHARS` characters; tools print the real error last.
fn tail(s: &str) -> String {
    let count = s.chars().count();
    if count <= MAX_STDERR_CHARS {
        s.to_string()
    } else {
        let skipped: String = s.chars().skip(count - MAX_STDERR_CHARS).collect();
        format!("\u{2026}{skipped}")
    }
}

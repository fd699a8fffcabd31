//! Host tool invocation for the reporters.
//!
//! Every external tool runs through one bounded executor: piped output, a
//! hard timeout, and stderr detail on nonzero exit. A slow or wedged host
//! tool must never hang the bot.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::reporters::ReportError;

/// Run a host tool and return its stdout.
pub async fn run_tool(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ReportError> {
    debug!("running host tool: {} {:?}", program, args);

    let output = tokio::time::timeout(
        timeout,
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ReportError::tool(program, format!("timed out after {}s", timeout.as_secs())))?
    .map_err(|e| ReportError::tool(program, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::tool(
            program,
            format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

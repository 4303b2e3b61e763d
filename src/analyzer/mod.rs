//! Local analysis of a package's source checkout.
//!
//! - [`checkout`]: shallow clone plus a script-free `npm install`.
//! - [`depcheck`]: runs the external dependency-usage checker and reports
//!   modules that are imported but not declared.
//!
//! Tools run one at a time and are awaited to completion. A non-zero exit is
//! a [`ScanError::Tooling`] failure; nothing here is retried.

pub mod checkout;
pub mod depcheck;

use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::error::ScanError;

/// Run `program args..` in `cwd`, streaming its output when `inherit` is set.
async fn run_tool(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    inherit: bool,
) -> Result<(), ScanError> {
    debug!(program, ?args, "Running");

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if inherit {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = cmd.status().await.map_err(|e| tooling(program, e.to_string()))?;
    if !status.success() {
        return Err(tooling(program, format!("exited with {status}")));
    }
    Ok(())
}

/// Run a tool and capture stdout, regardless of exit status.
async fn capture_tool(program: &str, args: &[String], cwd: &Path) -> Result<Output, ScanError> {
    debug!(program, ?args, "Running");

    Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| tooling(program, e.to_string()))
}

fn tooling(program: &str, detail: String) -> ScanError {
    ScanError::Tooling {
        tool: program.to_string(),
        detail,
    }
}

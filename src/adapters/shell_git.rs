//! Shell implementation of the VersionControl port.
//! Commands run through `sh -c` so configured deploy commands and git
//! invocations share one code path.

use crate::error::{CmdOutput, VcError};
use crate::ports::VersionControl;
use std::process::Command;

pub struct ShellVc;

impl ShellVc {
    fn execute(&self, command: &str) -> CmdOutput {
        tracing::debug!("[sh] >>> {command}");
        let spawned = Command::new("sh").arg("-c").arg(command).output();
        match spawned {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(stderr.trim_end());
                }
                if output.status.success() {
                    tracing::debug!("[sh] <<< OK ({} bytes)", text.len());
                } else {
                    tracing::debug!(
                        "[sh] <<< exit={}",
                        output.status.code().unwrap_or(-1)
                    );
                }
                CmdOutput {
                    success: output.status.success(),
                    output: text,
                }
            }
            Err(err) => CmdOutput {
                success: false,
                output: format!("failed to spawn `{command}`: {err}"),
            },
        }
    }
}

impl VersionControl for ShellVc {
    fn run(&self, command: &str) -> Result<String, VcError> {
        let result = self.execute(command);
        if result.success {
            Ok(result.output)
        } else {
            Err(VcError {
                command: command.to_string(),
                output: result.output,
            })
        }
    }

    fn run_unchecked(&self, command: &str) -> CmdOutput {
        self.execute(command)
    }
}

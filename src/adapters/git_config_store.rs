//! Settings adapter over `git config`.
//! Keys live in the repository's local git config under the `tend.*`
//! namespace, so `git config tend.base-branch develop` works as expected.

use crate::ports::SettingsStore;
use std::process::Command;

pub struct GitConfigStore;

impl SettingsStore for GitConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["config", "--get", key])
            .output()
            .ok()?;
        // An unset key exits non-zero; that's an absent value, not an error.
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn set(&self, key: &str, value: &str) {
        match Command::new("git").args(["config", key, value]).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!(
                    "git config {key} exited {}; value not saved",
                    status.code().unwrap_or(-1)
                );
            }
            Err(err) => tracing::warn!("could not run git config {key}: {err}"),
        }
    }
}

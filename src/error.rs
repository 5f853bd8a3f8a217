//! Error types shared across ports and adapters.

use thiserror::Error;

/// Failure talking to the code host.
///
/// The "already exists" case is distinguished so `review` can degrade to
/// finding and reporting the existing pull request instead of aborting.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("a pull request for this branch already exists: {0}")]
    AlreadyExists(String),

    #[error("code host request failed: {0}")]
    Api(String),
}

/// A checked shell command exited non-zero.
///
/// This is the one error category allowed to take the process down: a failed
/// git command mid-workflow leaves repository state that must not be papered
/// over.
#[derive(Debug, Error)]
#[error("command failed: `{command}`\n{output}")]
pub struct VcError {
    pub command: String,
    pub output: String,
}

/// Captured result of an unchecked shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    pub success: bool,
    pub output: String,
}

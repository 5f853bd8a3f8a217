//! Version control port (trait).
//! Defines the interface for running local commands without coupling to any
//! particular process machinery.

use crate::error::{CmdOutput, VcError};

/// Port for shelling out to git (and, for deploys, arbitrary commands).
/// Implementations may spawn real processes or be test fakes.
pub trait VersionControl {
    /// Run a command and fail on a non-zero exit. A failed checked command
    /// is fatal to the workflow: the error carries the command and its
    /// captured output so the caller can surface exactly what broke.
    fn run(&self, command: &str) -> Result<String, VcError>;

    /// Run a command tolerating failure. The output (possibly partial) and
    /// the success flag are returned; nothing is raised.
    fn run_unchecked(&self, command: &str) -> CmdOutput;

    /// Name of the branch currently checked out.
    fn current_branch(&self) -> Result<String, VcError> {
        self.run("git rev-parse --abbrev-ref HEAD")
            .map(|out| out.trim().to_string())
    }
}

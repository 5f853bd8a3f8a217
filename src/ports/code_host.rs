//! Code host port (trait).
//! The slice of a hosting provider's REST surface this tool needs: pull
//! requests, comments, build statuses. Implementations may call a real
//! provider or be test fakes.

use crate::domain::{Build, Comment, MergeOutcome, MergeRequest, NewPullRequest, PullRequest};
use crate::error::HostError;
use chrono::{DateTime, Utc};

/// Port for the code-hosting provider.
pub trait CodeHost {
    /// Login of the authenticated user running this session.
    fn current_user(&self) -> Result<String, HostError>;

    /// Find the open pull request from `head` into `base`, if any.
    fn find_open(&self, head: &str, base: &str) -> Result<Option<PullRequest>, HostError>;

    /// Open a new pull request. Fails with [`HostError::AlreadyExists`]
    /// when the provider reports one is already open for this branch pair.
    fn create(&self, request: &NewPullRequest) -> Result<PullRequest, HostError>;

    /// Ask the provider to merge. A refused merge is an outcome, not an
    /// error: the returned message explains what the provider said.
    fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome, HostError>;

    /// All comments on the pull request, ordered by creation time.
    fn comments(&self, number: u64) -> Result<Vec<Comment>, HostError>;

    /// Build status for a head commit, `None` when no build exists.
    fn build_status(&self, sha: &str) -> Result<Option<Build>, HostError>;

    /// When the head commit was last pushed, if the provider knows.
    fn last_push_time(&self, sha: &str) -> Result<Option<DateTime<Utc>>, HostError>;
}

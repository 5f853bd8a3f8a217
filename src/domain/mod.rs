pub mod approval;
pub mod types;

pub use approval::ApprovalPolicy;
pub use types::{
    Build, Comment, MergeMethod, MergeOutcome, MergeRequest, NewPullRequest, PullRequest,
};

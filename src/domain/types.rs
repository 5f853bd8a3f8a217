//! Pure data types for the review-and-merge domain.
//! No I/O - these are what the ports hand back and forth.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::fmt;

/// A pull request as fetched from the code host.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub description: String,
    pub html_url: String,
    pub feature_branch: String,
    pub base_branch: String,
    pub head_sha: String,
    /// Provider-native payload, kept verbatim for fields we don't model.
    pub raw: serde_json::Value,
}

impl PullRequest {
    /// Escape hatch for provider fields not modeled above.
    pub fn raw_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.raw.get(name)
    }
}

/// Input for opening a new pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// A comment on a pull request, ordered by creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Build status attached to a head commit.
///
/// A pull request with no build at all is `None` at the port level; this
/// struct with all-`None` fields never means "no build".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Build {
    pub state: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl Build {
    /// A build blocks merging unless it reported success.
    pub fn passed(&self) -> bool {
        match &self.state {
            None => true,
            Some(state) => state == "success",
        }
    }
}

/// How the code host should combine the feature branch on merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMethod {
    #[default]
    Squash,
    Merge,
    Rebase,
}

impl MergeMethod {
    /// Lenient parse; anything unrecognized falls back to squash.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => MergeMethod::Merge,
            "rebase" => MergeMethod::Rebase,
            _ => MergeMethod::Squash,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Squash => "squash",
            MergeMethod::Merge => "merge",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for merging a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub number: u64,
    pub title: String,
    pub message: String,
    pub sha: String,
    pub method: MergeMethod,
}

/// What the code host reported back from a merge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_no_state_passes() {
        assert!(Build::default().passed());
    }

    #[test]
    fn build_success_passes() {
        let build = Build {
            state: Some("success".to_string()),
            ..Build::default()
        };
        assert!(build.passed());
    }

    #[test]
    fn build_pending_and_failure_do_not_pass() {
        for state in ["pending", "failure", "error"] {
            let build = Build {
                state: Some(state.to_string()),
                ..Build::default()
            };
            assert!(!build.passed(), "{state} should block");
        }
    }

    #[test]
    fn merge_method_parse_is_lenient() {
        assert_eq!(MergeMethod::parse("merge"), MergeMethod::Merge);
        assert_eq!(MergeMethod::parse(" Rebase "), MergeMethod::Rebase);
        assert_eq!(MergeMethod::parse("squash"), MergeMethod::Squash);
        assert_eq!(MergeMethod::parse("octopus"), MergeMethod::Squash);
        assert_eq!(MergeMethod::parse(""), MergeMethod::Squash);
    }

    #[test]
    fn raw_field_reads_unmodeled_provider_data() {
        let pr = PullRequest {
            number: 7,
            title: "Add parser".to_string(),
            description: String::new(),
            html_url: "https://example.com/pr/7".to_string(),
            feature_branch: "parser".to_string(),
            base_branch: "main".to_string(),
            head_sha: "abc123".to_string(),
            raw: serde_json::json!({"mergeable": true}),
        };
        assert_eq!(
            pr.raw_field("mergeable"),
            Some(&serde_json::Value::Bool(true))
        );
        assert_eq!(pr.raw_field("locked"), None);
    }
}

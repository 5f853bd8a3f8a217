//! Pure approval logic for pull requests.
//! No I/O - all functions are data in, data out. The gate feeds in comments,
//! the last push time, and a policy; these decide who counts as approving.

use super::types::Comment;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases that count as an approval unless the user configured their own.
static DEFAULT_APPROVAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)lgtm|looks good to me|:\+1:|:thumbsup:|:shipit:").unwrap());

/// The rule set used to decide whether a pull request is approved.
///
/// Built fresh from raw setting values on every decision so a policy change
/// mid-session is observed immediately.
#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    pub minimum_approvals: Option<u32>,
    pub approval_pattern: Regex,
}

impl ApprovalPolicy {
    /// Build a policy from raw setting values. Blank or unparseable values
    /// fall back to "no minimum" and the default phrase pattern.
    pub fn from_raw(minimum: Option<&str>, pattern: Option<&str>) -> Self {
        let minimum_approvals = minimum
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<u32>().ok());

        let approval_pattern = pattern
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| match Regex::new(s) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!("ignoring invalid approval pattern {s:?}: {err}");
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_APPROVAL_PATTERN.clone());

        Self {
            minimum_approvals,
            approval_pattern,
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::from_raw(None, None)
    }
}

/// Distinct comment authors other than the pull request's own author,
/// in first-seen order.
pub fn reviewers(comments: &[Comment], current_user: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for comment in comments {
        if comment.author == current_user {
            continue;
        }
        if !seen.contains(&comment.author) {
            seen.push(comment.author.clone());
        }
    }
    seen
}

/// Reviewers whose most recent comment after the last push matches the
/// approval pattern.
///
/// Only comments strictly after `last_push` count; a later non-matching
/// comment from the same author withdraws their approval. With no known
/// push time every comment counts.
pub fn approvals(
    comments: &[Comment],
    current_user: &str,
    policy: &ApprovalPolicy,
    last_push: Option<DateTime<Utc>>,
) -> Vec<String> {
    let mut approved: Vec<String> = Vec::new();
    for comment in comments {
        if comment.author == current_user {
            continue;
        }
        if let Some(pushed_at) = last_push {
            if comment.created_at <= pushed_at {
                continue;
            }
        }
        if policy.approval_pattern.is_match(&comment.body) {
            if !approved.contains(&comment.author) {
                approved.push(comment.author.clone());
            }
        } else {
            approved.retain(|name| name != &comment.author);
        }
    }
    approved
}

/// Reviewers who have not (or no longer) approved.
pub fn pending_reviewers(reviewers: &[String], approvals: &[String]) -> Vec<String> {
    reviewers
        .iter()
        .filter(|name| !approvals.contains(name))
        .cloned()
        .collect()
}

//! Code host adapter over the `gh` CLI.
//!
//! Every call shells out to `gh api`; the `{owner}/{repo}` placeholders are
//! filled by gh from the current repository's remote, so no repo detection
//! is needed here.

use crate::domain::{Build, Comment, MergeOutcome, MergeRequest, NewPullRequest, PullRequest};
use crate::error::HostError;
use crate::ports::CodeHost;
use chrono::{DateTime, Utc};
use std::process::Command;

pub struct GhCodeHost;

impl GhCodeHost {
    fn gh(&self, args: &[String]) -> Result<String, HostError> {
        tracing::debug!("[gh] >>> gh {}", args.join(" "));
        let output = Command::new("gh")
            .args(args)
            .output()
            .map_err(|err| HostError::Api(format!("could not run gh: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                "[gh] <<< FAILED (exit={}): {stderr}",
                output.status.code().unwrap_or(-1)
            );
            if stderr.contains("already exists") {
                return Err(HostError::AlreadyExists(stderr));
            }
            return Err(HostError::Api(stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!("[gh] <<< OK ({} bytes)", stdout.len());
        Ok(stdout)
    }

    fn parse_json(&self, text: &str) -> Result<serde_json::Value, HostError> {
        serde_json::from_str(text)
            .map_err(|err| HostError::Api(format!("unexpected response from gh: {err}")))
    }

    fn pull_request_from(value: &serde_json::Value) -> PullRequest {
        PullRequest {
            number: value["number"].as_u64().unwrap_or(0),
            title: value["title"].as_str().unwrap_or_default().to_string(),
            description: value["body"].as_str().unwrap_or_default().to_string(),
            html_url: value["html_url"].as_str().unwrap_or_default().to_string(),
            feature_branch: value["head"]["ref"].as_str().unwrap_or_default().to_string(),
            base_branch: value["base"]["ref"].as_str().unwrap_or_default().to_string(),
            head_sha: value["head"]["sha"].as_str().unwrap_or_default().to_string(),
            raw: value.clone(),
        }
    }

    fn comments_from(&self, text: &str) -> Result<Vec<Comment>, HostError> {
        let values = self.parse_json(text)?;
        let Some(items) = values.as_array() else {
            return Ok(Vec::new());
        };
        Ok(items
            .iter()
            .filter_map(|item| {
                let created_at = parse_time(item["created_at"].as_str()?)?;
                Some(Comment {
                    author: item["user"]["login"].as_str()?.to_string(),
                    body: item["body"].as_str().unwrap_or_default().to_string(),
                    created_at,
                })
            })
            .collect())
    }
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

impl CodeHost for GhCodeHost {
    fn current_user(&self) -> Result<String, HostError> {
        self.gh(&args(&["api", "user", "--jq", ".login"]))
    }

    fn find_open(&self, head: &str, base: &str) -> Result<Option<PullRequest>, HostError> {
        let path = format!("repos/{{owner}}/{{repo}}/pulls?state=open&base={base}&per_page=100");
        let text = self.gh(&args(&["api", &path]))?;
        let values = self.parse_json(&text)?;
        let Some(items) = values.as_array() else {
            return Ok(None);
        };
        Ok(items
            .iter()
            .find(|item| item["head"]["ref"].as_str() == Some(head))
            .map(Self::pull_request_from))
    }

    fn create(&self, request: &NewPullRequest) -> Result<PullRequest, HostError> {
        let text = self.gh(&args(&[
            "api",
            "repos/{owner}/{repo}/pulls",
            "--method",
            "POST",
            "-f",
            &format!("title={}", request.title),
            "-f",
            &format!("body={}", request.body),
            "-f",
            &format!("head={}", request.head),
            "-f",
            &format!("base={}", request.base),
        ]))?;
        let value = self.parse_json(&text)?;
        Ok(Self::pull_request_from(&value))
    }

    fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome, HostError> {
        let path = format!("repos/{{owner}}/{{repo}}/pulls/{}/merge", request.number);
        let result = self.gh(&args(&[
            "api",
            &path,
            "--method",
            "PUT",
            "-f",
            &format!("commit_title={}", request.title),
            "-f",
            &format!("commit_message={}", request.message),
            "-f",
            &format!("sha={}", request.sha),
            "-f",
            &format!("merge_method={}", request.method),
        ]));
        match result {
            Ok(text) => {
                let value = self.parse_json(&text)?;
                Ok(MergeOutcome {
                    merged: value["merged"].as_bool().unwrap_or(false),
                    message: value["message"].as_str().unwrap_or_default().to_string(),
                })
            }
            // A refused merge (not mergeable, sha mismatch) comes back as a
            // non-2xx response; that is an outcome to report, not an error.
            Err(HostError::Api(message)) => Ok(MergeOutcome {
                merged: false,
                message,
            }),
            Err(other) => Err(other),
        }
    }

    fn comments(&self, number: u64) -> Result<Vec<Comment>, HostError> {
        let issue_path =
            format!("repos/{{owner}}/{{repo}}/issues/{number}/comments?per_page=100");
        let review_path =
            format!("repos/{{owner}}/{{repo}}/pulls/{number}/comments?per_page=100");
        let mut comments = self.comments_from(&self.gh(&args(&["api", &issue_path]))?)?;
        comments.extend(self.comments_from(&self.gh(&args(&["api", &review_path]))?)?);
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    fn build_status(&self, sha: &str) -> Result<Option<Build>, HostError> {
        let path = format!("repos/{{owner}}/{{repo}}/commits/{sha}/status");
        let text = self.gh(&args(&["api", &path]))?;
        let value = self.parse_json(&text)?;
        let statuses = value["statuses"].as_array();
        if statuses.map_or(true, |list| list.is_empty()) {
            return Ok(None);
        }
        let latest = &statuses.unwrap()[0];
        Ok(Some(Build {
            state: value["state"].as_str().map(str::to_string),
            description: latest["description"].as_str().map(str::to_string),
            url: latest["target_url"].as_str().map(str::to_string),
        }))
    }

    fn last_push_time(&self, sha: &str) -> Result<Option<DateTime<Utc>>, HostError> {
        let path = format!("repos/{{owner}}/{{repo}}/commits/{sha}");
        let text = self.gh(&args(&["api", &path, "--jq", ".commit.committer.date"]))?;
        Ok(parse_time(&text))
    }
}

//! Merge gate: decides whether a pull request may merge and drives the
//! delivery when it may.
//!
//! Binds one fetched pull request to the session's ports. Approval math is
//! pure and lives in `domain::approval`; this wires it to live comments,
//! build status and the last push time, and owns the side-effecting merge
//! sequence (confirm, merge on the host, sync the base branch, clean up).

use crate::domain::approval::{self, ApprovalPolicy};
use crate::domain::{Build, Comment, MergeMethod, MergeRequest, PullRequest};
use crate::error::HostError;
use crate::ports::settings::keys;
use crate::ports::{CodeHost, Console, SettingsStore, VersionControl};
use crate::session::Session;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Caller choices for a delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliverOptions {
    pub method: MergeMethod,
    pub title: Option<String>,
    pub message: Option<String>,
    /// Skip the confirmation prompt (`--skip-lgtm`, forced deliveries).
    pub skip_confirmation: bool,
}

pub struct MergeGate<'a> {
    pr: &'a PullRequest,
    session: &'a Session,
    current_user: String,
}

impl<'a> MergeGate<'a> {
    pub fn new(pr: &'a PullRequest, session: &'a Session) -> Result<Self, HostError> {
        let current_user = session.host.current_user()?;
        Ok(Self {
            pr,
            session,
            current_user,
        })
    }

    /// Policy is re-read on every decision so a settings change mid-session
    /// is observed immediately.
    fn policy(&self) -> ApprovalPolicy {
        let settings = &self.session.settings;
        ApprovalPolicy::from_raw(
            settings.get(keys::MINIMUM_APPROVALS).as_deref(),
            settings.get(keys::APPROVAL_REGEX).as_deref(),
        )
    }

    pub fn comments(&self) -> Result<Vec<Comment>, HostError> {
        self.session.host.comments(self.pr.number)
    }

    pub fn has_comments(&self) -> Result<bool, HostError> {
        Ok(!self.comments()?.is_empty())
    }

    fn last_push(&self) -> Result<Option<DateTime<Utc>>, HostError> {
        self.session.host.last_push_time(&self.pr.head_sha)
    }

    pub fn reviewers(&self) -> Result<Vec<String>, HostError> {
        Ok(approval::reviewers(&self.comments()?, &self.current_user))
    }

    pub fn approvals(&self) -> Result<Vec<String>, HostError> {
        Ok(approval::approvals(
            &self.comments()?,
            &self.current_user,
            &self.policy(),
            self.last_push()?,
        ))
    }

    pub fn pending_reviewers(&self) -> Result<Vec<String>, HostError> {
        Ok(approval::pending_reviewers(
            &self.reviewers()?,
            &self.approvals()?,
        ))
    }

    pub fn approval_minimums_reached(&self) -> Result<bool, HostError> {
        match self.policy().minimum_approvals {
            None => Ok(true),
            Some(min) => Ok(self.approvals()?.len() >= min as usize),
        }
    }

    /// With a minimum configured, the conversation counts as settled only
    /// when the very last comment is itself an approval.
    pub fn all_comments_addressed(&self) -> Result<bool, HostError> {
        let policy = self.policy();
        if policy.minimum_approvals.is_none() {
            return Ok(true);
        }
        Ok(match self.comments()?.last() {
            Some(last) => policy.approval_pattern.is_match(&last.body),
            None => false,
        })
    }

    pub fn approved(&self) -> Result<bool, HostError> {
        match self.policy().minimum_approvals {
            None => {
                let any_activity = self.has_comments()? || !self.approvals()?.is_empty();
                Ok(any_activity && self.pending_reviewers()?.is_empty())
            }
            Some(_) => Ok(self.approval_minimums_reached()? && self.all_comments_addressed()?),
        }
    }

    pub fn build(&self) -> Result<Option<Build>, HostError> {
        self.session.host.build_status(&self.pr.head_sha)
    }

    fn build_passed(&self) -> Result<bool, HostError> {
        Ok(self.build()?.map_or(true, |build| build.passed()))
    }

    pub fn good_to_merge(&self, force: bool) -> Result<bool, HostError> {
        if force {
            return Ok(true);
        }
        Ok(self.build_passed()? && self.approved()?)
    }

    /// One human-readable reason the merge is blocked, highest priority
    /// first: build, approval minimum, unsettled last comment, pending
    /// reviewers, then no review at all.
    pub fn rejection_message(&self) -> Result<String, HostError> {
        if !self.build_passed()? {
            let build = self.build()?.unwrap_or_default();
            return Ok(format!(
                "{}: {}",
                build.description.unwrap_or_default(),
                build.url.unwrap_or_default()
            ));
        }
        if !self.approval_minimums_reached()? {
            let min = self.policy().minimum_approvals.unwrap_or(0);
            return Ok(format!("You need approval from at least {min} users!"));
        }
        if !self.all_comments_addressed()? {
            if let Some(last) = self.comments()?.last() {
                return Ok(format!(
                    "The last comment is holding up approval:\n{}",
                    last.body
                ));
            }
        }
        let pending = self.pending_reviewers()?;
        if !pending.is_empty() {
            return Ok(format!(
                "You still need a LGTM from: {}",
                pending.join(", ")
            ));
        }
        Ok("Your code has not been reviewed yet.".to_string())
    }

    /// Merge commit body: the pull request description when present, else
    /// the feature branch's first commit message, plus the merge trailer
    /// and credits for everyone who gave an LGTM.
    pub fn commit_message_for_merge(&self) -> Result<String> {
        let description = self.pr.description.trim();
        let mut message = if description.is_empty() {
            self.first_commit_message()?
        } else {
            description.to_string()
        };
        message.push_str(&format!("\nMerges #{}\n", self.pr.number));

        let approvals = self.approvals()?;
        if !approvals.is_empty() {
            message.push_str(&format!("\nLGTM given by: @{}\n", approvals.join(", @")));
        }
        Ok(message)
    }

    fn first_commit_message(&self) -> Result<String> {
        let shas = self.session.git.run(&format!(
            "git rev-list --reverse {}..{}",
            self.pr.base_branch, self.pr.feature_branch
        ))?;
        let first = match shas.lines().next() {
            Some(sha) if !sha.trim().is_empty() => sha.trim().to_string(),
            _ => return Ok(String::new()),
        };
        let message = self
            .session
            .git
            .run(&format!("git log -1 --format=%B {first}"))?;
        Ok(message.trim().to_string())
    }

    /// Run the delivery: confirm, merge on the host, then sync the base
    /// branch and optionally delete the feature branch.
    ///
    /// Host refusals and provider errors are reported, never raised; a
    /// failed local git command after a successful merge is fatal.
    pub fn deliver(&self, options: &DeliverOptions) -> Result<()> {
        let console = &self.session.console;
        if !self.deliver_confirmed(options) {
            console.say("Merge aborted.");
            return Ok(());
        }

        let (title, message) = self.compose_merge_message(options)?;
        let request = MergeRequest {
            number: self.pr.number,
            title,
            message,
            sha: self.pr.head_sha.clone(),
            method: options.method,
        };

        let outcome = match self.session.host.merge(&request) {
            Ok(outcome) => outcome,
            Err(err) => {
                console.say(&err.to_string());
                return Ok(());
            }
        };

        if !outcome.merged {
            console.say(&outcome.message);
            console.say(&format!(
                "The pull request was not merged. Fix the problem above, then run `tend deliver {}` again.",
                self.pr.base_branch
            ));
            return Ok(());
        }

        console.say(&format!(
            "Merged #{} into {}.",
            self.pr.number, self.pr.base_branch
        ));
        self.session
            .git
            .run(&format!("git checkout {}", self.pr.base_branch))?;
        self.session
            .git
            .run(&format!("git pull origin {}", self.pr.base_branch))?;

        if self.cleanup_confirmed() {
            self.session
                .git
                .run(&format!("git push origin :{}", self.pr.feature_branch))?;
            self.session
                .git
                .run(&format!("git branch -D {}", self.pr.feature_branch))?;
            console.say(&format!("Deleted branch {}.", self.pr.feature_branch));
        }
        Ok(())
    }

    fn deliver_confirmed(&self, options: &DeliverOptions) -> bool {
        if options.skip_confirmation || self.session.settings.get_bool(keys::ALWAYS_DELIVER) {
            return true;
        }
        self.session.console.confirm(&format!(
            "Merge pull request #{} into {}?",
            self.pr.number, self.pr.base_branch
        ))
    }

    fn cleanup_confirmed(&self) -> bool {
        if self.session.settings.get_bool(keys::ALWAYS_CLEANUP) {
            return true;
        }
        self.session.console.confirm(&format!(
            "Delete the feature branch {}?",
            self.pr.feature_branch
        ))
    }

    fn compose_merge_message(&self, options: &DeliverOptions) -> Result<(String, String)> {
        if let (Some(title), Some(message)) = (&options.title, &options.message) {
            return Ok((title.clone(), message.clone()));
        }
        let title = match &options.title {
            Some(title) => title.clone(),
            None => self
                .session
                .console
                .ask("Merge commit title", &self.pr.title),
        };
        let message = match &options.message {
            Some(message) => message.clone(),
            None => {
                let default = self.commit_message_for_merge()?;
                self.session.console.ask("Merge commit message", &default)
            }
        };
        Ok((title, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::{FakeHost, FakeWorld};
    use crate::domain::MergeOutcome;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn pr() -> PullRequest {
        PullRequest {
            number: 2,
            title: "Add feature".to_string(),
            description: "A whole new feature.".to_string(),
            html_url: "https://example.com/pulls/2".to_string(),
            feature_branch: "new-feature".to_string(),
            base_branch: "main".to_string(),
            head_sha: "headsha".to_string(),
            raw: serde_json::Value::Null,
        }
    }

    fn comment(author: &str, body: &str, secs: i64) -> Comment {
        Comment {
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn world_with_comments(comments: Vec<Comment>) -> FakeWorld {
        let host = FakeHost::with_pr(pr());
        *host.comments.borrow_mut() = comments;
        FakeWorld::with_host(host)
    }

    #[test]
    fn single_lgtm_approves_when_no_minimum_is_set() {
        let world = world_with_comments(vec![comment("tito", "lgtm", 10)]);
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert_eq!(gate.reviewers().unwrap(), vec!["tito"]);
        assert_eq!(gate.approvals().unwrap(), vec!["tito"]);
        assert!(gate.pending_reviewers().unwrap().is_empty());
        assert!(gate.approved().unwrap());
        assert!(gate.good_to_merge(false).unwrap());
    }

    #[test]
    fn minimum_of_two_rejects_a_single_approval() {
        let world = world_with_comments(vec![comment("tito", "lgtm", 10)]);
        world.settings.set(keys::MINIMUM_APPROVALS, "2");
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert!(!gate.approved().unwrap());
        assert_eq!(
            gate.rejection_message().unwrap(),
            "You need approval from at least 2 users!"
        );
    }

    #[test]
    fn unanswered_reviewer_blocks_approval() {
        let world = world_with_comments(vec![
            comment("tito", "lgtm", 10),
            comment("ringo", "Needs more cowbell.", 11),
        ]);
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert_eq!(gate.approvals().unwrap(), vec!["tito"]);
        assert_eq!(gate.pending_reviewers().unwrap(), vec!["ringo"]);
        assert!(!gate.approved().unwrap());
        assert_eq!(
            gate.rejection_message().unwrap(),
            "You still need a LGTM from: ringo"
        );
    }

    #[test]
    fn no_comments_means_not_reviewed_yet() {
        let world = world_with_comments(vec![]);
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert!(!gate.approved().unwrap());
        assert_eq!(
            gate.rejection_message().unwrap(),
            "Your code has not been reviewed yet."
        );
    }

    #[test]
    fn minimum_met_but_last_comment_unsettled_blocks() {
        let world = world_with_comments(vec![
            comment("tito", "lgtm", 10),
            comment("ringo", "lgtm", 11),
            comment("paul", "What about the tests?", 12),
        ]);
        world.settings.set(keys::MINIMUM_APPROVALS, "2");
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert!(gate.approval_minimums_reached().unwrap());
        assert!(!gate.all_comments_addressed().unwrap());
        assert!(!gate.approved().unwrap());
        assert_eq!(
            gate.rejection_message().unwrap(),
            "The last comment is holding up approval:\nWhat about the tests?"
        );
    }

    #[test]
    fn failing_build_blocks_and_outranks_other_reasons() {
        let world = world_with_comments(vec![comment("tito", "lgtm", 10)]);
        *world.host.build.borrow_mut() = Some(Build {
            state: Some("failure".to_string()),
            description: Some("Build failed".to_string()),
            url: Some("https://ci.example.com/1".to_string()),
        });
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert!(gate.approved().unwrap());
        assert!(!gate.good_to_merge(false).unwrap());
        assert_eq!(
            gate.rejection_message().unwrap(),
            "Build failed: https://ci.example.com/1"
        );
    }

    #[test]
    fn force_overrides_build_and_approval_state() {
        let world = world_with_comments(vec![]);
        *world.host.build.borrow_mut() = Some(Build {
            state: Some("failure".to_string()),
            ..Build::default()
        });
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert!(gate.good_to_merge(true).unwrap());
    }

    #[test]
    fn approvals_ignore_comments_from_before_the_last_push() {
        let world = world_with_comments(vec![
            comment("tito", "lgtm", 10),
            comment("ringo", "lgtm", 50),
        ]);
        world.host.last_push.set(Some(Utc.timestamp_opt(20, 0).unwrap()));
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert_eq!(gate.approvals().unwrap(), vec!["ringo"]);
        assert_eq!(gate.pending_reviewers().unwrap(), vec!["tito"]);
        assert!(!gate.approved().unwrap());
    }

    #[test]
    fn commit_message_prefers_description_and_credits_approvers() {
        let world = world_with_comments(vec![
            comment("tito", "lgtm", 10),
            comment("ringo", "lgtm", 11),
        ]);
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert_eq!(
            gate.commit_message_for_merge().unwrap(),
            "A whole new feature.\nMerges #2\n\nLGTM given by: @tito, @ringo\n"
        );
    }

    #[test]
    fn commit_message_falls_back_to_first_commit() {
        let world = world_with_comments(vec![]);
        world
            .git
            .stub("git rev-list --reverse main..new-feature", "aaa111\nbbb222\n");
        world
            .git
            .stub("git log -1 --format=%B aaa111", "Initial feature work\n");
        let session = world.session();
        let mut pr = pr();
        pr.description = String::new();
        let gate = MergeGate::new(&pr, &session).unwrap();

        assert_eq!(
            gate.commit_message_for_merge().unwrap(),
            "Initial feature work\nMerges #2\n"
        );
    }

    #[test]
    fn deliver_merges_and_cleans_up_the_feature_branch() {
        let world = world_with_comments(vec![comment("tito", "lgtm", 10)]);
        world.settings.set(keys::ALWAYS_DELIVER, "true");
        world.settings.set(keys::ALWAYS_CLEANUP, "true");
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        gate.deliver(&DeliverOptions::default()).unwrap();

        let merges = world.host.merges.borrow();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].number, 2);
        assert_eq!(merges[0].method, MergeMethod::Squash);
        assert_eq!(merges[0].title, "Add feature");
        assert!(world.git.ran("git checkout main"));
        assert!(world.git.ran("git pull origin main"));
        assert!(world.git.ran("git push origin :new-feature"));
        assert!(world.git.ran("git branch -D new-feature"));
    }

    #[test]
    fn deliver_reports_a_refused_merge_without_touching_local_branches() {
        let world = world_with_comments(vec![]);
        *world.host.merge_outcome.borrow_mut() = MergeOutcome {
            merged: false,
            message: "Head branch was modified.".to_string(),
        };
        world.settings.set(keys::ALWAYS_DELIVER, "true");
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        gate.deliver(&DeliverOptions::default()).unwrap();

        assert!(world.console.said_containing("Head branch was modified."));
        assert!(world.console.said_containing("was not merged"));
        assert!(!world.git.ran("git checkout main"));
    }

    #[test]
    fn deliver_aborts_when_the_user_declines() {
        let world = world_with_comments(vec![]);
        world.console.confirm_answers.borrow_mut().push_back(false);
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        gate.deliver(&DeliverOptions::default()).unwrap();

        assert!(world.console.said_containing("Merge aborted."));
        assert!(world.host.merges.borrow().is_empty());
    }

    #[test]
    fn deliver_uses_supplied_title_and_message_without_prompting() {
        let world = world_with_comments(vec![]);
        world.settings.set(keys::ALWAYS_DELIVER, "true");
        world
            .console
            .ask_answers
            .borrow_mut()
            .push_back("unused".to_string());
        let session = world.session();
        let pr = pr();
        let gate = MergeGate::new(&pr, &session).unwrap();

        gate.deliver(&DeliverOptions {
            method: MergeMethod::Rebase,
            title: Some("custom title".to_string()),
            message: Some("custom message".to_string()),
            skip_confirmation: false,
        })
        .unwrap();

        let merges = world.host.merges.borrow();
        assert_eq!(merges[0].title, "custom title");
        assert_eq!(merges[0].message, "custom message");
        assert_eq!(merges[0].method, MergeMethod::Rebase);
        // The scripted answer was never consumed, so nothing prompted.
        assert_eq!(world.console.ask_answers.borrow().len(), 1);
    }
}

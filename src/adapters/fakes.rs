//! In-memory port fakes for unit tests.

use crate::domain::{Build, Comment, MergeOutcome, MergeRequest, NewPullRequest, PullRequest};
use crate::error::{CmdOutput, HostError, VcError};
use crate::ports::{CodeHost, Console, SettingsStore, VersionControl};
use crate::session::Session;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Fake shell: canned outputs keyed by command string, everything logged.
#[derive(Default)]
pub struct FakeVc {
    pub canned: RefCell<HashMap<String, String>>,
    pub failing: RefCell<HashSet<String>>,
    pub log: RefCell<Vec<String>>,
}

impl FakeVc {
    pub fn stub(&self, command: &str, output: &str) {
        self.canned
            .borrow_mut()
            .insert(command.to_string(), output.to_string());
    }

    pub fn fail_on(&self, command: &str) {
        self.failing.borrow_mut().insert(command.to_string());
    }

    pub fn ran(&self, command: &str) -> bool {
        self.log.borrow().iter().any(|c| c == command)
    }
}

impl VersionControl for FakeVc {
    fn run(&self, command: &str) -> Result<String, VcError> {
        self.log.borrow_mut().push(command.to_string());
        if self.failing.borrow().contains(command) {
            return Err(VcError {
                command: command.to_string(),
                output: "fake failure".to_string(),
            });
        }
        Ok(self.canned.borrow().get(command).cloned().unwrap_or_default())
    }

    fn run_unchecked(&self, command: &str) -> CmdOutput {
        self.log.borrow_mut().push(command.to_string());
        CmdOutput {
            success: !self.failing.borrow().contains(command),
            output: self.canned.borrow().get(command).cloned().unwrap_or_default(),
        }
    }
}

/// Fake code host holding one open pull request and its review state.
pub struct FakeHost {
    pub user: String,
    pub open_pr: RefCell<Option<PullRequest>>,
    pub comments: RefCell<Vec<Comment>>,
    pub build: RefCell<Option<Build>>,
    pub last_push: Cell<Option<DateTime<Utc>>>,
    pub merge_outcome: RefCell<MergeOutcome>,
    pub merges: RefCell<Vec<MergeRequest>>,
    pub created: RefCell<Vec<NewPullRequest>>,
    pub create_error: RefCell<Option<HostError>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            user: "me".to_string(),
            open_pr: RefCell::new(None),
            comments: RefCell::new(Vec::new()),
            build: RefCell::new(None),
            last_push: Cell::new(None),
            merge_outcome: RefCell::new(MergeOutcome {
                merged: true,
                message: "Pull request successfully merged.".to_string(),
            }),
            merges: RefCell::new(Vec::new()),
            created: RefCell::new(Vec::new()),
            create_error: RefCell::new(None),
        }
    }
}

impl FakeHost {
    pub fn with_pr(pr: PullRequest) -> Self {
        let host = Self::default();
        *host.open_pr.borrow_mut() = Some(pr);
        host
    }
}

impl CodeHost for FakeHost {
    fn current_user(&self) -> Result<String, HostError> {
        Ok(self.user.clone())
    }

    fn find_open(&self, head: &str, base: &str) -> Result<Option<PullRequest>, HostError> {
        Ok(self
            .open_pr
            .borrow()
            .clone()
            .filter(|pr| pr.feature_branch == head && pr.base_branch == base))
    }

    fn create(&self, request: &NewPullRequest) -> Result<PullRequest, HostError> {
        if let Some(err) = self.create_error.borrow_mut().take() {
            return Err(err);
        }
        self.created.borrow_mut().push(request.clone());
        let pr = PullRequest {
            number: 1,
            title: request.title.clone(),
            description: request.body.clone(),
            html_url: "https://example.com/pulls/1".to_string(),
            feature_branch: request.head.clone(),
            base_branch: request.base.clone(),
            head_sha: "headsha".to_string(),
            raw: serde_json::Value::Null,
        };
        *self.open_pr.borrow_mut() = Some(pr.clone());
        Ok(pr)
    }

    fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome, HostError> {
        self.merges.borrow_mut().push(request.clone());
        Ok(self.merge_outcome.borrow().clone())
    }

    fn comments(&self, _number: u64) -> Result<Vec<Comment>, HostError> {
        Ok(self.comments.borrow().clone())
    }

    fn build_status(&self, _sha: &str) -> Result<Option<Build>, HostError> {
        Ok(self.build.borrow().clone())
    }

    fn last_push_time(&self, _sha: &str) -> Result<Option<DateTime<Utc>>, HostError> {
        Ok(self.last_push.get())
    }
}

/// Fake settings backed by a plain map.
#[derive(Default)]
pub struct FakeSettings {
    pub values: RefCell<HashMap<String, String>>,
}

impl FakeSettings {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, value) in pairs {
            store.set(key, value);
        }
        store
    }
}

impl SettingsStore for FakeSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Fake console recording output and replaying scripted answers.
/// With no scripted answers, `confirm` says yes and `ask` takes the default.
#[derive(Default)]
pub struct FakeConsole {
    pub said: RefCell<Vec<String>>,
    pub confirm_answers: RefCell<VecDeque<bool>>,
    pub ask_answers: RefCell<VecDeque<String>>,
}

impl FakeConsole {
    pub fn said_containing(&self, needle: &str) -> bool {
        self.said.borrow().iter().any(|line| line.contains(needle))
    }
}

impl Console for FakeConsole {
    fn say(&self, message: &str) {
        self.said.borrow_mut().push(message.to_string());
    }

    fn confirm(&self, _prompt: &str) -> bool {
        self.confirm_answers.borrow_mut().pop_front().unwrap_or(true)
    }

    fn ask(&self, _prompt: &str, default: &str) -> String {
        self.ask_answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Handles onto every fake plus the session wrapping them.
pub struct FakeWorld {
    pub git: Rc<FakeVc>,
    pub host: Rc<FakeHost>,
    pub settings: Rc<FakeSettings>,
    pub console: Rc<FakeConsole>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            git: Rc::new(FakeVc::default()),
            host: Rc::new(FakeHost::default()),
            settings: Rc::new(FakeSettings::default()),
            console: Rc::new(FakeConsole::default()),
        }
    }

    pub fn with_host(host: FakeHost) -> Self {
        Self {
            host: Rc::new(host),
            ..Self::new()
        }
    }

    pub fn session(&self) -> Session {
        Session {
            git: self.git.clone(),
            host: self.host.clone(),
            settings: self.settings.clone(),
            console: self.console.clone(),
        }
    }
}

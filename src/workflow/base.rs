//! The built-in command set: every command the CLI exposes, registered
//! against a fresh registry with its parameter spec, docs, and the
//! before-callbacks that fill branch parameters from settings.

use crate::domain::{MergeMethod, NewPullRequest};
use crate::error::HostError;
use crate::gate::{DeliverOptions, MergeGate};
use crate::ports::settings::keys;
use crate::ports::{Console, SettingsStore, VersionControl};
use crate::session::Session;
use crate::workflow::registry::{CommandDocs, CommandRegistry, ParamMap, ParamSpec, Value};
use anyhow::Result;
use std::rc::Rc;

const DEFAULT_BASE_BRANCH: &str = "main";
const DEFAULT_REMOTE: &str = "origin";

/// Register the base commands on `registry`.
///
/// The settings handle is captured by the before-callbacks that default
/// branch parameters, so a configured base branch is observed per run.
pub fn install(registry: &mut CommandRegistry, settings: Rc<dyn SettingsStore>) {
    install_start(registry);
    install_review(registry);
    install_status(registry);
    install_deploy(registry);
    install_stage(registry);
    install_deliver(registry);
    install_refresh(registry);

    for (command, param) in [
        ("start", "base"),
        ("review", "base-branch"),
        ("status", "destination-branch"),
        ("deliver", "base-branch"),
        ("refresh", "base"),
    ] {
        fill_from_settings(
            registry,
            command,
            param,
            keys::BASE_BRANCH,
            DEFAULT_BASE_BRANCH,
            settings.clone(),
        );
    }
    fill_from_settings(
        registry,
        "refresh",
        "remote",
        keys::REMOTE,
        DEFAULT_REMOTE,
        settings,
    );
}

/// Before-callback: when `param` is blank, take it from the settings key,
/// falling back to a built-in default.
fn fill_from_settings(
    registry: &mut CommandRegistry,
    command: &str,
    param: &str,
    key: &'static str,
    fallback: &'static str,
    settings: Rc<dyn SettingsStore>,
) {
    let param = param.to_string();
    registry.before(command, move |params| {
        if params.get(&param).is_some_and(|v| !v.is_blank()) {
            return None;
        }
        let value = settings
            .get_nonblank(key)
            .unwrap_or_else(|| fallback.to_string());
        let mut overrides = ParamMap::new();
        overrides.insert(param.clone(), Value::str(value));
        Some(overrides)
    });
}

/// Report a provider failure and carry on; only git failures are fatal.
fn host_try<T>(console: &Rc<dyn Console>, result: Result<T, HostError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            console.say(&err.to_string());
            None
        }
    }
}

fn install_start(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default()
        .argument("feature-branch", "")
        .flag("base", "");
    registry.define("start", spec, |session, params| {
        let feature = params["feature-branch"].as_str().trim().to_string();
        if feature.is_empty() {
            session.console.say("Usage: tend start <feature-branch>");
            return Ok(());
        }
        let base = params["base"].as_str();
        session.git.run(&format!("git checkout {base}"))?;
        session.git.run(&format!("git pull origin {base}"))?;
        session.git.run(&format!("git checkout -b {feature}"))?;
        session
            .console
            .say(&format!("Created branch {feature} off {base}."));
        Ok(())
    });
    registry.document(
        "start",
        CommandDocs {
            summary: "Create a feature branch off the base branch".to_string(),
            arguments: vec![(
                "feature-branch".to_string(),
                "name of the branch to create".to_string(),
            )],
            flags: vec![("base".to_string(), "branch to start from".to_string())],
            switches: vec![],
            description: "Checks out the base branch, pulls the latest changes, \
                          and creates the feature branch from it."
                .to_string(),
        },
    );
}

fn install_review(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default()
        .argument("base-branch", "")
        .flag("title", "")
        .flag("message", "");
    registry.define("review", spec, |session, params| {
        let base = params["base-branch"].as_str().to_string();
        let feature = session.git.current_branch()?;
        session.git.run(&format!("git push origin {feature}"))?;

        let title = match params["title"].as_str().trim() {
            "" => session.console.ask("Pull request title", &feature),
            title => title.to_string(),
        };
        let body = match params["message"].as_str().trim() {
            "" => session.console.ask("Pull request description", ""),
            message => message.to_string(),
        };

        let request = NewPullRequest {
            title,
            body,
            head: feature.clone(),
            base: base.clone(),
        };
        match session.host.create(&request) {
            Ok(pr) => {
                session.console.say(&format!(
                    "Successfully created pull request #{}: {}",
                    pr.number, pr.title
                ));
                session
                    .console
                    .say(&format!("Pull request URL: {}", pr.html_url));
            }
            Err(HostError::AlreadyExists(_)) => {
                match host_try(&session.console, session.host.find_open(&feature, &base)) {
                    Some(Some(existing)) => session.console.say(&format!(
                        "A pull request from {feature} into {base} already exists: {}",
                        existing.html_url
                    )),
                    _ => session
                        .console
                        .say("A pull request for this branch already exists."),
                }
            }
            Err(err) => session.console.say(&err.to_string()),
        }
        Ok(())
    });
    registry.document(
        "review",
        CommandDocs {
            summary: "Push the feature branch and open a pull request".to_string(),
            arguments: vec![(
                "base-branch".to_string(),
                "branch the pull request targets".to_string(),
            )],
            flags: vec![
                ("title".to_string(), "pull request title".to_string()),
                ("message".to_string(), "pull request description".to_string()),
            ],
            switches: vec![],
            description: "Pushes the current branch and opens a pull request against \
                          the base branch; if one already exists it is reported instead."
                .to_string(),
        },
    );
}

fn install_status(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default().argument("destination-branch", "");
    registry.define("status", spec, |session, params| {
        let base = params["destination-branch"].as_str().to_string();
        let feature = session.git.current_branch()?;
        let console = &session.console;

        let Some(found) = host_try(console, session.host.find_open(&feature, &base)) else {
            return Ok(());
        };
        let Some(pr) = found else {
            console.say(&format!(
                "No open pull request from {feature} into {base}. Run `tend review` to open one."
            ));
            return Ok(());
        };

        let Some(gate) = host_try(console, MergeGate::new(&pr, session)) else {
            return Ok(());
        };
        console.say(&format!("Pull request #{}: {}", pr.number, pr.title));
        console.say(&format!("URL: {}", pr.html_url));
        match host_try(console, gate.build()) {
            Some(Some(build)) => console.say(&format!(
                "Build: {}",
                build.state.as_deref().unwrap_or("unknown")
            )),
            Some(None) => console.say("Build: none reported"),
            None => return Ok(()),
        }
        let Some(reviewers) = host_try(console, gate.reviewers()) else {
            return Ok(());
        };
        let Some(approvals) = host_try(console, gate.approvals()) else {
            return Ok(());
        };
        console.say(&format!("Reviewed by: {}", reviewers.join(", ")));
        console.say(&format!("LGTM given by: {}", approvals.join(", ")));

        match host_try(console, gate.good_to_merge(false)) {
            Some(true) => console.say("This pull request is ready to merge."),
            Some(false) => {
                if let Some(reason) = host_try(console, gate.rejection_message()) {
                    console.say(&reason);
                }
            }
            None => {}
        }
        Ok(())
    });
    registry.document(
        "status",
        CommandDocs {
            summary: "Show review and build state for the open pull request".to_string(),
            arguments: vec![(
                "destination-branch".to_string(),
                "branch the pull request targets".to_string(),
            )],
            flags: vec![],
            switches: vec![],
            description: "Reports the build status, reviewers, approvals and whether \
                          the pull request is ready to merge."
                .to_string(),
        },
    );
}

fn install_deploy(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default().argument("destination-server", "default");
    registry.define("deploy", spec, |session, params| {
        let destination = params["destination-server"].as_str().to_string();
        run_deploy(session, &destination, true);
        Ok(())
    });
    registry.document(
        "deploy",
        CommandDocs {
            summary: "Run the deploy command configured for a destination".to_string(),
            arguments: vec![(
                "destination-server".to_string(),
                "named deploy destination".to_string(),
            )],
            flags: vec![],
            switches: vec![],
            description: "Looks up the destination's deploy command (prompting and \
                          saving it on first use) and runs it."
                .to_string(),
        },
    );
}

/// Shared by `deploy` and `stage`. Returns whether the deploy succeeded;
/// a missing command only prompts when `ask_if_missing` is set.
fn run_deploy(session: &Session, destination: &str, ask_if_missing: bool) -> bool {
    let key = format!("{}.{destination}", keys::DEPLOY_PREFIX);
    let command = match session.settings.get_nonblank(&key) {
        Some(command) => command,
        None if ask_if_missing => {
            let command = session
                .console
                .ask(&format!("Deploy command for {destination}"), "");
            if command.trim().is_empty() {
                session
                    .console
                    .say(&format!("No deploy command configured for {destination}."));
                return false;
            }
            session.settings.set(&key, &command);
            command
        }
        None => return true,
    };

    let result = session.git.run_unchecked(&command);
    if result.success {
        session.console.say(&format!("Deployed to {destination}."));
    } else {
        session.console.say(&result.output);
        session
            .console
            .say(&format!("Deploy to {destination} failed."));
    }
    result.success
}

fn install_stage(registry: &mut CommandRegistry) {
    registry.define("stage", ParamSpec::default(), |session, _params| {
        let feature = session.git.current_branch()?;
        let staging = match session.settings.get_nonblank(keys::STAGING_BRANCH) {
            Some(branch) => branch,
            None => {
                let branch = session.console.ask("Staging branch", "staging");
                session.settings.set(keys::STAGING_BRANCH, &branch);
                branch
            }
        };

        session.git.run(&format!("git checkout {staging}"))?;
        session.git.run(&format!("git pull origin {staging}"))?;
        session.git.run(&format!("git merge {feature}"))?;
        session.git.run(&format!("git push origin {staging}"))?;
        session
            .console
            .say(&format!("Merged {feature} into {staging}."));

        run_deploy(session, &staging, false);
        Ok(())
    });
    registry.document(
        "stage",
        CommandDocs {
            summary: "Merge the feature branch into the staging branch".to_string(),
            arguments: vec![],
            flags: vec![],
            switches: vec![],
            description: "Merges the current branch into the configured staging branch, \
                          pushes it, and runs the staging deploy command when one is set."
                .to_string(),
        },
    );
}

fn install_deliver(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default()
        .argument("base-branch", "")
        .flag("merge-method", "squash")
        .switch("force", false)
        .switch("skip-lgtm", false);
    registry.define("deliver", spec, |session, params| {
        let base = params["base-branch"].as_str().to_string();
        let feature = session.git.current_branch()?;
        let console = &session.console;

        let Some(found) = host_try(console, session.host.find_open(&feature, &base)) else {
            return Ok(());
        };
        let Some(pr) = found else {
            console.say(&format!(
                "No open pull request from {feature} into {base}. Run `tend review` first."
            ));
            return Ok(());
        };

        let Some(gate) = host_try(console, MergeGate::new(&pr, session)) else {
            return Ok(());
        };
        let force = params["force"].as_bool();
        match host_try(console, gate.good_to_merge(force)) {
            Some(true) => gate.deliver(&DeliverOptions {
                method: MergeMethod::parse(params["merge-method"].as_str()),
                title: None,
                message: None,
                skip_confirmation: force || params["skip-lgtm"].as_bool(),
            })?,
            Some(false) => {
                if let Some(reason) = host_try(console, gate.rejection_message()) {
                    console.say(&reason);
                }
                console.say("Merge aborted.");
            }
            None => {}
        }
        Ok(())
    });
    registry.document(
        "deliver",
        CommandDocs {
            summary: "Merge the open pull request once its gates pass".to_string(),
            arguments: vec![(
                "base-branch".to_string(),
                "branch the pull request targets".to_string(),
            )],
            flags: vec![(
                "merge-method".to_string(),
                "squash, merge or rebase".to_string(),
            )],
            switches: vec![
                (
                    "force".to_string(),
                    "merge regardless of build and approval state".to_string(),
                ),
                (
                    "skip-lgtm".to_string(),
                    "skip the confirmation prompt".to_string(),
                ),
            ],
            description: "Checks the build and approval gates, merges the pull request \
                          on the code host, syncs the base branch, and optionally deletes \
                          the feature branch."
                .to_string(),
        },
    );
}

fn install_refresh(registry: &mut CommandRegistry) {
    let spec = ParamSpec::default().flag("remote", "").flag("base", "");
    registry.define("refresh", spec, |session, params| {
        let remote = params["remote"].as_str();
        let base = params["base"].as_str();
        let feature = session.git.current_branch()?;
        session.git.run(&format!("git fetch {remote}"))?;
        session.git.run(&format!("git pull {remote} {base}"))?;
        session
            .console
            .say(&format!("Refreshed {feature} with the latest {base}."));
        Ok(())
    });
    registry.document(
        "refresh",
        CommandDocs {
            summary: "Update the feature branch with the latest base branch".to_string(),
            arguments: vec![],
            flags: vec![
                ("remote".to_string(), "remote to fetch from".to_string()),
                ("base".to_string(), "branch to pull".to_string()),
            ],
            switches: vec![],
            description: "Fetches the remote and pulls the base branch into the \
                          current branch."
                .to_string(),
        },
    );
}

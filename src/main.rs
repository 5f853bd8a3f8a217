//! tend - review-and-merge git workflow CLI
//!
//! Wraps git and the code host to drive a feature branch from `start`
//! through `review` to `deliver`, gated on build status and reviewer
//! approval. A project can swap in a named workflow override (see
//! `workflow::resolution`) to change how individual commands behave.

mod adapters;
mod domain;
mod error;
mod gate;
mod ports;
mod session;
mod workflow;

use adapters::{GhCodeHost, GitConfigStore, ShellVc, TerminalConsole};
use anyhow::Result;
use clap::{Parser, Subcommand};
use ports::SettingsStore;
use session::Session;
use std::rc::Rc;
use workflow::{ParamMap, Value};

#[derive(Parser, Debug)]
#[command(name = "tend")]
#[command(about = "Review-and-merge git workflow: start, review, deliver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Create a feature branch off the base branch
    Start {
        /// Name of the branch to create
        feature_branch: String,
        /// Branch to start from (defaults to the configured base)
        #[arg(long)]
        base: Option<String>,
    },
    /// Push the feature branch and open a pull request
    Review {
        /// Branch the pull request targets
        base_branch: Option<String>,
        /// Pull request title
        #[arg(long)]
        title: Option<String>,
        /// Pull request description
        #[arg(long)]
        message: Option<String>,
    },
    /// Show review and build state for the open pull request
    Status {
        /// Branch the pull request targets
        destination_branch: Option<String>,
    },
    /// Run the deploy command configured for a destination
    Deploy {
        /// Named deploy destination
        destination_server: Option<String>,
    },
    /// Merge the feature branch into the staging branch
    Stage,
    /// Merge the open pull request once its gates pass
    Deliver {
        /// Branch the pull request targets
        base_branch: Option<String>,
        /// How to combine the branch: squash, merge or rebase
        #[arg(long, value_parser = ["squash", "merge", "rebase"])]
        merge_method: Option<String>,
        /// Merge regardless of build and approval state
        #[arg(long)]
        force: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        skip_lgtm: bool,
    },
    /// Update the feature branch with the latest base branch
    Refresh {
        /// Remote to fetch from
        #[arg(long)]
        remote: Option<String>,
        /// Branch to pull
        #[arg(long)]
        base: Option<String>,
    },
}

impl CliCommand {
    /// Command name and supplied parameters for registry dispatch.
    /// Omitted options stay out of the map so declared defaults and
    /// before-callbacks fill them in.
    fn into_invocation(self) -> (&'static str, ParamMap) {
        fn put(params: &mut ParamMap, key: &str, value: Option<String>) {
            if let Some(value) = value {
                params.insert(key.to_string(), Value::str(value));
            }
        }

        let mut params = ParamMap::new();
        match self {
            CliCommand::Start {
                feature_branch,
                base,
            } => {
                params.insert("feature-branch".to_string(), Value::str(feature_branch));
                put(&mut params, "base", base);
                ("start", params)
            }
            CliCommand::Review {
                base_branch,
                title,
                message,
            } => {
                put(&mut params, "base-branch", base_branch);
                put(&mut params, "title", title);
                put(&mut params, "message", message);
                ("review", params)
            }
            CliCommand::Status {
                destination_branch,
            } => {
                put(&mut params, "destination-branch", destination_branch);
                ("status", params)
            }
            CliCommand::Deploy {
                destination_server,
            } => {
                put(&mut params, "destination-server", destination_server);
                ("deploy", params)
            }
            CliCommand::Stage => ("stage", params),
            CliCommand::Deliver {
                base_branch,
                merge_method,
                force,
                skip_lgtm,
            } => {
                put(&mut params, "base-branch", base_branch);
                put(&mut params, "merge-method", merge_method);
                if force {
                    params.insert("force".to_string(), Value::Bool(true));
                }
                if skip_lgtm {
                    params.insert("skip-lgtm".to_string(), Value::Bool(true));
                }
                ("deliver", params)
            }
            CliCommand::Refresh { remote, base } => {
                put(&mut params, "remote", remote);
                put(&mut params, "base", base);
                ("refresh", params)
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let settings: Rc<dyn SettingsStore> = Rc::new(GitConfigStore);
    let session = Session {
        git: Rc::new(ShellVc),
        host: Rc::new(GhCodeHost),
        settings: settings.clone(),
        console: Rc::new(TerminalConsole),
    };

    let mut registry = workflow::fresh_registry(settings);
    let project_dir = std::env::current_dir()?;
    if let Some(name) = workflow::resolution::apply(&project_dir, &mut registry) {
        tracing::debug!("using workflow {name}");
    }

    let (name, params) = cli.command.into_invocation();
    registry.run(name, params, &session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deliver_flags_map_onto_registry_parameters() {
        let command = CliCommand::Deliver {
            base_branch: Some("develop".to_string()),
            merge_method: Some("rebase".to_string()),
            force: true,
            skip_lgtm: false,
        };
        let (name, params) = command.into_invocation();
        assert_eq!(name, "deliver");
        assert_eq!(params.get("base-branch"), Some(&Value::str("develop")));
        assert_eq!(params.get("merge-method"), Some(&Value::str("rebase")));
        assert_eq!(params.get("force"), Some(&Value::Bool(true)));
        // Unset switches are omitted; the declared default applies.
        assert_eq!(params.get("skip-lgtm"), None);
    }

    #[test]
    fn omitted_options_are_left_for_defaults_to_fill() {
        let (name, params) = CliCommand::Status {
            destination_branch: None,
        }
        .into_invocation();
        assert_eq!(name, "status");
        assert!(params.is_empty());
    }
}

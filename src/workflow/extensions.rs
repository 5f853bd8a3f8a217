//! Bundled workflow overrides.
//!
//! An override wraps a command's previous body in a closure: it can adjust
//! the parameters before delegating, or decide not to delegate at all.

use crate::ports::{Console, VersionControl};
use crate::session::Session;
use crate::workflow::registry::{CommandRegistry, ParamMap, Value};
use std::rc::Rc;

/// Every workflow that `use` can load, keyed by name.
pub fn known_workflows() -> &'static [(&'static str, fn(&mut CommandRegistry))] {
    &[
        ("flat-merge", install_flat_merge),
        ("rebase-before-merge", install_rebase_before_merge),
    ]
}

/// Always merge with a real merge commit: forces the merge method to
/// `merge` no matter what the caller asked for, then delegates.
pub fn install_flat_merge(registry: &mut CommandRegistry) {
    registry.override_command("deliver", |previous| {
        Rc::new(move |session: &Session, params: &ParamMap| {
            let mut params = params.clone();
            params.insert("merge-method".to_string(), Value::str("merge"));
            previous(session, &params)
        })
    });
}

/// Insist on a single commit before delivery: with more than one commit on
/// the feature branch the user is told to rebase and nothing is delivered;
/// with one (or none) the original deliver body runs unchanged.
pub fn install_rebase_before_merge(registry: &mut CommandRegistry) {
    registry.override_command("deliver", |previous| {
        Rc::new(move |session: &Session, params: &ParamMap| {
            let base = params
                .get("base-branch")
                .map(|v| v.as_str().to_string())
                .unwrap_or_default();
            let feature = session.git.current_branch()?;
            let counted = session
                .git
                .run(&format!("git rev-list --count {base}..{feature}"))?;
            let commits: usize = counted.trim().parse().unwrap_or(0);
            if commits > 1 {
                session.console.say(&format!(
                    "{feature} has {commits} commits. Squash them with `git rebase -i {base}`, then deliver again."
                ));
                return Ok(());
            }
            previous(session, params)
        })
    });
}

//! The workflow engine: command registry, base command set, bundled
//! overrides, and active-workflow resolution.

pub mod base;
pub mod extensions;
pub mod registry;
pub mod resolution;

pub use registry::{CommandDocs, CommandRegistry, ParamMap, ParamSpec, Value};

use crate::ports::SettingsStore;
use std::rc::Rc;

/// A registry loaded with the base command set.
pub fn fresh_registry(settings: Rc<dyn SettingsStore>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    base::install(&mut registry, settings);
    registry
}

/// Wipe the registry and reload the base command set, dropping any loaded
/// override and all callbacks. Used to isolate sequential workflow loads.
pub fn reset(registry: &mut CommandRegistry, settings: Rc<dyn SettingsStore>) {
    registry.clear();
    base::install(registry, settings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::{FakeHost, FakeWorld};
    use crate::domain::{Comment, MergeMethod, PullRequest};
    use crate::ports::settings::keys;

    #[test]
    fn reset_discards_a_loaded_override() {
        let host = FakeHost::with_pr(PullRequest {
            number: 1,
            title: "Add search".to_string(),
            description: "Search support.".to_string(),
            html_url: "https://example.com/pulls/1".to_string(),
            feature_branch: "search".to_string(),
            base_branch: "main".to_string(),
            head_sha: "sha".to_string(),
            raw: serde_json::Value::Null,
        });
        host.comments.borrow_mut().push(Comment {
            author: "tito".to_string(),
            body: "lgtm".to_string(),
            created_at: chrono::Utc::now(),
        });
        let world = FakeWorld::with_host(host);
        world.git.stub("git rev-parse --abbrev-ref HEAD", "search\n");
        world.settings.set(keys::ALWAYS_DELIVER, "true");
        world.settings.set(keys::ALWAYS_CLEANUP, "true");

        let mut registry = fresh_registry(world.settings.clone());
        extensions::install_flat_merge(&mut registry);
        reset(&mut registry, world.settings.clone());

        registry
            .run("deliver", ParamMap::new(), &world.session())
            .unwrap();

        // The base deliver body is back: a default delivery squashes.
        assert_eq!(world.host.merges.borrow()[0].method, MergeMethod::Squash);
    }
}

//! Settings port (trait).
//! Key/value configuration, last write wins. Values are strings; a blank
//! value is treated as unset everywhere.

/// Keys used by the built-in workflow, namespaced like git config entries.
pub mod keys {
    /// Default base branch for `start`, `review` and `deliver`.
    pub const BASE_BRANCH: &str = "tend.base-branch";
    /// Default remote for `refresh`.
    pub const REMOTE: &str = "tend.remote";
    /// Minimum number of approvals required; blank means "everyone".
    pub const MINIMUM_APPROVALS: &str = "tend.minimum-approvals";
    /// Custom approval phrase regex; blank means the built-in default.
    pub const APPROVAL_REGEX: &str = "tend.approval-regex";
    /// "true" skips the deliver confirmation prompt.
    pub const ALWAYS_DELIVER: &str = "tend.always-deliver";
    /// "true" skips the branch-cleanup confirmation prompt.
    pub const ALWAYS_CLEANUP: &str = "tend.always-cleanup";
    /// Branch that `stage` merges features into.
    pub const STAGING_BRANCH: &str = "tend.staging-branch";
    /// Prefix for per-destination deploy commands.
    pub const DEPLOY_PREFIX: &str = "tend.deploy";
}

/// Port for persisted configuration.
pub trait SettingsStore {
    /// Read a key; `None` when unset. Implementations should not cache:
    /// a decision made right after a write must observe the new value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key.
    fn set(&self, key: &str, value: &str);

    /// Read a key, treating blank as unset.
    fn get_nonblank(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Read a key as a boolean ("true"/"yes"/"1").
    fn get_bool(&self, key: &str) -> bool {
        matches!(
            self.get_nonblank(key).as_deref(),
            Some("true") | Some("yes") | Some("1")
        )
    }
}

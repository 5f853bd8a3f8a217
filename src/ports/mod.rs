pub mod code_host;
pub mod console;
pub mod settings;
pub mod version_control;

pub use code_host::CodeHost;
pub use console::Console;
pub use settings::SettingsStore;
pub use version_control::VersionControl;

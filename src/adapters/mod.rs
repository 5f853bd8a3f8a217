pub mod gh_code_host;
pub mod git_config_store;
pub mod shell_git;
pub mod terminal_console;

#[cfg(test)]
pub mod fakes;

pub use gh_code_host::GhCodeHost;
pub use git_config_store::GitConfigStore;
pub use shell_git::ShellVc;
pub use terminal_console::TerminalConsole;

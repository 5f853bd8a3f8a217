//! Console port (trait).
//! User-facing line I/O. The policy around prompts (e.g. "always deliver"
//! settings that skip confirmation) lives in the core; only the mechanism
//! is behind this port so tests can script answers.

/// Port for talking to the person running the command.
pub trait Console {
    /// Print a message for the user.
    fn say(&self, message: &str);

    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str) -> bool;

    /// Ask for a line of input, offering a default shown to the user.
    /// Returns the default when the answer is blank.
    fn ask(&self, prompt: &str, default: &str) -> String;
}

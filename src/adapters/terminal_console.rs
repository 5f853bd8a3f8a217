//! Console adapter over stdin/stdout.

use crate::ports::Console;
use std::io::{self, BufRead, Write};

pub struct TerminalConsole;

impl TerminalConsole {
    fn read_line(&self) -> String {
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return String::new();
        }
        answer.trim().to_string()
    }
}

impl Console for TerminalConsole {
    fn say(&self, message: &str) {
        println!("{message}");
    }

    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/n] ");
        let _ = io::stdout().flush();
        matches!(self.read_line().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn ask(&self, prompt: &str, default: &str) -> String {
        if default.is_empty() {
            print!("{prompt}: ");
        } else {
            print!("{prompt} [{default}]: ");
        }
        let _ = io::stdout().flush();
        let answer = self.read_line();
        if answer.is_empty() {
            default.to_string()
        } else {
            answer
        }
    }
}

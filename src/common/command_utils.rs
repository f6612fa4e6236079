use std::io;
use std::process::{Command, Output};

/// Run an external command and capture its output.
///
/// A missing executable surfaces as an `io::ErrorKind::NotFound` error so callers
/// can tell "not installed" apart from "ran and failed".
pub fn execute_command(cmd: &str, args: &[&str]) -> io::Result<Output> {
    Command::new(cmd).args(args).output()
}

/// Stdout of a finished command, trimmed, or `None` when the command failed.
pub fn successful_stdout(output: &Output) -> Option<String> {
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

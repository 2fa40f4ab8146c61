//! Allow-listed raw command entry point.
//!
//! Accepts a full command line typed by the user, but only if its first
//! token is `git`. The rest is split on whitespace and passed as discrete
//! arguments; there is no shell, quoting or expansion.

use thiserror::Error;

pub const GIT_TOKEN: &str = "git";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RawCommandError {
    #[error("Invalid command. Only \"git\" commands are allowed.")]
    NotAGitCommand,
    #[error("No git subcommand given")]
    MissingSubcommand,
}

/// Validate a raw command line and return the arguments after `git`.
pub fn parse_raw_command(line: &str) -> Result<Vec<String>, RawCommandError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(GIT_TOKEN) => {}
        _ => return Err(RawCommandError::NotAGitCommand),
    }

    let args: Vec<String> = tokens.map(str::to_string).collect();
    if args.is_empty() {
        return Err(RawCommandError::MissingSubcommand);
    }
    Ok(args)
}

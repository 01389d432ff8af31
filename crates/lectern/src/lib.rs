//! The `lectern` command-line host
//!
//! Resolves the terminal's graphics protocol once per invocation, then
//! extracts and runs the code blocks of a markdown file.

pub mod cli;
pub mod host;

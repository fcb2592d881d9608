//! # Command-Line Interface
//!
//! User-facing commands of the `short` binary and their output.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Setup | Token and member details | `install` |
//! | Stories | Search, view, update and create | `search`, `story`, `create` |
//! | Workspaces | Saved searches | `workspace`, `workspace --list` |
//! | Listings | Records stories point at | `members`, `workflows`, `projects`, `epics`, `iterations`, `docs` |
//! | Entities | Single records | `epic`, `iteration view`, `doc create` |
//! | Raw | Direct API access | `api /member` |
//!
//! Running `short` with no subcommand loads the `default` workspace.
//!
//! ## Output Formats
//!
//! All commands support the `--output` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging on stderr:
//! ```bash
//! short --verbose search owner:%self%
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.
//! Failures carry a [`Failure`] class that [`exit_code()`] maps to the
//! process exit status.

mod api_cmd;
mod app;
mod catalog;
mod create;
mod doc;
mod epic;
mod failure;
mod install;
mod iteration;
mod output;
mod render;
mod search;
mod session;
mod story;
mod system;
mod workspace;

pub use app::{run, Cli, Commands};
pub use failure::{exit_code, is_broken_pipe, Failure};
pub use output::{Output, OutputFormat};

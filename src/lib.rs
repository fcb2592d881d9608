//! short - a command-line client for the Shortcut project-management API
//!
//! Stories are fetched through the search or project endpoints, hydrated with
//! the records they reference, filtered and sorted in the client, and printed
//! through token templates. Saved searches ("workspaces") live in a small JSON
//! config document next to the API token.

pub mod api;
pub mod cli;
pub mod domain;
pub mod storage;

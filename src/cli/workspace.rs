//! `workspace` command: run, list and remove saved searches

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use super::search::{print_stories, FilterArgs};
use super::session::Session;
use crate::api::StoryListing;

const DEFAULT_WORKSPACE: &str = "default";

/// List stories matching a saved workspace query. Filter flags given here
/// override the saved ones.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkspaceArgs {
    /// Workspace to load (default: "default")
    #[arg(value_name = "NAME")]
    pub workspace: Option<String>,

    /// List saved workspaces
    #[arg(long)]
    pub list: bool,

    /// Remove a saved workspace
    #[arg(long, value_name = "NAME")]
    pub unset: Option<String>,

    /// Load named workspace
    #[arg(short = 'n', long, value_name = "NAME")]
    pub name: Option<String>,

    /// Print only workspace story output, no progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

pub async fn run(args: WorkspaceArgs, session: &Session, output: &Output) -> Result<()> {
    let output = output.quiet(args.quiet);
    let config = session.config();

    if config.token().is_none() {
        output.line("Not installed yet.");
        output.line("Please run: short install");
        return Ok(());
    }

    if config.workspaces.is_empty() {
        output.line("No workspace saved.");
        output.line("Please run:");
        output.line("  short search [options] --save");
        output.line("to create your first one.");
        return Ok(());
    }

    if args.list {
        return list(session, &output);
    }

    if let Some(name) = args.unset {
        if session.store().remove_workspace(&name)? {
            output.success(&format!("Successfully removed {} workspace", name));
        } else {
            output.error(&format!("Failed to remove {} workspace", name));
        }
        return Ok(());
    }

    let name = args
        .name
        .or(args.workspace)
        .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());
    let Ok(stored) = config.workspace(&name) else {
        output.line(&format!("No workspace saved with name {}", name));
        output.line("Please run:");
        output.line(&format!("  short search [options] --save {}", name));
        output.line("to create it.");
        return Ok(());
    };

    let options = args.filters.into_options(Vec::new()).merged_over(stored);
    let listing = StoryListing::new(options)?;
    let client = session.client()?;

    output.status(&format!("Loading {} workspace ...", name));
    let entities = session.entities(&client).await?;
    let stories = listing
        .run(&client, &entities, session.mention_name())
        .await
        .context("Error fetching stories")?;

    print_stories(&stories, listing.options(), false, session, &output)?;
    Ok(())
}

fn list(session: &Session, output: &Output) -> Result<()> {
    let workspaces = &session.config().workspaces;
    if output.is_json() {
        output.data(workspaces);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    writeln!(out, "Workspaces:")?;
    for (name, options) in workspaces {
        writeln!(out, "  {}: {}", name, options.to_flags())?;
    }
    Ok(())
}

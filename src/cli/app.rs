//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::api_cmd::{self, ApiArgs};
use super::catalog::{self, MembersArgs, ProjectsArgs, WorkflowsArgs};
use super::create::{self, CreateArgs};
use super::doc::{self, DocCommands, DocsArgs};
use super::epic::{self, EpicArgs, EpicsArgs};
use super::install::{self, InstallArgs};
use super::iteration::{self, IterationCommands, IterationsArgs};
use super::output::{Output, OutputFormat};
use super::search::{self, SearchArgs};
use super::session::Session;
use super::story::{self, StoryArgs};
use super::workspace::{self, WorkspaceArgs};

#[derive(Parser, Debug)]
#[command(name = "short")]
#[command(author, version, about = "A command-line client for Shortcut")]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub output: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Without a subcommand, the default workspace runs
    #[command(flatten)]
    pub workspace: WorkspaceArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the access token and other settings for the Shortcut API
    Install(InstallArgs),

    /// Search stories with optional query
    #[command(visible_alias = "s", alias = "find")]
    Search(SearchArgs),

    /// View or manipulate stories
    #[command(visible_alias = "st")]
    Story(StoryArgs),

    /// Create a story with provided details
    #[command(visible_alias = "c")]
    Create(CreateArgs),

    /// List members
    #[command(visible_alias = "m")]
    Members(MembersArgs),

    /// List workflows and their states
    #[command(visible_alias = "wf")]
    Workflows(WorkflowsArgs),

    /// List epics
    #[command(visible_alias = "e")]
    Epics(EpicsArgs),

    /// View or create an epic
    Epic(EpicArgs),

    /// List projects
    #[command(visible_alias = "p")]
    Projects(ProjectsArgs),

    /// List stories matching saved workspace query
    #[command(visible_alias = "w")]
    Workspace(WorkspaceArgs),

    /// List iterations
    #[command(visible_alias = "its")]
    Iterations(IterationsArgs),

    /// View, create, update or delete iterations
    #[command(subcommand)]
    Iteration(IterationCommands),

    /// List and search docs
    Docs(DocsArgs),

    /// View, create, update or delete a doc
    #[command(subcommand)]
    Doc(DocCommands),

    /// Make a request to the Shortcut API
    Api(ApiArgs),
}

/// Routes `tracing` events to stderr
///
/// `--verbose` turns on debug events for this crate; otherwise `RUST_LOG`
/// decides, defaulting to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("short_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub async fn run() -> Result<()> {
    let args = doc::expand_view_shorthand(std::env::args_os().collect());
    let cli = Cli::parse_from(args);
    init_tracing(cli.verbose);

    let output = Output::new(cli.output);
    let session = Session::load()?;

    let command = cli.command.unwrap_or(Commands::Workspace(cli.workspace));
    match command {
        Commands::Install(args) => install::run(args, &session, &output).await,
        Commands::Search(args) => search::run(args, &session, &output).await,
        Commands::Story(args) => story::run(args, &session, &output).await,
        Commands::Create(args) => create::run(args, &session, &output).await,
        Commands::Members(args) => catalog::members(args, &session, &output).await,
        Commands::Workflows(args) => catalog::workflows(args, &session, &output).await,
        Commands::Epics(args) => epic::list(args, &session, &output).await,
        Commands::Epic(args) => epic::run(args, &session, &output).await,
        Commands::Projects(args) => catalog::projects(args, &session, &output).await,
        Commands::Workspace(args) => workspace::run(args, &session, &output).await,
        Commands::Iterations(args) => iteration::list(args, &session, &output).await,
        Commands::Iteration(cmd) => iteration::run(cmd, &session, &output).await,
        Commands::Docs(args) => doc::list(args, &session, &output).await,
        Commands::Doc(cmd) => doc::run(cmd, &session, &output).await,
        Commands::Api(args) => api_cmd::run(args, &session, &output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_runs_the_workspace() {
        let cli = Cli::parse_from(["short", "mine", "-o", "alice"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.workspace.workspace.as_deref(), Some("mine"));
        assert_eq!(cli.workspace.filters.owner.as_deref(), Some("alice"));
    }

    #[test]
    fn aliases_resolve() {
        let cli = Cli::parse_from(["short", "s", "owner:%self%", "-I"]);
        assert!(matches!(cli.command, Some(Commands::Search(ref a)) if a.idonly));

        let cli = Cli::parse_from(["short", "find", "is:started"]);
        assert!(matches!(cli.command, Some(Commands::Search(_))));

        let cli = Cli::parse_from(["short", "its", "-C"]);
        assert!(matches!(cli.command, Some(Commands::Iterations(ref a)) if a.current));

        let cli = Cli::parse_from(["short", "wf"]);
        assert!(matches!(cli.command, Some(Commands::Workflows(_))));
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from(["short", "st", "12", "--output", "json", "-v"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.verbose);
        let Some(Commands::Story(story)) = cli.command else {
            panic!("expected story");
        };
        assert_eq!(story.ids, vec!["12"]);
    }
}

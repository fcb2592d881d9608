//! `search` command and the story list printing shared with `workspace`

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use super::session::Session;
use crate::api::StoryListing;
use crate::domain::{HydratedStory, ListOptions, StoryFormatter};

/// Client-side story filters
///
/// Every pattern is a case-insensitive regex; comparators take an optional
/// leading `<`, `>` or `=`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Include archived stories
    #[arg(short = 'a', long)]
    pub archived: bool,

    /// Stories created within criteria, e.g. '>2023-01-01'
    #[arg(short = 'c', long, value_name = "[OP]DATE")]
    pub created: Option<String>,

    /// Stories updated within criteria, e.g. '=2023-04'
    #[arg(short = 'u', long, value_name = "[OP]DATE")]
    pub updated: Option<String>,

    /// Stories estimated within criteria, e.g. '<5'
    #[arg(short = 'e', long, value_name = "[OP]NUMBER")]
    pub estimate: Option<String>,

    /// Stories with label id/name
    #[arg(short = 'l', long, value_name = "ID|NAME")]
    pub label: Option<String>,

    /// Stories with owner name/mention name
    #[arg(short = 'o', long, value_name = "NAME")]
    pub owner: Option<String>,

    /// Stories in projects matching id/name
    #[arg(short = 'p', long, value_name = "ID|NAME")]
    pub project: Option<String>,

    /// Stories in workflow state id/name
    #[arg(short = 's', long, value_name = "ID|NAME")]
    pub state: Option<String>,

    /// Stories in epic id/name
    #[arg(long, value_name = "ID|NAME")]
    pub epic: Option<String>,

    /// Stories in iteration id/name
    #[arg(short = 'i', long, value_name = "ID|NAME")]
    pub iteration: Option<String>,

    /// Stories with text in their title
    #[arg(short = 't', long)]
    pub text: Option<String>,

    /// Stories of type
    #[arg(short = 'y', long = "type", value_name = "NAME")]
    pub story_type: Option<String>,

    /// Sort by fields: accessor[:asc|desc][,next...]
    /// (default: state.position:asc,position:asc)
    #[arg(short = 'r', long, value_name = "FIELDS")]
    pub sort: Option<String>,

    /// Format each story by template
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    pub format: Option<String>,
}

impl FilterArgs {
    pub fn into_options(self, args: Vec<String>) -> ListOptions {
        ListOptions {
            args,
            archived: self.archived,
            created: self.created,
            updated: self.updated,
            estimate: self.estimate,
            label: self.label,
            owner: self.owner,
            project: self.project,
            state: self.state,
            epic: self.epic,
            iteration: self.iteration,
            text: self.text,
            story_type: self.story_type,
            sort: self.sort,
            format: self.format,
        }
    }
}

/// Search stories. Arguments are passed to the search API as search
/// operators; `%self%` is replaced by your mention name. Filter flags are
/// applied on top, in the client.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search operators, e.g. owner:%self% is:started
    #[arg(value_name = "SEARCH OPERATORS")]
    pub operators: Vec<String>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Print only story output, no progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print only the ids of matching stories
    #[arg(short = 'I', long)]
    pub idonly: bool,

    /// Save this search as a workspace
    #[arg(
        short = 'S',
        long,
        value_name = "NAME",
        num_args = 0..=1,
        default_missing_value = "default"
    )]
    pub save: Option<String>,
}

pub async fn run(args: SearchArgs, session: &Session, output: &Output) -> Result<()> {
    let output = output.quiet(args.quiet || args.idonly);
    let listing = StoryListing::new(args.filters.into_options(args.operators))?;
    let client = session.client()?;

    if !listing.options().has_search_operators() {
        output.status("Fetching all stories for search since no search operators were passed ...");
    }
    let entities = session.entities(&client).await?;
    let stories = listing
        .run(&client, &entities, session.mention_name())
        .await
        .context("Error fetching stories")?;

    print_stories(&stories, listing.options(), args.idonly, session, &output)?;

    if let Some(name) = args.save {
        session.store().save_workspace(&name, listing.options())?;
        output.success(&format!("Saved query as {} workspace", name));
    }
    Ok(())
}

/// Prints listed stories by template, as ids, or as JSON
pub(super) fn print_stories(
    stories: &[HydratedStory<'_>],
    options: &ListOptions,
    idonly: bool,
    session: &Session,
    output: &Output,
) -> io::Result<()> {
    if output.is_json() {
        output.data(&stories);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    if idonly {
        for story in stories {
            writeln!(out, "{}", story.story.id)?;
        }
        return Ok(());
    }

    let formatter = StoryFormatter::new(session.links(), session.mention_name());
    for story in stories {
        writeln!(out, "{}", formatter.render(options.template(), story))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        search: SearchArgs,
    }

    fn parse(args: &[&str]) -> SearchArgs {
        let mut argv = vec!["search"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).search
    }

    #[test]
    fn filters_map_onto_list_options() {
        let args = parse(&[
            "owner:%self%",
            "-o",
            "alice",
            "-y",
            "bug",
            "-r",
            "id:desc",
            "-a",
        ]);
        let options = args.filters.into_options(args.operators);

        assert_eq!(options.args, vec!["owner:%self%"]);
        assert_eq!(options.owner.as_deref(), Some("alice"));
        assert_eq!(options.story_type.as_deref(), Some("bug"));
        assert_eq!(options.sort_spec(), "id:desc");
        assert!(options.archived);
    }

    #[test]
    fn save_defaults_to_default_name() {
        assert_eq!(parse(&["-S"]).save.as_deref(), Some("default"));
        assert_eq!(parse(&["--save", "mine"]).save.as_deref(), Some("mine"));
        assert!(parse(&[]).save.is_none());
    }
}

//! `story` command: view and update stories

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures::future::try_join_all;

use super::failure::Failure;
use super::output::Output;
use super::render;
use super::session::Session;
use super::system;
use crate::api::{LabelParam, ShortcutClient, StoryListing, StoryUpdate};
use crate::domain::{
    branch, pattern, Entities, HydratedStory, ListOptions, Story, StoryFormatter, StoryType,
    DEFAULT_SORT,
};

/// Update and/or display story details
#[derive(Args, Debug, Clone, Default)]
pub struct StoryArgs {
    /// Story ids; taken from the current git branch when omitted
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,

    /// Archive the story
    #[arg(short = 'a', long)]
    pub archived: bool,

    /// Add a comment to the story
    #[arg(short = 'c', long, value_name = "TEXT")]
    pub comment: Option<String>,

    /// Update the description
    #[arg(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Download all attached files
    #[arg(short = 'D', long)]
    pub download: bool,

    /// Directory to download files to
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub download_dir: PathBuf,

    /// Update the estimate
    #[arg(short = 'e', long, value_name = "NUMBER")]
    pub estimate: Option<i64>,

    /// Set the epic
    #[arg(long, value_name = "ID|NAME")]
    pub epic: Option<String>,

    /// Set the iteration
    #[arg(short = 'i', long, value_name = "ID|NAME")]
    pub iteration: Option<String>,

    /// Format the story output by template
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    pub format: Option<String>,

    /// Read the story id from the current git branch
    #[arg(long)]
    pub from_git: bool,

    /// Check out a branch named <mention-name>/sc-<id>/<type>-<title>
    #[arg(long)]
    pub git_branch: bool,

    /// Check out a branch named <mention-name>/sc-<id>/<title>
    #[arg(long)]
    pub git_branch_short: bool,

    /// Print only the story id
    #[arg(short = 'I', long)]
    pub idonly: bool,

    /// Set labels by id/name, comma-separated
    #[arg(short = 'l', long, value_name = "ID|NAME")]
    pub label: Option<String>,

    /// Move the story below story ID
    #[arg(long, value_name = "ID")]
    pub move_after: Option<u64>,

    /// Move the story above story ID
    #[arg(long, value_name = "ID")]
    pub move_before: Option<u64>,

    /// Move the story down by N stories in its state
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "1")]
    pub move_down: Option<usize>,

    /// Move the story up by N stories in its state
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "1")]
    pub move_up: Option<usize>,

    /// Set owners by id/name, comma-separated
    #[arg(short = 'o', long, value_name = "ID|NAME")]
    pub owners: Option<String>,

    /// Open the story in the browser
    #[arg(short = 'O', long)]
    pub open: bool,

    /// Open the story's epic in the browser
    #[arg(long, visible_alias = "oe")]
    pub open_epic: bool,

    /// Open the story's iteration in the browser
    #[arg(long, visible_alias = "oi")]
    pub open_iteration: bool,

    /// Open the story's project in the browser
    #[arg(long, visible_alias = "op")]
    pub open_project: bool,

    /// Print only story output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Set the workflow state
    #[arg(short = 's', long, value_name = "ID|NAME")]
    pub state: Option<String>,

    /// Update the title
    #[arg(short = 't', long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Create a task on the story
    #[arg(long, value_name = "TEXT")]
    pub task: Option<String>,

    /// Toggle completion of tasks matching TEXT
    #[arg(long, value_name = "TEXT")]
    pub task_complete: Option<String>,

    /// Set the story type (feature, bug or chore; matched by regex)
    #[arg(short = 'y', long = "type", value_name = "NAME")]
    pub story_type: Option<String>,
}

/// A requested position change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    After(u64),
    Before(u64),
    Up(usize),
    Down(usize),
}

impl StoryArgs {
    fn movement(&self) -> Option<Move> {
        self.move_after
            .map(Move::After)
            .or(self.move_before.map(Move::Before))
            .or(self.move_up.map(Move::Up))
            .or(self.move_down.map(Move::Down))
    }

    /// Builds the field update; lookups that match nothing leave the field
    /// unchanged
    fn update(&self, entities: &Entities) -> Result<StoryUpdate> {
        let mut update = StoryUpdate {
            name: self.title.clone(),
            description: self.description.clone(),
            estimate: self.estimate,
            ..Default::default()
        };
        if self.archived {
            update.archived = Some(true);
        }
        if let Some(state) = &self.state {
            update.workflow_state_id = entities.find_state(state)?.map(|s| s.id);
        }
        if let Some(epic) = &self.epic {
            update.epic_id = entities.find_epic(epic)?.map(|e| e.id);
        }
        if let Some(iteration) = &self.iteration {
            update.iteration_id = entities.find_iteration(iteration)?.map(|i| i.id);
        }
        if let Some(owners) = &self.owners {
            update.owner_ids = Some(entities.find_owner_ids(owners)?);
        }
        if let Some(labels) = &self.label {
            update.labels = Some(LabelParam::from_names(entities.find_label_names(labels)?));
        }
        if let Some(story_type) = &self.story_type {
            update.story_type = match_story_type(story_type)?;
        }
        Ok(update)
    }
}

/// First story type matching the pattern
fn match_story_type(query: &str) -> Result<Option<StoryType>> {
    let matcher = pattern::case_insensitive(query)?;
    Ok(StoryType::ALL
        .into_iter()
        .find(|t| matcher.is_match(t.as_str())))
}

/// First run of digits in an id argument, so `sc-123` and `#123` work
fn parse_story_id(arg: &str) -> Result<u64> {
    let digits: String = arg
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .with_context(|| format!("Invalid story ID: {}", arg))
}

fn id_from_git() -> Result<u64> {
    let branch = system::current_branch().context(Failure::NoBranchId)?;
    tracing::debug!(%branch, "parsing story id from git branch");
    branch::story_id_from_branch(&branch).ok_or_else(|| Failure::NoBranchId.into())
}

/// Resolves a move into `(after_id, before_id)` among ordered siblings
fn resolve_move(movement: Move, siblings: &[u64], id: u64) -> Result<(Option<u64>, Option<u64>)> {
    let index = || {
        siblings
            .iter()
            .position(|s| *s == id)
            .with_context(|| format!("Story #{} not found in its workflow state", id))
    };

    Ok(match movement {
        Move::After(target) => (Some(target), None),
        Move::Before(target) => (None, Some(target)),
        Move::Up(n) => {
            let target = index()?.saturating_sub(n.max(1));
            (None, Some(siblings[target]))
        }
        Move::Down(n) => {
            let target = (index()? + n.max(1)).min(siblings.len() - 1);
            (Some(siblings[target]), None)
        }
    })
}

pub async fn run(args: StoryArgs, session: &Session, output: &Output) -> Result<()> {
    let output = output.quiet(args.quiet || args.idonly);
    let task_matcher = args
        .task_complete
        .as_deref()
        .map(pattern::case_insensitive)
        .transpose()?;

    let client = session.client()?;
    let entities = session.entities(&client).await?;
    let update = args.update(&entities)?;
    tracing::debug!(?update, "constructed story update");

    let mut ids = args
        .ids
        .iter()
        .map(|a| parse_story_id(a))
        .collect::<Result<Vec<_>>>()?;
    if args.from_git || ids.is_empty() {
        ids.push(id_from_git()?);
    }

    for id in ids {
        let story = apply(
            &args,
            &client,
            &entities,
            id,
            update.clone(),
            task_matcher.as_ref(),
        )
        .await?;
        let hydrated = HydratedStory::new(story, &entities);
        print(&args, &hydrated, &entities, session, &output)?;
        follow_up(&args, &client, &hydrated, session, &output).await?;
    }
    Ok(())
}

/// Runs every requested change on one story and returns its final state
async fn apply(
    args: &StoryArgs,
    client: &ShortcutClient,
    entities: &Entities,
    id: u64,
    mut update: StoryUpdate,
    task_matcher: Option<&regex::Regex>,
) -> Result<Story> {
    if let Some(comment) = &args.comment {
        client
            .create_comment(id, comment)
            .await
            .context(Failure::Comment(id))?;
    }
    if let Some(task) = &args.task {
        client
            .create_task(id, task)
            .await
            .context(Failure::TaskCreate(id))?;
    }

    let mut story = client
        .get_story(id)
        .await
        .context(Failure::StoryFetch(id))?;

    if let Some(matcher) = task_matcher {
        let toggled: Vec<u64> = story
            .tasks
            .iter()
            .filter(|t| matcher.is_match(&t.description))
            .map(|t| t.id)
            .collect();
        tracing::debug!(?toggled, "toggling tasks");
        let updates = story
            .tasks
            .iter()
            .filter(|t| toggled.contains(&t.id))
            .map(|t| client.update_task(id, t.id, !t.complete));
        try_join_all(updates)
            .await
            .context(Failure::TaskUpdate(id))?;
        story.toggle_tasks(&toggled);
    }

    let movement = args.movement();
    if update.is_empty() && movement.is_none() {
        return Ok(story);
    }

    if let Some(movement) = movement {
        let siblings = sibling_ids(client, entities, &story)
            .await
            .context(Failure::StoryUpdate(id))?;
        let (after, before) =
            resolve_move(movement, &siblings, id).context(Failure::StoryUpdate(id))?;
        update.after_id = after;
        update.before_id = before;
        tracing::debug!(?update, "constructed position update");
    }

    client
        .update_story(id, &update)
        .await
        .context(Failure::StoryUpdate(id))
}

/// Ids of the stories sharing `story`'s workflow state, in board order
async fn sibling_ids(
    client: &ShortcutClient,
    entities: &Entities,
    story: &Story,
) -> Result<Vec<u64>> {
    let listing = StoryListing::new(ListOptions {
        state: Some(format!("^{} ", story.workflow_state_id)),
        sort: Some(DEFAULT_SORT.to_string()),
        ..Default::default()
    })?;
    let siblings = listing.run(client, entities, "").await?;
    Ok(siblings.iter().map(|s| s.story.id).collect())
}

fn print(
    args: &StoryArgs,
    hydrated: &HydratedStory<'_>,
    entities: &Entities,
    session: &Session,
    output: &Output,
) -> io::Result<()> {
    if output.is_json() {
        output.data(hydrated);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    if args.idonly {
        writeln!(out, "{}", hydrated.story.id)
    } else if let Some(template) = args.format.as_deref().filter(|f| !f.is_empty()) {
        let formatter = StoryFormatter::new(session.links(), session.mention_name());
        writeln!(out, "{}", formatter.render(template, hydrated))
    } else {
        writeln!(out, "{}", render::story_detail(hydrated, entities, session.links()))
    }
}

/// Browser, download and git actions after the story is printed
async fn follow_up(
    args: &StoryArgs,
    client: &ShortcutClient,
    hydrated: &HydratedStory<'_>,
    session: &Session,
    output: &Output,
) -> Result<()> {
    let story = &hydrated.story;
    let links = session.links();

    if args.open {
        system::open_url(&links.story(story.id))?;
    }
    if args.open_epic {
        let epic = story.epic_id.ok_or(Failure::NoEpic)?;
        system::open_url(&links.epic(epic))?;
    }
    if args.open_iteration {
        let iteration = story.iteration_id.ok_or(Failure::NoIteration)?;
        system::open_url(&links.iteration(iteration))?;
    }
    if args.open_project {
        let project = story
            .project_id
            .context("This story is not part of a project.")?;
        system::open_url(&links.project(project))?;
    }

    if args.download {
        download_files(client, story, &args.download_dir, output).await?;
    }

    checkout_story_branch(
        story,
        session.mention_name(),
        args.git_branch,
        args.git_branch_short,
    )
}

/// Checks out the story's branch when `full` or `short` is requested
///
/// The full form needs a mention name; without one the legacy
/// `<type>-<id>-<title>` branch is checked out and the command fails.
pub(super) fn checkout_story_branch(
    story: &Story,
    mention_name: &str,
    full: bool,
    short: bool,
) -> Result<()> {
    if full {
        if mention_name.is_empty() {
            system::checkout_branch(&branch::story_branch(story, &branch::legacy_prefix(story)))?;
            return Err(Failure::NoMentionName.into());
        }
        let prefix = branch::full_prefix(mention_name, story);
        system::checkout_branch(&branch::story_branch(story, &prefix))?;
    } else if short {
        let prefix = branch::short_prefix(mention_name, story);
        system::checkout_branch(&branch::story_branch(story, &prefix))?;
    }
    Ok(())
}

async fn download_files(
    client: &ShortcutClient,
    story: &Story,
    dir: &std::path::Path,
    output: &Output,
) -> Result<()> {
    let downloads = story.files.iter().map(|file| async move {
        let bytes = client.download(&file.url).await?;
        Ok::<_, anyhow::Error>((file, bytes))
    });

    for (file, bytes) in try_join_all(downloads).await? {
        let path = dir.join(&file.name);
        output.status(&format!(
            "{} {}",
            console::style("Downloading file to:").bold(),
            path.display()
        ));
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

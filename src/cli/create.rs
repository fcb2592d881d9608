//! `create` command

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use super::render;
use super::session::Session;
use super::story::checkout_story_branch;
use super::system;
use crate::api::{LabelParam, NewStory};
use crate::domain::{Entities, HydratedStory, StoryType};

/// Create a story with provided details
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Title of the story (required)
    #[arg(short = 't', long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Project by id/name; required if --state is not set
    #[arg(short = 'p', long, value_name = "ID|NAME")]
    pub project: Option<String>,

    /// Workflow state by id/name; required if --project is not set
    #[arg(short = 's', long, value_name = "ID|NAME")]
    pub state: Option<String>,

    /// Team by id/name
    #[arg(short = 'T', long, value_name = "ID|NAME")]
    pub team: Option<String>,

    /// Epic by id/name
    #[arg(long, value_name = "ID|NAME")]
    pub epic: Option<String>,

    /// Iteration by id/name
    #[arg(short = 'i', long, value_name = "ID|NAME")]
    pub iteration: Option<String>,

    /// Estimate in points
    #[arg(short = 'e', long, value_name = "NUMBER")]
    pub estimate: Option<i64>,

    /// Owners by id/name, comma-separated
    #[arg(short = 'o', long, value_name = "ID|NAME")]
    pub owners: Option<String>,

    /// Labels by id/name, comma-separated
    #[arg(short = 'l', long, value_name = "ID|NAME")]
    pub label: Option<String>,

    /// Story type: feature, bug or chore
    #[arg(short = 'y', long = "type", value_name = "NAME", default_value = "feature")]
    pub story_type: StoryType,

    /// Description of the story
    #[arg(short = 'd', long, value_name = "TEXT", default_value = "")]
    pub description: String,

    /// Print only the id of the created story
    #[arg(short = 'I', long)]
    pub idonly: bool,

    /// Open the story in the browser
    #[arg(short = 'O', long)]
    pub open: bool,

    /// Check out a branch named <mention-name>/sc-<id>/<type>-<title>
    #[arg(long)]
    pub git_branch: bool,

    /// Check out a branch named <mention-name>/sc-<id>/<title>
    #[arg(long)]
    pub git_branch_short: bool,
}

impl CreateArgs {
    /// Checks required flags without touching the network
    fn validate(&self) -> Result<&str> {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("Must provide --title")?;
        if self.project.is_none() && self.state.is_none() {
            anyhow::bail!("Must provide --project or --state");
        }
        Ok(title)
    }

    fn new_story(&self, title: &str, entities: &Entities) -> Result<NewStory> {
        let project_id = match &self.project {
            Some(project) => entities.find_project(project)?.map(|p| p.id),
            None => None,
        };
        let workflow_state_id = match &self.state {
            Some(state) => entities.find_state(state)?.map(|s| s.id),
            None => None,
        };
        if project_id.is_none() && workflow_state_id.is_none() {
            anyhow::bail!("No project or workflow state matched --project/--state");
        }

        let group_id = match &self.team {
            Some(team) => entities.find_group(team)?.map(|g| g.id.clone()),
            None => None,
        };
        let epic_id = match &self.epic {
            Some(epic) => entities.find_epic(epic)?.map(|e| e.id),
            None => None,
        };
        let iteration_id = match &self.iteration {
            Some(iteration) => entities.find_iteration(iteration)?.map(|i| i.id),
            None => None,
        };
        let owner_ids = match &self.owners {
            Some(owners) => entities.find_owner_ids(owners)?,
            None => Vec::new(),
        };
        let labels = match &self.label {
            Some(labels) => LabelParam::from_names(entities.find_label_names(labels)?),
            None => Vec::new(),
        };

        Ok(NewStory {
            name: title.to_string(),
            story_type: self.story_type,
            description: self.description.clone(),
            project_id,
            workflow_state_id,
            group_id,
            epic_id,
            iteration_id,
            estimate: self.estimate,
            owner_ids,
            labels,
        })
    }
}

pub async fn run(args: CreateArgs, session: &Session, output: &Output) -> Result<()> {
    let title = args.validate()?;
    let client = session.client()?;
    let entities = session.entities(&client).await?;

    let new_story = args.new_story(title, &entities)?;
    tracing::debug!(?new_story, "creating story");
    let story = client
        .create_story(&new_story)
        .await
        .context("Error creating story")?;
    let hydrated = HydratedStory::new(story, &entities);

    let mut out = io::stdout();
    if output.is_json() {
        output.data(&hydrated);
    } else if args.idonly {
        writeln!(out, "{}", hydrated.story.id)?;
    } else {
        writeln!(out, "{}", render::story_detail(&hydrated, &entities, session.links()))?;
    }

    checkout_story_branch(
        &hydrated.story,
        session.mention_name(),
        args.git_branch,
        args.git_branch_short,
    )?;
    if args.open {
        system::open_url(&session.links().story(hydrated.story.id))?;
    }
    Ok(())
}

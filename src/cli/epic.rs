//! `epics` listing and the `epic` view/create command

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, SecondsFormat};
use clap::{Args, Subcommand};

use super::output::Output;
use super::render;
use super::session::Session;
use super::system;
use crate::api::{LabelParam, NewEpic, Tracker};
use crate::domain::format::{epic_list_template, render_epic};
use crate::domain::{pattern, Entities, Epic};

/// Display epics available for stories
#[derive(Args, Debug, Clone, Default)]
pub struct EpicsArgs {
    /// Include archived epics
    #[arg(short = 'a', long)]
    pub archived: bool,

    /// Only epics that have been completed
    #[arg(short = 'c', long)]
    pub completed: bool,

    /// Only epics that have been started
    #[arg(short = 's', long)]
    pub started: bool,

    /// Show the description of each epic
    #[arg(short = 'd', long)]
    pub detailed: bool,

    /// Format each epic by template
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    pub format: Option<String>,

    /// Only epics in the milestone with this id
    #[arg(short = 'M', long, value_name = "ID")]
    pub milestone: Option<u64>,

    /// List epics with name matching query
    #[arg(short = 't', long, value_name = "QUERY")]
    pub title: Option<String>,
}

/// View an epic by id, or create one
#[derive(Args, Debug, Clone)]
#[command(args_conflicts_with_subcommands = true)]
pub struct EpicArgs {
    /// Epic to display
    #[arg(value_name = "ID")]
    pub id: Option<u64>,

    /// Format the epic by template
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    pub format: Option<String>,

    /// Open the epic in the browser
    #[arg(short = 'O', long)]
    pub open: bool,

    /// Print only epic output, no progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<EpicCommands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EpicCommands {
    /// Create a new epic
    Create(EpicCreateArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct EpicCreateArgs {
    /// Name of the epic (required)
    #[arg(short = 'n', long, value_name = "TEXT")]
    pub name: Option<String>,

    /// Description of the epic
    #[arg(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,

    /// State of the epic: todo, in progress or done
    #[arg(short = 's', long, value_name = "NAME", value_parser = parse_epic_state)]
    pub state: Option<String>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub deadline: Option<NaiveDate>,

    /// Planned start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub planned_start: Option<NaiveDate>,

    /// Owners by id/name, comma-separated
    #[arg(short = 'o', long, value_name = "ID|NAME")]
    pub owners: Option<String>,

    /// Team by id/name
    #[arg(short = 'T', long, value_name = "ID|NAME")]
    pub team: Option<String>,

    /// Labels by id/name, comma-separated
    #[arg(short = 'l', long, value_name = "ID|NAME")]
    pub label: Option<String>,

    /// Milestone id
    #[arg(short = 'M', long, value_name = "ID")]
    pub milestone: Option<u64>,

    /// Print only the id of the created epic
    #[arg(short = 'I', long)]
    pub idonly: bool,

    /// Open the epic in the browser
    #[arg(short = 'O', long)]
    pub open: bool,
}

/// Maps user spellings onto the three epic states the API accepts
fn parse_epic_state(input: &str) -> Result<String, String> {
    let letters: String = input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    match letters.as_str() {
        "todo" => Ok("to do".to_string()),
        "inprogress" => Ok("in progress".to_string()),
        "done" => Ok("done".to_string()),
        _ => Err(format!(
            "unknown epic state '{}' (expected todo, in progress or done)",
            input
        )),
    }
}

/// Dates are sent as midnight UTC timestamps
fn date_time(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn select_epics(epics: Vec<Epic>, args: &EpicsArgs) -> Result<Vec<Epic>> {
    let matcher = pattern::optional(args.title.as_deref())?;
    Ok(epics
        .into_iter()
        .filter(|e| matcher.is_match(&e.name))
        .filter(|e| args.milestone.is_none() || e.milestone_id == args.milestone)
        .filter(|e| args.archived || !e.archived)
        .filter(|e| !args.started || e.started)
        .filter(|e| !args.completed || e.completed)
        .collect())
}

pub async fn list(args: EpicsArgs, session: &Session, output: &Output) -> Result<()> {
    pattern::optional(args.title.as_deref())?;
    let client = session.client()?;
    output.status("Loading epics ...");
    let epics = select_epics(client.list_epics().await?, &args)?;

    if output.is_json() {
        output.data(&epics);
        return Ok(());
    }

    let custom = args.format.as_deref().filter(|f| !f.is_empty());
    let mut out = io::stdout().lock();
    for epic in &epics {
        let template = match custom {
            Some(format) => format.to_string(),
            None => epic_list_template(epic, args.detailed),
        };
        writeln!(out, "{}", render_epic(&template, epic, session.links()))?;
    }
    Ok(())
}

pub async fn run(args: EpicArgs, session: &Session, output: &Output) -> Result<()> {
    match args.command {
        Some(EpicCommands::Create(create)) => create_epic(create, session, output).await,
        None => {
            let id = args
                .id
                .context("Must provide an epic ID or the create subcommand")?;
            view(id, args.format.as_deref(), args.open, session, &output.quiet(args.quiet)).await
        }
    }
}

async fn view(
    id: u64,
    format: Option<&str>,
    open: bool,
    session: &Session,
    output: &Output,
) -> Result<()> {
    let client = session.client()?;
    output.status(&format!("Loading epic #{} ...", id));
    let epic = client
        .get_epic(id)
        .await
        .context("Error fetching epic")?;

    print_epic(&epic, format, session, output)?;
    if open {
        system::open_url(&session.links().epic(epic.id))?;
    }
    Ok(())
}

fn print_epic(
    epic: &Epic,
    format: Option<&str>,
    session: &Session,
    output: &Output,
) -> io::Result<()> {
    if output.is_json() {
        output.data(epic);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    match format.filter(|f| !f.is_empty()) {
        Some(format) => writeln!(out, "{}", render_epic(format, epic, session.links())),
        None => write!(out, "{}", render::epic_detail(epic, session.links())),
    }
}

impl EpicCreateArgs {
    fn new_epic(&self, name: &str, entities: &Entities) -> Result<NewEpic> {
        let owner_ids = match &self.owners {
            Some(owners) => entities.find_owner_ids(owners)?,
            None => Vec::new(),
        };
        let group_ids = match &self.team {
            Some(team) => entities
                .find_group(team)?
                .map(|g| vec![g.id.clone()])
                .unwrap_or_default(),
            None => Vec::new(),
        };
        let labels = match &self.label {
            Some(labels) => LabelParam::from_names(entities.find_label_names(labels)?),
            None => Vec::new(),
        };

        Ok(NewEpic {
            name: name.to_string(),
            description: self.description.clone().filter(|d| !d.is_empty()),
            state: self.state.clone(),
            deadline: self.deadline.map(date_time),
            planned_start_date: self.planned_start.map(date_time),
            owner_ids,
            group_ids,
            labels,
            milestone_id: self.milestone,
        })
    }
}

async fn create_epic(args: EpicCreateArgs, session: &Session, output: &Output) -> Result<()> {
    let name = args
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .context("Must provide --name")?;
    let output = output.quiet(args.idonly);
    let client = session.client()?;
    let entities = session.entities(&client).await?;

    let new_epic = args.new_epic(name, &entities)?;
    output.status("Creating epic ...");
    let epic = client
        .create_epic(&new_epic)
        .await
        .context("Error creating epic")?;

    if args.idonly && !output.is_json() {
        writeln!(io::stdout(), "{}", epic.id)?;
    } else {
        print_epic(&epic, None, session, &output)?;
    }
    if args.open {
        system::open_url(&session.links().epic(epic.id))?;
    }
    Ok(())
}

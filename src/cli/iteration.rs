//! `iterations` listing and the `iteration` subcommands

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::output::Output;
use super::render;
use super::session::Session;
use super::system;
use crate::api::{ApiError, IterationUpdate, NewIteration, Tracker};
use crate::domain::format::{iteration_list_template, render_iteration};
use crate::domain::{hydrate_all, pattern, Entities, Group, Iteration, StoryFormatter};

/// Display iterations, most recent first
#[derive(Args, Debug, Clone, Default)]
pub struct IterationsArgs {
    /// Filter by status (unstarted, started, done)
    #[arg(short = 'S', long, value_name = "STATUS")]
    pub status: Option<String>,

    /// Filter by team id/name
    #[arg(short = 'T', long, value_name = "ID|NAME")]
    pub team: Option<String>,

    /// Only iterations running today
    #[arg(short = 'C', long)]
    pub current: bool,

    /// Filter by name
    #[arg(short = 't', long, value_name = "QUERY")]
    pub title: Option<String>,

    /// Show completion and URL for each iteration
    #[arg(short = 'd', long)]
    pub detailed: bool,

    /// Format each iteration by template
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    pub format: Option<String>,
}

/// View, create, update or delete iterations
#[derive(Subcommand, Debug, Clone)]
pub enum IterationCommands {
    /// View an iteration by id
    View {
        id: u64,

        /// Open the iteration in the browser
        #[arg(short = 'O', long)]
        open: bool,
    },

    /// Create a new iteration
    Create(IterationCreateArgs),

    /// Update an existing iteration
    Update {
        id: u64,

        #[command(flatten)]
        fields: IterationFields,

        /// Open the iteration in the browser
        #[arg(short = 'O', long)]
        open: bool,
    },

    /// Delete an iteration
    Delete { id: u64 },

    /// List the stories in an iteration
    Stories {
        id: u64,

        /// Format each story by template
        #[arg(short = 'f', long, value_name = "TEMPLATE")]
        format: Option<String>,
    },
}

/// Fields shared by create and update
#[derive(Args, Debug, Clone, Default)]
pub struct IterationFields {
    /// Name of the iteration
    #[arg(short = 'n', long, value_name = "TEXT")]
    pub name: Option<String>,

    /// Description of the iteration
    #[arg(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// End date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Team by id/name
    #[arg(short = 'T', long, value_name = "ID|NAME")]
    pub team: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IterationCreateArgs {
    #[command(flatten)]
    pub fields: IterationFields,

    /// Print only the id of the created iteration
    #[arg(short = 'I', long)]
    pub idonly: bool,

    /// Open the iteration in the browser
    #[arg(short = 'O', long)]
    pub open: bool,
}

impl IterationFields {
    fn group_ids(&self, entities: &Entities) -> Result<Option<Vec<String>>> {
        match &self.team {
            Some(team) => Ok(entities.find_group(team)?.map(|g| vec![g.id.clone()])),
            None => Ok(None),
        }
    }

    fn new_iteration(&self, entities: &Entities) -> Result<NewIteration> {
        let name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .context("Must provide --name")?;
        let start_date = self.start_date.context("Must provide --start-date")?;
        let end_date = self.end_date.context("Must provide --end-date")?;

        Ok(NewIteration {
            name,
            start_date,
            end_date,
            description: self.description.clone().filter(|d| !d.is_empty()),
            group_ids: self.group_ids(entities)?.unwrap_or_default(),
        })
    }

    fn update(&self, entities: &Entities) -> Result<IterationUpdate> {
        Ok(IterationUpdate {
            name: self.name.clone().filter(|n| !n.is_empty()),
            description: self.description.clone().filter(|d| !d.is_empty()),
            start_date: self.start_date,
            end_date: self.end_date,
            group_ids: self.group_ids(entities)?,
        })
    }
}

/// Reports 404s as a missing iteration, anything else under `action`
fn iteration_error(id: u64, action: &'static str) -> impl FnOnce(ApiError) -> anyhow::Error {
    move |err| {
        if err.is_not_found() {
            anyhow!("Iteration #{} not found", id)
        } else {
            anyhow::Error::new(err).context(format!("Error {} iteration", action))
        }
    }
}

/// Teams of an iteration whose id or name matches
fn has_team(iteration: &Iteration, groups: &BTreeMap<String, Group>, team: &regex::Regex) -> bool {
    iteration
        .group_ids
        .iter()
        .filter_map(|id| groups.get(id))
        .any(|g| team.is_match(&g.id) || team.is_match(&g.name))
}

fn select_iterations(
    iterations: Vec<Iteration>,
    groups: &BTreeMap<String, Group>,
    args: &IterationsArgs,
    today: NaiveDate,
) -> Result<Vec<Iteration>> {
    let title = pattern::optional(args.title.as_deref())?;
    let status = pattern::optional(args.status.as_deref())?;
    let team = args
        .team
        .as_deref()
        .map(pattern::case_insensitive)
        .transpose()?;

    let mut selected: Vec<Iteration> = iterations
        .into_iter()
        .filter(|i| title.is_match(&i.name) && status.is_match(&i.status))
        .filter(|i| team.as_ref().map_or(true, |t| has_team(i, groups, t)))
        .filter(|i| !args.current || i.is_current(today))
        .collect();
    selected.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(selected)
}

pub async fn list(args: IterationsArgs, session: &Session, output: &Output) -> Result<()> {
    let client = session.client()?;
    output.status("Loading iterations ...");
    let (iterations, groups) = tokio::try_join!(client.list_iterations(), client.list_groups())?;
    let groups: BTreeMap<String, Group> = groups.into_iter().map(|g| (g.id.clone(), g)).collect();

    let iterations = select_iterations(iterations, &groups, &args, Utc::now().date_naive())?;
    if output.is_json() {
        output.data(&iterations);
        return Ok(());
    }

    let template = args
        .format
        .clone()
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| iteration_list_template(args.detailed));
    let mut out = io::stdout().lock();
    for iteration in &iterations {
        let teams: Vec<&str> = iteration
            .group_ids
            .iter()
            .filter_map(|id| groups.get(id))
            .map(|g| g.name.as_str())
            .collect();
        writeln!(out, "{}", render_iteration(&template, iteration, &teams, session.links()))?;
    }
    Ok(())
}

pub async fn run(command: IterationCommands, session: &Session, output: &Output) -> Result<()> {
    let client = session.client()?;

    match command {
        IterationCommands::View { id, open } => {
            output.status(&format!("Loading iteration #{} ...", id));
            let iteration = client
                .get_iteration(id)
                .await
                .map_err(iteration_error(id, "fetching"))?;
            print_iteration(&iteration, output)?;
            if open {
                system::open_url(&session.links().iteration(iteration.id))?;
            }
        }
        IterationCommands::Create(args) => {
            let output = output.quiet(args.idonly);
            let entities = session.entities(&client).await?;
            let body = args.fields.new_iteration(&entities)?;
            let iteration = client
                .create_iteration(&body)
                .await
                .context("Error creating iteration")?;

            if args.idonly && !output.is_json() {
                writeln!(io::stdout(), "{}", iteration.id)?;
            } else {
                print_iteration(&iteration, &output)?;
            }
            if args.open {
                system::open_url(&session.links().iteration(iteration.id))?;
            }
        }
        IterationCommands::Update { id, fields, open } => {
            let entities = session.entities(&client).await?;
            let update = fields.update(&entities)?;
            if update.is_empty() {
                anyhow::bail!(
                    "No updates provided. Use --name, --description, --start-date, --end-date, or --team"
                );
            }
            let iteration = client
                .update_iteration(id, &update)
                .await
                .map_err(iteration_error(id, "updating"))?;
            print_iteration(&iteration, output)?;
            if open {
                system::open_url(&session.links().iteration(iteration.id))?;
            }
        }
        IterationCommands::Delete { id } => {
            client
                .delete_iteration(id)
                .await
                .map_err(iteration_error(id, "deleting"))?;
            output.success(&format!("Iteration #{} deleted successfully", id));
        }
        IterationCommands::Stories { id, format } => {
            output.status(&format!("Loading stories in iteration #{} ...", id));
            let (stories, entities) = tokio::try_join!(
                async {
                    client
                        .list_iteration_stories(id)
                        .await
                        .map_err(iteration_error(id, "fetching stories of"))
                },
                session.entities(&client),
            )?;
            let stories = hydrate_all(stories, &entities);
            let format = format.filter(|f| !f.is_empty());
            let mut out = io::stdout().lock();

            if output.is_json() {
                output.data(&stories);
            } else if stories.is_empty() {
                writeln!(out, "No stories found in iteration #{}", id)?;
            } else {
                let heading = console::style(format!("Stories in iteration #{}:", id)).bold();
                writeln!(out, "{}", heading)?;
                writeln!(out)?;
                let formatter = StoryFormatter::new(session.links(), session.mention_name());
                for story in &stories {
                    match &format {
                        Some(template) => writeln!(out, "{}", formatter.render(template, story))?,
                        None => writeln!(out, "{}", render::story_summary(story))?,
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_iteration(iteration: &Iteration, output: &Output) -> io::Result<()> {
    if output.is_json() {
        output.data(iteration);
        return Ok(());
    }
    writeln!(io::stdout(), "{}", render::iteration_detail(iteration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: IterationCommands,
    }

    fn iteration(id: u64, name: &str, status: &str, start: &str, groups: &[&str]) -> Iteration {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "status": status,
            "start_date": start,
            "end_date": start + chrono::Duration::days(13),
            "group_ids": groups,
        }))
        .unwrap()
    }

    fn groups() -> BTreeMap<String, Group> {
        let group = Group {
            id: "g-1".to_string(),
            name: "Platform".to_string(),
            mention_name: "platform".to_string(),
            archived: false,
        };
        BTreeMap::from([(group.id.clone(), group)])
    }

    fn all() -> Vec<Iteration> {
        vec![
            iteration(1, "Sprint 1", "done", "2024-01-01", &["g-1"]),
            iteration(2, "Sprint 2", "started", "2024-01-15", &[]),
            iteration(3, "Platform 3", "unstarted", "2024-01-29", &["g-1"]),
        ]
    }

    fn ids(args: IterationsArgs, today: NaiveDate) -> Vec<u64> {
        select_iterations(all(), &groups(), &args, today)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn newest_iterations_come_first() {
        assert_eq!(ids(IterationsArgs::default(), day("2024-01-20")), vec![3, 2, 1]);
    }

    #[test]
    fn filters_combine() {
        let today = day("2024-01-20");
        let by_team = IterationsArgs {
            team: Some("platform".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(by_team, today), vec![3, 1]);

        let current = IterationsArgs {
            current: true,
            ..Default::default()
        };
        assert_eq!(ids(current, today), vec![2]);

        let status = IterationsArgs {
            status: Some("^done$".to_string()),
            title: Some("sprint".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(status, today), vec![1]);
    }

    #[test]
    fn create_requires_name_and_dates() {
        let entities = Entities::default();
        let mut fields = IterationFields::default();
        assert_eq!(
            fields.new_iteration(&entities).unwrap_err().to_string(),
            "Must provide --name"
        );

        fields.name = Some("Sprint 4".to_string());
        fields.start_date = Some(day("2024-02-01"));
        assert_eq!(
            fields.new_iteration(&entities).unwrap_err().to_string(),
            "Must provide --end-date"
        );

        fields.end_date = Some(day("2024-02-14"));
        let body = fields.new_iteration(&entities).unwrap();
        assert_eq!(body.name, "Sprint 4");
        assert!(body.group_ids.is_empty());
    }

    #[test]
    fn update_without_fields_is_empty() {
        assert!(IterationFields::default()
            .update(&Entities::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn not_found_is_reported_by_id() {
        let err = iteration_error(9, "deleting")(ApiError::Status {
            method: "DELETE".to_string(),
            path: "/iterations/9".to_string(),
            status: 404,
            body: String::new(),
        });
        assert_eq!(err.to_string(), "Iteration #9 not found");
    }

    #[test]
    fn subcommands_parse() {
        let Harness { command } =
            Harness::parse_from(["iteration", "update", "4", "-n", "Renamed", "--end-date", "2024-03-01"]);
        let IterationCommands::Update { id, fields, open } = command else {
            panic!("expected update");
        };
        assert_eq!(id, 4);
        assert_eq!(fields.name.as_deref(), Some("Renamed"));
        assert_eq!(fields.end_date, Some(day("2024-03-01")));
        assert!(!open);
    }
}

//! Listing commands for the records stories point at (members, workflows,
//! projects)

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use console::style;

use super::output::Output;
use super::session::Session;
use crate::api::Tracker;
use crate::domain::pattern;
use crate::domain::{Member, Project, Workflow, WorkflowState};

/// Display members available for stories
#[derive(Args, Debug, Clone, Default)]
pub struct MembersArgs {
    /// List members with name or mention name matching query
    #[arg(short = 's', long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Include disabled members
    #[arg(short = 'd', long)]
    pub disabled: bool,
}

/// Display workflows and the states available for stories
#[derive(Args, Debug, Clone, Default)]
pub struct WorkflowsArgs {
    /// List states with name matching query
    #[arg(short = 's', long, value_name = "QUERY")]
    pub search: Option<String>,
}

/// Display projects available for stories
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectsArgs {
    /// Include archived projects
    #[arg(short = 'a', long)]
    pub archived: bool,

    /// Show the description of each project
    #[arg(short = 'd', long)]
    pub detailed: bool,

    /// List projects with name matching query
    #[arg(short = 't', long, value_name = "QUERY")]
    pub title: Option<String>,
}

fn select_members(members: Vec<Member>, args: &MembersArgs) -> Result<Vec<Member>> {
    let matcher = pattern::optional(args.search.as_deref())?;
    Ok(members
        .into_iter()
        .filter(|m| args.disabled || !m.disabled)
        .filter(|m| matcher.is_match(&format!("{} {}", m.profile.name, m.profile.mention_name)))
        .collect())
}

fn select_states<'a>(workflow: &'a Workflow, search: Option<&str>) -> Result<Vec<&'a WorkflowState>> {
    let matcher = pattern::optional(search)?;
    Ok(workflow
        .states
        .iter()
        .filter(|s| matcher.is_match(&s.name))
        .collect())
}

fn select_projects(projects: Vec<Project>, args: &ProjectsArgs) -> Result<Vec<Project>> {
    let matcher = pattern::optional(args.title.as_deref())?;
    Ok(projects
        .into_iter()
        .filter(|p| args.archived || !p.archived)
        .filter(|p| matcher.is_match(&p.name))
        .collect())
}

pub async fn members(args: MembersArgs, session: &Session, output: &Output) -> Result<()> {
    pattern::optional(args.search.as_deref())?;
    let client = session.client()?;
    output.status("Loading members ...");
    let members = select_members(client.list_members().await?, &args)?;

    if output.is_json() {
        output.data(&members);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for member in &members {
        writeln!(out, "{}", style(format!("#{}", member.id)).bold())?;
        writeln!(out, "{}  {}", style("Name:         ").bold(), member.profile.name)?;
        writeln!(out, "{}  {}", style("Mention Name: ").bold(), member.profile.mention_name)?;
        writeln!(out, "{}  {}", style("Role:         ").bold(), member.role)?;
        writeln!(
            out,
            "{}  {}",
            style("Email:        ").bold(),
            member.profile.email_address.as_deref().unwrap_or("_")
        )?;
        if member.disabled {
            writeln!(out, "{}  true", style("Disabled:     ").bold())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub async fn workflows(args: WorkflowsArgs, session: &Session, output: &Output) -> Result<()> {
    pattern::optional(args.search.as_deref())?;
    let client = session.client()?;
    output.status("Loading workflows ...");
    let workflows = client.list_workflows().await?;

    if output.is_json() {
        let filtered: Vec<Workflow> = workflows
            .iter()
            .map(|wf| {
                Ok(Workflow {
                    states: select_states(wf, args.search.as_deref())?
                        .into_iter()
                        .cloned()
                        .collect(),
                    ..wf.clone()
                })
            })
            .collect::<Result<_>>()?;
        output.data(&filtered);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for workflow in &workflows {
        writeln!(out, "{} {}", style(format!("#{}", workflow.id)).bold(), workflow.name)?;
        writeln!(out, "    == States:")?;
        for state in select_states(workflow, args.search.as_deref())? {
            writeln!(out, "{} {}", style(format!("    #{}", state.id)).bold(), state.name)?;
            writeln!(out, "         Type:   \t{}", state.kind)?;
            writeln!(out, "         Stories:\t{}", state.num_stories)?;
        }
    }
    Ok(())
}

pub async fn projects(args: ProjectsArgs, session: &Session, output: &Output) -> Result<()> {
    pattern::optional(args.title.as_deref())?;
    let client = session.client()?;
    output.status("Loading projects ...");
    let projects = select_projects(client.list_projects().await?, &args)?;

    if output.is_json() {
        output.data(&projects);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for project in &projects {
        writeln!(
            out,
            "{}{}",
            style(format!("#{}", project.id)).bold(),
            style(format!(" {}", project.name)).blue()
        )?;
        writeln!(out, "{}  {}", style("Points:       ").bold(), project.stats.num_points)?;
        writeln!(out, "{}  {}", style("Stories:      ").bold(), project.stats.num_stories)?;
        writeln!(
            out,
            "{}  {}",
            style("Started:      ").bold(),
            project
                .start_time
                .as_ref()
                .map(crate::domain::format::timestamp)
                .unwrap_or_else(|| "_".to_string())
        )?;
        if project.archived {
            writeln!(out, "{}  true", style("Archived:     ").bold())?;
        }
        if args.detailed {
            writeln!(out, "{}  {}", style("Description:  ").bold(), project.description)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

//! Detailed terminal views for single records
//!
//! Views are built as strings so commands can print them in one go. Styling
//! comes from `console` and is dropped automatically when stdout is not a
//! terminal.

use std::fmt::Write;

use console::{style, StyledObject};

use crate::domain::format::timestamp;
use crate::domain::{AppLinks, Doc, Entities, Epic, HydratedStory, Iteration, Member};

/// Continuation lines of multi-line values line up under the first
fn indent_long(text: &str) -> String {
    text.split('\n').collect::<Vec<_>>().join("\n         ")
}

fn member_label(member: &Member) -> String {
    format!(
        "{} ({})",
        member.profile.name,
        style(&member.profile.mention_name).bold()
    )
}

fn label(name: &str) -> StyledObject<&str> {
    style(name).bold()
}

/// The full story view printed by `story` and `create`
pub fn story_detail(hydrated: &HydratedStory<'_>, entities: &Entities, links: &AppLinks) -> String {
    let story = &hydrated.story;
    let mut out = String::new();

    let owners: Vec<String> = hydrated
        .owners
        .iter()
        .map(|o| o.map(member_label).unwrap_or_else(|| "Unknown".to_string()))
        .collect();
    let labels: Vec<String> = story
        .labels
        .iter()
        .map(|l| format!("{} {}", style(format!("#{}", l.id)).bold(), l.name))
        .collect();
    let requester = hydrated
        .requester
        .map(|r| format!("{} ({})", r.profile.name, r.profile.mention_name))
        .unwrap_or_else(|| "_".to_string());
    let description = if story.description.is_empty() {
        "_"
    } else {
        story.description.as_str()
    };

    let _ = writeln!(
        out,
        "{}{}",
        style(format!("#{}", story.id)).blue().bold(),
        style(format!(" {}", story.name)).blue()
    );
    let _ = writeln!(out, "{}      {}", label("Desc:"), indent_long(description));
    let _ = writeln!(
        out,
        "{}      {}",
        label("Team:"),
        hydrated.group.map(|g| g.name.as_str()).unwrap_or("_")
    );
    let _ = writeln!(out, "{}    {}", label("Owners:"), or_placeholder(owners.join(", ")));
    let _ = writeln!(out, "{} {}", label("Requester:"), requester);
    let _ = writeln!(
        out,
        "{}      {}/{}",
        label("Type:"),
        story.story_type,
        estimate(story.estimate)
    );
    let _ = writeln!(out, "{}     {}", label("Label:"), or_placeholder(labels.join(", ")));

    if let (Some(project), Some(id)) = (hydrated.project, story.project_id) {
        let _ = writeln!(
            out,
            "{}{}{}",
            label("Project:"),
            style(format!("   #{} ", id)).bold(),
            project.name
        );
    }
    match (hydrated.epic, story.epic_id) {
        (Some(epic), Some(id)) => {
            let _ = writeln!(
                out,
                "{}{}{}",
                label("Epic:"),
                style(format!("      #{} ", id)).bold(),
                epic.name
            );
        }
        _ => {
            let _ = writeln!(out, "{}      _", label("Epic:"));
        }
    }
    match (hydrated.iteration, story.iteration_id) {
        (Some(iteration), Some(id)) => {
            let _ = writeln!(
                out,
                "{}{}{}",
                label("Iteration:"),
                style(format!(" #{} ", id)).bold(),
                iteration.name
            );
        }
        _ => {
            let _ = writeln!(out, "{} _", label("Iteration:"));
        }
    }
    let _ = writeln!(
        out,
        "{}{}{}",
        label("State:"),
        style(format!("     #{} ", story.workflow_state_id)).bold(),
        hydrated.state.map(|s| s.name.as_str()).unwrap_or_default()
    );
    let _ = writeln!(out, "{}   {}", label("Created:"), timestamp(&story.created_at));
    if story.was_updated() {
        let _ = writeln!(out, "{}   {}", label("Updated:"), timestamp(&story.updated_at));
    }
    let _ = writeln!(out, "{}       {}", label("URL:"), links.story(story.id));
    if story.archived {
        let _ = writeln!(out, "{}  {}", label("Archived:"), style("true").bold());
    }
    if story.completed {
        let completed = story
            .completed_at
            .as_ref()
            .map(timestamp)
            .unwrap_or_else(|| "_".to_string());
        let _ = writeln!(out, "{}  {}", label("Completed:"), style(completed).bold());
    }

    for task in &story.tasks {
        let mark = if task.complete { "[X]" } else { "[ ]" };
        let _ = writeln!(
            out,
            "{}     {} {}",
            label("Task:"),
            mark,
            indent_long(&task.description)
        );
    }
    for comment in story.visible_comments() {
        let author = comment
            .author_id
            .as_ref()
            .and_then(|id| entities.members.get(id))
            .map(|m| m.profile.name.as_str())
            .unwrap_or("Unknown");
        let _ = writeln!(out, "{}  {}", label("Comment:"), indent_long(&comment.text));
        let _ = writeln!(
            out,
            "          {} {} {}",
            author,
            label("at:"),
            timestamp(&comment.updated_at)
        );
    }
    for file in &story.files {
        let _ = writeln!(out, "{}     {}", label("File:"), file.name);
        let _ = writeln!(out, "          {}", file.url);
    }

    out
}

/// A compact story entry used by `iteration stories`
pub fn story_summary(hydrated: &HydratedStory<'_>) -> String {
    let story = &hydrated.story;
    let owners: Vec<&str> = hydrated
        .known_owners()
        .map(|m| m.profile.mention_name.as_str())
        .collect();

    format!(
        "{} {}\n  Type: {} | State: {} | Owners: {}\n  Points: {}\n",
        style(format!("#{}", story.id)).bold(),
        style(&story.name).blue(),
        story.story_type,
        hydrated.state.map(|s| s.name.as_str()).unwrap_or("Unknown"),
        or_placeholder(owners.join(", ")),
        story
            .estimate
            .map(|e| e.to_string())
            .unwrap_or_else(|| "_".to_string()),
    )
}

/// Colours an iteration status
pub fn iteration_status(status: &str) -> StyledObject<&str> {
    match status {
        "started" => style(status).green(),
        "done" => style(status).dim(),
        _ => style(status).yellow(),
    }
}

pub fn iteration_detail(iteration: &Iteration) -> String {
    let stats = &iteration.stats;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}{}",
        style(format!("#{}", iteration.id)).blue().bold(),
        style(format!(" {}", iteration.name)).blue()
    );
    if !iteration.description.is_empty() {
        let _ = writeln!(out, "{} {}", label("Description:"), iteration.description);
    }
    let _ = writeln!(
        out,
        "{}      {}",
        label("Status:"),
        iteration_status(&iteration.status)
    );
    let _ = writeln!(out, "{}  {}", label("Start Date:"), iteration.start_date);
    let _ = writeln!(out, "{}    {}", label("End Date:"), iteration.end_date);
    if !iteration.group_ids.is_empty() {
        let _ = writeln!(out, "{}       {}", label("Teams:"), iteration.group_ids.join(", "));
    }
    let _ = writeln!(
        out,
        "{}     {} ({} done)",
        label("Stories:"),
        stats.total_stories(),
        stats.num_stories_done
    );
    let _ = writeln!(
        out,
        "{}      {} ({} done)",
        label("Points:"),
        stats.num_points,
        stats.num_points_done
    );
    let _ = writeln!(out, "{}  {}%", label("Completion:"), stats.completion());
    let _ = writeln!(out, "{}         {}", label("URL:"), iteration.app_url);
    out
}

/// The view printed by `epic <ID>` and `epic create`
pub fn epic_detail(epic: &Epic, links: &AppLinks) -> String {
    let mut out = String::new();
    let stats = &epic.stats;

    let _ = writeln!(out, "#{} {}", epic.id, epic.name);
    if !epic.description.is_empty() {
        let _ = writeln!(out, "Description:\t{}", epic.description);
    }
    let _ = writeln!(out, "State:\t\t{}", epic.state);
    let _ = writeln!(out, "Points:\t\t{}", stats.num_points);
    let _ = writeln!(out, "Points Started:\t{}", stats.num_points_started);
    let _ = writeln!(out, "Points Done:\t{}", stats.num_points_done);
    let _ = writeln!(out, "Completion:\t{}%", stats.completion());

    if let Some(milestone) = epic.milestone_id {
        let _ = writeln!(out, "Milestone:\t{}", milestone);
    }
    let dates = [
        ("Deadline:\t", &epic.deadline),
        ("Planned Start:\t", &epic.planned_start_date),
        ("Started:\t", &epic.started_at),
        ("Completed:\t", &epic.completed_at),
    ];
    for (name, at) in dates {
        if let Some(at) = at {
            let _ = writeln!(out, "{}{}", name, timestamp(at));
        }
    }

    if !epic.owner_ids.is_empty() {
        let _ = writeln!(out, "Owners:\t\t{}", epic.owner_ids.join(", "));
    }
    if !epic.group_ids.is_empty() {
        let _ = writeln!(out, "Teams:\t\t{}", epic.group_ids.join(", "));
    }
    if !epic.labels.is_empty() {
        let names: Vec<&str> = epic.labels.iter().map(|l| l.name.as_str()).collect();
        let _ = writeln!(out, "Labels:\t\t{}", names.join(", "));
    }
    if !epic.objective_ids.is_empty() {
        let ids: Vec<String> = epic.objective_ids.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(out, "Objectives:\t{}", ids.join(", "));
    }
    if epic.archived {
        let _ = writeln!(out, "Archived:\ttrue");
    }
    if let Some(created) = &epic.created_at {
        let _ = writeln!(out, "Created:\t{}", timestamp(created));
    }
    if let Some(updated) = &epic.updated_at {
        if epic.created_at.as_ref() != Some(updated) {
            let _ = writeln!(out, "Updated:\t{}", timestamp(updated));
        }
    }
    let _ = writeln!(out, "URL:\t\t{}", links.epic(epic.id));
    out
}

/// The view printed by `doc view`, `doc create` and `doc update`
pub fn doc_detail(doc: &Doc, include_html: bool) -> String {
    let mut out = String::new();

    let title = doc.title.as_deref().unwrap_or("(Untitled)");
    let _ = writeln!(out, "{}", style(title).blue().bold());
    let _ = writeln!(out, "{}       {}", label("ID:"), doc.id);
    let _ = writeln!(out, "{}      {}", label("URL:"), doc.app_url);
    let _ = writeln!(out, "{}  {}", label("Created:"), timestamp(&doc.created_at));
    if let Some(updated) = &doc.updated_at {
        if *updated != doc.created_at {
            let _ = writeln!(out, "{}  {}", label("Updated:"), timestamp(updated));
        }
    }
    if doc.archived {
        let _ = writeln!(out, "{} true", label("Archived:"));
    }
    out.push('\n');

    if let Some(markdown) = &doc.content_markdown {
        let _ = writeln!(out, "{}", label("Content (Markdown):"));
        let _ = writeln!(out, "{}", markdown);
    }
    if include_html {
        if let Some(html) = &doc.content_html {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", label("Content (HTML):"));
            let _ = writeln!(out, "{}", html);
        }
    }
    out
}

fn estimate(estimate: Option<i64>) -> String {
    match estimate {
        Some(e) if e != 0 => e.to_string(),
        _ => "_".to_string(),
    }
}

fn or_placeholder(s: String) -> String {
    if s.is_empty() {
        "_".to_string()
    } else {
        s
    }
}

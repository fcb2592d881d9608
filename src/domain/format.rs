//! Text templates for stories, epics and iterations
//!
//! Each renderer pairs a fixed [`TokenSet`] with projections of one record.
//! Absent values render as `_` so columns stay aligned in list output.

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};

use super::branch;
use super::entities::{Epic, Iteration};
use super::hydrate::HydratedStory;
use super::links::AppLinks;
use super::template::TokenSet;

/// Template used by `search` when none is given
pub const DEFAULT_STORY_TEMPLATE: &str = "#%id %t
\tType:       %y/%e
\tTeam:       %T
\tProject:    %p
\tEpic:       %epic
\tIteration:  %i
\tRequester:  %r
\tOwners:     %o
\tState:      %s
\tLabels:     %l
\tURL:        %u
\tCreated:    %c
\tUpdated:    %updated
\tArchived:   %a
";

const PLACEHOLDER: &str = "_";

/// Timestamps render the way the API sends them
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn optional_timestamp(at: Option<&DateTime<Utc>>) -> String {
    at.map(timestamp).unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn or_placeholder(s: String) -> String {
    if s.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        s
    }
}

fn story_tokens() -> &'static TokenSet {
    static TOKENS: OnceLock<TokenSet> = OnceLock::new();
    TOKENS.get_or_init(|| {
        TokenSet::new(&[
            "j", "id", "t", "d", "y", "l", "epic", "e", "i", "p", "T", "o", "r", "s", "c",
            "updated", "u", "a", "gbs", "gb",
        ])
    })
}

/// Renders stories with the story token set
///
/// | token | value |
/// |---|---|
/// | `%id` `%t` `%d` `%y` | id, title, description, type |
/// | `%e` | estimate or `_` |
/// | `%s` | `<state name> (#<state id>)` |
/// | `%p` | `<project name> (#<id>)` or `None` |
/// | `%epic` `%i` | `<name> (#<id>)` or `_` |
/// | `%T` | team name or `_` |
/// | `%o` `%r` | owners, requester as `Name (mention)` |
/// | `%l` | labels as `<name> (#<id>)` |
/// | `%u` `%c` `%updated` `%a` | URL, created, updated, archived |
/// | `%gb` `%gbs` | git branch name, short variant |
/// | `%j` | the hydrated story as JSON |
#[derive(Debug, Clone, Copy)]
pub struct StoryFormatter<'a> {
    links: &'a AppLinks,
    mention_name: &'a str,
}

impl<'a> StoryFormatter<'a> {
    pub fn new(links: &'a AppLinks, mention_name: &'a str) -> Self {
        Self {
            links,
            mention_name,
        }
    }

    pub fn render(&self, template: &str, story: &HydratedStory<'_>) -> String {
        story_tokens().render(template, |token| self.resolve(token, story))
    }

    fn resolve(&self, token: &str, hydrated: &HydratedStory<'_>) -> String {
        let story = &hydrated.story;
        match token {
            "j" => self.json(hydrated),
            "id" => story.id.to_string(),
            "t" => story.name.clone(),
            "d" => story.description.clone(),
            "y" => story.story_type.to_string(),
            "e" => match story.estimate {
                Some(e) if e != 0 => e.to_string(),
                _ => PLACEHOLDER.to_string(),
            },
            "l" => or_placeholder(
                story
                    .labels
                    .iter()
                    .map(|l| format!("{} (#{})", l.name, l.id))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            "epic" => match story.epic_id {
                Some(id) => format!(
                    "{} (#{})",
                    hydrated.epic.map(|e| e.name.as_str()).unwrap_or_default(),
                    id
                ),
                None => PLACEHOLDER.to_string(),
            },
            "i" => match story.iteration_id {
                Some(id) => format!(
                    "{} (#{})",
                    hydrated.iteration.map(|i| i.name.as_str()).unwrap_or_default(),
                    id
                ),
                None => PLACEHOLDER.to_string(),
            },
            "p" => hydrated
                .project
                .map(|p| format!("{} (#{})", p.name, p.id))
                .unwrap_or_else(|| "None".to_string()),
            "T" => hydrated
                .group
                .map(|g| g.name.clone())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            "o" => or_placeholder(
                hydrated
                    .owners
                    .iter()
                    .map(|o| o.map(|m| m.display()).unwrap_or_else(|| "Unknown".to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            "r" => hydrated
                .requester
                .map(|m| m.display())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            "s" => format!(
                "{} (#{})",
                hydrated.state.map(|s| s.name.as_str()).unwrap_or_default(),
                story.workflow_state_id
            ),
            "c" => timestamp(&story.created_at),
            "updated" => {
                if story.was_updated() {
                    timestamp(&story.updated_at)
                } else {
                    PLACEHOLDER.to_string()
                }
            }
            "u" => self.links.story(story.id),
            "a" => story.archived.to_string(),
            "gbs" => branch::story_branch(story, &branch::short_prefix(self.mention_name, story)),
            "gb" => branch::story_branch(story, &branch::full_prefix(self.mention_name, story)),
            _ => String::new(),
        }
    }

    fn json(&self, hydrated: &HydratedStory<'_>) -> String {
        let mut value = serde_json::to_value(hydrated).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "url".to_string(),
                self.links.story(hydrated.story.id).into(),
            );
        }
        serde_json::to_string_pretty(&value).unwrap_or_default()
    }
}

fn epic_tokens() -> &'static TokenSet {
    static TOKENS: OnceLock<TokenSet> = OnceLock::new();
    TOKENS.get_or_init(|| {
        TokenSet::new(&[
            "id", "t", "d", "s", "m", "dl", "ps", "p", "pp", "pd", "c", "a", "st", "co", "cr",
            "u", "url",
        ])
    })
}

/// Default template for one entry of the `epics` listing
pub fn epic_list_template(epic: &Epic, detailed: bool) -> String {
    let mut template = String::from(
        "#%id %t\nMilestone:\t%m\nState:\t\t%s\nDeadline:\t%dl\n\
         Points:\t\t%p\nPoints Started: %pp\nPoints Done:\t%pd\nCompletion:\t%c\n",
    );
    if epic.archived {
        template.push_str("Archived:\t%a\n");
    }
    if epic.started {
        template.push_str("Started:\t%st\n");
    }
    if epic.completed {
        template.push_str("Completed:\t%co\n");
    }
    if detailed {
        template.push_str("Description:\t%d\n");
    }
    template
}

/// Renders an epic
///
/// Tokens: `%id %t %d %s %a`, `%m` milestone, `%dl` deadline, `%ps` planned
/// start, `%p %pp %pd` points total/started/done, `%c` completion percentage,
/// `%st %co %cr %u` started/completed/created/updated, `%url`.
pub fn render_epic(template: &str, epic: &Epic, links: &AppLinks) -> String {
    epic_tokens().render(template, |token| match token {
        "id" => epic.id.to_string(),
        "t" => epic.name.clone(),
        "d" => epic.description.clone(),
        "s" => epic.state.clone(),
        "m" => epic
            .milestone_id
            .map(|m| m.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        "dl" => optional_timestamp(epic.deadline.as_ref()),
        "ps" => optional_timestamp(epic.planned_start_date.as_ref()),
        "p" => epic.stats.num_points.to_string(),
        "pp" => epic.stats.num_points_started.to_string(),
        "pd" => epic.stats.num_points_done.to_string(),
        "c" => format!("{}%", epic.stats.completion()),
        "a" => epic.archived.to_string(),
        "st" => optional_timestamp(epic.started_at.as_ref()),
        "co" => optional_timestamp(epic.completed_at.as_ref()),
        "cr" => optional_timestamp(epic.created_at.as_ref()),
        "u" => optional_timestamp(epic.updated_at.as_ref()),
        "url" => links.epic(epic.id),
        _ => String::new(),
    })
}

fn iteration_tokens() -> &'static TokenSet {
    static TOKENS: OnceLock<TokenSet> = OnceLock::new();
    TOKENS.get_or_init(|| {
        TokenSet::new(&[
            "id",
            "t",
            "s",
            "start",
            "end",
            "teams",
            "stories",
            "done",
            "points",
            "pdone",
            "completion",
            "url",
        ])
    })
}

/// Default template for one entry of the `iterations` listing
pub fn iteration_list_template(detailed: bool) -> String {
    let mut template = String::from(
        "#%id %t\nStatus:\t\t%s\nStart:\t\t%start\nEnd:\t\t%end\nTeams:\t\t%teams\n\
         Stories:\t%stories (%done done)\nPoints:\t\t%points (%pdone done)\n",
    );
    if detailed {
        template.push_str("Completion:\t%completion%\nURL:\t\t%url\n");
    }
    template
}

/// Renders an iteration; `teams` are the names of its groups
pub fn render_iteration(
    template: &str,
    iteration: &Iteration,
    teams: &[&str],
    links: &AppLinks,
) -> String {
    let stats = &iteration.stats;
    iteration_tokens().render(template, |token| match token {
        "id" => iteration.id.to_string(),
        "t" => iteration.name.clone(),
        "s" => iteration.status.clone(),
        "start" => iteration.start_date.to_string(),
        "end" => iteration.end_date.to_string(),
        "teams" => or_placeholder(teams.join(", ")),
        "stories" => stats.total_stories().to_string(),
        "done" => stats.num_stories_done.to_string(),
        "points" => stats.num_points.to_string(),
        "pdone" => stats.num_points_done.to_string(),
        "completion" => stats.completion().to_string(),
        "url" => links.iteration(iteration.id),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{EpicStats, IterationStats, Label};
    use crate::domain::hydrate::fixtures::{entities, story};
    use chrono::NaiveDate;

    fn links() -> AppLinks {
        AppLinks::new("https://app.shortcut.com", "acme")
    }

    fn epic() -> Epic {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Launch",
            "state": "in progress",
            "stats": {"num_points": 8, "num_points_started": 2, "num_points_done": 2}
        }))
        .unwrap()
    }

    #[test]
    fn state_token_projection() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);
        let links = links();
        let out = StoryFormatter::new(&links, "alice").render("#%id %t (%s)", &hydrated);
        assert_eq!(out, "#100 Fix bug (Done (#10))");
    }

    #[test]
    fn absent_relations_render_placeholders() {
        let entities = entities();
        let mut s = story(100);
        s.project_id = None;
        s.owner_ids = vec!["ghost".to_string(), "u-1".to_string()];
        let hydrated = HydratedStory::new(s, &entities);
        let links = links();
        let out = StoryFormatter::new(&links, "alice")
            .render("%epic|%i|%T|%r|%e|%l|%p|%o|%updated", &hydrated);
        assert_eq!(out, "_|_|_|_|_|_|None|Unknown, Alice Doe (alice)|_");
    }

    #[test]
    fn epic_and_estimate_do_not_collide() {
        let entities = entities();
        let mut s = story(100);
        s.epic_id = Some(7);
        s.estimate = Some(3);
        s.labels = vec![Label {
            id: 4,
            name: "backend".to_string(),
            archived: false,
        }];
        let hydrated = HydratedStory::new(s, &entities);
        let links = links();
        let out = StoryFormatter::new(&links, "alice").render("%epic/%e %l", &hydrated);
        assert_eq!(out, " (#7)/3 backend (#4)");
    }

    #[test]
    fn branch_and_url_tokens() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);
        let links = links();
        let f = StoryFormatter::new(&links, "alice");
        assert_eq!(f.render("%gb", &hydrated), "alice/sc-100/bug-fix-bug");
        assert_eq!(f.render("%gbs", &hydrated), "alice/sc-100/fix-bug");
        assert_eq!(f.render("%u", &hydrated), "https://app.shortcut.com/acme/story/100");
        assert_eq!(f.render("%c", &hydrated), "2023-01-01T10:00:00Z");
    }

    #[test]
    fn json_token_includes_url_and_relations() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);
        let links = links();
        let out = StoryFormatter::new(&links, "alice").render("%j", &hydrated);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["url"], "https://app.shortcut.com/acme/story/100");
        assert_eq!(value["project"]["name"], "Web");
    }

    #[test]
    fn default_template_renders_every_line() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);
        let links = links();
        let out = StoryFormatter::new(&links, "alice").render(DEFAULT_STORY_TEMPLATE, &hydrated);
        assert!(out.starts_with("#100 Fix bug\n"));
        assert!(out.contains("\tType:       bug/_\n"));
        assert!(out.contains("\tProject:    Web (#1)\n"));
        assert!(out.contains("\tState:      Done (#10)\n"));
        assert!(!out.contains('%'));
    }

    #[test]
    fn epic_tokens() {
        let out = render_epic("%id %t [%s] %p/%pp/%pd %c %m %url", &epic(), &links());
        assert_eq!(out, "7 Launch [in progress] 8/2/2 25% _ https://app.shortcut.com/acme/epic/7");
    }

    #[test]
    fn epic_list_template_follows_flags() {
        let mut e = epic();
        assert!(!epic_list_template(&e, false).contains("Started"));
        e.started = true;
        e.stats = EpicStats::default();
        let out = render_epic(&epic_list_template(&e, true), &e, &links());
        assert!(out.contains("Started:\t_\n"));
        assert!(out.contains("Completion:\t0%\n"));
        assert!(out.contains("Description:\t\n"));
    }

    #[test]
    fn iteration_tokens() {
        let iteration = Iteration {
            id: 3,
            name: "Sprint 1".to_string(),
            description: String::new(),
            status: "started".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            group_ids: vec![],
            stats: IterationStats {
                num_points: 10,
                num_points_done: 4,
                num_stories_done: 2,
                num_stories_started: 1,
                num_stories_unstarted: 1,
                num_stories_backlog: 0,
            },
            app_url: String::new(),
        };
        let out = render_iteration(
            &iteration_list_template(true),
            &iteration,
            &["Platform"],
            &links(),
        );
        assert!(out.starts_with("#3 Sprint 1\nStatus:\t\tstarted\nStart:\t\t2024-01-01\n"));
        assert!(out.contains("Teams:\t\tPlatform\n"));
        assert!(out.contains("Stories:\t4 (2 done)\n"));
        assert!(out.contains("Points:\t\t10 (4 done)\n"));
        assert!(out.contains("Completion:\t40%\n"));
        assert!(out.contains("URL:\t\thttps://app.shortcut.com/acme/iteration/3\n"));
    }
}

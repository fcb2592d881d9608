//! Entity records that stories reference, and the lookup bundle built from them
//!
//! Every command that hydrates stories fetches one [`Entities`] bundle per run.
//! Lookups are keyed by id; labels are kept as a flat list because they are
//! matched by pattern rather than looked up in bulk.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::{self, PatternError};
use super::story::null_default;

/// Anything that can be found by name
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    #[serde(default)]
    pub num_points: i64,
    #[serde(default)]
    pub num_stories: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: ProjectStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub num_stories: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub states: Vec<WorkflowState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mention_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub role: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub profile: Profile,
}

impl Member {
    /// `Name (mention)` as shown next to owners and requesters
    pub fn display(&self) -> String {
        format!("{} ({})", self.profile.name, self.profile.mention_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mention_name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpicStats {
    #[serde(default)]
    pub num_points: i64,
    #[serde(default)]
    pub num_points_started: i64,
    #[serde(default)]
    pub num_points_done: i64,
}

impl EpicStats {
    /// Done points as a rounded percentage of all points
    pub fn completion(&self) -> i64 {
        percent(self.num_points_done, self.num_points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub state: String,
    #[serde(default)]
    pub milestone_id: Option<u64>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub owner_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub group_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_default")]
    pub objective_ids: Vec<u64>,
    #[serde(default)]
    pub stats: EpicStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    #[serde(default)]
    pub num_points: i64,
    #[serde(default)]
    pub num_points_done: i64,
    #[serde(default)]
    pub num_stories_done: i64,
    #[serde(default)]
    pub num_stories_started: i64,
    #[serde(default)]
    pub num_stories_unstarted: i64,
    #[serde(default)]
    pub num_stories_backlog: i64,
}

impl IterationStats {
    pub fn total_stories(&self) -> i64 {
        self.num_stories_done
            + self.num_stories_started
            + self.num_stories_unstarted
            + self.num_stories_backlog
    }

    pub fn completion(&self) -> i64 {
        if self.num_points > 0 {
            percent(self.num_points_done, self.num_points)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, deserialize_with = "null_default")]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub stats: IterationStats,
    #[serde(default, deserialize_with = "null_default")]
    pub app_url: String,
}

impl Iteration {
    /// True if `today` falls within the iteration's dates
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }
}

/// A document as listed or searched (no content)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub app_url: String,
}

/// A full document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub app_url: String,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_markdown: Option<String>,
    #[serde(default)]
    pub content_html: Option<String>,
}

macro_rules! named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

named!(Project, WorkflowState, Group, Epic, Iteration, Label);

impl Named for Member {
    fn name(&self) -> &str {
        &self.profile.name
    }
}

/// Lookup bundle of every collection a story references
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub projects: BTreeMap<u64, Project>,
    pub states: BTreeMap<u64, WorkflowState>,
    pub members: BTreeMap<String, Member>,
    pub groups: BTreeMap<String, Group>,
    pub epics: BTreeMap<u64, Epic>,
    pub iterations: BTreeMap<u64, Iteration>,
    pub labels: Vec<Label>,
}

impl Entities {
    /// Indexes freshly fetched collections; workflow states are flattened
    /// out of their workflows.
    pub fn from_parts(
        projects: Vec<Project>,
        workflows: Vec<Workflow>,
        members: Vec<Member>,
        groups: Vec<Group>,
        epics: Vec<Epic>,
        iterations: Vec<Iteration>,
        labels: Vec<Label>,
    ) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id, p)).collect(),
            states: workflows
                .into_iter()
                .flat_map(|wf| wf.states)
                .map(|s| (s.id, s))
                .collect(),
            members: members.into_iter().map(|m| (m.id.clone(), m)).collect(),
            groups: groups.into_iter().map(|g| (g.id.clone(), g)).collect(),
            epics: epics.into_iter().map(|e| (e.id, e)).collect(),
            iterations: iterations.into_iter().map(|i| (i.id, i)).collect(),
            labels,
        }
    }

    pub fn find_project(&self, query: &str) -> Result<Option<&Project>, PatternError> {
        find_entity(&self.projects, query)
    }

    pub fn find_group(&self, query: &str) -> Result<Option<&Group>, PatternError> {
        find_entity(&self.groups, query)
    }

    pub fn find_state(&self, query: &str) -> Result<Option<&WorkflowState>, PatternError> {
        find_entity(&self.states, query)
    }

    pub fn find_epic(&self, query: &str) -> Result<Option<&Epic>, PatternError> {
        find_entity(&self.epics, query)
    }

    pub fn find_iteration(&self, query: &str) -> Result<Option<&Iteration>, PatternError> {
        find_entity(&self.iterations, query)
    }

    /// Ids of members whose `"<id> <name> <mention>"` matches any of the
    /// comma-separated patterns
    pub fn find_owner_ids(&self, owners: &str) -> Result<Vec<String>, PatternError> {
        let matcher = pattern::any_of(owners)?;
        Ok(self
            .members
            .values()
            .filter(|m| {
                matcher.is_match(&format!(
                    "{} {} {}",
                    m.id, m.profile.name, m.profile.mention_name
                ))
            })
            .map(|m| m.id.clone())
            .collect())
    }

    /// Names of labels whose `"<id> <name>"` matches any of the
    /// comma-separated patterns
    pub fn find_label_names(&self, labels: &str) -> Result<Vec<String>, PatternError> {
        let matcher = pattern::any_of(labels)?;
        Ok(self
            .labels
            .iter()
            .filter(|l| matcher.is_match(&format!("{} {}", l.id, l.name)))
            .map(|l| l.name.clone())
            .collect())
    }
}

/// Finds an entity by exact id, then by name pattern.
///
/// User input always arrives as text, so the query is parsed into the map's
/// key type before the id lookup. Falls back to the first record (in id
/// order) whose name matches the query case-insensitively.
pub fn find_entity<'a, K, V>(
    entities: &'a BTreeMap<K, V>,
    query: &str,
) -> Result<Option<&'a V>, PatternError>
where
    K: Ord + FromStr,
    V: Named,
{
    if let Ok(key) = query.trim().parse::<K>() {
        if let Some(found) = entities.get(&key) {
            return Ok(Some(found));
        }
    }

    let matcher = pattern::case_insensitive(query)?;
    Ok(entities.values().find(|e| matcher.is_match(e.name())))
}

fn percent(part: i64, whole: i64) -> i64 {
    let whole = if whole == 0 { 1 } else { whole };
    ((part as f64 / whole as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str, mention: &str) -> Member {
        Member {
            id: id.to_string(),
            role: "member".to_string(),
            disabled: false,
            profile: Profile {
                name: name.to_string(),
                mention_name: mention.to_string(),
                email_address: None,
            },
        }
    }

    fn project(id: u64, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            description: String::new(),
            archived: false,
            start_time: None,
            stats: ProjectStats::default(),
        }
    }

    fn entities() -> Entities {
        let workflow = Workflow {
            id: 500,
            name: "Dev".to_string(),
            states: vec![
                WorkflowState {
                    id: 10,
                    name: "Done".to_string(),
                    kind: "done".to_string(),
                    position: 3,
                    num_stories: 0,
                },
                WorkflowState {
                    id: 11,
                    name: "In Progress".to_string(),
                    kind: "started".to_string(),
                    position: 2,
                    num_stories: 0,
                },
            ],
        };

        Entities::from_parts(
            vec![project(1, "Web"), project(2, "Mobile")],
            vec![workflow],
            vec![
                member("u-1", "Alice Doe", "alice"),
                member("u-2", "Bob Roe", "bob"),
            ],
            vec![],
            vec![],
            vec![],
            vec![
                Label { id: 1, name: "backend".to_string(), archived: false },
                Label { id: 2, name: "frontend".to_string(), archived: false },
            ],
        )
    }

    #[test]
    fn workflow_states_are_flattened() {
        let e = entities();
        assert_eq!(e.states.len(), 2);
        assert_eq!(e.states[&10].name, "Done");
    }

    #[test]
    fn find_entity_prefers_exact_id() {
        let e = entities();
        assert_eq!(e.find_project("2").unwrap().unwrap().name, "Mobile");
    }

    #[test]
    fn find_entity_falls_back_to_name_pattern() {
        let e = entities();
        assert_eq!(e.find_project("web").unwrap().unwrap().id, 1);
        assert_eq!(e.find_state("progress").unwrap().unwrap().id, 11);
        assert!(e.find_project("desktop").unwrap().is_none());
    }

    #[test]
    fn find_entity_with_unknown_numeric_id_matches_names() {
        let e = entities();
        assert!(e.find_project("99").unwrap().is_none());
    }

    #[test]
    fn find_owner_ids_matches_any_listed_owner() {
        let e = entities();
        let ids = e.find_owner_ids("alice,bob").unwrap();
        assert_eq!(ids, vec!["u-1".to_string(), "u-2".to_string()]);

        let ids = e.find_owner_ids("ROE").unwrap();
        assert_eq!(ids, vec!["u-2".to_string()]);
    }

    #[test]
    fn find_label_names_by_id_or_name() {
        let e = entities();
        assert_eq!(e.find_label_names("front").unwrap(), vec!["frontend"]);
        assert_eq!(e.find_label_names("^1 ").unwrap(), vec!["backend"]);
    }

    #[test]
    fn completion_percentages() {
        let stats = EpicStats { num_points: 8, num_points_started: 2, num_points_done: 3 };
        assert_eq!(stats.completion(), 38);

        let empty = IterationStats::default();
        assert_eq!(empty.completion(), 0);
        assert_eq!(empty.total_stories(), 0);
    }

    #[test]
    fn iteration_current_window_is_inclusive() {
        let it: Iteration = serde_json::from_str(
            r#"{"id": 1, "name": "Sprint", "start_date": "2024-01-01", "end_date": "2024-01-14"}"#,
        )
        .unwrap();
        assert!(it.is_current(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()));
        assert!(!it.is_current(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
    }
}

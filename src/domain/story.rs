//! Story domain model
//!
//! Stories are the primary work items. The API returns them in two shapes:
//! the full story (with tasks, comments and files) and a slim variant used by
//! project listings and search results. Both deserialize into [`Story`], with
//! the embedded lists defaulting to empty when absent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::entities::Label;

/// Kind of story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    #[default]
    Feature,
    Bug,
    Chore,
}

impl StoryType {
    /// All story types, in the order the API documents them
    pub const ALL: [StoryType; 3] = [StoryType::Feature, StoryType::Bug, StoryType::Chore];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Feature => "feature",
            StoryType::Bug => "bug",
            StoryType::Chore => "chore",
        }
    }
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(StoryType::Feature),
            "bug" => Ok(StoryType::Bug),
            "chore" => Ok(StoryType::Chore),
            other => Err(format!("unknown story type: {}", other)),
        }
    }
}

/// A checklist item on a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryTask {
    pub id: u64,
    pub description: String,
    #[serde(default)]
    pub complete: bool,
}

/// A comment on a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

/// A file uploaded to a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// A story as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    pub story_type: StoryType,
    #[serde(default)]
    pub estimate: Option<i64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub position: i64,

    #[serde(default)]
    pub project_id: Option<u64>,
    pub workflow_state_id: u64,
    #[serde(default)]
    pub epic_id: Option<u64>,
    #[serde(default)]
    pub iteration_id: Option<u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub owner_ids: Vec<String>,
    #[serde(default)]
    pub requested_by_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_default")]
    pub tasks: Vec<StoryTask>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<UploadedFile>,

    #[serde(default)]
    pub app_url: Option<String>,
}

impl Story {
    /// Flips the completion state of the tasks with the given ids
    pub fn toggle_tasks(&mut self, task_ids: &[u64]) {
        for task in self.tasks.iter_mut().filter(|t| task_ids.contains(&t.id)) {
            task.complete = !task.complete;
        }
    }

    /// Comments that have not been deleted
    pub fn visible_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| !c.deleted)
    }

    /// True if the last update differs from creation
    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// Treats an explicit JSON `null` the same as a missing field.
///
/// Search results carry `null` for several list and text fields that are
/// always present on full stories.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIM: &str = r#"{
        "id": 100,
        "name": "Fix bug",
        "story_type": "bug",
        "archived": false,
        "created_at": "2023-01-01T10:00:00Z",
        "updated_at": "2023-01-02T10:00:00Z",
        "project_id": 1,
        "workflow_state_id": 10,
        "owner_ids": []
    }"#;

    #[test]
    fn slim_story_defaults_embedded_lists() {
        let story: Story = serde_json::from_str(SLIM).unwrap();
        assert_eq!(story.id, 100);
        assert_eq!(story.story_type, StoryType::Bug);
        assert!(story.tasks.is_empty());
        assert!(story.labels.is_empty());
        assert_eq!(story.description, "");
        assert!(story.epic_id.is_none());
        assert!(story.was_updated());
    }

    #[test]
    fn search_result_nulls_become_empty() {
        let json = r#"{
            "id": 7,
            "name": "Search hit",
            "description": null,
            "story_type": "chore",
            "created_at": "2023-01-01T10:00:00Z",
            "updated_at": "2023-01-01T10:00:00Z",
            "workflow_state_id": 3,
            "tasks": null,
            "comments": null,
            "files": null,
            "labels": null,
            "owner_ids": null,
            "epic_id": null
        }"#;

        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.description, "");
        assert!(story.tasks.is_empty());
        assert!(story.owner_ids.is_empty());
        assert!(!story.was_updated());
    }

    #[test]
    fn toggle_tasks_flips_only_selected() {
        let mut story: Story = serde_json::from_str(SLIM).unwrap();
        story.tasks = vec![
            StoryTask { id: 1, description: "one".into(), complete: false },
            StoryTask { id: 2, description: "two".into(), complete: true },
        ];

        story.toggle_tasks(&[2]);
        assert!(!story.tasks[0].complete);
        assert!(!story.tasks[1].complete);
    }

    #[test]
    fn story_type_parsing() {
        assert_eq!("Bug".parse::<StoryType>().unwrap(), StoryType::Bug);
        assert!("epic".parse::<StoryType>().is_err());
        assert_eq!(StoryType::Chore.to_string(), "chore");
    }
}

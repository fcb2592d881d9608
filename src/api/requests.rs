//! Request bodies for the write endpoints
//!
//! Unset fields are left out of the JSON entirely so the service keeps the
//! current value.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::StoryType;

/// A label reference by name; the service creates unknown labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelParam {
    pub name: String,
}

impl LabelParam {
    pub fn from_names(names: Vec<String>) -> Vec<LabelParam> {
        names.into_iter().map(|name| LabelParam { name }).collect()
    }
}

/// `PUT /stories/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_type: Option<StoryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_state_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<LabelParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_id: Option<u64>,
}

impl StoryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `POST /stories`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStory {
    pub name: String,
    pub story_type: StoryType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_state_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelParam>,
}

/// `POST /epics`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewEpic {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_start_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<u64>,
}

/// `POST /iterations`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIteration {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_ids: Vec<String>,
}

/// `PUT /iterations/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IterationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
}

impl IterationUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `POST /documents`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDoc {
    pub title: String,
    pub content: String,
    pub content_format: &'static str,
}

/// `PUT /documents/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_format: Option<&'static str>,
}

/// Query for `GET /search/documents`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocSearch {
    pub title: String,
    pub archived: Option<bool>,
    pub created_by_me: bool,
    pub followed_by_me: bool,
}

impl DocSearch {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("title", self.title.clone())];
        if let Some(archived) = self.archived {
            pairs.push(("archived", archived.to_string()));
        }
        if self.created_by_me {
            pairs.push(("created_by_me", "true".to_string()));
        }
        if self.followed_by_me {
            pairs.push(("followed_by_me", "true".to_string()));
        }
        pairs
    }
}

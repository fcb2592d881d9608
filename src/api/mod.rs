//! Shortcut REST API access
//!
//! [`ShortcutClient`] talks to the real service. The listing pipeline only
//! needs the read endpoints gathered in [`Tracker`], so it can run against
//! canned data in tests.

mod client;
mod listing;
mod requests;

pub use client::{CurrentMember, ShortcutClient, DEFAULT_API_URL};
pub use listing::{fetch_entities, search_query, StoryListing};
pub use requests::{
    DocSearch, DocUpdate, IterationUpdate, LabelParam, NewDoc, NewEpic, NewIteration, NewStory,
    StoryUpdate,
};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Epic, Group, Iteration, Label, Member, Project, Story, Workflow};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Path of the next page, carrying the cursor as its `next` parameter
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> SearchPage<T> {
    /// The continuation cursor for the following page, if any
    pub fn next_cursor(&self) -> Option<String> {
        let next = self.next.as_deref()?;
        let base = Url::parse("http://localhost/").ok()?;
        let url = base.join(next).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "next")
            .map(|(_, v)| v.into_owned())
    }
}

/// Read endpoints the story listing pipeline depends on
#[allow(async_fn_in_trait)]
pub trait Tracker {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError>;
    async fn list_members(&self) -> Result<Vec<Member>, ApiError>;
    async fn list_groups(&self) -> Result<Vec<Group>, ApiError>;
    async fn list_epics(&self) -> Result<Vec<Epic>, ApiError>;
    async fn list_iterations(&self) -> Result<Vec<Iteration>, ApiError>;
    async fn list_labels(&self) -> Result<Vec<Label>, ApiError>;
    async fn list_project_stories(&self, project_id: u64) -> Result<Vec<Story>, ApiError>;
    async fn search_stories(
        &self,
        query: &str,
        next: Option<&str>,
    ) -> Result<SearchPage<Story>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_cursor_is_read_from_the_next_path() {
        let page: SearchPage<Story> = serde_json::from_value(serde_json::json!({
            "data": [],
            "next": "/api/v3/search/stories?query=owner%3Aalice&next=a8acc6577548df7a213272f7f9f617bcb1f8a831~24",
            "total": 40
        }))
        .unwrap();
        assert_eq!(
            page.next_cursor().as_deref(),
            Some("a8acc6577548df7a213272f7f9f617bcb1f8a831~24")
        );
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page: SearchPage<Story> =
            serde_json::from_value(serde_json::json!({"data": [], "next": null})).unwrap();
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn not_found_detection() {
        let err = ApiError::Status {
            method: "GET".to_string(),
            path: "/iterations/9".to_string(),
            status: 404,
            body: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!ApiError::InvalidUrl("x".to_string()).is_not_found());
    }

    #[test]
    fn decode_error_prints_its_cause_once() {
        let source = serde_json::from_str::<Story>("[]").unwrap_err();
        let cause = source.to_string();
        let err = ApiError::Decode {
            path: "/stories/1".to_string(),
            source,
        };

        let shown = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(shown.matches(&cause).count(), 1);
        assert!(shown.starts_with("Failed to decode response from /stories/1: "));
    }
}

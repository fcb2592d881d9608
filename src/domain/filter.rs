//! Story list options and the client-side filter built from them
//!
//! [`ListOptions`] is the serializable bundle of search flags; it is what a
//! saved workspace stores. [`StoryFilter`] is its compiled form. Every
//! predicate defaults to match-all, so an empty option set only drops
//! archived stories.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::compare::{ComparatorError, DateComparator, NumberComparator};
use super::format::DEFAULT_STORY_TEMPLATE;
use super::hydrate::HydratedStory;
use super::pattern::{self, PatternError};

/// Sort applied when none is given: workflow order, then board position
pub const DEFAULT_SORT: &str = "state.position:asc,position:asc";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Invalid --{flag} value")]
    Comparator {
        flag: &'static str,
        #[source]
        source: ComparatorError,
    },
}

/// Options controlling which stories are listed and how they are shown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    /// Search operators passed to the remote search endpoint
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Include archived stories
    #[serde(deserialize_with = "flag", skip_serializing_if = "is_false")]
    pub archived: bool,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub iteration: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        rename = "type",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub story_type: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

// Older configs store `""` for every flag that was left unset
fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|v| !v.is_empty()))
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => !s.is_empty() && s != "false",
        _ => false,
    })
}

impl ListOptions {
    /// Layers `self` (explicit flags) over `stored` (a saved workspace).
    ///
    /// Any flag given explicitly wins; everything else falls back to the
    /// stored value.
    pub fn merged_over(self, stored: &ListOptions) -> ListOptions {
        let pick = |explicit: Option<String>, saved: &Option<String>| explicit.or_else(|| saved.clone());

        ListOptions {
            args: if self.args.is_empty() {
                stored.args.clone()
            } else {
                self.args
            },
            archived: self.archived || stored.archived,
            created: pick(self.created, &stored.created),
            updated: pick(self.updated, &stored.updated),
            estimate: pick(self.estimate, &stored.estimate),
            label: pick(self.label, &stored.label),
            owner: pick(self.owner, &stored.owner),
            project: pick(self.project, &stored.project),
            state: pick(self.state, &stored.state),
            epic: pick(self.epic, &stored.epic),
            iteration: pick(self.iteration, &stored.iteration),
            text: pick(self.text, &stored.text),
            story_type: pick(self.story_type, &stored.story_type),
            sort: pick(self.sort, &stored.sort),
            format: pick(self.format, &stored.format),
        }
    }

    /// The sort specification in effect
    pub fn sort_spec(&self) -> &str {
        non_empty(&self.sort).unwrap_or(DEFAULT_SORT)
    }

    /// The story template in effect; an empty `--format` means the default
    pub fn template(&self) -> &str {
        non_empty(&self.format).unwrap_or(DEFAULT_STORY_TEMPLATE)
    }

    /// True when the remote search endpoint should be used
    pub fn has_search_operators(&self) -> bool {
        !self.args.is_empty()
    }

    /// Renders the options as command-line flags, e.g. `--owner 'alice'`
    pub fn to_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.archived {
            flags.push("--archived".to_string());
        }

        let valued = [
            ("created", &self.created),
            ("updated", &self.updated),
            ("estimate", &self.estimate),
            ("label", &self.label),
            ("owner", &self.owner),
            ("project", &self.project),
            ("state", &self.state),
            ("epic", &self.epic),
            ("iteration", &self.iteration),
            ("text", &self.text),
            ("type", &self.story_type),
            ("sort", &self.sort),
            ("format", &self.format),
        ];
        for (flag, value) in valued {
            if let Some(v) = value {
                flags.push(format!("--{} '{}'", flag, v));
            }
        }

        flags.extend(self.args.iter().map(|a| format!("'{}'", a)));
        flags.join(" ")
    }
}

/// Compiled story predicates; all must hold for a story to be kept
#[derive(Debug)]
pub struct StoryFilter {
    include_archived: bool,
    label: Regex,
    state: Regex,
    epic: Regex,
    iteration: Regex,
    owner: Option<Regex>,
    text: Regex,
    story_type: Regex,
    created: Option<DateComparator>,
    updated: Option<DateComparator>,
    estimate: Option<NumberComparator>,
}

impl StoryFilter {
    pub fn new(options: &ListOptions) -> Result<Self, FilterError> {
        let comparator = |flag: &'static str, value: &Option<String>| {
            non_empty(value)
                .map(|v| v.parse::<DateComparator>())
                .transpose()
                .map_err(|source| FilterError::Comparator { flag, source })
        };

        Ok(Self {
            include_archived: options.archived,
            label: pattern::optional(options.label.as_deref())?,
            state: pattern::optional(options.state.as_deref())?,
            epic: pattern::optional(options.epic.as_deref())?,
            iteration: pattern::optional(options.iteration.as_deref())?,
            owner: non_empty(&options.owner)
                .map(pattern::case_insensitive)
                .transpose()?,
            text: pattern::optional(options.text.as_deref())?,
            story_type: pattern::optional(options.story_type.as_deref())?,
            created: comparator("created", &options.created)?,
            updated: comparator("updated", &options.updated)?,
            estimate: non_empty(&options.estimate)
                .map(|v| v.parse::<NumberComparator>())
                .transpose()
                .map_err(|source| FilterError::Comparator {
                    flag: "estimate",
                    source,
                })?,
        })
    }

    pub fn matches(&self, s: &HydratedStory<'_>) -> bool {
        let story = &s.story;

        if !self.include_archived && story.archived {
            return false;
        }

        let labels = story
            .labels
            .iter()
            .map(|l| format!("{},{}", l.id, l.name))
            .collect::<Vec<_>>()
            .join(",");
        if !self.label.is_match(&labels) {
            return false;
        }

        let state = format!(
            "{} {}",
            story.workflow_state_id,
            s.state.map(|st| st.name.as_str()).unwrap_or("")
        );
        if !self.state.is_match(&state) {
            return false;
        }

        if !self.epic.is_match(&id_and_name(story.epic_id, s.epic.map(|e| e.name.as_str()))) {
            return false;
        }

        if !self.iteration.is_match(&id_and_name(
            story.iteration_id,
            s.iteration.map(|i| i.name.as_str()),
        )) {
            return false;
        }

        if let Some(owner) = &self.owner {
            let owned = s.known_owners().any(|m| {
                owner.is_match(&format!("{} {}", m.profile.name, m.profile.mention_name))
            });
            if !owned {
                return false;
            }
        }

        if !self.text.is_match(&story.name) {
            return false;
        }

        if !self.story_type.is_match(story.story_type.as_str()) {
            return false;
        }

        if let Some(created) = &self.created {
            if !created.matches(&story.created_at) {
                return false;
            }
        }

        if let Some(updated) = &self.updated {
            if !updated.matches(&story.updated_at) {
                return false;
            }
        }

        // Unestimated stories compare as zero points
        self.estimate
            .map_or(true, |cmp| cmp.matches(story.estimate.unwrap_or(0)))
    }

    /// Keeps the stories that satisfy every predicate, preserving order
    pub fn apply<'e>(&self, stories: Vec<HydratedStory<'e>>) -> Vec<HydratedStory<'e>> {
        let before = stories.len();
        let kept: Vec<_> = stories.into_iter().filter(|s| self.matches(s)).collect();
        tracing::debug!(before, after = kept.len(), "filtered stories");
        kept
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// Unset ids read as `null`, so `--epic null` selects stories outside any epic
fn id_and_name(id: Option<u64>, name: Option<&str>) -> String {
    format!(
        "{} {}",
        id.map_or_else(|| "null".to_string(), |i| i.to_string()),
        name.unwrap_or("")
    )
}

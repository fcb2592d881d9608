//! Domain models and the story listing pipeline
//!
//! Everything here is pure: records, hydration, filtering, sorting and text
//! rendering, with no network or filesystem access.

pub mod branch;
pub mod compare;
pub mod entities;
pub mod filter;
pub mod format;
pub mod hydrate;
pub mod links;
pub mod pattern;
pub mod sort;
pub mod story;
pub mod template;

pub use entities::{
    find_entity, Doc, DocSummary, Entities, Epic, Group, Iteration, Label, Member, Named, Project,
    Workflow, WorkflowState,
};
pub use filter::{FilterError, ListOptions, StoryFilter, DEFAULT_SORT};
pub use format::{StoryFormatter, DEFAULT_STORY_TEMPLATE};
pub use hydrate::{hydrate_all, HydratedStory};
pub use links::AppLinks;
pub use pattern::PatternError;
pub use sort::SortSpec;
pub use story::{Comment, Story, StoryTask, StoryType, UploadedFile};

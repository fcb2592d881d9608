//! The story listing pipeline: fetch, hydrate, filter, sort
//!
//! Entity collections are fetched together and the whole listing fails if
//! any of them fails. Stories come either from the search endpoint (when
//! search operators are given) or from every project matching `--project`.

use futures::future::try_join_all;
use regex::Regex;

use super::{ApiError, Tracker};
use crate::domain::filter::FilterError;
use crate::domain::{
    hydrate_all, pattern, Entities, HydratedStory, ListOptions, SortSpec, Story, StoryFilter,
};

/// Fetches every collection stories reference, concurrently
pub async fn fetch_entities<T: Tracker>(tracker: &T) -> Result<Entities, ApiError> {
    tracing::debug!("fetching entities");
    let (projects, workflows, members, groups, epics, iterations, labels) = tokio::try_join!(
        tracker.list_projects(),
        tracker.list_workflows(),
        tracker.list_members(),
        tracker.list_groups(),
        tracker.list_epics(),
        tracker.list_iterations(),
        tracker.list_labels(),
    )?;
    tracing::debug!(
        projects = projects.len(),
        workflows = workflows.len(),
        members = members.len(),
        "fetched entities"
    );

    Ok(Entities::from_parts(
        projects, workflows, members, groups, epics, iterations, labels,
    ))
}

/// Joins search operators into one query, substituting `%self%` with the
/// caller's mention name
pub fn search_query(args: &[String], mention_name: &str) -> String {
    args.join(" ").replace("%self%", mention_name)
}

/// A validated story listing request
///
/// Building one compiles every pattern and comparator up front, so invalid
/// input is reported before any request is made.
#[derive(Debug)]
pub struct StoryListing {
    options: ListOptions,
    filter: StoryFilter,
    project: Regex,
    sort: SortSpec,
}

impl StoryListing {
    pub fn new(options: ListOptions) -> Result<Self, FilterError> {
        let filter = StoryFilter::new(&options)?;
        let project = pattern::optional(options.project.as_deref())?;
        let sort = SortSpec::from(options.sort_spec());

        Ok(Self {
            options,
            filter,
            project,
            sort,
        })
    }

    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    /// Fetches raw stories using search or a project scan
    pub async fn fetch<T: Tracker>(
        &self,
        tracker: &T,
        entities: &Entities,
        mention_name: &str,
    ) -> Result<Vec<Story>, ApiError> {
        if self.options.has_search_operators() {
            let query = search_query(&self.options.args, mention_name);
            return search_all(tracker, &query).await;
        }

        let project_ids: Vec<u64> = entities
            .projects
            .values()
            .filter(|p| self.project.is_match(&format!("{}{}", p.id, p.name)))
            .map(|p| p.id)
            .collect();
        tracing::debug!(?project_ids, "fetching stories for projects");

        let per_project =
            try_join_all(project_ids.iter().map(|id| tracker.list_project_stories(*id))).await?;
        Ok(per_project.into_iter().flatten().collect())
    }

    /// Fetches, hydrates, filters and sorts stories
    pub async fn run<'e, T: Tracker>(
        &self,
        tracker: &T,
        entities: &'e Entities,
        mention_name: &str,
    ) -> Result<Vec<HydratedStory<'e>>, ApiError> {
        let stories = self.fetch(tracker, entities, mention_name).await?;
        Ok(self.select(stories, entities))
    }

    /// Hydrates, filters and sorts already fetched stories
    pub fn select<'e>(
        &self,
        stories: Vec<Story>,
        entities: &'e Entities,
    ) -> Vec<HydratedStory<'e>> {
        let mut kept = self.filter.apply(hydrate_all(stories, entities));
        self.sort.sort(&mut kept);
        kept
    }
}

/// Follows search cursors until the last page
async fn search_all<T: Tracker>(tracker: &T, query: &str) -> Result<Vec<Story>, ApiError> {
    tracing::debug!(query, "searching stories");
    let mut page = tracker.search_stories(query, None).await?;
    let mut stories = std::mem::take(&mut page.data);

    while let Some(cursor) = page.next_cursor() {
        page = tracker.search_stories(query, Some(&cursor)).await?;
        stories.append(&mut page.data);
    }

    tracing::debug!(count = stories.len(), "search finished");
    Ok(stories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchPage;
    use crate::domain::hydrate::fixtures::{entities, story};
    use crate::domain::{Epic, Group, Iteration, Label, Member, Project, Workflow};
    use std::sync::Mutex;

    /// Serves canned data and records the calls it receives
    #[derive(Default)]
    struct FakeTracker {
        project_stories: Vec<(u64, Vec<Story>)>,
        pages: Vec<SearchPage<Story>>,
        fail_members: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTracker {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Tracker for FakeTracker {
        async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
            Ok(entities().projects.into_values().collect())
        }

        async fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError> {
            Ok(vec![Workflow {
                id: 1,
                name: "Engineering".to_string(),
                states: entities().states.into_values().collect(),
            }])
        }

        async fn list_members(&self) -> Result<Vec<Member>, ApiError> {
            if self.fail_members {
                return Err(ApiError::Status {
                    method: "GET".to_string(),
                    path: "/members".to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(entities().members.into_values().collect())
        }

        async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
            Ok(vec![])
        }

        async fn list_epics(&self) -> Result<Vec<Epic>, ApiError> {
            Ok(vec![])
        }

        async fn list_iterations(&self) -> Result<Vec<Iteration>, ApiError> {
            Ok(vec![])
        }

        async fn list_labels(&self) -> Result<Vec<Label>, ApiError> {
            Ok(vec![])
        }

        async fn list_project_stories(&self, project_id: u64) -> Result<Vec<Story>, ApiError> {
            self.record(format!("project {}", project_id));
            Ok(self
                .project_stories
                .iter()
                .find(|(id, _)| *id == project_id)
                .map(|(_, stories)| stories.clone())
                .unwrap_or_default())
        }

        async fn search_stories(
            &self,
            query: &str,
            next: Option<&str>,
        ) -> Result<SearchPage<Story>, ApiError> {
            self.record(format!("search {} {}", query, next.unwrap_or("-")));
            let index = match next {
                None => 0,
                Some(cursor) => cursor.parse::<usize>().unwrap(),
            };
            Ok(self.pages[index].clone())
        }
    }

    fn page(ids: &[u64], next: Option<&str>) -> SearchPage<Story> {
        SearchPage {
            data: ids.iter().map(|id| story(*id)).collect(),
            next: next.map(|n| format!("/api/v3/search/stories?query=x&next={}", n)),
            total: None,
        }
    }

    #[tokio::test]
    async fn entity_bundle_is_indexed() {
        let tracker = FakeTracker::default();
        let entities = fetch_entities(&tracker).await.unwrap();
        assert_eq!(entities.projects.len(), 1);
        assert_eq!(entities.states.len(), 2);
        assert!(entities.members.contains_key("u-1"));
    }

    #[tokio::test]
    async fn entity_fetch_fails_as_a_whole() {
        let tracker = FakeTracker {
            fail_members: true,
            ..Default::default()
        };
        let err = fetch_entities(&tracker).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn project_scan_filters_and_sorts() {
        let mut todo = story(2);
        todo.workflow_state_id = 11;
        let mut archived = story(3);
        archived.archived = true;
        let tracker = FakeTracker {
            project_stories: vec![(1, vec![story(1), todo, archived])],
            ..Default::default()
        };
        let entities = fetch_entities(&tracker).await.unwrap();

        let listing = StoryListing::new(ListOptions::default()).unwrap();
        let stories = listing.run(&tracker, &entities, "alice").await.unwrap();

        // "Todo" (position 1) sorts before "Done" (position 2)
        let ids: Vec<u64> = stories.iter().map(|s| s.story.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(tracker.calls(), vec!["project 1"]);
    }

    #[tokio::test]
    async fn project_pattern_limits_scanned_projects() {
        let tracker = FakeTracker::default();
        let entities = fetch_entities(&tracker).await.unwrap();

        let listing = StoryListing::new(ListOptions {
            project: Some("mobile".to_string()),
            ..Default::default()
        })
        .unwrap();
        let stories = listing.run(&tracker, &entities, "alice").await.unwrap();
        assert!(stories.is_empty());
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn search_follows_cursors_until_exhausted() {
        let tracker = FakeTracker {
            pages: vec![
                page(&[1, 2], Some("1")),
                page(&[3], Some("2")),
                page(&[4], None),
            ],
            ..Default::default()
        };
        let entities = fetch_entities(&tracker).await.unwrap();

        let listing = StoryListing::new(ListOptions {
            args: vec!["owner:%self%".to_string(), "is:started".to_string()],
            sort: Some("id:desc".to_string()),
            ..Default::default()
        })
        .unwrap();
        let stories = listing.run(&tracker, &entities, "alice").await.unwrap();

        let ids: Vec<u64> = stories.iter().map(|s| s.story.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(
            tracker.calls(),
            vec![
                "search owner:alice is:started -",
                "search owner:alice is:started 1",
                "search owner:alice is:started 2",
            ]
        );
    }

    #[test]
    fn invalid_input_is_rejected_before_fetching() {
        let err = StoryListing::new(ListOptions {
            project: Some("(".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::Pattern(_)));

        assert!(StoryListing::new(ListOptions {
            estimate: Some("<x".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn self_token_is_substituted() {
        let args = vec!["owner:%self%".to_string(), "requester:%self%".to_string()];
        assert_eq!(search_query(&args, "bob"), "owner:bob requester:bob");
    }
}

//! Story hydration
//!
//! A hydrated story carries borrowed references to the records its foreign
//! keys point at. Missing or unknown ids resolve to `None` rather than
//! failing; owners keep one slot per id so unresolved owners still render.

use serde::Serialize;

use super::entities::{Entities, Epic, Group, Iteration, Member, Project, WorkflowState};
use super::story::Story;

/// A story joined with the entities it references
#[derive(Debug, Clone, Serialize)]
pub struct HydratedStory<'e> {
    #[serde(flatten)]
    pub story: Story,
    pub project: Option<&'e Project>,
    pub state: Option<&'e WorkflowState>,
    pub epic: Option<&'e Epic>,
    pub iteration: Option<&'e Iteration>,
    pub group: Option<&'e Group>,
    pub owners: Vec<Option<&'e Member>>,
    pub requester: Option<&'e Member>,
}

impl<'e> HydratedStory<'e> {
    /// Resolves every reference of `story` against `entities`
    pub fn new(story: Story, entities: &'e Entities) -> Self {
        let project = story.project_id.and_then(|id| entities.projects.get(&id));
        let state = entities.states.get(&story.workflow_state_id);
        let epic = story.epic_id.and_then(|id| entities.epics.get(&id));
        let iteration = story.iteration_id.and_then(|id| entities.iterations.get(&id));
        let group = story.group_id.as_ref().and_then(|id| entities.groups.get(id));
        let owners = story
            .owner_ids
            .iter()
            .map(|id| entities.members.get(id))
            .collect();
        let requester = story
            .requested_by_id
            .as_ref()
            .and_then(|id| entities.members.get(id));

        Self {
            story,
            project,
            state,
            epic,
            iteration,
            group,
            owners,
            requester,
        }
    }

    /// Resolved owners, skipping ids with no matching member
    pub fn known_owners(&self) -> impl Iterator<Item = &'e Member> + '_ {
        self.owners.iter().filter_map(|o| *o)
    }
}

/// Hydrates a batch of stories
pub fn hydrate_all(stories: Vec<Story>, entities: &Entities) -> Vec<HydratedStory<'_>> {
    tracing::debug!(count = stories.len(), "hydrating stories");
    stories
        .into_iter()
        .map(|s| HydratedStory::new(s, entities))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::entities::{Profile, ProjectStats, Workflow};

    pub fn story(id: u64) -> Story {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Fix bug",
            "story_type": "bug",
            "archived": false,
            "created_at": "2023-01-01T10:00:00Z",
            "updated_at": "2023-01-01T10:00:00Z",
            "project_id": 1,
            "workflow_state_id": 10,
            "owner_ids": []
        }))
        .unwrap()
    }

    pub fn member(id: &str, name: &str, mention: &str) -> Member {
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

    /// Project 1 "Web", state 10 "Done", state 11 "Todo", one member
    pub fn entities() -> Entities {
        Entities::from_parts(
            vec![Project {
                id: 1,
                name: "Web".to_string(),
                description: String::new(),
                archived: false,
                start_time: None,
                stats: ProjectStats::default(),
            }],
            vec![Workflow {
                id: 1,
                name: "Engineering".to_string(),
                states: vec![
                    WorkflowState {
                        id: 10,
                        name: "Done".to_string(),
                        kind: "done".to_string(),
                        position: 2,
                        num_stories: 1,
                    },
                    WorkflowState {
                        id: 11,
                        name: "Todo".to_string(),
                        kind: "unstarted".to_string(),
                        position: 1,
                        num_stories: 0,
                    },
                ],
            }],
            vec![member("u-1", "Alice Doe", "alice")],
            vec![],
            vec![],
            vec![],
            vec![],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn resolves_known_references() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);

        assert_eq!(hydrated.project.map(|p| p.id), Some(1));
        assert_eq!(hydrated.state.map(|s| s.name.as_str()), Some("Done"));
        assert!(hydrated.epic.is_none());
        assert!(hydrated.requester.is_none());
    }

    #[test]
    fn unknown_references_become_none() {
        let entities = entities();
        let mut s = story(100);
        s.project_id = Some(99);
        s.epic_id = Some(5);
        s.workflow_state_id = 404;
        s.group_id = Some("missing".to_string());

        let hydrated = HydratedStory::new(s, &entities);
        assert!(hydrated.project.is_none());
        assert!(hydrated.state.is_none());
        assert!(hydrated.epic.is_none());
        assert!(hydrated.group.is_none());
    }

    #[test]
    fn owners_keep_a_slot_per_id() {
        let entities = entities();
        let mut s = story(100);
        s.owner_ids = vec!["ghost".to_string(), "u-1".to_string()];
        s.requested_by_id = Some("u-1".to_string());

        let hydrated = HydratedStory::new(s, &entities);
        assert_eq!(hydrated.owners.len(), 2);
        assert!(hydrated.owners[0].is_none());
        assert_eq!(hydrated.owners[1].map(|m| m.id.as_str()), Some("u-1"));
        assert_eq!(hydrated.known_owners().count(), 1);
        assert_eq!(hydrated.requester.map(|m| m.profile.mention_name.as_str()), Some("alice"));
    }

    #[test]
    fn serializes_story_fields_alongside_relations() {
        let entities = entities();
        let hydrated = HydratedStory::new(story(100), &entities);
        let value = serde_json::to_value(&hydrated).unwrap();

        assert_eq!(value["id"], 100);
        assert_eq!(value["state"]["name"], "Done");
        assert_eq!(value["state"]["position"], 2);
        assert!(value["epic"].is_null());
    }
}

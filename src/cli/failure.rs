//! User-visible failure classes and their exit codes

use thiserror::Error;

/// A failure with a dedicated process exit code
///
/// Attached to errors as context, e.g. `.context(Failure::StoryFetch(id))`,
/// so the underlying cause is still printed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("Error fetching entities")]
    Entities,

    #[error("No story ID argument present or found in git branch")]
    NoBranchId,

    #[error("Error creating comment on story #{0}")]
    Comment(u64),

    #[error("Error creating task on story #{0}")]
    TaskCreate(u64),

    #[error("Error updating tasks on story #{0}")]
    TaskUpdate(u64),

    #[error("Error fetching story #{0}")]
    StoryFetch(u64),

    #[error("Error updating story #{0}")]
    StoryUpdate(u64),

    #[error(
        "Error creating story branch in Shortcut format. \
         Please run: \"short install --force\" to add your mention name to the config."
    )]
    NoMentionName,

    #[error("This story is not part of an epic.")]
    NoEpic,

    #[error("This story is not part of an iteration.")]
    NoIteration,
}

impl Failure {
    pub fn exit_code(&self) -> u8 {
        match self {
            Failure::Entities | Failure::NoBranchId => 2,
            Failure::Comment(_) | Failure::TaskCreate(_) | Failure::TaskUpdate(_) => 3,
            Failure::StoryFetch(_) => 4,
            Failure::StoryUpdate(_) => 5,
            Failure::NoMentionName => 10,
            Failure::NoEpic => 21,
            Failure::NoIteration => 22,
        }
    }
}

/// Exit code for an error: the first [`Failure`] attached to it, else 1
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(failure) = err.downcast_ref::<Failure>() {
        return failure.exit_code();
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Failure>())
        .map(Failure::exit_code)
        .unwrap_or(1)
}

/// True when stdout was closed under us, e.g. `short search -I | head -3`
pub fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::BrokenPipe)
}

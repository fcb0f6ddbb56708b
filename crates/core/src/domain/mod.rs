// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod queue;
pub mod run;
pub mod state;

pub use error::DomainError;
pub use job::{Job, JobId, JobType, OverlapPolicy};
pub use queue::{
    DedupScope, QueueDefinition, QueueId, QueueItem, QueueItemId, QueueItemStatus,
    ENQUEUE_DEDUPED,
};
pub use run::{Run, RunId, RunStatus, RunTrigger};
pub use state::{StateEntry, StateItem};

pub mod ids;
pub mod cleanup;

pub use ids::{AssistantId, FileId, RunId, ThreadId};
pub use cleanup::Cleanup;

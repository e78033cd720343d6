//! Host-facing orchestration: the import pipeline, its event types, and
//! the sink traits the host implements.

pub mod events;
pub mod pipeline;
pub mod proxy;

pub use events::{ImportEvent, ImportStage, Notification, NotificationLevel};
pub use pipeline::{ImportOptions, ImportOutcome, ImportPipeline};
pub use proxy::{EventSink, LogSink, TracingSink};

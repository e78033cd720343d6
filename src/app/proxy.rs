//! Defines the abstractions over the host's output surfaces.

use super::events::ImportEvent;

pub use crate::core::bootstrap::LogSink;

/// Fire-and-forget sink for pipeline events. The host wires this to its
/// event loop; tests wire it to a channel.
pub trait EventSink: Send + Sync {
    fn send(&self, event: ImportEvent);
}

/// Default sinks that forward to `tracing`, for hosts that have not wired
/// their own surfaces yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&self, event: ImportEvent) {
        tracing::info!("import event: {:?}", event);
    }
}

impl LogSink for TracingSink {
    fn append_line(&self, line: &str) {
        tracing::info!(target: "workbench_import::process", "{line}");
    }
}

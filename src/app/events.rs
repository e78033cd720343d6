//! Defines the event structures sent from the pipeline to the host UI.

use crate::core::ImportStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A human-readable message for the host's toast/notification surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Walking,
    Reconciling,
    Materializing,
    Installing,
    Starting,
}

/// Events sent from the pipeline to the host while an import runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    /// The pipeline moved to a new stage.
    Stage(ImportStage),
    /// A notification to show the user.
    Notify(Notification),
    /// The file store was replaced/updated; the host re-reads its snapshot
    /// to pick a file to display and reveal the workbench.
    StoreUpdated { root: String, file_count: usize },
    /// Final walk counters, also carried in the import outcome.
    WalkFinished(ImportStats),
}

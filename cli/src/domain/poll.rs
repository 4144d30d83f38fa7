//! Status vocabularies and outcomes for long-running remote operations.
//!
//! Pure types only. The loop that drives them lives in
//! `application::services::poller`.

use std::time::Duration;

/// How a single observed status moves the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A known non-terminal status.
    InProgress,
    /// A status the vocabulary does not list. Treated as in progress.
    Unrecognized,
    Success,
    Failure,
}

/// Terminal result of one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<S> {
    /// The last observed status classified as success.
    Success(S),
    /// The last observed status classified as failure.
    Failure(S),
    /// The overall timeout elapsed before a terminal status was observed.
    TimedOut,
}

/// Interval and overall deadline of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(45 * 60),
        }
    }
}

/// Consecutive unrecognized statuses after which the poller warns once.
pub const UNRECOGNIZED_WARN_AFTER: u32 = 12;

/// Status strings of one resource kind, verbatim from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusVocabulary {
    pub in_progress: &'static [&'static str],
    pub success: &'static [&'static str],
    pub failure: &'static [&'static str],
}

impl StatusVocabulary {
    /// Classify a status string. Unknown values keep the loop going.
    #[must_use]
    pub fn classify(&self, status: &str) -> Classification {
        if self.success.contains(&status) {
            Classification::Success
        } else if self.failure.contains(&status) {
            Classification::Failure
        } else if self.in_progress.contains(&status) {
            Classification::InProgress
        } else {
            Classification::Unrecognized
        }
    }
}

pub const CREATE_TASK: StatusVocabulary = StatusVocabulary {
    in_progress: &["Inline", "Preparing"],
    success: &["Finished"],
    failure: &["Failed"],
};

pub const ACTIVATION: StatusVocabulary = StatusVocabulary {
    in_progress: &["RESOURCE_DEPLOYING"],
    success: &["RESOURCE_PUBLISHED"],
    failure: &["RESOURCE_FAILED", "RESOURCE_CEASED"],
};

// RESOURCE_PUBLISHED is still active while a deactivation is being picked up.
pub const DEACTIVATION: StatusVocabulary = StatusVocabulary {
    in_progress: &["RESOURCE_DELETING", "RESOURCE_PUBLISHED"],
    success: &["IMAGE_AVAILABLE"],
    failure: &["RESOURCE_FAILED"],
};

/// Kind of remote resource being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    CreateTask,
    Activation,
    Deactivation,
}

/// The remote resource a poll loop watches, plus its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub kind: TargetKind,
    pub id: String,
}

impl PollTarget {
    #[must_use]
    pub fn create_task(task_id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::CreateTask,
            id: task_id.into(),
        }
    }

    #[must_use]
    pub fn activation(image_id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Activation,
            id: image_id.into(),
        }
    }

    #[must_use]
    pub fn deactivation(image_id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Deactivation,
            id: image_id.into(),
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &'static StatusVocabulary {
        match self.kind {
            TargetKind::CreateTask => &CREATE_TASK,
            TargetKind::Activation => &ACTIVATION,
            TargetKind::Deactivation => &DEACTIVATION,
        }
    }

    /// Operation name used in messages, e.g. `"Activation"`.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self.kind {
            TargetKind::CreateTask => "Image creation",
            TargetKind::Activation => "Activation",
            TargetKind::Deactivation => "Deactivation",
        }
    }

    /// Human description of the watched resource, e.g. `"task t-42"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TargetKind::CreateTask => format!("task {}", self.id),
            TargetKind::Activation | TargetKind::Deactivation => format!("image {}", self.id),
        }
    }
}

//! Progress notifications.

use std::fmt;

/// Stage boundaries of a conversion, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Run started.
    Initialized,
    /// Target profile chosen.
    ProfileResolved,
    /// Working tree ready.
    Extracted,
    /// Metadata resolved.
    MetadataResolved,
    /// Dependency scan finished or skipped.
    DependenciesScanned,
    /// Icon chosen (or none found).
    IconResolved,
    /// rpmbuild about to run.
    BuildStarted,
    /// Package produced.
    BuildFinished,
    /// Publish attempted.
    Published,
    /// Run finished.
    Done,
}

impl Stage {
    /// Completion percentage reported for this stage.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Initialized => 5,
            Stage::ProfileResolved => 10,
            Stage::Extracted => 20,
            Stage::MetadataResolved => 30,
            Stage::DependenciesScanned => 40,
            Stage::IconResolved => 55,
            Stage::BuildStarted => 70,
            Stage::BuildFinished => 90,
            Stage::Published => 95,
            Stage::Done => 100,
        }
    }
}

/// One progress notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// 0 to 100.
    pub percent: u8,
    /// Stage just reached.
    pub stage: Stage,
    /// Short status text.
    pub message: String,
}

impl Progress {
    /// Notification for `stage`.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            percent: stage.percent(),
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3}%] {}", self.percent, self.message)
    }
}

/// Receives progress notifications. Called on the converting task.
pub type ProgressCallback = dyn Fn(&Progress) + Send + Sync;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_increase_with_stage() {
        let stages = [
            Stage::Initialized,
            Stage::ProfileResolved,
            Stage::Extracted,
            Stage::MetadataResolved,
            Stage::DependenciesScanned,
            Stage::IconResolved,
            Stage::BuildStarted,
            Stage::BuildFinished,
            Stage::Published,
            Stage::Done,
        ];
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
        assert_eq!(Stage::Done.percent(), 100);
    }

    #[test]
    fn test_display() {
        assert_eq!(Progress::new(Stage::Extracted, "Extracted").to_string(), "[ 20%] Extracted");
    }
}

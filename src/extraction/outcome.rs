//! Per-item terminal states

use serde::{Serialize, Serializer};

use crate::store::PersistenceError;

/// Why an item stopped. Rendered as a kebab-case tag plus optional detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageFailure {
    /// No browser session could be acquired, or the page could not be read
    #[error("session: {0}")]
    Session(String),

    #[error("navigation: {0}")]
    Navigation(String),

    #[error("primary-content-timeout")]
    PrimaryContentTimeout,

    #[error("trigger-not-found")]
    TriggerNotFound,

    #[error("secondary-content-timeout")]
    SecondaryContentTimeout,

    #[error("persistence: {message}")]
    Persistence {
        message: String,
        connection_lost: bool,
    },

    /// The item's task panicked; the executor survived
    #[error("panicked")]
    Panicked,
}

impl StageFailure {
    /// Stable tag identifying the stage that failed.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Navigation(_) => "navigation",
            Self::PrimaryContentTimeout => "primary-content-timeout",
            Self::TriggerNotFound => "trigger-not-found",
            Self::SecondaryContentTimeout => "secondary-content-timeout",
            Self::Persistence { .. } => "persistence",
            Self::Panicked => "panicked",
        }
    }

    /// Whether this failure must stop the whole pool.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                connection_lost: true,
                ..
            }
        )
    }
}

impl From<PersistenceError> for StageFailure {
    fn from(err: PersistenceError) -> Self {
        Self::Persistence {
            connection_lost: err.is_connection_lost(),
            message: err.to_string(),
        }
    }
}

impl Serialize for StageFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Terminal state of one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemStatus {
    /// Every reachable stage ran. `skipped` lists wallets whose detail page
    /// did not render in time.
    Completed { traders: usize, skipped: Vec<String> },
    Failed { reason: StageFailure },
}

impl ItemStatus {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    #[must_use]
    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Failed { reason } => Some(reason),
            Self::Completed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub token: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Per-item status report for one pool run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl PoolReport {
    #[must_use]
    pub fn status_of(&self, token: &str) -> Option<&ItemStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.token == token)
            .map(|outcome| &outcome.status)
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_completed())
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_tags_and_fatality() {
        assert_eq!(StageFailure::PrimaryContentTimeout.to_string(), "primary-content-timeout");
        assert_eq!(StageFailure::Navigation("dns".into()).tag(), "navigation");
        assert!(!StageFailure::TriggerNotFound.is_fatal());

        let lost: StageFailure = PersistenceError::ConnectionLost("closed".into()).into();
        assert_eq!(lost.tag(), "persistence");
        assert!(lost.is_fatal());

        let constraint: StageFailure = PersistenceError::Constraint("fk".into()).into();
        assert!(!constraint.is_fatal());
    }

    #[test]
    fn test_report_serializes_flat_statuses() -> Result<(), serde_json::Error> {
        let report = PoolReport {
            outcomes: vec![
                ItemOutcome {
                    token: "A".into(),
                    status: ItemStatus::Completed {
                        traders: 2,
                        skipped: vec![],
                    },
                },
                ItemOutcome {
                    token: "B".into(),
                    status: ItemStatus::Failed {
                        reason: StageFailure::SecondaryContentTimeout,
                    },
                },
            ],
        };

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["outcomes"][0]["status"], "completed");
        assert_eq!(json["outcomes"][0]["traders"], 2);
        assert_eq!(json["outcomes"][1]["status"], "failed");
        assert_eq!(json["outcomes"][1]["reason"], "secondary-content-timeout");
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        Ok(())
    }
}

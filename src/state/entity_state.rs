/// Entity outcome definitions for end-of-run reporting
///
/// Every entity in the input list ends the run in exactly one of these states.
use crate::api::Entity;
use std::fmt;

/// Final state of one entity after its pipeline ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOutcome {
    /// Every unit of work for the entity succeeded
    Done,

    /// Some records were emitted before a unit of work was abandoned
    PartiallyDone,

    /// Nothing could be retrieved for the entity
    Skipped,

    /// Shutdown was requested while the entity was in progress
    Interrupted,
}

impl EntityOutcome {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the entity should be reported as failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::PartiallyDone | Self::Skipped)
    }

    /// Converts the outcome to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::PartiallyDone => "partially_done",
            Self::Skipped => "skipped",
            Self::Interrupted => "interrupted",
        }
    }

    /// Parses an outcome from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "done" => Some(Self::Done),
            "partially_done" => Some(Self::PartiallyDone),
            "skipped" => Some(Self::Skipped),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }

    pub fn all_outcomes() -> [Self; 4] {
        [
            Self::Done,
            Self::PartiallyDone,
            Self::Skipped,
            Self::Interrupted,
        ]
    }
}

impl fmt::Display for EntityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub entity: Entity,
    pub outcome: EntityOutcome,
    /// Feed items or edges emitted for the entity
    pub records: u64,
    /// Human-readable reason for any outcome other than `Done`
    pub cause: Option<String>,
}

impl EntityReport {
    pub fn done(entity: &Entity, records: u64) -> Self {
        Self {
            entity: entity.clone(),
            outcome: EntityOutcome::Done,
            records,
            cause: None,
        }
    }

    /// Report for an entity whose work stopped early
    ///
    /// The outcome is `PartiallyDone` if anything was emitted, else `Skipped`.
    pub fn stopped(entity: &Entity, records: u64, cause: impl fmt::Display) -> Self {
        Self {
            entity: entity.clone(),
            outcome: if records > 0 {
                EntityOutcome::PartiallyDone
            } else {
                EntityOutcome::Skipped
            },
            records,
            cause: Some(cause.to_string()),
        }
    }

    pub fn with_outcome(mut self, outcome: EntityOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

use thiserror::Error;

use crate::models::ordering::ContinuityError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid group type: {0}")]
    InvalidType(String),

    #[error("Invalid {field}: {value} (must be at least 1)")]
    InvalidOrder { field: &'static str, value: i64 },

    #[error("Exercise {exercise_id} must set exactly one of reps or hold_seconds")]
    AmbiguousPrescription { exercise_id: String },

    #[error("A group needs at least one exercise")]
    EmptyGroup,

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    Continuity(#[from] ContinuityError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Group {group_id} does not belong to workout {workout_id}")]
    UnknownGroup { group_id: String, workout_id: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Errors the caller can fix by correcting its input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidType(_)
                | Self::InvalidOrder { .. }
                | Self::AmbiguousPrescription { .. }
                | Self::EmptyGroup
                | Self::InvalidField { .. }
        )
    }
}

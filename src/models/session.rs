use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::error::AppError;
use crate::models::nullable;
use crate::models::weight::{WeightField, WeightInput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub created_by_id: String,
    pub workout_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub perceived_intensity: Option<i64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

/// Completion state shared by blocks and session exercises.
///
/// `completed_at` and `skipped` are never both set: whichever of
/// [`Progress::complete`] and [`Progress::skip`] ran last wins. Neither
/// requires a prior [`Progress::start`], and neither refuses to leave a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
pub struct Progress {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped: bool,
}

impl Progress {
    pub fn state(&self) -> ProgressState {
        if self.skipped {
            ProgressState::Skipped
        } else if self.completed_at.is_some() {
            ProgressState::Completed
        } else if self.started_at.is_some() {
            ProgressState::InProgress
        } else {
            ProgressState::Pending
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        self.skipped = false;
    }

    pub fn skip(&mut self) {
        self.skipped = true;
        self.completed_at = None;
    }

    /// Completed or skipped.
    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some() || self.skipped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SessionBlock {
    pub id: String,
    pub session_id: String,
    pub group_id: Option<String>,
    pub block_order: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub progress: Progress,
    pub perceived_exertion: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SessionExercise {
    pub id: String,
    pub session_block_id: String,
    pub prescription_id: Option<String>,
    pub exercise_id: String,
    pub exercise_order: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub progress: Progress,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSet {
    pub id: String,
    pub session_exercise_id: String,
    pub set_number: i64,
    pub completed: bool,
    pub actual_reps: Option<i64>,
    pub actual_weight: Option<WeightField>,
    pub actual_duration_seconds: Option<i64>,
    pub rpe_value_id: Option<String>,
    pub was_failure: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for SessionSet {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_exercise_id: row.try_get("session_exercise_id")?,
            set_number: row.try_get("set_number")?,
            completed: row.try_get("completed")?,
            actual_reps: row.try_get("actual_reps")?,
            actual_weight: WeightField::from_row(row, "actual_weight")?,
            actual_duration_seconds: row.try_get("actual_duration_seconds")?,
            rpe_value_id: row.try_get("rpe_value_id")?,
            was_failure: row.try_get("was_failure")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub user_id: String,
    pub created_by_id: String,
    pub workout_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewSession {
    /// A session the user logs for themselves.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            created_by_id: user_id.clone(),
            user_id,
            workout_id: None,
            started_at: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub ended_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub duration_seconds: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub perceived_intensity: Option<Option<i64>>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionExercise {
    pub exercise_id: String,
    pub prescription_id: Option<String>,
    pub notes: Option<String>,
}

impl NewSessionExercise {
    pub fn free_form(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            prescription_id: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSessionSet {
    #[serde(default)]
    pub completed: bool,
    pub actual_reps: Option<i64>,
    pub actual_weight: Option<WeightInput>,
    pub actual_duration_seconds: Option<i64>,
    pub rpe_value_id: Option<String>,
    #[serde(default)]
    pub was_failure: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSetPatch {
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub actual_reps: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub actual_weight: Option<Option<WeightInput>>,
    #[serde(default, deserialize_with = "nullable")]
    pub actual_duration_seconds: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rpe_value_id: Option<Option<String>>,
    pub was_failure: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

/// Accepts `None` or a value within the 1–10 scale.
pub(crate) fn check_rating(field: &'static str, value: Option<i64>) -> Result<(), AppError> {
    match value {
        Some(v) if !(1..=10).contains(&v) => Err(AppError::InvalidField {
            field,
            reason: format!("must be between 1 and 10, got {v}"),
        }),
        _ => Ok(()),
    }
}

fn check_non_negative(field: &'static str, value: Option<i64>) -> Result<(), AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::InvalidField {
            field,
            reason: format!("must not be negative, got {v}"),
        }),
        _ => Ok(()),
    }
}

fn weight_field(input: Option<&WeightInput>) -> Result<Option<WeightField>, AppError> {
    input
        .map(|w| WeightField::from_weight_input(w, "actual_weight"))
        .transpose()
}

impl WorkoutSession {
    pub fn apply(&mut self, patch: SessionPatch) -> Result<(), AppError> {
        if let Some(ended_at) = patch.ended_at {
            if ended_at.is_some_and(|end| end < self.started_at) {
                return Err(AppError::InvalidField {
                    field: "ended_at",
                    reason: "must not precede started_at".to_string(),
                });
            }
            self.ended_at = ended_at;
        }
        if let Some(duration) = patch.duration_seconds {
            check_non_negative("duration_seconds", duration)?;
            self.duration_seconds = duration;
        }
        if let Some(intensity) = patch.perceived_intensity {
            check_rating("perceived_intensity", intensity)?;
            self.perceived_intensity = intensity;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

impl NewSessionSet {
    pub fn validate(&self) -> Result<Option<WeightField>, AppError> {
        check_non_negative("actual_reps", self.actual_reps)?;
        check_non_negative("actual_duration_seconds", self.actual_duration_seconds)?;
        weight_field(self.actual_weight.as_ref())
    }
}

impl SessionSet {
    /// Overwrites only the fields present in `patch`.
    pub fn apply(&mut self, patch: SessionSetPatch) -> Result<(), AppError> {
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(reps) = patch.actual_reps {
            check_non_negative("actual_reps", reps)?;
            self.actual_reps = reps;
        }
        if let Some(weight) = patch.actual_weight {
            self.actual_weight = weight_field(weight.as_ref())?;
        }
        if let Some(duration) = patch.actual_duration_seconds {
            check_non_negative("actual_duration_seconds", duration)?;
            self.actual_duration_seconds = duration;
        }
        if let Some(rpe) = patch.rpe_value_id {
            self.rpe_value_id = rpe;
        }
        if let Some(failure) = patch.was_failure {
            self.was_failure = failure;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseTree {
    pub exercise: SessionExercise,
    pub sets: Vec<SessionSet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    pub block: SessionBlock,
    pub exercises: Vec<ExerciseTree>,
}

/// A session with everything under it, each level in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTree {
    pub session: WorkoutSession,
    pub blocks: Vec<BlockTree>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn state_follows_flags() {
        let now = Utc::now();
        let mut p = Progress::default();
        assert_eq!(p.state(), ProgressState::Pending);
        p.start(now);
        assert_eq!(p.state(), ProgressState::InProgress);
        p.start(now + Duration::minutes(5));
        assert_eq!(p.started_at, Some(now));
        p.complete(now);
        assert_eq!(p.state(), ProgressState::Completed);
    }

    #[test]
    fn last_transition_wins() {
        let now = Utc::now();

        let mut p = Progress::default();
        p.skip();
        p.complete(now);
        assert!(!p.skipped);
        assert_eq!(p.completed_at, Some(now));

        let mut p = Progress::default();
        p.complete(now);
        p.skip();
        assert!(p.skipped);
        assert_eq!(p.completed_at, None);
        assert!(p.is_finished());
    }

    #[test]
    fn complete_without_start_is_allowed() {
        let mut p = Progress::default();
        p.complete(Utc::now());
        assert_eq!(p.started_at, None);
        assert_eq!(p.state(), ProgressState::Completed);
    }

    #[test]
    fn rating_bounds() {
        assert!(check_rating("perceived_intensity", Some(1)).is_ok());
        assert!(check_rating("perceived_intensity", Some(10)).is_ok());
        assert!(check_rating("perceived_intensity", None).is_ok());
        assert!(check_rating("perceived_intensity", Some(0)).is_err());
        assert!(check_rating("perceived_intensity", Some(11)).is_err());
    }

    #[test]
    fn set_patch_leaves_absent_fields_alone() {
        let now = Utc::now();
        let mut set = SessionSet {
            id: "s".to_string(),
            session_exercise_id: "e".to_string(),
            set_number: 1,
            completed: false,
            actual_reps: Some(8),
            actual_weight: Some(WeightField::from_input(Decimal::from(100), "kg")),
            actual_duration_seconds: None,
            rpe_value_id: Some("rpe-8".to_string()),
            was_failure: false,
            notes: Some("felt heavy".to_string()),
            created_at: now,
            updated_at: now,
        };
        set.apply(SessionSetPatch {
            completed: Some(true),
            actual_reps: Some(Some(10)),
            rpe_value_id: Some(None),
            ..Default::default()
        })
        .unwrap();

        assert!(set.completed);
        assert_eq!(set.actual_reps, Some(10));
        assert_eq!(set.rpe_value_id, None);
        assert_eq!(set.notes.as_deref(), Some("felt heavy"));
        assert!(set.actual_weight.is_some());
    }

    #[test]
    fn set_patch_distinguishes_null_from_absent() {
        let patch: SessionSetPatch = serde_json::from_str(r#"{"actual_weight": null}"#).unwrap();
        assert_eq!(patch.actual_weight, Some(None));
        assert_eq!(patch.notes, None);
    }

    #[test]
    fn session_patch_rejects_end_before_start() {
        let now = Utc::now();
        let mut session = WorkoutSession {
            id: "s".to_string(),
            user_id: "u".to_string(),
            created_by_id: "u".to_string(),
            workout_id: None,
            started_at: now,
            ended_at: None,
            duration_seconds: None,
            perceived_intensity: None,
            completed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let err = session
            .apply(SessionPatch {
                ended_at: Some(Some(now - Duration::minutes(1))),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "ended_at", .. }));
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::error::AppError;
use crate::models::nullable;
use crate::models::weight::{WeightField, WeightInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Straight,
    Superset,
    Circuit,
    GiantSet,
    DropSet,
    Pyramid,
    RestPause,
    Amrap,
    Emom,
    Hiit,
    Warmup,
    Cooldown,
}

impl GroupType {
    pub const ALL: [GroupType; 12] = [
        Self::Straight,
        Self::Superset,
        Self::Circuit,
        Self::GiantSet,
        Self::DropSet,
        Self::Pyramid,
        Self::RestPause,
        Self::Amrap,
        Self::Emom,
        Self::Hiit,
        Self::Warmup,
        Self::Cooldown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::Superset => "superset",
            Self::Circuit => "circuit",
            Self::GiantSet => "giant_set",
            Self::DropSet => "drop_set",
            Self::Pyramid => "pyramid",
            Self::RestPause => "rest_pause",
            Self::Amrap => "amrap",
            Self::Emom => "emom",
            Self::Hiit => "hiit",
            Self::Warmup => "warmup",
            Self::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::InvalidType(s.to_string()))
    }
}

/// Group-level parameters, repeated on every row of the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSettings {
    pub group_type: GroupType,
    pub group_rounds: Option<i64>,
    pub rest_between_sets_seconds: Option<i64>,
    pub group_name: Option<String>,
    pub group_notes: Option<String>,
}

/// One prescribed exercise; the persisted unit of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionExercise {
    pub id: String,
    pub workout_id: String,
    pub group_id: String,
    pub group_order: i64,
    pub group: GroupSettings,
    pub exercise_id: String,
    pub exercise_order: i64,
    pub sets: Option<i64>,
    pub reps: Option<i64>,
    pub hold_seconds: Option<i64>,
    pub target_weight: Option<WeightField>,
    pub rpe_target_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for PrescriptionExercise {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_type: String = row.try_get("group_type")?;
        let group_type = raw_type.parse::<GroupType>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "group_type".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            workout_id: row.try_get("workout_id")?,
            group_id: row.try_get("group_id")?,
            group_order: row.try_get("group_order")?,
            group: GroupSettings {
                group_type,
                group_rounds: row.try_get("group_rounds")?,
                rest_between_sets_seconds: row.try_get("rest_between_sets_seconds")?,
                group_name: row.try_get("group_name")?,
                group_notes: row.try_get("group_notes")?,
            },
            exercise_id: row.try_get("exercise_id")?,
            exercise_order: row.try_get("exercise_order")?,
            sets: row.try_get("sets")?,
            reps: row.try_get("reps")?,
            hold_seconds: row.try_get("hold_seconds")?,
            target_weight: WeightField::from_row(row, "target_weight")?,
            rpe_target_id: row.try_get("rpe_target_id")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A group assembled from its rows, exercises sorted by `exercise_order`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionGroup {
    pub group_id: String,
    pub workout_id: String,
    pub group_order: i64,
    pub settings: GroupSettings,
    pub exercises: Vec<PrescriptionExercise>,
}

impl PrescriptionGroup {
    /// Folds rows into groups. Rows must already be sorted by
    /// `(group_order, group_id, exercise_order)`; the first row of each group
    /// supplies the group-level fields.
    pub fn from_rows(rows: Vec<PrescriptionExercise>) -> Vec<Self> {
        let mut groups: Vec<Self> = Vec::new();
        for row in rows {
            match groups.last_mut() {
                Some(group) if group.group_id == row.group_id => group.exercises.push(row),
                _ => groups.push(Self {
                    group_id: row.group_id.clone(),
                    workout_id: row.workout_id.clone(),
                    group_order: row.group_order,
                    settings: row.group.clone(),
                    exercises: vec![row],
                }),
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPrescriptionExercise {
    pub exercise_id: String,
    pub exercise_order: i64,
    pub sets: Option<i64>,
    pub reps: Option<i64>,
    pub hold_seconds: Option<i64>,
    pub target_weight: Option<WeightInput>,
    pub rpe_target_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescriptionGroup {
    pub workout_id: String,
    pub group_type: String,
    pub group_order: i64,
    pub group_rounds: Option<i64>,
    pub rest_between_sets_seconds: Option<i64>,
    pub group_name: Option<String>,
    pub group_notes: Option<String>,
    pub exercises: Vec<NewPrescriptionExercise>,
}

/// Partial edit of the group-level fields. Outer `None` leaves a field
/// untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPatch {
    pub group_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub group_rounds: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rest_between_sets_seconds: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group_notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionPatch {
    pub exercise_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub sets: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reps: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub hold_seconds: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub target_weight: Option<Option<WeightInput>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rpe_target_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

pub(crate) fn check_order(field: &'static str, value: i64) -> Result<(), AppError> {
    if value < 1 {
        return Err(AppError::InvalidOrder { field, value });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: Option<i64>) -> Result<(), AppError> {
    match value {
        Some(v) if v < 1 => Err(AppError::InvalidField {
            field,
            reason: format!("must be at least 1, got {v}"),
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

/// Exactly one of reps or hold time.
fn check_style(
    exercise_id: &str,
    reps: Option<i64>,
    hold_seconds: Option<i64>,
) -> Result<(), AppError> {
    if reps.is_some() == hold_seconds.is_some() {
        return Err(AppError::AmbiguousPrescription {
            exercise_id: exercise_id.to_string(),
        });
    }
    check_positive("reps", reps)?;
    check_positive("hold_seconds", hold_seconds)
}

impl NewPrescriptionExercise {
    /// Validates and canonicalizes the target weight.
    pub fn validate(&self) -> Result<Option<WeightField>, AppError> {
        check_style(&self.exercise_id, self.reps, self.hold_seconds)?;
        check_order("exercise_order", self.exercise_order)?;
        check_positive("sets", self.sets)?;
        self.target_weight
            .as_ref()
            .map(|w| WeightField::from_weight_input(w, "target_weight"))
            .transpose()
    }
}

impl NewPrescriptionGroup {
    pub fn validate(&self) -> Result<GroupSettings, AppError> {
        let group_type = self.group_type.parse::<GroupType>()?;
        check_order("group_order", self.group_order)?;
        if self.exercises.is_empty() {
            return Err(AppError::EmptyGroup);
        }
        check_positive("group_rounds", self.group_rounds)?;
        check_non_negative("rest_between_sets_seconds", self.rest_between_sets_seconds)?;

        Ok(GroupSettings {
            group_type,
            group_rounds: self.group_rounds,
            rest_between_sets_seconds: self.rest_between_sets_seconds,
            group_name: self.group_name.clone(),
            group_notes: self.group_notes.clone(),
        })
    }
}

impl GroupSettings {
    pub fn apply(&mut self, patch: GroupPatch) -> Result<(), AppError> {
        if let Some(raw) = patch.group_type {
            self.group_type = raw.parse()?;
        }
        if let Some(rounds) = patch.group_rounds {
            check_positive("group_rounds", rounds)?;
            self.group_rounds = rounds;
        }
        if let Some(rest) = patch.rest_between_sets_seconds {
            check_non_negative("rest_between_sets_seconds", rest)?;
            self.rest_between_sets_seconds = rest;
        }
        if let Some(name) = patch.group_name {
            self.group_name = name;
        }
        if let Some(notes) = patch.group_notes {
            self.group_notes = notes;
        }
        Ok(())
    }
}

impl PrescriptionExercise {
    /// Merges `patch` and re-checks the reps/hold exclusivity on the result.
    pub fn apply(&mut self, patch: PrescriptionPatch) -> Result<(), AppError> {
        if let Some(exercise_id) = patch.exercise_id {
            self.exercise_id = exercise_id;
        }
        if let Some(sets) = patch.sets {
            check_positive("sets", sets)?;
            self.sets = sets;
        }
        if let Some(reps) = patch.reps {
            self.reps = reps;
        }
        if let Some(hold) = patch.hold_seconds {
            self.hold_seconds = hold;
        }
        check_style(&self.exercise_id, self.reps, self.hold_seconds)?;

        if let Some(weight) = patch.target_weight {
            self.target_weight = weight
                .as_ref()
                .map(|w| WeightField::from_weight_input(w, "target_weight"))
                .transpose()?;
        }
        if let Some(rpe) = patch.rpe_target_id {
            self.rpe_target_id = rpe;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

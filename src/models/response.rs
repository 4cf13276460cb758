use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::prescription::GroupType;
use crate::models::weight::WeightOutput;
use crate::units::WeightUnit;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetResponse {
    pub id: String,
    pub set_number: i64,
    pub completed: bool,
    pub actual_reps: Option<i64>,
    pub actual_weight: Option<WeightOutput>,
    pub actual_duration_seconds: Option<i64>,
    pub rpe_value_id: Option<String>,
    pub was_failure: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionResponse {
    pub id: String,
    pub exercise_id: String,
    pub exercise_order: i64,
    pub sets: Option<i64>,
    pub reps: Option<i64>,
    pub hold_seconds: Option<i64>,
    pub target_weight: Option<WeightOutput>,
    pub rpe_target_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseResponse {
    pub id: String,
    pub prescription_id: Option<String>,
    pub exercise_id: String,
    pub exercise_order: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped: bool,
    pub notes: Option<String>,
    pub prescription: Option<PrescriptionResponse>,
    pub sets: Vec<SetResponse>,
}

/// A block with its group metadata resolved. The group fields are `None`
/// for blocks with no backing prescription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockResponse {
    pub id: String,
    pub group_id: Option<String>,
    pub block_order: i64,
    pub group_type: Option<GroupType>,
    pub group_name: Option<String>,
    pub group_rounds: Option<i64>,
    pub rest_between_sets_seconds: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped: bool,
    pub perceived_exertion: Option<i64>,
    pub exercises: Vec<ExerciseResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub user_id: String,
    pub created_by_id: String,
    pub workout_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub perceived_intensity: Option<i64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub weight_unit: WeightUnit,
    pub completed_blocks: usize,
    pub total_blocks: usize,
    pub blocks: Vec<BlockResponse>,
}

/// List-view projection: counts only, no nested sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    pub created_by_id: String,
    pub workout_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub perceived_intensity: Option<i64>,
    pub completed: bool,
    pub completed_blocks: usize,
    pub total_blocks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResponse {
    pub group_id: String,
    pub workout_id: String,
    pub group_type: GroupType,
    pub group_order: i64,
    pub group_rounds: Option<i64>,
    pub rest_between_sets_seconds: Option<i64>,
    pub group_name: Option<String>,
    pub group_notes: Option<String>,
    pub weight_unit: WeightUnit,
    pub exercises: Vec<PrescriptionResponse>,
}

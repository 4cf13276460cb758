//! Flattens session and prescription trees into caller-facing shapes,
//! projecting every weight into the caller's preferred unit.

use std::collections::HashMap;

use crate::models::prescription::{PrescriptionExercise, PrescriptionGroup};
use crate::models::response::{
    BlockResponse, ExerciseResponse, GroupResponse, PrescriptionResponse, SessionResponse,
    SessionSummary, SetResponse,
};
use crate::models::session::{
    BlockTree, ExerciseTree, SessionBlock, SessionSet, SessionTree, WorkoutSession,
};
use crate::models::weight;
use crate::units::WeightUnit;

/// Explicit `duration_seconds` wins; otherwise whole minutes between start
/// and end when the session has ended.
pub fn duration_minutes(session: &WorkoutSession) -> Option<i64> {
    if let Some(seconds) = session.duration_seconds {
        return Some(seconds / 60);
    }
    session
        .ended_at
        .map(|ended| (ended - session.started_at).num_minutes())
}

/// `(completed_or_skipped, total)`.
pub fn block_counts<'a>(blocks: impl IntoIterator<Item = &'a SessionBlock>) -> (usize, usize) {
    blocks.into_iter().fold((0, 0), |(done, total), block| {
        let done = if block.progress.is_finished() { done + 1 } else { done };
        (done, total + 1)
    })
}

pub fn prescription_response(row: &PrescriptionExercise, unit: WeightUnit) -> PrescriptionResponse {
    PrescriptionResponse {
        id: row.id.clone(),
        exercise_id: row.exercise_id.clone(),
        exercise_order: row.exercise_order,
        sets: row.sets,
        reps: row.reps,
        hold_seconds: row.hold_seconds,
        target_weight: weight::project(row.target_weight.as_ref(), unit),
        rpe_target_id: row.rpe_target_id.clone(),
        notes: row.notes.clone(),
    }
}

pub fn build_group_response(group: &PrescriptionGroup, unit: WeightUnit) -> GroupResponse {
    GroupResponse {
        group_id: group.group_id.clone(),
        workout_id: group.workout_id.clone(),
        group_type: group.settings.group_type,
        group_order: group.group_order,
        group_rounds: group.settings.group_rounds,
        rest_between_sets_seconds: group.settings.rest_between_sets_seconds,
        group_name: group.settings.group_name.clone(),
        group_notes: group.settings.group_notes.clone(),
        weight_unit: unit,
        exercises: group
            .exercises
            .iter()
            .map(|row| prescription_response(row, unit))
            .collect(),
    }
}

fn set_response(set: &SessionSet, unit: WeightUnit) -> SetResponse {
    SetResponse {
        id: set.id.clone(),
        set_number: set.set_number,
        completed: set.completed,
        actual_reps: set.actual_reps,
        actual_weight: weight::project(set.actual_weight.as_ref(), unit),
        actual_duration_seconds: set.actual_duration_seconds,
        rpe_value_id: set.rpe_value_id.clone(),
        was_failure: set.was_failure,
        notes: set.notes.clone(),
    }
}

fn linked_prescription<'a>(
    exercise: &ExerciseTree,
    prescriptions: &'a HashMap<String, PrescriptionExercise>,
) -> Option<&'a PrescriptionExercise> {
    exercise
        .exercise
        .prescription_id
        .as_ref()
        .and_then(|id| prescriptions.get(id))
}

fn exercise_response(
    tree: &ExerciseTree,
    prescriptions: &HashMap<String, PrescriptionExercise>,
    unit: WeightUnit,
) -> ExerciseResponse {
    let exercise = &tree.exercise;
    ExerciseResponse {
        id: exercise.id.clone(),
        prescription_id: exercise.prescription_id.clone(),
        exercise_id: exercise.exercise_id.clone(),
        exercise_order: exercise.exercise_order,
        started_at: exercise.progress.started_at,
        completed_at: exercise.progress.completed_at,
        skipped: exercise.progress.skipped,
        notes: exercise.notes.clone(),
        prescription: linked_prescription(tree, prescriptions)
            .map(|row| prescription_response(row, unit)),
        sets: tree.sets.iter().map(|set| set_response(set, unit)).collect(),
    }
}

fn block_response(
    tree: &BlockTree,
    prescriptions: &HashMap<String, PrescriptionExercise>,
    unit: WeightUnit,
) -> BlockResponse {
    // Group metadata lives on prescription rows; the first linked one speaks
    // for the whole block.
    let group = tree
        .exercises
        .iter()
        .find_map(|exercise| linked_prescription(exercise, prescriptions))
        .map(|row| &row.group);

    let block = &tree.block;
    BlockResponse {
        id: block.id.clone(),
        group_id: block.group_id.clone(),
        block_order: block.block_order,
        group_type: group.map(|g| g.group_type),
        group_name: group.and_then(|g| g.group_name.clone()),
        group_rounds: group.and_then(|g| g.group_rounds),
        rest_between_sets_seconds: group.and_then(|g| g.rest_between_sets_seconds),
        started_at: block.progress.started_at,
        completed_at: block.progress.completed_at,
        skipped: block.progress.skipped,
        perceived_exertion: block.perceived_exertion,
        exercises: tree
            .exercises
            .iter()
            .map(|exercise| exercise_response(exercise, prescriptions, unit))
            .collect(),
    }
}

/// Builds the nested response. `prescriptions` holds whatever rows the
/// session's exercises link to, keyed by prescription id; missing entries
/// degrade to empty group metadata.
pub fn build_session_response(
    tree: &SessionTree,
    prescriptions: &HashMap<String, PrescriptionExercise>,
    unit: WeightUnit,
) -> SessionResponse {
    let session = &tree.session;
    let (completed_blocks, total_blocks) = block_counts(tree.blocks.iter().map(|b| &b.block));

    SessionResponse {
        id: session.id.clone(),
        user_id: session.user_id.clone(),
        created_by_id: session.created_by_id.clone(),
        workout_id: session.workout_id.clone(),
        started_at: session.started_at,
        ended_at: session.ended_at,
        duration_seconds: session.duration_seconds,
        duration_minutes: duration_minutes(session),
        perceived_intensity: session.perceived_intensity,
        completed: session.completed,
        notes: session.notes.clone(),
        weight_unit: unit,
        completed_blocks,
        total_blocks,
        blocks: tree
            .blocks
            .iter()
            .map(|block| block_response(block, prescriptions, unit))
            .collect(),
    }
}

pub fn build_session_summary(session: &WorkoutSession, blocks: &[SessionBlock]) -> SessionSummary {
    let (completed_blocks, total_blocks) = block_counts(blocks);
    SessionSummary {
        id: session.id.clone(),
        user_id: session.user_id.clone(),
        created_by_id: session.created_by_id.clone(),
        workout_id: session.workout_id.clone(),
        started_at: session.started_at,
        ended_at: session.ended_at,
        duration_minutes: duration_minutes(session),
        perceived_intensity: session.perceived_intensity,
        completed: session.completed,
        completed_blocks,
        total_blocks,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::prescription::{GroupSettings, GroupType};
    use crate::models::session::{Progress, SessionExercise};
    use crate::models::weight::WeightField;

    fn session() -> WorkoutSession {
        let now = Utc::now();
        WorkoutSession {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            created_by_id: "u1".to_string(),
            workout_id: None,
            started_at: now,
            ended_at: None,
            duration_seconds: None,
            perceived_intensity: None,
            completed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn block(id: &str, progress: Progress) -> SessionBlock {
        let now = Utc::now();
        SessionBlock {
            id: id.to_string(),
            session_id: "s1".to_string(),
            group_id: None,
            block_order: 1,
            progress,
            perceived_exertion: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn exercise(id: &str, prescription_id: Option<&str>) -> SessionExercise {
        let now = Utc::now();
        SessionExercise {
            id: id.to_string(),
            session_block_id: "b1".to_string(),
            prescription_id: prescription_id.map(str::to_string),
            exercise_id: "bench".to_string(),
            exercise_order: 1,
            progress: Progress::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn set(weight: Option<WeightField>) -> SessionSet {
        let now = Utc::now();
        SessionSet {
            id: "set1".to_string(),
            session_exercise_id: "e1".to_string(),
            set_number: 1,
            completed: true,
            actual_reps: Some(5),
            actual_weight: weight,
            actual_duration_seconds: None,
            rpe_value_id: None,
            was_failure: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn prescription(id: &str, name: &str) -> PrescriptionExercise {
        let now = Utc::now();
        PrescriptionExercise {
            id: id.to_string(),
            workout_id: "w1".to_string(),
            group_id: "g1".to_string(),
            group_order: 1,
            group: GroupSettings {
                group_type: GroupType::Superset,
                group_rounds: Some(3),
                rest_between_sets_seconds: Some(90),
                group_name: Some(name.to_string()),
                group_notes: None,
            },
            exercise_id: "bench".to_string(),
            exercise_order: 1,
            sets: Some(3),
            reps: Some(10),
            hold_seconds: None,
            target_weight: Some(WeightField::from_input(Decimal::from(100), "kg")),
            rpe_target_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn duration_prefers_explicit_override() {
        let mut s = session();
        assert_eq!(duration_minutes(&s), None);

        s.ended_at = Some(s.started_at + Duration::seconds(45 * 60 + 59));
        assert_eq!(duration_minutes(&s), Some(45));

        s.duration_seconds = Some(3600);
        assert_eq!(duration_minutes(&s), Some(60));
    }

    #[test]
    fn counts_completed_and_skipped_blocks() {
        let now = Utc::now();
        let blocks = vec![
            block("a", Progress { completed_at: Some(now), ..Default::default() }),
            block("b", Progress { skipped: true, ..Default::default() }),
            block("c", Progress { started_at: Some(now), ..Default::default() }),
        ];
        let summary = build_session_summary(&session(), &blocks);
        assert_eq!((summary.completed_blocks, summary.total_blocks), (2, 3));
    }

    #[test]
    fn group_metadata_comes_from_first_linked_prescription() {
        let tree = SessionTree {
            session: session(),
            blocks: vec![BlockTree {
                block: block("b1", Progress::default()),
                exercises: vec![
                    ExerciseTree { exercise: exercise("e0", None), sets: vec![] },
                    ExerciseTree { exercise: exercise("e1", Some("gone")), sets: vec![] },
                    ExerciseTree { exercise: exercise("e2", Some("p2")), sets: vec![] },
                    ExerciseTree { exercise: exercise("e3", Some("p3")), sets: vec![] },
                ],
            }],
        };
        let prescriptions = HashMap::from([
            ("p2".to_string(), prescription("p2", "Push")),
            ("p3".to_string(), prescription("p3", "Other")),
        ]);

        let response = build_session_response(&tree, &prescriptions, WeightUnit::Lb);
        let b = &response.blocks[0];
        assert_eq!(b.group_name.as_deref(), Some("Push"));
        assert_eq!(b.group_type, Some(GroupType::Superset));
        assert_eq!(b.group_rounds, Some(3));
        assert!(b.exercises[1].prescription.is_none());

        let target = b.exercises[2].prescription.as_ref().and_then(|p| p.target_weight);
        assert_eq!(target.map(|w| w.value), Some("220.46".parse().unwrap()));
    }

    #[test]
    fn block_without_prescription_has_empty_metadata() {
        let tree = SessionTree {
            session: session(),
            blocks: vec![BlockTree {
                block: block("b1", Progress::default()),
                exercises: vec![ExerciseTree {
                    exercise: exercise("e1", None),
                    sets: vec![set(None)],
                }],
            }],
        };
        let response = build_session_response(&tree, &HashMap::new(), WeightUnit::Kg);
        let b = &response.blocks[0];
        assert_eq!(b.group_type, None);
        assert_eq!(b.group_name, None);
        assert_eq!(b.exercises[0].sets[0].actual_weight, None);
    }

    #[test]
    fn serializes_weight_as_number() {
        let tree = SessionTree {
            session: session(),
            blocks: vec![BlockTree {
                block: block("b1", Progress::default()),
                exercises: vec![ExerciseTree {
                    exercise: exercise("e1", None),
                    sets: vec![set(Some(WeightField::from_input(Decimal::from(135), "lb")))],
                }],
            }],
        };
        let response = build_session_response(&tree, &HashMap::new(), WeightUnit::Kg);
        let json = serde_json::to_value(&response).unwrap();
        let weight = &json["blocks"][0]["exercises"][0]["sets"][0]["actual_weight"];
        assert_eq!(weight["unit"], "kg");
        assert!((weight["value"].as_f64().unwrap() - 61.23).abs() < 1e-9);
    }
}

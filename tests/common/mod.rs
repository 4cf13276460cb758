#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use trainbook::config::Config;
use trainbook::db;
use trainbook::models::{NewPrescriptionExercise, NewPrescriptionGroup, WeightInput};
use trainbook::profile::FixedUnitPreference;
use trainbook::state::AppState;
use trainbook::WeightUnit;

pub async fn setup() -> AppState {
    let pool = db::connect(&Config::in_memory())
        .await
        .expect("Failed to create database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    AppState::new(pool, Arc::new(FixedUnitPreference(WeightUnit::Kg)))
}

pub fn dec(raw: &str) -> Decimal {
    raw.parse().expect("Invalid decimal literal")
}

pub fn weight(value: &str, unit: &str) -> WeightInput {
    WeightInput::new(dec(value), unit)
}

pub fn reps(exercise_id: &str, order: i64, reps: i64) -> NewPrescriptionExercise {
    NewPrescriptionExercise {
        exercise_id: exercise_id.to_string(),
        exercise_order: order,
        reps: Some(reps),
        ..Default::default()
    }
}

pub fn hold(exercise_id: &str, order: i64, seconds: i64) -> NewPrescriptionExercise {
    NewPrescriptionExercise {
        exercise_id: exercise_id.to_string(),
        exercise_order: order,
        hold_seconds: Some(seconds),
        ..Default::default()
    }
}

pub fn group(
    workout_id: &str,
    group_type: &str,
    group_order: i64,
    exercises: Vec<NewPrescriptionExercise>,
) -> NewPrescriptionGroup {
    NewPrescriptionGroup {
        workout_id: workout_id.to_string(),
        group_type: group_type.to_string(),
        group_order,
        group_rounds: None,
        rest_between_sets_seconds: None,
        group_name: None,
        group_notes: None,
        exercises,
    }
}

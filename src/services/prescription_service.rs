use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::prescriptions;
use crate::error::AppError;
use crate::models::ordering;
use crate::models::prescription::{
    GroupPatch, NewPrescriptionExercise, NewPrescriptionGroup, PrescriptionExercise,
    PrescriptionGroup, PrescriptionPatch,
};
use crate::models::response::GroupResponse;
use crate::services::response;
use crate::units::WeightUnit;

/// Defines and edits a workout's prescription groups.
pub struct PrescriptionService {
    db: SqlitePool,
}

impl PrescriptionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Validates the whole group before writing anything, then inserts all
    /// of its rows under one new `group_id`.
    pub async fn create_group(
        &self,
        req: NewPrescriptionGroup,
    ) -> Result<PrescriptionGroup, AppError> {
        let settings = req.validate()?;
        let weights = req
            .exercises
            .iter()
            .map(NewPrescriptionExercise::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let group_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut rows: Vec<PrescriptionExercise> = req
            .exercises
            .into_iter()
            .zip(weights)
            .map(|(exercise, target_weight)| PrescriptionExercise {
                id: Uuid::new_v4().to_string(),
                workout_id: req.workout_id.clone(),
                group_id: group_id.clone(),
                group_order: req.group_order,
                group: settings.clone(),
                exercise_id: exercise.exercise_id,
                exercise_order: exercise.exercise_order,
                sets: exercise.sets,
                reps: exercise.reps,
                hold_seconds: exercise.hold_seconds,
                target_weight,
                rpe_target_id: exercise.rpe_target_id,
                notes: exercise.notes,
                created_at: now,
                updated_at: now,
            })
            .collect();
        rows.sort_by_key(|row| row.exercise_order);

        prescriptions::insert_group(&self.db, &rows).await?;
        info!(
            "Created {} group {} in workout {} with {} exercises",
            settings.group_type,
            group_id,
            req.workout_id,
            rows.len()
        );

        Ok(PrescriptionGroup {
            group_id,
            workout_id: req.workout_id,
            group_order: req.group_order,
            settings,
            exercises: rows,
        })
    }

    pub async fn get_group(&self, group_id: &str) -> Result<PrescriptionGroup, AppError> {
        let rows = prescriptions::fetch_group(&self.db, group_id).await?;
        PrescriptionGroup::from_rows(rows)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("group", group_id))
    }

    /// Groups of a workout, in `group_order`.
    pub async fn list_groups(&self, workout_id: &str) -> Result<Vec<PrescriptionGroup>, AppError> {
        let rows = prescriptions::fetch_workout(&self.db, workout_id).await?;
        Ok(PrescriptionGroup::from_rows(rows))
    }

    pub async fn group_response(
        &self,
        group_id: &str,
        unit: WeightUnit,
    ) -> Result<GroupResponse, AppError> {
        let group = self.get_group(group_id).await?;
        Ok(response::build_group_response(&group, unit))
    }

    /// Sets each listed group's `group_order` to its 1-based position in
    /// `ordered_group_ids`. Groups left out keep their current order.
    pub async fn reorder_groups(
        &self,
        workout_id: &str,
        ordered_group_ids: &[String],
    ) -> Result<(), AppError> {
        let known: HashSet<String> = prescriptions::fetch_group_ids(&self.db, workout_id)
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        for group_id in ordered_group_ids {
            if !known.contains(group_id) {
                return Err(AppError::UnknownGroup {
                    group_id: group_id.clone(),
                    workout_id: workout_id.to_string(),
                });
            }
            if !seen.insert(group_id) {
                return Err(AppError::InvalidField {
                    field: "ordered_group_ids",
                    reason: format!("group {group_id} is listed more than once"),
                });
            }
        }

        let orders: Vec<(String, i64)> = ordered_group_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index as i64 + 1))
            .collect();

        prescriptions::set_group_orders(&self.db, &orders, Utc::now()).await?;
        info!("Reordered {} groups in workout {}", orders.len(), workout_id);
        Ok(())
    }

    /// Read-only check that group orders are `1..N` across the workout and
    /// exercise orders are `1..N` within every group.
    pub async fn validate_order_continuity(&self, workout_id: &str) -> Result<(), AppError> {
        let rows = prescriptions::fetch_order_rows(&self.db, workout_id).await?;
        if let Err(e) = ordering::check_workout_rows(workout_id, &rows) {
            warn!("Order continuity check failed for workout {}: {}", workout_id, e);
            return Err(e.into());
        }
        debug!("Order continuity ok for workout {} ({} rows)", workout_id, rows.len());
        Ok(())
    }

    /// Appends an exercise after the group's current last one. The supplied
    /// `exercise_order` is ignored.
    pub async fn add_exercise_to_group(
        &self,
        group_id: &str,
        mut exercise: NewPrescriptionExercise,
    ) -> Result<PrescriptionExercise, AppError> {
        let group = self.get_group(group_id).await?;

        let next_order = prescriptions::max_exercise_order(&self.db, group_id)
            .await?
            .unwrap_or(0)
            + 1;
        exercise.exercise_order = next_order;
        let target_weight = exercise.validate()?;

        let now = Utc::now();
        let row = PrescriptionExercise {
            id: Uuid::new_v4().to_string(),
            workout_id: group.workout_id,
            group_id: group.group_id,
            group_order: group.group_order,
            group: group.settings,
            exercise_id: exercise.exercise_id,
            exercise_order: next_order,
            sets: exercise.sets,
            reps: exercise.reps,
            hold_seconds: exercise.hold_seconds,
            target_weight,
            rpe_target_id: exercise.rpe_target_id,
            notes: exercise.notes,
            created_at: now,
            updated_at: now,
        };

        prescriptions::insert_prescription(&self.db, &row).await?;
        debug!(
            "Added exercise {} to group {} at position {}",
            row.exercise_id, group_id, next_order
        );
        Ok(row)
    }

    /// Applies `patch` to every row of the group.
    pub async fn update_group(
        &self,
        group_id: &str,
        patch: GroupPatch,
    ) -> Result<PrescriptionGroup, AppError> {
        let mut group = self.get_group(group_id).await?;
        group.settings.apply(patch)?;

        let now = Utc::now();
        prescriptions::update_group_settings(&self.db, group_id, &group.settings, now).await?;
        for row in &mut group.exercises {
            row.group = group.settings.clone();
            row.updated_at = now;
        }
        Ok(group)
    }

    pub async fn update_exercise(
        &self,
        prescription_id: &str,
        patch: PrescriptionPatch,
    ) -> Result<PrescriptionExercise, AppError> {
        let mut row = prescriptions::find_prescription_by_id(&self.db, prescription_id)
            .await?
            .ok_or_else(|| AppError::not_found("prescription", prescription_id))?;

        row.apply(patch)?;
        row.updated_at = Utc::now();
        prescriptions::update_prescription(&self.db, &row).await?;
        Ok(row)
    }

    /// Removes one exercise and closes the gap in its group's order. When it
    /// was the last exercise, the group goes with it.
    pub async fn remove_exercise(&self, prescription_id: &str) -> Result<(), AppError> {
        let row = prescriptions::find_prescription_by_id(&self.db, prescription_id)
            .await?
            .ok_or_else(|| AppError::not_found("prescription", prescription_id))?;

        let now = Utc::now();
        let remaining = prescriptions::delete_prescription_and_renumber(
            &self.db,
            prescription_id,
            &row.group_id,
            now,
        )
        .await?;

        if remaining == 0 {
            // group vanished; renumber its siblings
            prescriptions::delete_group_and_close_gap(&self.db, &row.workout_id, &row.group_id, now)
                .await?;
            info!("Removed last exercise of group {}; group deleted", row.group_id);
        } else {
            debug!("Removed exercise {} from group {}", prescription_id, row.group_id);
        }
        Ok(())
    }

    /// Deletes the group's rows and renumbers the workout's other groups.
    pub async fn delete_group(&self, group_id: &str) -> Result<(), AppError> {
        let group = self.get_group(group_id).await?;
        let now = Utc::now();
        let deleted =
            prescriptions::delete_group_and_close_gap(&self.db, &group.workout_id, group_id, now)
                .await?;
        info!("Deleted group {} ({} rows) from workout {}", group_id, deleted, group.workout_id);
        Ok(())
    }
}

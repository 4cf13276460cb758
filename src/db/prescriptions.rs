use chrono::{DateTime, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use crate::models::ordering::OrderRow;
use crate::models::prescription::{GroupSettings, PrescriptionExercise};
use crate::models::weight::WeightField;

pub async fn insert_prescription<'e, E>(
    executor: E,
    row: &PrescriptionExercise,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (kg, original_value, original_unit) = WeightField::to_columns(row.target_weight.as_ref());

    sqlx::query(
        r#"
        INSERT INTO workout_prescriptions
            (id, workout_id, group_id, group_type, group_order, group_rounds,
            rest_between_sets_seconds, group_name, group_notes, exercise_id,
            exercise_order, sets, reps, hold_seconds, target_weight_kg,
            target_weight_original_value, target_weight_original_unit,
            rpe_target_id, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.workout_id)
    .bind(&row.group_id)
    .bind(row.group.group_type.as_str())
    .bind(row.group_order)
    .bind(row.group.group_rounds)
    .bind(row.group.rest_between_sets_seconds)
    .bind(&row.group.group_name)
    .bind(&row.group.group_notes)
    .bind(&row.exercise_id)
    .bind(row.exercise_order)
    .bind(row.sets)
    .bind(row.reps)
    .bind(row.hold_seconds)
    .bind(kg)
    .bind(original_value)
    .bind(original_unit)
    .bind(&row.rpe_target_id)
    .bind(&row.notes)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Inserts every row of a new group in one transaction.
pub async fn insert_group(
    db: &SqlitePool,
    rows: &[PrescriptionExercise],
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    for row in rows {
        insert_prescription(&mut *tx, row).await?;
    }
    tx.commit().await
}

pub async fn find_prescription_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<PrescriptionExercise>, sqlx::Error> {
    sqlx::query_as::<_, PrescriptionExercise>("SELECT * FROM workout_prescriptions WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_prescriptions_by_ids(
    db: &SqlitePool,
    ids: &[String],
) -> Result<Vec<PrescriptionExercise>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM workout_prescriptions WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    builder
        .build_query_as::<PrescriptionExercise>()
        .fetch_all(db)
        .await
}

pub async fn fetch_group(
    db: &SqlitePool,
    group_id: &str,
) -> Result<Vec<PrescriptionExercise>, sqlx::Error> {
    sqlx::query_as::<_, PrescriptionExercise>(
        "SELECT * FROM workout_prescriptions WHERE group_id = ? ORDER BY exercise_order, created_at",
    )
    .bind(group_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_workout(
    db: &SqlitePool,
    workout_id: &str,
) -> Result<Vec<PrescriptionExercise>, sqlx::Error> {
    sqlx::query_as::<_, PrescriptionExercise>(
        r#"
        SELECT * FROM workout_prescriptions
        WHERE workout_id = ?
        ORDER BY group_order, group_id, exercise_order, created_at
        "#,
    )
    .bind(workout_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_order_rows(
    db: &SqlitePool,
    workout_id: &str,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT group_id, group_order, exercise_order FROM workout_prescriptions WHERE workout_id = ?",
    )
    .bind(workout_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(group_id, group_order, exercise_order)| OrderRow {
            group_id,
            group_order,
            exercise_order,
        })
        .collect())
}

pub async fn fetch_group_ids(
    db: &SqlitePool,
    workout_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT group_id FROM workout_prescriptions
        WHERE workout_id = ?
        GROUP BY group_id
        ORDER BY MIN(group_order), group_id
        "#,
    )
    .bind(workout_id)
    .fetch_all(db)
    .await
}

pub async fn max_exercise_order(
    db: &SqlitePool,
    group_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(exercise_order) FROM workout_prescriptions WHERE group_id = ?")
        .bind(group_id)
        .fetch_one(db)
        .await
}

/// Writes `(group_id, group_order)` pairs in one transaction.
pub async fn set_group_orders(
    db: &SqlitePool,
    orders: &[(String, i64)],
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    for (group_id, order) in orders {
        sqlx::query("UPDATE workout_prescriptions SET group_order = ?, updated_at = ? WHERE group_id = ?")
            .bind(order)
            .bind(now)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

pub async fn update_group_settings(
    db: &SqlitePool,
    group_id: &str,
    settings: &GroupSettings,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE workout_prescriptions
        SET group_type = ?,
            group_rounds = ?,
            rest_between_sets_seconds = ?,
            group_name = ?,
            group_notes = ?,
            updated_at = ?
        WHERE group_id = ?
        "#,
    )
    .bind(settings.group_type.as_str())
    .bind(settings.group_rounds)
    .bind(settings.rest_between_sets_seconds)
    .bind(&settings.group_name)
    .bind(&settings.group_notes)
    .bind(now)
    .bind(group_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Persists the per-exercise columns of `row`; group columns are left alone.
pub async fn update_prescription(
    db: &SqlitePool,
    row: &PrescriptionExercise,
) -> Result<(), sqlx::Error> {
    let (kg, original_value, original_unit) = WeightField::to_columns(row.target_weight.as_ref());

    sqlx::query(
        r#"
        UPDATE workout_prescriptions
        SET exercise_id = ?,
            sets = ?,
            reps = ?,
            hold_seconds = ?,
            target_weight_kg = ?,
            target_weight_original_value = ?,
            target_weight_original_unit = ?,
            rpe_target_id = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&row.exercise_id)
    .bind(row.sets)
    .bind(row.reps)
    .bind(row.hold_seconds)
    .bind(kg)
    .bind(original_value)
    .bind(original_unit)
    .bind(&row.rpe_target_id)
    .bind(&row.notes)
    .bind(row.updated_at)
    .bind(&row.id)
    .execute(db)
    .await?;
    Ok(())
}

/// Deletes one prescription row and renumbers the rest of its group to
/// `1..N`, all in one transaction. Returns how many rows remain in the group.
pub async fn delete_prescription_and_renumber(
    db: &SqlitePool,
    id: &str,
    group_id: &str,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM workout_prescriptions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let remaining: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM workout_prescriptions WHERE group_id = ? ORDER BY exercise_order, created_at",
    )
    .bind(group_id)
    .fetch_all(&mut *tx)
    .await?;

    for (index, row_id) in remaining.iter().enumerate() {
        sqlx::query("UPDATE workout_prescriptions SET exercise_order = ?, updated_at = ? WHERE id = ?")
            .bind(index as i64 + 1)
            .bind(now)
            .bind(row_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(remaining.len())
}

/// Deletes every row of a group and renumbers the workout's remaining groups
/// to `1..N`. Returns the number of rows deleted.
pub async fn delete_group_and_close_gap(
    db: &SqlitePool,
    workout_id: &str,
    group_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM workout_prescriptions WHERE group_id = ?")
        .bind(group_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let remaining: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT group_id FROM workout_prescriptions
        WHERE workout_id = ?
        GROUP BY group_id
        ORDER BY MIN(group_order), group_id
        "#,
    )
    .bind(workout_id)
    .fetch_all(&mut *tx)
    .await?;

    for (index, remaining_id) in remaining.iter().enumerate() {
        sqlx::query("UPDATE workout_prescriptions SET group_order = ?, updated_at = ? WHERE group_id = ?")
            .bind(index as i64 + 1)
            .bind(now)
            .bind(remaining_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(deleted)
}

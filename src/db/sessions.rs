use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::session::{SessionBlock, SessionExercise, SessionSet, WorkoutSession};
use crate::models::weight::WeightField;

// Sessions

pub async fn insert_session<'e, E>(executor: E, session: &WorkoutSession) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO workout_sessions
            (id, user_id, created_by_id, workout_id, started_at, ended_at,
            duration_seconds, perceived_intensity, completed, notes,
            created_at, updated_at, deleted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.created_by_id)
    .bind(&session.workout_id)
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(session.duration_seconds)
    .bind(session.perceived_intensity)
    .bind(session.completed)
    .bind(&session.notes)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_session_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<WorkoutSession>, sqlx::Error> {
    sqlx::query_as::<_, WorkoutSession>(
        "SELECT * FROM workout_sessions WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_sessions_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<WorkoutSession>, sqlx::Error> {
    sqlx::query_as::<_, WorkoutSession>(
        r#"
        SELECT * FROM workout_sessions
        WHERE user_id = ? AND deleted_at IS NULL
        ORDER BY started_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn update_session(db: &SqlitePool, session: &WorkoutSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE workout_sessions
        SET ended_at = ?,
            duration_seconds = ?,
            perceived_intensity = ?,
            completed = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(session.ended_at)
    .bind(session.duration_seconds)
    .bind(session.perceived_intensity)
    .bind(session.completed)
    .bind(&session.notes)
    .bind(session.updated_at)
    .bind(&session.id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn soft_delete_session(
    db: &SqlitePool,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE workout_sessions SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

// Blocks

pub async fn insert_block<'e, E>(executor: E, block: &SessionBlock) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO session_blocks
            (id, session_id, group_id, block_order, started_at, completed_at,
            skipped, perceived_exertion, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&block.id)
    .bind(&block.session_id)
    .bind(&block.group_id)
    .bind(block.block_order)
    .bind(block.progress.started_at)
    .bind(block.progress.completed_at)
    .bind(block.progress.skipped)
    .bind(block.perceived_exertion)
    .bind(block.created_at)
    .bind(block.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Finds a block whose session has not been deleted.
pub async fn find_block_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<SessionBlock>, sqlx::Error> {
    sqlx::query_as::<_, SessionBlock>(
        r#"
        SELECT b.* FROM session_blocks b
        JOIN workout_sessions s ON s.id = b.session_id
        WHERE b.id = ? AND s.deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_blocks(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Vec<SessionBlock>, sqlx::Error> {
    sqlx::query_as::<_, SessionBlock>(
        "SELECT * FROM session_blocks WHERE session_id = ? ORDER BY block_order, created_at",
    )
    .bind(session_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_blocks_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<SessionBlock>, sqlx::Error> {
    sqlx::query_as::<_, SessionBlock>(
        r#"
        SELECT b.* FROM session_blocks b
        JOIN workout_sessions s ON s.id = b.session_id
        WHERE s.user_id = ? AND s.deleted_at IS NULL
        ORDER BY b.session_id, b.block_order
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn max_block_order(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(block_order) FROM session_blocks WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(db)
        .await
}

pub async fn update_block_progress(
    db: &SqlitePool,
    block: &SessionBlock,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE session_blocks
        SET started_at = ?,
            completed_at = ?,
            skipped = ?,
            perceived_exertion = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(block.progress.started_at)
    .bind(block.progress.completed_at)
    .bind(block.progress.skipped)
    .bind(block.perceived_exertion)
    .bind(block.updated_at)
    .bind(&block.id)
    .execute(db)
    .await?;
    Ok(())
}

// Exercises

pub async fn insert_exercise<'e, E>(
    executor: E,
    exercise: &SessionExercise,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO session_exercises
            (id, session_block_id, prescription_id, exercise_id, exercise_order,
            started_at, completed_at, skipped, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&exercise.id)
    .bind(&exercise.session_block_id)
    .bind(&exercise.prescription_id)
    .bind(&exercise.exercise_id)
    .bind(exercise.exercise_order)
    .bind(exercise.progress.started_at)
    .bind(exercise.progress.completed_at)
    .bind(exercise.progress.skipped)
    .bind(&exercise.notes)
    .bind(exercise.created_at)
    .bind(exercise.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_exercise_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<SessionExercise>, sqlx::Error> {
    sqlx::query_as::<_, SessionExercise>(
        r#"
        SELECT e.* FROM session_exercises e
        JOIN session_blocks b ON b.id = e.session_block_id
        JOIN workout_sessions s ON s.id = b.session_id
        WHERE e.id = ? AND s.deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_exercises_for_session(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Vec<SessionExercise>, sqlx::Error> {
    sqlx::query_as::<_, SessionExercise>(
        r#"
        SELECT e.* FROM session_exercises e
        JOIN session_blocks b ON b.id = e.session_block_id
        WHERE b.session_id = ?
        ORDER BY e.session_block_id, e.exercise_order, e.created_at
        "#,
    )
    .bind(session_id)
    .fetch_all(db)
    .await
}

pub async fn max_exercise_order(
    db: &SqlitePool,
    block_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(exercise_order) FROM session_exercises WHERE session_block_id = ?")
        .bind(block_id)
        .fetch_one(db)
        .await
}

pub async fn update_exercise_progress(
    db: &SqlitePool,
    exercise: &SessionExercise,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE session_exercises
        SET started_at = ?,
            completed_at = ?,
            skipped = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(exercise.progress.started_at)
    .bind(exercise.progress.completed_at)
    .bind(exercise.progress.skipped)
    .bind(&exercise.notes)
    .bind(exercise.updated_at)
    .bind(&exercise.id)
    .execute(db)
    .await?;
    Ok(())
}

// Sets

pub async fn insert_set(db: &SqlitePool, set: &SessionSet) -> Result<(), sqlx::Error> {
    let (kg, original_value, original_unit) = WeightField::to_columns(set.actual_weight.as_ref());

    sqlx::query(
        r#"
        INSERT INTO session_sets
            (id, session_exercise_id, set_number, completed, actual_reps,
            actual_weight_kg, actual_weight_original_value, actual_weight_original_unit,
            actual_duration_seconds, rpe_value_id, was_failure, notes,
            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&set.id)
    .bind(&set.session_exercise_id)
    .bind(set.set_number)
    .bind(set.completed)
    .bind(set.actual_reps)
    .bind(kg)
    .bind(original_value)
    .bind(original_unit)
    .bind(set.actual_duration_seconds)
    .bind(&set.rpe_value_id)
    .bind(set.was_failure)
    .bind(&set.notes)
    .bind(set.created_at)
    .bind(set.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_set_by_id(db: &SqlitePool, id: &str) -> Result<Option<SessionSet>, sqlx::Error> {
    sqlx::query_as::<_, SessionSet>(
        r#"
        SELECT st.* FROM session_sets st
        JOIN session_exercises e ON e.id = st.session_exercise_id
        JOIN session_blocks b ON b.id = e.session_block_id
        JOIN workout_sessions s ON s.id = b.session_id
        WHERE st.id = ? AND s.deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_sets_for_exercise(
    db: &SqlitePool,
    session_exercise_id: &str,
) -> Result<Vec<SessionSet>, sqlx::Error> {
    sqlx::query_as::<_, SessionSet>(
        "SELECT * FROM session_sets WHERE session_exercise_id = ? ORDER BY set_number, created_at",
    )
    .bind(session_exercise_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_sets_for_session(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Vec<SessionSet>, sqlx::Error> {
    sqlx::query_as::<_, SessionSet>(
        r#"
        SELECT st.* FROM session_sets st
        JOIN session_exercises e ON e.id = st.session_exercise_id
        JOIN session_blocks b ON b.id = e.session_block_id
        WHERE b.session_id = ?
        ORDER BY st.session_exercise_id, st.set_number, st.created_at
        "#,
    )
    .bind(session_id)
    .fetch_all(db)
    .await
}

pub async fn count_sets(db: &SqlitePool, session_exercise_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM session_sets WHERE session_exercise_id = ?")
        .bind(session_exercise_id)
        .fetch_one(db)
        .await
}

pub async fn update_set(db: &SqlitePool, set: &SessionSet) -> Result<(), sqlx::Error> {
    let (kg, original_value, original_unit) = WeightField::to_columns(set.actual_weight.as_ref());

    sqlx::query(
        r#"
        UPDATE session_sets
        SET completed = ?,
            actual_reps = ?,
            actual_weight_kg = ?,
            actual_weight_original_value = ?,
            actual_weight_original_unit = ?,
            actual_duration_seconds = ?,
            rpe_value_id = ?,
            was_failure = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(set.completed)
    .bind(set.actual_reps)
    .bind(kg)
    .bind(original_value)
    .bind(original_unit)
    .bind(set.actual_duration_seconds)
    .bind(&set.rpe_value_id)
    .bind(set.was_failure)
    .bind(&set.notes)
    .bind(set.updated_at)
    .bind(&set.id)
    .execute(db)
    .await?;
    Ok(())
}

/// Deletes a set and renumbers its siblings to `1..N` in one transaction.
/// Returns the number of sets left on the exercise.
pub async fn delete_set_and_renumber(
    db: &SqlitePool,
    set_id: &str,
    session_exercise_id: &str,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM session_sets WHERE id = ?")
        .bind(set_id)
        .execute(&mut *tx)
        .await?;

    let remaining: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM session_sets WHERE session_exercise_id = ? ORDER BY set_number, created_at",
    )
    .bind(session_exercise_id)
    .fetch_all(&mut *tx)
    .await?;

    for (index, id) in remaining.iter().enumerate() {
        sqlx::query("UPDATE session_sets SET set_number = ?, updated_at = ? WHERE id = ?")
            .bind(index as i64 + 1)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(remaining.len())
}

/// Writes a freshly mirrored session tree in one transaction.
pub async fn insert_session_tree(
    db: &SqlitePool,
    session: &WorkoutSession,
    blocks: &[SessionBlock],
    exercises: &[SessionExercise],
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    insert_session(&mut *tx, session).await?;
    for block in blocks {
        insert_block(&mut *tx, block).await?;
    }
    for exercise in exercises {
        insert_exercise(&mut *tx, exercise).await?;
    }
    tx.commit().await
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{prescriptions, sessions};
use crate::error::AppError;
use crate::models::prescription::PrescriptionGroup;
use crate::models::response::{SessionResponse, SessionSummary};
use crate::models::session::{
    BlockTree, ExerciseTree, NewSession, NewSessionExercise, NewSessionSet, Progress,
    SessionBlock, SessionExercise, SessionPatch, SessionSet, SessionSetPatch, SessionTree,
    WorkoutSession, check_rating,
};
use crate::profile::UnitPreferences;
use crate::services::response;
use crate::units::WeightUnit;

/// Records performed sessions: blocks, exercises and sets under a session.
///
/// Callers check that the acting user may touch a session before calling in;
/// nothing here looks at who is asking.
pub struct SessionService {
    db: SqlitePool,
}

impl SessionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn new_session_row(req: NewSession, now: DateTime<Utc>) -> WorkoutSession {
        WorkoutSession {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            created_by_id: req.created_by_id,
            workout_id: req.workout_id,
            started_at: req.started_at.unwrap_or(now),
            ended_at: None,
            duration_seconds: None,
            perceived_intensity: None,
            completed: false,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Starts a session. A `workout_id` is only recorded; mirroring the
    /// prescription into blocks is [`Self::instantiate_from_workout`]'s job.
    pub async fn start_session(&self, req: NewSession) -> Result<WorkoutSession, AppError> {
        let session = Self::new_session_row(req, Utc::now());
        sessions::insert_session(&self.db, &session).await?;
        info!(
            "Started session {} for user {} (logged by {}, workout {:?})",
            session.id, session.user_id, session.created_by_id, session.workout_id
        );
        Ok(session)
    }

    /// Starts a session and mirrors the workout's prescription: one block per
    /// group in group order, one session exercise per prescribed exercise.
    /// No sets are created.
    pub async fn instantiate_from_workout(
        &self,
        req: NewSession,
        workout_id: &str,
    ) -> Result<SessionTree, AppError> {
        let rows = prescriptions::fetch_workout(&self.db, workout_id).await?;
        let groups = PrescriptionGroup::from_rows(rows);
        if groups.is_empty() {
            return Err(AppError::not_found("workout prescription", workout_id));
        }

        let now = Utc::now();
        let session = Self::new_session_row(
            NewSession {
                workout_id: Some(workout_id.to_string()),
                ..req
            },
            now,
        );

        let mut blocks = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            let block = SessionBlock {
                id: Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                group_id: Some(group.group_id.clone()),
                block_order: index as i64 + 1,
                progress: Progress::default(),
                perceived_exertion: None,
                created_at: now,
                updated_at: now,
            };
            let exercises = group
                .exercises
                .iter()
                .enumerate()
                .map(|(position, row)| ExerciseTree {
                    exercise: SessionExercise {
                        id: Uuid::new_v4().to_string(),
                        session_block_id: block.id.clone(),
                        prescription_id: Some(row.id.clone()),
                        exercise_id: row.exercise_id.clone(),
                        exercise_order: position as i64 + 1,
                        progress: Progress::default(),
                        notes: None,
                        created_at: now,
                        updated_at: now,
                    },
                    sets: Vec::new(),
                })
                .collect();
            blocks.push(BlockTree { block, exercises });
        }

        let block_rows: Vec<SessionBlock> = blocks.iter().map(|b| b.block.clone()).collect();
        let exercise_rows: Vec<SessionExercise> = blocks
            .iter()
            .flat_map(|b| b.exercises.iter().map(|e| e.exercise.clone()))
            .collect();
        sessions::insert_session_tree(&self.db, &session, &block_rows, &exercise_rows).await?;

        info!(
            "Instantiated session {} from workout {}: {} blocks, {} exercises",
            session.id,
            workout_id,
            block_rows.len(),
            exercise_rows.len()
        );
        Ok(SessionTree { session, blocks })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<WorkoutSession, AppError> {
        sessions::find_session_by_id(&self.db, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("session", session_id))
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>, AppError> {
        Ok(sessions::fetch_sessions_for_user(&self.db, user_id).await?)
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<WorkoutSession, AppError> {
        let mut session = self.get_session(session_id).await?;
        session.apply(patch)?;
        session.updated_at = Utc::now();
        sessions::update_session(&self.db, &session).await?;
        Ok(session)
    }

    /// Marks the session ended (at `ended_at`, or now) and completed.
    pub async fn end_session(
        &self,
        session_id: &str,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<WorkoutSession, AppError> {
        let session = self
            .update_session(
                session_id,
                SessionPatch {
                    ended_at: Some(Some(ended_at.unwrap_or_else(Utc::now))),
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!("Ended session {}", session_id);
        Ok(session)
    }

    /// Soft delete; the session disappears from every read.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        if !sessions::soft_delete_session(&self.db, session_id, Utc::now()).await? {
            return Err(AppError::not_found("session", session_id));
        }
        info!("Deleted session {}", session_id);
        Ok(())
    }

    pub async fn get_session_tree(&self, session_id: &str) -> Result<SessionTree, AppError> {
        let session = self.get_session(session_id).await?;
        let blocks = sessions::fetch_blocks(&self.db, session_id).await?;
        let exercises = sessions::fetch_exercises_for_session(&self.db, session_id).await?;
        let sets = sessions::fetch_sets_for_session(&self.db, session_id).await?;

        let mut sets_by_exercise: HashMap<String, Vec<SessionSet>> = HashMap::new();
        for set in sets {
            sets_by_exercise
                .entry(set.session_exercise_id.clone())
                .or_default()
                .push(set);
        }

        let mut exercises_by_block: HashMap<String, Vec<ExerciseTree>> = HashMap::new();
        for exercise in exercises {
            let sets = sets_by_exercise.remove(&exercise.id).unwrap_or_default();
            exercises_by_block
                .entry(exercise.session_block_id.clone())
                .or_default()
                .push(ExerciseTree { exercise, sets });
        }

        let blocks = blocks
            .into_iter()
            .map(|block| BlockTree {
                exercises: exercises_by_block.remove(&block.id).unwrap_or_default(),
                block,
            })
            .collect();

        Ok(SessionTree { session, blocks })
    }

    // Blocks

    /// Appends a block; `group_id` is `None` for free-form logging. A given
    /// group must exist and, when the session follows a workout, belong to it.
    pub async fn add_block(
        &self,
        session_id: &str,
        group_id: Option<String>,
    ) -> Result<SessionBlock, AppError> {
        let session = self.get_session(session_id).await?;
        if let Some(group_id) = &group_id {
            self.check_group_link(&session, group_id).await?;
        }

        let next_order = sessions::max_block_order(&self.db, session_id).await?.unwrap_or(0) + 1;
        let now = Utc::now();
        let block = SessionBlock {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            group_id,
            block_order: next_order,
            progress: Progress::default(),
            perceived_exertion: None,
            created_at: now,
            updated_at: now,
        };
        sessions::insert_block(&self.db, &block).await?;
        debug!("Added block {} to session {} at position {}", block.id, session_id, next_order);
        Ok(block)
    }

    async fn check_group_link(
        &self,
        session: &WorkoutSession,
        group_id: &str,
    ) -> Result<(), AppError> {
        let rows = prescriptions::fetch_group(&self.db, group_id).await?;
        let row = rows.first().ok_or_else(|| AppError::not_found("group", group_id))?;
        match &session.workout_id {
            Some(workout_id) if *workout_id != row.workout_id => Err(AppError::UnknownGroup {
                group_id: group_id.to_string(),
                workout_id: workout_id.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn find_block(&self, block_id: &str) -> Result<SessionBlock, AppError> {
        sessions::find_block_by_id(&self.db, block_id)
            .await?
            .ok_or_else(|| AppError::not_found("block", block_id))
    }

    async fn transition_block<F>(
        &self,
        block_id: &str,
        transition: F,
    ) -> Result<SessionBlock, AppError>
    where
        F: FnOnce(&mut SessionBlock, DateTime<Utc>),
    {
        let mut block = self.find_block(block_id).await?;
        let now = Utc::now();
        transition(&mut block, now);
        block.updated_at = now;
        sessions::update_block_progress(&self.db, &block).await?;
        Ok(block)
    }

    pub async fn start_block(&self, block_id: &str) -> Result<SessionBlock, AppError> {
        self.transition_block(block_id, |block, now| block.progress.start(now))
            .await
    }

    /// Completes the block, clearing any skip. `perceived_exertion`, when
    /// given, must be on the 1–10 scale.
    pub async fn complete_block(
        &self,
        block_id: &str,
        perceived_exertion: Option<i64>,
    ) -> Result<SessionBlock, AppError> {
        check_rating("perceived_exertion", perceived_exertion)?;
        self.transition_block(block_id, |block, now| {
            block.progress.complete(now);
            if perceived_exertion.is_some() {
                block.perceived_exertion = perceived_exertion;
            }
        })
        .await
    }

    pub async fn skip_block(&self, block_id: &str) -> Result<SessionBlock, AppError> {
        self.transition_block(block_id, |block, _| block.progress.skip())
            .await
    }

    // Exercises

    pub async fn add_exercise(
        &self,
        block_id: &str,
        req: NewSessionExercise,
    ) -> Result<SessionExercise, AppError> {
        let block = self.find_block(block_id).await?;
        if let Some(prescription_id) = &req.prescription_id {
            let row = prescriptions::find_prescription_by_id(&self.db, prescription_id)
                .await?
                .ok_or_else(|| AppError::not_found("prescription", prescription_id.as_str()))?;
            let session = self.get_session(&block.session_id).await?;
            match &session.workout_id {
                Some(workout_id) if *workout_id != row.workout_id => {
                    return Err(AppError::UnknownGroup {
                        group_id: row.group_id,
                        workout_id: workout_id.clone(),
                    });
                }
                _ => {}
            }
            // a linked block only takes its own group's prescriptions
            if block.group_id.as_ref().is_some_and(|g| *g != row.group_id) {
                return Err(AppError::not_found("prescription", prescription_id.as_str()));
            }
        }

        let next_order = sessions::max_exercise_order(&self.db, block_id).await?.unwrap_or(0) + 1;
        let now = Utc::now();
        let exercise = SessionExercise {
            id: Uuid::new_v4().to_string(),
            session_block_id: block_id.to_string(),
            prescription_id: req.prescription_id,
            exercise_id: req.exercise_id,
            exercise_order: next_order,
            progress: Progress::default(),
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };
        sessions::insert_exercise(&self.db, &exercise).await?;
        debug!("Added exercise {} to block {}", exercise.exercise_id, block_id);
        Ok(exercise)
    }

    async fn find_exercise(&self, exercise_id: &str) -> Result<SessionExercise, AppError> {
        sessions::find_exercise_by_id(&self.db, exercise_id)
            .await?
            .ok_or_else(|| AppError::not_found("session exercise", exercise_id))
    }

    async fn transition_exercise<F>(
        &self,
        exercise_id: &str,
        transition: F,
    ) -> Result<SessionExercise, AppError>
    where
        F: FnOnce(&mut Progress, DateTime<Utc>),
    {
        let mut exercise = self.find_exercise(exercise_id).await?;
        let now = Utc::now();
        transition(&mut exercise.progress, now);
        exercise.updated_at = now;
        sessions::update_exercise_progress(&self.db, &exercise).await?;
        Ok(exercise)
    }

    pub async fn start_exercise(&self, exercise_id: &str) -> Result<SessionExercise, AppError> {
        self.transition_exercise(exercise_id, |progress, now| progress.start(now))
            .await
    }

    pub async fn complete_exercise(&self, exercise_id: &str) -> Result<SessionExercise, AppError> {
        self.transition_exercise(exercise_id, |progress, now| progress.complete(now))
            .await
    }

    pub async fn skip_exercise(&self, exercise_id: &str) -> Result<SessionExercise, AppError> {
        self.transition_exercise(exercise_id, |progress, _| progress.skip())
            .await
    }

    // Sets

    /// Adds a set numbered after the exercise's existing sets.
    pub async fn add_set(
        &self,
        session_exercise_id: &str,
        req: NewSessionSet,
    ) -> Result<SessionSet, AppError> {
        let actual_weight = req.validate()?;
        self.find_exercise(session_exercise_id).await?;

        let set_number = sessions::count_sets(&self.db, session_exercise_id).await? + 1;
        let now = Utc::now();
        let set = SessionSet {
            id: Uuid::new_v4().to_string(),
            session_exercise_id: session_exercise_id.to_string(),
            set_number,
            completed: req.completed,
            actual_reps: req.actual_reps,
            actual_weight,
            actual_duration_seconds: req.actual_duration_seconds,
            rpe_value_id: req.rpe_value_id,
            was_failure: req.was_failure,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };
        sessions::insert_set(&self.db, &set).await?;
        debug!("Added set {} to session exercise {}", set_number, session_exercise_id);
        Ok(set)
    }

    pub async fn list_sets(&self, session_exercise_id: &str) -> Result<Vec<SessionSet>, AppError> {
        self.find_exercise(session_exercise_id).await?;
        Ok(sessions::fetch_sets_for_exercise(&self.db, session_exercise_id).await?)
    }

    async fn find_set(&self, set_id: &str) -> Result<SessionSet, AppError> {
        sessions::find_set_by_id(&self.db, set_id)
            .await?
            .ok_or_else(|| AppError::not_found("set", set_id))
    }

    /// Overwrites only the fields present in `patch`.
    pub async fn update_set(
        &self,
        set_id: &str,
        patch: SessionSetPatch,
    ) -> Result<SessionSet, AppError> {
        let mut set = self.find_set(set_id).await?;
        set.apply(patch)?;
        set.updated_at = Utc::now();
        sessions::update_set(&self.db, &set).await?;
        Ok(set)
    }

    /// Deletes a set and renumbers the exercise's remaining sets to `1..N`.
    pub async fn delete_set(&self, set_id: &str) -> Result<(), AppError> {
        let set = self.find_set(set_id).await?;
        let now = Utc::now();
        let remaining =
            sessions::delete_set_and_renumber(&self.db, set_id, &set.session_exercise_id, now)
                .await?;
        debug!(
            "Deleted set {} from session exercise {}; renumbered {} sets",
            set_id, set.session_exercise_id, remaining
        );
        Ok(())
    }

    // Responses

    pub async fn session_response(
        &self,
        session_id: &str,
        unit: WeightUnit,
    ) -> Result<SessionResponse, AppError> {
        let tree = self.get_session_tree(session_id).await?;

        let mut prescription_ids: Vec<String> = tree
            .blocks
            .iter()
            .flat_map(|b| b.exercises.iter())
            .filter_map(|e| e.exercise.prescription_id.clone())
            .collect();
        prescription_ids.sort();
        prescription_ids.dedup();

        let linked: HashMap<_, _> =
            prescriptions::fetch_prescriptions_by_ids(&self.db, &prescription_ids)
                .await?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        Ok(response::build_session_response(&tree, &linked, unit))
    }

    /// Response in the unit `viewer_id` prefers.
    pub async fn session_response_for(
        &self,
        session_id: &str,
        viewer_id: &str,
        preferences: &dyn UnitPreferences,
    ) -> Result<SessionResponse, AppError> {
        let unit = preferences.weight_unit(viewer_id).await?;
        self.session_response(session_id, unit).await
    }

    pub async fn list_session_summaries(
        &self,
        user_id: &str,
    ) -> Result<Vec<SessionSummary>, AppError> {
        let rows = sessions::fetch_sessions_for_user(&self.db, user_id).await?;

        let mut blocks_by_session: HashMap<String, Vec<SessionBlock>> = HashMap::new();
        for block in sessions::fetch_blocks_for_user(&self.db, user_id).await? {
            blocks_by_session
                .entry(block.session_id.clone())
                .or_default()
                .push(block);
        }

        Ok(rows
            .iter()
            .map(|session| {
                let blocks = blocks_by_session
                    .get(&session.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                response::build_session_summary(session, blocks)
            })
            .collect())
    }
}

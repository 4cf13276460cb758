use std::sync::Arc;

use sqlx::SqlitePool;

use crate::profile::UnitPreferences;
use crate::services::{PrescriptionService, SessionService};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub preferences: Arc<dyn UnitPreferences>,
}

impl AppState {
    pub fn new(db: SqlitePool, preferences: Arc<dyn UnitPreferences>) -> Self {
        Self { db, preferences }
    }

    pub fn prescriptions(&self) -> PrescriptionService {
        PrescriptionService::new(self.db.clone())
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.db.clone())
    }
}

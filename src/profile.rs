use async_trait::async_trait;

use crate::error::AppError;
use crate::units::WeightUnit;

/// Resolves a user's display unit. Backed by the user-profile store in
/// production.
#[async_trait]
pub trait UnitPreferences: Send + Sync {
    async fn weight_unit(&self, user_id: &str) -> Result<WeightUnit, AppError>;
}

/// Same unit for everyone.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedUnitPreference(pub WeightUnit);

#[async_trait]
impl UnitPreferences for FixedUnitPreference {
    async fn weight_unit(&self, _user_id: &str) -> Result<WeightUnit, AppError> {
        Ok(self.0)
    }
}

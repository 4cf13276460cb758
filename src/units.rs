use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Kilograms per pound, exact by definition.
pub const KG_PER_LB: Decimal = Decimal::from_parts(45_359_237, 0, 0, false, 8);

/// Digits kept after the decimal point on every converted value.
pub const WEIGHT_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    /// Lenient parse: `lb`/`lbs` (any case) are pounds, everything else,
    /// including the empty string, is kilograms.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lb" | "lbs" => Self::Lb,
            _ => Self::Kg,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Pounds per kilogram, derived from [`KG_PER_LB`] so both directions share
/// one source constant.
pub fn lb_per_kg() -> Decimal {
    Decimal::ONE / KG_PER_LB
}

pub fn to_kg(value: Decimal, unit: WeightUnit) -> Decimal {
    match unit {
        WeightUnit::Kg => round(value),
        WeightUnit::Lb => round(value.saturating_mul(KG_PER_LB)),
    }
}

pub fn from_kg(kg: Decimal, unit: WeightUnit) -> Decimal {
    match unit {
        WeightUnit::Kg => round(kg),
        WeightUnit::Lb => round(kg.saturating_mul(lb_per_kg())),
    }
}

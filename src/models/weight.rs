use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::error::AppError;
use crate::units::{self, WeightUnit};

/// Heaviest weight accepted on any write path, in kilograms.
pub const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// A weight as the caller typed it, before canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightInput {
    pub value: Decimal,
    #[serde(default)]
    pub unit: String,
}

impl WeightInput {
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Stored weight: the canonical kilogram value plus the original pair the
/// caller supplied. Not serialized; callers see [`WeightOutput`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightField {
    canonical_kg: Decimal,
    original_value: Option<Decimal>,
    original_unit: Option<WeightUnit>,
}

/// A weight projected into one display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeightOutput {
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub unit: WeightUnit,
}

impl WeightField {
    pub fn from_input(value: Decimal, unit: &str) -> Self {
        let unit = WeightUnit::parse(unit);
        Self {
            canonical_kg: units::to_kg(value, unit),
            original_value: Some(value),
            original_unit: Some(unit),
        }
    }

    /// Validating constructor used by every write path. Accepts weights from
    /// zero up to [`MAX_WEIGHT_KG`] once converted.
    pub fn from_weight_input(input: &WeightInput, field: &'static str) -> Result<Self, AppError> {
        if input.value.is_sign_negative() && !input.value.is_zero() {
            return Err(AppError::InvalidField {
                field,
                reason: format!("weight must not be negative, got {}", input.value),
            });
        }
        let weight = Self::from_input(input.value, &input.unit);
        if weight.canonical_kg > MAX_WEIGHT_KG {
            return Err(AppError::InvalidField {
                field,
                reason: format!(
                    "weight must not exceed {MAX_WEIGHT_KG} kg, got {} {}",
                    input.value,
                    WeightUnit::parse(&input.unit)
                ),
            });
        }
        Ok(weight)
    }

    pub fn canonical_kg(&self) -> Decimal {
        self.canonical_kg
    }

    pub fn original(&self) -> Option<WeightOutput> {
        match (self.original_value, self.original_unit) {
            (Some(value), Some(unit)) => Some(WeightOutput { value, unit }),
            _ => None,
        }
    }

    pub fn project(&self, target: WeightUnit) -> WeightOutput {
        WeightOutput {
            value: units::from_kg(self.canonical_kg, target),
            unit: target,
        }
    }

    /// Columns as stored: `(canonical_kg, original_value, original_unit)`.
    pub(crate) fn to_columns(
        field: Option<&Self>,
    ) -> (Option<String>, Option<String>, Option<&'static str>) {
        match field {
            Some(w) => (
                Some(w.canonical_kg.to_string()),
                w.original_value.map(|v| v.to_string()),
                w.original_unit.map(WeightUnit::as_str),
            ),
            None => (None, None, None),
        }
    }

    /// Reads the three weight columns sharing `prefix` from a row.
    pub(crate) fn from_row(row: &SqliteRow, prefix: &str) -> Result<Option<Self>, sqlx::Error> {
        let kg_col = format!("{prefix}_kg");
        let value_col = format!("{prefix}_original_value");
        let unit_col = format!("{prefix}_original_unit");

        let Some(canonical_kg) = decode_decimal(row, &kg_col)? else {
            return Ok(None);
        };
        let original_value = decode_decimal(row, &value_col)?;
        let original_unit = row
            .try_get::<Option<String>, _>(unit_col.as_str())?
            .map(|u| WeightUnit::parse(&u));

        // both-or-neither
        let (original_value, original_unit) = match (original_value, original_unit) {
            (Some(v), Some(u)) => (Some(v), Some(u)),
            _ => (None, None),
        };

        Ok(Some(Self {
            canonical_kg,
            original_value,
            original_unit,
        }))
    }
}

/// Weight projection that keeps absence absent.
pub fn project(field: Option<&WeightField>, target: WeightUnit) -> Option<WeightOutput> {
    field.map(|w| w.project(target))
}

pub(crate) fn decode_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, sqlx::Error> {
    row.try_get::<Option<String>, _>(column)?
        .map(|raw| {
            raw.parse::<Decimal>().map_err(|e| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn within(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < d("0.02")
    }

    #[test]
    fn keeps_original_pair_and_canonical_kg() {
        let w = WeightField::from_input(d("135"), "lbs");
        assert_eq!(w.canonical_kg(), d("61.23"));
        assert_eq!(
            w.original(),
            Some(WeightOutput {
                value: d("135"),
                unit: WeightUnit::Lb
            })
        );
    }

    #[test]
    fn unknown_unit_is_stored_as_kg() {
        let w = WeightField::from_input(d("80"), "furlongs");
        assert_eq!(w.canonical_kg(), d("80"));
        assert_eq!(w.original().map(|o| o.unit), Some(WeightUnit::Kg));
    }

    #[test]
    fn projection_back_to_input_unit_is_within_tolerance() {
        for (value, unit) in [("135", "lb"), ("61.5", "kg"), ("2.5", "lb"), ("315", "lbs")] {
            let w = WeightField::from_input(d(value), unit);
            let target = WeightUnit::parse(unit);
            assert!(within(w.project(target).value, d(value)));

            let other = match target {
                WeightUnit::Kg => WeightUnit::Lb,
                WeightUnit::Lb => WeightUnit::Kg,
            };
            let hop = w.project(other);
            let back = WeightField::from_input(hop.value, hop.unit.as_str()).project(target);
            assert!(within(back.value, d(value)), "{value}{unit} became {}", back.value);
        }
    }

    #[test]
    fn absent_weight_projects_to_absent() {
        assert_eq!(project(None, WeightUnit::Lb), None);
    }

    #[test]
    fn rejects_weight_above_ceiling() {
        let huge = WeightInput::new(d("50000000000000000000000000000"), "kg");
        let err = WeightField::from_weight_input(&huge, "actual_weight").unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "actual_weight", .. }));

        let just_over = WeightInput::new(d("22047"), "lb");
        let err = WeightField::from_weight_input(&just_over, "target_weight").unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "target_weight", .. }));

        let ceiling = WeightInput::new(d("10000"), "kg");
        let heaviest = WeightField::from_weight_input(&ceiling, "target_weight")
            .expect("ceiling itself is allowed");
        assert_eq!(heaviest.project(WeightUnit::Lb).value, d("22046.23"));
    }

    #[test]
    fn rejects_negative_weight() {
        let err = WeightField::from_weight_input(&WeightInput::new(d("-5"), "kg"), "actual_weight")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "actual_weight", .. }));
    }
}

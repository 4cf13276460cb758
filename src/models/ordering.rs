//! Two-level ordering checks for prescription rows: group order across a
//! workout, exercise order within a group.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    Workout(String),
    Group(String),
}

impl fmt::Display for OrderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workout(id) => write!(f, "workout {id}"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinuityError {
    #[error("Order gap in {scope}: expected {expected}, found {found}")]
    Gap {
        scope: OrderScope,
        expected: i64,
        found: i64,
    },

    #[error("Duplicate order {order} in {scope}")]
    Duplicate { scope: OrderScope, order: i64 },

    #[error("Rows of group {group_id} disagree on group_order ({first} vs {second})")]
    SplitGroup {
        group_id: String,
        first: i64,
        second: i64,
    },
}

/// The ordering columns of one prescription row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub group_id: String,
    pub group_order: i64,
    pub exercise_order: i64,
}

/// Accepts `orders` only if, once sorted, they are exactly `1..=N`.
pub fn check_contiguous(scope: &OrderScope, orders: &[i64]) -> Result<(), ContinuityError> {
    let mut sorted = orders.to_vec();
    sorted.sort_unstable();

    let mut previous = None;
    for (index, &order) in sorted.iter().enumerate() {
        if previous == Some(order) {
            return Err(ContinuityError::Duplicate {
                scope: scope.clone(),
                order,
            });
        }
        let expected = index as i64 + 1;
        if order != expected {
            return Err(ContinuityError::Gap {
                scope: scope.clone(),
                expected,
                found: order,
            });
        }
        previous = Some(order);
    }
    Ok(())
}

/// Validates group order across the workout, then exercise order inside
/// each group. Rows may arrive in any order.
pub fn check_workout_rows(workout_id: &str, rows: &[OrderRow]) -> Result<(), ContinuityError> {
    let mut groups: BTreeMap<&str, (i64, Vec<i64>)> = BTreeMap::new();

    for row in rows {
        match groups.get_mut(row.group_id.as_str()) {
            Some((group_order, exercise_orders)) => {
                if *group_order != row.group_order {
                    return Err(ContinuityError::SplitGroup {
                        group_id: row.group_id.clone(),
                        first: *group_order,
                        second: row.group_order,
                    });
                }
                exercise_orders.push(row.exercise_order);
            }
            None => {
                groups.insert(&row.group_id, (row.group_order, vec![row.exercise_order]));
            }
        }
    }

    let group_orders: Vec<i64> = groups.values().map(|(order, _)| *order).collect();
    check_contiguous(&OrderScope::Workout(workout_id.to_string()), &group_orders)?;

    for (group_id, (_, exercise_orders)) in &groups {
        check_contiguous(&OrderScope::Group((*group_id).to_string()), exercise_orders)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group_id: &str, group_order: i64, exercise_order: i64) -> OrderRow {
        OrderRow {
            group_id: group_id.to_string(),
            group_order,
            exercise_order,
        }
    }

    #[test]
    fn contiguous_regardless_of_insertion_order() {
        let scope = OrderScope::Workout("w".to_string());
        assert!(check_contiguous(&scope, &[3, 1, 2]).is_ok());
        assert!(check_contiguous(&scope, &[]).is_ok());
    }

    #[test]
    fn reports_gap() {
        let scope = OrderScope::Workout("w".to_string());
        assert_eq!(
            check_contiguous(&scope, &[4, 1, 2]),
            Err(ContinuityError::Gap {
                scope,
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn reports_duplicate_and_zero_start() {
        let scope = OrderScope::Group("g".to_string());
        assert!(matches!(
            check_contiguous(&scope, &[1, 2, 2]),
            Err(ContinuityError::Duplicate { order: 2, .. })
        ));
        assert!(matches!(
            check_contiguous(&scope, &[0, 1]),
            Err(ContinuityError::Gap { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn checks_both_levels() {
        let good = [row("a", 1, 1), row("b", 2, 2), row("a", 1, 2), row("b", 2, 1)];
        assert!(check_workout_rows("w", &good).is_ok());

        let bad_exercises = [row("a", 1, 1), row("a", 1, 3)];
        assert!(matches!(
            check_workout_rows("w", &bad_exercises),
            Err(ContinuityError::Gap { scope: OrderScope::Group(_), .. })
        ));

        let bad_groups = [row("a", 1, 1), row("b", 2, 1), row("c", 4, 1)];
        assert!(matches!(
            check_workout_rows("w", &bad_groups),
            Err(ContinuityError::Gap { scope: OrderScope::Workout(_), expected: 3, found: 4 })
        ));
    }

    #[test]
    fn two_groups_sharing_an_order_is_a_duplicate() {
        let rows = [row("a", 1, 1), row("b", 1, 1)];
        assert!(matches!(
            check_workout_rows("w", &rows),
            Err(ContinuityError::Duplicate { order: 1, .. })
        ));
    }

    #[test]
    fn split_group_is_reported() {
        let rows = [row("a", 1, 1), row("a", 2, 2)];
        assert!(matches!(
            check_workout_rows("w", &rows),
            Err(ContinuityError::SplitGroup { .. })
        ));
    }
}

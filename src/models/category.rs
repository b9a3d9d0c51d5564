//! Expense category model.

use serde::{Deserialize, Serialize};

use super::CategoryId;

/// Names of the categories every new sheet starts with.
pub const DEFAULT_CATEGORY_NAMES: [&str; 6] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Healthcare",
    "Others",
];

/// A named expense bucket with a cached running total.
///
/// `total` is derived state maintained incrementally by
/// [`crate::aggregation`]: it equals the sum of the amounts of the sheet's
/// expenses booked under `name`, floored at zero. Writing to it directly
/// breaks that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier within the sheet.
    pub id: CategoryId,
    /// Display name, also the join key used by expenses.
    #[serde(default)]
    pub name: String,
    /// Running total of the expenses booked under this name.
    #[serde(default)]
    pub total: f64,
}

impl Category {
    /// Creates an empty category with a fresh id.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            id: CategoryId::generate(),
            name: name.into(),
            total: 0.0,
        }
    }

    /// Returns the six categories a new sheet is seeded with.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_CATEGORY_NAMES.iter().map(|&name| Self::new(name)).collect()
    }
}

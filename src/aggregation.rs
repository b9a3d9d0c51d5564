//! Category aggregation engine.
//!
//! Keeps every [`Category::total`] equal to the sum of the amounts of the
//! expenses booked under its name, floored at zero. Totals are maintained
//! incrementally as expenses are added, edited and removed; nothing here
//! rescans the expense list except [`rebuild_totals`].
//!
//! Expenses reference categories by **name**. All name matching goes
//! through [`matches`], so switching the join to ids only touches that
//! function (plus a migration of stored expenses).

use crate::models::{Category, ExpenseItem, ExpensePatch};

/// What an expense change did to the category totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Booking {
    /// A matching category absorbed the change.
    Booked,
    /// No category carries the expense's name; no total moved.
    Orphaned,
    /// The change cannot affect totals, so none were touched.
    Unchanged,
}

/// Returns `true` if `category` is the one an expense tagged `name`
/// belongs to.
#[inline]
#[must_use]
pub fn matches(category: &Category, name: &str) -> bool {
    category.name == name
}

/// Adds `amount` to every category called `name`.
///
/// Returns `true` if at least one category matched.
pub fn credit(categories: &mut [Category], name: &str, amount: f64) -> bool {
    adjust(categories, name, |total| total + amount)
}

/// Subtracts `amount` from every category called `name`, flooring the
/// result at zero.
///
/// Returns `true` if at least one category matched.
pub fn debit(categories: &mut [Category], name: &str, amount: f64) -> bool {
    adjust(categories, name, |total| total - amount)
}

/// Books a newly added expense.
#[inline]
pub fn on_expense_added(categories: &mut [Category], expense: &ExpenseItem) -> Booking {
    booking(credit(categories, &expense.category, expense.amount))
}

/// Reverses a removed expense.
#[inline]
pub fn on_expense_removed(categories: &mut [Category], expense: &ExpenseItem) -> Booking {
    booking(debit(categories, &expense.category, expense.amount))
}

/// Re-books an expense about to be patched.
///
/// Totals only move if the patch sets `category` or `amount`. The old
/// amount is first taken off the old category (floored at zero), then the
/// resulting amount is added to the resulting category. The two steps are
/// never merged into a single delta: when the floor kicks in on the first
/// step the combined result differs, and that sequencing is the contract.
pub fn on_expense_updated(
    categories: &mut [Category],
    old: &ExpenseItem,
    patch: &ExpensePatch,
) -> Booking {
    if !patch.affects_totals() {
        return Booking::Unchanged;
    }
    let _old_matched = debit(categories, &old.category, old.amount);
    let new_category = patch.category.as_deref().unwrap_or(&old.category);
    let new_amount = patch.amount.unwrap_or(old.amount);
    booking(credit(categories, new_category, new_amount))
}

/// Recomputes every total from scratch out of `expenses`.
///
/// Used to repair totals after the cached values drifted (for example
/// after a category rename orphaned older expenses and the user renamed
/// it back).
pub fn rebuild_totals(categories: &mut [Category], expenses: &[ExpenseItem]) {
    for category in categories.iter_mut() {
        let sum: f64 = expenses
            .iter()
            .filter(|expense| matches(category, &expense.category))
            .map(|expense| expense.amount)
            .sum();
        category.total = sum.max(0.0);
    }
}

/// Applies `op` to the total of every category called `name`, clamping
/// at zero.
fn adjust<F: Fn(f64) -> f64>(categories: &mut [Category], name: &str, op: F) -> bool {
    let mut matched = false;
    for category in categories
        .iter_mut()
        .filter(|category| matches(category, name))
    {
        category.total = op(category.total).max(0.0);
        matched = true;
    }
    matched
}

/// Maps a match flag to a [`Booking`].
const fn booking(matched: bool) -> Booking {
    if matched {
        Booking::Booked
    } else {
        Booking::Orphaned
    }
}

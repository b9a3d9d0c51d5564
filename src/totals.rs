//! Derived-totals projector.
//!
//! Pure folds over a sheet's line items producing the summary numbers the
//! presentation layer displays. Nothing here mutates or caches.

use crate::models::{LineItem, Sheet};

/// Sums the amounts of a collection.
#[inline]
#[must_use]
pub fn sum<T: LineItem>(items: &[T]) -> f64 {
    items.iter().map(LineItem::amount).sum()
}

/// Total income of the sheet.
#[inline]
#[must_use]
pub fn total_income(sheet: &Sheet) -> f64 {
    sum(&sheet.income)
}

/// Total debt repayments of the sheet.
#[inline]
#[must_use]
pub fn total_debts(sheet: &Sheet) -> f64 {
    sum(&sheet.debts)
}

/// Total money set aside in the sheet.
#[inline]
#[must_use]
pub fn total_savings(sheet: &Sheet) -> f64 {
    sum(&sheet.savings)
}

/// Total bills of the sheet.
#[inline]
#[must_use]
pub fn total_bills(sheet: &Sheet) -> f64 {
    sum(&sheet.bills)
}

/// Total categorized spending of the sheet.
#[inline]
#[must_use]
pub fn total_expenses(sheet: &Sheet) -> f64 {
    sum(&sheet.expenses)
}

/// Money still available to spend: income minus savings, expenses, debts
/// and bills. Savings count as money set aside, not money available.
#[inline]
#[must_use]
pub fn remaining_amount(sheet: &Sheet) -> f64 {
    total_income(sheet)
        - total_savings(sheet)
        - total_expenses(sheet)
        - total_debts(sheet)
        - total_bills(sheet)
}

/// Returns `true` if any amount in the sheet is non-zero.
///
/// Measured as the sum of absolute values across every collection, so a
/// sheet whose entries cancel out still counts as having data.
#[must_use]
pub fn has_meaningful_data(sheet: &Sheet) -> bool {
    let magnitude = abs_sum(&sheet.income)
        + abs_sum(&sheet.debts)
        + abs_sum(&sheet.savings)
        + abs_sum(&sheet.bills)
        + abs_sum(&sheet.expenses);
    magnitude > 0.0
}

/// Sum of absolute amounts, skipping non-finite ones.
fn abs_sum<T: LineItem>(items: &[T]) -> f64 {
    items
        .iter()
        .map(LineItem::amount)
        .filter(|amount| amount.is_finite())
        .map(f64::abs)
        .sum()
}

/// Every summary number of one sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetTotals {
    /// Total income.
    pub income: f64,
    /// Total debts.
    pub debts: f64,
    /// Total savings.
    pub savings: f64,
    /// Total bills.
    pub bills: f64,
    /// Total expenses.
    pub expenses: f64,
    /// Remaining amount (see [`remaining_amount`]).
    pub remaining: f64,
}

impl SheetTotals {
    /// Folds a sheet into its totals.
    #[must_use]
    pub fn of(sheet: &Sheet) -> Self {
        let income = total_income(sheet);
        let debts = total_debts(sheet);
        let savings = total_savings(sheet);
        let bills = total_bills(sheet);
        let expenses = total_expenses(sheet);
        Self {
            income,
            debts,
            savings,
            bills,
            expenses,
            remaining: income - savings - expenses - debts - bills,
        }
    }
}

/// One slice of the category breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    /// Category name.
    pub name: String,
    /// Cached category total.
    pub total: f64,
    /// Share of all positive totals, in percent (0-100).
    pub percent: f64,
}

/// Breaks spending down by category.
///
/// Only categories with a positive total appear, in sheet order; their
/// percentages add up to 100.
#[must_use]
pub fn category_breakdown(sheet: &Sheet) -> Vec<CategoryShare> {
    let positive: Vec<_> = sheet
        .categories
        .iter()
        .filter(|category| category.total > 0.0 && category.total.is_finite())
        .collect();
    let grand_total: f64 = positive.iter().map(|category| category.total).sum();
    positive
        .into_iter()
        .map(|category| CategoryShare {
            name: category.name.clone(),
            total: category.total,
            percent: category.total / grand_total * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BillItem, Category, CategoryId, DebtItem, ExpenseItem, IncomeItem, ItemId, NaiveDate,
        SavingsItem,
    };

    /// Empty sheet seeded with the default categories.
    fn sheet() -> Sheet {
        Sheet::for_day("Test", NaiveDate::from_ymd_opt(2025, 11, 5).unwrap())
    }

    /// Income entry of `amount`.
    fn income(amount: f64) -> IncomeItem {
        IncomeItem {
            id: ItemId::generate(),
            description: String::new(),
            amount,
        }
    }

    /// Expense booked under `category`.
    fn expense(category: &str, amount: f64) -> ExpenseItem {
        ExpenseItem {
            id: ItemId::generate(),
            date: String::new(),
            description: String::new(),
            category: category.to_owned(),
            amount,
        }
    }

    /// Sheet with one entry of every kind.
    fn fixture() -> Sheet {
        let mut sheet = sheet();
        sheet.income = vec![income(10_000_000.0), income(-500_000.0)];
        sheet.savings = vec![SavingsItem {
            id: ItemId::generate(),
            description: "Fund".to_owned(),
            amount: 3_000_000.0,
        }];
        sheet.debts = vec![DebtItem {
            id: ItemId::generate(),
            description: "Loan".to_owned(),
            amount: 1_200_000.0,
            date: String::new(),
        }];
        sheet.bills = vec![BillItem {
            id: ItemId::generate(),
            description: "Power".to_owned(),
            amount: 450_000.0,
            date: String::new(),
        }];
        sheet.expenses = vec![expense("Food & Dining", 82_000.0), expense("Shopping", -2_000.0)];
        sheet
    }

    #[test]
    fn remaining_formula_with_negative_amounts() {
        let sheet = fixture();
        let expected = 9_500_000.0 - 3_000_000.0 - 80_000.0 - 1_200_000.0 - 450_000.0;
        assert!((remaining_amount(&sheet) - expected).abs() < 1e-6);
    }

    #[test]
    fn totals_match_individual_folds() {
        let sheet = fixture();
        let totals = SheetTotals::of(&sheet);
        assert!((totals.income - total_income(&sheet)).abs() < f64::EPSILON);
        assert!((totals.debts - 1_200_000.0).abs() < f64::EPSILON);
        assert!((totals.savings - 3_000_000.0).abs() < f64::EPSILON);
        assert!((totals.bills - 450_000.0).abs() < f64::EPSILON);
        assert!((totals.expenses - 80_000.0).abs() < f64::EPSILON);
        assert!((totals.remaining - remaining_amount(&sheet)).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sheet_totals_are_zero() {
        let sheet = sheet();
        assert!(remaining_amount(&sheet) == 0.0);
        assert!(!has_meaningful_data(&sheet));
    }

    #[test]
    fn cancelling_entries_still_count_as_data() {
        let mut sheet = sheet();
        sheet.income = vec![income(100.0), income(-100.0)];
        assert!(remaining_amount(&sheet) == 0.0);
        assert!(has_meaningful_data(&sheet));
    }

    #[test]
    fn zero_amount_entries_are_not_data() {
        let mut sheet = sheet();
        sheet.income = vec![income(0.0)];
        assert!(!has_meaningful_data(&sheet));
    }

    #[test]
    fn breakdown_skips_empty_categories() {
        let mut sheet = sheet();
        sheet.categories = vec![
            Category {
                id: CategoryId::from("1"),
                name: "Food".to_owned(),
                total: 300.0,
            },
            Category {
                id: CategoryId::from("2"),
                name: "Fuel".to_owned(),
                total: 0.0,
            },
            Category {
                id: CategoryId::from("3"),
                name: "Fun".to_owned(),
                total: 100.0,
            },
        ];
        let breakdown = category_breakdown(&sheet);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].name, "Food");
        assert!((breakdown[0].percent - 75.0).abs() < 1e-9);
        assert!((breakdown[1].percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_of_fresh_sheet_is_empty() {
        assert!(category_breakdown(&sheet()).is_empty());
    }
}

//! Budget sheet model: one budgeting scope (conceptually a month).

use chrono::{Datelike as _, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{
    BillItem, Category, DebtItem, ExpenseItem, IncomeItem, SavingsItem, ShareId, ShareVisibility,
    SheetId,
};

/// Calendar date format used for period bounds and snapshot day keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Start and end of a sheet's budgeting period, as ISO calendar dates.
///
/// `start_date <= end_date` is expected but not enforced. Dates are kept as
/// strings so that malformed stored values survive a load; readers parse
/// them on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSettings {
    /// First day of the period (`YYYY-MM-DD`).
    #[serde(default)]
    pub start_date: String,
    /// Last day of the period (`YYYY-MM-DD`).
    #[serde(default)]
    pub end_date: String,
}

impl PeriodSettings {
    /// Creates a period from two date strings.
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>, E: Into<String>>(start_date: S, end_date: E) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Returns the period spanning the whole calendar month containing
    /// `day`.
    #[must_use]
    pub fn month_of(day: NaiveDate) -> Self {
        let first = day.with_day(1).unwrap_or(day);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(first);
        Self {
            start_date: first.format(DATE_FORMAT).to_string(),
            end_date: last.format(DATE_FORMAT).to_string(),
        }
    }

    /// Parses the start date, or `None` if it is not a valid ISO date.
    #[inline]
    #[must_use]
    pub fn start(&self) -> Option<NaiveDate> {
        parse_day(&self.start_date)
    }

    /// Parses the end date, or `None` if it is not a valid ISO date.
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<NaiveDate> {
        parse_day(&self.end_date)
    }
}

/// Daily allowance frozen for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceSnapshot {
    /// Day key (`YYYY-MM-DD`) the amount was computed for.
    pub date: String,
    /// Rounded allowance computed on that day.
    pub amount: f64,
}

impl AllowanceSnapshot {
    /// Creates a snapshot for the given day.
    #[inline]
    #[must_use]
    pub fn new(day: NaiveDate, amount: f64) -> Self {
        Self {
            date: day_key(day),
            amount,
        }
    }
}

/// Read-only sharing configuration of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSettings {
    /// Public id embedded in the share link.
    pub id: ShareId,
    /// Who may open the link.
    #[serde(default)]
    pub visibility: ShareVisibility,
    /// Lowercase emails allowed to view an invited-only share.
    #[serde(default)]
    pub allowed_emails: Vec<String>,
}

/// A budget sheet with its line items, categories and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    /// Unique identifier.
    pub id: SheetId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Budgeting period.
    #[serde(default)]
    pub period_settings: PeriodSettings,
    /// Income entries.
    #[serde(default)]
    pub income: Vec<IncomeItem>,
    /// Debt repayments.
    #[serde(default)]
    pub debts: Vec<DebtItem>,
    /// Money set aside.
    #[serde(default)]
    pub savings: Vec<SavingsItem>,
    /// Bills.
    #[serde(default)]
    pub bills: Vec<BillItem>,
    /// Categorized expenses.
    #[serde(default)]
    pub expenses: Vec<ExpenseItem>,
    /// Expense categories with cached totals.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Allowance frozen for the current day, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowance_snapshot: Option<AllowanceSnapshot>,
    /// Sharing configuration, if the sheet is shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareSettings>,
}

impl Sheet {
    /// Creates a sheet covering the current local month, seeded with the
    /// default categories.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self::for_day(name, Local::now().date_naive())
    }

    /// Creates a sheet covering the month containing `today`, seeded with
    /// the default categories.
    #[must_use]
    pub fn for_day<T: Into<String>>(name: T, today: NaiveDate) -> Self {
        Self {
            id: SheetId::generate(),
            name: name.into(),
            period_settings: PeriodSettings::month_of(today),
            income: Vec::new(),
            debts: Vec::new(),
            savings: Vec::new(),
            bills: Vec::new(),
            expenses: Vec::new(),
            categories: Category::defaults(),
            allowance_snapshot: None,
            share: None,
        }
    }
}

/// Formats a day as the `YYYY-MM-DD` key used by snapshots.
#[inline]
#[must_use]
pub fn day_key(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` string, ignoring surrounding whitespace.
#[inline]
#[must_use]
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

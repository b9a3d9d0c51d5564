//! Application state: every sheet, the current-sheet pointer and UI
//! settings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    AllowanceSnapshot, BillItem, Category, DebtItem, ExpenseItem, IncomeItem, PeriodSettings,
    SavingsItem, Sheet, SheetId, Theme,
};

/// Language used when none was stored.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Presentation preferences persisted alongside the sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    /// Colour scheme.
    #[serde(default)]
    pub theme: Theme,
    /// Interface language code.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for UiSettings {
    #[inline]
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: default_language(),
        }
    }
}

/// Serde default for [`UiSettings::language`].
fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

/// The whole persisted state of one user.
///
/// Invariants (restored by [`AppState::normalized`]): `sheets` is never
/// empty, sheet ids are unique and `current_sheet_id` names one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// All sheets, in creation order.
    pub sheets: Vec<Sheet>,
    /// Id of the sheet every mutation and accessor operates on.
    #[serde(default)]
    pub current_sheet_id: SheetId,
    /// Presentation preferences.
    #[serde(default)]
    pub ui_settings: UiSettings,
}

impl AppState {
    /// Creates a state holding a single default sheet for the current
    /// local month.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_sheet(Sheet::new(default_sheet_name(0)))
    }

    /// Creates a state holding a single default sheet for the month
    /// containing `today`.
    #[inline]
    #[must_use]
    pub fn for_day(today: NaiveDate) -> Self {
        Self::from_sheet(Sheet::for_day(default_sheet_name(0), today))
    }

    /// Wraps one sheet into a state that points at it.
    #[must_use]
    pub fn from_sheet(sheet: Sheet) -> Self {
        Self {
            current_sheet_id: sheet.id.clone(),
            sheets: vec![sheet],
            ui_settings: UiSettings::default(),
        }
    }

    /// Returns the current sheet.
    ///
    /// Always `Some` for a normalized state.
    #[must_use]
    pub fn current_sheet(&self) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.id == self.current_sheet_id)
    }

    /// Returns the current sheet mutably.
    #[must_use]
    pub fn current_sheet_mut(&mut self) -> Option<&mut Sheet> {
        let current = &self.current_sheet_id;
        self.sheets.iter_mut().find(|sheet| sheet.id == *current)
    }

    /// Returns the sheet with the given id.
    #[must_use]
    pub fn sheet(&self, id: &SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.id == *id)
    }

    /// Restores the state invariants: seeds a default sheet if there is
    /// none, regenerates duplicate sheet ids and repoints a dangling
    /// `current_sheet_id` at the first sheet.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.sheets.is_empty() {
            self.sheets.push(Sheet::new(default_sheet_name(0)));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.sheets.len());
        for sheet in &mut self.sheets {
            if !seen.insert(sheet.id.clone()) {
                tracing::warn!(sheet_id = %sheet.id, "duplicate sheet id, regenerating");
                sheet.id = SheetId::generate();
                let _fresh = seen.insert(sheet.id.clone());
            }
        }
        if self.current_sheet().is_none()
            && let Some(first) = self.sheets.first()
        {
            self.current_sheet_id = first.id.clone();
        }
        self
    }
}

impl Default for AppState {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Name given to the sheet added after `existing` others.
#[inline]
#[must_use]
pub fn default_sheet_name(existing: usize) -> String {
    format!("Sheet {}", existing.saturating_add(1))
}

/// Pre-multi-sheet state shape: a single sheet's fields flattened to the
/// top level next to `uiSettings`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LegacyState {
    /// Budgeting period.
    #[serde(default)]
    pub(crate) period_settings: PeriodSettings,
    /// Income entries.
    #[serde(default)]
    pub(crate) income: Vec<IncomeItem>,
    /// Debt repayments.
    #[serde(default)]
    pub(crate) debts: Vec<DebtItem>,
    /// Money set aside.
    #[serde(default)]
    pub(crate) savings: Vec<SavingsItem>,
    /// Bills.
    #[serde(default)]
    pub(crate) bills: Vec<BillItem>,
    /// Categorized expenses.
    #[serde(default)]
    pub(crate) expenses: Vec<ExpenseItem>,
    /// Expense categories.
    #[serde(default)]
    pub(crate) categories: Vec<Category>,
    /// Allowance frozen for a day.
    #[serde(default)]
    pub(crate) allowance_snapshot: Option<AllowanceSnapshot>,
    /// Presentation preferences.
    #[serde(default)]
    pub(crate) ui_settings: UiSettings,
}

impl LegacyState {
    /// Moves the flattened sheet into a single-element multi-sheet state.
    pub(crate) fn into_app_state(self) -> AppState {
        let sheet = Sheet {
            id: SheetId::generate(),
            name: default_sheet_name(0),
            period_settings: self.period_settings,
            income: self.income,
            debts: self.debts,
            savings: self.savings,
            bills: self.bills,
            expenses: self.expenses,
            categories: self.categories,
            allowance_snapshot: self.allowance_snapshot,
            share: None,
        };
        let mut state = AppState::from_sheet(sheet);
        state.ui_settings = self.ui_settings;
        state
    }
}

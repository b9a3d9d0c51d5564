//! Data models for budget sheets.
//!
//! This module contains strongly-typed representations of every record a
//! budget sheet holds, newtype ID wrappers, enumeration types and the
//! default-seed factories ([`Sheet::new`], [`AppState::new`]).

mod category;
mod enums;
mod ids;
mod items;
mod sheet;
mod state;

pub use category::{Category, DEFAULT_CATEGORY_NAMES};
pub use chrono::NaiveDate;
pub use enums::{ShareVisibility, Theme};
pub use ids::{CategoryId, ItemId, LOCAL_USER, ShareId, SheetId, UserKey};
pub use items::{
    BillItem, BillPatch, DebtItem, DebtPatch, ExpenseItem, ExpensePatch, IncomeItem, IncomePatch,
    LineItem, NewBill, NewDebt, NewExpense, NewIncome, NewSavings, SavingsItem, SavingsPatch,
};
pub use sheet::{
    AllowanceSnapshot, DATE_FORMAT, PeriodSettings, ShareSettings, Sheet, day_key, parse_day,
};
pub use state::{AppState, DEFAULT_LANGUAGE, UiSettings, default_sheet_name};
pub(crate) use state::LegacyState;

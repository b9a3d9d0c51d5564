//! Budget sheet state engine.
//!
//! `trackly` keeps a user's budget sheets (income, debts, savings, bills
//! and categorized expenses over a period) and derives what can be spent
//! per day from them.
//!
//! The pieces fit together like this:
//!
//! - [`store::SheetStore`] owns the live [`models::AppState`] and is the
//!   only way to change it. Expense edits keep the cached category totals
//!   in step through [`aggregation`].
//! - [`totals`] and [`allowance`] are pure projections of a sheet. The
//!   daily allowance is frozen once per calendar day so the figure does not
//!   move while the user is spending.
//! - [`persistence`] serializes state into blobs for a [`storage`] backend,
//!   migrates the legacy single-sheet layout and saves after every
//!   transition.
//! - [`identity::Session`] decides whose state is live.
//!
//! # Example
//!
//! ```rust
//! use trackly::models::{NewExpense, NewIncome};
//! use trackly::store::SheetStore;
//!
//! let mut store = SheetStore::default();
//! let _income = store.add_income(NewIncome {
//!     description: "Salary".to_owned(),
//!     amount: 1_000.0,
//! });
//! let _expense = store.add_expense(NewExpense {
//!     category: "Food & Dining".to_owned(),
//!     amount: 250.0,
//!     ..NewExpense::default()
//! });
//! assert!((store.remaining_amount() - 750.0).abs() < f64::EPSILON);
//! ```

pub mod aggregation;
pub mod allowance;
pub mod error;
pub mod format;
pub mod identity;
pub mod models;
pub mod persistence;
pub mod share;
pub mod storage;
pub mod store;
pub mod totals;

//! Sheet store: the single mutation surface over [`AppState`].
//!
//! Every mutation clones the live state, applies the change to the copy and
//! swaps the copy in as a new [`Arc`], so an observer holding the previous
//! `Arc` never sees a partial edit and a pointer comparison tells old and
//! new apart. Registered [`StateObserver`]s (the persistence layer) are
//! notified after each applied transition.
//!
//! Mutations never fail. An unknown id or a rejected input is reported as
//! an [`Outcome`] and leaves the state untouched.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::aggregation::{self, Booking};
use crate::allowance::DailyAllowance;
use crate::models::{
    AllowanceSnapshot, AppState, BillItem, BillPatch, Category, CategoryId, DebtItem, DebtPatch,
    ExpenseItem, ExpensePatch, IncomeItem, IncomePatch, ItemId, LineItem, NewBill, NewDebt,
    NewExpense, NewIncome, NewSavings, PeriodSettings, SavingsItem, SavingsPatch, ShareSettings,
    ShareVisibility, Sheet, SheetId, Theme, default_sheet_name,
};
use crate::share;
use crate::totals::{self, CategoryShare, SheetTotals};

/// Receives every state published by a [`SheetStore`].
pub trait StateObserver: core::fmt::Debug + Send + Sync {
    /// Called after a transition replaced the live state.
    fn state_changed(&self, state: &Arc<AppState>);
}

impl<T: StateObserver + ?Sized> StateObserver for Arc<T> {
    #[inline]
    fn state_changed(&self, state: &Arc<AppState>) {
        (**self).state_changed(state);
    }
}

/// Result of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The change was applied.
    Applied,
    /// The change was applied, but the expense it concerns matches no
    /// category, so no category total moved.
    Orphaned,
    /// The target id does not exist; nothing changed.
    NotFound,
    /// The input was rejected (blank name, last sheet, nothing to do);
    /// nothing changed.
    Ignored,
}

impl Outcome {
    /// Returns `true` if the state was replaced.
    #[inline]
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied | Self::Orphaned)
    }
}

impl From<Booking> for Outcome {
    #[inline]
    fn from(booking: Booking) -> Self {
        match booking {
            Booking::Booked | Booking::Unchanged => Self::Applied,
            Booking::Orphaned => Self::Orphaned,
        }
    }
}

/// Result of an `add_*` mutation: the id given to the new entity and what
/// happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added<Id> {
    /// Identifier generated for the new entity.
    pub id: Id,
    /// Outcome of the mutation.
    pub outcome: Outcome,
}

/// Line item kinds stored in a plain collection of a sheet.
trait SheetCollection: LineItem {
    /// Returns the sheet's collection of this kind.
    fn collection(sheet: &mut Sheet) -> &mut Vec<Self>;
}

macro_rules! sheet_collection {
    ($($item:ty => $field:ident),* $(,)?) => {
        $(
            impl SheetCollection for $item {
                #[inline]
                fn collection(sheet: &mut Sheet) -> &mut Vec<Self> {
                    &mut sheet.$field
                }
            }
        )*
    };
}

sheet_collection! {
    IncomeItem => income,
    DebtItem => debts,
    SavingsItem => savings,
    BillItem => bills,
}

/// Owner of the live [`AppState`] of one user.
#[derive(Debug)]
pub struct SheetStore {
    /// Live state, replaced wholesale on every applied transition.
    state: Arc<AppState>,
    /// Notified after each applied transition, in subscription order.
    observers: Vec<Box<dyn StateObserver>>,
}

impl SheetStore {
    /// Wraps a state, restoring its invariants first.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state.normalized()),
            observers: Vec::new(),
        }
    }

    /// Adds an observer and returns the store.
    #[inline]
    #[must_use]
    pub fn with_observer<O: StateObserver + 'static>(mut self, observer: O) -> Self {
        self.subscribe(observer);
        self
    }

    /// Adds an observer notified after every applied transition.
    pub fn subscribe<O: StateObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    /// Drops every observer.
    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Notifies observers of the current state without changing it.
    ///
    /// Used right after loading, when the loaded state itself must be
    /// persisted (fresh default or migrated legacy blob).
    pub fn publish(&self) {
        for observer in &self.observers {
            observer.state_changed(&self.state);
        }
    }

    /// Returns the live state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Returns the current sheet.
    #[inline]
    #[must_use]
    pub fn current_sheet(&self) -> Option<&Sheet> {
        self.state.current_sheet()
    }

    /// Applies `change` to a copy of the state and publishes the copy if
    /// the outcome says it was applied.
    fn transition<F>(&mut self, operation: &'static str, change: F) -> Outcome
    where
        F: FnOnce(&mut AppState) -> Outcome,
    {
        let mut next = AppState::clone(&self.state);
        let outcome = change(&mut next);
        if outcome.is_applied() {
            tracing::debug!(
                operation,
                sheet_id = %next.current_sheet_id,
                ?outcome,
                "state updated"
            );
            self.state = Arc::new(next);
            self.publish();
        } else {
            tracing::trace!(operation, ?outcome, "state unchanged");
        }
        outcome
    }

    /// Runs `change` against the current sheet of a state copy.
    fn on_current_sheet<F>(&mut self, operation: &'static str, change: F) -> Outcome
    where
        F: FnOnce(&mut Sheet) -> Outcome,
    {
        self.transition(operation, |state| {
            state.current_sheet_mut().map_or(Outcome::NotFound, change)
        })
    }

    /// Appends a new item of kind `T` to the current sheet.
    fn add_item<T: SheetCollection>(
        &mut self,
        operation: &'static str,
        draft: T::Draft,
    ) -> Added<ItemId> {
        let id = ItemId::generate();
        let item = T::from_draft(id.clone(), draft);
        let outcome = self.on_current_sheet(operation, |sheet| {
            T::collection(sheet).push(item);
            Outcome::Applied
        });
        Added { id, outcome }
    }

    /// Removes the item of kind `T` with the given id.
    fn remove_item<T: SheetCollection>(&mut self, operation: &'static str, id: &ItemId) -> Outcome {
        self.on_current_sheet(operation, |sheet| {
            let items = T::collection(sheet);
            let before = items.len();
            items.retain(|item| item.id() != id);
            if items.len() == before {
                Outcome::NotFound
            } else {
                Outcome::Applied
            }
        })
    }

    /// Merges a patch into the item of kind `T` with the given id.
    fn update_item<T: SheetCollection>(
        &mut self,
        operation: &'static str,
        id: &ItemId,
        patch: T::Patch,
    ) -> Outcome {
        self.on_current_sheet(operation, |sheet| {
            match T::collection(sheet).iter_mut().find(|item| item.id() == id) {
                Some(item) => {
                    item.apply_patch(patch);
                    Outcome::Applied
                }
                None => Outcome::NotFound,
            }
        })
    }

    /// Appends an expense and credits the category it names.
    ///
    /// An expense naming no category is still stored; the outcome is then
    /// [`Outcome::Orphaned`].
    pub fn add_expense(&mut self, draft: NewExpense) -> Added<ItemId> {
        let id = ItemId::generate();
        let expense = ExpenseItem::from_draft(id.clone(), draft);
        let outcome = self.on_current_sheet("add_expense", |sheet| {
            let booking = aggregation::on_expense_added(&mut sheet.categories, &expense);
            sheet.expenses.push(expense);
            booking.into()
        });
        Added { id, outcome }
    }

    /// Removes an expense and debits its category.
    pub fn remove_expense(&mut self, id: &ItemId) -> Outcome {
        self.on_current_sheet("remove_expense", |sheet| {
            let Some(position) = sheet.expenses.iter().position(|expense| expense.id == *id)
            else {
                return Outcome::NotFound;
            };
            let expense = sheet.expenses.remove(position);
            aggregation::on_expense_removed(&mut sheet.categories, &expense).into()
        })
    }

    /// Merges `patch` into an expense, re-booking it if its category or
    /// amount changes.
    pub fn update_expense(&mut self, id: &ItemId, patch: ExpensePatch) -> Outcome {
        self.on_current_sheet("update_expense", |sheet| {
            let Some(expense) = sheet.expenses.iter_mut().find(|expense| expense.id == *id)
            else {
                return Outcome::NotFound;
            };
            let booking = aggregation::on_expense_updated(&mut sheet.categories, expense, &patch);
            expense.apply_patch(patch);
            booking.into()
        })
    }

    /// Adds a category with a zero total.
    ///
    /// Expenses already tagged with the same name are not counted until
    /// [`Self::rebuild_category_totals`] runs.
    pub fn add_category(&mut self, name: &str) -> Added<CategoryId> {
        let category = Category::new(name);
        let id = category.id.clone();
        let outcome = self.on_current_sheet("add_category", |sheet| {
            sheet.categories.push(category);
            Outcome::Applied
        });
        Added { id, outcome }
    }

    /// Removes a category. Expenses tagged with its name are kept and
    /// become orphaned.
    pub fn remove_category(&mut self, id: &CategoryId) -> Outcome {
        self.on_current_sheet("remove_category", |sheet| {
            let before = sheet.categories.len();
            sheet.categories.retain(|category| category.id != *id);
            if sheet.categories.len() == before {
                Outcome::NotFound
            } else {
                Outcome::Applied
            }
        })
    }

    /// Renames a category. Expenses recorded under the old name are not
    /// re-attached.
    pub fn update_category(&mut self, id: &CategoryId, name: &str) -> Outcome {
        self.on_current_sheet("update_category", |sheet| {
            match sheet.categories.iter_mut().find(|category| category.id == *id) {
                Some(category) => {
                    name.clone_into(&mut category.name);
                    Outcome::Applied
                }
                None => Outcome::NotFound,
            }
        })
    }

    /// Recomputes every category total of the current sheet from its
    /// expenses.
    pub fn rebuild_category_totals(&mut self) -> Outcome {
        self.on_current_sheet("rebuild_category_totals", |sheet| {
            aggregation::rebuild_totals(&mut sheet.categories, &sheet.expenses);
            Outcome::Applied
        })
    }

    /// Replaces the current sheet's period.
    pub fn update_period<S: Into<String>, E: Into<String>>(
        &mut self,
        start_date: S,
        end_date: E,
    ) -> Outcome {
        let period = PeriodSettings::new(start_date, end_date);
        self.on_current_sheet("update_period", |sheet| {
            sheet.period_settings = period;
            Outcome::Applied
        })
    }

    /// Makes another sheet current.
    pub fn set_current_sheet(&mut self, id: &SheetId) -> Outcome {
        self.transition("set_current_sheet", |state| {
            if state.sheet(id).is_none() {
                return Outcome::NotFound;
            }
            state.current_sheet_id = id.clone();
            Outcome::Applied
        })
    }

    /// Appends a freshly seeded sheet and makes it current.
    ///
    /// A missing or blank name becomes `"Sheet {n+1}"`, `n` being the
    /// number of sheets before the insertion.
    pub fn add_sheet(&mut self, name: Option<&str>) -> Added<SheetId> {
        let sheet_name = name
            .map(str::trim)
            .filter(|trimmed| !trimmed.is_empty())
            .map_or_else(|| default_sheet_name(self.state.sheets.len()), str::to_owned);
        let sheet = Sheet::new(sheet_name);
        let id = sheet.id.clone();
        let outcome = self.transition("add_sheet", |state| {
            state.current_sheet_id = sheet.id.clone();
            state.sheets.push(sheet);
            Outcome::Applied
        });
        Added { id, outcome }
    }

    /// Renames a sheet to the trimmed `name`; a blank name is ignored.
    pub fn rename_sheet(&mut self, id: &SheetId, name: &str) -> Outcome {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Outcome::Ignored;
        }
        self.transition("rename_sheet", |state| {
            match state.sheets.iter_mut().find(|sheet| sheet.id == *id) {
                Some(sheet) => {
                    trimmed.clone_into(&mut sheet.name);
                    Outcome::Applied
                }
                None => Outcome::NotFound,
            }
        })
    }

    /// Removes a sheet. The last sheet is never removed. Removing the
    /// current sheet makes the first remaining one current.
    pub fn remove_sheet(&mut self, id: &SheetId) -> Outcome {
        self.transition("remove_sheet", |state| {
            if state.sheet(id).is_none() {
                return Outcome::NotFound;
            }
            if state.sheets.len() <= 1 {
                return Outcome::Ignored;
            }
            state.sheets.retain(|sheet| sheet.id != *id);
            if state.current_sheet_id == *id
                && let Some(first) = state.sheets.first()
            {
                state.current_sheet_id = first.id.clone();
            }
            Outcome::Applied
        })
    }

    /// Overwrites the current sheet's allowance snapshot.
    pub fn set_daily_allowance_snapshot(&mut self, snapshot: AllowanceSnapshot) -> Outcome {
        self.on_current_sheet("set_daily_allowance_snapshot", |sheet| {
            sheet.allowance_snapshot = Some(snapshot);
            Outcome::Applied
        })
    }

    /// Computes the current sheet's allowance for `today` without storing
    /// anything.
    #[must_use]
    pub fn daily_allowance(&self, today: NaiveDate) -> Option<DailyAllowance> {
        self.current_sheet()
            .map(|sheet| DailyAllowance::compute(sheet, today))
    }

    /// Computes the current sheet's allowance for `today` and stores the
    /// snapshot it proposes, if any.
    pub fn refresh_allowance(&mut self, today: NaiveDate) -> Option<DailyAllowance> {
        let allowance = self.daily_allowance(today)?;
        if let Some(snapshot) = allowance.snapshot_update.clone() {
            let _outcome = self.set_daily_allowance_snapshot(snapshot);
        }
        Some(allowance)
    }

    /// Shares the current sheet read-only, keeping its share id if it was
    /// already shared.
    pub fn enable_share<I, S>(&mut self, visibility: ShareVisibility, allowed_emails: I) -> Outcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.on_current_sheet("enable_share", |sheet| {
            sheet.share = Some(share::enable(
                sheet.share.as_ref(),
                visibility,
                allowed_emails,
            ));
            Outcome::Applied
        })
    }

    /// Stops sharing the current sheet.
    pub fn disable_share(&mut self) -> Outcome {
        self.on_current_sheet("disable_share", |sheet| {
            if sheet.share.take().is_some() {
                Outcome::Applied
            } else {
                Outcome::Ignored
            }
        })
    }

    /// Returns the current sheet's share settings.
    #[must_use]
    pub fn share_settings(&self) -> Option<&ShareSettings> {
        self.current_sheet().and_then(|sheet| sheet.share.as_ref())
    }

    /// Switches the colour scheme.
    pub fn set_theme(&mut self, theme: Theme) -> Outcome {
        self.transition("set_theme", |state| {
            state.ui_settings.theme = theme;
            Outcome::Applied
        })
    }

    /// Switches the interface language; a blank code is ignored.
    pub fn set_language(&mut self, language: &str) -> Outcome {
        let code = language.trim();
        if code.is_empty() {
            return Outcome::Ignored;
        }
        self.transition("set_language", |state| {
            code.clone_into(&mut state.ui_settings.language);
            Outcome::Applied
        })
    }

    /// Total income of the current sheet.
    #[inline]
    #[must_use]
    pub fn total_income(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::total_income)
    }

    /// Total savings of the current sheet.
    #[inline]
    #[must_use]
    pub fn total_savings(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::total_savings)
    }

    /// Total expenses of the current sheet.
    #[inline]
    #[must_use]
    pub fn total_expenses(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::total_expenses)
    }

    /// Total debts of the current sheet.
    #[inline]
    #[must_use]
    pub fn total_debts(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::total_debts)
    }

    /// Total bills of the current sheet.
    #[inline]
    #[must_use]
    pub fn total_bills(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::total_bills)
    }

    /// Remaining amount of the current sheet.
    #[inline]
    #[must_use]
    pub fn remaining_amount(&self) -> f64 {
        self.current_sheet().map_or(0.0, totals::remaining_amount)
    }

    /// Every summary number of the current sheet.
    #[must_use]
    pub fn totals(&self) -> Option<SheetTotals> {
        self.current_sheet().map(SheetTotals::of)
    }

    /// Category breakdown of the current sheet.
    #[must_use]
    pub fn category_breakdown(&self) -> Vec<CategoryShare> {
        self.current_sheet()
            .map(totals::category_breakdown)
            .unwrap_or_default()
    }
}

/// Generates the add/remove/update triplet of a plain line item kind.
macro_rules! line_item_ops {
    (
        $(
            $kind:literal: $item:ty, $draft:ty, $patch:ty =>
                $add:ident, $remove:ident, $update:ident;
        )*
    ) => {
        #[allow(
            clippy::multiple_inherent_impl,
            reason = "line item operations are generated per kind"
        )]
        impl SheetStore {
            $(
                #[doc = concat!("Appends a new ", $kind, " entry to the current sheet.")]
                pub fn $add(&mut self, draft: $draft) -> Added<ItemId> {
                    self.add_item::<$item>(stringify!($add), draft)
                }

                #[doc = concat!("Removes a ", $kind, " entry from the current sheet.")]
                pub fn $remove(&mut self, id: &ItemId) -> Outcome {
                    self.remove_item::<$item>(stringify!($remove), id)
                }

                #[doc = concat!("Merges `patch` into a ", $kind, " entry of the current sheet.")]
                pub fn $update(&mut self, id: &ItemId, patch: $patch) -> Outcome {
                    self.update_item::<$item>(stringify!($update), id, patch)
                }
            )*
        }
    };
}

line_item_ops! {
    "income": IncomeItem, NewIncome, IncomePatch => add_income, remove_income, update_income;
    "debt": DebtItem, NewDebt, DebtPatch => add_debt, remove_debt, update_debt;
    "savings": SavingsItem, NewSavings, SavingsPatch => add_savings, remove_savings, update_savings;
    "bill": BillItem, NewBill, BillPatch => add_bill, remove_bill, update_bill;
}

impl Default for SheetStore {
    #[inline]
    fn default() -> Self {
        Self::new(AppState::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Fixed calendar day used by every test.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 5).unwrap()
    }

    /// Store holding one default sheet for November 2025.
    fn store() -> SheetStore {
        SheetStore::new(AppState::for_day(today()))
    }

    /// Expense draft booked under `category`.
    fn expense(category: &str, amount: f64) -> NewExpense {
        NewExpense {
            date: "2025-11-05".to_owned(),
            description: String::new(),
            category: category.to_owned(),
            amount,
        }
    }

    /// Income draft.
    fn income(amount: f64) -> NewIncome {
        NewIncome {
            description: "Salary".to_owned(),
            amount,
        }
    }

    /// Cached total of the first category called `name`.
    fn category_total(store: &SheetStore, name: &str) -> f64 {
        store
            .current_sheet()
            .unwrap()
            .categories
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.total)
            .unwrap()
    }

    /// Id of the first category called `name`.
    fn category_id(store: &SheetStore, name: &str) -> CategoryId {
        store
            .current_sheet()
            .unwrap()
            .categories
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.id.clone())
            .unwrap()
    }

    /// Asserts that every cached total equals a from-scratch recomputation.
    fn assert_totals_consistent(store: &SheetStore) {
        let sheet = store.current_sheet().unwrap();
        let mut rebuilt = sheet.categories.clone();
        aggregation::rebuild_totals(&mut rebuilt, &sheet.expenses);
        for (cached, expected) in sheet.categories.iter().zip(&rebuilt) {
            assert!(cached.total >= 0.0, "{} went negative", cached.name);
            assert!(
                (cached.total - expected.total).abs() < 1e-9,
                "{}: cached {} != {}",
                cached.name,
                cached.total,
                expected.total
            );
        }
    }

    /// Observer remembering every published state.
    #[derive(Debug, Default)]
    struct Recorder {
        /// Published states, oldest first.
        seen: Mutex<Vec<Arc<AppState>>>,
    }

    impl StateObserver for Recorder {
        fn state_changed(&self, state: &Arc<AppState>) {
            self.seen.lock().unwrap().push(Arc::clone(state));
        }
    }

    #[test]
    fn add_then_remove_restores_zero() {
        let mut store = store();
        let added = store.add_expense(expense("Food & Dining", 50_000.0));
        assert_eq!(added.outcome, Outcome::Applied);
        assert!((category_total(&store, "Food & Dining") - 50_000.0).abs() < f64::EPSILON);

        assert_eq!(store.remove_expense(&added.id), Outcome::Applied);
        assert!(category_total(&store, "Food & Dining") == 0.0);
        assert!(store.current_sheet().unwrap().expenses.is_empty());
    }

    #[test]
    fn category_switch_on_update() {
        let mut store = store();
        let _a = store.add_category("A");
        let _b = store.add_category("B");
        let _seed = store.add_expense(expense("A", 100.0));
        let added = store.add_expense(expense("A", 100.0));
        assert!((category_total(&store, "A") - 200.0).abs() < f64::EPSILON);

        let outcome = store.update_expense(
            &added.id,
            ExpensePatch {
                category: Some("B".to_owned()),
                ..ExpensePatch::default()
            },
        );
        assert_eq!(outcome, Outcome::Applied);
        assert!((category_total(&store, "A") - 100.0).abs() < f64::EPSILON);
        assert!((category_total(&store, "B") - 100.0).abs() < f64::EPSILON);
        assert_eq!(store.current_sheet().unwrap().expenses[1].category, "B");
    }

    #[test]
    fn orphan_expense_is_stored_without_totals() {
        let mut store = store();
        let before = store.current_sheet().unwrap().categories.clone();
        let added = store.add_expense(expense("Nonexistent", 500.0));
        assert_eq!(added.outcome, Outcome::Orphaned);
        let sheet = store.current_sheet().unwrap();
        assert_eq!(sheet.expenses.len(), 1);
        assert_eq!(sheet.categories, before);
        assert!((store.total_expenses() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn last_sheet_cannot_be_removed() {
        let mut store = store();
        let id = store.state().current_sheet_id.clone();
        assert_eq!(store.remove_sheet(&id), Outcome::Ignored);
        assert_eq!(store.state().sheets.len(), 1);
        assert_eq!(store.state().current_sheet_id, id);
    }

    #[test]
    fn removing_current_sheet_moves_to_first() {
        let mut store = store();
        let first = store.state().current_sheet_id.clone();
        let second = store.add_sheet(None).id;
        let third = store.add_sheet(Some("  March ")).id;
        assert_eq!(store.state().current_sheet_id, third);
        assert_eq!(store.current_sheet().unwrap().name, "March");

        assert_eq!(store.remove_sheet(&third), Outcome::Applied);
        assert_eq!(store.state().current_sheet_id, first);
        assert_eq!(store.remove_sheet(&SheetId::from("nope")), Outcome::NotFound);
        assert_eq!(store.remove_sheet(&second), Outcome::Applied);
        assert_eq!(store.state().sheets.len(), 1);
        assert!(store.current_sheet().is_some());
    }

    #[test]
    fn added_sheets_get_numbered_names() {
        let mut store = store();
        let _second = store.add_sheet(None);
        let _third = store.add_sheet(Some("   "));
        let names: Vec<_> = store.state().sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Sheet 1", "Sheet 2", "Sheet 3"]);
    }

    #[test]
    fn set_current_sheet_ignores_unknown_ids() {
        let mut store = store();
        let first = store.state().current_sheet_id.clone();
        let second = store.add_sheet(None).id;
        assert_eq!(store.set_current_sheet(&first), Outcome::Applied);
        assert_eq!(store.state().current_sheet_id, first);
        assert_eq!(
            store.set_current_sheet(&SheetId::from("missing")),
            Outcome::NotFound
        );
        assert_eq!(store.state().current_sheet_id, first);
        assert_eq!(store.set_current_sheet(&second), Outcome::Applied);
        assert_eq!(store.state().current_sheet_id, second);
    }

    #[test]
    fn rename_with_blank_name_is_a_no_op() {
        let mut store = store();
        let id = store.state().current_sheet_id.clone();
        assert_eq!(store.rename_sheet(&id, ""), Outcome::Ignored);
        assert_eq!(store.rename_sheet(&id, " \t "), Outcome::Ignored);
        assert_eq!(store.current_sheet().unwrap().name, "Sheet 1");
        assert_eq!(store.rename_sheet(&id, "  Budget  "), Outcome::Applied);
        assert_eq!(store.current_sheet().unwrap().name, "Budget");
    }

    #[test]
    fn remaining_amount_formula() {
        let mut store = store();
        let _i = store.add_income(income(10_000_000.0));
        let _n = store.add_income(income(-1_000.0));
        let _s = store.add_savings(NewSavings {
            description: "Fund".to_owned(),
            amount: 3_000_000.0,
        });
        let _d = store.add_debt(NewDebt {
            description: "Loan".to_owned(),
            amount: 1_200_000.0,
            date: String::new(),
        });
        let _b = store.add_bill(NewBill {
            description: "Power".to_owned(),
            amount: 450_000.0,
            date: "2025-11-20".to_owned(),
        });
        let _e = store.add_expense(expense("Shopping", 82_000.0));
        let expected = store.total_income()
            - store.total_savings()
            - store.total_expenses()
            - store.total_debts()
            - store.total_bills();
        assert!((store.remaining_amount() - expected).abs() < f64::EPSILON);
        assert!((store.remaining_amount() - 5_267_000.0).abs() < 1e-6);
        assert!((store.totals().unwrap().remaining - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn plain_items_update_and_remove() {
        let mut store = store();
        let id = store.add_bill(NewBill::default()).id;
        let patch = BillPatch {
            amount: Some(99.0),
            ..BillPatch::default()
        };
        assert_eq!(store.update_bill(&id, patch.clone()), Outcome::Applied);
        assert!((store.total_bills() - 99.0).abs() < f64::EPSILON);
        assert_eq!(
            store.update_bill(&ItemId::from("missing"), patch),
            Outcome::NotFound
        );
        assert_eq!(store.remove_bill(&ItemId::from("missing")), Outcome::NotFound);
        assert_eq!(store.remove_bill(&id), Outcome::Applied);
        assert!(store.total_bills() == 0.0);
    }

    #[test]
    fn totals_stay_consistent_over_edit_sequences() {
        let mut store = store();
        let food = "Food & Dining";
        let a = store.add_expense(expense(food, 120.0)).id;
        assert_totals_consistent(&store);
        let b = store.add_expense(expense("Shopping", 80.0)).id;
        assert_totals_consistent(&store);
        let _c = store.add_expense(expense(food, 30.0));
        assert_totals_consistent(&store);
        let _u = store.update_expense(
            &a,
            ExpensePatch {
                amount: Some(60.0),
                ..ExpensePatch::default()
            },
        );
        assert_totals_consistent(&store);
        let _u = store.update_expense(
            &b,
            ExpensePatch {
                category: Some(food.to_owned()),
                amount: Some(10.0),
                ..ExpensePatch::default()
            },
        );
        assert_totals_consistent(&store);
        let _u = store.update_expense(
            &b,
            ExpensePatch {
                description: Some("note".to_owned()),
                ..ExpensePatch::default()
            },
        );
        assert_totals_consistent(&store);
        let _r = store.remove_expense(&a);
        assert_totals_consistent(&store);
        assert!((category_total(&store, food) - 40.0).abs() < 1e-9);
        assert!(category_total(&store, "Shopping") == 0.0);
    }

    #[test]
    fn totals_never_go_negative() {
        let mut store = store();
        let id = store.add_expense(expense("Others", -50.0)).id;
        assert!(category_total(&store, "Others") == 0.0);
        let _u = store.update_expense(
            &id,
            ExpensePatch {
                amount: Some(-10.0),
                ..ExpensePatch::default()
            },
        );
        assert!(category_total(&store, "Others") >= 0.0);
        let _r = store.remove_expense(&id);
        assert!(category_total(&store, "Others") >= 0.0);
    }

    #[test]
    fn removing_category_orphans_expenses() {
        let mut store = store();
        let _e = store.add_expense(expense("Healthcare", 70.0));
        let id = category_id(&store, "Healthcare");
        assert_eq!(store.remove_category(&id), Outcome::Applied);
        assert_eq!(store.remove_category(&id), Outcome::NotFound);
        let sheet = store.current_sheet().unwrap();
        assert_eq!(sheet.expenses.len(), 1);
        assert_eq!(sheet.categories.len(), 5);
    }

    #[test]
    fn renamed_category_does_not_reattach_until_rebuild() {
        let mut store = store();
        let _e = store.add_expense(expense("Old", 70.0));
        let id = category_id(&store, "Others");
        assert_eq!(store.update_category(&id, "Old"), Outcome::Applied);
        assert!(category_total(&store, "Old") == 0.0);
        assert_eq!(store.rebuild_category_totals(), Outcome::Applied);
        assert!((category_total(&store, "Old") - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn every_applied_transition_replaces_the_state() {
        let recorder = Arc::new(Recorder::default());
        let mut store = store().with_observer(Arc::clone(&recorder));
        let before = Arc::clone(store.state());

        let _added = store.add_income(income(1.0));
        assert!(!Arc::ptr_eq(&before, store.state()));
        assert!(before.current_sheet().unwrap().income.is_empty());

        let _ignored = store.rename_sheet(&before.current_sheet_id, "");
        let _missing = store.remove_income(&ItemId::from("missing"));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(Arc::ptr_eq(&seen[0], store.state()));
    }

    #[test]
    fn cleared_observers_see_nothing() {
        let recorder = Arc::new(Recorder::default());
        let mut store = store().with_observer(Arc::clone(&recorder));
        let _added = store.add_income(income(1.0));
        store.clear_observers();
        let _second = store.add_income(income(2.0));
        store.publish();
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn period_update_replaces_settings() {
        let mut store = store();
        assert_eq!(
            store.update_period("2025-11-10", "2025-12-09"),
            Outcome::Applied
        );
        let period = &store.current_sheet().unwrap().period_settings;
        assert_eq!(period.start_date, "2025-11-10");
        assert_eq!(period.end_date, "2025-12-09");
    }

    #[test]
    fn refresh_allowance_freezes_for_the_day() {
        let mut store = store();
        let _p = store.update_period("2025-11-01", "2025-11-10");
        let _i = store.add_income(income(300_000.0));
        let first = store.refresh_allowance(today()).unwrap();
        assert!((first.daily - 30_000.0).abs() < f64::EPSILON);
        assert!(store.current_sheet().unwrap().allowance_snapshot.is_some());

        let _e = store.add_expense(expense("Others", 200_000.0));
        let second = store.refresh_allowance(today()).unwrap();
        assert!(second.frozen);
        assert!((second.daily - 30_000.0).abs() < f64::EPSILON);
        assert!((second.next_day - 11_111.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_setter_overwrites() {
        let mut store = store();
        let snapshot = AllowanceSnapshot::new(today(), 123.0);
        assert_eq!(
            store.set_daily_allowance_snapshot(snapshot.clone()),
            Outcome::Applied
        );
        assert_eq!(
            store.current_sheet().unwrap().allowance_snapshot,
            Some(snapshot)
        );
    }

    #[test]
    fn share_lifecycle() {
        let mut store = store();
        assert_eq!(store.disable_share(), Outcome::Ignored);
        let _on = store.enable_share(ShareVisibility::Public, core::iter::empty::<&str>());
        let id = store.share_settings().unwrap().id.clone();
        let _again = store.enable_share(ShareVisibility::Invited, [" A@B.C "]);
        let share = store.share_settings().unwrap();
        assert_eq!(share.id, id);
        assert_eq!(share.allowed_emails, vec!["a@b.c".to_owned()]);
        assert_eq!(store.disable_share(), Outcome::Applied);
        assert!(store.share_settings().is_none());
    }

    #[test]
    fn ui_settings() {
        let mut store = store();
        assert_eq!(store.set_theme(Theme::Dark), Outcome::Applied);
        assert_eq!(store.set_language(" vi "), Outcome::Applied);
        assert_eq!(store.set_language(""), Outcome::Ignored);
        assert_eq!(store.state().ui_settings.theme, Theme::Dark);
        assert_eq!(store.state().ui_settings.language, "vi");
    }

    #[test]
    fn breakdown_follows_expenses() {
        let mut store = store();
        let _a = store.add_expense(expense("Shopping", 30.0));
        let _b = store.add_expense(expense("Transportation", 10.0));
        let breakdown = store.category_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert!((breakdown[0].percent - 25.0).abs() < 1e-9);
        assert_eq!(breakdown[1].name, "Shopping");
    }
}

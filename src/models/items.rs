//! Line item models: income, debts, savings, bills and expenses.
//!
//! Every kind comes in three shapes generated by one macro: the stored
//! item (with an [`ItemId`]), a draft used to add a new item (no id yet),
//! and a patch whose fields are all optional, merged into an existing item
//! on update.

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Common behaviour of every line item kind, used by the sheet store to
/// implement add/remove/update once for all collections.
pub trait LineItem: Clone + core::fmt::Debug {
    /// Item without an id, as supplied by the presentation layer.
    type Draft;
    /// Partial update merged into an existing item.
    type Patch;

    /// Returns the item's identifier.
    fn id(&self) -> &ItemId;

    /// Returns the item's amount.
    fn amount(&self) -> f64;

    /// Builds a stored item from a draft and a freshly generated id.
    fn from_draft(id: ItemId, draft: Self::Draft) -> Self;

    /// Merges every field set in `patch` into this item.
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Generates the item, draft and patch types of one line item kind.
macro_rules! define_line_item {
    (
        $(#[$meta:meta])*
        $item:ident, $draft:ident, $patch:ident {
            $(
                #[doc = $field_doc:expr]
                $field:ident: $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $item {
            /// Unique identifier within the collection.
            pub id: ItemId,
            $(
                #[doc = $field_doc]
                #[serde(default)]
                pub $field: $ty,
            )*
        }

        #[doc = concat!("A [`", stringify!($item), "`] that has not been stored yet.")]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $draft {
            $(
                #[doc = $field_doc]
                pub $field: $ty,
            )*
        }

        #[doc = concat!("Partial update of a [`", stringify!($item), "`]; unset fields are left untouched.")]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $patch {
            $(
                #[doc = $field_doc]
                pub $field: Option<$ty>,
            )*
        }

        impl LineItem for $item {
            type Draft = $draft;
            type Patch = $patch;

            #[inline]
            fn id(&self) -> &ItemId {
                &self.id
            }

            #[inline]
            fn amount(&self) -> f64 {
                self.amount
            }

            #[inline]
            fn from_draft(id: ItemId, draft: $draft) -> Self {
                Self {
                    id,
                    $( $field: draft.$field, )*
                }
            }

            #[inline]
            fn apply_patch(&mut self, patch: $patch) {
                $(
                    if let Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }
    };
}

define_line_item! {
    /// A source of income for the sheet's period.
    IncomeItem, NewIncome, IncomePatch {
        /// Free-text description.
        description: String,
        /// Amount received.
        amount: f64,
    }
}

define_line_item! {
    /// A debt repayment due within the period.
    DebtItem, NewDebt, DebtPatch {
        /// Free-text description.
        description: String,
        /// Amount owed.
        amount: f64,
        /// Due date (ISO date) or empty.
        date: String,
    }
}

define_line_item! {
    /// Money set aside during the period.
    SavingsItem, NewSavings, SavingsPatch {
        /// Free-text description.
        description: String,
        /// Amount saved.
        amount: f64,
    }
}

define_line_item! {
    /// A recurring bill due within the period.
    BillItem, NewBill, BillPatch {
        /// Free-text description.
        description: String,
        /// Amount due.
        amount: f64,
        /// Due date (ISO date) or empty.
        date: String,
    }
}

define_line_item! {
    /// A categorized day-to-day expense.
    ///
    /// `category` references a [`super::Category`] by name, not by id.
    ExpenseItem, NewExpense, ExpensePatch {
        /// Date the money was spent.
        date: String,
        /// Free-text description.
        description: String,
        /// Name of the category this expense is booked under.
        category: String,
        /// Amount spent.
        amount: f64,
    }
}

impl ExpensePatch {
    /// Returns `true` if applying this patch can change category totals.
    #[inline]
    #[must_use]
    pub const fn affects_totals(&self) -> bool {
        self.category.is_some() || self.amount.is_some()
    }
}

//! Newtype wrappers for entity identifiers.
//!
//! These prevent accidentally mixing up IDs of different entity types
//! at compile time. All identifiers are opaque strings; freshly generated
//! ones are a base-36 millisecond timestamp followed by a random base-36
//! suffix.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapping a `String` inner type.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Generates a fresh identifier that is unique within this process.
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self(generate_raw())
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_string_id! {
    /// Unique identifier for a budget sheet.
    SheetId
}

define_string_id! {
    /// Unique identifier for an expense category within a sheet.
    CategoryId
}

define_string_id! {
    /// Unique identifier for a line item (income, debt, savings, bill or
    /// expense) within its collection.
    ItemId
}

define_string_id! {
    /// Public identifier of a shared read-only sheet snapshot.
    ShareId
}

define_string_id! {
    /// Stable key of the user whose state is loaded and saved.
    UserKey
}

/// Key used for the anonymous, local-only identity.
pub const LOCAL_USER: &str = "local";

/// Produces a collision-resistant identifier string.
fn generate_raw() -> String {
    let millis = u128::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let random = uuid::Uuid::new_v4().as_u128() >> 64_u32;
    format!("{}{}", to_base36(millis), to_base36(random))
}

/// Renders an unsigned integer in lowercase base 36.
fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = u32::try_from(value.rem_euclid(36)).unwrap_or_default();
        digits.push(char::from_digit(digit, 36).unwrap_or('0'));
        value = value.div_euclid(36);
    }
    digits.iter().rev().collect()
}

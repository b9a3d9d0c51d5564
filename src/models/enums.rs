//! Enumeration types for constrained values.

use serde::{Deserialize, Serialize};

/// Colour scheme of the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    /// Light scheme.
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

/// Who may open a shared sheet link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShareVisibility {
    /// Anyone holding the link, signed in or not.
    #[default]
    Public,
    /// Any signed-in viewer holding the link.
    Restricted,
    /// Only signed-in viewers whose email is on the allow list.
    Invited,
}

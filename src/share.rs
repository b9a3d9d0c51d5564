//! Read-only sheet sharing.
//!
//! A shared sheet carries [`ShareSettings`]; the persistence layer
//! publishes a [`SharedSheet`] snapshot under the share id so that a link
//! holder can open it without access to the owner's state. Who may open
//! it is decided by [`can_view`].

use serde::{Deserialize, Serialize};

use crate::models::{ShareId, ShareSettings, ShareVisibility, Sheet, UserKey};

/// Lowercases and trims emails, dropping blank entries.
#[must_use]
pub fn normalize_emails<I, S>(emails: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    emails
        .into_iter()
        .map(|email| email.as_ref().trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

/// Builds the share settings of a sheet being (re-)shared.
///
/// The existing share id is kept so that links already handed out stay
/// valid; a new id is generated the first time a sheet is shared.
#[must_use]
pub fn enable<I, S>(
    existing: Option<&ShareSettings>,
    visibility: ShareVisibility,
    allowed_emails: I,
) -> ShareSettings
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ShareSettings {
        id: existing.map_or_else(ShareId::generate, |share| share.id.clone()),
        visibility,
        allowed_emails: normalize_emails(allowed_emails),
    }
}

/// Decides whether a viewer may open a shared sheet.
///
/// `viewer_email` is the signed-in viewer's email, or `None` for an
/// anonymous visitor.
#[must_use]
pub fn can_view(share: &ShareSettings, viewer_email: Option<&str>) -> bool {
    match share.visibility {
        ShareVisibility::Public => true,
        ShareVisibility::Restricted => viewer_email.is_some(),
        ShareVisibility::Invited => viewer_email.is_some_and(|email| {
            let normalized = email.trim().to_lowercase();
            share.allowed_emails.iter().any(|allowed| *allowed == normalized)
        }),
    }
}

/// Published read-only snapshot of a shared sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSheet {
    /// Owner of the sheet.
    pub owner: UserKey,
    /// The sheet as it was when last published.
    pub sheet: Sheet,
}

impl SharedSheet {
    /// Returns the share settings the snapshot was published with.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> Option<&ShareSettings> {
        self.sheet.share.as_ref()
    }

    /// Returns `true` if `viewer_email` may open this snapshot.
    ///
    /// A snapshot without share settings is never viewable.
    #[inline]
    #[must_use]
    pub fn is_viewable_by(&self, viewer_email: Option<&str>) -> bool {
        self.settings()
            .is_some_and(|share| can_view(share, viewer_email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NaiveDate;

    /// Freshly enabled share settings.
    fn settings(visibility: ShareVisibility, emails: &[&str]) -> ShareSettings {
        enable(None, visibility, emails.iter().copied())
    }

    #[test]
    fn emails_are_trimmed_lowercased_and_filtered() {
        let emails = normalize_emails([" Alice@Example.com ", "", "  ", "bob@example.com"]);
        assert_eq!(emails, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn enable_keeps_existing_id() {
        let first = settings(ShareVisibility::Public, &[]);
        let second = enable(Some(&first), ShareVisibility::Invited, ["x@y.z"]);
        assert_eq!(first.id, second.id);
        assert_eq!(second.visibility, ShareVisibility::Invited);
    }

    #[test]
    fn enable_generates_id_first_time() {
        let a = settings(ShareVisibility::Public, &[]);
        let b = settings(ShareVisibility::Public, &[]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn public_is_open_to_anyone() {
        let share = settings(ShareVisibility::Public, &[]);
        assert!(can_view(&share, None));
        assert!(can_view(&share, Some("someone@example.com")));
    }

    #[test]
    fn restricted_needs_sign_in() {
        let share = settings(ShareVisibility::Restricted, &[]);
        assert!(!can_view(&share, None));
        assert!(can_view(&share, Some("someone@example.com")));
    }

    #[test]
    fn invited_needs_listed_email() {
        let share = settings(ShareVisibility::Invited, &["Friend@Example.com"]);
        assert!(!can_view(&share, None));
        assert!(!can_view(&share, Some("stranger@example.com")));
        assert!(can_view(&share, Some(" FRIEND@example.com")));
    }

    #[test]
    fn snapshot_without_settings_is_hidden() {
        let sheet = Sheet::for_day("Nov", NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        let snapshot = SharedSheet {
            owner: UserKey::from("owner"),
            sheet,
        };
        assert!(!snapshot.is_viewable_by(Some("owner@example.com")));
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let mut sheet = Sheet::for_day("Nov", NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        sheet.share = Some(settings(ShareVisibility::Restricted, &[]));
        let snapshot = SharedSheet {
            owner: UserKey::from("owner"),
            sheet,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SharedSheet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(back.is_viewable_by(Some("anyone@example.com")));
    }
}

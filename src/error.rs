//! Error types for the trackly library.

/// All errors that can occur when loading, saving or sharing budget state.
///
/// Sheet mutations never fail: unknown targets and orphaned category
/// references degrade to no-ops reported through
/// [`crate::store::Outcome`]. Errors only surface at the storage and
/// session boundaries.
#[derive(Debug, thiserror::Error)]
pub enum TracklyError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// The operation requires a signed-in session.
    #[error("no user is signed in")]
    SignedOut,

    /// The viewer is not allowed to open a shared sheet.
    #[error("not allowed to view shared sheet {0}")]
    ShareDenied(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, TracklyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = TracklyError::from(serde_err);
        assert!(matches!(err, TracklyError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let err = TracklyError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("read-only volume"));
    }

    #[test]
    fn error_share_denied_display() {
        let err = TracklyError::ShareDenied("sh-1".to_owned());
        assert_eq!(err.to_string(), "not allowed to view shared sheet sh-1");
    }

    #[test]
    fn error_signed_out_display() {
        assert!(TracklyError::SignedOut.to_string().contains("signed in"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TracklyError>();
    }
}

//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the storage traits. Ideal for unit and integration tests where file I/O
//! is undesirable.

use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{Result, TracklyError};
use crate::models::{ShareId, UserKey};

/// Thread-safe in-memory storage for testing.
///
/// This type implements both [`super::Storage`] (async) and
/// [`super::BlockingStorage`] (blocking) traits, providing a zero-setup
/// storage backend for tests.
///
/// # Example
///
/// ```rust
/// use trackly::models::UserKey;
/// use trackly::storage::{BlockingStorage, InMemoryStorage};
///
/// let storage = InMemoryStorage::new();
/// let user = UserKey::from("local");
/// storage.save(&user, "{}".to_owned()).unwrap();
/// assert_eq!(storage.load(&user).unwrap().as_deref(), Some("{}"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// State blobs by user.
    users: HashMap<UserKey, String>,
    /// Published snapshots by share id.
    shared: HashMap<ShareId, String>,
    /// Number of successful writes, for assertions on save traffic.
    writes: usize,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many writes (saves and removals) have succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn write_count(&self) -> Result<usize> {
        self.with_lock(|inner| inner.writes)
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Inner) -> R>(&self, op: F) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut inner))
    }

    /// Reads the blob of `user`.
    fn read_user(&self, user: &UserKey) -> Result<Option<String>> {
        self.with_lock(|inner| inner.users.get(user).cloned())
    }

    /// Stores the blob of `user`.
    fn write_user(&self, user: &UserKey, blob: String) -> Result<()> {
        self.with_lock(|inner| {
            let _previous = inner.users.insert(user.clone(), blob);
            inner.writes = inner.writes.saturating_add(1);
        })
    }

    /// Reads the snapshot published under `share`.
    fn read_shared(&self, share: &ShareId) -> Result<Option<String>> {
        self.with_lock(|inner| inner.shared.get(share).cloned())
    }

    /// Publishes a snapshot under `share`.
    fn write_shared(&self, share: &ShareId, blob: String) -> Result<()> {
        self.with_lock(|inner| {
            let _previous = inner.shared.insert(share.clone(), blob);
            inner.writes = inner.writes.saturating_add(1);
        })
    }

    /// Retracts the snapshot published under `share`.
    fn delete_shared(&self, share: &ShareId) -> Result<()> {
        self.with_lock(|inner| {
            let _previous = inner.shared.remove(share);
            inner.writes = inner.writes.saturating_add(1);
        })
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> TracklyError {
    TracklyError::Storage(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

impl super::BlockingStorage for InMemoryStorage {
    #[inline]
    fn load(&self, user: &UserKey) -> Result<Option<String>> {
        self.read_user(user)
    }

    #[inline]
    fn save(&self, user: &UserKey, blob: String) -> Result<()> {
        self.write_user(user, blob)
    }

    #[inline]
    fn load_shared(&self, share: &ShareId) -> Result<Option<String>> {
        self.read_shared(share)
    }

    #[inline]
    fn save_shared(&self, share: &ShareId, blob: String) -> Result<()> {
        self.write_shared(share, blob)
    }

    #[inline]
    fn remove_shared(&self, share: &ShareId) -> Result<()> {
        self.delete_shared(share)
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for InMemoryStorage {
    #[inline]
    fn load(&self, user: &UserKey) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.read_user(user))
    }

    #[inline]
    fn save(&self, user: &UserKey, blob: String) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write_user(user, blob))
    }

    #[inline]
    fn load_shared(&self, share: &ShareId) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.read_shared(share))
    }

    #[inline]
    fn save_shared(
        &self,
        share: &ShareId,
        blob: String,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write_shared(share, blob))
    }

    #[inline]
    fn remove_shared(&self, share: &ShareId) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.delete_shared(share))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Key of the user most tests write for.
    fn alice() -> UserKey {
        UserKey::from("alice")
    }

    mod blocking {
        use super::*;
        use crate::storage::BlockingStorage;

        #[test]
        fn load_missing_is_none() {
            let s = InMemoryStorage::new();
            assert!(s.load(&alice()).unwrap().is_none());
            assert!(s.load_shared(&ShareId::from("nope")).unwrap().is_none());
        }

        #[test]
        fn save_replaces_previous_blob() {
            let s = InMemoryStorage::new();
            s.save(&alice(), "one".to_owned()).unwrap();
            s.save(&alice(), "two".to_owned()).unwrap();
            assert_eq!(s.load(&alice()).unwrap().as_deref(), Some("two"));
            assert_eq!(s.write_count().unwrap(), 2);
        }

        #[test]
        fn users_are_isolated() {
            let s = InMemoryStorage::new();
            s.save(&alice(), "a".to_owned()).unwrap();
            assert!(s.load(&UserKey::from("bob")).unwrap().is_none());
        }

        #[test]
        fn shared_snapshot_lifecycle() {
            let s = InMemoryStorage::new();
            let share = ShareId::from("sh-1");
            s.save_shared(&share, "snap".to_owned()).unwrap();
            assert_eq!(s.load_shared(&share).unwrap().as_deref(), Some("snap"));
            s.remove_shared(&share).unwrap();
            assert!(s.load_shared(&share).unwrap().is_none());
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::storage::Storage;

        #[tokio::test]
        async fn save_and_load() {
            let s = InMemoryStorage::new();
            s.save(&alice(), "blob".to_owned()).await.unwrap();
            assert_eq!(s.load(&alice()).await.unwrap().as_deref(), Some("blob"));
        }

        #[tokio::test]
        async fn shared_snapshot_lifecycle() {
            let s = InMemoryStorage::new();
            let share = ShareId::from("sh-1");
            s.save_shared(&share, "snap".to_owned()).await.unwrap();
            assert!(s.load_shared(&share).await.unwrap().is_some());
            s.remove_shared(&share).await.unwrap();
            assert!(s.load_shared(&share).await.unwrap().is_none());
        }
    }
}

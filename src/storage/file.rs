//! JSON-file-based storage backend.
//!
//! Stores each user's state blob and each published share snapshot in its
//! own file under a configurable directory (default:
//! `$XDG_DATA_HOME/trackly/`).

#[cfg(feature = "async")]
use core::future::Future;
use core::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, TracklyError};
use crate::models::{ShareId, UserKey};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "trackly";
/// Subdirectory holding one state file per user.
const USERS_DIR: &str = "users";
/// Subdirectory holding one snapshot file per shared sheet.
const SHARED_DIR: &str = "shared";
/// Extension of every data file.
const EXTENSION: &str = "json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed storage that persists state blobs as JSON files.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Read operations acquire a shared lock (allowing concurrent readers),
/// while write operations acquire an exclusive lock. Writes go to a
/// temporary file first and are renamed into place, so a crash never
/// leaves a half-written blob behind.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock          (cross-process lock sentinel)
///   users/
///     <user key>.json     (one serialized state per user)
///   shared/
///     <share id>.json     (one published snapshot per shared sheet)
/// ```
///
/// User keys are percent-encoded into file names, so any key (an email,
/// an auth provider uid) maps to exactly one file.
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all data files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory tree if it does not exist. Also opens (or
    /// creates) the `storage.lock` sentinel file used for cross-process
    /// advisory locking.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(dir.join(USERS_DIR)).map_err(storage_io_error)?;
        fs::create_dir_all(dir.join(SHARED_DIR)).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/trackly/` (typically
    /// `~/.local/share/trackly/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                TracklyError::Storage("could not determine platform data directory".into())
            })
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the state file of `user`.
    fn user_path(&self, user: &UserKey) -> PathBuf {
        self.dir
            .join(USERS_DIR)
            .join(file_name(user.as_inner()))
    }

    /// Returns the snapshot file of `share`.
    fn shared_path(&self, share: &ShareId) -> PathBuf {
        self.dir
            .join(SHARED_DIR)
            .join(file_name(share.as_inner()))
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Only surface the unlock error when the operation succeeded;
        // otherwise the original error is more useful.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a blob file. Returns `None` if the file does not exist.
    fn read_blob(&self, path: PathBuf) -> Result<Option<String>> {
        self.with_shared_lock(|| match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        })
    }

    /// Atomically writes a blob file (write-to-tmp then rename).
    fn write_blob(&self, path: PathBuf, blob: &str) -> Result<()> {
        self.with_exclusive_lock(|| {
            let tmp_path = path.with_extension(format!("{EXTENSION}.tmp"));
            fs::write(&tmp_path, blob).map_err(storage_io_error)?;
            fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
            tracing::trace!(path = %path.display(), bytes = blob.len(), "blob written");
            Ok(())
        })
    }

    /// Deletes a blob file. A missing file is not an error.
    fn delete_blob(&self, path: PathBuf) -> Result<()> {
        self.with_exclusive_lock(|| match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_io_error(err)),
        })
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Maps a key to a file name, percent-encoding every byte outside
/// `[A-Za-z0-9_-]`.
fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len().saturating_add(EXTENSION.len()).saturating_add(1));
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            name.push(char::from(byte));
        } else {
            // Writing to a String cannot fail.
            let _infallible = write!(name, "%{byte:02X}");
        }
    }
    name.push('.');
    name.push_str(EXTENSION);
    name
}

/// Wraps an I/O error into a [`TracklyError::Storage`].
fn storage_io_error(err: std::io::Error) -> TracklyError {
    TracklyError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`TracklyError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> TracklyError {
    TracklyError::Storage(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

impl super::BlockingStorage for FileStorage {
    #[inline]
    fn load(&self, user: &UserKey) -> Result<Option<String>> {
        self.read_blob(self.user_path(user))
    }

    #[inline]
    fn save(&self, user: &UserKey, blob: String) -> Result<()> {
        self.write_blob(self.user_path(user), &blob)
    }

    #[inline]
    fn load_shared(&self, share: &ShareId) -> Result<Option<String>> {
        self.read_blob(self.shared_path(share))
    }

    #[inline]
    fn save_shared(&self, share: &ShareId, blob: String) -> Result<()> {
        self.write_blob(self.shared_path(share), &blob)
    }

    #[inline]
    fn remove_shared(&self, share: &ShareId) -> Result<()> {
        self.delete_blob(self.shared_path(share))
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for FileStorage {
    #[inline]
    fn load(&self, user: &UserKey) -> impl Future<Output = Result<Option<String>>> + Send {
        core::future::ready(self.read_blob(self.user_path(user)))
    }

    #[inline]
    fn save(&self, user: &UserKey, blob: String) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.write_blob(self.user_path(user), &blob))
    }

    #[inline]
    fn load_shared(&self, share: &ShareId) -> impl Future<Output = Result<Option<String>>> + Send {
        core::future::ready(self.read_blob(self.shared_path(share)))
    }

    #[inline]
    fn save_shared(
        &self,
        share: &ShareId,
        blob: String,
    ) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.write_blob(self.shared_path(share), &blob))
    }

    #[inline]
    fn remove_shared(&self, share: &ShareId) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.delete_blob(self.shared_path(share)))
    }
}

//! State (de)serialization, load-time migration and save observers.
//!
//! Loading never hands a caller a broken state: a missing blob becomes a
//! fresh default (saved right away), a legacy single-sheet blob is migrated
//! (and saved right away), and an unreadable blob is replaced by a default
//! that is *not* saved until the next mutation, so the bad blob can still
//! be inspected.
//!
//! Saving is driven by [`StateObserver`]s attached to a
//! [`SheetStore`](crate::store::SheetStore): [`BlockingPersister`] writes
//! synchronously, while `QueuedPersister` (feature `async`) hands states to
//! a single worker task that applies them strictly in issuance order.
//! Either way a failed save is logged and dropped; the next mutation's save
//! supersedes it.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TracklyError};
use crate::models::{AppState, LegacyState, ShareId, UserKey};
use crate::share::SharedSheet;
use crate::storage::BlockingStorage;
use crate::store::StateObserver;

/// Top-level key that only multi-sheet blobs carry.
const SHEETS_KEY: &str = "sheets";

/// Where a loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// Parsed from a stored multi-sheet blob.
    Stored,
    /// Migrated from a stored legacy single-sheet blob.
    Migrated,
    /// Nothing was stored; a default state was created.
    Created,
    /// The stored blob was unreadable; a default state replaced it.
    Recovered,
}

/// A state ready to be handed to a sheet store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedState {
    /// The normalized state.
    pub state: AppState,
    /// How it was obtained.
    pub origin: StateOrigin,
}

impl LoadedState {
    /// Returns `true` if the state differs from what storage holds and was
    /// written back during the load.
    #[inline]
    #[must_use]
    pub const fn was_written_back(&self) -> bool {
        matches!(self.origin, StateOrigin::Migrated | StateOrigin::Created)
    }
}

/// Serializes a state into the blob handed to storage.
///
/// # Errors
///
/// Returns an error if serialization fails.
#[inline]
pub fn serialize_state(state: &AppState) -> Result<String> {
    serde_json::to_string(state).map_err(TracklyError::from)
}

/// Parses a stored blob, migrating the legacy single-sheet shape.
///
/// A blob is legacy when it is a JSON object without a `sheets` key. The
/// result is always normalized. Parsing a blob produced by
/// [`serialize_state`] after a migration is a plain parse, so migration is
/// idempotent.
///
/// # Errors
///
/// Returns an error if the blob is not valid JSON or has the wrong shape.
pub fn parse_state(blob: &str) -> Result<LoadedState> {
    let value: serde_json::Value = serde_json::from_str(blob)?;
    let legacy = value
        .as_object()
        .is_some_and(|object| !object.contains_key(SHEETS_KEY));
    if legacy {
        let old: LegacyState = serde_json::from_value(value)?;
        tracing::info!("migrating single-sheet state");
        Ok(LoadedState {
            state: old.into_app_state().normalized(),
            origin: StateOrigin::Migrated,
        })
    } else {
        let state: AppState = serde_json::from_value(value)?;
        Ok(LoadedState {
            state: state.normalized(),
            origin: StateOrigin::Stored,
        })
    }
}

/// Turns the raw result of a storage read into a loaded state.
fn resolve(user: &UserKey, blob: Option<String>) -> LoadedState {
    let Some(raw) = blob else {
        tracing::info!(%user, "no stored state, creating default");
        return LoadedState {
            state: AppState::new(),
            origin: StateOrigin::Created,
        };
    };
    match parse_state(&raw) {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::warn!(%user, %err, "stored state is unreadable, falling back to default");
            LoadedState {
                state: AppState::new(),
                origin: StateOrigin::Recovered,
            }
        }
    }
}

/// Loads the state of `user`, writing back a created or migrated state.
///
/// # Errors
///
/// Returns an error only if the storage read itself fails. A failed
/// write-back is logged and ignored.
#[tracing::instrument(skip_all, fields(%user))]
pub fn load_state_blocking<S: BlockingStorage + ?Sized>(
    storage: &S,
    user: &UserKey,
) -> Result<LoadedState> {
    let loaded = resolve(user, storage.load(user)?);
    if loaded.was_written_back() {
        let written = serialize_state(&loaded.state).and_then(|blob| storage.save(user, blob));
        if let Err(err) = written {
            tracing::warn!(%err, "failed to write back loaded state");
        }
    }
    tracing::debug!(origin = ?loaded.origin, sheets = loaded.state.sheets.len(), "state loaded");
    Ok(loaded)
}

/// Decodes a published snapshot and applies the access policy.
fn open_snapshot(
    share: &ShareId,
    blob: Option<String>,
    viewer_email: Option<&str>,
) -> Result<Option<SharedSheet>> {
    let Some(raw) = blob else {
        tracing::warn!(%share, "unknown share id");
        return Ok(None);
    };
    let snapshot: SharedSheet = serde_json::from_str(&raw)?;
    if snapshot.is_viewable_by(viewer_email) {
        Ok(Some(snapshot))
    } else {
        Err(TracklyError::ShareDenied(share.to_string()))
    }
}

/// Fetches the read-only snapshot published under `share`.
///
/// `viewer_email` is the signed-in viewer's email, `None` when anonymous.
/// Returns `Ok(None)` if nothing is published under that id.
///
/// # Errors
///
/// Returns [`TracklyError::ShareDenied`] if the viewer may not open the
/// sheet, or an error if the read or decoding fails.
#[tracing::instrument(skip_all, fields(%share))]
pub fn load_shared_blocking<S: BlockingStorage + ?Sized>(
    storage: &S,
    share: &ShareId,
    viewer_email: Option<&str>,
) -> Result<Option<SharedSheet>> {
    open_snapshot(share, storage.load_shared(share)?, viewer_email)
}

/// Share ids of every shared sheet of a state.
fn shared_ids(state: &AppState) -> BTreeSet<ShareId> {
    state
        .sheets
        .iter()
        .filter_map(|sheet| sheet.share.as_ref().map(|share| share.id.clone()))
        .collect()
}

/// Writes to apply so that published snapshots mirror a state.
///
/// The set of published ids is updated by the caller one write at a time,
/// so a plan that fails halfway still leaves it matching storage.
#[derive(Debug, Default)]
struct SharePlan {
    /// Snapshots to (re-)publish.
    publish: Vec<(ShareId, String)>,
    /// Snapshots to retract.
    retract: Vec<ShareId>,
}

impl SharePlan {
    /// Plans the snapshot writes for `state`, given the ids published so
    /// far.
    fn new(owner: &UserKey, state: &AppState, published: &BTreeSet<ShareId>) -> Result<Self> {
        let mut publish = Vec::new();
        for sheet in &state.sheets {
            if let Some(share) = sheet.share.as_ref() {
                let snapshot = SharedSheet {
                    owner: owner.clone(),
                    sheet: sheet.clone(),
                };
                publish.push((share.id.clone(), serde_json::to_string(&snapshot)?));
            }
        }
        let current = shared_ids(state);
        let retract = published.difference(&current).cloned().collect();
        Ok(Self { publish, retract })
    }
}

/// Observer that saves every published state synchronously.
///
/// Besides the user's own blob it keeps one read-only snapshot per shared
/// sheet in storage, retracting snapshots of sheets that stopped being
/// shared or were removed.
#[derive(Debug)]
pub struct BlockingPersister<S> {
    /// Destination of every save.
    storage: Arc<S>,
    /// Owner of the state.
    user: UserKey,
    /// Share ids with a snapshot currently in storage.
    published: Mutex<BTreeSet<ShareId>>,
}

impl<S: BlockingStorage> BlockingPersister<S> {
    /// Creates a persister for `user`, assuming the snapshots of the
    /// sheets shared in `loaded` are already published.
    #[must_use]
    pub fn new(storage: Arc<S>, user: UserKey, loaded: &AppState) -> Self {
        Self {
            storage,
            user,
            published: Mutex::new(shared_ids(loaded)),
        }
    }

    /// Saves `state` and brings the published snapshots in line with it.
    ///
    /// # Errors
    ///
    /// Returns the first storage or serialization error.
    pub fn persist(&self, state: &AppState) -> Result<()> {
        self.storage.save(&self.user, serialize_state(state)?)?;
        let mut published = self
            .published
            .lock()
            .map_err(|err| TracklyError::Storage(err.to_string().into()))?;
        let plan = SharePlan::new(&self.user, state, &published)?;
        for (share, blob) in plan.publish {
            self.storage.save_shared(&share, blob)?;
            let _new = published.insert(share);
        }
        for share in plan.retract {
            self.storage.remove_shared(&share)?;
            let _was_published = published.remove(&share);
            tracing::debug!(%share, "share snapshot retracted");
        }
        Ok(())
    }
}

impl<S: BlockingStorage + 'static> StateObserver for BlockingPersister<S> {
    fn state_changed(&self, state: &Arc<AppState>) {
        if let Err(err) = self.persist(state) {
            tracing::warn!(user = %self.user, %err, "failed to save state");
        }
    }
}

#[cfg(feature = "async")]
mod queued {
    //! Ordered asynchronous saving.

    use std::collections::BTreeSet;
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use super::{LoadedState, SharePlan, open_snapshot, resolve, serialize_state, shared_ids};
    use crate::error::Result;
    use crate::models::{AppState, ShareId, UserKey};
    use crate::share::SharedSheet;
    use crate::storage::Storage;
    use crate::store::StateObserver;

    /// Async counterpart of [`super::load_state_blocking`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage read itself fails.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn load_state<S: Storage + ?Sized>(storage: &S, user: &UserKey) -> Result<LoadedState> {
        let loaded = resolve(user, storage.load(user).await?);
        if loaded.was_written_back() {
            let written = match serialize_state(&loaded.state) {
                Ok(blob) => storage.save(user, blob).await,
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                tracing::warn!(%err, "failed to write back loaded state");
            }
        }
        tracing::debug!(origin = ?loaded.origin, "state loaded");
        Ok(loaded)
    }

    /// Async counterpart of [`super::load_shared_blocking`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TracklyError::ShareDenied`] if the viewer
    /// may not open the sheet, or an error if the read or decoding fails.
    #[tracing::instrument(skip_all, fields(%share))]
    pub async fn load_shared<S: Storage + ?Sized>(
        storage: &S,
        share: &ShareId,
        viewer_email: Option<&str>,
    ) -> Result<Option<SharedSheet>> {
        open_snapshot(share, storage.load_shared(share).await?, viewer_email)
    }

    /// Observer that queues every published state for the save worker.
    ///
    /// Sending never blocks the mutation that triggered it.
    #[derive(Debug, Clone)]
    pub struct QueuedPersister {
        /// Owner of the queued states, for log context.
        user: UserKey,
        /// Single logical channel to the worker.
        sender: mpsc::UnboundedSender<Arc<AppState>>,
    }

    impl QueuedPersister {
        /// Creates a persister and the worker that drains its queue.
        ///
        /// The worker must be driven (see [`SaveWorker::run`]) for saves to
        /// happen; [`Self::spawn`] does that on the current runtime.
        #[must_use]
        pub fn new<S: Storage>(storage: Arc<S>, user: UserKey, loaded: &AppState) -> (Self, SaveWorker<S>) {
            let (sender, receiver) = mpsc::unbounded_channel();
            let worker = SaveWorker {
                storage,
                user: user.clone(),
                receiver,
                published: shared_ids(loaded),
            };
            (Self { user, sender }, worker)
        }

        /// Creates a persister and spawns its worker on the current Tokio
        /// runtime.
        ///
        /// The worker finishes once every clone of the persister is
        /// dropped and the queue is drained.
        ///
        /// # Panics
        ///
        /// Panics if called outside a Tokio runtime.
        #[must_use]
        pub fn spawn<S: Storage + 'static>(
            storage: Arc<S>,
            user: UserKey,
            loaded: &AppState,
        ) -> (Self, JoinHandle<()>) {
            let (persister, worker) = Self::new(storage, user, loaded);
            (persister, tokio::spawn(worker.run()))
        }
    }

    impl StateObserver for QueuedPersister {
        fn state_changed(&self, state: &Arc<AppState>) {
            if self.sender.send(Arc::clone(state)).is_err() {
                tracing::warn!(user = %self.user, "save worker is gone, state not saved");
            }
        }
    }

    /// Applies queued saves one at a time, in the order they were issued.
    #[derive(Debug)]
    pub struct SaveWorker<S> {
        /// Destination of every save.
        storage: Arc<S>,
        /// Owner of the state.
        user: UserKey,
        /// Queue fed by [`QueuedPersister`].
        receiver: mpsc::UnboundedReceiver<Arc<AppState>>,
        /// Share ids with a snapshot currently in storage.
        published: BTreeSet<ShareId>,
    }

    impl<S: Storage> SaveWorker<S> {
        /// Drains the queue until every sender is dropped.
        pub async fn run(mut self) {
            while let Some(state) = self.receiver.recv().await {
                if let Err(err) = self.persist(&state).await {
                    tracing::warn!(user = %self.user, %err, "failed to save state");
                }
            }
            tracing::debug!(user = %self.user, "save worker stopped");
        }

        /// Saves one state and its share snapshots.
        async fn persist(&mut self, state: &AppState) -> Result<()> {
            self.storage
                .save(&self.user, serialize_state(state)?)
                .await?;
            let plan = SharePlan::new(&self.user, state, &self.published)?;
            for (share, blob) in plan.publish {
                self.storage.save_shared(&share, blob).await?;
                let _new = self.published.insert(share);
            }
            for share in plan.retract {
                self.storage.remove_shared(&share).await?;
                let _was_published = self.published.remove(&share);
                tracing::debug!(%share, "share snapshot retracted");
            }
            Ok(())
        }
    }
}

#[cfg(feature = "async")]
pub use queued::{QueuedPersister, SaveWorker, load_shared, load_state};

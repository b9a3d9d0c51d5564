//! User identity and session gating.
//!
//! A [`Session`] owns at most one live [`SheetStore`]: signing in loads (or
//! initialises and persists) that user's state and attaches a save
//! observer; signing out drops the live state. Every state operation on a
//! signed-out session fails with [`TracklyError::SignedOut`].

use std::sync::Arc;

use crate::error::{Result, TracklyError};
use crate::models::{LOCAL_USER, ShareId, UserKey};
use crate::persistence::{self, BlockingPersister, StateOrigin};
use crate::share::SharedSheet;
use crate::storage::BlockingStorage;
use crate::store::SheetStore;

/// Who is using the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Key the user's state is stored under.
    pub key: UserKey,
    /// Email used to decide access to invited-only shares.
    pub email: Option<String>,
}

impl Identity {
    /// Creates an identity without an email.
    #[inline]
    #[must_use]
    pub const fn new(key: UserKey) -> Self {
        Self { key, email: None }
    }

    /// Sets the email, normalized to lowercase.
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: &str) -> Self {
        let normalized = email.trim().to_lowercase();
        self.email = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// The anonymous identity of a device-local user.
    #[inline]
    #[must_use]
    pub fn local() -> Self {
        Self::new(UserKey::from(LOCAL_USER))
    }
}

/// Authentication lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in.
    SignedIn(Identity),
    /// The user signed out.
    SignedOut,
}

/// Source of the currently authenticated identity.
pub trait IdentityProvider: core::fmt::Debug + Send + Sync {
    /// Returns the signed-in identity, if any.
    fn current(&self) -> Option<Identity>;
}

/// Provider that always reports the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<Identity>);

impl IdentityProvider for StaticIdentity {
    #[inline]
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Live state of the signed-in user.
#[derive(Debug)]
struct ActiveUser {
    /// Who is signed in.
    identity: Identity,
    /// Their state, with a persister attached.
    store: SheetStore,
}

/// Gate between authentication and the live state.
#[derive(Debug)]
pub struct Session<S> {
    /// Backend every signed-in user's state is loaded from and saved to.
    storage: Arc<S>,
    /// Present while someone is signed in.
    active: Option<ActiveUser>,
}

impl<S: BlockingStorage + 'static> Session<S> {
    /// Creates a signed-out session.
    #[inline]
    #[must_use]
    pub const fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            active: None,
        }
    }

    /// Applies an authentication event.
    ///
    /// # Errors
    ///
    /// Returns an error if signing in fails to read the user's state.
    pub fn handle(&mut self, event: AuthEvent) -> Result<()> {
        match event {
            AuthEvent::SignedIn(identity) => self.sign_in(identity).map(|_origin| ()),
            AuthEvent::SignedOut => {
                self.sign_out();
                Ok(())
            }
        }
    }

    /// Brings the session in line with what `provider` reports.
    ///
    /// # Errors
    ///
    /// Returns an error if signing in fails to read the user's state.
    pub fn follow<P: IdentityProvider + ?Sized>(&mut self, provider: &P) -> Result<()> {
        let event = provider
            .current()
            .map_or(AuthEvent::SignedOut, AuthEvent::SignedIn);
        self.handle(event)
    }

    /// Signs `identity` in, loading their state.
    ///
    /// Signing in again as the already signed-in user keeps the live state
    /// and only refreshes the identity. Returns how the state was obtained,
    /// or `None` if it was already live.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read from storage.
    pub fn sign_in(&mut self, identity: Identity) -> Result<Option<StateOrigin>> {
        if let Some(active) = self.active.as_mut()
            && active.identity.key == identity.key
        {
            active.identity = identity;
            return Ok(None);
        }
        self.sign_out();
        let loaded = persistence::load_state_blocking(&*self.storage, &identity.key)?;
        let persister =
            BlockingPersister::new(Arc::clone(&self.storage), identity.key.clone(), &loaded.state);
        let store = SheetStore::new(loaded.state).with_observer(persister);
        tracing::info!(user = %identity.key, origin = ?loaded.origin, "signed in");
        self.active = Some(ActiveUser { identity, store });
        Ok(Some(loaded.origin))
    }

    /// Signs the current user out, detaching the persister and dropping
    /// their live state.
    pub fn sign_out(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.store.clear_observers();
            tracing::info!(user = %active.identity.key, "signed out");
        }
    }

    /// Returns the signed-in identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.active.as_ref().map(|active| &active.identity)
    }

    /// Returns the signed-in user's store.
    ///
    /// # Errors
    ///
    /// Returns [`TracklyError::SignedOut`] if nobody is signed in.
    #[inline]
    pub fn store(&self) -> Result<&SheetStore> {
        self.active
            .as_ref()
            .map(|active| &active.store)
            .ok_or(TracklyError::SignedOut)
    }

    /// Returns the signed-in user's store for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`TracklyError::SignedOut`] if nobody is signed in.
    #[inline]
    pub fn store_mut(&mut self) -> Result<&mut SheetStore> {
        self.active
            .as_mut()
            .map(|active| &mut active.store)
            .ok_or(TracklyError::SignedOut)
    }

    /// Opens a shared sheet as the current viewer (anonymous when signed
    /// out).
    ///
    /// # Errors
    ///
    /// Returns [`TracklyError::ShareDenied`] if the viewer may not open it,
    /// or an error if it cannot be read.
    pub fn open_shared(&self, share: &ShareId) -> Result<Option<SharedSheet>> {
        let viewer = self.identity().and_then(|identity| identity.email.as_deref());
        persistence::load_shared_blocking(&*self.storage, share, viewer)
    }
}

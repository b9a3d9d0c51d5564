//! Pluggable persistence gateways for serialized budget state.
//!
//! A backend stores opaque blobs: one per user (the serialized
//! [`AppState`](crate::models::AppState)) and one per shared sheet (the
//! published read-only snapshot). It never interprets what it stores.
//!
//! This module defines the [`Storage`] (async) and [`BlockingStorage`]
//! (blocking) traits via a shared macro so both expose the same methods.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;

/// Generates a storage trait (async or blocking) with all gateway methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
#[cfg_attr(
    not(feature = "async"),
    allow(unused_macro_rules, reason = "the async arms only expand with the `async` feature")
)]
macro_rules! define_storage {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        // Per-user state
        define_storage!(@method $mode, load,
            "Returns the state blob saved for `user`.\n\nReturns `Ok(None)` if nothing was saved yet.\n\n# Errors\n\nReturns an error if the storage backend fails to read.",
            user: &UserKey, -> Result<Option<String>>);
        define_storage!(@method $mode, save,
            "Replaces the state blob of `user`.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            user: &UserKey, blob: String, -> Result<()>);

        // Shared sheet snapshots
        define_storage!(@method $mode, load_shared,
            "Returns the snapshot published under `share`.\n\nReturns `Ok(None)` if no snapshot is published.\n\n# Errors\n\nReturns an error if the storage backend fails to read.",
            share: &ShareId, -> Result<Option<String>>);
        define_storage!(@method $mode, save_shared,
            "Publishes (or replaces) the snapshot under `share`.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            share: &ShareId, blob: String, -> Result<()>);
        define_storage!(@method $mode, remove_shared,
            "Retracts the snapshot published under `share`. Retracting a missing snapshot succeeds.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            share: &ShareId, -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_storage {
    //! Async storage trait definition.

    use crate::error::Result;
    use crate::models::{ShareId, UserKey};

    define_storage! {
        trait_name: Storage,
        trait_doc: "Async persistence gateway for serialized budget state.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: async_mode,
    }
}

mod blocking_storage {
    //! Blocking storage trait definition.

    use crate::error::Result;
    use crate::models::{ShareId, UserKey};

    define_storage! {
        trait_name: BlockingStorage,
        trait_doc: "Blocking persistence gateway for serialized budget state.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_storage::Storage;
pub use blocking_storage::BlockingStorage;

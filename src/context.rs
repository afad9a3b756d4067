//! The request-scoped database context and the [`Db`] extractor.
//!
//! [`TxLayer`](crate::TxLayer) constructs one [`DbHandle`] per request and
//! inserts it into the request extensions. The handle holds the store handle
//! and the ambient-scope slot; whichever enforcement point wraps the request
//! (global middleware or per-route filter) opens the scope into the slot and
//! resolves it after the inner service responds. Handlers lease the slot via
//! the [`Db`] extractor and pass it down the call chain.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts};
use http::request::Parts;
use parking_lot::{lock_api::ArcMutexGuard, Mutex, RawMutex};

use crate::{
    error::{Error, ScopeError},
    scope::TxScope,
    store::Store,
};

/// The ambient transaction state of one request.
#[derive(Debug)]
pub(crate) enum AmbientScope {
    /// No scope was opened; writes autocommit.
    Unscoped,
    /// An enforcement point opened a scope; plain writes join it.
    Open(TxScope),
    /// The scope was committed or rolled back.
    Resolved,
}

/// The per-request context: store handle plus ambient-scope slot.
///
/// Cloning shares the slot, which is how the middleware and the extractor see
/// the same scope.
#[derive(Clone)]
pub(crate) struct DbHandle {
    store: Store,
    slot: Arc<Mutex<AmbientScope>>,
}

impl DbHandle {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            slot: Arc::new(Mutex::new(AmbientScope::Unscoped)),
        }
    }

    /// Begin the ambient scope for this request.
    ///
    /// Fails with [`Error::ScopeAlreadyOpen`] if one is already open, the
    /// way the backing engine rejects a second begin on one connection.
    pub(crate) async fn open(&self) -> Result<(), Error> {
        let mut slot = self
            .slot
            .try_lock_arc()
            .ok_or(Error::OverlappingExtractors)?;
        match &*slot {
            AmbientScope::Unscoped => {
                let scope = TxScope::begin(self.store.pool()).await?;
                *slot = AmbientScope::Open(scope);
                Ok(())
            }
            AmbientScope::Open(_) | AmbientScope::Resolved => Err(Error::ScopeAlreadyOpen),
        }
    }

    /// Resolve the ambient scope: commit on success, roll back on failure.
    ///
    /// A rollback failure is logged rather than returned so it cannot mask
    /// the failure that triggered it. Does nothing if no scope was opened.
    pub(crate) async fn resolve(&self, success: bool) -> Result<(), ScopeError> {
        let Some(mut slot) = self.slot.try_lock_arc() else {
            // A leaked lease (e.g. moved into a spawned task) means we cannot
            // resolve here; dropping the scope still rolls it back.
            tracing::warn!("ambient scope still leased at resolve time");
            return Ok(());
        };
        match std::mem::replace(&mut *slot, AmbientScope::Resolved) {
            AmbientScope::Open(scope) if success => {
                tracing::debug!("committing ambient scope");
                scope.commit().await
            }
            AmbientScope::Open(scope) => {
                tracing::debug!("rolling back ambient scope");
                if let Err(error) = scope.rollback().await {
                    tracing::warn!(%error, "ambient rollback failed");
                }
                Ok(())
            }
            AmbientScope::Unscoped | AmbientScope::Resolved => Ok(()),
        }
    }
}

/// An `axum` extractor leasing the request's database context.
///
/// The lease is exclusive for the extractor's lifetime; extracting `Db` twice
/// in one handler is rejected with [`Error::OverlappingExtractors`]. The
/// enforcement point that opened the ambient scope gets the slot back once
/// the `Db` is dropped, i.e. when the handler returns.
pub struct Db {
    ambient: ArcMutexGuard<RawMutex, AmbientScope>,
}

impl Db {
    /// The ambient scope opened by the middleware or filter, if any.
    ///
    /// Plain writes pass this straight to [`Store::write`]: `Some` means the
    /// write participates in the request's transaction, `None` means
    /// autocommit.
    pub fn ambient_mut(&mut self) -> Option<&mut TxScope> {
        match &mut *self.ambient {
            AmbientScope::Open(scope) => Some(scope),
            AmbientScope::Unscoped | AmbientScope::Resolved => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Db
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let handle = parts
            .extensions
            .get::<DbHandle>()
            .ok_or(Error::MissingExtension)?;
        let ambient = handle
            .slot
            .try_lock_arc()
            .ok_or(Error::OverlappingExtractors)?;
        Ok(Self { ambient })
    }
}

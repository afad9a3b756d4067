//! Manual transaction management: a writer that opens and closes its own
//! scope around one write.

use crate::{
    context::Db,
    error::{Error, StoreError},
    scope::TxScope,
    store::{Record, Store},
};

/// A writer with explicit, per-call transaction management.
///
/// The two operations separate "open my own scope" from "assume the caller
/// already opened one", which is what makes the composition hazard around
/// nested scopes visible instead of implicit.
#[derive(Debug, Clone)]
pub struct DirectWriter {
    store: Store,
}

impl DirectWriter {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Write one record inside a scope of this writer's own making.
    ///
    /// Begins a fresh scope on its own pool connection, writes through it,
    /// commits on success, rolls back and propagates the write error on
    /// failure.
    ///
    /// The scope is not coordinated with any ambient scope already open on
    /// the request: once this commits, the record is durable no matter what
    /// the outer scope later decides. And because SQLite allows one writer at
    /// a time, if the ambient scope has already written on its connection,
    /// this writer's connection blocks on the engine's busy handling until
    /// the outer scope resolves. `/twoerr` demonstrates the first face of
    /// this hazard; see [`router`](crate::router).
    pub async fn write_with_transaction(&self, name: &str) -> Result<Record, Error> {
        let mut scope = TxScope::begin(self.store.pool()).await?;
        match self.store.write(Some(&mut scope), name).await {
            Ok(record) => {
                scope.commit().await?;
                Ok(record)
            }
            Err(error) => {
                if let Err(rollback_error) = scope.rollback().await {
                    tracing::warn!(%rollback_error, "rollback failed after write error");
                }
                Err(error.into())
            }
        }
    }

    /// Write one record with no scope of this writer's own.
    ///
    /// Joins the ambient scope if the middleware or filter opened one for
    /// this request, autocommits otherwise.
    pub async fn write_without_transaction(
        &self,
        db: &mut Db,
        name: &str,
    ) -> Result<Record, StoreError> {
        self.store.write(db.ambient_mut(), name).await
    }
}

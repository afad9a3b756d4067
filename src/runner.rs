//! The generic "run this inside a transaction" wrapper.

use futures::future::BoxFuture;

use crate::{error::Error, scope::TxScope, store::Store};

/// Runs an arbitrary unit of work inside a fresh transaction scope.
///
/// This is the generic form of the commit-on-success, rollback-on-failure
/// shape that [`DirectWriter`], [`TxLayer`] and [`tx_filter`] each repeat at
/// their own enforcement point. The unit of work receives the open scope as
/// an explicit parameter and can issue any number of writes through it; they
/// become durable together on commit, or not at all on rollback.
///
/// [`DirectWriter`]: crate::DirectWriter
/// [`TxLayer`]: crate::TxLayer
/// [`tx_filter`]: crate::tx_filter
#[derive(Debug, Clone)]
pub struct TxRunner {
    store: Store,
}

impl TxRunner {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Run `work` inside its own scope.
    ///
    /// Commits and returns the value on `Ok`; rolls back and propagates the
    /// unchanged error on `Err`. A rollback failure is logged so it cannot
    /// mask the error that caused it.
    ///
    /// ```no_run
    /// # use futures::FutureExt;
    /// # async fn demo(runner: tx_strategies::TxRunner, store: tx_strategies::Store) {
    /// let record = runner
    ///     .run(move |scope| {
    ///         async move { store.write(Some(scope), "name").await.map_err(Into::into) }.boxed()
    ///     })
    ///     .await;
    /// # }
    /// ```
    pub async fn run<T, F>(&self, work: F) -> Result<T, Error>
    where
        F: for<'s> FnOnce(&'s mut TxScope) -> BoxFuture<'s, Result<T, Error>>,
    {
        let mut scope = TxScope::begin(self.store.pool()).await?;
        match work(&mut scope).await {
            Ok(value) => {
                scope.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = scope.rollback().await {
                    tracing::warn!(%rollback_error, "rollback failed after unit of work error");
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::TxRunner;
    use crate::{
        error::{Error, StoreError},
        store::Store,
    };

    async fn store(db: &tempfile::NamedTempFile) -> Store {
        Store::connect(&format!("sqlite://{}", db.path().display()))
            .await
            .unwrap()
    }

    async fn names(store: &Store) -> Vec<String> {
        store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.name)
            .collect()
    }

    #[tokio::test]
    async fn writes_in_one_run_commit_together() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let store = store(&db).await;
        let runner = TxRunner::new(store.clone());

        let writes = store.clone();
        runner
            .run(move |scope| {
                async move {
                    writes.write(Some(&mut *scope), "first").await?;
                    writes.write(Some(&mut *scope), "second").await?;
                    Ok(())
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(names(&store).await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failure_rolls_back_every_write() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let store = store(&db).await;
        let runner = TxRunner::new(store.clone());

        store.write(None, "taken").await.unwrap();

        let writes = store.clone();
        let error = runner
            .run(move |scope| {
                async move {
                    writes.write(Some(&mut *scope), "fresh").await?;
                    writes.write(Some(&mut *scope), "taken").await?;
                    Ok(())
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Store(StoreError::Constraint(_))));
        // "fresh" went down with the duplicate.
        assert_eq!(names(&store).await, vec!["taken"]);
    }
}

//! A transaction scope: the bounded lifetime of one database transaction.

use sqlx::{sqlite::SqliteConnection, Sqlite, SqlitePool, Transaction};

use crate::error::ScopeError;

/// One live transaction, from begin to commit or rollback.
///
/// A scope is either committed or rolled back, never both: [`commit`] and
/// [`rollback`] consume the scope, so the underlying transaction cannot be
/// touched after it resolves. Dropping an open scope rolls the transaction
/// back (sqlx aborts an unresolved transaction when it is dropped), which is
/// the release path for panics and cancelled requests.
///
/// Every component in this crate wraps a body in the same shape: run the
/// body, `commit` on success, `rollback` and propagate the original error on
/// failure.
///
/// [`commit`]: TxScope::commit
/// [`rollback`]: TxScope::rollback
#[derive(Debug)]
pub struct TxScope {
    tx: Transaction<'static, Sqlite>,
}

impl TxScope {
    /// Begin a new transaction on a connection from `pool`.
    pub async fn begin(pool: &SqlitePool) -> Result<Self, ScopeError> {
        let tx = pool.begin().await.map_err(ScopeError::Begin)?;
        Ok(Self { tx })
    }

    /// Commit the transaction.
    ///
    /// On failure the handle is gone either way: the uncommitted work is
    /// discarded and the connection returns to the pool. There is no
    /// rollback to issue after a failed commit.
    pub async fn commit(self) -> Result<(), ScopeError> {
        self.tx.commit().await.map_err(ScopeError::Commit)
    }

    /// Roll the transaction back.
    pub async fn rollback(self) -> Result<(), ScopeError> {
        self.tx.rollback().await.map_err(ScopeError::Rollback)
    }

    /// The connection to run statements on so they execute inside this scope.
    pub fn executor(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

#[cfg(test)]
mod tests {
    use super::TxScope;

    async fn pool(db: &tempfile::NamedTempFile) -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", db.path().display()))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE IF NOT EXISTS numbers (number INT PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn count(pool: &sqlx::SqlitePool) -> i64 {
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM numbers")
            .fetch_one(pool)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn commit_makes_writes_durable() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let pool = pool(&db).await;

        let mut scope = TxScope::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO numbers VALUES (1)")
            .execute(scope.executor())
            .await
            .unwrap();
        scope.commit().await.unwrap();

        assert_eq!(count(&pool).await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let pool = pool(&db).await;

        let mut scope = TxScope::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO numbers VALUES (1)")
            .execute(scope.executor())
            .await
            .unwrap();
        scope.rollback().await.unwrap();

        assert_eq!(count(&pool).await, 0);
    }

    #[tokio::test]
    async fn drop_discards_writes() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let pool = pool(&db).await;

        {
            let mut scope = TxScope::begin(&pool).await.unwrap();
            sqlx::query("INSERT INTO numbers VALUES (1)")
                .execute(scope.executor())
                .await
                .unwrap();
            // dropped without resolving
        }

        assert_eq!(count(&pool).await, 0);
    }
}

//! The persistence gateway: a pool handle and the one write the demo needs.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{error::StoreError, scope::TxScope};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records ( \
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    name TEXT NOT NULL UNIQUE \
)";

const INSERT: &str = "INSERT INTO records (name) VALUES (?) RETURNING id, name";

const SELECT_ALL: &str = "SELECT id, name FROM records ORDER BY id";

/// A persisted record: a store-assigned id and a name.
///
/// Records are never mutated after creation. Names are unique, which is what
/// makes a duplicate write the store's natural constraint failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub name: String,
}

/// Gateway to the backing engine.
///
/// The pool is reference-counted, so `Store` is cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to `url` and make sure the demo table exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(url).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist one record and return it with its store-assigned id.
    ///
    /// When `ambient` is an open scope the insert executes inside it and is
    /// only durable once that scope commits. With no scope the engine's
    /// autocommit applies: the insert is its own one-statement transaction,
    /// finished by the time this returns.
    ///
    /// Failures surface as [`StoreError`] untranslated; rolling back is the
    /// caller's scope handling, not the store's.
    pub async fn write(
        &self,
        ambient: Option<&mut TxScope>,
        name: &str,
    ) -> Result<Record, StoreError> {
        let query = sqlx::query_as::<_, (i64, String)>(INSERT).bind(name);
        let (id, name) = match ambient {
            Some(scope) => query.fetch_one(scope.executor()).await?,
            None => {
                // The implicit autocommit transaction is only finalized once
                // the statement runs to completion; RETURNING yields its row
                // before that. Drain the statement so the row is visible and
                // durable when this returns.
                let mut rows = query.fetch_all(&self.pool).await?;
                rows.pop().ok_or(sqlx::Error::RowNotFound)?
            }
        };
        Ok(Record { id, name })
    }

    /// All records, oldest first. Reads straight off the pool; the read-only
    /// route takes no scope.
    pub async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(SELECT_ALL).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Record { id, name })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::error::StoreError;

    async fn store(db: &tempfile::NamedTempFile) -> Store {
        Store::connect(&format!("sqlite://{}", db.path().display()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn write_without_scope_autocommits() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let store = store(&db).await;

        let record = store.write(None, "solo").await.unwrap();

        assert_eq!(record.name, "solo");
        assert_eq!(store.list().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_constraint_violation() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let store = store(&db).await;

        store.write(None, "taken").await.unwrap();
        let error = store.write(None, "taken").await.unwrap_err();

        assert!(matches!(error, StoreError::Constraint(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn autocommitted_write_is_visible_on_return() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let store = store(&db).await;

        // Each read may land on a different pool connection, so the insert's
        // implicit transaction must be finished when write returns, not
        // merely queued behind it.
        for i in 0..200 {
            let record = store.write(None, &format!("name-{i}")).await.unwrap();
            assert!(
                store.list().await.unwrap().contains(&record),
                "write {i} not visible on return"
            );
        }
    }
}

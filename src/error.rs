//! The error taxonomy: store failures, scope lifecycle failures, and the
//! request-level errors the extractor and middleware can surface.

use axum::response::IntoResponse;

/// A failure raised by [`Store`](crate::Store) operations.
///
/// The store does not catch or translate these; whichever scope wraps the
/// write is responsible for rolling back before the error propagates.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The engine rejected the statement (unique/foreign-key/not-null/check).
    #[error("constraint violation: {0}")]
    Constraint(#[source] sqlx::Error),

    /// The engine could not be reached, or the pool gave up.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// Any other backend failure.
    #[error("store error: {0}")]
    Backend(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match &error {
            sqlx::Error::Database(db)
                if matches!(
                    db.kind(),
                    ErrorKind::UniqueViolation
                        | ErrorKind::ForeignKeyViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation
                ) =>
            {
                Self::Constraint(error)
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(error)
            }
            _ => Self::Backend(error),
        }
    }
}

/// A failure to begin, commit or roll back a [`TxScope`](crate::TxScope).
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("failed to roll back transaction: {0}")]
    Rollback(#[source] sqlx::Error),
}

/// Possible errors when handling a request.
///
/// `axum` requires that rejection and middleware error types convert into
/// responses; this one becomes an HTTP 500 with the `Display` representation
/// as the body. Returning backend details to clients is fine for a demo, not
/// for production.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request carries no database context; the
    /// [`TxLayer`](crate::TxLayer) middleware was not installed.
    #[error("no database context on the request; did you add the tx_strategies::TxLayer middleware?")]
    MissingExtension,

    /// [`Db`](crate::Db) was extracted more than once from the same request.
    #[error("database context already leased; Db extracted multiple times in the same handler/middleware")]
    OverlappingExtractors,

    /// A second ambient scope was requested while one is already open on this
    /// request, e.g. a route wrapped by both the middleware policy and the
    /// per-route filter.
    #[error("an ambient transaction scope is already open for this request")]
    ScopeAlreadyOpen,

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        (http::StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

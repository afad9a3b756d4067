//! The per-route enforcement point: the same scope contract as the global
//! middleware, attached to individual routes instead.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::{context::DbHandle, error::Error};

/// Wrap one route's invocation in an ambient transaction scope.
///
/// Attach to a route with [`axum::middleware::from_fn`]:
///
/// ```ignore
/// .route("/three", get(handler).layer(middleware::from_fn(tx_filter)))
/// ```
///
/// The contract is the one [`TxLayer`](crate::TxLayer) enforces for marked
/// routes (begin before the handler, resolve by response status after it),
/// expressed as a per-route opt-in rather than a policy map consulted by
/// global middleware. Both attachment points coexist; a route picks one or
/// the other. Picking both fails the request with
/// [`Error::ScopeAlreadyOpen`], since the second begin finds the request's
/// scope already open.
///
/// The filter reuses the context inserted by [`TxLayer`](crate::TxLayer), so
/// it only works under that layer.
pub async fn tx_filter(req: Request, next: Next) -> Result<Response, Error> {
    let handle = req
        .extensions()
        .get::<DbHandle>()
        .cloned()
        .ok_or(Error::MissingExtension)?;

    handle.open().await?;
    tracing::debug!(path = %req.uri().path(), "ambient scope opened by filter");

    let res = next.run(req).await;

    let success = !res.status().is_client_error() && !res.status().is_server_error();
    handle.resolve(success).await?;

    Ok(res)
}

//! A [`tower_layer::Layer`] that enforces the route transaction policy.

use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use http::Request;

use crate::{
    context::DbHandle,
    error::Error,
    policy::{RoutePolicies, TxPolicy},
    store::Store,
};

/// A [`tower_layer::Layer`] that gives every request a database context and
/// wraps marked routes in an ambient transaction scope.
///
/// The layer adds a fresh request-scoped context to the [request extensions];
/// handlers lease it through the [`Db`](crate::Db) extractor to reach the
/// ambient scope. For routes marked in [`RoutePolicies`] the service begins
/// the scope before invoking the inner service and resolves it exactly once
/// after the inner service responds: commit when the status is neither a
/// client nor a server error, rollback otherwise. Unmarked routes are pure
/// passthrough; no scope operation is performed.
///
/// A begin failure short-circuits into an error response. A commit failure
/// replaces the success response with an error response. A rollback failure
/// is logged and the original error response passes through unchanged.
///
/// [request extensions]: https://docs.rs/http/latest/http/struct.Extensions.html
#[derive(Clone)]
pub struct TxLayer {
    store: Store,
    policies: RoutePolicies,
}

impl TxLayer {
    /// Construct a new layer over `store`, wrapping the routes marked in
    /// `policies`.
    pub fn new(store: Store, policies: RoutePolicies) -> Self {
        Self { store, policies }
    }
}

impl<S> tower_layer::Layer<S> for TxLayer {
    type Service = TxService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TxService {
            store: self.store.clone(),
            policies: self.policies.clone(),
            inner,
        }
    }
}

/// A [`tower_service::Service`] that enforces the route transaction policy.
///
/// See [`TxLayer`] for more information.
#[derive(Clone)]
pub struct TxService<S> {
    store: Store,
    policies: RoutePolicies,
    inner: S,
}

impl<S, ReqBody> tower_service::Service<Request<ReqBody>> for TxService<S>
where
    S: tower_service::Service<
            Request<ReqBody>,
            Response = Response,
            Error = std::convert::Infallible,
        > + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let path = req.uri().path().to_owned();
        let policy = self.policies.policy_for(&path);

        let handle = DbHandle::new(self.store.clone());
        req.extensions_mut().insert(handle.clone());

        let mut inner = self.inner.clone();
        Box::pin(async move {
            if let TxPolicy::Passthrough = policy {
                return inner.call(req).await;
            }

            if let Err(error) = handle.open().await {
                tracing::warn!(%path, %error, "failed to open the ambient scope");
                return Ok(error.into_response());
            }
            tracing::debug!(%path, "ambient scope opened");

            let res = inner.call(req).await.unwrap(); // inner service is infallible

            let success = !res.status().is_client_error() && !res.status().is_server_error();
            match handle.resolve(success).await {
                Ok(()) => Ok(res),
                Err(error) => Ok(Error::from(error).into_response()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TxLayer;
    use crate::policy::RoutePolicies;

    // The trait shenanigans required by axum for layers are significant, so this "test" ensures
    // we've got it right.
    #[allow(unused, unreachable_code, clippy::diverging_sub_expression)]
    fn layer_compiles() {
        let store: crate::Store = todo!();

        let app = axum::Router::new()
            .route("/", axum::routing::get(|| async { "hello" }))
            .layer(TxLayer::new(store, RoutePolicies::new()));

        axum::serve(todo!(), app.into_make_service());
    }
}

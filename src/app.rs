//! The demo application: state, handlers and the router.
//!
//! Five routes exercise the same one-record write under four scoping
//! strategies:
//!
//! | Route     | Strategy |
//! |-----------|----------|
//! | `/`       | read-only list, no scope |
//! | `/two`    | policy-marked: the middleware wraps a plain write |
//! | `/twoerr` | policy-marked, but the handler opens its own scope too |
//! | `/three`  | per-route filter wraps a plain write |
//! | `/four`   | [`TxRunner`] wraps the write |

use axum::{extract::State, middleware, routing::get, Json, Router};
use futures::FutureExt;
use http::StatusCode;
use uuid::Uuid;

use crate::{
    context::Db,
    error::Error,
    filter::tx_filter,
    layer::TxLayer,
    policy::RoutePolicies,
    runner::TxRunner,
    store::{Record, Store},
    writer::DirectWriter,
};

/// Everything the handlers need, built once at router construction.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub writer: DirectWriter,
    pub runner: TxRunner,
}

/// Build the demo router over `store`.
///
/// `/two` and `/twoerr` are marked for middleware wrapping; `/three` opts in
/// through its filter instead; `/` and `/four` pass through.
pub fn router(store: Store) -> Router {
    let policies = RoutePolicies::new().wrap("/two").wrap("/twoerr");

    let state = AppState {
        store: store.clone(),
        writer: DirectWriter::new(store.clone()),
        runner: TxRunner::new(store.clone()),
    };

    Router::new()
        .route("/", get(index))
        .route("/two", get(two))
        .route("/twoerr", get(twoerr))
        .route("/three", get(three).layer(middleware::from_fn(tx_filter)))
        .route("/four", get(four))
        .layer(TxLayer::new(store, policies))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Result<Json<Vec<Record>>, Error> {
    Ok(Json(state.store.list().await?))
}

/// Plain write; the middleware's ambient scope decides its fate.
async fn two(State(state): State<AppState>, mut db: Db) -> Result<Json<Record>, Error> {
    let record = state
        .writer
        .write_without_transaction(&mut db, &fresh_name())
        .await?;
    Ok(Json(record))
}

/// The dual-scope hazard: the handler commits through its own scope, then the
/// request fails, and the middleware's rollback cannot take the record back.
async fn twoerr(State(state): State<AppState>) -> Result<(StatusCode, Json<Record>), Error> {
    let record = state.writer.write_with_transaction(&fresh_name()).await?;

    // Simulate a failure later in the request, once the handler's own scope
    // has already committed. The error status makes the middleware roll the
    // ambient scope back; the committed record stays.
    Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(record)))
}

/// The same plain write as `/two`, wrapped by the route's filter instead of
/// the policy map.
async fn three(State(state): State<AppState>, mut db: Db) -> Result<Json<Record>, Error> {
    let record = state
        .writer
        .write_without_transaction(&mut db, &fresh_name())
        .await?;
    Ok(Json(record))
}

/// Plain write handed to the runner, which scopes it explicitly.
async fn four(State(state): State<AppState>) -> Result<Json<Record>, Error> {
    let store = state.store.clone();
    let name = fresh_name();
    let record = state
        .runner
        .run(move |scope| {
            async move { store.write(Some(scope), &name).await.map_err(Error::from) }.boxed()
        })
        .await?;
    Ok(Json(record))
}

fn fresh_name() -> String {
    Uuid::new_v4().to_string()
}

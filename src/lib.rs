//! Four strategies for scoping a database transaction around an HTTP request.
//!
//! All four share one load-bearing idiom (run the body, commit on success,
//! roll back and propagate the original error on failure) and differ in
//! where that idiom is enforced:
//!
//! 1. [`DirectWriter::write_with_transaction`]: by hand, around one write.
//! 2. [`TxLayer`]: global middleware that consults [`RoutePolicies`] and
//!    wraps marked routes in an ambient scope.
//! 3. [`tx_filter`]: the same contract attached to individual routes.
//! 4. [`TxRunner::run`]: a generic wrapper around any unit of work.
//!
//! [`router`] wires the five demo routes; `src/main.rs` serves them.

mod app;
mod config;
mod context;
mod error;
mod filter;
mod layer;
mod policy;
mod runner;
mod scope;
mod store;
mod writer;

pub use crate::{
    app::{router, AppState},
    config::Config,
    context::Db,
    error::{Error, ScopeError, StoreError},
    filter::tx_filter,
    layer::{TxLayer, TxService},
    policy::{RoutePolicies, TxPolicy},
    runner::TxRunner,
    scope::TxScope,
    store::{Record, Store},
    writer::DirectWriter,
};

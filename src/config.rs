//! Command-line and environment configuration.

use std::net::SocketAddr;

use clap::Parser;

/// Configuration for the demo server.
///
/// Every flag falls back to an environment variable of the same name and then
/// to a default, so a bare `cargo run` works.
#[derive(Debug, Parser)]
pub struct Config {
    /// Address to bind the HTTP server to.
    #[clap(long, env, default_value = "0.0.0.0:3000")]
    pub bind_address: SocketAddr,

    /// URL of the SQLite database. Created on first run if missing.
    #[clap(long, env, default_value = "sqlite://tx-strategies.db?mode=rwc")]
    pub database_url: String,

    /// Tracing filter directives, e.g. `info` or `tx_strategies=debug`.
    #[clap(long, env, default_value = "info,tx_strategies=debug")]
    pub log_filter: String,
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "bind_address: {}", self.bind_address)?;
        writeln!(f, "database_url: {}", self.database_url)?;
        writeln!(f, "log_filter: {}", self.log_filter)?;
        Ok(())
    }
}

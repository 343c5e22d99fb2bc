//! Server configuration from command-line flags and environment variables.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

use crate::votes::DEFAULT_MAX_VOTE_ATTEMPTS;

/// Which backend holds artworks, users and vote counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// PostgreSQL, via `DATABASE_URL`.
    Postgres,
    /// Process memory. State is lost on exit.
    Memory,
}

/// ICAF voting API server
#[derive(Debug, Clone, Parser)]
#[command(name = "icaf-server")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "ICAF_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Storage backend
    #[arg(long, env = "ICAF_STORE", value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    /// PostgreSQL connection string (required for the postgres store)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "ICAF_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Read-decide-write rounds per vote before reporting contention
    #[arg(long, env = "ICAF_MAX_VOTE_ATTEMPTS", default_value_t = DEFAULT_MAX_VOTE_ATTEMPTS)]
    pub max_vote_attempts: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ICAF_LOG", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["icaf-server"]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_vote_attempts, DEFAULT_MAX_VOTE_ATTEMPTS);
    }

    #[test]
    fn test_memory_store_flag() {
        let config = Config::try_parse_from([
            "icaf-server",
            "--store",
            "memory",
            "--bind",
            "127.0.0.1:8080",
            "--max-vote-attempts",
            "3",
        ])
        .unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.max_vote_attempts, 3);
    }

    #[test]
    fn test_rejects_unknown_store() {
        assert!(Config::try_parse_from(["icaf-server", "--store", "dynamo"]).is_err());
    }
}

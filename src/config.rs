//! Server Configuration
//!
//! Command-line options for the `waveserver` binary. Every option has a
//! default, so running the binary bare starts an empty server on the
//! standard wave server port.

use crate::archive::memory::DEFAULT_MAX_SAMPLES;
use crate::commands::Policy;
use crate::protocol::MAX_LINE_LENGTH;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "waveserver", version, about)]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Days of history that may be served (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_days: u32,

    /// Seconds before now that are withheld from clients
    #[arg(long, default_value_t = 0.0)]
    pub embargo: f64,

    /// Maximum concurrent archive requests
    #[arg(long, default_value_t = 8)]
    pub pool_size: usize,

    /// Seconds a channel listing is reused (0 = always refetch)
    #[arg(long, default_value_t = 30)]
    pub catalog_ttl: u64,

    /// Longest accepted request line in bytes
    #[arg(long, default_value_t = MAX_LINE_LENGTH)]
    pub max_line: usize,

    /// Most samples a single wave request returns
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,

    /// JSON archive snapshot to serve
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retention and embargo for the time window resolver.
    pub fn policy(&self) -> Policy {
        Policy::new(self.max_days, self.embargo.max(0.0))
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_days: 0,
            embargo: 0.0,
            pool_size: 8,
            catalog_ttl: 30,
            max_line: MAX_LINE_LENGTH,
            max_samples: DEFAULT_MAX_SAMPLES,
            snapshot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["waveserver"]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address(), "127.0.0.1:16022");
        assert_eq!(config.policy(), Policy::default());
        assert_eq!(config.catalog_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_policy_flags() {
        let config = Config::try_parse_from([
            "waveserver",
            "--max-days",
            "14",
            "--embargo",
            "600",
            "--snapshot",
            "archive.json",
            "--max-samples",
            "360000",
        ])
        .unwrap();
        assert_eq!(config.policy(), Policy::new(14, 600.0));
        assert_eq!(config.max_samples, 360_000);
        assert_eq!(config.snapshot, Some(PathBuf::from("archive.json")));
    }

    #[test]
    fn test_negative_embargo_is_none() {
        let config = Config::try_parse_from(["waveserver", "--embargo=-5"]).unwrap();
        assert_eq!(config.policy().embargo, 0.0);
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(Config::try_parse_from(["waveserver", "--port", "http"]).is_err());
    }
}

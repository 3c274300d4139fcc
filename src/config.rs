//! Configuration and CLI argument handling

use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human readable output for local development
    Pretty,
}

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "orders")]
#[command(about = "Service entry point with an optional HTTP listener and graceful shutdown")]
#[command(version)]
pub struct Config {
    /// Port to bind the HTTP listener to
    #[arg(short, long, default_value = "7777")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Run without an HTTP listener, only waiting for a termination signal
    #[arg(long)]
    pub no_http: bool,

    /// Seconds to wait for in-flight requests before forcing the listener closed
    #[arg(short, long = "grace-period", default_value = "5")]
    pub grace_period_secs: u64,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the listener address, or `None` when the listener is disabled
    pub fn address(&self) -> Option<String> {
        if self.no_http {
            return None;
        }

        // Bare IPv6 hosts need brackets to form a valid host:port pair
        if self.host.contains(':') && !self.host.starts_with('[') {
            Some(format!("[{}]:{}", self.host, self.port))
        } else {
            Some(format!("{}:{}", self.host, self.port))
        }
    }

    /// Get the shutdown grace period
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_listen_on_all_interfaces() {
        let config = Config::try_parse_from(["orders"]).unwrap();

        assert_eq!(config.address().as_deref(), Some("0.0.0.0:7777"));
        assert_eq!(config.grace_period(), Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn no_http_disables_the_listener() {
        let config = Config::try_parse_from(["orders", "--no-http", "-p", "9000"]).unwrap();

        assert!(config.address().is_none());
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let config = Config::try_parse_from(["orders", "--host", "::1", "--port", "8080"]).unwrap();

        assert_eq!(config.address().as_deref(), Some("[::1]:8080"));
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "orders",
            "--grace-period",
            "12",
            "--log-format",
            "pretty",
            "-v",
        ])
        .unwrap();

        assert_eq!(config.grace_period(), Duration::from_secs(12));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_level(), "debug");
    }
}

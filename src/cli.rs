//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::trust::PeerRole;

/// Inspect and exercise mTLS trust configuration
#[derive(Parser, Debug)]
#[command(name = "mtls-trust")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MTLS_TRUST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "MTLS_TRUST_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MTLS_TRUST_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a PEM certificate chain against the configured trust stack
    Check {
        /// Leaf-first PEM chain
        #[arg(long, required = true)]
        chain: PathBuf,

        /// Which side presented the chain
        #[arg(long, value_enum, default_value_t = Role::Client)]
        role: Role,

        /// Also verify the leaf against this hostname
        #[arg(long)]
        hostname: Option<String>,
    },

    /// Open a TLS connection using the configured trust stack
    Probe {
        /// Address to connect to (host:port)
        #[arg(required = true)]
        addr: String,

        /// Server name to verify (defaults to the host part of `addr`)
        #[arg(long)]
        server_name: Option<String>,
    },

    /// Print the certificate chain a server presents, without validating it
    Fetch {
        /// Address to connect to (host:port)
        #[arg(required = true)]
        addr: String,

        /// Server name sent in SNI (defaults to the host part of `addr`)
        #[arg(long)]
        server_name: Option<String>,
    },
}

/// Peer role as given on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The chain was presented by a client
    Client,
    /// The chain was presented by a server
    Server,
}

impl From<Role> for PeerRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Client => PeerRole::Client,
            Role::Server => PeerRole::Server,
        }
    }
}

/// Host part of `host:port`, without IPv6 brackets.
pub fn host_of(addr: &str) -> &str {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_defaults() {
        let cli = Cli::try_parse_from(["mtls-trust", "check", "--chain", "chain.pem"]).unwrap();
        let Command::Check { chain, role, hostname } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(chain, PathBuf::from("chain.pem"));
        assert_eq!(role, Role::Client);
        assert!(hostname.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn parses_probe_with_global_config() {
        let cli = Cli::try_parse_from([
            "mtls-trust",
            "probe",
            "api.internal:443",
            "--config",
            "mtls.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("mtls.yaml")));
        assert!(matches!(cli.command, Command::Probe { ref addr, .. } if addr == "api.internal:443"));
    }

    #[test]
    fn host_of_strips_port_and_brackets() {
        assert_eq!(host_of("api.internal:443"), "api.internal");
        assert_eq!(host_of("[::1]:8443"), "::1");
        assert_eq!(host_of("localhost"), "localhost");
    }
}

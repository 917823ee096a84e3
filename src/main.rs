//! mtls-trust - inspect and exercise mTLS trust configuration.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{error, info};

use mtls_trust::{
    HostnameContext, HostnameVerifier, TrustValidator,
    certificate::{CertInfo, auth_type_of},
    cli::{Cli, Command, Role, host_of},
    config::Config,
    pem::{encode_cert, load_certs},
    setup_tracing,
    trust::{CertificateCollector, ValidationContext},
    verifier::{TrustServerVerifier, build_client_config},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Check {
            chain,
            role,
            hostname,
        } => run_check(&config, &chain, role, hostname.as_deref()),
        Command::Probe { addr, server_name } => run_probe(&config, &addr, server_name).await,
        Command::Fetch { addr, server_name } => run_fetch(&config, &addr, server_name).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Validate a chain from disk; `Ok(false)` means the chain was rejected.
fn run_check(
    config: &Config,
    chain_path: &Path,
    role: Role,
    hostname: Option<&str>,
) -> anyhow::Result<bool> {
    let validator = config.trust.build_validator()?;
    let chain = load_certs(chain_path)?;
    let Some(leaf) = chain.first() else {
        bail!("{} holds no certificate", chain_path.display());
    };
    let ctx = ValidationContext::new(role.into(), &chain, auth_type_of(leaf));

    let mut trusted = match validator.validate(&ctx) {
        Ok(()) => {
            println!("✅ trusted as {} ({})", ctx.role(), ctx.leaf_subject());
            true
        }
        Err(reason) => {
            println!("❌ not trusted as {}: {reason}", ctx.role());
            false
        }
    };

    if let Some(hostname) = hostname {
        let verifier = config.hostname.build_verifier();
        if verifier.verify(&HostnameContext::new(hostname, &chain)) {
            println!("✅ hostname {hostname} matches ({} verifier)", verifier.kind());
        } else {
            let info = CertInfo::from_der(leaf.as_ref())?;
            println!(
                "❌ hostname {hostname} does not match; SAN DNS {:?}, SAN IP {:?}",
                info.san_dns_names, info.san_ips
            );
            trusted = false;
        }
    }

    Ok(trusted)
}

/// Handshake with `addr` using the configured stack.
async fn run_probe(config: &Config, addr: &str, server_name: Option<String>) -> anyhow::Result<bool> {
    let validator = config.trust.build_validator()?;
    let verifier = config.hostname.build_verifier();
    connect(config, addr, server_name, validator, verifier).await
}

/// Handshake with `addr` accepting anything and print the presented chain.
async fn run_fetch(config: &Config, addr: &str, server_name: Option<String>) -> anyhow::Result<bool> {
    let collector = CertificateCollector::new();
    let validator = TrustValidator::capturing(collector.clone(), None);
    connect(config, addr, server_name, validator, HostnameVerifier::Unsafe).await?;

    if collector.is_empty() {
        bail!("{addr} presented no certificates");
    }
    for cert in collector.certificates() {
        print!("{}", encode_cert(&cert));
    }
    Ok(true)
}

async fn connect(
    config: &Config,
    addr: &str,
    server_name: Option<String>,
    validator: TrustValidator,
    hostname: HostnameVerifier,
) -> anyhow::Result<bool> {
    let name = server_name.unwrap_or_else(|| host_of(addr).to_owned());
    let server_name = ServerName::try_from(name.clone())
        .with_context(|| format!("Invalid server name '{name}'"))?;

    let tcp = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {addr}"))?;
    let peer_addr = tcp.peer_addr()?;

    let verifier = TrustServerVerifier::new(validator, hostname)
        .with_peer_addr(peer_addr)
        .with_peer_host(host_of(addr));
    let client_config = build_client_config(Arc::new(verifier), config.tls.client_identity()?)?;
    let connector = TlsConnector::from(Arc::new(client_config));

    match connector.connect(server_name, tcp).await {
        Ok(stream) => {
            let (_, session) = stream.get_ref();
            let presented = session.peer_certificates().map_or(0, <[_]>::len);
            info!(%addr, server_name = %name, presented, "TLS handshake completed");
            println!(
                "✅ {addr} ({name}): handshake ok, {:?}, {presented} certificate(s)",
                session.protocol_version()
            );
            Ok(true)
        }
        Err(e) => {
            println!("❌ {addr} ({name}): handshake failed: {e}");
            Ok(false)
        }
    }
}

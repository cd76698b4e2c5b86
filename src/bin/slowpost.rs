//! slowpost command line
//!
//! Opens many slow POST connections against one target and keeps them
//! cycling until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use slowpost::client::LineEnding;
use slowpost::config::{generate_example_config, Config};
use slowpost::ClientPool;
use std::path::PathBuf;
use tracing::info;

/// Slow HTTP POST load generator for testing server resilience
#[derive(Parser, Debug)]
#[command(name = "slowpost")]
#[command(version)]
struct Args {
    /// Target hostname or IP address
    host: Option<String>,

    /// Configuration file path (TOML), flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of simultaneous connections
    #[arg(short = 'n', long)]
    concurrency: Option<usize>,

    /// Target port [default: 80, or 443 with --ssl]
    #[arg(short, long)]
    port: Option<u16>,

    /// Request path
    #[arg(long)]
    path: Option<String>,

    /// Wrap connections in TLS
    #[arg(long)]
    ssl: bool,

    /// Accept any TLS certificate
    #[arg(long)]
    insecure: bool,

    /// Smallest chunk sent per step, in bytes
    #[arg(long)]
    min_chunk_size: Option<usize>,

    /// Largest chunk sent per step, in bytes
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Smallest declared body, in bytes
    #[arg(long)]
    min_body_size: Option<usize>,

    /// Largest declared body, in bytes
    #[arg(long)]
    max_body_size: Option<usize>,

    /// Seconds between a chunk draining and the next chunk
    #[arg(long)]
    body_send_delay: Option<f64>,

    /// Seconds before reconnecting (five times longer after errors)
    #[arg(long)]
    connection_delay: Option<f64>,

    /// User-Agent header value
    #[arg(short = 'u', long)]
    user_agent: Option<String>,

    /// Tunnel every connection through this SOCKS4 proxy
    #[arg(long, value_name = "HOST:PORT")]
    socks_proxy: Option<String>,

    /// Terminate header lines with CRLF instead of LF
    #[arg(long)]
    crlf: bool,

    /// TCP connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'v', long)]
    log_level: Option<String>,
}

impl Args {
    /// Layer command line flags over the configuration file
    fn apply(self, config: &mut Config) {
        let target = &mut config.target;
        if let Some(host) = self.host {
            target.host = host;
        }
        if let Some(port) = self.port {
            target.port = Some(port);
        }
        if let Some(path) = self.path {
            target.path = path;
        }
        target.ssl |= self.ssl;
        target.insecure |= self.insecure;
        if let Some(user_agent) = self.user_agent {
            target.user_agent = Some(user_agent);
        }
        if let Some(proxy) = self.socks_proxy {
            target.socks_proxy = Some(proxy);
        }
        if self.crlf {
            target.line_ending = LineEnding::Crlf;
        }
        if let Some(timeout) = self.connect_timeout {
            target.connect_timeout = Some(timeout);
        }

        let attack = &mut config.attack;
        if let Some(concurrency) = self.concurrency {
            attack.concurrency = concurrency;
        }
        if let Some(size) = self.min_chunk_size {
            attack.min_chunk_size = size;
        }
        if let Some(size) = self.max_chunk_size {
            attack.max_chunk_size = size;
        }
        if let Some(size) = self.min_body_size {
            attack.min_body_size = size;
        }
        if let Some(size) = self.max_body_size {
            attack.max_body_size = size;
        }
        if let Some(delay) = self.body_send_delay {
            attack.body_send_delay = delay;
        }
        if let Some(delay) = self.connection_delay {
            attack.connection_delay = delay;
        }

        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.example_config {
        print!("{}", generate_example_config().to_toml_string()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    let print_config = args.print_config;
    args.apply(&mut config);

    if print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    slowpost::logging::init(&config.logging.level).context("Failed to initialize logging")?;

    let client_config = config.client_config().context("Invalid configuration")?;
    let transport_config = config.transport_config().context("Invalid configuration")?;

    info!("slowpost v{}", slowpost::VERSION);
    info!(
        "Target: {}{} ({})",
        client_config.target_addr(),
        client_config.path,
        if client_config.tls { "TLS" } else { "plain" }
    );
    if let Some(proxy) = &client_config.proxy {
        info!("Tunnelling through SOCKS4 proxy {}", proxy);
    }

    let pool = ClientPool::spawn(config.attack.concurrency, &client_config, &transport_config);

    tokio::select! {
        _ = pool.wait() => {
            info!("All clients stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use std::net::IpAddr;

use respkv::config::{DEFAULT_MAX_BUFFER_SIZE, DEFAULT_PORT};
use respkv::{Keyspace, RedisServer, ServerConfig};

/// In-memory key-value server speaking the Redis protocol
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Log every decoded command
    #[arg(long)]
    debug: bool,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum bytes buffered for one client before it is disconnected
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER_SIZE)]
    max_buffer: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = ServerConfig::new()
        .bind(cli.bind)
        .port(cli.port)
        .debug(cli.debug)
        .max_buffer_size(cli.max_buffer);

    let keyspace = Keyspace::new();
    let mut server = RedisServer::with_keyspace(config.clone(), keyspace.clone())
        .with_context(|| format!("failed to listen on {}", config.addr()))?;

    let handle = server.handle();
    ctrlc::set_handler(move || {
        log::info!("Stopping...");
        handle.shutdown();
    })
    .context("failed to install signal handler")?;

    server.run().context("server error")?;
    log::info!("Server stopped, discarding {} key(s)", keyspace.len());
    Ok(())
}

//! Rollcall server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:2523 with room for two clients
//! rollcall-server
//!
//! # Print the roster
//! kill -HUP <pid>
//!
//! # Custom address, capacity and roster layout
//! rollcall-server --bind 127.0.0.1:9000 --max-clients 4 --roster-format numbered
//! ```

use std::{io, process::ExitCode};

use clap::Parser;
use rollcall_core::RosterFormat;
use rollcall_server::{DEFAULT_BIND_ADDRESS, Server, ServerError, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Bounded TCP server that prints its client roster on SIGHUP
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Bounded TCP server that prints its client roster on SIGHUP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: String,

    /// Maximum concurrent clients (also the listen backlog)
    #[arg(long, default_value = "2")]
    max_clients: usize,

    /// Roster layout printed on SIGHUP (peers, numbered)
    #[arg(long, default_value = "peers")]
    roster_format: RosterFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    tracing::info!("Rollcall server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        max_clients: args.max_clients,
        roster_format: args.roster_format,
    };

    if let Err(e) = serve(config).await {
        if e.is_setup() {
            tracing::error!("startup failed: {}", e);
        } else {
            tracing::error!("server stopped: {}", e);
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Bind and run until a fatal error.
async fn serve(config: ServerRuntimeConfig) -> Result<(), ServerError> {
    let server = Server::bind(config, io::stdout())?;
    tracing::info!("Server listening on {}", server.local_addr());
    server.run().await
}

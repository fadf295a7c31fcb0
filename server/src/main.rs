use clap::Parser;
use log::info;
use server::{Server, ServerConfig};
use shared::{DEFAULT_FPS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, MAX_PORT, MIN_PORT};

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative snake arena server")]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value_t = DEFAULT_FPS)]
    tick_rate: u32,
    /// Maximum concurrent connections
    #[clap(short, long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,
    /// Lowest port the server may listen on
    #[clap(long, default_value_t = MIN_PORT)]
    min_port: u16,
    /// Highest port the server may listen on
    #[clap(long, default_value_t = MAX_PORT)]
    max_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        allowed_ports: args.min_port..=args.max_port,
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        ..ServerConfig::default()
    };

    info!(
        "Starting server on {}:{} at {} ticks/s, up to {} clients",
        config.host, config.port, config.tick_rate, config.max_clients
    );

    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_handle();
    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.shutdown();
            server_task.await??;
        }
    }

    Ok(())
}

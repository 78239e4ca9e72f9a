use clap::Parser;
use client::config::{ClientConfig, Endpoint};
use client::network::Client;
use log::{error, info};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8000")]
    server: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = "lobby")]
    room: String,

    /// Interval between movement reports in milliseconds
    #[arg(long, default_value = "33")]
    movement_interval_ms: u64,

    /// Interval between scene frames in milliseconds
    #[arg(long, default_value = "16")]
    frame_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let endpoint = Endpoint::new(args.server, args.room)?;
    let config = ClientConfig::new(endpoint)
        .with_movement_interval(Duration::from_millis(args.movement_interval_ms))
        .with_frame_interval(Duration::from_millis(args.frame_interval_ms));

    info!("Starting client...");
    info!("Connecting to: {}", config.endpoint.url());
    info!("Commands: left/right/stop to walk, start to begin, quit to leave");

    let mut client = Client::new(config).await?;
    if let Err(e) = client.run().await {
        error!("Session ended: {}", e);
        return Err(e.into());
    }

    Ok(())
}

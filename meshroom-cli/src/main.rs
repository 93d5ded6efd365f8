mod chat;
mod relay;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshroom")]
#[command(about = "Peer-to-peer chat rooms over WebRTC data channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay(relay::RelayArgs),
    /// Join a room and chat with everyone in it.
    Chat(chat::ChatArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Commands::Relay(args) => relay::run(args).await,
        Commands::Chat(args) => chat::run(args).await,
    }
}

/// Logs go to stderr so they do not interleave with the chat on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

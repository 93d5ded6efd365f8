use anyhow::{Result, bail};
use colored::*;
use meshroom::relay::RelayConfig;
use meshroom::utils::{DEFAULT_RELAY_BIND, DEFAULT_RELAY_PATH};

#[derive(clap::Args)]
pub struct RelayArgs {
    /// Address to listen on.
    #[arg(long, env = "MESHROOM_BIND", default_value = DEFAULT_RELAY_BIND)]
    bind: String,

    /// Websocket route.
    #[arg(long, default_value = DEFAULT_RELAY_PATH)]
    path: String,

    /// Also tell newcomers about members already in the room.
    #[arg(long)]
    announce_existing: bool,
}

pub async fn run(args: RelayArgs) -> Result<()> {
    if !args.path.starts_with('/') {
        bail!("Websocket path must start with '/', got {:?}", args.path);
    }

    println!(
        "{}",
        format!("📡 Relay starting on {}{}", args.bind, args.path)
            .green()
            .bold()
    );
    if args.announce_existing {
        println!("{}", "   newcomers are told about existing members".cyan());
    }

    meshroom::relay::run(RelayConfig {
        bind: args.bind,
        path: args.path,
        announce_existing: args.announce_existing,
    })
    .await
}

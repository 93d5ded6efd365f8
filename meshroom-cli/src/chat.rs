use anyhow::{Context, Result};
use colored::*;
use meshroom::client::{ClientConfig, MeshClient, MeshEvent, RoomSnapshot};
use meshroom::model::IceServerConfig;
use meshroom::utils::{DEFAULT_RELAY_URL, DEFAULT_ROOM};
use meshroom::RoomId;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(clap::Args)]
pub struct ChatArgs {
    /// Relay websocket URL.
    #[arg(long, env = "MESHROOM_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    url: String,

    #[arg(long, env = "MESHROOM_ROOM", default_value = DEFAULT_ROOM)]
    room: String,

    /// Display name; a random animal when omitted.
    #[arg(long, env = "MESHROOM_NAME")]
    name: Option<String>,

    /// STUN server URL. Repeat, or comma-separate in the env var, for several.
    #[arg(long = "ice", env = "MESHROOM_ICE", value_delimiter = ',')]
    ice: Vec<String>,
}

impl ChatArgs {
    fn into_config(self) -> ClientConfig {
        let mut config = ClientConfig {
            relay_url: self.url,
            room_id: RoomId::new(self.room),
            ..ClientConfig::default()
        };
        if let Some(name) = self.name {
            config.username = name;
        }
        if !self.ice.is_empty() {
            config.transport.ice_servers = self.ice.into_iter().map(IceServerConfig::stun).collect();
        }
        config
    }
}

pub async fn run(args: ChatArgs) -> Result<()> {
    let config = args.into_config();
    println!(
        "{}",
        format!("🚀 Joining room {} as {}...", config.room_id, config.username)
            .green()
            .bold()
    );
    println!("{}", "   /peers lists the room, /quit leaves".dimmed());

    let MeshClient {
        handle,
        mut events,
        task,
    } = meshroom::client::connect(config)
        .await
        .context("Failed to connect to relay")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    handle.leave().await?;
                    break;
                };
                let text = line.trim();
                if text == "/quit" {
                    handle.leave().await?;
                    break;
                } else if text == "/peers" {
                    print_snapshot(&handle.snapshot().await?);
                } else if !text.is_empty() {
                    handle.send(text).await?;
                }
            }
        }
    }

    task.await.context("Mesh task panicked")?;
    println!("{}", "👋 Left the room".green());
    Ok(())
}

fn print_event(event: &MeshEvent) {
    match event {
        MeshEvent::Identity(id) => {
            println!("{} {}", "Connected as".green(), id.to_string().bold())
        }
        MeshEvent::PeerJoined(id) => println!("{}", format!("→ {id} joined").cyan()),
        MeshEvent::PeerConnected(id) => {
            println!("{}", format!("✔ channel open with {id}").green())
        }
        MeshEvent::PeerDisconnected(id) => {
            println!("{}", format!("✖ channel closed with {id}").yellow())
        }
        MeshEvent::PeerLeft(id) => println!("{}", format!("← {id} left").yellow()),
        MeshEvent::Chat(record) => {
            let time = record.received_at.format("%H:%M:%S").to_string();
            let sender = if record.from_me {
                "you".blue().bold()
            } else {
                record.sender.as_str().magenta().bold()
            };
            println!("{} {}: {}", time.dimmed(), sender, record.text);
        }
        MeshEvent::RelayClosed => println!(
            "{}",
            "Relay connection lost; open channels keep working".red()
        ),
    }
}

fn print_snapshot(snapshot: &RoomSnapshot) {
    let you = snapshot
        .local_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(not assigned yet)".to_owned());

    println!(
        "{} {}  {} {}  {} {}/{}",
        "room".dimmed(),
        snapshot.room_id.to_string().bold(),
        "you".dimmed(),
        you,
        "connected".dimmed(),
        snapshot.connected,
        snapshot.members.len()
    );
    for member in &snapshot.members {
        println!("   • {member}");
    }
    if !snapshot.relay_open {
        println!("{}", "   relay offline".red());
    }
}

use clap::Parser;
use client::game::ClientGameState;
use client::input::{parse_input, InputAction, InputManager};
use client::network::ServerConnection;
use client::ClientError;
use log::{info, warn};
use shared::{Command, GameMode, ServerMessage, WorldType, DEFAULT_PORT};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless snake arena client", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "player")]
    name: String,

    /// Start a new game before joining: 1 = standard, 2 = timed
    #[arg(short = 'm', long)]
    mode: Option<i64>,

    /// World type for a new game: 1 = wrap, 2 = obstacles
    #[arg(long, default_value_t = 1)]
    world: i64,

    /// Time limit in seconds for a timed game
    #[arg(short = 't', long, default_value_t = 120)]
    time_limit: u32,

    /// Grid width for a new game
    #[arg(short = 'W', long)]
    width: Option<i32>,

    /// Grid height for a new game (no short flag to avoid conflict with --help)
    #[arg(long)]
    height: Option<i32>,

    /// Snapshots older than this are flagged stale in the feed
    #[arg(long, default_value_t = 1000)]
    stale_ms: u64,
}

fn new_game_command(args: &Args) -> Result<Option<Command>, Box<dyn std::error::Error>> {
    let Some(mode) = args.mode else {
        return Ok(None);
    };
    let mode = GameMode::from_wire(mode).ok_or("mode must be 1 or 2")?;
    let world_type = WorldType::from_wire(args.world).ok_or("world must be 1 or 2")?;
    let dimensions = match (args.width, args.height) {
        (Some(width), Some(height)) => Some((width, height)),
        (None, None) => None,
        _ => return Err("--width and --height must be given together".into()),
    };
    Ok(Some(Command::NewGame {
        mode,
        world_type,
        time_limit: args.time_limit,
        dimensions,
    }))
}

/// Forwards stdin lines as parsed actions until stdin closes.
async fn read_input(actions: mpsc::Sender<InputAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(action) = parse_input(&line) {
            if actions.send(action).await.is_err() {
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let stale_after = Duration::from_millis(args.stale_ms);

    info!("Connecting to: {}", args.server);
    info!("Controls: w/a/s/d (one per line) to steer, q to quit");

    let mut connection = ServerConnection::connect(&args.server).await?;
    if let Some(command) = new_game_command(&args)? {
        connection.send(&command).await?;
    }
    connection
        .send(&Command::Join {
            name: args.name.clone(),
        })
        .await?;

    let (action_tx, mut action_rx) = mpsc::channel(16);
    tokio::spawn(read_input(action_tx));

    let mut state = ClientGameState::new();
    let mut input = InputManager::new();

    loop {
        tokio::select! {
            message = connection.next_message() => {
                let message = match message {
                    Ok(message) => message,
                    Err(ClientError::Disconnected) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                };
                if message == ServerMessage::ServerFull {
                    warn!("Server is full");
                    return Err(ClientError::ServerFull.into());
                }
                if let ServerMessage::Assign { slot } = message {
                    info!("Assigned slot {}", slot);
                }
                if state.apply(message) {
                    if let Some(view) = state.view(Instant::now(), stale_after) {
                        println!("{}", serde_json::to_string(&view)?);
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                let heading = state.me().map(|me| me.direction);
                if let Some(command) = input.command_for(action, state.slot(), heading) {
                    connection.send(&command).await?;
                }
                if action == InputAction::Quit {
                    info!("Quitting");
                    break;
                }
            }
        }
    }

    Ok(())
}

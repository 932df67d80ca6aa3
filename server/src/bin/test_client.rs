//! Headless client for exercising a running server without a window
//!
//! Walks back and forth by sending move commands at a fixed rate and logs
//! every snapshot it receives.

use clap::Parser;
use log::{error, info, warn};
use shared::{decode_state_update, encode_line, Message, MoveCommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{interval, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Move commands sent per second
    #[arg(short = 'm', long, default_value_t = 10)]
    moves_per_second: u32,

    /// Moves in one direction before turning around
    #[arg(long, default_value_t = 20)]
    steps: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {} from {}", args.server, stream.local_addr()?);

    let (reader, mut writer) = stream.into_split();

    let receiver = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match decode_state_update(&line) {
                    Ok(state) => info!("You: {} Others: {:?}", state.you, state.others),
                    Err(e) => {
                        warn!("Bad update from server: {}", e);
                        break;
                    }
                },
                Ok(None) => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    error!("Error receiving update: {}", e);
                    break;
                }
            }
        }
    });

    let mut ticker = interval(Duration::from_millis(
        1000 / u64::from(args.moves_per_second.max(1)),
    ));
    let mut command = MoveCommand::MoveRight;
    let mut sent: u32 = 0;

    while !receiver.is_finished() {
        ticker.tick().await;

        let line = encode_line(&Message::Move(command))?;
        writer.write_all(line.as_bytes()).await?;

        sent += 1;
        if sent % args.steps.max(1) == 0 {
            command = match command {
                MoveCommand::MoveLeft => MoveCommand::MoveRight,
                MoveCommand::MoveRight => MoveCommand::MoveLeft,
            };
        }
    }

    Ok(())
}

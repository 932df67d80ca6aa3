use clap::Parser;
use client::buffer::SnapshotBuffer;
use client::game::ClientGame;
use client::input::InputManager;
use client::network::Connection;
use client::rendering::{RenderConfig, Renderer};
use log::{error, info};
use macroquad::window::{next_frame, Conf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "500")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "500")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Position Sync".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run(Args::parse()).await {
        error!("Client error: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: A/D or arrow keys to move");
    info!("Press 1/2 to toggle Prediction/Interpolation");

    // Network tasks live on their own runtime, the window loop stays on macroquad's
    let runtime = tokio::runtime::Runtime::new()?;
    let buffer = SnapshotBuffer::new();
    let connection = runtime.block_on(Connection::open(&args.server, buffer.clone()))?;

    let mut game = ClientGame::new();
    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new(args.width, args.height);

    loop {
        let (toggles, command) = input_manager.update();
        if toggles.prediction {
            game.toggle_prediction();
        }
        if toggles.interpolation {
            game.toggle_interpolation();
        }

        if let Some(command) = command {
            if connection.send_move(command) {
                game.predict(command);
            }
        }

        game.receive(buffer.drain());
        game.update(Instant::now());

        renderer.render(
            game.state(),
            RenderConfig {
                connected: connection.is_connected(),
                prediction_enabled: game.prediction_enabled(),
                interpolation_enabled: game.interpolation_enabled(),
                pending_snapshots: game.pending_len(),
            },
        );

        next_frame().await;
    }
}

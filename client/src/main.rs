use clap::Parser;
use client::config::GameConfig;
use client::game::{Game, GameEvent};
use client::input::InputManager;
use client::network::UdpTransport;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::{next_frame, Conf};
use shared::{get_timestamp, DEFAULT_ROOM};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = DEFAULT_ROOM)]
    room: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Space Battle".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
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
    info!("Connecting to: {} (room {})", args.server, args.room);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Controls: WASD/arrows to move, Space to shoot, Enter to spawn, R to restart");

    let transport = UdpTransport::new(&args.server, args.fake_ping, Duration::from_secs(3))?;
    let mut game = Game::new(GameConfig::with_room(args.room), transport);
    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new(args.width, args.height)?;

    // A failed join stays on screen; the player can retry with R.
    if game.connect(get_timestamp()).is_ok() {
        game.request_spawn(get_timestamp());
    }

    loop {
        let (input, actions) = input_manager.update();
        let now = get_timestamp();

        if actions.restart {
            if game.restart(now).is_ok() {
                game.request_spawn(now);
            }
        } else if actions.spawn {
            game.request_spawn(now);
        }

        for event in game.tick(now, &input) {
            match event {
                GameEvent::Eliminated => info!("Eliminated with score {}", game.score()),
                GameEvent::Disconnected => error!("Disconnected from room"),
                other => log::debug!("{:?}", other),
            }
        }

        renderer.render(&game);
        next_frame().await;
    }
}

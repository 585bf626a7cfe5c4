use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const WORLD_BOUND: f32 = 4096.0;
pub const MOVEMENT_PER_TICK: f32 = 10.0;
pub const SHIP_WIDTH: f32 = 99.0;
pub const SHIP_HEIGHT: f32 = 75.0;
pub const MAX_HP: i32 = 100;
pub const LASER_SPEED: f32 = 1000.0;
pub const LASER_DAMAGE: i32 = 34;
pub const LASER_LIFETIME_MS: u64 = 1000;
pub const SHOOT_COOLDOWN_MS: u64 = 500;
pub const HEARTBEAT_INTERVAL_MS: u64 = 3000;
pub const STALE_TIMEOUT_MS: u64 = 5000;
pub const HUD_REFRESH_MS: u64 = 3000;
pub const INTERPOLATION_FRACTION: f32 = 0.333;
pub const DEFAULT_ROOM: &str = "battle_room";

/// Entity ids are `u16` on the wire; locally generated ids stay below this.
pub const ID_SPACE: u16 = 65000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Position plus facing in degrees.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32, angle: f32) -> Self {
        Self { x, y, angle }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Collectible,
    Projectile,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: u16,
    pub position: Position,
    pub angle: f32,
    pub is_spawned: bool,
    pub score: i32,
    pub hp: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StarState {
    pub id: u16,
    pub position: Position,
    pub is_despawned: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LaserState {
    pub id: u16,
    pub origin: Position,
    pub velocity: Position,
    pub player_id: u16,
    pub is_despawned: bool,
}

/// Full-collection view of the room as the server sees it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    pub players: Vec<PlayerState>,
    pub stars: Vec<StarState>,
    pub lasers: Vec<LaserState>,
}

/// Messages the room pushes to a joined client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerMessage {
    State(WorldSnapshot),
    Removed { kind: EntityKind, id: u16 },
    Despawn { id: u16 },
    Ping { timestamp: u64 },
    Pong { timestamp: u64 },
}

/// Commands a client sends into its room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Command {
    Spawn { id: u16, x: f32, y: f32 },
    Move { x: f32, y: f32, angle: f32 },
    /// `x`/`y` carry the projectile velocity; the room takes the origin from the shooter.
    Shoot { id: u16, x: f32, y: f32 },
    StarCollected { id: u16 },
    LaserHit { id: u16, laser_id: u16 },
    PlayerCollision { id: u16 },
    UpdateHp { hp: i32 },
    GameOver,
    Ping { timestamp: u64 },
    Pong { echoed_timestamp: u64 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Spawn { .. } => "spawn",
            Command::Move { .. } => "move",
            Command::Shoot { .. } => "shoot",
            Command::StarCollected { .. } => "starCollected",
            Command::LaserHit { .. } => "laserHit",
            Command::PlayerCollision { .. } => "playerCollision",
            Command::UpdateHp { .. } => "updateHp",
            Command::GameOver => "gameover",
            Command::Ping { .. } => "ping",
            Command::Pong { .. } => "pong",
        }
    }
}

/// Identifies a joined room session so it can be resumed later.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomHandle {
    pub room_id: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join { room: String },
    Rejoin { room_id: String, session_id: String },
    Leave,
    Command(Command),

    Joined { room_id: String, session_id: String },
    Rejected { reason: String },
    Server(ServerMessage),
}

/// Milliseconds since the unix epoch.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

use shared::{
    DEFAULT_ROOM, HEARTBEAT_INTERVAL_MS, HUD_REFRESH_MS, INTERPOLATION_FRACTION,
    LASER_DAMAGE, LASER_LIFETIME_MS, LASER_SPEED, MOVEMENT_PER_TICK, SHIP_HEIGHT, SHIP_WIDTH,
    SHOOT_COOLDOWN_MS, STALE_TIMEOUT_MS, WORLD_BOUND,
};

/// Tunables for one game session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub room: String,
    pub world_bound: f32,
    pub movement_per_tick: f32,
    pub interpolation_fraction: f32,
    pub ship_width: f32,
    pub ship_height: f32,
    pub laser_speed: f32,
    pub laser_damage: i32,
    pub laser_lifetime_ms: u64,
    pub shoot_cooldown_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub stale_timeout_ms: u64,
    pub hud_refresh_ms: u64,
}

impl GameConfig {
    pub fn with_room(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            ..Self::default()
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            world_bound: WORLD_BOUND,
            movement_per_tick: MOVEMENT_PER_TICK,
            interpolation_fraction: INTERPOLATION_FRACTION,
            ship_width: SHIP_WIDTH,
            ship_height: SHIP_HEIGHT,
            laser_speed: LASER_SPEED,
            laser_damage: LASER_DAMAGE,
            laser_lifetime_ms: LASER_LIFETIME_MS,
            shoot_cooldown_ms: SHOOT_COOLDOWN_MS,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
            stale_timeout_ms: STALE_TIMEOUT_MS,
            hud_refresh_ms: HUD_REFRESH_MS,
        }
    }
}

//! Typed entity records for the three replicated kinds.
//!
//! Every entity shares the same replication fields (id, rendered position,
//! latest server transform, despawn and visibility flags); what differs per
//! kind lives in a dedicated data record so that a player field can never be
//! read off a projectile.

use shared::{EntityKind, Position, Transform, MAX_HP};

/// Kind-specific payload carried by an [`Entity`].
pub trait KindData: std::fmt::Debug + Clone {
    const KIND: EntityKind;

    /// Merges an authoritative update into an existing record.
    ///
    /// Local bookkeeping (send history, cooldowns, spawn timing) survives;
    /// server-owned fields are overwritten.
    fn refresh(&mut self, incoming: Self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub score: i32,
    pub hp: i32,
    /// Last transform successfully sent while locally controlled.
    pub last_sent: Option<Transform>,
    pub shoot_cooldown: bool,
}

impl PlayerData {
    pub fn new(score: i32, hp: i32) -> Self {
        Self {
            score,
            hp: hp.clamp(0, MAX_HP),
            last_sent: None,
            shoot_cooldown: false,
        }
    }
}

impl KindData for PlayerData {
    const KIND: EntityKind = EntityKind::Player;

    fn refresh(&mut self, incoming: Self) {
        self.score = incoming.score;
        self.hp = incoming.hp.clamp(0, MAX_HP);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollectibleData;

impl KindData for CollectibleData {
    const KIND: EntityKind = EntityKind::Collectible;

    fn refresh(&mut self, _incoming: Self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileData {
    pub owner_id: u16,
    pub velocity: Position,
    /// Local clock (ms) when the projectile was created on this client.
    pub spawned_at: u64,
    /// Tick on which the projectile was created on this client.
    pub spawn_tick: u64,
    pub fired_locally: bool,
}

impl KindData for ProjectileData {
    const KIND: EntityKind = EntityKind::Projectile;

    fn refresh(&mut self, incoming: Self) {
        self.owner_id = incoming.owner_id;
        self.velocity = incoming.velocity;
    }
}

/// Facing in degrees for a velocity vector, 0 pointing up the screen.
pub fn heading_degrees(velocity: Position) -> f32 {
    if velocity.x == 0.0 && velocity.y == 0.0 {
        return 0.0;
    }
    velocity.x.atan2(-velocity.y).to_degrees().rem_euclid(360.0)
}

#[derive(Debug, Clone)]
pub struct Entity<D: KindData> {
    pub id: u16,
    /// Rendered position, moved by interpolation or local prediction.
    pub position: Position,
    pub angle: f32,
    /// Latest authoritative transform; the interpolation target.
    pub target: Transform,
    pub locally_controlled: bool,
    pub despawned: bool,
    /// Cleared once an overlap consumed this entity.
    pub visible: bool,
    pub data: D,
}

impl<D: KindData> Entity<D> {
    pub fn new(id: u16, transform: Transform, data: D) -> Self {
        Self {
            id,
            position: transform.position(),
            angle: transform.angle,
            target: transform,
            locally_controlled: false,
            despawned: false,
            visible: true,
            data,
        }
    }

    pub fn kind(&self) -> EntityKind {
        D::KIND
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position.x, self.position.y, self.angle)
    }

    /// Live entities take part in interpolation and overlap passes.
    pub fn is_live(&self) -> bool {
        !self.despawned
    }
}

/// Local health pool, clamped to `[0, MAX_HP]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health(i32);

impl Health {
    pub fn full() -> Self {
        Health(MAX_HP)
    }

    pub fn amount(&self) -> i32 {
        self.0
    }

    pub fn set(&mut self, amount: i32) {
        self.0 = amount.clamp(0, MAX_HP);
    }

    pub fn damage(&mut self, amount: i32) {
        self.set(self.0.saturating_sub(amount));
    }

    pub fn is_depleted(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::full()
    }
}

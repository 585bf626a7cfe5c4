//! The per-session coordinator.
//!
//! `Game` owns the session, one store per entity kind, the deferred action
//! scheduler and the HUD model. Everything happens inside [`Game::tick`],
//! in a fixed order:
//!
//! 0. session upkeep, inbound messages, due deferred actions
//! 1. local input prediction and shooting
//! 2. projectile flight and interpolation
//! 3. purge of despawned entities
//! 4. overlap consequences and the health check
//! 5. transform send, only when it changed
//! 6. HUD refresh

use crate::config::GameConfig;
use crate::entity::{
    heading_degrees, CollectibleData, Entity, Health, PlayerData, ProjectileData,
};
use crate::hud::Hud;
use crate::input::InputState;
use crate::interpolation;
use crate::overlap::{Overlap, OverlapDetector};
use crate::scheduler::{Deferred, Scheduler};
use crate::session::{Session, SessionError, SessionEvent, SessionState};
use crate::store::{EntityStore, Upsert};
use crate::transport::Transport;
use log::{debug, info, warn};
use rand::Rng;
use shared::{
    Command, EntityKind, LaserState, PlayerState, Position, ServerMessage, StarState, Transform,
    WorldSnapshot, ID_SPACE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    GameOver,
}

/// Gameplay events handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The room accepted our spawn; the local ship exists.
    Spawned,
    Collected { star_id: u16 },
    /// A remote laser hit the local ship.
    Hit { laser_id: u16, owner_id: u16, hp: i32 },
    /// A laser we fired hit a remote ship.
    Landed { laser_id: u16, target_id: u16 },
    Collided { other_id: u16 },
    Eliminated,
    ConnectionLost,
    Resumed,
    Disconnected,
}

pub struct Game<T: Transport> {
    config: GameConfig,
    session: Session<T>,
    players: EntityStore<PlayerData>,
    stars: EntityStore<CollectibleData>,
    lasers: EntityStore<ProjectileData>,
    scheduler: Scheduler,
    overlap: OverlapDetector,
    hud: Hud,
    local_id: u16,
    health: Health,
    phase: Phase,
    tick_count: u64,
    last_tick_at: Option<u64>,
    spawn_requested_at: Option<u64>,
    connection_error: Option<String>,
}

impl<T: Transport> Game<T> {
    pub fn new(config: GameConfig, transport: T) -> Self {
        Self::with_player_id(config, transport, random_player_id())
    }

    pub fn with_player_id(config: GameConfig, transport: T, local_id: u16) -> Self {
        let session = Session::new(
            transport,
            config.heartbeat_interval_ms,
            config.stale_timeout_ms,
        );
        let overlap = OverlapDetector::new(config.ship_width, config.ship_height);
        let hud = Hud::new(config.hud_refresh_ms);

        Self {
            config,
            session,
            players: EntityStore::new(),
            stars: EntityStore::new(),
            lasers: EntityStore::new(),
            scheduler: Scheduler::new(),
            overlap,
            hud,
            local_id,
            health: Health::full(),
            phase: Phase::Active,
            tick_count: 0,
            last_tick_at: None,
            spawn_requested_at: None,
            connection_error: None,
        }
    }

    /// Joins the configured room. The error is also kept for presentation.
    pub fn connect(&mut self, now: u64) -> Result<(), SessionError> {
        self.connection_error = None;
        let room = self.config.room.clone();
        self.session.connect(&room, now).map_err(|e| {
            self.connection_error = Some(e.to_string());
            e
        })
    }

    pub fn tick(&mut self, now: u64, input: &InputState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick_count += 1;
        self.hud.record_frame();

        self.update_session(now, &mut events);
        for message in self.session.drain_inbound(now) {
            self.apply_message(message, now, &mut events);
        }
        self.run_deferred(now);

        if self.phase == Phase::Active {
            self.predict(now, input);
        }

        let dt = self
            .last_tick_at
            .map(|last| now.saturating_sub(last) as f32 / 1000.0)
            .unwrap_or(0.0);
        self.last_tick_at = Some(now);
        interpolation::extrapolate(&mut self.lasers, dt);
        let fraction = self.config.interpolation_fraction;
        interpolation::advance(&mut self.players, fraction);
        interpolation::advance(&mut self.stars, fraction);
        interpolation::advance(&mut self.lasers, fraction);

        let purged = self.players.purge_despawned()
            + self.stars.purge_despawned()
            + self.lasers.purge_despawned();
        if purged > 0 {
            debug!("Purged {} despawned entities", purged);
        }

        if self.phase == Phase::Active && self.local_alive() {
            self.resolve_overlaps(&mut events);
            if self.health.is_depleted() {
                self.enter_game_over(&mut events);
            }
        }

        if self.phase == Phase::Active {
            self.send_transform();
        }

        if let Some(local) = self.local_player() {
            let position = local.position;
            self.hud.set_coordinates(position);
        }
        self.hud
            .maybe_refresh(now, &self.players, self.local_id, self.session.rtt());

        events
    }

    /// Asks the room to spawn the local ship somewhere in the world.
    pub fn request_spawn(&mut self, now: u64) -> bool {
        let bound = self.config.world_bound;
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(0.0..bound);
        let y = rng.gen_range(0.0..bound);
        self.request_spawn_at(now, x, y)
    }

    pub fn request_spawn_at(&mut self, now: u64, x: f32, y: f32) -> bool {
        if self.phase == Phase::GameOver {
            warn!("Cannot spawn after game over, restart first");
            return false;
        }
        if self.local_alive() {
            debug!("Already spawned");
            return false;
        }

        self.health = Health::full();
        self.spawn_requested_at = Some(now);
        info!("Requesting spawn of {} at ({:.0}, {:.0})", self.local_id, x, y);
        self.session.send(&Command::Spawn {
            id: self.local_id,
            x,
            y,
        })
    }

    /// Leaves, forgets the world and joins again as a fresh player.
    pub fn restart(&mut self, now: u64) -> Result<(), SessionError> {
        info!("Restarting");
        self.session.leave();
        self.reset_world();
        self.local_id = random_player_id();
        self.health = Health::full();
        self.phase = Phase::Active;
        self.spawn_requested_at = None;
        self.connect(now)
    }

    /// Explicit disconnect.
    pub fn leave(&mut self) {
        self.session.leave();
        self.reset_world();
    }

    fn update_session(&mut self, now: u64, events: &mut Vec<GameEvent>) {
        match self.session.update(now) {
            Some(SessionEvent::ConnectionLost) => events.push(GameEvent::ConnectionLost),
            Some(SessionEvent::Resumed) => {
                self.reset_world();
                events.push(GameEvent::Resumed);
            }
            Some(SessionEvent::ReconnectFailed) => {
                self.connection_error = Some("connection lost".to_string());
                events.push(GameEvent::Disconnected);
            }
            None => {}
        }
    }

    fn reset_world(&mut self) {
        self.players.clear();
        self.stars.clear();
        self.lasers.clear();
        self.scheduler.cancel_all();
        self.hud.reset();
        self.last_tick_at = None;
    }

    fn apply_message(&mut self, message: ServerMessage, now: u64, events: &mut Vec<GameEvent>) {
        match message {
            ServerMessage::State(snapshot) => self.apply_snapshot(snapshot, now, events),
            ServerMessage::Removed { kind, id } => {
                match kind {
                    EntityKind::Player => self.despawn_player(id, events),
                    EntityKind::Collectible => {
                        self.stars.mark_despawned(id);
                    }
                    EntityKind::Projectile => {
                        self.lasers.mark_despawned(id);
                    }
                }
            }
            ServerMessage::Despawn { id } => self.despawn_player(id, events),
            other => debug!("Unhandled message {:?}", other),
        }
    }

    fn apply_snapshot(&mut self, snapshot: WorldSnapshot, now: u64, events: &mut Vec<GameEvent>) {
        for player in snapshot.players {
            self.apply_player(player, now, events);
        }
        for star in snapshot.stars {
            self.apply_star(star);
        }
        for laser in snapshot.lasers {
            self.apply_laser(laser, now);
        }
    }

    fn apply_player(&mut self, state: PlayerState, now: u64, events: &mut Vec<GameEvent>) {
        if !state.is_spawned {
            self.despawn_player(state.id, events);
            return;
        }

        let is_local = state.id == self.local_id;
        let reported_before = self.players.get(state.id).map(|p| p.data.hp);
        let transform = Transform::new(state.position.x, state.position.y, state.angle);

        match self
            .players
            .upsert(state.id, transform, PlayerData::new(state.score, state.hp))
        {
            Upsert::Created(_) if is_local => {
                if self.phase == Phase::GameOver {
                    return;
                }
                if let Some(local) = self.players.get_mut(state.id) {
                    local.locally_controlled = true;
                }
                self.health.set(state.hp);
                match self.spawn_requested_at {
                    Some(at) => info!("Spawn accepted after {}ms", now.saturating_sub(at)),
                    None => info!("Spawn accepted"),
                }
                events.push(GameEvent::Spawned);
            }
            Upsert::Updated(_) if is_local => {
                if reported_before != Some(state.hp) {
                    debug!("Server reports hp {}", state.hp);
                    self.health.set(state.hp);
                }
            }
            Upsert::Created(_) => debug!("Player {} joined", state.id),
            Upsert::Updated(_) | Upsert::Ignored => {}
        }
    }

    fn despawn_player(&mut self, id: u16, events: &mut Vec<GameEvent>) {
        let was_live = self.players.get(id).map_or(false, |p| p.is_live());
        if !self.players.mark_despawned(id) {
            return;
        }
        if id == self.local_id && was_live {
            info!("Local player removed by the room");
            self.enter_game_over(events);
        }
    }

    fn apply_star(&mut self, state: StarState) {
        if state.is_despawned {
            self.stars.mark_despawned(state.id);
            return;
        }
        let transform = Transform::new(state.position.x, state.position.y, 0.0);
        self.stars.upsert(state.id, transform, CollectibleData);
    }

    fn apply_laser(&mut self, state: LaserState, now: u64) {
        if state.player_id == self.local_id {
            return;
        }
        // Known lasers fly on their own; only the despawn flag is authoritative.
        if self.lasers.contains(state.id) {
            if state.is_despawned {
                self.lasers.mark_despawned(state.id);
            }
            return;
        }
        if state.is_despawned {
            return;
        }

        let transform = Transform::new(
            state.origin.x,
            state.origin.y,
            heading_degrees(state.velocity),
        );
        let data = ProjectileData {
            owner_id: state.player_id,
            velocity: state.velocity,
            spawned_at: now,
            spawn_tick: self.tick_count,
            fired_locally: false,
        };
        if let Upsert::Created(handle) = self.lasers.upsert(state.id, transform, data) {
            self.scheduler.schedule(
                now + self.config.laser_lifetime_ms,
                Deferred::DespawnProjectile(handle),
            );
        }
    }

    fn run_deferred(&mut self, now: u64) {
        for action in self.scheduler.drain_due(now) {
            match action {
                Deferred::DespawnProjectile(handle) => match self.lasers.resolve_mut(handle) {
                    Some(laser) => laser.despawned = true,
                    None => debug!("Laser slot {} was reused, skipping despawn", handle.index()),
                },
                Deferred::ClearShootCooldown(handle) => {
                    if let Some(player) = self.players.resolve_mut(handle) {
                        player.data.shoot_cooldown = false;
                    }
                }
            }
        }
    }

    fn predict(&mut self, now: u64, input: &InputState) {
        let step = self.config.movement_per_tick;
        let bound = self.config.world_bound;

        let Some(local) = self.players.get_mut(self.local_id) else {
            return;
        };
        if !local.is_live() {
            return;
        }

        let mut angle = local.angle;
        if input.left {
            local.position.x -= step;
            angle = 270.0;
        } else if input.right {
            local.position.x += step;
            angle = 90.0;
        }
        if input.up {
            local.position.y -= step;
            angle = 0.0;
        } else if input.down {
            local.position.y += step;
            angle = 180.0;
        }
        local.position.x = local.position.x.clamp(0.0, bound);
        local.position.y = local.position.y.clamp(0.0, bound);
        local.angle = angle;

        if input.shoot && !local.data.shoot_cooldown {
            local.data.shoot_cooldown = true;
            let origin = local.position;
            self.fire(now, origin, angle);
        }
    }

    fn fire(&mut self, now: u64, origin: Position, angle: f32) {
        let speed = self.config.laser_speed;
        let velocity = match angle as i32 {
            90 => Position::new(speed, 0.0),
            180 => Position::new(0.0, speed),
            270 => Position::new(-speed, 0.0),
            _ => Position::new(0.0, -speed),
        };

        let mut rng = rand::thread_rng();
        let mut id = rng.gen_range(0..ID_SPACE);
        while self.lasers.contains(id) {
            id = rng.gen_range(0..ID_SPACE);
        }

        let data = ProjectileData {
            owner_id: self.local_id,
            velocity,
            spawned_at: now,
            spawn_tick: self.tick_count,
            fired_locally: true,
        };
        let transform = Transform::new(origin.x, origin.y, angle);
        if let Upsert::Created(handle) = self.lasers.upsert(id, transform, data) {
            self.scheduler.schedule(
                now + self.config.laser_lifetime_ms,
                Deferred::DespawnProjectile(handle),
            );
        }
        if let Some(handle) = self.players.handle(self.local_id) {
            self.scheduler.schedule(
                now + self.config.shoot_cooldown_ms,
                Deferred::ClearShootCooldown(handle),
            );
        }

        self.session.send(&Command::Shoot {
            id,
            x: velocity.x,
            y: velocity.y,
        });
    }

    fn resolve_overlaps(&mut self, events: &mut Vec<GameEvent>) {
        let overlaps = match self.players.get(self.local_id) {
            Some(local) => self.overlap.check_all(
                local,
                &self.players,
                &self.stars,
                &self.lasers,
                self.tick_count,
            ),
            None => return,
        };

        let mut collided = false;
        for overlap in overlaps {
            match overlap {
                Overlap::Collectible { star_id } => {
                    if let Some(star) = self.stars.get_mut(star_id) {
                        star.visible = false;
                    }
                    self.session.send(&Command::StarCollected { id: star_id });
                    events.push(GameEvent::Collected { star_id });
                }
                Overlap::Projectile { laser_id, owner_id } => {
                    self.hide_laser(laser_id);
                    self.health.damage(self.config.laser_damage);
                    let hp = self.health.amount();
                    debug!("Hit by laser {} from {}, hp {}", laser_id, owner_id, hp);
                    self.session.send(&Command::LaserHit {
                        id: self.local_id,
                        laser_id,
                    });
                    self.session.send(&Command::UpdateHp { hp });
                    events.push(GameEvent::Hit {
                        laser_id,
                        owner_id,
                        hp,
                    });
                }
                Overlap::RemoteHit {
                    laser_id,
                    target_id,
                } => {
                    self.hide_laser(laser_id);
                    self.session.send(&Command::LaserHit {
                        id: target_id,
                        laser_id,
                    });
                    events.push(GameEvent::Landed {
                        laser_id,
                        target_id,
                    });
                }
                Overlap::Player { other_id } => {
                    self.session.send(&Command::PlayerCollision { id: other_id });
                    events.push(GameEvent::Collided { other_id });
                    collided = true;
                }
            }
        }

        if collided {
            self.enter_game_over(events);
        }
    }

    fn hide_laser(&mut self, laser_id: u16) {
        if let Some(laser) = self.lasers.get_mut(laser_id) {
            laser.visible = false;
        }
    }

    fn enter_game_over(&mut self, events: &mut Vec<GameEvent>) {
        if self.phase == Phase::GameOver {
            return;
        }
        info!("Game over for player {}", self.local_id);
        self.phase = Phase::GameOver;
        self.session.send(&Command::GameOver);
        events.push(GameEvent::Eliminated);
    }

    fn send_transform(&mut self) {
        let (current, last_sent) = match self.players.get(self.local_id) {
            Some(local) if local.is_live() => (local.transform(), local.data.last_sent),
            _ => return,
        };
        if last_sent == Some(current) {
            return;
        }

        let sent = self.session.send(&Command::Move {
            x: current.x,
            y: current.y,
            angle: current.angle,
        });
        if sent {
            if let Some(local) = self.players.get_mut(self.local_id) {
                local.data.last_sent = Some(current);
            }
        }
    }

    fn local_alive(&self) -> bool {
        self.players
            .get(self.local_id)
            .map_or(false, |local| local.is_live())
    }

    pub fn local_id(&self) -> u16 {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&Entity<PlayerData>> {
        self.players.get(self.local_id).filter(|local| local.is_live())
    }

    pub fn players(&self) -> &EntityStore<PlayerData> {
        &self.players
    }

    pub fn stars(&self) -> &EntityStore<CollectibleData> {
        &self.stars
    }

    pub fn lasers(&self) -> &EntityStore<ProjectileData> {
        &self.lasers
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn health(&self) -> i32 {
        self.health.amount()
    }

    pub fn score(&self) -> i32 {
        self.local_player().map_or(0, |local| local.data.score)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Where the camera should look; cleared once the game is over.
    pub fn follow_target(&self) -> Option<Position> {
        if self.phase == Phase::GameOver {
            return None;
        }
        self.local_player().map(|local| local.position)
    }

    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error.as_deref()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn rtt(&self) -> Option<u64> {
        self.session.rtt()
    }

    pub fn pending_actions(&self) -> usize {
        self.scheduler.len()
    }

    pub fn transport(&self) -> &T {
        self.session.transport()
    }
}

fn random_player_id() -> u16 {
    rand::thread_rng().gen_range(0..ID_SPACE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use assert_approx_eq::assert_approx_eq;

    const LOCAL: u16 = 1;

    fn player(id: u16, x: f32, y: f32, score: i32, hp: i32) -> PlayerState {
        PlayerState {
            id,
            position: Position::new(x, y),
            angle: 0.0,
            is_spawned: true,
            score,
            hp,
        }
    }

    fn star(id: u16, x: f32, y: f32) -> StarState {
        StarState {
            id,
            position: Position::new(x, y),
            is_despawned: false,
        }
    }

    fn laser(id: u16, owner: u16, x: f32, y: f32) -> LaserState {
        LaserState {
            id,
            origin: Position::new(x, y),
            velocity: Position::new(0.0, 0.0),
            player_id: owner,
            is_despawned: false,
        }
    }

    fn state(
        players: Vec<PlayerState>,
        stars: Vec<StarState>,
        lasers: Vec<LaserState>,
    ) -> ServerMessage {
        ServerMessage::State(WorldSnapshot {
            players,
            stars,
            lasers,
        })
    }

    fn idle() -> InputState {
        InputState::default()
    }

    /// A connected game whose local ship sits at (500, 500) after tick t=0.
    fn spawned_game() -> (Game<MemoryTransport>, MemoryTransport) {
        let remote = MemoryTransport::new();
        let mut game = Game::with_player_id(GameConfig::default(), remote.clone(), LOCAL);
        game.connect(0).unwrap();
        remote.push(state(vec![player(LOCAL, 500.0, 500.0, 0, 100)], vec![], vec![]));
        let events = game.tick(0, &idle());
        assert_eq!(events, vec![GameEvent::Spawned]);
        remote.take_sent();
        (game, remote)
    }

    #[test]
    fn test_spawn_accepted_creates_controlled_player() {
        let (game, _) = spawned_game();
        let local = game.local_player().unwrap();
        assert!(local.locally_controlled);
        assert_eq!(game.players().iter_live().filter(|p| p.locally_controlled).count(), 1);
        assert_eq!(game.follow_target(), Some(Position::new(500.0, 500.0)));
        assert_eq!(game.health(), 100);
    }

    #[test]
    fn test_request_spawn_sends_spawn() {
        let remote = MemoryTransport::new();
        let mut game = Game::with_player_id(GameConfig::default(), remote.clone(), 42);
        game.connect(0).unwrap();

        assert!(game.request_spawn(0));
        match remote.sent_named("spawn").as_slice() {
            [Command::Spawn { id, x, y }] => {
                assert_eq!(*id, 42);
                assert!((0.0f32..4096.0).contains(x));
                assert!((0.0f32..4096.0).contains(y));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unchanged_transform_is_not_resent() {
        let (mut game, remote) = spawned_game();

        game.tick(16, &idle());
        assert!(remote.sent_named("move").is_empty());

        let right = InputState {
            right: true,
            ..idle()
        };
        game.tick(32, &right);
        assert_eq!(
            remote.take_sent(),
            vec![Command::Move {
                x: 510.0,
                y: 500.0,
                angle: 90.0
            }]
        );

        game.tick(48, &idle());
        assert!(remote.sent_named("move").is_empty());
    }

    #[test]
    fn test_failed_move_send_is_retried() {
        let (mut game, remote) = spawned_game();
        remote.fail_sends(true);
        let up = InputState { up: true, ..idle() };
        game.tick(16, &up);
        remote.fail_sends(false);

        game.tick(32, &idle());
        assert_eq!(
            remote.sent_named("move"),
            vec![Command::Move {
                x: 500.0,
                y: 490.0,
                angle: 0.0
            }]
        );
    }

    #[test]
    fn test_vertical_input_decides_facing_and_world_is_clamped() {
        let (mut game, _) = spawned_game();
        let diagonal = InputState {
            left: true,
            down: true,
            ..idle()
        };
        game.tick(16, &diagonal);
        let local = game.local_player().unwrap();
        assert_approx_eq!(local.position.x, 490.0, 0.001);
        assert_approx_eq!(local.position.y, 510.0, 0.001);
        assert_approx_eq!(local.angle, 180.0, 0.001);

        for step in 0..100 {
            game.tick(32 + step, &diagonal);
        }
        let local = game.local_player().unwrap();
        assert_approx_eq!(local.position.x, 0.0, 0.001);
    }

    #[test]
    fn test_collecting_one_of_ten_stars() {
        let (mut game, remote) = spawned_game();
        let mut stars = vec![star(0, 555.0, 500.0)];
        stars.extend((1..10).map(|i| star(i, 1000.0 + 200.0 * i as f32, 1000.0)));
        remote.push(state(vec![], stars, vec![]));
        assert!(game.tick(16, &idle()).is_empty());
        assert_eq!(game.stars().len(), 10);

        let right = InputState {
            right: true,
            ..idle()
        };
        let events = game.tick(32, &right);
        assert_eq!(events, vec![GameEvent::Collected { star_id: 0 }]);
        assert!(!game.stars().get(0).unwrap().visible);
        assert_eq!(
            remote.sent_named("starCollected"),
            vec![Command::StarCollected { id: 0 }]
        );

        assert!(game.tick(48, &idle()).is_empty());
        assert_eq!(remote.sent_named("starCollected").len(), 1);
    }

    #[test]
    fn test_four_hits_in_one_tick_end_the_game_once() {
        let (mut game, remote) = spawned_game();
        let lasers = (10..14).map(|id| laser(id, 2, 500.0, 500.0)).collect();
        remote.push(state(vec![], vec![], lasers));

        let events = game.tick(16, &idle());
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Hit { .. }))
            .count();
        assert_eq!(hits, 4);
        assert_eq!(events.last(), Some(&GameEvent::Eliminated));
        assert_eq!(game.health(), 0);
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.follow_target(), None);

        assert_eq!(remote.sent_named("laserHit").len(), 4);
        assert_eq!(
            remote.sent_named("updateHp").last(),
            Some(&Command::UpdateHp { hp: 0 })
        );
        assert_eq!(remote.sent_named("gameover").len(), 1);

        game.tick(32, &idle());
        remote.push(ServerMessage::Despawn { id: LOCAL });
        game.tick(48, &idle());
        assert_eq!(remote.sent_named("gameover").len(), 1);
        assert!(remote.sent_named("move").is_empty());
    }

    #[test]
    fn test_stale_server_hp_does_not_undo_local_damage() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![], vec![], vec![laser(10, 2, 500.0, 500.0)]));
        game.tick(16, &idle());
        assert_eq!(game.health(), 66);

        remote.push(state(vec![player(LOCAL, 500.0, 500.0, 3, 100)], vec![], vec![]));
        game.tick(32, &idle());
        assert_eq!(game.health(), 66);
        assert_eq!(game.score(), 3);

        remote.push(state(vec![player(LOCAL, 500.0, 500.0, 3, 50)], vec![], vec![]));
        game.tick(48, &idle());
        assert_eq!(game.health(), 50);
    }

    #[test]
    fn test_own_laser_never_hits_the_shooter() {
        let (mut game, remote) = spawned_game();
        let fire = InputState {
            shoot: true,
            ..idle()
        };

        let mut events = game.tick(16, &fire);
        events.extend(game.tick(32, &idle()));
        events.extend(game.tick(48, &idle()));
        assert!(events.is_empty());
        assert_eq!(game.health(), 100);

        match remote.sent_named("shoot").as_slice() {
            [Command::Shoot { id, x, y }] => {
                assert!(game.lasers().contains(*id));
                assert_approx_eq!(*x, 0.0, 0.001);
                assert_approx_eq!(*y, -1000.0, 0.001);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_own_laser_echo_is_ignored() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![], vec![], vec![laser(10, LOCAL, 2000.0, 2000.0)]));
        game.tick(16, &idle());
        assert!(!game.lasers().contains(10));
    }

    #[test]
    fn test_shoot_cooldown_and_lifetime() {
        let (mut game, remote) = spawned_game();
        let fire = InputState {
            shoot: true,
            ..idle()
        };

        game.tick(16, &fire);
        game.tick(32, &fire);
        assert_eq!(remote.sent_named("shoot").len(), 1);

        game.tick(516, &fire);
        assert_eq!(remote.sent_named("shoot").len(), 2);
        let first = match remote.sent_named("shoot")[0] {
            Command::Shoot { id, .. } => id,
            _ => unreachable!(),
        };

        game.tick(1015, &idle());
        assert!(game.lasers().contains(first));
        game.tick(1016, &idle());
        assert!(!game.lasers().contains(first));
        assert_eq!(game.lasers().len(), 1);
    }

    #[test]
    fn test_laser_hits_remote_player() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![player(2, 500.0, 200.0, 0, 100)], vec![], vec![]));
        game.tick(16, &idle());

        let fire = InputState {
            shoot: true,
            ..idle()
        };
        game.tick(100, &fire);
        let laser_id = match remote.sent_named("shoot")[0] {
            Command::Shoot { id, .. } => id,
            _ => unreachable!(),
        };

        // Inert on its first two ticks, inside the target ship by the third.
        let mut events = Vec::new();
        for now in [200, 300] {
            events.extend(game.tick(now, &idle()));
        }
        assert_eq!(
            events,
            vec![GameEvent::Landed {
                laser_id,
                target_id: 2
            }]
        );
        assert_eq!(
            remote.sent_named("laserHit"),
            vec![Command::LaserHit { id: 2, laser_id }]
        );
        assert!(!game.lasers().get(laser_id).unwrap().visible);
    }

    #[test]
    fn test_player_collision_ends_the_game() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![player(2, 520.0, 500.0, 0, 100)], vec![], vec![]));
        let events = game.tick(16, &idle());
        assert_eq!(
            events,
            vec![GameEvent::Collided { other_id: 2 }, GameEvent::Eliminated]
        );
        assert_eq!(
            remote.sent_named("playerCollision"),
            vec![Command::PlayerCollision { id: 2 }]
        );
        assert_eq!(remote.sent_named("gameover").len(), 1);
    }

    #[test]
    fn test_local_despawn_is_game_over() {
        let (mut game, remote) = spawned_game();
        remote.push(ServerMessage::Despawn { id: LOCAL });
        let events = game.tick(16, &idle());
        assert_eq!(events, vec![GameEvent::Eliminated]);
        assert!(!game.players().contains(LOCAL));

        remote.push(ServerMessage::Removed {
            kind: EntityKind::Player,
            id: LOCAL,
        });
        assert!(game.tick(32, &idle()).is_empty());
        assert_eq!(remote.sent_named("gameover").len(), 1);
        assert!(!game.request_spawn(48));
    }

    #[test]
    fn test_unspawned_local_player_is_game_over() {
        let (mut game, remote) = spawned_game();
        let mut gone = player(LOCAL, 500.0, 500.0, 0, 100);
        gone.is_spawned = false;
        remote.push(state(vec![gone], vec![], vec![]));
        assert_eq!(game.tick(16, &idle()), vec![GameEvent::Eliminated]);
    }

    #[test]
    fn test_server_hp_zero_is_game_over() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![player(LOCAL, 500.0, 500.0, 0, 0)], vec![], vec![]));
        assert_eq!(game.tick(16, &idle()), vec![GameEvent::Eliminated]);
        assert_eq!(game.health(), 0);
    }

    #[test]
    fn test_reused_slot_survives_old_despawn_timer() {
        let (mut game, remote) = spawned_game();
        let fire = InputState {
            shoot: true,
            ..idle()
        };
        game.tick(16, &fire);
        let fired = match remote.sent_named("shoot")[0] {
            Command::Shoot { id, .. } => id,
            _ => unreachable!(),
        };
        let old_handle = game.lasers().handle(fired).unwrap();

        remote.push(ServerMessage::Removed {
            kind: EntityKind::Projectile,
            id: fired,
        });
        game.tick(100, &idle());
        assert!(!game.lasers().contains(fired));

        remote.push(state(vec![], vec![], vec![laser(77, 2, 2000.0, 2000.0)]));
        game.tick(200, &idle());
        let new_handle = game.lasers().handle(77).unwrap();
        assert_eq!(new_handle.index(), old_handle.index());
        assert_ne!(new_handle.generation(), old_handle.generation());

        game.tick(1016, &idle());
        assert!(game.lasers().get(77).unwrap().is_live());
        game.tick(1200, &idle());
        assert!(!game.lasers().contains(77));
    }

    #[test]
    fn test_upsert_of_despawned_star_waits_for_purge() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![], vec![star(5, 3000.0, 3000.0)], vec![]));
        game.tick(16, &idle());

        remote.push(ServerMessage::Removed {
            kind: EntityKind::Collectible,
            id: 5,
        });
        remote.push(state(vec![], vec![star(5, 100.0, 100.0)], vec![]));
        game.tick(32, &idle());
        assert!(!game.stars().contains(5));

        remote.push(state(vec![], vec![star(5, 100.0, 100.0)], vec![]));
        game.tick(48, &idle());
        assert_eq!(game.stars().get(5).unwrap().position, Position::new(100.0, 100.0));
    }

    #[test]
    fn test_remote_players_are_interpolated() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![player(2, 2000.0, 2000.0, 0, 100)], vec![], vec![]));
        game.tick(16, &idle());

        remote.push(state(vec![player(2, 2300.0, 2000.0, 0, 100)], vec![], vec![]));
        game.tick(32, &idle());
        let other = game.players().get(2).unwrap();
        assert_approx_eq!(other.position.x, 2099.9, 0.01);
        assert_approx_eq!(other.target.x, 2300.0, 0.01);
    }

    #[test]
    fn test_resume_clears_world() {
        let (mut game, remote) = spawned_game();
        remote.push(state(vec![], vec![star(5, 3000.0, 3000.0)], vec![]));
        let fire = InputState {
            shoot: true,
            ..idle()
        };
        game.tick(16, &fire);
        assert!(game.pending_actions() > 0);

        assert_eq!(game.tick(5000, &idle()), vec![GameEvent::ConnectionLost]);
        assert_eq!(game.session_state(), SessionState::Reconnecting);

        assert_eq!(game.tick(5016, &idle()), vec![GameEvent::Resumed]);
        assert_eq!(game.session_state(), SessionState::Connected);
        assert!(game.players().is_empty());
        assert!(game.stars().is_empty());
        assert!(game.lasers().is_empty());
        assert_eq!(game.pending_actions(), 0);

        remote.push(state(vec![player(LOCAL, 800.0, 800.0, 0, 100)], vec![], vec![]));
        assert_eq!(game.tick(5032, &idle()), vec![GameEvent::Spawned]);
    }

    #[test]
    fn test_failed_reconnect_surfaces_error() {
        let (mut game, remote) = spawned_game();
        remote.reject_reconnect(Some("room closed"));
        game.tick(5000, &idle());
        assert_eq!(game.tick(5016, &idle()), vec![GameEvent::Disconnected]);
        assert_eq!(game.session_state(), SessionState::Disconnected);
        assert!(game.connection_error().is_some());
    }

    #[test]
    fn test_ticks_continue_while_resume_in_flight() {
        let (mut game, remote) = spawned_game();
        remote.hold_reconnect(true);
        assert_eq!(game.tick(5000, &idle()), vec![GameEvent::ConnectionLost]);

        for now in [5016, 5032, 5048] {
            assert!(game.tick(now, &idle()).is_empty());
            assert_eq!(game.session_state(), SessionState::Reconnecting);
        }
        assert!(game.local_player().is_some());

        remote.hold_reconnect(false);
        assert_eq!(game.tick(5064, &idle()), vec![GameEvent::Resumed]);
        assert!(game.players().is_empty());
    }

    #[test]
    fn test_messages_queued_before_resume_are_dropped() {
        let (mut game, remote) = spawned_game();
        game.tick(4999, &idle());
        remote.push(state(
            vec![player(2, 900.0, 900.0, 0, 100)],
            vec![star(6, 100.0, 100.0)],
            vec![],
        ));

        assert_eq!(game.tick(5000, &idle()), vec![GameEvent::ConnectionLost]);
        assert_eq!(game.tick(5016, &idle()), vec![GameEvent::Resumed]);
        game.tick(5032, &idle());
        assert!(game.players().is_empty());
        assert!(game.stars().is_empty());
    }

    #[test]
    fn test_despawned_entries_for_unknown_ids_are_ignored() {
        let (mut game, remote) = spawned_game();
        let gone_star = StarState {
            is_despawned: true,
            ..star(40, 700.0, 700.0)
        };
        let gone_laser = LaserState {
            is_despawned: true,
            ..laser(41, 2, 700.0, 700.0)
        };
        remote.push(state(vec![], vec![gone_star], vec![gone_laser]));

        game.tick(16, &idle());
        assert!(game.stars().is_empty());
        assert!(game.lasers().is_empty());
        assert_eq!(game.pending_actions(), 0);
    }

    #[test]
    fn test_connect_failure_is_kept_for_presentation() {
        let remote = MemoryTransport::new();
        remote.reject_connect(Some("room full"));
        let mut game = Game::with_player_id(GameConfig::default(), remote.clone(), LOCAL);
        assert!(game.connect(0).is_err());
        assert!(game.connection_error().unwrap().contains("room full"));
        assert_eq!(game.session_state(), SessionState::Disconnected);
        assert!(game.tick(16, &idle()).is_empty());
    }

    #[test]
    fn test_restart_rejoins_with_fresh_state() {
        let (mut game, remote) = spawned_game();
        remote.push(ServerMessage::Despawn { id: LOCAL });
        game.tick(16, &idle());
        assert_eq!(game.phase(), Phase::GameOver);

        game.restart(32).unwrap();
        assert_eq!(game.phase(), Phase::Active);
        assert_eq!(game.health(), 100);
        assert!(game.players().is_empty());
        assert_eq!(game.pending_actions(), 0);
        assert_eq!(remote.joins().len(), 2);
        assert_eq!(game.session_state(), SessionState::Connected);
    }

    #[test]
    fn test_hud_ranking_refreshes_every_three_seconds() {
        let (mut game, remote) = spawned_game();
        assert_eq!(game.hud().ranking().len(), 1);

        remote.push(state(vec![player(2, 3000.0, 3000.0, 10, 100)], vec![], vec![]));
        game.tick(16, &idle());
        assert_eq!(game.hud().ranking().len(), 1);

        remote.push(ServerMessage::Pong { timestamp: 0 });
        game.tick(3000, &idle());
        let ids: Vec<u16> = game.hud().ranking().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, LOCAL]);
        assert_eq!(game.hud().rtt_text(), "RTT: 3000ms");
    }
}

//! Point-in-box overlap detection around the locally controlled ship.

use crate::entity::{CollectibleData, Entity, PlayerData, ProjectileData};
use crate::store::EntityStore;
use shared::{Position, SHIP_HEIGHT, SHIP_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn centered(center: Position, width: f32, height: f32) -> Self {
        Self {
            min_x: center.x - width / 2.0,
            min_y: center.y - height / 2.0,
            max_x: center.x + width / 2.0,
            max_y: center.y + height / 2.0,
        }
    }

    /// Edges count as inside.
    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// The local ship flew over a star.
    Collectible { star_id: u16 },
    /// Someone else's laser is inside the local ship.
    Projectile { laser_id: u16, owner_id: u16 },
    /// A laser fired from this client is inside a remote ship.
    RemoteHit { laser_id: u16, target_id: u16 },
    /// A remote ship is inside the local ship.
    Player { other_id: u16 },
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapDetector {
    ship_width: f32,
    ship_height: f32,
    /// Ticks after creation during which a locally fired laser is inert.
    spawn_grace_ticks: u64,
}

impl OverlapDetector {
    pub fn new(ship_width: f32, ship_height: f32) -> Self {
        Self {
            ship_width,
            ship_height,
            spawn_grace_ticks: 1,
        }
    }

    pub fn ship_bounds(&self, center: Position) -> Bounds {
        Bounds::centered(center, self.ship_width, self.ship_height)
    }

    fn in_spawn_grace(&self, laser: &Entity<ProjectileData>, tick: u64) -> bool {
        laser.data.fired_locally && tick <= laser.data.spawn_tick + self.spawn_grace_ticks
    }

    /// Collects every reportable overlap for this tick.
    ///
    /// Consumed (invisible) and despawned entities never report; the caller
    /// hides whatever it consumes so the same pair cannot fire again.
    pub fn check_all(
        &self,
        local: &Entity<PlayerData>,
        players: &EntityStore<PlayerData>,
        stars: &EntityStore<CollectibleData>,
        lasers: &EntityStore<ProjectileData>,
        tick: u64,
    ) -> Vec<Overlap> {
        let mut overlaps = Vec::new();
        if !local.is_live() {
            return overlaps;
        }
        let bounds = self.ship_bounds(local.position);

        for star in stars.iter_live() {
            if star.visible && bounds.contains(star.position) {
                overlaps.push(Overlap::Collectible { star_id: star.id });
            }
        }

        for laser in lasers.iter_live() {
            if !laser.visible || self.in_spawn_grace(laser, tick) {
                continue;
            }

            if laser.data.owner_id != local.id && bounds.contains(laser.position) {
                overlaps.push(Overlap::Projectile {
                    laser_id: laser.id,
                    owner_id: laser.data.owner_id,
                });
                continue;
            }

            if !laser.data.fired_locally {
                continue;
            }
            let target = players
                .iter_live()
                .filter(|p| p.id != local.id && p.id != laser.data.owner_id)
                .find(|p| self.ship_bounds(p.position).contains(laser.position));
            if let Some(target) = target {
                overlaps.push(Overlap::RemoteHit {
                    laser_id: laser.id,
                    target_id: target.id,
                });
            }
        }

        for other in players.iter_live() {
            if other.id != local.id && !other.locally_controlled && bounds.contains(other.position) {
                overlaps.push(Overlap::Player { other_id: other.id });
            }
        }

        overlaps
    }
}

impl Default for OverlapDetector {
    fn default() -> Self {
        Self::new(SHIP_WIDTH, SHIP_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Transform;

    fn local_at(x: f32, y: f32) -> Entity<PlayerData> {
        let mut entity = Entity::new(1, Transform::new(x, y, 0.0), PlayerData::new(0, 100));
        entity.locally_controlled = true;
        entity
    }

    fn laser(owner_id: u16, fired_locally: bool, spawn_tick: u64) -> ProjectileData {
        ProjectileData {
            owner_id,
            velocity: Position::new(0.0, -1000.0),
            spawned_at: 0,
            spawn_tick,
            fired_locally,
        }
    }

    #[test]
    fn test_bounds_contains_edges() {
        let bounds = Bounds::centered(Position::new(100.0, 100.0), 100.0, 50.0);
        assert!(bounds.contains(Position::new(100.0, 100.0)));
        assert!(bounds.contains(Position::new(50.0, 75.0)));
        assert!(bounds.contains(Position::new(150.0, 125.0)));
        assert!(!bounds.contains(Position::new(150.1, 100.0)));
        assert!(!bounds.contains(Position::new(100.0, 74.9)));
    }

    #[test]
    fn test_star_overlap_respects_visibility() {
        let detector = OverlapDetector::default();
        let local = local_at(500.0, 500.0);
        let players = EntityStore::new();
        let lasers = EntityStore::new();
        let mut stars = EntityStore::new();
        stars.upsert(3, Transform::new(510.0, 490.0, 0.0), CollectibleData);
        stars.upsert(4, Transform::new(900.0, 900.0, 0.0), CollectibleData);

        let overlaps = detector.check_all(&local, &players, &stars, &lasers, 10);
        assert_eq!(overlaps, vec![Overlap::Collectible { star_id: 3 }]);

        stars.get_mut(3).unwrap().visible = false;
        assert!(detector
            .check_all(&local, &players, &stars, &lasers, 11)
            .is_empty());
    }

    #[test]
    fn test_projectile_never_hits_owner() {
        let detector = OverlapDetector::default();
        let local = local_at(500.0, 500.0);
        let players = EntityStore::new();
        let stars = EntityStore::new();
        let mut lasers = EntityStore::new();
        lasers.upsert(20, Transform::new(500.0, 500.0, 0.0), laser(1, false, 0));
        lasers.upsert(21, Transform::new(500.0, 500.0, 0.0), laser(1, true, 0));

        for tick in 0..5 {
            assert!(detector
                .check_all(&local, &players, &stars, &lasers, tick)
                .is_empty());
        }
    }

    #[test]
    fn test_enemy_projectile_hits_local() {
        let detector = OverlapDetector::default();
        let local = local_at(500.0, 500.0);
        let players = EntityStore::new();
        let stars = EntityStore::new();
        let mut lasers = EntityStore::new();
        lasers.upsert(30, Transform::new(495.0, 505.0, 0.0), laser(8, false, 0));

        let overlaps = detector.check_all(&local, &players, &stars, &lasers, 3);
        assert_eq!(
            overlaps,
            vec![Overlap::Projectile {
                laser_id: 30,
                owner_id: 8
            }]
        );
    }

    #[test]
    fn test_local_laser_hits_remote_after_grace() {
        let detector = OverlapDetector::default();
        let local = local_at(0.0, 0.0);
        let stars = EntityStore::new();
        let mut players = EntityStore::new();
        players.upsert(5, Transform::new(800.0, 800.0, 0.0), PlayerData::new(0, 100));
        let mut lasers = EntityStore::new();
        lasers.upsert(40, Transform::new(805.0, 800.0, 0.0), laser(1, true, 10));

        assert!(detector
            .check_all(&local, &players, &stars, &lasers, 10)
            .is_empty());
        assert!(detector
            .check_all(&local, &players, &stars, &lasers, 11)
            .is_empty());
        assert_eq!(
            detector.check_all(&local, &players, &stars, &lasers, 12),
            vec![Overlap::RemoteHit {
                laser_id: 40,
                target_id: 5
            }]
        );
    }

    #[test]
    fn test_remote_player_collision() {
        let detector = OverlapDetector::default();
        let local = local_at(100.0, 100.0);
        let stars = EntityStore::new();
        let lasers = EntityStore::new();
        let mut players = EntityStore::new();
        players.upsert(6, Transform::new(120.0, 110.0, 0.0), PlayerData::new(0, 100));
        players.upsert(7, Transform::new(400.0, 110.0, 0.0), PlayerData::new(0, 100));

        assert_eq!(
            detector.check_all(&local, &players, &stars, &lasers, 0),
            vec![Overlap::Player { other_id: 6 }]
        );

        players.mark_despawned(6);
        assert!(detector
            .check_all(&local, &players, &stars, &lasers, 1)
            .is_empty());
    }
}

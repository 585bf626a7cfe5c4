//! Smoothing of remote entities toward their latest server transform.

use crate::entity::{KindData, ProjectileData};
use crate::store::EntityStore;

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Moves every remote live entity `fraction` of the way to its target.
///
/// Facing snaps straight to the target angle. Locally controlled entities
/// are left alone. Returns the number of entities advanced.
pub fn advance<D: KindData>(store: &mut EntityStore<D>, fraction: f32) -> usize {
    let fraction = fraction.clamp(f32::EPSILON, 1.0);
    let mut advanced = 0;

    store.for_each_live_mut(|entity| {
        if entity.locally_controlled {
            return;
        }
        entity.position.x = lerp(entity.position.x, entity.target.x, fraction);
        entity.position.y = lerp(entity.position.y, entity.target.y, fraction);
        entity.angle = entity.target.angle;
        advanced += 1;
    });

    advanced
}

/// Carries projectiles along their velocity between server updates.
///
/// Both the rendered position and the target move, so interpolation only
/// has to absorb correction error rather than chase a flying laser.
pub fn extrapolate(store: &mut EntityStore<ProjectileData>, dt: f32) {
    store.for_each_live_mut(|laser| {
        let dx = laser.data.velocity.x * dt;
        let dy = laser.data.velocity.y * dt;
        laser.position.x += dx;
        laser.position.y += dy;
        laser.target.x += dx;
        laser.target.y += dy;
    });
}

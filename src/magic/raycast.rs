//! Aim resolution: which entity or point an actor is looking at.

use bevy::math::Vec3;

use crate::host::{EntityId, World};

use super::targeting::is_targetable;

/// Outcome of resolving an actor's aim.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RaycastResult {
    /// Entity under the crosshair, if any
    pub entity: Option<EntityId>,
    /// Entity hit point, else block hit point, else the point at max range
    pub point: Vec3,
}

/// Distance along the ray at which it passes within `radius` of `center`.
///
/// Returns the parameter of the closest approach, which is the point the
/// engine reports as the hit.
#[inline]
fn ray_sphere_hit(origin: Vec3, direction: Vec3, center: Vec3, radius: f32, max_distance: f32) -> Option<f32> {
    let t = (center - origin).dot(direction);
    if t < 0.0 || t > max_distance {
        return None;
    }
    let closest = origin + direction * t;
    (closest.distance(center) <= radius).then_some(t)
}

/// Resolve `actor`'s aim into an entity hit, a block hit or the max-range point.
///
/// Entities use a generous collision radius so small or moving targets are easy
/// to pick. Returns `None` only when the actor has no aim (unknown or removed).
pub fn raycast<W: World + ?Sized>(
    world: &W,
    actor: EntityId,
    max_distance: f32,
    hit_radius: f32,
) -> Option<RaycastResult> {
    let aim = world.aim(actor)?;
    let direction = aim.direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Some(RaycastResult {
            entity: None,
            point: aim.origin,
        });
    }

    let mut nearest: Option<(f32, EntityId)> = None;
    for candidate in world.entities_near(aim.origin, max_distance + hit_radius) {
        if candidate == actor || !is_targetable(world, candidate) {
            continue;
        }
        let Some(center) = world.position(candidate) else {
            continue;
        };
        if let Some(t) = ray_sphere_hit(aim.origin, direction, center, hit_radius, max_distance) {
            if nearest.map_or(true, |(best, _)| t < best) {
                nearest = Some((t, candidate));
            }
        }
    }

    if let Some((t, entity)) = nearest {
        return Some(RaycastResult {
            entity: Some(entity),
            point: aim.origin + direction * t,
        });
    }

    let point = world
        .raycast_blocks(aim.origin, direction, max_distance)
        .unwrap_or(aim.origin + direction * max_distance);
    Some(RaycastResult {
        entity: None,
        point,
    })
}

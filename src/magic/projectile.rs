//! Projectile pattern
//!
//! Handles spell projectiles that travel from the caster along a straight
//! line. Each tick a projectile steps forward, then checks for a living
//! entity within its hit radius and for solid geometry at its new point.
//! Either one ends the flight with the payload applied; running out of range
//! ends it with no effect.

use bevy::prelude::*;

use crate::host::{Cue, EntityId, MagicHost};

use super::resolver::SpellManager;
use super::spells::SpellId;

/// Slack when comparing travelled distance against range
const RANGE_EPSILON: f32 = 1e-4;

/// What a projectile does when it lands.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ProjectilePayload {
    /// Magic damage to the entity hit; nothing on a wall hit
    MagicDamage { amount: f32 },
    /// Magic damage to every living entity within `radius` of the impact
    Burst { amount: f32, radius: f32 },
}

/// A projectile in flight.
#[derive(Clone, Debug)]
pub struct Projectile {
    pub id: u64,
    pub owner: EntityId,
    pub spell: SpellId,
    pub point: Vec3,
    /// Normalized
    pub direction: Vec3,
    pub travelled: f32,
    pub step: f32,
    pub max_distance: f32,
    pub hit_radius: f32,
    pub payload: ProjectilePayload,
}

/// Flight parameters shared by every projectile a handler launches.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ProjectileSpec {
    pub step: f32,
    pub max_distance: f32,
    pub hit_radius: f32,
}

/// How a flight ended.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ProjectileEnd {
    HitEntity(EntityId),
    HitSolid,
    /// Ran out of range
    Fizzled,
}

/// Record of a finished flight.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ProjectileImpact {
    pub projectile: u64,
    pub owner: EntityId,
    pub spell: SpellId,
    pub point: Vec3,
    pub end: ProjectileEnd,
}

/// Every projectile in flight, stepped once per dispatcher tick.
#[derive(Debug, Default)]
pub struct ProjectileArena {
    projectiles: Vec<Projectile>,
    next_id: u64,
}

impl ProjectileArena {
    /// Launch a projectile. Returns `None` for a zero direction or a
    /// non-positive step.
    pub fn launch(
        &mut self,
        owner: EntityId,
        spell: SpellId,
        origin: Vec3,
        direction: Vec3,
        spec: ProjectileSpec,
        payload: ProjectilePayload,
    ) -> Option<u64> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || spec.step <= 0.0 {
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.projectiles.push(Projectile {
            id,
            owner,
            spell,
            point: origin,
            direction,
            travelled: 0.0,
            step: spec.step,
            max_distance: spec.max_distance.max(0.0),
            hit_radius: spec.hit_radius,
            payload,
        });
        debug!("{:?} launched {:?} projectile #{}", owner, spell, id);
        Some(id)
    }

    /// Step every projectile once and apply payloads of those that landed.
    ///
    /// A projectile is never checked on the tick it was launched, and one with
    /// max distance `d` and step `s` is gone after at most `ceil(d / s)` steps.
    pub fn advance<H: MagicHost>(&mut self, host: &mut H) -> Vec<ProjectileImpact> {
        let mut impacts = Vec::new();
        let mut index = 0;
        while index < self.projectiles.len() {
            let projectile = &mut self.projectiles[index];
            let step = projectile.step.min(projectile.max_distance - projectile.travelled).max(0.0);
            projectile.point += projectile.direction * step;
            projectile.travelled += step;

            let end = Self::collide(host, projectile);
            let exhausted = projectile.travelled >= projectile.max_distance - RANGE_EPSILON;
            match end {
                Some(end) => {
                    let projectile = self.projectiles.swap_remove(index);
                    Self::land(host, &projectile, end);
                    impacts.push(ProjectileImpact {
                        projectile: projectile.id,
                        owner: projectile.owner,
                        spell: projectile.spell,
                        point: projectile.point,
                        end,
                    });
                }
                None if exhausted => {
                    let projectile = self.projectiles.swap_remove(index);
                    debug!("Projectile #{} fizzled after {:.1}", projectile.id, projectile.travelled);
                    impacts.push(ProjectileImpact {
                        projectile: projectile.id,
                        owner: projectile.owner,
                        spell: projectile.spell,
                        point: projectile.point,
                        end: ProjectileEnd::Fizzled,
                    });
                }
                None => index += 1,
            }
        }
        // swap_remove scrambles order; keep the report stable
        impacts.sort_by_key(|impact| impact.projectile);
        impacts
    }

    /// Nearest living entity within the hit radius, else solid geometry.
    fn collide<H: MagicHost>(host: &H, projectile: &Projectile) -> Option<ProjectileEnd> {
        let hit = host
            .entities_near(projectile.point, projectile.hit_radius)
            .into_iter()
            .filter(|e| *e != projectile.owner && host.is_alive(*e))
            .filter_map(|e| host.position(e).map(|p| (e, p.distance(projectile.point))))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((entity, _)) = hit {
            return Some(ProjectileEnd::HitEntity(entity));
        }
        host.is_solid(projectile.point).then_some(ProjectileEnd::HitSolid)
    }

    fn land<H: MagicHost>(host: &mut H, projectile: &Projectile, end: ProjectileEnd) {
        host.play_cue(projectile.owner, Cue::Impact);
        match (projectile.payload, end) {
            (ProjectilePayload::MagicDamage { amount }, ProjectileEnd::HitEntity(target)) => {
                SpellManager::apply_magic_damage(host, projectile.owner, target, amount);
            }
            (ProjectilePayload::Burst { amount, radius }, ProjectileEnd::HitEntity(_) | ProjectileEnd::HitSolid) => {
                for target in host.entities_near(projectile.point, radius) {
                    if target != projectile.owner && host.is_alive(target) {
                        SpellManager::apply_magic_damage(host, projectile.owner, target, amount);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
    }
}

//! Damage spells
//!
//! Bolts travel as projectiles and land on a later tick. Strikes and area
//! spells hit immediately. Everything routes through
//! [`SpellManager::apply_magic_damage`].

use bevy::prelude::*;

use crate::host::MagicHost;
use crate::magic::projectile::{ProjectilePayload, ProjectileSpec};
use crate::magic::resolver::SpellManager;
use crate::magic::spells::SpellId;
use crate::magic::targeting::is_targetable;

use super::{EffectContext, EffectEnv};

/// Extra Mind Blast damage per point of caster intelligence
const MIND_BLAST_INT_SCALE: f32 = 0.1;

/// Launch a bolt from the caster's eye toward the picked entity.
pub fn launch_bolt<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let Some(target) = ctx.entity else {
        return;
    };
    let origin = match host.aim(ctx.caster) {
        Some(aim) => aim.origin,
        None => match host.position(ctx.caster) {
            Some(position) => position,
            None => return,
        },
    };
    let Some(destination) = host.position(target) else {
        return;
    };

    let amount = env.roll_power(ctx.spell);
    let payload = if ctx.spell.effect.radius > 0.0 {
        ProjectilePayload::Burst {
            amount,
            radius: ctx.spell.effect.radius,
        }
    } else {
        ProjectilePayload::MagicDamage { amount }
    };
    let spec = ProjectileSpec {
        step: env.settings.projectile_step,
        max_distance: env.settings.projectile_range,
        hit_radius: env.settings.projectile_hit_radius,
    };
    env.projectiles
        .launch(ctx.caster, ctx.spell.id, origin, destination - origin, spec, payload);
}

/// Immediate single-target damage.
pub fn strike<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let Some(target) = ctx.entity else {
        return;
    };
    let mut amount = env.roll_power(ctx.spell);
    if ctx.spell.id == SpellId::MindBlast {
        amount += host.intelligence(ctx.caster) * MIND_BLAST_INT_SCALE;
    }
    let dealt = SpellManager::apply_magic_damage(host, ctx.caster, target, amount);
    debug!("{} dealt {:.1} to {:?}", ctx.spell.name, dealt, target);
}

/// Damage every living entity around the spell's center except the caster.
///
/// Earthquake has no target and centers on the caster.
pub fn area<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let center = if ctx.spell.id == SpellId::Earthquake {
        host.position(ctx.caster)
    } else {
        ctx.center(host)
    };
    let Some(center) = center else {
        return;
    };

    let victims: Vec<_> = host
        .entities_near(center, ctx.spell.effect.radius)
        .into_iter()
        .filter(|e| *e != ctx.caster && is_targetable(&*host, *e))
        .collect();

    // Meteors split their damage across everything caught in the swarm
    let share = if ctx.spell.id == SpellId::MeteorSwarm {
        1.0 / victims.len().max(1) as f32
    } else {
        1.0
    };

    for victim in victims {
        let amount = env.roll_power(ctx.spell) * share;
        SpellManager::apply_magic_damage(host, ctx.caster, victim, amount);
    }
}

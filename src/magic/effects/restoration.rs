//! Heals and cures

use bevy::prelude::*;

use crate::host::MagicHost;

use super::{EffectContext, EffectEnv};

pub fn heal<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let target = ctx.entity_or_caster();
    if !host.is_alive(target) {
        return;
    }
    let amount = env.roll_power(ctx.spell);
    host.heal(target, amount);
    debug!("{} healed {:?} for {:.1}", ctx.spell.name, target, amount);
}

pub fn cure<H: MagicHost>(host: &mut H, ctx: &EffectContext) {
    let target = ctx.entity_or_caster();
    if !host.cure(target) {
        debug!("{:?} had nothing to cure", target);
    }
}

/// Cure every living player around the center, the caster included.
pub fn arch_cure<H: MagicHost>(host: &mut H, ctx: &EffectContext) {
    let Some(center) = ctx.center(host) else {
        return;
    };
    let patients: Vec<_> = host
        .entities_near(center, ctx.spell.effect.radius)
        .into_iter()
        .filter(|e| host.is_player(*e) && host.is_alive(*e))
        .collect();
    let cured = patients.into_iter().filter(|p| host.cure(*p)).count();
    debug!("{} cured {} players", ctx.spell.name, cured);
}

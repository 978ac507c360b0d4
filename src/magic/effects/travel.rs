//! Travel and remote interaction
//!
//! Recall and Gate Travel read the destination another feature (rune books,
//! gate menus) left in the pending-teleport handoff, falling back to the
//! caster's mark.

use bevy::prelude::*;

use crate::host::{MagicHost, Notice};
use crate::magic::raycast::raycast;
use crate::magic::spells::SpellId;

use super::{EffectContext, EffectEnv};

/// How many blocks above a solid destination to look for headroom
const TELEPORT_CLEARANCE_SEARCH: u32 = 3;

/// First non-solid point at or above `point`.
fn clear_landing<H: MagicHost>(host: &H, point: Vec3) -> Option<Vec3> {
    (0..=TELEPORT_CLEARANCE_SEARCH)
        .map(|lift| point + Vec3::Y * lift as f32)
        .find(|candidate| !host.is_solid(*candidate))
}

pub fn teleport<H: MagicHost>(host: &mut H, ctx: &EffectContext) {
    let Some(destination) = ctx.center(host) else {
        return;
    };
    match clear_landing(host, destination) {
        Some(landing) => host.teleport(ctx.caster, landing),
        None => host.notify(ctx.caster, Notice::InvalidTarget),
    }
}

pub fn mark<H: MagicHost>(host: &mut H, ctx: &EffectContext) {
    if let Some(position) = host.position(ctx.caster) {
        host.set_mark(ctx.caster, position);
        debug!("{:?} marked {:?}", ctx.caster, position);
    }
}

/// Recall moves the caster; Gate Travel also takes every player standing
/// within the spell's radius.
pub fn recall<H: MagicHost>(host: &mut H, ctx: &EffectContext) {
    let destination = host
        .take_pending_teleport(ctx.caster)
        .or_else(|| host.marked_location(ctx.caster));
    let Some(destination) = destination else {
        host.notify(ctx.caster, Notice::NoRecallDestination);
        return;
    };

    let mut travellers = vec![ctx.caster];
    if ctx.spell.id == SpellId::GateTravel {
        if let Some(origin) = host.position(ctx.caster) {
            travellers.extend(
                host.entities_near(origin, ctx.spell.effect.radius)
                    .into_iter()
                    .filter(|e| *e != ctx.caster && host.is_player(*e) && host.is_alive(*e)),
            );
        }
    }
    for traveller in travellers {
        host.teleport(traveller, destination);
    }
}

/// Trigger whatever sits under the caster's aim, or at the nominal location
/// when the aim finds nothing in reach.
pub fn telekinesis<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let aimed = raycast(
        host,
        ctx.caster,
        env.settings.max_target_distance,
        env.settings.entity_hit_radius,
    )
    .map(|hit| hit.point);
    let Some(point) = aimed.or(ctx.location) else {
        return;
    };
    host.trigger_at(ctx.caster, point);
}

//! Magic systems
//!
//! The central tick dispatcher. Everything runs in `FixedUpdate`, chained.
//! Projectiles in flight step first, then inbound events drain, then movement
//! is polled, live casts advance and expired targeting requests are swept.

use bevy::prelude::*;

use crate::host::{EntityId, MagicHost, SkillTarget};

use super::casting::CastingManager;
use super::events::*;
use super::resolver::{CastOutcome, SpellManager};
use super::spell_config::SpellDefinitions;
use super::targeting::{TargetAction, TargetManager, TargetOutcome};

/// Step every projectile already in flight.
///
/// Runs ahead of every handler that can resolve a spell, so a bolt launched
/// anywhere in this tick is first checked on the next one.
pub fn step_projectiles<H: MagicHost + Resource>(mut host: ResMut<H>, mut spells: ResMut<SpellManager>) {
    let ended = spells.advance_projectiles(&mut *host);
    if ended > 0 {
        trace!("{} projectiles ended", ended);
    }
}

/// Start casts for incoming requests
pub fn handle_cast_requests<H: MagicHost + Resource>(
    time: Res<Time>,
    mut requests: EventReader<CastRequest>,
    definitions: Res<SpellDefinitions>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut spells: ResMut<SpellManager>,
) {
    let now = time.elapsed();
    for request in requests.read() {
        let Some(spell) = definitions.get(request.spell) else {
            warn!("Cast request for unknown spell {:?}", request.spell);
            continue;
        };
        let outcome = spells.cast_spell(
            &mut *host,
            &mut casting,
            now,
            request.actor,
            spell,
            request.using_scroll,
            request.target,
        );
        if outcome != CastOutcome::Casting {
            debug!("{:?} cast of {} refused: {:?}", request.actor, spell.name, outcome);
        }
    }
}

/// Arm targeting requests
pub fn handle_targeting_requests<H: MagicHost + Resource>(
    time: Res<Time>,
    mut requests: EventReader<StartTargetingRequest>,
    mut host: ResMut<H>,
    mut targeting: ResMut<TargetManager>,
) {
    let now = time.elapsed();
    for request in requests.read() {
        targeting.start_targeting(&mut *host, now, request.actor, request.action.clone());
    }
}

/// Feed aim clicks to casts in their target window
pub fn handle_target_clicks<H: MagicHost + Resource>(
    time: Res<Time>,
    mut clicks: EventReader<TargetClick>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut spells: ResMut<SpellManager>,
) {
    let now = time.elapsed();
    for click in clicks.read() {
        if !casting.process_target_click(&mut *host, now, &mut spells, click.actor) {
            debug!("{:?} click not consumed", click.actor);
        }
    }
}

/// Resolve armed targeting requests with picked entities and locations
pub fn handle_target_picks<H: MagicHost + Resource>(
    time: Res<Time>,
    mut entity_picks: EventReader<EntityTargetPicked>,
    mut location_picks: EventReader<LocationTargetPicked>,
    mut host: ResMut<H>,
    mut targeting: ResMut<TargetManager>,
    mut spells: ResMut<SpellManager>,
) {
    let now = time.elapsed();
    for pick in entity_picks.read() {
        match targeting.process_entity_target(&mut *host, now, pick.actor, pick.target) {
            TargetOutcome::EntityTarget { action, target } => {
                perform_action(&mut *host, &mut spells, pick.actor, &action, SkillTarget::Entity(target));
            }
            outcome => debug!("{:?} entity pick: {:?}", pick.actor, outcome),
        }
    }
    for pick in location_picks.read() {
        match targeting.process_location_target(&mut *host, now, pick.actor, pick.location) {
            TargetOutcome::LocationTarget { action, location } => {
                perform_action(&mut *host, &mut spells, pick.actor, &action, SkillTarget::Location(location));
            }
            outcome => debug!("{:?} location pick: {:?}", pick.actor, outcome),
        }
    }
}

fn perform_action<H: MagicHost>(
    host: &mut H,
    spells: &mut SpellManager,
    actor: EntityId,
    action: &TargetAction,
    target: SkillTarget,
) {
    match action {
        TargetAction::CastSpell(spell) => {
            let (entity, location) = match target {
                SkillTarget::Entity(entity) => (Some(entity), host.position(entity)),
                SkillTarget::Location(location) => (None, Some(location)),
            };
            spells.resolve_targeted(host, actor, spell, entity, location);
        }
        _ => host.perform_targeted_skill(actor, action, target),
    }
}

/// Explicit cancels drop both the cast and any armed request
pub fn handle_cancel_requests<H: MagicHost + Resource>(
    mut requests: EventReader<CancelCastRequest>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut targeting: ResMut<TargetManager>,
) {
    for request in requests.read() {
        let canceled = casting.cancel_casting(&mut *host, request.actor, false);
        let disarmed = targeting.cancel_targeting(request.actor);
        if canceled || disarmed {
            debug!("{:?} canceled (cast: {}, targeting: {})", request.actor, canceled, disarmed);
        }
    }
}

/// Forget everything about actors that left
pub fn handle_disconnects<H: MagicHost + Resource>(
    mut disconnects: EventReader<ActorDisconnected>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut targeting: ResMut<TargetManager>,
) {
    for event in disconnects.read() {
        casting.cancel_casting(&mut *host, event.actor, true);
        targeting.cancel_targeting(event.actor);
        info!("{:?} disconnected; magic state cleared", event.actor);
    }
}

/// One dispatcher tick.
pub fn tick_magic<H: MagicHost + Resource>(
    time: Res<Time>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut targeting: ResMut<TargetManager>,
    mut spells: ResMut<SpellManager>,
) {
    let now = time.elapsed();
    let host = &mut *host;

    casting.check_all_movement(host);
    casting.tick(host, &mut spells, now);

    let expired = targeting.cleanup_expired(host, now);
    if expired > 0 {
        debug!("Expired {} targeting requests", expired);
    }
}

/// Bulk-cancel everything when the app is shutting down
pub fn cleanup_on_exit<H: MagicHost + Resource>(
    mut exit: EventReader<AppExit>,
    mut host: ResMut<H>,
    mut casting: ResMut<CastingManager>,
    mut targeting: ResMut<TargetManager>,
    mut spells: ResMut<SpellManager>,
) {
    if exit.read().next().is_none() {
        return;
    }
    casting.cleanup(&mut *host);
    targeting.clear();
    spells.projectiles.clear();
}

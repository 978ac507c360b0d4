//! Magic events
//!
//! Inbound requests the host forwards to the casting engine. Every event is
//! drained by the central dispatcher on the next fixed tick.

use bevy::prelude::*;

use crate::host::EntityId;

use super::spells::SpellId;
use super::targeting::TargetAction;

/// "Cast spell X": a spellbook command or a scroll being used
#[derive(Event, Clone, Debug)]
pub struct CastRequest {
    pub actor: EntityId,
    pub spell: SpellId,
    pub using_scroll: bool,
    /// Explicit target for player-or-self spells
    pub target: Option<EntityId>,
}

/// The actor clicked while aiming; resolves a cast in its target window
#[derive(Event, Clone, Copy, Debug)]
pub struct TargetClick {
    pub actor: EntityId,
}

/// An entity was picked for an armed targeting request
#[derive(Event, Clone, Copy, Debug)]
pub struct EntityTargetPicked {
    pub actor: EntityId,
    pub target: EntityId,
}

/// A location was picked for an armed targeting request
#[derive(Event, Clone, Copy, Debug)]
pub struct LocationTargetPicked {
    pub actor: EntityId,
    pub location: Vec3,
}

/// Arm a targeted skill (or the alternate spell flow)
#[derive(Event, Clone, Debug)]
pub struct StartTargetingRequest {
    pub actor: EntityId,
    pub action: TargetAction,
}

/// Explicit cancel of whatever the actor is casting or targeting
#[derive(Event, Clone, Copy, Debug)]
pub struct CancelCastRequest {
    pub actor: EntityId,
}

/// The actor left; all of its state is dropped without cost
#[derive(Event, Clone, Copy, Debug)]
pub struct ActorDisconnected {
    pub actor: EntityId,
}

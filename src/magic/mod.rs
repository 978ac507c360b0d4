//! Casting engine
//!
//! Implements the spell-casting machinery:
//! - Spell catalog loaded from RON
//! - Casting lifecycle (channel, target window, resolution)
//! - Generic single-shot targeting for skills
//! - Resource gates, success roll and exactly-once debit
//! - Effect handlers and the shared projectile pattern
//!
//! [`MagicPlugin`] wires the registries into a Bevy app against any host
//! resource implementing [`MagicHost`].

use bevy::prelude::*;
use std::marker::PhantomData;

use crate::host::MagicHost;
use crate::settings::MagicSettings;

pub mod casting;
pub mod effects;
pub mod events;
pub mod projectile;
pub mod raycast;
pub mod resolver;
pub mod rng;
pub mod spell_config;
pub mod spells;
pub mod systems;
pub mod targeting;

pub use casting::{CastPhase, CastStartError, CastingManager, CastingState};
pub use events::*;
pub use resolver::{CastOutcome, SpellManager};
pub use rng::GameRng;
pub use spell_config::{SpellCatalogPlugin, SpellDefinitions};
pub use spells::{SpellDescriptor, SpellId, TargetKind};
pub use targeting::{TargetAcquisition, TargetAction, TargetManager, TargetOutcome};

use systems::*;

/// System set containing the whole dispatcher tick
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MagicSet;

/// Plugin for the casting engine, generic over the host resource.
///
/// Reads [`MagicSettings`] if already inserted (defaults otherwise) and sets
/// the fixed timestep to its tick period. Insert a seeded [`SpellManager`]
/// before adding the plugin for deterministic rolls. Expects
/// [`SpellDefinitions`] from [`SpellCatalogPlugin`].
pub struct MagicPlugin<H> {
    _host: PhantomData<fn() -> H>,
}

impl<H> Default for MagicPlugin<H> {
    fn default() -> Self {
        Self { _host: PhantomData }
    }
}

impl<H: MagicHost + Resource> Plugin for MagicPlugin<H> {
    fn build(&self, app: &mut App) {
        let settings = match app.world().get_resource::<MagicSettings>() {
            Some(settings) => settings.clone(),
            None => {
                app.insert_resource(MagicSettings::default());
                MagicSettings::default()
            }
        };

        if !app.world().contains_resource::<SpellManager>() {
            app.insert_resource(SpellManager::new(&settings, GameRng::from_entropy()));
        }

        app
            // Inbound events
            .add_event::<CastRequest>()
            .add_event::<TargetClick>()
            .add_event::<EntityTargetPicked>()
            .add_event::<LocationTargetPicked>()
            .add_event::<StartTargetingRequest>()
            .add_event::<CancelCastRequest>()
            .add_event::<ActorDisconnected>()
            // Registries
            .insert_resource(CastingManager::new(&settings))
            .insert_resource(TargetManager::new(&settings))
            .insert_resource(Time::<Fixed>::from_duration(settings.tick_period()))
            // Dispatcher
            .add_systems(
                FixedUpdate,
                (
                    step_projectiles::<H>,
                    handle_disconnects::<H>,
                    handle_cancel_requests::<H>,
                    handle_cast_requests::<H>,
                    handle_targeting_requests::<H>,
                    handle_target_clicks::<H>,
                    handle_target_picks::<H>,
                    tick_magic::<H>,
                )
                    .chain()
                    .in_set(MagicSet),
            )
            .add_systems(Last, cleanup_on_exit::<H>);
    }
}

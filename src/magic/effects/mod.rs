//! Spell Effect Handlers
//!
//! One handler per spell identity, reached only through [`apply`] after a
//! successful roll in [`super::resolver::SpellManager::finalize_cast`].
//! Resources are already debited by the time a handler runs.
//!
//! ## Groups
//!
//! - [`damage`]: single-target, projectile and area damage
//! - [`restoration`]: heals and cures
//! - [`enchantments`]: timed stat buffs and curses
//! - [`travel`]: teleport, mark, recall, gates and telekinesis

pub mod damage;
pub mod enchantments;
pub mod restoration;
pub mod travel;

use bevy::math::Vec3;

use crate::host::{EntityId, MagicHost};
use crate::settings::MagicSettings;

use super::projectile::ProjectileArena;
use super::rng::GameRng;
use super::spells::{SpellDescriptor, SpellId};

/// Who cast what at which target.
#[derive(Clone, Copy, Debug)]
pub struct EffectContext<'a> {
    pub caster: EntityId,
    pub spell: &'a SpellDescriptor,
    pub entity: Option<EntityId>,
    pub location: Option<Vec3>,
}

impl EffectContext<'_> {
    /// Picked entity, else the caster
    pub fn entity_or_caster(&self) -> EntityId {
        self.entity.unwrap_or(self.caster)
    }

    /// Picked location, else the picked entity's position, else the caster's.
    pub fn center<H: MagicHost>(&self, host: &H) -> Option<Vec3> {
        self.location
            .or_else(|| self.entity.and_then(|e| host.position(e)))
            .or_else(|| host.position(self.caster))
    }
}

/// Resolver state lent to the handlers.
pub struct EffectEnv<'a> {
    pub rng: &'a mut GameRng,
    pub projectiles: &'a mut ProjectileArena,
    pub settings: &'a MagicSettings,
}

impl EffectEnv<'_> {
    /// Roll a magnitude within the spell's power range.
    pub fn roll_power(&mut self, spell: &SpellDescriptor) -> f32 {
        self.rng.power_in(spell.effect.power)
    }
}

/// Run the handler for `ctx.spell`.
pub fn apply<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    match ctx.spell.id {
        SpellId::MagicArrow | SpellId::EnergyBolt | SpellId::Fireball => damage::launch_bolt(host, env, ctx),
        SpellId::Harm | SpellId::Lightning | SpellId::FlameStrike | SpellId::MindBlast => {
            damage::strike(host, env, ctx)
        }
        SpellId::Explosion | SpellId::ChainLightning | SpellId::MeteorSwarm | SpellId::Earthquake => {
            damage::area(host, env, ctx)
        }

        SpellId::Heal | SpellId::GreaterHeal => restoration::heal(host, env, ctx),
        SpellId::Cure => restoration::cure(host, ctx),
        SpellId::ArchCure => restoration::arch_cure(host, ctx),

        SpellId::Bless
        | SpellId::Strength
        | SpellId::Agility
        | SpellId::Cunning
        | SpellId::Protection
        | SpellId::ReactiveArmor
        | SpellId::NightSight
        | SpellId::Weaken
        | SpellId::Clumsy
        | SpellId::Feeblemind
        | SpellId::Curse => enchantments::enchant(host, env, ctx),

        SpellId::Teleport => travel::teleport(host, ctx),
        SpellId::Mark => travel::mark(host, ctx),
        SpellId::Recall | SpellId::GateTravel => travel::recall(host, ctx),
        SpellId::Telekinesis => travel::telekinesis(host, env, ctx),
    }
}

//! Spell resolver
//!
//! Gate checks before a cast starts, the success roll, the single resource
//! debit and dispatch to the effect handlers. Mana, reagents and scrolls are
//! charged nowhere else.

use bevy::prelude::*;
use std::time::Duration;

use crate::host::{Cue, EntityId, EntityKind, MagicHost, Notice, SkillId};
use crate::settings::MagicSettings;

use super::casting::CastingManager;
use super::effects::{self, EffectContext, EffectEnv};
use super::projectile::ProjectileArena;
use super::raycast::{raycast, RaycastResult};
use super::rng::GameRng;
use super::spells::SpellDescriptor;

/// Difficulty passed to skill progression for the evaluate/resist gains that
/// accompany magic damage.
pub const MAGIC_DAMAGE_GAIN_DIFFICULTY: f32 = 30.0;

/// Effective mana cost: intelligence shaves off up to half at 100 int.
pub fn effective_mana_cost(base_mana: f32, intelligence: f32) -> f32 {
    base_mana * (1.0 - intelligence / 200.0)
}

/// Mana a scroll cast requires, and what it costs at resolution.
pub fn scroll_mana_requirement(spell: &SpellDescriptor) -> f32 {
    spell.base_mana() / 2.0
}

/// Chance of success in percent, clamped to 5..=95.
pub fn success_chance(magery: f32, circle: u8, intelligence: f32) -> f32 {
    (50.0 + magery - circle as f32 * 10.0 + intelligence / 5.0).clamp(5.0, 95.0)
}

/// Result of a cast request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastOutcome {
    /// Gates passed and the cast is under way
    Casting,
    NoSpellbook,
    NoReagents,
    NoMana,
    /// Gates passed but the lifecycle would not start
    Refused,
}

/// Resolver state: the roll source and in-flight projectiles.
#[derive(Resource, Debug)]
pub struct SpellManager {
    pub(crate) rng: GameRng,
    pub(crate) projectiles: ProjectileArena,
    pub(crate) settings: MagicSettings,
}

impl Default for SpellManager {
    fn default() -> Self {
        Self::new(&MagicSettings::default(), GameRng::default())
    }
}

impl SpellManager {
    pub fn new(settings: &MagicSettings, rng: GameRng) -> Self {
        Self {
            rng,
            projectiles: ProjectileArena::default(),
            settings: settings.clone(),
        }
    }

    pub fn seeded(settings: &MagicSettings, seed: u64) -> Self {
        Self::new(settings, GameRng::from_seed(seed))
    }

    pub fn projectiles(&self) -> &ProjectileArena {
        &self.projectiles
    }

    /// Check the resource gates without touching anything.
    ///
    /// Scroll casts only need half the base mana; spellbook casts check the
    /// spellbook, then reagents, then mana. A failure notifies the actor.
    pub fn check_gates<H: MagicHost>(
        host: &mut H,
        actor: EntityId,
        spell: &SpellDescriptor,
        using_scroll: bool,
    ) -> Result<(), CastOutcome> {
        let failure = if using_scroll {
            (host.mana(actor) < scroll_mana_requirement(spell)).then_some(CastOutcome::NoMana)
        } else if !host.has_spell(actor, spell.id) {
            Some(CastOutcome::NoSpellbook)
        } else if !host.has_reagents(actor, spell) {
            Some(CastOutcome::NoReagents)
        } else if !host.has_enough_mana(actor, spell) {
            Some(CastOutcome::NoMana)
        } else {
            None
        };

        let Some(failure) = failure else {
            return Ok(());
        };
        let name = spell.name.clone();
        let notice = match failure {
            CastOutcome::NoSpellbook => Notice::NoSpellbook { spell: name },
            CastOutcome::NoReagents => Notice::NoReagents { spell: name },
            _ => Notice::NoMana { spell: name },
        };
        host.notify(actor, notice);
        debug!("{:?} cannot cast {}: {:?}", actor, spell.name, failure);
        Err(failure)
    }

    /// Check the resource gates and start channeling. Nothing is debited here.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_spell<H: MagicHost>(
        &mut self,
        host: &mut H,
        casting: &mut CastingManager,
        now: Duration,
        actor: EntityId,
        spell: &SpellDescriptor,
        using_scroll: bool,
        pre_target: Option<EntityId>,
    ) -> CastOutcome {
        if let Err(outcome) = Self::check_gates(host, actor, spell, using_scroll) {
            return outcome;
        }

        match casting.start_casting(host, now, actor, spell, using_scroll, pre_target) {
            Ok(()) => CastOutcome::Casting,
            Err(e) => {
                warn!("Could not start {}: {}", spell.name, e);
                CastOutcome::Refused
            }
        }
    }

    /// Resolve a spell armed through the generic targeting protocol.
    ///
    /// The armed wait stands in for the channel: gates are checked against the
    /// picked target and the cast resolves at once. Returns `Casting` when the
    /// resolver was reached, whatever the roll.
    pub fn resolve_targeted<H: MagicHost>(
        &mut self,
        host: &mut H,
        actor: EntityId,
        spell: &SpellDescriptor,
        entity: Option<EntityId>,
        location: Option<Vec3>,
    ) -> CastOutcome {
        if let Err(outcome) = Self::check_gates(host, actor, spell, false) {
            return outcome;
        }
        host.broadcast_incantation(actor, &spell.words, self.settings.incantation_radius);
        self.finalize_cast(host, actor, spell, entity, location, false);
        CastOutcome::Casting
    }

    /// Entity under `actor`'s aim, with block and max-range fallbacks.
    pub fn raycast_for_entity<H: MagicHost>(&self, host: &H, actor: EntityId, max_distance: f32) -> Option<RaycastResult> {
        raycast(host, actor, max_distance, self.settings.entity_hit_radius)
    }

    /// Point under `actor`'s aim. Currently identical to [`Self::raycast_for_entity`].
    pub fn raycast_for_location<H: MagicHost>(&self, host: &H, actor: EntityId, max_distance: f32) -> Option<RaycastResult> {
        raycast(host, actor, max_distance, self.settings.entity_hit_radius)
    }

    /// Resolve a cast that made it through channeling (and targeting).
    ///
    /// Debits exactly once whether the roll succeeds or not. Book casts pay
    /// reagents and the full mana cost; scroll casts pay half the base mana
    /// and no reagents. Only a success reaches the effect handler.
    pub fn finalize_cast<H: MagicHost>(
        &mut self,
        host: &mut H,
        actor: EntityId,
        spell: &SpellDescriptor,
        entity: Option<EntityId>,
        location: Option<Vec3>,
        using_scroll: bool,
    ) -> bool {
        if using_scroll && !host.consume_scroll(actor, spell.id) {
            warn!("{:?} resolved {} without a scroll to consume", actor, spell.name);
        }

        let magery = host.skill(actor, SkillId::Magery);
        let intelligence = host.intelligence(actor);
        let check = self.rng.check_success(success_chance(magery, spell.circle, intelligence));

        let paid = if using_scroll {
            host.drain_mana(actor, scroll_mana_requirement(spell))
        } else {
            host.consume_reagents(actor, spell);
            host.consume_mana(actor, spell)
        };
        if !paid {
            warn!("{:?} resolved {} short of mana", actor, spell.name);
        }

        if !check.passed() {
            host.play_cue(actor, Cue::CastFailure);
            host.notify(actor, Notice::CastFailed { spell: spell.name.clone() });
            info!("{:?} failed {} (rolled {:.1} vs {:.1}%)", actor, spell.name, check.roll, check.chance);
            return false;
        }

        if !using_scroll {
            host.try_gain_skill(actor, SkillId::Magery, spell.difficulty());
        }

        let ctx = EffectContext {
            caster: actor,
            spell,
            entity,
            location,
        };
        let mut env = EffectEnv {
            rng: &mut self.rng,
            projectiles: &mut self.projectiles,
            settings: &self.settings,
        };
        effects::apply(host, &mut env, &ctx);

        host.play_cue(actor, Cue::CastSuccess);
        host.notify(actor, Notice::CastSucceeded { spell: spell.name.clone() });
        info!("{:?} cast {} (rolled {:.1} vs {:.1}%)", actor, spell.name, check.roll, check.chance);
        true
    }

    /// Route magic damage from `caster` to `target`.
    ///
    /// Living targets go through the defense pipeline and give both sides a
    /// skill-gain attempt; objects take the damage directly. Returns the amount
    /// applied.
    pub fn apply_magic_damage<H: MagicHost>(host: &mut H, caster: EntityId, target: EntityId, amount: f32) -> f32 {
        match host.kind(target) {
            Some(EntityKind::Player | EntityKind::Creature { .. }) => {
                let dealt = host.resolve_magic_defense(caster, target, amount);
                host.apply_internal_damage(target, dealt, Some(caster));
                host.try_gain_skill(caster, SkillId::EvaluatingIntelligence, MAGIC_DAMAGE_GAIN_DIFFICULTY);
                host.try_gain_skill(target, SkillId::ResistingSpells, MAGIC_DAMAGE_GAIN_DIFFICULTY);
                dealt
            }
            Some(EntityKind::Object) => {
                host.apply_direct_damage(target, amount);
                amount
            }
            None => 0.0,
        }
    }

    /// Step every in-flight projectile once.
    pub fn advance_projectiles<H: MagicHost>(&mut self, host: &mut H) -> usize {
        self.projectiles.advance(host).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::spell_config::SpellDefinitions;
    use crate::magic::spells::SpellId;

    #[test]
    fn test_effective_mana_cost() {
        assert_eq!(effective_mana_cost(1.0, 0.0), 1.0);
        assert_eq!(effective_mana_cost(4.0, 100.0), 2.0);
        assert!((effective_mana_cost(8.0, 50.0) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_success_chance_reference_case() {
        // Circle 1, no magery, no intelligence
        assert_eq!(success_chance(0.0, 1, 0.0), 40.0);
    }

    #[test]
    fn test_success_chance_is_clamped() {
        assert_eq!(success_chance(0.0, 8, 0.0), 5.0);
        assert_eq!(success_chance(100.0, 1, 100.0), 95.0);
        assert_eq!(success_chance(60.0, 5, 50.0), 70.0);
    }

    #[test]
    fn test_scroll_requirement_is_half_base() {
        let defs = SpellDefinitions::builtin().unwrap();
        let flame = defs.get_unchecked(SpellId::FlameStrike);
        assert_eq!(scroll_mana_requirement(flame), 3.5);
    }
}

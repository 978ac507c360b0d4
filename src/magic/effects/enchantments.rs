//! Timed stat buffs and curses
//!
//! The spell's power is the modifier amount (negative for curses) and its
//! duration comes straight from the catalog. Stacking and expiry belong to
//! the host's combat service.

use std::time::Duration;

use crate::host::{MagicHost, Stat, StatModifier};
use crate::magic::spells::SpellId;

use super::{EffectContext, EffectEnv};

/// Stats touched by each enchantment.
pub fn affected_stats(spell: SpellId) -> &'static [Stat] {
    match spell {
        SpellId::Strength | SpellId::Weaken => &[Stat::Strength],
        SpellId::Agility | SpellId::Clumsy => &[Stat::Dexterity],
        SpellId::Cunning | SpellId::Feeblemind => &[Stat::Intelligence],
        SpellId::Bless | SpellId::Curse => &[Stat::Strength, Stat::Dexterity, Stat::Intelligence],
        SpellId::Protection | SpellId::ReactiveArmor => &[Stat::Armor],
        SpellId::NightSight => &[Stat::NightVision],
        _ => &[],
    }
}

pub fn enchant<H: MagicHost>(host: &mut H, env: &mut EffectEnv, ctx: &EffectContext) {
    let target = ctx.entity_or_caster();
    if !host.is_alive(target) {
        return;
    }
    let amount = env.roll_power(ctx.spell);
    let duration = Duration::from_secs_f32(ctx.spell.effect.duration_secs.max(0.0));
    for stat in affected_stats(ctx.spell.id) {
        host.apply_modifier(
            target,
            StatModifier {
                stat: *stat,
                amount,
                duration,
                source: ctx.spell.id,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_enchantment_touches_a_stat() {
        for spell in [
            SpellId::Bless,
            SpellId::Strength,
            SpellId::Agility,
            SpellId::Cunning,
            SpellId::Protection,
            SpellId::ReactiveArmor,
            SpellId::NightSight,
            SpellId::Weaken,
            SpellId::Clumsy,
            SpellId::Feeblemind,
            SpellId::Curse,
        ] {
            assert!(!affected_stats(spell).is_empty(), "{:?} has no stats", spell);
        }
        assert!(affected_stats(SpellId::Fireball).is_empty());
    }
}

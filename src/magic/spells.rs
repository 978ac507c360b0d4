//! Spell System - Types and Enums
//!
//! This module contains the spell identity, targeting and reagent enums plus the
//! immutable [`SpellDescriptor`] every cast refers to.
//! Actual spell definitions are loaded from `assets/config/spells.ron`
//! via the `spell_config` module.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Every spell the catalog knows about.
///
/// The effect handler for a spell is selected by matching on this id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpellId {
    // First circle
    Clumsy,
    Feeblemind,
    Heal,
    MagicArrow,
    NightSight,
    ReactiveArmor,
    Weaken,
    // Second circle
    Agility,
    Cunning,
    Cure,
    Harm,
    Protection,
    Strength,
    // Third circle
    Bless,
    Fireball,
    Telekinesis,
    Teleport,
    // Fourth circle
    ArchCure,
    Curse,
    GreaterHeal,
    Lightning,
    Recall,
    // Fifth circle
    MindBlast,
    // Sixth circle
    EnergyBolt,
    Explosion,
    Mark,
    // Seventh circle
    ChainLightning,
    FlameStrike,
    GateTravel,
    MeteorSwarm,
    // Eighth circle
    Earthquake,
}

impl SpellId {
    /// All spell ids, in catalog order.
    pub const ALL: [SpellId; 31] = [
        SpellId::Clumsy,
        SpellId::Feeblemind,
        SpellId::Heal,
        SpellId::MagicArrow,
        SpellId::NightSight,
        SpellId::ReactiveArmor,
        SpellId::Weaken,
        SpellId::Agility,
        SpellId::Cunning,
        SpellId::Cure,
        SpellId::Harm,
        SpellId::Protection,
        SpellId::Strength,
        SpellId::Bless,
        SpellId::Fireball,
        SpellId::Telekinesis,
        SpellId::Teleport,
        SpellId::ArchCure,
        SpellId::Curse,
        SpellId::GreaterHeal,
        SpellId::Lightning,
        SpellId::Recall,
        SpellId::MindBlast,
        SpellId::EnergyBolt,
        SpellId::Explosion,
        SpellId::Mark,
        SpellId::ChainLightning,
        SpellId::FlameStrike,
        SpellId::GateTravel,
        SpellId::MeteorSwarm,
        SpellId::Earthquake,
    ];

    /// Parse a spell id from its identifier or a loose display name
    /// ("magic arrow", "MagicArrow", "magic_arrow").
    pub fn parse(name: &str) -> Option<SpellId> {
        let wanted: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        SpellId::ALL
            .into_iter()
            .find(|id| format!("{:?}", id).to_ascii_lowercase() == wanted)
    }
}

/// What a spell needs designated before it can resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TargetKind {
    /// Always affects the caster; no target window.
    SelfOnly,
    /// A single living entity picked in the target window.
    Entity,
    /// A point in the world (an entity hit counts as its position).
    Location,
    /// An item or block; resolves at the caster's own position.
    Item,
    /// An area centered on a picked point or entity.
    Area,
    /// No target at all; no target window.
    NoTarget,
    /// Another player, or the caster when nothing is picked.
    PlayerOrSelf,
}

impl TargetKind {
    /// True for kinds that resolve straight from channeling.
    pub fn skips_target_window(&self) -> bool {
        matches!(
            self,
            TargetKind::SelfOnly | TargetKind::NoTarget | TargetKind::Item
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::SelfOnly => "self",
            TargetKind::Entity => "entity",
            TargetKind::Location => "location",
            TargetKind::Item => "item",
            TargetKind::Area => "area",
            TargetKind::NoTarget => "none",
            TargetKind::PlayerOrSelf => "player or self",
        }
    }
}

/// Reagents consumed when casting from a spellbook.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reagent {
    BlackPearl,
    BloodMoss,
    Garlic,
    Ginseng,
    MandrakeRoot,
    Nightshade,
    SpidersSilk,
    SulfurousAsh,
}

impl Reagent {
    pub fn name(&self) -> &'static str {
        match self {
            Reagent::BlackPearl => "Black Pearl",
            Reagent::BloodMoss => "Blood Moss",
            Reagent::Garlic => "Garlic",
            Reagent::Ginseng => "Ginseng",
            Reagent::MandrakeRoot => "Mandrake Root",
            Reagent::Nightshade => "Nightshade",
            Reagent::SpidersSilk => "Spider's Silk",
            Reagent::SulfurousAsh => "Sulfurous Ash",
        }
    }
}

/// Reagent list of a spell; duplicates express quantity.
pub type ReagentList = SmallVec<[Reagent; 4]>;

/// Tuning consumed only by the effect handlers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectTuning {
    /// Base (min, max) magnitude: damage, healing or stat bonus
    #[serde(default)]
    pub power: (f32, f32),
    /// Buff/curse duration in seconds (0.0 = instant)
    #[serde(default)]
    pub duration_secs: f32,
    /// Area radius in blocks (0.0 = single target)
    #[serde(default)]
    pub radius: f32,
}

/// Static catalog entry for one spell. Never mutated after loading.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellDescriptor {
    pub id: SpellId,
    /// Display name
    pub name: String,
    /// Tier 1-8
    pub circle: u8,
    pub target: TargetKind,
    pub reagents: ReagentList,
    /// Incantation broadcast when channeling starts
    pub words: String,
    pub effect: EffectTuning,
}

impl SpellDescriptor {
    /// Base mana cost equals the circle number.
    pub fn base_mana(&self) -> f32 {
        self.circle as f32
    }

    /// Base difficulty is ten times the circle number.
    pub fn difficulty(&self) -> f32 {
        self.circle as f32 * 10.0
    }

    /// How many units of `reagent` one cast consumes.
    pub fn reagent_count(&self, reagent: Reagent) -> u32 {
        self.reagents.iter().filter(|r| **r == reagent).count() as u32
    }
}

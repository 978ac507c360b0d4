//! Host collaborator contracts
//!
//! The casting engine never owns inventories, stats or world geometry. It
//! reaches them through the narrow traits below, which the embedding game
//! implements once. [`MagicHost`] bundles them so engine code can take a
//! single `&mut impl MagicHost`.
//!
//! [`crate::sandbox::Sandbox`] is the in-memory implementation used by the
//! headless runner, the viewer and the tests.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::magic::resolver::effective_mana_cost;
use crate::magic::spells::{SpellDescriptor, SpellId};
use crate::magic::targeting::TargetAction;

/// Identifier of anything the engine can reference: players, creatures and
/// inanimate objects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Coarse classification used by target validation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EntityKind {
    /// A connected player; the only kind that can cast.
    Player,
    /// A non-player living entity.
    Creature { tameable: bool },
    /// Something damageable but not alive (crates, doors, training dummies).
    Object,
}

/// Skills the engine feeds into the skill-progression service.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillId {
    Magery,
    EvaluatingIntelligence,
    ResistingSpells,
    AnimalLore,
    AnimalTaming,
    Snooping,
    DetectingHidden,
}

/// Stats a buff or curse can modify.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Stat {
    Strength,
    Dexterity,
    Intelligence,
    Armor,
    NightVision,
}

/// A timed stat change applied by an effect handler.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct StatModifier {
    pub stat: Stat,
    pub amount: f32,
    pub duration: Duration,
    pub source: SpellId,
}

/// Eye position plus normalized look direction.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AimRay {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Opaque handle to a progress overlay owned by the presentation layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct OverlayHandle(pub u64);

/// How a progress overlay should be drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum OverlayStyle {
    /// Filling bar while the spell is channeled
    Channeling,
    /// Draining bar while the caster picks a target
    TargetSelect,
}

/// Full overlay contents; sent on show and on every update.
#[derive(Clone, PartialEq, Debug)]
pub struct OverlayView {
    pub label: String,
    /// 0.0..=1.0
    pub progress: f32,
    pub style: OverlayStyle,
}

/// Short audio/visual cues. Their rendering is up to the host.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Cue {
    CastStart,
    TargetReady,
    CastSuccess,
    CastFailure,
    CastCancel,
    Impact,
}

/// User-visible notices. The engine only knows their message keys; wording and
/// localization belong to the host.
#[derive(Clone, PartialEq, Debug)]
pub enum Notice {
    NoSpellbook { spell: String },
    NoReagents { spell: String },
    NoMana { spell: String },
    CastInterrupted,
    TargetTimeout,
    NoTargetFound,
    CastFailed { spell: String },
    CastSucceeded { spell: String },
    TargetPrompt { action: String, seconds: u32 },
    InvalidTarget,
    TargetingExpired,
    NoRecallDestination,
}

impl Notice {
    /// Message identifier handed to the localization layer.
    pub fn key(&self) -> &'static str {
        match self {
            Notice::NoSpellbook { .. } => "magic.cast.no_spellbook",
            Notice::NoReagents { .. } => "magic.cast.no_reagents",
            Notice::NoMana { .. } => "magic.cast.no_mana",
            Notice::CastInterrupted => "magic.cast.interrupted",
            Notice::TargetTimeout => "magic.cast.target_timeout",
            Notice::NoTargetFound => "magic.cast.no_target",
            Notice::CastFailed { .. } => "magic.cast.failed",
            Notice::CastSucceeded { .. } => "magic.cast.success",
            Notice::TargetPrompt { .. } => "magic.target.prompt",
            Notice::InvalidTarget => "magic.target.invalid",
            Notice::TargetingExpired => "magic.target.expired",
            Notice::NoRecallDestination => "magic.travel.no_destination",
        }
    }
}

/// Spellbook membership store.
pub trait Spellbook {
    fn has_spell(&self, actor: EntityId, spell: SpellId) -> bool;
}

/// Reagent store.
pub trait ReagentStore {
    fn has_reagents(&self, actor: EntityId, spell: &SpellDescriptor) -> bool;
    fn consume_reagents(&mut self, actor: EntityId, spell: &SpellDescriptor) -> bool;
}

/// Mana store. Cost is `base_mana × (1 − intelligence/200)`.
pub trait ManaStore {
    fn mana(&self, actor: EntityId) -> f32;
    fn intelligence(&self, actor: EntityId) -> f32;
    /// Remove `amount` mana, clamping at zero. Returns false when the actor
    /// had less than `amount`.
    fn drain_mana(&mut self, actor: EntityId, amount: f32) -> bool;

    fn has_enough_mana(&self, actor: EntityId, spell: &SpellDescriptor) -> bool {
        self.mana(actor) >= effective_mana_cost(spell.base_mana(), self.intelligence(actor))
    }

    fn consume_mana(&mut self, actor: EntityId, spell: &SpellDescriptor) -> bool {
        let cost = effective_mana_cost(spell.base_mana(), self.intelligence(actor));
        self.drain_mana(actor, cost)
    }
}

/// Consumable scroll store. Implementations search the primary hand, then
/// the secondary hand, then the general inventory.
pub trait ScrollStore {
    fn consume_scroll(&mut self, actor: EntityId, spell: SpellId) -> bool;
}

/// Skill-progression service. The gain formula is the host's business.
pub trait SkillProgression {
    /// Current skill value, 0.0..=100.0
    fn skill(&self, actor: EntityId, skill: SkillId) -> f32;
    fn try_gain_skill(&mut self, actor: EntityId, skill: SkillId, difficulty: f32);
}

/// Combat and healing pipeline plus the world mutations effect handlers need.
pub trait CombatService {
    /// Run magic damage through the defender's defenses; returns the amount
    /// that should actually be applied.
    fn resolve_magic_defense(&mut self, attacker: EntityId, defender: EntityId, amount: f32) -> f32;
    /// Damage that bypasses armor, attributed to `source`.
    fn apply_internal_damage(&mut self, target: EntityId, amount: f32, source: Option<EntityId>);
    /// Raw damage for targets without a defense pipeline.
    fn apply_direct_damage(&mut self, target: EntityId, amount: f32);
    fn heal(&mut self, target: EntityId, amount: f32);
    /// Remove poison; returns whether anything was cured.
    fn cure(&mut self, target: EntityId) -> bool;
    fn apply_modifier(&mut self, target: EntityId, modifier: StatModifier);
    fn teleport(&mut self, entity: EntityId, destination: Vec3);
}

/// Presentation layer: progress overlays, notices, cues and chat broadcasts.
pub trait Presentation {
    fn show_overlay(&mut self, actor: EntityId, view: OverlayView) -> OverlayHandle;
    fn update_overlay(&mut self, handle: OverlayHandle, view: OverlayView);
    /// Must tolerate handles that are already hidden.
    fn hide_overlay(&mut self, handle: OverlayHandle);
    fn notify(&mut self, actor: EntityId, notice: Notice);
    fn play_cue(&mut self, actor: EntityId, cue: Cue);
    /// Send the incantation to every player within `radius` of the caster,
    /// the caster included.
    fn broadcast_incantation(&mut self, actor: EntityId, words: &str, radius: f32);
}

/// World geometry and per-entity facts.
pub trait World {
    fn position(&self, entity: EntityId) -> Option<Vec3>;
    fn aim(&self, actor: EntityId) -> Option<AimRay>;
    fn kind(&self, entity: EntityId) -> Option<EntityKind>;
    fn is_alive(&self, entity: EntityId) -> bool;
    /// Every entity whose center lies within `radius` of `center`, in a
    /// stable order.
    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<EntityId>;
    /// First solid block hit along a ray, as a point on the block surface.
    fn raycast_blocks(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3>;
    fn is_solid(&self, point: Vec3) -> bool;
    /// Remote interaction at a point (levers, doors, dropped items).
    fn trigger_at(&mut self, actor: EntityId, point: Vec3);

    /// Destination chosen by another feature (rune books, gate menus) for the
    /// actor's next travel spell.
    fn take_pending_teleport(&mut self, actor: EntityId) -> Option<Vec3>;
    fn clear_pending_teleport(&mut self, actor: EntityId);
    fn marked_location(&self, actor: EntityId) -> Option<Vec3>;
    fn set_mark(&mut self, actor: EntityId, location: Vec3);

    fn is_player(&self, entity: EntityId) -> bool {
        matches!(self.kind(entity), Some(EntityKind::Player))
    }
}

/// Where a non-spell targeted skill was aimed.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SkillTarget {
    Entity(EntityId),
    Location(Vec3),
}

/// Executes the non-spell targeted skills once a target has been resolved.
pub trait TargetedSkills {
    fn perform_targeted_skill(&mut self, actor: EntityId, action: &TargetAction, target: SkillTarget);
}

/// Everything the casting engine needs from its host.
pub trait MagicHost:
    Spellbook
    + ReagentStore
    + ManaStore
    + ScrollStore
    + SkillProgression
    + CombatService
    + Presentation
    + World
    + TargetedSkills
{
}

impl<T> MagicHost for T where
    T: Spellbook
        + ReagentStore
        + ManaStore
        + ScrollStore
        + SkillProgression
        + CombatService
        + Presentation
        + World
        + TargetedSkills
{
}

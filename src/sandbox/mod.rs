//! Sandbox host
//!
//! In-memory world implementing every collaborator trait in [`crate::host`].
//! The headless runner, the viewer and the tests all drive the casting engine
//! against it.
//!
//! Geometry is deliberately plain: actors are points, solid blocks are
//! axis-aligned boxes. Skill gain is a fixed-chance fixed-size increment.

pub mod actor;
pub mod log;

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::host::{
    AimRay, CombatService, Cue, EntityId, EntityKind, ManaStore, Notice, OverlayHandle, OverlayView,
    Presentation, ReagentStore, ScrollStore, SkillId, SkillProgression, SkillTarget, Spellbook, Stat,
    StatModifier, TargetedSkills, World,
};
use crate::magic::rng::GameRng;
use crate::magic::MagicSet;
use crate::magic::spells::{SpellDescriptor, SpellId};
use crate::magic::targeting::TargetAction;

pub use actor::{ActiveModifier, Actor, ScrollSlot, ScrollStack};
pub use log::{CastLog, CastLogEntry, CastLogEventType};

/// Skill gain attempted by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkillAttempt {
    pub actor: EntityId,
    pub skill: SkillId,
    pub difficulty: f32,
}

/// A targeted skill the engine asked the host to perform.
#[derive(Clone, Debug, PartialEq)]
pub struct SkillUse {
    pub actor: EntityId,
    pub action: TargetAction,
    pub target: SkillTarget,
}

/// An axis-aligned solid box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    pub min: Vec3,
    pub max: Vec3,
}

impl Block {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Entry distance of a ray into the box (slab method)
    fn ray_entry(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// A progress overlay currently on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRecord {
    pub actor: EntityId,
    pub view: OverlayView,
}

/// The in-memory host.
#[derive(Resource, Debug)]
pub struct Sandbox {
    actors: BTreeMap<EntityId, Actor>,
    next_id: u32,
    blocks: Vec<Block>,
    overlays: BTreeMap<OverlayHandle, OverlayRecord>,
    next_overlay: u64,
    clock: Duration,
    gain_rng: GameRng,
    /// Chance in 0.0..=1.0 that a skill gain attempt succeeds
    pub skill_gain_chance: f32,
    /// Skill points added by a successful gain
    pub skill_gain_amount: f32,
    pub notices: Vec<(EntityId, Notice)>,
    pub cues: Vec<(EntityId, Cue)>,
    /// (speaker, listener, words)
    pub incantations: Vec<(EntityId, EntityId, String)>,
    pub skill_attempts: Vec<SkillAttempt>,
    pub skill_uses: Vec<SkillUse>,
    /// Remote interactions: (actor, point)
    pub triggers: Vec<(EntityId, Vec3)>,
    pub log: CastLog,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            actors: BTreeMap::new(),
            next_id: 0,
            blocks: Vec::new(),
            overlays: BTreeMap::new(),
            next_overlay: 0,
            clock: Duration::ZERO,
            gain_rng: GameRng::from_seed(seed),
            skill_gain_chance: 0.1,
            skill_gain_amount: 0.1,
            notices: Vec::new(),
            cues: Vec::new(),
            incantations: Vec::new(),
            skill_attempts: Vec::new(),
            skill_uses: Vec::new(),
            triggers: Vec::new(),
            log: CastLog::default(),
        }
    }

    // ========================================================================
    // World setup
    // ========================================================================

    /// Add an actor and return its id.
    pub fn spawn(&mut self, mut actor: Actor) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        actor.id = id;
        self.actors.insert(id, actor);
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn add_block(&mut self, a: Vec3, b: Vec3) {
        self.blocks.push(Block::new(a, b));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn move_actor(&mut self, id: EntityId, position: Vec3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.position = position;
        }
    }

    pub fn face(&mut self, id: EntityId, direction: Vec3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.facing = direction;
        }
    }

    /// Turn `id` to look at `point`.
    pub fn face_toward(&mut self, id: EntityId, point: Vec3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.facing = point - actor.position;
        }
    }

    pub fn set_pending_teleport(&mut self, id: EntityId, destination: Vec3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.pending_teleport = Some(destination);
        }
    }

    /// Advance the sandbox clock used for modifier expiry and log timestamps.
    pub fn set_clock(&mut self, now: Duration) {
        self.clock = now;
        self.log.time = now.as_secs_f32();
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn notices_for(&self, id: EntityId) -> Vec<&Notice> {
        self.notices.iter().filter(|(a, _)| *a == id).map(|(_, n)| n).collect()
    }

    pub fn last_notice(&self, id: EntityId) -> Option<&Notice> {
        self.notices.iter().rev().find(|(a, _)| *a == id).map(|(_, n)| n)
    }

    pub fn cues_for(&self, id: EntityId) -> Vec<Cue> {
        self.cues.iter().filter(|(a, _)| *a == id).map(|(_, c)| *c).collect()
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&OverlayRecord> {
        self.overlays.get(&handle)
    }

    /// Overlays currently shown to `id`
    pub fn overlays_for(&self, id: EntityId) -> Vec<(OverlayHandle, &OverlayRecord)> {
        self.overlays
            .iter()
            .filter(|(_, record)| record.actor == id)
            .map(|(handle, record)| (*handle, record))
            .collect()
    }

    pub fn mana_of(&self, id: EntityId) -> f32 {
        self.actor(id).map_or(0.0, |a| a.mana)
    }

    pub fn health_of(&self, id: EntityId) -> f32 {
        self.actor(id).map_or(0.0, |a| a.health)
    }

    pub fn reagents_of(&self, id: EntityId) -> u32 {
        self.actor(id).map_or(0, |a| a.reagents.values().sum())
    }

    pub fn scrolls_of(&self, id: EntityId, spell: SpellId) -> u32 {
        self.actor(id).map_or(0, |a| a.scroll_count(spell))
    }

    fn name_of(&self, id: EntityId) -> String {
        self.actor(id).map_or_else(|| format!("{:?}", id), |a| a.name.clone())
    }
}

impl Spellbook for Sandbox {
    fn has_spell(&self, actor: EntityId, spell: SpellId) -> bool {
        self.actor(actor).is_some_and(|a| a.spellbook.contains(&spell))
    }
}

impl ReagentStore for Sandbox {
    fn has_reagents(&self, actor: EntityId, spell: &SpellDescriptor) -> bool {
        let Some(actor) = self.actor(actor) else {
            return false;
        };
        spell
            .reagents
            .iter()
            .all(|reagent| actor.reagent_count(*reagent) >= spell.reagent_count(*reagent))
    }

    fn consume_reagents(&mut self, actor: EntityId, spell: &SpellDescriptor) -> bool {
        if !self.has_reagents(actor, spell) {
            return false;
        }
        let Some(actor) = self.actors.get_mut(&actor) else {
            return false;
        };
        for reagent in &spell.reagents {
            if let Some(count) = actor.reagents.get_mut(reagent) {
                *count -= 1;
            }
        }
        actor.reagents.retain(|_, count| *count > 0);
        true
    }
}

impl ManaStore for Sandbox {
    fn mana(&self, actor: EntityId) -> f32 {
        self.mana_of(actor)
    }

    fn intelligence(&self, actor: EntityId) -> f32 {
        self.actor(actor)
            .map_or(0.0, |a| a.intelligence + a.stat_bonus(Stat::Intelligence, self.clock))
    }

    fn drain_mana(&mut self, actor: EntityId, amount: f32) -> bool {
        let Some(actor) = self.actors.get_mut(&actor) else {
            return false;
        };
        let enough = actor.mana >= amount;
        actor.mana = (actor.mana - amount).max(0.0);
        enough
    }
}

impl ScrollStore for Sandbox {
    fn consume_scroll(&mut self, actor: EntityId, spell: SpellId) -> bool {
        self.actors
            .get_mut(&actor)
            .and_then(|a| a.take_scroll(spell))
            .is_some()
    }
}

impl SkillProgression for Sandbox {
    fn skill(&self, actor: EntityId, skill: SkillId) -> f32 {
        self.actor(actor).map_or(0.0, |a| a.skill(skill))
    }

    fn try_gain_skill(&mut self, actor: EntityId, skill: SkillId, difficulty: f32) {
        self.skill_attempts.push(SkillAttempt {
            actor,
            skill,
            difficulty,
        });
        if !self.gain_rng.chance(self.skill_gain_chance) {
            return;
        }
        let amount = self.skill_gain_amount;
        let Some(entry) = self.actors.get_mut(&actor) else {
            return;
        };
        let value = entry.skills.entry(skill).or_insert(0.0);
        *value = (*value + amount).min(100.0);
        let message = format!("{} gains {:?} ({:.1})", entry.name, skill, *value);
        self.log.log(CastLogEventType::Skill, Some(actor), message);
    }
}

impl CombatService for Sandbox {
    fn resolve_magic_defense(&mut self, _attacker: EntityId, defender: EntityId, amount: f32) -> f32 {
        let resist = self.skill(defender, SkillId::ResistingSpells);
        amount * (1.0 - resist / 200.0)
    }

    fn apply_internal_damage(&mut self, target: EntityId, amount: f32, source: Option<EntityId>) {
        let source_name = source.map(|s| self.name_of(s));
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        actor.health = (actor.health - amount).max(0.0);
        let message = match source_name {
            Some(source) => format!("{} hits {} for {:.1}", source, actor.name, amount),
            None => format!("{} takes {:.1}", actor.name, amount),
        };
        self.log.log(CastLogEventType::Damage, Some(target), message);
    }

    fn apply_direct_damage(&mut self, target: EntityId, amount: f32) {
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        actor.health = (actor.health - amount).max(0.0);
        let message = format!("{} takes {:.1} direct damage", actor.name, amount);
        self.log.log(CastLogEventType::Damage, Some(target), message);
    }

    fn heal(&mut self, target: EntityId, amount: f32) {
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        actor.health = (actor.health + amount).min(actor.max_health);
        let message = format!("{} healed for {:.1}", actor.name, amount);
        self.log.log(CastLogEventType::Healing, Some(target), message);
    }

    fn cure(&mut self, target: EntityId) -> bool {
        let Some(actor) = self.actors.get_mut(&target) else {
            return false;
        };
        if !actor.poisoned {
            return false;
        }
        actor.poisoned = false;
        let message = format!("{} is cured", actor.name);
        self.log.log(CastLogEventType::Healing, Some(target), message);
        true
    }

    fn apply_modifier(&mut self, target: EntityId, modifier: StatModifier) {
        let expires_at = self.clock + modifier.duration;
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        // Recasting the same spell refreshes instead of stacking
        actor
            .modifiers
            .retain(|m| !(m.modifier.source == modifier.source && m.modifier.stat == modifier.stat));
        actor.modifiers.push(ActiveModifier { modifier, expires_at });
        let message = format!(
            "{} {:?} {:+.1} for {:.0}s",
            actor.name,
            modifier.stat,
            modifier.amount,
            modifier.duration.as_secs_f32()
        );
        self.log.log(CastLogEventType::Modifier, Some(target), message);
    }

    fn teleport(&mut self, entity: EntityId, destination: Vec3) {
        let Some(actor) = self.actors.get_mut(&entity) else {
            return;
        };
        actor.position = destination;
        let message = format!("{} teleports to {:?}", actor.name, destination);
        self.log.log(CastLogEventType::Travel, Some(entity), message);
    }
}

impl Presentation for Sandbox {
    fn show_overlay(&mut self, actor: EntityId, view: OverlayView) -> OverlayHandle {
        self.next_overlay += 1;
        let handle = OverlayHandle(self.next_overlay);
        self.overlays.insert(handle, OverlayRecord { actor, view });
        handle
    }

    fn update_overlay(&mut self, handle: OverlayHandle, view: OverlayView) {
        if let Some(record) = self.overlays.get_mut(&handle) {
            record.view = view;
        }
    }

    fn hide_overlay(&mut self, handle: OverlayHandle) {
        self.overlays.remove(&handle);
    }

    fn notify(&mut self, actor: EntityId, notice: Notice) {
        self.log
            .log(CastLogEventType::Notice, Some(actor), format!("{}: {:?}", notice.key(), notice));
        self.notices.push((actor, notice));
    }

    fn play_cue(&mut self, actor: EntityId, cue: Cue) {
        self.log.log(CastLogEventType::Cue, Some(actor), format!("{:?}", cue));
        self.cues.push((actor, cue));
    }

    fn broadcast_incantation(&mut self, actor: EntityId, words: &str, radius: f32) {
        let Some(origin) = self.position(actor) else {
            return;
        };
        let listeners: Vec<EntityId> = self
            .entities_near(origin, radius)
            .into_iter()
            .filter(|e| *e == actor || self.is_player(*e))
            .collect();
        let speaker = self.name_of(actor);
        self.log.log(
            CastLogEventType::Incantation,
            Some(actor),
            format!("{} says \"{}\"", speaker, words),
        );
        for listener in listeners {
            self.incantations.push((actor, listener, words.to_string()));
        }
    }
}

impl World for Sandbox {
    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.actor(entity).map(|a| a.position)
    }

    fn aim(&self, actor: EntityId) -> Option<AimRay> {
        let actor = self.actor(actor)?;
        if matches!(actor.kind, EntityKind::Object) {
            return None;
        }
        Some(AimRay {
            origin: actor.position,
            direction: actor.facing.normalize_or_zero(),
        })
    }

    fn kind(&self, entity: EntityId) -> Option<EntityKind> {
        self.actor(entity).map(|a| a.kind)
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.actor(entity).is_some_and(|a| a.is_alive())
    }

    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        self.actors
            .values()
            .filter(|a| a.position.distance(center) <= radius)
            .map(|a| a.id)
            .collect()
    }

    fn raycast_blocks(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.blocks
            .iter()
            .filter_map(|block| block.ray_entry(origin, direction))
            .filter(|t| *t <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
            .map(|t| origin + direction * t)
    }

    fn is_solid(&self, point: Vec3) -> bool {
        self.blocks.iter().any(|block| block.contains(point))
    }

    fn trigger_at(&mut self, actor: EntityId, point: Vec3) {
        let message = format!("{} triggers {:?}", self.name_of(actor), point);
        self.log.log(CastLogEventType::Travel, Some(actor), message);
        self.triggers.push((actor, point));
    }

    fn take_pending_teleport(&mut self, actor: EntityId) -> Option<Vec3> {
        self.actors.get_mut(&actor)?.pending_teleport.take()
    }

    fn clear_pending_teleport(&mut self, actor: EntityId) {
        if let Some(actor) = self.actors.get_mut(&actor) {
            actor.pending_teleport = None;
        }
    }

    fn marked_location(&self, actor: EntityId) -> Option<Vec3> {
        self.actor(actor)?.mark
    }

    fn set_mark(&mut self, actor: EntityId, location: Vec3) {
        if let Some(entry) = self.actors.get_mut(&actor) {
            entry.mark = Some(location);
            let message = format!("{} marks {:?}", entry.name, location);
            self.log.log(CastLogEventType::Travel, Some(actor), message);
        }
    }
}

impl TargetedSkills for Sandbox {
    fn perform_targeted_skill(&mut self, actor: EntityId, action: &TargetAction, target: SkillTarget) {
        let target_name = match target {
            SkillTarget::Entity(entity) => self.name_of(entity),
            SkillTarget::Location(point) => format!("{:?}", point),
        };
        let message = format!("{} uses {} on {}", self.name_of(actor), action.name(), target_name);
        self.log.log(CastLogEventType::Skill, Some(actor), message);
        self.skill_uses.push(SkillUse {
            actor,
            action: action.clone(),
            target,
        });
        self.try_gain_skill(actor, action.skill(), 50.0);
    }
}

/// Keeps the sandbox clock in step with the fixed timestep
pub struct SandboxPlugin;

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Sandbox>()
            .add_systems(FixedUpdate, sync_sandbox_clock.before(MagicSet));
    }
}

fn sync_sandbox_clock(time: Res<Time>, mut sandbox: ResMut<Sandbox>) {
    sandbox.set_clock(time.elapsed());
}

//! Generic single-shot targeting
//!
//! A timeout-bound "arm and wait for one click" registry. Targeted skills
//! (evaluate, lore, tame, snoop, detect hidden) and the alternate spell flow
//! arm an action here; the next valid entity or location pick resolves it.
//!
//! Target validation for every kind of acquisition, including the casting
//! lifecycle's own target window, lives behind [`TargetAcquisition`] so both
//! paths accept exactly the same targets.

use bevy::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use crate::host::{EntityId, EntityKind, Notice, Presentation, SkillId, World};
use crate::settings::MagicSettings;

use super::spells::{SpellDescriptor, TargetKind};

/// True for entities a target pick may land on: anything alive, plus
/// inanimate objects.
pub fn is_targetable<W: World + ?Sized>(world: &W, entity: EntityId) -> bool {
    match world.kind(entity) {
        Some(EntityKind::Object) => true,
        Some(_) => world.is_alive(entity),
        None => false,
    }
}

/// Rules deciding which picks satisfy an acquisition.
pub trait TargetAcquisition {
    fn accepts_entity(&self, world: &dyn World, owner: EntityId, candidate: EntityId) -> bool;
    fn accepts_location(&self) -> bool;
}

impl TargetAcquisition for TargetKind {
    fn accepts_entity(&self, world: &dyn World, owner: EntityId, candidate: EntityId) -> bool {
        match self {
            TargetKind::Entity => candidate != owner && is_targetable(world, candidate),
            TargetKind::Location | TargetKind::Area => is_targetable(world, candidate),
            TargetKind::PlayerOrSelf => world.is_player(candidate) && world.is_alive(candidate),
            TargetKind::SelfOnly => candidate == owner,
            TargetKind::Item | TargetKind::NoTarget => false,
        }
    }

    fn accepts_location(&self) -> bool {
        matches!(self, TargetKind::Location | TargetKind::Area | TargetKind::Item)
    }
}

/// What an armed targeting request will do once it resolves.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetAction {
    /// Alternate spell flow: resolve `spell` against the picked target
    CastSpell(SpellDescriptor),
    Evaluate,
    AnimalLore,
    Tame,
    Snoop,
    DetectHidden,
}

impl TargetAction {
    pub fn name(&self) -> &str {
        match self {
            TargetAction::CastSpell(spell) => &spell.name,
            TargetAction::Evaluate => "Evaluating Intelligence",
            TargetAction::AnimalLore => "Animal Lore",
            TargetAction::Tame => "Animal Taming",
            TargetAction::Snoop => "Snooping",
            TargetAction::DetectHidden => "Detecting Hidden",
        }
    }

    /// Skill exercised when the action resolves
    pub fn skill(&self) -> SkillId {
        match self {
            TargetAction::CastSpell(_) => SkillId::Magery,
            TargetAction::Evaluate => SkillId::EvaluatingIntelligence,
            TargetAction::AnimalLore => SkillId::AnimalLore,
            TargetAction::Tame => SkillId::AnimalTaming,
            TargetAction::Snoop => SkillId::Snooping,
            TargetAction::DetectHidden => SkillId::DetectingHidden,
        }
    }
}

impl TargetAcquisition for TargetAction {
    fn accepts_entity(&self, world: &dyn World, owner: EntityId, candidate: EntityId) -> bool {
        match self {
            TargetAction::CastSpell(spell) => spell.target.accepts_entity(world, owner, candidate),
            TargetAction::Evaluate | TargetAction::Snoop => {
                candidate != owner && world.is_player(candidate) && world.is_alive(candidate)
            }
            TargetAction::AnimalLore => {
                matches!(world.kind(candidate), Some(EntityKind::Creature { .. }))
                    && world.is_alive(candidate)
            }
            TargetAction::Tame => {
                matches!(world.kind(candidate), Some(EntityKind::Creature { tameable: true }))
                    && world.is_alive(candidate)
            }
            TargetAction::DetectHidden => false,
        }
    }

    fn accepts_location(&self) -> bool {
        match self {
            TargetAction::CastSpell(spell) => spell.target.accepts_location(),
            TargetAction::DetectHidden => true,
            _ => false,
        }
    }
}

/// One armed request.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetingState {
    pub owner: EntityId,
    pub action: TargetAction,
    pub started_at: Duration,
    pub timeout: Duration,
}

impl TargetingState {
    pub fn is_expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.started_at) > self.timeout
    }

    pub fn remaining(&self, now: Duration) -> Duration {
        self.timeout.saturating_sub(now.saturating_sub(self.started_at))
    }
}

/// Result of offering a target to an armed request.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetOutcome {
    EntityTarget { action: TargetAction, target: EntityId },
    LocationTarget { action: TargetAction, location: Vec3 },
    /// Rejected; the request stays armed for another try
    InvalidTarget,
    /// Nothing armed, or it timed out
    Expired,
}

/// Registry of armed targeting requests, at most one per actor.
#[derive(Resource, Debug)]
pub struct TargetManager {
    states: HashMap<EntityId, TargetingState>,
    timeout: Duration,
}

impl Default for TargetManager {
    fn default() -> Self {
        Self::new(&MagicSettings::default())
    }
}

impl TargetManager {
    pub fn new(settings: &MagicSettings) -> Self {
        Self {
            states: HashMap::new(),
            timeout: settings.targeting_timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arm `action` for `actor`, replacing anything already armed.
    pub fn start_targeting<P: Presentation>(
        &mut self,
        host: &mut P,
        now: Duration,
        actor: EntityId,
        action: TargetAction,
    ) -> bool {
        host.notify(
            actor,
            Notice::TargetPrompt {
                action: action.name().to_string(),
                seconds: self.timeout.as_secs_f32().ceil() as u32,
            },
        );
        debug!("{:?} armed targeting for {}", actor, action.name());
        self.states.insert(
            actor,
            TargetingState {
                owner: actor,
                action,
                started_at: now,
                timeout: self.timeout,
            },
        );
        true
    }

    /// Whether `actor` has a live request. Drops it if it has timed out.
    pub fn is_targeting(&mut self, now: Duration, actor: EntityId) -> bool {
        self.live_state(now, actor).is_some()
    }

    pub fn state(&self, actor: EntityId) -> Option<&TargetingState> {
        self.states.get(&actor)
    }

    fn live_state(&mut self, now: Duration, actor: EntityId) -> Option<&TargetingState> {
        if self.states.get(&actor)?.is_expired(now) {
            self.states.remove(&actor);
            return None;
        }
        self.states.get(&actor)
    }

    /// Offer an entity to `actor`'s armed request.
    pub fn process_entity_target<H: World + Presentation>(
        &mut self,
        host: &mut H,
        now: Duration,
        actor: EntityId,
        target: EntityId,
    ) -> TargetOutcome {
        let accepted = match self.live_state(now, actor) {
            None => return TargetOutcome::Expired,
            Some(state) => state.action.accepts_entity(&*host, actor, target),
        };
        if !accepted {
            host.notify(actor, Notice::InvalidTarget);
            return TargetOutcome::InvalidTarget;
        }
        match self.states.remove(&actor) {
            Some(state) => TargetOutcome::EntityTarget {
                action: state.action,
                target,
            },
            None => TargetOutcome::Expired,
        }
    }

    /// Offer a location to `actor`'s armed request.
    pub fn process_location_target<P: Presentation>(
        &mut self,
        host: &mut P,
        now: Duration,
        actor: EntityId,
        location: Vec3,
    ) -> TargetOutcome {
        let accepted = match self.live_state(now, actor) {
            None => return TargetOutcome::Expired,
            Some(state) => state.action.accepts_location(),
        };
        if !accepted {
            host.notify(actor, Notice::InvalidTarget);
            return TargetOutcome::InvalidTarget;
        }
        match self.states.remove(&actor) {
            Some(state) => TargetOutcome::LocationTarget {
                action: state.action,
                location,
            },
            None => TargetOutcome::Expired,
        }
    }

    /// Disarm `actor`'s request. Safe to call when nothing is armed.
    pub fn cancel_targeting(&mut self, actor: EntityId) -> bool {
        self.states.remove(&actor).is_some()
    }

    /// Remove and notify every request past its timeout. Returns how many were
    /// removed. Needs an external periodic driver.
    pub fn cleanup_expired<P: Presentation>(&mut self, host: &mut P, now: Duration) -> usize {
        let mut expired: Vec<EntityId> = self
            .states
            .values()
            .filter(|state| state.is_expired(now))
            .map(|state| state.owner)
            .collect();
        expired.sort_unstable();
        for actor in &expired {
            self.states.remove(actor);
            host.notify(*actor, Notice::TargetingExpired);
        }
        expired.len()
    }

    /// Drop every request without notifying anyone.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

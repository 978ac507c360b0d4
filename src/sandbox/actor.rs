//! Sandbox actors
//!
//! Everything the sandbox knows about one entity: placement, vitals, mana,
//! skills, spellbook, reagents and scrolls.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::host::{EntityId, EntityKind, SkillId, Stat, StatModifier};
use crate::magic::spells::{Reagent, SpellId};

/// A stack of identical scrolls in one inventory slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollStack {
    pub spell: SpellId,
    pub count: u32,
}

/// Where a scroll stack is held. Consumption searches them in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollSlot {
    MainHand,
    OffHand,
    Pack,
}

/// A stat modifier plus the simulation time it runs out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveModifier {
    pub modifier: StatModifier,
    pub expires_at: Duration,
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub position: Vec3,
    /// Look direction; normalized on use
    pub facing: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub mana: f32,
    pub max_mana: f32,
    /// Base intelligence before modifiers
    pub intelligence: f32,
    pub skills: BTreeMap<SkillId, f32>,
    pub spellbook: BTreeSet<SpellId>,
    pub reagents: BTreeMap<Reagent, u32>,
    pub main_hand: Option<ScrollStack>,
    pub off_hand: Option<ScrollStack>,
    pub pack: Vec<ScrollStack>,
    pub poisoned: bool,
    pub modifiers: Vec<ActiveModifier>,
    pub mark: Option<Vec3>,
    pub pending_teleport: Option<Vec3>,
}

impl Actor {
    fn new(name: &str, kind: EntityKind, position: Vec3) -> Self {
        Self {
            id: EntityId(0),
            name: name.to_string(),
            kind,
            position,
            facing: Vec3::X,
            health: 50.0,
            max_health: 50.0,
            mana: 0.0,
            max_mana: 0.0,
            intelligence: 0.0,
            skills: BTreeMap::new(),
            spellbook: BTreeSet::new(),
            reagents: BTreeMap::new(),
            main_hand: None,
            off_hand: None,
            pack: Vec::new(),
            poisoned: false,
            modifiers: Vec::new(),
            mark: None,
            pending_teleport: None,
        }
    }

    pub fn player(name: &str, position: Vec3) -> Self {
        Self::new(name, EntityKind::Player, position)
    }

    pub fn creature(name: &str, position: Vec3, tameable: bool) -> Self {
        Self::new(name, EntityKind::Creature { tameable }, position)
    }

    pub fn object(name: &str, position: Vec3) -> Self {
        Self::new(name, EntityKind::Object, position)
    }

    pub fn with_mana(mut self, mana: f32) -> Self {
        self.mana = mana;
        self.max_mana = self.max_mana.max(mana);
        self
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self.max_health = health;
        self
    }

    pub fn with_intelligence(mut self, intelligence: f32) -> Self {
        self.intelligence = intelligence;
        self
    }

    pub fn with_skill(mut self, skill: SkillId, value: f32) -> Self {
        self.skills.insert(skill, value);
        self
    }

    pub fn with_spells(mut self, spells: impl IntoIterator<Item = SpellId>) -> Self {
        self.spellbook.extend(spells);
        self
    }

    pub fn with_reagent(mut self, reagent: Reagent, count: u32) -> Self {
        *self.reagents.entry(reagent).or_insert(0) += count;
        self
    }

    pub fn with_scrolls(mut self, slot: ScrollSlot, spell: SpellId, count: u32) -> Self {
        let stack = ScrollStack { spell, count };
        match slot {
            ScrollSlot::MainHand => self.main_hand = Some(stack),
            ScrollSlot::OffHand => self.off_hand = Some(stack),
            ScrollSlot::Pack => self.pack.push(stack),
        }
        self
    }

    pub fn facing(mut self, direction: Vec3) -> Self {
        self.facing = direction;
        self
    }

    pub fn poisoned(mut self) -> Self {
        self.poisoned = true;
        self
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self.kind, EntityKind::Object) && self.health > 0.0
    }

    pub fn skill(&self, skill: SkillId) -> f32 {
        self.skills.get(&skill).copied().unwrap_or(0.0)
    }

    pub fn reagent_count(&self, reagent: Reagent) -> u32 {
        self.reagents.get(&reagent).copied().unwrap_or(0)
    }

    /// Scrolls of `spell` across every slot
    pub fn scroll_count(&self, spell: SpellId) -> u32 {
        self.main_hand
            .iter()
            .chain(self.off_hand.iter())
            .chain(self.pack.iter())
            .filter(|stack| stack.spell == spell)
            .map(|stack| stack.count)
            .sum()
    }

    /// Take one scroll of `spell`: main hand, then off hand, then pack.
    /// Returns the slot it came from.
    pub fn take_scroll(&mut self, spell: SpellId) -> Option<ScrollSlot> {
        if take_from(&mut self.main_hand, spell) {
            return Some(ScrollSlot::MainHand);
        }
        if take_from(&mut self.off_hand, spell) {
            return Some(ScrollSlot::OffHand);
        }
        let index = self.pack.iter().position(|stack| stack.spell == spell && stack.count > 0)?;
        self.pack[index].count -= 1;
        if self.pack[index].count == 0 {
            self.pack.remove(index);
        }
        Some(ScrollSlot::Pack)
    }

    /// Sum of unexpired modifiers on `stat` at `now`
    pub fn stat_bonus(&self, stat: Stat, now: Duration) -> f32 {
        self.modifiers
            .iter()
            .filter(|active| active.modifier.stat == stat && active.expires_at > now)
            .map(|active| active.modifier.amount)
            .sum()
    }
}

fn take_from(slot: &mut Option<ScrollStack>, spell: SpellId) -> bool {
    match slot {
        Some(stack) if stack.spell == spell && stack.count > 0 => {
            stack.count -= 1;
            if stack.count == 0 {
                *slot = None;
            }
            true
        }
        _ => false,
    }
}

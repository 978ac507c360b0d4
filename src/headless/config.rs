//! JSON configuration parsing for headless mode
//!
//! A scenario lists the sandbox actors and blocks plus a timeline of inbound
//! events, each fired at a fixed simulation time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use bevy::math::Vec3;

use crate::host::SkillId;
use crate::magic::spell_config::CatalogError;
use crate::magic::spells::{Reagent, SpellId};
use crate::sandbox::{Actor, ScrollSlot};

/// Largest tick the fixed timestep can honor in one frame
pub const MAX_TICK_MS: u64 = 250;

/// Errors from loading, validating or saving a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to write result to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entity classification in scenario files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActorKindConfig {
    #[default]
    Player,
    Creature,
    TameableCreature,
    Object,
}

/// Scroll stack placed in an actor's inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    pub slot: ScrollSlot,
    pub spell: String,
    #[serde(default = "default_scroll_count")]
    pub count: u32,
}

fn default_scroll_count() -> u32 {
    1
}

/// One sandbox actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ActorKindConfig,
    #[serde(default)]
    pub position: [f32; 3],
    /// Look direction (default: +X)
    #[serde(default = "default_facing")]
    pub facing: [f32; 3],
    #[serde(default = "default_health")]
    pub health: f32,
    #[serde(default)]
    pub mana: f32,
    #[serde(default)]
    pub intelligence: f32,
    #[serde(default)]
    pub skills: BTreeMap<SkillId, f32>,
    /// Spell names in the spellbook, or "All"
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub reagents: BTreeMap<Reagent, u32>,
    #[serde(default)]
    pub scrolls: Vec<ScrollConfig>,
    #[serde(default)]
    pub poisoned: bool,
}

fn default_facing() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

fn default_health() -> f32 {
    50.0
}

/// A solid axis-aligned box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// Inbound event fired from the timeline. Actors are referenced by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScenarioEvent {
    Cast {
        actor: String,
        spell: String,
        #[serde(default)]
        scroll: bool,
        #[serde(default)]
        target: Option<String>,
    },
    Click {
        actor: String,
    },
    Move {
        actor: String,
        position: [f32; 3],
    },
    /// Turn toward a named entity or along a direction
    Face {
        actor: String,
        #[serde(default)]
        toward: Option<String>,
        #[serde(default)]
        direction: Option<[f32; 3]>,
    },
    /// Arm a targeted skill: Evaluate, AnimalLore, Tame, Snoop, DetectHidden
    /// or CastSpell (with `spell`)
    StartTargeting {
        actor: String,
        action: String,
        #[serde(default)]
        spell: Option<String>,
    },
    PickEntity {
        actor: String,
        target: String,
    },
    PickLocation {
        actor: String,
        location: [f32; 3],
    },
    Cancel {
        actor: String,
    },
    Disconnect {
        actor: String,
    },
    /// Destination handed over for the actor's next travel spell
    SetPendingTeleport {
        actor: String,
        location: [f32; 3],
    },
}

impl ScenarioEvent {
    pub fn actor(&self) -> &str {
        match self {
            ScenarioEvent::Cast { actor, .. }
            | ScenarioEvent::Click { actor }
            | ScenarioEvent::Move { actor, .. }
            | ScenarioEvent::Face { actor, .. }
            | ScenarioEvent::StartTargeting { actor, .. }
            | ScenarioEvent::PickEntity { actor, .. }
            | ScenarioEvent::PickLocation { actor, .. }
            | ScenarioEvent::Cancel { actor }
            | ScenarioEvent::Disconnect { actor }
            | ScenarioEvent::SetPendingTeleport { actor, .. } => actor,
        }
    }

    /// Other actor names the event refers to
    fn referenced(&self) -> Option<&str> {
        match self {
            ScenarioEvent::Cast { target, .. } => target.as_deref(),
            ScenarioEvent::Face { toward, .. } => toward.as_deref(),
            ScenarioEvent::PickEntity { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// A timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Simulation time at which the event fires
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: ScenarioEvent,
}

/// Headless scenario loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub actors: Vec<ActorConfig>,
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
    #[serde(default)]
    pub timeline: Vec<TimedEvent>,
    /// Total simulated time (default: 10s)
    #[serde(default = "default_duration")]
    pub duration_ms: u64,
    /// Overrides the dispatcher tick from the settings file
    #[serde(default)]
    pub tick_ms: Option<u64>,
    /// Random seed for deterministic rolls
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Where to write the JSON result (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_duration() -> u64 {
    10_000
}

pub(crate) fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

/// Parse a spell name, accepting "MagicArrow", "Magic Arrow" or "magic_arrow"
pub fn parse_spell(name: &str) -> Result<SpellId, ScenarioError> {
    SpellId::parse(name).ok_or_else(|| ScenarioError::Invalid(format!("Unknown spell: '{}'", name)))
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a scenario from JSON text
    pub fn from_json(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |msg: String| Err(ScenarioError::Invalid(msg));

        if self.actors.is_empty() {
            return invalid("scenario needs at least one actor".to_string());
        }

        // Names must be unique; the timeline refers to actors by name
        let mut names = HashSet::new();
        for actor in &self.actors {
            if actor.name.trim().is_empty() {
                return invalid("actor names must not be empty".to_string());
            }
            if !names.insert(actor.name.as_str()) {
                return invalid(format!("duplicate actor name '{}'", actor.name));
            }
            for spell in &actor.spells {
                if spell != "All" {
                    parse_spell(spell)?;
                }
            }
            for scroll in &actor.scrolls {
                parse_spell(&scroll.spell)?;
            }
        }

        if let Some(tick) = self.tick_ms {
            if tick == 0 || tick > MAX_TICK_MS {
                return invalid(format!("tick_ms must be 1-{}, got {}", MAX_TICK_MS, tick));
            }
        }
        if self.duration_ms == 0 {
            return invalid("duration_ms must be positive".to_string());
        }

        for entry in &self.timeline {
            let event = &entry.event;
            for name in std::iter::once(event.actor()).chain(event.referenced()) {
                if !names.contains(name) {
                    return invalid(format!("timeline refers to unknown actor '{}'", name));
                }
            }
            if entry.at_ms > self.duration_ms {
                return invalid(format!(
                    "event at {}ms is past the scenario end ({}ms)",
                    entry.at_ms, self.duration_ms
                ));
            }
            match event {
                ScenarioEvent::Cast { spell, .. } => {
                    parse_spell(spell)?;
                }
                ScenarioEvent::StartTargeting { action, spell, .. } => match (action.as_str(), spell) {
                    ("CastSpell", Some(spell)) => {
                        parse_spell(spell)?;
                    }
                    ("CastSpell", None) => {
                        return invalid("CastSpell targeting needs a spell".to_string());
                    }
                    ("Evaluate" | "AnimalLore" | "Tame" | "Snoop" | "DetectHidden", _) => {}
                    (other, _) => {
                        return invalid(format!(
                            "Unknown targeting action: '{}'. Valid actions: Evaluate, AnimalLore, Tame, Snoop, DetectHidden, CastSpell",
                            other
                        ));
                    }
                },
                ScenarioEvent::Face { toward: None, direction: None, .. } => {
                    return invalid("Face needs either 'toward' or 'direction'".to_string());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl ActorConfig {
    /// Build the sandbox actor. Spell names must already be validated.
    pub fn to_actor(&self) -> Result<Actor, ScenarioError> {
        let position = vec3(self.position);
        let mut actor = match self.kind {
            ActorKindConfig::Player => Actor::player(&self.name, position),
            ActorKindConfig::Creature => Actor::creature(&self.name, position, false),
            ActorKindConfig::TameableCreature => Actor::creature(&self.name, position, true),
            ActorKindConfig::Object => Actor::object(&self.name, position),
        }
        .facing(vec3(self.facing))
        .with_health(self.health)
        .with_mana(self.mana)
        .with_intelligence(self.intelligence);

        for (skill, value) in &self.skills {
            actor = actor.with_skill(*skill, *value);
        }
        for spell in &self.spells {
            if spell == "All" {
                actor = actor.with_spells(SpellId::ALL);
            } else {
                actor = actor.with_spells([parse_spell(spell)?]);
            }
        }
        for (reagent, count) in &self.reagents {
            actor = actor.with_reagent(*reagent, *count);
        }
        for scroll in &self.scrolls {
            actor = actor.with_scrolls(scroll.slot, parse_spell(&scroll.spell)?, scroll.count);
        }
        if self.poisoned {
            actor = actor.poisoned();
        }
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "actors": [{ "name": "Mage", "mana": 20, "spells": ["Magic Arrow"] }],
        "timeline": [{ "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "MagicArrow" }]
    }"#;

    #[test]
    fn test_minimal_scenario_parses_with_defaults() {
        let config = ScenarioConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.duration_ms, 10_000);
        assert_eq!(config.actors[0].kind, ActorKindConfig::Player);
        assert_eq!(config.actors[0].facing, [1.0, 0.0, 0.0]);
        assert!(matches!(config.timeline[0].event, ScenarioEvent::Cast { scroll: false, .. }));
    }

    #[test]
    fn test_unknown_actor_in_timeline_is_rejected() {
        let json = r#"{
            "actors": [{ "name": "Mage" }],
            "timeline": [{ "at_ms": 0, "type": "Click", "actor": "Ghost" }]
        }"#;
        let err = ScenarioConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Ghost"), "got: {}", err);
    }

    #[test]
    fn test_unknown_spell_is_rejected() {
        let json = r#"{
            "actors": [{ "name": "Mage" }],
            "timeline": [{ "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "Wish" }]
        }"#;
        assert!(matches!(ScenarioConfig::from_json(json), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_tick_out_of_range_is_rejected() {
        let json = r#"{ "actors": [{ "name": "Mage" }], "tick_ms": 500 }"#;
        assert!(ScenarioConfig::from_json(json).is_err());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let json = r#"{ "actors": [{ "name": "Mage" }, { "name": "Mage" }] }"#;
        assert!(ScenarioConfig::from_json(json).is_err());
    }

    #[test]
    fn test_actor_conversion() {
        let json = r#"{
            "actors": [{
                "name": "Mage",
                "mana": 30,
                "skills": { "Magery": 75.0 },
                "spells": ["All"],
                "reagents": { "SulfurousAsh": 3 },
                "scrolls": [{ "slot": "OffHand", "spell": "Heal", "count": 2 }]
            }]
        }"#;
        let config = ScenarioConfig::from_json(json).unwrap();
        let actor = config.actors[0].to_actor().unwrap();
        assert_eq!(actor.mana, 30.0);
        assert_eq!(actor.skill(SkillId::Magery), 75.0);
        assert_eq!(actor.spellbook.len(), SpellId::ALL.len());
        assert_eq!(actor.reagent_count(Reagent::SulfurousAsh), 3);
        assert_eq!(actor.scroll_count(SpellId::Heal), 2);
    }
}

//! Data-Driven Spell Catalog
//!
//! Spell definitions are loaded from RON instead of being hardcoded.
//! The shipped catalog lives in `assets/config/spells.ron` and is also
//! embedded into the binary so tools and tests never depend on the working
//! directory.
//!
//! ## Usage
//! ```ignore
//! fn my_system(spells: Res<SpellDefinitions>) {
//!     let arrow = spells.get(SpellId::MagicArrow).unwrap();
//!     println!("Magic Arrow is circle {}", arrow.circle);
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::spells::{EffectTuning, ReagentList, SpellDescriptor, SpellId, TargetKind};

/// Default location of the catalog on disk.
pub const DEFAULT_CATALOG_PATH: &str = "assets/config/spells.ron";

const BUILTIN_CATALOG: &str = include_str!("../../assets/config/spells.ron");

/// One spell as written in the RON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpellConfig {
    pub name: String,
    pub circle: u8,
    pub target: TargetKind,
    #[serde(default)]
    pub reagents: ReagentList,
    pub words: String,
    #[serde(default)]
    pub power: (f32, f32),
    #[serde(default)]
    pub duration_secs: f32,
    #[serde(default)]
    pub radius: f32,
}

impl SpellConfig {
    fn into_descriptor(self, id: SpellId) -> SpellDescriptor {
        SpellDescriptor {
            id,
            name: self.name,
            circle: self.circle,
            target: self.target,
            reagents: self.reagents,
            words: self.words,
            effect: EffectTuning {
                power: self.power,
                duration_secs: self.duration_secs,
                radius: self.radius,
            },
        }
    }
}

/// Root structure for the spells.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct SpellsConfig {
    pub spells: HashMap<SpellId, SpellConfig>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse spell catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("missing spell definitions: {0:?}")]
    Missing(Vec<SpellId>),
    #[error("{spell:?} has circle {circle}, expected 1-8")]
    InvalidCircle { spell: SpellId, circle: u8 },
    #[error("{spell:?} has an inverted power range ({min}, {max})")]
    InvalidPower { spell: SpellId, min: f32, max: f32 },
}

/// Resource containing every spell descriptor.
///
/// Access via `Res<SpellDefinitions>` in systems.
#[derive(Resource, Debug, Clone)]
pub struct SpellDefinitions {
    definitions: HashMap<SpellId, SpellDescriptor>,
}

impl Default for SpellDefinitions {
    /// The embedded catalog. Panics if it does not validate - use for tests only.
    fn default() -> Self {
        Self::builtin().expect("embedded spell catalog must be valid")
    }
}

impl SpellDefinitions {
    /// Create from a parsed config
    pub fn new(config: SpellsConfig) -> Self {
        Self {
            definitions: config
                .spells
                .into_iter()
                .map(|(id, cfg)| (id, cfg.into_descriptor(id)))
                .collect(),
        }
    }

    /// Parse and validate a catalog from RON text.
    pub fn from_ron_str(contents: &str) -> Result<Self, CatalogError> {
        let config: SpellsConfig = ron::from_str(contents)?;
        let definitions = Self::new(config);
        definitions.validate()?;
        Ok(definitions)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_ron_str(BUILTIN_CATALOG)
    }

    pub fn get(&self, spell: SpellId) -> Option<&SpellDescriptor> {
        self.definitions.get(&spell)
    }

    /// Get a descriptor, panicking if not found.
    /// Only for ids already validated at startup.
    pub fn get_unchecked(&self, spell: SpellId) -> &SpellDescriptor {
        self.definitions
            .get(&spell)
            .unwrap_or_else(|| panic!("Spell {:?} not found in definitions", spell))
    }

    /// Check every spell id is defined with sane values
    pub fn validate(&self) -> Result<(), CatalogError> {
        let missing: Vec<SpellId> = SpellId::ALL
            .into_iter()
            .filter(|spell| !self.definitions.contains_key(spell))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::Missing(missing));
        }

        for (id, spell) in &self.definitions {
            if !(1..=8).contains(&spell.circle) {
                return Err(CatalogError::InvalidCircle {
                    spell: *id,
                    circle: spell.circle,
                });
            }
            let (min, max) = spell.effect.power;
            if min > max {
                return Err(CatalogError::InvalidPower {
                    spell: *id,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Descriptors sorted by circle, then id.
    pub fn by_circle(&self) -> Vec<&SpellDescriptor> {
        let mut spells: Vec<&SpellDescriptor> = self.definitions.values().collect();
        spells.sort_by_key(|s| (s.circle, s.id));
        spells
    }
}

/// Load spell definitions from a RON file on disk.
pub fn load_spell_definitions(path: &Path) -> Result<SpellDefinitions, CatalogError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let definitions = SpellDefinitions::from_ron_str(&contents)?;

    info!(
        "Loaded {} spell definitions from {}",
        definitions.len(),
        path.display()
    );

    Ok(definitions)
}

/// Bevy plugin for catalog loading.
///
/// Uses the file at `path` when given, the embedded catalog otherwise.
#[derive(Default)]
pub struct SpellCatalogPlugin {
    pub path: Option<PathBuf>,
}

impl Plugin for SpellCatalogPlugin {
    fn build(&self, app: &mut App) {
        let loaded = match &self.path {
            Some(path) => load_spell_definitions(path),
            None => SpellDefinitions::builtin(),
        };
        match loaded {
            Ok(definitions) => {
                app.insert_resource(definitions);
            }
            Err(e) => {
                // An invalid catalog would leave every cast request unresolvable
                panic!("Failed to load spell definitions: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::spells::Reagent;

    #[test]
    fn test_builtin_catalog_defines_every_spell() {
        let spells = SpellDefinitions::builtin().unwrap();
        assert_eq!(spells.len(), SpellId::ALL.len());
        for id in SpellId::ALL {
            assert_eq!(spells.get_unchecked(id).id, id);
        }
    }

    #[test]
    fn test_magic_arrow_is_first_circle_with_one_reagent() {
        let spells = SpellDefinitions::default();
        let arrow = spells.get_unchecked(SpellId::MagicArrow);
        assert_eq!(arrow.circle, 1);
        assert_eq!(arrow.target, TargetKind::Entity);
        assert_eq!(arrow.reagents.as_slice(), &[Reagent::SulfurousAsh]);
    }

    #[test]
    fn test_missing_spells_are_reported() {
        let err = SpellDefinitions::from_ron_str("(spells: {})").unwrap_err();
        match err {
            CatalogError::Missing(missing) => assert_eq!(missing.len(), SpellId::ALL.len()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_circle_is_rejected() {
        let mut spells = SpellDefinitions::default();
        spells
            .definitions
            .get_mut(&SpellId::Heal)
            .unwrap()
            .circle = 9;
        assert!(matches!(
            spells.validate(),
            Err(CatalogError::InvalidCircle { spell: SpellId::Heal, circle: 9 })
        ));
    }

    #[test]
    fn test_by_circle_is_sorted() {
        let spells = SpellDefinitions::default();
        let circles: Vec<u8> = spells.by_circle().iter().map(|s| s.circle).collect();
        let mut sorted = circles.clone();
        sorted.sort();
        assert_eq!(circles, sorted);
    }
}

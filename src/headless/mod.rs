//! Headless mode for scripted scenarios
//!
//! Runs the casting engine against the sandbox host without any graphical
//! output, suitable for automated testing and tooling. The app is stepped
//! one fixed tick per update, so seeded scenarios replay exactly.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless scenario.json --seed 7
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "actors": [
//!     { "name": "Mage", "mana": 40, "skills": { "Magery": 80 },
//!       "spells": ["All"], "reagents": { "BlackPearl": 5, "Nightshade": 5 } },
//!     { "name": "Troll", "kind": "Creature", "position": [6, 0, 0] }
//!   ],
//!   "timeline": [
//!     { "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "MagicArrow" },
//!     { "at_ms": 1600, "type": "Click", "actor": "Mage" }
//!   ],
//!   "duration_ms": 4000,
//!   "random_seed": 7
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ScenarioConfig, ScenarioError};
pub use runner::{run_headless_scenario, run_scenario, HeadlessOptions, ScenarioResult};

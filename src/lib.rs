//! circlecast - spell-casting engine
//!
//! Channel-then-target spell casting for a multiplayer game server: a spell
//! catalog, the casting lifecycle, a generic targeting protocol, resource
//! gates with exactly-once debit, effect handlers and projectiles.
//!
//! The engine talks to the game only through the traits in [`host`]. The
//! [`sandbox`] host backs the headless runner, the viewer and the tests.

pub mod cli;
pub mod headless;
pub mod host;
pub mod magic;
pub mod sandbox;
pub mod settings;
pub mod ui;

// Re-export commonly used types
pub use headless::{ScenarioConfig, ScenarioResult};
pub use host::{EntityId, MagicHost};
pub use magic::{CastingManager, MagicPlugin, SpellDefinitions, SpellManager, TargetManager};
pub use sandbox::{CastLog, CastLogEventType, Sandbox};

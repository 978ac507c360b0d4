//! Headless scenario execution
//!
//! Runs a scenario against the sandbox host without any graphical output.
//! The app is stepped by hand with a manual time strategy, so every
//! `update()` advances exactly one dispatcher tick and seeded runs are fully
//! reproducible.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::host::{EntityId, World};
use crate::magic::events::*;
use crate::magic::spell_config::{load_spell_definitions, SpellDefinitions};
use crate::magic::targeting::TargetAction;
use crate::magic::{CastingManager, GameRng, MagicPlugin, MagicSet, SpellManager};
use crate::sandbox::{CastLogEventType, Sandbox, SandboxPlugin};
use crate::settings::MagicSettings;

use super::config::{parse_spell, vec3, ScenarioConfig, ScenarioError, ScenarioEvent, TimedEvent};

/// Result of a completed scenario
///
/// Provides programmatic access to the outcome for tests and tooling.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Simulated time in seconds
    pub duration_secs: f32,
    /// Dispatcher ticks run
    pub ticks: u64,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
    pub casts_succeeded: usize,
    pub casts_failed: usize,
    /// Casts still live when the scenario ended (canceled at shutdown)
    pub casts_interrupted_at_end: usize,
    pub actors: Vec<ActorResult>,
    /// Every notice in order, as (actor name, message key)
    pub notices: Vec<NoticeRecord>,
    pub log: Vec<LogLine>,
}

/// Final state of one actor
#[derive(Debug, Clone, Serialize)]
pub struct ActorResult {
    pub name: String,
    pub health: f32,
    pub mana: f32,
    pub reagents: u32,
    pub scrolls: u32,
    pub position: [f32; 3],
    pub skills: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NoticeRecord {
    pub actor: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub timestamp: f32,
    pub event: String,
    pub message: String,
}

/// Timeline cursor plus the name → id table built when actors were spawned
#[derive(Resource)]
pub struct ScenarioTimeline {
    entries: Vec<TimedEvent>,
    cursor: usize,
    names: HashMap<String, EntityId>,
}

impl ScenarioTimeline {
    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.entries.len()
    }
}

/// Build the sandbox described by the scenario and the name table for it
pub fn build_sandbox(config: &ScenarioConfig) -> Result<(Sandbox, HashMap<String, EntityId>), ScenarioError> {
    let mut sandbox = Sandbox::with_seed(config.random_seed.unwrap_or_default());
    let mut names = HashMap::new();
    for actor in &config.actors {
        let id = sandbox.spawn(actor.to_actor()?);
        names.insert(actor.name.clone(), id);
    }
    for block in &config.blocks {
        sandbox.add_block(vec3(block.min), vec3(block.max));
    }
    Ok((sandbox, names))
}

/// Build a stepped app for `config`. Nothing has run yet.
///
/// Bevy's logger is process-global, so only the binary asks for it.
pub fn build_scenario_app(
    config: &ScenarioConfig,
    definitions: SpellDefinitions,
    mut settings: MagicSettings,
    with_logging: bool,
) -> Result<App, ScenarioError> {
    if let Some(tick) = config.tick_ms {
        settings.tick_ms = tick;
    }
    let tick = settings.tick_period();

    let (sandbox, names) = build_sandbox(config)?;
    let mut entries = config.timeline.clone();
    // Stable: events sharing a timestamp keep file order
    entries.sort_by_key(|entry| entry.at_ms);

    let rng = match config.random_seed {
        Some(seed) => {
            info!("Using deterministic RNG with seed: {}", seed);
            GameRng::from_seed(seed)
        }
        None => {
            info!("Using non-deterministic RNG (no seed provided)");
            GameRng::from_entropy()
        }
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    if with_logging {
        app.add_plugins(LogPlugin::default());
    }
    app.insert_resource(TimeUpdateStrategy::ManualDuration(tick))
        .insert_resource(SpellManager::new(&settings, rng))
        .insert_resource(settings)
        .insert_resource(definitions)
        .insert_resource(sandbox)
        .insert_resource(ScenarioTimeline {
            entries,
            cursor: 0,
            names,
        })
        .add_plugins(MagicPlugin::<Sandbox>::default())
        .add_plugins(SandboxPlugin)
        .add_systems(FixedUpdate, inject_timeline_events.before(MagicSet));
    Ok(app)
}

/// Fire every timeline entry that is due
#[allow(clippy::too_many_arguments)]
fn inject_timeline_events(
    time: Res<Time>,
    definitions: Res<SpellDefinitions>,
    mut timeline: ResMut<ScenarioTimeline>,
    mut sandbox: ResMut<Sandbox>,
    mut casts: EventWriter<CastRequest>,
    mut clicks: EventWriter<TargetClick>,
    mut entity_picks: EventWriter<EntityTargetPicked>,
    mut location_picks: EventWriter<LocationTargetPicked>,
    mut targeting: EventWriter<StartTargetingRequest>,
    mut cancels: EventWriter<CancelCastRequest>,
    mut disconnects: EventWriter<ActorDisconnected>,
) {
    let now_ms = time.elapsed().as_millis() as u64;
    while let Some(entry) = timeline.entries.get(timeline.cursor) {
        if entry.at_ms > now_ms {
            break;
        }
        let event = entry.event.clone();
        timeline.cursor += 1;

        let Some(actor) = timeline.id_of(event.actor()) else {
            warn!("Timeline event for unknown actor '{}'", event.actor());
            continue;
        };
        sandbox
            .log
            .log(CastLogEventType::Scenario, Some(actor), format!("{:?}", event));

        match event {
            ScenarioEvent::Cast {
                spell,
                scroll,
                target,
                ..
            } => {
                let Ok(spell) = parse_spell(&spell) else {
                    warn!("Skipping cast of unknown spell '{}'", spell);
                    continue;
                };
                casts.send(CastRequest {
                    actor,
                    spell,
                    using_scroll: scroll,
                    target: target.and_then(|name| timeline.id_of(&name)),
                });
            }
            ScenarioEvent::Click { .. } => {
                clicks.send(TargetClick { actor });
            }
            ScenarioEvent::Move { position, .. } => sandbox.move_actor(actor, vec3(position)),
            ScenarioEvent::Face {
                toward, direction, ..
            } => {
                let point = toward
                    .and_then(|name| timeline.id_of(&name))
                    .and_then(|id| sandbox.position(id));
                match (point, direction) {
                    (Some(point), _) => sandbox.face_toward(actor, point),
                    (None, Some(direction)) => sandbox.face(actor, vec3(direction)),
                    (None, None) => warn!("Face event without a usable direction"),
                }
            }
            ScenarioEvent::StartTargeting { action, spell, .. } => {
                let action = match action.as_str() {
                    "Evaluate" => TargetAction::Evaluate,
                    "AnimalLore" => TargetAction::AnimalLore,
                    "Tame" => TargetAction::Tame,
                    "Snoop" => TargetAction::Snoop,
                    "DetectHidden" => TargetAction::DetectHidden,
                    _ => {
                        let descriptor = spell
                            .as_deref()
                            .and_then(|name| parse_spell(name).ok())
                            .and_then(|id| definitions.get(id));
                        match descriptor {
                            Some(descriptor) => TargetAction::CastSpell(descriptor.clone()),
                            None => {
                                warn!("Skipping targeting request '{}'", action);
                                continue;
                            }
                        }
                    }
                };
                targeting.send(StartTargetingRequest { actor, action });
            }
            ScenarioEvent::PickEntity { target, .. } => {
                if let Some(target) = timeline.id_of(&target) {
                    entity_picks.send(EntityTargetPicked { actor, target });
                }
            }
            ScenarioEvent::PickLocation { location, .. } => {
                location_picks.send(LocationTargetPicked {
                    actor,
                    location: vec3(location),
                });
            }
            ScenarioEvent::Cancel { .. } => {
                cancels.send(CancelCastRequest { actor });
            }
            ScenarioEvent::Disconnect { .. } => {
                disconnects.send(ActorDisconnected { actor });
            }
            ScenarioEvent::SetPendingTeleport { location, .. } => {
                sandbox.set_pending_teleport(actor, vec3(location));
            }
        }
    }
}

/// Run a scenario to completion and collect the result.
///
/// The final tick carries `AppExit`, so whatever is still live gets canceled
/// before the result is read.
pub fn run_scenario(
    config: &ScenarioConfig,
    definitions: SpellDefinitions,
    settings: MagicSettings,
    with_logging: bool,
) -> Result<ScenarioResult, ScenarioError> {
    let mut app = build_scenario_app(config, definitions, settings, with_logging)?;
    let tick = app.world().resource::<MagicSettings>().tick_period();
    let end = Duration::from_millis(config.duration_ms);

    // The first update only primes the real clock; no fixed tick runs
    app.update();
    let max_updates = config.duration_ms / tick.as_millis().max(1) as u64 + 2;
    for _ in 0..max_updates {
        if fixed_elapsed(&app) + tick >= end {
            break;
        }
        app.update();
    }
    let live_at_end = app.world().resource::<CastingManager>().len();

    app.world_mut().send_event(AppExit::Success);
    app.update();

    let ticks = (fixed_elapsed(&app).as_millis() / tick.as_millis().max(1)) as u64;
    let result = collect_result(&app, config, ticks, live_at_end);
    info!(
        "Scenario finished after {} ticks: {} casts succeeded, {} failed",
        result.ticks, result.casts_succeeded, result.casts_failed
    );
    Ok(result)
}

pub(crate) fn fixed_elapsed(app: &App) -> Duration {
    app.world().resource::<Time<Fixed>>().elapsed()
}

fn collect_result(app: &App, config: &ScenarioConfig, ticks: u64, live_at_end: usize) -> ScenarioResult {
    let world = app.world();
    let sandbox = world.resource::<Sandbox>();
    let elapsed = fixed_elapsed(app);

    let name_of = |id: EntityId| sandbox.actor(id).map_or_else(|| format!("{:?}", id), |a| a.name.clone());

    let casts_succeeded = sandbox
        .notices
        .iter()
        .filter(|(_, n)| matches!(n, crate::host::Notice::CastSucceeded { .. }))
        .count();
    let casts_failed = sandbox
        .notices
        .iter()
        .filter(|(_, n)| matches!(n, crate::host::Notice::CastFailed { .. }))
        .count();

    let actors = sandbox
        .actors()
        .map(|actor| ActorResult {
            name: actor.name.clone(),
            health: actor.health,
            mana: actor.mana,
            reagents: actor.reagents.values().sum(),
            scrolls: actor.main_hand.iter().chain(actor.off_hand.iter()).chain(actor.pack.iter()).map(|s| s.count).sum(),
            position: actor.position.to_array(),
            skills: actor.skills.iter().map(|(skill, value)| (format!("{:?}", skill), *value)).collect(),
        })
        .collect();

    let notices = sandbox
        .notices
        .iter()
        .map(|(actor, notice)| NoticeRecord {
            actor: name_of(*actor),
            key: notice.key().to_string(),
        })
        .collect();

    let log = sandbox
        .log
        .entries
        .iter()
        .map(|entry| LogLine {
            timestamp: entry.timestamp,
            event: entry.event_type.label().to_string(),
            message: entry.message.clone(),
        })
        .collect();

    ScenarioResult {
        duration_secs: elapsed.as_secs_f32(),
        ticks,
        random_seed: config.random_seed,
        casts_succeeded,
        casts_failed,
        casts_interrupted_at_end: live_at_end,
        actors,
        notices,
        log,
    }
}

/// Write a result as pretty JSON
pub fn save_result(result: &ScenarioResult, path: &Path) -> Result<(), ScenarioError> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).map_err(|source| ScenarioError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Options the command line can override
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    pub catalog: Option<std::path::PathBuf>,
    pub seed: Option<u64>,
    pub output: Option<std::path::PathBuf>,
}

/// Load, run and report a scenario file. Used by the binary.
pub fn run_headless_scenario(path: &Path, options: &HeadlessOptions) -> Result<ScenarioResult, ScenarioError> {
    let mut config = ScenarioConfig::load_from_file(path)?;
    if options.seed.is_some() {
        config.random_seed = options.seed;
    }
    let definitions = match &options.catalog {
        Some(catalog) => load_spell_definitions(catalog)?,
        None => SpellDefinitions::builtin()?,
    };
    let settings = MagicSettings::load(Path::new(crate::settings::SETTINGS_FILE));

    println!("Starting headless scenario {}...", path.display());
    println!("  Actors: {}", config.actors.len());
    println!("  Timeline events: {}", config.timeline.len());
    println!("  Duration: {:.1}s", config.duration_ms as f32 / 1000.0);

    let result = run_scenario(&config, definitions, settings, true)?;

    println!(
        "Scenario complete: {} succeeded, {} failed",
        result.casts_succeeded, result.casts_failed
    );
    let output = options
        .output
        .clone()
        .or_else(|| config.output_path.as_ref().map(Into::into));
    if let Some(output) = output {
        save_result(&result, &output)?;
        println!("Result saved to: {}", output.display());
    }
    Ok(result)
}

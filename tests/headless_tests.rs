//! Integration tests for headless scenario execution
//!
//! These tests verify that:
//! - Headless scenarios run to completion against the sandbox host
//! - Scenario results are accessible programmatically
//! - Disconnects and shutdown leave no live casting or targeting state
//! - Seeded RNG produces deterministic results
//! - A bolt resolved by a target click lands one tick after the cast succeeds

use circlecast::headless::runner::{build_scenario_app, save_result};
use circlecast::headless::{run_scenario, ScenarioConfig, ScenarioResult};
use circlecast::magic::{CastingManager, SpellDefinitions, TargetManager};
use circlecast::settings::MagicSettings;
use regex::Regex;

/// Helper to build a one-mage scenario around a timeline
fn scenario(timeline: &str, duration_ms: u64, seed: Option<u64>) -> ScenarioConfig {
    let seed = seed.map_or("null".to_string(), |s| s.to_string());
    let json = format!(
        r#"{{
            "actors": [
                {{
                    "name": "Mage",
                    "mana": 10,
                    "spells": ["All"],
                    "reagents": {{ "Garlic": 5, "SpidersSilk": 5, "SulfurousAsh": 5 }}
                }},
                {{ "name": "Troll", "kind": "Creature", "position": [6.0, 0.0, 0.0] }}
            ],
            "timeline": {},
            "duration_ms": {},
            "random_seed": {}
        }}"#,
        timeline, duration_ms, seed
    );
    ScenarioConfig::from_json(&json).unwrap()
}

fn run(config: &ScenarioConfig) -> ScenarioResult {
    run_scenario(
        config,
        SpellDefinitions::builtin().unwrap(),
        MagicSettings::default(),
        false,
    )
    .unwrap()
}

fn mage(result: &ScenarioResult) -> &circlecast::headless::runner::ActorResult {
    result.actors.iter().find(|a| a.name == "Mage").unwrap()
}

// ==============================================================================
// Scenario Execution
// ==============================================================================

#[test]
fn test_self_cast_resolves_in_scenario() {
    let config = scenario(
        r#"[{ "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" }]"#,
        3000,
        Some(12345),
    );
    let result = run(&config);

    assert_eq!(result.casts_succeeded + result.casts_failed, 1, "exactly one resolution");
    assert_eq!(result.casts_interrupted_at_end, 0);
    assert_eq!(mage(&result).mana, 9.0, "one circle worth of mana spent");
    assert_eq!(mage(&result).reagents, 12, "one of each reagent spent");
    assert_eq!(result.random_seed, Some(12345));
    assert_eq!(result.ticks, 30);
}

#[test]
fn test_live_cast_is_canceled_at_shutdown() {
    let config = scenario(
        r#"[{ "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" }]"#,
        1000,
        Some(1),
    );
    let result = run(&config);

    assert_eq!(result.casts_interrupted_at_end, 1);
    assert_eq!(result.casts_succeeded + result.casts_failed, 0);
    assert_eq!(mage(&result).mana, 10.0, "canceled casts are free");
}

#[test]
fn test_disconnect_clears_all_state() {
    let config = scenario(
        r#"[
            { "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" },
            { "at_ms": 0, "type": "StartTargeting", "actor": "Mage", "action": "Evaluate" },
            { "at_ms": 500, "type": "Disconnect", "actor": "Mage" }
        ]"#,
        3000,
        Some(7),
    );

    let result = run(&config);
    assert_eq!(result.casts_succeeded + result.casts_failed, 0, "disconnect never resolves");
    assert_eq!(result.casts_interrupted_at_end, 0);

    let mut app = build_scenario_app(
        &config,
        SpellDefinitions::builtin().unwrap(),
        MagicSettings::default(),
        false,
    )
    .unwrap();
    for _ in 0..4 {
        app.update();
    }
    assert_eq!(app.world().resource::<CastingManager>().len(), 1, "cast is channeling");
    assert_eq!(app.world().resource::<TargetManager>().len(), 1, "targeting is armed");
    for _ in 0..4 {
        app.update();
    }
    assert!(app.world().resource::<CastingManager>().is_empty());
    assert!(app.world().resource::<TargetManager>().is_empty());
}

#[test]
fn test_seeded_runs_are_identical() {
    let timeline = r#"[
        { "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" },
        { "at_ms": 2000, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" },
        { "at_ms": 4000, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" },
        { "at_ms": 6000, "type": "Cast", "actor": "Mage", "spell": "ReactiveArmor" }
    ]"#;
    let first = run(&scenario(timeline, 8000, Some(42)));
    let second = run(&scenario(timeline, 8000, Some(42)));

    assert_eq!(first.notices, second.notices);
    assert_eq!(first.casts_succeeded, second.casts_succeeded);
    assert_eq!(first.casts_succeeded + first.casts_failed, 4);
}

// ==============================================================================
// Projectile Timing
// ==============================================================================

fn point_blank_bolt(seed: u64) -> ScenarioConfig {
    let json = format!(
        r#"{{
            "actors": [
                {{
                    "name": "Mage",
                    "mana": 10,
                    "intelligence": 100,
                    "skills": {{ "Magery": 100 }},
                    "spells": ["MagicArrow"],
                    "reagents": {{ "SulfurousAsh": 1 }}
                }},
                {{ "name": "Troll", "kind": "Creature", "position": [0.9, 0.0, 0.0], "health": 100 }}
            ],
            "timeline": [
                {{ "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "MagicArrow" }},
                {{ "at_ms": 2000, "type": "Click", "actor": "Mage" }}
            ],
            "duration_ms": 3000,
            "random_seed": {}
        }}"#,
        seed
    );
    ScenarioConfig::from_json(&json).unwrap()
}

#[test]
fn test_clicked_bolt_lands_on_the_following_tick() {
    let result = (1..50)
        .map(|seed| run(&point_blank_bolt(seed)))
        .find(|result| result.casts_succeeded == 1)
        .expect("some seed should pass a 95% roll");

    let succeeded_at = result
        .log
        .iter()
        .find(|line| line.event == "notice" && line.message.starts_with("magic.cast.success"))
        .expect("success notice logged")
        .timestamp;
    let landed_at = result
        .log
        .iter()
        .find(|line| line.event == "damage")
        .expect("bolt should land inside the scenario")
        .timestamp;

    assert!(
        (landed_at - succeeded_at - 0.1).abs() < 1e-3,
        "bolt landed at {landed_at}, cast succeeded at {succeeded_at}"
    );
}

#[test]
fn test_notice_keys_are_namespaced() {
    let config = scenario(
        r#"[
            { "at_ms": 0, "type": "Cast", "actor": "Mage", "spell": "MagicArrow" },
            { "at_ms": 2000, "type": "Click", "actor": "Mage" },
            { "at_ms": 2500, "type": "Cast", "actor": "Mage", "spell": "Earthquake" }
        ]"#,
        4000,
        Some(3),
    );
    let result = run(&config);
    let key = Regex::new(r"^magic\.[a-z]+\.[a-z_]+$").unwrap();

    assert!(!result.notices.is_empty());
    for notice in &result.notices {
        assert!(key.is_match(&notice.key), "malformed notice key {}", notice.key);
    }
}

#[test]
fn test_result_saves_as_json() {
    let config = scenario("[]", 500, Some(5));
    let result = run(&config);
    let path = std::env::temp_dir().join("circlecast_headless_result.json");

    save_result(&result, &path).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(saved["random_seed"], 5);
    assert_eq!(saved["actors"].as_array().unwrap().len(), 2);
}

#[test]
fn test_demo_scenario_runs() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/duel.json");
    let config = ScenarioConfig::load_from_file(&path).unwrap();
    let result = run(&config);

    assert_eq!(result.random_seed, Some(42));
    assert!(result.casts_succeeded + result.casts_failed >= 1);
    let troll = result.actors.iter().find(|a| a.name == "Troll").unwrap();
    assert!(troll.health <= 80.0);
}

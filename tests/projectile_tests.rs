//! Integration tests for the projectile pattern
//!
//! These tests verify that:
//! - A projectile is never resolved on the tick it is launched
//! - Flights end on the first living entity, on solid geometry, or at range
//! - Burst payloads splash everything around the impact point
//! - Bolt spells launch through the effect handler and land later

use bevy::math::Vec3;
use circlecast::host::{Cue, EntityId};
use circlecast::magic::effects::{self, EffectContext, EffectEnv};
use circlecast::magic::projectile::{ProjectileArena, ProjectileEnd, ProjectilePayload, ProjectileSpec};
use circlecast::magic::spells::SpellId;
use circlecast::magic::{GameRng, SpellDefinitions};
use circlecast::sandbox::{Actor, Sandbox};
use circlecast::settings::MagicSettings;

const SPEC: ProjectileSpec = ProjectileSpec {
    step: 1.0,
    max_distance: 30.0,
    hit_radius: 0.8,
};

fn archer_and_target(distance: f32) -> (Sandbox, EntityId, EntityId) {
    let mut sandbox = Sandbox::new();
    sandbox.skill_gain_chance = 0.0;
    let archer = sandbox.spawn(Actor::player("Archer", Vec3::ZERO));
    let target = sandbox.spawn(Actor::creature("Target", Vec3::new(distance, 0.0, 0.0), false).with_health(100.0));
    (sandbox, archer, target)
}

#[test]
fn test_projectile_lands_after_travel() {
    let (mut sandbox, archer, target) = archer_and_target(5.0);
    let mut arena = ProjectileArena::default();
    arena
        .launch(
            archer,
            SpellId::MagicArrow,
            Vec3::ZERO,
            Vec3::X,
            SPEC,
            ProjectilePayload::MagicDamage { amount: 10.0 },
        )
        .unwrap();

    for step in 1..5 {
        assert!(arena.advance(&mut sandbox).is_empty(), "still flying after step {}", step);
        assert_eq!(sandbox.health_of(target), 100.0);
    }

    let impacts = arena.advance(&mut sandbox);
    assert_eq!(impacts.len(), 1);
    assert_eq!(impacts[0].end, ProjectileEnd::HitEntity(target));
    assert_eq!(sandbox.health_of(target), 90.0);
    assert!(sandbox.cues_for(archer).contains(&Cue::Impact));
    assert!(arena.is_empty());
}

#[test]
fn test_point_blank_target_waits_one_tick() {
    let (mut sandbox, archer, target) = archer_and_target(0.5);
    let mut arena = ProjectileArena::default();
    arena.launch(
        archer,
        SpellId::MagicArrow,
        Vec3::ZERO,
        Vec3::X,
        SPEC,
        ProjectilePayload::MagicDamage { amount: 10.0 },
    );

    // Launch alone never hits
    assert_eq!(sandbox.health_of(target), 100.0);
    assert_eq!(arena.len(), 1);

    let impacts = arena.advance(&mut sandbox);
    assert_eq!(impacts[0].end, ProjectileEnd::HitEntity(target));
}

#[test]
fn test_projectile_ignores_owner_and_the_dead() {
    let (mut sandbox, archer, target) = archer_and_target(6.0);
    let corpse = sandbox.spawn(Actor::creature("Corpse", Vec3::new(3.0, 0.0, 0.0), false).with_health(0.0));
    let mut arena = ProjectileArena::default();
    arena.launch(
        archer,
        SpellId::MagicArrow,
        Vec3::ZERO,
        Vec3::X,
        SPEC,
        ProjectilePayload::MagicDamage { amount: 4.0 },
    );

    let mut impacts = Vec::new();
    for _ in 0..6 {
        impacts.extend(arena.advance(&mut sandbox));
    }

    assert_eq!(impacts.len(), 1);
    assert_eq!(impacts[0].end, ProjectileEnd::HitEntity(target));
    assert_eq!(sandbox.health_of(corpse), 0.0);
}

#[test]
fn test_projectile_stops_at_walls() {
    let (mut sandbox, archer, target) = archer_and_target(8.0);
    sandbox.add_block(Vec3::new(2.5, -1.0, -1.0), Vec3::new(3.5, 1.0, 1.0));
    let mut arena = ProjectileArena::default();
    arena.launch(
        archer,
        SpellId::MagicArrow,
        Vec3::ZERO,
        Vec3::X,
        SPEC,
        ProjectilePayload::MagicDamage { amount: 10.0 },
    );

    let mut ticks = 0;
    let impact = loop {
        ticks += 1;
        if let Some(impact) = arena.advance(&mut sandbox).pop() {
            break impact;
        }
    };

    assert_eq!(ticks, 3);
    assert_eq!(impact.end, ProjectileEnd::HitSolid);
    assert_eq!(sandbox.health_of(target), 100.0);
}

#[test]
fn test_projectile_terminates_within_range_budget() {
    let mut sandbox = Sandbox::new();
    let archer = sandbox.spawn(Actor::player("Archer", Vec3::ZERO));
    let mut arena = ProjectileArena::default();
    let spec = ProjectileSpec {
        step: 3.0,
        max_distance: 10.0,
        hit_radius: 0.8,
    };
    arena.launch(
        archer,
        SpellId::EnergyBolt,
        Vec3::ZERO,
        Vec3::Z,
        spec,
        ProjectilePayload::MagicDamage { amount: 1.0 },
    );

    // ceil(10 / 3) = 4 steps at most
    let mut ended = None;
    for tick in 1..=4 {
        if let Some(impact) = arena.advance(&mut sandbox).pop() {
            ended = Some((tick, impact));
            break;
        }
    }
    let (tick, impact) = ended.expect("projectile should be gone after four steps");
    assert_eq!(tick, 4);
    assert_eq!(impact.end, ProjectileEnd::Fizzled);
    assert!((impact.point.z - 10.0).abs() < 1e-4, "last step is clipped to range");
}

#[test]
fn test_launch_rejects_degenerate_input() {
    let mut arena = ProjectileArena::default();
    let payload = ProjectilePayload::MagicDamage { amount: 1.0 };
    assert!(arena
        .launch(EntityId(1), SpellId::MagicArrow, Vec3::ZERO, Vec3::ZERO, SPEC, payload)
        .is_none());
    let stalled = ProjectileSpec { step: 0.0, ..SPEC };
    assert!(arena
        .launch(EntityId(1), SpellId::MagicArrow, Vec3::ZERO, Vec3::X, stalled, payload)
        .is_none());
    assert!(arena.is_empty());
}

#[test]
fn test_burst_splashes_around_impact() {
    let (mut sandbox, archer, target) = archer_and_target(5.0);
    let neighbour = sandbox.spawn(Actor::creature("Neighbour", Vec3::new(5.0, 0.0, 1.0), false).with_health(100.0));
    let bystander = sandbox.spawn(Actor::creature("Bystander", Vec3::new(5.0, 0.0, 6.0), false).with_health(100.0));
    let mut arena = ProjectileArena::default();
    arena.launch(
        archer,
        SpellId::Fireball,
        Vec3::ZERO,
        Vec3::X,
        SPEC,
        ProjectilePayload::Burst {
            amount: 7.0,
            radius: 1.5,
        },
    );

    for _ in 0..5 {
        arena.advance(&mut sandbox);
    }

    assert_eq!(sandbox.health_of(target), 93.0);
    assert_eq!(sandbox.health_of(neighbour), 93.0);
    assert_eq!(sandbox.health_of(bystander), 100.0);
    assert_eq!(sandbox.health_of(archer), 50.0);
}

#[test]
fn test_bolt_spell_launches_and_lands_later() {
    let (mut sandbox, archer, target) = archer_and_target(4.0);
    let defs = SpellDefinitions::builtin().unwrap();
    let settings = MagicSettings::default();
    let mut rng = GameRng::from_seed(1);
    let mut arena = ProjectileArena::default();

    let spell = defs.get_unchecked(SpellId::MagicArrow);
    let ctx = EffectContext {
        caster: archer,
        spell,
        entity: Some(target),
        location: None,
    };
    let mut env = EffectEnv {
        rng: &mut rng,
        projectiles: &mut arena,
        settings: &settings,
    };
    effects::apply(&mut sandbox, &mut env, &ctx);

    assert_eq!(arena.len(), 1, "bolt is in flight");
    assert_eq!(sandbox.health_of(target), 100.0, "no damage on the launch tick");

    let mut landed = Vec::new();
    for _ in 0..4 {
        landed.extend(arena.advance(&mut sandbox));
    }
    assert_eq!(landed.len(), 1);
    let health = sandbox.health_of(target);
    assert!((95.0..=97.0).contains(&health), "magic arrow deals 3-5, health now {}", health);
}

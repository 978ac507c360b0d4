//! Integration tests for the generic targeting protocol
//!
//! These tests verify that:
//! - An invalid pick keeps the armed request alive for a valid one
//! - Requests expire lazily and through the periodic sweep
//! - Each action accepts exactly the targets it should
//! - Spell target kinds share the same acceptance rules

use std::time::Duration;

use bevy::math::Vec3;
use circlecast::host::{EntityId, Notice};
use circlecast::magic::spells::{SpellId, TargetKind};
use circlecast::magic::{SpellDefinitions, TargetAcquisition, TargetAction, TargetManager, TargetOutcome};
use circlecast::sandbox::{Actor, Sandbox};

struct Scene {
    sandbox: Sandbox,
    targeting: TargetManager,
    seer: EntityId,
    friend: EntityId,
    wolf: EntityId,
    horse: EntityId,
    chest: EntityId,
}

fn scene() -> Scene {
    let mut sandbox = Sandbox::new();
    let seer = sandbox.spawn(Actor::player("Seer", Vec3::ZERO));
    let friend = sandbox.spawn(Actor::player("Friend", Vec3::new(2.0, 0.0, 0.0)));
    let wolf = sandbox.spawn(Actor::creature("Wolf", Vec3::new(4.0, 0.0, 0.0), false));
    let horse = sandbox.spawn(Actor::creature("Horse", Vec3::new(6.0, 0.0, 0.0), true));
    let chest = sandbox.spawn(Actor::object("Chest", Vec3::new(0.0, 0.0, 3.0)));
    Scene {
        sandbox,
        targeting: TargetManager::default(),
        seer,
        friend,
        wolf,
        horse,
        chest,
    }
}

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

// ==============================================================================
// Arming and Resolving
// ==============================================================================

#[test]
fn test_invalid_pick_keeps_request_armed() {
    let mut s = scene();
    assert!(s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Evaluate));
    assert!(matches!(s.sandbox.last_notice(s.seer), Some(Notice::TargetPrompt { seconds: 10, .. })));

    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(1.0), s.seer, s.wolf);
    assert_eq!(outcome, TargetOutcome::InvalidTarget);
    assert_eq!(s.sandbox.last_notice(s.seer), Some(&Notice::InvalidTarget));
    assert!(s.targeting.is_targeting(secs(1.0), s.seer));

    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(2.0), s.seer, s.friend);
    assert_eq!(
        outcome,
        TargetOutcome::EntityTarget {
            action: TargetAction::Evaluate,
            target: s.friend,
        }
    );
    assert!(!s.targeting.is_targeting(secs(2.0), s.seer), "a resolved request is disarmed");
}

#[test]
fn test_pick_without_request_is_expired() {
    let mut s = scene();
    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(0.0), s.seer, s.friend);
    assert_eq!(outcome, TargetOutcome::Expired);
    let outcome = s
        .targeting
        .process_location_target(&mut s.sandbox, secs(0.0), s.seer, Vec3::ONE);
    assert_eq!(outcome, TargetOutcome::Expired);
}

#[test]
fn test_arming_again_replaces_the_action() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Evaluate);
    s.targeting.start_targeting(&mut s.sandbox, secs(1.0), s.seer, TargetAction::AnimalLore);

    assert_eq!(s.targeting.len(), 1);
    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(2.0), s.seer, s.wolf);
    assert!(matches!(outcome, TargetOutcome::EntityTarget { action: TargetAction::AnimalLore, .. }));
}

#[test]
fn test_location_pick_for_detect_hidden() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::DetectHidden);

    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(0.5), s.seer, s.friend);
    assert_eq!(outcome, TargetOutcome::InvalidTarget);

    let spot = Vec3::new(3.0, 0.0, 3.0);
    let outcome = s.targeting.process_location_target(&mut s.sandbox, secs(1.0), s.seer, spot);
    assert_eq!(
        outcome,
        TargetOutcome::LocationTarget {
            action: TargetAction::DetectHidden,
            location: spot,
        }
    );
}

#[test]
fn test_entity_only_action_rejects_locations() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Snoop);

    let outcome = s
        .targeting
        .process_location_target(&mut s.sandbox, secs(1.0), s.seer, Vec3::ONE);
    assert_eq!(outcome, TargetOutcome::InvalidTarget);
    assert!(s.targeting.is_targeting(secs(1.0), s.seer));
}

#[test]
fn test_cancel_is_idempotent() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Tame);
    assert!(s.targeting.cancel_targeting(s.seer));
    assert!(!s.targeting.cancel_targeting(s.seer));
    assert!(s.targeting.is_empty());
}

// ==============================================================================
// Expiry
// ==============================================================================

#[test]
fn test_request_expires_lazily_after_timeout() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Evaluate);

    assert!(s.targeting.is_targeting(secs(10.0), s.seer), "still live at exactly the timeout");
    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(10.5), s.seer, s.friend);
    assert_eq!(outcome, TargetOutcome::Expired);
    assert!(s.targeting.is_empty(), "expired request is dropped on touch");
}

#[test]
fn test_cleanup_expired_removes_only_expired() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::Evaluate);
    s.targeting.start_targeting(&mut s.sandbox, secs(5.0), s.friend, TargetAction::AnimalLore);

    let removed = s.targeting.cleanup_expired(&mut s.sandbox, secs(12.0));

    assert_eq!(removed, 1);
    assert_eq!(s.sandbox.last_notice(s.seer), Some(&Notice::TargetingExpired));
    assert!(!s.sandbox.notices_for(s.friend).contains(&&Notice::TargetingExpired));
    assert!(s.targeting.state(s.friend).is_some());
    assert!(s.targeting.state(s.seer).is_none());

    assert_eq!(s.targeting.cleanup_expired(&mut s.sandbox, secs(12.0)), 0);
    assert_eq!(s.targeting.cleanup_expired(&mut s.sandbox, secs(15.5)), 1);
    assert!(s.targeting.is_empty());
}

#[test]
fn test_remaining_time_counts_down() {
    let mut s = scene();
    s.targeting.start_targeting(&mut s.sandbox, secs(2.0), s.seer, TargetAction::Evaluate);
    let state = s.targeting.state(s.seer).unwrap();
    assert_eq!(state.remaining(secs(5.0)), secs(7.0));
    assert_eq!(state.remaining(secs(20.0)), Duration::ZERO);
}

// ==============================================================================
// Acceptance Rules
// ==============================================================================

#[test]
fn test_action_acceptance() {
    let s = scene();
    let world = &s.sandbox;

    assert!(TargetAction::Evaluate.accepts_entity(world, s.seer, s.friend));
    assert!(!TargetAction::Evaluate.accepts_entity(world, s.seer, s.seer), "not yourself");
    assert!(!TargetAction::Evaluate.accepts_entity(world, s.seer, s.wolf));

    assert!(TargetAction::AnimalLore.accepts_entity(world, s.seer, s.wolf));
    assert!(TargetAction::AnimalLore.accepts_entity(world, s.seer, s.horse));
    assert!(!TargetAction::AnimalLore.accepts_entity(world, s.seer, s.chest));

    assert!(TargetAction::Tame.accepts_entity(world, s.seer, s.horse));
    assert!(!TargetAction::Tame.accepts_entity(world, s.seer, s.wolf), "wolf is not tameable");

    assert!(TargetAction::Snoop.accepts_entity(world, s.seer, s.friend));
    assert!(!TargetAction::DetectHidden.accepts_entity(world, s.seer, s.friend));
    assert!(TargetAction::DetectHidden.accepts_location());
    assert!(!TargetAction::Evaluate.accepts_location());
}

#[test]
fn test_dead_creatures_are_rejected() {
    let mut s = scene();
    s.sandbox.actor_mut(s.horse).unwrap().health = 0.0;
    assert!(!TargetAction::Tame.accepts_entity(&s.sandbox, s.seer, s.horse));
    assert!(!TargetKind::Entity.accepts_entity(&s.sandbox, s.seer, s.horse));
}

#[test]
fn test_spell_target_kinds_share_rules() {
    let s = scene();
    let world = &s.sandbox;

    assert!(TargetKind::Entity.accepts_entity(world, s.seer, s.wolf));
    assert!(TargetKind::Entity.accepts_entity(world, s.seer, s.chest), "objects can be struck");
    assert!(!TargetKind::Entity.accepts_entity(world, s.seer, s.seer));

    assert!(TargetKind::PlayerOrSelf.accepts_entity(world, s.seer, s.seer));
    assert!(TargetKind::PlayerOrSelf.accepts_entity(world, s.seer, s.friend));
    assert!(!TargetKind::PlayerOrSelf.accepts_entity(world, s.seer, s.wolf));

    assert!(TargetKind::SelfOnly.accepts_entity(world, s.seer, s.seer));
    assert!(!TargetKind::SelfOnly.accepts_entity(world, s.seer, s.friend));

    assert!(TargetKind::Location.accepts_location());
    assert!(TargetKind::Area.accepts_location());
    assert!(!TargetKind::Entity.accepts_location());
    assert!(!TargetKind::NoTarget.accepts_entity(world, s.seer, s.friend));
}

#[test]
fn test_armed_spell_follows_its_target_kind() {
    let mut s = scene();
    let defs = SpellDefinitions::builtin().unwrap();
    let heal = defs.get_unchecked(SpellId::Heal).clone();

    s.targeting
        .start_targeting(&mut s.sandbox, secs(0.0), s.seer, TargetAction::CastSpell(heal.clone()));
    assert!(matches!(
        s.sandbox.last_notice(s.seer),
        Some(Notice::TargetPrompt { action, .. }) if action == "Heal"
    ));

    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(1.0), s.seer, s.wolf);
    assert_eq!(outcome, TargetOutcome::InvalidTarget);
    let outcome = s.targeting.process_entity_target(&mut s.sandbox, secs(1.5), s.seer, s.friend);
    assert_eq!(
        outcome,
        TargetOutcome::EntityTarget {
            action: TargetAction::CastSpell(heal),
            target: s.friend,
        }
    );
}

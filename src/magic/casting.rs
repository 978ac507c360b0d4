//! Casting lifecycle
//!
//! Per-actor state machine: channel, then (for spells that need one) a target
//! window, then resolution through [`SpellManager::finalize_cast`].
//!
//! The manager never touches mana, reagents or scrolls. Anything that ends
//! here without reaching the resolver (movement, explicit cancel, superseding
//! cast, target timeout) therefore costs nothing.

use bevy::prelude::*;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::host::{
    Cue, EntityId, MagicHost, Notice, OverlayHandle, OverlayStyle, OverlayView, Presentation, SkillId, World,
};
use crate::settings::MagicSettings;

use super::resolver::SpellManager;
use super::spells::{SpellDescriptor, TargetKind};
use super::targeting::TargetAcquisition;

/// Phase of a live cast.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastPhase {
    Channeling,
    TargetSelect,
}

/// Per-actor casting state. At most one exists per actor.
#[derive(Clone, Debug)]
pub struct CastingState {
    pub owner: EntityId,
    pub spell: SpellDescriptor,
    pub using_scroll: bool,
    pub started_at: Duration,
    pub channel_duration: Duration,
    /// Position at channel start; moving away from it interrupts the cast
    pub anchor: Vec3,
    pub overlay: OverlayHandle,
    pub phase: CastPhase,
    pub phase_started_at: Duration,
    /// Explicit target for player-or-self spells
    pub pre_target: Option<EntityId>,
}

impl CastingState {
    /// 0.0..=1.0 of the channel completed at `now`
    pub fn channel_progress(&self, now: Duration) -> f32 {
        progress(now.saturating_sub(self.started_at), self.channel_duration)
    }
}

/// Why a cast could not be started.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CastStartError {
    #[error("actor {0:?} has no position in the world")]
    UnknownActor(EntityId),
}

fn progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

/// Channel time for a spell of `circle` cast with `magery` skill.
///
/// Magery shortens the base time by up to `max_skill_reduction` (30% at 100 skill).
/// The cap is held to 0..=1 so a bad settings file cannot make the time negative.
pub fn channel_duration(settings: &MagicSettings, circle: u8, magery: f32) -> Duration {
    let base_ms = settings.base_channel_ms + circle as u64 * settings.channel_per_circle_ms;
    let cap = settings.max_skill_reduction.clamp(0.0, 1.0);
    let reduction = (magery.max(0.0) / 100.0 * cap).min(cap);
    Duration::from_secs_f32(base_ms as f32 / 1000.0 * (1.0 - reduction))
}

/// Registry of live casts, advanced by the central tick dispatcher.
#[derive(Resource, Debug)]
pub struct CastingManager {
    states: HashMap<EntityId, CastingState>,
    settings: MagicSettings,
}

impl Default for CastingManager {
    fn default() -> Self {
        Self::new(&MagicSettings::default())
    }
}

impl CastingManager {
    pub fn new(settings: &MagicSettings) -> Self {
        Self {
            states: HashMap::new(),
            settings: settings.clone(),
        }
    }

    /// Begin channeling `spell`. Resource gates must already have passed.
    ///
    /// Any cast the actor already has is discarded at no cost.
    pub fn start_casting<H: MagicHost>(
        &mut self,
        host: &mut H,
        now: Duration,
        actor: EntityId,
        spell: &SpellDescriptor,
        using_scroll: bool,
        pre_target: Option<EntityId>,
    ) -> Result<(), CastStartError> {
        let anchor = host.position(actor).ok_or(CastStartError::UnknownActor(actor))?;

        if let Some(previous) = self.states.remove(&actor) {
            debug!("{:?} superseded {} with {}", actor, previous.spell.name, spell.name);
            host.hide_overlay(previous.overlay);
        }

        let magery = host.skill(actor, SkillId::Magery);
        let channel = channel_duration(&self.settings, spell.circle, magery);
        let overlay = host.show_overlay(
            actor,
            OverlayView {
                label: spell.name.clone(),
                progress: 0.0,
                style: OverlayStyle::Channeling,
            },
        );
        host.broadcast_incantation(actor, &spell.words, self.settings.incantation_radius);
        host.play_cue(actor, Cue::CastStart);

        debug!(
            "{:?} channeling {} ({:.2}s{})",
            actor,
            spell.name,
            channel.as_secs_f32(),
            if using_scroll { ", scroll" } else { "" }
        );

        self.states.insert(
            actor,
            CastingState {
                owner: actor,
                spell: spell.clone(),
                using_scroll,
                started_at: now,
                channel_duration: channel,
                anchor,
                overlay,
                phase: CastPhase::Channeling,
                phase_started_at: now,
                pre_target,
            },
        );
        Ok(())
    }

    /// Advance every live cast to `now`.
    pub fn tick<H: MagicHost>(&mut self, host: &mut H, resolver: &mut SpellManager, now: Duration) {
        for actor in self.actors() {
            self.advance(host, resolver, now, actor);
        }
    }

    fn advance<H: MagicHost>(&mut self, host: &mut H, resolver: &mut SpellManager, now: Duration, actor: EntityId) {
        let target_window = self.settings.target_window();
        let Some(state) = self.states.get_mut(&actor) else {
            return;
        };

        match state.phase {
            CastPhase::Channeling => {
                let elapsed = now.saturating_sub(state.started_at);
                if elapsed < state.channel_duration {
                    host.update_overlay(
                        state.overlay,
                        OverlayView {
                            label: state.spell.name.clone(),
                            progress: progress(elapsed, state.channel_duration),
                            style: OverlayStyle::Channeling,
                        },
                    );
                    return;
                }

                match (state.spell.target, state.pre_target) {
                    (kind, _) if kind.skips_target_window() => {
                        // Item spells aim at where the caster stands
                        let location = (kind == TargetKind::Item).then(|| host.position(actor)).flatten();
                        self.resolve(host, resolver, actor, None, location);
                    }
                    (TargetKind::PlayerOrSelf, Some(target)) => {
                        self.resolve(host, resolver, actor, Some(target), None);
                    }
                    _ => {
                        state.phase = CastPhase::TargetSelect;
                        state.phase_started_at = now;
                        host.update_overlay(
                            state.overlay,
                            OverlayView {
                                label: format!("{}: select target", state.spell.name),
                                progress: 1.0,
                                style: OverlayStyle::TargetSelect,
                            },
                        );
                        host.play_cue(actor, Cue::TargetReady);
                        debug!("{:?} {} awaiting target", actor, state.spell.name);
                    }
                }
            }
            CastPhase::TargetSelect => {
                let elapsed = now.saturating_sub(state.phase_started_at);
                if elapsed >= target_window {
                    self.time_out(host, actor);
                    return;
                }
                host.update_overlay(
                    state.overlay,
                    OverlayView {
                        label: format!("{}: select target", state.spell.name),
                        progress: 1.0 - progress(elapsed, target_window),
                        style: OverlayStyle::TargetSelect,
                    },
                );
            }
        }
    }

    /// Remove the cast and hand it to the resolver.
    fn resolve<H: MagicHost>(
        &mut self,
        host: &mut H,
        resolver: &mut SpellManager,
        actor: EntityId,
        entity: Option<EntityId>,
        location: Option<Vec3>,
    ) -> bool {
        let Some(state) = self.states.remove(&actor) else {
            return false;
        };
        host.hide_overlay(state.overlay);
        resolver.finalize_cast(host, actor, &state.spell, entity, location, state.using_scroll)
    }

    fn time_out<H: World + Presentation>(&mut self, host: &mut H, actor: EntityId) {
        if self.cancel_casting(host, actor, true) {
            host.notify(actor, Notice::TargetTimeout);
            host.play_cue(actor, Cue::CastFailure);
            debug!("{:?} target window expired", actor);
        }
    }

    /// Interrupt a channeling cast if the actor moved off its anchor.
    ///
    /// Returns true when the cast was canceled.
    pub fn check_movement<H: World + Presentation>(&mut self, host: &mut H, actor: EntityId) -> bool {
        let Some(state) = self.states.get(&actor) else {
            return false;
        };
        if state.phase != CastPhase::Channeling {
            return false;
        }
        let moved = match host.position(actor) {
            Some(position) => position.distance(state.anchor) > self.settings.movement_threshold,
            None => true,
        };
        if !moved {
            return false;
        }
        self.cancel_casting(host, actor, false);
        host.notify(actor, Notice::CastInterrupted);
        debug!("{:?} interrupted by movement", actor);
        true
    }

    /// Poll movement for every channeling actor. Returns how many were interrupted.
    pub fn check_all_movement<H: World + Presentation>(&mut self, host: &mut H) -> usize {
        self.actors()
            .into_iter()
            .filter(|actor| self.check_movement(host, *actor))
            .count()
    }

    /// Feed a target click to `actor`'s cast.
    ///
    /// Returns whether the click was consumed by a cast in its target window.
    /// A click that finds nothing acceptable is still consumed; the window
    /// stays open.
    pub fn process_target_click<H: MagicHost>(
        &mut self,
        host: &mut H,
        now: Duration,
        resolver: &mut SpellManager,
        actor: EntityId,
    ) -> bool {
        let (spell, phase_started_at) = match self.states.get(&actor) {
            Some(state) if state.phase == CastPhase::TargetSelect => (state.spell.clone(), state.phase_started_at),
            _ => return false,
        };
        if now.saturating_sub(phase_started_at) >= self.settings.target_window() {
            self.time_out(host, actor);
            return false;
        }

        let reach = self.settings.max_target_distance;
        let (entity, location) = match spell.target {
            TargetKind::Entity => {
                let hit = resolver
                    .raycast_for_entity(host, actor, reach)
                    .and_then(|result| result.entity)
                    .filter(|candidate| spell.target.accepts_entity(&*host, actor, *candidate));
                match hit {
                    Some(target) => (Some(target), None),
                    None => {
                        host.notify(actor, Notice::NoTargetFound);
                        return true;
                    }
                }
            }
            TargetKind::Location | TargetKind::Area => {
                let Some(result) = resolver.raycast_for_location(host, actor, reach) else {
                    host.notify(actor, Notice::NoTargetFound);
                    return true;
                };
                let entity = result
                    .entity
                    .filter(|candidate| spell.target.accepts_entity(&*host, actor, *candidate));
                let location = entity.and_then(|e| host.position(e)).unwrap_or(result.point);
                (entity, Some(location))
            }
            TargetKind::PlayerOrSelf => {
                let target = resolver
                    .raycast_for_entity(host, actor, reach)
                    .and_then(|result| result.entity)
                    .filter(|candidate| spell.target.accepts_entity(&*host, actor, *candidate))
                    .unwrap_or(actor);
                (Some(target), None)
            }
            TargetKind::Item => (None, host.position(actor)),
            TargetKind::SelfOnly | TargetKind::NoTarget => (None, None),
        };

        self.resolve(host, resolver, actor, entity, location);
        true
    }

    /// Cancel `actor`'s cast. Idempotent; returns whether anything was canceled.
    ///
    /// Also clears any pending teleport destination handed over by another
    /// feature for this actor.
    pub fn cancel_casting<H: World + Presentation>(&mut self, host: &mut H, actor: EntityId, silent: bool) -> bool {
        let Some(state) = self.states.remove(&actor) else {
            return false;
        };
        host.hide_overlay(state.overlay);
        host.clear_pending_teleport(actor);
        if !silent {
            host.play_cue(actor, Cue::CastCancel);
        }
        debug!("{:?} canceled {}", actor, state.spell.name);
        true
    }

    pub fn is_casting(&self, actor: EntityId) -> bool {
        self.states.contains_key(&actor)
    }

    pub fn casting_state(&self, actor: EntityId) -> Option<&CastingState> {
        self.states.get(&actor)
    }

    /// Actors with a live cast, in id order.
    pub fn actors(&self) -> Vec<EntityId> {
        let mut actors: Vec<EntityId> = self.states.keys().copied().collect();
        actors.sort_unstable();
        actors
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Cancel every live cast silently. Used at shutdown.
    pub fn cleanup<H: World + Presentation>(&mut self, host: &mut H) -> usize {
        let actors = self.actors();
        for actor in &actors {
            self.cancel_casting(host, *actor, true);
        }
        if !actors.is_empty() {
            info!("Canceled {} live casts during cleanup", actors.len());
        }
        actors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_duration_scales_with_circle() {
        let settings = MagicSettings::default();
        assert_eq!(channel_duration(&settings, 1, 0.0), Duration::from_millis(1500));
        assert_eq!(channel_duration(&settings, 8, 0.0), Duration::from_millis(5000));
    }

    #[test]
    fn test_magery_reduction_caps_at_thirty_percent() {
        let settings = MagicSettings::default();
        let master = channel_duration(&settings, 1, 100.0);
        assert!((master.as_secs_f32() - 1.05).abs() < 1e-3, "got {:?}", master);
        // Skill above 100 cannot shorten it further
        assert_eq!(channel_duration(&settings, 1, 150.0), master);
        let half = channel_duration(&settings, 1, 50.0);
        assert!((half.as_secs_f32() - 1.275).abs() < 1e-3, "got {:?}", half);
    }

    #[test]
    fn test_out_of_range_reduction_is_clamped() {
        let settings = MagicSettings {
            max_skill_reduction: 2.0,
            ..MagicSettings::default()
        };
        assert_eq!(channel_duration(&settings, 3, 100.0), Duration::ZERO);

        let settings = MagicSettings {
            max_skill_reduction: -0.5,
            ..MagicSettings::default()
        };
        assert_eq!(channel_duration(&settings, 1, 100.0), Duration::from_millis(1500));
    }

    #[test]
    fn test_progress_handles_zero_length() {
        assert_eq!(progress(Duration::from_millis(5), Duration::ZERO), 1.0);
        assert_eq!(progress(Duration::from_millis(500), Duration::from_millis(1000)), 0.5);
        assert_eq!(progress(Duration::from_millis(1500), Duration::from_millis(1000)), 1.0);
    }
}

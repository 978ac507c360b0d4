//! Viewer UI
//!
//! A small egui front end over the sandbox host:
//! - Cast log panel, color-coded by entry type
//! - Caster panel with health/mana, spell picker and cast controls
//! - Progress overlays and the latest notice for the controlled actor

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use std::f32::consts::FRAC_PI_8;

use crate::host::{EntityId, OverlayStyle};
use crate::magic::events::*;
use crate::magic::spell_config::SpellDefinitions;
use crate::magic::spells::{Reagent, SpellId};
use crate::magic::targeting::TargetAction;
use crate::magic::CastingManager;
use crate::sandbox::{Actor, CastLog, CastLogEventType, Sandbox, ScrollSlot};

/// Plugin for the viewer
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (setup_camera, setup_demo_scene))
            .add_systems(Update, (render_log_panel, render_caster_panel, render_overlays));
    }
}

/// Which actor the panel controls and what it is about to cast
#[derive(Resource)]
pub struct ViewerState {
    pub caster: EntityId,
    pub others: Vec<EntityId>,
    pub spell: SpellId,
    pub use_scroll: bool,
}

/// Common colors used throughout the UI
pub mod colors {
    use bevy_egui::egui::Color32;

    pub const HEADER: Color32 = Color32::from_rgb(230, 204, 153);
    pub const MUTED: Color32 = Color32::from_rgb(150, 150, 150);
    pub const HEALTH: Color32 = Color32::from_rgb(51, 204, 51);
    pub const HEALTH_LOW: Color32 = Color32::from_rgb(204, 51, 51);
    pub const MANA: Color32 = Color32::from_rgb(51, 102, 230);
    /// Channel bar
    pub const CHANNEL: Color32 = Color32::from_rgb(180, 140, 255);
    /// Target window bar
    pub const TARGET: Color32 = Color32::from_rgb(255, 200, 80);
}

/// Font sizes used throughout the UI
pub mod fonts {
    pub const HEADER: f32 = 16.0;
    pub const BODY: f32 = 13.0;
    pub const LOG: f32 = 12.0;
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Populate the sandbox with a caster, a couple of targets and a wall
fn setup_demo_scene(mut commands: Commands, mut sandbox: ResMut<Sandbox>) {
    let caster = sandbox.spawn(
        Actor::player("Mage", Vec3::ZERO)
            .with_mana(60.0)
            .with_intelligence(60.0)
            .with_skill(crate::host::SkillId::Magery, 70.0)
            .with_spells(SpellId::ALL)
            .with_reagent(Reagent::BlackPearl, 20)
            .with_reagent(Reagent::BloodMoss, 20)
            .with_reagent(Reagent::Garlic, 20)
            .with_reagent(Reagent::Ginseng, 20)
            .with_reagent(Reagent::MandrakeRoot, 20)
            .with_reagent(Reagent::Nightshade, 20)
            .with_reagent(Reagent::SulfurousAsh, 20)
            .with_reagent(Reagent::SpidersSilk, 20)
            .with_scrolls(ScrollSlot::Pack, SpellId::FlameStrike, 3),
    );
    let troll = sandbox.spawn(Actor::creature("Troll", Vec3::new(8.0, 0.0, 0.0), false));
    let horse = sandbox.spawn(Actor::creature("Horse", Vec3::new(0.0, 0.0, 6.0), true));
    let ally = sandbox.spawn(Actor::player("Cleric", Vec3::new(-3.0, 0.0, 1.0)).poisoned());
    let dummy = sandbox.spawn(Actor::object("Training Dummy", Vec3::new(5.0, 0.0, -4.0)));
    sandbox.add_block(Vec3::new(12.0, -1.0, -4.0), Vec3::new(13.0, 3.0, 4.0));

    info!("Demo scene ready: {:?} casting at {:?}", caster, troll);
    commands.insert_resource(ViewerState {
        caster,
        others: vec![troll, horse, ally, dummy],
        spell: SpellId::MagicArrow,
        use_scroll: false,
    });
}

/// Render the cast log on the left side.
pub fn render_log_panel(mut contexts: EguiContexts, sandbox: Res<Sandbox>) {
    // Use try_ctx_mut to gracefully handle window close
    let Some(ctx) = contexts.try_ctx_mut() else { return; };

    egui::SidePanel::left("cast_log_panel")
        .default_width(320.0)
        .min_width(260.0)
        .resizable(true)
        .frame(egui::Frame::side_top_panel(&ctx.style()).fill(egui::Color32::from_black_alpha(180)))
        .show(ctx, |ui| {
            ui.label(egui::RichText::new("Cast Log").size(fonts::HEADER).color(colors::HEADER));
            ui.separator();
            render_log_content(ui, &sandbox.log);
        });
}

fn render_log_content(ui: &mut egui::Ui, log: &CastLog) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in &log.entries {
                let color = match entry.event_type {
                    CastLogEventType::Damage => egui::Color32::from_rgb(255, 180, 180),
                    CastLogEventType::Healing => egui::Color32::from_rgb(180, 255, 180),
                    CastLogEventType::Modifier => egui::Color32::from_rgb(180, 220, 255),
                    CastLogEventType::Travel => egui::Color32::from_rgb(220, 180, 255),
                    CastLogEventType::Notice => egui::Color32::from_rgb(200, 200, 100),
                    _ => egui::Color32::from_rgb(200, 200, 200),
                };
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("[{:>5.1}s]", entry.timestamp))
                            .size(11.0)
                            .color(colors::MUTED),
                    );
                    ui.label(egui::RichText::new(&entry.message).size(fonts::LOG).color(color));
                });
            }
        });
}

/// Caster controls on the right side.
#[allow(clippy::too_many_arguments)]
pub fn render_caster_panel(
    mut contexts: EguiContexts,
    mut viewer: ResMut<ViewerState>,
    mut sandbox: ResMut<Sandbox>,
    definitions: Res<SpellDefinitions>,
    casting: Res<CastingManager>,
    mut casts: EventWriter<CastRequest>,
    mut clicks: EventWriter<TargetClick>,
    mut cancels: EventWriter<CancelCastRequest>,
    mut targeting: EventWriter<StartTargetingRequest>,
    mut picks: EventWriter<EntityTargetPicked>,
) {
    let Some(ctx) = contexts.try_ctx_mut() else { return; };
    let caster = viewer.caster;
    let Some(actor) = sandbox.actor(caster).cloned() else { return; };

    egui::SidePanel::right("caster_panel")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(&actor.name).size(fonts::HEADER).color(colors::HEADER));
            resource_bar(ui, "HP", actor.health, actor.max_health, health_color(&actor));
            resource_bar(ui, "Mana", actor.mana, actor.max_mana, colors::MANA);
            ui.label(
                egui::RichText::new(format!(
                    "Magery {:.1}  Int {:.0}  Reagents {}",
                    actor.skill(crate::host::SkillId::Magery),
                    actor.intelligence,
                    actor.reagents.values().sum::<u32>()
                ))
                .size(fonts::BODY),
            );
            ui.separator();

            egui::ComboBox::from_label("Spell")
                .selected_text(definitions.get(viewer.spell).map_or("?", |s| s.name.as_str()))
                .show_ui(ui, |ui| {
                    for spell in definitions.by_circle() {
                        let label = format!("{} ({})", spell.name, spell.circle);
                        ui.selectable_value(&mut viewer.spell, spell.id, label);
                    }
                });
            let scrolls = actor.scroll_count(viewer.spell);
            ui.checkbox(&mut viewer.use_scroll, format!("From scroll ({})", scrolls));

            ui.horizontal(|ui| {
                if ui.button("Cast").clicked() {
                    casts.send(CastRequest {
                        actor: caster,
                        spell: viewer.spell,
                        using_scroll: viewer.use_scroll,
                        target: None,
                    });
                }
                if ui.button("Click").clicked() {
                    clicks.send(TargetClick { actor: caster });
                }
                if ui.button("Cancel").clicked() {
                    cancels.send(CancelCastRequest { actor: caster });
                }
            });

            ui.horizontal(|ui| {
                if ui.button("Turn left").clicked() {
                    let facing = Quat::from_rotation_y(FRAC_PI_8) * actor.facing;
                    sandbox.face(caster, facing);
                }
                if ui.button("Turn right").clicked() {
                    let facing = Quat::from_rotation_y(-FRAC_PI_8) * actor.facing;
                    sandbox.face(caster, facing);
                }
                if ui.button("Step").clicked() {
                    sandbox.move_actor(caster, actor.position + actor.facing);
                }
            });

            if let Some(state) = casting.casting_state(caster) {
                ui.label(
                    egui::RichText::new(format!("{} ({:?})", state.spell.name, state.phase))
                        .size(fonts::BODY)
                        .color(colors::CHANNEL),
                );
            }

            ui.separator();
            ui.label(egui::RichText::new("Others").size(fonts::HEADER).color(colors::HEADER));
            for &other in &viewer.others {
                let Some(entity) = sandbox.actor(other) else { continue };
                let summary = format!("{} {:.0}/{:.0}", entity.name, entity.health, entity.max_health);
                let point = entity.position;
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(summary).size(fonts::BODY));
                    if ui.small_button("Face").clicked() {
                        sandbox.face_toward(caster, point);
                    }
                    if ui.small_button("Evaluate").clicked() {
                        targeting.send(StartTargetingRequest {
                            actor: caster,
                            action: TargetAction::Evaluate,
                        });
                        picks.send(EntityTargetPicked { actor: caster, target: other });
                    }
                });
            }
        });
}

/// Overlays and the latest notice for the controlled actor, bottom center.
pub fn render_overlays(mut contexts: EguiContexts, viewer: Res<ViewerState>, sandbox: Res<Sandbox>) {
    let Some(ctx) = contexts.try_ctx_mut() else { return; };

    egui::Area::new(egui::Id::new("cast_overlays"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -40.0))
        .show(ctx, |ui| {
            for (_, record) in sandbox.overlays_for(viewer.caster) {
                let color = match record.view.style {
                    OverlayStyle::Channeling => colors::CHANNEL,
                    OverlayStyle::TargetSelect => colors::TARGET,
                };
                ui.add(
                    egui::ProgressBar::new(record.view.progress)
                        .desired_width(300.0)
                        .fill(color)
                        .text(&record.view.label),
                );
            }
            if let Some(notice) = sandbox.last_notice(viewer.caster) {
                ui.label(egui::RichText::new(notice.key()).size(fonts::BODY).color(colors::MUTED));
            }
        });
}

fn resource_bar(ui: &mut egui::Ui, label: &str, value: f32, max: f32, color: egui::Color32) {
    let fraction = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    ui.add(
        egui::ProgressBar::new(fraction)
            .fill(color)
            .text(format!("{} {:.0}/{:.0}", label, value, max)),
    );
}

fn health_color(actor: &Actor) -> egui::Color32 {
    if actor.health < actor.max_health * 0.3 {
        colors::HEALTH_LOW
    } else {
        colors::HEALTH
    }
}

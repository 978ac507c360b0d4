//! circlecast - spell-casting engine sandbox
//!
//! Without arguments opens the viewer over a demo scene. With `--headless`
//! runs a JSON scenario to completion and prints the outcome.

use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use circlecast::cli::parse_args;
use circlecast::headless::{run_headless_scenario, HeadlessOptions};
use circlecast::magic::{MagicPlugin, SpellCatalogPlugin};
use circlecast::sandbox::{Sandbox, SandboxPlugin};
use circlecast::settings::SettingsPlugin;
use circlecast::ui::UiPlugin;

fn main() {
    let args = parse_args();

    if let Some(scenario) = args.headless {
        let options = HeadlessOptions {
            catalog: args.catalog,
            seed: args.seed,
            output: args.output,
        };
        if let Err(e) = run_headless_scenario(&scenario, &options) {
            eprintln!("Headless scenario failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "circlecast".to_string(),
                resolution: (1280.0, 720.0).into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        // Settings and catalog must be in place before the engine reads them
        .add_plugins((SettingsPlugin::default(), SpellCatalogPlugin { path: args.catalog }))
        .add_plugins((
            EguiPlugin,
            MagicPlugin::<Sandbox>::default(),
            SandboxPlugin,
            UiPlugin,
        ))
        .run();
}

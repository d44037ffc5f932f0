//! Application entry point: composes the Bevy runtime, core plugins, and window configuration.
//!
//! The game is a tile-based side-scroller: levels come from LDtk projects listed in
//! `assets/levels.json` (or `--catalog <path>`), the player walks and jumps across the `Platforms`
//! layer, and touching collectibles adds them to an on-screen inventory. This file wires the
//! engine together and defers to the `PlatformerPlugin` defined in `app.rs`.

mod animation;
mod app;
mod camera;
mod collision;
mod config;
mod error;
mod inventory;
mod items;
mod level;
mod movement;
mod physics;
mod player;
mod session;
mod state;
mod transition;
mod ui;

#[cfg(target_arch = "wasm32")]
mod wasm;

use app::PlatformerPlugin;
use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::render::texture::ImagePlugin;
use bevy::window::{Window, WindowResizeConstraints, WindowResolution};
use clap::Parser;
use config::{CatalogPath, DEFAULT_CATALOG_PATH};

#[derive(Parser, Debug)]
#[command(name = "tile_platformer")]
#[command(about = "Tile-based platformer driven by a JSON level catalog")]
struct Cli {
    /// Level catalog to read at startup.
    #[arg(long, default_value = DEFAULT_CATALOG_PATH)]
    catalog: String,
}

fn main() {
    let cli = Cli::parse();

    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    wasm::set_panic_hook();

    // 800x640 logical pixels with the camera at scale 1, so one map pixel is one screen pixel and
    // the soft-edge border is measured in real tiles. Resizing only widens the view.
    let primary_window = Window {
        title: "Tile Platformer".to_string(),
        resolution: WindowResolution::new(800.0, 640.0),
        resizable: true,
        resize_constraints: WindowResizeConstraints {
            min_width: 400.0,
            min_height: 320.0,
            max_width: f32::INFINITY,
            max_height: f32::INFINITY,
        },
        canvas: cfg!(all(target_arch = "wasm32", feature = "web"))
            .then(|| "#bevy-canvas".to_owned()),
        ..default()
    };

    // `DefaultPlugins` spins up rendering, input, logging, etc. We override pieces that matter for
    // this project: nearest-neighbor sampling for crisp pixels, and asset settings for desktop vs
    // web.
    let mut default_plugins = DefaultPlugins
        .set(WindowPlugin {
            primary_window: Some(primary_window),
            ..default()
        })
        .set(ImagePlugin::default_nearest());

    #[cfg(not(target_arch = "wasm32"))]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(true),
            ..default()
        });
    }

    #[cfg(target_arch = "wasm32")]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(false),
            ..default()
        });
    }

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.55, 0.75, 0.95)))
        .insert_resource(CatalogPath(cli.catalog))
        .add_plugins(default_plugins)
        .add_plugins(PlatformerPlugin)
        .run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_defaults_to_shipped_file() {
        let cli = Cli::try_parse_from(["tile_platformer"]).unwrap();
        assert_eq!(cli.catalog, DEFAULT_CATALOG_PATH);
    }

    #[test]
    fn catalog_flag_overrides_path() {
        let cli = Cli::try_parse_from(["tile_platformer", "--catalog", "mods/levels.json"]).unwrap();
        assert_eq!(cli.catalog, "mods/levels.json");
    }
}

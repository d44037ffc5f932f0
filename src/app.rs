//! High-level plugin composition.
//!
//! The `PlatformerPlugin` glues together all domain-specific plugins
//! (levels, player, items, physics, camera, etc.) and sets up system ordering.
//! Each subsystem is responsible for its own state; this orchestrator merely
//! registers them with the Bevy application.

use bevy::prelude::*;

use crate::animation::AnimationPlugin;
use crate::camera::CameraPlugin;
use crate::collision::CollisionPlugin;
use crate::items::ItemsPlugin;
use crate::level::LevelPlugin;
use crate::movement::MovementPlugin;
use crate::physics::PhysicsPlugin;
use crate::player::PlayerPlugin;
use crate::state::{toggle_pause, GameSet, GameState};
use crate::transition::TransitionPlugin;
use crate::ui::UiPlugin;

/// Bundles every gameplay-centric plugin into a single unit that can be added
/// to the Bevy `App`.
pub struct PlatformerPlugin;

impl Plugin for PlatformerPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>() // Allocates the state machine in the ECS world.
            .add_plugins((
                LevelPlugin,      // Catalog, preloading, LDtk plumbing, build/teardown.
                PlayerPlugin,     // Player entity spawning.
                ItemsPlugin,      // Collectibles, teleporters, collection handler.
                CollisionPlugin,  // Platform tiles + collision rule table.
                PhysicsPlugin,    // Gravity and tile separation.
                MovementPlugin,   // Keyboard steering.
                AnimationPlugin,  // Sprite sheet playback.
                CameraPlugin,     // Soft-edge scrolling.
                TransitionPlugin, // Level change requests and fades.
                UiPlugin,         // Inventory panel + pause overlay.
            ))
            // Systems inside these sets execute sequentially while the game
            // is running. `chain()` enforces Input → Movement → Effects
            // ordering so collection sees this frame's positions.
            .configure_sets(
                Update,
                (GameSet::Input, GameSet::Movement, GameSet::Effects)
                    .chain()
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(Update, toggle_pause); // Hot-swaps GameState based on keyboard input.
    }
}

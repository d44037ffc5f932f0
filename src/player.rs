//! Player entity lifecycle management. Spawns the avatar at the catalog's fixed origin whenever a
//! level is built; the level teardown removes it together with the rest of the level.
//!
//! All memory for components is owned by Bevy's ECS tables; this module merely issues spawn
//! commands and lets Rust drop the components automatically when the entity is removed.

use bevy::prelude::*;

use crate::animation::{AnimationPlayer, PlayerAnimation};
use crate::collision::CollisionGroup;
use crate::config::LevelCatalog;
use crate::level::{build_level, ActiveLevel, LevelScoped, PreloadedAssets};
use crate::movement::Facing;
use crate::physics::{Body, MapPosition, MovementState, Velocity};
use crate::state::GameState;

const PLAYER_Z: f32 = 10.0;

/// Registers the system that creates the player entity when a level is built.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(GameState::Building),
            spawn_player
                .after(build_level)
                .run_if(resource_exists::<ActiveLevel>),
        );
    }
}

/// Marker component used by many systems (camera follow, collection, steering) to identify the
/// player entity.
#[derive(Component)]
pub struct Player;

fn spawn_player(
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    preloaded: Res<PreloadedAssets>,
    level: Res<ActiveLevel>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
) {
    let definition = &catalog.player;
    let Some(texture) = preloaded.image(&definition.sheet) else {
        warn!("Player sheet '{}' was never preloaded", definition.sheet);
        return;
    };

    let layout = layouts.add(TextureAtlasLayout::from_grid(
        UVec2::new(definition.frame_size[0], definition.frame_size[1]),
        definition.columns,
        definition.rows,
        None,
        None,
    ));

    let hitbox = definition.body_offset.hitbox(definition.frame_size());
    let spawn: Vec2 = definition.spawn.into();
    let animation = AnimationPlayer::new(PlayerAnimation::Idle);

    commands.spawn((
        Name::new("Player"),
        Player,
        LevelScoped,
        SpriteBundle {
            texture,
            transform: Transform::from_translation(level.to_world(spawn).extend(PLAYER_Z)),
            ..default()
        },
        TextureAtlas {
            layout,
            index: animation.atlas_index(),
        },
        animation,
        CollisionGroup::Player,
        Body::new(hitbox)
            .with_world_bounds()
            .with_bounce(definition.bounce),
        MapPosition(spawn + hitbox.center_offset),
        Velocity::default(),
        MovementState::default(),
        Facing::default(),
    ));

    debug!("Player spawned at {:?} in level '{}'", spawn, level.id);
}

//! Level sprites: collectibles that go into the inventory, teleporters that send the player to
//! another level, and scenery that is only drawn.

use bevy::prelude::*;

use crate::collision::{CollisionGroup, OverlapEffect, OverlapEvent};
use crate::config::{LevelCatalog, SpriteDefinition, SpriteRole};
use crate::error::AssetLoadError;
use crate::level::{build_level, ActiveLevel, LevelScoped, PreloadedAssets};
use crate::physics::{Body, MapPosition, Velocity};
use crate::player::Player;
use crate::session::LevelSession;
use crate::state::{GameSet, GameState};
use crate::transition::{ChangeLevel, TransitionState};

const SCENERY_Z: f32 = 1.0;
const ITEM_Z: f32 = 5.0;

pub struct ItemsPlugin;

impl Plugin for ItemsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(GameState::Building),
            spawn_level_sprites
                .after(build_level)
                .run_if(resource_exists::<ActiveLevel>),
        )
        .add_systems(
            Update,
            (collect_items, enter_teleporters)
                .in_set(GameSet::Effects)
                .run_if(in_state(GameState::Running)),
        );
    }
}

#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Collectible {
    /// Inventory key.
    pub name: String,
}

#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Teleporter {
    pub target: String,
}

/// Decoration drawn with the level. Never moves and never collides.
#[derive(Component, Debug, Clone, Copy)]
pub struct Scenery;

/// Frame size of a sprite: the explicit override, or the preloaded image's pixel size.
fn frame_size(
    definition: &SpriteDefinition,
    preloaded: &PreloadedAssets,
    images: &Assets<Image>,
) -> Result<Vec2, AssetLoadError> {
    if let Some(size) = definition.size {
        return Ok(Vec2::from(size));
    }
    preloaded
        .image(&definition.image)
        .and_then(|handle| images.get(&handle))
        .map(Image::size_f32)
        .ok_or_else(|| AssetLoadError::new(&definition.image, "image is not loaded"))
}

/// Spawns every sprite instance of the active level. A sprite whose frame size cannot be resolved
/// aborts the build.
pub fn spawn_level_sprites(
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    preloaded: Res<PreloadedAssets>,
    images: Res<Assets<Image>>,
    level: Res<ActiveLevel>,
    mut exit: EventWriter<AppExit>,
) {
    let Ok(definition) = catalog.level(&level.id) else {
        return;
    };

    let mut spawned = 0;
    for (name, sprite) in &definition.sprites {
        let texture = preloaded.image(&sprite.image).unwrap_or_default();
        let role = sprite.role();

        if role == SpriteRole::Scenery {
            for instance in &sprite.instances {
                let at: Vec2 = (*instance).into();
                commands.spawn((
                    Name::new(name.clone()),
                    LevelScoped,
                    Scenery,
                    SpriteBundle {
                        texture: texture.clone(),
                        sprite: Sprite {
                            custom_size: sprite.size.map(Vec2::from),
                            ..default()
                        },
                        transform: Transform::from_translation(
                            level.to_world(at).extend(SCENERY_Z),
                        ),
                        ..default()
                    },
                ));
                spawned += 1;
            }
            continue;
        }

        let size = match frame_size(sprite, &preloaded, &images) {
            Ok(size) => size,
            Err(err) => {
                error!("Cannot build level '{}': sprite '{name}': {err}", level.id);
                exit.send(AppExit::error());
                return;
            }
        };
        let hitbox = sprite.body_offset.hitbox(size);

        for instance in &sprite.instances {
            let at: Vec2 = (*instance).into();
            let mut entity = commands.spawn((
                Name::new(name.clone()),
                LevelScoped,
                SpriteBundle {
                    texture: texture.clone(),
                    sprite: Sprite {
                        custom_size: sprite.size.map(Vec2::from),
                        ..default()
                    },
                    transform: Transform::from_translation(level.to_world(at).extend(ITEM_Z)),
                    ..default()
                },
                Body::new(hitbox).with_bounce(sprite.bounce),
                MapPosition(at + hitbox.center_offset),
                Velocity::default(),
            ));

            match role {
                SpriteRole::Teleporter { target } => entity.insert((
                    CollisionGroup::Teleporters,
                    Teleporter {
                        target: target.to_owned(),
                    },
                )),
                _ => entity.insert((
                    CollisionGroup::Collectibles,
                    Collectible { name: name.clone() },
                )),
            };
            spawned += 1;
        }
    }

    info!("Spawned {spawned} sprites for level '{}'", level.id);
}

/// Moves a touched collectible into the inventory. The item is disabled and hidden rather than
/// despawned, and a disabled item is never collected again.
pub fn collect_items(
    mut overlaps: EventReader<OverlapEvent>,
    mut session: ResMut<LevelSession>,
    mut items: Query<(&Collectible, &mut Body, &mut Visibility)>,
    mut players: Query<&mut Velocity, With<Player>>,
) {
    for overlap in overlaps.read() {
        if overlap.effect != OverlapEffect::Collect {
            continue;
        }
        let Ok((item, mut body, mut visibility)) = items.get_mut(overlap.b) else {
            continue;
        };
        if !body.enabled {
            continue;
        }

        if let Ok(mut velocity) = players.get_mut(overlap.a) {
            velocity.0 = Vec2::ZERO;
        }
        body.enabled = false;
        *visibility = Visibility::Hidden;

        let count = session.inventory.collect(&item.name);
        debug!("Collected '{}' ({count} total)", item.name);
    }
}

/// Touching a teleporter asks for a level change. The teleporter switches off so it fires once.
fn enter_teleporters(
    mut overlaps: EventReader<OverlapEvent>,
    transition: Res<TransitionState>,
    mut teleporters: Query<(&Teleporter, &mut Body)>,
    mut requests: EventWriter<ChangeLevel>,
) {
    for overlap in overlaps.read() {
        if overlap.effect != OverlapEffect::Teleport || transition.is_transitioning {
            continue;
        }
        let Ok((teleporter, mut body)) = teleporters.get_mut(overlap.b) else {
            continue;
        };
        if !body.enabled {
            continue;
        }

        body.enabled = false;
        info!("Teleporter leads to '{}'", teleporter.target);
        requests.send(ChangeLevel(teleporter.target.clone()));
    }
}

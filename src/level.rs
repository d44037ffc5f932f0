//! Level orchestration: preloads every level's assets, builds the selected level from them, and
//! tears it down again when the player moves on.
//!
//! All persistent data is stored in Bevy resources (`LevelCatalog`, `PreloadedAssets`,
//! `ActiveLevel`). Rust's ownership system ensures these allocations are freed when the app
//! terminates; during runtime, they are shared immutably or mutably through the ECS borrow rules.

use std::collections::HashMap;

use bevy::asset::{LoadState, UntypedHandle};
use bevy::prelude::*;
use bevy::sprite::Anchor;
use bevy_ecs_ldtk::ldtk::Level;
use bevy_ecs_ldtk::prelude::*;

use crate::collision::{CollisionMap, CollisionTable};
use crate::config::{AssetKind, CatalogPath, DeclaredAsset, LevelCatalog, LevelDefinition};
use crate::error::{AssetLoadError, ConfigurationError};
use crate::session::LevelSession;
use crate::state::GameState;

const BACKGROUND_Z: f32 = -10.0;

/// Registers asset preloading, LDtk plumbing, and the build/teardown steps of the lifecycle.
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CatalogPath>()
            .insert_resource(LevelSelection::index(0))
            .insert_resource(LdtkSettings {
                level_spawn_behavior: LevelSpawnBehavior::UseZeroTranslation,
                set_clear_color: SetClearColor::FromLevelBackground,
                ..default()
            })
            .add_plugins(LdtkPlugin)
            .add_systems(OnEnter(GameState::Preloading), start_preloading)
            .add_systems(
                Update,
                monitor_preloading
                    .run_if(in_state(GameState::Preloading))
                    .run_if(resource_exists::<PreloadedAssets>),
            )
            .add_systems(OnEnter(GameState::Building), build_level)
            .add_systems(OnEnter(GameState::Restarting), teardown_level);
    }
}

/// The level currently in play. Present from `Building` until the next teardown.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ActiveLevel {
    pub id: String,
    /// Identifier of the LDtk level inside the map project.
    pub map_level: String,
    /// Level size in pixels.
    pub size: Vec2,
    pub tile_size: f32,
}

impl ActiveLevel {
    /// Map space (top-left origin, y down) to world space (bottom-left origin, y up).
    pub fn to_world(&self, map: Vec2) -> Vec2 {
        Vec2::new(map.x, self.size.y - map.y)
    }
}

/// Everything spawned for a level. Teardown despawns all of it.
#[derive(Component)]
pub struct LevelScoped;

/// Handles to every declared asset, kept alive for the whole run so level changes never refetch.
#[derive(Resource, Default)]
pub struct PreloadedAssets {
    images: HashMap<String, Handle<Image>>,
    maps: HashMap<String, Handle<LdtkProject>>,
    pending: Vec<(DeclaredAsset, UntypedHandle)>,
}

impl PreloadedAssets {
    fn queue(&mut self, asset_server: &AssetServer, asset: DeclaredAsset) {
        let handle = match asset.kind {
            AssetKind::Image => {
                let handle: Handle<Image> = asset_server.load(asset.path.clone());
                self.images.insert(asset.path.clone(), handle.clone());
                handle.untyped()
            }
            AssetKind::Map => {
                let handle: Handle<LdtkProject> = asset_server.load(asset.path.clone());
                self.maps.insert(asset.path.clone(), handle.clone());
                handle.untyped()
            }
        };
        self.pending.push((asset, handle));
    }

    pub fn image(&self, path: &str) -> Option<Handle<Image>> {
        self.images.get(path).cloned()
    }

    pub fn map(&self, path: &str) -> Option<Handle<LdtkProject>> {
        self.maps.get(path).cloned()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_catalog(path: &CatalogPath) -> Result<LevelCatalog, ConfigurationError> {
    LevelCatalog::load(&path.0)
}

#[cfg(target_arch = "wasm32")]
fn read_catalog(_path: &CatalogPath) -> Result<LevelCatalog, ConfigurationError> {
    LevelCatalog::from_json(crate::wasm::EMBEDDED_CATALOG)
}

fn start_preloading(
    mut commands: Commands,
    path: Res<CatalogPath>,
    asset_server: Res<AssetServer>,
    mut exit: EventWriter<AppExit>,
) {
    let catalog = match read_catalog(&path) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("Cannot start without a level catalog ({}): {err}", path.0);
            exit.send(AppExit::error());
            return;
        }
    };

    let mut preloaded = PreloadedAssets::default();
    for asset in catalog.asset_paths() {
        debug!(
            "Preloading {:?} '{}' for {}",
            asset.kind,
            asset.path,
            asset.level.as_deref().unwrap_or("every level")
        );
        preloaded.queue(&asset_server, asset);
    }

    info!(
        "Loaded catalog with {} levels; preloading {} assets",
        catalog.levels.len(),
        preloaded.pending()
    );

    commands.insert_resource(catalog.physics.clone());
    commands.insert_resource(catalog.camera.clone());
    commands.insert_resource(preloaded);
    commands.insert_resource(catalog);
}

fn monitor_preloading(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    catalog: Res<LevelCatalog>,
    mut preloaded: ResMut<PreloadedAssets>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: EventWriter<AppExit>,
) {
    let mut failure = None;
    preloaded.pending.retain(|(asset, handle)| {
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
            failure.get_or_insert_with(|| AssetLoadError::new(&asset.path, err.to_string()));
            return true;
        }
        !asset_server.is_loaded_with_dependencies(handle.id())
    });

    if let Some(err) = failure {
        error!("{err}");
        exit.send(AppExit::error());
        return;
    }

    if !preloaded.pending.is_empty() {
        return;
    }

    let session = LevelSession::from_catalog(&catalog);
    info!(
        "All level assets loaded; starting at '{}' (inventory policy: {:?})",
        session.current_level(),
        session.policy()
    );
    commands.insert_resource(session);
    next_state.set(GameState::Building);
}

/// Looks up the session's level in the catalog and in its preloaded LDtk project.
fn resolve_level(
    catalog: &LevelCatalog,
    preloaded: &PreloadedAssets,
    projects: &Assets<LdtkProject>,
    id: &str,
) -> Result<(ActiveLevel, Handle<LdtkProject>), ConfigurationError> {
    let definition = catalog.level(id)?;
    let handle = preloaded.map(&definition.map).ok_or_else(|| {
        ConfigurationError::Invalid(format!("map '{}' was never preloaded", definition.map))
    })?;
    let project = projects.get(&handle).ok_or_else(|| {
        ConfigurationError::Invalid(format!("map '{}' is not loaded", definition.map))
    })?;

    let level = select_map_level(&project.json_data().levels, definition)?;

    let active = ActiveLevel {
        id: id.to_owned(),
        map_level: level.identifier.clone(),
        size: Vec2::new(level.px_wid as f32, level.px_hei as f32),
        tile_size: definition.tile_size,
    };
    Ok((active, handle))
}

/// The LDtk level named by `map_level`, or the project's first level when none is named.
fn select_map_level<'a>(
    levels: &'a [Level],
    definition: &LevelDefinition,
) -> Result<&'a Level, ConfigurationError> {
    match &definition.map_level {
        Some(identifier) => levels.iter().find(|level| &level.identifier == identifier),
        None => levels.first(),
    }
    .ok_or_else(|| {
        ConfigurationError::Invalid(format!(
            "map '{}' has no level '{}'",
            definition.map,
            definition.map_level.as_deref().unwrap_or("<first>")
        ))
    })
}

/// Spawns the map and background for the session's level and registers its collision relations.
/// Player and sprites are spawned by their own plugins right after this system.
#[allow(clippy::too_many_arguments)]
pub fn build_level(
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    session: Res<LevelSession>,
    preloaded: Res<PreloadedAssets>,
    projects: Res<Assets<LdtkProject>>,
    mut selection: ResMut<LevelSelection>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: EventWriter<AppExit>,
) {
    let id = session.current_level();
    let (active, project) = match resolve_level(&catalog, &preloaded, &projects, id) {
        Ok(resolved) => resolved,
        Err(err) => {
            error!("Cannot build level '{id}': {err}");
            exit.send(AppExit::error());
            return;
        }
    };
    let Ok(definition) = catalog.level(id) else {
        return;
    };

    *selection = LevelSelection::Identifier(active.map_level.clone());

    commands.spawn((
        LevelScoped,
        Name::new("LevelRoot"),
        LdtkWorldBundle {
            ldtk_handle: project,
            ..default()
        },
    ));

    if let Some(texture) = preloaded.image(&definition.background) {
        let scale = definition.background_scale.map_or(Vec2::ONE, Vec2::from);
        commands.spawn((
            Name::new("Background"),
            LevelScoped,
            SpriteBundle {
                texture,
                sprite: Sprite {
                    anchor: Anchor::TopLeft,
                    ..default()
                },
                transform: Transform::from_translation(
                    active.to_world(Vec2::ZERO).extend(BACKGROUND_Z),
                )
                .with_scale(scale.extend(1.0)),
                ..default()
            },
        ));
    }

    info!(
        "Built level '{}' from '{}' ({}x{} px)",
        active.id, definition.map, active.size.x, active.size.y
    );

    commands.insert_resource(CollisionTable::platformer());
    commands.insert_resource(active);
    next_state.set(GameState::Running);
}

/// Despawns everything the previous build created and sends the lifecycle back to `Building`.
pub fn teardown_level(
    mut commands: Commands,
    scoped: Query<Entity, With<LevelScoped>>,
    mut map: ResMut<CollisionMap>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let mut despawned = 0;
    for entity in &scoped {
        commands.entity(entity).despawn_recursive();
        despawned += 1;
    }
    map.clear();
    commands.remove_resource::<ActiveLevel>();

    debug!("Tore down {despawned} level entities");
    next_state.set(GameState::Building);
}

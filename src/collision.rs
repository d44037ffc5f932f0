//! Collision data for the active level.
//!
//! Two pieces live here: the `CollisionMap` of solid platform tiles, rebuilt from the LDtk
//! `Platforms` IntGrid layer whenever a level spawns, and the `CollisionTable`, a declarative list
//! of which body groups block or overlap each other. The physics step and the overlap detector
//! both consult the table instead of wiring handlers per pair.

use std::collections::HashSet;

use bevy::math::IVec2;
use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;

use crate::level::ActiveLevel;
use crate::physics::{apply_kinematics, Body, MapPosition};
use crate::state::{GameSet, GameState};

/// IntGrid layer whose non-zero cells are solid ground.
pub const PLATFORM_LAYER: &str = "Platforms";

pub struct CollisionPlugin;

impl Plugin for CollisionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionMap>()
            .add_event::<OverlapEvent>()
            .add_systems(PostUpdate, rebuild_collision_map)
            .add_systems(
                Update,
                detect_overlaps
                    .in_set(GameSet::Movement)
                    .after(apply_kinematics)
                    .run_if(in_state(GameState::Running))
                    .run_if(resource_exists::<ActiveLevel>),
            );
    }
}

/// Solid tiles in map space: column grows right, row grows down, `(0, 0)` is the top-left tile.
#[derive(Resource, Default)]
pub struct CollisionMap {
    pub tile_size: Vec2,
    pub solids: HashSet<IVec2>,
    /// Set once the current level's platform layer has been read.
    pub ready: bool,
}

impl CollisionMap {
    pub fn from_solids(tile_size: f32, solids: impl IntoIterator<Item = IVec2>) -> Self {
        Self {
            tile_size: Vec2::splat(tile_size),
            solids: solids.into_iter().collect(),
            ready: true,
        }
    }

    pub fn clear(&mut self) {
        self.solids.clear();
        self.ready = false;
    }

    pub fn is_solid(&self, tile: IVec2) -> bool {
        self.solids.contains(&tile)
    }

    pub fn column(&self, x: f32) -> i32 {
        (x / self.tile_size.x).floor() as i32
    }

    pub fn row(&self, y: f32) -> i32 {
        (y / self.tile_size.y).floor() as i32
    }
}

/// Run condition: physics waits until the platform layer of the active level is known.
pub fn collision_map_ready(map: Res<CollisionMap>) -> bool {
    map.ready
}

fn rebuild_collision_map(
    mut events: EventReader<LevelEvent>,
    int_cells: Query<(&GridCoords, &IntGridCell, &Parent)>,
    layers: Query<&LayerMetadata>,
    mut map: ResMut<CollisionMap>,
) {
    let mut needs_rebuild = false;

    for event in events.read() {
        match event {
            LevelEvent::Spawned(_) => needs_rebuild = true,
            LevelEvent::Despawned(_) => map.clear(),
            _ => {}
        }
    }

    if !needs_rebuild {
        return;
    }

    map.solids.clear();

    for (coords, cell, parent) in &int_cells {
        if cell.value <= 0 {
            continue;
        }
        let Ok(layer) = layers.get(parent.get()) else {
            continue;
        };
        if layer.identifier != PLATFORM_LAYER {
            continue;
        }

        // LDtk grid coordinates count rows from the bottom; map space counts from the top.
        map.tile_size = Vec2::splat(layer.grid_size as f32);
        map.solids
            .insert(IVec2::new(coords.x, layer.c_hei - 1 - coords.y));
    }

    map.ready = true;

    if map.solids.is_empty() {
        warn!(
            "Collision map is empty. Ensure the LDtk IntGrid layer '{}' marks solid tiles with a non-zero value.",
            PLATFORM_LAYER
        );
    } else {
        info!("Collision map rebuilt with {} solid tiles", map.solids.len());
    }
}

/// Which collision group a body belongs to. `Platforms` is the static tile layer.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionGroup {
    Player,
    Platforms,
    Collectibles,
    Teleporters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapEffect {
    Collect,
    Teleport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Bodies are separated; neither passes through the other.
    Block,
    /// Bodies pass through each other and the effect fires.
    Overlap(OverlapEffect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionRule {
    pub a: CollisionGroup,
    pub b: CollisionGroup,
    pub response: Response,
}

/// Registered once per level build and dispatched by the physics step and overlap detector.
#[derive(Resource, Debug, Clone, Default)]
pub struct CollisionTable {
    rules: Vec<CollisionRule>,
}

impl CollisionTable {
    /// The relations every level uses.
    pub fn platformer() -> Self {
        use CollisionGroup::*;

        Self::default()
            .with(Player, Platforms, Response::Block)
            .with(Collectibles, Platforms, Response::Block)
            .with(Teleporters, Platforms, Response::Block)
            .with(Player, Collectibles, Response::Overlap(OverlapEffect::Collect))
            .with(Player, Teleporters, Response::Overlap(OverlapEffect::Teleport))
    }

    pub fn with(mut self, a: CollisionGroup, b: CollisionGroup, response: Response) -> Self {
        self.rules.push(CollisionRule { a, b, response });
        self
    }

    /// Blocking is symmetric: the order the pair was registered in does not matter.
    pub fn blocks(&self, first: CollisionGroup, second: CollisionGroup) -> bool {
        self.rules.iter().any(|rule| {
            rule.response == Response::Block
                && ((rule.a == first && rule.b == second) || (rule.a == second && rule.b == first))
        })
    }

    pub fn overlap_rules(&self) -> impl Iterator<Item = (CollisionGroup, CollisionGroup, OverlapEffect)> + '_ {
        self.rules.iter().filter_map(|rule| match rule.response {
            Response::Overlap(effect) => Some((rule.a, rule.b, effect)),
            Response::Block => None,
        })
    }
}

/// Two bodies from an overlap rule intersect this step. `a` belongs to the rule's first group.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    pub effect: OverlapEffect,
    pub a: Entity,
    pub b: Entity,
}

/// Emits one `OverlapEvent` per intersecting pair per overlap rule. Disabled bodies never overlap.
pub fn detect_overlaps(
    table: Res<CollisionTable>,
    bodies: Query<(Entity, &CollisionGroup, &MapPosition, &Body)>,
    mut overlaps: EventWriter<OverlapEvent>,
) {
    for (group_a, group_b, effect) in table.overlap_rules() {
        for (a, first_group, first_position, first_body) in &bodies {
            if *first_group != group_a || !first_body.enabled {
                continue;
            }
            for (b, second_group, second_position, second_body) in &bodies {
                if a == b || *second_group != group_b || !second_body.enabled {
                    continue;
                }
                if first_body.overlaps(first_position.0, second_body, second_position.0) {
                    overlaps.send(OverlapEvent { effect, a, b });
                }
            }
        }
    }
}

//! Arcade-style kinematics: gravity, integration, and separation against the platform tiles.
//!
//! Everything here works in map space (y grows downward). Only `sync_sprite_transforms` touches
//! Bevy transforms, converting positions into world space once per frame.

use bevy::math::IVec2;
use bevy::prelude::*;
use serde::Deserialize;

use crate::collision::{collision_map_ready, CollisionGroup, CollisionMap, CollisionTable};
use crate::config::Hitbox;
use crate::level::ActiveLevel;
use crate::state::{GameSet, GameState};

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PhysicsSettings>()
            .add_systems(
                Update,
                apply_kinematics
                    .in_set(GameSet::Movement)
                    .run_if(in_state(GameState::Running))
                    .run_if(resource_exists::<ActiveLevel>)
                    .run_if(collision_map_ready),
            )
            .add_systems(
                Update,
                sync_sprite_transforms
                    .after(GameSet::Effects)
                    .run_if(resource_exists::<ActiveLevel>),
            );
    }
}

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Downward acceleration in pixels per second squared.
    pub gravity: f32,
    /// Fastest fall speed in pixels per second.
    pub terminal_velocity: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: 500.0,
            terminal_velocity: 1800.0,
        }
    }
}

/// Hitbox centre in map space.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Deref, DerefMut)]
pub struct MapPosition(pub Vec2);

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Deref, DerefMut)]
pub struct Velocity(pub Vec2);

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub half_extents: Vec2,
    /// Hitbox centre relative to the sprite centre.
    pub center_offset: Vec2,
    /// Disabled bodies neither move nor overlap anything.
    pub enabled: bool,
    pub collide_world_bounds: bool,
    /// Share of the landing speed kept as upward speed when the body hits the ground.
    pub bounce: f32,
}

impl Body {
    pub fn new(hitbox: Hitbox) -> Self {
        Self {
            half_extents: hitbox.half_extents,
            center_offset: hitbox.center_offset,
            enabled: true,
            collide_world_bounds: false,
            bounce: 0.0,
        }
    }

    pub fn with_bounce(mut self, bounce: f32) -> Self {
        self.bounce = bounce.max(0.0);
        self
    }

    pub fn with_world_bounds(mut self) -> Self {
        self.collide_world_bounds = true;
        self
    }

    pub fn overlaps(&self, position: Vec2, other: &Body, other_position: Vec2) -> bool {
        let distance = (position - other_position).abs();
        let reach = self.half_extents + other.half_extents;
        distance.x < reach.x && distance.y < reach.y
    }
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MovementState {
    pub on_ground: bool,
}

const SKIN: f32 = 0.001;
/// Rebounds slower than this settle instead of hopping forever.
const REST_SPEED: f32 = 10.0;

pub fn apply_kinematics(
    time: Res<Time>,
    settings: Res<PhysicsSettings>,
    table: Res<CollisionTable>,
    map: Res<CollisionMap>,
    level: Res<ActiveLevel>,
    mut bodies: Query<(
        &CollisionGroup,
        &Body,
        &mut MapPosition,
        &mut Velocity,
        Option<&mut MovementState>,
    )>,
) {
    let dt = time.delta_seconds();

    for (group, body, mut position, mut velocity, state) in &mut bodies {
        if !body.enabled {
            continue;
        }

        let solids = table
            .blocks(*group, CollisionGroup::Platforms)
            .then_some(&*map);
        let bounds = body.collide_world_bounds.then_some(level.size);

        let on_ground = step_body(
            &mut position.0,
            &mut velocity.0,
            body,
            dt,
            &settings,
            solids,
            bounds,
        );

        if let Some(mut state) = state {
            state.on_ground = on_ground;
        }
    }
}

/// Advances one body by `dt`. Returns whether it ended the step resting on something.
pub fn step_body(
    position: &mut Vec2,
    velocity: &mut Vec2,
    body: &Body,
    dt: f32,
    settings: &PhysicsSettings,
    solids: Option<&CollisionMap>,
    bounds: Option<Vec2>,
) -> bool {
    let half = body.half_extents;
    velocity.y = (velocity.y + settings.gravity * dt).min(settings.terminal_velocity);

    let mut on_ground = match solids {
        Some(map) => {
            resolve_horizontal(position, &mut velocity.x, half, dt, map);
            resolve_vertical(position, &mut velocity.y, half, body.bounce, dt, map)
        }
        None => {
            *position += *velocity * dt;
            false
        }
    };

    if let Some(size) = bounds {
        on_ground |= clamp_to_bounds(position, velocity, half, body.bounce, size);
    }

    on_ground
}

fn resolve_horizontal(
    position: &mut Vec2,
    velocity: &mut f32,
    half: Vec2,
    dt: f32,
    map: &CollisionMap,
) {
    if velocity.abs() < f32::EPSILON {
        return;
    }

    let new_x = position.x + *velocity * dt;
    let dir = velocity.signum();

    let top_row = map.row(position.y - half.y + SKIN);
    let bottom_row = map.row(position.y + half.y - SKIN);
    let tile_width = map.tile_size.x;

    if dir > 0.0 {
        let column = map.column(new_x + half.x);
        if (top_row..=bottom_row).any(|row| map.is_solid(IVec2::new(column, row))) {
            position.x = column as f32 * tile_width - half.x - SKIN;
            *velocity = 0.0;
            return;
        }
    } else {
        let column = map.column(new_x - half.x);
        if (top_row..=bottom_row).any(|row| map.is_solid(IVec2::new(column, row))) {
            position.x = (column + 1) as f32 * tile_width + half.x + SKIN;
            *velocity = 0.0;
            return;
        }
    }

    position.x = new_x;
}

/// Returns true when the body lands on a tile.
fn resolve_vertical(
    position: &mut Vec2,
    velocity: &mut f32,
    half: Vec2,
    bounce: f32,
    dt: f32,
    map: &CollisionMap,
) -> bool {
    let new_y = position.y + *velocity * dt;
    let dir = velocity.signum();
    let left_column = map.column(position.x - half.x + SKIN);
    let right_column = map.column(position.x + half.x - SKIN);
    let tile_height = map.tile_size.y;

    if dir > 0.0 {
        let row = map.row(new_y + half.y);
        if (left_column..=right_column).any(|column| map.is_solid(IVec2::new(column, row))) {
            position.y = row as f32 * tile_height - half.y - SKIN;
            *velocity = rebound(*velocity, bounce);
            return true;
        }
    } else if dir < 0.0 {
        let row = map.row(new_y - half.y);
        if (left_column..=right_column).any(|column| map.is_solid(IVec2::new(column, row))) {
            position.y = (row + 1) as f32 * tile_height + half.y + SKIN;
            *velocity = 0.0;
            return false;
        }
    }

    position.y = new_y;
    false
}

/// Upward speed after landing at `speed`.
fn rebound(speed: f32, bounce: f32) -> f32 {
    let up = speed * bounce;
    if up < REST_SPEED {
        0.0
    } else {
        -up
    }
}

/// Keeps the body inside the level rectangle. Returns true when it rests on the bottom edge.
fn clamp_to_bounds(
    position: &mut Vec2,
    velocity: &mut Vec2,
    half: Vec2,
    bounce: f32,
    size: Vec2,
) -> bool {
    let min = half;
    let max = (size - half).max(half);

    if position.x < min.x || position.x > max.x {
        position.x = position.x.clamp(min.x, max.x);
        velocity.x = 0.0;
    }

    if position.y < min.y {
        position.y = min.y;
        velocity.y = velocity.y.max(0.0);
    } else if position.y >= max.y {
        position.y = max.y;
        velocity.y = if velocity.y > 0.0 {
            rebound(velocity.y, bounce)
        } else {
            velocity.y
        };
        return true;
    }

    false
}

/// Places each sprite so its hitbox lands on `MapPosition`, converting map space to world space.
fn sync_sprite_transforms(
    level: Res<ActiveLevel>,
    mut query: Query<(&MapPosition, &Body, &mut Transform)>,
) {
    for (position, body, mut transform) in &mut query {
        let world = level.to_world(position.0 - body.center_offset);
        transform.translation.x = world.x;
        transform.translation.y = world.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn body(half: Vec2) -> Body {
        Body::new(Hitbox {
            half_extents: half,
            center_offset: Vec2::ZERO,
        })
    }

    /// A floor of solid tiles along row 5 (y from 320 to 384 with 64px tiles).
    fn floor_map() -> CollisionMap {
        CollisionMap::from_solids(64.0, (0..20).map(|column| IVec2::new(column, 5)))
    }

    #[test]
    fn gravity_accelerates_downward() {
        let settings = PhysicsSettings::default();
        let mut position = Vec2::new(100.0, 100.0);
        let mut velocity = Vec2::ZERO;

        let on_ground = step_body(
            &mut position,
            &mut velocity,
            &body(Vec2::splat(10.0)),
            DT,
            &settings,
            None,
            None,
        );

        assert!(!on_ground);
        assert!((velocity.y - 500.0 * DT).abs() < 1e-4);
        assert!(position.y > 100.0);
    }

    #[test]
    fn falling_body_lands_on_platform() {
        let settings = PhysicsSettings::default();
        let map = floor_map();
        let half = Vec2::new(20.0, 30.0);
        let mut position = Vec2::new(100.0, 200.0);
        let mut velocity = Vec2::ZERO;

        let mut on_ground = false;
        for _ in 0..240 {
            on_ground = step_body(&mut position, &mut velocity, &body(half), DT, &settings, Some(&map), None);
        }

        assert!(on_ground);
        assert!((position.y + half.y - 320.0).abs() < 0.01);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn resting_body_stays_grounded() {
        let settings = PhysicsSettings::default();
        let map = floor_map();
        let half = Vec2::new(20.0, 30.0);
        let mut position = Vec2::new(100.0, 320.0 - half.y - SKIN);
        let mut velocity = Vec2::ZERO;

        for _ in 0..10 {
            assert!(step_body(&mut position, &mut velocity, &body(half), DT, &settings, Some(&map), None));
        }
    }

    #[test]
    fn jump_leaves_the_ground() {
        let settings = PhysicsSettings::default();
        let map = floor_map();
        let half = Vec2::new(20.0, 30.0);
        let mut position = Vec2::new(100.0, 320.0 - half.y - SKIN);
        let mut velocity = Vec2::new(0.0, -350.0);

        let on_ground = step_body(&mut position, &mut velocity, &body(half), DT, &settings, Some(&map), None);

        assert!(!on_ground);
        assert!(velocity.y < 0.0);
        assert!(position.y < 320.0 - half.y);
    }

    #[test]
    fn bouncy_body_rebounds_from_a_fast_landing() {
        let settings = PhysicsSettings::default();
        let map = floor_map();
        let half = Vec2::new(20.0, 30.0);
        let bouncy = body(half).with_bounce(0.1);
        let mut position = Vec2::new(100.0, 320.0 - half.y - 1.0);
        let mut velocity = Vec2::new(0.0, 300.0);

        let on_ground = step_body(&mut position, &mut velocity, &bouncy, DT, &settings, Some(&map), None);

        assert!(on_ground);
        let landing_speed = 300.0 + 500.0 * DT;
        assert!((velocity.y + landing_speed * 0.1).abs() < 1e-3);
        assert!((position.y + half.y + SKIN - 320.0).abs() < 0.01);
    }

    #[test]
    fn bouncy_body_settles_when_resting() {
        let settings = PhysicsSettings::default();
        let map = floor_map();
        let half = Vec2::new(20.0, 30.0);
        let bouncy = body(half).with_bounce(0.1);
        let mut position = Vec2::new(100.0, 320.0 - half.y - SKIN);
        let mut velocity = Vec2::ZERO;

        for _ in 0..10 {
            assert!(step_body(&mut position, &mut velocity, &bouncy, DT, &settings, Some(&map), None));
            assert_eq!(velocity.y, 0.0);
        }
    }

    #[test]
    fn bounce_applies_at_the_bottom_of_the_level() {
        let settings = PhysicsSettings::default();
        let bouncy = body(Vec2::splat(10.0)).with_bounce(0.5);
        let mut position = Vec2::new(50.0, 89.0);
        let mut velocity = Vec2::new(0.0, 200.0);

        let on_ground = step_body(
            &mut position,
            &mut velocity,
            &bouncy,
            DT,
            &settings,
            None,
            Some(Vec2::new(200.0, 100.0)),
        );

        assert!(on_ground);
        assert_eq!(position.y, 90.0);
        assert!((velocity.y + (200.0 + 500.0 * DT) * 0.5).abs() < 1e-3);
    }

    #[test]
    fn walls_stop_horizontal_motion() {
        let settings = PhysicsSettings {
            gravity: 0.0,
            ..default()
        };
        let map = CollisionMap::from_solids(64.0, [IVec2::new(3, 1)]);
        let half = Vec2::splat(20.0);
        let mut position = Vec2::new(170.0, 96.0);
        let mut velocity = Vec2::new(200.0, 0.0);

        step_body(&mut position, &mut velocity, &body(half), DT, &settings, Some(&map), None);

        assert_eq!(velocity.x, 0.0);
        assert!((position.x + half.x - 192.0).abs() < 0.01);
    }

    #[test]
    fn world_bounds_keep_body_inside_and_grounded() {
        let settings = PhysicsSettings::default();
        let half = Vec2::splat(10.0);
        let size = Vec2::new(200.0, 100.0);
        let mut position = Vec2::new(-50.0, 95.0);
        let mut velocity = Vec2::new(-200.0, 300.0);

        let on_ground = step_body(&mut position, &mut velocity, &body(half), DT, &settings, None, Some(size));

        assert!(on_ground);
        assert_eq!(position, Vec2::new(10.0, 90.0));
        assert_eq!(velocity, Vec2::ZERO);
    }

    #[test]
    fn overlap_requires_intersection_on_both_axes() {
        let hitbox = Hitbox {
            half_extents: Vec2::splat(10.0),
            center_offset: Vec2::ZERO,
        };
        let a = Body::new(hitbox);
        let b = Body::new(hitbox);

        assert!(a.overlaps(Vec2::ZERO, &b, Vec2::new(19.0, 5.0)));
        assert!(!a.overlaps(Vec2::ZERO, &b, Vec2::new(20.0, 0.0)));
        assert!(!a.overlaps(Vec2::ZERO, &b, Vec2::new(5.0, 25.0)));
    }
}

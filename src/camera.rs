//! Soft-edge camera. The view scrolls a fixed step per frame while the player travels inside the
//! border band and stays put once the player is farther than the band from the edge it measures
//! from.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use serde::Deserialize;

use crate::level::{build_level, ActiveLevel};
use crate::physics::{Body, MapPosition, Velocity};
use crate::player::Player;
use crate::state::{GameSet, GameState};

/// Plugin that registers the camera systems. Bevy stores plugins on the heap owned by the app;
/// once the app exits, resources are dropped automatically.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SoftEdgeSettings>()
            .add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Building), reset_scroll.after(build_level))
            .add_systems(
                Update,
                follow_soft_edge
                    .after(GameSet::Movement)
                    .before(GameSet::Effects)
                    .run_if(in_state(GameState::Running))
                    .run_if(resource_exists::<ActiveLevel>)
                    .run_if(has_player_and_camera),
            );
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoftEdgeSettings {
    /// Width of the border band, in tiles.
    pub soft_border_tiles: f32,
    /// Scroll distance per frame while the player is inside the band.
    pub step: f32,
    /// Stop upward scrolling at the top of the level. Off by default: upward scrolling only
    /// checks that the scroll is not already negative, so it can end one step above the level.
    pub clamp_top_edge: bool,
    /// Stop downward scrolling once the view reaches the bottom of the level. Off by default:
    /// downward scrolling has no bound, only the horizontal axis and the top edge are checked.
    pub clamp_bottom_edge: bool,
}

impl Default for SoftEdgeSettings {
    fn default() -> Self {
        Self {
            soft_border_tiles: 10.0,
            step: 5.0,
            clamp_top_edge: false,
            clamp_bottom_edge: false,
        }
    }
}

/// Marker component so the follow system can locate the camera entity without relying on names.
#[derive(Component)]
pub struct FollowCamera;

/// Top-left corner of the view in map space.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Deref, DerefMut)]
pub struct CameraScroll(pub Vec2);

/// Everything the soft-edge policy looks at for one frame, in map space.
#[derive(Debug, Clone, Copy)]
pub struct ScrollFrame {
    pub scroll: Vec2,
    pub player: Vec2,
    pub velocity: Vec2,
    pub viewport: Vec2,
    pub level: Vec2,
    pub tile_size: f32,
}

/// Returns next frame's scroll.
///
/// The band is measured from the view edge the player moves away from: walking right scrolls
/// while the player is less than `soft_border_tiles` from the scroll offset, walking left while
/// the player is that close to the right edge of the view. The vertical axis mirrors this.
pub fn advance_scroll(frame: ScrollFrame, settings: &SoftEdgeSettings) -> Vec2 {
    let border = settings.soft_border_tiles * frame.tile_size;
    let max = (frame.level - frame.viewport).max(Vec2::ZERO);
    let ScrollFrame {
        scroll,
        player,
        velocity,
        viewport,
        ..
    } = frame;
    let from_start = player - scroll;
    let from_end = scroll + viewport - player;
    let mut next = scroll;

    if velocity.x > 0.0 && from_start.x < border {
        next.x = (scroll.x + settings.step).min(max.x);
    } else if velocity.x < 0.0 && from_end.x < border {
        next.x = (scroll.x - settings.step).max(0.0);
    }

    if velocity.y > 0.0 && from_start.y < border {
        next.y = scroll.y + settings.step;
        if settings.clamp_bottom_edge {
            next.y = next.y.min(max.y);
        }
    } else if velocity.y < 0.0 && from_end.y < border {
        if settings.clamp_top_edge {
            next.y = (scroll.y - settings.step).max(0.0);
        } else if scroll.y >= 0.0 {
            next.y = scroll.y - settings.step;
        }
    }

    next
}

/// Spawns the 2D camera tagged with `FollowCamera` so the follow system can locate it.
fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("MainCamera"),
        Camera2dBundle::default(),
        FollowCamera,
        CameraScroll::default(),
    ));
}

/// Run condition that only schedules the follow system when both a player and camera exist.
fn has_player_and_camera(
    player_query: Query<Entity, With<Player>>,
    camera_query: Query<Entity, With<FollowCamera>>,
) -> bool {
    !player_query.is_empty() && !camera_query.is_empty()
}

fn viewport_size(window: &Window, projection: &OrthographicProjection) -> Vec2 {
    Vec2::new(window.resolution.width(), window.resolution.height()) * projection.scale
}

/// Writes the camera transform so the view's top-left corner sits at `scroll`.
fn place_camera(transform: &mut Transform, scroll: Vec2, viewport: Vec2, level: &ActiveLevel) {
    let center = level.to_world(scroll + viewport * 0.5);
    transform.translation.x = center.x;
    transform.translation.y = center.y;
}

fn reset_scroll(
    level: Option<Res<ActiveLevel>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut camera_query: Query<
        (&mut Transform, &OrthographicProjection, &mut CameraScroll),
        With<FollowCamera>,
    >,
) {
    let Some(level) = level else {
        return;
    };
    let Ok((mut transform, projection, mut scroll)) = camera_query.get_single_mut() else {
        return;
    };

    scroll.0 = Vec2::ZERO;
    if let Ok(window) = window_query.get_single() {
        place_camera(&mut transform, scroll.0, viewport_size(window, projection), &level);
    }
}

fn follow_soft_edge(
    settings: Res<SoftEdgeSettings>,
    level: Res<ActiveLevel>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    player_query: Query<(&MapPosition, &Body, &Velocity), With<Player>>,
    mut camera_query: Query<
        (&mut Transform, &OrthographicProjection, &mut CameraScroll),
        With<FollowCamera>,
    >,
) {
    let Ok((position, body, velocity)) = player_query.get_single() else {
        return;
    };
    let Ok((mut transform, projection, mut scroll)) = camera_query.get_single_mut() else {
        return;
    };
    let Ok(window) = window_query.get_single() else {
        return;
    };

    let viewport = viewport_size(window, projection);
    scroll.0 = advance_scroll(
        ScrollFrame {
            scroll: scroll.0,
            player: position.0 - body.center_offset,
            velocity: velocity.0,
            viewport,
            level: level.size,
            tile_size: level.tile_size,
        },
        &settings,
    );
    place_camera(&mut transform, scroll.0, viewport, &level);
}

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;

use crate::animation::{AnimationPlayer, PlayerAnimation};
use crate::physics::{MovementState, Velocity};
use crate::player::Player;
use crate::state::{GameSet, GameState};

pub const WALK_SPEED: f32 = 200.0;
pub const JUMP_VELOCITY: f32 = -350.0;

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            steer_player
                .in_set(GameSet::Input)
                .run_if(in_state(GameState::Running)),
        );
    }
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// Moving sets the facing; standing still keeps the last one.
    pub fn from_velocity(vx: f32, previous: Facing) -> Facing {
        if vx > 0.0 {
            Facing::Right
        } else if vx < 0.0 {
            Facing::Left
        } else {
            previous
        }
    }
}

/// Keys held this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl Controls {
    pub fn from_keyboard(keyboard: &ButtonInput<KeyCode>) -> Self {
        Self {
            left: keyboard.any_pressed([KeyCode::ArrowLeft, KeyCode::KeyA]),
            right: keyboard.any_pressed([KeyCode::ArrowRight, KeyCode::KeyD]),
            jump: keyboard.any_pressed([KeyCode::Space, KeyCode::ArrowUp]),
        }
    }
}

/// Applies one frame of control to `velocity` and returns the animation to play, if any.
///
/// Left wins over right. Jumping is checked after horizontal movement, so a grounded jump
/// replaces the walk/idle animation requested earlier in the same frame.
pub fn steer(controls: Controls, grounded: bool, velocity: &mut Vec2) -> Option<PlayerAnimation> {
    let mut animation = None;

    if controls.left {
        velocity.x = -WALK_SPEED;
        if grounded {
            animation = Some(PlayerAnimation::Walk);
        }
    } else if controls.right {
        velocity.x = WALK_SPEED;
        if grounded {
            animation = Some(PlayerAnimation::Walk);
        }
    } else {
        velocity.x = 0.0;
        if grounded {
            animation = Some(PlayerAnimation::Idle);
        }
    }

    if controls.jump && grounded {
        velocity.y = JUMP_VELOCITY;
        animation = Some(PlayerAnimation::Jump);
    }

    animation
}

fn steer_player(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut query: Query<
        (
            &mut Velocity,
            &MovementState,
            &mut Facing,
            &mut AnimationPlayer,
        ),
        With<Player>,
    >,
) {
    let controls = Controls::from_keyboard(&keyboard);

    for (mut velocity, state, mut facing, mut animation) in &mut query {
        if let Some(requested) = steer(controls, state.on_ground, &mut velocity.0) {
            animation.play(requested);
        }
        *facing = Facing::from_velocity(velocity.x, *facing);
    }
}

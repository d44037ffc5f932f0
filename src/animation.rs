//! Frame animation for the player sheet.

use std::time::Duration;

use bevy::prelude::*;

use crate::movement::Facing;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, animate_sprites);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAnimation {
    Idle,
    Walk,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClip {
    /// Atlas indices in playback order.
    pub frames: &'static [usize],
    pub fps: f32,
    pub looping: bool,
}

impl PlayerAnimation {
    pub fn clip(self) -> AnimationClip {
        match self {
            Self::Idle => AnimationClip {
                frames: &[0],
                fps: 10.0,
                looping: false,
            },
            Self::Jump => AnimationClip {
                frames: &[1],
                fps: 10.0,
                looping: false,
            },
            Self::Walk => AnimationClip {
                frames: &[2, 3],
                fps: 10.0,
                looping: true,
            },
        }
    }
}

#[derive(Component, Debug)]
pub struct AnimationPlayer {
    current: PlayerAnimation,
    frame: usize,
    timer: Timer,
}

impl AnimationPlayer {
    pub fn new(animation: PlayerAnimation) -> Self {
        Self {
            current: animation,
            frame: 0,
            timer: Self::timer_for(animation),
        }
    }

    fn timer_for(animation: PlayerAnimation) -> Timer {
        Timer::from_seconds(1.0 / animation.clip().fps, TimerMode::Repeating)
    }

    pub fn current(&self) -> PlayerAnimation {
        self.current
    }

    /// Starts `animation` from its first frame unless it is already playing.
    pub fn play(&mut self, animation: PlayerAnimation) -> bool {
        if self.current == animation {
            return false;
        }
        *self = Self::new(animation);
        true
    }

    pub fn atlas_index(&self) -> usize {
        self.current.clip().frames[self.frame]
    }

    pub fn tick(&mut self, delta: Duration) {
        let clip = self.current.clip();
        let elapsed_frames = self.timer.tick(delta).times_finished_this_tick() as usize;
        if elapsed_frames == 0 {
            return;
        }

        let last = clip.frames.len() - 1;
        self.frame = if clip.looping {
            (self.frame + elapsed_frames) % clip.frames.len()
        } else {
            (self.frame + elapsed_frames).min(last)
        };
    }
}

fn animate_sprites(
    time: Res<Time>,
    mut query: Query<(
        &mut AnimationPlayer,
        &mut TextureAtlas,
        &mut Sprite,
        Option<&Facing>,
    )>,
) {
    for (mut player, mut atlas, mut sprite, facing) in &mut query {
        player.tick(time.delta());
        atlas.index = player.atlas_index();
        if let Some(facing) = facing {
            sprite.flip_x = *facing == Facing::Left;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(101);

    #[test]
    fn walk_loops_over_two_frames() {
        let mut player = AnimationPlayer::new(PlayerAnimation::Walk);
        assert_eq!(player.atlas_index(), 2);
        player.tick(FRAME);
        assert_eq!(player.atlas_index(), 3);
        player.tick(FRAME);
        assert_eq!(player.atlas_index(), 2);
    }

    #[test]
    fn single_frame_clips_hold() {
        let mut player = AnimationPlayer::new(PlayerAnimation::Jump);
        player.tick(FRAME * 5);
        assert_eq!(player.atlas_index(), 1);
    }

    #[test]
    fn play_ignores_the_running_animation() {
        let mut player = AnimationPlayer::new(PlayerAnimation::Walk);
        player.tick(FRAME);
        assert!(!player.play(PlayerAnimation::Walk));
        assert_eq!(player.atlas_index(), 3);

        assert!(player.play(PlayerAnimation::Idle));
        assert_eq!(player.current(), PlayerAnimation::Idle);
        assert_eq!(player.atlas_index(), 0);
    }
}

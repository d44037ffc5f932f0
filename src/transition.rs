//! Level transitions with a fade. A `ChangeLevel` request is validated against the catalog, the
//! screen fades to black, the level is swapped while the screen is dark, and the new level fades in.

use bevy::prelude::*;

use crate::config::LevelCatalog;
use crate::session::LevelSession;
use crate::state::{GameSet, GameState};

/// Total fade time: half fading out, half fading in.
const FADE_DURATION: f32 = 1.0;

/// Registers the transition systems and fade overlay.
pub struct TransitionPlugin;

impl Plugin for TransitionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TransitionState>()
            .add_event::<ChangeLevel>()
            .add_systems(Startup, spawn_fade_overlay)
            .add_systems(
                Update,
                handle_level_change_requests
                    .after(GameSet::Effects)
                    .run_if(resource_exists::<LevelCatalog>),
            )
            .add_systems(
                Update,
                (update_transition, update_fade_overlay)
                    .chain()
                    .after(handle_level_change_requests)
                    .run_if(resource_exists::<LevelSession>),
            );
    }
}

/// Asks to leave the current level for the named one.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct ChangeLevel(pub String);

/// Tracks the current transition state and timing.
#[derive(Resource, Default)]
pub struct TransitionState {
    pub is_transitioning: bool,
    pub fade_timer: f32,
    pub fade_duration: f32,
    pub next_level: Option<String>,
}

impl TransitionState {
    pub fn start_transition(&mut self, level: String) {
        self.is_transitioning = true;
        self.fade_timer = 0.0;
        self.fade_duration = FADE_DURATION;
        self.next_level = Some(level);
    }

    pub fn reset(&mut self) {
        self.is_transitioning = false;
        self.fade_timer = 0.0;
        self.next_level = None;
    }

    /// Advances the fade by `dt`. Returns the level to switch to on the frame the fade crosses its
    /// midpoint, when the screen is fully black.
    pub fn advance(&mut self, dt: f32) -> Option<String> {
        if !self.is_transitioning {
            return None;
        }

        let half_duration = self.fade_duration * 0.5;
        let before = self.fade_timer;
        self.fade_timer += dt;

        let switch = if before < half_duration && self.fade_timer >= half_duration {
            self.next_level.take()
        } else {
            None
        };

        if self.fade_timer >= self.fade_duration {
            self.reset();
        }
        switch
    }

    /// Returns the current fade alpha (0.0 = transparent, 1.0 = fully black)
    pub fn get_fade_alpha(&self) -> f32 {
        if !self.is_transitioning {
            return 0.0;
        }

        let half_duration = self.fade_duration * 0.5;
        if self.fade_timer < half_duration {
            self.fade_timer / half_duration
        } else {
            1.0 - ((self.fade_timer - half_duration) / half_duration)
        }
    }
}

/// Marker component for the fade overlay node.
#[derive(Component)]
pub struct FadeOverlay;

/// Spawns a full-window black UI node that stays transparent until a transition runs.
fn spawn_fade_overlay(mut commands: Commands) {
    commands.spawn((
        FadeOverlay,
        Name::new("FadeOverlay"),
        NodeBundle {
            background_color: BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.0)),
            style: Style {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            z_index: ZIndex::Global(100),
            ..default()
        },
    ));
}

/// Validates level change requests. Unknown levels are refused and the current level stays.
fn handle_level_change_requests(
    mut requests: EventReader<ChangeLevel>,
    catalog: Res<LevelCatalog>,
    mut transition: ResMut<TransitionState>,
) {
    for ChangeLevel(level) in requests.read() {
        if transition.is_transitioning {
            debug!("Ignoring change to '{level}' while a transition is running");
            continue;
        }
        match catalog.level(level) {
            Ok(_) => {
                info!("Changing level to '{level}'");
                transition.start_transition(level.clone());
            }
            Err(err) => warn!("Level change rejected: {err}"),
        }
    }
}

/// Updates the transition timer and restarts the lifecycle with the new level at the midpoint.
fn update_transition(
    time: Res<Time>,
    catalog: Option<Res<LevelCatalog>>,
    mut transition: ResMut<TransitionState>,
    mut session: ResMut<LevelSession>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(level) = transition.advance(time.delta_seconds()) else {
        return;
    };
    let Some(catalog) = catalog else {
        return;
    };

    match session.change_level(&catalog, &level) {
        Ok(()) => {
            info!(
                "Entering '{level}' with {} item kinds ({:?} policy)",
                session.inventory.len(),
                session.policy()
            );
            next_state.set(GameState::Restarting);
        }
        Err(err) => warn!("Level change rejected: {err}"),
    }
}

/// Updates the fade overlay opacity based on transition state.
fn update_fade_overlay(
    transition: Res<TransitionState>,
    mut overlay_query: Query<&mut BackgroundColor, With<FadeOverlay>>,
) {
    for mut background in &mut overlay_query {
        background.0 = Color::srgba(0.0, 0.0, 0.0, transition.get_fade_alpha());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    #[test]
    fn idle_state_is_transparent() {
        let mut transition = TransitionState::default();
        assert_eq!(transition.get_fade_alpha(), 0.0);
        assert_eq!(transition.advance(0.3), None);
    }

    #[test]
    fn switches_once_at_midpoint_then_finishes() {
        let mut transition = TransitionState::default();
        transition.start_transition("level2".to_owned());

        assert_eq!(transition.advance(0.25), None);
        assert!((transition.get_fade_alpha() - 0.5).abs() < 1e-6);

        assert_eq!(transition.advance(0.25), Some("level2".to_owned()));
        assert!((transition.get_fade_alpha() - 1.0).abs() < 1e-6);

        assert_eq!(transition.advance(0.25), None);
        assert!(transition.is_transitioning);

        assert_eq!(transition.advance(0.3), None);
        assert!(!transition.is_transitioning);
        assert_eq!(transition.get_fade_alpha(), 0.0);
    }

    fn request_world() -> World {
        let mut world = World::new();
        world.insert_resource(LevelCatalog::from_json(SAMPLE).unwrap());
        world.init_resource::<TransitionState>();
        world.init_resource::<Events<ChangeLevel>>();
        world
    }

    fn run_requests(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(handle_level_change_requests);
        schedule.run(world);
    }

    #[test]
    fn known_level_starts_fade() {
        let mut world = request_world();
        world.send_event(ChangeLevel("level2".to_owned()));
        run_requests(&mut world);

        let transition = world.resource::<TransitionState>();
        assert!(transition.is_transitioning);
        assert_eq!(transition.next_level.as_deref(), Some("level2"));
    }

    #[test]
    fn unknown_level_is_refused() {
        let mut world = request_world();
        world.send_event(ChangeLevel("level42".to_owned()));
        run_requests(&mut world);

        let transition = world.resource::<TransitionState>();
        assert!(!transition.is_transitioning);
        assert_eq!(transition.next_level, None);
    }
}

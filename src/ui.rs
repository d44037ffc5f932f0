//! On-screen UI: the inventory panel in the top-left corner and the pause overlay.
//!
//! UI entities are part of Bevy's ECS; once despawned, all associated style/text components are
//! dropped automatically.

use bevy::prelude::*;

use crate::items::collect_items;
use crate::session::LevelSession;
use crate::state::GameState;

/// Registers the inventory panel and the pause overlay spawn/despawn systems.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_inventory_panel)
            .add_systems(
                Update,
                refresh_inventory_panel
                    .after(collect_items)
                    .run_if(resource_exists::<LevelSession>),
            )
            .add_systems(OnEnter(GameState::Paused), spawn_pause_menu)
            .add_systems(OnExit(GameState::Paused), despawn_pause_menu);
    }
}

#[derive(Component)]
pub struct InventoryPanel;

#[derive(Component)]
struct PauseMenu;

fn spawn_inventory_panel(mut commands: Commands) {
    commands.spawn((
        InventoryPanel,
        Name::new("InventoryPanel"),
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 12.0,
                color: Color::BLACK,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            left: Val::Px(16.0),
            top: Val::Px(16.0),
            ..default()
        }),
    ));
}

/// Rewrites the panel in the same frame the session's inventory changes.
pub fn refresh_inventory_panel(
    session: Res<LevelSession>,
    mut panel: Query<&mut Text, With<InventoryPanel>>,
) {
    if !session.is_changed() {
        return;
    }

    let content = session.inventory.render();
    for mut text in &mut panel {
        if let Some(section) = text.sections.first_mut() {
            section.value.clone_from(&content);
        }
    }
}

/// Spawns a full-screen UI node with centered text. Nodes live in the `Ui` world and are rendered
/// by the UI camera automatically.
fn spawn_pause_menu(mut commands: Commands) {
    commands
        .spawn((
            PauseMenu,
            Name::new("PauseMenu"),
            NodeBundle {
                background_color: BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                style: Style {
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    align_items: AlignItems::Center,
                    justify_content: JustifyContent::Center,
                    ..default()
                },
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn(TextBundle::from_section(
                "Paused\nPress ESC to resume",
                TextStyle {
                    font_size: 36.0,
                    color: Color::srgba(0.9, 0.9, 0.9, 1.0),
                    ..default()
                },
            ));
        });
}

/// Removes the pause menu overlay on state exit.
fn despawn_pause_menu(mut commands: Commands, query: Query<Entity, With<PauseMenu>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InventoryPolicy;

    #[test]
    fn panel_shows_session_inventory() {
        let mut world = World::new();
        let mut session = LevelSession::new("level1", InventoryPolicy::Preserve);
        session.inventory.collect("green mushroom");
        session.inventory.collect("green mushroom");
        world.insert_resource(session);

        let panel = world
            .spawn((InventoryPanel, Text::from_section("", TextStyle::default())))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(refresh_inventory_panel);
        schedule.run(&mut world);

        let text = world.entity(panel).get::<Text>().unwrap();
        assert_eq!(text.sections[0].value, "Inventory:\ngreen mushroom: 2\n");
    }
}

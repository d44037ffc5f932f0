//! Level catalog: the authored description of every level, the player sheet, and gameplay tunables.
//!
//! The catalog is plain JSON (`assets/levels.json`). It is read once while preloading and never
//! mutated afterwards; systems borrow it immutably through the `LevelCatalog` resource.

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;

use crate::camera::SoftEdgeSettings;
use crate::error::ConfigurationError;
use crate::physics::PhysicsSettings;
use crate::session::InventoryPolicy;

/// Default location of the catalog relative to the working directory.
pub const DEFAULT_CATALOG_PATH: &str = "assets/levels.json";

/// Where the catalog is read from. Inserted by `main` and consumed when preloading starts.
#[derive(Resource, Clone, Debug)]
pub struct CatalogPath(pub String);

impl Default for CatalogPath {
    fn default() -> Self {
        Self(DEFAULT_CATALOG_PATH.to_owned())
    }
}

#[derive(Resource, Debug, Clone, Deserialize)]
pub struct LevelCatalog {
    pub start_level: String,
    #[serde(default)]
    pub inventory_on_level_change: InventoryPolicy,
    #[serde(default)]
    pub physics: PhysicsSettings,
    #[serde(default)]
    pub camera: SoftEdgeSettings,
    pub player: PlayerDefinition,
    pub levels: BTreeMap<String, LevelDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerDefinition {
    /// Sprite sheet holding every animation frame, laid out as a uniform grid.
    pub sheet: String,
    pub frame_size: [u32; 2],
    pub columns: u32,
    pub rows: u32,
    #[serde(default = "default_player_spawn")]
    pub spawn: SpawnPoint,
    #[serde(default = "default_player_body")]
    pub body_offset: BodyOffset,
    /// Share of the landing speed the player bounces back with.
    #[serde(default = "default_player_bounce")]
    pub bounce: f32,
}

impl PlayerDefinition {
    pub fn frame_size(&self) -> Vec2 {
        Vec2::new(self.frame_size[0] as f32, self.frame_size[1] as f32)
    }
}

fn default_player_spawn() -> SpawnPoint {
    SpawnPoint { x: 50.0, y: 300.0 }
}

fn default_player_body() -> BodyOffset {
    BodyOffset::from([30.0, 26.0, 14.0, 26.0])
}

fn default_player_bounce() -> f32 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelDefinition {
    /// LDtk project holding the level layout.
    pub map: String,
    /// Level inside the LDtk project; the first level when absent.
    #[serde(default)]
    pub map_level: Option<String>,
    pub background: String,
    #[serde(default)]
    pub background_scale: Option<[f32; 2]>,
    pub tileset: String,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default)]
    pub sprites: BTreeMap<String, SpriteDefinition>,
}

fn default_tile_size() -> f32 {
    64.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpriteDefinition {
    pub image: String,
    #[serde(default)]
    pub body_offset: BodyOffset,
    /// Overrides the frame size read from the image.
    #[serde(default)]
    pub size: Option<[f32; 2]>,
    /// Touching an instance of this sprite moves the player to another level instead of
    /// collecting it.
    #[serde(default)]
    pub teleport_to: Option<String>,
    /// Decoration only: drawn, but has no body and takes part in no collision.
    #[serde(default)]
    pub scenery: bool,
    #[serde(default)]
    pub bounce: f32,
    #[serde(default)]
    pub instances: Vec<SpawnPoint>,
}

/// How the instances of a sprite behave in the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteRole<'a> {
    Collectible,
    Teleporter { target: &'a str },
    Scenery,
}

impl SpriteDefinition {
    pub fn role(&self) -> SpriteRole<'_> {
        if self.scenery {
            return SpriteRole::Scenery;
        }
        match &self.teleport_to {
            Some(target) => SpriteRole::Teleporter { target },
            None => SpriteRole::Collectible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

impl From<SpawnPoint> for Vec2 {
    fn from(point: SpawnPoint) -> Self {
        Vec2::new(point.x, point.y)
    }
}

/// Tightens a hitbox against the visual frame: `[shrink_w, shrink_h, offset_x, offset_y]`, where
/// the offset is measured from the frame's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(from = "[f32; 4]")]
pub struct BodyOffset {
    pub shrink: Vec2,
    pub offset: Vec2,
}

impl From<[f32; 4]> for BodyOffset {
    fn from([w, h, ox, oy]: [f32; 4]) -> Self {
        Self {
            shrink: Vec2::new(w, h),
            offset: Vec2::new(ox, oy),
        }
    }
}

/// Hitbox geometry derived from a frame size and a `BodyOffset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub half_extents: Vec2,
    /// Hitbox centre relative to the sprite centre, in map space.
    pub center_offset: Vec2,
}

impl BodyOffset {
    pub fn hitbox(&self, frame_size: Vec2) -> Hitbox {
        let size = (frame_size - self.shrink).max(Vec2::ONE);
        Hitbox {
            half_extents: size * 0.5,
            center_offset: self.offset + size * 0.5 - frame_size * 0.5,
        }
    }
}

/// What kind of handle a declared asset path needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
    Image,
    Map,
}

/// One asset path declared by the catalog. `level` is `None` for assets shared by every level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeclaredAsset {
    pub level: Option<String>,
    pub kind: AssetKind,
    pub path: String,
}

impl LevelCatalog {
    pub fn from_json(source: &str) -> Result<Self, ConfigurationError> {
        let catalog: Self = serde_json::from_str(source)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigurationError::Malformed(format!("{}: {err}", path.display())))?;
        Self::from_json(&source)
    }

    pub fn level(&self, id: &str) -> Result<&LevelDefinition, ConfigurationError> {
        self.levels
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownLevel(id.to_owned()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.levels.contains_key(id)
    }

    /// Every asset any level may need, so that later level changes never fetch anything. Paths
    /// shared between levels are declared once, under the first level that uses them.
    pub fn asset_paths(&self) -> Vec<DeclaredAsset> {
        let mut seen = std::collections::HashSet::new();
        let mut declared = Vec::new();
        let mut declare = |level: Option<&str>, kind: AssetKind, path: &str| {
            if seen.insert(path.to_owned()) {
                declared.push(DeclaredAsset {
                    level: level.map(str::to_owned),
                    kind,
                    path: path.to_owned(),
                });
            }
        };

        declare(None, AssetKind::Image, &self.player.sheet);
        for (id, level) in &self.levels {
            let id = Some(id.as_str());
            declare(id, AssetKind::Map, &level.map);
            declare(id, AssetKind::Image, &level.background);
            declare(id, AssetKind::Image, &level.tileset);
            for sprite in level.sprites.values() {
                declare(id, AssetKind::Image, &sprite.image);
            }
        }
        declared
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.contains(&self.start_level) {
            return Err(ConfigurationError::UnknownLevel(self.start_level.clone()));
        }

        let player = &self.player;
        if player.frame_size.contains(&0) || player.columns == 0 || player.rows == 0 {
            return Err(ConfigurationError::Invalid(
                "player sheet needs a non-empty frame size and grid".to_owned(),
            ));
        }

        for (id, level) in &self.levels {
            if level.tile_size <= 0.0 {
                return Err(ConfigurationError::Invalid(format!(
                    "level '{id}' has a non-positive tile size"
                )));
            }
            for (name, sprite) in &level.sprites {
                if sprite.scenery && sprite.teleport_to.is_some() {
                    return Err(ConfigurationError::Invalid(format!(
                        "sprite '{name}' in level '{id}' cannot be both scenery and a teleporter"
                    )));
                }
                if let Some(target) = &sprite.teleport_to {
                    if !self.contains(target) {
                        return Err(ConfigurationError::Invalid(format!(
                            "sprite '{name}' in level '{id}' teleports to unknown level '{target}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
        "start_level": "level1",
        "player": {
            "sheet": "images/kenney_player.png",
            "frame_size": [80, 110],
            "columns": 4,
            "rows": 1
        },
        "levels": {
            "level1": {
                "map": "tilemaps/level1.ldtk",
                "background": "images/background.png",
                "background_scale": [2.0, 0.8],
                "tileset": "tilesets/tiles_spritesheet.png",
                "sprites": {
                    "green mushroom": {
                        "image": "images/green_mushroom.png",
                        "body_offset": [30, 26, 14, 26],
                        "size": [64, 64],
                        "instances": [{ "x": 640, "y": 432 }, { "x": 576, "y": 432 }]
                    },
                    "red teleporter": {
                        "image": "images/red_mushroom.png",
                        "size": [64, 64],
                        "teleport_to": "level2",
                        "instances": [{ "x": 220, "y": 326 }]
                    },
                    "wasteland": {
                        "image": "images/wasteland_left.png",
                        "scenery": true,
                        "instances": [{ "x": 576, "y": 688 }]
                    }
                }
            },
            "level2": {
                "map": "tilemaps/level2.ldtk",
                "background": "images/background.png",
                "tileset": "tilesets/tiles_spritesheet.png",
                "sprites": {
                    "red mushroom": {
                        "image": "images/red_mushroom.png",
                        "size": [64, 64],
                        "instances": [{ "x": 300, "y": 200 }]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_sample_catalog() {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.start_level, "level1");
        assert_eq!(catalog.inventory_on_level_change, InventoryPolicy::Preserve);
        assert_eq!(catalog.player.spawn, SpawnPoint { x: 50.0, y: 300.0 });
        assert_eq!(catalog.physics.gravity, 500.0);

        let level1 = catalog.level("level1").unwrap();
        assert_eq!(level1.tile_size, 64.0);
        let mushrooms = &level1.sprites["green mushroom"];
        assert_eq!(mushrooms.instances.len(), 2);
        assert_eq!(mushrooms.body_offset.shrink, Vec2::new(30.0, 26.0));
        assert_eq!(mushrooms.body_offset.offset, Vec2::new(14.0, 26.0));
    }

    #[test]
    fn unknown_level_lookup_fails() {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(
            catalog.level("level7").unwrap_err(),
            ConfigurationError::UnknownLevel("level7".to_owned())
        );
    }

    #[test]
    fn rejects_missing_start_level() {
        let source = SAMPLE.replacen(r#""start_level": "level1""#, r#""start_level": "nope""#, 1);
        assert_eq!(
            LevelCatalog::from_json(&source).unwrap_err(),
            ConfigurationError::UnknownLevel("nope".to_owned())
        );
    }

    #[test]
    fn rejects_teleporter_to_unknown_level() {
        let source = SAMPLE.replacen(r#""teleport_to": "level2""#, r#""teleport_to": "level3""#, 1);
        assert!(matches!(
            LevelCatalog::from_json(&source),
            Err(ConfigurationError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            LevelCatalog::from_json("[1, 2"),
            Err(ConfigurationError::Malformed(_))
        ));
    }

    #[test]
    fn declares_shared_assets_once() {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        let declared = catalog.asset_paths();

        let backgrounds = declared
            .iter()
            .filter(|asset| asset.path == "images/background.png")
            .count();
        assert_eq!(backgrounds, 1);

        let maps: Vec<_> = declared
            .iter()
            .filter(|asset| asset.kind == AssetKind::Map)
            .map(|asset| (asset.level.as_deref(), asset.path.as_str()))
            .collect();
        assert_eq!(
            maps,
            vec![
                (Some("level1"), "tilemaps/level1.ldtk"),
                (Some("level2"), "tilemaps/level2.ldtk"),
            ]
        );

        assert_eq!(declared[0].path, "images/kenney_player.png");
        assert_eq!(declared[0].level, None);
    }

    #[test]
    fn hitbox_shrinks_and_offsets_from_top_left() {
        let body = BodyOffset::from([30.0, 26.0, 14.0, 26.0]);
        let hitbox = body.hitbox(Vec2::new(80.0, 110.0));

        // 50x84 box whose top-left sits at (14, 26) inside an 80x110 frame.
        assert_eq!(hitbox.half_extents, Vec2::new(25.0, 42.0));
        assert_eq!(hitbox.center_offset, Vec2::new(14.0 + 25.0 - 40.0, 26.0 + 42.0 - 55.0));
    }

    #[test]
    fn sprite_roles_follow_flags() {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        let level1 = catalog.level("level1").unwrap();

        assert_eq!(level1.sprites["green mushroom"].role(), SpriteRole::Collectible);
        assert_eq!(
            level1.sprites["red teleporter"].role(),
            SpriteRole::Teleporter { target: "level2" }
        );
        assert_eq!(level1.sprites["wasteland"].role(), SpriteRole::Scenery);
        assert_eq!(catalog.player.bounce, 0.1);
    }

    #[test]
    fn rejects_scenery_teleporter() {
        let source = SAMPLE.replacen(
            r#""teleport_to": "level2","#,
            r#""teleport_to": "level2", "scenery": true,"#,
            1,
        );
        assert!(matches!(
            LevelCatalog::from_json(&source),
            Err(ConfigurationError::Invalid(_))
        ));
    }

    #[test]
    fn shipped_catalog_is_valid() {
        let catalog = LevelCatalog::from_json(include_str!("../assets/levels.json")).unwrap();
        assert_eq!(catalog.start_level, "level1");
        assert_eq!(
            catalog.level("level1").unwrap().sprites["green mushroom"]
                .instances
                .len(),
            3
        );
    }

    #[test]
    fn zero_offset_hitbox_matches_frame() {
        let hitbox = BodyOffset::default().hitbox(Vec2::splat(64.0));
        assert_eq!(hitbox.half_extents, Vec2::splat(32.0));
        assert_eq!(hitbox.center_offset, Vec2::ZERO);
    }
}

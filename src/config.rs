//! Scene configuration
//!
//! A scene is the screen, the background, and the planets on it. Stored as
//! pretty JSON; every field has a default so partial files load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bands::{earth_bands, mars_bands, moon_bands, Atmosphere, Clouds, TerrainBand};
use crate::color::Rgb;
use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_SIDE};
use crate::error::ConfigError;
use crate::lighting::Lighting;
use crate::math3d::Vec2;
use crate::noise::LevelOfDetail;
use crate::planet::{ColorMode, PlanetConfig};
use crate::rotation::{Axis, AxisSet, Direction, Rotation};

/// Light starts behind the planets
pub const STARTING_ANGLE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub background: Rgb,
    pub star_count: usize,
    /// Pixels per chunk side; unset renders each sphere as one chunk
    pub chunk_size: Option<u32>,
    /// Render worker count; unset uses rayon's global pool
    pub threads: Option<usize>,
    pub noise_seed: u32,
    pub planets: Vec<PlanetConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::preset(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl SceneConfig {
    /// Earth, moon and mars laid out for a `width` x `height` screen
    pub fn preset(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: 10,
            background: Rgb::BLACK,
            star_count: 60,
            chunk_size: None,
            threads: None,
            noise_seed: 0,
            planets: solar_system(width, height),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::OutOfRange {
                field: "width/height",
                value: self.width.min(self.height) as f64,
                expected: "> 0",
            });
        }
        if self.width > MAX_SIDE || self.height > MAX_SIDE {
            return Err(ConfigError::OutOfRange {
                field: "width/height",
                value: self.width.max(self.height) as f64,
                expected: "<= 16384",
            });
        }
        if self.fps == 0 {
            return Err(ConfigError::OutOfRange {
                field: "fps",
                value: 0.0,
                expected: "> 0",
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "threads",
                value: 0.0,
                expected: "> 0",
            });
        }
        for planet in &self.planets {
            planet.validate()?;
        }
        Ok(())
    }

    /// Save scene to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load and validate a scene from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let scene: Self = serde_json::from_str(&json)?;
        scene.validate()?;
        debug!(path = %path.display(), planets = scene.planets.len(), "scene loaded");
        Ok(scene)
    }
}

fn solar_system(width: u32, height: u32) -> Vec<PlanetConfig> {
    let (w, h) = (width as f64, height as f64);
    let base = ((width + height) / 4) as f64;

    let earth = PlanetConfig {
        name: "earth".to_string(),
        radius: (base * 0.6) as u32,
        position: Vec2::new((width / 2) as f64, (height / 2) as f64),
        terrain: earth_bands(),
        terrain_lod: LevelOfDetail::default(),
        clouds: Some(Clouds::default()),
        atmosphere: Some(Atmosphere::default()),
        wind_speed: 0.01,
        color_mode: ColorMode::Change,
        lighting: Lighting::new(STARTING_ANGLE, 0.1, 1.0),
        rotation: Rotation::new(Direction::Left, 0.1, AxisSet::only(Axis::Y)),
    };

    let small_body =
        |name: &str, radius: f64, position: Vec2, terrain: Vec<TerrainBand>| PlanetConfig {
            name: name.to_string(),
            radius: radius as u32,
            position,
            terrain,
            terrain_lod: LevelOfDetail::Single {
                frequency: 2.0,
                weight: 1.0,
            },
            clouds: None,
            atmosphere: None,
            wind_speed: 0.0,
            color_mode: ColorMode::Change,
            lighting: Lighting::new(STARTING_ANGLE, 0.01, 1.0),
            rotation: Rotation::new(Direction::Right, 0.1, AxisSet::only(Axis::Y)),
        };

    vec![
        earth,
        small_body(
            "moon",
            base * 0.3,
            Vec2::new((w / 3.5).floor(), (h / 2.5).floor()),
            moon_bands(),
        ),
        small_body(
            "mars",
            base * 0.05,
            Vec2::new((w / 1.2).floor(), (h / 4.0).floor()),
            mars_bands(),
        ),
    ]
}

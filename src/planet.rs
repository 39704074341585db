//! Planet
//!
//! Owns one sphere's configuration and per-frame state, and turns both into
//! pixels with a single `draw` call per frame.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bands::{earth_bands, validate_bands, Atmosphere, Clouds, Shade, TerrainBand};
use crate::color::Rgb;
use crate::compositor::{apply_cloud_shadow, composite_layers};
use crate::display::{PixelBuffer, MAX_SIDE};
use crate::error::{ConfigError, RenderError};
use crate::lighting::Lighting;
use crate::math3d::Vec2;
use crate::noise::LevelOfDetail;
use crate::raster::{FrameSnapshot, Layer, Rasterizer};
use crate::rotation::Rotation;

/// Light angles (radians) between which terrain colours may be re-rolled
pub const DARK_WINDOW: (f64, f64) = (-4.9, -4.6);

/// What happens to the terrain palette while the planet is in shadow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Palette never changes
    Solid,
    /// Re-roll once per light cycle
    #[default]
    Change,
    /// Re-roll the first time only
    ChangeOnce,
}

impl ColorMode {
    fn recolors(self) -> bool {
        !matches!(self, Self::Solid)
    }

    fn resets_on_wrap(self) -> bool {
        matches!(self, Self::Change)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetConfig {
    pub name: String,
    /// Pixels
    pub radius: u32,
    /// Screen position of the centre
    pub position: Vec2,
    pub terrain: Vec<TerrainBand>,
    pub terrain_lod: LevelOfDetail,
    pub clouds: Option<Clouds>,
    pub atmosphere: Option<Atmosphere>,
    /// Added to the cloud noise shift every frame
    pub wind_speed: f64,
    pub color_mode: ColorMode,
    pub lighting: Lighting,
    pub rotation: Rotation,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            name: "earth".to_string(),
            radius: 50,
            position: Vec2::new(96.0, 54.0),
            terrain: earth_bands(),
            terrain_lod: LevelOfDetail::default(),
            clouds: None,
            atmosphere: None,
            wind_speed: 0.01,
            color_mode: ColorMode::default(),
            lighting: Lighting::default(),
            rotation: Rotation::default(),
        }
    }
}

impl PlanetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bands(&self.name, &self.terrain)?;
        if let Some(clouds) = &self.clouds {
            clouds.validate()?;
        }
        if let Some(atmosphere) = &self.atmosphere {
            atmosphere.validate()?;
        }
        // Outermost layer must fit a buffer side
        let outer = self
            .clouds
            .iter()
            .map(|c| c.height)
            .chain(self.atmosphere.iter().map(|a| a.height))
            .fold(1.0, f64::max);
        if 2.0 * (self.radius as f64 * outer).round() > MAX_SIDE as f64 {
            return Err(ConfigError::OutOfRange {
                field: "radius",
                value: self.radius as f64,
                expected: "outermost layer side <= 16384",
            });
        }
        if !self.wind_speed.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "wind_speed",
                value: self.wind_speed,
                expected: "finite",
            });
        }
        if !(self.lighting.intensity >= 0.0 && self.lighting.intensity.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "lighting.intensity",
                value: self.lighting.intensity,
                expected: ">= 0",
            });
        }
        Ok(())
    }
}

/// Layers of one planet for one frame, ready to composite
#[derive(Debug, Clone)]
pub struct PlanetFrame {
    center: (i32, i32),
    terrain: Layer,
    clouds: Option<Layer>,
    atmosphere: Option<Layer>,
    cloud_shift: f64,
}

impl PlanetFrame {
    pub fn composite(&self, screen: &mut PixelBuffer) {
        composite_layers(
            screen,
            self.center,
            Some(&self.terrain),
            self.clouds.as_ref(),
            self.atmosphere.as_ref(),
        );
    }
}

pub struct Planet {
    config: PlanetConfig,
    cloud_radius: i32,
    atmosphere_radius: i32,
    color_changed: bool,
    cloud_shift: f64,
}

impl Planet {
    pub fn new(config: PlanetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let radius = config.radius as f64;
        let cloud_radius = config
            .clouds
            .as_ref()
            .map_or(0, |c| (radius * c.height).round() as i32);
        let atmosphere_radius = config
            .atmosphere
            .as_ref()
            .map_or(0, |a| (radius * a.height).round() as i32);
        info!(
            name = %config.name,
            radius = config.radius,
            clouds = config.clouds.is_some(),
            atmosphere = config.atmosphere.is_some(),
            "planet ready"
        );
        Ok(Self {
            config,
            cloud_radius,
            atmosphere_radius,
            color_changed: false,
            cloud_shift: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    /// Fits in `i32`: `PlanetConfig::validate` caps it at half `MAX_SIDE`
    pub fn radius(&self) -> i32 {
        self.config.radius as i32
    }

    pub fn cloud_radius(&self) -> i32 {
        self.cloud_radius
    }

    pub fn atmosphere_radius(&self) -> i32 {
        self.atmosphere_radius
    }

    pub fn lighting(&self) -> &Lighting {
        &self.config.lighting
    }

    pub fn rotation(&self) -> &Rotation {
        &self.config.rotation
    }

    pub fn terrain(&self) -> &[TerrainBand] {
        &self.config.terrain
    }

    pub fn color_changed(&self) -> bool {
        self.color_changed
    }

    pub fn cloud_shift(&self) -> f64 {
        self.cloud_shift
    }

    /// Render this frame onto `screen`, then step the light, the spins, and
    /// the palette. A failed render leaves `screen` and all state untouched.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        screen: &mut PixelBuffer,
        rasterizer: &Rasterizer,
        rng: &mut R,
    ) -> Result<(), RenderError> {
        let frame = self.render(rasterizer)?;
        self.commit(&frame, screen, rng);
        Ok(())
    }

    /// Rasterize every layer with the current angles. Nothing is mutated,
    /// so an error can simply be dropped.
    pub fn render(&self, rasterizer: &Rasterizer) -> Result<PlanetFrame, RenderError> {
        let config = &self.config;

        let terrain_frame = FrameSnapshot::capture(&config.lighting, Some(&config.rotation), 0.0);
        let terrain_shade = Shade::Terrain {
            bands: &config.terrain,
            lod: &config.terrain_lod,
        };
        let mut terrain = rasterizer.render(self.radius(), &terrain_shade, &terrain_frame)?;

        let mut cloud_shift = self.cloud_shift;
        let clouds = match &config.clouds {
            Some(clouds) => {
                cloud_shift += config.wind_speed;
                let frame =
                    FrameSnapshot::capture(&config.lighting, Some(&clouds.rotation), cloud_shift);
                Some(rasterizer.render(self.cloud_radius, &Shade::Clouds(clouds), &frame)?)
            },
            None => None,
        };

        let atmosphere = match &config.atmosphere {
            Some(atmosphere) => {
                let frame = FrameSnapshot::capture(&config.lighting, None, 0.0);
                Some(rasterizer.render(
                    self.atmosphere_radius,
                    &Shade::Atmosphere(atmosphere),
                    &frame,
                )?)
            },
            None => None,
        };

        if let (Some(cloud_layer), Some(shadow)) = (
            clouds.as_ref(),
            config.clouds.as_ref().and_then(|c| c.shadow.as_ref()),
        ) {
            apply_cloud_shadow(&mut terrain, cloud_layer, terrain_frame.toward_light, shadow);
        }

        Ok(PlanetFrame {
            center: config.position.to_pixel(),
            terrain,
            clouds,
            atmosphere,
            cloud_shift,
        })
    }

    /// Blit a rendered frame onto `screen` and move this planet on to the
    /// next one
    pub fn commit<R: Rng + ?Sized>(
        &mut self,
        frame: &PlanetFrame,
        screen: &mut PixelBuffer,
        rng: &mut R,
    ) {
        frame.composite(screen);
        self.cloud_shift = frame.cloud_shift;
        self.advance(rng);
    }

    /// Step every angle by one frame and re-roll the palette if the light
    /// just entered the dark window
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mode = self.config.color_mode;
        if self.config.lighting.advance() && mode.resets_on_wrap() {
            self.color_changed = false;
        }

        self.config.rotation.advance();
        if let Some(clouds) = &mut self.config.clouds {
            clouds.rotation.advance();
        }

        let angle = self.config.lighting.angle();
        let (low, high) = DARK_WINDOW;
        if mode.recolors() && !self.color_changed && low < angle && angle < high {
            for band in &mut self.config.terrain {
                band.color = Rgb::random(rng);
            }
            self.color_changed = true;
            debug!(name = %self.config.name, angle, "terrain recoloured");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseSampler;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::TAU;

    fn planet_at(angle: f64, speed: f64, mode: ColorMode) -> Planet {
        Planet::new(PlanetConfig {
            radius: 6,
            position: Vec2::new(8.0, 8.0),
            color_mode: mode,
            lighting: Lighting::new(angle, speed, 1.0),
            ..PlanetConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_recolor_in_dark_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut planet = planet_at(-4.55, 0.1, ColorMode::Change);
        let before = planet.terrain().to_vec();
        planet.advance(&mut rng);
        assert!(planet.color_changed());
        assert_ne!(planet.terrain(), &before[..]);

        // Still inside the window: no second re-roll
        let once = planet.terrain().to_vec();
        planet.advance(&mut rng);
        assert!(planet.lighting().angle() < -4.6);
        assert_eq!(planet.terrain(), &once[..]);
    }

    #[test]
    fn test_solid_never_recolors() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut planet = planet_at(-4.55, 0.1, ColorMode::Solid);
        let before = planet.terrain().to_vec();
        planet.advance(&mut rng);
        assert!(!planet.color_changed());
        assert_eq!(planet.terrain(), &before[..]);
    }

    #[test]
    fn test_wrap_resets_flag() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut planet = planet_at(-4.55, 0.1, ColorMode::Change);
        planet.advance(&mut rng);
        assert!(planet.color_changed());

        // Run the light round to just before the wrap
        while planet.lighting().angle() > -TAU + 0.1 {
            planet.advance(&mut rng);
        }
        planet.advance(&mut rng);
        assert!(planet.lighting().angle() > -TAU);
        assert!(!planet.color_changed());
    }

    #[test]
    fn test_change_once_keeps_flag_across_wrap() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut planet = planet_at(-4.55, 0.1, ColorMode::ChangeOnce);
        planet.advance(&mut rng);
        assert!(planet.color_changed());
        let palette = planet.terrain().to_vec();

        // Two more full cycles
        for _ in 0..((2.0 * TAU / 0.1) as usize + 2) {
            planet.advance(&mut rng);
        }
        assert!(planet.color_changed());
        assert_eq!(planet.terrain(), &palette[..]);
    }

    #[test]
    fn test_draw_advances_state_and_paints() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut planet = Planet::new(PlanetConfig {
            radius: 6,
            position: Vec2::new(8.0, 8.0),
            clouds: Some(Clouds::default()),
            atmosphere: Some(Atmosphere::default()),
            wind_speed: 0.25,
            lighting: Lighting::new(-1.6, 0.1, 1.0),
            ..PlanetConfig::default()
        })
        .unwrap();
        assert_eq!(planet.cloud_radius(), 6);
        assert_eq!(planet.atmosphere_radius(), 7);

        let rasterizer = Rasterizer::new(NoiseSampler::default());
        let mut screen = PixelBuffer::with_size(16, 16);
        let angle = planet.rotation().angle;
        planet.draw(&mut screen, &rasterizer, &mut rng).unwrap();
        planet.draw(&mut screen, &rasterizer, &mut rng).unwrap();

        assert!((planet.cloud_shift() - 0.5).abs() < 1e-12);
        assert!((planet.rotation().angle - (angle + 0.2)).abs() < 1e-9);
        assert!((planet.lighting().angle() - (-1.8)).abs() < 1e-9);
        // Centre pixel faces the light and is opaque
        let centre = screen.get_pixel_rgba(8, 8).unwrap();
        assert_eq!(centre.a, 255);
        assert!(screen.coverage() > 100);
    }

    #[test]
    fn test_failed_render_leaves_state_and_screen_untouched() {
        let mut rng = StdRng::seed_from_u64(9);
        // About to enter the dark window, so a successful draw would re-roll
        let mut planet = Planet::new(PlanetConfig {
            radius: 20,
            position: Vec2::new(24.0, 24.0),
            clouds: Some(Clouds {
                height: 1.25,
                ..Clouds::default()
            }),
            atmosphere: Some(Atmosphere::default()),
            wind_speed: 0.25,
            color_mode: ColorMode::Change,
            lighting: Lighting::new(-4.55, 0.1, 1.0),
            ..PlanetConfig::default()
        })
        .unwrap();
        assert_eq!(planet.cloud_radius(), 25);

        // Terrain succeeds, clouds fail
        let rasterizer = Rasterizer::new(NoiseSampler::default()).failing_at(25);
        let mut screen = PixelBuffer::with_size(48, 48);
        screen.clear(Rgb::new(1, 2, 3));
        let before_screen = screen.clone();
        let before_config = planet.config().clone();

        let result = planet.draw(&mut screen, &rasterizer, &mut rng);
        assert!(matches!(result, Err(RenderError::ChunkPanicked { .. })));
        assert_eq!(screen, before_screen);
        assert_eq!(planet.config(), &before_config);
        assert_eq!(planet.cloud_shift(), 0.0);
        assert!(!planet.color_changed());

        // Same state, working rasterizer: the frame that failed now lands
        planet
            .draw(&mut screen, &Rasterizer::new(NoiseSampler::default()), &mut rng)
            .unwrap();
        assert!((planet.cloud_shift() - 0.25).abs() < 1e-12);
        assert!(planet.color_changed());
        assert_ne!(screen, before_screen);
    }

    #[test]
    fn test_render_then_commit_matches_draw() {
        let config = PlanetConfig {
            radius: 7,
            position: Vec2::new(9.0, 9.0),
            clouds: Some(Clouds::default()),
            ..PlanetConfig::default()
        };
        let rasterizer = Rasterizer::new(NoiseSampler::new(2));
        let mut drawn = Planet::new(config.clone()).unwrap();
        let mut split = Planet::new(config).unwrap();
        let mut drawn_screen = PixelBuffer::with_size(18, 18);
        let mut split_screen = PixelBuffer::with_size(18, 18);

        drawn
            .draw(&mut drawn_screen, &rasterizer, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let frame = split.render(&rasterizer).unwrap();
        // Rendering alone moves nothing
        assert_eq!(split.cloud_shift(), 0.0);
        split.commit(&frame, &mut split_screen, &mut StdRng::seed_from_u64(1));

        assert_eq!(drawn_screen, split_screen);
        assert_eq!(drawn.config(), split.config());
        assert_eq!(drawn.cloud_shift(), split.cloud_shift());
    }

    #[test]
    fn test_rejects_layers_wider_than_a_buffer() {
        let config = PlanetConfig {
            radius: MAX_SIDE / 2,
            atmosphere: Some(Atmosphere::default()),
            ..PlanetConfig::default()
        };
        assert!(matches!(
            Planet::new(config),
            Err(ConfigError::OutOfRange { field: "radius", .. })
        ));
        let config = PlanetConfig {
            radius: u32::MAX,
            ..PlanetConfig::default()
        };
        assert!(Planet::new(config).is_err());
        let config = PlanetConfig {
            radius: MAX_SIDE / 2,
            ..PlanetConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_terrain() {
        let config = PlanetConfig {
            terrain: vec![TerrainBand::new("only", Rgb::WHITE, 0.5)],
            ..PlanetConfig::default()
        };
        assert!(matches!(
            Planet::new(config),
            Err(ConfigError::MissingCatchAll { .. })
        ));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: PlanetConfig = serde_json::from_str(
            r#"{"name": "ice", "radius": 9, "color_mode": "change_once", "clouds": {}}"#,
        )
        .unwrap();
        assert_eq!(config.radius, 9);
        assert_eq!(config.color_mode, ColorMode::ChangeOnce);
        assert_eq!(config.terrain.len(), 5);
        assert_eq!(config.clouds, Some(Clouds::default()));
        assert!(config.atmosphere.is_none());
        assert!(Planet::new(config).is_ok());
    }
}

//! Band Classification
//!
//! Maps a normalized noise value (or, for atmospheres, the camera-facing
//! depth of the normal) to a color and coverage.

use serde::{Deserialize, Serialize};

use crate::color::{Rgb, Rgba};
use crate::error::ConfigError;
use crate::noise::LevelOfDetail;
use crate::rotation::Rotation;

// ============================================================================
// Terrain
// ============================================================================

/// One entry of an ordered terrain table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainBand {
    pub name: String,
    pub color: Rgb,
    /// Upper bound (inclusive) on noise in [0, 1]. Omitted means unbounded.
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub threshold: f64,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_unbounded(threshold: &f64) -> bool {
    threshold.is_infinite()
}

impl TerrainBand {
    pub fn new(name: impl Into<String>, color: Rgb, threshold: f64) -> Self {
        Self {
            name: name.into(),
            color,
            threshold,
        }
    }
}

/// Check that thresholds strictly increase and the table ends in an
/// unbounded catch-all band.
pub fn validate_bands(table: &str, bands: &[TerrainBand]) -> Result<(), ConfigError> {
    let Some(last) = bands.last() else {
        return Err(ConfigError::EmptyBands {
            table: table.to_string(),
        });
    };
    for pair in bands.windows(2) {
        if pair[1].threshold.is_nan() || pair[1].threshold <= pair[0].threshold {
            return Err(ConfigError::UnorderedBands {
                band: pair[1].name.clone(),
                threshold: pair[1].threshold,
                previous: pair[0].threshold,
            });
        }
    }
    if last.threshold != f64::INFINITY {
        return Err(ConfigError::MissingCatchAll {
            band: last.name.clone(),
            threshold: last.threshold,
        });
    }
    Ok(())
}

/// First band whose threshold is not exceeded, fully opaque. A table
/// without a catch-all yields `None` (transparent) for values past its end.
pub fn classify_terrain(noise01: f64, bands: &[TerrainBand]) -> Option<Rgba> {
    bands
        .iter()
        .find(|band| noise01 <= band.threshold)
        .map(|band| band.color.with_alpha(255))
}

// ============================================================================
// Clouds
// ============================================================================

/// Darkening cast by clouds onto the terrain below
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudShadow {
    /// RGB multiplier for shadowed terrain
    pub intensity: f64,
    /// Pixels the shadow is displaced along the light direction
    pub tilt: f64,
}

impl Default for CloudShadow {
    fn default() -> Self {
        Self {
            intensity: 0.7,
            tilt: 6.0,
        }
    }
}

/// A cloud shell drawn above the terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clouds {
    /// Shell radius as a multiple of the planet radius
    pub height: f64,
    pub color: Rgb,
    pub alpha: u8,
    /// Noise above this value is cloud
    pub threshold: f64,
    pub lod: LevelOfDetail,
    pub rotation: Rotation,
    pub shadow: Option<CloudShadow>,
}

impl Default for Clouds {
    fn default() -> Self {
        Self {
            height: 1.05,
            color: Rgb::WHITE,
            alpha: 200,
            threshold: 0.55,
            lod: LevelOfDetail::default(),
            rotation: Rotation::default(),
            shadow: Some(CloudShadow::default()),
        }
    }
}

impl Clouds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.height > 1.0 && self.height.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "clouds.height",
                value: self.height,
                expected: "> 1",
            });
        }
        if self.alpha == 0 {
            return Err(ConfigError::OutOfRange {
                field: "clouds.alpha",
                value: 0.0,
                expected: "1..=255",
            });
        }
        if let Some(shadow) = &self.shadow {
            if !(0.0..=1.0).contains(&shadow.intensity) {
                return Err(ConfigError::OutOfRange {
                    field: "clouds.shadow.intensity",
                    value: shadow.intensity,
                    expected: "0..=1",
                });
            }
        }
        Ok(())
    }
}

pub fn classify_cloud(noise01: f64, clouds: &Clouds) -> Option<Rgba> {
    (noise01 > clouds.threshold).then(|| clouds.color.with_alpha(clouds.alpha))
}

// ============================================================================
// Atmosphere
// ============================================================================

/// A glow ring around the planet limb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Atmosphere {
    pub color: Rgb,
    /// Peak opacity as a fraction of 255
    pub density: f64,
    /// Ring radius as a multiple of the planet radius, in (1, 2)
    pub height: f64,
    /// Exponent of the opacity ramp
    pub falloff: f64,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            color: Rgb::new(110, 160, 255),
            density: 0.6,
            height: 1.2,
            falloff: 2.0,
        }
    }
}

impl Atmosphere {
    /// Depth where the ring starts
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.height - 1.0
    }

    /// Depth of peak opacity
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.threshold() + 1.0) / 2.0
    }

    /// Opacity at a given unrotated normal depth
    pub fn alpha(&self, norm_z: f64) -> u8 {
        let threshold = self.threshold();
        if norm_z <= threshold {
            return 0;
        }
        let midpoint = self.midpoint();
        let distance = (norm_z - midpoint).abs() / (midpoint - threshold);
        if distance >= 1.0 {
            return 0;
        }
        (self.density * 255.0 * (1.0 - distance).powf(self.falloff))
            .clamp(0.0, 255.0)
            .round() as u8
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.height > 1.0 && self.height < 2.0) {
            return Err(ConfigError::OutOfRange {
                field: "atmosphere.height",
                value: self.height,
                expected: "1 < height < 2",
            });
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::OutOfRange {
                field: "atmosphere.density",
                value: self.density,
                expected: "0..=1",
            });
        }
        if !(self.falloff > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "atmosphere.falloff",
                value: self.falloff,
                expected: "> 0",
            });
        }
        Ok(())
    }
}

pub fn classify_atmosphere(norm_z: f64, atmosphere: &Atmosphere) -> Option<Rgba> {
    match atmosphere.alpha(norm_z) {
        0 => None,
        alpha => Some(atmosphere.color.with_alpha(alpha)),
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// What a rasterized layer shows. Terrain and clouds are noise-textured;
/// the atmosphere depends only on the unrotated normal depth.
#[derive(Debug, Clone, Copy)]
pub enum Shade<'a> {
    Terrain {
        bands: &'a [TerrainBand],
        lod: &'a LevelOfDetail,
    },
    Clouds(&'a Clouds),
    Atmosphere(&'a Atmosphere),
}

impl Shade<'_> {
    /// Level of detail to sample, or `None` for layers without texture
    pub fn lod(&self) -> Option<&LevelOfDetail> {
        match self {
            Self::Terrain { lod, .. } => Some(lod),
            Self::Clouds(clouds) => Some(&clouds.lod),
            Self::Atmosphere(_) => None,
        }
    }

    pub fn classify(&self, noise01: f64, norm_z: f64) -> Option<Rgba> {
        match self {
            Self::Terrain { bands, .. } => classify_terrain(noise01, bands),
            Self::Clouds(clouds) => classify_cloud(noise01, clouds),
            Self::Atmosphere(atmosphere) => classify_atmosphere(norm_z, atmosphere),
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

pub fn earth_bands() -> Vec<TerrainBand> {
    vec![
        TerrainBand::new("deep ocean", Rgb::new(22, 48, 112), 0.45),
        TerrainBand::new("shallows", Rgb::new(40, 92, 160), 0.5),
        TerrainBand::new("beach", Rgb::new(214, 196, 142), 0.52),
        TerrainBand::new("forest", Rgb::new(58, 122, 52), 0.62),
        TerrainBand::new("mountain", Rgb::new(122, 110, 98), f64::INFINITY),
    ]
}

pub fn moon_bands() -> Vec<TerrainBand> {
    vec![
        TerrainBand::new("mare", Rgb::new(88, 88, 94), 0.45),
        TerrainBand::new("highland", Rgb::new(148, 148, 150), 0.58),
        TerrainBand::new("crater rim", Rgb::new(196, 196, 192), f64::INFINITY),
    ]
}

pub fn mars_bands() -> Vec<TerrainBand> {
    vec![
        TerrainBand::new("basin", Rgb::new(132, 52, 28), 0.42),
        TerrainBand::new("plain", Rgb::new(186, 88, 48), 0.56),
        TerrainBand::new("dust", Rgb::new(222, 142, 98), 0.66),
        TerrainBand::new("ice", Rgb::new(236, 228, 220), f64::INFINITY),
    ]
}

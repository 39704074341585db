//! Lighting Model
//!
//! A single directional light orbiting in the x/z plane. The direction is
//! always derived from the angle.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::math3d::Vec3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LightingSpec", into = "LightingSpec")]
pub struct Lighting {
    angle: f64,
    /// Radians per frame; only positive speeds move the light
    pub speed: f64,
    /// Multiplier on the clamped dot product
    pub intensity: f64,
    direction: Vec3,
}

impl Lighting {
    pub fn new(angle: f64, speed: f64, intensity: f64) -> Self {
        Self {
            angle,
            speed,
            intensity,
            direction: Self::direction_for(angle),
        }
    }

    fn direction_for(angle: f64) -> Vec3 {
        Vec3::new(angle.cos(), 0.0, angle.sin())
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Unit vector pointing from the surface toward the light
    #[inline]
    pub fn toward_light(&self) -> Vec3 {
        (-self.direction).normalize()
    }

    /// Move the light one frame. Returns true when the angle wrapped past a
    /// full circle (-2π) during this step.
    pub fn advance(&mut self) -> bool {
        if self.speed <= 0.0 {
            return false;
        }
        self.angle -= self.speed;
        let wrapped = self.angle <= -TAU;
        if wrapped {
            self.angle += TAU;
        }
        self.direction = Self::direction_for(self.angle);
        wrapped
    }

    /// Brightness in [0, intensity] for a surface normal
    #[inline]
    pub fn illumination(&self, normal: Vec3) -> f64 {
        lambert(normal, self.toward_light(), self.intensity)
    }
}

/// Clamped dot product scaled by `intensity`. Normals facing away get 0.
#[inline]
pub fn lambert(normal: Vec3, toward_light: Vec3, intensity: f64) -> f64 {
    normal.dot(&toward_light).max(0.0) * intensity
}

impl Default for Lighting {
    fn default() -> Self {
        // Starts on the dark side
        Self::new(1.5, 0.1, 1.0)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct LightingSpec {
    angle: f64,
    speed: f64,
    intensity: f64,
}

impl Default for LightingSpec {
    fn default() -> Self {
        Lighting::default().into()
    }
}

impl From<LightingSpec> for Lighting {
    fn from(spec: LightingSpec) -> Self {
        Self::new(spec.angle, spec.speed, spec.intensity)
    }
}

impl From<Lighting> for LightingSpec {
    fn from(light: Lighting) -> Self {
        Self {
            angle: light.angle,
            speed: light.speed,
            intensity: light.intensity,
        }
    }
}

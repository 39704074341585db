//! Background star field
//!
//! Stars fade in together: one shared brightness counter grows every frame
//! and is added to each star's base colour, capped at a maximum.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::display::PixelBuffer;
use crate::math3d::Vec2;

/// Base colour channels stay dim so the fade-in is visible
const MAX_BASE_CHANNEL: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistantStar {
    pub color: Rgb,
    pub position: Vec2,
    /// Radius in pixels; 0 is a single pixel
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct StarField {
    pub stars: Vec<DistantStar>,
    brightness: u32,
    pub max_brightness: u8,
}

impl StarField {
    pub fn new(stars: Vec<DistantStar>) -> Self {
        Self {
            stars,
            brightness: 0,
            max_brightness: 100,
        }
    }

    /// `count` stars at random positions inside a `width` x `height` screen
    pub fn scatter<R: Rng + ?Sized>(count: usize, width: u32, height: u32, rng: &mut R) -> Self {
        let stars = (0..count)
            .map(|_| DistantStar {
                color: Rgb::new(
                    rng.random_range(0..=MAX_BASE_CHANNEL),
                    rng.random_range(0..=MAX_BASE_CHANNEL),
                    rng.random_range(0..=MAX_BASE_CHANNEL),
                ),
                position: Vec2::new(
                    rng.random_range(0..width.max(1)) as f64,
                    rng.random_range(0..height.max(1)) as f64,
                ),
                size: u32::from(rng.random_bool(0.15)),
            })
            .collect();
        Self::new(stars)
    }

    pub fn brightness(&self) -> u32 {
        self.brightness
    }

    /// Colour a star is drawn with at the current brightness
    pub fn shade(&self, star: &DistantStar) -> Rgb {
        let max = u32::from(self.max_brightness);
        let channel = |c: u8| (u32::from(c) + self.brightness).min(max) as u8;
        Rgb::new(channel(star.color.r), channel(star.color.g), channel(star.color.b))
    }

    /// Bump the shared brightness once, then paint every star
    pub fn draw(&mut self, screen: &mut PixelBuffer) {
        self.brightness = self.brightness.saturating_add(1);
        for star in &self.stars {
            let (x, y) = star.position.to_pixel();
            screen.fill_circle(x, y, star.size as i32, self.shade(star));
        }
    }
}

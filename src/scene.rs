//! Runtime scene: the screen buffer plus everything drawn on it each frame.

use rand::Rng;
use tracing::info;

use crate::color::Rgb;
use crate::config::SceneConfig;
use crate::display::PixelBuffer;
use crate::error::{AppError, RenderError};
use crate::noise::NoiseSampler;
use crate::planet::Planet;
use crate::raster::Rasterizer;
use crate::stars::StarField;

pub struct Scene {
    screen: PixelBuffer,
    background: Rgb,
    stars: StarField,
    planets: Vec<Planet>,
    rasterizer: Rasterizer,
    frame: u64,
}

impl Scene {
    pub fn from_config<R: Rng + ?Sized>(config: &SceneConfig, rng: &mut R) -> Result<Self, AppError> {
        config.validate()?;
        let planets = config
            .planets
            .iter()
            .cloned()
            .map(Planet::new)
            .collect::<Result<Vec<_>, _>>()?;

        let mut rasterizer =
            Rasterizer::new(NoiseSampler::new(config.noise_seed)).with_chunk_size(config.chunk_size);
        if let Some(threads) = config.threads {
            rasterizer = rasterizer.with_threads(threads)?;
        }

        info!(
            width = config.width,
            height = config.height,
            planets = planets.len(),
            stars = config.star_count,
            chunk_size = ?config.chunk_size,
            threads = ?config.threads,
            "scene built"
        );

        Ok(Self {
            screen: PixelBuffer::with_size(config.width, config.height),
            background: config.background,
            stars: StarField::scatter(config.star_count, config.width, config.height, rng),
            planets,
            rasterizer,
            frame: 0,
        })
    }

    pub fn screen(&self) -> &PixelBuffer {
        &self.screen
    }

    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Background, then stars, then each planet in config order.
    ///
    /// Every planet is rasterized before anything touches the screen. If any
    /// of them fails the frame is dropped whole: the screen still holds the
    /// last good frame and no planet, star or counter has moved.
    pub fn render_frame<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RenderError> {
        let frames = self
            .planets
            .iter()
            .map(|planet| planet.render(&self.rasterizer))
            .collect::<Result<Vec<_>, _>>()?;

        self.screen.clear(self.background);
        self.stars.draw(&mut self.screen);
        for (planet, frame) in self.planets.iter_mut().zip(&frames) {
            planet.commit(frame, &mut self.screen, rng);
        }
        self.frame += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_scene_renders() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scene = Scene::from_config(&SceneConfig::default(), &mut rng).unwrap();
        assert_eq!(scene.planets().len(), 3);
        scene.render_frame(&mut rng).unwrap();
        assert_eq!(scene.frame(), 1);
        assert_eq!(scene.stars().brightness(), 1);
        // Background fill makes every pixel opaque
        let screen = scene.screen();
        assert_eq!(screen.coverage(), (screen.width() * screen.height()) as usize);
    }

    #[test]
    fn test_failed_planet_drops_whole_frame() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut scene = Scene::from_config(&SceneConfig::default(), &mut rng).unwrap();
        scene.render_frame(&mut rng).unwrap();

        let screen = scene.screen().clone();
        let planets: Vec<_> = scene
            .planets()
            .iter()
            .map(|p| (p.lighting().angle(), p.rotation().angle, p.cloud_shift()))
            .collect();

        // Earth renders fine, the moon (radius 22) does not
        assert_eq!(scene.planets()[1].radius(), 22);
        let good = std::mem::replace(
            &mut scene.rasterizer,
            Rasterizer::new(NoiseSampler::new(0)).failing_at(22),
        );
        assert!(matches!(
            scene.render_frame(&mut rng),
            Err(RenderError::ChunkPanicked { .. })
        ));

        assert_eq!(scene.screen(), &screen);
        assert_eq!(scene.frame(), 1);
        assert_eq!(scene.stars().brightness(), 1);
        let after: Vec<_> = scene
            .planets()
            .iter()
            .map(|p| (p.lighting().angle(), p.rotation().angle, p.cloud_shift()))
            .collect();
        assert_eq!(after, planets);

        // The next frame picks up where the last good one left off
        scene.rasterizer = good;
        scene.render_frame(&mut rng).unwrap();
        assert_eq!(scene.frame(), 2);
        assert_ne!(scene.planets()[0].lighting().angle(), planets[0].0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = SceneConfig {
            threads: Some(0),
            ..SceneConfig::default()
        };
        assert!(matches!(
            Scene::from_config(&config, &mut rng),
            Err(AppError::Config(ConfigError::OutOfRange { .. }))
        ));
    }
}

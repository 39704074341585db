//! Drives whole scenes through many frames.

use std::f64::consts::TAU;

use orrery::bands::{Atmosphere, Clouds};
use orrery::color::Rgb;
use orrery::display::{save_png, PixelBuffer};
use orrery::lighting::Lighting;
use orrery::math3d::Vec2;
use orrery::noise::NoiseSampler;
use orrery::rotation::{Axis, AxisSet, Direction, Rotation};
use orrery::{ColorMode, Planet, PlanetConfig, Rasterizer, Scene, SceneConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn small_scene() -> SceneConfig {
    SceneConfig {
        star_count: 20,
        ..SceneConfig::preset(64, 36)
    }
}

#[test]
fn test_chunked_scene_matches_single_chunk_every_frame() {
    let plain_config = small_scene();
    let chunked_config = SceneConfig {
        chunk_size: Some(6),
        threads: Some(4),
        ..small_scene()
    };

    let mut plain_rng = StdRng::seed_from_u64(42);
    let mut chunked_rng = StdRng::seed_from_u64(42);
    let mut plain = Scene::from_config(&plain_config, &mut plain_rng).unwrap();
    let mut chunked = Scene::from_config(&chunked_config, &mut chunked_rng).unwrap();

    // Long enough for the earth's light to reach the dark window
    for frame in 0..70 {
        plain.render_frame(&mut plain_rng).unwrap();
        chunked.render_frame(&mut chunked_rng).unwrap();
        assert_eq!(plain.screen(), chunked.screen(), "frame {}", frame);
    }
    let earth = &plain.planets()[0];
    assert_eq!(earth.name(), "earth");
    assert!(earth.color_changed());
    // The moon's light is ten times slower
    assert!(!plain.planets()[1].color_changed());
}

#[test]
fn test_light_cycle_recolours_once_per_cycle() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut planet = Planet::new(PlanetConfig {
        radius: 5,
        position: Vec2::new(6.0, 6.0),
        color_mode: ColorMode::Change,
        lighting: Lighting::new(0.0, 0.1, 1.0),
        ..PlanetConfig::default()
    })
    .unwrap();
    let rasterizer = Rasterizer::new(NoiseSampler::default());
    let mut screen = PixelBuffer::with_size(12, 12);

    let mut palettes = vec![planet.terrain().to_vec()];
    let frames_per_cycle = (TAU / 0.1).ceil() as usize;
    for _ in 0..(2 * frames_per_cycle + 10) {
        planet.draw(&mut screen, &rasterizer, &mut rng).unwrap();
        if palettes.last().map(Vec::as_slice) != Some(planet.terrain()) {
            palettes.push(planet.terrain().to_vec());
        }
    }
    // Original palette plus one re-roll per cycle
    assert_eq!(palettes.len(), 3);
}

#[test]
fn test_spin_and_drift_without_clouds_or_atmosphere() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut planet = Planet::new(PlanetConfig {
        radius: 8,
        position: Vec2::new(10.0, 10.0),
        clouds: None,
        atmosphere: None,
        color_mode: ColorMode::Solid,
        rotation: Rotation::new(Direction::Right, 0.3, AxisSet::only(Axis::X).with(Axis::Z)),
        ..PlanetConfig::default()
    })
    .unwrap();
    let rasterizer = Rasterizer::new(NoiseSampler::new(3)).with_chunk_size(Some(4));
    let mut screen = PixelBuffer::with_size(20, 20);

    for _ in 0..25 {
        screen.clear(Rgb::BLACK);
        planet.draw(&mut screen, &rasterizer, &mut rng).unwrap();
    }
    let expected = (TAU - (25.0 * 0.3) % TAU) % TAU;
    assert!((planet.rotation().angle - expected).abs() < 1e-9);
    assert_eq!(planet.cloud_shift(), 0.0);
    // Nothing drawn outside the disk
    assert_eq!(screen.get_pixel_rgba(1, 1).map(|p| (p.r, p.g, p.b)), Some((0, 0, 0)));
}

#[test]
fn test_config_file_to_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("scene.json");
    let snapshot_path = dir.path().join("frame.png");

    let mut config = SceneConfig::preset(48, 27);
    config.planets.truncate(1);
    config.planets[0].clouds = Some(Clouds {
        shadow: None,
        ..Clouds::default()
    });
    config.planets[0].atmosphere = Some(Atmosphere {
        density: 1.0,
        ..Atmosphere::default()
    });
    config.save(&config_path).unwrap();

    let loaded = SceneConfig::load(&config_path).unwrap();
    assert_eq!(loaded, config);

    let mut rng = StdRng::seed_from_u64(1);
    let mut scene = Scene::from_config(&loaded, &mut rng).unwrap();
    for _ in 0..3 {
        scene.render_frame(&mut rng).unwrap();
    }
    save_png(scene.screen(), &snapshot_path).unwrap();
    assert!(std::fs::metadata(&snapshot_path).unwrap().len() > 0);
}

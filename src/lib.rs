//! Procedural planet renderer: lit, rotating, noise-textured spheres with
//! clouds and atmospheres, drawn into a software pixel buffer.

pub mod bands;
pub mod color;
pub mod compositor;
pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod lighting;
pub mod logging;
pub mod math3d;
pub mod noise;
pub mod planet;
pub mod raster;
pub mod rotation;
pub mod scene;
pub mod stars;
pub mod util;

pub use config::SceneConfig;
pub use error::{AppError, ConfigError, RenderError};
pub use planet::{ColorMode, Planet, PlanetConfig};
pub use raster::Rasterizer;
pub use scene::Scene;

//! Sphere Rasterizer
//!
//! Shades every pixel of a disk as the front hemisphere of a sphere seen
//! head-on. Normals are analytic; there is no mesh and no projection.
//!
//! Per pixel: disk test, normal, lighting from the unrotated normal, noise at
//! the rotated normal, band lookup, lit color. The bounding square can be cut
//! into rectangular chunks and shaded on a rayon pool; chunking never changes
//! the output.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, error};

use crate::bands::Shade;
use crate::color::{Rgb, Rgba};
use crate::display::PixelBuffer;
use crate::error::RenderError;
use crate::lighting::{lambert, Lighting};
use crate::math3d::{Mat3, Vec3};
use crate::noise::NoiseSampler;
use crate::rotation::{self, Rotation};

/// Everything a chunk worker needs about the current frame, captured once
/// before fan-out so every chunk sees the same angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSnapshot {
    /// Unit vector from the surface toward the light
    pub toward_light: Vec3,
    pub intensity: f64,
    /// Texture rotation; `None` skips the transform
    pub rotation: Option<Mat3>,
    /// Noise domain offset (cloud drift)
    pub shift: f64,
}

impl FrameSnapshot {
    pub fn capture(lighting: &Lighting, rotation: Option<&Rotation>, shift: f64) -> Self {
        Self {
            toward_light: lighting.toward_light(),
            intensity: lighting.intensity,
            rotation: rotation.and_then(Rotation::matrix),
            shift,
        }
    }

    /// Same value `Lighting::illumination` gives for the captured light
    #[inline]
    pub fn illumination(&self, normal: Vec3) -> f64 {
        lambert(normal, self.toward_light, self.intensity)
    }

    /// Normal in texture space, where noise is sampled
    #[inline]
    pub fn texture_normal(&self, normal: Vec3) -> Vec3 {
        rotation::apply(self.rotation.as_ref(), normal)
    }
}

/// Half-open rectangle `[x0, x1) x [y0, y1)` of disk-centered pixel offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Chunk {
    pub fn area(&self) -> usize {
        ((self.x1 - self.x0).max(0) * (self.y1 - self.y0).max(0)) as usize
    }
}

/// Tile the bounding square `[-radius, radius)^2` with chunks of at most
/// `chunk_size` pixels per side. `None` or zero gives a single chunk.
pub fn split_square(radius: i32, chunk_size: Option<u32>) -> Vec<Chunk> {
    if radius <= 0 {
        return Vec::new();
    }
    let size = match chunk_size {
        Some(size) if size > 0 => size as usize,
        _ => (2 * radius) as usize,
    };
    let mut chunks = Vec::new();
    for y0 in (-radius..radius).step_by(size) {
        for x0 in (-radius..radius).step_by(size) {
            chunks.push(Chunk {
                x0,
                y0,
                x1: (x0 + size as i32).min(radius),
                y1: (y0 + size as i32).min(radius),
            });
        }
    }
    chunks
}

/// One shaded pixel, in layer coordinates `0..2 * radius`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub x: i32,
    pub y: i32,
    pub color: Rgba,
}

/// A rendered sphere surface, transparent outside the disk
#[derive(Debug, Clone)]
pub struct Layer {
    pub radius: i32,
    pub buffer: PixelBuffer,
}

impl Layer {
    pub fn empty(radius: i32) -> Self {
        let side = (2 * radius.max(0)) as u32;
        Self {
            radius,
            buffer: PixelBuffer::with_size(side, side),
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgba> {
        self.buffer.get_pixel_rgba(x, y)
    }
}

/// Front-hemisphere unit normal at disk offset (x, y), or `None` outside
/// the disk.
#[inline]
pub fn hemisphere_normal(x: i32, y: i32, radius: i32) -> Option<Vec3> {
    let (x, y, r) = (x as i64, y as i64, radius as i64);
    if x * x + y * y > r * r || radius <= 0 {
        return None;
    }
    let inv_radius = 1.0 / radius as f64;
    let norm_x = x as f64 * inv_radius;
    let norm_y = y as f64 * inv_radius;
    let norm_z = (1.0 - norm_x * norm_x - norm_y * norm_y).max(0.0).sqrt();
    Some(Vec3::new(norm_x, norm_y, norm_z))
}

// ============================================================================
// Rasterizer
// ============================================================================

pub struct Rasterizer {
    sampler: NoiseSampler,
    chunk_size: Option<u32>,
    pool: Option<rayon::ThreadPool>,
    #[cfg(test)]
    fail_radius: Option<i32>,
}

impl Rasterizer {
    /// Single-chunk, single-threaded rasterizer
    pub fn new(sampler: NoiseSampler) -> Self {
        Self {
            sampler,
            chunk_size: None,
            pool: None,
            #[cfg(test)]
            fail_radius: None,
        }
    }

    /// Make every chunk of a sphere of `radius` panic
    #[cfg(test)]
    pub(crate) fn failing_at(mut self, radius: i32) -> Self {
        self.fail_radius = Some(radius);
        self
    }

    #[cfg(test)]
    fn check_forced_failure(&self, radius: i32) {
        if self.fail_radius == Some(radius) {
            panic!("forced failure at radius {}", radius);
        }
    }

    /// Split each sphere into chunks of `size` pixels per side
    pub fn with_chunk_size(mut self, size: Option<u32>) -> Self {
        self.chunk_size = size.filter(|&s| s > 0);
        self
    }

    /// Run chunks on a dedicated pool of `threads` workers instead of
    /// rayon's global pool
    pub fn with_threads(mut self, threads: usize) -> Result<Self, RenderError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("orrery-raster-{}", i))
            .build()?;
        self.pool = Some(pool);
        Ok(self)
    }

    pub fn sampler(&self) -> &NoiseSampler {
        &self.sampler
    }

    pub fn chunk_size(&self) -> Option<u32> {
        self.chunk_size
    }

    /// Shade one pixel. `None` means the offset is outside the disk and
    /// nothing is written; a transparent color is still a write.
    pub fn shade_pixel(
        &self,
        x: i32,
        y: i32,
        radius: i32,
        shade: &Shade,
        frame: &FrameSnapshot,
    ) -> Option<Rgba> {
        let normal = hemisphere_normal(x, y, radius)?;

        // Lighting uses the unrotated normal: the light does not spin with
        // the planet
        let power = frame.illumination(normal);

        let noise01 = match shade.lod() {
            Some(lod) => self
                .sampler
                .sample01(frame.texture_normal(normal), lod, frame.shift),
            None => 0.0,
        };

        Some(match shade.classify(noise01, normal.z) {
            Some(texel) if texel.a > 0 => {
                Rgb::new(texel.r, texel.g, texel.b)
                    .lit(power)
                    .with_alpha(texel.a)
            },
            _ => Rgba::TRANSPARENT,
        })
    }

    pub fn render_chunk(
        &self,
        chunk: Chunk,
        radius: i32,
        shade: &Shade,
        frame: &FrameSnapshot,
    ) -> Vec<Fragment> {
        #[cfg(test)]
        self.check_forced_failure(radius);

        let mut fragments = Vec::with_capacity(chunk.area());
        for y in chunk.y0..chunk.y1 {
            for x in chunk.x0..chunk.x1 {
                if let Some(color) = self.shade_pixel(x, y, radius, shade, frame) {
                    fragments.push(Fragment {
                        x: x + radius,
                        y: y + radius,
                        color,
                    });
                }
            }
        }
        fragments
    }

    /// Map `f` over `chunks`, in parallel when there is more than one.
    /// Results keep chunk order. A panicking chunk fails the whole call.
    pub fn map_chunks<T, F>(&self, chunks: &[Chunk], f: F) -> Result<Vec<T>, RenderError>
    where
        T: Send,
        F: Fn(Chunk) -> T + Sync,
    {
        let guarded = |chunk: Chunk| {
            panic::catch_unwind(AssertUnwindSafe(|| f(chunk))).map_err(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(?chunk, %message, "render chunk failed");
                RenderError::ChunkPanicked {
                    x0: chunk.x0,
                    y0: chunk.y0,
                    x1: chunk.x1,
                    y1: chunk.y1,
                    message,
                }
            })
        };

        if chunks.len() <= 1 {
            return chunks.iter().map(|&c| guarded(c)).collect();
        }
        let run = || -> Result<Vec<T>, RenderError> {
            chunks.par_iter().map(|&c| guarded(c)).collect()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// All fragments of a sphere of `radius`, chunk by chunk
    pub fn render_fragments(
        &self,
        radius: i32,
        shade: &Shade,
        frame: &FrameSnapshot,
    ) -> Result<Vec<Fragment>, RenderError> {
        let chunks = split_square(radius, self.chunk_size);
        let per_chunk =
            self.map_chunks(&chunks, |chunk| self.render_chunk(chunk, radius, shade, frame))?;
        Ok(per_chunk.into_iter().flatten().collect())
    }

    /// Render a sphere into a fresh transparent layer of side `2 * radius`
    pub fn render(
        &self,
        radius: i32,
        shade: &Shade,
        frame: &FrameSnapshot,
    ) -> Result<Layer, RenderError> {
        let fragments = self.render_fragments(radius, shade, frame)?;
        debug!(radius, fragments = fragments.len(), "sphere rasterized");
        let mut layer = Layer::empty(radius);
        for fragment in fragments {
            layer
                .buffer
                .set_pixel_rgba(fragment.x, fragment.y, fragment.color);
        }
        Ok(layer)
    }
}

use super::MAX_SIDE;
use crate::color::{Rgb, Rgba};

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], c: Rgba) {
    dest[0] = c.a;
    dest[1] = c.b;
    dest[2] = c.g;
    dest[3] = c.r;
}

#[inline]
fn read_pixel(src: &[u8]) -> Rgba {
    Rgba::new(src[3], src[2], src[1], src[0])
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 pixel buffer for software rendering.
/// Used both for the screen and for the transparent per-layer sphere surfaces.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Fully transparent buffer. Sides are clamped to `MAX_SIDE`.
    pub fn with_size(width: u32, height: u32) -> Self {
        let (width, height) = (width.min(MAX_SIDE), height.min(MAX_SIDE));
        Self {
            pixels: vec![0; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if coordinates are within bounds
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Clear to an opaque color
    pub fn clear(&mut self, color: Rgb) {
        self.clear_rgba(color.with_alpha(255));
    }

    /// Clear to any color including transparent
    /// Optimized: uses u32 fill for maximum speed
    pub fn clear_rgba(&mut self, color: Rgba) {
        let pixel = u32::from_ne_bytes([color.a, color.b, color.g, color.r]);

        // Safety: pixels.len() is always divisible by 4 (width * height * 4).
        // We use write_unaligned to avoid assuming alignment of Vec<u8>.
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;
        for i in 0..len {
            // Safety: i < len ensures we stay within bounds
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set a single pixel including alpha (bounds checked)
    #[inline]
    pub fn set_pixel_rgba(&mut self, x: i32, y: i32, color: Rgba) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], color);
        }
    }

    /// Read all 4 channels of a pixel (bounds checked)
    /// Returns None if out of bounds
    #[inline]
    pub fn get_pixel_rgba(&self, x: i32, y: i32) -> Option<Rgba> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some(read_pixel(&self.pixels[idx..idx + 4]))
        } else {
            None
        }
    }

    /// Multiply a pixel's RGB by `factor`, rounding; alpha is untouched
    #[inline]
    pub fn scale_rgb(&mut self, x: i32, y: i32, factor: f64) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            for c in &mut self.pixels[idx + 1..idx + 4] {
                *c = (*c as f64 * factor).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    /// Draw a horizontal line of an opaque color
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, color: Rgb) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let x1 = x1.max(0);
        let x2 = x2.min(self.width as i32 - 1);
        if x1 > x2 {
            return;
        }
        let mut idx = self.pixel_index(x1 as u32, y as u32);
        let opaque = color.with_alpha(255);
        for _ in x1..=x2 {
            write_pixel(&mut self.pixels[idx..idx + 4], opaque);
            idx += 4;
        }
    }

    /// Draw a filled circle using horizontal spans (much faster than pixel-by-pixel)
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb) {
        if radius <= 0 {
            if radius == 0 {
                self.set_pixel_rgba(cx, cy, color.with_alpha(255));
            }
            return;
        }

        // Midpoint circle algorithm with span filling
        let mut x = radius;
        let mut y = 0;
        let mut err = 1 - radius;

        while x >= y {
            // Fill horizontal spans for 4 quadrants, avoiding duplicates
            self.hline(cx - x, cx + x, cy + y, color);
            if y != 0 {
                self.hline(cx - x, cx + x, cy - y, color);
            }
            if x != y {
                self.hline(cx - y, cx + y, cy + x, color);
                if y != 0 {
                    self.hline(cx - y, cx + y, cy - x, color);
                }
            }

            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    // ========================================================================
    // Buffer Operations
    // ========================================================================

    /// Composite a source buffer onto this one using per-pixel source alpha
    /// (source-over). Skips fully transparent pixels; fast-copies fully
    /// opaque ones.
    pub fn composite(&mut self, src: &PixelBuffer, dst_x: i32, dst_y: i32) {
        let src_w = src.width() as i32;
        let src_h = src.height() as i32;
        let dst_w = self.width as i32;
        let dst_h = self.height as i32;

        for sy in 0..src_h {
            let dy = dst_y + sy;
            if dy < 0 || dy >= dst_h {
                continue;
            }

            for sx in 0..src_w {
                let dx = dst_x + sx;
                if dx < 0 || dx >= dst_w {
                    continue;
                }

                let si = src.pixel_index(sx as u32, sy as u32);
                let s = read_pixel(&src.pixels[si..si + 4]);
                if s.a == 0 {
                    continue;
                }

                let di = self.pixel_index(dx as u32, dy as u32);
                if s.a == 255 {
                    write_pixel(&mut self.pixels[di..di + 4], s);
                } else {
                    let alpha = s.a as u16;
                    let dst_a = self.pixels[di];
                    self.pixels[di] = dst_a.max(s.a);
                    self.pixels[di + 1] = blend_channel(s.b, self.pixels[di + 1], alpha);
                    self.pixels[di + 2] = blend_channel(s.g, self.pixels[di + 2], alpha);
                    self.pixels[di + 3] = blend_channel(s.r, self.pixels[di + 3], alpha);
                }
            }
        }
    }

    /// Raw ABGR bytes, as the SDL RGBA8888 streaming texture expects
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes in R, G, B, A order for image encoders
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|p| [p[3], p[2], p[1], p[0]])
            .collect()
    }

    /// Number of pixels with non-zero alpha
    pub fn coverage(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[0] != 0).count()
    }
}

//! Compositor
//!
//! Darkens terrain under clouds and stacks the layers of one planet onto the
//! screen. Layer order is fixed: terrain, clouds, atmosphere.

use crate::bands::CloudShadow;
use crate::display::PixelBuffer;
use crate::math3d::Vec3;
use crate::raster::Layer;

/// Darken every terrain pixel that has a cloud above it, looking toward the
/// light. Clouds sit on a larger shell, so terrain coordinates are first moved
/// into the cloud layer's frame, then displaced by `toward_light * tilt`.
/// Lookups that fall outside the cloud layer count as clear sky.
pub fn apply_cloud_shadow(
    terrain: &mut Layer,
    clouds: &Layer,
    toward_light: Vec3,
    shadow: &CloudShadow,
) {
    let inset = clouds.radius - terrain.radius;
    let dx = (toward_light.x * shadow.tilt).round() as i32;
    let dy = (toward_light.y * shadow.tilt).round() as i32;

    let side = terrain.buffer.width() as i32;
    for ty in 0..side {
        for tx in 0..side {
            let covered = terrain
                .buffer
                .get_pixel_rgba(tx, ty)
                .is_some_and(|p| !p.is_transparent());
            if !covered {
                continue;
            }
            let overhead = clouds.get(tx + inset + dx, ty + inset + dy);
            if overhead.is_some_and(|c| !c.is_transparent()) {
                terrain.buffer.scale_rgb(tx, ty, shadow.intensity);
            }
        }
    }
}

/// Alpha-composite each present layer centred on `center`
pub fn composite_layers(
    screen: &mut PixelBuffer,
    center: (i32, i32),
    terrain: Option<&Layer>,
    clouds: Option<&Layer>,
    atmosphere: Option<&Layer>,
) {
    let (cx, cy) = center;
    for layer in [terrain, clouds, atmosphere].into_iter().flatten() {
        screen.composite(&layer.buffer, cx - layer.radius, cy - layer.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Rgb, Rgba};

    fn solid_layer(radius: i32, color: Rgba) -> Layer {
        let mut layer = Layer::empty(radius);
        layer.buffer.clear_rgba(color);
        layer
    }

    #[test]
    fn test_shadow_darkens_terrain_under_cloud() {
        let mut terrain = solid_layer(4, Rgba::new(200, 200, 200, 255));
        let clouds = solid_layer(4, Rgba::new(255, 255, 255, 255));
        let shadow = CloudShadow {
            intensity: 0.7,
            tilt: 0.0,
        };
        apply_cloud_shadow(&mut terrain, &clouds, Vec3::new(1.0, 0.0, 0.0), &shadow);
        assert_eq!(terrain.get(3, 3), Some(Rgba::new(140, 140, 140, 255)));
    }

    #[test]
    fn test_shadow_offset_follows_light() {
        let mut terrain = solid_layer(3, Rgba::new(100, 100, 100, 255));
        // One opaque cloud pixel, at x = 4 of a 6 wide layer
        let mut clouds = Layer::empty(3);
        clouds.buffer.set_pixel_rgba(4, 2, Rgba::new(255, 255, 255, 200));
        let shadow = CloudShadow {
            intensity: 0.5,
            tilt: 2.0,
        };
        apply_cloud_shadow(&mut terrain, &clouds, Vec3::new(1.0, 0.0, 0.0), &shadow);
        // Terrain at x = 2 looks two pixels toward the light
        assert_eq!(terrain.get(2, 2), Some(Rgba::new(50, 50, 50, 255)));
        assert_eq!(terrain.get(4, 2), Some(Rgba::new(100, 100, 100, 255)));
        // Lookup past the cloud edge is clear sky
        assert_eq!(terrain.get(5, 2), Some(Rgba::new(100, 100, 100, 255)));
    }

    #[test]
    fn test_shadow_maps_into_larger_cloud_shell() {
        let mut terrain = solid_layer(2, Rgba::new(200, 100, 50, 255));
        let mut clouds = Layer::empty(4);
        // Cloud shell center is (4, 4); terrain center (2, 2) sits under it
        clouds.buffer.set_pixel_rgba(4, 4, Rgba::new(255, 255, 255, 255));
        let shadow = CloudShadow {
            intensity: 0.5,
            tilt: 0.0,
        };
        apply_cloud_shadow(&mut terrain, &clouds, Vec3::new(0.0, 0.0, 1.0), &shadow);
        assert_eq!(terrain.get(2, 2), Some(Rgba::new(100, 50, 25, 255)));
        assert_eq!(terrain.get(1, 2), Some(Rgba::new(200, 100, 50, 255)));
    }

    #[test]
    fn test_transparent_terrain_is_untouched() {
        let mut terrain = Layer::empty(2);
        let clouds = solid_layer(2, Rgba::new(255, 255, 255, 255));
        apply_cloud_shadow(
            &mut terrain,
            &clouds,
            Vec3::zero(),
            &CloudShadow::default(),
        );
        assert_eq!(terrain.buffer.coverage(), 0);
    }

    #[test]
    fn test_composite_order_and_centering() {
        let mut screen = PixelBuffer::with_size(10, 10);
        screen.clear(Rgb::BLACK);
        let terrain = solid_layer(2, Rgba::new(0, 255, 0, 255));
        let clouds = solid_layer(3, Rgba::new(255, 0, 0, 255));
        composite_layers(&mut screen, (5, 5), Some(&terrain), Some(&clouds), None);
        // Clouds land on top of terrain
        assert_eq!(screen.get_pixel_rgba(5, 5), Some(Rgba::new(255, 0, 0, 255)));
        // Cloud layer spans [2, 8)
        assert_eq!(screen.get_pixel_rgba(2, 2), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(screen.get_pixel_rgba(8, 8), Some(Rgba::new(0, 0, 0, 255)));
    }

    #[test]
    fn test_composite_without_layers_is_noop() {
        let mut screen = PixelBuffer::with_size(4, 4);
        composite_layers(&mut screen, (2, 2), None, None, None);
        assert_eq!(screen.coverage(), 0);
    }
}

mod pixel_buffer;
mod snapshot;
#[cfg(feature = "window")]
mod window;

pub use pixel_buffer::PixelBuffer;
pub use snapshot::save_png;
#[cfg(feature = "window")]
pub use window::{Display, InputEvent, RenderTarget};

pub const DEFAULT_WIDTH: u32 = 192;
pub const DEFAULT_HEIGHT: u32 = 108;

/// Largest buffer side, in pixels, for the screen and every sphere layer
pub const MAX_SIDE: u32 = 16384;

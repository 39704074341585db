//! PNG snapshots for headless runs

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::PixelBuffer;
use crate::error::AppError;

/// Write `buffer` as an 8-bit RGBA PNG
pub fn save_png(buffer: &PixelBuffer, path: impl AsRef<Path>) -> Result<(), AppError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| AppError::Snapshot {
        path: path.display().to_string(),
        source,
    })?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), buffer.width(), buffer.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&buffer.to_rgba_bytes())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn test_png_has_buffer_size_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut buffer = PixelBuffer::with_size(5, 3);
        buffer.set_pixel_rgba(1, 2, Rgba::new(9, 8, 7, 255));
        save_png(&buffer, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data).unwrap();
        assert_eq!((info.width, info.height), (5, 3));
        let idx = (2 * 5 + 1) * 4;
        assert_eq!(&data[idx..idx + 4], &[9, 8, 7, 255]);
    }

    #[test]
    fn test_unwritable_path_reports_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = PixelBuffer::with_size(1, 1);
        let result = save_png(&buffer, dir.path().join("missing/frame.png"));
        assert!(matches!(result, Err(AppError::Snapshot { .. })));
    }
}

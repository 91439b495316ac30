//! Image encoding: rendered card → PNG bytes.
//!
//! Uses the `image` crate's PNG encoder with its default compression. Cards
//! are flat colour plus anti-aliased text, which PNG stores losslessly and
//! compactly.

use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered card as PNG.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} card → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

//! RGB payload to RGBA raster conversion.
//!
//! The decoder emits tightly packed `R,G,B` triples, row-major from the top
//! left. Displays want four channels, so every triple becomes `R,G,B,255`.
//! Pixels the payload does not cover stay [`BLANK_PIXEL`].

use shared::{domain::Dimensions, error::ViewerError};

pub const RGB_CHANNELS: usize = 3;
pub const RGBA_CHANNELS: usize = 4;
pub const OPAQUE: u8 = 255;
pub const BLANK_PIXEL: [u8; RGBA_CHANNELS] = [0, 0, 0, 0];

#[derive(Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    dimensions: Dimensions,
    data: Vec<u8>,
}

impl std::fmt::Debug for RasterBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBuffer")
            .field("dimensions", &self.dimensions)
            .field("len", &self.data.len())
            .finish()
    }
}

impl RasterBuffer {
    pub fn blank(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            data: BLANK_PIXEL.repeat(dimensions.pixel_count()),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; RGBA_CHANNELS]> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let offset = (y as usize * self.dimensions.width as usize + x as usize) * RGBA_CHANNELS;
        let mut pixel = [0; RGBA_CHANNELS];
        pixel.copy_from_slice(&self.data[offset..offset + RGBA_CHANNELS]);
        Some(pixel)
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub raster: RasterBuffer,
    pub pixels_written: usize,
}

impl Conversion {
    pub fn pixels_expected(&self) -> usize {
        self.raster.dimensions().pixel_count()
    }

    pub fn is_complete(&self) -> bool {
        self.pixels_written == self.pixels_expected()
    }

    /// `ShortPixelPayload` when the payload did not fill the raster.
    pub fn shortfall(&self) -> Option<ViewerError> {
        (!self.is_complete()).then(|| ViewerError::ShortPixelPayload {
            received: self.pixels_written,
            expected: self.pixels_expected(),
        })
    }
}

/// Converts as many complete triples as fit the raster. A trailing partial
/// triple and anything past `width * height` pixels are ignored.
pub fn convert(pixels: &[u8], dimensions: Dimensions) -> Conversion {
    let mut raster = RasterBuffer::blank(dimensions);
    let pixels_written = write_rgb(&mut raster.data, pixels);
    Conversion {
        raster,
        pixels_written,
    }
}

/// Writes RGB triples into an RGBA slice and returns the number of pixels
/// written.
pub fn write_rgb(rgba: &mut [u8], rgb: &[u8]) -> usize {
    let mut written = 0;
    for (dst, src) in rgba
        .chunks_exact_mut(RGBA_CHANNELS)
        .zip(rgb.chunks_exact(RGB_CHANNELS))
    {
        dst[..RGB_CHANNELS].copy_from_slice(src);
        dst[RGB_CHANNELS] = OPAQUE;
        written += 1;
    }
    written
}

#[cfg(test)]
#[path = "tests/pixels_tests.rs"]
mod tests;

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Pixel format reported by the camera.

/// Concrete grayscale format read from the interface attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    /// ROI width in pixels.
    pub width: u32,

    /// ROI height in pixels.
    pub height: u32,

    /// Significant bits per pixel.
    pub bits_per_pixel: u32,

    /// Storage bits per pixel (bytes-per-pixel × 8).
    pub depth: u32,
}

impl CameraFormat {
    /// Bytes occupied by one frame: `width * height * (depth / 8)`.
    pub fn frame_size(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul((self.depth / 8) as usize)
    }

    /// Multi-byte samples are stored little-endian by the driver.
    pub fn is_multi_byte(&self) -> bool {
        self.depth > 8
    }
}

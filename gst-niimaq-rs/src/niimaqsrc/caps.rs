//! Caps Handling for NI-IMAQ Source
//!
//! The element offers two grayscale layouts: 8-bit samples, and 10 to 16-bit
//! samples stored in 16-bit little-endian words. Besides the standard
//! `video/x-raw` fields the structures carry `bpp` (significant bits) and
//! `depth` (storage bits), which the element needs to size frames.

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

use gstreamer as gst;
use gstreamer_video as gst_video;

use gst_video::VideoFormat;
use imaq::CameraFormat;

/// Byte order marker for little-endian samples.
pub const LITTLE_ENDIAN: i32 = 1234;

/// Errors raised while reading negotiated caps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapsError {
    /// The caps hold no structure.
    #[error("Caps are empty")]
    Empty,

    /// A mandatory field is absent.
    #[error("Caps are missing the '{0}' field")]
    MissingField(&'static str),

    /// A mandatory field has the wrong type or a negative value.
    #[error("Caps field '{0}' has an invalid value")]
    InvalidField(&'static str),
}

/// Fully negotiated output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub rate_num: i32,
    pub rate_den: i32,
    /// Storage bits per pixel.
    pub depth: u32,
    /// Significant bits per pixel.
    pub bpp: u32,
}

impl NegotiatedFormat {
    /// Bytes per frame: `width * height * (depth / 8)`.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * (self.depth / 8) as usize
    }

    pub fn framerate(&self) -> gst::Fraction {
        gst::Fraction::new(self.rate_num, self.rate_den)
    }
}

fn any_framerate() -> gst::FractionRange {
    gst::FractionRange::new(gst::Fraction::new(0, 1), gst::Fraction::new(i32::MAX, 1))
}

fn any_dimension() -> gst::IntRange<i32> {
    gst::IntRange::new(1, i32::MAX)
}

/// Formats the element can produce, independent of any hardware.
pub fn advertised_formats() -> gst::Caps {
    let mut caps = gst::Caps::new_empty();
    {
        let caps = caps.make_mut();
        caps.append_structure(
            gst::Structure::builder("video/x-raw")
                .field("format", VideoFormat::Gray8.to_string())
                .field("bpp", 8i32)
                .field("depth", 8i32)
                .field("width", any_dimension())
                .field("height", any_dimension())
                .field("framerate", any_framerate())
                .build(),
        );
        caps.append_structure(
            gst::Structure::builder("video/x-raw")
                .field("format", VideoFormat::Gray16Le.to_string())
                .field("bpp", gst::IntRange::new(10i32, 16i32))
                .field("depth", 16i32)
                .field("endianness", LITTLE_ENDIAN)
                .field("width", any_dimension())
                .field("height", any_dimension())
                .field("framerate", any_framerate())
                .build(),
        );
    }
    caps
}

/// Caps describing exactly what the camera delivers.
///
/// The frame rate is left open; the camera does not report one.
pub fn camera_caps(format: &CameraFormat) -> gst::Caps {
    let dimension = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);

    let mut builder = gst::Caps::builder("video/x-raw")
        .field("format", video_format(format.depth).to_string())
        .field("width", dimension(format.width))
        .field("height", dimension(format.height))
        .field("bpp", dimension(format.bits_per_pixel))
        .field("depth", dimension(format.depth))
        .field("framerate", any_framerate());
    if format.is_multi_byte() {
        builder = builder.field("endianness", LITTLE_ENDIAN);
    }
    builder.build()
}

/// Reads the output format from fixed caps.
///
/// `width`, `height`, `depth`, `bpp` and `framerate` are all mandatory.
pub fn parse_negotiated(caps: &gst::CapsRef) -> Result<NegotiatedFormat, CapsError> {
    let structure = caps.structure(0).ok_or(CapsError::Empty)?;

    let get = |name: &'static str| -> Result<u32, CapsError> {
        if !structure.has_field(name) {
            return Err(CapsError::MissingField(name));
        }
        structure
            .get::<i32>(name)
            .ok()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or(CapsError::InvalidField(name))
    };

    let width = get("width")?;
    let height = get("height")?;
    let depth = get("depth")?;
    let bpp = get("bpp")?;

    if !structure.has_field("framerate") {
        return Err(CapsError::MissingField("framerate"));
    }
    let framerate = structure
        .get::<gst::Fraction>("framerate")
        .map_err(|_| CapsError::InvalidField("framerate"))?;

    Ok(NegotiatedFormat {
        width,
        height,
        rate_num: framerate.numer(),
        rate_den: framerate.denom(),
        depth,
        bpp,
    })
}

/// Output format name for a storage depth.
pub fn video_format(depth: u32) -> VideoFormat {
    if depth > 8 {
        VideoFormat::Gray16Le
    } else {
        VideoFormat::Gray8
    }
}

//! NI-IMAQ Source Element
//!
//! This module implements `niimaqsrc`, a live GStreamer source that acquires
//! frames from an NI-IMAQ frame grabber.
//!
//! ## Responsibilities
//! - Opens the configured interface and sets up a ring of driver buffers
//! - Advertises the camera's grayscale format during caps negotiation
//! - Copies each completed frame into a GStreamer buffer and timestamps it
//! - Counts and reports frames the driver overwrote before they were read
//!
//! ## Properties
//! - `interface`: interface to open, e.g. `img0` or `img1::0` (set before PLAYING)
//! - `timestamp-offset`: offset added to every timestamp, in nanoseconds
//! - `buffer-size`: number of buffers in the driver ring (set before PLAYING)
//! - `frames`, `dropped-frames`: read-only frame counters
//! - `interfaces`: read-only list of the available interfaces
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 niimaqsrc interface=img0 buffer-size=16 ! \
//!     videoconvert ! autovideosink
//! ```

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

// Copyright (C) 2020 Sebastian Dröge <sebastian@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;

use imaq::ImaqDriver;

/// Caps advertisement and parsing
pub mod caps;

/// Video buffer creation (copies a frame out of the ring, timestamps it)
mod create_video;

/// Core implementation (properties, state management, GStreamer trait impls)
mod imp;

/// Unit and integration tests for niimaqsrc
#[cfg(test)]
mod src_tests;

/// State structures (settings, acquisition state, timestamping)
pub mod state;

glib::wrapper! {
    pub struct NiImaqSrc(ObjectSubclass<imp::NiImaqSrc>) @extends gst_base::PushSrc, gst_base::BaseSrc, gst::Element, gst::Object;
}

impl NiImaqSrc {
    /// Uses `driver` instead of loading the NI-IMAQ library on start.
    ///
    /// Takes effect on the next start; the cached interface list is dropped.
    pub fn set_driver(&self, driver: ImaqDriver) {
        self.imp().set_driver(driver);
    }
}

/// Registers the niimaqsrc element with GStreamer.
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "niimaqsrc",
        gst::Rank::NONE, // Not auto-selected during autoplugging
        NiImaqSrc::static_type(),
    )
}

//! GStreamer Plugin for NI-IMAQ frame grabbers
//!
//! This crate implements a GStreamer plugin providing the `niimaqsrc` element,
//! a live source that acquires grayscale frames from a Camera-Link or analog
//! frame grabber through the NI-IMAQ driver.
//!
//! ## Supported Media Formats
//! - **GRAY8**: 8-bit cameras
//! - **GRAY16_LE**: 10 to 16-bit cameras, stored little-endian
//!
//! ## Driver Library
//! The NI-IMAQ library is loaded at runtime when the element starts, from
//! `IMAQ_LIBRARY_PATH` or the platform default (`libimaq.so` / `imaq.dll`).

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

// Copyright (C) 2017 Sebastian Dröge <sebastian@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::non_send_fields_in_send_ty, unused_doc_comments)]

use gst::glib;
use gstreamer as gst;

/// NI-IMAQ source element (acquires frames, produces GStreamer buffers)
pub mod niimaqsrc;

/// Registers the plugin's elements with GStreamer.
fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    niimaqsrc::register(plugin)?;

    Ok(())
}

gst::plugin_define!(
    niimaq,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("COMMIT_ID")),
    "Apache-2.0",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    env!("BUILD_REL_DATE")
);

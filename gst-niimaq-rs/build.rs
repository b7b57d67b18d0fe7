//! Build Script for gst-niimaq-rs
//!
//! Generates version information for the GStreamer plugin using
//! `gst_plugin_version_helper`.
//!
//! ## Generated Environment Variables
//! - `COMMIT_ID`: Git commit hash (for version string)
//! - `BUILD_REL_DATE`: Build date (for plugin metadata)

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

fn main() {
    gst_plugin_version_helper::info()
}

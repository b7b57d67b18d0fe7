//! NI-IMAQ Source Implementation
//!
//! This module contains the core implementation of the niimaqsrc GStreamer
//! element. It implements GStreamer's PushSrc trait (a type of BaseSrc),
//! handling:
//! - Element lifecycle (start/stop open and close the acquisition)
//! - Property management (interface, buffer-size, timestamp-offset, counters)
//! - Caps negotiation (camera format in, fixed grayscale caps out)
//! - Buffer creation (one copied frame per create())
//!
//! ## Implementation Structure
//! - `NiImaqSrc`: The struct holding element state (settings, context, driver)
//! - `ObjectImpl`: GObject property system integration
//! - `ElementImpl`: GStreamer element metadata and pad templates
//! - `BaseSrcImpl`: Source-specific behavior (start, stop, caps, set_caps, times)
//! - `PushSrcImpl`: On-demand buffer creation via create()

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

// Copyright (C) 2018 Sebastian Dröge <sebastian@centricular.com>
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
use gst_base::prelude::*;
use gst_base::subclass::base_src::CreateSuccess;
use gst_base::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::trace;

use std::sync::LazyLock;
use std::sync::Mutex;

use imaq::{AcquisitionManager, FrameStats, ImaqDriver, InterfaceCache, config};

use crate::niimaqsrc;
use crate::niimaqsrc::caps;
use crate::niimaqsrc::create_video::create_video;
use crate::niimaqsrc::state::{Context, FrameClock, Settings, State};

/// GStreamer debug category for logging niimaqsrc-specific messages
pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "niimaqsrc",
        gst::DebugColorFlags::empty(),
        Some("NI-IMAQ Source"),
    )
});

/// NI-IMAQ source element implementation.
///
/// Fields are wrapped in Mutex for thread safety (GStreamer may call methods
/// from multiple threads). Lock order: settings, context, driver, interfaces.
#[derive(Default)]
pub struct NiImaqSrc {
    /// User-configurable properties
    pub settings: Mutex<Settings>,

    /// Runtime state (acquisition manager, negotiated format, counters)
    pub context: Mutex<Context>,

    /// Driver in use, loaded on first start unless injected
    driver: Mutex<Option<ImaqDriver>>,

    /// Interfaces found by the last enumeration
    interfaces: Mutex<InterfaceCache>,
}

#[glib::object_subclass]
impl ObjectSubclass for NiImaqSrc {
    const NAME: &'static str = "GstRsNiImaqSrc";
    type Type = niimaqsrc::NiImaqSrc;
    type ParentType = gst_base::PushSrc;
}

impl ObjectImpl for NiImaqSrc {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: LazyLock<Vec<glib::ParamSpec>> = LazyLock::new(|| {
            vec![
                glib::ParamSpecString::builder("interface")
                    .nick("Interface")
                    .blurb("NI-IMAQ interface to open")
                    .default_value(config::DEFAULT_INTERFACE)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecInt64::builder("timestamp-offset")
                    .nick("Timestamp offset")
                    .blurb("An offset added to timestamps set on buffers (in ns)")
                    .default_value(0)
                    .build(),
                glib::ParamSpecInt::builder("buffer-size")
                    .nick("Ring buffer size")
                    .blurb("Number of buffers in the driver ring")
                    .minimum(1)
                    .maximum(i32::MAX)
                    .default_value(config::DEFAULT_BUFFER_COUNT as i32)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecUInt64::builder("frames")
                    .nick("Frames")
                    .blurb("Number of frames delivered")
                    .read_only()
                    .build(),
                glib::ParamSpecUInt64::builder("dropped-frames")
                    .nick("Dropped frames")
                    .blurb("Number of frames the driver overwrote before they were read")
                    .read_only()
                    .build(),
                gst::ParamSpecArray::builder("interfaces")
                    .nick("Interfaces")
                    .blurb("Available NI-IMAQ interfaces")
                    .element_spec(&glib::ParamSpecString::builder("interface").build())
                    .read_only()
                    .build(),
            ]
        });

        PROPERTIES.as_ref()
    }

    /// Configures the source as live with time-based format.
    fn constructed(&self) {
        self.parent_constructed();

        #[cfg(feature = "tracing")]
        {
            use tracing_subscriber::filter::LevelFilter;
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::fmt()
                .compact()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(false)
                .with_max_level(LevelFilter::TRACE)
                .with_ansi(true)
                .finish()
                .try_init();
        }

        let obj = self.obj();
        obj.set_live(true);
        obj.set_format(gst::Format::Time);
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        if let Ok(mut settings) = self.settings.lock() {
            match pspec.name() {
                "interface" => {
                    if let Ok(interface) = value.get::<Option<String>>() {
                        let interface =
                            interface.unwrap_or_else(|| config::DEFAULT_INTERFACE.to_owned());
                        gst::info!(
                            CAT,
                            imp = self,
                            "Changing interface from {} to {}",
                            settings.interface,
                            interface
                        );
                        settings.camera_name = interface.clone();
                        settings.interface = interface;
                    } else {
                        gst::error!(CAT, imp = self, "Invalid type for interface property");
                    }
                }
                "timestamp-offset" => {
                    if let Ok(offset) = value.get::<i64>() {
                        settings.timestamp_offset = offset;
                    } else {
                        gst::error!(CAT, imp = self, "Invalid type for timestamp-offset property");
                    }
                }
                "buffer-size" => {
                    if let Ok(size) = value.get::<i32>() {
                        settings.buffer_size = size.max(1) as u32;
                    } else {
                        gst::error!(CAT, imp = self, "Invalid type for buffer-size property");
                    }
                }
                other => {
                    gst::error!(CAT, imp = self, "Unknown property '{}'", other);
                }
            }
        } else {
            gst::error!(
                CAT,
                imp = self,
                "Settings mutex poisoned, property change ignored"
            );
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        match pspec.name() {
            "frames" => self.stats().delivered.to_value(),
            "dropped-frames" => self.stats().dropped.to_value(),
            "interfaces" => self.interface_names().to_value(),
            name => {
                if let Ok(settings) = self.settings.lock() {
                    match name {
                        "interface" => settings.interface.to_value(),
                        "timestamp-offset" => settings.timestamp_offset.to_value(),
                        "buffer-size" => {
                            i32::try_from(settings.buffer_size).unwrap_or(i32::MAX).to_value()
                        }
                        _ => {
                            gst::error!(CAT, imp = self, "Unknown property {}", name);
                            pspec.default_value().clone()
                        }
                    }
                } else {
                    gst::error!(CAT, imp = self, "Settings mutex poisoned");
                    pspec.default_value().clone()
                }
            }
        }
    }
}

impl GstObjectImpl for NiImaqSrc {}

impl ElementImpl for NiImaqSrc {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "NI-IMAQ Video Source",
                "Source/Video",
                "National Instruments based source, supports Camera Link and analog cameras",
                "gst-niimaq contributors",
            )
        });

        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: LazyLock<Result<Vec<gst::PadTemplate>, glib::BoolError>> =
            LazyLock::new(|| {
                let src_pad_template = gst::PadTemplate::new(
                    "src",
                    gst::PadDirection::Src,
                    gst::PadPresence::Always,
                    &caps::advertised_formats(),
                )?;

                Ok(vec![src_pad_template])
            });

        match PAD_TEMPLATES.as_ref() {
            Ok(templates) => templates,
            Err(err) => {
                trace!("Failed to create src pad template: {:?}", err);
                &[]
            }
        }
    }
}

impl BaseSrcImpl for NiImaqSrc {
    /// Opens the interface, sets up the ring and starts acquiring.
    ///
    /// On failure the available interfaces are enumerated again and logged,
    /// which is usually what a user needs to fix the `interface` property.
    fn start(&self) -> Result<(), gst::ErrorMessage> {
        let settings = self
            .settings
            .lock()
            .map_err(|e| {
                gst::error_msg!(
                    gst::CoreError::Failed,
                    ["Failed to lock settings mutex: {}", e]
                )
            })?
            .clone();
        let mut context = self.context.lock().map_err(|e| {
            gst::error_msg!(
                gst::CoreError::Failed,
                ["Failed to lock context mutex: {}", e]
            )
        })?;

        let driver = self.driver()?;
        let mut manager = AcquisitionManager::new(driver.clone());

        gst::debug!(
            CAT,
            imp = self,
            "Opening camera interface '{}' with {} buffers",
            settings.interface,
            settings.buffer_size
        );
        if let Err(err) = manager.start(&settings.interface, settings.buffer_size) {
            self.log_available_interfaces(&driver);
            return Err(gst::error_msg!(
                gst::ResourceError::OpenRead,
                [
                    "Failed to start acquisition on '{}': {}",
                    settings.camera_name,
                    err
                ]
            ));
        }

        *context = Context {
            state: Some(State::new(manager)),
            stats: FrameStats::default(),
        };
        gst::info!(CAT, imp = self, "Started");

        Ok(())
    }

    /// Stops acquiring and closes the session and interface.
    ///
    /// A driver refusing to stop is only logged; handles are closed anyway.
    fn stop(&self) -> Result<(), gst::ErrorMessage> {
        let mut context = self.context.lock().map_err(|e| {
            gst::error_msg!(
                gst::CoreError::Failed,
                ["Failed to lock context mutex: {}", e]
            )
        })?;

        if let Some(mut state) = context.state.take() {
            context.stats = state.manager.stats();
            if let Err(err) = state.manager.stop() {
                gst::warning!(CAT, imp = self, "{}", err);
            }
        }

        gst::info!(
            CAT,
            imp = self,
            "Stopped after {} frames ({} dropped)",
            context.stats.delivered,
            context.stats.dropped
        );

        Ok(())
    }

    fn is_seekable(&self) -> bool {
        false
    }

    /// Live buffers are synced on their own timestamps.
    fn times(&self, buffer: &gst::BufferRef) -> (Option<gst::ClockTime>, Option<gst::ClockTime>) {
        if !self.obj().is_live() {
            return (None, None);
        }
        match buffer.pts() {
            Some(pts) => (
                Some(pts),
                buffer.duration().and_then(|duration| pts.checked_add(duration)),
            ),
            None => (None, None),
        }
    }

    /// Camera caps while acquiring, the template caps otherwise.
    fn caps(&self, filter: Option<&gst::Caps>) -> Option<gst::Caps> {
        let camera_format = match self.context.lock() {
            Ok(context) => context
                .state
                .as_ref()
                .map(|state| state.manager.camera_format()),
            Err(_) => None,
        };

        let caps = match camera_format {
            Some(Ok(format)) => {
                gst::debug!(CAT, imp = self, "Camera reports {:?}", format);
                caps::camera_caps(&format)
            }
            Some(Err(err)) => {
                gst::warning!(CAT, imp = self, "{}", err);
                caps::advertised_formats()
            }
            None => caps::advertised_formats(),
        };

        let caps = match filter {
            Some(filter) => filter.intersect_with_mode(&caps, gst::CapsIntersectMode::First),
            None => caps,
        };
        gst::debug!(CAT, imp = self, "Returning caps {}", caps);

        Some(caps)
    }

    /// Reads the negotiated format and prepares timestamping.
    fn set_caps(&self, caps: &gst::Caps) -> Result<(), gst::LoggableError> {
        let format = caps::parse_negotiated(caps)
            .map_err(|e| gst::loggable_error!(CAT, "Failed to set caps {}: {}", caps, e))?;

        let offset = self
            .settings
            .lock()
            .map_err(|e| gst::loggable_error!(CAT, "Failed to lock settings mutex: {}", e))?
            .timestamp_offset;
        let mut context = self
            .context
            .lock()
            .map_err(|e| gst::loggable_error!(CAT, "Failed to lock context mutex: {}", e))?;
        let state = context
            .state
            .as_mut()
            .ok_or(gst::loggable_error!(CAT, "Failed to get state"))?;

        state.manager.set_frame_size(format.frame_size()).map_err(|e| {
            gst::loggable_error!(CAT, "Caps {} do not fit the camera: {}", caps, e)
        })?;

        trace!(
            "Negotiated caps: format={} {}x{} @ {}/{}fps, bpp={}, depth={}",
            caps::video_format(format.depth),
            format.width,
            format.height,
            format.rate_num,
            format.rate_den,
            format.bpp,
            format.depth,
        );

        state.clock = Some(FrameClock::new(offset, format.framerate()));
        state.format = Some(format);

        Ok(())
    }
}

impl PushSrcImpl for NiImaqSrc {
    /// Copies the next frame out of the ring into a new buffer.
    fn create(
        &self,
        _buffer: Option<&mut gst::BufferRef>,
    ) -> Result<CreateSuccess, gst::FlowError> {
        let mut context = self.context.lock().map_err(|_| gst::FlowError::Error)?;
        let buffer = create_video(self, &mut context)?;
        Ok(CreateSuccess::NewBuffer(buffer))
    }
}

impl NiImaqSrc {
    pub(super) fn set_driver(&self, driver: ImaqDriver) {
        match self.driver.lock() {
            Ok(mut slot) => *slot = Some(driver),
            Err(_) => {
                gst::error!(CAT, imp = self, "Driver mutex poisoned, driver ignored");
                return;
            }
        }
        if let Ok(mut interfaces) = self.interfaces.lock() {
            interfaces.invalidate();
        }
    }

    /// Returns the driver, loading the NI-IMAQ library on first use.
    fn driver(&self) -> Result<ImaqDriver, gst::ErrorMessage> {
        let mut slot = self.driver.lock().map_err(|e| {
            gst::error_msg!(
                gst::CoreError::Failed,
                ["Failed to lock driver mutex: {}", e]
            )
        })?;
        if let Some(driver) = slot.as_ref() {
            return Ok(driver.clone());
        }

        let path = config::library_path();
        gst::debug!(CAT, imp = self, "Loading NI-IMAQ from {}", path.display());
        let driver: ImaqDriver = imaq::load_api(&path).map_err(|e| {
            gst::error_msg!(
                gst::ResourceError::NotFound,
                ["Failed to load {}: {}", path.display(), e]
            )
        })?;
        *slot = Some(driver.clone());
        Ok(driver)
    }

    fn stats(&self) -> FrameStats {
        match self.context.lock() {
            Ok(context) => context
                .state
                .as_ref()
                .map_or(context.stats, |state| state.manager.stats()),
            Err(_) => FrameStats::default(),
        }
    }

    /// Interface names for the `interfaces` property, enumerated once.
    fn interface_names(&self) -> gst::Array {
        let driver = match self.driver() {
            Ok(driver) => driver,
            Err(err) => {
                gst::warning!(CAT, imp = self, "Cannot enumerate interfaces: {:?}", err);
                return gst::Array::from_values(std::iter::empty::<glib::SendValue>());
            }
        };
        let Ok(mut cache) = self.interfaces.lock() else {
            return gst::Array::from_values(std::iter::empty::<glib::SendValue>());
        };

        let (interfaces, cached) = cache.enumerate(&driver, false);
        gst::debug!(
            CAT,
            imp = self,
            "{} interfaces (cached: {})",
            interfaces.len(),
            cached
        );
        gst::Array::from_values(
            interfaces
                .iter()
                .map(|interface| interface.name().to_send_value()),
        )
    }

    /// Re-enumerates and logs the interfaces after a failed start.
    fn log_available_interfaces(&self, driver: &ImaqDriver) {
        let Ok(mut cache) = self.interfaces.lock() else {
            return;
        };
        let interfaces = cache.refresh(driver);
        if interfaces.is_empty() {
            gst::warning!(CAT, imp = self, "No NI-IMAQ interfaces found");
            return;
        }
        let names: Vec<String> = interfaces.iter().map(|i| i.name()).collect();
        gst::warning!(
            CAT,
            imp = self,
            "Available interfaces: {}",
            names.join(", ")
        );
    }
}

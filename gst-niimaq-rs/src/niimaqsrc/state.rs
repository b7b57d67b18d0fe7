//! State Management for NI-IMAQ Source
//!
//! This module defines the runtime state structures used by niimaqsrc:
//! - User settings (interface, ring size, timestamp offset)
//! - Runtime state (acquisition manager, negotiated format)
//! - Timestamping of delivered frames

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

use gstreamer as gst;
use tracing::trace;

use imaq::{AcquisitionManager, FrameStats, config};

use crate::niimaqsrc::caps::NegotiatedFormat;

/// User-configurable settings for the niimaqsrc element.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Interface to open (e.g. "img0" or "img1::0")
    pub interface: String,

    /// Camera name, mirrors `interface`
    pub camera_name: String,

    /// Offset added to every timestamp, in nanoseconds
    pub timestamp_offset: i64,

    /// Number of buffers in the driver ring
    pub buffer_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interface: config::DEFAULT_INTERFACE.to_owned(),
            camera_name: config::DEFAULT_INTERFACE.to_owned(),
            timestamp_offset: 0,
            buffer_size: config::DEFAULT_BUFFER_COUNT,
        }
    }
}

/// Runtime state, present between start and stop.
pub struct State {
    /// Owns the interface, session and ring
    pub manager: AcquisitionManager,

    /// Set once caps are negotiated
    pub format: Option<NegotiatedFormat>,

    /// Set once caps are negotiated
    pub clock: Option<FrameClock>,

    /// True if the next buffer should have the DISCONT flag
    pub next_discont: bool,
}

impl State {
    pub fn new(manager: AcquisitionManager) -> Self {
        State {
            manager,
            format: None,
            clock: None,
            next_discont: true,
        }
    }
}

/// Context wrapper for the element's mutable state.
#[derive(Default)]
pub struct Context {
    /// The element's state (None when stopped, Some when started)
    pub state: Option<State>,

    /// Counters of the current or last acquisition
    pub stats: FrameStats,
}

/// Timestamps computed for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub pts: gst::ClockTime,
    pub duration: Option<gst::ClockTime>,
}

/// Assigns timestamps to delivered frames.
///
/// Timestamps are pipeline running times. The first frame is stamped with the
/// running time at which it was read. With a known frame rate later frames
/// follow on a timeline of `sequence × period` from there; when that timeline
/// falls behind the running time it is moved forward, so buffers are never
/// late. Without a frame rate every frame gets the running time at which it
/// was read. The offset is added to both, negative results saturate at zero,
/// and timestamps never go backwards.
#[derive(Debug, Clone)]
pub struct FrameClock {
    offset: i64,
    rate: Option<gst::Fraction>,
    /// Sequence number and running time the timeline is anchored on
    anchor: Option<(u64, gst::ClockTime)>,
    last_pts: Option<gst::ClockTime>,
}

impl FrameClock {
    /// `offset` is in nanoseconds; a zero or invalid `rate` means "unknown".
    pub fn new(offset: i64, rate: gst::Fraction) -> Self {
        let rate = (rate.numer() > 0 && rate.denom() > 0).then_some(rate);
        FrameClock {
            offset,
            rate,
            anchor: None,
            last_pts: None,
        }
    }

    /// Duration of one frame, if the frame rate is known.
    pub fn frame_period(&self) -> Option<gst::ClockTime> {
        self.rate.map(|rate| Self::frames_to_time(1, rate))
    }

    fn frames_to_time(frames: u64, rate: gst::Fraction) -> gst::ClockTime {
        let ns = frames as u128 * 1_000_000_000u128;
        let ns = ns * rate.denom() as u128;
        let ns = ns / rate.numer() as u128;
        gst::ClockTime::from_nseconds(u64::try_from(ns).unwrap_or(u64::MAX))
    }

    /// Timestamps the frame with driver sequence number `sequence`, read at
    /// `running_time`.
    pub fn timestamp(
        &mut self,
        sequence: u64,
        running_time: Option<gst::ClockTime>,
    ) -> FrameTiming {
        let now = running_time.unwrap_or(gst::ClockTime::ZERO);
        let (capture, duration) = match self.rate {
            Some(rate) => {
                let (first, base) = *self.anchor.get_or_insert((sequence, now));
                let elapsed = Self::frames_to_time(sequence.saturating_sub(first), rate);
                let mut capture = base.saturating_add(elapsed);
                if capture < now {
                    trace!(
                        "Timeline {} behind running time, moving it forward",
                        now - capture
                    );
                    self.anchor = Some((first, base.saturating_add(now - capture)));
                    capture = now;
                }
                (capture, Some(Self::frames_to_time(1, rate)))
            }
            None => (now, None),
        };

        let pts = i128::from(capture.nseconds()) + i128::from(self.offset);
        let pts = gst::ClockTime::from_nseconds(u64::try_from(pts.max(0)).unwrap_or(u64::MAX));
        let pts = match self.last_pts {
            Some(last) if pts < last => last,
            _ => pts,
        };
        self.last_pts = Some(pts);

        FrameTiming { pts, duration }
    }
}

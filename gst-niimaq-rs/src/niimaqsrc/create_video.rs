//! Video Buffer Creation for NI-IMAQ Source
//!
//! This module turns one frame from the driver ring into a GStreamer buffer.
//!
//! ## Per-frame Steps
//! 1. **Hand-off**: the acquisition manager examines the newest completed
//!    buffer, copies it and releases it back to the driver
//! 2. **Drop accounting**: a gap in sequence numbers is logged and marks the
//!    buffer as a discontinuity
//! 3. **Timestamping**: PTS is the running time the first frame was read at,
//!    advanced by the negotiated frame rate, or the running time of every
//!    frame when the rate is unknown
//!
//! Buffer offsets carry the driver sequence number.

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

use crate::niimaqsrc::imp::{CAT, NiImaqSrc};
use crate::niimaqsrc::state::{Context, FrameClock};
use gst::prelude::*;
use gst::subclass::prelude::*;
use gstreamer as gst;
use tracing::trace;

/// Creates a GStreamer video buffer from the next completed frame.
///
/// # Returns
/// * `Ok(buffer)` holding one frame of the negotiated size
/// * `Err(FlowError::NotNegotiated)` if caps were not set yet
/// * `Err(FlowError::Error)` after posting an element error if the driver
///   could not hand out a buffer
pub(crate) fn create_video(
    src: &NiImaqSrc,
    context: &mut Context,
) -> Result<gst::Buffer, gst::FlowError> {
    let state = context.state.as_mut().ok_or(gst::FlowError::Flushing)?;
    if state.format.is_none() {
        return Err(gst::FlowError::NotNegotiated);
    }

    let frame = state.manager.deliver_frame().map_err(|err| {
        gst::element_imp_error!(
            src,
            gst::ResourceError::Read,
            ["Failed to get buffer: {}", err]
        );
        gst::FlowError::Error
    })?;

    if frame.dropped > 0 {
        gst::warning!(
            CAT,
            imp = src,
            "Dropped {} frames (total {})",
            frame.dropped,
            state.manager.stats().dropped
        );
        state.next_discont = true;
    }

    let clock = state
        .clock
        .get_or_insert_with(|| FrameClock::new(0, gst::Fraction::new(0, 1)));
    let timing = clock.timestamp(u64::from(frame.sequence), src.obj().current_running_time());

    let sequence = frame.sequence;
    let mut buffer = gst::Buffer::from_mut_slice(frame.data);
    {
        let buffer = buffer.get_mut().ok_or(gst::FlowError::Error)?;
        buffer.set_pts(timing.pts);
        buffer.set_duration(timing.duration);
        buffer.set_offset(u64::from(sequence));
        buffer.set_offset_end(u64::from(sequence) + 1);
        if state.next_discont {
            buffer.set_flags(gst::BufferFlags::DISCONT);
            state.next_discont = false;
        }
    }

    trace!(pts = ?buffer.pts(), sequence, buffer = ?buffer, "Produced buffer");
    Ok(buffer)
}

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! The driver capability.
//!
//! [`Driver`] is the narrow set of NI-IMAQ calls the acquisition code needs.
//! [`crate::ImaqApi`] implements it on top of the dynamically loaded library and
//! [`crate::mock::MockDriver`] implements it in memory for tests.

use std::ffi::c_void;
use std::sync::Arc;

use crate::DriverStatus;

/// Result of a single driver call.
pub type DriverResult<T> = core::result::Result<T, DriverStatus>;

/// Shared, type-erased driver handle.
pub type ImaqDriver = Arc<dyn Driver>;

/// Raw interface handle. Zero means "not open".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub imaq_sys::InterfaceId);

/// Raw session handle. Zero means "not open".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SessionId(pub imaq_sys::SessionId);

impl InterfaceId {
    /// The closed handle.
    pub const CLOSED: InterfaceId = InterfaceId(0);

    pub fn is_open(&self) -> bool {
        self.0 != 0
    }
}

impl SessionId {
    /// The closed handle.
    pub const CLOSED: SessionId = SessionId(0);

    pub fn is_open(&self) -> bool {
        self.0 != 0
    }
}

/// Interface attributes read by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Number of camera ports exposed by the interface.
    NumPorts,
    /// Significant bits per pixel reported by the camera file.
    BitsPerPixel,
    /// Bytes used to store one pixel.
    BytesPerPixel,
    /// Width of the acquisition window.
    RoiWidth,
    /// Height of the acquisition window.
    RoiHeight,
}

impl Attribute {
    /// Raw `IMG_ATTR_*` identifier.
    pub fn id(&self) -> u32 {
        match self {
            Attribute::NumPorts => imaq_sys::IMG_ATTR_NUM_PORTS,
            Attribute::BitsPerPixel => imaq_sys::IMG_ATTR_BITSPERPIXEL,
            Attribute::BytesPerPixel => imaq_sys::IMG_ATTR_BYTESPERPIXEL,
            Attribute::RoiWidth => imaq_sys::IMG_ATTR_ROI_WIDTH,
            Attribute::RoiHeight => imaq_sys::IMG_ATTR_ROI_HEIGHT,
        }
    }
}

/// One entry of the buffer list handed to `imgRingSetup`.
///
/// Null entries are filled in by the driver with the address of a buffer it
/// allocated for the ring.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct BufferSlot(pub *mut c_void);

impl Default for BufferSlot {
    fn default() -> Self {
        BufferSlot(std::ptr::null_mut())
    }
}

/// Answer to an "examine buffer" request.
///
/// `address` is only valid until the buffer is released; the safe API never
/// lets it escape a [`crate::BufferLease`].
#[derive(Debug, Clone, Copy)]
pub struct ExaminedBuffer {
    /// Sequence number of the buffer actually handed out (the newest completed one).
    pub sequence: u32,

    /// Start of the buffer's pixel data.
    pub address: *const u8,
}

/// Frame-grabber driver operations.
///
/// Handles are plain values; ownership and cleanup are layered on top by
/// [`crate::Interface`] and [`crate::Session`].
pub trait Driver: Send + Sync {
    /// Name of the interface at `index`. Fails once `index` is past the last interface.
    fn query_interface_name(&self, index: u32) -> DriverResult<String>;

    fn open_interface(&self, name: &str) -> DriverResult<InterfaceId>;

    fn close_interface(&self, interface: InterfaceId) -> DriverResult<()>;

    fn open_session(&self, interface: InterfaceId) -> DriverResult<SessionId>;

    fn close_session(&self, session: SessionId) -> DriverResult<()>;

    fn get_attribute(&self, interface: InterfaceId, attribute: Attribute) -> DriverResult<u32>;

    /// Configures a continuous ring over `slots`.
    ///
    /// # Safety
    ///
    /// `slots` must stay alive and must not move until `session` is closed; the
    /// driver keeps referring to the list for the whole session.
    unsafe fn ring_setup(
        &self,
        session: SessionId,
        slots: &mut [BufferSlot],
        skip_count: u32,
        start_now: bool,
    ) -> DriverResult<()>;

    fn start_acquisition(&self, session: SessionId) -> DriverResult<()>;

    fn stop_acquisition(&self, session: SessionId) -> DriverResult<()>;

    /// Locks the newest completed buffer at or after `sequence`.
    fn examine_buffer(&self, session: SessionId, sequence: u32) -> DriverResult<ExaminedBuffer>;

    /// Hands the examined buffer back to the ring.
    fn release_buffer(&self, session: SessionId) -> DriverResult<()>;
}

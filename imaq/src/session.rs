// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Owned session handles, the buffer ring and buffer leases.

use crate::driver::{BufferSlot, DriverResult, ImaqDriver, InterfaceId, SessionId};
use crate::interface::read_camera_format;
use crate::{DriverStatus, Error, Result};

/// Buffer list registered with the driver for one session.
///
/// Slots are addressed by sequence number modulo the ring length; the
/// addresses themselves are owned by the driver. Every buffer holds
/// `buffer_size` bytes, one frame of the camera format at setup time.
struct Ring {
    slots: Box<[BufferSlot]>,
    buffer_size: usize,
}

// Safety: the slot addresses are driver memory that is only dereferenced
// through a `BufferLease`, which borrows the owning `Session`.
unsafe impl Send for Ring {}

/// An open acquisition session.
///
/// Dropping the session closes it, which also frees the ring buffers on the
/// driver side. The buffer list is kept alive until after the close.
pub struct Session {
    driver: ImaqDriver,
    id: SessionId,
    interface: InterfaceId,
    ring: Option<Ring>,
}

impl Session {
    pub(crate) fn new(driver: ImaqDriver, id: SessionId, interface: InterfaceId) -> Self {
        Self {
            driver,
            id,
            interface,
            ring: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Number of slots in the configured ring, if any.
    pub fn ring_len(&self) -> Option<usize> {
        self.ring.as_ref().map(|ring| ring.slots.len())
    }

    /// Size in bytes of each ring buffer, if a ring is configured.
    pub fn buffer_size(&self) -> Option<usize> {
        self.ring.as_ref().map(|ring| ring.buffer_size)
    }

    /// Provisions a continuous ring of `buffers` driver-allocated buffers.
    ///
    /// No frames are skipped between buffers and acquisition is not started.
    /// The driver sizes the buffers for the current camera format, which is
    /// read first and bounds every later [`examine`](Self::examine).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBufferCount`] if `buffers` is zero
    /// - [`Error::HardwareQuery`] if the camera format cannot be read
    /// - [`Error::RingSetup`] if the driver rejects the ring
    pub fn configure_ring(&mut self, buffers: u32) -> Result<()> {
        if buffers == 0 {
            return Err(Error::InvalidBufferCount(buffers));
        }
        let buffer_size = read_camera_format(&*self.driver, self.interface)?.frame_size();
        let mut slots = vec![BufferSlot::default(); buffers as usize].into_boxed_slice();

        // SAFETY
        // The boxed slice is stored in `self.ring` below and is only dropped
        // after the session handle has been closed (see `close_inner`).
        unsafe { self.driver.ring_setup(self.id, &mut slots, 0, false) }
            .map_err(|source| Error::RingSetup { buffers, source })?;

        tracing::debug!(sid = self.id.0, buffers, buffer_size, "Configured ring");
        self.ring = Some(Ring { slots, buffer_size });
        Ok(())
    }

    /// Asks the driver to start acquiring into the ring.
    ///
    /// Single attempt. The raw status is returned since a camera that is not
    /// ready yet also shows up as a failure here.
    pub fn start_acquisition(&self) -> DriverResult<()> {
        self.driver.start_acquisition(self.id)
    }

    /// Asks the driver to stop acquiring.
    pub fn stop_acquisition(&self) -> Result<()> {
        self.driver
            .stop_acquisition(self.id)
            .map_err(|source| Error::AcquisitionStop { source })
    }

    /// Locks the newest completed buffer at or after `sequence`.
    ///
    /// The returned lease exposes `len` bytes of the buffer and hands it back
    /// to the driver when dropped or released.
    ///
    /// # Errors
    ///
    /// - [`Error::FrameSize`] if `len` exceeds the ring buffer size
    /// - [`Error::BufferExamine`] if the driver has no buffer to hand out
    pub fn examine(&self, sequence: u32, len: usize) -> Result<BufferLease<'_>> {
        let capacity = self.buffer_size().unwrap_or(0);
        if len > capacity {
            return Err(Error::FrameSize {
                requested: len,
                capacity,
            });
        }

        let examined = self
            .driver
            .examine_buffer(self.id, sequence)
            .map_err(|source| Error::BufferExamine { sequence, source })?;

        if examined.address.is_null() {
            if let Err(err) = self.driver.release_buffer(self.id) {
                tracing::error!("Failed to release buffer {}: {:?}", examined.sequence, err);
            }
            return Err(Error::BufferExamine {
                sequence,
                source: DriverStatus::invalid_argument("driver returned no buffer address"),
            });
        }

        // SAFETY
        // The driver keeps the examined buffer in place until it is released,
        // and the lease releases it before the borrow of `self` ends. `len` was
        // checked against the size the ring buffers were allocated with.
        let payload = unsafe { std::slice::from_raw_parts(examined.address, len) };

        Ok(BufferLease {
            session: self,
            sequence: examined.sequence,
            payload,
            released: false,
        })
    }

    fn close_inner(&mut self) -> Result<()> {
        if !self.id.is_open() {
            return Ok(());
        }
        let id = std::mem::take(&mut self.id);
        self.driver.close_session(id)?;
        tracing::debug!(sid = id.0, "Closed session");
        Ok(())
    }

    /// Closes the session, reporting a driver failure.
    pub fn close(mut self) -> Result<()> {
        let result = self.close_inner();
        self.ring = None;
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close_inner() {
            tracing::error!("Failed to close session: {:?}", err);
        }
        // `ring` is dropped after this, once the driver no longer uses it.
    }
}

/// A buffer locked by [`Session::examine`].
///
/// Copy the payload out, then let the lease go: the driver recycles the
/// buffer as soon as it is released.
pub struct BufferLease<'a> {
    session: &'a Session,
    sequence: u32,
    payload: &'a [u8],
    released: bool,
}

impl BufferLease<'_> {
    /// Sequence number of the locked buffer.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Pixel data of the locked buffer.
    pub fn payload(&self) -> &[u8] {
        self.payload
    }

    /// Releases the buffer, reporting a driver failure.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.payload = &[];
        self.session.driver.release_buffer(self.session.id)?;
        Ok(())
    }
}

impl Drop for BufferLease<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            tracing::error!("Failed to release buffer {}: {:?}", self.sequence, err);
        }
    }
}

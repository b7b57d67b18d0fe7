// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! The acquisition session manager.
//!
//! [`AcquisitionManager`] owns the interface, the session and its buffer ring
//! for one source. It implements the per-frame hand-off with the driver:
//! examine the newest completed buffer, copy it out, release it, and account
//! for the buffers that were overwritten in between.

use std::fmt;
use std::time::Duration;

use crate::driver::{ImaqDriver, InterfaceId, SessionId};
use crate::{CameraFormat, Error, Interface, Result, Session};

/// How often and how patiently `start_acquisition` is retried.
///
/// The driver reports a camera that is not ready yet with a failure, so every
/// failed attempt is retried until the attempts are used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,

    /// Pause between two attempts.
    pub pause: Duration,
}

impl Default for StartPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            pause: Duration::from_millis(50),
        }
    }
}

/// Lifecycle state of an [`AcquisitionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Closed,
    InterfaceOpen,
    SessionOpen,
    RingConfigured,
    Acquiring,
    Stopping,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquisitionState::Closed => "closed",
            AcquisitionState::InterfaceOpen => "interface-open",
            AcquisitionState::SessionOpen => "session-open",
            AcquisitionState::RingConfigured => "ring-configured",
            AcquisitionState::Acquiring => "acquiring",
            AcquisitionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Frame counters of the current (or last) acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames handed out by [`AcquisitionManager::deliver_frame`].
    pub delivered: u64,

    /// Buffers the driver overwrote before they could be examined.
    pub dropped: u64,
}

/// One frame copied out of the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixel data, exactly one frame size long.
    pub data: Vec<u8>,

    /// Driver sequence number of the buffer the frame was copied from.
    pub sequence: u32,

    /// Buffers skipped since the previous frame.
    pub dropped: u32,
}

/// Owns one acquisition: interface, session and ring.
///
/// Usage is sequential: [`start`](Self::start), any number of
/// [`deliver_frame`](Self::deliver_frame) calls, then [`stop`](Self::stop).
/// Start failures leave the manager closed, so `start` can simply be called
/// again.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use imaq::{AcquisitionManager, ImaqDriver, mock::MockDriver};
///
/// # fn main() -> Result<(), imaq::Error> {
/// let mock = Arc::new(MockDriver::new().with_interface("img0", 1));
/// let driver: ImaqDriver = mock.clone();
///
/// let mut manager = AcquisitionManager::new(driver);
/// manager.start("img0", 4)?;
/// let format = manager.camera_format()?;
/// manager.set_frame_size(format.frame_size())?;
///
/// let frame = manager.deliver_frame()?;
/// assert_eq!(frame.data.len(), format.frame_size());
///
/// manager.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct AcquisitionManager {
    driver: ImaqDriver,
    policy: StartPolicy,
    // Field order matters: the session must be closed before its interface.
    session: Option<Session>,
    interface: Option<Interface>,
    acquiring: bool,
    next_sequence: u32,
    stats: FrameStats,
    frame_size: Option<usize>,
}

impl AcquisitionManager {
    /// Creates a closed manager using the default [`StartPolicy`].
    pub fn new(driver: ImaqDriver) -> Self {
        Self::with_policy(driver, StartPolicy::default())
    }

    pub fn with_policy(driver: ImaqDriver, policy: StartPolicy) -> Self {
        Self {
            driver,
            policy,
            session: None,
            interface: None,
            acquiring: false,
            next_sequence: 0,
            stats: FrameStats::default(),
            frame_size: None,
        }
    }

    pub fn driver(&self) -> &ImaqDriver {
        &self.driver
    }

    pub fn policy(&self) -> StartPolicy {
        self.policy
    }

    /// Opens `interface`, provisions a ring of `buffers` slots and starts
    /// acquiring.
    ///
    /// Counters and the expected sequence number are reset. On any failure
    /// every handle opened so far is closed again before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if an acquisition is running
    /// - [`Error::InvalidBufferCount`] if `buffers` is zero
    /// - [`Error::InterfaceOpen`], [`Error::SessionOpen`], [`Error::RingSetup`]
    ///   or [`Error::AcquisitionStart`] for the step that failed
    pub fn start(&mut self, interface: &str, buffers: u32) -> Result<()> {
        if self.interface.is_some() {
            return Err(Error::AlreadyStarted);
        }
        if buffers == 0 {
            return Err(Error::InvalidBufferCount(buffers));
        }

        tracing::debug!("Opening camera interface: {}", interface);
        // Locals drop in reverse order, so an early return closes the session
        // before the interface.
        let opened = Interface::open(&self.driver, interface)?;
        let mut session = opened.open_session()?;

        tracing::debug!("Creating ring with {} buffers", buffers);
        session.configure_ring(buffers)?;

        tracing::debug!("Starting acquisition");
        self.start_with_retry(&session)?;

        self.next_sequence = 0;
        self.stats = FrameStats::default();
        self.session = Some(session);
        self.interface = Some(opened);
        self.acquiring = true;

        tracing::debug!(
            iid = self.interface_id().0,
            sid = self.session_id().0,
            "Acquisition started on '{}'",
            interface
        );
        Ok(())
    }

    fn start_with_retry(&self, session: &Session) -> Result<()> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match session.start_acquisition() {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= attempts => {
                    return Err(Error::AcquisitionStart { attempts, source });
                }
                Err(source) => {
                    tracing::warn!(
                        "Camera not ready ({}), attempt {} of {}",
                        source,
                        attempt,
                        attempts
                    );
                    std::thread::sleep(self.policy.pause);
                    attempt += 1;
                }
            }
        }
    }

    /// Stops acquiring and closes the session, then the interface.
    ///
    /// Does nothing when already closed. Handles are closed even if the
    /// driver refuses to stop; that failure is returned afterwards.
    pub fn stop(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            self.interface = None;
            self.acquiring = false;
            self.frame_size = None;
            return Ok(());
        };

        tracing::debug!(state = %AcquisitionState::Stopping, "Stopping acquisition");
        let stopped = if self.acquiring {
            session.stop_acquisition()
        } else {
            Ok(())
        };
        self.acquiring = false;

        if let Err(err) = session.close() {
            tracing::error!("Failed to close session: {}", err);
        }
        if let Some(interface) = self.interface.take() {
            if let Err(err) = interface.close() {
                tracing::error!("Failed to close interface: {}", err);
            }
        }
        self.frame_size = None;

        tracing::debug!(
            delivered = self.stats.delivered,
            dropped = self.stats.dropped,
            "Acquisition stopped"
        );
        stopped
    }

    /// Copies the next frame out of the ring.
    ///
    /// Examines the buffer for the expected sequence number; the driver hands
    /// out the newest completed buffer instead if that one was already
    /// overwritten. The gap is counted as dropped frames.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] if no acquisition is running
    /// - [`Error::NotNegotiated`] if no frame size is set
    /// - [`Error::BufferExamine`] if the driver has no buffer to hand out
    ///
    /// Counters and the expected sequence number are unchanged on error.
    pub fn deliver_frame(&mut self) -> Result<Frame> {
        let session = match &self.session {
            Some(session) if self.acquiring => session,
            _ => return Err(Error::NotStarted),
        };
        let len = self.frame_size.ok_or(Error::NotNegotiated)?;

        let expected = self.next_sequence;
        let lease = session.examine(expected, len)?;
        let sequence = lease.sequence();
        let data = lease.payload().to_vec();
        lease.release()?;

        let dropped = sequence.saturating_sub(expected);
        if dropped > 0 {
            self.stats.dropped += u64::from(dropped);
            tracing::warn!(
                "Dropped {} frames (total {})",
                dropped,
                self.stats.dropped
            );
        }

        self.next_sequence = sequence.wrapping_add(1);
        self.stats.delivered += 1;

        tracing::trace!(sequence, "Delivered frame {}", self.stats.delivered);
        Ok(Frame {
            data,
            sequence,
            dropped,
        })
    }

    /// Reads the current camera format from the open interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareQuery`] if no interface is open or any
    /// attribute read fails.
    pub fn camera_format(&self) -> Result<CameraFormat> {
        match &self.interface {
            Some(interface) => interface.camera_format(),
            None => Err(Error::HardwareQuery {
                reason: "Camera interface not open".to_string(),
                source: None,
            }),
        }
    }

    /// Sets the number of bytes copied per frame, from the negotiated format.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] if no ring is configured
    /// - [`Error::FrameSize`] if a frame would not fit a ring buffer; the
    ///   previous frame size is kept
    pub fn set_frame_size(&mut self, frame_size: usize) -> Result<()> {
        let capacity = self
            .session
            .as_ref()
            .and_then(Session::buffer_size)
            .ok_or(Error::NotStarted)?;
        if frame_size > capacity {
            return Err(Error::FrameSize {
                requested: frame_size,
                capacity,
            });
        }
        tracing::debug!("Frame size set to {} bytes", frame_size);
        self.frame_size = Some(frame_size);
        Ok(())
    }

    pub fn frame_size(&self) -> Option<usize> {
        self.frame_size
    }

    /// Current interface handle, [`InterfaceId::CLOSED`] when closed.
    pub fn interface_id(&self) -> InterfaceId {
        self.interface
            .as_ref()
            .map_or(InterfaceId::CLOSED, Interface::id)
    }

    /// Current session handle, [`SessionId::CLOSED`] when closed.
    pub fn session_id(&self) -> SessionId {
        self.session.as_ref().map_or(SessionId::CLOSED, Session::id)
    }

    /// Name of the open interface.
    pub fn interface_name(&self) -> Option<&str> {
        self.interface.as_ref().map(Interface::name)
    }

    /// Slots in the configured ring, if any.
    pub fn ring_len(&self) -> Option<usize> {
        self.session.as_ref().and_then(Session::ring_len)
    }

    pub fn state(&self) -> AcquisitionState {
        match (&self.interface, &self.session) {
            (None, _) => AcquisitionState::Closed,
            (Some(_), None) => AcquisitionState::InterfaceOpen,
            (Some(_), Some(_)) if self.acquiring => AcquisitionState::Acquiring,
            (Some(_), Some(session)) if session.ring_len().is_some() => {
                AcquisitionState::RingConfigured
            }
            (Some(_), Some(_)) => AcquisitionState::SessionOpen,
        }
    }

    pub fn is_started(&self) -> bool {
        self.state() == AcquisitionState::Acquiring
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Sequence number the next [`deliver_frame`](Self::deliver_frame) asks for.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }
}

impl Drop for AcquisitionManager {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!("Failed to stop acquisition: {}", err);
        }
    }
}

impl fmt::Debug for AcquisitionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionManager")
            .field("state", &self.state())
            .field("interface", &self.interface_name())
            .field("iid", &self.interface_id())
            .field("sid", &self.session_id())
            .field("next_sequence", &self.next_sequence)
            .field("stats", &self.stats)
            .field("frame_size", &self.frame_size)
            .finish()
    }
}

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory [`Driver`] for tests and demos.
//!
//! [`MockDriver`] simulates a set of interfaces with one camera each. Ring
//! buffers are real heap memory; the byte pattern of each frame is the low
//! byte of its sequence number, so tests can tell frames apart.
//!
//! Failures are injected per call site and handle bookkeeping is exposed so
//! tests can check that nothing is left open.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::DriverStatus;
use crate::driver::{
    Attribute, BufferSlot, Driver, DriverResult, ExaminedBuffer, InterfaceId, SessionId,
};

/// Status code returned by every injected failure.
pub const MOCK_ERROR: imaq_sys::Status = 0xBFF6_0FFF_u32 as imaq_sys::Status;

fn failure(message: &str) -> DriverStatus {
    DriverStatus {
        code: MOCK_ERROR,
        message: Some(message.to_string()),
    }
}

#[derive(Debug, Clone)]
struct MockInterface {
    name: String,
    ports: u32,
    openable: bool,
}

/// Attribute values reported for every interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCamera {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub bytes_per_pixel: u32,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            bits_per_pixel: 8,
            bytes_per_pixel: 1,
        }
    }
}

impl MockCamera {
    fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel as usize
    }
}

#[derive(Debug, Default)]
struct Failures {
    query_at: Option<u32>,
    session_open: bool,
    ring_setup: bool,
    not_ready_starts: u32,
    stop: bool,
    examine: bool,
    null_address: bool,
    attribute: Option<Attribute>,
}

#[derive(Debug)]
struct MockSession {
    interface: InterfaceId,
    ring: Vec<Box<[u8]>>,
    acquiring: bool,
    outstanding: Option<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    interfaces: Vec<MockInterface>,
    camera: MockCamera,
    failures: Failures,
    sequences: VecDeque<u32>,
    next_handle: u32,
    open_interfaces: HashMap<InterfaceId, String>,
    open_sessions: HashMap<SessionId, MockSession>,
    counters: MockCounters,
}

/// Call counters of a [`MockDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounters {
    /// Successful `open_interface` calls.
    pub interface_opens: u32,

    /// Successful `open_session` calls.
    pub session_opens: u32,

    /// Every `start_acquisition` call, failed ones included.
    pub start_attempts: u32,

    /// Successful `release_buffer` calls.
    pub releases: u32,

    /// Interfaces closed while a session on them was still open.
    pub out_of_order_closes: u32,

    /// Length of the last configured ring.
    pub last_ring_len: Option<usize>,
}

impl MockState {
    fn allocate_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn find_interface(&self, name: &str) -> Option<&MockInterface> {
        let (base, port) = match name.split_once("::") {
            Some((base, port)) => (base, port.parse::<u32>().ok()),
            None => (name, None),
        };
        self.interfaces.iter().find(|interface| {
            interface.name == base
                && match port {
                    Some(port) => port < interface.ports,
                    None => !name.contains("::"),
                }
        })
    }

    fn session(&mut self, session: SessionId) -> DriverResult<&mut MockSession> {
        self.open_sessions
            .get_mut(&session)
            .ok_or_else(|| failure("invalid session handle"))
    }
}

/// Scripted stand-in for the NI-IMAQ driver.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use imaq::{ImaqDriver, enumerate_interfaces, mock::MockDriver};
///
/// let driver: ImaqDriver = Arc::new(
///     MockDriver::new()
///         .with_interface("img0", 1)
///         .with_interface("img1", 2),
/// );
/// let names: Vec<String> = enumerate_interfaces(&driver)
///     .iter()
///     .map(|descriptor| descriptor.name())
///     .collect();
/// assert_eq!(names, ["img0", "img1::0", "img1::1"]);
/// ```
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// A driver without interfaces and with the default [`MockCamera`].
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut MockState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an interface exposing `ports` camera ports.
    pub fn with_interface(mut self, name: &str, ports: u32) -> Self {
        self.state_mut().interfaces.push(MockInterface {
            name: name.to_string(),
            ports,
            openable: true,
        });
        self
    }

    /// Adds an interface that is listed by the driver but cannot be opened.
    pub fn with_unopenable_interface(mut self, name: &str) -> Self {
        self.state_mut().interfaces.push(MockInterface {
            name: name.to_string(),
            ports: 1,
            openable: false,
        });
        self
    }

    pub fn with_camera(mut self, camera: MockCamera) -> Self {
        self.state_mut().camera = camera;
        self
    }

    /// Sequence numbers handed out by the next `examine_buffer` calls.
    ///
    /// Once the script is exhausted every examine returns the requested
    /// sequence number.
    pub fn with_sequences(mut self, sequences: impl IntoIterator<Item = u32>) -> Self {
        self.state_mut().sequences.extend(sequences);
        self
    }

    /// Makes the interface name query fail from `index` on.
    pub fn with_query_failure_at(mut self, index: u32) -> Self {
        self.state_mut().failures.query_at = Some(index);
        self
    }

    pub fn with_session_open_failure(mut self) -> Self {
        self.state_mut().failures.session_open = true;
        self
    }

    pub fn with_ring_setup_failure(mut self) -> Self {
        self.state_mut().failures.ring_setup = true;
        self
    }

    /// Makes the next `count` start requests report "not ready".
    pub fn with_not_ready_starts(mut self, count: u32) -> Self {
        self.state_mut().failures.not_ready_starts = count;
        self
    }

    pub fn with_stop_failure(mut self) -> Self {
        self.state_mut().failures.stop = true;
        self
    }

    pub fn with_attribute_failure(mut self, attribute: Attribute) -> Self {
        self.state_mut().failures.attribute = Some(attribute);
        self
    }

    /// Toggles examine failures on a running driver.
    pub fn set_examine_failure(&self, fail: bool) {
        self.lock().failures.examine = fail;
    }

    /// Makes examined buffers come back without an address.
    pub fn set_null_address(&self, null: bool) {
        self.lock().failures.null_address = null;
    }

    /// Makes reads of `attribute` fail on a running driver; `None` heals it.
    pub fn set_attribute_failure(&self, attribute: Option<Attribute>) {
        self.lock().failures.attribute = attribute;
    }

    /// Appends sequence numbers to the script on a running driver.
    pub fn push_sequences(&self, sequences: impl IntoIterator<Item = u32>) {
        self.lock().sequences.extend(sequences);
    }

    pub fn counters(&self) -> MockCounters {
        self.lock().counters
    }

    pub fn open_interface_count(&self) -> usize {
        self.lock().open_interfaces.len()
    }

    pub fn open_session_count(&self) -> usize {
        self.lock().open_sessions.len()
    }

    /// Buffers examined but not released yet.
    pub fn outstanding_buffers(&self) -> usize {
        self.lock()
            .open_sessions
            .values()
            .filter(|session| session.outstanding.is_some())
            .count()
    }
}

impl Driver for MockDriver {
    fn query_interface_name(&self, index: u32) -> DriverResult<String> {
        let state = self.lock();
        if state.failures.query_at.is_some_and(|at| index >= at) {
            return Err(failure("interface query failed"));
        }
        state
            .interfaces
            .get(index as usize)
            .map(|interface| interface.name.clone())
            .ok_or_else(|| failure("no interface at index"))
    }

    fn open_interface(&self, name: &str) -> DriverResult<InterfaceId> {
        let mut state = self.lock();
        match state.find_interface(name) {
            Some(interface) if interface.openable => {}
            Some(_) => return Err(failure("interface cannot be opened")),
            None => return Err(failure("unknown interface")),
        }
        let id = InterfaceId(state.allocate_handle());
        state.open_interfaces.insert(id, name.to_string());
        state.counters.interface_opens += 1;
        Ok(id)
    }

    fn close_interface(&self, interface: InterfaceId) -> DriverResult<()> {
        let mut state = self.lock();
        if state
            .open_sessions
            .values()
            .any(|session| session.interface == interface)
        {
            state.counters.out_of_order_closes += 1;
        }
        state
            .open_interfaces
            .remove(&interface)
            .map(|_| ())
            .ok_or_else(|| failure("invalid interface handle"))
    }

    fn open_session(&self, interface: InterfaceId) -> DriverResult<SessionId> {
        let mut state = self.lock();
        if !state.open_interfaces.contains_key(&interface) {
            return Err(failure("invalid interface handle"));
        }
        if state.failures.session_open {
            return Err(failure("session open failed"));
        }
        let id = SessionId(state.allocate_handle());
        state.open_sessions.insert(
            id,
            MockSession {
                interface,
                ring: Vec::new(),
                acquiring: false,
                outstanding: None,
            },
        );
        state.counters.session_opens += 1;
        Ok(id)
    }

    fn close_session(&self, session: SessionId) -> DriverResult<()> {
        self.lock()
            .open_sessions
            .remove(&session)
            .map(|_| ())
            .ok_or_else(|| failure("invalid session handle"))
    }

    fn get_attribute(&self, interface: InterfaceId, attribute: Attribute) -> DriverResult<u32> {
        let state = self.lock();
        let name = state
            .open_interfaces
            .get(&interface)
            .ok_or_else(|| failure("invalid interface handle"))?;
        if state.failures.attribute == Some(attribute) {
            return Err(failure("attribute read failed"));
        }
        let camera = state.camera;
        let value = match attribute {
            Attribute::NumPorts => state.find_interface(name).map_or(1, |i| i.ports),
            Attribute::BitsPerPixel => camera.bits_per_pixel,
            Attribute::BytesPerPixel => camera.bytes_per_pixel,
            Attribute::RoiWidth => camera.width,
            Attribute::RoiHeight => camera.height,
        };
        Ok(value)
    }

    unsafe fn ring_setup(
        &self,
        session: SessionId,
        slots: &mut [BufferSlot],
        _skip_count: u32,
        start_now: bool,
    ) -> DriverResult<()> {
        let mut state = self.lock();
        if state.failures.ring_setup {
            return Err(failure("ring setup failed"));
        }
        let frame_size = state.camera.frame_size();
        let entry = state.session(session)?;
        entry.ring = slots
            .iter()
            .map(|_| vec![0u8; frame_size].into_boxed_slice())
            .collect();
        for (slot, buffer) in slots.iter_mut().zip(entry.ring.iter_mut()) {
            *slot = BufferSlot(buffer.as_mut_ptr().cast());
        }
        entry.acquiring = start_now;
        state.counters.last_ring_len = Some(slots.len());
        Ok(())
    }

    fn start_acquisition(&self, session: SessionId) -> DriverResult<()> {
        let mut state = self.lock();
        state.counters.start_attempts += 1;
        if state.failures.not_ready_starts > 0 {
            state.failures.not_ready_starts -= 1;
            return Err(failure("camera not ready"));
        }
        let entry = state.session(session)?;
        if entry.ring.is_empty() {
            return Err(failure("no ring configured"));
        }
        entry.acquiring = true;
        Ok(())
    }

    fn stop_acquisition(&self, session: SessionId) -> DriverResult<()> {
        let mut state = self.lock();
        let fail = state.failures.stop;
        let entry = state.session(session)?;
        if fail {
            return Err(failure("stop failed"));
        }
        entry.acquiring = false;
        Ok(())
    }

    fn examine_buffer(&self, session: SessionId, sequence: u32) -> DriverResult<ExaminedBuffer> {
        let mut state = self.lock();
        if state.failures.examine {
            return Err(failure("examine failed"));
        }
        let null_address = state.failures.null_address;
        let actual = state.sequences.pop_front().unwrap_or(sequence);
        let entry = state.session(session)?;
        if !entry.acquiring || entry.ring.is_empty() {
            return Err(failure("acquisition not running"));
        }
        if entry.outstanding.is_some() {
            return Err(failure("a buffer is already examined"));
        }

        let index = actual as usize % entry.ring.len();
        let buffer = &mut entry.ring[index];
        buffer.fill((actual & 0xff) as u8);
        entry.outstanding = Some(actual);

        Ok(ExaminedBuffer {
            sequence: actual,
            address: if null_address {
                std::ptr::null()
            } else {
                buffer.as_ptr()
            },
        })
    }

    fn release_buffer(&self, session: SessionId) -> DriverResult<()> {
        let mut state = self.lock();
        let entry = state.session(session)?;
        if entry.outstanding.take().is_none() {
            return Err(failure("no buffer examined"));
        }
        state.counters.releases += 1;
        Ok(())
    }
}

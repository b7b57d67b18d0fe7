// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Loading the NI-IMAQ library and the [`Driver`] implementation on top of it.

use std::ffi::{CStr, CString, OsStr, c_void};
use std::os::raw::c_char;
use std::sync::Arc;

use crate::driver::{
    Attribute, BufferSlot, Driver, DriverResult, ExaminedBuffer, InterfaceId, SessionId,
};
use crate::{DriverStatus, Result};

/// The dynamically loaded NI-IMAQ library.
pub struct ImaqApi {
    lib: imaq_sys::libimaq,
}

/// Shared handle to the loaded library.
pub type ImaqApiHandle = Arc<ImaqApi>;

/// Loads the NI-IMAQ library from `path`.
///
/// # Errors
///
/// Returns [`crate::Error::LibLoading`] if the library or any required symbol
/// cannot be found.
///
/// # Examples
///
/// ```no_run
/// use imaq::{config::library_path, load_api};
///
/// # fn main() -> Result<(), imaq::Error> {
/// let api = load_api(library_path())?;
/// # Ok(())
/// # }
/// ```
pub fn load_api(path: impl AsRef<OsStr>) -> Result<ImaqApiHandle> {
    let lib = unsafe { imaq_sys::libimaq::new(path)? };
    Ok(Arc::new(ImaqApi { lib }))
}

impl ImaqApi {
    /// Maps a return code to a `Result`, attaching the driver's description.
    fn check(&self, code: imaq_sys::Status) -> DriverResult<()> {
        DriverStatus::from_status(code).map_err(|mut status| {
            status.message = self.describe(code);
            status
        })
    }

    /// Asks the driver for a human readable description of `code`.
    fn describe(&self, code: imaq_sys::Status) -> Option<String> {
        let mut text = [0 as c_char; imaq_sys::ERROR_TEXT_SIZE];
        let rval = unsafe { self.lib.show_error(code, text.as_mut_ptr()) };
        if rval != imaq_sys::IMG_ERR_GOOD {
            return None;
        }
        let text = unsafe { CStr::from_ptr(text.as_ptr()) };
        let text = text.to_string_lossy().trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    fn close_handle(&self, id: imaq_sys::VoidId) -> DriverResult<()> {
        // Free the driver-side resources (ring buffers included) with the handle.
        self.check(unsafe { self.lib.close(id, 1) })
    }
}

impl Driver for ImaqApi {
    fn query_interface_name(&self, index: u32) -> DriverResult<String> {
        let mut name = [0 as c_char; imaq_sys::INTERFACE_NAME_SIZE];
        // The driver signals "no more interfaces" with a failure; it is not
        // worth a round trip to imgShowError.
        DriverStatus::from_status(unsafe {
            self.lib.interface_query_names(index, name.as_mut_ptr())
        })?;
        let name = unsafe { CStr::from_ptr(name.as_ptr()) };
        Ok(name.to_string_lossy().into_owned())
    }

    fn open_interface(&self, name: &str) -> DriverResult<InterfaceId> {
        let name = CString::new(name)
            .map_err(|_| DriverStatus::invalid_argument("interface name contains a NUL byte"))?;
        let mut iid: imaq_sys::InterfaceId = 0;
        self.check(unsafe { self.lib.interface_open(name.as_ptr(), &mut iid) })?;
        Ok(InterfaceId(iid))
    }

    fn close_interface(&self, interface: InterfaceId) -> DriverResult<()> {
        self.close_handle(interface.0)
    }

    fn open_session(&self, interface: InterfaceId) -> DriverResult<SessionId> {
        let mut sid: imaq_sys::SessionId = 0;
        self.check(unsafe { self.lib.session_open(interface.0, &mut sid) })?;
        Ok(SessionId(sid))
    }

    fn close_session(&self, session: SessionId) -> DriverResult<()> {
        self.close_handle(session.0)
    }

    fn get_attribute(&self, interface: InterfaceId, attribute: Attribute) -> DriverResult<u32> {
        let mut value: u32 = 0;
        self.check(unsafe {
            self.lib.get_attribute(
                interface.0,
                attribute.id(),
                &mut value as *mut u32 as *mut c_void,
            )
        })?;
        Ok(value)
    }

    unsafe fn ring_setup(
        &self,
        session: SessionId,
        slots: &mut [BufferSlot],
        skip_count: u32,
        start_now: bool,
    ) -> DriverResult<()> {
        // BufferSlot is repr(transparent) over `void*`.
        let list = slots.as_mut_ptr() as *mut *mut c_void;
        self.check(unsafe {
            self.lib.ring_setup(
                session.0,
                slots.len() as u32,
                list,
                skip_count,
                u32::from(start_now),
            )
        })
    }

    fn start_acquisition(&self, session: SessionId) -> DriverResult<()> {
        self.check(unsafe { self.lib.session_start_acquisition(session.0) })
    }

    fn stop_acquisition(&self, session: SessionId) -> DriverResult<()> {
        self.check(unsafe { self.lib.session_stop_acquisition(session.0) })
    }

    fn examine_buffer(&self, session: SessionId, sequence: u32) -> DriverResult<ExaminedBuffer> {
        let mut actual: u32 = 0;
        let mut address: *mut c_void = std::ptr::null_mut();
        self.check(unsafe {
            self.lib
                .session_examine_buffer2(session.0, sequence, &mut actual, &mut address)
        })?;
        Ok(ExaminedBuffer {
            sequence: actual,
            address: address as *const u8,
        })
    }

    fn release_buffer(&self, session: SessionId) -> DriverResult<()> {
        self.check(unsafe { self.lib.session_release_buffer(session.0) })
    }
}

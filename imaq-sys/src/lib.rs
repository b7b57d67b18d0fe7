// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! # imaq-sys: Raw FFI bindings to the NI-IMAQ C library
//!
//! This crate provides low-level, unsafe Rust bindings to the National
//! Instruments IMAQ frame-grabber driver (`niimaq.h`). The driver is resolved at
//! runtime with `libloading`, so nothing links against the vendor library at
//! build time.
//!
//! ## Overview
//!
//! `imaq-sys` exposes:
//! - Raw C types (`InterfaceId`, `SessionId`, `Status`, ...)
//! - Raw C functions (prefixed with `img` in C, converted to snake_case in Rust)
//! - Constants for status codes and attribute identifiers
//!
//! ## Usage
//!
//! **Most users should NOT use this crate directly.** Use the safe [`imaq`]
//! wrapper crate instead, which provides RAII handles, `Result` based error
//! handling and a mockable driver trait.
//!
//! ## Safety
//!
//! All functions in this crate are `unsafe` and require the caller to uphold the
//! driver's invariants:
//! - A session must be opened on an open interface and closed before it
//! - A buffer returned by `session_examine_buffer2` is only valid until
//!   `session_release_buffer` is called
//! - Buffer lists handed to `ring_setup` must outlive the session
//!
//! [`imaq`]: https://docs.rs/imaq

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate libloading;

use std::ffi::OsStr;
use std::os::raw::{c_char, c_void};

/// Signed driver return code (`Int32` in `niimaq.h`).
pub type Status = i32;

/// Interface handle (`INTERFACE_ID`).
pub type InterfaceId = u32;

/// Session handle (`SESSION_ID`).
pub type SessionId = u32;

/// Any handle accepted by `imgClose` / `imgGetAttribute`.
pub type VoidId = u32;

/// Driver call succeeded.
pub const IMG_ERR_GOOD: Status = 0;

/// Base offset of all attribute identifiers.
pub const _IMG_BASE: u32 = 0x3FF6_0000;

pub const IMG_ATTR_INTERFACE_TYPE: u32 = _IMG_BASE + 0x0001;
pub const IMG_ATTR_PIXDEPTH: u32 = _IMG_BASE + 0x0002;
pub const IMG_ATTR_BITSPERPIXEL: u32 = _IMG_BASE + 0x0066;
pub const IMG_ATTR_BYTESPERPIXEL: u32 = _IMG_BASE + 0x0067;
pub const IMG_ATTR_ROI_WIDTH: u32 = _IMG_BASE + 0x01A6;
pub const IMG_ATTR_ROI_HEIGHT: u32 = _IMG_BASE + 0x01A7;
pub const IMG_ATTR_NUM_PORTS: u32 = _IMG_BASE + 0x0218;

/// Maximum length of an interface name, including the terminator.
pub const INTERFACE_NAME_SIZE: usize = 256;

/// Buffer size required by `imgShowError`.
pub const ERROR_TEXT_SIZE: usize = 256;

pub type interface_query_names_fn =
    unsafe extern "C" fn(index: u32, query_name: *mut c_char) -> Status;
pub type interface_open_fn =
    unsafe extern "C" fn(interface_name: *const c_char, ifid: *mut InterfaceId) -> Status;
pub type session_open_fn = unsafe extern "C" fn(ifid: InterfaceId, sid: *mut SessionId) -> Status;
pub type close_fn = unsafe extern "C" fn(void_id: VoidId, free_resources: u32) -> Status;
pub type get_attribute_fn =
    unsafe extern "C" fn(void_id: VoidId, attribute: u32, value: *mut c_void) -> Status;
pub type ring_setup_fn = unsafe extern "C" fn(
    sid: SessionId,
    number_buffer: u32,
    buffer_list: *mut *mut c_void,
    skip_count: u32,
    start_now: u32,
) -> Status;
pub type session_acquisition_fn = unsafe extern "C" fn(sid: SessionId) -> Status;
pub type session_examine_buffer2_fn = unsafe extern "C" fn(
    sid: SessionId,
    which_buffer: u32,
    buffer_number: *mut u32,
    buffer_addr: *mut *mut c_void,
) -> Status;
pub type session_release_buffer_fn = unsafe extern "C" fn(sid: SessionId) -> Status;
pub type show_error_fn = unsafe extern "C" fn(error: Status, text: *mut c_char) -> Status;

/// Dynamically loaded NI-IMAQ entry points.
///
/// All symbols are required; loading fails if any of them is missing.
pub struct libimaq {
    __library: ::libloading::Library,
    pub interface_query_names: interface_query_names_fn,
    pub interface_open: interface_open_fn,
    pub session_open: session_open_fn,
    pub close: close_fn,
    pub get_attribute: get_attribute_fn,
    pub ring_setup: ring_setup_fn,
    pub session_start_acquisition: session_acquisition_fn,
    pub session_stop_acquisition: session_acquisition_fn,
    pub session_examine_buffer2: session_examine_buffer2_fn,
    pub session_release_buffer: session_release_buffer_fn,
    pub show_error: show_error_fn,
}

impl libimaq {
    pub unsafe fn new<P>(path: P) -> Result<Self, ::libloading::Error>
    where
        P: AsRef<OsStr>,
    {
        let library = ::libloading::Library::new(path)?;
        Self::from_library(library)
    }

    pub unsafe fn from_library<L>(library: L) -> Result<Self, ::libloading::Error>
    where
        L: Into<::libloading::Library>,
    {
        let __library = library.into();
        let interface_query_names: interface_query_names_fn = *__library.get::<interface_query_names_fn>(b"imgInterfaceQueryNames\0")?;
        let interface_open: interface_open_fn = *__library.get::<interface_open_fn>(b"imgInterfaceOpen\0")?;
        let session_open: session_open_fn = *__library.get::<session_open_fn>(b"imgSessionOpen\0")?;
        let close: close_fn = *__library.get::<close_fn>(b"imgClose\0")?;
        let get_attribute: get_attribute_fn = *__library.get::<get_attribute_fn>(b"imgGetAttribute\0")?;
        let ring_setup: ring_setup_fn = *__library.get::<ring_setup_fn>(b"imgRingSetup\0")?;
        let session_start_acquisition: session_acquisition_fn = *__library.get::<session_acquisition_fn>(b"imgSessionStartAcquisition\0")?;
        let session_stop_acquisition: session_acquisition_fn = *__library.get::<session_acquisition_fn>(b"imgSessionStopAcquisition\0")?;
        let session_examine_buffer2: session_examine_buffer2_fn = *__library.get::<session_examine_buffer2_fn>(b"imgSessionExamineBuffer2\0")?;
        let session_release_buffer: session_release_buffer_fn = *__library.get::<session_release_buffer_fn>(b"imgSessionReleaseBuffer\0")?;
        let show_error: show_error_fn = *__library.get::<show_error_fn>(b"imgShowError\0")?;
        Ok(libimaq {
            __library,
            interface_query_names,
            interface_open,
            session_open,
            close,
            get_attribute,
            ring_setup,
            session_start_acquisition,
            session_stop_acquisition,
            session_examine_buffer2,
            session_release_buffer,
            show_error,
        })
    }

    pub unsafe fn interface_query_names(&self, index: u32, query_name: *mut c_char) -> Status {
        (self.interface_query_names)(index, query_name)
    }

    pub unsafe fn interface_open(
        &self,
        interface_name: *const c_char,
        ifid: *mut InterfaceId,
    ) -> Status {
        (self.interface_open)(interface_name, ifid)
    }

    pub unsafe fn session_open(&self, ifid: InterfaceId, sid: *mut SessionId) -> Status {
        (self.session_open)(ifid, sid)
    }

    pub unsafe fn close(&self, void_id: VoidId, free_resources: u32) -> Status {
        (self.close)(void_id, free_resources)
    }

    pub unsafe fn get_attribute(&self, void_id: VoidId, attribute: u32, value: *mut c_void) -> Status {
        (self.get_attribute)(void_id, attribute, value)
    }

    pub unsafe fn ring_setup(
        &self,
        sid: SessionId,
        number_buffer: u32,
        buffer_list: *mut *mut c_void,
        skip_count: u32,
        start_now: u32,
    ) -> Status {
        (self.ring_setup)(sid, number_buffer, buffer_list, skip_count, start_now)
    }

    pub unsafe fn session_start_acquisition(&self, sid: SessionId) -> Status {
        (self.session_start_acquisition)(sid)
    }

    pub unsafe fn session_stop_acquisition(&self, sid: SessionId) -> Status {
        (self.session_stop_acquisition)(sid)
    }

    pub unsafe fn session_examine_buffer2(
        &self,
        sid: SessionId,
        which_buffer: u32,
        buffer_number: *mut u32,
        buffer_addr: *mut *mut c_void,
    ) -> Status {
        (self.session_examine_buffer2)(sid, which_buffer, buffer_number, buffer_addr)
    }

    pub unsafe fn session_release_buffer(&self, sid: SessionId) -> Status {
        (self.session_release_buffer)(sid)
    }

    pub unsafe fn show_error(&self, error: Status, text: *mut c_char) -> Status {
        (self.show_error)(error, text)
    }
}

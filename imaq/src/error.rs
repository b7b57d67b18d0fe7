// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for NI-IMAQ operations.
//!
//! Driver calls return a signed status code. [`DriverStatus`] carries that code
//! (and the driver's description of it, when available); [`Error`] names the
//! acquisition step that failed.

use std::fmt;

use crate::driver::Attribute;

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Code used for arguments that never reached the driver.
pub const INVALID_ARGUMENT: imaq_sys::Status = -1;

/// A non-zero status code returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverStatus {
    /// Raw `Int32` return code.
    pub code: imaq_sys::Status,

    /// Text from `imgShowError`, if the driver could describe the code.
    pub message: Option<String>,
}

impl DriverStatus {
    /// Creates a status without a description.
    pub fn new(code: imaq_sys::Status) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Status for arguments rejected before reaching the driver.
    pub fn invalid_argument(message: &str) -> Self {
        Self {
            code: INVALID_ARGUMENT,
            message: Some(message.to_string()),
        }
    }

    /// Converts a raw driver return code to a `Result`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if `code == IMG_ERR_GOOD`
    /// - `Err(DriverStatus)` for any other code
    pub fn from_status(code: imaq_sys::Status) -> core::result::Result<(), DriverStatus> {
        match code {
            imaq_sys::IMG_ERR_GOOD => Ok(()),
            other => Err(DriverStatus::new(other)),
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver status {:#010x}", self.code)?;
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverStatus {}

/// Errors that can occur when driving a frame grabber.
///
/// The start-phase variants (`InterfaceOpen`, `SessionOpen`, `RingSetup`,
/// `AcquisitionStart`) are only returned after every handle opened by that
/// start attempt has been closed again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The named interface could not be opened.
    #[error("Failed to open camera interface '{name}': {source}")]
    InterfaceOpen {
        name: String,
        #[source]
        source: DriverStatus,
    },

    /// No session could be opened on the interface.
    #[error("Failed to open camera session: {source}")]
    SessionOpen {
        #[source]
        source: DriverStatus,
    },

    /// The driver rejected the ring configuration.
    #[error("Failed to create ring buffer with {buffers} buffers: {source}")]
    RingSetup {
        buffers: u32,
        #[source]
        source: DriverStatus,
    },

    /// The camera never reported ready for acquisition.
    #[error("Camera did not start after {attempts} attempts: {source}")]
    AcquisitionStart {
        attempts: u32,
        #[source]
        source: DriverStatus,
    },

    /// The driver refused to stop acquisition. Handles are closed regardless.
    #[error("Unable to stop acquisition: {source}")]
    AcquisitionStop {
        #[source]
        source: DriverStatus,
    },

    /// A camera attribute could not be read.
    #[error("Hardware query failed: {reason}")]
    HardwareQuery {
        reason: String,
        #[source]
        source: Option<DriverStatus>,
    },

    /// The driver could not hand out the requested buffer.
    #[error("Failed to examine buffer {sequence}: {source}")]
    BufferExamine {
        sequence: u32,
        #[source]
        source: DriverStatus,
    },

    /// A frame does not fit into the ring buffers the driver allocated.
    #[error("Frame of {requested} bytes does not fit ring buffers of {capacity} bytes")]
    FrameSize { requested: usize, capacity: usize },

    /// A frame was requested while no acquisition is running.
    #[error("Acquisition not started")]
    NotStarted,

    /// `start` was called on a running acquisition.
    #[error("Acquisition already started")]
    AlreadyStarted,

    /// A frame was requested before a frame size was negotiated.
    #[error("Frame format not negotiated")]
    NotNegotiated,

    /// The ring must hold at least one buffer.
    #[error("Invalid ring buffer count: {0}")]
    InvalidBufferCount(u32),

    /// Any other failing driver call.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverStatus),

    /// A generic error for failures not tied to a driver call.
    #[error("Other error: {0}")]
    Other(String),

    /// Failed to convert a Rust string to a C-compatible null-terminated string.
    #[error("Null string: {0}")]
    NulString(#[from] std::ffi::NulError),

    /// Failed to load the NI-IMAQ dynamic library.
    #[error("Loading library: {0}")]
    LibLoading(#[from] libloading::Error),
}

impl Error {
    /// Builds a [`Error::HardwareQuery`] for a failed attribute read.
    pub(crate) fn attribute(attribute: Attribute, source: DriverStatus) -> Self {
        Error::HardwareQuery {
            reason: format!("attempt to read attribute {attribute:?} failed"),
            source: Some(source),
        }
    }

    /// Driver status behind this error, if a driver call failed.
    pub fn driver_status(&self) -> Option<&DriverStatus> {
        match self {
            Error::InterfaceOpen { source, .. }
            | Error::SessionOpen { source }
            | Error::RingSetup { source, .. }
            | Error::AcquisitionStart { source, .. }
            | Error::AcquisitionStop { source }
            | Error::BufferExamine { source, .. }
            | Error::Driver(source) => Some(source),
            Error::HardwareQuery { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

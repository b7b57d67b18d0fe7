// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! # IMAQ - NI-IMAQ frame grabber access
//!
//! Safe, idiomatic Rust bindings for the NI-IMAQ C library, covering what a
//! live video source needs: interface discovery, camera format queries and a
//! continuous buffer-ring acquisition.
//!
//! ## Overview
//!
//! The raw FFI lives in [`imaq_sys`]; this crate puts a [`Driver`] trait on top
//! of it so the acquisition logic can run against the real library
//! ([`ImaqApi`]) or the in-memory [`mock::MockDriver`].
//!
//! ### Key Concepts
//!
//! - **Interface**: a frame-grabber port, named `img0` or `img0::1` ([`Interface`])
//! - **Session**: an acquisition context opened on an interface ([`Session`])
//! - **Ring**: a fixed number of driver-owned buffers filled in a circle
//! - **Sequence number**: the running number of each completed buffer
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ AcquisitionManager │
//! └─────────┬──────────┘
//!           │
//!           ├─► Interface ──► CameraFormat
//!           │
//!           └─► Session ──► Ring ──► BufferLease ──► Frame (copied)
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use imaq::{AcquisitionManager, ImaqDriver, config, load_api};
//!
//! # fn main() -> Result<(), imaq::Error> {
//! let driver: ImaqDriver = load_api(config::library_path())?;
//!
//! let mut manager = AcquisitionManager::new(driver);
//! manager.start("img0", 10)?;
//! manager.set_frame_size(manager.camera_format()?.frame_size())?;
//!
//! for _ in 0..100 {
//!     let frame = manager.deliver_frame()?;
//!     println!("frame {} ({} dropped)", frame.sequence, frame.dropped);
//! }
//! manager.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - [`ImaqApi`] and [`mock::MockDriver`] are `Send + Sync` and shared as [`ImaqDriver`]
//! - [`AcquisitionManager`], [`Interface`] and [`Session`] are `Send`; guard them with a
//!   `Mutex` when several threads use them
//! - A [`BufferLease`] borrows its session and cannot outlive it

mod acquisition;
mod api;
mod driver;
mod enumerate;
mod error;
mod format;
mod interface;
mod session;

pub mod config;
pub mod mock;

pub use acquisition::{AcquisitionManager, AcquisitionState, Frame, FrameStats, StartPolicy};
pub use api::{ImaqApi, ImaqApiHandle, load_api};
pub use driver::{
    Attribute, BufferSlot, Driver, DriverResult, ExaminedBuffer, ImaqDriver, InterfaceId,
    SessionId,
};
pub use enumerate::{
    CONFIG_SERVICE_NAME, InterfaceCache, InterfaceDescriptor, MAX_INTERFACES, MAX_PORTS,
    enumerate_interfaces,
};
pub use error::{DriverStatus, Error, INVALID_ARGUMENT, Result};
pub use format::CameraFormat;
pub use interface::Interface;
pub use session::{BufferLease, Session};

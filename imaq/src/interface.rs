// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Owned interface handles.

use crate::driver::{Attribute, Driver, ImaqDriver, InterfaceId};
use crate::{CameraFormat, Error, Result, Session};

/// An open frame-grabber interface.
///
/// The handle is closed when the value is dropped. Sessions opened from it do
/// not borrow it; owners must drop every [`Session`] before its interface.
pub struct Interface {
    driver: ImaqDriver,
    id: InterfaceId,
    name: String,
}

impl Interface {
    /// Opens the interface called `name` (e.g. `img0` or `img0::1`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceOpen`] if the driver refuses the name.
    pub fn open(driver: &ImaqDriver, name: &str) -> Result<Self> {
        let id = driver
            .open_interface(name)
            .map_err(|source| Error::InterfaceOpen {
                name: name.to_string(),
                source,
            })?;
        tracing::debug!(interface = name, iid = id.0, "Opened interface");
        Ok(Self {
            driver: driver.clone(),
            id,
            name: name.to_string(),
        })
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads a single attribute.
    pub fn attribute(&self, attribute: Attribute) -> Result<u32> {
        read_attribute(&*self.driver, self.id, attribute)
    }

    /// Number of camera ports exposed by this interface.
    pub fn port_count(&self) -> Result<u32> {
        self.attribute(Attribute::NumPorts)
    }

    /// Reads the camera's current format.
    ///
    /// All four attribute reads must succeed; the first failure is returned
    /// and nothing is built from the values read before it.
    pub fn camera_format(&self) -> Result<CameraFormat> {
        read_camera_format(&*self.driver, self.id)
    }

    /// Opens an acquisition session on this interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionOpen`] if the driver refuses.
    pub fn open_session(&self) -> Result<Session> {
        let id = self
            .driver
            .open_session(self.id)
            .map_err(|source| Error::SessionOpen { source })?;
        tracing::debug!(interface = %self.name, sid = id.0, "Opened session");
        Ok(Session::new(self.driver.clone(), id, self.id))
    }

    /// Closes the interface, reporting a driver failure.
    pub fn close(mut self) -> Result<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<()> {
        if !self.id.is_open() {
            return Ok(());
        }
        let id = std::mem::take(&mut self.id);
        self.driver.close_interface(id)?;
        tracing::debug!(interface = %self.name, iid = id.0, "Closed interface");
        Ok(())
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        if let Err(err) = self.close_inner() {
            tracing::error!("Failed to close interface '{}': {:?}", self.name, err);
        }
    }
}

fn read_attribute(driver: &dyn Driver, interface: InterfaceId, attribute: Attribute) -> Result<u32> {
    driver
        .get_attribute(interface, attribute)
        .map_err(|source| Error::attribute(attribute, source))
}

/// Reads the camera format of `interface`.
///
/// Values that do not describe a frame that fits in memory are rejected as
/// [`Error::HardwareQuery`].
pub(crate) fn read_camera_format(
    driver: &dyn Driver,
    interface: InterfaceId,
) -> Result<CameraFormat> {
    let bits_per_pixel = read_attribute(driver, interface, Attribute::BitsPerPixel)?;
    let bytes_per_pixel = read_attribute(driver, interface, Attribute::BytesPerPixel)?;
    let width = read_attribute(driver, interface, Attribute::RoiWidth)?;
    let height = read_attribute(driver, interface, Attribute::RoiHeight)?;

    let implausible = |what: &str| Error::HardwareQuery {
        reason: format!("driver reported an implausible {what}"),
        source: None,
    };
    let depth = bytes_per_pixel
        .checked_mul(8)
        .ok_or_else(|| implausible("bytes per pixel value"))?;
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel as usize))
        .ok_or_else(|| implausible("frame size"))?;

    Ok(CameraFormat {
        width,
        height,
        bits_per_pixel,
        depth,
    })
}

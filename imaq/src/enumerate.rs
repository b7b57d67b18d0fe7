// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Interface discovery.
//!
//! The driver names its interfaces by index. Interfaces with several camera
//! ports are expanded to one addressable name per port (`img0::0`, `img0::1`).

use std::fmt;

use crate::Interface;
use crate::driver::ImaqDriver;

/// Highest number of interface indices queried.
pub const MAX_INTERFACES: u32 = 64;

/// Highest port count taken from the driver; larger values count as unreadable.
pub const MAX_PORTS: u32 = 16;

/// Name of the driver's configuration service, which is not a camera interface.
pub const CONFIG_SERVICE_NAME: &str = "NICFGen.iid";

/// An addressable interface, optionally narrowed to one port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    interface: String,
    port: Option<u32>,
}

impl InterfaceDescriptor {
    /// Descriptor for a single-port interface.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            port: None,
        }
    }

    /// Descriptor for one port of a multi-port interface.
    pub fn with_port(interface: impl Into<String>, port: u32) -> Self {
        Self {
            interface: interface.into(),
            port: Some(port),
        }
    }

    /// Name of the interface without the port suffix.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn port(&self) -> Option<u32> {
        self.port
    }

    /// Name to pass to `imgInterfaceOpen` (and to the `interface` property).
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}::{}", self.interface, port),
            None => f.write_str(&self.interface),
        }
    }
}

/// Probes the driver for every usable interface.
///
/// Probing stops at the first index the driver cannot name. Interfaces that
/// fail to open are skipped. Each queried interface is closed again before the
/// next index is queried.
pub fn enumerate_interfaces(driver: &ImaqDriver) -> Vec<InterfaceDescriptor> {
    tracing::debug!("About to scan for IMAQ interfaces");
    let mut interfaces = Vec::new();

    for index in 0..MAX_INTERFACES {
        let name = match driver.query_interface_name(index) {
            Ok(name) => name,
            Err(_) => break,
        };

        if name == CONFIG_SERVICE_NAME {
            continue;
        }

        let interface = match Interface::open(driver, &name) {
            Ok(interface) => interface,
            Err(err) => {
                tracing::debug!("Skipping interface '{}': {}", name, err);
                continue;
            }
        };

        let ports = match interface.port_count() {
            Ok(ports) if (1..=MAX_PORTS).contains(&ports) => ports,
            Ok(ports) => {
                tracing::debug!("Implausible port count {} for '{}', assuming 1", ports, name);
                1
            }
            Err(err) => {
                tracing::debug!("Port count of '{}' unavailable ({}), assuming 1", name, err);
                1
            }
        };
        drop(interface);

        for port in 0..ports {
            let descriptor = if ports > 1 {
                InterfaceDescriptor::with_port(name.as_str(), port)
            } else {
                InterfaceDescriptor::new(name.as_str())
            };
            tracing::debug!("Adding interface '{}' to list", descriptor);
            interfaces.push(descriptor);
        }
    }

    interfaces
}

/// Result of the last enumeration, replaced as a whole on refresh.
///
/// The cache does no locking of its own; share it behind a `Mutex` if several
/// threads need it.
#[derive(Debug, Default)]
pub struct InterfaceCache {
    interfaces: Option<Vec<InterfaceDescriptor>>,
}

impl InterfaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached list, if an enumeration has happened.
    pub fn get(&self) -> Option<&[InterfaceDescriptor]> {
        self.interfaces.as_deref()
    }

    /// Drops the cached list.
    pub fn invalidate(&mut self) {
        self.interfaces = None;
    }

    /// Re-enumerates unconditionally and caches the result.
    pub fn refresh(&mut self, driver: &ImaqDriver) -> &[InterfaceDescriptor] {
        self.interfaces = None;
        self.interfaces.insert(enumerate_interfaces(driver))
    }

    /// Returns the cached list unless `force` is set or nothing is cached yet.
    ///
    /// The flag is `true` when the returned list came from the cache.
    pub fn enumerate(
        &mut self,
        driver: &ImaqDriver,
        force: bool,
    ) -> (&[InterfaceDescriptor], bool) {
        if !force && self.interfaces.is_some() {
            return (self.interfaces.as_deref().unwrap_or_default(), true);
        }
        (self.refresh(driver), false)
    }
}

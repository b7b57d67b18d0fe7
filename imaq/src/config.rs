// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Defaults and environment lookups.

use std::path::PathBuf;

/// Environment variable overriding the location of the NI-IMAQ library.
pub const LIBRARY_PATH_ENV: &str = "IMAQ_LIBRARY_PATH";

/// Library name resolved by the platform loader when no override is set.
#[cfg(windows)]
pub const DEFAULT_LIBRARY: &str = "imaq.dll";
#[cfg(not(windows))]
pub const DEFAULT_LIBRARY: &str = "libimaq.so";

/// Interface opened when none is configured.
pub const DEFAULT_INTERFACE: &str = "img0";

/// Ring length used when none is configured.
pub const DEFAULT_BUFFER_COUNT: u32 = 10;

/// Path of the NI-IMAQ library to load.
///
/// Uses `IMAQ_LIBRARY_PATH` when it is set and not empty, [`DEFAULT_LIBRARY`]
/// otherwise.
pub fn library_path() -> PathBuf {
    std::env::var_os(LIBRARY_PATH_ENV)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY))
}

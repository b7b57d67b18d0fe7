// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Common utilities shared across examples.

use std::sync::Arc;

use imaq::{ImaqDriver, config, load_api, mock::MockDriver};

/// Initializes tracing subscriber for examples.
///
/// Configures logging to stdout with an INFO level filter, respecting the
/// `RUST_LOG` environment variable for custom log levels.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

/// Loads the NI-IMAQ library, or builds a two-interface mock driver.
pub fn driver(mock: bool) -> Result<ImaqDriver, imaq::Error> {
    if mock {
        return Ok(Arc::new(
            MockDriver::new()
                .with_interface("img0", 1)
                .with_interface("img1", 2),
        ));
    }
    let path = config::library_path();
    tracing::info!("Loading NI-IMAQ from {}", path.display());
    Ok(load_api(path)?)
}

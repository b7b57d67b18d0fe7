// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Lists frame-grabber interfaces and pulls frames from one of them.
//!
//! ```text
//! cargo run --example imaq-grab -- list
//! cargo run --example imaq-grab -- grab --interface img0 --frames 100 --output frames.raw
//! ```
//!
//! Pass `--mock` to run against the in-memory driver instead of NI-IMAQ.

mod common;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use imaq::{AcquisitionManager, InterfaceCache, config};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "imaq-grab")]
#[command(about = "Inspect NI-IMAQ frame grabbers")]
struct Args {
    /// Use the in-memory mock driver
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the available interfaces
    List {
        /// Enumerate twice, the second time bypassing the cache
        #[arg(long)]
        force: bool,
    },

    /// Acquire frames and print the frame counters
    Grab {
        /// Interface to open
        #[arg(short, long, default_value = config::DEFAULT_INTERFACE)]
        interface: String,

        /// Number of frames to pull
        #[arg(short = 'n', long, default_value_t = 10)]
        frames: u64,

        /// Number of buffers in the ring
        #[arg(short, long, default_value_t = config::DEFAULT_BUFFER_COUNT)]
        buffer_size: u32,

        /// Append the raw frames to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let args = Args::parse();
    let driver = common::driver(args.mock)?;

    match args.command {
        Command::List { force } => {
            let mut cache = InterfaceCache::new();
            let (interfaces, _) = cache.enumerate(&driver, false);
            if interfaces.is_empty() {
                warn!("No interfaces found");
            }
            for interface in interfaces {
                println!("{interface}");
            }
            if force {
                let (interfaces, cached) = cache.enumerate(&driver, true);
                info!(cached, "Re-enumerated {} interfaces", interfaces.len());
            }
        }
        Command::Grab {
            interface,
            frames,
            buffer_size,
            output,
        } => {
            let mut output = output.map(File::create).transpose()?;

            let mut manager = AcquisitionManager::new(driver);
            manager.start(&interface, buffer_size)?;

            let format = manager.camera_format()?;
            info!(
                "{}x{}, {} bits per pixel, depth {}",
                format.width, format.height, format.bits_per_pixel, format.depth
            );
            manager.set_frame_size(format.frame_size())?;

            for _ in 0..frames {
                let frame = manager.deliver_frame()?;
                if let Some(file) = output.as_mut() {
                    file.write_all(&frame.data)?;
                }
            }

            let stats = manager.stats();
            manager.stop()?;
            println!("delivered: {}", stats.delivered);
            println!("dropped:   {}", stats.dropped);
        }
    }

    Ok(())
}

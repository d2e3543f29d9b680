//! # MVD2 Parser
//!
//! A decoder and analytics pipeline for Quake 2 multi-view demos (`.mvd2`),
//! as recorded by q2pro-derived servers running Action Quake.
//!
//! A capture is decoded into:
//! - a per-frame timeline of player positions and headings, and
//! - a [`DemoSummary`] of kills, hits, awards, round outcomes, accuracy and
//!   damage estimates mined from the server's text broadcasts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mvd2_parser::{load_file, ParseOptions};
//!
//! fn main() -> mvd2_parser::Result<()> {
//!     let summary = load_file("match.mvd2", &ParseOptions::default())?;
//!
//!     println!("Map: {}", summary.map);
//!     println!("Duration: {}s over {} frames", summary.duration, summary.frame_count);
//!     for (name, kills) in &summary.kill_counts {
//!         println!("  {name}: {kills} kills");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias
//! - [`binary`] - Little-endian byte cursor
//! - [`format`] - Wire constants and opcode tables
//! - [`decompress`] - gzip container unwrapping
//! - [`blocks`] - Length-prefixed block framing
//! - [`config`] - Parse options
//! - [`protocol`] - Config-strings, player deltas, entity skipping, frames
//! - [`events`] - Gameplay events mined from print and centerprint text
//! - [`parser`] - Command dispatcher
//! - [`analysis`] - Aggregation into the result summary
//!
//! ## Fault tolerance
//!
//! Only a wrong magic tag or an empty gzip container fails a parse. A bad
//! command aborts the rest of its block, and a truncated file or gzip
//! stream ends the block stream early; in every case the frames and events
//! recovered so far are kept.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod binary;
pub mod blocks;
pub mod config;
pub mod decompress;
pub mod error;
pub mod events;
pub mod format;
pub mod parser;
pub mod protocol;

use std::path::Path;

use tracing::info;

// Re-export commonly used types at the crate root
pub use analysis::{summarize, DemoSummary};
pub use config::ParseOptions;
pub use error::{ParserError, Result};
pub use events::{
    AwardEvent, AwardKind, EventLog, HitEvent, HitLocation, KillEvent, RoundEvent, RoundOutcome,
    Weapon,
};
pub use parser::{decode, Capture, DecodeStats};
pub use protocol::{Frame, PlayerPosition};

/// Parses a capture with default options and the given frame cap.
///
/// A `max_frames` of 0 parses to the end of the capture.
///
/// # Errors
///
/// - `ParserError::InvalidMagic` if the data is not an MVD2 capture
/// - `ParserError::DecompressionError` if a gzip container yields no bytes
///
/// # Example
///
/// ```
/// let mut data = b"MVD2".to_vec();
/// data.extend_from_slice(&[0, 0]);
///
/// let summary = mvd2_parser::parse(&data, 0).unwrap();
/// assert_eq!(summary.map, "unknown");
/// assert_eq!(summary.frame_count, 0);
/// ```
pub fn parse(data: &[u8], max_frames: usize) -> Result<DemoSummary> {
    parse_with_options(data, &ParseOptions::default().with_max_frames(max_frames))
}

/// Parses a capture.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with_options(data: &[u8], options: &ParseOptions) -> Result<DemoSummary> {
    let capture = decode(data, options)?;
    let stats = capture.stats;
    let summary = summarize(capture, options);

    info!(
        map = %summary.map,
        frames = summary.frame_count,
        players = summary.player_names.len(),
        kills = summary.kills.len(),
        blocks = stats.blocks,
        blocks_aborted = stats.blocks_aborted,
        "parsed capture"
    );

    Ok(summary)
}

/// Reads and parses a capture file, raw or gzip-wrapped.
///
/// # Errors
///
/// - `ParserError::IoError` if the file cannot be read
/// - otherwise as [`parse`]
pub fn load_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<DemoSummary> {
    let data = std::fs::read(path)?;
    parse_with_options(&data, options)
}

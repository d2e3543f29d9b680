//! Parse configuration.
//!
//! [`ParseOptions`] gathers the knobs a host can turn without touching the
//! wire format: the frame cap, the config-string window holding the world
//! model, the spectator identity stripped from statistics, and the
//! respawn-clustering parameters used for round detection.
//!
//! Options deserialize from JSON with every field optional:
//!
//! ```
//! use mvd2_parser::config::ParseOptions;
//!
//! let opts: ParseOptions = serde_json::from_str(r#"{ "max_frames": 600 }"#).unwrap();
//! assert_eq!(opts.max_frames, 600);
//! assert_eq!(opts.world_model_slots, 32..40);
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::format::CS_MODELS_SCAN;

/// Pseudo-identity used by the server-side demo recorder.
pub const DEFAULT_SPECTATOR_NAME: &str = "[MVDSPEC]";

/// Maximum frame distance between respawns of the same round.
pub const DEFAULT_ROUND_GAP: usize = 150;

/// Minimum respawns needed before a cluster counts as a round start.
pub const DEFAULT_MIN_ROUND_CLUSTER: usize = 2;

/// Options controlling a single parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Stop after this many frames; 0 parses to the end of the capture.
    pub max_frames: usize,

    /// Config-string indices scanned for the `maps/<name>.bsp` world model.
    pub world_model_slots: Range<u16>,

    /// Player name excluded from per-player statistics.
    pub spectator_name: String,

    /// Respawns at most this many frames apart belong to one cluster.
    pub round_gap: usize,

    /// Clusters with fewer respawns than this are ignored.
    pub min_round_cluster: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_frames: 0,
            world_model_slots: CS_MODELS_SCAN,
            spectator_name: DEFAULT_SPECTATOR_NAME.to_string(),
            round_gap: DEFAULT_ROUND_GAP,
            min_round_cluster: DEFAULT_MIN_ROUND_CLUSTER,
        }
    }
}

impl ParseOptions {
    /// Returns these options with the frame cap replaced.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Returns whether `frame_count` has reached the configured cap.
    #[must_use]
    pub fn frame_cap_reached(&self, frame_count: usize) -> bool {
        self.max_frames != 0 && frame_count >= self.max_frames
    }
}

//! Decoders for the state-carrying MVD commands.
//!
//! - [`configstring`] - config-string table, map name and player identity
//! - [`player`] - player-state deltas and the persistent state table
//! - [`entity`] - entity delta skipping
//! - [`frame`] - frame decoding and position snapshots

pub mod configstring;
pub mod entity;
pub mod frame;
pub mod player;

pub use configstring::{ConfigStrings, TEAM_BLUE, TEAM_RED};
pub use entity::{skip_entities, skip_entity};
pub use frame::{decode_frame, DecodedFrame, Frame};
pub use player::{PlayerDelta, PlayerPosition, PlayerState, PlayerStateTable};

//! Command dispatcher and per-parse decode context.
//!
//! [`decode`] unwraps the container, walks the blocks and feeds every
//! command to a [`DecodeContext`]. The context owns all mutable state of a
//! single parse: the config-string table, the player-state table, the
//! frame timeline, the event log and the respawn candidates used for round
//! detection. Nothing is shared between parses.
//!
//! # Fault Handling
//!
//! Each block ends in one of three [`BlockOutcome`]s:
//!
//! - `Completed`: every command was dispatched;
//! - `Aborted`: a command failed (truncated field, unknown opcode, bad
//!   config-string index) and the rest of that block was dropped;
//! - `FrameCapReached`: the caller's frame cap was hit and decoding stops.
//!
//! None of these are errors to the caller. Only the container checks done
//! by [`crate::decompress::unwrap_container`] can fail a parse.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use tracing::{debug, trace};

use crate::binary::ByteCursor;
use crate::blocks::{BlockIterator, StreamEnd};
use crate::config::ParseOptions;
use crate::decompress::unwrap_container;
use crate::error::{ParserError, Result};
use crate::events::scanner::skip_sound;
use crate::events::{scan_payload, EventLog, PayloadSource};
use crate::format::{split_command_byte, MvdOp};
use crate::protocol::{decode_frame, ConfigStrings, Frame, PlayerStateTable};

/// Session header carried by the server-data command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerData {
    /// Protocol major version (37 for q2pro MVD2).
    pub major_version: u32,
    /// Protocol minor version.
    pub minor_version: u16,
    /// Server spawn count.
    pub server_count: u32,
    /// Game directory, e.g. `action`.
    pub game_dir: String,
    /// Client number of the recorder, or -1.
    pub client_num: i16,
}

/// How a block ended.
#[derive(Debug)]
pub enum BlockOutcome {
    /// Every command in the block was dispatched.
    Completed {
        /// Commands dispatched.
        commands: usize,
    },
    /// A command failed and the rest of the block was dropped.
    Aborted {
        /// Commands dispatched before the failure.
        commands: usize,
        /// What went wrong.
        error: ParserError,
    },
    /// The frame cap was reached.
    FrameCapReached,
}

/// Counters describing how the block stream was consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Blocks handed to the dispatcher.
    pub blocks: usize,
    /// Blocks that were cut short by a fault.
    pub blocks_aborted: usize,
    /// Whether decoding stopped at the frame cap.
    pub frame_cap_reached: bool,
    /// Why block iteration stopped, if it ran to the end.
    pub stream_end: Option<StreamEnd>,
}

/// Everything recovered from a capture, before aggregation.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    /// Session header, if a server-data command was seen.
    pub server: Option<ServerData>,
    /// Map name from the world model config-string.
    pub map_name: Option<String>,
    /// Client number → player name.
    pub player_names: BTreeMap<u8, String>,
    /// Client number → team (1 or 2).
    pub player_teams: BTreeMap<u8, u8>,
    /// Frame timeline.
    pub frames: Vec<Frame>,
    /// Raw events, duplicates included.
    pub events: EventLog,
    /// Frames in which a named client came back after being removed.
    pub respawn_frames: Vec<usize>,
    /// Block stream counters.
    pub stats: DecodeStats,
}

/// Mutable state of one parse.
#[derive(Debug)]
pub struct DecodeContext<'o> {
    options: &'o ParseOptions,
    server: Option<ServerData>,
    config: ConfigStrings,
    states: PlayerStateTable,
    frames: Vec<Frame>,
    events: EventLog,
    respawn_frames: Vec<usize>,
    removed: BTreeSet<u8>,
}

impl<'o> DecodeContext<'o> {
    /// Creates a fresh context.
    #[must_use]
    pub fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            server: None,
            config: ConfigStrings::new(options.world_model_slots.clone()),
            states: PlayerStateTable::new(),
            frames: Vec::new(),
            events: EventLog::new(),
            respawn_frames: Vec::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Returns the number of frames decoded so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Dispatches every command in one block.
    pub fn run_block(&mut self, payload: &[u8]) -> BlockOutcome {
        let mut cursor = ByteCursor::new(payload);
        let mut commands = 0;

        while !cursor.is_empty() {
            match self.dispatch(&mut cursor) {
                Ok(ControlFlow::Continue(())) => commands += 1,
                Ok(ControlFlow::Break(())) => return BlockOutcome::FrameCapReached,
                Err(error) => return BlockOutcome::Aborted { commands, error },
            }
        }

        BlockOutcome::Completed { commands }
    }

    /// Decodes one command.
    ///
    /// Returns `Break` when the frame cap has been reached.
    fn dispatch(&mut self, cursor: &mut ByteCursor<'_>) -> Result<ControlFlow<()>> {
        let offset = cursor.position();
        let (opcode, extra) = split_command_byte(cursor.read_u8()?);
        let op = MvdOp::from_bits(opcode).ok_or(ParserError::UnknownOpcode { opcode, offset })?;
        trace!(?op, offset, frame = self.frames.len(), "command");

        match op {
            MvdOp::Nop => {}
            MvdOp::ServerData => self.server_data(cursor)?,
            MvdOp::ConfigString => self.config.read_one(cursor)?,
            MvdOp::Frame => return self.frame(cursor),
            MvdOp::Unicast | MvdOp::UnicastReliable => {
                let len = extended_length(cursor.read_u8()?, extra);
                let client = cursor.read_u8()?;
                let payload = cursor.read_bytes(len)?;
                self.scan(payload, PayloadSource::Unicast { client });
            }
            MvdOp::MulticastAll
            | MvdOp::MulticastPhs
            | MvdOp::MulticastPvs
            | MvdOp::MulticastAllReliable
            | MvdOp::MulticastPhsReliable
            | MvdOp::MulticastPvsReliable => {
                let len = extended_length(cursor.read_u8()?, extra);
                if op.has_leafnum() {
                    cursor.skip(2)?;
                }
                let payload = cursor.read_bytes(len)?;
                self.scan(payload, PayloadSource::Multicast);
            }
            MvdOp::Sound => skip_sound(cursor)?,
            MvdOp::Print => {
                let _level = cursor.read_u8()?;
                let text = cursor.read_string()?;
                self.events.record_round_outcome(&text, self.frames.len());
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn server_data(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let server = ServerData {
            major_version: cursor.read_u32()?,
            minor_version: cursor.read_u16()?,
            server_count: cursor.read_u32()?,
            game_dir: cursor.read_string()?,
            client_num: cursor.read_i16()?,
        };
        debug!(
            major = server.major_version,
            minor = server.minor_version,
            game_dir = %server.game_dir,
            "server data"
        );
        self.server = Some(server);

        let strings = self.config.read_list(cursor)?;
        trace!(strings, "config-strings loaded");

        let decoded = decode_frame(cursor, &mut self.states, self.frames.len())?;
        self.frames.push(decoded.frame);
        decoded.entity_error.map_or(Ok(()), Err)
    }

    fn frame(&mut self, cursor: &mut ByteCursor<'_>) -> Result<ControlFlow<()>> {
        let index = self.frames.len();
        let before: BTreeSet<u8> = self.states.clients().collect();

        let decoded = decode_frame(cursor, &mut self.states, index)?;
        self.frames.push(decoded.frame);
        self.track_respawns(&before, index);

        if self.options.frame_cap_reached(self.frames.len()) {
            return Ok(ControlFlow::Break(()));
        }
        match decoded.entity_error {
            Some(error) => Err(error),
            None => Ok(ControlFlow::Continue(())),
        }
    }

    /// Records `index` as a respawn candidate if a named client that had
    /// been removed is back in the state table.
    fn track_respawns(&mut self, before: &BTreeSet<u8>, index: usize) {
        let mut respawned = false;

        for &client in before {
            if !self.states.contains(client) {
                self.removed.insert(client);
            }
        }
        for client in self.states.clients() {
            if before.contains(&client) || !self.removed.remove(&client) {
                continue;
            }
            if self.config.player_names().contains_key(&client) {
                respawned = true;
            }
        }

        if respawned && index > 0 {
            self.respawn_frames.push(index);
        }
    }

    fn scan(&mut self, payload: &[u8], source: PayloadSource) {
        let frame = self.frames.len();
        if let Err(error) = scan_payload(
            payload,
            source,
            frame,
            self.config.player_names(),
            &mut self.events,
        ) {
            trace!(?source, frame, %error, "payload scan stopped");
        }
    }

    /// Consumes the context and returns what it recovered.
    #[must_use]
    pub fn finish(self, stats: DecodeStats) -> Capture {
        Capture {
            server: self.server,
            map_name: self.config.map_name().map(str::to_string),
            player_names: self.config.player_names().clone(),
            player_teams: self.config.player_teams().clone(),
            frames: self.frames,
            events: self.events,
            respawn_frames: self.respawn_frames,
            stats,
        }
    }
}

/// Combines a length byte with the 3 extra bits of the command byte.
fn extended_length(low: u8, extra: u8) -> usize {
    usize::from(low) | (usize::from(extra) << 8)
}

/// Decodes a capture into frames and raw events.
///
/// # Errors
///
/// - `ParserError::InvalidMagic` if the data is not an MVD2 capture
/// - `ParserError::DecompressionError` if a gzip container yields no bytes
///
/// Faults inside blocks are never returned; they only shorten the block
/// they occur in.
pub fn decode(data: &[u8], options: &ParseOptions) -> Result<Capture> {
    let data = unwrap_container(data)?;
    let mut context = DecodeContext::new(options);
    let mut stats = DecodeStats::default();
    let mut blocks = BlockIterator::new(&data);

    for block in blocks.by_ref() {
        match context.run_block(block.payload) {
            BlockOutcome::Completed { commands } => {
                trace!(block = block.index, commands, "block complete");
            }
            BlockOutcome::Aborted { commands, error } => {
                stats.blocks_aborted += 1;
                debug!(
                    block = block.index,
                    offset = block.offset,
                    commands,
                    %error,
                    "block aborted"
                );
            }
            BlockOutcome::FrameCapReached => {
                stats.frame_cap_reached = true;
                debug!(frames = context.frame_count(), "frame cap reached");
                break;
            }
        }
    }

    stats.blocks = blocks.block_count();
    stats.stream_end = blocks.stream_end();
    debug!(
        blocks = stats.blocks,
        offset = blocks.current_offset(),
        end = ?stats.stream_end,
        "block stream finished"
    );
    if let Some(StreamEnd::Truncated { offset }) = stats.stream_end {
        debug!(offset, "capture is truncated");
    }

    Ok(context.finish(stats))
}

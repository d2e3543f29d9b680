//! Byte-level builders for synthetic MVD2 captures.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// First config-string slot of the per-client skin window.
pub const CS_PLAYERSKINS: u16 = 1312;

const CLIENTNUM_NONE: u8 = 255;
const P_ORIGIN: u16 = 1 << 1;
const P_ORIGIN2: u16 = 1 << 2;
const P_VIEWANGLES: u16 = 1 << 4;
const P_REMOVE: u16 = 1 << 15;

/// Assembles blocks into a capture.
#[derive(Debug, Default)]
pub struct CaptureBuilder {
    blocks: Vec<Vec<u8>>,
}

impl CaptureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block made of the given commands.
    pub fn block(mut self, commands: &[Vec<u8>]) -> Self {
        self.blocks.push(commands.concat());
        self
    }

    /// Returns the capture without the zero-length terminator.
    pub fn build_unterminated(&self) -> Vec<u8> {
        let mut data = b"MVD2".to_vec();
        for block in &self.blocks {
            let len = u16::try_from(block.len()).expect("block fits in u16");
            data.extend_from_slice(&len.to_le_bytes());
            data.extend_from_slice(block);
        }
        data
    }

    /// Returns the capture, terminator included.
    pub fn build(&self) -> Vec<u8> {
        let mut data = self.build_unterminated();
        data.extend_from_slice(&[0, 0]);
        data
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Skin config-string entry for a client, e.g. `(1313, "Bob\\male/ctf_b")`.
pub fn skin(client: u8, name: &str, team: u8) -> (u16, String) {
    let suffix = if team == 1 { "ctf_r" } else { "ctf_b" };
    (CS_PLAYERSKINS + u16::from(client), format!("{name}\\male/{suffix}"))
}

/// Server-data command with config-strings and an empty base frame.
pub fn server_data(strings: &[(u16, String)]) -> Vec<u8> {
    let mut data = vec![4];
    data.extend_from_slice(&37u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(b"action\x00");
    data.extend_from_slice(&(-1i16).to_le_bytes());
    for (index, value) in strings {
        data.extend_from_slice(&index.to_le_bytes());
        data.extend_from_slice(value.as_bytes());
        data.push(0);
    }
    data.extend_from_slice(&2080u16.to_le_bytes());
    data.extend(frame(&[]));
    data
}

/// Frame body (without the opcode): no portal bits, deltas, no entities.
fn frame_body(deltas: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0x00];
    for delta in deltas {
        data.extend_from_slice(delta);
    }
    data.push(CLIENTNUM_NONE);
    data.extend_from_slice(&[0x00, 0x00]);
    data
}

/// Frame command with the given player deltas.
pub fn frame(deltas: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![6];
    data.extend(frame_body(deltas));
    data
}

/// Player delta setting the full origin (fixed point, 1/8 unit) and yaw.
pub fn player_move(client: u8, origin: [i16; 3], yaw: i16) -> Vec<u8> {
    let mut data = vec![client];
    data.extend_from_slice(&(P_ORIGIN | P_ORIGIN2 | P_VIEWANGLES).to_le_bytes());
    for coord in origin {
        data.extend_from_slice(&coord.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&yaw.to_le_bytes());
    data
}

/// Player delta removing a client.
pub fn player_remove(client: u8) -> Vec<u8> {
    let mut data = vec![client];
    data.extend_from_slice(&P_REMOVE.to_le_bytes());
    data
}

/// Top-level print command.
pub fn print(level: u8, text: &str) -> Vec<u8> {
    let mut data = vec![17, level];
    data.extend_from_slice(text.as_bytes());
    data.push(0);
    data
}

/// Embedded print sub-command.
pub fn sub_print(level: u8, text: &str) -> Vec<u8> {
    let mut data = vec![10, level];
    data.extend_from_slice(text.as_bytes());
    data.push(0);
    data
}

/// Embedded centerprint sub-command.
pub fn sub_centerprint(text: &str) -> Vec<u8> {
    let mut data = vec![15];
    data.extend_from_slice(text.as_bytes());
    data.push(0);
    data
}

/// Embedded muzzle-flash sub-command for entity `client + 1`.
pub fn sub_muzzle_flash(client: u8, mz: u8) -> Vec<u8> {
    let mut data = vec![1];
    data.extend_from_slice(&(u16::from(client) + 1).to_le_bytes());
    data.push(mz);
    data
}

/// Unicast command wrapping sub-commands.
pub fn unicast(client: u8, subs: &[Vec<u8>]) -> Vec<u8> {
    let payload = subs.concat();
    let (low, extra) = split_length(payload.len());
    let mut data = vec![8 | (extra << 5), low, client];
    data.extend(payload);
    data
}

/// Unreliable multicast-to-all command wrapping sub-commands.
pub fn multicast(subs: &[Vec<u8>]) -> Vec<u8> {
    let payload = subs.concat();
    let (low, extra) = split_length(payload.len());
    let mut data = vec![10 | (extra << 5), low];
    data.extend(payload);
    data
}

fn split_length(len: usize) -> (u8, u8) {
    assert!(len < 1 << 11, "payload too long");
    ((len & 0xFF) as u8, (len >> 8) as u8)
}

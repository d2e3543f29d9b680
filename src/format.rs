//! Wire-format constants and container detection for MVD2 captures.
//!
//! An MVD2 capture is the multi-view demo format written by q2pro-derived
//! Quake 2 servers (protocol 37). Files may be stored raw or wrapped in a
//! gzip container.
//!
//! # Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic `MVD2` |
//! | 4 | 2 | Block length (u16 LE, 0 = end of capture) |
//! | 6 | var | Command stream |
//! | ... | | further blocks |
//!
//! Each command starts with one byte: the low 5 bits select the opcode
//! ([`MvdOp`]) and the high 3 bits carry extra length bits for unicast and
//! multicast payloads.
//!
//! # Example
//!
//! ```
//! use mvd2_parser::format::{detect_container, ContainerFormat};
//!
//! assert_eq!(detect_container(b"MVD2\x00\x00"), ContainerFormat::Raw);
//! assert_eq!(detect_container(&[0x1F, 0x8B, 0x08]), ContainerFormat::Gzip);
//! ```

use std::ops::Range;

/// The magic tag at the start of every decompressed capture.
pub const MVD_MAGIC: &[u8; 4] = b"MVD2";

/// The two-byte gzip member header.
pub const GZIP_MAGIC: &[u8; 2] = &[0x1F, 0x8B];

/// Number of low bits in a command byte that select the opcode.
pub const SVCMD_BITS: u8 = 5;

/// Mask for the opcode bits of a command byte.
pub const SVCMD_MASK: u8 = (1 << SVCMD_BITS) - 1;

/// Size of the config-string table; indices at or above this terminate lists.
pub const MAX_CONFIGSTRINGS: u16 = 2080;

/// Number of client slots.
pub const MAX_CLIENTS: u16 = 256;

/// Number of stat slots in a player-state stats block.
pub const MAX_STATS: u32 = 32;

/// Client number that terminates the player list of a frame.
pub const CLIENTNUM_NONE: u8 = 255;

/// First config-string index of the per-client `name\model/skin` window.
pub const CS_PLAYERSKINS: u16 = 1312;

/// Default config-string window scanned for the world model string.
///
/// Mods disagree on the exact slot (32 in stock Quake 2, 33 in q2pro-based
/// servers), so a small range is scanned instead of a single index.
pub const CS_MODELS_SCAN: Range<u16> = 32..40;

/// World units per fixed-point coordinate unit.
pub const COORD_SCALE: f64 = 1.0 / 8.0;

/// Degrees per angle unit.
pub const ANGLE_SCALE: f64 = 360.0 / 65536.0;

/// Seconds between consecutive server frames.
pub const FRAME_INTERVAL: f64 = 0.1;

/// Storage format of a capture on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// A gzip-wrapped capture.
    Gzip,
    /// Anything else; expected to start with [`MVD_MAGIC`].
    Raw,
}

/// Detects whether `data` is gzip-wrapped.
#[must_use]
pub fn detect_container(data: &[u8]) -> ContainerFormat {
    if data.starts_with(GZIP_MAGIC) {
        ContainerFormat::Gzip
    } else {
        ContainerFormat::Raw
    }
}

/// Top-level MVD command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MvdOp {
    /// No operation.
    Nop,
    /// Session header followed by the base frame.
    ServerData,
    /// A single config-string update.
    ConfigString,
    /// A delta-compressed frame.
    Frame,
    /// Payload addressed to one client.
    Unicast,
    /// Reliable payload addressed to one client.
    UnicastReliable,
    /// Payload broadcast to everyone.
    MulticastAll,
    /// Payload broadcast to the potentially hearable set.
    MulticastPhs,
    /// Payload broadcast to the potentially visible set.
    MulticastPvs,
    /// Reliable broadcast to everyone.
    MulticastAllReliable,
    /// Reliable broadcast to the potentially hearable set.
    MulticastPhsReliable,
    /// Reliable broadcast to the potentially visible set.
    MulticastPvsReliable,
    /// Positioned sound.
    Sound,
    /// Server console print.
    Print,
}

impl MvdOp {
    /// Maps the low 5 bits of a command byte to an opcode.
    #[must_use]
    pub fn from_bits(opcode: u8) -> Option<Self> {
        Some(match opcode {
            1 => Self::Nop,
            4 => Self::ServerData,
            5 => Self::ConfigString,
            6 => Self::Frame,
            8 => Self::Unicast,
            9 => Self::UnicastReliable,
            10 => Self::MulticastAll,
            11 => Self::MulticastPhs,
            12 => Self::MulticastPvs,
            13 => Self::MulticastAllReliable,
            14 => Self::MulticastPhsReliable,
            15 => Self::MulticastPvsReliable,
            16 => Self::Sound,
            17 => Self::Print,
            _ => return None,
        })
    }

    /// Returns whether a multicast of this kind carries a 2-byte leaf number.
    #[must_use]
    pub fn has_leafnum(self) -> bool {
        matches!(
            self,
            Self::MulticastPhs
                | Self::MulticastPvs
                | Self::MulticastPhsReliable
                | Self::MulticastPvsReliable
        )
    }
}

/// Splits a command byte into `(opcode bits, extra bits)`.
#[must_use]
pub fn split_command_byte(byte: u8) -> (u8, u8) {
    (byte & SVCMD_MASK, byte >> SVCMD_BITS)
}

/// Sub-opcodes of the legacy server-to-client stream carried inside
/// unicast and multicast payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvcOp {
    /// Weapon discharge: entity (i16) + weapon code (u8).
    MuzzleFlash,
    /// Status-bar layout string.
    Layout,
    /// Full inventory: 256 × i16.
    Inventory,
    /// Positioned sound.
    Sound,
    /// Console print: level byte + string.
    Print,
    /// Console command string.
    StuffText,
    /// Config-string echo: index (u16) + string.
    ConfigString,
    /// Centred screen print.
    CenterPrint,
}

impl SvcOp {
    /// Maps a sub-stream opcode byte to a known sub-opcode.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::MuzzleFlash,
            4 => Self::Layout,
            5 => Self::Inventory,
            9 => Self::Sound,
            10 => Self::Print,
            11 => Self::StuffText,
            13 => Self::ConfigString,
            15 => Self::CenterPrint,
            _ => return None,
        })
    }
}

/// Print level used for kill announcements.
pub const PRINT_MEDIUM: u8 = 1;

/// Print level used for per-player messages such as hit confirmations.
pub const PRINT_HIGH: u8 = 2;

/// Flag bit in a muzzle-flash weapon code marking a silenced shot.
pub const MZ_SILENCED: u8 = 0x80;

/// Sound flag: volume byte present.
pub const SND_VOLUME: u8 = 1 << 0;
/// Sound flag: attenuation byte present.
pub const SND_ATTENUATION: u8 = 1 << 1;
/// Sound flag: time offset byte present.
pub const SND_OFFSET: u8 = 1 << 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_container() {
        assert_eq!(detect_container(b"MVD2"), ContainerFormat::Raw);
        assert_eq!(detect_container(&[0x1F, 0x8B, 0x08, 0x00]), ContainerFormat::Gzip);
        assert_eq!(detect_container(&[0x1F]), ContainerFormat::Raw);
        assert_eq!(detect_container(&[]), ContainerFormat::Raw);
    }

    #[test]
    fn test_split_command_byte() {
        assert_eq!(split_command_byte(0x06), (6, 0));
        assert_eq!(split_command_byte(0x2A), (10, 1));
        assert_eq!(split_command_byte(0xE8), (8, 7));
    }

    #[test]
    fn test_mvd_op_mapping() {
        assert_eq!(MvdOp::from_bits(1), Some(MvdOp::Nop));
        assert_eq!(MvdOp::from_bits(4), Some(MvdOp::ServerData));
        assert_eq!(MvdOp::from_bits(17), Some(MvdOp::Print));
        assert_eq!(MvdOp::from_bits(0), None);
        assert_eq!(MvdOp::from_bits(2), None);
        assert_eq!(MvdOp::from_bits(7), None);
        assert_eq!(MvdOp::from_bits(18), None);
    }

    #[test]
    fn test_leafnum_variants() {
        assert!(!MvdOp::MulticastAll.has_leafnum());
        assert!(!MvdOp::MulticastAllReliable.has_leafnum());
        assert!(MvdOp::MulticastPhs.has_leafnum());
        assert!(MvdOp::MulticastPvs.has_leafnum());
        assert!(MvdOp::MulticastPhsReliable.has_leafnum());
        assert!(MvdOp::MulticastPvsReliable.has_leafnum());
    }

    #[test]
    fn test_svc_op_mapping() {
        assert_eq!(SvcOp::from_byte(10), Some(SvcOp::Print));
        assert_eq!(SvcOp::from_byte(15), Some(SvcOp::CenterPrint));
        assert_eq!(SvcOp::from_byte(3), None);
    }

    #[test]
    fn test_scales() {
        assert!((f64::from(800i16) * COORD_SCALE - 100.0).abs() < f64::EPSILON);
        assert!((16384.0 * ANGLE_SCALE - 90.0).abs() < f64::EPSILON);
    }
}

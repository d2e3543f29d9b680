//! Player-state deltas and the per-client state table.
//!
//! Each frame carries a list of player-state deltas terminated by client
//! number 255. A delta starts with a 16-bit mask; every set bit is followed
//! by that field's payload, in bit order. Unset bits leave the previous
//! value alone, so positions have to be tracked across frames.
//!
//! | Bit | Field | Payload |
//! |-----|-------|---------|
//! | 0 | type | u8 |
//! | 1 | origin x, y | 2 × i16 |
//! | 2 | origin z | i16 |
//! | 3 | view offset | 3 bytes |
//! | 4 | view angles (pitch, yaw) | 2 × i16 |
//! | 5 | roll | i16 |
//! | 6 | kick angles | 3 bytes |
//! | 9 | weapon index | u8 |
//! | 10 | weapon frame | u8 |
//! | 11 | gun offset | 3 bytes |
//! | 12 | gun angles | 3 bytes |
//! | 7 | blend | 4 bytes |
//! | 8 | field of view | u8 |
//! | 13 | render flags | u8 |
//! | 14 | stats | u32 mask + i16 per set bit |
//! | 15 | remove | none |
//!
//! The table lists fields in wire order, which is not bit order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::binary::ByteCursor;
use crate::error::Result;
use crate::format::{ANGLE_SCALE, CLIENTNUM_NONE, COORD_SCALE, MAX_STATS};

/// Player-state delta bits.
pub mod bits {
    /// Movement type.
    pub const P_TYPE: u16 = 1 << 0;
    /// Origin x and y.
    pub const P_ORIGIN: u16 = 1 << 1;
    /// Origin z.
    pub const P_ORIGIN2: u16 = 1 << 2;
    /// View offset.
    pub const P_VIEWOFFSET: u16 = 1 << 3;
    /// Pitch and yaw.
    pub const P_VIEWANGLES: u16 = 1 << 4;
    /// Roll.
    pub const P_VIEWANGLE2: u16 = 1 << 5;
    /// Kick angles.
    pub const P_KICKANGLES: u16 = 1 << 6;
    /// Screen blend.
    pub const P_BLEND: u16 = 1 << 7;
    /// Field of view.
    pub const P_FOV: u16 = 1 << 8;
    /// Weapon model index.
    pub const P_WEAPONINDEX: u16 = 1 << 9;
    /// Weapon animation frame.
    pub const P_WEAPONFRAME: u16 = 1 << 10;
    /// Gun offset.
    pub const P_GUNOFFSET: u16 = 1 << 11;
    /// Gun angles.
    pub const P_GUNANGLES: u16 = 1 << 12;
    /// Render flags.
    pub const P_RDFLAGS: u16 = 1 << 13;
    /// Stats block.
    pub const P_STATS: u16 = 1 << 14;
    /// Client left the view; drop its state.
    pub const P_REMOVE: u16 = 1 << 15;
}

use bits::*;

/// The fields of one player-state delta that are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerDelta {
    /// Client number.
    pub client: u8,
    /// Raw field mask.
    pub bits: u16,
    /// Fixed-point origin x, if present.
    pub origin_x: Option<i16>,
    /// Fixed-point origin y, if present.
    pub origin_y: Option<i16>,
    /// Fixed-point origin z, if present.
    pub origin_z: Option<i16>,
    /// Yaw angle, if present.
    pub yaw: Option<i16>,
    /// Weapon model index, if present.
    pub weapon: Option<u8>,
}

impl PlayerDelta {
    /// Reads one delta. Returns `None` at the end-of-list sentinel.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the delta is truncated.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Option<Self>> {
        let client = cursor.read_u8()?;
        if client == CLIENTNUM_NONE {
            return Ok(None);
        }

        let bits = cursor.read_u16()?;
        let mut delta = PlayerDelta {
            client,
            bits,
            ..Self::default()
        };

        if bits & P_TYPE != 0 {
            cursor.read_u8()?;
        }
        if bits & P_ORIGIN != 0 {
            delta.origin_x = Some(cursor.read_i16()?);
            delta.origin_y = Some(cursor.read_i16()?);
        }
        if bits & P_ORIGIN2 != 0 {
            delta.origin_z = Some(cursor.read_i16()?);
        }
        if bits & P_VIEWOFFSET != 0 {
            cursor.skip(3)?;
        }
        if bits & P_VIEWANGLES != 0 {
            cursor.skip(2)?; // pitch
            delta.yaw = Some(cursor.read_i16()?);
        }
        if bits & P_VIEWANGLE2 != 0 {
            cursor.skip(2)?;
        }
        if bits & P_KICKANGLES != 0 {
            cursor.skip(3)?;
        }
        if bits & P_WEAPONINDEX != 0 {
            delta.weapon = Some(cursor.read_u8()?);
        }
        if bits & P_WEAPONFRAME != 0 {
            cursor.read_u8()?;
        }
        if bits & P_GUNOFFSET != 0 {
            cursor.skip(3)?;
        }
        if bits & P_GUNANGLES != 0 {
            cursor.skip(3)?;
        }
        if bits & P_BLEND != 0 {
            cursor.skip(4)?;
        }
        if bits & P_FOV != 0 {
            cursor.read_u8()?;
        }
        if bits & P_RDFLAGS != 0 {
            cursor.read_u8()?;
        }
        if bits & P_STATS != 0 {
            let statbits = cursor.read_u32()?;
            for i in 0..MAX_STATS {
                if statbits & (1 << i) != 0 {
                    cursor.skip(2)?;
                }
            }
        }

        Ok(Some(delta))
    }

    /// Returns whether this delta removes the client.
    #[must_use]
    pub fn is_remove(&self) -> bool {
        self.bits & P_REMOVE != 0
    }
}

/// Last known state of one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerState {
    /// Fixed-point origin.
    pub origin: [i16; 3],
    /// Raw yaw angle.
    pub yaw: i16,
    /// Weapon model index.
    pub weapon: u8,
}

impl PlayerState {
    fn apply(&mut self, delta: &PlayerDelta) {
        if let Some(x) = delta.origin_x {
            self.origin[0] = x;
        }
        if let Some(y) = delta.origin_y {
            self.origin[1] = y;
        }
        if let Some(z) = delta.origin_z {
            self.origin[2] = z;
        }
        if let Some(yaw) = delta.yaw {
            self.yaw = yaw;
        }
        if let Some(weapon) = delta.weapon {
            self.weapon = weapon;
        }
    }

    /// Converts to world units and degrees.
    #[must_use]
    pub fn position(&self) -> PlayerPosition {
        let [x, y, z] = self.origin.map(|c| round1(f64::from(c) * COORD_SCALE));
        let mut yaw = round1((f64::from(self.yaw) * ANGLE_SCALE).rem_euclid(360.0));
        if yaw >= 360.0 {
            yaw -= 360.0;
        }
        PlayerPosition { x, y, z, yaw }
    }
}

/// Rounds to one decimal place, ties to even.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// A player's world position and heading in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPosition {
    /// World x.
    pub x: f64,
    /// World y.
    pub y: f64,
    /// World z.
    pub z: f64,
    /// Heading in degrees, in `[0, 360)`.
    #[serde(rename = "a")]
    pub yaw: f64,
}

/// Persistent client number → state table for one parse.
#[derive(Debug, Clone, Default)]
pub struct PlayerStateTable {
    states: BTreeMap<u8, PlayerState>,
}

impl PlayerStateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a delta, creating or removing the client's entry as needed.
    pub fn apply(&mut self, delta: &PlayerDelta) {
        if delta.is_remove() {
            self.states.remove(&delta.client);
        } else {
            self.states.entry(delta.client).or_default().apply(delta);
        }
    }

    /// Reads and applies deltas up to and including the end-of-list sentinel.
    ///
    /// Deltas read before an error stay applied.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the list is truncated.
    pub fn read_deltas(&mut self, cursor: &mut ByteCursor<'_>) -> Result<usize> {
        let mut count = 0;
        while let Some(delta) = PlayerDelta::read(cursor)? {
            self.apply(&delta);
            count += 1;
        }
        Ok(count)
    }

    /// Returns the state of one client.
    #[must_use]
    pub fn get(&self, client: u8) -> Option<&PlayerState> {
        self.states.get(&client)
    }

    /// Returns whether a client currently has state.
    #[must_use]
    pub fn contains(&self, client: u8) -> bool {
        self.states.contains_key(&client)
    }

    /// Returns the client numbers that currently have state.
    pub fn clients(&self) -> impl Iterator<Item = u8> + '_ {
        self.states.keys().copied()
    }

    /// Builds a position snapshot from every client that has state.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<u8, PlayerPosition> {
        self.states
            .iter()
            .map(|(&client, state)| (client, state.position()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_bytes(client: u8, bits: u16, fields: &[u8]) -> Vec<u8> {
        let mut data = vec![client];
        data.extend_from_slice(&bits.to_le_bytes());
        data.extend_from_slice(fields);
        data
    }

    #[test]
    fn test_read_origin_and_yaw() {
        let mut fields = Vec::new();
        fields.extend_from_slice(&800i16.to_le_bytes());
        fields.extend_from_slice(&(-80i16).to_le_bytes());
        fields.extend_from_slice(&64i16.to_le_bytes());
        fields.extend_from_slice(&0i16.to_le_bytes()); // pitch
        fields.extend_from_slice(&16384i16.to_le_bytes());
        let data = delta_bytes(3, P_ORIGIN | P_ORIGIN2 | P_VIEWANGLES, &fields);

        let delta = PlayerDelta::read(&mut ByteCursor::new(&data)).unwrap().unwrap();
        assert_eq!(delta.client, 3);
        assert_eq!(delta.origin_x, Some(800));
        assert_eq!(delta.origin_y, Some(-80));
        assert_eq!(delta.origin_z, Some(64));
        assert_eq!(delta.yaw, Some(16384));
        assert_eq!(delta.weapon, None);
    }

    #[test]
    fn test_read_sentinel() {
        let mut cursor = ByteCursor::new(&[CLIENTNUM_NONE, 0xAA]);
        assert!(PlayerDelta::read(&mut cursor).unwrap().is_none());
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_read_skipped_fields_consume_exact_bytes() {
        let bits = P_TYPE
            | P_VIEWOFFSET
            | P_VIEWANGLE2
            | P_KICKANGLES
            | P_WEAPONINDEX
            | P_WEAPONFRAME
            | P_GUNOFFSET
            | P_GUNANGLES
            | P_BLEND
            | P_FOV
            | P_RDFLAGS
            | P_STATS;
        let mut fields = vec![0u8; 1 + 3 + 2 + 3];
        fields.push(7); // weapon index
        fields.extend_from_slice(&[0u8; 1 + 3 + 3 + 4 + 1 + 1]);
        fields.extend_from_slice(&0b1011u32.to_le_bytes());
        fields.extend_from_slice(&[0u8; 3 * 2]);
        fields.push(0xEE); // next byte must remain

        let data = delta_bytes(0, bits, &fields);
        let mut cursor = ByteCursor::new(&data);
        let delta = PlayerDelta::read(&mut cursor).unwrap().unwrap();
        assert_eq!(delta.weapon, Some(7));
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_read_truncated() {
        let data = delta_bytes(1, P_ORIGIN, &[0x10, 0x00]);
        assert!(PlayerDelta::read(&mut ByteCursor::new(&data)).is_err());
    }

    #[test]
    fn test_table_keeps_unchanged_fields() {
        let mut table = PlayerStateTable::new();
        table.apply(&PlayerDelta {
            client: 2,
            bits: P_ORIGIN | P_ORIGIN2 | P_VIEWANGLES,
            origin_x: Some(80),
            origin_y: Some(160),
            origin_z: Some(240),
            yaw: Some(-16384),
            weapon: None,
        });
        table.apply(&PlayerDelta {
            client: 2,
            bits: P_ORIGIN2,
            origin_z: Some(8),
            ..PlayerDelta::default()
        });

        let snap = table.snapshot();
        let pos = snap[&2];
        assert_eq!((pos.x, pos.y, pos.z), (10.0, 20.0, 1.0));
        assert!((pos.yaw - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_remove() {
        let mut table = PlayerStateTable::new();
        table.apply(&PlayerDelta {
            client: 5,
            ..PlayerDelta::default()
        });
        assert!(table.contains(5));

        table.apply(&PlayerDelta {
            client: 5,
            bits: P_REMOVE,
            ..PlayerDelta::default()
        });
        assert!(!table.contains(5));
        assert!(table.snapshot().is_empty());
    }

    #[test]
    fn test_read_deltas_until_sentinel() {
        let mut data = delta_bytes(1, 0, &[]);
        data.extend(delta_bytes(4, 0, &[]));
        data.push(CLIENTNUM_NONE);

        let mut table = PlayerStateTable::new();
        assert_eq!(table.read_deltas(&mut ByteCursor::new(&data)).unwrap(), 2);
        assert_eq!(table.clients().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_position_rounds_half_to_even() {
        let state = PlayerState {
            origin: [2, 6, -2],
            yaw: 2048,
            ..PlayerState::default()
        };
        let pos = state.position();
        // 0.25, 0.75, -0.25 and 11.25 all sit on a tie
        assert_eq!((pos.x, pos.y, pos.z), (0.2, 0.8, -0.2));
        assert_eq!(pos.yaw, 11.2);
    }

    #[test]
    fn test_heading_normalised() {
        let state = PlayerState {
            yaw: -1,
            ..PlayerState::default()
        };
        let yaw = state.position().yaw;
        assert!((0.0..360.0).contains(&yaw));
        assert_eq!(yaw, 0.0);
    }
}

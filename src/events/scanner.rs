//! Walker for the server-to-client sub-stream inside unicast and multicast
//! payloads.
//!
//! A payload is a run of sub-commands, each introduced by one opcode byte
//! ([`SvcOp`]). Only a handful carry anything of interest:
//!
//! | Sub-command | Unicast | Multicast |
//! |-------------|---------|-----------|
//! | print (medium) | kill line | round outcome |
//! | print (high) | hit confirmation | round outcome |
//! | centerprint | award | award |
//! | muzzle flash | skipped | shot fired |
//!
//! Every print is also tested for a round outcome, whatever its level and
//! source. The remaining sub-commands are consumed only to stay aligned.
//! An unknown sub-opcode or a truncated field stops the walk; events found
//! before that point are kept.

use std::collections::BTreeMap;

use tracing::trace;

use super::{parse_hit_line, parse_kill_line, EventLog, HitEvent, KillEvent, MuzzleFlash};
use crate::binary::ByteCursor;
use crate::error::{ParserError, Result};
use crate::format::{SvcOp, MZ_SILENCED, PRINT_HIGH, PRINT_MEDIUM, SND_ATTENUATION, SND_OFFSET, SND_VOLUME};

/// Size of a full inventory sub-command body: 256 × i16.
const INVENTORY_SIZE: usize = 512;

/// Which command a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Addressed to one client; prints are that client's view.
    Unicast {
        /// Receiving client number.
        client: u8,
    },
    /// Broadcast to several clients.
    Multicast,
}

/// Scans one payload and records the events it carries.
///
/// Returns the number of sub-commands consumed.
///
/// # Errors
///
/// - `ParserError::UnknownOpcode` for a sub-opcode outside [`SvcOp`]
/// - `ParserError::UnexpectedEof` if a sub-command is truncated
///
/// Either error only ends this payload. Events recorded before it stay in
/// `log`.
pub fn scan_payload(
    payload: &[u8],
    source: PayloadSource,
    frame: usize,
    names: &BTreeMap<u8, String>,
    log: &mut EventLog,
) -> Result<usize> {
    let mut cursor = ByteCursor::new(payload);
    let mut count = 0;

    while !cursor.is_empty() {
        let offset = cursor.position();
        let byte = cursor.read_u8()?;
        let op = SvcOp::from_byte(byte).ok_or(ParserError::UnknownOpcode {
            opcode: byte,
            offset,
        })?;
        trace!(?op, offset, frame, "sub-command");

        match op {
            SvcOp::Print => {
                let level = cursor.read_u8()?;
                let text = cursor.read_string()?;
                record_print(level, &text, source, frame, names, log);
            }
            SvcOp::CenterPrint => {
                let text = cursor.read_string()?;
                log.record_award(&text, frame);
            }
            SvcOp::Layout | SvcOp::StuffText => {
                cursor.read_string()?;
            }
            SvcOp::MuzzleFlash => {
                let entity = cursor.read_u16()?;
                let code = cursor.read_u8()? & !MZ_SILENCED;
                if source == PayloadSource::Multicast {
                    if let Some(client) = entity.checked_sub(1) {
                        log.muzzle_flashes.push(MuzzleFlash {
                            frame,
                            client,
                            mz: code,
                        });
                    }
                }
            }
            SvcOp::ConfigString => {
                cursor.read_u16()?;
                cursor.read_string()?;
            }
            SvcOp::Inventory => cursor.skip(INVENTORY_SIZE)?,
            SvcOp::Sound => skip_sound(&mut cursor)?,
        }
        count += 1;
    }

    Ok(count)
}

fn record_print(
    level: u8,
    text: &str,
    source: PayloadSource,
    frame: usize,
    names: &BTreeMap<u8, String>,
    log: &mut EventLog,
) {
    if let PayloadSource::Unicast { client } = source {
        match level {
            PRINT_MEDIUM => {
                if let Some(kill) = parse_kill_line(text, names) {
                    log.kills.push(KillEvent {
                        killer: kill.killer,
                        victim: kill.victim,
                        location: kill.location,
                        weapon: kill.weapon,
                        frame,
                    });
                }
            }
            PRINT_HIGH => {
                if let Some((victim, location)) = parse_hit_line(text) {
                    log.hits.push(HitEvent {
                        frame,
                        attacker: client,
                        victim,
                        location,
                    });
                }
            }
            _ => {}
        }
    }

    log.record_round_outcome(text, frame);
}

/// Skips a sound body: flags, sound index, optional volume, attenuation
/// and offset bytes, then the entity/channel word.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the body is truncated.
pub fn skip_sound(cursor: &mut ByteCursor<'_>) -> Result<()> {
    let flags = cursor.read_u8()?;
    cursor.skip(1)?;
    for flag in [SND_VOLUME, SND_ATTENUATION, SND_OFFSET] {
        if flags & flag != 0 {
            cursor.skip(1)?;
        }
    }
    cursor.skip(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AwardKind, HitLocation, RoundOutcome, Weapon};

    fn names() -> BTreeMap<u8, String> {
        BTreeMap::from([(0, "Alice".to_string()), (1, "Bob".to_string())])
    }

    fn print(level: u8, text: &str) -> Vec<u8> {
        let mut data = vec![10, level];
        data.extend_from_slice(text.as_bytes());
        data.push(0);
        data
    }

    fn centerprint(text: &str) -> Vec<u8> {
        let mut data = vec![15];
        data.extend_from_slice(text.as_bytes());
        data.push(0);
        data
    }

    fn scan(payload: &[u8], source: PayloadSource) -> (Result<usize>, EventLog) {
        let mut log = EventLog::new();
        let result = scan_payload(payload, source, 12, &names(), &mut log);
        (result, log)
    }

    const UNICAST: PayloadSource = PayloadSource::Unicast { client: 0 };

    // ========================
    // Prints
    // ========================

    #[test]
    fn test_unicast_kill_and_hit() {
        let payload = [
            print(PRINT_MEDIUM, "Bob has a hole in his head from Alice's Mark 23 pistol\n"),
            print(PRINT_HIGH, "You hit Bob in the head\n"),
        ]
        .concat();
        let (result, log) = scan(&payload, UNICAST);

        assert_eq!(result.unwrap(), 2);
        assert_eq!(log.kills.len(), 1);
        assert_eq!(log.kills[0].killer, "Alice");
        assert_eq!(log.kills[0].weapon, Weapon::Mk23);
        assert_eq!(log.kills[0].location, HitLocation::Head);
        assert_eq!(log.kills[0].frame, 12);

        assert_eq!(log.hits.len(), 1);
        assert_eq!(log.hits[0].attacker, 0);
        assert_eq!(log.hits[0].victim, "Bob");
    }

    #[test]
    fn test_multicast_ignores_kill_lines() {
        let payload = print(PRINT_MEDIUM, "Bob was stabbed by Alice");
        let (result, log) = scan(&payload, PayloadSource::Multicast);
        assert_eq!(result.unwrap(), 1);
        assert!(log.kills.is_empty());
    }

    #[test]
    fn test_round_outcome_any_level_and_source() {
        let payload = [print(0, "Team 1 won!"), print(PRINT_HIGH, "It was a tie!")].concat();

        let (_, multicast) = scan(&payload, PayloadSource::Multicast);
        let (_, unicast) = scan(&payload, UNICAST);

        for log in [multicast, unicast] {
            assert_eq!(log.rounds.len(), 2);
            assert!(matches!(log.rounds[0].outcome, RoundOutcome::Win { .. }));
            assert_eq!(log.rounds[1].outcome, RoundOutcome::Tie);
        }
    }

    // ========================
    // Centerprints and muzzle flashes
    // ========================

    #[test]
    fn test_awards_on_both_sources() {
        let payload = centerprint("IMPRESSIVE Alice!");
        for source in [UNICAST, PayloadSource::Multicast] {
            let (_, log) = scan(&payload, source);
            assert_eq!(log.awards.len(), 1);
            assert_eq!(log.awards[0].award, AwardKind::Impressive);
        }
    }

    #[test]
    fn test_muzzle_flash_multicast_only() {
        // entity 3 with silenced M3, entity 0 discarded
        let payload = [1, 3, 0, 0x82, 1, 0, 0, 14];

        let (result, log) = scan(&payload, PayloadSource::Multicast);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            log.muzzle_flashes,
            vec![MuzzleFlash {
                frame: 12,
                client: 2,
                mz: 2
            }]
        );

        let (result, log) = scan(&payload, UNICAST);
        assert_eq!(result.unwrap(), 2);
        assert!(log.muzzle_flashes.is_empty());
    }

    // ========================
    // Alignment
    // ========================

    #[test]
    fn test_skipped_sub_commands_keep_alignment() {
        let mut payload = vec![4];
        payload.extend_from_slice(b"xv 0 yv 0\x00"); // layout
        payload.extend_from_slice(&[11]);
        payload.extend_from_slice(b"cmd\x00"); // stufftext
        payload.extend_from_slice(&[13, 0x20, 0x05]);
        payload.extend_from_slice(b"Bob\\male/ctf_b\x00"); // configstring echo
        payload.push(5);
        payload.extend_from_slice(&[0; INVENTORY_SIZE]);
        payload.extend_from_slice(&[9, SND_VOLUME | SND_OFFSET, 7, 200, 3, 0x11, 0x00]); // sound
        payload.extend_from_slice(&centerprint("ACCURACY Bob!"));

        let (result, log) = scan(&payload, UNICAST);
        assert_eq!(result.unwrap(), 6);
        assert_eq!(log.awards.len(), 1);
        assert_eq!(log.awards[0].player, "Bob");
    }

    #[test]
    fn test_unknown_sub_opcode_stops_scan() {
        let payload = [centerprint("IMPRESSIVE Bob!"), vec![0x03, 0xFF], centerprint("ACCURACY Bob!")].concat();
        let (result, log) = scan(&payload, UNICAST);

        let offset = payload.len() - centerprint("ACCURACY Bob!").len() - 2;
        assert!(matches!(
            result,
            Err(ParserError::UnknownOpcode { opcode: 0x03, offset: o }) if o == offset
        ));
        assert_eq!(log.awards.len(), 1);
    }

    #[test]
    fn test_truncated_sub_command() {
        // muzzle flash cut off after the entity number
        let (result, log) = scan(&[1, 3, 0], PayloadSource::Multicast);
        assert!(matches!(result, Err(ParserError::UnexpectedEof { .. })));
        assert!(log.is_empty());
    }

    #[test]
    fn test_unterminated_trailing_text_is_kept() {
        let mut payload = print(PRINT_HIGH, "You hit Bob in the head");
        payload.extend_from_slice(b"\x0fIMPRESSIVE Bob!");

        let (result, log) = scan(&payload, UNICAST);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(log.hits.len(), 1);
        assert_eq!(log.awards.len(), 1);
        assert_eq!(log.awards[0].player, "Bob");
        assert_eq!(log.awards[0].award, AwardKind::Impressive);
    }

    #[test]
    fn test_print_missing_text() {
        // level byte present, string absent
        let (result, log) = scan(&[10, PRINT_HIGH], UNICAST);
        assert!(matches!(result, Err(ParserError::UnexpectedEof { .. })));
        assert!(log.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let (result, log) = scan(&[], PayloadSource::Multicast);
        assert_eq!(result.unwrap(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_skip_sound_all_fields() {
        let flags = SND_VOLUME | SND_ATTENUATION | SND_OFFSET;
        let data = [flags, 1, 2, 3, 4, 5, 6, 0xAA];
        let mut cursor = ByteCursor::new(&data);
        skip_sound(&mut cursor).unwrap();
        assert_eq!(cursor.remaining(), 1);
    }
}

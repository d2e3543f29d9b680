//! Integration tests for decoding synthetic captures end to end.
//!
//! Captures are assembled byte by byte with the builders in `common`.

mod common;

use common::{frame, gzip, player_move, print, server_data, skin, CaptureBuilder};
use mvd2_parser::blocks::StreamEnd;
use mvd2_parser::{decode, parse, ParseOptions, ParserError};
use serde_json::json;

fn match_capture() -> CaptureBuilder {
    CaptureBuilder::new()
        .block(&[server_data(&[
            (33, "maps/urban.bsp".to_string()),
            skin(0, "Alice", 1),
            skin(1, "Bob", 2),
        ])])
        .block(&[
            frame(&[player_move(0, [80, 160, -8], 16384), player_move(1, [0, 0, 0], 0)]),
            frame(&[player_move(0, [88, 160, -8], 16384)]),
        ])
        .block(&[frame(&[]), print(2, "Team 1 won!")])
}

// ============================================================================
// Minimal capture
// ============================================================================

#[test]
fn test_minimal_capture() {
    let data = CaptureBuilder::new().block(&[server_data(&[])]).build();
    let summary = parse(&data, 0).unwrap();

    assert_eq!(summary.map, "unknown");
    assert_eq!(summary.frame_count, 1);
    assert!(summary.kills.is_empty());
    assert!(summary.hit_events.is_empty());
    assert!(summary.award_events.is_empty());
    assert!(summary.round_events.is_empty());

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["frames"], json!([{"t": 0, "players": {}}]));
    assert_eq!(value["map"], json!("unknown"));
}

#[test]
fn test_magic_only() {
    let summary = parse(b"MVD2", 0).unwrap();
    assert_eq!(summary.frame_count, 0);
    assert_eq!(summary.duration, 0.0);
}

// ============================================================================
// Timeline
// ============================================================================

#[test]
fn test_positions_and_headings() {
    let summary = parse(&match_capture().build(), 0).unwrap();

    assert_eq!(summary.map, "urban");
    assert_eq!(summary.frame_count, 4);
    assert_eq!(summary.duration, 0.4);

    let alice = summary.frames[1].players[&0];
    assert_eq!((alice.x, alice.y, alice.z, alice.yaw), (10.0, 20.0, -1.0, 90.0));

    // untouched clients keep their last state
    assert_eq!(summary.frames[2].players[&0].x, 11.0);
    assert_eq!(summary.frames[3].players[&1].x, 0.0);
    assert_eq!(summary.frames[3].players.len(), 2);
}

#[test]
fn test_frame_indices_are_sequential() {
    let summary = parse(&match_capture().build(), 0).unwrap();
    for (index, frame) in summary.frames.iter().enumerate() {
        assert_eq!(frame.t, index);
    }
}

#[test]
fn test_output_is_deterministic() {
    let data = match_capture().build();
    let first = serde_json::to_string(&parse(&data, 0).unwrap()).unwrap();
    let second = serde_json::to_string(&parse(&data, 0).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_heading_serialized_as_a() {
    let summary = parse(&match_capture().build(), 0).unwrap();
    let value = serde_json::to_value(&summary.frames[1]).unwrap();
    assert_eq!(value["players"]["0"]["a"], json!(90.0));
}

// ============================================================================
// Frame cap
// ============================================================================

#[test]
fn test_max_frames_stops_early() {
    let summary = parse(&match_capture().build(), 2).unwrap();

    assert_eq!(summary.frame_count, 2);
    // the round broadcast sits after the cap
    assert!(summary.round_events.is_empty());
}

#[test]
fn test_max_frames_zero_is_unlimited() {
    let summary = parse(&match_capture().build(), 0).unwrap();
    assert_eq!(summary.frame_count, 4);
    assert_eq!(summary.round_events.len(), 1);
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_gzip_capture() {
    let raw = parse(&match_capture().build(), 0).unwrap();
    let gz = parse(&gzip(&match_capture().build()), 0).unwrap();
    assert_eq!(raw, gz);
}

#[test]
fn test_truncated_gzip_keeps_prefix() {
    let mut archive = gzip(&match_capture().build());
    archive.truncate(archive.len() - 8);

    let summary = parse(&archive, 0).unwrap();
    assert_eq!(summary.map, "urban");
    assert_eq!(summary.frame_count, 4);
}

#[test]
fn test_empty_gzip_is_fatal() {
    let result = parse(&gzip(b""), 0);
    assert!(matches!(result, Err(ParserError::DecompressionError { .. })));
}

#[test]
fn test_bad_magic_is_fatal() {
    let result = parse(b"DM2\x00\x00\x00", 0);
    assert!(matches!(result, Err(ParserError::InvalidMagic { .. })));

    let result = parse(&gzip(b"not a capture"), 0);
    assert!(matches!(result, Err(ParserError::InvalidMagic { .. })));
}

// ============================================================================
// Fault tolerance
// ============================================================================

#[test]
fn test_unknown_opcode_aborts_only_its_block() {
    let data = CaptureBuilder::new()
        .block(&[server_data(&[])])
        .block(&[frame(&[]), vec![0x02], frame(&[])])
        .block(&[frame(&[])])
        .build();

    let capture = decode(&data, &ParseOptions::default()).unwrap();
    assert_eq!(capture.frames.len(), 3);
    assert_eq!(capture.stats.blocks_aborted, 1);
    assert_eq!(capture.stats.stream_end, Some(StreamEnd::Terminator));
}

#[test]
fn test_truncated_block_keeps_earlier_frames() {
    let mut data = match_capture().build_unterminated();
    data.extend_from_slice(&[0x40, 0x00, 6, 0x00]);

    let capture = decode(&data, &ParseOptions::default()).unwrap();
    assert_eq!(capture.frames.len(), 4);
    assert!(matches!(
        capture.stats.stream_end,
        Some(StreamEnd::Truncated { .. })
    ));
}

#[test]
fn test_truncated_command_inside_block() {
    // frame command cut off inside the player list
    let data = CaptureBuilder::new()
        .block(&[server_data(&[])])
        .block(&[vec![6, 0x00, 0x03]])
        .block(&[frame(&[])])
        .build();

    let summary = parse(&data, 0).unwrap();
    assert_eq!(summary.frame_count, 2);
}

#[test]
fn test_missing_terminator() {
    let data = match_capture().build_unterminated();
    let capture = decode(&data, &ParseOptions::default()).unwrap();
    assert_eq!(capture.frames.len(), 4);
    assert_eq!(capture.stats.stream_end, Some(StreamEnd::EndOfBuffer));
}

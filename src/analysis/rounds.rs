//! Round boundary resolution.
//!
//! Explicit round-end broadcasts (`Team N won!`, ties) are authoritative
//! and used as-is. Captures without them, typically pickup games, fall back
//! to clustering respawn candidates: a round start is a mass respawn, so
//! candidates close together are grouped and lone respawns are dropped.

use crate::events::RoundEvent;

/// Groups sorted respawn candidates into round starts.
///
/// Scanning left to right, a candidate at most `gap` frames after the
/// previous one joins the current cluster. Clusters with fewer than
/// `min_cluster` candidates are dropped; every other cluster contributes
/// its first frame.
///
/// # Example
///
/// ```
/// use mvd2_parser::analysis::rounds::cluster_rounds;
///
/// assert_eq!(cluster_rounds(&[10, 12, 15, 500, 503], 150, 2), vec![10, 500]);
/// assert_eq!(cluster_rounds(&[10, 400, 402], 150, 2), vec![400]);
/// ```
#[must_use]
pub fn cluster_rounds(candidates: &[usize], gap: usize, min_cluster: usize) -> Vec<usize> {
    let Some((&first, rest)) = candidates.split_first() else {
        return Vec::new();
    };

    let mut starts = Vec::new();
    let mut cluster_start = first;
    let mut cluster_size = 1;
    let mut previous = first;

    for &frame in rest {
        if frame.saturating_sub(previous) <= gap {
            cluster_size += 1;
        } else {
            if cluster_size >= min_cluster {
                starts.push(cluster_start);
            }
            cluster_start = frame;
            cluster_size = 1;
        }
        previous = frame;
    }
    if cluster_size >= min_cluster {
        starts.push(cluster_start);
    }

    starts
}

/// Picks round-start frames from broadcasts, or from respawns if there are none.
#[must_use]
pub fn resolve_round_starts(
    rounds: &[RoundEvent],
    respawn_frames: &[usize],
    gap: usize,
    min_cluster: usize,
) -> Vec<usize> {
    let mut boundaries: Vec<usize> = rounds
        .iter()
        .filter(|event| event.outcome.ends_round())
        .map(|event| event.frame)
        .collect();

    if boundaries.is_empty() {
        return cluster_rounds(respawn_frames, gap, min_cluster);
    }

    boundaries.sort_unstable();
    boundaries.dedup();
    boundaries
}

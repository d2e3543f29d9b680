//! Aggregation of a decoded capture into the result summary.
//!
//! [`summarize`] turns a [`Capture`] into a [`DemoSummary`]:
//!
//! 1. duplicate kills, awards and round outcomes are collapsed (the same
//!    announcement reaches every connected client);
//! 2. the recorder's pseudo-player is removed from the name table;
//! 3. per-player tallies, team totals, accuracy and damage are computed;
//! 4. round starts are resolved (see [`rounds`]).
//!
//! All maps are ordered, so the same capture always serializes to the same
//! bytes.

pub mod damage;
pub mod rounds;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::config::ParseOptions;
use crate::events::{
    AwardEvent, AwardKind, HitEvent, HitLocation, KillEvent, RoundEvent, RoundOutcome, Weapon,
};
use crate::format::FRAME_INTERVAL;
use crate::parser::Capture;
use crate::protocol::player::round1;
use crate::protocol::Frame;

use damage::{accuracy, DamageModel, MuzzleProfile};
use rounds::resolve_round_starts;

/// Map name reported when no world model config-string was seen.
pub const UNKNOWN_MAP: &str = "unknown";

/// The analytics summary of one capture.
///
/// Field names are the serialized result schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoSummary {
    /// Map name, or `unknown`.
    pub map: String,
    /// Client number → player name, recorder excluded.
    pub player_names: BTreeMap<u8, String>,
    /// Number of decoded frames.
    pub frame_count: usize,
    /// Seconds per frame.
    pub frame_interval: f64,
    /// `frame_count × frame_interval`, one decimal.
    pub duration: f64,
    /// Position timeline.
    pub frames: Vec<Frame>,
    /// Kills, deduplicated.
    pub kills: Vec<KillEvent>,
    /// Hit confirmations.
    pub hit_events: Vec<HitEvent>,
    /// Awards, deduplicated.
    pub award_events: Vec<AwardEvent>,
    /// Round outcomes, deduplicated.
    pub round_events: Vec<RoundEvent>,
    /// Kills per player.
    pub kill_counts: BTreeMap<String, u32>,
    /// Deaths per player.
    pub death_counts: BTreeMap<String, u32>,
    /// Kills per weapon.
    pub weapon_counts: BTreeMap<Weapon, u32>,
    /// Hit confirmations per location.
    pub loc_counts: BTreeMap<HitLocation, u32>,
    /// Killing shots per location.
    pub kill_loc_counts: BTreeMap<HitLocation, u32>,
    /// Awards per player and kind.
    pub award_counts: BTreeMap<String, BTreeMap<AwardKind, u32>>,
    /// Hits landed per attacker.
    pub hit_counts: BTreeMap<String, u32>,
    /// Hits landed per attacker and location.
    pub hit_loc_by_player: BTreeMap<String, BTreeMap<HitLocation, u32>>,
    /// Muzzle flashes per named player.
    pub shots_fired: BTreeMap<String, u32>,
    /// Hit percentage per player; absent for shotgun-primary players.
    pub accuracy: BTreeMap<String, f64>,
    /// Estimated damage per player.
    pub damage_dealt: BTreeMap<String, u64>,
    /// Kills with a head shot per player.
    pub headshot_kills: BTreeMap<String, u32>,
    /// Player name → team.
    pub player_teams: BTreeMap<String, u8>,
    /// Team number → score.
    pub team_scores: BTreeMap<u32, u32>,
    /// Team number → rounds won (teams 1 and 2).
    pub round_wins: BTreeMap<u32, u32>,
    /// Tied rounds.
    pub round_ties: u32,
    /// Client numbers seen in frames but never named.
    pub ghost_clients: Vec<u8>,
    /// Frames at which rounds start.
    pub round_start_frames: Vec<usize>,
}

/// Builds the summary for a decoded capture.
#[must_use]
pub fn summarize(capture: Capture, options: &ParseOptions) -> DemoSummary {
    let Capture {
        map_name,
        mut player_names,
        player_teams,
        frames,
        events,
        respawn_frames,
        ..
    } = capture;

    let kills = dedup_kills(events.kills);
    let award_events = dedup_awards(events.awards);
    let round_events = dedup_rounds(events.rounds);
    let hit_events = events.hits;

    let round_start_frames = resolve_round_starts(
        &round_events,
        &respawn_frames,
        options.round_gap,
        options.min_round_cluster,
    );

    player_names.retain(|_, name| *name != options.spectator_name);
    let ghost_clients = ghost_clients(&frames, &player_names);

    let teams_by_name: BTreeMap<String, u8> = player_teams
        .iter()
        .filter_map(|(client, &team)| Some((player_names.get(client)?.clone(), team)))
        .collect();

    let mut kill_counts: BTreeMap<String, u32> =
        player_names.values().map(|name| (name.clone(), 0)).collect();
    let mut death_counts = kill_counts.clone();
    let mut weapon_counts = BTreeMap::new();
    let mut kill_loc_counts = BTreeMap::new();
    let mut headshot_kills = BTreeMap::new();
    let mut weapon_kills: BTreeMap<&str, BTreeMap<Weapon, u32>> = BTreeMap::new();

    for kill in &kills {
        bump(&mut kill_counts, kill.killer.clone());
        bump(&mut death_counts, kill.victim.clone());
        bump(&mut weapon_counts, kill.weapon);
        bump(&mut kill_loc_counts, kill.location);
        if kill.location == HitLocation::Head {
            bump(&mut headshot_kills, kill.killer.clone());
        }
        bump(weapon_kills.entry(kill.killer.as_str()).or_default(), kill.weapon);
    }

    let mut award_counts: BTreeMap<String, BTreeMap<AwardKind, u32>> = BTreeMap::new();
    for award in &award_events {
        let counts = award_counts
            .entry(award.player.clone())
            .or_insert_with(|| AwardKind::ALL.iter().map(|&kind| (kind, 0)).collect());
        bump(counts, award.award);
    }

    let mut loc_counts = BTreeMap::new();
    let mut hit_counts = BTreeMap::new();
    let mut hit_loc_by_player: BTreeMap<String, BTreeMap<HitLocation, u32>> = BTreeMap::new();
    for hit in &hit_events {
        let attacker = player_names
            .get(&hit.attacker)
            .cloned()
            .unwrap_or_else(|| hit.attacker.to_string());
        bump(&mut loc_counts, hit.location);
        bump(&mut hit_counts, attacker.clone());
        bump(hit_loc_by_player.entry(attacker).or_default(), hit.location);
    }

    let mut profiles: BTreeMap<String, MuzzleProfile> = BTreeMap::new();
    for flash in &events.muzzle_flashes {
        let name = u8::try_from(flash.client)
            .ok()
            .and_then(|client| player_names.get(&client))
            .filter(|name| !name.is_empty());
        if let Some(name) = name {
            profiles.entry(name.clone()).or_default().record(flash.mz);
        }
    }

    let shots_fired = profiles
        .iter()
        .map(|(name, profile)| (name.clone(), profile.total()))
        .collect();
    let accuracy = profiles
        .iter()
        .filter_map(|(name, profile)| {
            let hits = hit_counts.get(name).copied().unwrap_or(0);
            Some((name.clone(), accuracy(hits, profile)?))
        })
        .collect();
    let damage_dealt = hit_loc_by_player
        .iter()
        .map(|(name, locations)| {
            let model = DamageModel::infer(profiles.get(name), weapon_kills.get(name.as_str()));
            (name.clone(), model.estimate(locations))
        })
        .collect();

    let team_scores = team_scores(&kills, &teams_by_name, &round_events);
    let (round_wins, round_ties) = round_tallies(&round_events);
    let frame_count = frames.len();

    DemoSummary {
        map: map_name.unwrap_or_else(|| UNKNOWN_MAP.to_string()),
        player_names,
        frame_count,
        frame_interval: FRAME_INTERVAL,
        duration: duration(frame_count),
        frames,
        kills,
        hit_events,
        award_events,
        round_events,
        kill_counts,
        death_counts,
        weapon_counts,
        loc_counts,
        kill_loc_counts,
        award_counts,
        hit_counts,
        hit_loc_by_player,
        shots_fired,
        accuracy,
        damage_dealt,
        headshot_kills,
        player_teams: teams_by_name,
        team_scores,
        round_wins,
        round_ties,
        ghost_clients,
        round_start_frames,
    }
}

fn bump<K: Ord>(counts: &mut BTreeMap<K, u32>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

#[allow(clippy::cast_precision_loss)]
fn duration(frame_count: usize) -> f64 {
    round1(frame_count as f64 * FRAME_INTERVAL)
}

/// Keeps the first kill for each (killer, victim, frame).
fn dedup_kills(mut kills: Vec<KillEvent>) -> Vec<KillEvent> {
    let mut seen = HashSet::new();
    kills.retain(|kill| seen.insert((kill.killer.clone(), kill.victim.clone(), kill.frame)));
    kills
}

/// Keeps the first award for each (award, player, frame).
fn dedup_awards(mut awards: Vec<AwardEvent>) -> Vec<AwardEvent> {
    let mut seen = HashSet::new();
    awards.retain(|award| seen.insert((award.award, award.player.clone(), award.frame)));
    awards
}

/// Keeps the first copy of each (frame, outcome).
fn dedup_rounds(mut rounds: Vec<RoundEvent>) -> Vec<RoundEvent> {
    let mut seen = HashSet::new();
    rounds.retain(|event| seen.insert(event.clone()));
    rounds
}

fn ghost_clients(frames: &[Frame], names: &BTreeMap<u8, String>) -> Vec<u8> {
    let seen: BTreeSet<u8> = frames
        .iter()
        .flat_map(|frame| frame.players.keys().copied())
        .collect();
    seen.into_iter()
        .filter(|client| !names.contains_key(client))
        .collect()
}

/// Team number from the first digit run of a team name; 0 if there is none.
fn team_number(name: &str) -> u32 {
    name.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|run| run.parse().ok())
        .unwrap_or(0)
}

/// Kills per team, overridden by the latest current-score broadcast.
///
/// Teams 1 and 2 are always present; kills by players without a team are
/// dropped.
fn team_scores(
    kills: &[KillEvent],
    teams: &BTreeMap<String, u8>,
    rounds: &[RoundEvent],
) -> BTreeMap<u32, u32> {
    let mut scores = BTreeMap::from([(1, 0), (2, 0)]);
    for kill in kills {
        if let Some(&team) = teams.get(&kill.killer) {
            bump(&mut scores, u32::from(team));
        }
    }

    let latest = rounds
        .iter()
        .rev()
        .filter(|event| matches!(event.outcome, RoundOutcome::Score { .. }))
        .max_by_key(|event| event.frame);
    if let Some(RoundEvent {
        outcome:
            RoundOutcome::Score {
                team1_name,
                score1,
                team2_name,
                score2,
            },
        ..
    }) = latest
    {
        let (team1, team2) = (team_number(team1_name), team_number(team2_name));
        if team1 != 0 && team2 != 0 {
            scores.insert(team1, *score1);
            scores.insert(team2, *score2);
        }
    }

    scores.remove(&0);
    scores
}

/// Round wins for teams 1 and 2, and the number of ties.
fn round_tallies(rounds: &[RoundEvent]) -> (BTreeMap<u32, u32>, u32) {
    let mut wins = BTreeMap::from([(1, 0), (2, 0)]);
    let mut ties = 0;
    for event in rounds {
        match &event.outcome {
            RoundOutcome::Win { team_name } => {
                if let Some(count) = wins.get_mut(&team_number(team_name)) {
                    *count += 1;
                }
            }
            RoundOutcome::Tie => ties += 1,
            RoundOutcome::Score { .. } => {}
        }
    }
    (wins, ties)
}

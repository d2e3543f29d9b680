//! Gameplay events mined from server text.
//!
//! The capture carries no structured kill or award records. Everything in
//! this module is recovered from human-readable prints and centerprints
//! embedded in unicast and multicast payloads, plus the muzzle-flash
//! broadcasts that mark weapon discharges.
//!
//! # Event Kinds
//!
//! | Event | Source |
//! |-------|--------|
//! | [`KillEvent`] | medium-level print in a unicast payload |
//! | [`HitEvent`] | high-level print `You hit <victim> in the <part>` |
//! | [`AwardEvent`] | centerprint `IMPRESSIVE`/`ACCURACY`/`EXCELLENT` |
//! | [`RoundEvent`] | print `Team N won!`, tie phrase, current-score line |
//! | [`MuzzleFlash`] | multicast muzzle-flash sub-command |

pub mod scanner;
pub mod text;

pub use scanner::{scan_payload, PayloadSource};
pub use text::{
    classify_location, classify_weapon, parse_award, parse_hit_line, parse_kill_line,
    parse_round_outcome, KillLine,
};

use std::fmt;

use serde::Serialize;

/// Weapon credited with a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Weapon {
    /// M4 assault rifle.
    #[serde(rename = "M4")]
    M4,
    /// M3 Super 90 shotgun.
    #[serde(rename = "M3")]
    M3,
    /// Handcannon.
    #[serde(rename = "HC")]
    Handcannon,
    /// Sniper rifle.
    #[serde(rename = "SR")]
    Sniper,
    /// MP5 submachine gun.
    #[serde(rename = "MP5")]
    Mp5,
    /// Akimbo Mark 23 pistols.
    #[serde(rename = "Dual MK23")]
    DualMk23,
    /// Mark 23 pistol.
    #[serde(rename = "MK23")]
    Mk23,
    /// Thrown knife.
    #[serde(rename = "Knife Thrown")]
    KnifeThrown,
    /// Slashing knife.
    Knife,
    /// Hand grenade.
    Grenade,
    /// Kick.
    Kick,
    /// Punch.
    Punch,
    /// Grappling hook.
    Grapple,
    /// No rule matched.
    #[serde(rename = "unknown")]
    Unknown,
}

impl Weapon {
    /// Returns the display name used in results.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Weapon::M4 => "M4",
            Weapon::M3 => "M3",
            Weapon::Handcannon => "HC",
            Weapon::Sniper => "SR",
            Weapon::Mp5 => "MP5",
            Weapon::DualMk23 => "Dual MK23",
            Weapon::Mk23 => "MK23",
            Weapon::KnifeThrown => "Knife Thrown",
            Weapon::Knife => "Knife",
            Weapon::Grenade => "Grenade",
            Weapon::Kick => "Kick",
            Weapon::Punch => "Punch",
            Weapon::Grapple => "Grapple",
            Weapon::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Weapon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body region a hit or killing shot landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitLocation {
    /// Head.
    Head,
    /// Stomach.
    Stomach,
    /// Legs.
    Legs,
    /// Chest.
    Chest,
    /// Not identifiable from the text.
    Unknown,
}

impl fmt::Display for HitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HitLocation::Head => "head",
            HitLocation::Stomach => "stomach",
            HitLocation::Legs => "legs",
            HitLocation::Chest => "chest",
            HitLocation::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Streak award announced by centerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AwardKind {
    /// Five kills in a row.
    Impressive,
    /// Three headshots in a row.
    Accuracy,
    /// Twelve kills in a row; carries a streak count.
    Excellent,
}

impl AwardKind {
    /// All award kinds, in display order.
    pub const ALL: [AwardKind; 3] = [AwardKind::Impressive, AwardKind::Accuracy, AwardKind::Excellent];
}

/// One kill announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillEvent {
    /// Name of the killer.
    pub killer: String,
    /// Name of the victim.
    pub victim: String,
    /// Location of the killing shot.
    pub location: HitLocation,
    /// Weapon credited with the kill.
    pub weapon: Weapon,
    /// Frame index the announcement arrived in.
    pub frame: usize,
}

/// One hit confirmation sent to the attacker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitEvent {
    /// Frame index.
    pub frame: usize,
    /// Client number the confirmation was addressed to.
    pub attacker: u8,
    /// Name of the player that was hit, as printed.
    pub victim: String,
    /// Body region.
    pub location: HitLocation,
}

/// One streak award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardEvent {
    /// Frame index.
    pub frame: usize,
    /// Player name, as printed.
    pub player: String,
    /// Award kind.
    pub award: AwardKind,
    /// Streak multiplier, only for [`AwardKind::Excellent`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// What a round-outcome broadcast said.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoundOutcome {
    /// `Team N won!`
    Win {
        /// Team display name, e.g. `Team 1`.
        team_name: String,
    },
    /// The round ended in a tie.
    Tie,
    /// `Current score is Team A: n to Team B: m`
    Score {
        /// First team display name.
        team1_name: String,
        /// First team's running total.
        score1: u32,
        /// Second team display name.
        team2_name: String,
        /// Second team's running total.
        score2: u32,
    },
}

impl RoundOutcome {
    /// Returns whether this outcome closes a round.
    #[must_use]
    pub fn ends_round(&self) -> bool {
        matches!(self, RoundOutcome::Win { .. } | RoundOutcome::Tie)
    }
}

/// A round outcome and the frame it was broadcast in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoundEvent {
    /// The outcome.
    #[serde(flatten)]
    pub outcome: RoundOutcome,
    /// Frame index.
    pub frame: usize,
}

/// One weapon discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MuzzleFlash {
    /// Frame index.
    pub frame: usize,
    /// Client number of the shooter (entity number minus one).
    pub client: u16,
    /// Weapon wire code with the silenced flag cleared.
    pub mz: u8,
}

/// Every event collected during one parse, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    /// Kill announcements, including duplicates.
    pub kills: Vec<KillEvent>,
    /// Hit confirmations.
    pub hits: Vec<HitEvent>,
    /// Award announcements, including duplicates.
    pub awards: Vec<AwardEvent>,
    /// Round outcomes, including duplicates.
    pub rounds: Vec<RoundEvent>,
    /// Muzzle flashes.
    pub muzzle_flashes: Vec<MuzzleFlash>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a round outcome if `text` is one.
    pub fn record_round_outcome(&mut self, text: &str, frame: usize) {
        if let Some(outcome) = parse_round_outcome(text) {
            self.rounds.push(RoundEvent { outcome, frame });
        }
    }

    /// Records an award if `text` is an award centerprint.
    pub fn record_award(&mut self, text: &str, frame: usize) {
        if let Some((player, award, count)) = parse_award(text) {
            self.awards.push(AwardEvent {
                frame,
                player,
                award,
                count,
            });
        }
    }

    /// Returns the total number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kills.len()
            + self.hits.len()
            + self.awards.len()
            + self.rounds.len()
            + self.muzzle_flashes.len()
    }

    /// Returns whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Classifiers for server print text.
//!
//! Kill announcements have the shape `<victim><middle> <killer><suffix>`
//! with no delimiter between the fields, so they are resolved against the
//! known player-name table rather than parsed positionally. Weapon and hit
//! location come from keyword rules that are evaluated top to bottom; the
//! first rule that matches wins.
//!
//! # Rule Order
//!
//! Several phrasings are shared between weapons. The weapon table keeps
//! these orderings:
//!
//! - handcannon phrases before the generic `buckshot`, which both shotguns use;
//! - every explicit weapon name before the sniper and unarmed heuristics
//!   (`sniped`, `picked off`, `shot in the legs`).
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use mvd2_parser::events::{parse_kill_line, HitLocation, Weapon};
//!
//! let names = BTreeMap::from([(0, "Alice".to_string()), (1, "Bob".to_string())]);
//! let kill = parse_kill_line("Bob caught a sniper bullet between the eyes from Alice", &names)
//!     .unwrap();
//!
//! assert_eq!(kill.victim, "Bob");
//! assert_eq!(kill.killer, "Alice");
//! assert_eq!(kill.location, HitLocation::Head);
//! assert_eq!(kill.weapon, Weapon::Sniper);
//! ```

use std::collections::BTreeMap;

use super::{AwardKind, HitLocation, RoundOutcome, Weapon};

/// A substring test, either against the raw text or its lowercase form.
#[derive(Debug, Clone, Copy)]
enum Needle {
    /// Case-sensitive match on the original text.
    Exact(&'static str),
    /// Match on the lowercased text; the needle is already lowercase.
    Folded(&'static str),
}

impl Needle {
    fn found_in(self, text: &str, folded: &str) -> bool {
        match self {
            Needle::Exact(needle) => text.contains(needle),
            Needle::Folded(needle) => folded.contains(needle),
        }
    }
}

use Needle::{Exact, Folded};

/// Weapon rules, in priority order.
const WEAPON_RULES: &[(Needle, Weapon)] = &[
    (Exact("M4 Assault Rifle"), Weapon::M4),
    (Exact("M3 Super 90"), Weapon::M3),
    (Exact("hole-y matrimony"), Weapon::M3),
    (Folded("handcannon"), Weapon::Handcannon),
    (Folded("sawed"), Weapon::Handcannon),
    (Folded("minch"), Weapon::Handcannon),
    (Folded("metal detector"), Weapon::Handcannon),
    (Folded("buckshot"), Weapon::M3),
    (Exact("sniper bullet"), Weapon::Sniper),
    (Exact("MP5"), Weapon::Mp5),
    (Exact("akimbo"), Weapon::DualMk23),
    (Folded("trepanned"), Weapon::DualMk23),
    (Folded("john woo"), Weapon::DualMk23),
    (Folded("pair of mark 23"), Weapon::DualMk23),
    (Exact("Mark 23"), Weapon::Mk23),
    (Exact("pistol round"), Weapon::Mk23),
    (Exact("flying knife"), Weapon::KnifeThrown),
    (Exact("Combat Knife"), Weapon::Knife),
    (Folded("throat slit"), Weapon::Knife),
    (Folded("gutted"), Weapon::Knife),
    (Folded("open heart surgery"), Weapon::Knife),
    (Folded("stabbed"), Weapon::Knife),
    (Folded("slashed"), Weapon::Knife),
    (Folded("grenade"), Weapon::Grenade),
    (Folded("sniped"), Weapon::Sniper),
    (Folded("picked off"), Weapon::Sniper),
    (Folded("shot in the legs"), Weapon::Sniper),
    (Folded("boot"), Weapon::Kick),
    (Folded("ass kicked"), Weapon::Kick),
    (Folded("bruce lee"), Weapon::Kick),
    (Folded("taught how to fly"), Weapon::Kick),
    (Folded("facelift"), Weapon::Punch),
    (Folded("knocked out"), Weapon::Punch),
    (Exact("iron fist"), Weapon::Punch),
    (Folded("grapple"), Weapon::Grapple),
];

/// Location keyword sets, in priority order.
const LOCATION_RULES: &[(HitLocation, &[&str])] = &[
    (
        HitLocation::Head,
        &[
            "eyes",
            "makeover",
            "brains",
            "trepanned",
            "throat",
            "hole in his head",
            "hole in her head",
            "hole in its head",
            "scope",
            "forehead",
            "caught a sniper bullet",
        ],
    ),
    (
        HitLocation::Stomach,
        &[
            "stomach",
            "upset stomach",
            "lunch",
            "pepto",
            "gutted",
            "contents of",
            "kidneys",
            "sniped in the stomach",
        ],
    ),
    (
        HitLocation::Legs,
        &[
            "legs",
            "legless",
            "shorter",
            "legs blown off",
            "legs cut off",
            "shot in the legs",
        ],
    ),
    (
        HitLocation::Chest,
        &[
            "heart burn",
            "heart surgery",
            "chest pain",
            "ribs",
            "open heart",
            "picked off",
            "chest organ",
            "vital organ",
            "full of buckshot",
            "hole-y matrimony",
            "john woo",
        ],
    ),
];

/// Classifies the weapon named or implied by a kill line.
#[must_use]
pub fn classify_weapon(text: &str) -> Weapon {
    let folded = text.to_lowercase();
    WEAPON_RULES
        .iter()
        .find(|(needle, _)| needle.found_in(text, &folded))
        .map_or(Weapon::Unknown, |&(_, weapon)| weapon)
}

/// Classifies the body region described by kill-line text.
#[must_use]
pub fn classify_location(text: &str) -> HitLocation {
    let folded = text.to_lowercase();
    LOCATION_RULES
        .iter()
        .find(|(_, keys)| keys.iter().any(|key| folded.contains(key)))
        .map_or(HitLocation::Unknown, |&(location, _)| location)
}

/// A resolved kill announcement, before it is stamped with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillLine {
    /// Name of the killer.
    pub killer: String,
    /// Name of the victim.
    pub victim: String,
    /// Location of the killing shot.
    pub location: HitLocation,
    /// Weapon credited with the kill.
    pub weapon: Weapon,
}

/// Resolves a kill announcement against the player-name table.
///
/// A victim must open the line, followed by a space or an apostrophe. A
/// different player must then appear after a space in the remainder, and be
/// followed by the end of the line or a non-alphanumeric character. Pairs
/// are tried in client-number order; the first match wins.
///
/// Returns `None` when fewer than two names are known.
#[must_use]
pub fn parse_kill_line(text: &str, names: &BTreeMap<u8, String>) -> Option<KillLine> {
    let names: Vec<&str> = names
        .values()
        .map(String::as_str)
        .filter(|name| !name.is_empty())
        .collect();
    if names.len() < 2 {
        return None;
    }

    let text = text.trim();
    for &victim in &names {
        let Some(rest) = text.strip_prefix(victim) else {
            continue;
        };
        if !(rest.starts_with(' ') || rest.starts_with('\'')) {
            continue;
        }

        let killer = names
            .iter()
            .copied()
            .find(|&killer| killer != victim && mentions(rest, killer));
        if let Some(killer) = killer {
            return Some(KillLine {
                killer: killer.to_string(),
                victim: victim.to_string(),
                location: classify_location(rest),
                weapon: classify_weapon(text),
            });
        }
    }
    None
}

/// Returns whether ` name` occurs in `text` ending on a word boundary.
fn mentions(text: &str, name: &str) -> bool {
    let needle = format!(" {name}");
    let mut from = 0;
    while let Some(found) = text[from..].find(&needle) {
        let end = from + found + needle.len();
        if !text[end..].starts_with(char::is_alphanumeric) {
            return true;
        }
        from += found + 1;
    }
    false
}

/// Parses `You hit <victim> in the <part>` (case-insensitive).
///
/// Returns the victim as printed and the body region.
#[must_use]
pub fn parse_hit_line(text: &str) -> Option<(String, HitLocation)> {
    const PREFIX: &str = "you hit ";
    const SEPARATOR: &str = " in the ";

    let folded = text.to_ascii_lowercase();
    if !folded.starts_with(PREFIX) {
        return None;
    }

    for (at, _) in folded.char_indices().skip_while(|&(i, _)| i <= PREFIX.len()) {
        if !folded[at..].starts_with(SEPARATOR) {
            continue;
        }
        let victim = &text[PREFIX.len()..at];
        if victim.contains('\n') {
            return None;
        }

        let tail = &folded[at + SEPARATOR.len()..];
        let part_len: usize = tail
            .chars()
            .take_while(|&c| c.is_alphanumeric() || c == '_')
            .map(char::len_utf8)
            .sum();
        if part_len > 0 {
            return Some((victim.to_string(), location_from_part(&tail[..part_len])));
        }
    }
    None
}

/// Maps the body-part token of a hit confirmation to a region.
fn location_from_part(part: &str) -> HitLocation {
    if part.contains("leg") {
        HitLocation::Legs
    } else if part.contains("stomach") {
        HitLocation::Stomach
    } else if part.contains("body") {
        HitLocation::Chest
    } else if part.contains("head") {
        HitLocation::Head
    } else if part.contains("chest") {
        HitLocation::Chest
    } else {
        HitLocation::Unknown
    }
}

/// Parses an award centerprint.
///
/// Recognises `IMPRESSIVE <player>!`, `ACCURACY <player>!` and
/// `EXCELLENT <player> (<n>x)!`. Surrounding whitespace is ignored; the
/// keywords are case-sensitive.
#[must_use]
pub fn parse_award(text: &str) -> Option<(String, AwardKind, Option<u32>)> {
    let text = text.trim();

    let simple = |prefix: &str| {
        text.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix('!'))
            .filter(|name| is_award_name(name))
    };

    if let Some(name) = simple("IMPRESSIVE ") {
        return Some((name.to_string(), AwardKind::Impressive, None));
    }
    if let Some(name) = simple("ACCURACY ") {
        return Some((name.to_string(), AwardKind::Accuracy, None));
    }

    let (name, count) = text
        .strip_prefix("EXCELLENT ")?
        .strip_suffix("x)!")?
        .rsplit_once(" (")?;
    if !is_award_name(name) || count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name.to_string(), AwardKind::Excellent, Some(count.parse().ok()?)))
}

fn is_award_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('\n')
}

/// Parses a round-outcome broadcast.
///
/// Checked in order, case-insensitively, on the trimmed text:
///
/// 1. `Team <n> won!` at the start;
/// 2. `it was a tie` anywhere;
/// 3. `Current score is Team <a>: <n> to Team <b>: <m>` anywhere.
#[must_use]
pub fn parse_round_outcome(text: &str) -> Option<RoundOutcome> {
    let text = text.trim();
    let folded = text.to_ascii_lowercase();

    if let Some(len) = team_name_len(&folded) {
        if folded[len..].starts_with(" won!") {
            return Some(RoundOutcome::Win {
                team_name: text[..len].to_string(),
            });
        }
    }

    if folded.contains("it was a tie") {
        return Some(RoundOutcome::Tie);
    }

    parse_score(text, &folded)
}

/// Length of a leading `team <digits>` token.
fn team_name_len(folded: &str) -> Option<usize> {
    const TEAM: &str = "team ";
    let digits = leading_digits(folded.strip_prefix(TEAM)?);
    (digits > 0).then_some(TEAM.len() + digits)
}

fn leading_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

fn parse_score(text: &str, folded: &str) -> Option<RoundOutcome> {
    const LEAD: &str = "current score is ";

    folded.match_indices(LEAD).find_map(|(at, _)| {
        let mut pos = at + LEAD.len();
        let (team1_name, score1) = read_team_score(text, folded, &mut pos)?;
        pos += folded[pos..].strip_prefix(" to ").map(|_| " to ".len())?;
        let (team2_name, score2) = read_team_score(text, folded, &mut pos)?;
        Some(RoundOutcome::Score {
            team1_name,
            score1,
            team2_name,
            score2,
        })
    })
}

/// Reads `Team <n>: <score>` at `pos`, advancing past it.
fn read_team_score(text: &str, folded: &str, pos: &mut usize) -> Option<(String, u32)> {
    let name_len = team_name_len(&folded[*pos..])?;
    let name = text[*pos..*pos + name_len].to_string();

    let after = folded[*pos + name_len..].strip_prefix(": ")?;
    let digits = leading_digits(after);
    if digits == 0 {
        return None;
    }
    let score = after[..digits].parse().ok()?;

    *pos += name_len + 2 + digits;
    Some((name, score))
}

//! Accuracy and damage estimates.
//!
//! The capture never states how much damage a hit did, so it is estimated
//! per player from:
//!
//! - the weapon the player fired most, read from muzzle-flash wire codes
//!   when there are at least [`MIN_MUZZLE_SAMPLES`] of them;
//! - otherwise the weapons credited with the player's kills.
//!
//! Shotguns deal a flat amount per hit. Every other weapon is scaled by a
//! per-location multiplier.
//!
//! | Location | Multiplier |
//! |----------|------------|
//! | head | 1.8 |
//! | chest | 0.65 |
//! | stomach | 0.40 |
//! | legs | 0.25 |
//! | unknown | 0.55 |

use std::collections::BTreeMap;

use crate::events::{HitLocation, Weapon};
use crate::protocol::player::round1;

/// Muzzle-flash wire code of the M3 shotgun.
pub const MZ_SHOTGUN: u8 = 2;

/// Muzzle-flash wire code of the handcannon.
pub const MZ_HANDCANNON: u8 = 13;

/// Muzzle-flash wire code of the sniper rifle.
pub const MZ_SNIPER: u8 = 14;

/// Fewest muzzle flashes needed before their mix is trusted.
pub const MIN_MUZZLE_SAMPLES: u32 = 5;

/// Base damage assumed for weapons outside the table.
pub const DEFAULT_BASE_DAMAGE: f64 = 75.0;

/// Base damage of one bullet or pellet.
#[must_use]
pub fn base_damage(weapon: Weapon) -> f64 {
    match weapon {
        Weapon::Mk23 | Weapon::DualMk23 | Weapon::M4 => 90.0,
        Weapon::Mp5 => 55.0,
        Weapon::Sniper => 250.0,
        Weapon::M3 => 17.0,
        Weapon::Handcannon => 18.0,
        Weapon::Knife | Weapon::KnifeThrown => 50.0,
        Weapon::Grenade | Weapon::Kick | Weapon::Punch | Weapon::Grapple => 0.0,
        Weapon::Unknown => DEFAULT_BASE_DAMAGE,
    }
}

/// Damage multiplier for a hit location.
#[must_use]
pub fn location_multiplier(location: HitLocation) -> f64 {
    match location {
        HitLocation::Head => 1.8,
        HitLocation::Chest => 0.65,
        HitLocation::Stomach => 0.40,
        HitLocation::Legs => 0.25,
        HitLocation::Unknown => 0.55,
    }
}

/// Muzzle-flash wire-code histogram for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuzzleProfile {
    counts: BTreeMap<u8, u32>,
    total: u32,
}

impl MuzzleProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one shot with the given wire code.
    pub fn record(&mut self, mz: u8) {
        *self.counts.entry(mz).or_insert(0) += 1;
        self.total += 1;
    }

    /// Returns the number of shots recorded.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Returns the number of shots with any of `codes`.
    #[must_use]
    pub fn count(&self, codes: &[u8]) -> u32 {
        codes.iter().filter_map(|code| self.counts.get(code)).sum()
    }

    /// Returns whether there are enough samples and `codes` make up more
    /// than half of them.
    #[must_use]
    pub fn dominated_by(&self, codes: &[u8]) -> bool {
        self.total >= MIN_MUZZLE_SAMPLES
            && f64::from(self.count(codes)) / f64::from(self.total) > 0.5
    }

    /// Returns whether the player mostly fired shotguns.
    ///
    /// Shotgun hits never produce hit confirmations, so accuracy is
    /// meaningless for such players.
    #[must_use]
    pub fn is_shotgun_primary(&self) -> bool {
        self.dominated_by(&[MZ_SHOTGUN, MZ_HANDCANNON])
    }
}

/// Hit percentage, or `None` for shotgun-primary players.
///
/// Clamped to 100 and rounded to one decimal.
#[must_use]
pub fn accuracy(hits: u32, profile: &MuzzleProfile) -> Option<f64> {
    let shots = profile.total();
    if shots == 0 || profile.is_shotgun_primary() {
        return None;
    }
    Some(round1(f64::from(hits) / f64::from(shots) * 100.0).min(100.0))
}

/// Per-hit damage assumption for one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageModel {
    /// Damage per hit before the location multiplier.
    pub base: f64,
    /// Whether hits deal `base` regardless of location.
    pub flat: bool,
}

impl DamageModel {
    /// Picks a damage model from a player's shots and kills.
    #[must_use]
    pub fn infer(profile: Option<&MuzzleProfile>, kills: Option<&BTreeMap<Weapon, u32>>) -> Self {
        if let Some(profile) = profile {
            if profile.dominated_by(&[MZ_SHOTGUN]) {
                return Self::flat(base_damage(Weapon::M3));
            }
            if profile.dominated_by(&[MZ_HANDCANNON]) {
                return Self::flat(base_damage(Weapon::Handcannon));
            }
            if profile.dominated_by(&[MZ_SNIPER]) {
                return Self::scaled(base_damage(Weapon::Sniper));
            }
        }

        let Some(kills) = kills else {
            return Self::scaled(DEFAULT_BASE_DAMAGE);
        };
        let total: u32 = kills.values().sum();
        if total == 0 {
            return Self::scaled(DEFAULT_BASE_DAMAGE);
        }

        let share = |weapon| f64::from(kills.get(&weapon).copied().unwrap_or(0)) / f64::from(total);
        if share(Weapon::M3) > 0.5 {
            return Self::flat(base_damage(Weapon::M3));
        }
        if share(Weapon::Handcannon) > 0.5 {
            return Self::flat(base_damage(Weapon::Handcannon));
        }

        let weighted: f64 = kills
            .iter()
            .map(|(&weapon, &count)| base_damage(weapon) * f64::from(count))
            .sum();
        Self::scaled(weighted / f64::from(total))
    }

    fn flat(base: f64) -> Self {
        Self { base, flat: true }
    }

    fn scaled(base: f64) -> Self {
        Self { base, flat: false }
    }

    /// Estimates total damage over a per-location hit histogram.
    ///
    /// Rounds half to even.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn estimate(&self, hits: &BTreeMap<HitLocation, u32>) -> u64 {
        let total: f64 = hits
            .iter()
            .map(|(&location, &count)| {
                let per_hit = if self.flat {
                    self.base
                } else {
                    self.base * location_multiplier(location)
                };
                per_hit * f64::from(count)
            })
            .sum();
        total.round_ties_even().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(codes: &[(u8, u32)]) -> MuzzleProfile {
        let mut profile = MuzzleProfile::new();
        for &(code, count) in codes {
            for _ in 0..count {
                profile.record(code);
            }
        }
        profile
    }

    fn hits(list: &[(HitLocation, u32)]) -> BTreeMap<HitLocation, u32> {
        list.iter().copied().collect()
    }

    // ========================
    // Accuracy
    // ========================

    #[test]
    fn test_accuracy_basic() {
        let shots = profile(&[(1, 8)]);
        assert_eq!(accuracy(3, &shots), Some(37.5));
        assert_eq!(accuracy(0, &shots), Some(0.0));
    }

    #[test]
    fn test_accuracy_clamped() {
        let shots = profile(&[(1, 2)]);
        assert_eq!(accuracy(5, &shots), Some(100.0));
    }

    #[test]
    fn test_accuracy_suppressed_for_shotguns() {
        let shots = profile(&[(MZ_SHOTGUN, 2), (MZ_HANDCANNON, 2), (1, 1)]);
        assert_eq!(accuracy(4, &shots), None);
    }

    #[test]
    fn test_accuracy_kept_below_sample_threshold() {
        // all shotgun, but too few samples to trust
        let shots = profile(&[(MZ_SHOTGUN, 4)]);
        assert_eq!(accuracy(1, &shots), Some(25.0));
    }

    #[test]
    fn test_accuracy_exact_half_is_not_dominant() {
        let shots = profile(&[(MZ_SHOTGUN, 3), (1, 3)]);
        assert_eq!(accuracy(3, &shots), Some(50.0));
    }

    // ========================
    // Damage
    // ========================

    #[test]
    fn test_model_from_muzzle_flashes() {
        let sniper = profile(&[(MZ_SNIPER, 5)]);
        assert_eq!(DamageModel::infer(Some(&sniper), None), DamageModel::scaled(250.0));

        let hc = profile(&[(MZ_HANDCANNON, 4), (1, 1)]);
        assert_eq!(DamageModel::infer(Some(&hc), None), DamageModel::flat(18.0));
    }

    #[test]
    fn test_model_falls_back_to_kills() {
        let few = profile(&[(MZ_SNIPER, 2)]);
        let kills = BTreeMap::from([(Weapon::M4, 1), (Weapon::Mp5, 1)]);
        let model = DamageModel::infer(Some(&few), Some(&kills));
        assert_eq!(model, DamageModel::scaled(72.5));
    }

    #[test]
    fn test_model_shotgun_kills() {
        let kills = BTreeMap::from([(Weapon::M3, 2), (Weapon::Mk23, 1)]);
        assert_eq!(DamageModel::infer(None, Some(&kills)), DamageModel::flat(17.0));
    }

    #[test]
    fn test_model_default() {
        assert_eq!(DamageModel::infer(None, None), DamageModel::scaled(75.0));
        assert_eq!(
            DamageModel::infer(None, Some(&BTreeMap::new())),
            DamageModel::scaled(75.0)
        );
    }

    #[test]
    fn test_estimate_scaled() {
        let model = DamageModel::scaled(90.0);
        let total = model.estimate(&hits(&[(HitLocation::Head, 1), (HitLocation::Legs, 2)]));
        // 162 + 45
        assert_eq!(total, 207);
    }

    #[test]
    fn test_estimate_flat() {
        let model = DamageModel::flat(17.0);
        let total = model.estimate(&hits(&[(HitLocation::Head, 1), (HitLocation::Unknown, 3)]));
        assert_eq!(total, 68);
    }

    #[test]
    fn test_estimate_rounds_half_to_even() {
        // 10 × 0.25 = 2.5
        let model = DamageModel::scaled(10.0);
        assert_eq!(model.estimate(&hits(&[(HitLocation::Legs, 1)])), 2);
    }
}

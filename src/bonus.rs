//! Construction speed bonuses
//!
//! Two combination rules are in use and they disagree, so callers always name
//! the one they want:
//!
//! - [`BonusFormula::AdditiveDenominator`]: every bonus, double time included,
//!   goes into one denominator: `raw / (1 + sum)`.
//! - [`BonusFormula::DenominatorThenFactor`]: double time is taken off after
//!   the division: `raw / (1 + sum_without_boost) * (1 - boost)`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

/// Recognized bonus names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BonusKind {
    /// Base construction speed from research, chief gear, etc.
    BaseSpeed,
    /// Double Time. The boost.
    DoubleTime,
    VpBonus,
    /// Builder's Aide pet skill.
    PetBonus,
    Mercantilism,
}

impl BonusKind {
    pub const ALL: [BonusKind; 5] = [
        BonusKind::BaseSpeed,
        BonusKind::DoubleTime,
        BonusKind::VpBonus,
        BonusKind::PetBonus,
        BonusKind::Mercantilism,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BonusKind::BaseSpeed => "base_speed",
            BonusKind::DoubleTime => "double_time",
            BonusKind::VpBonus => "vp_bonus",
            BonusKind::PetBonus => "pet_bonus",
            BonusKind::Mercantilism => "mercantilism",
        }
    }

    /// Whether the bonus is applied as a separate factor under
    /// [`BonusFormula::DenominatorThenFactor`].
    pub fn is_boost(self) -> bool {
        self == BonusKind::DoubleTime
    }
}

impl fmt::Display for BonusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BonusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BonusKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown bonus '{}'", s))
    }
}

/// Bonus percentages keyed by kind. Missing kinds count as 0%.
///
/// Values are not range checked; negative or >100 percentages flow straight
/// into the arithmetic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonusSet(BTreeMap<BonusKind, f64>);

impl BonusSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: BonusKind, percent: f64) -> Self {
        self.set(kind, percent);
        self
    }

    pub fn set(&mut self, kind: BonusKind, percent: f64) {
        self.0.insert(kind, percent);
    }

    pub fn percent(&self, kind: BonusKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn fraction(&self, kind: BonusKind) -> f64 {
        self.percent(kind) / 100.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BonusKind, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// How bonuses combine into a duration reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BonusFormula {
    #[default]
    #[value(name = "additive")]
    AdditiveDenominator,
    #[value(name = "boost-factor")]
    DenominatorThenFactor,
}

/// Duration after bonuses, in (fractional) seconds.
pub fn normalize(raw_seconds: u64, bonuses: &BonusSet, formula: BonusFormula) -> f64 {
    let raw = raw_seconds as f64;
    match formula {
        BonusFormula::AdditiveDenominator => {
            let sum: f64 = bonuses.iter().map(|(_, pct)| pct / 100.0).sum();
            raw / (1.0 + sum)
        }
        BonusFormula::DenominatorThenFactor => {
            let sum: f64 = bonuses
                .iter()
                .filter(|(kind, _)| !kind.is_boost())
                .map(|(_, pct)| pct / 100.0)
                .sum();
            let boost = bonuses.fraction(BonusKind::DoubleTime);
            raw / (1.0 + sum) * (1.0 - boost)
        }
    }
}

/// Percentage of the raw duration saved. 0 when there is nothing to save.
pub fn reduction_percent(raw_seconds: u64, adjusted_seconds: f64) -> f64 {
    if raw_seconds == 0 {
        return 0.0;
    }
    100.0 * (1.0 - adjusted_seconds / raw_seconds as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> BonusSet {
        BonusSet::new()
            .with(BonusKind::BaseSpeed, 85.0)
            .with(BonusKind::DoubleTime, 20.0)
            .with(BonusKind::VpBonus, 10.0)
            .with(BonusKind::PetBonus, 15.0)
    }

    #[test]
    fn test_additive_denominator() {
        let adjusted = normalize(1_000_000, &standard(), BonusFormula::AdditiveDenominator);
        assert!((adjusted - 1_000_000.0 / 2.3).abs() < 1e-6);
        assert!((adjusted - 434_782.6).abs() < 0.1);
    }

    #[test]
    fn test_denominator_then_factor() {
        let adjusted = normalize(1_000_000, &standard(), BonusFormula::DenominatorThenFactor);
        assert!((adjusted - 1_000_000.0 / 2.1 * 0.8).abs() < 1e-6);
        assert!((adjusted - 380_952.4).abs() < 0.1);
    }

    #[test]
    fn test_formulas_differ() {
        let a = normalize(1_000_000, &standard(), BonusFormula::AdditiveDenominator);
        let b = normalize(1_000_000, &standard(), BonusFormula::DenominatorThenFactor);
        assert!((a - b).abs() > 1.0);
    }

    #[test]
    fn test_no_bonuses_is_identity() {
        for formula in [BonusFormula::AdditiveDenominator, BonusFormula::DenominatorThenFactor] {
            assert_eq!(normalize(12_345, &BonusSet::new(), formula), 12_345.0);
        }
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let bonuses = BonusSet::new().with(BonusKind::BaseSpeed, -50.0);
        assert_eq!(normalize(1000, &bonuses, BonusFormula::AdditiveDenominator), 2000.0);

        let bonuses = BonusSet::new().with(BonusKind::BaseSpeed, 300.0);
        assert_eq!(normalize(1000, &bonuses, BonusFormula::AdditiveDenominator), 250.0);
    }

    #[test]
    fn test_reduction_percent() {
        assert!((reduction_percent(1000, 250.0) - 75.0).abs() < 1e-9);
        assert_eq!(reduction_percent(0, 0.0), 0.0);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in BonusKind::ALL {
            assert_eq!(kind.name().parse::<BonusKind>().unwrap(), kind);
        }
        assert!("speed".parse::<BonusKind>().is_err());
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::domain::FraudBand;

/// Whether a tier threshold admits values equal to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Inclusive,
    Exclusive,
}

impl Boundary {
    pub(crate) fn admits(self, value: i128, threshold: i128) -> bool {
        match self {
            Boundary::Inclusive => value >= threshold,
            Boundary::Exclusive => value > threshold,
        }
    }
}

/// One graded step of a rule. Only the highest admitted tier of a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: i64,
    pub points: u8,
    pub reason: String,
}

impl Tier {
    pub fn new(threshold: i64, points: u8, reason: impl Into<String>) -> Self {
        Self {
            threshold,
            points,
            reason: reason.into(),
        }
    }
}

/// Flat addition applied when a condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addend {
    pub points: u8,
    pub reason: String,
}

impl Addend {
    pub fn new(points: u8, reason: impl Into<String>) -> Self {
        Self {
            points,
            reason: reason.into(),
        }
    }
}

/// Lower bounds (inclusive) of the Medium and High bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub medium_min: u8,
    pub high_min: u8,
}

impl BandThresholds {
    pub fn classify(&self, score: u8) -> FraudBand {
        if score >= self.high_min {
            FraudBand::High
        } else if score >= self.medium_min {
            FraudBand::Medium
        } else {
            FraudBand::Low
        }
    }
}

/// Immutable weight and threshold table driving the scoring engine.
///
/// Units: `ratio_tiers` thresholds are hundredths of the category mean
/// (`150` = 1.5×), `deviation_tiers` thresholds are hundredths of a standard
/// deviation, `magnitude_tiers` thresholds are cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub boundary: Boundary,
    pub ratio_tiers: Vec<Tier>,
    pub unknown_baseline: Option<Addend>,
    pub deviation_tiers: Vec<Tier>,
    pub magnitude_tiers: Vec<Tier>,
    pub missing_provider_type: Option<Addend>,
    pub missing_category: Option<Addend>,
    /// Keyed by lowercase provider type.
    pub provider_type_weights: BTreeMap<String, u8>,
    pub bands: BandThresholds,
}

impl RuleSet {
    /// Five-rule model: ratio, deviation, magnitude, missing metadata, and
    /// provider-type risk. High band starts at 76.
    pub fn canonical() -> Self {
        let provider_type_weights = [
            ("dme", 6),
            ("durable medical equipment", 6),
            ("durable-medical-equipment", 6),
            ("lab", 5),
            ("laboratory", 5),
            ("pharmacy", 4),
            ("clinic", 3),
            ("hospital", 2),
        ]
        .into_iter()
        .map(|(kind, weight)| (kind.to_string(), weight))
        .collect();

        Self {
            name: RuleSetVersion::Canonical.label().to_string(),
            boundary: Boundary::Inclusive,
            ratio_tiers: vec![
                Tier::new(250, 60, "severe overcharge vs. category average"),
                Tier::new(200, 48, "charge ≥ 2.0× category average"),
                Tier::new(150, 36, "charge ≥ 1.5× category average"),
                Tier::new(120, 22, "charge ≥ 1.2× category average"),
                Tier::new(100, 8, "charge slightly above category average"),
            ],
            unknown_baseline: Some(Addend::new(8, "baseline average unknown")),
            deviation_tiers: vec![
                Tier::new(300, 25, "charge ≥ 3 SD above category average"),
                Tier::new(200, 18, "charge ≥ 2 SD above category average"),
                Tier::new(100, 10, "charge ≥ 1 SD above category average"),
            ],
            magnitude_tiers: vec![
                Tier::new(200_000, 10, "high absolute charge (≥ $2000)"),
                Tier::new(100_000, 6, "elevated absolute charge (≥ $1000)"),
            ],
            missing_provider_type: Some(Addend::new(10, "missing provider type")),
            missing_category: Some(Addend::new(5, "missing category code")),
            provider_type_weights,
            bands: BandThresholds {
                medium_min: 26,
                high_min: 76,
            },
        }
    }

    /// Earlier four-rule model with strict comparisons and High at 75, kept so
    /// scores stored under it can be reproduced.
    pub fn legacy() -> Self {
        Self {
            name: RuleSetVersion::Legacy.label().to_string(),
            boundary: Boundary::Exclusive,
            ratio_tiers: vec![
                Tier::new(150, 40, "Claim charge significantly higher than average."),
                Tier::new(120, 20, "Claim charge moderately higher than average."),
            ],
            unknown_baseline: None,
            deviation_tiers: vec![Tier::new(
                200,
                25,
                "Claim charge more than 2 SD above average.",
            )],
            magnitude_tiers: Vec::new(),
            missing_provider_type: Some(Addend::new(10, "Missing provider type data.")),
            missing_category: Some(Addend::new(5, "Missing procedure code data.")),
            provider_type_weights: BTreeMap::new(),
            bands: BandThresholds {
                medium_min: 26,
                high_min: 75,
            },
        }
    }

    pub fn provider_weight(&self, provider_type: &str) -> u8 {
        let key = provider_type.trim().to_ascii_lowercase();
        self.provider_type_weights.get(&key).copied().unwrap_or(0)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Named rule-set selector used by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetVersion {
    #[default]
    Canonical,
    Legacy,
}

impl RuleSetVersion {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "canonical" | "v2" | "default" => Some(Self::Canonical),
            "legacy" | "v1" => Some(Self::Legacy),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleSetVersion::Canonical => "canonical",
            RuleSetVersion::Legacy => "legacy",
        }
    }

    pub fn rule_set(&self) -> RuleSet {
        match self {
            RuleSetVersion::Canonical => RuleSet::canonical(),
            RuleSetVersion::Legacy => RuleSet::legacy(),
        }
    }
}

impl fmt::Display for RuleSetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

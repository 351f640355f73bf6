use serde::Serialize;

use super::domain::{Claim, FraudBand};
use super::scoring::BandThresholds;

/// Raw counters a store gathers before the summary is derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTally {
    pub total_claims: u64,
    pub total_charge: f64,
    pub flagged: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl ScoreTally {
    pub fn from_claims<'a, I>(claims: I, bands: &BandThresholds) -> Self
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let mut tally = Self::default();
        for claim in claims {
            tally.total_claims += 1;
            tally.total_charge += claim.record.claim_charge;
            if claim.fraud_score() >= bands.high_min {
                tally.flagged += 1;
            }
            match claim.fraud_band() {
                Some(FraudBand::Low) => tally.low += 1,
                Some(FraudBand::Medium) => tally.medium += 1,
                Some(FraudBand::High) => tally.high += 1,
                None => {}
            }
        }
        tally
    }

    pub fn summarize(&self) -> ClaimMetrics {
        let (average_claim_charge, flagged_percent) = if self.total_claims == 0 {
            (0, 0)
        } else {
            let total = self.total_claims as f64;
            (
                (self.total_charge / total).round() as i64,
                (self.flagged as f64 * 100.0 / total).round() as u32,
            )
        };

        ClaimMetrics {
            metrics: MetricsSummary {
                total_claims: self.total_claims,
                average_claim_charge,
                flagged_count: self.flagged,
                flagged_percent,
            },
            distribution: BandDistribution {
                low: self.low,
                medium: self.medium,
                high: self.high,
            },
        }
    }
}

/// Dashboard metrics payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimMetrics {
    pub metrics: MetricsSummary,
    pub distribution: BandDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_claims: u64,
    /// Whole dollars.
    pub average_claim_charge: i64,
    /// Claims scoring at or above the High band threshold.
    pub flagged_count: u64,
    pub flagged_percent: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BandDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

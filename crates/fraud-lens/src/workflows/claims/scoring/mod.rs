mod config;
mod rules;

pub use config::{Addend, BandThresholds, Boundary, RuleSet, RuleSetVersion, Tier};

use super::domain::{FraudAssessment, FraudBand, NewClaim};
use serde::{Deserialize, Serialize};

/// Category baseline in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean_cents: i64,
    pub std_dev_cents: i64,
}

/// Everything the rule table looks at for one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInput<'a> {
    pub charge_cents: i64,
    pub baseline: Option<Baseline>,
    pub provider_type: Option<&'a str>,
    pub category: Option<&'a str>,
}

impl<'a> ScoreInput<'a> {
    pub fn for_claim(claim: &'a NewClaim, baseline: Option<Baseline>) -> Self {
        Self {
            charge_cents: claim.charge_cents(),
            baseline,
            provider_type: claim.provider_type.as_deref(),
            category: claim.category_key(),
        }
    }
}

/// Clamped score plus the reasons of every rule that fired, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: u8,
    pub reasons: Vec<String>,
}

/// Stateless scorer applying a [`RuleSet`] to claims.
#[derive(Debug, Clone)]
pub struct FraudScoringEngine {
    rules: RuleSet,
}

impl FraudScoringEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> ScoreOutcome {
        rules::score_claim(input, &self.rules)
    }

    pub fn classify(&self, score: u8) -> FraudBand {
        self.rules.bands.classify(score)
    }

    pub fn assess(&self, input: &ScoreInput<'_>) -> FraudAssessment {
        let ScoreOutcome { score, reasons } = self.score(input);
        FraudAssessment {
            score,
            band: self.classify(score),
            reasons,
        }
    }
}

impl Default for FraudScoringEngine {
    fn default() -> Self {
        Self::new(RuleSet::canonical())
    }
}

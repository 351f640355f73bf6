use super::config::{Addend, RuleSet, Tier};
use super::{ScoreInput, ScoreOutcome};

const MAX_SCORE: u32 = 100;

#[derive(Default)]
struct Tally {
    total: u32,
    reasons: Vec<String>,
}

impl Tally {
    fn add(&mut self, points: u8, reason: impl Into<String>) {
        self.total += u32::from(points);
        self.reasons.push(reason.into());
    }

    fn add_tier(&mut self, tier: &Tier) {
        self.add(tier.points, tier.reason.as_str());
    }

    fn add_addend(&mut self, addend: &Addend) {
        self.add(addend.points, addend.reason.as_str());
    }

    fn finish(self) -> ScoreOutcome {
        ScoreOutcome {
            score: self.total.min(MAX_SCORE) as u8,
            reasons: self.reasons,
        }
    }
}

fn highest_tier(tiers: &[Tier], admits: impl Fn(i64) -> bool) -> Option<&Tier> {
    tiers
        .iter()
        .filter(|tier| admits(tier.threshold))
        .max_by_key(|tier| tier.threshold)
}

pub(crate) fn score_claim(input: &ScoreInput<'_>, rules: &RuleSet) -> ScoreOutcome {
    let mut tally = Tally::default();
    let charge = i128::from(input.charge_cents);
    let boundary = rules.boundary;

    match input.baseline.filter(|baseline| baseline.mean_cents > 0) {
        Some(baseline) => {
            let mean = i128::from(baseline.mean_cents);
            if let Some(tier) = highest_tier(&rules.ratio_tiers, |threshold| {
                boundary.admits(charge * 100, mean * i128::from(threshold))
            }) {
                tally.add_tier(tier);
            }
        }
        None => {
            if let Some(addend) = &rules.unknown_baseline {
                tally.add_addend(addend);
            }
        }
    }

    if let Some(baseline) = input
        .baseline
        .filter(|baseline| baseline.mean_cents > 0 && baseline.std_dev_cents > 0)
    {
        let excess = charge - i128::from(baseline.mean_cents);
        let std_dev = i128::from(baseline.std_dev_cents);
        if let Some(tier) = highest_tier(&rules.deviation_tiers, |threshold| {
            boundary.admits(excess * 100, std_dev * i128::from(threshold))
        }) {
            tally.add_tier(tier);
        }
    }

    if let Some(tier) = highest_tier(&rules.magnitude_tiers, |threshold| {
        boundary.admits(charge, i128::from(threshold))
    }) {
        tally.add_tier(tier);
    }

    let provider_type = input
        .provider_type
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if provider_type.is_none() {
        if let Some(addend) = &rules.missing_provider_type {
            tally.add_addend(addend);
        }
    }

    let has_category = input
        .category
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if !has_category {
        if let Some(addend) = &rules.missing_category {
            tally.add_addend(addend);
        }
    }

    if let Some(kind) = provider_type {
        let weight = rules.provider_weight(kind);
        if weight > 0 {
            tally.add(weight, format!("provider type risk +{weight}"));
        }
    }

    tally.finish()
}

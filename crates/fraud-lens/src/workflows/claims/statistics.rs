//! Baseline statistics over claim charges.
//!
//! Accumulators keep exact integer sums (`Σx`, `Σx²` over cents), so the mean
//! and sample standard deviation come out bit-identical no matter how the
//! input is ordered.

use std::collections::BTreeMap;

use super::scoring::Baseline;

/// Charge distribution for one category key, in cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStats {
    pub mean_cents: f64,
    pub std_dev_cents: f64,
    pub count: u64,
}

impl CategoryStats {
    /// Whole-cent baseline handed to the scoring engine.
    pub fn baseline(&self) -> Baseline {
        Baseline {
            mean_cents: self.mean_cents.round() as i64,
            std_dev_cents: self.std_dev_cents.round() as i64,
        }
    }
}

/// Claim volume and average charge for one `(provider_id, provider_type)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStats {
    pub provider_id: String,
    pub provider_type: Option<String>,
    pub count: u64,
    pub mean_cents: f64,
}

/// Running `Σx²`: exact while it fits in `i128`, then carried as `f64`.
#[derive(Debug, Clone, Copy)]
enum Squares {
    Exact(i128),
    Approx(f64),
}

impl Default for Squares {
    fn default() -> Self {
        Self::Exact(0)
    }
}

impl Squares {
    fn push(self, value: i128) -> Self {
        match self {
            Self::Exact(total) => match value
                .checked_mul(value)
                .and_then(|square| total.checked_add(square))
            {
                Some(next) => Self::Exact(next),
                None => Self::Approx(total as f64 + (value as f64).powi(2)),
            },
            Self::Approx(total) => Self::Approx(total + (value as f64).powi(2)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Exact(total) => total as f64,
            Self::Approx(total) => total,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    count: u64,
    // |Σx| < 2^63 · 2^64 = 2^127, so the plain sum cannot overflow.
    sum: i128,
    squares: Squares,
}

impl Accumulator {
    fn push(&mut self, cents: i64) {
        let value = i128::from(cents);
        self.count += 1;
        self.sum += value;
        self.squares = self.squares.push(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }

    /// Sample standard deviation (n − 1 divisor); zero below two samples.
    fn sample_std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = i128::from(self.count);
        // n·Σ(x − mean)² expressed without leaving integer arithmetic.
        let exact = match self.squares {
            Squares::Exact(squares) => n.checked_mul(squares).and_then(|scaled| {
                self.sum
                    .checked_mul(self.sum)
                    .and_then(|square_of_sum| scaled.checked_sub(square_of_sum))
            }),
            Squares::Approx(_) => None,
        };
        let variance = match exact {
            Some(scaled) => scaled as f64 / (n as f64 * (n - 1) as f64),
            None => {
                let count = self.count as f64;
                let mean = self.mean();
                (self.squares.as_f64() - count * mean * mean) / (count - 1.0)
            }
        };
        variance.max(0.0).sqrt()
    }
}

/// Groups `(category, charge_cents)` samples and computes mean, sample
/// standard deviation, and count per category.
pub fn compute_category_stats<'a, I>(samples: I) -> BTreeMap<String, CategoryStats>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut groups: BTreeMap<&'a str, Accumulator> = BTreeMap::new();
    for (category, cents) in samples {
        groups.entry(category).or_default().push(cents);
    }

    groups
        .into_iter()
        .map(|(category, acc)| {
            (
                category.to_string(),
                CategoryStats {
                    mean_cents: acc.mean(),
                    std_dev_cents: acc.sample_std_dev(),
                    count: acc.count,
                },
            )
        })
        .collect()
}

/// Groups `(provider_id, provider_type, charge_cents)` samples, ordered by
/// provider id then provider type.
pub fn compute_provider_stats<'a, I>(samples: I) -> Vec<ProviderStats>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>, i64)>,
{
    let mut groups: BTreeMap<(&'a str, Option<&'a str>), Accumulator> = BTreeMap::new();
    for (provider_id, provider_type, cents) in samples {
        groups
            .entry((provider_id, provider_type))
            .or_default()
            .push(cents);
    }

    groups
        .into_iter()
        .map(|((provider_id, provider_type), acc)| ProviderStats {
            provider_id: provider_id.to_string(),
            provider_type: provider_type.map(str::to_string),
            count: acc.count,
            mean_cents: acc.mean(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_yields_empty_mapping() {
        let stats = compute_category_stats(Vec::<(&str, i64)>::new());
        assert!(stats.is_empty());
        assert!(compute_provider_stats(Vec::<(&str, Option<&str>, i64)>::new()).is_empty());
    }

    #[test]
    fn single_claim_category_has_zero_std_dev() {
        let stats = compute_category_stats(vec![("99213", 12_500)]);
        let entry = stats.get("99213").expect("category present");
        assert_eq!(entry.count, 1);
        assert_eq!(entry.mean_cents, 12_500.0);
        assert_eq!(entry.std_dev_cents, 0.0);
    }

    #[test]
    fn sample_std_dev_uses_n_minus_one() {
        let samples = vec![("A", 10_000), ("A", 10_000), ("A", 10_000), ("A", 30_000)];
        let stats = compute_category_stats(samples);
        let entry = stats.get("A").expect("category present");
        assert_eq!(entry.count, 4);
        assert_eq!(entry.mean_cents, 15_000.0);
        assert_eq!(entry.std_dev_cents, 10_000.0);
        assert_eq!(entry.baseline().mean_cents, 15_000);
        assert_eq!(entry.baseline().std_dev_cents, 10_000);
    }

    #[test]
    fn categories_are_grouped_independently() {
        let samples = vec![("A", 100), ("B", 300), ("A", 300), ("B", 300)];
        let stats = compute_category_stats(samples);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["A"].mean_cents, 200.0);
        assert_eq!(stats["B"].std_dev_cents, 0.0);
    }

    #[test]
    fn provider_stats_group_by_id_and_type() {
        let samples = vec![
            ("P1", Some("Hospital"), 10_000),
            ("P1", Some("Hospital"), 20_000),
            ("P1", None, 5_000),
            ("P2", Some("Lab"), 7_500),
        ];
        let stats = compute_provider_stats(samples);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].provider_id, "P1");
        assert_eq!(stats[0].provider_type, None);
        assert_eq!(stats[1].provider_type.as_deref(), Some("Hospital"));
        assert_eq!(stats[1].count, 2);
        assert_eq!(stats[1].mean_cents, 15_000.0);
        assert_eq!(stats[2].provider_id, "P2");
    }

    #[test]
    fn extreme_charges_do_not_overflow() {
        let stats = compute_category_stats(vec![("A", i64::MAX), ("A", i64::MAX)]);
        let entry = stats.get("A").expect("category present");
        assert_eq!(entry.count, 2);
        assert_eq!(entry.std_dev_cents, 0.0);
        assert!(entry.mean_cents.is_finite());

        let spread = compute_category_stats(vec![("B", i64::MAX), ("B", 0), ("B", i64::MIN)]);
        let entry = spread.get("B").expect("category present");
        assert!(entry.std_dev_cents.is_finite());
        assert!(entry.std_dev_cents > 0.0);
    }

    #[test]
    fn large_populations_fall_back_without_overflow() {
        let samples = (0..200_000).map(|index| ("A", if index % 2 == 0 { 100_000_000_000_000 } else { 0 }));
        let stats = compute_category_stats(samples);
        let entry = stats.get("A").expect("category present");
        assert_eq!(entry.mean_cents, 50_000_000_000_000.0);
        assert!((entry.std_dev_cents / 50_000_000_000_000.0 - 1.0).abs() < 1e-4);
    }

    fn labelled(samples: &[(u8, i64)]) -> Vec<(&'static str, i64)> {
        const LABELS: [&str; 4] = ["A", "B", "C", "D"];
        samples
            .iter()
            .map(|(label, cents)| (LABELS[*label as usize % LABELS.len()], *cents))
            .collect()
    }

    proptest! {
        #[test]
        fn category_stats_ignore_input_order(
            (original, shuffled) in proptest::collection::vec((0u8..4, 0i64..5_000_000), 0..64)
                .prop_flat_map(|samples| (Just(samples.clone()), Just(samples).prop_shuffle()))
        ) {
            let first = compute_category_stats(labelled(&original));
            let second = compute_category_stats(labelled(&shuffled));
            let again = compute_category_stats(labelled(&original));
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first, &again);
        }

        #[test]
        fn std_dev_is_never_negative(
            samples in proptest::collection::vec((0u8..4, -1_000_000i64..1_000_000), 1..48)
        ) {
            for stats in compute_category_stats(labelled(&samples)).values() {
                prop_assert!(stats.std_dev_cents >= 0.0);
                prop_assert!(stats.count >= 1);
            }
        }
    }
}

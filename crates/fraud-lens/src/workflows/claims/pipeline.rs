use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;

use super::domain::{CategoryStatistic, ClaimScoreUpdate, NewClaim, ProviderStatistic};
use super::money::to_dollars;
use super::repository::{ClaimStore, ClaimTransaction, RepositoryError};
use super::scoring::{Baseline, FraudScoringEngine, ScoreInput};
use super::statistics::{compute_category_stats, compute_provider_stats};

/// Result of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Claims newly stored by this run.
    pub inserted: usize,
    /// Claims stored after the run.
    pub total: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("ingestion rolled back: {0}")]
    Repository(#[from] RepositoryError),
}

/// Inserts a batch, then recomputes baselines, scores, and provider
/// aggregates over the whole store as a single unit of work. Runs are
/// serialized so a later run always sees the result of an earlier one.
pub struct IngestionPipeline<S> {
    store: Arc<S>,
    engine: FraudScoringEngine,
    runs: Mutex<()>,
}

impl<S> IngestionPipeline<S>
where
    S: ClaimStore + 'static,
{
    pub fn new(store: Arc<S>, engine: FraudScoringEngine) -> Self {
        Self {
            store,
            engine,
            runs: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &FraudScoringEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ingest(&self, claims: &[NewClaim]) -> Result<IngestSummary, IngestError> {
        let _run = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(claims = claims.len(), "starting claim ingestion");

        let summary = self
            .store
            .transaction(|tx| self.run(tx, claims))
            .map_err(|err| {
                tracing::warn!(error = %err, "claim ingestion rolled back");
                IngestError::from(err)
            })?;

        tracing::info!(
            inserted = summary.inserted,
            total = summary.total,
            "claim ingestion committed"
        );
        Ok(summary)
    }

    /// Recomputes derived data without inserting anything.
    pub fn rescore(&self) -> Result<IngestSummary, IngestError> {
        self.ingest(&[])
    }

    fn run(
        &self,
        tx: &mut dyn ClaimTransaction,
        batch: &[NewClaim],
    ) -> Result<IngestSummary, RepositoryError> {
        let inserted = tx.insert_claims(batch)?;
        let stored = tx.claims()?;
        let computed_at = Utc::now();

        let category_stats = compute_category_stats(stored.iter().filter_map(|claim| {
            claim
                .record
                .category_key()
                .map(|category| (category, claim.record.charge_cents()))
        }));
        let category_rows: Vec<CategoryStatistic> = category_stats
            .iter()
            .map(|(category, stats)| CategoryStatistic {
                category: category.clone(),
                mean_charge: to_dollars(stats.mean_cents.round() as i64),
                std_dev: to_dollars(stats.std_dev_cents.round() as i64),
                claim_count: stats.count,
                last_updated: computed_at,
            })
            .collect();
        tx.replace_category_stats(&category_rows)?;

        let baselines: HashMap<&str, Baseline> = category_stats
            .iter()
            .map(|(category, stats)| (category.as_str(), stats.baseline()))
            .collect();

        let updates: Vec<ClaimScoreUpdate> = stored
            .iter()
            .map(|claim| {
                let baseline = claim
                    .record
                    .category_key()
                    .and_then(|category| baselines.get(category).copied());
                ClaimScoreUpdate {
                    claim_id: claim.claim_id().clone(),
                    assessment: self
                        .engine
                        .assess(&ScoreInput::for_claim(&claim.record, baseline)),
                }
            })
            .collect();
        tx.apply_scores(&updates)?;

        let provider_rows: Vec<ProviderStatistic> =
            compute_provider_stats(stored.iter().filter_map(|claim| {
                claim.record.provider_id.as_deref().map(|provider_id| {
                    (
                        provider_id,
                        claim.record.provider_type.as_deref(),
                        claim.record.charge_cents(),
                    )
                })
            }))
            .into_iter()
            .map(|stats| ProviderStatistic {
                provider_id: stats.provider_id,
                provider_type: stats.provider_type,
                claim_count: stats.count,
                average_charge: to_dollars(stats.mean_cents.round() as i64),
            })
            .collect();
        tx.replace_provider_stats(&provider_rows)?;

        tracing::debug!(
            categories = category_rows.len(),
            providers = provider_rows.len(),
            scored = updates.len(),
            "derived claim data recomputed"
        );

        Ok(IngestSummary {
            inserted,
            total: tx.count_claims()?,
        })
    }
}

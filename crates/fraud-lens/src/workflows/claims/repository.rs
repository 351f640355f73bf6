use std::cmp::Ordering;

use serde::Serialize;

use super::domain::{
    CategoryStatistic, Claim, ClaimScoreUpdate, NewClaim, ProviderStatistic,
};
use super::metrics::ClaimMetrics;
use super::scoring::BandThresholds;

/// Writes available inside one ingestion unit of work. Nothing done through
/// this handle is visible to readers until the surrounding
/// [`ClaimStore::transaction`] commits.
pub trait ClaimTransaction {
    /// Inserts claims whose identifier is not yet stored and returns how many
    /// were added. Duplicates, including repeats within `claims`, are skipped.
    fn insert_claims(&mut self, claims: &[NewClaim]) -> Result<usize, RepositoryError>;
    fn claims(&self) -> Result<Vec<Claim>, RepositoryError>;
    fn replace_category_stats(
        &mut self,
        stats: &[CategoryStatistic],
    ) -> Result<(), RepositoryError>;
    fn apply_scores(&mut self, updates: &[ClaimScoreUpdate]) -> Result<(), RepositoryError>;
    fn replace_provider_stats(
        &mut self,
        stats: &[ProviderStatistic],
    ) -> Result<(), RepositoryError>;
    fn count_claims(&self) -> Result<u64, RepositoryError>;
}

/// Storage abstraction for claims and their derived aggregates.
pub trait ClaimStore: Send + Sync {
    /// Runs `work` atomically: its writes are committed when it returns `Ok`
    /// and discarded entirely when it returns `Err`.
    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>;

    fn query_claims(&self, query: &ClaimQuery) -> Result<ClaimPage, RepositoryError>;
    fn metrics(&self, bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError>;
    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError>;
    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError>;
    /// Empties claims, category stats, and provider stats in one step.
    fn reset(&self) -> Result<(), RepositoryError>;
    /// Like [`ClaimStore::reset`] but also recreates the underlying schema.
    fn drop_schema(&self) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored reasons are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored data is inconsistent: {0}")]
    Corrupt(String),
}

/// Normalized listing request: `page` is 1-based and `page_size` already
/// clamped by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub provider_type: Option<String>,
}

impl Default for ClaimQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            search: None,
            provider_type: None,
        }
    }
}

impl ClaimQuery {
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    /// In-process equivalent of the filter stores apply: case-insensitive
    /// substring search over descriptive fields plus provider-type equality.
    pub fn matches(&self, claim: &Claim) -> bool {
        let record = &claim.record;

        if let Some(wanted) = &self.provider_type {
            let matches_type = record
                .provider_type
                .as_deref()
                .map(|actual| actual.eq_ignore_ascii_case(wanted))
                .unwrap_or(false);
            if !matches_type {
                return false;
            }
        }

        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    Some(record.claim_id.as_str()),
                    record.patient_id.as_deref(),
                    record.provider_id.as_deref(),
                    record.procedure_code.as_deref(),
                    record.diagnosis.as_deref(),
                    record.treatment.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Listing order: score descending, then charge descending, then claim id.
pub fn listing_order(left: &Claim, right: &Claim) -> Ordering {
    right
        .fraud_score()
        .cmp(&left.fraud_score())
        .then_with(|| right.record.claim_charge.total_cmp(&left.record.claim_charge))
        .then_with(|| left.claim_id().cmp(right.claim_id()))
}

/// One page of scored claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPage {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub items: Vec<ClaimView>,
}

/// Dashboard representation of a scored claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub claim_id: String,
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
    pub provider_type: Option<String>,
    pub procedure_code: Option<String>,
    pub diagnosis: Option<String>,
    pub claim_charge: f64,
    pub score: u8,
    pub category: Option<&'static str>,
    pub reasons: Vec<String>,
    pub service_date: Option<String>,
}

impl From<&Claim> for ClaimView {
    fn from(claim: &Claim) -> Self {
        let record = &claim.record;
        Self {
            claim_id: record.claim_id.0.clone(),
            patient_id: record.patient_id.clone(),
            provider_id: record.provider_id.clone(),
            provider_type: record.provider_type.clone(),
            procedure_code: record.procedure_code.clone(),
            diagnosis: record.diagnosis.clone(),
            claim_charge: record.claim_charge,
            score: claim.fraud_score(),
            category: claim.fraud_band().map(|band| band.label()),
            reasons: claim.reasons().to_vec(),
            service_date: record.service_date.clone(),
        }
    }
}

//! Claim ingestion, baseline statistics, and explainable fraud scoring.

pub mod domain;
pub mod import;
pub mod metrics;
pub mod money;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod statistics;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    CategoryStatistic, Claim, ClaimId, ClaimScoreUpdate, FraudAssessment, FraudBand, NewClaim,
    ProviderStatistic,
};
pub use import::{ClaimImportError, ClaimImporter};
pub use metrics::{BandDistribution, ClaimMetrics, MetricsSummary, ScoreTally};
pub use pipeline::{IngestError, IngestSummary, IngestionPipeline};
pub use repository::{
    ClaimPage, ClaimQuery, ClaimStore, ClaimTransaction, ClaimView, RepositoryError,
};
pub use router::claims_router;
pub use scoring::{
    Baseline, BandThresholds, FraudScoringEngine, RuleSet, RuleSetVersion, ScoreInput,
    ScoreOutcome,
};
pub use service::{ClaimListParams, ClaimsService, ClaimsServiceError};
pub use store::{InMemoryClaimStore, SqliteClaimStore};

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::domain::{CategoryStatistic, NewClaim, ProviderStatistic};
use super::import::{ClaimImportError, ClaimImporter};
use super::metrics::ClaimMetrics;
use super::pipeline::{IngestError, IngestSummary, IngestionPipeline};
use super::repository::{ClaimPage, ClaimQuery, ClaimStore, RepositoryError};
use super::scoring::{FraudScoringEngine, RuleSet};
use crate::config::{ListingConfig, UploadConfig};

/// Raw listing parameters as they arrive on the query string. Values that do
/// not parse fall back to the configured defaults instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub q: Option<String>,
    pub provider_type: Option<String>,
}

/// Facade over the ingestion pipeline and the read side of a claim store.
pub struct ClaimsService<S> {
    store: Arc<S>,
    pipeline: IngestionPipeline<S>,
    listing: ListingConfig,
    upload: UploadConfig,
}

impl<S> ClaimsService<S>
where
    S: ClaimStore + 'static,
{
    pub fn new(store: Arc<S>, rules: RuleSet, listing: ListingConfig) -> Self {
        let pipeline = IngestionPipeline::new(Arc::clone(&store), FraudScoringEngine::new(rules));
        Self {
            store,
            pipeline,
            listing,
            upload: UploadConfig::default(),
        }
    }

    /// Replaces the default upload ceiling.
    pub fn with_upload_limits(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    pub fn upload_limits(&self) -> UploadConfig {
        self.upload
    }

    pub fn engine(&self) -> &FraudScoringEngine {
        self.pipeline.engine()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Parses a CSV upload completely before anything is written.
    pub fn ingest_reader<R: Read>(&self, reader: R) -> Result<IngestSummary, ClaimsServiceError> {
        let claims = ClaimImporter::from_reader(reader).map_err(|err| {
            tracing::warn!(error = %err, "rejected claims upload");
            err
        })?;
        tracing::info!(rows = claims.len(), "parsed claims upload");
        self.ingest_claims(&claims)
    }

    pub fn ingest_path<P: AsRef<Path>>(&self, path: P) -> Result<IngestSummary, ClaimsServiceError> {
        let path = path.as_ref();
        let claims = ClaimImporter::from_path(path)?;
        tracing::info!(rows = claims.len(), path = %path.display(), "parsed claims file");
        self.ingest_claims(&claims)
    }

    pub fn ingest_claims(&self, claims: &[NewClaim]) -> Result<IngestSummary, ClaimsServiceError> {
        Ok(self.pipeline.ingest(claims)?)
    }

    pub fn list(&self, params: &ClaimListParams) -> Result<ClaimPage, ClaimsServiceError> {
        let query = self.normalize_query(params);
        Ok(self.store.query_claims(&query)?)
    }

    pub fn metrics(&self) -> Result<ClaimMetrics, ClaimsServiceError> {
        Ok(self.store.metrics(&self.engine().rules().bands)?)
    }

    pub fn category_stats(&self) -> Result<Vec<CategoryStatistic>, ClaimsServiceError> {
        Ok(self.store.category_stats()?)
    }

    pub fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, ClaimsServiceError> {
        Ok(self.store.provider_stats()?)
    }

    pub fn reset(&self) -> Result<(), ClaimsServiceError> {
        self.store.reset()?;
        tracing::info!("claim data reset");
        Ok(())
    }

    pub fn drop_schema(&self) -> Result<(), ClaimsServiceError> {
        self.store.drop_schema()?;
        tracing::info!("claim schema dropped and recreated");
        Ok(())
    }

    fn normalize_query(&self, params: &ClaimListParams) -> ClaimQuery {
        let page = parse_number(params.page.as_deref())
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX)) as u32;
        let max = self.listing.max_page_size.max(1);
        let page_size = parse_number(params.page_size.as_deref())
            .unwrap_or(i64::from(self.listing.default_page_size))
            .clamp(1, i64::from(max)) as u32;

        ClaimQuery {
            page,
            page_size,
            search: non_blank(params.q.as_deref()),
            provider_type: non_blank(params.provider_type.as_deref()),
        }
    }
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|raw| raw.trim().parse::<i64>().ok())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Error raised by the claims service.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsServiceError {
    #[error(transparent)]
    Import(#[from] ClaimImportError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

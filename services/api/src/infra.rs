use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use fraud_lens::config::{AppConfig, StorageBackend, StorageConfig};
use fraud_lens::error::AppError;
use fraud_lens::workflows::claims::{
    BandThresholds, CategoryStatistic, ClaimMetrics, ClaimPage, ClaimQuery, ClaimStore,
    ClaimTransaction, ClaimsService, ClaimsServiceError, InMemoryClaimStore, ProviderStatistic,
    RepositoryError, SqliteClaimStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store selected at startup from `APP_STORAGE` or the CLI overrides.
pub(crate) enum ClaimStoreBackend {
    Memory(InMemoryClaimStore),
    Sqlite(SqliteClaimStore),
}

impl ClaimStoreBackend {
    pub(crate) fn open(config: &StorageConfig) -> Result<Self, AppError> {
        let store = match config.backend {
            StorageBackend::Memory => Self::Memory(InMemoryClaimStore::new()),
            StorageBackend::Sqlite => Self::Sqlite(
                SqliteClaimStore::open(&config.database_path).map_err(ClaimsServiceError::from)?,
            ),
        };
        Ok(store)
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }
}

impl ClaimStore for ClaimStoreBackend {
    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>,
    {
        match self {
            Self::Memory(store) => store.transaction(work),
            Self::Sqlite(store) => store.transaction(work),
        }
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<ClaimPage, RepositoryError> {
        match self {
            Self::Memory(store) => store.query_claims(query),
            Self::Sqlite(store) => store.query_claims(query),
        }
    }

    fn metrics(&self, bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError> {
        match self {
            Self::Memory(store) => store.metrics(bands),
            Self::Sqlite(store) => store.metrics(bands),
        }
    }

    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError> {
        match self {
            Self::Memory(store) => store.category_stats(),
            Self::Sqlite(store) => store.category_stats(),
        }
    }

    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError> {
        match self {
            Self::Memory(store) => store.provider_stats(),
            Self::Sqlite(store) => store.provider_stats(),
        }
    }

    fn reset(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.reset(),
            Self::Sqlite(store) => store.reset(),
        }
    }

    fn drop_schema(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.drop_schema(),
            Self::Sqlite(store) => store.drop_schema(),
        }
    }
}

pub(crate) fn claims_service(
    config: &AppConfig,
) -> Result<ClaimsService<ClaimStoreBackend>, AppError> {
    let store = ClaimStoreBackend::open(&config.storage)?;
    Ok(ClaimsService::new(
        Arc::new(store),
        config.scoring.ruleset.rule_set(),
        config.listing,
    )
    .with_upload_limits(config.upload))
}

/// Parses a dollar amount from the command line, accepting `$` and thousands
/// separators.
pub(crate) fn parse_dollars(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("'{raw}' is not a dollar amount"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dollars_accepts_formatted_amounts() {
        assert_eq!(parse_dollars("$1,250.50"), Ok(1250.5));
        assert_eq!(parse_dollars(" 80 "), Ok(80.0));
        assert!(parse_dollars("twelve").is_err());
        assert!(parse_dollars("inf").is_err());
    }

    #[test]
    fn memory_backend_serves_claims() {
        let store = ClaimStoreBackend::open(&StorageConfig {
            backend: StorageBackend::Memory,
            database_path: "unused.db".into(),
        })
        .expect("memory store opens");
        assert_eq!(store.describe(), "memory");
        let page = store
            .query_claims(&ClaimQuery::default())
            .expect("query succeeds");
        assert_eq!(page.total, 0);
    }

    #[test]
    fn sqlite_backend_creates_database_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("claims.db");
        let store = ClaimStoreBackend::open(&StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.clone(),
        })
        .expect("sqlite store opens");
        assert_eq!(store.describe(), "sqlite");
        assert!(path.exists());
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::config::ListingConfig;
use crate::workflows::claims::domain::{
    CategoryStatistic, ClaimScoreUpdate, NewClaim, ProviderStatistic,
};
use crate::workflows::claims::metrics::ClaimMetrics;
use crate::workflows::claims::repository::{
    ClaimPage, ClaimQuery, ClaimStore, ClaimTransaction, RepositoryError,
};
use crate::workflows::claims::scoring::{BandThresholds, RuleSet};
use crate::workflows::claims::{Claim, ClaimsService, InMemoryClaimStore};

pub(super) const BOUNDARY: &str = "claims-upload-boundary";

pub(super) fn claim(id: &str, category: Option<&str>, charge: f64) -> NewClaim {
    let mut claim = NewClaim::new(id, charge);
    claim.procedure_code = category.map(str::to_string);
    claim
}

pub(super) fn provider_claim(
    id: &str,
    category: &str,
    charge: f64,
    provider_id: &str,
    provider_type: Option<&str>,
) -> NewClaim {
    NewClaim::new(id, charge)
        .with_procedure_code(category)
        .with_provider(provider_id, provider_type)
}

/// Four claims in category "A": three at $100 and one at $300.
pub(super) fn skewed_category() -> Vec<NewClaim> {
    vec![
        claim("A-1", Some("A"), 100.0),
        claim("A-2", Some("A"), 100.0),
        claim("A-3", Some("A"), 100.0),
        claim("A-4", Some("A"), 300.0),
    ]
}

/// Nine routine lab claims and one outlier that lands in the High band.
pub(super) fn lab_batch() -> Vec<NewClaim> {
    let mut claims: Vec<NewClaim> = (1..=9)
        .map(|n| provider_claim(&format!("B-{n}"), "B", 100.0, "LAB-1", Some("Lab")))
        .collect();
    claims.push(provider_claim("B-10", "B", 1000.0, "LAB-2", Some("Lab")));
    claims
}

pub(super) fn memory_service() -> (ClaimsService<InMemoryClaimStore>, Arc<InMemoryClaimStore>) {
    let store = Arc::new(InMemoryClaimStore::new());
    let service = ClaimsService::new(store.clone(), RuleSet::canonical(), ListingConfig::default());
    (service, store)
}

pub(super) fn stored_claims<S: ClaimStore>(store: &S) -> Vec<Claim> {
    store
        .transaction(|tx| tx.claims())
        .expect("claims readable")
}

pub(super) fn find<'a>(claims: &'a [Claim], id: &str) -> &'a Claim {
    claims
        .iter()
        .find(|claim| claim.claim_id().as_str() == id)
        .unwrap_or_else(|| panic!("claim {id} stored"))
}

/// Delegates to an in-memory store but fails every `apply_scores` call, which
/// happens after claims and category stats were already written.
#[derive(Default)]
pub(super) struct FailOnScoringStore {
    pub(super) inner: InMemoryClaimStore,
}

struct FailingTransaction<'a> {
    inner: &'a mut dyn ClaimTransaction,
}

impl ClaimTransaction for FailingTransaction<'_> {
    fn insert_claims(&mut self, claims: &[NewClaim]) -> Result<usize, RepositoryError> {
        self.inner.insert_claims(claims)
    }

    fn claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        self.inner.claims()
    }

    fn replace_category_stats(
        &mut self,
        stats: &[CategoryStatistic],
    ) -> Result<(), RepositoryError> {
        self.inner.replace_category_stats(stats)
    }

    fn apply_scores(&mut self, _updates: &[ClaimScoreUpdate]) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn replace_provider_stats(
        &mut self,
        stats: &[ProviderStatistic],
    ) -> Result<(), RepositoryError> {
        self.inner.replace_provider_stats(stats)
    }

    fn count_claims(&self) -> Result<u64, RepositoryError> {
        self.inner.count_claims()
    }
}

impl ClaimStore for FailOnScoringStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>,
    {
        self.inner.transaction(|tx| {
            let mut failing = FailingTransaction { inner: tx };
            work(&mut failing)
        })
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<ClaimPage, RepositoryError> {
        self.inner.query_claims(query)
    }

    fn metrics(&self, bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError> {
        self.inner.metrics(bands)
    }

    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError> {
        self.inner.category_stats()
    }

    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError> {
        self.inner.provider_stats()
    }

    fn reset(&self) -> Result<(), RepositoryError> {
        self.inner.reset()
    }

    fn drop_schema(&self) -> Result<(), RepositoryError> {
        self.inner.drop_schema()
    }
}

pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl ClaimStore for UnavailableStore {
    fn transaction<T, F>(&self, _work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>,
    {
        Err(offline())
    }

    fn query_claims(&self, _query: &ClaimQuery) -> Result<ClaimPage, RepositoryError> {
        Err(offline())
    }

    fn metrics(&self, _bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError> {
        Err(offline())
    }

    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError> {
        Err(offline())
    }

    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError> {
        Err(offline())
    }

    fn reset(&self) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn drop_schema(&self) -> Result<(), RepositoryError> {
        Err(offline())
    }
}

pub(super) fn multipart_upload(field: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"claims.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::post("/api/claims/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

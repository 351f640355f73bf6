use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;

use crate::workflows::claims::domain::{
    CategoryStatistic, Claim, ClaimId, ClaimScoreUpdate, NewClaim, ProviderStatistic,
};
use crate::workflows::claims::metrics::{ClaimMetrics, ScoreTally};
use crate::workflows::claims::repository::{
    listing_order, ClaimPage, ClaimQuery, ClaimStore, ClaimTransaction, ClaimView,
    RepositoryError,
};
use crate::workflows::claims::scoring::BandThresholds;

#[derive(Debug, Clone, Default)]
struct StoreState {
    claims: Vec<Claim>,
    index: HashMap<ClaimId, usize>,
    category_stats: Vec<CategoryStatistic>,
    provider_stats: Vec<ProviderStatistic>,
    next_id: u64,
}

/// Process-local claim store. Transactions run against a shadow copy of the
/// state that replaces the live state only on success, so readers always see
/// either the previous or the next committed snapshot and are only blocked
/// for the swap itself.
#[derive(Debug, Default, Clone)]
pub struct InMemoryClaimStore {
    state: Arc<RwLock<StoreState>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, view: impl FnOnce(&StoreState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        view(&guard)
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut shadow = MemoryTransaction {
            state: self.read(StoreState::clone),
        };
        let tx: &mut dyn ClaimTransaction = &mut shadow;
        let value = work(tx)?;

        let mut live = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *live = shadow.state;
        Ok(value)
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<ClaimPage, RepositoryError> {
        Ok(self.read(|state| {
            let mut matching: Vec<&Claim> = state
                .claims
                .iter()
                .filter(|claim| query.matches(claim))
                .collect();
            matching.sort_by(|left, right| listing_order(left, right));

            let items = matching
                .iter()
                .skip(query.offset())
                .take(query.page_size as usize)
                .map(|claim| ClaimView::from(*claim))
                .collect();

            ClaimPage {
                page: query.page,
                page_size: query.page_size,
                total: matching.len() as u64,
                items,
            }
        }))
    }

    fn metrics(&self, bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError> {
        Ok(self.read(|state| ScoreTally::from_claims(&state.claims, bands).summarize()))
    }

    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError> {
        Ok(self.read(|state| state.category_stats.clone()))
    }

    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError> {
        Ok(self.read(|state| state.provider_stats.clone()))
    }

    fn reset(&self) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut live = self.state.write().unwrap_or_else(PoisonError::into_inner);
        live.claims.clear();
        live.index.clear();
        live.category_stats.clear();
        live.provider_stats.clear();
        Ok(())
    }

    fn drop_schema(&self) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut live = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *live = StoreState::default();
        Ok(())
    }
}

struct MemoryTransaction {
    state: StoreState,
}

impl ClaimTransaction for MemoryTransaction {
    fn insert_claims(&mut self, claims: &[NewClaim]) -> Result<usize, RepositoryError> {
        let state = &mut self.state;
        let created_at = Utc::now();
        let mut inserted = 0;

        for claim in claims {
            if state.index.contains_key(&claim.claim_id) {
                continue;
            }
            state.next_id += 1;
            state.index.insert(claim.claim_id.clone(), state.claims.len());
            state.claims.push(Claim {
                id: state.next_id,
                record: claim.clone(),
                created_at,
                assessment: None,
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    fn claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        Ok(self.state.claims.clone())
    }

    fn replace_category_stats(
        &mut self,
        stats: &[CategoryStatistic],
    ) -> Result<(), RepositoryError> {
        self.state.category_stats = stats.to_vec();
        Ok(())
    }

    fn apply_scores(&mut self, updates: &[ClaimScoreUpdate]) -> Result<(), RepositoryError> {
        for update in updates {
            let position = self.state.index.get(&update.claim_id).copied().ok_or_else(|| {
                RepositoryError::Corrupt(format!("claim {} is not stored", update.claim_id.0))
            })?;
            self.state.claims[position].assessment = Some(update.assessment.clone());
        }
        Ok(())
    }

    fn replace_provider_stats(
        &mut self,
        stats: &[ProviderStatistic],
    ) -> Result<(), RepositoryError> {
        self.state.provider_stats = stats.to_vec();
        Ok(())
    }

    fn count_claims(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.claims.len() as u64)
    }
}

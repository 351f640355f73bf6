use std::io::{Cursor, Write};
use std::sync::Arc;

use super::common::*;
use crate::config::ListingConfig;
use crate::workflows::claims::import::ClaimImportError;
use crate::workflows::claims::repository::ClaimStore;
use crate::workflows::claims::scoring::RuleSet;
use crate::workflows::claims::{ClaimListParams, ClaimsService, ClaimsServiceError};

fn params(page: Option<&str>, page_size: Option<&str>) -> ClaimListParams {
    ClaimListParams {
        page: page.map(str::to_string),
        page_size: page_size.map(str::to_string),
        ..ClaimListParams::default()
    }
}

#[test]
fn listing_params_are_clamped_to_configured_bounds() {
    let (service, _) = memory_service();
    service.ingest_claims(&lab_batch()).expect("ingest succeeds");

    let defaults = service.list(&ClaimListParams::default()).expect("list");
    assert_eq!((defaults.page, defaults.page_size), (1, 20));
    assert_eq!(defaults.total, 10);

    let oversized = service.list(&params(Some("0"), Some("500"))).expect("list");
    assert_eq!((oversized.page, oversized.page_size), (1, 100));

    let garbage = service.list(&params(Some("abc"), Some("-4"))).expect("list");
    assert_eq!((garbage.page, garbage.page_size), (1, 1));
    assert_eq!(garbage.items.len(), 1);
    assert_eq!(garbage.items[0].claim_id, "B-10");

    let unparsable_size = service.list(&params(Some("2"), Some("ten"))).expect("list");
    assert_eq!((unparsable_size.page, unparsable_size.page_size), (2, 20));
    assert!(unparsable_size.items.is_empty());
}

#[test]
fn listing_uses_custom_page_limits() {
    let store = Arc::new(crate::workflows::claims::InMemoryClaimStore::new());
    let listing = ListingConfig {
        default_page_size: 3,
        max_page_size: 5,
    };
    let service = ClaimsService::new(store, RuleSet::canonical(), listing);
    service.ingest_claims(&lab_batch()).expect("ingest succeeds");

    assert_eq!(service.list(&ClaimListParams::default()).expect("list").items.len(), 3);
    assert_eq!(service.list(&params(None, Some("50"))).expect("list").page_size, 5);
}

#[test]
fn blank_filters_are_ignored() {
    let (service, _) = memory_service();
    service.ingest_claims(&lab_batch()).expect("ingest succeeds");

    let page = service
        .list(&ClaimListParams {
            q: Some("   ".to_string()),
            provider_type: Some(String::new()),
            ..ClaimListParams::default()
        })
        .expect("list");
    assert_eq!(page.total, 10);

    let filtered = service
        .list(&ClaimListParams {
            q: Some(" lab-2 ".to_string()),
            provider_type: Some("lab".to_string()),
            ..ClaimListParams::default()
        })
        .expect("list");
    assert_eq!(filtered.total, 1);
}

#[test]
fn malformed_upload_is_rejected_before_any_write() {
    let (service, store) = memory_service();
    service.ingest_claims(&lab_batch()).expect("ingest succeeds");

    let ragged = "claim_id,claim_charge\nN-1,10\nN-2,20,extra\n";
    match service.ingest_reader(Cursor::new(ragged)) {
        Err(ClaimsServiceError::Import(ClaimImportError::Csv(_))) => {}
        other => panic!("expected csv error, got {other:?}"),
    }

    assert_eq!(stored_claims(store.as_ref()).len(), 10);
    assert!(stored_claims(store.as_ref())
        .iter()
        .all(|claim| !claim.claim_id().as_str().starts_with("N-")));
}

#[test]
fn ingest_path_reads_csv_files() {
    let (service, _) = memory_service();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "Claim ID,Treatment,Claim Charge").expect("write header");
    writeln!(file, "T-1,Physiotherapy,120").expect("write row");
    writeln!(file, "T-2,Physiotherapy,\"$1,080.00\"").expect("write row");

    let summary = service.ingest_path(file.path()).expect("ingest succeeds");
    assert_eq!((summary.inserted, summary.total), (2, 2));

    let stats = service.category_stats().expect("stats");
    assert_eq!(stats[0].category, "Physiotherapy");
    assert_eq!(stats[0].mean_charge, 600.0);
}

#[test]
fn storage_failures_surface_as_repository_errors() {
    let service = ClaimsService::new(
        Arc::new(UnavailableStore),
        RuleSet::canonical(),
        ListingConfig::default(),
    );

    assert!(matches!(
        service.list(&ClaimListParams::default()),
        Err(ClaimsServiceError::Repository(_))
    ));
    assert!(matches!(service.metrics(), Err(ClaimsServiceError::Repository(_))));
    assert!(matches!(
        service.ingest_claims(&lab_batch()),
        Err(ClaimsServiceError::Ingest(_))
    ));
    assert!(service.store().category_stats().is_err());
}

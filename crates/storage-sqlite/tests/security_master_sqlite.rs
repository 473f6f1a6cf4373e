//! End-to-end resolution against a real SQLite database.
//!
//! The oracle is scripted; everything below the service is the production
//! repository, schema and writer actor.

use async_trait::async_trait;
use secmaster_core::securities::{
    IdentifierType, ResolveOutcome, ResolveRequest, SecurityMasterService,
    SecurityMasterServiceTrait, SecurityRepositoryTrait,
};
use secmaster_openfigi::{FigiMatch, MappingJob, MappingResult, MappingService};
use secmaster_storage_sqlite::{create_pool, run_migrations, spawn_writer, SecurityRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const APPLE_FIGI: &str = "BBG000B9XRY4";

#[derive(Default)]
struct ScriptedMapper {
    responses: Mutex<HashMap<String, Vec<FigiMatch>>>,
    calls: Mutex<usize>,
}

impl ScriptedMapper {
    fn respond(&self, id_value: &str, candidates: Vec<FigiMatch>) {
        self.responses
            .lock()
            .unwrap()
            .insert(id_value.to_string(), candidates);
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MappingService for ScriptedMapper {
    async fn map_jobs(&self, jobs: Vec<MappingJob>) -> Vec<MappingResult> {
        *self.calls.lock().unwrap() += 1;
        let responses = self.responses.lock().unwrap();
        jobs.iter()
            .map(|job| match responses.get(&job.id_value) {
                Some(candidates) => MappingResult::Matched(candidates.clone()),
                None => MappingResult::NoMatch,
            })
            .collect()
    }

    async fn search(&self, _query: &str, _limit: usize) -> Vec<FigiMatch> {
        Vec::new()
    }
}

fn apple() -> FigiMatch {
    FigiMatch {
        figi: APPLE_FIGI.to_string(),
        name: Some("Apple Inc".to_string()),
        ticker: Some("AAPL".to_string()),
        exch_code: Some("US".to_string()),
        composite_figi: Some(APPLE_FIGI.to_string()),
        security_type: Some("Common Stock".to_string()),
        market_sector: Some("Equity".to_string()),
        currency: Some("USD".to_string()),
        ..Default::default()
    }
}

struct Harness {
    repository: Arc<SecurityRepository>,
    mapper: Arc<ScriptedMapper>,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("secmaster.db").to_string_lossy().to_string();

        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        Self {
            repository: Arc::new(SecurityRepository::new(Arc::clone(&pool), writer)),
            mapper: Arc::new(ScriptedMapper::default()),
            _dir: dir,
        }
    }

    fn service(&self) -> SecurityMasterService {
        SecurityMasterService::new(self.repository.clone(), self.mapper.clone())
    }
}

#[tokio::test]
async fn resolves_and_converges_across_identifier_types() {
    let harness = Harness::new();
    harness.mapper.respond("AAPL", vec![apple()]);
    harness.mapper.respond("US0378331005", vec![apple()]);
    let service = harness.service();

    let by_ticker = service
        .resolve(&ResolveRequest::new("ticker", "AAPL").with_exchange("US"), true)
        .await
        .unwrap()
        .unwrap();
    assert!(by_ticker.is_new);
    assert_eq!(by_ticker.figi.as_deref(), Some(APPLE_FIGI));

    let by_isin = service
        .resolve(&ResolveRequest::new("ID_ISIN", "US0378331005"), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_isin.security_id, by_ticker.security_id);
    assert!(!by_isin.is_new);
    assert_eq!(by_isin.ticker.as_deref(), Some("AAPL"));

    // Both identifiers are now local.
    let calls = harness.mapper.calls();
    service
        .resolve(&ResolveRequest::new("isin", "US0378331005"), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(harness.mapper.calls(), calls);

    let identifiers = service.list_identifiers(&by_ticker.security_id).unwrap();
    assert!(identifiers
        .iter()
        .any(|i| i.identifier_type == IdentifierType::Figi && i.is_primary));
    assert!(identifiers
        .iter()
        .any(|i| i.identifier_type == IdentifierType::Isin
            && i.identifier_value == "US0378331005"));
}

#[tokio::test]
async fn concurrent_first_resolutions_share_one_security() {
    let harness = Harness::new();
    harness.mapper.respond("AAPL", vec![apple()]);
    harness.mapper.respond("037833100", vec![apple()]);
    let first = harness.service();
    let second = harness.service();

    let ticker = ResolveRequest::new("ticker", "AAPL").with_exchange("US");
    let cusip = ResolveRequest::new("cusip", "037833100");
    let (a, b) = futures::join!(first.resolve(&ticker, true), second.resolve(&cusip, true));
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    assert_eq!(a.security_id, b.security_id);
    assert!(a.is_new ^ b.is_new, "exactly one call creates the security");

    let owner = harness
        .repository
        .find_by_canonical_key(APPLE_FIGI)
        .unwrap()
        .unwrap();
    assert_eq!(owner.id, a.security_id);
}

#[tokio::test]
async fn placeholder_is_enriched_once_the_oracle_knows_it() {
    let harness = Harness::new();
    let service = harness.service();

    let placeholder = service
        .resolve(
            &ResolveRequest::new("ticker", "AAPL")
                .with_exchange("US")
                .with_currency("CAD"),
            true,
        )
        .await
        .unwrap()
        .unwrap();
    assert!(placeholder.figi.is_none());
    assert_eq!(placeholder.currency, "CAD");
    assert_eq!(placeholder.name, "Unknown (TICKER: AAPL)");

    harness.mapper.respond("AAPL", vec![apple()]);
    assert!(service.enrich(&placeholder.security_id).await.unwrap());

    let security = service.get_security(&placeholder.security_id).unwrap();
    assert_eq!(security.figi.as_deref(), Some(APPLE_FIGI));
    assert!(security.is_verified);

    // Enriched and keyed, so the next call does not reach the oracle.
    let calls = harness.mapper.calls();
    assert!(!service.enrich(&placeholder.security_id).await.unwrap());
    assert_eq!(harness.mapper.calls(), calls);
}

#[tokio::test]
async fn batch_results_follow_input_order() {
    let harness = Harness::new();
    harness.mapper.respond("AAPL", vec![apple()]);
    let service = harness.service();
    let known = service
        .resolve(&ResolveRequest::new("ticker", "AAPL").with_exchange("US"), true)
        .await
        .unwrap()
        .unwrap();

    let outcomes = service
        .resolve_many(
            vec![
                ResolveRequest::new("ticker", "AAPL").with_exchange("US"),
                ResolveRequest::new("ric", "AAPL.O"),
                ResolveRequest::new("ticker", "NOPE"),
            ],
            false,
        )
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(
        matches!(&outcomes[0], ResolveOutcome::Resolved(r) if r.security_id == known.security_id)
    );
    assert!(matches!(&outcomes[1], ResolveOutcome::Failed { .. }));
    assert!(matches!(&outcomes[2], ResolveOutcome::NotFound));
}

#[tokio::test]
async fn deactivated_security_is_replaced_on_next_resolution() {
    let harness = Harness::new();
    harness.mapper.respond("AAPL", vec![apple()]);
    let service = harness.service();
    let request = ResolveRequest::new("ticker", "AAPL").with_exchange("US");

    let old = service.resolve(&request, true).await.unwrap().unwrap();
    service.deactivate(&old.security_id).await.unwrap();
    assert!(!service.get_security(&old.security_id).unwrap().is_active);

    let new = service.resolve(&request, true).await.unwrap().unwrap();
    assert_ne!(new.security_id, old.security_id);
    assert!(new.is_new);
    assert_eq!(new.figi.as_deref(), Some(APPLE_FIGI));
}

#[tokio::test]
async fn replacement_security_keeps_its_identifiers() {
    let harness = Harness::new();
    harness.mapper.respond("AAPL", vec![apple()]);
    let service = harness.service();
    let request = ResolveRequest::new("ticker", "AAPL").with_exchange("US");

    let old = service.resolve(&request, true).await.unwrap().unwrap();
    service.deactivate(&old.security_id).await.unwrap();
    let new = service.resolve(&request, true).await.unwrap().unwrap();

    let identifiers = service.list_identifiers(&new.security_id).unwrap();
    assert!(identifiers
        .iter()
        .any(|i| i.identifier_type == IdentifierType::Ticker && i.identifier_value == "AAPL"));

    // Found locally from now on.
    let calls = harness.mapper.calls();
    let again = service.resolve(&request, true).await.unwrap().unwrap();
    assert_eq!(again.security_id, new.security_id);
    assert!(!again.is_new);
    assert_eq!(harness.mapper.calls(), calls);
}

#[tokio::test]
async fn deactivated_placeholder_is_recreated_once() {
    let harness = Harness::new();
    let service = harness.service();
    let request = ResolveRequest::new("ticker", "ZZZZ99").with_exchange("US");

    let old = service.resolve(&request, true).await.unwrap().unwrap();
    service.deactivate(&old.security_id).await.unwrap();

    let first = service.resolve(&request, true).await.unwrap().unwrap();
    let second = service.resolve(&request, true).await.unwrap().unwrap();

    assert!(first.is_new);
    assert_ne!(first.security_id, old.security_id);
    assert_eq!(second.security_id, first.security_id);
    assert!(!second.is_new);
    assert_eq!(service.list_identifiers(&first.security_id).unwrap().len(), 1);
}

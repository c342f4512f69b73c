//! Integration tests for the ownership engines
//!
//! These tests run the sync engine, minter and batch runner against a sled
//! ledger and a scripted oracle.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use explorer_core::{
    epoch_key, epoch_reference, mint_seed, Clock, FixedClock, MintPosition, PeerSet, Token,
    TokenSchedule, TransitionKind,
};
use explorer_db::{LedgerStore, ScanScope, SledLedger};
use explorer_ipfs::{ContentOracle, MockOracle, OracleResult};
use explorer_sync::{
    BatchConfig, BatchRunner, OwnershipSync, StaticSupply, SyncContext, SyncOutcome, TokenMinter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Ledger in a fresh temporary directory
fn create_test_ledger() -> (TempDir, Arc<SledLedger>) {
    let dir = tempdir().unwrap();
    let ledger = Arc::new(SledLedger::open(dir.path()).unwrap());
    (dir, ledger)
}

/// Clock inside epoch 5
fn create_test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        epoch_reference() + ChronoDuration::weeks(4) + ChronoDuration::hours(3),
    ))
}

/// Oracle wrapper that records how many token lookups overlap
struct TrackingOracle {
    inner: MockOracle,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl TrackingOracle {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MockOracle::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl ContentOracle for TrackingOracle {
    async fn hash(&self, data: &[u8]) -> OracleResult<String> {
        self.inner.hash(data).await
    }

    async fn find_providers(&self, cid: &str) -> OracleResult<PeerSet> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.find_providers(cid).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============ Sync Engine Tests ============

#[tokio::test]
async fn test_end_to_end_first_observation() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(MockOracle::new());
    let clock = create_test_clock();

    ledger
        .insert_tokens(&[Token::minted("X", MintPosition::new(1, 1))])
        .await
        .unwrap();
    oracle.set_providers("X", ["peerA", "peerB"]).await;
    let epoch_cid = MockOracle::content_id(epoch_key("X", 5).as_bytes());
    oracle.set_providers(&epoch_cid, ["peerC"]).await;

    let ctx = SyncContext::new(ledger.clone(), oracle.clone()).with_clock(clock.clone());
    let sync = OwnershipSync::new(ctx);

    let outcome = sync.sync_token("X").await.unwrap();
    let SyncOutcome::Recorded { kind, transaction } = outcome else {
        panic!("expected a recorded transition");
    };
    assert_eq!(kind, TransitionKind::NewOwner);

    let owner = ledger.get_ownership("X").await.unwrap().unwrap();
    assert_eq!(owner.peer_set, PeerSet::from_peers(["peerA", "peerB"]));
    assert_eq!(owner.epoch, 5);
    assert_eq!(owner.quorum_set, PeerSet::from_peers(["peerC"]));
    assert_eq!(owner.timestamp, clock.now());

    let history = ledger.transactions_for_token("X").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], transaction);
    assert!(history[0].matches(&owner));
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(MockOracle::new());
    ledger
        .insert_tokens(&[Token::minted("X", MintPosition::new(1, 1))])
        .await
        .unwrap();
    oracle.set_providers("X", ["peerA", "peerB"]).await;

    let sync = OwnershipSync::new(
        SyncContext::new(ledger.clone(), oracle.clone()).with_clock(create_test_clock()),
    );

    assert!(sync.sync_token("X").await.unwrap().is_recorded());
    assert_eq!(sync.sync_token("X").await.unwrap(), SyncOutcome::Unchanged);

    oracle.set_providers("X", ["peerB", "peerA"]).await;
    assert_eq!(sync.sync_token("X").await.unwrap(), SyncOutcome::Unchanged);

    oracle.set_providers("X", ["peerA"]).await;
    assert!(sync.sync_token("X").await.unwrap().is_recorded());

    assert_eq!(ledger.transactions_for_token("X").await.unwrap().len(), 2);
    let owner = ledger.get_ownership("X").await.unwrap().unwrap();
    assert_eq!(owner.peer_set, PeerSet::from_peers(["peerA"]));
}

#[tokio::test]
async fn test_concurrent_syncs_of_one_token_record_once() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(TrackingOracle::new(Duration::from_millis(5)));
    ledger
        .insert_tokens(&[Token::minted("X", MintPosition::new(1, 1))])
        .await
        .unwrap();
    oracle.inner.set_providers("X", ["peerA"]).await;

    let sync = Arc::new(OwnershipSync::new(SyncContext::new(
        ledger.clone(),
        oracle.clone(),
    )));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let sync = sync.clone();
        tasks.push(tokio::spawn(async move { sync.sync_token("X").await }));
    }

    let mut recorded = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_recorded() {
            recorded += 1;
        }
    }

    assert_eq!(recorded, 1);
    assert_eq!(ledger.transactions_for_token("X").await.unwrap().len(), 1);
}

// ============ Minting Tests ============

#[tokio::test]
async fn test_minting_follows_schedule() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(MockOracle::new());
    let minter = TokenMinter::new(
        SyncContext::new(ledger.clone(), oracle),
        TokenSchedule::from_levels([(0, 2), (1, 3)]).unwrap(),
        Arc::new(StaticSupply(MintPosition::new(1, 2))),
    );

    let report = minter.mint_pending().await.unwrap();
    assert_eq!(report.minted, 4);

    let mut expected = Vec::new();
    for (level, number) in [(0, 1), (0, 2), (1, 1), (1, 2)] {
        let position = MintPosition::new(level, number);
        let token_id = MockOracle::content_id(mint_seed(position).as_bytes());
        let token = ledger.get_token(&token_id).await.unwrap().unwrap();
        assert_eq!(token.position(), position);
        expected.push(token_id);
    }
    expected.sort();

    assert_eq!(ledger.token_page(None, 10).await.unwrap(), expected);
    assert_eq!(
        ledger.latest_minted("RBT").await.unwrap(),
        Some(MintPosition::new(1, 2))
    );
}

#[tokio::test]
async fn test_mint_collision_inserts_nothing() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(MockOracle::new());

    // a token of another type already occupies the id of slot "0 2"
    let mut squatter = Token::minted(MockOracle::content_id(b"0 2"), MintPosition::new(9, 9));
    squatter.token_type = "OTHER".to_string();
    ledger.insert_tokens(&[squatter]).await.unwrap();

    let minter = TokenMinter::new(
        SyncContext::new(ledger.clone(), oracle),
        TokenSchedule::from_levels([(0, 2), (1, 3)]).unwrap(),
        Arc::new(StaticSupply(MintPosition::new(1, 1))),
    );

    assert!(minter.mint_pending().await.is_err());
    assert_eq!(ledger.stats().await.unwrap().tokens, 1);
    assert!(!ledger
        .token_exists(&MockOracle::content_id(b"0 1"))
        .await
        .unwrap());
}

// ============ Batch Runner Tests ============

#[tokio::test]
async fn test_admission_bound_is_respected() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(TrackingOracle::new(Duration::from_millis(10)));

    let tokens: Vec<Token> = (1..=40)
        .map(|n| Token::minted(format!("QmToken{:03}", n), MintPosition::new(1, n)))
        .collect();
    ledger.insert_tokens(&tokens).await.unwrap();
    for token in &tokens {
        oracle.inner.set_providers(&token.token_id, ["peerA"]).await;
    }

    let sync = Arc::new(OwnershipSync::new(SyncContext::new(
        ledger.clone(),
        oracle.clone(),
    )));
    let runner = BatchRunner::new(
        sync,
        BatchConfig {
            page_size: 16,
            concurrency: 4,
            scope: ScanScope::All,
        },
    );

    let stats = runner.run_cycle(None).await;

    assert_eq!(stats.processed, 40);
    assert_eq!(stats.recorded, 40);
    assert_eq!(stats.errored, 0);
    assert!(oracle.peak.load(Ordering::SeqCst) <= 4);
    assert!(oracle.peak.load(Ordering::SeqCst) >= 2);
    assert_eq!(ledger.ownership_count().await.unwrap(), 40);
}

#[tokio::test]
async fn test_cycle_survives_panicking_worker() {
    let (_dir, ledger) = create_test_ledger();
    let oracle = Arc::new(MockOracle::new());

    let tokens: Vec<Token> = (1..=12)
        .map(|n| Token::minted(format!("QmToken{:03}", n), MintPosition::new(1, n)))
        .collect();
    ledger.insert_tokens(&tokens).await.unwrap();
    for token in &tokens {
        oracle.set_providers(&token.token_id, ["peerA"]).await;
    }
    oracle.panic_on("QmToken004").await;
    oracle.panic_on("QmToken009").await;

    let sync = Arc::new(OwnershipSync::new(SyncContext::new(
        ledger.clone(),
        oracle.clone(),
    )));
    let runner = BatchRunner::new(
        sync,
        BatchConfig {
            page_size: 5,
            concurrency: 3,
            scope: ScanScope::All,
        },
    );

    let stats = runner.run_cycle(None).await;

    assert_eq!(stats.dispatched, 12);
    assert_eq!(stats.errored, 2);
    assert_eq!(stats.recorded, 10);
    assert_eq!(runner.available_permits(), 3);
    assert!(ledger.get_ownership("QmToken004").await.unwrap().is_none());
}

// Indexer tests - idempotent materialization and the async feed

use redpacket::indexer::{feed, PacketIndex};
use redpacket::ledger::{AccountId, LedgerConfig, ManualClock, PacketLedger};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn ledger() -> PacketLedger {
    PacketLedger::new(LedgerConfig::default()).with_seed(13)
}

// ============================================================================
// MATERIALIZATION
// ============================================================================

#[test]
fn test_index_mirrors_ledger_after_replay() {
    let ledger = ledger();
    let id = ledger
        .create(AccountId::from("alice"), "gongxi", 3, true, 300)
        .unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap(); // duplicate
    ledger.claim(id, AccountId::from("carol")).unwrap();

    let mut index = PacketIndex::new();
    index.apply_all(&ledger.events().entries());

    let live = ledger.get_packet(id).unwrap();
    let materialized = index.get(id).unwrap();
    assert_eq!(materialized.balance, live.balance);
    assert_eq!(materialized.claimed_count, live.claimed_count);
    assert_eq!(materialized.total_amount, live.total_amount);
    assert_eq!(materialized.claims.len(), 2);
    assert_eq!(materialized.duplicate_attempts, 1);
}

#[test]
fn test_at_least_once_delivery_converges() {
    let ledger = ledger();
    let id = ledger
        .create(AccountId::from("alice"), "hi", 2, true, 200)
        .unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();

    let events = ledger.events().entries();
    let mut index = PacketIndex::new();
    // Deliver everything three times over.
    for _ in 0..3 {
        index.apply_all(&events);
    }

    let packet = index.get(id).unwrap();
    assert_eq!(packet.balance, 100);
    assert_eq!(packet.claimed_count, 1);
    assert_eq!(packet.claims.len(), 1);
}

#[test]
fn test_standalone_claims_keyed_by_sequence() {
    let ledger = ledger();
    let id = ledger
        .create(AccountId::from("alice"), "hi", 2, true, 200)
        .unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();

    let mut index = PacketIndex::new();
    index.apply_all(&ledger.events().entries());

    // The claim rode in envelope 1 (sequence 0 was the create).
    let claim = index.claim(1).unwrap();
    assert_eq!(claim.claimer, AccountId::from("bob"));
    assert_eq!(claim.amount, 100);
    assert!(index.claim(0).is_none());
}

#[test]
fn test_withdrawn_packet_materializes_terminal() {
    let clock = Arc::new(ManualClock::new(500));
    let config = LedgerConfig::default().with_lock_window_secs(10);
    let ledger = PacketLedger::new(config).with_clock(clock.clone());
    let alice = AccountId::from("alice");
    let id = ledger.create(alice.clone(), "hi", 4, true, 400).unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();
    clock.advance(10);
    ledger.withdraw(id, alice).unwrap();

    let mut index = PacketIndex::new();
    index.apply_all(&ledger.events().entries());

    let packet = index.get(id).unwrap();
    assert!(packet.withdrawn);
    assert_eq!(packet.balance, 0);
    assert_eq!(packet.withdrawn_amount, 300);
}

// ============================================================================
// PAGINATION
// ============================================================================

#[test]
fn test_recent_pages_newest_first() {
    let clock = Arc::new(ManualClock::new(1_000));
    let ledger =
        PacketLedger::new(LedgerConfig::default()).with_clock(clock.clone());
    for _ in 0..150 {
        ledger
            .create(AccountId::from("alice"), "hi", 1, true, 10)
            .unwrap();
        clock.advance(1);
    }

    let mut index = PacketIndex::new();
    index.apply_all(&ledger.events().entries());

    let first = index.recent(0);
    let second = index.recent(1);
    assert_eq!(first.len(), 100);
    assert_eq!(second.len(), 50);
    // Newest creation times come first.
    assert!(first[0].creation_time > first[99].creation_time);
    assert!(first[99].creation_time > second[0].creation_time);
    assert!(index.recent(2).is_empty());
}

// ============================================================================
// ASYNC FEED
// ============================================================================

#[tokio::test]
async fn test_feed_applies_live_events() {
    let ledger = Arc::new(ledger());
    let index = Arc::new(Mutex::new(PacketIndex::new()));

    let rx = ledger.subscribe();
    let handle = tokio::spawn(feed(
        index.clone(),
        ledger.events().clone(),
        rx,
    ));

    let id = ledger
        .create(AccountId::from("alice"), "hi", 2, true, 200)
        .unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();
    ledger.claim(id, AccountId::from("carol")).unwrap();

    // Give the feed a moment to drain.
    tokio::time::sleep(Duration::from_millis(50)).await;

    {
        let index = index.lock().unwrap();
        let packet = index.get(id).unwrap();
        assert_eq!(packet.claimed_count, 2);
        assert_eq!(packet.balance, 0);
        assert!(packet.empty);
    }
    handle.abort();
}

#[tokio::test]
async fn test_late_subscriber_catches_up_from_log() {
    let ledger = Arc::new(ledger());
    let id = ledger
        .create(AccountId::from("alice"), "hi", 2, true, 200)
        .unwrap();
    ledger.claim(id, AccountId::from("bob")).unwrap();

    // Subscribe after the fact: the live channel has nothing for us, so
    // bootstrap from the retained log, then keep following.
    let mut index = PacketIndex::new();
    index.apply_all(&ledger.events().since(0));

    ledger.claim(id, AccountId::from("carol")).unwrap();
    index.apply_all(&ledger.events().since(0));

    let packet = index.get(id).unwrap();
    assert_eq!(packet.claimed_count, 2);
    assert_eq!(packet.balance, 0);
}

//! Surplus pool ledger, counter allocation and direct registration tests
//!
//! These tests need a PostgreSQL instance: either set TEST_DATABASE_URL or
//! have Docker available for testcontainers, then run with
//! `cargo test -- --include-ignored`.

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;
use std::collections::HashSet;

use helpers::{unique_email, TestDatabase};
use QueueBuddy::config::Settings;
use QueueBuddy::database::repositories::counter;
use QueueBuddy::QueueBuddyError;
use QueueBuddy::ServiceFactory;

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn empty_ledger_balances_to_zero() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    assert_eq!(services.pool.balance(event.id).await?.pool, 0);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn pool_balance_never_goes_negative() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    services.pool.donate(event.id, 3).await?;
    let after = services.pool.allocate(event.id, 2, &unique_email(), None).await?;
    assert_eq!(after.pool, 1);

    // Over-allocation is rejected and the ledger is untouched.
    let err = services
        .pool
        .allocate(event.id, 2, &unique_email(), None)
        .await
        .unwrap_err();
    assert_matches!(err, QueueBuddyError::PoolInsufficient { requested: 2, available: 1 });
    assert_eq!(services.pool.balance(event.id).await?.pool, 1);
    assert_eq!(db.count_records("surplus_ledger").await?, 2);

    // Zero and negative amounts never reach the ledger.
    let err = services.pool.donate(event.id, 0).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::InvalidInput(_));
    let err = services.pool.allocate(event.id, -1, &unique_email(), None).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::InvalidInput(_));

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn diagnostics_reports_recent_entries_newest_first() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    for _ in 0..7 {
        services.pool.donate(event.id, 1).await?;
    }
    services.pool.allocate(event.id, 2, &unique_email(), None).await?;

    let diag = services.pool.diagnostics(event.id).await?;
    assert_eq!(diag.pool, 5);
    assert_eq!(diag.last.len(), 5);
    assert_eq!(diag.last[0].amount, 2);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn concurrent_reservations_get_disjoint_order_blocks() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;

    let mut handles = Vec::new();
    for i in 0..8i32 {
        let pool = db.pool.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            let mut tx = pool.begin().await?;
            let block = counter::reserve_block(&mut tx, event_id, (i % 3) + 1).await?;
            tx.commit().await?;
            Ok::<_, anyhow::Error>(block)
        }));
    }

    let mut seen = HashSet::new();
    let mut reserved = 0i32;
    for handle in handles {
        let block = handle.await??;
        reserved += block.len();
        for order in block.start..=block.end {
            // A repeated order number means two blocks overlapped.
            assert!(seen.insert(order), "order {} handed out twice", order);
        }
    }

    // Blocks partition 1..next_order with no gaps.
    let services = db.services();
    let next = services.counters.peek(event.id).await?.unwrap();
    assert_eq!(next, 1 + reserved);
    assert_eq!(seen, (1..next).collect::<HashSet<i32>>());

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn reserving_against_unseeded_counter_fails() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let mut tx = db.pool.begin().await?;
    let err = counter::reserve_block(&mut tx, 424242, 1).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::CounterNotSeeded { event_id: 424242 });

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn direct_registration_issues_full_quota_once() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 4).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let outcome = services.register.register(event.id, &master.email, None).await?;
    assert_eq!(outcome.tickets.len(), 4);
    assert_eq!(outcome.allocated_range, Some((1, 4)));
    assert_eq!(outcome.remaining, 0);
    assert_eq!(outcome.tickets[0].code, "AH-001");

    // Re-registering is a re-print, not an error and not more tickets.
    let again = services.register.register(event.id, &master.email, None).await?;
    assert_eq!(again.allocated_range, None);
    assert_eq!(again.tickets.len(), 4);
    assert_eq!(db.count_records("tickets").await?, 4);

    let err = services
        .register
        .register(event.id, &unique_email(), None)
        .await
        .unwrap_err();
    assert_matches!(err, QueueBuddyError::MasterNotFound { .. });

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn concurrent_registrations_never_exceed_quota() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 5).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let a = {
        let register = services.register.clone();
        let email = master.email.clone();
        let event_id = event.id;
        tokio::spawn(async move { register.register(event_id, &email, None).await })
    };
    let b = {
        let register = services.register.clone();
        let email = master.email.clone();
        let event_id = event.id;
        tokio::spawn(async move { register.register(event_id, &email, None).await })
    };

    let a = a.await??;
    let b = b.await??;

    // One call issues, the loser of the event lock sees a spent quota and
    // re-prints; the email never holds more than its quota.
    assert_eq!(db.count_records("tickets").await?, 5);
    assert_eq!(a.tickets.len(), 5);
    assert_eq!(b.tickets.len(), 5);
    assert!(a.allocated_range.is_some() != b.allocated_range.is_some());

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn events_sharing_a_prefix_issue_codes_independently() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let first = db.create_event("Homecoming Day 1", "AH").await?;
    let second = db.create_event("Homecoming Day 2", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 2).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let one = services.register.register(first.id, &master.email, None).await?;
    let two = services.register.register(second.id, &master.email, None).await?;

    // Same code in both events; neither insert is swallowed.
    assert_eq!(one.tickets[0].code, "AH-001");
    assert_eq!(two.tickets[0].code, "AH-001");
    assert_eq!(one.tickets.len(), 2);
    assert_eq!(two.tickets.len(), 2);
    assert_eq!(db.count_records("tickets").await?, 4);

    Ok(())
}

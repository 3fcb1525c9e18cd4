//! Registration intake and confirmation integration tests
//!
//! These tests need a PostgreSQL instance: either set TEST_DATABASE_URL or
//! have Docker available for testcontainers, then run with
//! `cargo test -- --include-ignored`.

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;

use helpers::{request_input, unique_email, TestDatabase};
use QueueBuddy::config::Settings;
use QueueBuddy::models::request::{RequestSource, RequestStatus};
use QueueBuddy::QueueBuddyError;
use QueueBuddy::ServiceFactory;

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn duplicate_submission_returns_existing_pending_request() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let email = unique_email();
    let first = services
        .intake
        .create_request(request_input(event.id, &email, None))
        .await?;
    assert!(!first.dedup);
    assert_eq!(first.request.request.source, RequestSource::Walkin);

    // Case and whitespace in the email still hit the same pending row.
    let second = services
        .intake
        .create_request(request_input(event.id, &format!("  {}  ", email.to_uppercase()), None))
        .await?;
    assert!(second.dedup);
    assert_eq!(second.request.request.id, first.request.request.id);

    assert_eq!(db.count_records("registration_requests").await?, 1);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn concurrent_submissions_insert_exactly_one_pending_row() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let email = unique_email();
    let a = {
        let intake = services.intake.clone();
        let input = request_input(event.id, &email, None);
        tokio::spawn(async move { intake.create_request(input).await })
    };
    let b = {
        let intake = services.intake.clone();
        let input = request_input(event.id, &email, None);
        tokio::spawn(async move { intake.create_request(input).await })
    };

    let a = a.await??;
    let b = b.await??;

    // Whichever interleaving happened, one row exists and both callers see it.
    assert_eq!(db.count_records("registration_requests").await?, 1);
    assert_eq!(a.request.request.id, b.request.request.id);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn master_confirm_issues_tickets_and_donates_leftover() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 5).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let intake = services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;
    assert_eq!(intake.request.request.source, RequestSource::Master);
    assert_eq!(intake.request.quota_remaining, 5);

    let outcome = services.intake.confirm(intake.request.request.id, 3).await?;
    assert_eq!(outcome.tickets.len(), 3);
    assert_eq!(outcome.donated, 2);
    assert_eq!(outcome.allocated, 0);
    assert_eq!(outcome.pool_after, 2);

    let codes: Vec<&str> = outcome.tickets.iter().map(|t| t.code.as_str()).collect();
    assert_eq!(codes, vec!["AH-001", "AH-002", "AH-003"]);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn confirm_is_idempotent_per_request() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 5).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());
    let intake = services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;

    services.intake.confirm(intake.request.request.id, 3).await?;

    let err = services.intake.confirm(intake.request.request.id, 2).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::AlreadyProcessed { .. });

    // The retry wrote nothing.
    assert_eq!(db.count_records("tickets").await?, 3);
    assert_eq!(db.count_records("surplus_ledger").await?, 1);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn master_confirm_with_zero_donates_everything() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 4).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());
    let intake = services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;

    let outcome = services.intake.confirm(intake.request.request.id, 0).await?;
    assert_eq!(outcome.tickets.len(), 0);
    assert_eq!(outcome.donated, 4);
    assert_eq!(outcome.pool_after, 4);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn master_confirm_rejects_over_request_and_exhausted_quota() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 2).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let intake = services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;
    let err = services.intake.confirm(intake.request.request.id, 3).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::OverRequest { requested: 3, remaining: 2 });

    // Use the whole quota, then a fresh request finds nothing left.
    services.intake.confirm(intake.request.request.id, 2).await?;
    let retry = services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;
    let err = services.intake.confirm(retry.request.request.id, 1).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::QuotaExhausted { quota: 2, issued: 2 });

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn walkin_confirm_draws_from_pool_or_fails_whole() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    // Pool starts with a single donated seat.
    services.pool.donate(event.id, 1).await?;

    let walkin = services
        .intake
        .create_request(request_input(event.id, &unique_email(), None))
        .await?;
    assert_eq!(walkin.request.request.source, RequestSource::Walkin);

    // Asking for two against a pool of one fails and writes nothing.
    let err = services.intake.confirm(walkin.request.request.id, 2).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::PoolInsufficient { requested: 2, available: 1 });
    assert_eq!(db.count_records("tickets").await?, 0);
    assert_eq!(services.pool.balance(event.id).await?.pool, 1);

    // The request is still PENDING, so a corrected confirm succeeds.
    let outcome = services.intake.confirm(walkin.request.request.id, 1).await?;
    assert_eq!(outcome.allocated, 1);
    assert_eq!(outcome.tickets.len(), 1);
    assert_eq!(outcome.pool_after, 0);

    // Zero seats makes no sense for a walk-in.
    let other = services
        .intake
        .create_request(request_input(event.id, &unique_email(), None))
        .await?;
    let err = services.intake.confirm(other.request.request.id, 0).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::InvalidInput(_));

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn cancel_closes_request_and_blocks_confirm() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());

    let intake = services
        .intake
        .create_request(request_input(event.id, &unique_email(), None))
        .await?;

    let cancelled = services.intake.cancel(intake.request.request.id).await?;
    assert_eq!(cancelled.request.status, RequestStatus::Cancelled);

    let err = services.intake.confirm(intake.request.request.id, 1).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::AlreadyProcessed { .. });
    let err = services.intake.cancel(intake.request.request.id).await.unwrap_err();
    assert_matches!(err, QueueBuddyError::AlreadyProcessed { .. });

    // A cancelled row no longer blocks re-submission.
    let retry = services
        .intake
        .create_request(request_input(event.id, &intake.request.request.email, None))
        .await?;
    assert!(!retry.dedup);

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL or Docker)"]
async fn pending_queue_and_registrant_listing() -> anyhow::Result<()> {
    let db = TestDatabase::new().await?;
    db.cleanup().await?;

    let event = db.create_event("Homecoming", "AH").await?;
    let master = db.create_master(&unique_email(), "Ana", 3).await?;

    let services = ServiceFactory::new(db.pool.clone(), &Settings::default());
    services
        .intake
        .create_request(request_input(event.id, &master.email, None))
        .await?;
    let walkin = services
        .intake
        .create_request(request_input(event.id, &unique_email(), None))
        .await?;
    services.intake.cancel(walkin.request.request.id).await?;

    let pending = services.intake.list_pending(event.id).await?;
    assert_eq!(pending.pending.len(), 1);
    assert_eq!(pending.pending[0].request.email, master.email);

    use QueueBuddy::database::repositories::request::RegistrantFilter;
    let page = services
        .intake
        .list_registrants(
            event.id,
            RegistrantFilter {
                status: Some(RequestStatus::Cancelled),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].request.id, walkin.request.request.id);

    let all = services
        .intake
        .list_registrants(event.id, RegistrantFilter::default())
        .await?;
    assert_eq!(all.total, 2);

    Ok(())
}

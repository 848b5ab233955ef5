mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::*;
use courier::api::{BookingAPI, CatalogAPI, CommitRequest, CreditAPI, DetailsRequest, QuoteAPI};
use courier::bookings::MemoryBookingStore;
use courier::entities::{
    BookingStatus, CreditAccountStatus, Payer, PaymentReference, PaymentStatus, Stage,
};
use courier::external::payment::PaymentOutcome;
use courier::ledger::{CreditLedger, MemoryLedger};

fn commit(token: uuid::Uuid) -> CommitRequest {
    CommitRequest {
        idempotency_token: token,
        accepted_total: None,
    }
}

#[tokio::test]
async fn credit_booking_is_paid_only_after_the_debit() {
    let ledger = Arc::new(MemoryLedger::new());
    let store = Arc::new(AuditingStore::new(ledger.clone()));
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        ledger.clone(),
        store.clone(),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(100), CreditAccountStatus::Approved)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;

    let commitment = engine
        .commit_quote(
            id,
            CommitRequest {
                idempotency_token: token,
                accepted_total: Some(dec!(45.00)),
            },
        )
        .await
        .unwrap();

    let booking = commitment.booking;
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.total_price, dec!(45.00));
    assert!(booking.breakdown.admin_fee_waived);
    assert!(booking.reference.starts_with("CX-"));
    assert!(commitment.redirect_url.is_none());

    assert!(store.violations.lock().unwrap().is_empty());
    assert_eq!(engine.find_booking(booking.id).await.unwrap(), booking);
    assert_eq!(
        engine.find_credit_account(account.id).await.unwrap().balance,
        dec!(45.00)
    );
    assert_eq!(engine.find_quote(id).await.unwrap().stage, Stage::Committed);
}

#[tokio::test]
async fn insufficient_credit_creates_no_booking() {
    let ledger = Arc::new(MemoryLedger::new());
    let bookings = Arc::new(MemoryBookingStore::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        ledger.clone(),
        bookings.clone(),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(40), CreditAccountStatus::Approved)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;

    let err = engine.commit_quote(id, commit(token)).await.unwrap_err();
    assert!(err.is_insufficient_credit_error());
    assert!(err.is_user_facing());
    assert!(bookings.is_empty());
    assert_eq!(ledger.find_account(account.id).await.unwrap().balance, Decimal::ZERO);

    // switching to card changes the price, so the first retry is refused
    let session = engine
        .submit_details(
            id,
            DetailsRequest {
                payer: Some(Payer::Card),
                ..details()
            },
        )
        .await
        .unwrap();
    assert_eq!(session.stage, Stage::DetailsEntered);

    let err = engine.commit_quote(id, commit(token)).await.unwrap_err();
    assert!(err.is_price_changed_error());

    let commitment = engine.commit_quote(id, commit(token)).await.unwrap();
    assert_eq!(commitment.booking.total_price, dec!(60.00));
    assert_eq!(commitment.booking.payment_status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn unapproved_account_cannot_draw() {
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryBookingStore::new()),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(500), CreditAccountStatus::Pending)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;

    let err = engine.commit_quote(id, commit(token)).await.unwrap_err();
    assert!(err.is_account_not_approved_error());
}

#[tokio::test]
async fn ledger_outage_fails_the_commit() {
    let bookings = Arc::new(MemoryBookingStore::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(UnreachableLedger),
        bookings.clone(),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: uuid::Uuid::new_v4(),
        },
    )
    .await;

    let err = engine.commit_quote(id, commit(token)).await.unwrap_err();
    assert!(err.is_ledger_unavailable_error());
    assert!(!err.is_user_facing());
    assert!(bookings.is_empty());
    assert_eq!(engine.find_quote(id).await.unwrap().stage, Stage::DetailsEntered);
}

#[tokio::test]
async fn lost_booking_after_debit_is_reported_not_retried() {
    let ledger = Arc::new(MemoryLedger::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        ledger.clone(),
        Arc::new(BrokenStore),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(100), CreditAccountStatus::Approved)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;

    for _ in 0..2 {
        let err = engine.commit_quote(id, commit(token)).await.unwrap_err();
        assert!(err.is_commit_inconsistency_error());
    }
    assert_eq!(ledger.entries(account.id).await.unwrap().len(), 1);
    assert_eq!(ledger.find_account(account.id).await.unwrap().balance, dec!(45.00));
}

#[tokio::test]
async fn card_booking_waits_for_gateway_confirmation() {
    let gateway = Arc::new(ScriptedGateway::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryBookingStore::new()),
        gateway.clone(),
        settings(),
    );

    let (id, token) = ready_to_commit(&engine, Payer::Card).await;
    let commitment = engine.commit_quote(id, commit(token)).await.unwrap();

    let booking = commitment.booking;
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_price, dec!(60.00));
    assert_eq!(
        commitment.redirect_url,
        Some(format!("https://pay.test/c/{}", booking.reference))
    );

    let unchanged = engine.confirm_payment(booking.id).await.unwrap();
    assert_eq!(unchanged.payment_status, PaymentStatus::Unpaid);

    gateway.settle(PaymentOutcome::Paid);
    let paid = engine.confirm_payment(booking.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, BookingStatus::Confirmed);
    assert!(matches!(
        paid.payment_reference,
        Some(PaymentReference::GatewayCapture { .. })
    ));
    assert_eq!(engine.find_booking(booking.id).await.unwrap(), paid);
}

#[tokio::test]
async fn concurrent_confirmations_notify_once() {
    let gateway = Arc::new(ScriptedGateway::new());
    let notifier = Arc::new(CountingNotifier::default());
    let engine = engine_with_notifier(
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryBookingStore::new()),
        gateway.clone(),
        notifier.clone(),
    );

    let (id, token) = ready_to_commit(&engine, Payer::Card).await;
    let booking = engine.commit_quote(id, commit(token)).await.unwrap().booking;

    gateway.settle(PaymentOutcome::Paid);
    let (first, second) = tokio::join!(
        engine.confirm_payment(booking.id),
        engine.confirm_payment(booking.id)
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(first.is_paid() && second.is_paid());
    assert_eq!(first.payment_reference, second.payment_reference);

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(notifier.sent(), 1);
}

#[tokio::test]
async fn gateway_outage_is_not_retried() {
    let gateway = Arc::new(ScriptedGateway::down());
    let bookings = Arc::new(MemoryBookingStore::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(MemoryLedger::new()),
        bookings.clone(),
        gateway.clone(),
        settings(),
    );

    let (id, token) = ready_to_commit(&engine, Payer::Card).await;
    let err = engine.commit_quote(id, commit(token)).await.unwrap_err();

    assert!(err.is_payment_gateway_unavailable_error());
    assert_eq!(gateway.checkouts.load(Ordering::SeqCst), 0);
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn repeated_commit_returns_the_same_booking() {
    let ledger = Arc::new(MemoryLedger::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        ledger.clone(),
        Arc::new(MemoryBookingStore::new()),
        gateway.clone(),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(100), CreditAccountStatus::Approved)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;

    let first = engine.commit_quote(id, commit(token)).await.unwrap();
    let second = engine.commit_quote(id, commit(token)).await.unwrap();

    assert_eq!(first.booking.id, second.booking.id);
    assert_eq!(ledger.entries(account.id).await.unwrap().len(), 1);

    let err = engine
        .commit_quote(id, commit(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_invalid_state_error());
}

#[tokio::test]
async fn catalog_change_before_commit_is_a_price_change() {
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryBookingStore::new()),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let (id, token) = ready_to_commit(&engine, Payer::Card).await;

    let mut catalog = engine.list_catalog().await.unwrap();
    catalog.vehicles[0].base_rate = dec!(2.00);
    engine.replace_catalog(catalog).await.unwrap();

    let err = engine
        .commit_quote(
            id,
            CommitRequest {
                idempotency_token: token,
                accepted_total: Some(dec!(60.00)),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_price_changed_error());

    // 20 mi x 2.00 x 1.5 = 60.00, plus the 15.00 admin fee
    let session = engine.find_quote(id).await.unwrap();
    assert_eq!(session.quotation.unwrap().total(), dec!(75.00));

    let commitment = engine
        .commit_quote(
            id,
            CommitRequest {
                idempotency_token: token,
                accepted_total: Some(dec!(75.00)),
            },
        )
        .await
        .unwrap();
    assert_eq!(commitment.booking.total_price, dec!(75.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_overdraw_an_account() {
    let ledger = Arc::new(MemoryLedger::new());
    let engine = Arc::new(engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        ledger.clone(),
        Arc::new(MemoryBookingStore::new()),
        Arc::new(ScriptedGateway::new()),
        settings(),
    ));

    let account = engine
        .open_credit_account(dec!(100), CreditAccountStatus::Approved)
        .await
        .unwrap();

    let mut sessions = vec![];
    for _ in 0..10 {
        sessions.push(
            ready_to_commit(
                &engine,
                Payer::Credit {
                    account_id: account.id,
                },
            )
            .await,
        );
    }

    let results = join_all(sessions.into_iter().map(|(id, token)| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.commit_quote(id, commit(token)).await })
    }))
    .await;

    let committed = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    // two bookings of 45.00 fit under a 100.00 limit
    assert_eq!(committed, 2);
    assert_eq!(ledger.find_account(account.id).await.unwrap().balance, dec!(90.00));
    assert_eq!(ledger.entries(account.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn refunds_restore_available_credit() {
    let engine = engine(
        Arc::new(ScriptedDistance::answering(dec!(20))),
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryBookingStore::new()),
        Arc::new(ScriptedGateway::new()),
        settings(),
    );

    let account = engine
        .open_credit_account(dec!(100), CreditAccountStatus::Approved)
        .await
        .unwrap();
    let (id, token) = ready_to_commit(
        &engine,
        Payer::Credit {
            account_id: account.id,
        },
    )
    .await;
    engine.commit_quote(id, commit(token)).await.unwrap();

    let account = engine.refund_credit(account.id, dec!(45.00)).await.unwrap();
    assert_eq!(account.balance, Decimal::ZERO);

    let err = engine.refund_credit(account.id, dec!(1)).await.unwrap_err();
    assert!(err.is_invalid_input_error());
}

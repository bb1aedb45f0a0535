use saga_bridge::payment::{CreditCardDetailsUpdated, PaymentCreated, PaymentEvent, PaymentReceived};
use saga_bridge::{Association, Inbound, SagaError, SagaStatus};

use crate::support::{Harness, Started};

fn received(started: &Started, h: &Harness) -> PaymentReceived {
    let saga = h.saga(&started.saga_id);
    PaymentReceived {
        payment_id: saga.state().payment_id().clone(),
        account_id: saga.state().account_id().clone(),
        amount: saga.state().payment_amount(),
    }
}

#[test]
fn terminal_saga_rejects_further_messages() {
    let h = Harness::new();
    let started = h.start("kermit", "P1", 100.0);
    h.event(received(&started, &h)).unwrap();

    let err = h
        .event(CreditCardDetailsUpdated {
            account_id: "kermit".into(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SagaError::NotRunning {
            status: SagaStatus::Terminal,
            ..
        }
    ));
    assert_eq!(err.status_code(), 409);

    let err = h.query(&started, "exec-1", "DocumentAccountSummary").unwrap_err();
    assert!(matches!(err, SagaError::NotRunning { .. }));

    let saga = h.saga(&started.saga_id);
    assert_eq!(saga.state().payment_amount(), 100.0);
    assert_eq!(saga.state().account_id().as_str(), "kermit");
    assert_eq!(saga.state().payment_id().to_string(), "P1");
    assert!(saga.state().credit_card_expired());
    assert!(h.bus.is_empty());
}

#[test]
fn terminal_event_by_workflow_instance() {
    let h = Harness::new();
    let started = h.start("kermit", "P1", 100.0);

    let key = Association::workflow_instance(started.workflow_instance_id.clone());
    h.manager
        .dispatch_to(&key, Inbound::Event(received(&started, &h).into()))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(h.saga(&started.saga_id).status(), SagaStatus::Terminal);
}

#[test]
fn new_payment_after_terminal_starts_new_saga() {
    let h = Harness::new();
    let first = h.start("kermit", "P1", 100.0);
    h.event(received(&first, &h)).unwrap();

    let second = h.start("kermit", "P2", 30.0);

    assert_ne!(first.saga_id, second.saga_id);
    assert_eq!(h.engine.started().len(), 2);
    assert_eq!(
        h.manager.find(&Association::new("accountId", "kermit")),
        Some(second.saga_id.clone())
    );
    // The ended saga is still reachable by its workflow instance.
    assert_eq!(
        h.manager
            .find(&Association::workflow_instance(first.workflow_instance_id.clone())),
        Some(first.saga_id.clone())
    );
}

#[test]
fn discard_terminal_releases_routes() {
    let h = Harness::new();
    let ended = h.start("kermit", "P1", 100.0);
    let running = h.start("piggy", "P2", 50.0);
    h.event(received(&ended, &h)).unwrap();

    assert_eq!(h.manager.discard_terminal().unwrap(), 1);

    assert_eq!(h.manager.saga_ids(), vec![running.saga_id.clone()]);
    assert_eq!(
        h.manager
            .find(&Association::workflow_instance(ended.workflow_instance_id.clone())),
        None
    );
    assert!(matches!(
        h.manager.inspect(&ended.saga_id),
        Err(SagaError::UnknownSaga(_))
    ));
}

#[test]
fn shutdown_reports_processed_messages() {
    let h = Harness::new();
    let started = h.start("kermit", "P1", 100.0);
    h.event(CreditCardDetailsUpdated {
        account_id: "kermit".into(),
    })
    .unwrap();
    assert!(h.command(&started, "exec-1", "Unknown").is_err());

    let created: PaymentEvent = PaymentCreated {
        account_id: "piggy".into(),
        payment_id: "P2".into(),
        amount: 5.0,
    }
    .into();
    h.event(created).unwrap();

    let stats = h.manager.shutdown();
    assert_eq!(stats.handled, 3);
    assert_eq!(stats.failed, 1);
}

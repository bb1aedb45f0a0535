use saga_bridge::payment::{
    PaymentFullyCoveredByAccount, PaymentPartlyCoveredByAccount, PaymentReceived, WithdrawAmount,
};
use saga_bridge::{MessageKind, SagaStatus, SAGA_ID_METADATA};

use crate::support::{resumed_with, Harness};

#[test]
fn partly_covered_payment() {
    let h = Harness::new();
    h.set_balance("kermit", 40.0);

    let started = h.start("kermit", "P1", 100.0);
    let saga = h.saga(&started.saga_id);
    assert_eq!(saga.status(), SagaStatus::Running);
    assert!(saga.state().credit_card_expired());

    h.query(&started, "exec-1", "DocumentAccountSummary").unwrap();
    let saga = h.saga(&started.saga_id);
    assert_eq!(saga.state().amount_withdrawn(), 40.0);
    assert!(resumed_with(&h.signal("exec-1"), true, false));

    h.command(&started, "exec-2", "WithdrawAmount").unwrap();
    assert_eq!(
        h.bus.last::<WithdrawAmount>().unwrap().amount,
        40.0
    );
    assert!(resumed_with(&h.signal("exec-2"), true, false));

    h.raise(&started, "exec-3", "PaymentPartlyCoveredByAccount").unwrap();
    let event = h.bus.last::<PaymentPartlyCoveredByAccount>().unwrap();
    assert_eq!(event.amount, 40.0);
    assert_eq!(event.account_id.as_str(), "kermit");
    assert_eq!(event.payment_id.to_string(), "P1");
}

#[test]
fn fully_covered_payment_ends_with_received() {
    let h = Harness::new();
    h.set_balance("piggy", 250.0);

    let started = h.start("piggy", "P7", 80.0);
    h.query(&started, "exec-1", "DocumentAccountSummary").unwrap();
    assert!(resumed_with(&h.signal("exec-1"), true, true));

    h.command(&started, "exec-2", "WithdrawAmount").unwrap();
    h.raise(&started, "exec-3", "PaymentFullyCoveredByAccount").unwrap();
    h.raise(&started, "exec-4", "PaymentReceived").unwrap();

    assert_eq!(
        h.bus.last::<PaymentFullyCoveredByAccount>().unwrap().amount,
        80.0
    );

    // The published PaymentReceived comes back as the saga's terminal event.
    let received = h.bus.last::<PaymentReceived>().unwrap();
    assert_eq!(received.amount, 80.0);
    h.event(received).unwrap();

    assert_eq!(h.saga(&started.saga_id).status(), SagaStatus::Terminal);
}

#[test]
fn workflow_starts_with_initial_snapshot() {
    let h = Harness::new();
    let started = h.start("gonzo", "P3", 20.0);

    let instances = h.engine.started();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].instance_id, started.workflow_instance_id);
    assert_eq!(instances[0].definition_key, "PaymentSaga");
    assert_eq!(instances[0].variables["creditAvailable"], false);
    assert_eq!(instances[0].variables["creditFullyCovering"], false);
}

#[test]
fn raised_events_do_not_signal_the_workflow() {
    let h = Harness::new();
    let started = h.start("fozzie", "P4", 10.0);

    h.raise(&started, "exec-9", "UpdateCreditCardReminded").unwrap();
    h.raise(&started, "exec-9", "PaymentNotReceived").unwrap();

    assert!(h.engine.signals_for("exec-9").is_empty());
    assert_eq!(h.engine.signal_attempts(), 0);
    assert_eq!(
        h.bus.message_types(MessageKind::Event),
        vec!["UpdateCreditCardReminded", "PaymentNotReceived"]
    );
}

#[test]
fn outbound_messages_carry_saga_id() {
    let h = Harness::new();
    let started = h.start("fozzie", "P5", 10.0);

    h.raise(&started, "exec-1", "PaymentNotReceived").unwrap();

    let published = h.bus.messages(MessageKind::Event);
    assert_eq!(
        published[0].metadata_value(SAGA_ID_METADATA),
        Some(started.saga_id.as_str())
    );
}

#[test]
fn callbacks_accept_qualified_type_names() {
    let h = Harness::new();
    h.set_balance("kermit", 40.0);
    let started = h.start("kermit", "P1", 100.0);

    h.query(
        &started,
        "exec-1",
        "com.plexiti.horizon.model.api.DocumentAccountSummary",
    )
    .unwrap();

    assert_eq!(h.saga(&started.saga_id).state().amount_withdrawn(), 40.0);
}

#[test]
fn queued_callbacks_see_earlier_state_changes() {
    let h = Harness::new();
    h.set_balance("kermit", 40.0);
    let started = h.start("kermit", "P1", 100.0);

    // Dispatch both before waiting on either.
    let query = h
        .manager
        .dispatch(
            saga_bridge::Callback::QueryRequested(crate::support::details(
                &started,
                "exec-1",
                "DocumentAccountSummary",
            ))
            .into(),
        )
        .unwrap();
    let withdraw = h
        .manager
        .dispatch(
            saga_bridge::Callback::CommandIssued(crate::support::details(
                &started,
                "exec-2",
                "WithdrawAmount",
            ))
            .into(),
        )
        .unwrap();

    query.wait().unwrap();
    withdraw.wait().unwrap();

    assert_eq!(h.bus.last::<WithdrawAmount>().unwrap().amount, 40.0);
}

use saga_bridge::{RetryConfig, SagaConfig, SagaError, Signal};

use crate::support::{resumed_with, Harness};

#[test]
fn rejected_resume_is_retried_until_accepted() {
    let h = Harness::new();
    h.set_balance("kermit", 40.0);
    let started = h.start("kermit", "P1", 100.0);

    h.engine.reject_next(3);
    h.query(&started, "exec-1", "DocumentAccountSummary").unwrap();

    assert_eq!(h.engine.signal_attempts(), 4);
    assert!(resumed_with(&h.signal("exec-1"), true, false));
}

#[test]
fn rejected_failure_signal_is_retried() {
    let h = Harness::new();
    let started = h.start("kermit", "P1", 100.0);

    h.engine.reject_next(2);
    h.command(&started, "exec-1", "ChargeCreditCard").unwrap();

    assert_eq!(h.engine.signal_attempts(), 3);
    assert!(matches!(h.signal("exec-1"), Signal::Fail(_)));
}

#[test]
fn bounded_retry_abandons_the_signal() {
    let h = Harness::with_config(SagaConfig {
        signal_retry: RetryConfig {
            delay_ms: 1,
            max_attempts: Some(2),
        },
        ..SagaConfig::for_test()
    });
    let started = h.start("fozzie", "P1", 10.0);

    h.engine.reject_next(5);
    let err = h.command(&started, "exec-1", "WithdrawAmount").unwrap_err();

    assert!(matches!(err, SagaError::SignalAbandoned { attempts: 2, .. }));
    assert!(h.engine.signals_for("exec-1").is_empty());
    assert_eq!(h.engine.signal_attempts(), 2);
}

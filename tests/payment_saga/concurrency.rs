use std::sync::{Arc, Barrier};
use std::thread;

use saga_bridge::payment::{PaymentCreated, WithdrawAmount};
use saga_bridge::{Callback, SagaError, Signal};

use crate::support::{details, Harness};

#[test]
fn concurrent_starts_for_one_account_create_one_saga() {
    let h = Arc::new(Harness::new());
    let barrier = Arc::new(Barrier::new(2));

    let senders: Vec<_> = ["P1", "P2"]
        .into_iter()
        .map(|payment| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.event(PaymentCreated {
                    account_id: "kermit".into(),
                    payment_id: payment.into(),
                    amount: 10.0,
                })
            })
        })
        .collect();
    let results: Vec<Result<String, SagaError>> =
        senders.into_iter().map(|t| t.join().unwrap()).collect();

    let started: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(started.len(), 1, "results: {results:?}");
    let saga_id = started[0].clone();

    let refused = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        refused,
        SagaError::AlreadyStarted { saga_id: id, .. } if *id == saga_id
    ));
    assert_eq!(h.engine.started().len(), 1);
    assert_eq!(h.manager.saga_ids(), vec![saga_id]);
}

#[test]
fn blocked_command_holds_only_its_own_saga() {
    let h = Harness::new();
    h.set_balance("kermit", 40.0);
    h.set_balance("piggy", 500.0);
    let kermit = h.start("kermit", "P1", 100.0);
    let piggy = h.start("piggy", "P2", 100.0);

    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        h.bus.handle_command(move |cmd: WithdrawAmount| {
            if cmd.account_id.as_str() == "kermit" {
                entered.wait();
                release.wait();
            }
            Ok(())
        });
    }

    let kermit_withdraw = h
        .manager
        .dispatch(Callback::CommandIssued(details(&kermit, "exec-k", "WithdrawAmount")).into())
        .unwrap();
    entered.wait();

    // Kermit's saga is waiting on its command; piggy's keeps going.
    h.query(&piggy, "exec-p1", "DocumentAccountSummary").unwrap();
    h.command(&piggy, "exec-p2", "WithdrawAmount").unwrap();
    assert_eq!(h.saga(&piggy.saga_id).state().amount_withdrawn(), 100.0);
    assert!(matches!(h.signal("exec-p2"), Signal::Resume(_)));
    assert!(h.engine.signals_for("exec-k").is_empty());

    release.wait();
    assert_eq!(kermit_withdraw.wait().unwrap(), kermit.saga_id);
    assert!(matches!(h.signal("exec-k"), Signal::Resume(_)));
}

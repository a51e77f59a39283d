//! Integration tests for the pending action queue
//!
//! Tests drain scheduling, FIFO order, and the state-loss, fence,
//! teardown, re-entry and owner-thread checks

mod common;

use common::*;
use pane_manager::*;

#[test]
fn test_first_enqueue_schedules_one_drain() {
    let (mut manager, probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let b = manager.instantiate(Recorder::new("B", &log));

    for id in [a, b] {
        let mut tx = manager.begin_transaction();
        tx.add(id).unwrap();
        manager.commit(&mut tx).unwrap();
    }
    assert_eq!(probe.lock().drains, 1);
    assert_eq!(manager.pending_count(), 2);
    assert!(manager.dump().contains("Pending Actions:"));

    assert!(manager.exec_pending_actions().unwrap());
    assert!(!manager.exec_pending_actions().unwrap());

    let attaches: Vec<String> = events(&log)
        .into_iter()
        .filter(|e| e.ends_with(":attach"))
        .collect();
    assert_eq!(attaches, vec!["A:attach", "B:attach"]);
    assert_eq!(manager.added(), &[a, b]);
}

#[test]
fn test_actions_queued_while_draining_run_in_same_drain() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();

    let first = log.clone();
    let third = log.clone();
    manager
        .post(move |m| {
            first.lock().push("first".to_string());
            m.post(move |_| {
                third.lock().push("third".to_string());
                Ok(())
            })
        })
        .unwrap();
    let second = log.clone();
    manager
        .post(move |_| {
            second.lock().push("second".to_string());
            Ok(())
        })
        .unwrap();

    manager.exec_pending_actions().unwrap();
    assert_eq!(events(&log), vec!["first", "second", "third"]);
    assert_eq!(manager.pending_count(), 0);
}

#[test]
fn test_commit_after_save_needs_state_loss() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    manager.save_all_state().unwrap();
    assert!(manager.is_state_saved());

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    let err = manager.commit(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::StateAlreadySaved));
    assert!(!tx.is_committed());

    manager.commit_allowing_state_loss(&mut tx).unwrap();
    manager.exec_pending_actions().unwrap();
    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);

    let err = manager
        .pop_back_stack_immediate(PopRequest::top())
        .unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::StateAlreadySaved));

    manager.note_state_not_saved();
    assert!(!manager.pop_back_stack_immediate(PopRequest::top()).unwrap());
}

#[test]
fn test_stop_marks_state_saved() {
    let (mut manager, _probe) = resumed_manager();
    manager.dispatch_pause().unwrap();
    manager.dispatch_stop().unwrap();
    assert!(manager.is_state_saved());
    manager.dispatch_start().unwrap();
    assert!(!manager.is_state_saved());
}

#[test]
fn test_forbidden_transactions_report_reason() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    manager.forbid_transactions("on_menu_built");
    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    let err = manager.commit(&mut tx).unwrap_err();
    assert_eq!(
        err.as_protocol(),
        Some(&ProtocolViolation::TransactionsForbidden("on_menu_built".to_string()))
    );
    assert!(manager.dump().contains("no_transactions_because=on_menu_built"));

    manager.allow_transactions();
    manager.commit(&mut tx).unwrap();
}

#[test]
fn test_destroyed_rejects_even_with_state_loss() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    manager.dispatch_destroy().unwrap();
    assert!(manager.is_destroyed());

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    let err = manager.commit_allowing_state_loss(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::Destroyed));
    let err = manager.commit_now_allowing_state_loss(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::Destroyed));
}

#[test]
fn test_destroy_drains_pending_first() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    manager.commit(&mut tx).unwrap();

    manager.dispatch_destroy().unwrap();

    assert_eq!(manager.pending_count(), 0);
    assert!(events(&log).contains(&"A:resume".to_string()));
    assert_eq!(events(&log).last().map(String::as_str), Some("A:detach"));
    assert_eq!(manager.active_count(), 0);
}

#[test]
fn test_recursive_drain_is_rejected() {
    let (mut manager, _probe) = resumed_manager();
    manager
        .post(|m| m.exec_pending_actions().map(|_| ()))
        .unwrap();

    let err = manager.exec_pending_actions().unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::RecursiveExecution));
    assert!(!manager.is_executing_actions());
    assert!(!manager.exec_pending_actions().unwrap());
}

#[test]
fn test_drain_off_owner_thread_is_rejected() {
    let (manager, _probe) = resumed_manager();

    let (manager, result) = std::thread::spawn(move || {
        let mut manager = manager;
        let result = manager.exec_pending_actions();
        (manager, result)
    })
    .join()
    .unwrap();

    let err = result.unwrap_err();
    assert_eq!(
        err.as_protocol(),
        Some(&ProtocolViolation::OffThread {
            operation: "exec_pending_actions"
        })
    );
    assert_eq!(manager.cur_state(), LifecycleState::Resumed);
}

#[test]
fn test_queue_limit() {
    let config = ManagerConfig {
        max_pending_actions: 2,
        ..ManagerConfig::testing()
    };
    let (mut manager, _probe) = manager_with(config);
    manager.post(|_| Ok(())).unwrap();
    manager.post(|_| Ok(())).unwrap();

    let err = manager.post(|_| Ok(())).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::QueueFull(2)));
}

#[test]
fn test_back_stack_indices_readable_from_other_thread() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    tx.add_to_back_stack(Some("settings")).unwrap();
    manager.commit(&mut tx).unwrap();

    // Allocated at commit, before the transaction runs
    let indices = manager.back_stack_indices();
    let text = std::thread::spawn(move || indices.dump("  "))
        .join()
        .unwrap();
    assert!(text.contains("#0:"));
    assert!(text.contains("settings"));
    assert_eq!(manager.back_stack_entry_count(), 0);
}

#[test]
fn test_back_stack_commit_runs_once() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    tx.add_to_back_stack(Some("x")).unwrap();
    assert_eq!(manager.commit(&mut tx).unwrap(), Some(0));

    let err = manager.commit_now(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::AlreadyCommitted));
    let err = manager.commit_allowing_state_loss(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::AlreadyCommitted));
    assert_eq!(manager.pending_count(), 1);

    manager.exec_pending_actions().unwrap();
    assert_eq!(manager.added(), &[a]);
    assert_eq!(manager.back_stack_entry_count(), 1);
    assert_eq!(manager.back_stack_indices().len(), 1);
    assert!(manager.back_stack_indices().free_indices().is_empty());
}

//! Integration tests for transactions and the back stack
//!
//! Tests forward execution, reversal on pop, LIFO and named pops, and the
//! commit-time protocol checks

mod common;

use common::*;
use pane_manager::*;

#[test]
fn test_replace_then_pop_restores_previous() {
    let (mut manager, probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(1));
    let b = manager.instantiate(Recorder::new("B", &log).with_view(2));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0), a).unwrap();
    commit_and_run(&mut manager, &mut tx);
    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);

    let mut tx = manager.begin_transaction();
    tx.replace(ContainerId(0), b).unwrap();
    tx.add_to_back_stack(None).unwrap();
    let index = commit_and_run(&mut manager, &mut tx);
    assert_eq!(index, Some(0));

    // A is parked at Created, pinned by the back stack
    assert_eq!(state_of(&manager, a), LifecycleState::Created);
    assert_eq!(manager.component(a).unwrap().back_stack_nesting(), 1);
    assert_eq!(manager.component(a).unwrap().index(), Some(0));
    assert_eq!(state_of(&manager, b), LifecycleState::Resumed);
    assert_eq!(manager.added(), &[b]);

    let entry = manager.back_stack_entry_at(0).unwrap();
    assert_eq!(entry.ops()[0].command, OpCommand::Replace);
    assert_eq!(entry.ops()[0].removed, vec![a]);
    assert_eq!(probe.lock().views, vec![(ContainerId(0), ViewId(2))]);

    assert!(manager.pop_back_stack_immediate(PopRequest::top()).unwrap());

    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);
    assert_eq!(manager.added(), &[a]);
    assert_eq!(state_of(&manager, b), LifecycleState::Initializing);
    assert_eq!(manager.component(b).unwrap().index(), None);
    assert_eq!(manager.component(a).unwrap().back_stack_nesting(), 0);
    assert_eq!(manager.back_stack_entry_count(), 0);
    assert_eq!(manager.back_stack_indices().free_indices(), vec![0]);
    assert_eq!(probe.lock().views, vec![(ContainerId(0), ViewId(1))]);

    let b_events: Vec<String> = events(&log)
        .into_iter()
        .filter(|e| e.starts_with("B:"))
        .collect();
    assert_eq!(b_events.last().map(String::as_str), Some("B:detach"));
}

#[test]
fn test_replace_with_itself_keeps_component() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(1));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0), a).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.replace(ContainerId(0), a).unwrap();
    tx.add_to_back_stack(None).unwrap();
    commit_and_run(&mut manager, &mut tx);

    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);
    assert_eq!(manager.component(a).unwrap().back_stack_nesting(), 0);
    let op = &manager.back_stack_entry_at(0).unwrap().ops()[0];
    assert_eq!(op.component, None);
    assert!(op.removed.is_empty());

    assert!(manager.pop_back_stack_immediate(PopRequest::top()).unwrap());
    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);
}

#[test]
fn test_replace_removes_newest_first() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let b = manager.instantiate(Recorder::new("B", &log));
    let c = manager.instantiate(Recorder::new("C", &log));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0), a).unwrap();
    tx.add_to(ContainerId(0), b).unwrap();
    commit_and_run(&mut manager, &mut tx);
    assert_eq!(manager.added(), &[a, b]);

    let mut tx = manager.begin_transaction();
    tx.replace(ContainerId(0), c).unwrap();
    tx.add_to_back_stack(None).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let op = &manager.back_stack_entry_at(0).unwrap().ops()[0];
    assert_eq!(op.removed, vec![b, a]);
    assert_eq!(manager.added(), &[c]);

    assert!(manager.pop_back_stack_immediate(PopRequest::top()).unwrap());
    assert_eq!(manager.added(), &[b, a]);
}

#[test]
fn test_pops_are_lifo() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let ids: Vec<ComponentId> = ["A", "B", "C"]
        .iter()
        .map(|kind| manager.instantiate(Recorder::new(kind, &log)))
        .collect();

    for id in &ids {
        let mut tx = manager.begin_transaction();
        tx.add(*id).unwrap();
        tx.add_to_back_stack(None).unwrap();
        manager.commit(&mut tx).unwrap();
    }
    manager.exec_pending_actions().unwrap();
    assert_eq!(manager.back_stack_entry_count(), 3);
    log.lock().clear();

    for _ in 0..3 {
        assert!(manager.pop_back_stack_immediate(PopRequest::top()).unwrap());
    }
    assert!(!manager.pop_back_stack_immediate(PopRequest::top()).unwrap());

    let destroyed: Vec<String> = events(&log)
        .into_iter()
        .filter(|e| e.ends_with(":destroy"))
        .collect();
    assert_eq!(destroyed, vec!["C:destroy", "B:destroy", "A:destroy"]);
    assert!(manager.added().is_empty());
}

/// Back stack with entries named x, y, x (bottom to top)
fn named_stack() -> (ComponentManager, Vec<ComponentId>) {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let mut ids = Vec::new();
    for (kind, name) in [("A", "x"), ("B", "y"), ("C", "x")] {
        let id = manager.instantiate(Recorder::new(kind, &log));
        let mut tx = manager.begin_transaction();
        tx.add(id).unwrap();
        tx.add_to_back_stack(Some(name)).unwrap();
        manager.commit(&mut tx).unwrap();
        ids.push(id);
    }
    manager.exec_pending_actions().unwrap();
    (manager, ids)
}

#[test]
fn test_named_pop_matching_top_is_noop() {
    let (mut manager, _) = named_stack();
    assert!(!manager.pop_back_stack_immediate(PopRequest::named("x")).unwrap());
    assert_eq!(manager.back_stack_entry_count(), 3);
}

#[test]
fn test_named_pop_inclusive_stops_at_first_mismatch() {
    let (mut manager, ids) = named_stack();
    assert!(manager
        .pop_back_stack_immediate(PopRequest::named("x").inclusive())
        .unwrap());
    assert_eq!(manager.back_stack_entry_count(), 2);
    assert_eq!(manager.added(), &ids[..2]);
}

#[test]
fn test_named_pop_removes_entries_above_match() {
    let (mut manager, ids) = named_stack();
    assert!(manager.pop_back_stack_immediate(PopRequest::named("y")).unwrap());
    assert_eq!(manager.back_stack_entry_count(), 2);
    assert_eq!(manager.back_stack_entry_at(1).unwrap().name(), Some("y"));
    assert_eq!(state_of(&manager, ids[2]), LifecycleState::Initializing);
}

#[test]
fn test_named_pop_inclusive_removes_match() {
    let (mut manager, ids) = named_stack();
    assert!(manager
        .pop_back_stack_immediate(PopRequest::named("y").inclusive())
        .unwrap());
    assert_eq!(manager.back_stack_entry_count(), 1);
    assert_eq!(manager.added(), &ids[..1]);
}

#[test]
fn test_pop_to_id_and_unknown_name() {
    let (mut manager, _) = named_stack();
    assert!(!manager.pop_back_stack_immediate(PopRequest::named("zzz")).unwrap());
    assert_eq!(manager.back_stack_entry_count(), 3);

    assert!(manager.pop_back_stack_immediate(PopRequest::to_id(0)).unwrap());
    assert_eq!(manager.back_stack_entry_count(), 1);

    assert!(manager
        .pop_back_stack_immediate(PopRequest::to_id(0).inclusive())
        .unwrap());
    assert_eq!(manager.back_stack_entry_count(), 0);
    assert!(manager.added().is_empty());
}

#[test]
fn test_batch_pop_notifies_once() {
    let (mut manager, _) = named_stack();
    let counts = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = counts.clone();
    manager.add_back_stack_listener(Box::new(move |count: usize| seen.lock().push(count)));

    assert!(manager
        .pop_back_stack_immediate(PopRequest::named("x").inclusive())
        .unwrap());
    assert!(manager
        .pop_back_stack_immediate(PopRequest::default().inclusive())
        .unwrap());

    assert_eq!(*counts.lock(), vec![2, 0]);
}

#[test]
fn test_listener_sees_push_and_can_be_removed() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let counts = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = counts.clone();
    let listener = manager.add_back_stack_listener(Box::new(move |count: usize| seen.lock().push(count)));

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    tx.add_to_back_stack(None).unwrap();
    commit_and_run(&mut manager, &mut tx);
    assert_eq!(*counts.lock(), vec![1]);

    assert!(manager.remove_back_stack_listener(listener));
    assert!(!manager.remove_back_stack_listener(listener));
    manager.pop_back_stack_immediate(PopRequest::top()).unwrap();
    assert_eq!(*counts.lock(), vec![1]);
}

#[test]
fn test_queued_pop_runs_on_drain() {
    let (mut manager, _) = named_stack();
    manager.pop_back_stack(PopRequest::top()).unwrap();
    assert_eq!(manager.back_stack_entry_count(), 3);
    manager.exec_pending_actions().unwrap();
    assert_eq!(manager.back_stack_entry_count(), 2);
}

#[test]
fn test_hide_and_show_reverse_on_pop() {
    let (mut manager, probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(5));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0), a).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.hide(a).unwrap();
    tx.add_to_back_stack(None).unwrap();
    commit_and_run(&mut manager, &mut tx);

    assert!(manager.component(a).unwrap().is_hidden());
    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);
    assert_eq!(probe.lock().visibility, vec![(ViewId(5), false)]);

    manager.pop_back_stack_immediate(PopRequest::top()).unwrap();
    assert!(!manager.component(a).unwrap().is_hidden());
    assert_eq!(
        probe.lock().visibility,
        vec![(ViewId(5), false), (ViewId(5), true)]
    );
    let toggles: Vec<String> = events(&log)
        .into_iter()
        .filter(|e| e.contains("hidden"))
        .collect();
    assert_eq!(toggles, vec!["A:hidden=true", "A:hidden=false"]);
}

#[test]
fn test_detach_and_attach_reverse_on_pop() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(5));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0), a).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.detach(a).unwrap();
    tx.add_to_back_stack(Some("detach")).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let component = manager.component(a).unwrap();
    assert!(component.is_detached());
    assert_eq!(component.state(), LifecycleState::Created);
    assert_eq!(component.index(), Some(0));
    assert!(manager.added().is_empty());

    manager.pop_back_stack_immediate(PopRequest::top()).unwrap();
    let component = manager.component(a).unwrap();
    assert!(!component.is_detached());
    assert_eq!(component.state(), LifecycleState::Resumed);
    assert_eq!(manager.added(), &[a]);
}

#[test]
fn test_remove_without_back_stack_destroys() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    let mut tx = manager.begin_transaction();
    tx.add_tagged(a, "solo").unwrap();
    commit_and_run(&mut manager, &mut tx);
    assert_eq!(manager.find_by_tag("solo"), Some(a));

    let mut tx = manager.begin_transaction();
    tx.remove(a).unwrap();
    commit_and_run(&mut manager, &mut tx);

    assert_eq!(state_of(&manager, a), LifecycleState::Initializing);
    assert_eq!(manager.component(a).unwrap().index(), None);
    assert_eq!(manager.find_by_tag("solo"), None);
    assert_eq!(manager.active_count(), 0);
    assert!(manager.release(a).is_some());
    assert!(manager.component(a).is_none());
}

#[test]
fn test_freed_index_is_reused() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let b = manager.instantiate(Recorder::new("B", &log));
    let c = manager.instantiate(Recorder::new("C", &log));

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap().add(b).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.remove(a).unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.add(c).unwrap();
    commit_and_run(&mut manager, &mut tx);

    assert_eq!(manager.component(c).unwrap().index(), Some(0));
    assert_eq!(manager.component_at(1).map(Component::id), Some(b));
}

#[test]
fn test_commit_protocol_errors() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    manager.commit(&mut tx).unwrap();

    let err = manager.commit(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::AlreadyCommitted));
    let err = tx.remove(a).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::ModifiedAfterCommit));

    let stranger = ComponentId::new();
    let mut tx = manager.begin_transaction();
    tx.add(stranger).unwrap();
    let err = manager.commit(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::UnknownComponent(stranger)));
    assert!(!tx.is_committed());
}

#[test]
fn test_tag_and_container_are_fixed() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));

    let mut tx = manager.begin_transaction();
    tx.add_to_tagged(ContainerId(0), a, "first").unwrap();
    commit_and_run(&mut manager, &mut tx);

    let mut tx = manager.begin_transaction();
    tx.add_tagged(a, "second").unwrap();
    let err = manager.commit(&mut tx).unwrap_err();
    assert!(matches!(
        err.as_protocol(),
        Some(ProtocolViolation::TagChanged { .. })
    ));

    let mut tx = manager.begin_transaction();
    tx.replace(ContainerId(9), a).unwrap();
    let err = manager.commit(&mut tx).unwrap_err();
    assert_eq!(
        err.as_protocol(),
        Some(&ProtocolViolation::ContainerChanged {
            component: a,
            from: ContainerId(0),
            to: ContainerId(9),
        })
    );
    assert_eq!(manager.component(a).unwrap().tag(), Some("first"));
}

#[test]
fn test_add_twice_fails_the_batch() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let b = manager.instantiate(Recorder::new("B", &log));

    let mut first = manager.begin_transaction();
    first.add(a).unwrap();
    manager.commit(&mut first).unwrap();

    let mut again = manager.begin_transaction();
    again.add(a).unwrap();
    again.add_to_back_stack(None).unwrap();
    manager.commit(&mut again).unwrap();

    let mut later = manager.begin_transaction();
    later.add(b).unwrap();
    later.add_to_back_stack(None).unwrap();
    manager.commit(&mut later).unwrap();
    assert_eq!(manager.back_stack_indices().len(), 2);

    let err = manager.exec_pending_actions().unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::AlreadyAdded(a)));
    assert_eq!(manager.added(), &[a]);
    assert_eq!(manager.component(b).unwrap().index(), None);
    assert_eq!(manager.back_stack_entry_count(), 0);
    assert!(manager.back_stack_indices().is_empty());
    assert!(!manager.is_executing_actions());
}

#[test]
fn test_commit_now_runs_synchronously() {
    let (mut manager, probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log));
    let drains_before = probe.lock().drains;

    let mut tx = manager.begin_transaction();
    tx.add(a).unwrap();
    manager.commit_now(&mut tx).unwrap();

    assert_eq!(state_of(&manager, a), LifecycleState::Resumed);
    assert_eq!(probe.lock().drains, drains_before);
    assert!(!tx.is_add_to_back_stack_allowed());

    let mut tx = manager.begin_transaction();
    tx.remove(a).unwrap();
    tx.add_to_back_stack(None).unwrap();
    let err = manager.commit_now(&mut tx).unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolViolation::BackStackRequested));
}

#[test]
fn test_missing_container_view_is_fatal() {
    let (mut manager, _probe) = resumed_manager();
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(1));

    let mut tx = manager.begin_transaction();
    tx.add_to(ContainerId(0x42), a).unwrap();
    manager.commit(&mut tx).unwrap();

    let err = manager.exec_pending_actions().unwrap_err();
    assert_eq!(
        err.as_protocol(),
        Some(&ProtocolViolation::NoContainerView {
            component: a,
            container: ContainerId(0x42),
        })
    );
}

#[test]
fn test_custom_pop_animation_is_requested() {
    let config = ManagerConfig {
        animations_enabled: true,
        ..ManagerConfig::testing()
    };
    let (mut manager, probe) = manager_with(config);
    resume(&mut manager);
    let log = new_log();
    let a = manager.instantiate(Recorder::new("A", &log).with_view(1));

    let mut tx = manager.begin_transaction();
    tx.set_custom_animations_with_pop(Some(AnimationRes(1)), None, None, Some(AnimationRes(4)))
        .unwrap();
    tx.add_to(ContainerId(0), a).unwrap();
    tx.add_to_back_stack(None).unwrap();
    commit_and_run(&mut manager, &mut tx);

    manager.pop_back_stack_immediate(PopRequest::top()).unwrap();

    let requested: Vec<AnimationSpec> = probe.lock().animations.iter().map(|(_, spec)| spec.clone()).collect();
    assert_eq!(requested.len(), 2);
    assert!(matches!(requested[0], AnimationSpec::Resource { res: AnimationRes(1), .. }));
    assert!(matches!(requested[1], AnimationSpec::Resource { res: AnimationRes(4), .. }));
    assert_eq!(
        manager.component(a).unwrap().animating_away().map(|away| away.view),
        Some(ViewId(1))
    );
}

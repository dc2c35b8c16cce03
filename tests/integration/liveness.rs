#![allow(missing_docs)]

mod common;

use std::sync::atomic::Ordering;
use std::thread;

use common::Fixture;
use sombra_kernel::{
    ExplicitIndexStore, IndexDescriptor, IndexOrder, KernelError, KernelTransaction, LabelId,
    NodeId, PropId, Result, Status, TypeId,
};

const PERSON: LabelId = LabelId(1);
const NAME: PropId = PropId(1);

/// Runs every write and a sample of reads, asserting each fails with `expected`.
fn assert_every_call_fails(tx: &mut KernelTransaction, node: NodeId, expected: &KernelError) {
    let index = IndexDescriptor::new(PERSON, &[NAME]);
    let mut ops = tx.operations();
    let outcomes: Vec<Result<()>> = vec![
        ops.node_create().map(|_| ()),
        ops.node_delete(node).map(|_| ()),
        ops.node_add_label(node, PERSON).map(|_| ()),
        ops.node_remove_label(node, PERSON).map(|_| ()),
        ops.relationship_create(node, TypeId(1), node).map(|_| ()),
        ops.node_set_property(node, NAME, "x".into()).map(|_| ()),
        ops.node_remove_from_explicit_index("people", node),
        ops.node_explicit_index_create_lazily("people", None).map(|_| ()),
        ops.node_exists(node).map(|_| ()),
        ops.node_labels(node).map(|_| ()),
        ops.all_nodes_scan().map(|_| ()),
        ops.node_label_scan(PERSON).map(|_| ()),
        ops.node_properties(node).map(|_| ()),
        ops.graph_properties().map(|_| ()),
        ops.node_index_scan(&index, IndexOrder::None).map(|_| ()),
        ops.future_node_reference_read(node),
        ops.index(PERSON, &[NAME]).map(|_| ()),
    ];
    for outcome in outcomes {
        assert_eq!(outcome.as_ref().err(), Some(expected));
    }
}

#[test]
fn closed_transaction_rejects_every_call_without_side_effects() -> Result<()> {
    let fx = Fixture::new();
    fx.catalog.create_index(PERSON, &[NAME]);
    let node = fx.store.create_node(&[PERSON], &[(NAME, "ada".into())]);
    let (mut tx, locks) = fx.begin_recorded();
    tx.close()?;

    assert_every_call_fails(&mut tx, node, &KernelError::NotInTransaction);

    assert!(locks.lock().is_empty());
    assert!(!tx.has_tx_state_with_changes());
    assert!(fx.removals().is_empty());
    assert!(!fx.explicit.node_index_exists("people")?);
    assert_eq!(fx.metrics.nodes_created.load(Ordering::Relaxed), 0);
    assert_eq!(fx.metrics.liveness_rejections.load(Ordering::Relaxed), 17);
    Ok(())
}

#[test]
fn termination_from_another_thread_is_seen_by_the_next_call() -> Result<()> {
    let fx = Fixture::new();
    fx.catalog.create_index(PERSON, &[NAME]);
    let node = fx.store.create_node(&[PERSON], &[(NAME, "ada".into())]);
    let (mut tx, locks) = fx.begin_recorded();

    let created = tx.operations().node_create()?;
    let handle = tx.termination_handle();
    thread::spawn(move || handle.mark(Status::Terminated))
        .join()
        .expect("terminator thread");

    let before = tx.tx_state().added_nodes().count();
    assert_every_call_fails(
        &mut tx,
        node,
        &KernelError::TransactionTerminated(Status::Terminated),
    );

    assert_eq!(tx.tx_state().added_nodes().count(), before);
    assert!(tx.tx_state().node_is_added_in_this_tx(created));
    assert!(!tx.index_tx_state().has_changes());
    assert!(locks.lock().is_empty());
    assert!(fx.removals().is_empty());
    Ok(())
}

#[test]
fn terminated_transaction_can_still_be_closed() -> Result<()> {
    let fx = Fixture::new();
    let node = fx.store.create_node(&[], &[]);
    let mut tx = fx.kernel.begin_transaction();
    tx.operations().node_delete(node)?;
    assert_eq!(fx.kernel.lock_manager().snapshot().held, 1);

    tx.mark_for_termination(Status::DeadlockDetected);
    assert_eq!(
        tx.operations().node_exists(node),
        Err(KernelError::TransactionTerminated(Status::DeadlockDetected))
    );
    tx.close()?;
    assert_eq!(fx.kernel.lock_manager().snapshot().held, 0);
    assert_eq!(
        tx.operations().node_exists(node),
        Err(KernelError::NotInTransaction)
    );
    Ok(())
}

#[test]
fn dropping_an_open_transaction_releases_its_locks() -> Result<()> {
    let fx = Fixture::new();
    let node = fx.store.create_node(&[], &[]);
    {
        let mut tx = fx.kernel.begin_transaction();
        tx.operations().node_add_label(node, PERSON)?;
        assert_eq!(fx.kernel.lock_manager().snapshot().held, 1);
    }
    assert_eq!(fx.kernel.lock_manager().snapshot().held, 0);
    Ok(())
}

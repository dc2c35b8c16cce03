#![allow(missing_docs)]

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::Fixture;
use sombra_kernel::{EntityType, KernelConfig, KernelError, LabelId, NodeId, ResourceType, Result};

const PERSON: LabelId = LabelId(1);

#[test]
fn delete_rechecks_existence_after_waiting_for_the_lock() -> Result<()> {
    let fx = Fixture::new();
    let node = fx.store.create_node(&[], &[]);
    let mut first = fx.kernel.begin_transaction();
    assert!(first.operations().node_delete(node)?);

    thread::scope(|scope| -> Result<()> {
        let (done_tx, done_rx) = mpsc::channel();
        let kernel = &fx.kernel;
        let waiter = scope.spawn(move || {
            let mut second = kernel.begin_transaction();
            let outcome = second.operations().node_delete(node);
            done_tx.send(()).expect("signal");
            outcome
        });

        thread::sleep(Duration::from_millis(50));
        assert!(done_rx.try_recv().is_err(), "second delete must wait for the lock");

        // The first transaction's delete reaches the store before its locks go.
        assert!(fx.store.delete_node(node));
        first.close()?;

        let deleted = waiter.join().expect("waiter thread")?;
        assert!(!deleted, "node vanished while the second transaction waited");
        Ok(())
    })?;
    assert_eq!(fx.kernel.lock_manager().snapshot().held, 0);
    Ok(())
}

#[test]
fn label_write_waits_then_sees_committed_state() -> Result<()> {
    let fx = Fixture::new();
    let node = fx.store.create_node(&[], &[]);
    let mut first = fx.kernel.begin_transaction();
    assert!(first.operations().node_add_label(node, PERSON)?);
    assert_eq!(
        fx.kernel.lock_manager().holder(ResourceType::Node, node.0),
        Some(1)
    );

    thread::scope(|scope| -> Result<()> {
        let kernel = &fx.kernel;
        let waiter = scope.spawn(move || {
            let mut second = kernel.begin_transaction();
            second.operations().node_add_label(node, PERSON)
        });
        thread::sleep(Duration::from_millis(20));
        assert!(fx.store.delete_node(node));
        first.close()?;
        let outcome = waiter.join().expect("waiter thread");
        assert_eq!(
            outcome,
            Err(KernelError::EntityNotFound {
                entity: EntityType::Node,
                id: node.0
            })
        );
        Ok(())
    })
}

#[test]
fn configured_lock_timeout_fails_the_conflicting_write() -> Result<()> {
    let config = KernelConfig::default().lock_wait_timeout(Some(Duration::from_millis(30)));
    let fx = Fixture::with_config(config);
    let node = fx.store.create_node(&[], &[]);
    let mut first = fx.kernel.begin_transaction();
    let mut second = fx.kernel.begin_transaction();

    assert!(first.operations().node_delete(node)?);
    assert_eq!(
        second.operations().node_remove_label(node, PERSON),
        Err(KernelError::LockWaitTimeout {
            resource: ResourceType::Node,
            id: node.0
        })
    );
    assert!(!second.has_tx_state_with_changes());
    Ok(())
}

#[test]
fn parallel_transactions_create_disjoint_nodes() -> Result<()> {
    let fx = Fixture::new();
    let created: Vec<Vec<NodeId>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let kernel = &fx.kernel;
                scope.spawn(move || -> Result<Vec<NodeId>> {
                    let mut tx = kernel.begin_transaction();
                    let mut ops = tx.operations();
                    let mut nodes = Vec::new();
                    for _ in 0..25 {
                        let node = ops.node_create()?;
                        ops.node_add_label(node, PERSON)?;
                        nodes.push(node);
                    }
                    assert_eq!(ops.node_label_scan(PERSON)?.len(), 25);
                    Ok(nodes)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread"))
            .collect::<Result<Vec<_>>>()
    })?;
    let mut all: Vec<_> = created.into_iter().flatten().collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 100);
    Ok(())
}

#![allow(missing_docs)]

mod common;

use std::fs;
use std::sync::Arc;

use common::{init_tracing, Fixture};
use sombra_kernel::{
    ExplicitIndexConfig, ExplicitIndexStore, Kernel, KernelConfig, KernelError, KernelOptions,
    MemoryExplicitIndexStore, MemoryStore, NodeId, PropValue, Result, TypeId, NODE_AUTO_INDEX,
};
use tempfile::tempdir;

fn config(pairs: &[(&str, &str)]) -> ExplicitIndexConfig {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn lazy_creation_merges_configured_defaults() -> Result<()> {
    let fx = Fixture::with_config(
        KernelConfig::default()
            .explicit_index_default("type", "exact")
            .explicit_index_default("provider", "memory"),
    );
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    let effective =
        ops.node_explicit_index_create_lazily("people", Some(&config(&[("type", "fulltext")])))?;
    assert_eq!(
        effective,
        config(&[("provider", "memory"), ("type", "fulltext")])
    );
    assert!(fx.explicit.node_index_exists("people")?);

    assert_eq!(
        ops.node_explicit_index_create_lazily("people", None),
        Err(KernelError::ExplicitIndexConfigMismatch {
            name: "people".into(),
            key: "type".into()
        })
    );
    Ok(())
}

#[test]
fn removal_hides_node_for_the_rest_of_the_transaction() -> Result<()> {
    let fx = Fixture::new();
    let ada = fx.store.create_node(&[], &[]);
    let bob = fx.store.create_node(&[], &[]);
    fx.explicit.create_node_index_if_absent("people", &config(&[]))?;
    fx.explicit.add_node("people", "name", "ada".into(), ada.0)?;
    fx.explicit.add_node("people", "name", "bob".into(), bob.0)?;

    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();
    assert_eq!(ops.node_explicit_index_query("people", None, "*")?, vec![ada, bob]);

    ops.node_remove_from_explicit_index("people", ada)?;
    assert!(ops
        .node_explicit_index_lookup("people", "name", &PropValue::from("ada"))?
        .is_empty());
    assert_eq!(ops.node_explicit_index_query("people", Some("name"), "*")?, vec![bob]);

    ops.node_delete(bob)?;
    assert!(ops.node_explicit_index_query("people", None, "*")?.is_empty());

    let mut other = fx.kernel.begin_transaction();
    assert_eq!(
        other.operations().node_explicit_index_query("people", None, "*")?,
        vec![ada, bob]
    );
    assert_eq!(tx.explicit_index_tx_state().removed_nodes("people"), vec![ada.0]);
    Ok(())
}

#[test]
fn removal_from_missing_index_fails() {
    let fx = Fixture::new();
    let mut tx = fx.kernel.begin_transaction();
    assert_eq!(
        tx.operations()
            .node_remove_from_explicit_index("missing", NodeId(1)),
        Err(KernelError::ExplicitIndexNotFound("missing".into()))
    );
    assert!(!tx.has_tx_state_with_changes());
}

#[test]
fn node_auto_index_follows_deletions_when_enabled() -> Result<()> {
    let fx = Fixture::with_config(KernelConfig::default().node_auto_indexing(true));
    let node = fx.store.create_node(&[], &[]);
    fx.explicit
        .create_node_index_if_absent(NODE_AUTO_INDEX, &config(&[]))?;
    fx.explicit
        .add_node(NODE_AUTO_INDEX, "name", "ada".into(), node.0)?;

    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();
    let fresh = ops.node_create()?;
    assert!(ops.node_delete(fresh)?);
    assert!(ops.node_delete(node)?);
    assert!(ops
        .node_explicit_index_lookup(NODE_AUTO_INDEX, "name", &PropValue::from("ada"))?
        .is_empty());
    let mut expected = vec![node.0, fresh.0];
    expected.sort_unstable();
    assert_eq!(
        tx.explicit_index_tx_state().removed_nodes(NODE_AUTO_INDEX),
        expected
    );
    Ok(())
}

#[test]
fn relationship_lookups_filter_by_endpoints() -> Result<()> {
    let fx = Fixture::new();
    let a = fx.store.create_node(&[], &[]);
    let b = fx.store.create_node(&[], &[]);
    let c = fx.store.create_node(&[], &[]);
    let ab = fx.store.create_relationship(a, TypeId(1), b, &[]);
    let cb = fx.store.create_relationship(c, TypeId(1), b, &[]);
    fx.explicit
        .create_relationship_index_if_absent("friendships", &config(&[]))?;
    fx.explicit
        .add_relationship("friendships", "since", 2001i64.into(), ab.0)?;
    fx.explicit
        .add_relationship("friendships", "since", 2001i64.into(), cb.0)?;

    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();
    let since = PropValue::Int(2001);
    assert_eq!(
        ops.relationship_explicit_index_get("friendships", "since", &since, None, Some(b))?,
        vec![ab, cb]
    );
    assert_eq!(
        ops.relationship_explicit_index_get("friendships", "since", &since, Some(c), None)?,
        vec![cb]
    );
    assert_eq!(
        ops.relationship_explicit_index_query("friendships", Some("since"), "20*", Some(a), Some(b))?,
        vec![ab]
    );
    ops.node_delete(c)?;
    assert_eq!(
        ops.relationship_explicit_index_query("friendships", None, "*", None, None)?,
        vec![ab]
    );
    Ok(())
}

#[test]
fn kernel_opens_from_a_config_file() -> Result<()> {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("kernel.toml");
    fs::write(
        &path,
        "[auto_indexing]\nnodes = true\n\n[explicit_index.default_config]\ntype = \"exact\"\n",
    )
    .expect("write config");
    let config = KernelConfig::load(Some(path)).expect("load config");

    let store = Arc::new(MemoryStore::new());
    let explicit = Arc::new(MemoryExplicitIndexStore::new());
    let node = store.create_node(&[], &[]);
    explicit.create_node_index_if_absent(NODE_AUTO_INDEX, &config_of("exact"))?;
    let kernel = Kernel::open(
        KernelOptions::in_memory(store)
            .explicit_indexes(explicit)
            .config(config),
    );
    assert!(kernel.config().auto_indexing.nodes);

    let mut tx = kernel.begin_transaction();
    tx.operations().node_delete(node)?;
    assert_eq!(
        tx.explicit_index_tx_state().removed_nodes(NODE_AUTO_INDEX),
        vec![node.0]
    );
    let effective = tx.operations().node_explicit_index_create_lazily("people", None)?;
    assert_eq!(effective, config_of("exact"));
    Ok(())
}

fn config_of(kind: &str) -> ExplicitIndexConfig {
    config(&[("type", kind)])
}

#![allow(missing_docs)]

mod common;

use std::ops::Bound;

use common::Fixture;
use sombra_kernel::storage::RelationshipGroup;
use sombra_kernel::{
    Dir, EntityType, IndexOrder, IndexQuery, KernelError, LabelId, NodeId, PropId, PropValue,
    RelId, Result, TypeId,
};

const PERSON: LabelId = LabelId(1);
const ADMIN: LabelId = LabelId(2);
const NAME: PropId = PropId(1);
const AGE: PropId = PropId(2);
const KNOWS: TypeId = TypeId(1);
const LIKES: TypeId = TypeId(2);

#[test]
fn scans_merge_overlay_with_committed_nodes() -> Result<()> {
    let fx = Fixture::new();
    let ada = fx.store.create_node(&[PERSON], &[]);
    let bob = fx.store.create_node(&[PERSON, ADMIN], &[]);
    let cy = fx.store.create_node(&[], &[]);
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    let fresh = ops.node_create()?;
    ops.node_add_label(fresh, ADMIN)?;
    ops.node_delete(ada)?;
    ops.node_add_label(cy, PERSON)?;

    assert_eq!(ops.all_nodes_scan()?, vec![bob, cy, fresh]);
    assert_eq!(ops.node_label_scan(PERSON)?, vec![bob, cy]);
    assert_eq!(ops.node_label_scan(ADMIN)?, vec![bob, fresh]);
    assert_eq!(ops.node_label_union_scan(&[PERSON, ADMIN])?, vec![bob, cy, fresh]);
    assert_eq!(ops.node_label_intersection_scan(&[PERSON, ADMIN])?, vec![bob]);
    assert!(ops.single_node(ada)?.is_none());
    let record = ops.single_node(cy)?.expect("cy is visible");
    assert!(record.has_label(PERSON));
    Ok(())
}

#[test]
fn index_seek_reads_own_writes() -> Result<()> {
    let fx = Fixture::new();
    let index = fx.catalog.create_index(PERSON, &[AGE]);
    let young = fx.store.create_node(&[PERSON], &[(AGE, 20i64.into())]);
    let old = fx.store.create_node(&[PERSON], &[(AGE, 70i64.into())]);
    let joining = fx.store.create_node(&[], &[(AGE, 35i64.into())]);
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    ops.node_add_label(joining, PERSON)?;
    ops.node_remove_label(old, PERSON)?;

    let found = ops.node_index_scan(&index, IndexOrder::Ascending)?;
    let nodes: Vec<NodeId> = found.iter().map(|entry| entry.node).collect();
    assert_eq!(nodes, vec![young, joining]);

    let range = IndexQuery::Range {
        prop: AGE,
        lower: Bound::Included(PropValue::Int(30)),
        upper: Bound::Unbounded,
    };
    let found = ops.node_index_seek(&index, IndexOrder::None, &[range])?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].node, joining);

    let exact = IndexQuery::Exact(AGE, PropValue::Int(70));
    assert!(ops.node_index_seek(&index, IndexOrder::None, &[exact])?.is_empty());

    let descending = ops.node_index_scan(&index, IndexOrder::Descending)?;
    assert_eq!(descending.first().map(|entry| entry.node), Some(joining));
    Ok(())
}

#[test]
fn schema_lookup_finds_defined_indexes() -> Result<()> {
    let fx = Fixture::new();
    let index = fx.catalog.create_index(PERSON, &[NAME]);
    let mut tx = fx.kernel.begin_transaction();
    let ops = tx.operations();
    assert_eq!(ops.index(PERSON, &[NAME])?, Some(index.clone()));
    assert_eq!(ops.index(PERSON, &[AGE])?, None);
    assert_eq!(ops.indexes_for_label(PERSON)?, vec![index]);
    Ok(())
}

#[test]
fn relationship_reads_hide_deleted_endpoints() -> Result<()> {
    let fx = Fixture::new();
    let a = fx.store.create_node(&[], &[]);
    let b = fx.store.create_node(&[], &[]);
    let c = fx.store.create_node(&[], &[]);
    let ab = fx.store.create_relationship(a, KNOWS, b, &[(NAME, "since 2001".into())]);
    let ac = fx.store.create_relationship(a, LIKES, c, &[]);
    let ca = fx.store.create_relationship(c, KNOWS, a, &[]);
    let aa = fx.store.create_relationship(a, KNOWS, a, &[]);
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    assert_eq!(ops.relationship_type_scan(KNOWS)?, vec![ab, ca, aa]);
    assert_eq!(
        ops.relationship_groups(a)?,
        vec![
            RelationshipGroup {
                ty: KNOWS,
                outgoing: 1,
                incoming: 1,
                loops: 1
            },
            RelationshipGroup {
                ty: LIKES,
                outgoing: 1,
                incoming: 0,
                loops: 0
            },
        ]
    );
    assert_eq!(ops.relationship_properties(ab)?.len(), 1);

    ops.node_delete(c)?;
    assert_eq!(ops.all_relationships_scan()?, vec![ab, aa]);
    assert!(ops.single_relationship(ac)?.is_none());
    let out: Vec<RelId> = ops
        .relationships(a, Dir::Out)?
        .iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(out, vec![ab, aa]);
    assert!(ops.relationships(c, Dir::Both)?.is_empty());
    Ok(())
}

#[test]
fn property_reads_follow_the_overlay() -> Result<()> {
    let fx = Fixture::new();
    let node = fx.store.create_node(&[], &[(NAME, "ada".into())]);
    fx.store.set_graph_property(NAME, "graph".into());
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    assert_eq!(ops.node_properties(node)?, vec![(NAME, PropValue::from("ada"))]);
    assert_eq!(ops.graph_properties()?, vec![(NAME, PropValue::from("graph"))]);
    let fresh = ops.node_create()?;
    assert!(ops.node_properties(fresh)?.is_empty());
    ops.node_delete(node)?;
    assert!(ops.node_properties(node)?.is_empty());
    Ok(())
}

#[test]
fn future_reference_reads_validate_against_merged_view() -> Result<()> {
    let fx = Fixture::new();
    let a = fx.store.create_node(&[], &[]);
    let b = fx.store.create_node(&[], &[]);
    let rel = fx.store.create_relationship(a, KNOWS, b, &[]);
    let mut tx = fx.kernel.begin_transaction();
    let mut ops = tx.operations();

    let fresh = ops.node_create()?;
    ops.future_node_reference_read(fresh)?;
    ops.future_node_property_reference_read(a)?;
    ops.future_relationship_reference_read(rel)?;
    ops.future_relationship_property_reference_read(rel)?;

    ops.node_delete(b)?;
    assert_eq!(
        ops.future_node_reference_read(b),
        Err(KernelError::EntityNotFound {
            entity: EntityType::Node,
            id: b.0
        })
    );
    assert_eq!(
        ops.future_relationship_reference_read(rel),
        Err(KernelError::EntityNotFound {
            entity: EntityType::Relationship,
            id: rel.0
        })
    );
    assert!(ops.future_node_property_reference_read(NodeId(999)).is_err());
    Ok(())
}

#[test]
fn transactions_do_not_see_each_others_overlay() -> Result<()> {
    let fx = Fixture::new();
    let committed = fx.store.create_node(&[PERSON], &[]);
    let mut first = fx.kernel.begin_transaction();
    let mut second = fx.kernel.begin_transaction();

    let fresh = first.operations().node_create()?;
    first.operations().node_remove_label(committed, PERSON)?;

    let ops = second.operations();
    assert!(!ops.node_exists(fresh)?);
    assert_eq!(ops.node_label_scan(PERSON)?, vec![committed]);
    Ok(())
}

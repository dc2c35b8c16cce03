//! Named, manually maintained indexes mapping `key = value` pairs to entities.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::info;

use crate::types::{KernelError, PropValue, Result};

/// Configuration of an explicit index as string key/value pairs.
pub type ExplicitIndexConfig = BTreeMap<String, String>;

/// Backing store for explicit indexes.
///
/// Lookups return raw entity ids; the kernel applies transaction-local
/// removals and deletions on top.
pub trait ExplicitIndexStore: Send + Sync {
    /// Creates the node index `name` unless it exists. Returns the effective
    /// configuration, failing when an existing index disagrees with `config`.
    fn create_node_index_if_absent(
        &self,
        name: &str,
        config: &ExplicitIndexConfig,
    ) -> Result<ExplicitIndexConfig>;

    /// Whether the node index `name` exists.
    fn node_index_exists(&self, name: &str) -> Result<bool>;

    /// Nodes stored under exactly `key = value`.
    fn node_get(&self, name: &str, key: &str, value: &PropValue) -> Result<Vec<u64>>;

    /// Nodes matching `query`, under `key` or under any key.
    fn node_query(&self, name: &str, key: Option<&str>, query: &str) -> Result<Vec<u64>>;

    /// Relationships stored under exactly `key = value`.
    fn relationship_get(&self, name: &str, key: &str, value: &PropValue) -> Result<Vec<u64>>;

    /// Relationships matching `query`, under `key` or under any key.
    fn relationship_query(&self, name: &str, key: Option<&str>, query: &str) -> Result<Vec<u64>>;
}

#[derive(Debug, Default)]
struct Index {
    config: ExplicitIndexConfig,
    entries: BTreeMap<String, Vec<(PropValue, u64)>>,
}

impl Index {
    fn get(&self, key: &str, value: &PropValue) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .entries
            .get(key)
            .into_iter()
            .flatten()
            .filter(|(stored, _)| stored == value)
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// `*` matches everything, a trailing `*` matches by prefix, anything
    /// else must equal the value's text form.
    fn query(&self, key: Option<&str>, query: &str) -> Vec<u64> {
        let matches = |value: &PropValue| {
            let text = value.to_string();
            match query.strip_suffix('*') {
                Some(prefix) => text.starts_with(prefix),
                None => text == query,
            }
        };
        let mut ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|(k, _)| key.map_or(true, |key| key == k.as_str()))
            .flat_map(|(_, entries)| entries.iter())
            .filter(|(value, _)| matches(value))
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Default)]
struct Indexes {
    nodes: BTreeMap<String, Index>,
    relationships: BTreeMap<String, Index>,
}

fn create_if_absent(
    indexes: &mut BTreeMap<String, Index>,
    name: &str,
    config: &ExplicitIndexConfig,
) -> Result<ExplicitIndexConfig> {
    if let Some(existing) = indexes.get(name) {
        if let Some((key, _)) = config
            .iter()
            .find(|(key, value)| existing.config.get(*key) != Some(*value))
        {
            return Err(KernelError::ExplicitIndexConfigMismatch {
                name: name.to_owned(),
                key: key.clone(),
            });
        }
        return Ok(existing.config.clone());
    }
    indexes.insert(
        name.to_owned(),
        Index {
            config: config.clone(),
            entries: BTreeMap::new(),
        },
    );
    info!(index = name, "explicit index created");
    Ok(config.clone())
}

fn lookup<'a>(indexes: &'a BTreeMap<String, Index>, name: &str) -> Result<&'a Index> {
    indexes
        .get(name)
        .ok_or_else(|| KernelError::ExplicitIndexNotFound(name.to_owned()))
}

fn lookup_mut<'a>(indexes: &'a mut BTreeMap<String, Index>, name: &str) -> Result<&'a mut Index> {
    indexes
        .get_mut(name)
        .ok_or_else(|| KernelError::ExplicitIndexNotFound(name.to_owned()))
}

/// In-memory explicit index store.
#[derive(Debug, Default)]
pub struct MemoryExplicitIndexStore {
    indexes: RwLock<Indexes>,
}

impl MemoryExplicitIndexStore {
    /// Creates a store with no indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` under `key = value` in the node index `name`.
    pub fn add_node(&self, name: &str, key: &str, value: PropValue, node: u64) -> Result<()> {
        let mut indexes = self.indexes.write();
        let index = lookup_mut(&mut indexes.nodes, name)?;
        index.entries.entry(key.to_owned()).or_default().push((value, node));
        Ok(())
    }

    /// Creates the relationship index `name` unless it exists.
    pub fn create_relationship_index_if_absent(
        &self,
        name: &str,
        config: &ExplicitIndexConfig,
    ) -> Result<ExplicitIndexConfig> {
        create_if_absent(&mut self.indexes.write().relationships, name, config)
    }

    /// Stores `relationship` under `key = value` in the relationship index `name`.
    pub fn add_relationship(
        &self,
        name: &str,
        key: &str,
        value: PropValue,
        relationship: u64,
    ) -> Result<()> {
        let mut indexes = self.indexes.write();
        let index = lookup_mut(&mut indexes.relationships, name)?;
        index
            .entries
            .entry(key.to_owned())
            .or_default()
            .push((value, relationship));
        Ok(())
    }
}

impl ExplicitIndexStore for MemoryExplicitIndexStore {
    fn create_node_index_if_absent(
        &self,
        name: &str,
        config: &ExplicitIndexConfig,
    ) -> Result<ExplicitIndexConfig> {
        create_if_absent(&mut self.indexes.write().nodes, name, config)
    }

    fn node_index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.read().nodes.contains_key(name))
    }

    fn node_get(&self, name: &str, key: &str, value: &PropValue) -> Result<Vec<u64>> {
        Ok(lookup(&self.indexes.read().nodes, name)?.get(key, value))
    }

    fn node_query(&self, name: &str, key: Option<&str>, query: &str) -> Result<Vec<u64>> {
        Ok(lookup(&self.indexes.read().nodes, name)?.query(key, query))
    }

    fn relationship_get(&self, name: &str, key: &str, value: &PropValue) -> Result<Vec<u64>> {
        Ok(lookup(&self.indexes.read().relationships, name)?.get(key, value))
    }

    fn relationship_query(&self, name: &str, key: Option<&str>, query: &str) -> Result<Vec<u64>> {
        Ok(lookup(&self.indexes.read().relationships, name)?.query(key, query))
    }
}

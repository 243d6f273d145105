//! Dependency-respecting ordering over arbitrary node sets.
//!
//! Nodes name their dependencies ("parents") through a lookup function; every
//! node is emitted after all of its parents.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{PhysmError, Result};

struct Visitor<'a, N, K> {
    key: &'a dyn Fn(&N) -> K,
    parents: &'a dyn Fn(&N) -> Vec<N>,
    in_progress: HashSet<K>,
    emitted: HashSet<K>,
    sorted: Vec<N>,
}

impl<N, K> Visitor<'_, N, K>
where
    N: Clone,
    K: Eq + Hash + Clone + Debug,
{
    fn visit(&mut self, node: &N) -> Result<()> {
        let node_key = (self.key)(node);
        if self.in_progress.contains(&node_key) {
            return Err(PhysmError::CyclicGraph(format!("{node_key:?}")));
        }
        if self.emitted.contains(&node_key) {
            return Ok(());
        }
        self.in_progress.insert(node_key.clone());
        for parent in (self.parents)(node) {
            self.visit(&parent)?;
        }
        self.in_progress.remove(&node_key);
        self.emitted.insert(node_key);
        self.sorted.push(node.clone());
        Ok(())
    }
}

/// Orders `nodes` so that every node follows its parents.
///
/// Parents reachable only through the lookup are included as well. Nodes that
/// are already in dependency order keep their relative order.
pub fn toposort<N, K>(
    nodes: &[N],
    key: impl Fn(&N) -> K,
    parents: impl Fn(&N) -> Vec<N>,
) -> Result<Vec<N>>
where
    N: Clone,
    K: Eq + Hash + Clone + Debug,
{
    let mut visitor = Visitor {
        key: &key,
        parents: &parents,
        in_progress: HashSet::new(),
        emitted: HashSet::new(),
        sorted: Vec::with_capacity(nodes.len()),
    };
    for node in nodes {
        visitor.visit(node)?;
    }
    Ok(visitor.sorted)
}

/// Maps every node key to the nodes that list it as a parent.
///
/// Leaves map to an empty list; children appear in dependency order.
pub fn child_map<N, K>(
    nodes: &[N],
    key: impl Fn(&N) -> K,
    parents: impl Fn(&N) -> Vec<N>,
) -> Result<HashMap<K, Vec<N>>>
where
    N: Clone,
    K: Eq + Hash + Clone + Debug,
{
    let sorted = toposort(nodes, &key, &parents)?;
    let mut children: HashMap<K, Vec<N>> = HashMap::with_capacity(sorted.len());
    for node in &sorted {
        children.entry(key(node)).or_default();
        for parent in parents(node) {
            children.entry(key(&parent)).or_default().push(node.clone());
        }
    }
    Ok(children)
}

/// Folds a value down the graph: each node sees the values of its parents.
pub fn transform_nodes<N, K, V>(
    nodes: &[N],
    key: impl Fn(&N) -> K,
    parents: impl Fn(&N) -> Vec<N>,
    mut visit: impl FnMut(&N, &[&V]) -> V,
) -> Result<HashMap<K, V>>
where
    N: Clone,
    K: Eq + Hash + Clone + Debug,
{
    let sorted = toposort(nodes, &key, &parents)?;
    let mut values: HashMap<K, V> = HashMap::with_capacity(sorted.len());
    for node in &sorted {
        let parent_keys: Vec<K> = parents(node).iter().map(&key).collect();
        let value = {
            let parent_values: Vec<&V> = parent_keys
                .iter()
                .filter_map(|parent_key| values.get(parent_key))
                .collect();
            visit(node, &parent_values)
        };
        values.insert(key(node), value);
    }
    Ok(values)
}

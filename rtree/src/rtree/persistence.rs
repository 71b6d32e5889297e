use common::shapes::Cuboid;
use fxhash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::shape::validate_cuboid;
use super::*;
use crate::error::{RTreeError, RTreeResult};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord<V> {
    /// `None` for free slots.
    cuboids: Vec<Option<Cuboid>>,
    slots: Vec<Slot<V>>,
    parent: Option<NodeIndex>,
    leaf_end: usize,
    child_begin: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeRecord<V> {
    node_width: usize,
    nodes: Vec<NodeRecord<V>>,
    empty_slots: Vec<NodeIndex>,
    to_comb: Vec<NodeIndex>,
}

impl<V, P, const N: usize> RTree<V, P, N>
where
    V: LeafValue + Serialize + DeserializeOwned,
    P: MergePolicy,
{
    /// The arena verbatim, tombstones and pending comb marks included.
    pub fn to_json(&self) -> RTreeResult<serde_json::Value> {
        let mut empty_slots: Vec<NodeIndex> = self.empty_slots.iter().copied().collect();
        empty_slots.sort_unstable();
        let mut to_comb: Vec<NodeIndex> = self.to_comb.iter().copied().collect();
        to_comb.sort_unstable();
        let record = TreeRecord {
            node_width: N,
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeRecord {
                    cuboids: (0..N)
                        .map(|slot| (!node.cuboids.is_null(slot)).then(|| node.cuboid(slot)))
                        .collect(),
                    slots: node.slots.to_vec(),
                    parent: node.parent,
                    leaf_end: node.leaf_end,
                    child_begin: node.child_begin,
                })
                .collect(),
            empty_slots,
            to_comb,
        };
        Ok(serde_json::to_value(record)?)
    }

    pub fn to_json_string(&self) -> RTreeResult<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }

    /// Rebuilds a tree written by [`RTree::to_json`]. The slot layout and
    /// the parent and child links are checked, then loaded as is.
    pub fn from_json(value: serde_json::Value, config: Config) -> RTreeResult<Self> {
        let record: TreeRecord<V> = serde_json::from_value(value)?;
        if record.node_width != N {
            return Err(RTreeError::invalid_snapshot(format!(
                "node width {} does not match {}",
                record.node_width, N
            )));
        }
        if record.nodes.is_empty() {
            return Err(RTreeError::invalid_snapshot("no root node"));
        }
        let count = record.nodes.len();
        let in_range = |index: &NodeIndex| index.get() < count;
        let mut nodes = Vec::with_capacity(count);
        for (position, entry) in record.nodes.into_iter().enumerate() {
            nodes.push(node_from_record(position, entry, &in_range)?);
        }
        if nodes[0].parent.is_some() {
            return Err(RTreeError::invalid_snapshot("root node has a parent"));
        }
        if !record.empty_slots.iter().chain(record.to_comb.iter()).all(in_range) {
            return Err(RTreeError::invalid_snapshot("node index out of range"));
        }
        if record.empty_slots.contains(&NodeIndex::ROOT) {
            return Err(RTreeError::invalid_snapshot("root node is tombstoned"));
        }
        let tree = Self {
            nodes,
            empty_slots: record.empty_slots.into_iter().collect::<FxHashSet<_>>(),
            to_comb: record.to_comb.into_iter().collect::<FxHashSet<_>>(),
            config: config.normalized(),
            generation: 0,
            policy: PhantomData,
        };
        tree.check_links()?;
        Ok(tree)
    }

    /// Every live node is reached exactly once from the root, and every
    /// child names the node holding its branch as its parent.
    fn check_links(&self) -> RTreeResult<()> {
        let mut reached = FxHashSet::default();
        let mut stack = NodeStack::new();
        stack.push(NodeIndex::ROOT);
        while let Some(index) = stack.pop() {
            if !reached.insert(index) {
                return Err(RTreeError::invalid_snapshot(format!(
                    "node {:?} is reached twice",
                    index
                )));
            }
            if self.empty_slots.contains(&index) {
                return Err(RTreeError::invalid_snapshot(format!(
                    "tombstone {:?} is reachable",
                    index
                )));
            }
            for (_, child) in self.node(index).branches() {
                if self.node(child).parent != Some(index) {
                    return Err(RTreeError::invalid_snapshot(format!(
                        "node {:?} does not name {:?} as its parent",
                        child, index
                    )));
                }
                stack.push(child);
            }
        }
        if reached.len() != self.node_count() {
            return Err(RTreeError::invalid_snapshot("live nodes are unreachable from the root"));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str, config: Config) -> RTreeResult<Self> {
        Self::from_json(serde_json::from_str(json)?, config)
    }
}

fn node_from_record<V: LeafValue, const N: usize>(
    position: usize,
    record: NodeRecord<V>,
    in_range: &impl Fn(&NodeIndex) -> bool,
) -> RTreeResult<Node<V, N>> {
    let malformed = |reason: &str| RTreeError::invalid_snapshot(format!("node {}: {}", position, reason));
    if record.cuboids.len() != N || record.slots.len() != N {
        return Err(malformed("slot count does not match node width"));
    }
    if record.leaf_end > record.child_begin || record.child_begin > N {
        return Err(malformed("leaf and branch regions overlap"));
    }
    if let Some(parent) = &record.parent {
        if !in_range(parent) {
            return Err(malformed("parent out of range"));
        }
    }
    let mut node = Node::new(record.parent);
    for slot in 0..N {
        let cuboid = record.cuboids[slot];
        let valid = match (record.slots[slot], cuboid) {
            (Slot::Leaf(_), Some(_)) => slot < record.leaf_end,
            (Slot::Branch(child), Some(_)) => slot >= record.child_begin && in_range(&child),
            (Slot::Empty, None) => slot >= record.leaf_end && slot < record.child_begin,
            _ => false,
        };
        if !valid {
            return Err(malformed("slot does not match its region"));
        }
        if let Some(cuboid) = cuboid {
            validate_cuboid(&cuboid)
                .map_err(|_| malformed("stored cuboid is not a valid shape"))?;
            node.cuboids.insert(slot, &cuboid);
        }
        node.slots[slot] = record.slots[slot];
    }
    node.leaf_end = record.leaf_end;
    node.child_begin = record.child_begin;
    Ok(node)
}

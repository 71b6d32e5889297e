use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use fxhash::FxHashSet;
use smallvec::SmallVec;

mod config;
mod core;
mod cuboid_array;
mod data;
mod inspect;
mod maintenance;
mod node;
mod persistence;
mod policy;
mod query;
mod remove;
mod shape;
mod split;

pub use self::config::Config;
pub use self::cuboid_array::{CuboidArray, SlotMask, NULL_COORDINATE};
pub use self::inspect::{NodeHandle, NodeView};
pub use self::node::NodeIndex;
pub use self::policy::{LowZOnly, MergePolicy, Standard};
pub use self::shape::QueryShape;

pub(crate) use self::node::{Node, Slot};

pub const DEFAULT_NODE_WIDTH: usize = 32;

/// Payload stored with every leaf. Boolean trees use `()`.
pub trait LeafValue: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> LeafValue for T {}

pub(crate) type NodeStack = SmallVec<[NodeIndex; 64]>;

/// Index of occupied cells on an integer grid, stored as a partition of
/// non-overlapping leaf cuboids in a fixed fanout tree.
///
/// Nodes live in a dense arena addressed by [`NodeIndex`]; the root is
/// always slot 0. Mutations leave destroyed nodes tombstoned and touched
/// nodes marked for combing; [`RTree::prepare`] merges, compacts and
/// reorders the arena. Queries are correct at any time.
#[derive(Debug, Clone)]
pub struct RTree<V: LeafValue = (), P: MergePolicy = Standard, const N: usize = DEFAULT_NODE_WIDTH> {
    nodes: Vec<Node<V, N>>,
    empty_slots: FxHashSet<NodeIndex>,
    to_comb: FxHashSet<NodeIndex>,
    config: Config,
    generation: u64,
    policy: PhantomData<fn() -> P>,
}

/// Occupancy only.
pub type RTreeBoolean<const N: usize = DEFAULT_NODE_WIDTH> = RTree<(), Standard, N>;

/// Each occupied cell carries a value; leaves only merge when values match.
pub type RTreeData<T, const N: usize = DEFAULT_NODE_WIDTH> = RTree<T, Standard, N>;

/// Occupancy where leaves never span more than one z level and lines only
/// hit a leaf through its bottom face.
pub type RTreeBooleanLowZOnly<const N: usize = DEFAULT_NODE_WIDTH> = RTree<(), LowZOnly, N>;

impl<V: LeafValue, P: MergePolicy, const N: usize> Default for RTree<V, P, N> {
    fn default() -> Self {
        Self::new()
    }
}

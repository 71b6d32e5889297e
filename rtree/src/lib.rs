pub mod error;
pub mod rtree;

#[cfg(test)]
mod proptests;

pub use common::shapes;
pub use error::{RTreeError, RTreeResult};
pub use rtree::{
    Config, CuboidArray, LeafValue, LowZOnly, MergePolicy, NodeHandle, NodeIndex, NodeView,
    QueryShape, RTree, RTreeBoolean, RTreeBooleanLowZOnly, RTreeData, SlotMask, Standard,
    DEFAULT_NODE_WIDTH,
};

//! Test support for tree-construction fixtures.

pub mod tree_construction;

//! Sparse Merkle Tree over the BN254 scalar field.
//!
//! This module provides:
//! - Native SMT operations (update, proof generation)
//! - Sibling-path proofs that recompute the root from (index, leaf)
//! - In-circuit path verification gadgets

mod tree;
mod proof;
mod gadgets;


pub use tree::{SparseMerkleTree, TreeError, MAX_DEPTH};
pub use proof::{index_bits, MerkleProof};
pub use gadgets::{compute_root_from_path, index_bits_var, MerkleProofVar};

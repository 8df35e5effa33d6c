//! Sparse Merkle Tree native implementation.
//!
//! The leaf domain has 2^depth positions, almost all of which hold the default
//! leaf. Only nodes that differ from the default subtree hash at their level
//! are stored, so memory grows with the number of updates, not the domain.
//!
//! Levels are numbered from the root: level 0 holds the root, level `depth`
//! holds the leaves.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::{BigInteger, BigInteger256, PrimeField, Zero};
use thiserror::Error;

use crate::poseidon::hash2;
use super::proof::MerkleProof;

/// Deepest supported tree. Every field element fits in a 254-bit index, so a
/// full-depth tree can be keyed directly by hash outputs.
pub const MAX_DEPTH: usize = Fr::MODULUS_BIT_SIZE as usize;

/// Precondition failures on the tree API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Invalid tree depth {depth}: must be between 1 and {max}")]
    InvalidDepth { depth: usize, max: usize },
    #[error("Leaf index {index} does not fit a tree of depth {depth}")]
    IndexOutOfRange { index: Fr, depth: usize },
}

/// Sparse Merkle Tree with field-element leaves and indices.
#[derive(Clone, Debug)]
pub struct SparseMerkleTree {
    /// Number of levels below the root
    depth: usize,

    /// Sparse node storage: (level, position) -> hash
    /// Entries equal to `defaults[level]` are never stored.
    nodes: HashMap<(usize, BigInteger256), Fr>,

    /// Hash of an all-default subtree rooted at each level
    /// defaults[depth] = default leaf
    /// defaults[l] = hash2(defaults[l + 1], defaults[l + 1])
    defaults: Vec<Fr>,
}

impl SparseMerkleTree {
    /// Create an empty tree whose leaves default to zero.
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        Self::with_default_leaf(depth, Fr::zero())
    }

    /// Create an empty tree with an explicit default leaf value.
    pub fn with_default_leaf(depth: usize, default_leaf: Fr) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth {
                depth,
                max: MAX_DEPTH,
            });
        }

        Ok(Self {
            depth,
            nodes: HashMap::new(),
            defaults: Self::compute_defaults(depth, default_leaf),
        })
    }

    fn compute_defaults(depth: usize, default_leaf: Fr) -> Vec<Fr> {
        let mut defaults = vec![default_leaf; depth + 1];
        for level in (0..depth).rev() {
            let child = defaults[level + 1];
            defaults[level] = hash2(child, child);
        }
        defaults
    }

    /// Convert a leaf index to a tree position, checking it fits.
    fn position(&self, index: Fr) -> Result<BigInteger256, TreeError> {
        let position = index.into_bigint();
        if position.num_bits() as usize > self.depth {
            return Err(TreeError::IndexOutOfRange {
                index,
                depth: self.depth,
            });
        }
        Ok(position)
    }

    fn sibling_of(position: BigInteger256) -> BigInteger256 {
        let mut sibling = position;
        sibling.0[0] ^= 1;
        sibling
    }

    /// Get a node hash, returning the level default if not stored.
    fn node(&self, level: usize, position: &BigInteger256) -> Fr {
        self.nodes
            .get(&(level, *position))
            .copied()
            .unwrap_or(self.defaults[level])
    }

    fn set_node(&mut self, level: usize, position: BigInteger256, value: Fr) {
        if value == self.defaults[level] {
            self.nodes.remove(&(level, position));
        } else {
            self.nodes.insert((level, position), value);
        }
    }

    /// Write `value` at `index` and recompute every ancestor.
    /// Returns the new root.
    pub fn update(&mut self, index: Fr, value: Fr) -> Result<Fr, TreeError> {
        let mut position = self.position(index)?;

        self.set_node(self.depth, position, value);
        let mut current = value;

        for level in (1..=self.depth).rev() {
            let sibling = self.node(level, &Self::sibling_of(position));
            let parent = if position.is_even() {
                hash2(current, sibling)
            } else {
                hash2(sibling, current)
            };

            position.div2();
            self.set_node(level - 1, position, parent);
            current = parent;
        }

        Ok(current)
    }

    /// Sibling path from the leaf at `index` up to the root.
    pub fn proof(&self, index: Fr) -> Result<MerkleProof, TreeError> {
        let mut position = self.position(index)?;
        let mut path = Vec::with_capacity(self.depth);

        for level in (1..=self.depth).rev() {
            path.push(self.node(level, &Self::sibling_of(position)));
            position.div2();
        }

        Ok(MerkleProof::new(path))
    }

    /// Current leaf value at `index` (the default leaf if never set).
    pub fn get(&self, index: Fr) -> Result<Fr, TreeError> {
        let position = self.position(index)?;
        Ok(self.node(self.depth, &position))
    }

    /// Get the current root hash.
    pub fn root(&self) -> Fr {
        self.node(0, &BigInteger256::from(0u64))
    }

    /// Get the tree depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Default subtree hash at `level` (0 = empty root, depth = default leaf).
    pub fn default_at_level(&self, level: usize) -> Fr {
        self.defaults[level]
    }

    /// Number of materialised non-default nodes.
    pub fn stored_nodes(&self) -> usize {
        self.nodes.len()
    }
}

//! Sibling-path proofs for SMT leaves.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};

use crate::poseidon::hash2;

/// Direction bits of a leaf index, leaf level first.
/// `true` means the node at that level is a right child.
pub fn index_bits(index: Fr, depth: usize) -> Vec<bool> {
    let bits = index.into_bigint();
    (0..depth).map(|i| bits.get_bit(i)).collect()
}

/// A Merkle proof for an SMT leaf.
///
/// Holds one sibling hash per level, ordered from the leaf level up to the
/// level just below the root. The proof is a plain value: it stays valid for
/// the root it was taken from no matter what happens to the tree afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    path: Vec<Fr>,
}

impl MerkleProof {
    /// Create a new Merkle proof.
    pub fn new(path: Vec<Fr>) -> Self {
        Self { path }
    }

    /// Get the proof path (sibling hashes).
    pub fn path(&self) -> &[Fr] {
        &self.path
    }

    /// Consume the proof, returning the sibling hashes.
    pub fn into_path(self) -> Vec<Fr> {
        self.path
    }

    /// Get the proof depth (number of levels).
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Recompute the root from a leaf value at `index`.
    pub fn compute_root(&self, index: Fr, leaf: Fr) -> Fr {
        let directions = index_bits(index, self.depth());

        self.path
            .iter()
            .zip(directions)
            .fold(leaf, |current, (sibling, is_right)| {
                if is_right {
                    // Current is right child: H(sibling, current)
                    hash2(*sibling, current)
                } else {
                    // Current is left child: H(current, sibling)
                    hash2(current, *sibling)
                }
            })
    }

    /// Check that `leaf` at `index` hashes up to `root`.
    pub fn verify(&self, root: Fr, index: Fr, leaf: Fr) -> bool {
        self.compute_root(index, leaf) == root
    }
}

#[cfg(test)]
mod proof_tests {
    use super::*;

    #[test]
    fn test_proof_structure() {
        let path = vec![Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)];
        let proof = MerkleProof::new(path.clone());

        assert_eq!(proof.depth(), 3);
        assert_eq!(proof.path(), &path);
        assert_eq!(proof.into_path(), path);
    }

    #[test]
    fn test_index_bits_little_endian() {
        assert_eq!(index_bits(Fr::from(6u64), 4), vec![false, true, true, false]);
        assert_eq!(index_bits(Fr::from(1u64), 2), vec![true, false]);
    }

    #[test]
    fn test_compute_root_by_hand() {
        let siblings = vec![Fr::from(10u64), Fr::from(20u64)];
        let proof = MerkleProof::new(siblings);
        let leaf = Fr::from(5u64);

        // index 2 = 0b10: left at level 0, right at level 1
        let expected = hash2(Fr::from(20u64), hash2(leaf, Fr::from(10u64)));
        assert_eq!(proof.compute_root(Fr::from(2u64), leaf), expected);
    }

    #[test]
    fn test_different_leaves_different_roots() {
        let proof = MerkleProof::new(vec![Fr::from(1u64), Fr::from(2u64)]);

        let root1 = proof.compute_root(Fr::from(1u64), Fr::from(100u64));
        let root2 = proof.compute_root(Fr::from(1u64), Fr::from(101u64));

        assert_ne!(root1, root2);
        assert!(proof.verify(root1, Fr::from(1u64), Fr::from(100u64)));
        assert!(!proof.verify(root1, Fr::from(1u64), Fr::from(101u64)));
    }
}

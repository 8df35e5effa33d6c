//! In-circuit SMT verification gadgets.
//!
//! These gadgets recompute a root from a leaf, its index and a sibling path,
//! mirroring `MerkleProof::compute_root` constraint for constraint.

use ark_bn254::Fr;
use ark_r1cs_std::{
    prelude::*,
    fields::fp::FpVar,
    boolean::Boolean,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::poseidon::hash2_var;
use super::proof::MerkleProof;

/// Circuit variable representation of a sibling path.
#[derive(Clone)]
pub struct MerkleProofVar {
    /// Sibling hashes as circuit variables
    path: Vec<FpVar<Fr>>,
}

impl MerkleProofVar {
    /// Allocate a Merkle proof as witness variables.
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        proof: &MerkleProof,
    ) -> Result<Self, SynthesisError> {
        let path = proof
            .path()
            .iter()
            .map(|h| FpVar::new_witness(cs.clone(), || Ok(*h)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { path })
    }

    /// Get the path variables.
    pub fn path(&self) -> &[FpVar<Fr>] {
        &self.path
    }

    /// Get the proof depth.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Decompose `index` into `depth` direction bits (leaf level first).
///
/// The full canonical decomposition is range-checked against the field
/// modulus and every bit at or above `depth` is forced to zero, so an index
/// that does not fit the tree cannot satisfy the circuit.
pub fn index_bits_var(
    index: &FpVar<Fr>,
    depth: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let bits = index.to_bits_le()?;
    if depth > bits.len() {
        return Err(SynthesisError::Unsatisfiable);
    }

    for bit in &bits[depth..] {
        bit.enforce_equal(&Boolean::FALSE)?;
    }

    Ok(bits[..depth].to_vec())
}

/// Compute the root hash from a leaf, its direction bits and a Merkle path
/// in-circuit.
pub fn compute_root_from_path(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    directions: &[Boolean<Fr>],
    proof: &MerkleProofVar,
) -> Result<FpVar<Fr>, SynthesisError> {
    if directions.len() != proof.depth() {
        return Err(SynthesisError::Unsatisfiable);
    }

    let mut current = leaf.clone();

    for (sibling, is_right) in proof.path.iter().zip(directions.iter()) {
        // If is_right: H(sibling, current), else H(current, sibling)
        let left = is_right.select(sibling, &current)?;
        let right = is_right.select(&current, sibling)?;

        current = hash2_var(cs.clone(), &left, &right)?;
    }

    Ok(current)
}

#[cfg(test)]
mod gadget_tests {
    use super::*;
    use crate::smt::SparseMerkleTree;
    use ark_ff::Zero;
    use ark_relations::r1cs::ConstraintSystem;

    const DEPTH: usize = 8;

    fn tree_with_leaf(index: u64, value: u64) -> SparseMerkleTree {
        let mut tree = SparseMerkleTree::new(DEPTH).unwrap();
        tree.update(Fr::from(index), Fr::from(value)).unwrap();
        tree.update(Fr::from(200u64), Fr::from(3u64)).unwrap();
        tree
    }

    fn check_membership(tree: &SparseMerkleTree, index: u64, leaf: u64) -> bool {
        let proof = tree.proof(Fr::from(index)).unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();

        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let index_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(index))).unwrap();
        let leaf_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(leaf))).unwrap();
        let proof_var = MerkleProofVar::new_witness(cs.clone(), &proof).unwrap();

        let bits = index_bits_var(&index_var, DEPTH).unwrap();
        let computed = compute_root_from_path(cs.clone(), &leaf_var, &bits, &proof_var).unwrap();
        computed.enforce_equal(&root_var).unwrap();

        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_verify_membership_valid() {
        let tree = tree_with_leaf(17, 100);
        assert!(check_membership(&tree, 17, 100));
    }

    #[test]
    fn test_verify_membership_wrong_leaf() {
        let tree = tree_with_leaf(17, 100);
        assert!(!check_membership(&tree, 17, 99));
    }

    #[test]
    fn test_verify_empty_slot() {
        let tree = tree_with_leaf(17, 100);
        assert!(check_membership(&tree, 18, 0));
    }

    #[test]
    fn test_index_above_depth_unsatisfiable() {
        let tree = tree_with_leaf(17, 100);
        let proof = tree.proof(Fr::from(17u64)).unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();

        // 17 + 2^DEPTH has the same low bits as 17
        let aliased = Fr::from(17u64 + (1u64 << DEPTH));
        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let index_var = FpVar::new_witness(cs.clone(), || Ok(aliased)).unwrap();
        let leaf_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(100u64))).unwrap();
        let proof_var = MerkleProofVar::new_witness(cs.clone(), &proof).unwrap();

        let bits = index_bits_var(&index_var, DEPTH).unwrap();
        let computed = compute_root_from_path(cs.clone(), &leaf_var, &bits, &proof_var).unwrap();
        computed.enforce_equal(&root_var).unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_direction_length_mismatch() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let proof = MerkleProof::new(vec![Fr::zero(); DEPTH]);
        let proof_var = MerkleProofVar::new_witness(cs.clone(), &proof).unwrap();
        let leaf = FpVar::new_witness(cs.clone(), || Ok(Fr::zero())).unwrap();

        let result = compute_root_from_path(cs, &leaf, &[Boolean::FALSE], &proof_var);
        assert!(result.is_err());
    }
}

//! NotBlacklisted circuit.
//!
//! Proves that a secret identifier maps to an empty blacklist slot.
//!
//! Witnesses: identifier (`IMEI`), sibling path (`path_elements`).
//! Public signals: `[root]`, the root recomputed with leaf 0 at
//! `hash1(identifier)`.
//!
//! The circuit never claims the root is the published blacklist root. It
//! exposes the root it recomputed; a blacklisted identifier yields a root that
//! differs from the published one, and the verifier rejects on mismatch.

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::derive::{blacklist_index, blacklist_index_var, NOT_BLACKLISTED};
use crate::smt::{compute_root_from_path, index_bits_var, MerkleProof, MerkleProofVar};

/// Circuit name shared by key artifacts and input maps.
pub const NOT_BLACKLISTED_CIRCUIT: &str = "proveNotBlacklisted";

/// NotBlacklisted circuit for a blacklist tree of fixed depth.
#[derive(Clone)]
pub struct NotBlacklistedCircuit {
    /// Tree depth the circuit is built for
    depth: usize,

    /// Public signal 0
    pub root: Option<Fr>,

    /// Identifier being proven absent
    pub identifier: Option<Fr>,

    /// Sibling path for `hash1(identifier)`
    pub proof: Option<MerkleProof>,
}

impl NotBlacklistedCircuit {
    /// Create an empty circuit for setup.
    /// Uses dummy values that produce valid constraint structure.
    pub fn empty(depth: usize) -> Self {
        Self {
            depth,
            root: Some(Fr::zero()),
            identifier: Some(Fr::zero()),
            proof: Some(MerkleProof::new(vec![Fr::zero(); depth])),
        }
    }

    /// Create a circuit with witnesses. The root is recomputed natively.
    pub fn new(identifier: Fr, proof: MerkleProof) -> Self {
        let root = proof.compute_root(blacklist_index(identifier), NOT_BLACKLISTED);

        Self {
            depth: proof.depth(),
            root: Some(root),
            identifier: Some(identifier),
            proof: Some(proof),
        }
    }

    /// Tree depth the circuit is built for.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Public inputs in allocation order.
    pub fn public_inputs(&self) -> Vec<Fr> {
        self.root.into_iter().collect()
    }
}

impl ConstraintSynthesizer<Fr> for NotBlacklistedCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // === Allocate public input ===
        let root_var = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // === Allocate witnesses ===
        let identifier_var = FpVar::new_witness(cs.clone(), || {
            self.identifier.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let proof = self.proof.as_ref().ok_or(SynthesisError::AssignmentMissing)?;
        if proof.depth() != self.depth {
            return Err(SynthesisError::Unsatisfiable);
        }
        let proof_var = MerkleProofVar::new_witness(cs.clone(), proof)?;

        // === Constraint 1: index = hash1(identifier) ===
        let index_var = blacklist_index_var(cs.clone(), &identifier_var)?;
        let directions = index_bits_var(&index_var, self.depth)?;

        // === Constraint 2: empty leaf at index recomputes the public root ===
        let empty_leaf = FpVar::constant(NOT_BLACKLISTED);
        let computed_root = compute_root_from_path(cs, &empty_leaf, &directions, &proof_var)?;
        computed_root.enforce_equal(&root_var)?;

        Ok(())
    }
}

//! ProofOfPayment circuit.
//!
//! Proves that the payer knows a payment leaf `hash3(rid, payId, payCycle)`
//! stored at `leafIndex` of a payment tree, and binds the proof to a
//! registered identity and a one-time nullifier.
//!
//! Witnesses: `rid`, `payId`, `payCycle`, `merkleProof`, `idNullifier`,
//! `idTrapdoor`, `leafIndex`.
//!
//! Public signals, in this order:
//! 0. payment tree root
//! 1. identity leaf `hash1(hash2(idNullifier, idTrapdoor))`
//! 2. nullifier `hash4(rid, payId, payCycle, leafIndex)`

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::derive::{
    identity_commitment, identity_leaf, identity_leaf_var, payment_leaf, payment_leaf_var,
    payment_nullifier, payment_nullifier_var,
};
use crate::smt::{compute_root_from_path, index_bits_var, MerkleProof, MerkleProofVar};

/// Circuit name shared by key artifacts and input maps.
pub const PAYMENT_CIRCUIT: &str = "proofOfPayment";

/// Secret inputs of a payment proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentWitness {
    pub rid: Fr,
    pub pay_id: Fr,
    pub pay_cycle: Fr,
    pub leaf_index: Fr,
    pub id_nullifier: Fr,
    pub id_trapdoor: Fr,
}

impl PaymentWitness {
    /// Leaf value this payment occupies in the tree.
    pub fn leaf(&self) -> Fr {
        payment_leaf(self.rid, self.pay_id, self.pay_cycle)
    }

    /// Public identity leaf bound by the proof.
    pub fn identity(&self) -> Fr {
        identity_leaf(identity_commitment(self.id_nullifier, self.id_trapdoor))
    }

    /// One-time nullifier published with the proof.
    pub fn nullifier(&self) -> Fr {
        payment_nullifier(self.rid, self.pay_id, self.pay_cycle, self.leaf_index)
    }

    fn zero() -> Self {
        Self {
            rid: Fr::zero(),
            pay_id: Fr::zero(),
            pay_cycle: Fr::zero(),
            leaf_index: Fr::zero(),
            id_nullifier: Fr::zero(),
            id_trapdoor: Fr::zero(),
        }
    }
}

/// ProofOfPayment circuit for a payment tree of fixed depth.
#[derive(Clone)]
pub struct ProofOfPaymentCircuit {
    depth: usize,

    // Public signals
    pub root: Option<Fr>,
    pub identity: Option<Fr>,
    pub nullifier: Option<Fr>,

    // Witnesses
    pub witness: Option<PaymentWitness>,
    pub proof: Option<MerkleProof>,
}

impl ProofOfPaymentCircuit {
    /// Create an empty circuit for setup.
    pub fn empty(depth: usize) -> Self {
        Self {
            depth,
            root: Some(Fr::zero()),
            identity: Some(Fr::zero()),
            nullifier: Some(Fr::zero()),
            witness: Some(PaymentWitness::zero()),
            proof: Some(MerkleProof::new(vec![Fr::zero(); depth])),
        }
    }

    /// Create a circuit with witnesses; public signals are computed natively.
    pub fn new(witness: PaymentWitness, proof: MerkleProof) -> Self {
        let root = proof.compute_root(witness.leaf_index, witness.leaf());

        Self {
            depth: proof.depth(),
            root: Some(root),
            identity: Some(witness.identity()),
            nullifier: Some(witness.nullifier()),
            witness: Some(witness),
            proof: Some(proof),
        }
    }

    /// Tree depth the circuit is built for.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Public inputs in allocation order: root, identity, nullifier.
    pub fn public_inputs(&self) -> Vec<Fr> {
        [self.root, self.identity, self.nullifier]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl ConstraintSynthesizer<Fr> for ProofOfPaymentCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // === Allocate public inputs (order defines the signal positions) ===
        let root_var = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let identity_var = FpVar::new_input(cs.clone(), || {
            self.identity.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_var = FpVar::new_input(cs.clone(), || {
            self.nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // === Allocate witnesses ===
        let witness = self.witness.as_ref();
        let alloc = |f: fn(&PaymentWitness) -> Fr| {
            FpVar::new_witness(cs.clone(), || {
                witness.map(f).ok_or(SynthesisError::AssignmentMissing)
            })
        };
        let rid_var = alloc(|w| w.rid)?;
        let pay_id_var = alloc(|w| w.pay_id)?;
        let pay_cycle_var = alloc(|w| w.pay_cycle)?;
        let leaf_index_var = alloc(|w| w.leaf_index)?;
        let id_nullifier_var = alloc(|w| w.id_nullifier)?;
        let id_trapdoor_var = alloc(|w| w.id_trapdoor)?;

        let proof = self.proof.as_ref().ok_or(SynthesisError::AssignmentMissing)?;
        if proof.depth() != self.depth {
            return Err(SynthesisError::Unsatisfiable);
        }
        let proof_var = MerkleProofVar::new_witness(cs.clone(), proof)?;

        // === Constraint 1: payment leaf is in the tree ===
        let leaf_var = payment_leaf_var(cs.clone(), &rid_var, &pay_id_var, &pay_cycle_var)?;
        let directions = index_bits_var(&leaf_index_var, self.depth)?;
        let computed_root = compute_root_from_path(cs.clone(), &leaf_var, &directions, &proof_var)?;
        computed_root.enforce_equal(&root_var)?;

        // === Constraint 2: identity leaf ===
        let computed_identity = identity_leaf_var(cs.clone(), &id_nullifier_var, &id_trapdoor_var)?;
        computed_identity.enforce_equal(&identity_var)?;

        // === Constraint 3: nullifier ===
        let computed_nullifier = payment_nullifier_var(
            cs,
            &rid_var,
            &pay_id_var,
            &pay_cycle_var,
            &leaf_index_var,
        )?;
        computed_nullifier.enforce_equal(&nullifier_var)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::SparseMerkleTree;
    use ark_relations::r1cs::ConstraintSystem;

    const DEPTH: usize = 8;

    fn witness(leaf_index: u64) -> PaymentWitness {
        PaymentWitness {
            rid: Fr::from(1111u64),
            pay_id: Fr::from(2222u64),
            pay_cycle: Fr::from(30u64),
            leaf_index: Fr::from(leaf_index),
            id_nullifier: Fr::from(7u64),
            id_trapdoor: Fr::from(8u64),
        }
    }

    fn tree_with(witness: &PaymentWitness) -> SparseMerkleTree {
        let mut tree = SparseMerkleTree::new(DEPTH).unwrap();
        tree.update(Fr::from(3u64), Fr::from(33u64)).unwrap();
        tree.update(witness.leaf_index, witness.leaf()).unwrap();
        tree
    }

    fn is_satisfied(circuit: ProofOfPaymentCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_valid_payment_satisfied() {
        let w = witness(12);
        let tree = tree_with(&w);
        let proof = tree.proof(w.leaf_index).unwrap();

        let circuit = ProofOfPaymentCircuit::new(w.clone(), proof);
        assert_eq!(
            circuit.public_inputs(),
            vec![tree.root(), w.identity(), w.nullifier()]
        );
        assert!(is_satisfied(circuit));
    }

    #[test]
    fn test_wrong_identity_unsatisfiable() {
        let w = witness(12);
        let tree = tree_with(&w);
        let proof = tree.proof(w.leaf_index).unwrap();

        let mut circuit = ProofOfPaymentCircuit::new(w, proof);
        circuit.identity = Some(Fr::from(1u64));
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_forged_nullifier_unsatisfiable() {
        let w = witness(12);
        let tree = tree_with(&w);
        let proof = tree.proof(w.leaf_index).unwrap();

        let mut circuit = ProofOfPaymentCircuit::new(w.clone(), proof);
        // Claim the nullifier of a neighbouring index.
        circuit.nullifier = Some(witness(13).nullifier());
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_root_tracks_claimed_index() {
        let w = witness(12);
        let tree = tree_with(&w);
        // Path for index 12 but the witness claims index 13.
        let proof = tree.proof(Fr::from(12u64)).unwrap();

        let circuit = ProofOfPaymentCircuit::new(witness(13), proof);
        assert_ne!(circuit.root, Some(tree.root()));
    }
}

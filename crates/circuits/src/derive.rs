//! Leaf, identity and nullifier derivations.
//!
//! Every value that lands in a tree or in a public signal is derived here, in
//! both native and in-circuit form, so the prover's witness and the
//! verifier's expectations come from the same definitions.
//!
//! | value                | definition                                   |
//! |----------------------|----------------------------------------------|
//! | blacklist index      | `hash1(identifier)`                          |
//! | payment leaf         | `hash3(rid, pay_id, pay_cycle)`              |
//! | identity commitment  | `hash2(id_nullifier, id_trapdoor)`           |
//! | identity leaf        | `hash1(identity_commitment)`                 |
//! | payment nullifier    | `hash4(rid, pay_id, pay_cycle, leaf_index)`  |

use ark_bn254::Fr;
use ark_ff::MontFp;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use rayon::prelude::*;

use crate::poseidon::{hash1, hash1_var, hash2, hash2_var, hash3, hash3_var, hash4, hash4_var};

/// Leaf value marking a blacklisted identifier.
pub const BLACKLISTED: Fr = MontFp!("1");

/// Leaf value of every identifier that was never blacklisted.
pub const NOT_BLACKLISTED: Fr = MontFp!("0");

/// Tree index of an identifier in the blacklist tree.
pub fn blacklist_index(identifier: Fr) -> Fr {
    hash1(identifier)
}

/// Blacklist indices for many identifiers at once.
pub fn blacklist_indices(identifiers: &[Fr]) -> Vec<Fr> {
    identifiers.par_iter().map(|id| blacklist_index(*id)).collect()
}

/// Leaf value recording a payment for a billing cycle.
pub fn payment_leaf(rid: Fr, pay_id: Fr, pay_cycle: Fr) -> Fr {
    hash3(rid, pay_id, pay_cycle)
}

/// Public commitment to a secret (nullifier, trapdoor) pair.
pub fn identity_commitment(id_nullifier: Fr, id_trapdoor: Fr) -> Fr {
    hash2(id_nullifier, id_trapdoor)
}

/// Registered-identity leaf derived from an identity commitment.
pub fn identity_leaf(commitment: Fr) -> Fr {
    hash1(commitment)
}

/// One-time nullifier binding a payment proof to its leaf.
pub fn payment_nullifier(rid: Fr, pay_id: Fr, pay_cycle: Fr, leaf_index: Fr) -> Fr {
    hash4(rid, pay_id, pay_cycle, leaf_index)
}

pub fn blacklist_index_var(
    cs: ConstraintSystemRef<Fr>,
    identifier: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash1_var(cs, identifier)
}

pub fn payment_leaf_var(
    cs: ConstraintSystemRef<Fr>,
    rid: &FpVar<Fr>,
    pay_id: &FpVar<Fr>,
    pay_cycle: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash3_var(cs, rid, pay_id, pay_cycle)
}

/// In-circuit `identity_leaf(identity_commitment(id_nullifier, id_trapdoor))`.
pub fn identity_leaf_var(
    cs: ConstraintSystemRef<Fr>,
    id_nullifier: &FpVar<Fr>,
    id_trapdoor: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let commitment = hash2_var(cs.clone(), id_nullifier, id_trapdoor)?;
    hash1_var(cs, &commitment)
}

pub fn payment_nullifier_var(
    cs: ConstraintSystemRef<Fr>,
    rid: &FpVar<Fr>,
    pay_id: &FpVar<Fr>,
    pay_cycle: &FpVar<Fr>,
    leaf_index: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash4_var(cs, rid, pay_id, pay_cycle, leaf_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, UniformRand, Zero};
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::eq::EqGadget;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_leaf_constants() {
        assert_eq!(BLACKLISTED, Fr::one());
        assert_eq!(NOT_BLACKLISTED, Fr::zero());
    }

    #[test]
    fn test_nullifier_deterministic_and_sensitive() {
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..3 {
            let args: [Fr; 4] = [
                Fr::rand(&mut rng),
                Fr::rand(&mut rng),
                Fr::from(30u64),
                Fr::from(12u64),
            ];
            let base = payment_nullifier(args[0], args[1], args[2], args[3]);
            assert_eq!(base, payment_nullifier(args[0], args[1], args[2], args[3]));

            for position in 0..4 {
                let mut changed = args;
                changed[position] += Fr::one();
                let other = payment_nullifier(changed[0], changed[1], changed[2], changed[3]);
                assert_ne!(base, other, "argument {} did not affect the nullifier", position);
            }
        }
    }

    #[test]
    fn test_derivations_do_not_alias() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        let c = Fr::from(3u64);

        // Same leading inputs, different arities.
        assert_ne!(payment_leaf(a, b, c), payment_nullifier(a, b, c, Fr::zero()));
        assert_ne!(identity_commitment(a, b), payment_leaf(a, b, Fr::zero()));
        assert_ne!(blacklist_index(a), identity_commitment(a, Fr::zero()));
    }

    #[test]
    fn test_identity_leaf_is_hash_of_commitment() {
        let commitment = identity_commitment(Fr::from(5u64), Fr::from(6u64));
        assert_eq!(identity_leaf(commitment), hash1(commitment));
    }

    #[test]
    fn test_batch_indices_match_single() {
        let ids: Vec<Fr> = (0..16u64).map(Fr::from).collect();
        let batch = blacklist_indices(&ids);
        for (id, index) in ids.iter().zip(batch) {
            assert_eq!(blacklist_index(*id), index);
        }
    }

    #[test]
    fn test_gadgets_match_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let values = [Fr::from(8u64), Fr::from(9u64), Fr::from(30u64), Fr::from(12u64)];
        let vars: Vec<FpVar<Fr>> = values
            .iter()
            .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap())
            .collect();

        let checks = [
            (
                blacklist_index(values[0]),
                blacklist_index_var(cs.clone(), &vars[0]).unwrap(),
            ),
            (
                payment_leaf(values[0], values[1], values[2]),
                payment_leaf_var(cs.clone(), &vars[0], &vars[1], &vars[2]).unwrap(),
            ),
            (
                identity_leaf(identity_commitment(values[0], values[1])),
                identity_leaf_var(cs.clone(), &vars[0], &vars[1]).unwrap(),
            ),
            (
                payment_nullifier(values[0], values[1], values[2], values[3]),
                payment_nullifier_var(cs.clone(), &vars[0], &vars[1], &vars[2], &vars[3])
                    .unwrap(),
            ),
        ];

        for (native, gadget) in checks {
            let expected = FpVar::new_input(cs.clone(), || Ok(native)).unwrap();
            gadget.enforce_equal(&expected).unwrap();
        }

        assert!(cs.is_satisfied().unwrap());
    }
}

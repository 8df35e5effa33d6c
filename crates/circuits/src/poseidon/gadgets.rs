//! Poseidon R1CS gadgets for in-circuit hashing.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::config::poseidon_config;

fn hash_tagged_var(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[&FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    let tag = FpVar::constant(Fr::from(inputs.len() as u64));
    sponge.absorb(&tag)?;
    for input in inputs {
        sponge.absorb(*input)?;
    }
    let result = sponge.squeeze_field_elements(1)?;
    Ok(result[0].clone())
}

/// Hash a single field element in-circuit.
pub fn hash1_var(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_tagged_var(cs, &[a])
}

/// Hash two field elements in-circuit.
pub fn hash2_var(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_tagged_var(cs, &[a, b])
}

/// Hash three field elements in-circuit.
pub fn hash3_var(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    c: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_tagged_var(cs, &[a, b, c])
}

/// Hash four field elements in-circuit.
pub fn hash4_var(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    c: &FpVar<Fr>,
    d: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_tagged_var(cs, &[a, b, c, d])
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::native::hash2;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::eq::EqGadget;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_gadget_matches_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();

        let a = Fr::from(42u64);
        let b = Fr::from(123u64);

        let a_var = FpVar::new_witness(cs.clone(), || Ok(a)).unwrap();
        let b_var = FpVar::new_witness(cs.clone(), || Ok(b)).unwrap();

        let result_var = hash2_var(cs.clone(), &a_var, &b_var).unwrap();
        let expected_var = FpVar::new_input(cs.clone(), || Ok(hash2(a, b))).unwrap();
        result_var.enforce_equal(&expected_var).unwrap();

        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_constraint_count() {
        let cs = ConstraintSystem::<Fr>::new_ref();

        let a_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64))).unwrap();
        let b_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();

        let _ = hash2_var(cs.clone(), &a_var, &b_var).unwrap();

        let constraints = cs.num_constraints();
        println!("Poseidon hash2 constraints: {}", constraints);

        // Two permutations at most (tag + 2 inputs with rate 2)
        assert!(constraints > 200 && constraints < 700);
    }
}

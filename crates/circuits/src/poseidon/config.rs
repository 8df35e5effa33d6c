//! Poseidon configuration for BN254.
//!
//! Round constants and the MDS matrix come from the Grain LFSR generator, so
//! the parameters are reproducible from (field size, rate, rounds) alone.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;

/// Number of full rounds (beginning + end)
const FULL_ROUNDS: usize = 8;

/// Number of partial rounds
const PARTIAL_ROUNDS: usize = 57;

/// S-box exponent
const ALPHA: u64 = 5;

/// Field elements absorbed per permutation
const RATE: usize = 2;

const CAPACITY: usize = 1;

static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Get the Poseidon configuration for the BN254 scalar field.
///
/// Parameters:
/// - Rate: 2, Capacity: 1
/// - Full rounds: 8 (4 at start, 4 at end)
/// - Partial rounds: 57
/// - Alpha: 5 (x^5 S-box)
///
/// Generating the constants is comparatively slow, so the config is built on
/// first use and shared afterwards.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            RATE,
            FULL_ROUNDS as u64,
            PARTIAL_ROUNDS as u64,
            0,
        );

        PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
    })
}

//! Circuit statistics utility - reports constraint counts and proof timing
//!
//! Usage:
//!   cargo run --release --bin circuit-stats                        # Constraint counts at the configured depth
//!   cargo run --release --bin circuit-stats -- --depth 20          # Override the depth
//!   cargo run --release --bin circuit-stats -- --time              # Include proof timing (needs keys)
//!   cargo run --release --bin circuit-stats -- --config my.toml

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use tracing_subscriber::EnvFilter;

use shieldlist_circuits::{NotBlacklistedCircuit, ProofOfPaymentCircuit, SparseMerkleTree};
use shieldlist_prover::{
    accept_payment, capture_path, not_blacklisted_inputs, payment_inputs, record_payment,
    shared_tree, CircuitId, CircuitInputs, Config, Groth16Backend, NullifierRegistry,
    PaymentClaim, PaymentExpectation, ProofOrchestrator,
};

fn count_constraints<C: ConstraintSynthesizer<Fr>>(circuit: C, name: &str) -> usize {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.generate_constraints(cs.clone()).unwrap();
    let count = cs.num_constraints();
    // Empty circuits carry dummy witnesses; the count is unaffected.
    println!("{:25} {:>8} constraints", name, count);
    count
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let include_timing = args.iter().any(|a| a == "--time");
    let config_path =
        PathBuf::from(arg_value(&args, "--config").unwrap_or_else(|| "shieldlist.toml".into()));
    let config = Config::load_from_file_or_default(&config_path);
    let depth = arg_value(&args, "--depth")
        .map(|d| d.parse::<usize>().expect("--depth must be a number"))
        .unwrap_or(config.tree.depth);

    println!("depth {}", depth);
    let blacklist_count = count_constraints(NotBlacklistedCircuit::empty(depth), "proveNotBlacklisted");
    let payment_count = count_constraints(ProofOfPaymentCircuit::empty(depth), "proofOfPayment");
    println!("{:25} {:>8} constraints", "total", blacklist_count + payment_count);

    if include_timing {
        run_timing_benchmarks(&config);
    } else {
        println!("\n(Run with --time to include proof generation timing)");
    }
}

fn run_timing_benchmarks(config: &Config) {
    let build_dir = &config.keys.build_dir;
    println!("\nLoading keys from {:?}...", build_dir);
    let start = Instant::now();
    let backend = match Groth16Backend::from_build_dir(build_dir) {
        Ok(b) => b,
        Err(e) => {
            println!("Failed to load keys: {}", e);
            println!("Generate keys first with:");
            println!("  cargo run --release --bin export-vks");
            return;
        }
    };
    println!("Keys loaded in {:?}\n", start.elapsed());

    let blacklist_depth = backend.keys().not_blacklisted.depth;
    let payment_depth = backend.keys().payment.depth;
    let orchestrator = ProofOrchestrator::new(Arc::new(backend));

    let blacklist = shared_tree(SparseMerkleTree::new(blacklist_depth).expect("valid depth"));
    let payments = shared_tree(SparseMerkleTree::new(payment_depth).expect("valid depth"));
    let claim = PaymentClaim {
        rid: Fr::from(1u64),
        pay_id: Fr::from(2u64),
        pay_cycle: 30,
        leaf_index: Fr::from(0u64),
        id_nullifier: Fr::from(3u64),
        id_trapdoor: Fr::from(4u64),
    };
    record_payment(&payments, &claim).expect("index fits");

    let inputs = not_blacklisted_inputs(&blacklist, Fr::from(12345u64)).expect("index fits");
    println!(
        "{:25} {:>8}ms",
        "proveNotBlacklisted",
        average_prove_ms(&orchestrator, CircuitId::NotBlacklisted, &inputs)
    );

    let inputs = payment_inputs(&payments, &claim).expect("index fits");
    println!(
        "{:25} {:>8}ms",
        "proofOfPayment",
        average_prove_ms(&orchestrator, CircuitId::ProofOfPayment, &inputs)
    );

    // One acceptance round trip under the configured registry scope.
    let registry = NullifierRegistry::from_config(config);
    let expected = PaymentExpectation {
        root: capture_path(&payments, claim.leaf_index).expect("index fits").root,
        identity: claim.identity(),
        pay_cycle: claim.pay_cycle,
    };
    match orchestrator.request_proof(CircuitId::ProofOfPayment, &inputs) {
        Ok(envelope) => {
            let first = accept_payment(&orchestrator, &registry, &expected, &envelope);
            let replay = accept_payment(&orchestrator, &registry, &expected, &envelope);
            println!(
                "acceptance ({:?} scope): first {:?}, replay {:?}",
                registry.policy(),
                first,
                replay
            );
        }
        Err(e) => println!("proofOfPayment failed: {}", e),
    }
}

fn average_prove_ms(
    orchestrator: &ProofOrchestrator,
    circuit: CircuitId,
    inputs: &CircuitInputs,
) -> u128 {
    const RUNS: u128 = 3;

    let mut total = 0;
    for _ in 0..RUNS {
        let start = Instant::now();
        if let Err(e) = orchestrator.request_proof(circuit, inputs) {
            println!("{} failed: {}", circuit, e);
            return 0;
        }
        total += start.elapsed().as_millis();
    }
    total / RUNS
}

//! Run trusted setup and export key artifacts.
//!
//! Writes `<circuit>.zkey` and `<circuit>.vkey.json` for every circuit into the
//! configured build directory, then prints each verifying key as hex.
//!
//! Usage:
//!   cargo run --release --bin export-vks [config.toml]

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use shieldlist_prover::setup::{setup_all_circuits, CircuitKeys};
use shieldlist_prover::{CircuitId, Config};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shieldlist.toml"));
    let config = Config::load_from_file_or_default(&config_path);
    let build_dir = &config.keys.build_dir;

    let keys = if build_dir.exists() {
        info!(dir = %build_dir.display(), "Loading existing keys");
        CircuitKeys::load_from_directory(build_dir).expect("Failed to load keys")
    } else {
        info!(depth = config.tree.depth, "Running trusted setup (this may take a while)");
        let keys = setup_all_circuits(config.tree.depth, config.keys.setup_seed)
            .expect("Failed to setup circuits");
        keys.save_to_directory(build_dir).expect("Failed to save keys");
        keys
    };

    println!("\n=== Verifying Keys ===\n");
    for circuit in CircuitId::ALL {
        let pair = keys.get(circuit);
        let vk = pair.serialize_vk().expect("Failed to serialize verifying key");
        println!(
            "{} (depth {}, {} public signals, {} bytes):",
            circuit,
            pair.depth,
            circuit.n_public(),
            vk.len()
        );
        println!("0x{}\n", hex::encode(&vk));
    }

    println!("Artifacts in {:?}", build_dir);
}

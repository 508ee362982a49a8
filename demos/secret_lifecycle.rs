//! Minimal example: one secret through its whole lifecycle.
//!
//! Demonstrates path-addressed storage, versioning, access denial and audit
//! logging with file persistence.
//! Run with: `RUST_LOG=debug cargo run --example secret_lifecycle`
//!
//! Key material comes from `PATHVAULT_KEY` (base64, 32 bytes) when set;
//! otherwise a throwaway key is generated for the run.

use std::path::PathBuf;

use pathvault::audit::FileAuditSink;
use pathvault::config::CipherConfig;
use pathvault::{generate_key, EnvelopeCipher, Principal, SecretStore};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Setup. The cipher is fully initialised before the store exists.
    let config = match CipherConfig::from_env() {
        Ok(config) => config,
        Err(_) => CipherConfig::new(generate_key()?).with_key_id("demo"),
    };
    let store = SecretStore::in_memory(EnvelopeCipher::from_config(config)?);

    // Optional: persist audit log to file
    let audit_path = PathBuf::from(std::env::temp_dir()).join("pathvault_audit.jsonl");
    store.add_audit_sink(Box::new(FileAuditSink::new(&audit_path)?));

    let admin = Principal::from("admin");
    let guest = Principal::from("guest");

    // 2. Create and rotate a secret.
    let created = store.create("/app/db/password", "correct horse", &admin)?;
    println!("Created {} at version {}", created.path, created.version);

    let updated = store.update(&created.id, "battery staple", &admin)?;
    println!("Updated {} to version {}", updated.path, updated.version);

    // 3. A guest can read the envelope but not change it.
    let seen = store.get_by_path("/app/db/password", &guest)?;
    if let Err(err) = store.delete(&seen.id, &guest) {
        println!("Guest delete refused: {}", err);
    }

    // 4. Revealing the value is an explicit step.
    let value = store.cipher().decrypt(&seen.envelope)?;
    println!("Current value has {} characters", value.len());

    // 5. Audit log
    let log = store.audit_log();
    println!("Audit log: {} record(s)", log.len());
    for record in log.iter() {
        println!(
            "  {:?} by {} on {} -> {:?}",
            record.operation, record.principal, record.target, record.outcome
        );
    }
    println!("Full audit also written to: {}", audit_path.display());

    store.delete(&created.id, &admin)?;
    Ok(())
}

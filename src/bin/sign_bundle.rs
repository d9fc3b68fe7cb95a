//! Bundle signing utility.
//!
//! Writes `manifest.json` (SHA-256 of every artifact) and `bundle.sig`
//! (Ed25519 over the manifest bytes) into a bundle directory, so the service
//! can verify the bundle at startup.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_bundle -- ml_model --seed-file keys/bundle.seed [--serial 42]
//! ```
//!
//! The seed is the base64 32-byte file written by `generate_keypair`. It may
//! also come from `OVASENSE_BUNDLE_SIGNING_KEY_B64_FILE` or the Docker secret
//! `/run/secrets/ovasense_bundle_signing_key_b64`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use ovasense::adapters::artifacts::{sign_bundle_dir, MANIFEST_FILE, SIGNATURE_FILE};

const KEY_FILE_ENV: &str = "OVASENSE_BUNDLE_SIGNING_KEY_B64_FILE";
const DOCKER_SECRET_PATH: &str = "/run/secrets/ovasense_bundle_signing_key_b64";

#[derive(Parser)]
#[command(name = "sign_bundle", about = "Sign an artifact bundle directory", version)]
struct Args {
    /// Bundle directory to sign.
    bundle_dir: PathBuf,

    /// File holding the base64 Ed25519 seed.
    #[arg(long, env = KEY_FILE_ENV)]
    seed_file: Option<PathBuf>,

    /// Monotonic serial (defaults to the current Unix time).
    #[arg(long)]
    serial: Option<u64>,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn seed_path(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.seed_file {
        return Ok(path.clone());
    }
    let secret = Path::new(DOCKER_SECRET_PATH);
    if secret.exists() {
        return Ok(secret.to_path_buf());
    }
    bail!("Missing signing key. Provide --seed-file, {KEY_FILE_ENV}, or {DOCKER_SECRET_PATH}.")
}

fn read_seed(path: &Path) -> Result<Seed> {
    let content = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("failed to read seed {path:?}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .context("invalid base64 in signing seed")?,
    );
    if raw.len() != 32 {
        bail!(
            "signing seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn main() -> Result<()> {
    let args = Args::parse();
    if !args.bundle_dir.is_dir() {
        bail!("{:?} is not a directory", args.bundle_dir);
    }

    let seed = read_seed(&seed_path(&args)?)?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = sign_bundle_dir(&args.bundle_dir, args.serial, &signing_key)?;

    println!(
        "Signed {} artifacts (serial {})",
        manifest.files.len(),
        manifest.serial
    );
    println!("Wrote {:?}", args.bundle_dir.join(MANIFEST_FILE));
    println!("Wrote {:?}", args.bundle_dir.join(SIGNATURE_FILE));
    println!(
        "Verifying key (base64): {}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

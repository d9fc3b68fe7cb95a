//! Ed25519 keypair generation for bundle signing.
//!
//! - Private seed (32 bytes, base64) written with 0600 permissions
//! - Public key (base64) written alongside, for `--verifying-key-file`
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_keypair -- --out-seed keys/bundle.seed --out-pub keys/bundle.pub
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

#[derive(Parser)]
#[command(name = "generate_keypair", about = "Generate a bundle signing keypair", version)]
struct Args {
    /// Where to write the base64 signing seed.
    #[arg(long)]
    out_seed: PathBuf,

    /// Where to write the base64 verifying key.
    #[arg(long)]
    out_pub: Option<PathBuf>,

    /// Overwrite existing files.
    #[arg(long)]
    force: bool,
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {parent:?}"))?;
    }

    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    for path in std::iter::once(&args.out_seed).chain(&args.out_pub) {
        if path.exists() && !args.force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let verifying_key = SigningKey::from_bytes(&seed).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed));
    seed.zeroize();
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_file(&args.out_seed, seed_b64.as_bytes(), 0o600)?;
    if let Some(pub_path) = &args.out_pub {
        write_file(pub_path, pub_b64.as_bytes(), 0o644)?;
    }

    // Print only non-secret material.
    println!("Wrote signing seed (base64) to {:?}", args.out_seed);
    if let Some(pub_path) = &args.out_pub {
        println!("Wrote verifying key (base64) to {pub_path:?}");
    }
    println!("Verifying key (base64): {pub_b64}");
    Ok(())
}

//! Model signing utility for Heartwise model artifacts.
//!
//! Writes a signed manifest (`manifest.json`) and Ed25519 signature
//! (`model.sig`) next to a model artifact, so the runtime can verify it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- keygen --out-dir keys/
//! cargo run --bin sign_model -- sign models/heart_disease_model.json --key-file keys/signing_key.b64
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartwise::adapters::model::signature::{
    self, sha256_hex, SignaturePolicy, SignedManifest, MANIFEST_FILE, MANIFEST_VERSION,
    SIGNATURE_FILE,
};

#[derive(Parser, Debug)]
#[command(name = "sign_model", version, about = "Sign Heartwise model artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new signing keypair
    Keygen {
        /// Directory receiving signing_key.b64 and model_signing_pubkey.b64
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Write manifest.json and model.sig next to an artifact
    Sign {
        /// Model artifact to bind
        artifact: PathBuf,

        /// File holding the base64 signing seed
        #[arg(long, env = "HEARTWISE_MODEL_SIGNING_KEY_B64_FILE")]
        key_file: PathBuf,

        /// Additional files (in the artifact directory) to bind
        #[arg(long)]
        include: Vec<String>,
    },
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_seed(path: &Path) -> Result<Seed> {
    let b64 = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?,
    );
    let raw = Zeroizing::new(STANDARD.decode(b64.trim()).context("Invalid seed base64")?);
    if raw.len() != 32 {
        bail!("Signing seed must decode to 32 bytes");
    }
    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

#[cfg(unix)]
fn write_secret(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("Failed to create {path:?}"))?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite {path:?}");
    }
    fs::write(path, contents)?;
    Ok(())
}

fn keygen(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    let mut seed = Seed([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);

    let seed_b64 = Zeroizing::new(STANDARD.encode(seed.0));
    write_secret(&out_dir.join("signing_key.b64"), &format!("{}\n", *seed_b64))?;

    let pub_b64 = STANDARD.encode(signing_key.verifying_key().to_bytes());
    fs::write(out_dir.join("model_signing_pubkey.b64"), format!("{pub_b64}\n"))?;

    println!("Wrote signing key and public key to {out_dir:?}");
    println!("Public key: {pub_b64}");
    Ok(())
}

fn sign(artifact: &Path, key_file: &Path, include: &[String]) -> Result<()> {
    let base_dir = artifact.parent().unwrap_or_else(|| Path::new("."));
    let artifact_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .context("Artifact path has no file name")?;

    let mut files = BTreeMap::new();
    for name in std::iter::once(artifact_name).chain(include.iter().map(String::as_str)) {
        if name.contains('/') || name.contains('\\') || name == MANIFEST_FILE || name == SIGNATURE_FILE {
            bail!("Cannot bind {name}: files must be plain names in the artifact directory");
        }
        let bytes = fs::read(base_dir.join(name)).with_context(|| format!("Failed to read {name}"))?;
        files.insert(name.to_string(), sha256_hex(&bytes));
    }

    let manifest = SignedManifest {
        version: MANIFEST_VERSION,
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let seed = read_seed(key_file)?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    let sig = signing_key.sign(&manifest_bytes);

    fs::write(base_dir.join(MANIFEST_FILE), &manifest_bytes)?;
    fs::write(base_dir.join(SIGNATURE_FILE), sig.to_bytes())?;

    // Read back through the runtime verifier.
    let artifact_bytes = fs::read(artifact)?;
    signature::verify_artifact(
        artifact,
        &artifact_bytes,
        SignaturePolicy::Required,
        Some(&signing_key.verifying_key()),
    )
    .context("Freshly written manifest failed verification")?;

    println!(
        "Signed {} file(s) in {:?}",
        manifest.files.len(),
        base_dir
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Keygen { out_dir } => keygen(out_dir),
        Command::Sign {
            artifact,
            key_file,
            include,
        } => sign(artifact, key_file, include),
    }
}

//! Signed model manifests.
//!
//! A model directory may carry `manifest.json` (SHA-256 of every bound file)
//! and `model.sig` (Ed25519 signature over the manifest bytes). When they are
//! present, the artifact is only accepted if the signature verifies and every
//! bound file hashes to the recorded value.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::ModelUnavailableError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// Whether an artifact without a manifest may be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignaturePolicy {
    /// Refuse unsigned artifacts.
    #[default]
    Required,
    /// Load unsigned artifacts with a warning. Signed ones are still verified.
    AllowUnsigned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedManifest {
    pub version: u32,
    /// File name (relative to the model directory) -> lowercase SHA-256 hex
    pub files: BTreeMap<String, String>,
}

fn sig_err(msg: impl Into<String>) -> ModelUnavailableError {
    ModelUnavailableError::Signature(msg.into())
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ModelUnavailableError::Signature` for malformed keys.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ModelUnavailableError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| sig_err(format!("Invalid verifying key base64: {e}")))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| sig_err("Verifying key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| sig_err("Invalid verifying key"))
}

/// Verify the manifest next to `artifact_path`.
///
/// `artifact_bytes` are the bytes the caller is about to parse, so the hash
/// check covers exactly what gets loaded.
///
/// Returns `Ok(None)` when the artifact is unsigned and the policy allows it.
///
/// # Errors
/// Returns `ModelUnavailableError::Signature` on any verification failure.
pub fn verify_artifact(
    artifact_path: &Path,
    artifact_bytes: &[u8],
    policy: SignaturePolicy,
    key: Option<&VerifyingKey>,
) -> Result<Option<SignedManifest>, ModelUnavailableError> {
    let base_dir = artifact_path.parent().unwrap_or_else(|| Path::new("."));
    let sig_path = base_dir.join(SIGNATURE_FILE);
    let manifest_path = base_dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        return match policy {
            SignaturePolicy::AllowUnsigned => {
                tracing::warn!("Loading UNSIGNED model artifact {:?}", artifact_path);
                Ok(None)
            }
            SignaturePolicy::Required => {
                tracing::error!(
                    "Model signature not found at {:?}; signed models are required",
                    sig_path
                );
                Err(sig_err("model is not signed"))
            }
        };
    }

    let key = key.ok_or_else(|| sig_err("model is signed but no verifying key is configured"))?;

    let sig_bytes =
        fs::read(&sig_path).map_err(|e| sig_err(format!("Failed to read signature: {e}")))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| sig_err("Invalid signature length (expected 64 bytes)"))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let manifest_content =
        fs::read(&manifest_path).map_err(|e| sig_err(format!("Failed to read manifest: {e}")))?;
    key.verify(&manifest_content, &signature)
        .map_err(|_| sig_err("Invalid model signature"))?;

    let manifest: SignedManifest = serde_json::from_slice(&manifest_content)
        .map_err(|e| sig_err(format!("Invalid manifest format: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(sig_err(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    let artifact_name = artifact_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| sig_err("artifact path has no file name"))?;
    if !manifest.files.contains_key(artifact_name) {
        return Err(sig_err(format!(
            "manifest does not bind the artifact {artifact_name}"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let actual_hex = if rel == artifact_name {
            sha256_hex(artifact_bytes)
        } else {
            let bytes = fs::read(base_dir.join(rel)).map_err(|e| {
                sig_err(format!("Manifest references missing/unreadable file {rel}: {e}"))
            })?;
            sha256_hex(&bytes)
        };
        if !constant_time_eq_str(&actual_hex, &expected_hex.to_ascii_lowercase()) {
            return Err(sig_err(format!("File hash mismatch for {rel}")));
        }
    }

    tracing::info!("Model signature and hashes verified successfully");
    Ok(Some(manifest))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    pub(crate) fn test_signing_key() -> SigningKey {
        let mut sk = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut sk);
        SigningKey::from_bytes(&sk)
    }

    pub(crate) fn write_signed_manifest(dir: &Path, key: &SigningKey, files: &[(&str, &[u8])]) {
        let manifest = SignedManifest {
            version: MANIFEST_VERSION,
            files: files
                .iter()
                .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let sig = key.sign(&bytes);
        fs::write(dir.join(SIGNATURE_FILE), sig.to_bytes()).expect("write sig");
    }

    #[test]
    fn test_unsigned_policy() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("model.json");

        assert!(verify_artifact(&path, b"{}", SignaturePolicy::AllowUnsigned, None)
            .expect("allowed")
            .is_none());
        assert!(matches!(
            verify_artifact(&path, b"{}", SignaturePolicy::Required, None),
            Err(ModelUnavailableError::Signature(_))
        ));
    }

    #[test]
    fn test_signed_manifest_roundtrip_and_tamper() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("model.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("model.json", b"original")]);

        let manifest = verify_artifact(
            &path,
            b"original",
            SignaturePolicy::Required,
            Some(&key.verifying_key()),
        )
        .expect("verifies")
        .expect("signed");
        assert!(manifest.files.contains_key("model.json"));

        let err = verify_artifact(
            &path,
            b"tampered",
            SignaturePolicy::Required,
            Some(&key.verifying_key()),
        )
        .expect_err("hash mismatch");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_wrong_key_and_missing_key() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("model.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("model.json", b"m")]);

        let other = test_signing_key();
        assert!(verify_artifact(&path, b"m", SignaturePolicy::Required, Some(&other.verifying_key()))
            .is_err());
        // A present signature is never skipped, even when unsigned models are allowed.
        assert!(verify_artifact(&path, b"m", SignaturePolicy::AllowUnsigned, None).is_err());
    }

    #[test]
    fn test_manifest_must_bind_artifact() {
        let temp = tempdir().expect("tempdir");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("other.json", b"x")]);
        fs::write(temp.path().join("other.json"), b"x").expect("write");

        let err = verify_artifact(
            &temp.path().join("model.json"),
            b"m",
            SignaturePolicy::Required,
            Some(&key.verifying_key()),
        )
        .expect_err("unbound");
        assert!(err.to_string().contains("does not bind"));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = test_signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        assert_eq!(
            verifying_key_from_b64(&format!("{b64}\n")).expect("decodes"),
            key.verifying_key()
        );
        assert!(verifying_key_from_b64("not base64!").is_err());
    }
}

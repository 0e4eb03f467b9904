//! Runtime settings.
//!
//! Resolved once at startup from command-line flags and `HEARTWISE_*`
//! environment variables (clap reads both), then handed to the service.

use std::path::{Path, PathBuf};

use crate::adapters::model::signature::verifying_key_from_b64;
use crate::adapters::{LoadOptions, SignaturePolicy};
use crate::HeartwiseError;

/// Model artifact used when no path is configured.
pub const DEFAULT_MODEL_PATH: &str = "models/heart_disease_model.json";

/// Verifying key picked up automatically when present.
pub const DEFAULT_PUBKEY_FILE: &str = "models/model_signing_pubkey.b64";

/// Log file used in file mode when `HEARTWISE_LOG_FILE` is unset.
pub const DEFAULT_LOG_FILE: &str = "heartwise.log";

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Pick the tracing filter directive: an explicit flag wins over
/// `RUST_LOG`, which wins over [`DEFAULT_LOG_LEVEL`].
#[must_use]
pub fn log_directive(flag: Option<&str>, rust_log: Option<&str>) -> String {
    flag.or(rust_log)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

/// Where log output goes. Stdout is reserved for results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File(PathBuf),
}

impl LogMode {
    /// Read `HEARTWISE_LOG_MODE` (`stderr` | `file`) and `HEARTWISE_LOG_FILE`.
    #[must_use]
    pub fn from_env() -> Self {
        let mode = std::env::var("HEARTWISE_LOG_MODE").ok();
        let file = std::env::var("HEARTWISE_LOG_FILE").ok();
        Self::from_values(mode.as_deref(), file.as_deref())
    }

    fn from_values(mode: Option<&str>, file: Option<&str>) -> Self {
        match mode.map(str::trim) {
            Some("file") => Self::File(PathBuf::from(file.unwrap_or(DEFAULT_LOG_FILE))),
            _ => Self::Stderr,
        }
    }
}

/// Resolved settings for loading the model.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_path: PathBuf,
    pub load_options: LoadOptions,
}

impl Settings {
    /// Resolve model settings.
    ///
    /// The verifying key comes from, in order: `pubkey_b64`, `pubkey_file`,
    /// then [`DEFAULT_PUBKEY_FILE`] if it exists.
    ///
    /// # Errors
    /// Returns an error if a configured key file cannot be read or a key is
    /// malformed.
    pub fn resolve(
        model_path: &Path,
        allow_unsigned: bool,
        pubkey_b64: Option<&str>,
        pubkey_file: Option<&Path>,
    ) -> Result<Self, HeartwiseError> {
        let key_b64 = match (pubkey_b64, pubkey_file) {
            (Some(b64), _) => Some(b64.to_string()),
            (None, Some(path)) => Some(read_key_file(path)?),
            (None, None) => {
                let default = Path::new(DEFAULT_PUBKEY_FILE);
                if default.is_file() {
                    Some(read_key_file(default)?)
                } else {
                    None
                }
            }
        };
        let verifying_key = key_b64.as_deref().map(verifying_key_from_b64).transpose()?;

        let signature_policy = if allow_unsigned {
            SignaturePolicy::AllowUnsigned
        } else {
            SignaturePolicy::Required
        };

        tracing::debug!(
            "Resolved settings: model={:?}, policy={:?}, verifying_key={}",
            model_path,
            signature_policy,
            verifying_key.is_some()
        );

        Ok(Self {
            model_path: model_path.to_path_buf(),
            load_options: LoadOptions {
                signature_policy,
                verifying_key,
            },
        })
    }
}

fn read_key_file(path: &Path) -> Result<String, HeartwiseError> {
    std::fs::read_to_string(path)
        .map_err(|e| HeartwiseError::Config(format!("Failed reading pubkey file {path:?}: {e}")))
}

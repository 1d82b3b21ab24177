//! Ledger configuration: the fixed registry plus process settings read from the environment.

use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zk_auth::commitment::commitment_for_limbs;
use zk_auth::constants::NUM_OWNERS;
use zk_auth::{IdentityCommitment, LimbVector};

/// Owner keys used by the demo binary and tests when no registry file is configured.
///
/// Never use these for anything holding real value.
pub const DEMO_OWNER_KEYS: [&str; NUM_OWNERS] = [
    "0x7128f1a29d5c77a152a8f6ea20a48e9cbbd03b84a92957fa2e6779b67fd9db21",
    "0xf5d995524e50e12db492ed59a6493ea8ca944d4d11a1741b9184068e990e8288",
    "0x08e7c807341d16ce2f2c9a026cb521510f13a86388b45171074d24e4705c2bc1",
];

pub const DEFAULT_REQUIRED_CONFIRMATIONS: u32 = 2;

/// Registry fixed at ledger construction: three commitments and the approval threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    commitments: [IdentityCommitment; NUM_OWNERS],
    required_confirmations: u32,
    unique_approvals: bool,
}

impl LedgerConfig {
    pub fn new(
        commitments: [IdentityCommitment; NUM_OWNERS],
        required_confirmations: u32,
    ) -> Result<Self, LedgerError> {
        if required_confirmations == 0 || required_confirmations as usize > NUM_OWNERS {
            return Err(LedgerError::InvalidConfig(format!(
                "required_confirmations must be in 1..={NUM_OWNERS}, got {required_confirmations}"
            )));
        }
        for (i, c) in commitments.iter().enumerate() {
            if commitments[..i].contains(c) {
                return Err(LedgerError::InvalidConfig(format!("commitment {i} is registered twice")));
            }
        }
        Ok(Self {
            commitments,
            required_confirmations,
            unique_approvals: false,
        })
    }

    /// Register the identities behind already-decomposed keys.
    pub fn from_owner_limbs(owners: &[LimbVector], required_confirmations: u32) -> Result<Self, LedgerError> {
        let commitments = owners
            .iter()
            .map(commitment_for_limbs)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(to_registry(commitments)?, required_confirmations)
    }

    /// Reject a second approval carrying the same nullifier on one transaction.
    pub fn with_unique_approvals(mut self, enabled: bool) -> Self {
        self.unique_approvals = enabled;
        self
    }

    pub fn commitments(&self) -> &[IdentityCommitment; NUM_OWNERS] {
        &self.commitments
    }

    pub fn required_confirmations(&self) -> u32 {
        self.required_confirmations
    }

    pub fn unique_approvals(&self) -> bool {
        self.unique_approvals
    }
}

/// On-disk registry, as published by whoever registered the owners.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryFile {
    pub commitments: Vec<IdentityCommitment>,
    pub required_confirmations: u32,
    #[serde(default)]
    pub unique_approvals: bool,
}

impl RegistryFile {
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::InvalidConfig(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| LedgerError::InvalidConfig(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn into_config(self) -> Result<LedgerConfig, LedgerError> {
        Ok(LedgerConfig::new(to_registry(self.commitments)?, self.required_confirmations)?
            .with_unique_approvals(self.unique_approvals))
    }
}

fn to_registry(commitments: Vec<IdentityCommitment>) -> Result<[IdentityCommitment; NUM_OWNERS], LedgerError> {
    let got = commitments.len();
    commitments
        .try_into()
        .map_err(|_| LedgerError::InvalidConfig(format!("expected {NUM_OWNERS} commitments, got {got}")))
}

/// Process settings.
///
/// - `LEDGER_DATA_DIR`: where key material lives (default `data`).
/// - `LEDGER_REGISTRY`: optional registry JSON; the demo owners are registered otherwise.
/// - `LEDGER_UNIQUE_APPROVALS`: `1`/`true` to reject repeated approvals by one identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub registry_path: Option<PathBuf>,
    pub unique_approvals: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: lookup("LEDGER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            registry_path: lookup("LEDGER_REGISTRY").map(PathBuf::from),
            unique_approvals: lookup("LEDGER_UNIQUE_APPROVALS")
                .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }
}

use crate::errors::LedgerError;
use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use rand::rngs::OsRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use zk_auth::groth16::{deserialize_pk, deserialize_vk, serialize_pk, serialize_vk, setup_keys};
use zk_auth::ProofVerifier;

const PK_FILE: &str = "groth16_pk.bin";
const VK_FILE: &str = "groth16_vk.bin";

/// Trusted-setup material, shared read-only by every prover and verifier in the process.
#[derive(Clone)]
pub struct ZkKeys {
    pub pk: Arc<ProvingKey<Bn254>>,
    pub vk: Arc<VerifyingKey<Bn254>>,
    pub verifier: ProofVerifier,
}

impl ZkKeys {
    pub fn new(pk: ProvingKey<Bn254>, vk: VerifyingKey<Bn254>) -> Result<Self, LedgerError> {
        let verifier = ProofVerifier::new(&vk)?;
        Ok(Self {
            pk: Arc::new(pk),
            vk: Arc::new(vk),
            verifier,
        })
    }
}

/// Loads Groth16 keys from `keys_dir` exactly once per process.
#[derive(Clone)]
pub struct KeyStore {
    keys_dir: PathBuf,
    keys: Arc<OnceCell<ZkKeys>>,
}

impl KeyStore {
    pub fn new(keys_dir: PathBuf) -> Self {
        Self {
            keys_dir,
            keys: Arc::new(OnceCell::new()),
        }
    }

    /// Ensure Groth16 keys exist on disk and in memory.
    ///
    /// Keys from a setup ceremony are expected in `keys_dir`. When none are present a local
    /// setup runs on first use, which is only acceptable for development.
    pub async fn ensure_keys(&self) -> Result<ZkKeys, LedgerError> {
        let keys_dir = self.keys_dir.clone();

        self.keys
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || -> Result<ZkKeys, LedgerError> {
                    std::fs::create_dir_all(&keys_dir).map_err(|e| LedgerError::KeyMaterial(format!("{e}")))?;

                    let pk_path = keys_dir.join(PK_FILE);
                    let vk_path = keys_dir.join(VK_FILE);

                    if pk_path.exists() && vk_path.exists() {
                        let pk_bytes = std::fs::read(&pk_path).map_err(|e| LedgerError::KeyMaterial(format!("{e}")))?;
                        let vk_bytes = std::fs::read(&vk_path).map_err(|e| LedgerError::KeyMaterial(format!("{e}")))?;

                        let pk = deserialize_pk(&pk_bytes)?;
                        let vk = deserialize_vk(&vk_bytes)?;

                        info!(dir = %keys_dir.display(), "loaded groth16 keys");
                        return ZkKeys::new(pk, vk);
                    }

                    warn!(dir = %keys_dir.display(), "no groth16 keys found, running local trusted setup");
                    let mut rng = OsRng;
                    let (pk, vk) = setup_keys(&mut rng)?;

                    std::fs::write(&pk_path, serialize_pk(&pk)?).map_err(|e| LedgerError::KeyMaterial(format!("{e}")))?;
                    std::fs::write(&vk_path, serialize_vk(&vk)?).map_err(|e| LedgerError::KeyMaterial(format!("{e}")))?;

                    ZkKeys::new(pk, vk)
                })
                .await
                .map_err(|e| LedgerError::Internal(format!("key loading task failed: {e}")))?
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_are_generated_once_then_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();

        let first = KeyStore::new(dir.path().to_path_buf()).ensure_keys().await.unwrap();
        assert!(dir.path().join(PK_FILE).exists());
        assert!(dir.path().join(VK_FILE).exists());

        let store = KeyStore::new(dir.path().to_path_buf());
        let second = store.ensure_keys().await.unwrap();
        assert_eq!(*second.vk, *first.vk);

        let again = store.ensure_keys().await.unwrap();
        assert!(Arc::ptr_eq(&again.pk, &second.pk));
    }

    #[tokio::test]
    async fn corrupt_key_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PK_FILE), b"not a key").unwrap();
        std::fs::write(dir.path().join(VK_FILE), b"not a key").unwrap();

        let err = KeyStore::new(dir.path().to_path_buf()).ensure_keys().await.err().unwrap();
        assert!(matches!(err, LedgerError::Zk(_)));
    }
}

use ledger::config::{DEFAULT_REQUIRED_CONFIRMATIONS, DEMO_OWNER_KEYS};
use ledger::keys::KeyStore;
use ledger::{InMemoryEscrow, LedgerConfig, LedgerError, ProofRequest, ProofService, RegistryFile, Settings, TransactionLedger};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zk_auth::commitment::derive_address;
use zk_auth::limbs::decompose_for_circuit;
use zk_auth::{bind_message, Amount, LimbVector, PrivateKey};

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

#[tokio::main]
async fn main() -> Result<(), LedgerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    let keys = KeyStore::new(settings.keys_dir()).ensure_keys().await?;

    let owners = DEMO_OWNER_KEYS
        .iter()
        .map(|k| PrivateKey::from_hex(k).map(|key| decompose_for_circuit(&key)))
        .collect::<Result<Vec<LimbVector>, _>>()?;

    let config = match &settings.registry_path {
        Some(path) => RegistryFile::load(path)?.into_config()?,
        None => LedgerConfig::from_owner_limbs(&owners, DEFAULT_REQUIRED_CONFIRMATIONS)?
            .with_unique_approvals(settings.unique_approvals),
    };
    let commitments = *config.commitments();

    let ledger = TransactionLedger::new(config, keys.verifier.clone(), InMemoryEscrow::default());
    ledger.environment().deposit(Amount::from(1000 * WEI_PER_ETHER))?;

    // Ctrl-C abandons whichever proof is in flight.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let prover = ProofService::new(keys.pk.clone());
    let to = derive_address(&owners[0].to_circuit_limbs()?);
    let value = Amount::from(WEI_PER_ETHER);
    let payload = Vec::new();
    let message_hash = bind_message(&to, value, &payload);

    info!(%to, %value, "proving approval for owner 0");
    let proof = prover
        .prove_cancellable(
            ProofRequest { limbs: owners[0].clone(), message_hash, commitments },
            cancel_rx.clone(),
        )
        .await?;
    let index = ledger.submit(to, value, payload, &proof).await?;
    log_transaction(&ledger, index).await?;

    info!(index, "proving approval for owner 1");
    let proof = prover
        .prove_cancellable(
            ProofRequest { limbs: owners[1].clone(), message_hash, commitments },
            cancel_rx,
        )
        .await?;
    ledger.confirm(index, &proof).await?;
    log_transaction(&ledger, index).await?;

    ledger.execute(index).await?;
    info!(balance = %ledger.environment().balance()?, "escrow balance after execution");

    Ok(())
}

async fn log_transaction(ledger: &TransactionLedger<InMemoryEscrow>, index: u64) -> Result<(), LedgerError> {
    let tx = ledger.get_transaction(index).await?;
    let json = serde_json::to_string(&tx).map_err(|e| LedgerError::Internal(format!("{e}")))?;
    info!(index, quorum_met = tx.quorum_met(), tx = %json, "stored transaction");
    Ok(())
}

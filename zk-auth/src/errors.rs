use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkError {
    /// The witness does not satisfy the ownership relation, so no valid proof exists.
    #[error("witness unsatisfiable: {0}")]
    WitnessUnsatisfiable(String),

    #[error("proof verification failed")]
    InvalidProof,

    #[error("input out of range: {0}")]
    InputOutOfRange(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("arkworks error: {0}")]
    Ark(String),
}

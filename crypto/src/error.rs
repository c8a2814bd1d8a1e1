use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("decryption failed: authentication check failed")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("event {0} has an id that does not match its contents")]
    InvalidId(String),

    #[error("event {0} has an invalid signature")]
    InvalidSignature(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Type(#[from] cosign_types::TypeError),
}

//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations. None of them are transient.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Keypair generation failed (randomness or provider unavailable).
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A block failed to encrypt.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A block failed to decrypt (wrong key or corrupted data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Ciphertext is not made of whole blocks.
    #[error("malformed ciphertext: {len} bytes is not a multiple of the {block}-byte block size")]
    MalformedCiphertext { len: usize, block: usize },

    /// Key material could not be decoded.
    #[error("key parse error: {0}")]
    KeyParse(String),

    /// Key decoded but has the wrong modulus size.
    #[error("unsupported key: expected {expected}-bit modulus, got {actual}")]
    UnsupportedKey { expected: usize, actual: usize },

    /// Key material could not be encoded.
    #[error("key export failed: {0}")]
    KeyExport(String),
}

//! Bulk encryption on top of a single-block RSA primitive.
//!
//! Wire format: the concatenation of whole ciphertext blocks, each exactly
//! `key_bytes` long, in plaintext order. There is no header and no framing.
//! Each block decrypts to at most `key_bytes - 11` bytes of plaintext.

use std::sync::Arc;

use rand::rngs::OsRng;
use rsa::{traits::PublicKeyParts, Pkcs1v15Encrypt, RsaPublicKey};
use tracing::{debug, instrument};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{KeyManager, PADDING_OVERHEAD};

/// Encrypts and decrypts arbitrary-length payloads with a shared keypair.
///
/// Cloning is cheap; clones share the same immutable `KeyManager`.
#[derive(Debug, Clone)]
pub struct BlockCipherEngine {
    keys: Arc<KeyManager>,
}

impl BlockCipherEngine {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn max_plain_block(&self) -> usize {
        self.keys.max_plain_block()
    }

    pub fn cipher_block(&self) -> usize {
        self.keys.key_bytes()
    }

    /// Ciphertext length `encrypt_bulk` produces for `plaintext_len` bytes.
    pub fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        ciphertext_len(plaintext_len, self.cipher_block())
    }

    /// Encrypts `plaintext` block by block with the public key.
    #[instrument(skip_all, fields(len = plaintext.len()))]
    pub fn encrypt_bulk(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        seal_blocks(self.keys.public_key(), plaintext)
    }

    /// Decrypts a ciphertext produced by `encrypt_bulk`.
    ///
    /// Fails without returning anything if any block is short or does not
    /// decrypt.
    #[instrument(skip_all, fields(len = ciphertext.len()))]
    pub fn decrypt_bulk(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let block = self.cipher_block();
        if ciphertext.len() % block != 0 {
            return Err(CryptoError::MalformedCiphertext {
                len: ciphertext.len(),
                block,
            });
        }

        let private = self.keys.private_key();
        let mut plaintext = Vec::with_capacity(ciphertext.len() / block * self.max_plain_block());
        for (index, chunk) in ciphertext.chunks_exact(block).enumerate() {
            let opened = private
                .decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, chunk)
                .map_err(|e| CryptoError::Decryption(format!("block {index}: {e}")))?;
            plaintext.extend_from_slice(&opened);
        }
        debug!(blocks = ciphertext.len() / block, "decrypted payload");
        Ok(plaintext)
    }
}

/// `ceil(plaintext_len / (key_bytes - 11)) * key_bytes`.
pub fn ciphertext_len(plaintext_len: usize, key_bytes: usize) -> usize {
    plaintext_len.div_ceil(key_bytes - PADDING_OVERHEAD) * key_bytes
}

pub(crate) fn seal_blocks(key: &RsaPublicKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let key_bytes = key.size();
    let max_plain = key_bytes - PADDING_OVERHEAD;
    let mut ciphertext = Vec::with_capacity(ciphertext_len(plaintext.len(), key_bytes));

    for (index, chunk) in plaintext.chunks(max_plain).enumerate() {
        let sealed = key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, chunk)
            .map_err(|e| CryptoError::Encryption(format!("block {index}: {e}")))?;
        if sealed.len() != key_bytes {
            return Err(CryptoError::Encryption(format!(
                "block {index}: expected {key_bytes} bytes, got {}",
                sealed.len()
            )));
        }
        ciphertext.extend_from_slice(&sealed);
    }
    debug!(blocks = ciphertext.len() / key_bytes, "encrypted payload");
    Ok(ciphertext)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::*;
    use crate::test_support::shared_keys;

    fn engine() -> BlockCipherEngine {
        BlockCipherEngine::new(shared_keys())
    }

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    #[test]
    fn empty_input_produces_no_blocks() {
        let engine = engine();
        let sealed = engine.encrypt_bulk(b"").expect("encrypt");
        assert!(sealed.is_empty());
        assert!(engine.decrypt_bulk(&sealed).expect("decrypt").is_empty());
    }

    #[test]
    fn single_byte_is_one_block() {
        let engine = engine();
        let sealed = engine.encrypt_bulk(b"x").expect("encrypt");
        assert_eq!(sealed.len(), 256);
        assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), b"x");
    }

    #[test]
    fn exact_block_boundaries_do_not_add_empty_blocks() {
        let engine = engine();
        for len in [245, 490] {
            let plaintext = random_bytes(len);
            let sealed = engine.encrypt_bulk(&plaintext).expect("encrypt");
            assert_eq!(sealed.len(), len / 245 * 256);
            assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), plaintext);
        }
    }

    #[test]
    fn one_past_boundary_spills_into_short_block() {
        let engine = engine();
        let plaintext = random_bytes(246);
        let sealed = engine.encrypt_bulk(&plaintext).expect("encrypt");
        assert_eq!(sealed.len(), 512);
        assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), plaintext);
    }

    #[test]
    fn ten_thousand_bytes_use_forty_one_blocks() {
        let engine = engine();
        let plaintext = random_bytes(10_000);
        let sealed = engine.encrypt_bulk(&plaintext).expect("encrypt");
        assert_eq!(sealed.len(), 10_496);
        assert_eq!(engine.ciphertext_len(10_000), 10_496);
        assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), plaintext);
    }

    #[test]
    #[ignore = "thousands of RSA operations; slow without optimizations"]
    fn multi_megabyte_round_trip() {
        let engine = engine();
        let plaintext = random_bytes(3 * 1024 * 1024);
        let sealed = engine.encrypt_bulk(&plaintext).expect("encrypt");
        assert_eq!(sealed.len(), engine.ciphertext_len(plaintext.len()));
        assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), plaintext);
    }

    #[test]
    fn ciphertext_len_formula() {
        assert_eq!(ciphertext_len(0, 256), 0);
        assert_eq!(ciphertext_len(1, 256), 256);
        assert_eq!(ciphertext_len(245, 256), 256);
        assert_eq!(ciphertext_len(246, 256), 512);
        assert_eq!(ciphertext_len(10_000, 256), 41 * 256);
    }

    #[test]
    fn rejects_partial_blocks() {
        let engine = engine();
        let mut sealed = engine.encrypt_bulk(b"hello").expect("encrypt");
        sealed.pop();
        let err = engine.decrypt_bulk(&sealed).expect_err("must reject");
        assert!(matches!(
            err,
            CryptoError::MalformedCiphertext { len: 255, block: 256 }
        ));

        let err = engine.decrypt_bulk(&[0u8; 300]).expect_err("must reject");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));
    }

    #[test]
    fn tampered_block_fails_whole_payload() {
        let engine = engine();
        let plaintext = random_bytes(600);
        let mut sealed = engine.encrypt_bulk(&plaintext).expect("encrypt");
        // Corrupt the last block; earlier blocks are still valid.
        let last = sealed.len() - 10;
        sealed[last] ^= 0xFF;
        let err = engine.decrypt_bulk(&sealed).expect_err("must fail");
        assert!(matches!(err, CryptoError::Decryption(_)));
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let sealed = engine().encrypt_bulk(b"secret data").expect("encrypt");
        let other = BlockCipherEngine::new(Arc::new(KeyManager::generate().expect("keys")));
        assert!(other.decrypt_bulk(&sealed).is_err());
    }

    #[test]
    fn imported_public_key_encrypts_for_owner() {
        let engine = engine();
        let pem = engine.keys().export_public().expect("export");
        let handle = KeyManager::import_public(&pem).expect("import");
        let sealed = handle.encrypt_bulk(b"for your eyes").expect("encrypt");
        assert_eq!(engine.decrypt_bulk(&sealed).expect("decrypt"), b"for your eyes");
    }

    #[test]
    fn encryption_is_randomized() {
        let engine = engine();
        let a = engine.encrypt_bulk(b"same").expect("encrypt");
        let b = engine.encrypt_bulk(b"same").expect("encrypt");
        assert_ne!(a, b);
    }
}

//! Low-level cryptographic operations.
//!
//! Only this module and `cipher` touch `ring`. Everything else encrypts and
//! decrypts through `EnvelopeCipher`, which calls into the functions here.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM (authenticated encryption)
//! - **Nonce**: 96-bit (12 bytes), generated fresh per operation via `SystemRandom`
//! - **Tag**: 128-bit (16 bytes)
//! - **Key size**: 256 bits (32 bytes)

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::VaultError;

/// The AEAD algorithm used throughout pathvault.
const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_LEN: usize = aead::NONCE_LEN;

/// Size of the GCM authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Size of a key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Build the sealing key once. Fails only if `ring` rejects the key bytes.
pub(crate) fn sealing_key(key_bytes: &[u8; KEY_LEN]) -> Result<LessSafeKey, VaultError> {
    let unbound = UnboundKey::new(ALGORITHM, key_bytes)
        .map_err(|_| VaultError::InvalidKey("rejected by cipher"))?;
    Ok(LessSafeKey::new(unbound))
}

/// Generate a fresh random nonce. There is no nonce caching or
/// counter-based generation.
fn generate_nonce(rng: &SystemRandom) -> Result<[u8; NONCE_LEN], VaultError> {
    let mut buf = [0u8; NONCE_LEN];
    rng.fill(&mut buf).map_err(|_| VaultError::EncryptionFailure)?;
    Ok(buf)
}

/// Encrypt a plaintext payload using AES-256-GCM.
///
/// # Layout of returned bytes
/// ```text
/// [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
/// ```
pub(crate) fn seal(
    key: &LessSafeKey,
    rng: &SystemRandom,
    plaintext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let nonce_bytes = generate_nonce(rng)?;

    let mut output = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(plaintext);

    // Encrypts `output[NONCE_LEN..]` in place; the tag is appended afterwards.
    let tag = key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut output[NONCE_LEN..],
        )
        .map_err(|_| VaultError::EncryptionFailure)?;
    output.extend_from_slice(tag.as_ref());

    Ok(output)
}

/// Decrypt bytes in the layout produced by `seal`.
///
/// A wrong key, a tampered byte anywhere in the input, or input shorter than
/// nonce plus tag all fail the same way. The caller never receives partial
/// plaintext.
pub(crate) fn open(key: &LessSafeKey, sealed: &[u8]) -> Result<Vec<u8>, VaultError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::EncryptionFailure);
    }

    let (nonce_bytes, payload) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| VaultError::EncryptionFailure)?;

    let mut payload = payload.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut payload)
        .map_err(|_| VaultError::EncryptionFailure)?;

    Ok(plaintext.to_vec())
}

/// Generate a cryptographically secure random key.
pub fn generate_random_key() -> Result<[u8; KEY_LEN], VaultError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_LEN];
    rng.fill(&mut key).map_err(|_| VaultError::EncryptionFailure)?;
    Ok(key)
}

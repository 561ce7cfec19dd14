//local shortcuts
use crate::*;

//third-party shortcuts
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Authenticated-encryption algorithm recognized by the [`super::CodecChain`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EncryptionAlgorithm
{
    Aes256Gcm,
}

/// Length in bytes of the AES-GCM nonce/IV.
const IV_LEN: usize = 12;

//-------------------------------------------------------------------------------------------------------------------

/// Encrypt `plaintext` under `key`, prepending a 12-byte IV to the ciphertext.
///
/// A fresh random IV is drawn per call unless `fixed_iv` is provided (discouraged — see [`EncryptionConfig`]).
pub(crate) fn encrypt(
    key       : [u8; 32],
    fixed_iv  : Option<[u8; 12]>,
    plaintext : &[u8],
) -> Result<Vec<u8>, RuntimeError>
{
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

    let iv = fixed_iv.unwrap_or_else(||
    {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    });
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher.encrypt(nonce, plaintext)
        .map_err(|_| RuntimeError::new(RuntimeErrorKind::Encryption, "AES-256-GCM encryption failed"))?;

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a buffer produced by [`encrypt`]. Tag verification failure raises a non-retryable
/// [`RuntimeErrorKind::Encryption`] error.
pub(crate) fn decrypt(key: [u8; 32], framed: &[u8]) -> Result<Vec<u8>, RuntimeError>
{
    if framed.len() < IV_LEN
    {
        return Err(RuntimeError::new(RuntimeErrorKind::Encryption, "ciphertext shorter than IV"));
    }
    let (iv, ciphertext) = framed.split_at(IV_LEN);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce = Nonce::from_slice(iv);

    cipher.decrypt(nonce, ciphertext)
        .map_err(|_| RuntimeError::new(RuntimeErrorKind::Encryption, "AES-256-GCM tag verification failed"))
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn decrypt_of_encrypt_returns_original()
    {
        let key = [9u8; 32];
        let ciphertext = encrypt(key, None, b"hello world").unwrap();
        let plaintext = decrypt(key, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn fresh_iv_differs_across_calls()
    {
        let key = [9u8; 32];
        let a = encrypt(key, None, b"same message").unwrap();
        let b = encrypt(key, None, b"same message").unwrap();
        assert_ne!(&a[..IV_LEN], &b[..IV_LEN]);
    }

    #[test]
    fn wrong_key_fails_verification()
    {
        let ciphertext = encrypt([1u8; 32], None, b"secret").unwrap();
        let err = decrypt([2u8; 32], &ciphertext).unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::Encryption);
    }
}

//-------------------------------------------------------------------------------------------------------------------

//! AES-256-CBC envelope encryption for feed and report documents.
//!
//! Each document carries its own base64 key and IV. There is no
//! authentication tag; integrity rests on TLS and the API's own checks.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use spapi_common::{DocumentLocator, EncryptionDetails, document::AES_STANDARD};

use crate::error::ClientError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// IV length in bytes.
pub const IV_LEN: usize = 16;

/// Encrypts and decrypts one document's payload.
#[derive(Clone)]
pub struct EnvelopeCodec {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

impl EnvelopeCodec {
    /// Creates a codec from raw key material.
    #[must_use]
    pub const fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Decodes the base64 key and IV of a document's encryption details.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CryptoError`] for an unsupported standard,
    /// invalid base64, or a key/IV of the wrong length.
    pub fn from_details(details: &EncryptionDetails) -> Result<Self, ClientError> {
        if let Some(standard) = details.standard.as_deref()
            && !standard.eq_ignore_ascii_case(AES_STANDARD)
        {
            return Err(ClientError::CryptoError(format!(
                "unsupported encryption standard: {standard}"
            )));
        }

        let key = decode_exact::<KEY_LEN>("key", &details.key)?;
        let iv = decode_exact::<IV_LEN>("initialization vector", &details.initialization_vector)?;

        Ok(Self { key, iv })
    }

    /// Shorthand for [`EnvelopeCodec::from_details`] on a locator.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeCodec::from_details`].
    pub fn from_locator(locator: &DocumentLocator) -> Result<Self, ClientError> {
        Self::from_details(&locator.encryption_details)
    }

    /// Encrypts `plaintext` with PKCS#7 padding.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&self.key.into(), &self.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypts `ciphertext` and strips PKCS#7 padding.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CryptoError`] if the ciphertext length or the
    /// padding is invalid, which usually means the wrong key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ClientError> {
        Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| ClientError::CryptoError("invalid ciphertext or padding".to_string()))
    }

    /// Decrypts `ciphertext` into a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CryptoError`] if decryption fails or the
    /// plaintext is not UTF-8.
    pub fn decrypt_utf8(&self, ciphertext: &[u8]) -> Result<String, ClientError> {
        String::from_utf8(self.decrypt(ciphertext)?)
            .map_err(|e| ClientError::CryptoError(format!("decrypted document is not UTF-8: {e}")))
    }
}

fn decode_exact<const N: usize>(what: &str, encoded: &str) -> Result<[u8; N], ClientError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ClientError::CryptoError(format!("invalid base64 {what}: {e}")))?;

    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        ClientError::CryptoError(format!(
            "{what} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
    const IV: &str = "AAECAwQFBgcICQoLDA0ODw==";

    fn details(key: &str, iv: &str) -> EncryptionDetails {
        EncryptionDetails {
            standard: Some("AES".to_string()),
            key: key.to_string(),
            initialization_vector: iv.to_string(),
        }
    }

    #[test]
    fn test_known_vector() {
        let codec = EnvelopeCodec::from_details(&details(KEY, IV)).unwrap();

        let ciphertext = codec.encrypt(b"<Message>hello</Message>");
        assert_eq!(
            hex::encode(&ciphertext),
            "c2e3bd771d454d857beb0db883e6d8456e0063a001297b6cfc67ef064a4b33c3"
        );
        assert_eq!(
            codec.decrypt_utf8(&ciphertext).unwrap(),
            "<Message>hello</Message>"
        );
    }

    #[test]
    fn test_rejects_bad_key_material() {
        let short_key = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            EnvelopeCodec::from_details(&details(&short_key, IV)),
            Err(ClientError::CryptoError(_))
        ));

        let long_iv = STANDARD.encode([0u8; 32]);
        assert!(EnvelopeCodec::from_details(&details(KEY, &long_iv)).is_err());
        assert!(EnvelopeCodec::from_details(&details("not base64!", IV)).is_err());

        let mut other = details(KEY, IV);
        other.standard = Some("RSA".to_string());
        assert!(EnvelopeCodec::from_details(&other).is_err());

        other.standard = None;
        assert!(EnvelopeCodec::from_details(&other).is_ok());
    }

    #[test]
    fn test_decrypt_rejects_truncated_ciphertext() {
        let codec = EnvelopeCodec::from_details(&details(KEY, IV)).unwrap();
        let ciphertext = codec.encrypt(b"some feed content");

        assert!(codec.decrypt(&ciphertext[..ciphertext.len() - 1]).is_err());
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let codec = EnvelopeCodec::new([7u8; KEY_LEN], [9u8; IV_LEN]);
        let debug = format!("{codec:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains('7'));
    }
}

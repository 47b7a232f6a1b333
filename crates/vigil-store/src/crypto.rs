//! Symmetric encryption of indicator payloads.
//!
//! Payloads are JSON text sealed with ChaCha20-Poly1305 under a single
//! process-wide key. The wire form is `enc1:` followed by
//! base64(nonce || ciphertext); the header lets readers tell at-rest
//! ciphertext apart from legacy plaintext without attempting a decrypt.
//! There is no key rotation or versioning.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

use vigil_core::{CoreError, CoreResult, EncryptionConfig};

const CIPHERTEXT_PREFIX: &str = "enc1:";
const NONCE_LEN: usize = 12;

/// Encrypts, decrypts, and classifies opaque string payloads.
pub struct EncryptionCodec {
    cipher: ChaCha20Poly1305,
}

impl EncryptionCodec {
    /// Builds a codec from explicit key material.
    ///
    /// Fails when the key is absent, not valid base64, or not 256 bits —
    /// nothing that needs the codec can start without a usable key.
    pub fn new(config: &EncryptionConfig) -> CoreResult<Self> {
        if config.key.is_empty() {
            return Err(CoreError::Config(
                "encryption key is not set".to_string(),
            ));
        }

        let key = STANDARD
            .decode(&config.key)
            .map_err(|_| CoreError::Config("encryption key is not valid base64".to_string()))?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| {
            CoreError::Config(format!(
                "encryption key must decode to 32 bytes, got {}",
                key.len()
            ))
        })?;

        Ok(Self { cipher })
    }

    /// Encrypts JSON text into an opaque ciphertext string.
    ///
    /// The input must be non-empty, valid JSON; a fresh random nonce is used
    /// per call, so equal payloads produce distinct ciphertexts.
    pub fn encrypt(&self, plaintext: &str) -> CoreResult<String> {
        if plaintext.is_empty() {
            return Err(CoreError::validation("cannot encrypt an empty string"));
        }
        if let Err(err) = serde_json::from_str::<serde_json::Value>(plaintext) {
            return Err(CoreError::encryption(format!(
                "refusing to encrypt non-JSON payload: {err}"
            )));
        }

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::encryption("payload could not be sealed"))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&sealed);
        Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(blob)))
    }

    /// Decrypts a ciphertext string back into JSON text.
    ///
    /// Fails when the blob is malformed, authentication fails (wrong key or
    /// tampering), or the recovered plaintext is empty or not valid JSON.
    pub fn decrypt(&self, ciphertext: &str) -> CoreResult<String> {
        if ciphertext.is_empty() {
            return Err(CoreError::validation("cannot decrypt an empty string"));
        }

        let encoded = ciphertext
            .strip_prefix(CIPHERTEXT_PREFIX)
            .ok_or_else(|| CoreError::encryption("missing ciphertext header"))?;
        let blob = STANDARD
            .decode(encoded)
            .map_err(|err| CoreError::encryption(format!("ciphertext is not valid base64: {err}")))?;
        if blob.len() <= NONCE_LEN {
            return Err(CoreError::encryption("ciphertext is truncated"));
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                CoreError::encryption("authentication failed: wrong key or tampered ciphertext")
            })?;

        let plaintext = String::from_utf8(opened)
            .map_err(|_| CoreError::encryption("decrypted payload is not UTF-8"))?;
        if plaintext.is_empty() {
            return Err(CoreError::encryption("decryption produced an empty string"));
        }
        if let Err(err) = serde_json::from_str::<serde_json::Value>(&plaintext) {
            return Err(CoreError::encryption(format!(
                "decrypted payload is not valid JSON: {err}"
            )));
        }

        Ok(plaintext)
    }

    /// Returns whether `text` decrypts successfully under this codec.
    ///
    /// A total classification function: never errors, never panics.
    pub fn is_encrypted(&self, text: &str) -> bool {
        self.decrypt(text).is_ok()
    }

    /// Returns whether `text` carries the ciphertext header.
    ///
    /// Purely structural. Read paths branch on this rather than on
    /// [`is_encrypted`](Self::is_encrypted): a tampered ciphertext no longer
    /// decrypts, but it must still be treated as ciphertext (and surface as
    /// corrupted) instead of being mistaken for legacy plaintext.
    pub fn is_ciphertext(&self, text: &str) -> bool {
        text.starts_with(CIPHERTEXT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec_with_key(byte: u8) -> EncryptionCodec {
        let config = EncryptionConfig {
            key: STANDARD.encode([byte; 32]),
        };
        EncryptionCodec::new(&config).unwrap()
    }

    #[test]
    fn construction_rejects_bad_keys() {
        let missing = EncryptionConfig { key: String::new() };
        assert!(matches!(
            EncryptionCodec::new(&missing),
            Err(CoreError::Config(_))
        ));

        let garbled = EncryptionConfig {
            key: "!!not base64!!".to_string(),
        };
        assert!(matches!(
            EncryptionCodec::new(&garbled),
            Err(CoreError::Config(_))
        ));

        let short = EncryptionConfig {
            key: STANDARD.encode([1u8; 16]),
        };
        assert!(matches!(
            EncryptionCodec::new(&short),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn round_trips_valid_json_payloads() {
        let codec = codec_with_key(7);
        for payload in ["\"1.2.3.4\"", "{\"cidr\":\"10.0.0.0/8\"}", "[1,2,3]", "42"] {
            let ciphertext = codec.encrypt(payload).unwrap();
            assert_ne!(ciphertext, payload);
            assert_eq!(codec.decrypt(&ciphertext).unwrap(), payload);
        }
    }

    #[test]
    fn encrypt_rejects_empty_and_non_json() {
        let codec = codec_with_key(7);
        assert!(matches!(
            codec.encrypt(""),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            codec.encrypt("plainly not json"),
            Err(CoreError::Encryption(_))
        ));
    }

    #[test]
    fn decrypt_fails_on_tampered_ciphertext() {
        let codec = codec_with_key(7);
        let ciphertext = codec.encrypt("\"1.2.3.4\"").unwrap();

        let mut blob = STANDARD
            .decode(ciphertext.strip_prefix(CIPHERTEXT_PREFIX).unwrap())
            .unwrap();
        let tail = blob.len() - 1;
        blob[tail] ^= 0xff;
        let tampered = format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(blob));

        assert!(matches!(
            codec.decrypt(&tampered),
            Err(CoreError::Encryption(_))
        ));
    }

    #[test]
    fn decrypt_fails_under_a_foreign_key() {
        let ours = codec_with_key(7);
        let theirs = codec_with_key(8);
        let ciphertext = theirs.encrypt("\"1.2.3.4\"").unwrap();

        assert!(matches!(
            ours.decrypt(&ciphertext),
            Err(CoreError::Encryption(_))
        ));
    }

    #[test]
    fn is_encrypted_is_total() {
        let codec = codec_with_key(7);
        assert!(codec.is_encrypted(&codec.encrypt("\"x\"").unwrap()));

        for garbage in [
            "",
            "plaintext",
            "{\"valid\":\"json but not ciphertext\"}",
            "enc1:",
            "enc1:!!!",
            "enc1:AAAA",
        ] {
            assert!(!codec.is_encrypted(garbage));
        }
    }

    #[test]
    fn header_classification_is_structural() {
        let codec = codec_with_key(7);
        let ciphertext = codec.encrypt("\"x\"").unwrap();
        assert!(codec.is_ciphertext(&ciphertext));
        assert!(codec.is_ciphertext("enc1:tampered-beyond-recovery"));
        assert!(!codec.is_ciphertext("\"plain string\""));
    }
}

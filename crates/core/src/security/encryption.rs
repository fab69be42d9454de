//! Field-level envelope encryption (C1).
//!
//! AES-256-GCM with a per-value HKDF-SHA256 subkey: the master key never
//! touches a cipher directly. Every encryption derives a fresh subkey from
//! a random 16-byte salt and a caller-supplied context string, binds that
//! same context as AEAD associated data, and emits
//! `base64(salt16 ‖ nonce12 ‖ ciphertext ‖ tag16)`.
//!
//! Context is mandatory - callers pass `"<record_id>:<field_name>"` (or a
//! tenant/record fingerprint for non-field values like search hashes).
//! There is no fallback info string: a caller that cannot name a context is
//! a bug to fix at the call site, not a condition to paper over silently.
//!
//! All failures - bad key length, wrong context, truncated input, corrupt
//! tag - collapse to the single opaque `Error::crypto_failure()` kind so a
//! caller can never distinguish "wrong context" from "tampered ciphertext"
//! (a decryption oracle).

use crate::{config::SecurityConfig, error::Result, Error};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// Field-level envelope encryption service. Holds only the SHA-256 digest
/// of the configured master secret - the secret itself is never retained.
pub struct EncryptionService {
    master_key: [u8; 32],
}

impl EncryptionService {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        if config.encryption_master_key.len() < 32 {
            return Err(Error::validation(
                "encryption master key must be at least 32 characters long",
            ));
        }

        let master_key: [u8; 32] = Sha256::digest(config.encryption_master_key.as_bytes()).into();
        Ok(Self { master_key })
    }

    #[cfg(test)]
    fn from_secret(secret: &str) -> Self {
        let master_key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { master_key }
    }

    fn derive_subkey(&self, salt: &[u8; SALT_SIZE], context: &str) -> [u8; 32] {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), &self.master_key);
        let mut subkey = [0u8; 32];
        hkdf.expand(context.as_bytes(), &mut subkey)
            .expect("32-byte okm is within HKDF-SHA256's output range");
        subkey
    }

    /// Encrypts `plaintext` under a subkey derived from `context`. Two
    /// encryptions of the same plaintext under the same context yield
    /// different ciphertexts (random salt + nonce). Empty input passes
    /// through as empty output without touching the cipher, so sentinel
    /// "no value" data never burns a nonce.
    pub fn encrypt(&self, plaintext: &str, context: &str) -> Result<String> {
        if context.is_empty() {
            return Err(Error::validation(
                "encryption context must not be empty - absence of context is a caller bug",
            ));
        }
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        let subkey = self.derive_subkey(&salt, context);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
        let ciphertext = cipher
            .encrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: plaintext.as_bytes(),
                    aad: context.as_bytes(),
                },
            )
            .map_err(|_| Error::crypto_failure())?;

        let mut combined = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&salt);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(combined))
    }

    /// Decrypts a value produced by `encrypt` with the same `context`. A
    /// mismatching context and a corrupted ciphertext are indistinguishable
    /// to the caller - both return `Error::crypto_failure()`.
    pub fn decrypt(&self, ciphertext_b64: &str, context: &str) -> Result<String> {
        if context.is_empty() {
            return Err(Error::validation(
                "decryption context must not be empty - absence of context is a caller bug",
            ));
        }
        if ciphertext_b64.is_empty() {
            return Ok(String::new());
        }

        let combined = STANDARD
            .decode(ciphertext_b64)
            .map_err(|_| Error::crypto_failure())?;

        if combined.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(Error::crypto_failure());
        }

        let (salt_bytes, rest) = combined.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(salt_bytes);
        let subkey = self.derive_subkey(&salt, context);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: ciphertext,
                    aad: context.as_bytes(),
                },
            )
            .map_err(|_| Error::crypto_failure())?;

        String::from_utf8(plaintext).map_err(|_| Error::crypto_failure())
    }

    /// Encrypts a single record field. Context is `"<record_id>:<field_name>"`
    /// so each field on each record gets its own derived subkey.
    pub fn encrypt_field(&self, value: &str, record_id: &str, field_name: &str) -> Result<String> {
        self.encrypt(value, &format!("{}:{}", record_id, field_name))
    }

    pub fn decrypt_field(&self, ciphertext: &str, record_id: &str, field_name: &str) -> Result<String> {
        self.decrypt(ciphertext, &format!("{}:{}", record_id, field_name))
    }

    /// Deterministic digest for equality-only search over encrypted
    /// columns. Not suitable for authentication - a fixed salt per
    /// deployment means identical values always hash identically.
    pub fn hash_for_search(value: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        to_hex(&hasher.finalize())
    }

    /// Generates a new random master key for operational/config tooling.
    /// Not used on any request path.
    pub fn generate_key() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        to_hex(&bytes)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{:02x}", b).expect("writing to a String never fails");
    }
    out
}

/// Opaque anonymous-channel access code: >=256 bits of CSPRNG output,
/// base64url-encoded (no padding), used for unauthenticated status lookup.
pub struct AccessCode;

impl AccessCode {
    pub fn generate() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// 16-character receipt code for the anonymous channel. Uses a reduced
/// base32 alphabet that excludes `I`, `O`, `0`, `1` to avoid visual
/// confusion; 32^16 ≈ 80 bits of entropy.
pub struct ReceiptCode;

const RECEIPT_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

impl ReceiptCode {
    /// Generates the bare 16-character storage form (no hyphens).
    pub fn generate() -> String {
        let mut rng = rand::thread_rng();
        (0..16)
            .map(|_| {
                let idx = (rng.next_u32() as usize) % RECEIPT_ALPHABET.len();
                RECEIPT_ALPHABET[idx] as char
            })
            .collect()
    }

    /// Formats the bare storage form for display, grouped `XXXX-XXXX-XXXX-XXXX`.
    pub fn format_for_display(code: &str) -> String {
        code.as_bytes()
            .chunks(4)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Normalizes user input: strips hyphens/whitespace, uppercases.
    /// Idempotent - normalizing twice equals normalizing once.
    pub fn normalize(input: &str) -> String {
        input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .to_uppercase()
    }

    /// Validates a normalized code: exactly 16 characters, every character
    /// drawn from the reduced alphabet (rejects `I`, `O`, `0`, `1`).
    pub fn is_valid(normalized: &str) -> bool {
        normalized.len() == 16
            && normalized
                .bytes()
                .all(|b| RECEIPT_ALPHABET.contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> EncryptionService {
        EncryptionService::from_secret("a-test-secret-at-least-32-chars-long")
    }

    #[test]
    fn round_trips_plaintext() {
        let svc = svc();
        let ct = svc.encrypt("geheime meldung", "record-1:description").unwrap();
        let pt = svc.decrypt(&ct, "record-1:description").unwrap();
        assert_eq!(pt, "geheime meldung");
    }

    #[test]
    fn round_trips_empty_and_multibyte() {
        let svc = svc();
        assert_eq!(svc.encrypt("", "ctx").unwrap(), "");
        assert_eq!(svc.decrypt("", "ctx").unwrap(), "");

        let multibyte = "Üß€日本語";
        let ct = svc.encrypt(multibyte, "ctx").unwrap();
        assert_eq!(svc.decrypt(&ct, "ctx").unwrap(), multibyte);
    }

    #[test]
    fn same_plaintext_yields_different_ciphertext() {
        let svc = svc();
        let a = svc.encrypt("x", "ctx").unwrap();
        let b = svc.encrypt("x", "ctx").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_context_yields_different_ciphertext() {
        let svc = svc();
        let a = svc.encrypt("x", "ctx-1").unwrap();
        let b = svc.encrypt("x", "ctx-2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_context_fails_opaquely() {
        let svc = svc();
        let ct = svc.encrypt("secret", "record-1:title").unwrap();
        let err = svc.decrypt(&ct, "record-1:description").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::CryptoFailure);
    }

    #[test]
    fn rejects_empty_context() {
        let svc = svc();
        assert!(svc.encrypt("x", "").is_err());
    }

    #[test]
    fn search_hash_is_deterministic() {
        let a = EncryptionService::hash_for_search("alice@example.com", "tenant-salt");
        let b = EncryptionService::hash_for_search("alice@example.com", "tenant-salt");
        assert_eq!(a, b);
    }

    #[test]
    fn access_code_has_sufficient_length() {
        let code = AccessCode::generate();
        assert!(code.len() >= 43, "base64url(32 bytes) is 43 chars");
    }

    #[test]
    fn receipt_code_roundtrips_normalization() {
        let code = "XKBV-3MWN-A5QR-ZTP8";
        let normalized = ReceiptCode::normalize(code);
        assert_eq!(normalized, "XKBV3MWNA5QRZTP8");
        assert!(ReceiptCode::is_valid(&normalized));
        assert_eq!(ReceiptCode::normalize(&normalized), normalized);
    }

    #[test]
    fn receipt_code_rejects_confusable_characters() {
        assert!(!ReceiptCode::is_valid("ABCDEFGHJKLMNOPQ")); // contains O
        assert!(!ReceiptCode::is_valid("ABCDEFGHJKLMN0PQ")); // contains 0
    }

    #[test]
    fn receipt_code_displays_grouped() {
        let bare = "XKBV3MWNA5QRZTP8";
        assert_eq!(ReceiptCode::format_for_display(bare), "XKBV-3MWN-A5QR-ZTP8");
    }
}

//! Key handling and transaction signing.
//!
//! # Security
//! - Private keys are loaded from hex text or the environment, never from config files
//! - Keys are never logged or serialized
//!
//! # Schemes
//! - `Ecdsa`: secp256k1 over `keccak256(raw)`, output `r || s || recovery_id`
//! - `Ed25519Blake2b`: Ed25519 over `BLAKE2b-256(raw, personal = "CryptapeCryptape")`,
//!   output `signature || public_key`
//!
//! The scheme is always chosen by the caller. A 32-byte key is valid material
//! for both schemes and the same bytes sign differently depending on it.

use alloy::hex;
use alloy::primitives::{keccak256, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{
    Scheme, Signature, TxError, TxResult, ED25519_PUBLIC_KEY_LEN, ED25519_SIGNATURE_LEN,
};
use crate::blockchain::wire::{serialize_envelope, serialize_raw};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "APPCHAIN_PRIVATE_KEY";

/// BLAKE2b personalization used before Ed25519 signing.
pub const BLAKE2B_PERSONAL: &[u8; 16] = b"CryptapeCryptape";

/// BLAKE2b-256 digest of raw transaction bytes, no key, no salt.
pub fn blake2b_digest(raw: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(BLAKE2B_PERSONAL)
        .hash(raw);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Identity recovered from a verified signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerId {
    /// Address recovered from an ECDSA signature.
    Address(Address),
    /// Ed25519 public key embedded in the signature.
    Ed25519([u8; ED25519_PUBLIC_KEY_LEN]),
}

/// Holder of key material able to sign with either scheme.
#[derive(Clone)]
pub struct Wallet {
    secp256k1: Option<PrivateKeySigner>,
    ed25519: Option<SigningKey>,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key (with or without 0x).
    ///
    /// 32 bytes yield a secp256k1 key (when the scalar is in range) and an
    /// Ed25519 seed; 64 bytes are read as an Ed25519 `seed || public_key` pair.
    pub fn from_private_key(private_key_hex: &str) -> TxResult<Self> {
        let key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let bytes = hex::decode(key_hex)
            .map_err(|e| TxError::Signing(format!("Invalid private key format: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Create a wallet from raw key bytes.
    pub fn from_bytes(key: &[u8]) -> TxResult<Self> {
        let wallet = match key.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(key);
                Self {
                    secp256k1: PrivateKeySigner::from_slice(key).ok(),
                    ed25519: Some(SigningKey::from_bytes(&seed)),
                }
            }
            64 => {
                let mut pair = [0u8; 64];
                pair.copy_from_slice(key);
                let signing_key = SigningKey::from_keypair_bytes(&pair).map_err(|_| {
                    TxError::Signing("Ed25519 public key does not match seed".to_string())
                })?;
                Self {
                    secp256k1: None,
                    ed25519: Some(signing_key),
                }
            }
            n => {
                return Err(TxError::Signing(format!(
                    "Invalid private key length: expected 32 or 64 bytes, got {}",
                    n
                )))
            }
        };

        tracing::debug!(
            ecdsa = wallet.secp256k1.is_some(),
            ed25519 = wallet.ed25519.is_some(),
            address = ?wallet.address(),
            "Wallet initialized"
        );

        Ok(wallet)
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `APPCHAIN_PRIVATE_KEY` from environment.
    pub fn from_env() -> TxResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            TxError::Signing(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Sender address of the secp256k1 key, if the material holds one.
    pub fn address(&self) -> Option<Address> {
        self.secp256k1.as_ref().map(|s| s.address())
    }

    /// Ed25519 public key, if the material holds one.
    pub fn ed25519_public_key(&self) -> Option<[u8; ED25519_PUBLIC_KEY_LEN]> {
        self.ed25519.as_ref().map(|k| k.verifying_key().to_bytes())
    }

    /// Whether this wallet can sign with `scheme`.
    pub fn supports(&self, scheme: Scheme) -> bool {
        match scheme {
            Scheme::Ecdsa => self.secp256k1.is_some(),
            Scheme::Ed25519Blake2b => self.ed25519.is_some(),
        }
    }

    /// Sign raw transaction bytes with the requested scheme.
    pub fn sign(&self, raw: &[u8], scheme: Scheme) -> TxResult<Signature> {
        match scheme {
            Scheme::Ecdsa => self.sign_ecdsa(raw),
            Scheme::Ed25519Blake2b => self.sign_ed25519(raw),
        }
    }

    /// Serialize and sign a transaction, returning the raw bytes alongside.
    pub fn sign_transaction(
        &self,
        tx: &Transaction,
        scheme: Scheme,
    ) -> TxResult<(Vec<u8>, Signature)> {
        let raw = serialize_raw(tx);
        let signature = self.sign(&raw, scheme)?;
        Ok((raw, signature))
    }

    /// Full signing flow: raw bytes, signature, hex envelope.
    pub fn sign_to_envelope(&self, tx: &Transaction, scheme: Scheme) -> TxResult<String> {
        let (raw, signature) = self.sign_transaction(tx, scheme)?;
        serialize_envelope(&raw, &signature)
    }

    fn sign_ecdsa(&self, raw: &[u8]) -> TxResult<Signature> {
        let signer = self.secp256k1.as_ref().ok_or_else(|| {
            TxError::Signing("key material is not a valid secp256k1 private key".to_string())
        })?;

        let hash = keccak256(raw);
        let sig = signer
            .sign_hash_sync(&hash)
            .map_err(|e| TxError::Signing(format!("Signing failed: {}", e)))?;

        let mut bytes = Vec::with_capacity(Scheme::Ecdsa.signature_len());
        bytes.extend_from_slice(&sig.r().to_be_bytes::<32>());
        bytes.extend_from_slice(&sig.s().to_be_bytes::<32>());
        bytes.push(sig.v() as u8);
        Signature::new(Scheme::Ecdsa, bytes)
    }

    fn sign_ed25519(&self, raw: &[u8]) -> TxResult<Signature> {
        let key = self.ed25519.as_ref().ok_or_else(|| {
            TxError::Signing("key material is not a valid Ed25519 key".to_string())
        })?;

        let digest = blake2b_digest(raw);
        let sig = key.sign(&digest);

        let mut bytes = Vec::with_capacity(Scheme::Ed25519Blake2b.signature_len());
        bytes.extend_from_slice(&sig.to_bytes());
        bytes.extend_from_slice(key.verifying_key().as_bytes());
        Signature::new(Scheme::Ed25519Blake2b, bytes)
    }
}

/// Verify a signature over raw bytes and return who produced it.
pub fn verify_signature(raw: &[u8], signature: &Signature) -> TxResult<SignerId> {
    let bytes = signature.as_bytes();
    match signature.scheme() {
        Scheme::Ecdsa => {
            let sig = alloy::primitives::Signature::from_raw(bytes)
                .map_err(|e| TxError::Signing(format!("Invalid ECDSA signature: {}", e)))?;
            let hash: B256 = keccak256(raw);
            let address = sig
                .recover_address_from_prehash(&hash)
                .map_err(|e| TxError::Signing(format!("Recovery failed: {}", e)))?;
            Ok(SignerId::Address(address))
        }
        Scheme::Ed25519Blake2b => {
            let mut sig_bytes = [0u8; ED25519_SIGNATURE_LEN];
            sig_bytes.copy_from_slice(&bytes[..ED25519_SIGNATURE_LEN]);
            let mut pk = [0u8; ED25519_PUBLIC_KEY_LEN];
            pk.copy_from_slice(&bytes[ED25519_SIGNATURE_LEN..]);

            let verifying_key = VerifyingKey::from_bytes(&pk)
                .map_err(|_| TxError::Signing("Invalid embedded Ed25519 public key".to_string()))?;
            verifying_key
                .verify(&blake2b_digest(raw), &ed25519_dalek::Signature::from_bytes(&sig_bytes))
                .map_err(|_| TxError::Signing("Ed25519 signature does not verify".to_string()))?;
            Ok(SignerId::Ed25519(pk))
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("ed25519", &self.ed25519.is_some())
            .finish()
    }
}

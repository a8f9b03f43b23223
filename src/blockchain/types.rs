//! Shared types and error definitions for the transaction engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building, signing, submitting or tracking a
/// transaction.
///
/// Construction, serialization and signing errors abort the pipeline for that
/// transaction. Transport errors are surfaced untouched so the caller can make
/// its own retry decision.
#[derive(Debug, Error)]
pub enum TxError {
    /// Monetary amount is neither valid hex nor valid decimal, or exceeds 256 bits.
    #[error("Malformed value '{input}': {reason}")]
    MalformedValue { input: String, reason: String },

    /// A builder precondition was violated.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Key material is missing or malformed for the requested scheme.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Raw transaction or envelope bytes violate the wire schema.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The node answered with a JSON-RPC error object.
    #[error("Remote error {code}: {message}")]
    RemoteProtocol { code: i64, message: String },

    /// Connection, timeout, HTTP status or JSON decoding failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node accepted the request but refused the transaction.
    #[error("Transaction submission rejected with status '{status}'")]
    Submission { status: String },
}

impl TxError {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the failure happened below the JSON-RPC layer.
    ///
    /// A transport failure on submission does not tell whether the node
    /// received the transaction, so blind resubmission may duplicate it.
    pub fn is_transport(&self) -> bool {
        matches!(self, TxError::Transport(_))
    }
}

/// Result type for transaction engine operations.
pub type TxResult<T> = Result<T, TxError>;

/// Cryptographic scheme used to sign a raw transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// ECDSA over secp256k1 with a recovery id.
    #[default]
    Ecdsa,
    /// BLAKE2b digest signed with Ed25519, public key appended.
    Ed25519Blake2b,
}

impl Scheme {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ecdsa => "ecdsa",
            Scheme::Ed25519Blake2b => "ed25519_blake2b",
        }
    }

    /// Expected signature length in bytes for this scheme.
    pub fn signature_len(&self) -> usize {
        match self {
            Scheme::Ecdsa => ECDSA_SIGNATURE_LEN,
            Scheme::Ed25519Blake2b => ED25519_SIGNATURE_LEN + ED25519_PUBLIC_KEY_LEN,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `r || s || recovery_id`.
pub const ECDSA_SIGNATURE_LEN: usize = 65;
pub const ED25519_SIGNATURE_LEN: usize = 64;
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// A scheme-tagged signature over raw transaction bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    scheme: Scheme,
    bytes: Vec<u8>,
}

impl Signature {
    /// Wrap signature bytes, checking the length the scheme requires.
    pub fn new(scheme: Scheme, bytes: Vec<u8>) -> TxResult<Self> {
        if bytes.len() != scheme.signature_len() {
            return Err(TxError::Signing(format!(
                "{} signature must be {} bytes, got {}",
                scheme,
                scheme.signature_len(),
                bytes.len()
            )));
        }
        Ok(Self { scheme, bytes })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Public key embedded after the Ed25519 signature, if any.
    pub fn embedded_public_key(&self) -> Option<&[u8]> {
        match self.scheme {
            Scheme::Ecdsa => None,
            Scheme::Ed25519Blake2b => Some(&self.bytes[ED25519_SIGNATURE_LEN..]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_length_checked() {
        assert!(Signature::new(Scheme::Ecdsa, vec![0u8; 65]).is_ok());
        assert!(Signature::new(Scheme::Ecdsa, vec![0u8; 64]).is_err());
        assert!(Signature::new(Scheme::Ed25519Blake2b, vec![0u8; 96]).is_ok());

        let err = Signature::new(Scheme::Ed25519Blake2b, vec![0u8; 64]).unwrap_err();
        assert!(err.to_string().contains("96 bytes"));
    }

    #[test]
    fn test_embedded_public_key() {
        let mut bytes = vec![0u8; 64];
        bytes.extend_from_slice(&[7u8; 32]);
        let sig = Signature::new(Scheme::Ed25519Blake2b, bytes).unwrap();
        assert_eq!(sig.embedded_public_key(), Some(&[7u8; 32][..]));

        let sig = Signature::new(Scheme::Ecdsa, vec![1u8; 65]).unwrap();
        assert!(sig.embedded_public_key().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = TxError::RemoteProtocol {
            code: -32602,
            message: "invalid params".to_string(),
        };
        assert_eq!(err.to_string(), "Remote error -32602: invalid params");

        assert!(TxError::Transport("refused".into()).is_transport());
        assert!(!TxError::Signing("bad key".into()).is_transport());
    }

    #[test]
    fn test_scheme_serde_labels() {
        let scheme: Scheme = serde_json::from_str("\"ed25519_blake2b\"").unwrap();
        assert_eq!(scheme, Scheme::Ed25519Blake2b);
        assert_eq!(Scheme::default(), Scheme::Ecdsa);
    }
}

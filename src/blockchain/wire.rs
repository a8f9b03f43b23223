//! Wire encoding of raw transactions and signed envelopes.
//!
//! # Data Flow
//! ```text
//! Transaction
//!     → serialize_raw       (protobuf RawTransaction bytes, signed over)
//!     → serialize_envelope  (UnverifiedTransaction{raw, signature, crypto})
//!     → "0x" + hex          (param of sendRawTransaction)
//! ```
//!
//! Field order is fixed by the schema tags and proto3 default values are
//! omitted, so one logical transaction always yields the same bytes.

use alloy::hex;
use alloy::primitives::{Bytes, U256};
use prost::Message;

use crate::blockchain::transaction::Transaction;
use crate::blockchain::types::{Scheme, Signature, TxError, TxResult};
use crate::blockchain::value::{decode_value, encode_value};

/// Unsigned transaction body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawTransaction {
    #[prost(string, tag = "1")]
    pub to: String,
    /// Lowercase hex without prefix.
    #[prost(string, tag = "2")]
    pub nonce: String,
    #[prost(uint64, tag = "3")]
    pub quota: u64,
    #[prost(uint64, tag = "4")]
    pub valid_until_block: u64,
    #[prost(bytes = "vec", tag = "5")]
    pub data: Vec<u8>,
    /// Big-endian, at most 32 bytes.
    #[prost(bytes = "vec", tag = "6")]
    pub value: Vec<u8>,
    #[prost(int32, tag = "7")]
    pub chain_id: i32,
    #[prost(int32, tag = "8")]
    pub version: i32,
}

/// Signed envelope submitted to the node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnverifiedTransaction {
    #[prost(message, optional, tag = "1")]
    pub transaction: Option<RawTransaction>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
    #[prost(enumeration = "Crypto", tag = "3")]
    pub crypto: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Crypto {
    Secp = 0,
    /// Reserved by the node schema; never produced here.
    Sm2 = 1,
    Ed25519 = 2,
}

impl From<Scheme> for Crypto {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Ecdsa => Crypto::Secp,
            Scheme::Ed25519Blake2b => Crypto::Ed25519,
        }
    }
}

impl TryFrom<Crypto> for Scheme {
    type Error = TxError;

    fn try_from(crypto: Crypto) -> TxResult<Self> {
        match crypto {
            Crypto::Secp => Ok(Scheme::Ecdsa),
            Crypto::Ed25519 => Ok(Scheme::Ed25519Blake2b),
            Crypto::Sm2 => Err(TxError::MalformedEnvelope(
                "SM2 signatures are not supported".to_string(),
            )),
        }
    }
}

impl From<&Transaction> for RawTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            to: tx.to.clone(),
            nonce: format!("{:x}", tx.nonce),
            quota: tx.quota,
            valid_until_block: tx.valid_until_block,
            data: tx.data.to_vec(),
            value: encode_value(tx.value),
            chain_id: tx.chain_id,
            version: tx.version,
        }
    }
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = TxError;

    fn try_from(raw: RawTransaction) -> TxResult<Self> {
        if raw.nonce.is_empty() {
            return Err(TxError::MalformedEnvelope("nonce is missing".to_string()));
        }
        if !raw.nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TxError::MalformedEnvelope(format!(
                "nonce '{}' is not hex",
                raw.nonce
            )));
        }
        let nonce = U256::from_str_radix(&raw.nonce, 16).map_err(|_| {
            TxError::MalformedEnvelope(format!("nonce '{}' exceeds 256 bits", raw.nonce))
        })?;

        Ok(Transaction {
            to: raw.to,
            nonce,
            quota: raw.quota,
            valid_until_block: raw.valid_until_block,
            version: raw.version,
            chain_id: raw.chain_id,
            value: decode_value(&raw.value)?,
            data: Bytes::from(raw.data),
        })
    }
}

/// Canonical bytes of the unsigned transaction.
pub fn serialize_raw(tx: &Transaction) -> Vec<u8> {
    RawTransaction::from(tx).encode_to_vec()
}

/// Parse raw transaction bytes.
pub fn deserialize_raw(bytes: &[u8]) -> TxResult<Transaction> {
    let raw = RawTransaction::decode(bytes)
        .map_err(|e| TxError::MalformedEnvelope(format!("raw transaction: {}", e)))?;
    Transaction::try_from(raw)
}

/// Wrap raw bytes and a signature into the hex envelope.
///
/// The raw bytes must parse as a valid transaction and re-encode to
/// themselves, so what was signed is exactly what gets submitted.
pub fn serialize_envelope(raw: &[u8], signature: &Signature) -> TxResult<String> {
    deserialize_raw(raw)?;
    let transaction = RawTransaction::decode(raw)
        .map_err(|e| TxError::MalformedEnvelope(format!("raw transaction: {}", e)))?;
    if transaction.encode_to_vec() != raw {
        return Err(TxError::MalformedEnvelope(
            "raw transaction bytes are not canonical".to_string(),
        ));
    }

    let envelope = UnverifiedTransaction {
        transaction: Some(transaction),
        signature: signature.as_bytes().to_vec(),
        crypto: Crypto::from(signature.scheme()) as i32,
    };

    Ok(hex::encode_prefixed(envelope.encode_to_vec()))
}

/// Contents of a decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    pub transaction: Transaction,
    pub signature: Signature,
    raw: Vec<u8>,
}

impl DecodedEnvelope {
    /// Raw bytes the signature was computed over, as carried by the envelope.
    ///
    /// These can differ from `serialize_raw(&self.transaction)` when the
    /// sender encoded zero values or nonces differently.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Parse a `0x`-prefixed hex envelope.
pub fn deserialize_envelope(envelope_hex: &str) -> TxResult<DecodedEnvelope> {
    let digits = envelope_hex.strip_prefix("0x").ok_or_else(|| {
        TxError::MalformedEnvelope("envelope must start with 0x".to_string())
    })?;
    let bytes = hex::decode(digits)
        .map_err(|e| TxError::MalformedEnvelope(format!("envelope hex: {}", e)))?;
    let envelope = UnverifiedTransaction::decode(bytes.as_slice())
        .map_err(|e| TxError::MalformedEnvelope(format!("envelope: {}", e)))?;

    let crypto = Crypto::try_from(envelope.crypto).map_err(|_| {
        TxError::MalformedEnvelope(format!("unknown crypto tag {}", envelope.crypto))
    })?;
    let scheme = Scheme::try_from(crypto)?;

    let raw = envelope
        .transaction
        .ok_or_else(|| TxError::MalformedEnvelope("transaction is missing".to_string()))?;
    let signature = Signature::new(scheme, envelope.signature)
        .map_err(|e| TxError::MalformedEnvelope(e.to_string()))?;
    let raw_bytes = raw.encode_to_vec();

    Ok(DecodedEnvelope {
        transaction: Transaction::try_from(raw)?,
        signature,
        raw: raw_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::{TransactionBuilder, TxKind};

    fn sample_call(value: &str) -> Transaction {
        TransactionBuilder::new(TxKind::FunctionCall)
            .to("0x0dbd369a741319fa5107733e2c9db9929093e3c7")
            .nonce(U256::from(0x1234u64))
            .quota(50_000)
            .valid_until_block(1_100)
            .version(0)
            .chain_id(1)
            .value(value)
            .data_hex("0x4f2be91f")
            .build()
            .unwrap()
    }

    #[test]
    fn test_raw_round_trip() {
        let tx = sample_call("1000");
        let raw = serialize_raw(&tx);
        assert_eq!(deserialize_raw(&raw).unwrap(), tx);

        let creation = Transaction::contract_creation(
            U256::MAX,
            99_999,
            u64::MAX,
            3,
            -1,
            "0",
            "0x",
        )
        .unwrap();
        let raw = serialize_raw(&creation);
        assert_eq!(deserialize_raw(&raw).unwrap(), creation);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let a = serialize_raw(&sample_call("5"));
        let b = serialize_raw(&sample_call("0x05"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_field_hex_and_decimal() {
        let from_hex =
            RawTransaction::decode(serialize_raw(&sample_call("0xFF")).as_slice()).unwrap();
        let from_dec =
            RawTransaction::decode(serialize_raw(&sample_call("255")).as_slice()).unwrap();
        assert_eq!(from_hex.value, vec![0xff]);
        assert_eq!(from_dec.value, vec![0xff]);
        assert_eq!(hex::encode(&from_hex.value), "ff");
    }

    #[test]
    fn test_known_field_layout() {
        let tx = Transaction::contract_creation(U256::from(1u64), 1, 2, 0, 1, "0", "").unwrap();
        let raw = serialize_raw(&tx);
        // nonce "1", quota 1, valid_until_block 2, value [0x00], chain_id 1
        assert_eq!(hex::encode(&raw), "120131180120023201003801");
    }

    #[test]
    fn test_truncated_raw_rejected() {
        let raw = serialize_raw(&sample_call("7"));
        let err = deserialize_raw(&raw[..raw.len() - 3]).unwrap_err();
        assert!(matches!(err, TxError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_bad_nonce_rejected() {
        let raw = RawTransaction {
            nonce: "xyz".to_string(),
            quota: 1,
            ..Default::default()
        };
        let err = deserialize_raw(&raw.encode_to_vec()).unwrap_err();
        assert!(err.to_string().contains("not hex"));
    }

    #[test]
    fn test_envelope_carries_scheme_tag() {
        let raw = serialize_raw(&sample_call("0"));

        let sig = Signature::new(Scheme::Ed25519Blake2b, vec![9u8; 96]).unwrap();
        let envelope = serialize_envelope(&raw, &sig).unwrap();
        assert!(envelope.starts_with("0x"));

        let decoded = deserialize_envelope(&envelope).unwrap();
        assert_eq!(decoded.signature.scheme(), Scheme::Ed25519Blake2b);
        assert_eq!(decoded.raw_bytes(), raw.as_slice());

        let bytes = hex::decode(&envelope[2..]).unwrap();
        let utx = UnverifiedTransaction::decode(bytes.as_slice()).unwrap();
        assert_eq!(utx.crypto, Crypto::Ed25519 as i32);

        let sig = Signature::new(Scheme::Ecdsa, vec![1u8; 65]).unwrap();
        let envelope = serialize_envelope(&raw, &sig).unwrap();
        let decoded = deserialize_envelope(&envelope).unwrap();
        assert_eq!(decoded.signature.scheme(), Scheme::Ecdsa);
        assert_eq!(decoded.signature.as_bytes(), &[1u8; 65][..]);
    }

    #[test]
    fn test_envelope_rejects_invalid_raw_fields() {
        let sig = Signature::new(Scheme::Ecdsa, vec![1u8; 65]).unwrap();

        let bad_nonce = RawTransaction {
            nonce: "zz".to_string(),
            quota: 1,
            valid_until_block: 2,
            ..Default::default()
        };
        let err = serialize_envelope(&bad_nonce.encode_to_vec(), &sig).unwrap_err();
        assert!(matches!(err, TxError::MalformedEnvelope(_)));

        let wide_value = RawTransaction {
            nonce: "1".to_string(),
            quota: 1,
            valid_until_block: 2,
            value: vec![1u8; 40],
            ..Default::default()
        };
        let err = serialize_envelope(&wide_value.encode_to_vec(), &sig).unwrap_err();
        assert!(matches!(err, TxError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decoded_envelope_keeps_signed_bytes() {
        use crate::blockchain::wallet::{verify_signature, SignerId, Wallet};

        // Zero-padded nonce and an omitted zero value: valid, but not how
        // serialize_raw would spell the same transaction.
        let foreign = RawTransaction {
            nonce: "01".to_string(),
            quota: 1,
            valid_until_block: 2,
            ..Default::default()
        };
        let raw = foreign.encode_to_vec();
        assert_eq!(hex::encode(&raw), "1202303118012002");

        let wallet = Wallet::from_private_key(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let sig = wallet.sign(&raw, Scheme::Ecdsa).unwrap();
        let decoded = deserialize_envelope(&serialize_envelope(&raw, &sig).unwrap()).unwrap();

        assert_eq!(decoded.raw_bytes(), raw.as_slice());
        assert_ne!(serialize_raw(&decoded.transaction), raw);
        assert_eq!(
            verify_signature(decoded.raw_bytes(), &decoded.signature).unwrap(),
            SignerId::Address(wallet.address().unwrap())
        );
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        let sig = Signature::new(Scheme::Ecdsa, vec![1u8; 65]).unwrap();
        assert!(serialize_envelope(&[0xff, 0xff, 0xff], &sig).is_err());

        assert!(deserialize_envelope("deadbeef").is_err());
        assert!(deserialize_envelope("0xzz").is_err());

        let sm2 = UnverifiedTransaction {
            transaction: Some(RawTransaction::from(&sample_call("1"))),
            signature: vec![0u8; 65],
            crypto: Crypto::Sm2 as i32,
        };
        let err = deserialize_envelope(&hex::encode_prefixed(sm2.encode_to_vec())).unwrap_err();
        assert!(err.to_string().contains("SM2"));
    }
}

//! Transaction construction and validation.
//!
//! # Responsibilities
//! - Hold the fields of an unsigned transaction
//! - Enforce builder preconditions (quota, validity bound, recipient shape)
//! - Normalize the value and payload encodings
//!
//! The validity bound is stored as given. Sourcing it from a recent block
//! height plus a margin is the caller's job (see
//! [`NodeClient::valid_until_block`](crate::blockchain::client::NodeClient::valid_until_block)).

use alloy::hex;
use alloy::primitives::{Bytes, U256};
use rand::Rng;

use crate::blockchain::types::{TxError, TxResult};
use crate::blockchain::value::{encode_value, parse_value};

/// What a transaction does on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Deploy a contract; the payload is its init code and `to` is empty.
    ContractCreation,
    /// Call a deployed contract; the payload is the encoded call.
    FunctionCall,
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub(crate) to: String,
    pub(crate) nonce: U256,
    pub(crate) quota: u64,
    pub(crate) valid_until_block: u64,
    pub(crate) version: i32,
    pub(crate) chain_id: i32,
    pub(crate) value: U256,
    pub(crate) data: Bytes,
}

impl Transaction {
    /// Build a contract-creation transaction from hex init code.
    #[allow(clippy::too_many_arguments)]
    pub fn contract_creation(
        nonce: U256,
        quota: u64,
        valid_until_block: u64,
        version: i32,
        chain_id: i32,
        value: &str,
        init_code: &str,
    ) -> TxResult<Self> {
        TransactionBuilder::new(TxKind::ContractCreation)
            .nonce(nonce)
            .quota(quota)
            .valid_until_block(valid_until_block)
            .version(version)
            .chain_id(chain_id)
            .value(value)
            .data_hex(init_code)
            .build()
    }

    /// Build a function-call transaction from hex call data.
    #[allow(clippy::too_many_arguments)]
    pub fn function_call(
        to: &str,
        nonce: U256,
        quota: u64,
        valid_until_block: u64,
        version: i32,
        chain_id: i32,
        value: &str,
        call_data: &str,
    ) -> TxResult<Self> {
        TransactionBuilder::new(TxKind::FunctionCall)
            .to(to)
            .nonce(nonce)
            .quota(quota)
            .valid_until_block(valid_until_block)
            .version(version)
            .chain_id(chain_id)
            .value(value)
            .data_hex(call_data)
            .build()
    }

    pub fn kind(&self) -> TxKind {
        if self.to.is_empty() {
            TxKind::ContractCreation
        } else {
            TxKind::FunctionCall
        }
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn valid_until_block(&self) -> u64 {
        self.valid_until_block
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn chain_id(&self) -> i32 {
        self.chain_id
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    /// Canonical big-endian value bytes as they appear on the wire.
    pub fn value_bytes(&self) -> Vec<u8> {
        encode_value(self.value)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload as `0x`-prefixed hex.
    pub fn data_hex(&self) -> String {
        hex::encode_prefixed(&self.data)
    }
}

/// Fresh random nonce.
///
/// The nonce only has to make the raw transaction unique for a sender within
/// one validity window; it is not an ordering counter.
pub fn random_nonce() -> U256 {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    U256::from_be_bytes(bytes)
}

#[derive(Debug, Clone)]
enum Payload {
    Hex(String),
    Raw(Vec<u8>),
}

/// Chained builder for [`Transaction`].
///
/// # Example
///
/// ```rust
/// use appchain_tx::blockchain::transaction::{TransactionBuilder, TxKind};
///
/// let tx = TransactionBuilder::new(TxKind::FunctionCall)
///     .to("0x0dbd369a741319fa5107733e2c9db9929093e3c7")
///     .quota(50_000)
///     .valid_until_block(1_100)
///     .chain_id(1)
///     .value("0")
///     .data_hex("0x4f2be91f")
///     .build()
///     .unwrap();
/// assert_eq!(tx.data_hex(), "0x4f2be91f");
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    kind: TxKind,
    to: String,
    nonce: Option<U256>,
    quota: u64,
    valid_until_block: u64,
    version: i32,
    chain_id: i32,
    value: String,
    payload: Payload,
}

impl TransactionBuilder {
    pub fn new(kind: TxKind) -> Self {
        Self {
            kind,
            to: String::new(),
            nonce: None,
            quota: 0,
            valid_until_block: 0,
            version: 0,
            chain_id: 0,
            value: "0".to_string(),
            payload: Payload::Raw(Vec::new()),
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Set the nonce. When unset, [`build`](Self::build) draws a random one.
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn quota(mut self, quota: u64) -> Self {
        self.quota = quota;
        self
    }

    pub fn valid_until_block(mut self, valid_until_block: u64) -> Self {
        self.valid_until_block = valid_until_block;
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn chain_id(mut self, chain_id: i32) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Decimal or `0x`-prefixed hex amount.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Payload as hex text, with or without `0x`.
    pub fn data_hex(mut self, data: impl Into<String>) -> Self {
        self.payload = Payload::Hex(data.into());
        self
    }

    /// Payload as raw bytes.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.payload = Payload::Raw(data.into());
        self
    }

    /// Validate and produce the transaction.
    pub fn build(self) -> TxResult<Transaction> {
        match (self.kind, self.to.is_empty()) {
            (TxKind::ContractCreation, false) => {
                return Err(TxError::invalid_field(
                    "to",
                    "must be empty for a contract-creation transaction",
                ));
            }
            (TxKind::FunctionCall, true) => {
                return Err(TxError::invalid_field(
                    "to",
                    "must be set for a function-call transaction",
                ));
            }
            _ => {}
        }

        if self.quota == 0 {
            return Err(TxError::invalid_field("quota", "must be greater than zero"));
        }
        if self.valid_until_block == 0 {
            return Err(TxError::invalid_field(
                "valid_until_block",
                "must be above the current block height",
            ));
        }

        let value = parse_value(&self.value)?;

        let data = match self.payload {
            Payload::Raw(bytes) => bytes,
            Payload::Hex(text) => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(&text);
                hex::decode(digits)
                    .map_err(|e| TxError::invalid_field("data", format!("invalid hex: {}", e)))?
            }
        };

        Ok(Transaction {
            to: self.to,
            nonce: self.nonce.unwrap_or_else(random_nonce),
            quota: self.quota,
            valid_until_block: self.valid_until_block,
            version: self.version,
            chain_id: self.chain_id,
            value,
            data: Bytes::from(data),
        })
    }
}

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contributor identity: a 32-byte public wallet address.
///
/// The ledger never signs anything with it; it is an opaque key into
/// balances, claims and profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; 32]);

impl WalletAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Stateless identity resolution from an external account string.
    /// Accepts 64-char hex, with or without a `0x` or `watt:` prefix.
    pub fn from_string(address: &str) -> Result<Self> {
        let stripped = address
            .strip_prefix("watt:")
            .or_else(|| address.strip_prefix("0x"))
            .unwrap_or(address);

        let bytes = hex::decode(stripped)
            .map_err(|_| LedgerError::InvalidAddress(address.to_string()))?;
        if bytes.len() != 32 {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The pool wallet holding posted rewards and escrowed stakes.
    pub fn bounty_pool() -> Self {
        Self([0xBB; 32])
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watt:{}", self.to_hex())
    }
}

// Addresses travel as hex strings in JSON.
impl Serialize for WalletAddress {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_string(&s).map_err(serde::de::Error::custom)
    }
}

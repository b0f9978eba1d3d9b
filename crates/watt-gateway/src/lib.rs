pub mod mock;

pub use mock::MockGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use watt_types::{Result, WalletAddress, WattAmount};

/// A transfer as the token layer reports it. The ledger inspects amount
/// and memo when confirming stakes; it never parses anything deeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub tx_ref: String,
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub amount: WattAmount,
    pub memo: Option<String>,
    pub confirmed: bool,
    pub slot: u64,
    pub block_time: Option<DateTime<Utc>>,
}

/// Boundary to the token layer holding actual WATT balances.
///
/// The ledger treats this as the source of truth for funds movement and
/// keeps its own records consistent with what the gateway reports. Every
/// outbound transfer carries an idempotency key; submitting the same key
/// twice must return the original transaction reference without moving
/// funds again.
#[async_trait]
pub trait EscrowGateway: Send + Sync {
    async fn get_balance(&self, wallet: WalletAddress) -> Result<WattAmount>;

    /// Execute a transfer and return the gateway transaction reference.
    async fn transfer(
        &self,
        from: WalletAddress,
        to: WalletAddress,
        amount: WattAmount,
        memo: &str,
        idempotency_key: &str,
    ) -> Result<String>;

    /// Look up a transfer by reference. `Ok(None)` means the gateway has
    /// no record of it, which callers must not treat as confirmation.
    async fn get_transaction(&self, tx_ref: &str) -> Result<Option<TransactionStatus>>;
}

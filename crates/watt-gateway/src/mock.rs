use crate::{EscrowGateway, TransactionStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use watt_types::{LedgerError, Result, WalletAddress, WattAmount};

/// In-process gateway double used by tests and the standalone CLI.
///
/// Holds balances in memory, records every transfer, and deduplicates on
/// idempotency key the way the real token layer does. `set_offline` makes
/// every call fail so callers' error paths can be exercised.
pub struct MockGateway {
    balances: Arc<RwLock<HashMap<WalletAddress, WattAmount>>>,
    transactions: Arc<RwLock<HashMap<String, TransactionStatus>>>,
    idempotency: Arc<RwLock<HashMap<String, String>>>,
    offline: AtomicBool,
    next_slot: AtomicU64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            idempotency: Arc::new(RwLock::new(HashMap::new())),
            offline: AtomicBool::new(false),
            next_slot: AtomicU64::new(1),
        }
    }

    /// Credit a wallet out of thin air. Test setup only.
    pub async fn fund(&self, wallet: WalletAddress, amount: WattAmount) {
        let mut balances = self.balances.write().await;
        let entry = balances.entry(wallet).or_insert(WattAmount::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// Toggle simulated gateway outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Record a transfer the gateway knows about but has not confirmed.
    /// Lets tests exercise the stake confirmation wait.
    pub async fn inject_unconfirmed(&self, status: TransactionStatus) {
        let mut txs = self.transactions.write().await;
        txs.insert(status.tx_ref.clone(), status);
    }

    /// Flip a previously injected transfer to confirmed.
    pub async fn confirm(&self, tx_ref: &str) {
        let mut txs = self.transactions.write().await;
        if let Some(status) = txs.get_mut(tx_ref) {
            status.confirmed = true;
            status.block_time = Some(Utc::now());
        }
    }

    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Gateway("gateway offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EscrowGateway for MockGateway {
    async fn get_balance(&self, wallet: WalletAddress) -> Result<WattAmount> {
        self.check_online()?;
        let balances = self.balances.read().await;
        Ok(balances.get(&wallet).copied().unwrap_or(WattAmount::ZERO))
    }

    async fn transfer(
        &self,
        from: WalletAddress,
        to: WalletAddress,
        amount: WattAmount,
        memo: &str,
        idempotency_key: &str,
    ) -> Result<String> {
        self.check_online()?;

        {
            let idempotency = self.idempotency.read().await;
            if let Some(existing) = idempotency.get(idempotency_key) {
                debug!(
                    idempotency_key,
                    tx_ref = %existing,
                    "Transfer deduplicated on idempotency key"
                );
                return Ok(existing.clone());
            }
        }

        let mut balances = self.balances.write().await;
        let from_balance = balances.get(&from).copied().unwrap_or(WattAmount::ZERO);
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::Gateway(format!(
                "insufficient balance: {} holds {}, transfer needs {}",
                from, from_balance, amount
            ))
        })?;
        balances.insert(from, remaining);
        let to_balance = balances.entry(to).or_insert(WattAmount::ZERO);
        *to_balance = to_balance.saturating_add(amount);
        drop(balances);

        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst);
        let tx_ref = format!("mock-tx-{:06}", slot);
        let status = TransactionStatus {
            tx_ref: tx_ref.clone(),
            from,
            to,
            amount,
            memo: Some(memo.to_string()),
            confirmed: true,
            slot,
            block_time: Some(Utc::now()),
        };

        let mut txs = self.transactions.write().await;
        txs.insert(tx_ref.clone(), status);
        drop(txs);

        let mut idempotency = self.idempotency.write().await;
        idempotency.insert(idempotency_key.to_string(), tx_ref.clone());

        info!(
            %from,
            %to,
            amount = %amount,
            memo,
            tx_ref = %tx_ref,
            "Transfer executed"
        );
        Ok(tx_ref)
    }

    async fn get_transaction(&self, tx_ref: &str) -> Result<Option<TransactionStatus>> {
        self.check_online()?;
        let txs = self.transactions.read().await;
        Ok(txs.get(tx_ref).cloned())
    }
}

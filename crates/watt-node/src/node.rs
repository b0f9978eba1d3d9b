use crate::config::LedgerConfig;
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;
use watt_claims::ClaimManager;
use watt_gateway::{EscrowGateway, MockGateway};
use watt_profile::ProfileTracker;
use watt_registry::BountyRegistry;
use watt_review::{ReviewAggregator, ScriptedReviewService};
use watt_settlement::SettlementEngine;
use watt_storage::{LedgerStore, MemoryStore};
use watt_types::{Claim, ClaimId, WalletAddress, WattAmount};

/// One fully wired ledger instance.
///
/// In standalone mode the escrow gateway is the in-process mock, seeded
/// with a pool float so settlements have funds to draw on, and the
/// automated scorer is the scripted service fed through the CLI.
pub struct LedgerNode {
    pub config: LedgerConfig,
    pub store: Arc<dyn LedgerStore>,
    pub gateway: Arc<MockGateway>,
    pub registry: Arc<BountyRegistry>,
    pub profiles: Arc<ProfileTracker>,
    pub claims: Arc<ClaimManager>,
    pub scorer: Arc<ScriptedReviewService>,
    pub reviews: Arc<ReviewAggregator>,
    pub engine: Arc<SettlementEngine>,
}

impl LedgerNode {
    pub async fn new(config: LedgerConfig) -> Result<Self> {
        let store = open_store(&config)?;

        let gateway = Arc::new(MockGateway::new());
        gateway
            .fund(
                WalletAddress::bounty_pool(),
                WattAmount::from_watt(config.gateway.pool_float_watt),
            )
            .await;

        let registry = Arc::new(BountyRegistry::new(store.clone()));
        let profiles = Arc::new(ProfileTracker::new(store.clone()));
        let claims = Arc::new(
            ClaimManager::new(
                store.clone(),
                registry.clone(),
                gateway.clone() as Arc<dyn EscrowGateway>,
                profiles.clone(),
            )
            .with_confirm_policy(
                config.stake.confirm_attempts,
                std::time::Duration::from_millis(config.stake.confirm_interval_ms),
            ),
        );
        let scorer = Arc::new(ScriptedReviewService::new());
        let reviews = Arc::new(ReviewAggregator::new(
            store.clone(),
            registry.clone(),
            scorer.clone(),
        ));
        let engine = Arc::new(SettlementEngine::new(
            store.clone(),
            registry.clone(),
            gateway.clone() as Arc<dyn EscrowGateway>,
            profiles.clone(),
        ));

        info!(
            backend = %config.ledger.backend,
            pool_float = config.gateway.pool_float_watt,
            "Ledger node initialized"
        );
        Ok(Self {
            config,
            store,
            gateway,
            registry,
            profiles,
            claims,
            scorer,
            reviews,
            engine,
        })
    }

    /// Standalone-mode stand-in for the contributor's wallet: fund the
    /// contributor, execute the stake transfer with the bounty's memo tag,
    /// and confirm it against the claim.
    pub async fn post_stake(&self, claim_id: ClaimId) -> watt_types::Result<Claim> {
        let claim = self.claims.get_claim(claim_id).await?;
        let bounty = self.registry.get_bounty(claim.bounty_id).await?;

        self.gateway.fund(claim.contributor, claim.stake).await;
        let tx_ref = self
            .gateway
            .transfer(
                claim.contributor,
                WalletAddress::bounty_pool(),
                claim.stake,
                &bounty.stake_memo(),
                &format!("stake-{}", claim_id),
            )
            .await?;
        self.claims
            .confirm_stake(claim_id, &tx_ref, chrono::Utc::now())
            .await
    }
}

fn open_store(config: &LedgerConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.ledger.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "rocksdb")]
        "rocksdb" => {
            let path = config.ledger.data_dir.join("ledger");
            let path = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("non-utf8 data_dir"))?;
            Ok(Arc::new(watt_storage::RocksStore::open(path)?))
        }
        other => bail!("unknown storage backend: {}", other),
    }
}

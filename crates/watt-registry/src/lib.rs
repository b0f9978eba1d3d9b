use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use watt_storage::LedgerStore;
use watt_types::{
    Bounty, BountyId, BountySpec, BountyStatus, BountyTier, LedgerError, LifecycleState, Result,
};

/// System of record for bounty postings.
///
/// Status writes go through `transition`, which enforces the lifecycle
/// table and compares-and-swaps on the bounty's version counter, so two
/// racing writers cannot both move the same bounty.
pub struct BountyRegistry {
    store: Arc<dyn LedgerStore>,
}

impl BountyRegistry {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Validate a posting against its tier band and persist it as Open.
    pub async fn create_bounty(&self, spec: BountySpec, now: DateTime<Utc>) -> Result<Bounty> {
        let bounty = Bounty::from_spec(spec, now)?;
        info!(
            bounty_id = %bounty.id,
            tier = %bounty.tier,
            reward = %bounty.reward,
            issue_ref = %bounty.issue_ref,
            "Bounty posted"
        );
        self.store.put_bounty(bounty.clone()).await?;
        Ok(bounty)
    }

    pub async fn get_bounty(&self, id: BountyId) -> Result<Bounty> {
        self.store
            .get_bounty(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("bounty", id))
    }

    pub async fn list_bounties(&self, status: Option<BountyStatus>) -> Result<Vec<Bounty>> {
        let all = self.store.list_bounties().await?;
        Ok(match status {
            Some(wanted) => all.into_iter().filter(|b| b.status == wanted).collect(),
            None => all,
        })
    }

    /// Open bounties, optionally narrowed to one tier.
    pub async fn list_open(&self, tier: Option<BountyTier>) -> Result<Vec<Bounty>> {
        let open = self.list_bounties(Some(BountyStatus::Open)).await?;
        Ok(match tier {
            Some(wanted) => open.into_iter().filter(|b| b.tier == wanted).collect(),
            None => open,
        })
    }

    /// Move a bounty to `next`, failing if the lifecycle table forbids it
    /// or if the bounty was modified since `expected_version` was read.
    pub async fn transition(
        &self,
        id: BountyId,
        next: BountyStatus,
        expected_version: u64,
    ) -> Result<Bounty> {
        let mut bounty = self.get_bounty(id).await?;

        if bounty.version != expected_version {
            return Err(LedgerError::InvalidTransition {
                entity: format!("bounty {}", id),
                expected: format!("version {}", expected_version),
                found: format!("version {}", bounty.version),
            });
        }
        if !bounty.status.can_transition_to(&next) {
            return Err(LedgerError::InvalidTransition {
                entity: format!("bounty {}", id),
                expected: format!("a state permitting {}", next),
                found: bounty.status.to_string(),
            });
        }

        info!(
            bounty_id = %id,
            from = %bounty.status,
            to = %next,
            "Bounty transitioned"
        );
        bounty.status = next;
        bounty.version += 1;
        self.store.put_bounty(bounty.clone()).await?;
        Ok(bounty)
    }

    /// Administrative withdrawal. Permitted only while Open.
    pub async fn cancel(&self, id: BountyId) -> Result<Bounty> {
        let bounty = self.get_bounty(id).await?;
        self.transition(id, BountyStatus::Cancelled, bounty.version)
            .await
    }
}

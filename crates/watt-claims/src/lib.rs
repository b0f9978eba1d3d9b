use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use watt_gateway::EscrowGateway;
use watt_profile::ProfileTracker;
use watt_registry::BountyRegistry;
use watt_storage::LedgerStore;
use watt_types::claim::MAX_EXTENSION_DAYS;
use watt_types::{
    Bounty, BountyStatus, Claim, ClaimId, ClaimStatus, LedgerError, LifecycleState, Result,
    Submission, WalletAddress,
};

/// Default polling policy while waiting for a stake transfer to confirm.
const DEFAULT_CONFIRM_ATTEMPTS: u32 = 5;
const DEFAULT_CONFIRM_INTERVAL_MS: u64 = 200;

/// Manages claim creation, stake confirmation, deadlines and submission.
///
/// Claim creation is the one multi-entity write in the system (bounty
/// status plus a new claim row), so it runs under a writer mutex inside a
/// store transaction bracket. Everything else is per-entity and relies on
/// version counters.
pub struct ClaimManager {
    store: Arc<dyn LedgerStore>,
    registry: Arc<BountyRegistry>,
    gateway: Arc<dyn EscrowGateway>,
    profiles: Arc<ProfileTracker>,
    claim_lock: Mutex<()>,
    confirm_attempts: u32,
    confirm_interval: std::time::Duration,
}

impl ClaimManager {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<BountyRegistry>,
        gateway: Arc<dyn EscrowGateway>,
        profiles: Arc<ProfileTracker>,
    ) -> Self {
        Self {
            store,
            registry,
            gateway,
            profiles,
            claim_lock: Mutex::new(()),
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            confirm_interval: std::time::Duration::from_millis(DEFAULT_CONFIRM_INTERVAL_MS),
        }
    }

    /// Override the stake confirmation polling policy.
    pub fn with_confirm_policy(mut self, attempts: u32, interval: std::time::Duration) -> Self {
        self.confirm_attempts = attempts.max(1);
        self.confirm_interval = interval;
        self
    }

    pub async fn get_claim(&self, id: ClaimId) -> Result<Claim> {
        self.store
            .get_claim(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("claim", id))
    }

    /// Reserve an Open bounty for a contributor.
    ///
    /// The claim starts in PendingStake; the work window does not begin
    /// until the stake transfer is confirmed.
    pub async fn claim(
        &self,
        bounty: &Bounty,
        contributor: WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        if self.profiles.is_banned(contributor).await? {
            return Err(LedgerError::ContributorBanned(contributor.to_string()));
        }

        let _guard = self.claim_lock.lock().await;

        // Re-read under the lock; the caller's copy may be stale.
        let bounty = self.registry.get_bounty(bounty.id).await?;
        match bounty.status {
            BountyStatus::Open => {}
            BountyStatus::Claimed | BountyStatus::Submitted | BountyStatus::UnderReview => {
                return Err(LedgerError::AlreadyClaimed(bounty.id.to_string()));
            }
            other => {
                return Err(LedgerError::InvalidTransition {
                    entity: format!("bounty {}", bounty.id),
                    expected: BountyStatus::Open.to_string(),
                    found: other.to_string(),
                });
            }
        }

        if bounty.tier.is_high_tier() {
            self.check_high_tier_limit(contributor).await?;
        }

        self.store.begin_transaction().await?;
        let result = self.claim_locked(&bounty, contributor, now).await;
        match result {
            Ok(claim) => {
                self.store.commit_transaction().await?;
                info!(
                    claim_id = %claim.id,
                    bounty_id = %bounty.id,
                    %contributor,
                    stake = %claim.stake,
                    "Claim created, awaiting stake"
                );
                Ok(claim)
            }
            Err(e) => {
                self.store.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn claim_locked(
        &self,
        bounty: &Bounty,
        contributor: WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        self.registry
            .transition(bounty.id, BountyStatus::Claimed, bounty.version)
            .await?;
        let claim = Claim::new(bounty.id, contributor, bounty.required_stake(), now);
        self.store.put_claim(claim.clone()).await?;
        Ok(claim)
    }

    /// One live high-tier claim per wallet, across all bounties.
    async fn check_high_tier_limit(&self, contributor: WalletAddress) -> Result<()> {
        let claims = self.store.list_claims_for_contributor(contributor).await?;
        for claim in claims.iter().filter(|c| c.is_live()) {
            let bounty = self.registry.get_bounty(claim.bounty_id).await?;
            if bounty.tier.is_high_tier() {
                return Err(LedgerError::TierLimitExceeded(claim.id.to_string()));
            }
        }
        Ok(())
    }

    /// Verify the contributor's stake transfer and start the work window.
    ///
    /// Polls the gateway a bounded number of times. The transfer must be
    /// confirmed, sent by the claimant, paid into the bounty pool, carry
    /// the bounty's memo tag, match the required stake exactly, and not
    /// already escrow another claim. Attribution problems (sender, memo,
    /// destination, prior use) surface as StakeUnconfirmed; a wrong
    /// amount on an attributable transfer is StakeMismatch.
    pub async fn confirm_stake(
        &self,
        claim_id: ClaimId,
        tx_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        let mut claim = self.get_claim(claim_id).await?;
        if claim.status != ClaimStatus::PendingStake {
            return Err(LedgerError::InvalidTransition {
                entity: format!("claim {}", claim_id),
                expected: ClaimStatus::PendingStake.to_string(),
                found: claim.status.to_string(),
            });
        }
        let bounty = self.registry.get_bounty(claim.bounty_id).await?;

        let tx = self.wait_for_transaction(tx_ref).await?;
        let tx = match tx {
            Some(tx) if tx.confirmed => tx,
            _ => {
                debug!(claim_id = %claim_id, tx_ref, "Stake transfer not confirmed in time");
                return Err(LedgerError::StakeUnconfirmed(format!(
                    "transfer {} not confirmed",
                    tx_ref
                )));
            }
        };

        if tx.from != claim.contributor {
            return Err(LedgerError::StakeUnconfirmed(format!(
                "transfer {} was not sent by {}",
                tx_ref, claim.contributor
            )));
        }
        if tx.to != WalletAddress::bounty_pool() {
            return Err(LedgerError::StakeUnconfirmed(format!(
                "transfer {} not paid into the bounty pool",
                tx_ref
            )));
        }
        // A transfer escrows at most one claim, ever. Without this a
        // forfeited stake could be replayed against a reopened bounty.
        let already_bound = self
            .store
            .list_claims()
            .await?
            .iter()
            .any(|c| c.id != claim.id && c.stake_tx_ref.as_deref() == Some(tx_ref));
        if already_bound {
            return Err(LedgerError::StakeUnconfirmed(format!(
                "transfer {} already escrows another claim",
                tx_ref
            )));
        }
        let expected_memo = bounty.stake_memo();
        if tx.memo.as_deref() != Some(expected_memo.as_str()) {
            return Err(LedgerError::StakeUnconfirmed(format!(
                "transfer {} memo {:?} does not match {}",
                tx_ref, tx.memo, expected_memo
            )));
        }
        if tx.amount != claim.stake {
            return Err(LedgerError::StakeMismatch {
                expected: claim.stake.to_watt(),
                actual: tx.amount.to_watt(),
            });
        }

        claim.status = ClaimStatus::Active;
        claim.stake_tx_ref = Some(tx_ref.to_string());
        claim.deadline = Some(Claim::standard_deadline(now));
        claim.version += 1;
        self.store.put_claim(claim.clone()).await?;

        info!(
            claim_id = %claim_id,
            tx_ref,
            deadline = %claim.deadline.map(|d| d.to_rfc3339()).unwrap_or_default(),
            "Stake confirmed, work window started"
        );
        Ok(claim)
    }

    async fn wait_for_transaction(
        &self,
        tx_ref: &str,
    ) -> Result<Option<watt_gateway::TransactionStatus>> {
        for attempt in 0..self.confirm_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.confirm_interval).await;
            }
            match self.gateway.get_transaction(tx_ref).await? {
                Some(tx) if tx.confirmed => return Ok(Some(tx)),
                other => {
                    debug!(tx_ref, attempt, "Stake transfer pending");
                    if attempt + 1 == self.confirm_attempts {
                        return Ok(other);
                    }
                }
            }
        }
        Ok(None)
    }

    /// Grant the single permitted deadline extension.
    pub async fn extend(
        &self,
        claim_id: ClaimId,
        extra_days: i64,
        reason: &str,
    ) -> Result<Claim> {
        if !(1..=MAX_EXTENSION_DAYS).contains(&extra_days) {
            return Err(LedgerError::InvalidParameter(format!(
                "extension of {} days outside 1..={}",
                extra_days, MAX_EXTENSION_DAYS
            )));
        }

        let mut claim = self.get_claim(claim_id).await?;
        if claim.status != ClaimStatus::Active {
            return Err(LedgerError::InvalidTransition {
                entity: format!("claim {}", claim_id),
                expected: ClaimStatus::Active.to_string(),
                found: claim.status.to_string(),
            });
        }
        if claim.extension_used {
            return Err(LedgerError::ExtensionAlreadyUsed(claim_id.to_string()));
        }
        let deadline = claim
            .deadline
            .ok_or_else(|| LedgerError::InvalidParameter("claim has no deadline".to_string()))?;

        claim.deadline = Some(deadline + Duration::days(extra_days));
        claim.extension_used = true;
        claim.extension_reason = Some(reason.to_string());
        claim.version += 1;
        self.store.put_claim(claim.clone()).await?;

        info!(
            claim_id = %claim_id,
            extra_days,
            reason,
            "Deadline extended"
        );
        Ok(claim)
    }

    /// Attach a work artifact and move claim and bounty to Submitted.
    pub async fn submit(
        &self,
        claim_id: ClaimId,
        artifact_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<(Claim, Submission)> {
        let mut claim = self.get_claim(claim_id).await?;
        if claim.status != ClaimStatus::Active {
            return Err(LedgerError::InvalidTransition {
                entity: format!("claim {}", claim_id),
                expected: ClaimStatus::Active.to_string(),
                found: claim.status.to_string(),
            });
        }

        let submission = Submission::new(claim.id, claim.bounty_id, artifact_ref.to_string(), now);
        self.store.put_submission(submission.clone()).await?;

        claim.status = ClaimStatus::Submitted;
        claim.submission_id = Some(submission.id);
        claim.version += 1;
        self.store.put_claim(claim.clone()).await?;

        let bounty = self.registry.get_bounty(claim.bounty_id).await?;
        self.registry
            .transition(bounty.id, BountyStatus::Submitted, bounty.version)
            .await?;

        info!(
            claim_id = %claim_id,
            submission_id = %submission.id,
            artifact_ref,
            "Work submitted"
        );
        Ok((claim, submission))
    }

    /// Voluntary walk-away. The stake stays escrowed until settlement
    /// forfeits it; the bounty reopens for other contributors.
    pub async fn abandon(&self, claim_id: ClaimId) -> Result<Claim> {
        let mut claim = self.get_claim(claim_id).await?;
        if !claim.status.can_transition_to(&ClaimStatus::Abandoned) {
            return Err(LedgerError::InvalidTransition {
                entity: format!("claim {}", claim_id),
                expected: "a live claim".to_string(),
                found: claim.status.to_string(),
            });
        }

        claim.status = ClaimStatus::Abandoned;
        claim.version += 1;
        self.store.put_claim(claim.clone()).await?;
        self.reopen_bounty(&claim).await?;

        warn!(claim_id = %claim_id, "Claim abandoned");
        Ok(claim)
    }

    /// Expire overdue claims and reopen their bounties.
    ///
    /// Safe to run concurrently or repeatedly: only Active claims past
    /// their deadline match, and a swept claim no longer does.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<ClaimId>> {
        let mut swept = Vec::new();
        for mut claim in self.store.list_claims().await? {
            if !claim.is_overdue(now) {
                continue;
            }
            claim.status = ClaimStatus::Expired;
            claim.version += 1;
            self.store.put_claim(claim.clone()).await?;
            self.reopen_bounty(&claim).await?;

            info!(
                claim_id = %claim.id,
                bounty_id = %claim.bounty_id,
                "Claim expired by sweep"
            );
            swept.push(claim.id);
        }
        Ok(swept)
    }

    /// Walk the bounty back to Open along the lifecycle table.
    async fn reopen_bounty(&self, claim: &Claim) -> Result<()> {
        let mut bounty = self.registry.get_bounty(claim.bounty_id).await?;
        if matches!(
            bounty.status,
            BountyStatus::Submitted | BountyStatus::UnderReview
        ) {
            bounty = self
                .registry
                .transition(bounty.id, BountyStatus::Claimed, bounty.version)
                .await?;
        }
        if bounty.status == BountyStatus::Claimed {
            self.registry
                .transition(bounty.id, BountyStatus::Open, bounty.version)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use watt_gateway::{MockGateway, TransactionStatus};
    use watt_storage::MemoryStore;
    use watt_types::{BountySpec, BountyTier, WattAmount};

    struct Harness {
        registry: Arc<BountyRegistry>,
        gateway: Arc<MockGateway>,
        profiles: Arc<ProfileTracker>,
        manager: ClaimManager,
    }

    fn harness() -> Harness {
        harness_with_policy(1, std::time::Duration::from_millis(1))
    }

    fn harness_with_policy(attempts: u32, interval: std::time::Duration) -> Harness {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(BountyRegistry::new(store.clone()));
        let gateway = Arc::new(MockGateway::new());
        let profiles = Arc::new(ProfileTracker::new(store.clone()));
        let manager = ClaimManager::new(
            store,
            registry.clone(),
            gateway.clone(),
            profiles.clone(),
        )
        .with_confirm_policy(attempts, interval);
        Harness {
            registry,
            gateway,
            profiles,
            manager,
        }
    }

    fn wallet(byte: u8) -> WalletAddress {
        WalletAddress::from_bytes([byte; 32])
    }

    async fn post_bounty(h: &Harness, tier: BountyTier, reward: f64) -> Bounty {
        h.registry
            .create_bounty(
                BountySpec {
                    title: "t".to_string(),
                    description: "d".to_string(),
                    tier,
                    reward: WattAmount::from_watt(reward),
                    stake_percent: 0.10,
                    issue_ref: "42".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    async fn stake_tx(h: &Harness, bounty: &Bounty, contributor: WalletAddress) -> String {
        h.gateway
            .fund(contributor, bounty.required_stake())
            .await;
        h.gateway
            .transfer(
                contributor,
                WalletAddress::bounty_pool(),
                bounty.required_stake(),
                &bounty.stake_memo(),
                &format!("stake-{}", contributor.to_hex()),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_claim_confirm_submit_happy_path() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);

        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::PendingStake);
        assert_eq!(claim.stake, WattAmount::from_watt(5_000.0));

        let tx_ref = stake_tx(&h, &bounty, contributor).await;
        let claim = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Active);
        assert!(claim.deadline.is_some());

        let (claim, submission) = h
            .manager
            .submit(claim.id, "PR-1234", Utc::now())
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert_eq!(claim.submission_id, Some(submission.id));

        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Submitted);
    }

    #[tokio::test]
    async fn test_second_claim_rejected_while_first_is_live() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;

        h.manager.claim(&bounty, wallet(1), Utc::now()).await.unwrap();
        let err = h
            .manager
            .claim(&bounty, wallet(2), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClaimed(_)));
    }

    #[tokio::test]
    async fn test_banned_contributor_cannot_claim() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        h.profiles.ban(wallet(1), Utc::now()).await.unwrap();

        let err = h
            .manager
            .claim(&bounty, wallet(1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ContributorBanned(_)));

        // Bounty untouched
        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);
    }

    #[tokio::test]
    async fn test_one_live_high_tier_claim_per_wallet() {
        let h = harness();
        let first = post_bounty(&h, BountyTier::High, 200_000.0).await;
        let second = post_bounty(&h, BountyTier::High, 300_000.0).await;

        h.manager.claim(&first, wallet(1), Utc::now()).await.unwrap();
        let err = h
            .manager
            .claim(&second, wallet(1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TierLimitExceeded(_)));

        // A different wallet is unaffected
        h.manager.claim(&second, wallet(2), Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_rejects_wrong_memo() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();

        h.gateway.fund(contributor, bounty.required_stake()).await;
        let tx_ref = h
            .gateway
            .transfer(
                contributor,
                WalletAddress::bounty_pool(),
                bounty.required_stake(),
                "ISSUE-999",
                "k",
            )
            .await
            .unwrap();

        let err = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StakeUnconfirmed(_)));

        // Claim still waiting; a correct transfer can still confirm it
        let claim = h.manager.get_claim(claim.id).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::PendingStake);
    }

    #[tokio::test]
    async fn test_confirm_rejects_wrong_amount() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();

        h.gateway
            .fund(contributor, WattAmount::from_watt(4_000.0))
            .await;
        let tx_ref = h
            .gateway
            .transfer(
                contributor,
                WalletAddress::bounty_pool(),
                WattAmount::from_watt(4_000.0),
                &bounty.stake_memo(),
                "k",
            )
            .await
            .unwrap();

        let err = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::StakeMismatch {
                expected,
                actual,
            } if expected == 5_000.0 && actual == 4_000.0
        ));
    }

    #[tokio::test]
    async fn test_confirm_rejects_transfer_from_another_wallet() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let claim = h.manager.claim(&bounty, wallet(1), Utc::now()).await.unwrap();

        // Right amount, right memo, wrong sender
        let tx_ref = stake_tx(&h, &bounty, wallet(2)).await;
        let err = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StakeUnconfirmed(_)));

        let claim = h.manager.get_claim(claim.id).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::PendingStake);
    }

    #[tokio::test]
    async fn test_forfeited_stake_cannot_be_replayed_on_reclaim() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);

        let first = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();
        let tx_ref = stake_tx(&h, &bounty, contributor).await;
        h.manager
            .confirm_stake(first.id, &tx_ref, Utc::now())
            .await
            .unwrap();

        // Deadline passes, the sweep forfeits the claim and reopens
        let later = Utc::now() + Duration::days(8);
        h.manager.sweep_expired(later).await.unwrap();
        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);

        // The old transfer is spent; re-claiming needs fresh WATT
        let second = h.manager.claim(&bounty, contributor, later).await.unwrap();
        let err = h
            .manager
            .confirm_stake(second.id, &tx_ref, later)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StakeUnconfirmed(_)));

        let second = h.manager.get_claim(second.id).await.unwrap();
        assert_eq!(second.status, ClaimStatus::PendingStake);
    }

    #[tokio::test]
    async fn test_confirm_waits_for_pending_transfer() {
        let h = harness_with_policy(20, std::time::Duration::from_millis(5));
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();

        h.gateway
            .inject_unconfirmed(TransactionStatus {
                tx_ref: "pending-1".to_string(),
                from: contributor,
                to: WalletAddress::bounty_pool(),
                amount: bounty.required_stake(),
                memo: Some(bounty.stake_memo()),
                confirmed: false,
                slot: 99,
                block_time: None,
            })
            .await;

        // Confirmation lands while the manager is polling
        let gateway = h.gateway.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            gateway.confirm("pending-1").await;
        });

        let claim = h
            .manager
            .confirm_stake(claim.id, "pending-1", Utc::now())
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Active);
    }

    #[tokio::test]
    async fn test_confirm_times_out_on_unknown_transfer() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let claim = h.manager.claim(&bounty, wallet(1), Utc::now()).await.unwrap();

        let err = h
            .manager
            .confirm_stake(claim.id, "no-such-tx", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StakeUnconfirmed(_)));
    }

    #[tokio::test]
    async fn test_extension_granted_once() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();
        let tx_ref = stake_tx(&h, &bounty, contributor).await;
        let claim = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap();
        let original_deadline = claim.deadline.unwrap();

        let claim = h
            .manager
            .extend(claim.id, 3, "upstream API flaky")
            .await
            .unwrap();
        assert_eq!(claim.deadline.unwrap(), original_deadline + Duration::days(3));

        let err = h.manager.extend(claim.id, 2, "again").await.unwrap_err();
        assert!(matches!(err, LedgerError::ExtensionAlreadyUsed(_)));
    }

    #[tokio::test]
    async fn test_extension_bounded_at_seven_days() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();
        let tx_ref = stake_tx(&h, &bounty, contributor).await;
        let claim = h
            .manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap();

        let err = h.manager.extend(claim.id, 8, "too long").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_sweep_expires_overdue_and_reopens_bounty() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let contributor = wallet(1);
        let claim = h.manager.claim(&bounty, contributor, Utc::now()).await.unwrap();
        let tx_ref = stake_tx(&h, &bounty, contributor).await;
        h.manager
            .confirm_stake(claim.id, &tx_ref, Utc::now())
            .await
            .unwrap();

        // Before the deadline nothing matches
        assert!(h.manager.sweep_expired(Utc::now()).await.unwrap().is_empty());

        let later = Utc::now() + Duration::days(8);
        let swept = h.manager.sweep_expired(later).await.unwrap();
        assert_eq!(swept, vec![claim.id]);

        let claim = h.manager.get_claim(claim.id).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::Expired);
        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);

        // Re-entrant: a second sweep is a no-op
        assert!(h.manager.sweep_expired(later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandon_reopens_bounty() {
        let h = harness();
        let bounty = post_bounty(&h, BountyTier::Medium, 50_000.0).await;
        let claim = h.manager.claim(&bounty, wallet(1), Utc::now()).await.unwrap();

        let claim = h.manager.abandon(claim.id).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::Abandoned);
        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);
    }
}

use crate::LedgerStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use watt_types::{
    Bounty, BountyId, Claim, ClaimId, ContributorProfile, LedgerError, Result, ReviewVerdict,
    SettlementRecord, Submission, SubmissionId, WalletAddress,
};

type BountyMap = HashMap<BountyId, Bounty>;
type ClaimMap = HashMap<ClaimId, Claim>;

/// Snapshot of the two entities the claim transaction touches.
type TransactionBackup = Option<(BountyMap, ClaimMap)>;

/// In-memory backend. Default for tests and one-shot CLI runs.
pub struct MemoryStore {
    bounties: Arc<RwLock<BountyMap>>,
    claims: Arc<RwLock<ClaimMap>>,
    submissions: Arc<RwLock<HashMap<SubmissionId, Submission>>>,
    verdicts: Arc<RwLock<HashMap<SubmissionId, ReviewVerdict>>>,
    verdict_log: Arc<RwLock<HashMap<SubmissionId, Vec<ReviewVerdict>>>>,
    settlements: Arc<RwLock<HashMap<ClaimId, SettlementRecord>>>,
    settlement_log: Arc<RwLock<Vec<SettlementRecord>>>,
    profiles: Arc<RwLock<HashMap<WalletAddress, ContributorProfile>>>,
    transaction_backup: Arc<RwLock<TransactionBackup>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bounties: Arc::new(RwLock::new(HashMap::new())),
            claims: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            verdicts: Arc::new(RwLock::new(HashMap::new())),
            verdict_log: Arc::new(RwLock::new(HashMap::new())),
            settlements: Arc::new(RwLock::new(HashMap::new())),
            settlement_log: Arc::new(RwLock::new(Vec::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            transaction_backup: Arc::new(RwLock::new(None)),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_bounty(&self, id: BountyId) -> Result<Option<Bounty>> {
        let bounties = self.bounties.read().await;
        Ok(bounties.get(&id).cloned())
    }

    async fn put_bounty(&self, bounty: Bounty) -> Result<()> {
        let mut bounties = self.bounties.write().await;
        debug!(
            bounty_id = %bounty.id,
            status = %bounty.status,
            version = bounty.version,
            "Bounty stored"
        );
        bounties.insert(bounty.id, bounty);
        Ok(())
    }

    async fn list_bounties(&self) -> Result<Vec<Bounty>> {
        let bounties = self.bounties.read().await;
        let mut all: Vec<Bounty> = bounties.values().cloned().collect();
        all.sort_by_key(|b| b.created_at);
        Ok(all)
    }

    async fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>> {
        let claims = self.claims.read().await;
        Ok(claims.get(&id).cloned())
    }

    async fn put_claim(&self, claim: Claim) -> Result<()> {
        let mut claims = self.claims.write().await;
        debug!(
            claim_id = %claim.id,
            bounty_id = %claim.bounty_id,
            status = %claim.status,
            "Claim stored"
        );
        claims.insert(claim.id, claim);
        Ok(())
    }

    async fn list_claims(&self) -> Result<Vec<Claim>> {
        let claims = self.claims.read().await;
        let mut all: Vec<Claim> = claims.values().cloned().collect();
        all.sort_by_key(|c| c.claimed_at);
        Ok(all)
    }

    async fn list_claims_for_bounty(&self, bounty_id: BountyId) -> Result<Vec<Claim>> {
        let claims = self.claims.read().await;
        Ok(claims
            .values()
            .filter(|c| c.bounty_id == bounty_id)
            .cloned()
            .collect())
    }

    async fn list_claims_for_contributor(&self, contributor: WalletAddress) -> Result<Vec<Claim>> {
        let claims = self.claims.read().await;
        Ok(claims
            .values()
            .filter(|c| c.contributor == contributor)
            .cloned()
            .collect())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).cloned())
    }

    async fn put_submission(&self, submission: Submission) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        submissions.insert(submission.id, submission);
        Ok(())
    }

    async fn get_verdict(&self, submission_id: SubmissionId) -> Result<Option<ReviewVerdict>> {
        let verdicts = self.verdicts.read().await;
        Ok(verdicts.get(&submission_id).cloned())
    }

    async fn put_verdict(&self, verdict: ReviewVerdict) -> Result<()> {
        let mut log = self.verdict_log.write().await;
        log.entry(verdict.submission_id)
            .or_default()
            .push(verdict.clone());
        drop(log);

        let mut verdicts = self.verdicts.write().await;
        verdicts.insert(verdict.submission_id, verdict);
        Ok(())
    }

    async fn verdict_history(&self, submission_id: SubmissionId) -> Result<Vec<ReviewVerdict>> {
        let log = self.verdict_log.read().await;
        Ok(log.get(&submission_id).cloned().unwrap_or_default())
    }

    async fn get_settlement(&self, claim_id: ClaimId) -> Result<Option<SettlementRecord>> {
        let settlements = self.settlements.read().await;
        Ok(settlements.get(&claim_id).cloned())
    }

    async fn append_settlement(&self, record: SettlementRecord) -> Result<()> {
        let mut settlements = self.settlements.write().await;
        if settlements.contains_key(&record.claim_id) {
            return Err(LedgerError::SettlementAlreadyRecorded(
                record.claim_id.to_string(),
            ));
        }

        info!(
            claim_id = %record.claim_id,
            disposition = %record.disposition,
            stake_return = record.stake_return.to_watt(),
            payout = record.payout.to_watt(),
            "Settlement record appended"
        );

        settlements.insert(record.claim_id, record.clone());
        drop(settlements);

        let mut log = self.settlement_log.write().await;
        log.push(record);
        Ok(())
    }

    async fn list_settlements(&self) -> Result<Vec<SettlementRecord>> {
        let log = self.settlement_log.read().await;
        Ok(log.clone())
    }

    async fn get_profile(&self, wallet: WalletAddress) -> Result<Option<ContributorProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&wallet).cloned())
    }

    async fn put_profile(&self, profile: ContributorProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.wallet, profile);
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let bounties = self.bounties.read().await;
        let claims = self.claims.read().await;

        let mut backup = self.transaction_backup.write().await;
        *backup = Some((bounties.clone(), claims.clone()));

        debug!(
            bounty_count = bounties.len(),
            claim_count = claims.len(),
            "Transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut backup = self.transaction_backup.write().await;
        *backup = None;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut backup = self.transaction_backup.write().await;
        if let Some((bounty_backup, claim_backup)) = backup.take() {
            let mut bounties = self.bounties.write().await;
            let mut claims = self.claims.write().await;
            *bounties = bounty_backup;
            *claims = claim_backup;
            info!("Transaction rolled back (snapshot restored)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use watt_types::{BountySpec, BountyStatus, BountyTier, WattAmount};

    fn test_bounty() -> Bounty {
        Bounty::from_spec(
            BountySpec {
                title: "t".to_string(),
                description: "d".to_string(),
                tier: BountyTier::Medium,
                reward: WattAmount::from_watt(50_000.0),
                stake_percent: 0.10,
                issue_ref: "7".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_bounty_round_trip() {
        let store = MemoryStore::new();
        let bounty = test_bounty();
        let id = bounty.id;

        store.put_bounty(bounty).await.unwrap();
        let loaded = store.get_bounty(id).await.unwrap().unwrap();
        assert_eq!(loaded.status, BountyStatus::Open);
        assert_eq!(store.list_bounties().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_rollback_restores_both_maps() {
        let store = MemoryStore::new();
        let bounty = test_bounty();
        let bounty_id = bounty.id;
        store.put_bounty(bounty.clone()).await.unwrap();

        store.begin_transaction().await.unwrap();

        let mut modified = bounty.clone();
        modified.status = BountyStatus::Claimed;
        store.put_bounty(modified).await.unwrap();
        let claim = Claim::new(
            bounty_id,
            WalletAddress::from_bytes([1; 32]),
            WattAmount::from_watt(5_000.0),
            Utc::now(),
        );
        store.put_claim(claim).await.unwrap();

        store.rollback_transaction().await.unwrap();

        let restored = store.get_bounty(bounty_id).await.unwrap().unwrap();
        assert_eq!(restored.status, BountyStatus::Open);
        assert!(store.list_claims().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settlement_append_is_write_once() {
        let store = MemoryStore::new();
        let record = SettlementRecord {
            claim_id: ClaimId::new(b"c"),
            contributor: WalletAddress::from_bytes([2; 32]),
            disposition: watt_types::Disposition::Merged,
            stake_return: WattAmount::from_watt(5_000.0),
            payout: WattAmount::from_watt(50_000.0),
            tx_refs: vec!["tx-1".to_string()],
            settled_at: Utc::now(),
        };

        store.append_settlement(record.clone()).await.unwrap();
        let err = store.append_settlement(record).await.unwrap_err();
        assert!(matches!(err, LedgerError::SettlementAlreadyRecorded(_)));
        assert_eq!(store.list_settlements().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_verdict_history_is_appended() {
        let store = MemoryStore::new();
        let sub_id = SubmissionId::new(b"s");

        let v1 = ReviewVerdict::new(sub_id, Utc::now());
        store.put_verdict(v1).await.unwrap();
        let mut v2 = ReviewVerdict::new(sub_id, Utc::now());
        v2.human = Some(watt_types::HumanDecision::Approve);
        store.put_verdict(v2).await.unwrap();

        assert_eq!(store.verdict_history(sub_id).await.unwrap().len(), 2);
        assert!(store
            .get_verdict(sub_id)
            .await
            .unwrap()
            .unwrap()
            .human
            .is_some());
    }
}

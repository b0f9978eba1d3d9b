use crate::LedgerStore;
use async_trait::async_trait;
use rocksdb::{IteratorMode, Options, DB};
use std::sync::Arc;
use watt_types::{
    Bounty, BountyId, Claim, ClaimId, ContributorProfile, LedgerError, Result, ReviewVerdict,
    SettlementRecord, Submission, SubmissionId, WalletAddress,
};

const CF_BOUNTIES: &str = "bounties";
const CF_CLAIMS: &str = "claims";
const CF_SUBMISSIONS: &str = "submissions";
const CF_VERDICTS: &str = "verdicts";
const CF_VERDICT_LOG: &str = "verdict_log";
const CF_SETTLEMENTS: &str = "settlements";
const CF_PROFILES: &str = "profiles";

/// RocksDB backend. Current-state rows keyed by entity id; audit logs
/// keyed by `<id>:<seq>` so range scans return them in write order.
pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_names = vec![
            CF_BOUNTIES,
            CF_CLAIMS,
            CF_SUBMISSIONS,
            CF_VERDICTS,
            CF_VERDICT_LOG,
            CF_SETTLEMENTS,
            CF_PROFILES,
        ];

        let db = DB::open_cf(&opts, path, cf_names)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("column family missing: {}", name)))
    }

    fn put_json<T: serde::Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.db
            .put_cf(self.cf(cf)?, key, data)
            .map_err(|e| LedgerError::Storage(e.to_string()))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self
            .db
            .get_cf(self.cf(cf)?, key)
            .map_err(|e| LedgerError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: serde::de::DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| LedgerError::Storage(e.to_string()))?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl LedgerStore for RocksStore {
    async fn get_bounty(&self, id: BountyId) -> Result<Option<Bounty>> {
        self.get_json(CF_BOUNTIES, id.as_bytes())
    }

    async fn put_bounty(&self, bounty: Bounty) -> Result<()> {
        self.put_json(CF_BOUNTIES, bounty.id.as_bytes(), &bounty)
    }

    async fn list_bounties(&self) -> Result<Vec<Bounty>> {
        let mut all: Vec<Bounty> = self.scan_json(CF_BOUNTIES)?;
        all.sort_by_key(|b| b.created_at);
        Ok(all)
    }

    async fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>> {
        self.get_json(CF_CLAIMS, id.as_bytes())
    }

    async fn put_claim(&self, claim: Claim) -> Result<()> {
        self.put_json(CF_CLAIMS, claim.id.as_bytes(), &claim)
    }

    async fn list_claims(&self) -> Result<Vec<Claim>> {
        let mut all: Vec<Claim> = self.scan_json(CF_CLAIMS)?;
        all.sort_by_key(|c| c.claimed_at);
        Ok(all)
    }

    async fn list_claims_for_bounty(&self, bounty_id: BountyId) -> Result<Vec<Claim>> {
        Ok(self
            .scan_json::<Claim>(CF_CLAIMS)?
            .into_iter()
            .filter(|c| c.bounty_id == bounty_id)
            .collect())
    }

    async fn list_claims_for_contributor(&self, contributor: WalletAddress) -> Result<Vec<Claim>> {
        Ok(self
            .scan_json::<Claim>(CF_CLAIMS)?
            .into_iter()
            .filter(|c| c.contributor == contributor)
            .collect())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
        self.get_json(CF_SUBMISSIONS, id.as_bytes())
    }

    async fn put_submission(&self, submission: Submission) -> Result<()> {
        self.put_json(CF_SUBMISSIONS, submission.id.as_bytes(), &submission)
    }

    async fn get_verdict(&self, submission_id: SubmissionId) -> Result<Option<ReviewVerdict>> {
        self.get_json(CF_VERDICTS, submission_id.as_bytes())
    }

    async fn put_verdict(&self, verdict: ReviewVerdict) -> Result<()> {
        let seq = self.verdict_history(verdict.submission_id).await?.len() as u64;
        let log_key = format!("{}:{:010}", verdict.submission_id, seq);
        self.put_json(CF_VERDICT_LOG, log_key.as_bytes(), &verdict)?;
        self.put_json(CF_VERDICTS, verdict.submission_id.as_bytes(), &verdict)
    }

    async fn verdict_history(&self, submission_id: SubmissionId) -> Result<Vec<ReviewVerdict>> {
        let prefix = format!("{}:", submission_id);
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(self.cf(CF_VERDICT_LOG)?, IteratorMode::Start)
        {
            let (key, value) = item.map_err(|e| LedgerError::Storage(e.to_string()))?;
            if String::from_utf8_lossy(&key).starts_with(&prefix) {
                out.push(serde_json::from_slice(&value)?);
            }
        }
        Ok(out)
    }

    async fn get_settlement(&self, claim_id: ClaimId) -> Result<Option<SettlementRecord>> {
        self.get_json(CF_SETTLEMENTS, claim_id.as_bytes())
    }

    async fn append_settlement(&self, record: SettlementRecord) -> Result<()> {
        if self.get_settlement(record.claim_id).await?.is_some() {
            return Err(LedgerError::SettlementAlreadyRecorded(
                record.claim_id.to_string(),
            ));
        }
        self.put_json(CF_SETTLEMENTS, record.claim_id.as_bytes(), &record)
    }

    async fn list_settlements(&self) -> Result<Vec<SettlementRecord>> {
        let mut all: Vec<SettlementRecord> = self.scan_json(CF_SETTLEMENTS)?;
        all.sort_by_key(|r| r.settled_at);
        Ok(all)
    }

    async fn get_profile(&self, wallet: WalletAddress) -> Result<Option<ContributorProfile>> {
        self.get_json(CF_PROFILES, wallet.as_bytes())
    }

    async fn put_profile(&self, profile: ContributorProfile) -> Result<()> {
        self.put_json(CF_PROFILES, profile.wallet.as_bytes(), &profile)
    }

    async fn begin_transaction(&self) -> Result<()> {
        // Claim creation runs under the manager's writer mutex; RocksDB
        // writes are individually atomic, so the bracket is a flush point.
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Storage(e.to_string()))
    }

    async fn rollback_transaction(&self) -> Result<()> {
        Ok(())
    }
}

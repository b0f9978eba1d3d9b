pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use watt_types::{
    Bounty, BountyId, Claim, ClaimId, ContributorProfile, Result, ReviewVerdict, SettlementRecord,
    Submission, SubmissionId, WalletAddress,
};

/// Persistence boundary for the ledger.
///
/// Bounty, Claim and ContributorProfile are mutable current-state rows;
/// ReviewVerdict keeps an audit trail of superseded versions and
/// SettlementRecord is append-only (at most one per claim, never
/// rewritten).
///
/// `begin`/`commit`/`rollback` bracket the one multi-entity write the
/// design allows (claim creation touching a bounty and a new claim row).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Bounties
    async fn get_bounty(&self, id: BountyId) -> Result<Option<Bounty>>;
    async fn put_bounty(&self, bounty: Bounty) -> Result<()>;
    async fn list_bounties(&self) -> Result<Vec<Bounty>>;

    // Claims
    async fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>>;
    async fn put_claim(&self, claim: Claim) -> Result<()>;
    async fn list_claims(&self) -> Result<Vec<Claim>>;
    async fn list_claims_for_bounty(&self, bounty_id: BountyId) -> Result<Vec<Claim>>;
    async fn list_claims_for_contributor(&self, contributor: WalletAddress) -> Result<Vec<Claim>>;

    // Submissions
    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>>;
    async fn put_submission(&self, submission: Submission) -> Result<()>;

    // Review verdicts (current state + audit history)
    async fn get_verdict(&self, submission_id: SubmissionId) -> Result<Option<ReviewVerdict>>;
    async fn put_verdict(&self, verdict: ReviewVerdict) -> Result<()>;
    async fn verdict_history(&self, submission_id: SubmissionId) -> Result<Vec<ReviewVerdict>>;

    // Settlement records (append-only)
    async fn get_settlement(&self, claim_id: ClaimId) -> Result<Option<SettlementRecord>>;
    async fn append_settlement(&self, record: SettlementRecord) -> Result<()>;
    async fn list_settlements(&self) -> Result<Vec<SettlementRecord>>;

    // Contributor profiles
    async fn get_profile(&self, wallet: WalletAddress) -> Result<Option<ContributorProfile>>;
    async fn put_profile(&self, profile: ContributorProfile) -> Result<()>;

    // Multi-entity transaction bracket
    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;
}

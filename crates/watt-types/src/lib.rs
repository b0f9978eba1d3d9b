pub mod amount;
pub mod bounty;
pub mod claim;
pub mod error;
pub mod id;
pub mod profile;
pub mod review;
pub mod settlement;
pub mod wallet;

pub use amount::{WattAmount, WATT_BASE_UNIT, WATT_DECIMALS};
pub use bounty::{Bounty, BountySpec, BountyStatus, BountyTier};
pub use claim::{Claim, ClaimStatus, Submission};
pub use error::{LedgerError, Result};
pub use id::{BountyId, ClaimId, SubmissionId};
pub use profile::{ContributorProfile, ContributorTier};
pub use review::{
    AutomatedScore, CommunityReview, CommunityVerdict, DimensionScore, HumanDecision,
    ReviewVerdict, RubricDimension, AUTO_MERGE_THRESHOLD,
};
pub use settlement::{Disposition, SettlementRecord};
pub use wallet::WalletAddress;

/// Common contract for entity status enums: which states are terminal and
/// which transitions the ledger accepts.
pub trait LifecycleState: Sized + Copy + PartialEq {
    fn is_terminal(&self) -> bool;
    fn can_transition_to(&self, next: &Self) -> bool;
}

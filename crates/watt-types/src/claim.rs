use crate::id::{BountyId, ClaimId, SubmissionId};
use crate::wallet::WalletAddress;
use crate::{LifecycleState, WattAmount};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days a claim stays reserved before the expiry sweep reopens the bounty.
pub const CLAIM_WINDOW_DAYS: i64 = 7;
/// Maximum one-time extension, in days.
pub const MAX_EXTENSION_DAYS: i64 = 7;

/// Claim lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    /// Created, stake transfer not yet confirmed
    PendingStake,
    /// Stake confirmed, work window running
    Active,
    /// Work artifact attached
    Submitted,
    /// Terminal: settlement record written
    Settled,
    /// Terminal: deadline passed without a submission
    Expired,
    /// Terminal: contributor walked away or stake never confirmed
    Abandoned,
}

impl LifecycleState for ClaimStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Expired | Self::Abandoned)
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        use ClaimStatus::*;
        match (self, next) {
            (PendingStake, Active) => true,
            (PendingStake, Abandoned) => true,
            (Active, Submitted) => true,
            (Active, Expired) => true,
            (Active, Abandoned) => true,
            // A rejected claim handed back for rework can still be settled
            (Active, Settled) => true,
            // Reject / RequestChanges hands the claim back for rework
            (Submitted, Active) => true,
            (Submitted, Settled) => true,
            (Submitted, Abandoned) => true,
            (Settled, _) | (Expired, _) | (Abandoned, _) => false,
            _ => false,
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A contributor's reservation of a bounty for a bounded work window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub bounty_id: BountyId,
    pub contributor: WalletAddress,
    pub stake: WattAmount,
    /// Gateway reference for the confirmed stake transfer.
    pub stake_tx_ref: Option<String>,
    pub status: ClaimStatus,
    pub claimed_at: DateTime<Utc>,
    /// Set when the stake confirms; sweeps compare against it.
    pub deadline: Option<DateTime<Utc>>,
    pub extension_used: bool,
    pub extension_reason: Option<String>,
    pub submission_id: Option<SubmissionId>,
    /// Optimistic concurrency token, bumped on every status write.
    pub version: u64,
}

impl Claim {
    pub fn new(
        bounty_id: BountyId,
        contributor: WalletAddress,
        stake: WattAmount,
        now: DateTime<Utc>,
    ) -> Self {
        let id = ClaimId::generate(
            format!(
                "{}:{}:{}",
                bounty_id,
                contributor.to_hex(),
                now.timestamp_millis()
            )
            .as_bytes(),
        );
        Self {
            id,
            bounty_id,
            contributor,
            stake,
            stake_tx_ref: None,
            status: ClaimStatus::PendingStake,
            claimed_at: now,
            deadline: None,
            extension_used: false,
            extension_reason: None,
            submission_id: None,
            version: 0,
        }
    }

    /// Standard work-window deadline from the moment the stake confirms.
    pub fn standard_deadline(confirmed_at: DateTime<Utc>) -> DateTime<Utc> {
        confirmed_at + Duration::days(CLAIM_WINDOW_DAYS)
    }

    /// A claim still counting against exclusivity / tier limits.
    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            ClaimStatus::PendingStake | ClaimStatus::Active | ClaimStatus::Submitted
        )
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ClaimStatus::Active && self.deadline.is_some_and(|d| d < now)
    }
}

/// Work artifact attached to an active claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub claim_id: ClaimId,
    pub bounty_id: BountyId,
    /// Pull-request identifier or equivalent artifact reference.
    pub artifact_ref: String,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        claim_id: ClaimId,
        bounty_id: BountyId,
        artifact_ref: String,
        now: DateTime<Utc>,
    ) -> Self {
        let id = SubmissionId::generate(
            format!("{}:{}:{}", claim_id, artifact_ref, now.timestamp_millis()).as_bytes(),
        );
        Self {
            id,
            claim_id,
            bounty_id,
            artifact_ref,
            submitted_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_transitions() {
        use ClaimStatus::*;
        assert!(PendingStake.can_transition_to(&Active));
        assert!(Active.can_transition_to(&Submitted));
        assert!(Active.can_transition_to(&Expired));
        assert!(Submitted.can_transition_to(&Active));
        assert!(Submitted.can_transition_to(&Settled));
        assert!(!Settled.can_transition_to(&Active));
        assert!(!Expired.can_transition_to(&Active));
        assert!(!PendingStake.can_transition_to(&Submitted));
        assert!(Expired.is_terminal());
        assert!(Abandoned.is_terminal());
    }

    #[test]
    fn test_overdue_requires_active_and_past_deadline() {
        let now = Utc::now();
        let mut claim = Claim::new(
            BountyId::new(b"b"),
            WalletAddress::from_bytes([1; 32]),
            WattAmount::from_watt(5_000.0),
            now,
        );
        assert!(!claim.is_overdue(now));

        claim.status = ClaimStatus::Active;
        claim.deadline = Some(now - Duration::hours(1));
        assert!(claim.is_overdue(now));

        // A submitted claim is never overdue
        claim.status = ClaimStatus::Submitted;
        assert!(!claim.is_overdue(now));
    }
}

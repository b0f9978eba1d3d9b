use crate::amount::WattAmount;
use crate::error::{LedgerError, Result};
use crate::id::BountyId;
use crate::LifecycleState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reward-size and review-rigor classification of a bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BountyTier {
    Low,
    Medium,
    High,
    Critical,
}

impl BountyTier {
    /// Reward band for the tier, in WATT. Critical has no upper bound.
    pub fn reward_band(&self) -> (WattAmount, Option<WattAmount>) {
        match self {
            Self::Low => (
                WattAmount::from_watt(5_000.0),
                Some(WattAmount::from_watt(20_000.0)),
            ),
            Self::Medium => (
                WattAmount::from_watt(20_000.0),
                Some(WattAmount::from_watt(100_000.0)),
            ),
            Self::High => (
                WattAmount::from_watt(100_000.0),
                Some(WattAmount::from_watt(500_000.0)),
            ),
            Self::Critical => (WattAmount::from_watt(500_000.0), None),
        }
    }

    pub fn contains(&self, reward: WattAmount) -> bool {
        let (min, max) = self.reward_band();
        reward >= min && max.map_or(true, |m| reward <= m)
    }

    /// High and Critical claims are limited to one live claim per wallet.
    pub fn is_high_tier(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Community reviews required before the review phase can close.
    /// Every tier above Low additionally requires a human decision.
    pub fn required_community_reviews(&self) -> usize {
        match self {
            Self::Low => 1,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    pub fn requires_human_decision(&self) -> bool {
        !matches!(self, Self::Low)
    }
}

impl fmt::Display for BountyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Bounty lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BountyStatus {
    /// Posted and claimable
    Open,
    /// Reserved by an active claim
    Claimed,
    /// Work artifact attached by the claimant
    Submitted,
    /// Automated score recorded, review in progress
    UnderReview,
    /// Terminal: settlement record written
    Settled,
    /// Terminal: posting lapsed without settlement
    Expired,
    /// Terminal: administratively withdrawn while Open
    Cancelled,
}

impl LifecycleState for BountyStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Expired | Self::Cancelled)
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        use BountyStatus::*;
        match (self, next) {
            // From Open
            (Open, Claimed) => true,
            (Open, Cancelled) => true,
            (Open, Expired) => true,

            // From Claimed
            (Claimed, Submitted) => true,
            // Claim expiry sweep is the only path back to Open
            (Claimed, Open) => true,

            // From Submitted
            (Submitted, UnderReview) => true,
            // Reject / RequestChanges hands work back without releasing the claim
            (Submitted, Claimed) => true,
            (Submitted, Settled) => true,

            // From UnderReview
            (UnderReview, Claimed) => true,
            (UnderReview, Settled) => true,

            // Terminal states never transition
            (Settled, _) | (Expired, _) | (Cancelled, _) => false,

            _ => false,
        }
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Input for posting a bounty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountySpec {
    pub title: String,
    pub description: String,
    pub tier: BountyTier,
    pub reward: WattAmount,
    /// Fraction of the reward that must be staked to claim.
    /// 0.10 standard; negotiated per-bounty for Critical tier.
    pub stake_percent: f64,
    /// External issue-tracker identifier this bounty mirrors.
    pub issue_ref: String,
}

/// A posted unit of work with an associated WATT reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounty {
    pub id: BountyId,
    pub title: String,
    pub description: String,
    pub tier: BountyTier,
    pub reward: WattAmount,
    pub stake_percent: f64,
    pub required_community_reviews: usize,
    pub issue_ref: String,
    pub status: BountyStatus,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every status write.
    pub version: u64,
}

impl Bounty {
    pub fn from_spec(spec: BountySpec, now: DateTime<Utc>) -> Result<Self> {
        if !spec.tier.contains(spec.reward) {
            let (min, max) = spec.tier.reward_band();
            return Err(LedgerError::InvalidTierRange {
                tier: spec.tier.to_string(),
                reward: spec.reward.to_watt(),
                min: min.to_watt(),
                max: max.map(|m| m.to_watt()).unwrap_or(f64::INFINITY),
            });
        }
        if !(0.0..=1.0).contains(&spec.stake_percent) {
            return Err(LedgerError::InvalidParameter(format!(
                "stake_percent {} outside [0, 1]",
                spec.stake_percent
            )));
        }

        let id = BountyId::generate(
            format!("{}:{}:{}", spec.issue_ref, spec.title, now.timestamp_millis()).as_bytes(),
        );
        Ok(Self {
            id,
            title: spec.title,
            description: spec.description,
            tier: spec.tier,
            reward: spec.reward,
            stake_percent: spec.stake_percent,
            required_community_reviews: spec.tier.required_community_reviews(),
            issue_ref: spec.issue_ref,
            status: BountyStatus::Open,
            created_at: now,
            version: 0,
        })
    }

    /// Stake a contributor must escrow to claim this bounty.
    pub fn required_stake(&self) -> WattAmount {
        self.reward.mul_fraction(self.stake_percent)
    }

    /// Memo tag the stake transfer must carry.
    pub fn stake_memo(&self) -> String {
        format!("ISSUE-{}", self.issue_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tier: BountyTier, reward: f64) -> BountySpec {
        BountySpec {
            title: "Add retry logic to scrape endpoint".to_string(),
            description: "Transient failures should back off".to_string(),
            tier,
            reward: WattAmount::from_watt(reward),
            stake_percent: 0.10,
            issue_ref: "42".to_string(),
        }
    }

    #[test]
    fn test_tier_bands() {
        assert!(BountyTier::Low.contains(WattAmount::from_watt(5_000.0)));
        assert!(BountyTier::Low.contains(WattAmount::from_watt(20_000.0)));
        assert!(!BountyTier::Low.contains(WattAmount::from_watt(25_000.0)));
        assert!(BountyTier::Critical.contains(WattAmount::from_watt(2_000_000.0)));
        assert!(!BountyTier::Critical.contains(WattAmount::from_watt(100_000.0)));
    }

    #[test]
    fn test_from_spec_validates_band() {
        let err = Bounty::from_spec(spec(BountyTier::Medium, 5_000.0), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTierRange { .. }));

        let bounty = Bounty::from_spec(spec(BountyTier::Medium, 50_000.0), Utc::now()).unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);
        assert_eq!(bounty.required_stake(), WattAmount::from_watt(5_000.0));
        assert_eq!(bounty.stake_memo(), "ISSUE-42");
    }

    #[test]
    fn test_identical_postings_get_distinct_ids() {
        let now = Utc::now();
        let a = Bounty::from_spec(spec(BountyTier::Medium, 30_000.0), now).unwrap();
        let b = Bounty::from_spec(spec(BountyTier::Medium, 90_000.0), now).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_status_transitions() {
        use BountyStatus::*;
        assert!(Open.can_transition_to(&Claimed));
        assert!(Open.can_transition_to(&Cancelled));
        assert!(Claimed.can_transition_to(&Open));
        assert!(Claimed.can_transition_to(&Submitted));
        assert!(Submitted.can_transition_to(&UnderReview));
        assert!(Submitted.can_transition_to(&Claimed));
        assert!(UnderReview.can_transition_to(&Settled));

        // Cancellation is only permitted while Open
        assert!(!Claimed.can_transition_to(&Cancelled));
        assert!(!Submitted.can_transition_to(&Cancelled));

        // Terminal states are sticky
        assert!(Settled.is_terminal());
        assert!(!Settled.can_transition_to(&Open));
        assert!(!Cancelled.can_transition_to(&Claimed));
    }

    #[test]
    fn test_review_requirements_by_tier() {
        assert_eq!(BountyTier::Low.required_community_reviews(), 1);
        assert!(!BountyTier::Low.requires_human_decision());
        assert_eq!(BountyTier::High.required_community_reviews(), 2);
        assert!(BountyTier::Critical.requires_human_decision());
    }
}

use crate::wallet::WalletAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contributor reputation classification, derived from settled history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributorTier {
    Bronze,
    Silver,
    Gold,
}

impl ContributorTier {
    /// Multiplier applied to bounty payouts at settlement time.
    pub fn payout_multiplier(&self) -> f64 {
        match self {
            Self::Bronze => 1.0,
            Self::Silver => 1.10,
            Self::Gold => 1.20,
        }
    }

    /// Derivation from average verdict score and completed-bounty count.
    pub fn derive(average_score: f64, completed: usize) -> Self {
        if completed >= 10 && average_score >= 9.0 {
            Self::Gold
        } else if completed >= 3 && average_score >= 7.0 {
            Self::Silver
        } else {
            Self::Bronze
        }
    }
}

impl fmt::Display for ContributorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Reputation state for one wallet. Recomputed after every settlement that
/// touches the contributor; read fresh at settlement time, never cached on
/// the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorProfile {
    pub wallet: WalletAddress,
    /// Ordered past verdict scores (weighted averages at settlement).
    pub score_history: Vec<f64>,
    pub completed_bounties: usize,
    pub tier: ContributorTier,
    pub banned: bool,
    pub updated_at: DateTime<Utc>,
}

impl ContributorProfile {
    pub fn new(wallet: WalletAddress, now: DateTime<Utc>) -> Self {
        Self {
            wallet,
            score_history: Vec::new(),
            completed_bounties: 0,
            tier: ContributorTier::Bronze,
            banned: false,
            updated_at: now,
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.score_history.is_empty() {
            0.0
        } else {
            self.score_history.iter().sum::<f64>() / self.score_history.len() as f64
        }
    }

    /// Fold one settlement outcome into the profile and rederive the tier.
    pub fn record_settlement(&mut self, score: Option<f64>, completed: bool, now: DateTime<Utc>) {
        if let Some(score) = score {
            self.score_history.push(score);
        }
        if completed {
            self.completed_bounties += 1;
        }
        self.tier = ContributorTier::derive(self.average_score(), self.completed_bounties);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_derivation() {
        assert_eq!(ContributorTier::derive(9.5, 1), ContributorTier::Bronze);
        assert_eq!(ContributorTier::derive(7.2, 3), ContributorTier::Silver);
        assert_eq!(ContributorTier::derive(6.9, 20), ContributorTier::Bronze);
        assert_eq!(ContributorTier::derive(9.1, 10), ContributorTier::Gold);
    }

    #[test]
    fn test_record_settlement_rederives_tier() {
        let mut profile = ContributorProfile::new(WalletAddress::from_bytes([1; 32]), Utc::now());
        for _ in 0..3 {
            profile.record_settlement(Some(8.0), true, Utc::now());
        }
        assert_eq!(profile.tier, ContributorTier::Silver);
        assert!((profile.average_score() - 8.0).abs() < f64::EPSILON);
        assert_eq!(profile.completed_bounties, 3);
    }

    #[test]
    fn test_payout_multipliers() {
        assert_eq!(ContributorTier::Bronze.payout_multiplier(), 1.0);
        assert_eq!(ContributorTier::Silver.payout_multiplier(), 1.10);
        assert_eq!(ContributorTier::Gold.payout_multiplier(), 1.20);
    }
}

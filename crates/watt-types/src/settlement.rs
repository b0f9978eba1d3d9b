use crate::error::{LedgerError, Result};
use crate::id::ClaimId;
use crate::wallet::WalletAddress;
use crate::WattAmount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final financial disposition of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Disposition {
    /// Work merged: full stake return, full payout.
    Merged,
    /// Honest effort that fell short: discretionary stake return in
    /// [0.5, 1.0], supplied explicitly by the settling party. No payout.
    GoodFaithIncomplete { stake_return_fraction: f64 },
    /// Half the stake returned, no payout.
    LowQuality,
    /// Stake forfeited, no payout.
    Abandoned,
    /// Stake forfeited, no payout, contributor banned.
    Malicious,
}

impl Disposition {
    /// (stake return fraction, payout fraction) per the settlement table.
    pub fn fractions(&self) -> Result<(f64, f64)> {
        match self {
            Self::Merged => Ok((1.0, 1.0)),
            Self::GoodFaithIncomplete {
                stake_return_fraction,
            } => {
                if !(0.5..=1.0).contains(stake_return_fraction) {
                    return Err(LedgerError::InvalidParameter(format!(
                        "good-faith stake return fraction {} outside [0.5, 1.0]",
                        stake_return_fraction
                    )));
                }
                Ok((*stake_return_fraction, 0.0))
            }
            Self::LowQuality => Ok((0.5, 0.0)),
            Self::Abandoned => Ok((0.0, 0.0)),
            Self::Malicious => Ok((0.0, 0.0)),
        }
    }

    pub fn bans_contributor(&self) -> bool {
        matches!(self, Self::Malicious)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodFaithIncomplete { .. } => write!(f, "GoodFaithIncomplete"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Immutable record of a settled claim. Written exactly once, after the
/// funds transfer reports success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub claim_id: ClaimId,
    pub contributor: WalletAddress,
    pub disposition: Disposition,
    pub stake_return: WattAmount,
    pub payout: WattAmount,
    /// Gateway references for the resulting transfer(s).
    pub tx_refs: Vec<String>,
    pub settled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_table() {
        assert_eq!(Disposition::Merged.fractions().unwrap(), (1.0, 1.0));
        assert_eq!(Disposition::LowQuality.fractions().unwrap(), (0.5, 0.0));
        assert_eq!(Disposition::Abandoned.fractions().unwrap(), (0.0, 0.0));
        assert_eq!(Disposition::Malicious.fractions().unwrap(), (0.0, 0.0));
        assert!(Disposition::Malicious.bans_contributor());
        assert!(!Disposition::Abandoned.bans_contributor());
    }

    #[test]
    fn test_good_faith_fraction_must_be_explicit_and_bounded() {
        let ok = Disposition::GoodFaithIncomplete {
            stake_return_fraction: 0.75,
        };
        assert_eq!(ok.fractions().unwrap(), (0.75, 0.0));

        let low = Disposition::GoodFaithIncomplete {
            stake_return_fraction: 0.25,
        };
        assert!(low.fractions().is_err());

        let high = Disposition::GoodFaithIncomplete {
            stake_return_fraction: 1.5,
        };
        assert!(high.fractions().is_err());
    }
}

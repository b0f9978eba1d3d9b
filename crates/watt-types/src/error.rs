use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger error kinds.
///
/// Validation errors (`InvalidTierRange`, `InvalidTransition`,
/// `TierLimitExceeded`, ...) surface immediately and are never retried.
/// Gateway-dependent errors (`StakeUnconfirmed`, `ReviewServiceUnavailable`)
/// are recoverable by caller retry; the ledger never treats them as success.
/// `SettlementAlreadyRecorded` is the idempotency guard — callers should
/// read it as "already done".
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Reward {reward} WATT outside {tier} tier band ({min}..{max} WATT)")]
    InvalidTierRange {
        tier: String,
        reward: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid transition for {entity}: expected {expected}, found {found}")]
    InvalidTransition {
        entity: String,
        expected: String,
        found: String,
    },

    #[error("Bounty already has an active claim: {0}")]
    AlreadyClaimed(String),

    #[error("Contributor already holds an active high-tier claim: {0}")]
    TierLimitExceeded(String),

    #[error("Stake amount mismatch: expected {expected} WATT, transaction carries {actual} WATT")]
    StakeMismatch { expected: f64, actual: f64 },

    #[error("Stake transfer not confirmed: {0}")]
    StakeUnconfirmed(String),

    #[error("Claim extension already used: {0}")]
    ExtensionAlreadyUsed(String),

    #[error("Settlement already recorded for claim {0}")]
    SettlementAlreadyRecorded(String),

    #[error("Automated review service unavailable: {0}")]
    ReviewServiceUnavailable(String),

    #[error("Contributor is banned: {0}")]
    ContributorBanned(String),

    #[error("Duplicate community review from {0}")]
    DuplicateReview(String),

    #[error("Settlement not permitted: {0}")]
    SettlementNotPermitted(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Machine-readable kind tag used by the CLI's structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTierRange { .. } => "InvalidTierRange",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::AlreadyClaimed(_) => "AlreadyClaimed",
            Self::TierLimitExceeded(_) => "TierLimitExceeded",
            Self::StakeMismatch { .. } => "StakeMismatch",
            Self::StakeUnconfirmed(_) => "StakeUnconfirmed",
            Self::ExtensionAlreadyUsed(_) => "ExtensionAlreadyUsed",
            Self::SettlementAlreadyRecorded(_) => "SettlementAlreadyRecorded",
            Self::ReviewServiceUnavailable(_) => "ReviewServiceUnavailable",
            Self::ContributorBanned(_) => "ContributorBanned",
            Self::DuplicateReview(_) => "DuplicateReview",
            Self::SettlementNotPermitted(_) => "SettlementNotPermitted",
            Self::InvalidAddress(_) => "InvalidAddress",
            Self::InvalidParameter(_) => "InvalidParameter",
            Self::NotFound { .. } => "NotFound",
            Self::Gateway(_) => "Gateway",
            Self::Storage(_) => "Storage",
            Self::Serialization(_) => "Serialization",
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

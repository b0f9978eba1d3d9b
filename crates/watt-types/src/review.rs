use crate::bounty::Bounty;
use crate::id::SubmissionId;
use crate::wallet::WalletAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weighted score at or above which a submission with no open concerns is
/// eligible for auto-merge.
pub const AUTO_MERGE_THRESHOLD: f64 = 9.0;

/// Published rubric dimensions for automated scoring.
///
/// Breaking-change and value-change risk are weighted double: a regression
/// in either is far costlier to the network than a mediocre score anywhere
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RubricDimension {
    MissionAlignment,
    Legitimacy,
    ImpactVsEffort,
    CodeQuality,
    BreakingChangeRisk,
    ValueChangeRisk,
}

impl RubricDimension {
    pub fn weight(&self) -> f64 {
        match self {
            Self::BreakingChangeRisk | Self::ValueChangeRisk => 2.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for RubricDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One scored dimension from the automated reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: RubricDimension,
    /// Continuous score in [0, 10].
    pub score: f64,
    /// An open concern on any dimension caps eligibility unconditionally.
    pub concern: bool,
}

/// Automated review result: the structured record, never a bare number,
/// so the concern cap survives aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomatedScore {
    pub dimensions: Vec<DimensionScore>,
    pub weighted_score: f64,
    pub has_open_concern: bool,
    pub recorded_at: DateTime<Utc>,
}

impl AutomatedScore {
    /// Weighted average over the rubric: Σ(weight × score) / Σ(weight).
    pub fn weighted(dimensions: &[DimensionScore]) -> f64 {
        let (sum, weights) = dimensions.iter().fold((0.0, 0.0), |(s, w), d| {
            let weight = d.dimension.weight();
            (s + weight * d.score, w + weight)
        });
        if weights > 0.0 {
            sum / weights
        } else {
            0.0
        }
    }
}

/// Community reviewer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunityVerdict {
    Approve,
    Flag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityReview {
    pub reviewer: WalletAddress,
    pub verdict: CommunityVerdict,
    pub category: String,
    pub recorded_at: DateTime<Utc>,
}

/// Terminal human call on a submission. Always overrides automated
/// eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanDecision {
    Approve,
    Reject,
    RequestChanges,
}

impl fmt::Display for HumanDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Aggregated review state for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub submission_id: SubmissionId,
    pub automated: Option<AutomatedScore>,
    pub community: Vec<CommunityReview>,
    pub human: Option<HumanDecision>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewVerdict {
    pub fn new(submission_id: SubmissionId, now: DateTime<Utc>) -> Self {
        Self {
            submission_id,
            automated: None,
            community: Vec::new(),
            human: None,
            updated_at: now,
        }
    }

    /// Auto-merge eligibility. Fails closed: no recorded automated score
    /// means not eligible, and a single open concern caps eligibility
    /// regardless of the numeric score.
    pub fn is_eligible_for_auto_merge(&self) -> bool {
        match &self.automated {
            Some(auto) => !auto.has_open_concern && auto.weighted_score >= AUTO_MERGE_THRESHOLD,
            None => false,
        }
    }

    /// Whether the review satisfies the bounty's rigor requirements: an
    /// automated score, the tier's community review count, and a human
    /// decision where the tier demands one.
    pub fn meets_review_rigor(&self, bounty: &Bounty) -> bool {
        self.automated.is_some()
            && self.community.len() >= bounty.required_community_reviews
            && (!bounty.tier.requires_human_decision() || self.human.is_some())
    }
}

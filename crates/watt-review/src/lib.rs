pub mod scripted;

pub use scripted::ScriptedReviewService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use watt_registry::BountyRegistry;
use watt_storage::LedgerStore;
use watt_types::{
    AutomatedScore, Bounty, BountyStatus, ClaimStatus, CommunityReview, CommunityVerdict,
    DimensionScore, HumanDecision, LedgerError, Result, ReviewVerdict, Submission, SubmissionId,
    WalletAddress,
};

/// External automated scorer (the rubric evaluation model).
///
/// The aggregator treats any failure here as service unavailability and
/// records nothing; eligibility stays false until a score lands.
#[async_trait]
pub trait AutomatedReviewService: Send + Sync {
    async fn evaluate(&self, submission: &Submission) -> Result<Vec<DimensionScore>>;
}

/// Collects automated scores, community reviews and human decisions into
/// one verdict per submission, and answers the auto-merge question.
pub struct ReviewAggregator {
    store: Arc<dyn LedgerStore>,
    registry: Arc<BountyRegistry>,
    scorer: Arc<dyn AutomatedReviewService>,
}

impl ReviewAggregator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<BountyRegistry>,
        scorer: Arc<dyn AutomatedReviewService>,
    ) -> Self {
        Self {
            store,
            registry,
            scorer,
        }
    }

    pub async fn get_verdict(&self, submission_id: SubmissionId) -> Result<ReviewVerdict> {
        self.store
            .get_verdict(submission_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("verdict", submission_id))
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Submission> {
        self.store
            .get_submission(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("submission", id))
    }

    async fn load_or_new_verdict(
        &self,
        submission_id: SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<ReviewVerdict> {
        Ok(self
            .store
            .get_verdict(submission_id)
            .await?
            .unwrap_or_else(|| ReviewVerdict::new(submission_id, now)))
    }

    /// Run the automated scorer against a submission and record the result.
    ///
    /// A scorer failure surfaces as ReviewServiceUnavailable with nothing
    /// recorded; the caller retries later.
    pub async fn evaluate_submission(
        &self,
        submission_id: SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<ReviewVerdict> {
        let submission = self.get_submission(submission_id).await?;
        let dimensions = self.scorer.evaluate(&submission).await.map_err(|e| {
            warn!(submission_id = %submission_id, error = %e, "Automated scorer failed");
            LedgerError::ReviewServiceUnavailable(e.to_string())
        })?;
        self.record_automated_score(submission_id, dimensions, now)
            .await
    }

    /// Record an already-computed automated score.
    pub async fn record_automated_score(
        &self,
        submission_id: SubmissionId,
        dimensions: Vec<DimensionScore>,
        now: DateTime<Utc>,
    ) -> Result<ReviewVerdict> {
        let submission = self.get_submission(submission_id).await?;
        let weighted_score = AutomatedScore::weighted(&dimensions);
        let has_open_concern = dimensions.iter().any(|d| d.concern);

        let mut verdict = self.load_or_new_verdict(submission_id, now).await?;
        verdict.automated = Some(AutomatedScore {
            dimensions,
            weighted_score,
            has_open_concern,
            recorded_at: now,
        });
        verdict.updated_at = now;
        self.store.put_verdict(verdict.clone()).await?;

        // First recorded score opens the review phase.
        let bounty = self.registry.get_bounty(submission.bounty_id).await?;
        if bounty.status == BountyStatus::Submitted {
            self.registry
                .transition(bounty.id, BountyStatus::UnderReview, bounty.version)
                .await?;
        }

        info!(
            submission_id = %submission_id,
            weighted_score,
            has_open_concern,
            "Automated score recorded"
        );
        Ok(verdict)
    }

    /// Record one community reviewer's verdict. Each wallet reviews a
    /// submission at most once.
    pub async fn record_community_review(
        &self,
        submission_id: SubmissionId,
        reviewer: WalletAddress,
        community_verdict: CommunityVerdict,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<ReviewVerdict> {
        self.get_submission(submission_id).await?;
        let mut verdict = self.load_or_new_verdict(submission_id, now).await?;

        if verdict.community.iter().any(|r| r.reviewer == reviewer) {
            return Err(LedgerError::DuplicateReview(reviewer.to_string()));
        }
        verdict.community.push(CommunityReview {
            reviewer,
            verdict: community_verdict,
            category: category.to_string(),
            recorded_at: now,
        });
        verdict.updated_at = now;
        self.store.put_verdict(verdict.clone()).await?;

        info!(
            submission_id = %submission_id,
            %reviewer,
            reviews = verdict.community.len(),
            "Community review recorded"
        );
        Ok(verdict)
    }

    /// Record the human decision. Reject and RequestChanges hand the work
    /// back to the contributor without releasing the claim: the claim
    /// returns to Active and the bounty to Claimed, so the contributor may
    /// resubmit. Only Approve leaves the submission standing for a merged
    /// settlement.
    pub async fn record_human_decision(
        &self,
        submission_id: SubmissionId,
        decision: HumanDecision,
        now: DateTime<Utc>,
    ) -> Result<ReviewVerdict> {
        let submission = self.get_submission(submission_id).await?;
        let mut verdict = self.load_or_new_verdict(submission_id, now).await?;
        verdict.human = Some(decision);
        verdict.updated_at = now;
        self.store.put_verdict(verdict.clone()).await?;

        info!(
            submission_id = %submission_id,
            decision = %decision,
            "Human decision recorded"
        );

        if matches!(
            decision,
            HumanDecision::Reject | HumanDecision::RequestChanges
        ) {
            self.hand_back(&submission).await?;
        }
        Ok(verdict)
    }

    async fn hand_back(&self, submission: &Submission) -> Result<()> {
        let mut claim = self
            .store
            .get_claim(submission.claim_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("claim", submission.claim_id))?;
        if claim.status == ClaimStatus::Submitted {
            claim.status = ClaimStatus::Active;
            claim.version += 1;
            self.store.put_claim(claim).await?;
        }

        let bounty = self.registry.get_bounty(submission.bounty_id).await?;
        if matches!(
            bounty.status,
            BountyStatus::Submitted | BountyStatus::UnderReview
        ) {
            self.registry
                .transition(bounty.id, BountyStatus::Claimed, bounty.version)
                .await?;
        }
        Ok(())
    }

    /// Whether the review phase satisfies the bounty's rigor requirements.
    pub fn is_review_complete(&self, verdict: &ReviewVerdict, bounty: &Bounty) -> bool {
        verdict.meets_review_rigor(bounty)
    }

    /// Auto-merge eligibility for a submission. Fails closed when no
    /// verdict or no automated score exists.
    pub async fn is_eligible_for_auto_merge(&self, submission_id: SubmissionId) -> Result<bool> {
        Ok(self
            .store
            .get_verdict(submission_id)
            .await?
            .map(|v| v.is_eligible_for_auto_merge())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watt_storage::MemoryStore;
    use watt_types::{BountySpec, BountyTier, Claim, RubricDimension, WattAmount};

    struct Harness {
        store: Arc<dyn LedgerStore>,
        registry: Arc<BountyRegistry>,
        scorer: Arc<ScriptedReviewService>,
        aggregator: ReviewAggregator,
    }

    fn harness() -> Harness {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(BountyRegistry::new(store.clone()));
        let scorer = Arc::new(ScriptedReviewService::new());
        let aggregator = ReviewAggregator::new(store.clone(), registry.clone(), scorer.clone());
        Harness {
            store,
            registry,
            scorer,
            aggregator,
        }
    }

    fn dim(score: f64, concern: bool) -> DimensionScore {
        DimensionScore {
            dimension: RubricDimension::CodeQuality,
            score,
            concern,
        }
    }

    async fn seed_submission(h: &Harness, tier: BountyTier, reward: f64) -> (Bounty, Submission) {
        let bounty = h
            .registry
            .create_bounty(
                BountySpec {
                    title: "t".to_string(),
                    description: "d".to_string(),
                    tier,
                    reward: WattAmount::from_watt(reward),
                    stake_percent: 0.10,
                    issue_ref: "7".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        let bounty = h
            .registry
            .transition(bounty.id, BountyStatus::Claimed, 0)
            .await
            .unwrap();
        let bounty = h
            .registry
            .transition(bounty.id, BountyStatus::Submitted, 1)
            .await
            .unwrap();

        let mut claim = Claim::new(
            bounty.id,
            WalletAddress::from_bytes([1; 32]),
            bounty.required_stake(),
            Utc::now(),
        );
        claim.status = ClaimStatus::Submitted;
        let submission = Submission::new(claim.id, bounty.id, "PR-1".to_string(), Utc::now());
        claim.submission_id = Some(submission.id);
        h.store.put_claim(claim).await.unwrap();
        h.store.put_submission(submission.clone()).await.unwrap();
        (bounty, submission)
    }

    #[tokio::test]
    async fn test_evaluate_records_score_and_opens_review() {
        let h = harness();
        let (bounty, submission) = seed_submission(&h, BountyTier::Medium, 50_000.0).await;
        h.scorer.script(vec![dim(9.2, false)]).await;

        let verdict = h
            .aggregator
            .evaluate_submission(submission.id, Utc::now())
            .await
            .unwrap();
        let auto = verdict.automated.unwrap();
        assert!((auto.weighted_score - 9.2).abs() < f64::EPSILON);
        assert!(!auto.has_open_concern);

        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_scorer_failure_records_nothing() {
        let h = harness();
        let (_, submission) = seed_submission(&h, BountyTier::Medium, 50_000.0).await;
        h.scorer.set_unavailable(true);

        let err = h
            .aggregator
            .evaluate_submission(submission.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReviewServiceUnavailable(_)));

        // Nothing recorded, eligibility fails closed
        assert!(h.store.get_verdict(submission.id).await.unwrap().is_none());
        assert!(!h
            .aggregator
            .is_eligible_for_auto_merge(submission.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_community_review_rejected() {
        let h = harness();
        let (_, submission) = seed_submission(&h, BountyTier::Medium, 50_000.0).await;
        let reviewer = WalletAddress::from_bytes([5; 32]);

        h.aggregator
            .record_community_review(
                submission.id,
                reviewer,
                CommunityVerdict::Approve,
                "correctness",
                Utc::now(),
            )
            .await
            .unwrap();
        let err = h
            .aggregator
            .record_community_review(
                submission.id,
                reviewer,
                CommunityVerdict::Flag,
                "style",
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReview(_)));
    }

    #[tokio::test]
    async fn test_request_changes_hands_work_back() {
        let h = harness();
        let (bounty, submission) = seed_submission(&h, BountyTier::Medium, 50_000.0).await;
        h.scorer.script(vec![dim(6.0, false)]).await;
        h.aggregator
            .evaluate_submission(submission.id, Utc::now())
            .await
            .unwrap();

        h.aggregator
            .record_human_decision(submission.id, HumanDecision::RequestChanges, Utc::now())
            .await
            .unwrap();

        let claim = h
            .store
            .get_claim(submission.claim_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Active);
        let bounty = h.registry.get_bounty(bounty.id).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Claimed);
    }

    #[tokio::test]
    async fn test_review_completeness_tracks_tier_rigor() {
        let h = harness();
        let (bounty, submission) = seed_submission(&h, BountyTier::Critical, 600_000.0).await;
        h.scorer.script(vec![dim(9.5, false)]).await;
        let mut verdict = h
            .aggregator
            .evaluate_submission(submission.id, Utc::now())
            .await
            .unwrap();
        assert!(!h.aggregator.is_review_complete(&verdict, &bounty));

        // Critical needs three community reviews and a human decision
        for byte in 10u8..13 {
            verdict = h
                .aggregator
                .record_community_review(
                    submission.id,
                    WalletAddress::from_bytes([byte; 32]),
                    CommunityVerdict::Approve,
                    "correctness",
                    Utc::now(),
                )
                .await
                .unwrap();
        }
        assert!(!h.aggregator.is_review_complete(&verdict, &bounty));

        let verdict = h
            .aggregator
            .record_human_decision(submission.id, HumanDecision::Approve, Utc::now())
            .await
            .unwrap();
        assert!(h.aggregator.is_review_complete(&verdict, &bounty));
    }

    #[tokio::test]
    async fn test_concern_blocks_auto_merge_regardless_of_score() {
        let h = harness();
        let (_, submission) = seed_submission(&h, BountyTier::Medium, 50_000.0).await;
        h.scorer.script(vec![dim(9.8, true)]).await;
        h.aggregator
            .evaluate_submission(submission.id, Utc::now())
            .await
            .unwrap();

        assert!(!h
            .aggregator
            .is_eligible_for_auto_merge(submission.id)
            .await
            .unwrap());
    }
}

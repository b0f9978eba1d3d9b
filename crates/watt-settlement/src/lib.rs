use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use watt_gateway::EscrowGateway;
use watt_profile::ProfileTracker;
use watt_registry::BountyRegistry;
use watt_storage::LedgerStore;
use watt_types::{
    Bounty, BountyStatus, Claim, ClaimId, ClaimStatus, Disposition, HumanDecision, LedgerError,
    Result, ReviewVerdict, SettlementRecord, WalletAddress, WattAmount,
};

/// Applies the disposition table to a concluded claim, moves funds out of
/// the bounty pool, and writes the immutable settlement record.
///
/// Settlement is idempotent per claim: the outbound transfer carries a
/// claim-derived idempotency key, and the record is written exactly once
/// after the transfer reports success. A retry after a crash between the
/// two replays the transfer as a no-op and completes the record.
pub struct SettlementEngine {
    store: Arc<dyn LedgerStore>,
    registry: Arc<BountyRegistry>,
    gateway: Arc<dyn EscrowGateway>,
    profiles: Arc<ProfileTracker>,
}

impl SettlementEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<BountyRegistry>,
        gateway: Arc<dyn EscrowGateway>,
        profiles: Arc<ProfileTracker>,
    ) -> Self {
        Self {
            store,
            registry,
            gateway,
            profiles,
        }
    }

    pub async fn settle(
        &self,
        claim_id: ClaimId,
        disposition: Disposition,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord> {
        if self.store.get_settlement(claim_id).await?.is_some() {
            return Err(LedgerError::SettlementAlreadyRecorded(claim_id.to_string()));
        }

        let claim = self
            .store
            .get_claim(claim_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("claim", claim_id))?;
        let bounty = self.registry.get_bounty(claim.bounty_id).await?;
        let verdict = match claim.submission_id {
            Some(submission_id) => self.store.get_verdict(submission_id).await?,
            None => None,
        };

        self.check_permitted(&claim, &bounty, verdict.as_ref(), &disposition)?;

        let (stake_fraction, payout_fraction) = disposition.fractions()?;
        let stake_return = claim.stake.mul_fraction(stake_fraction);

        // Tier bonus applies to the payout only, from a fresh profile read.
        let profile = self.profiles.get_or_create(claim.contributor, now).await?;
        let payout = bounty
            .reward
            .mul_fraction(payout_fraction)
            .mul_fraction(profile.tier.payout_multiplier());

        let total = stake_return.saturating_add(payout);
        let mut tx_refs = Vec::new();
        if !total.is_zero() {
            let tx_ref = self
                .gateway
                .transfer(
                    WalletAddress::bounty_pool(),
                    claim.contributor,
                    total,
                    &format!("SETTLE-ISSUE-{}", bounty.issue_ref),
                    &format!("settle-{}", claim_id),
                )
                .await?;
            tx_refs.push(tx_ref);
        }

        let record = SettlementRecord {
            claim_id,
            contributor: claim.contributor,
            disposition,
            stake_return,
            payout,
            tx_refs,
            settled_at: now,
        };
        self.store.append_settlement(record.clone()).await?;

        self.conclude_claim(&claim, &disposition).await?;
        self.conclude_bounty(&bounty, &claim, &disposition).await?;

        let score = verdict
            .as_ref()
            .and_then(|v| v.automated.as_ref())
            .map(|a| a.weighted_score);
        let completed = matches!(disposition, Disposition::Merged);
        self.profiles
            .record_settlement(
                claim.contributor,
                if completed { score } else { None },
                completed,
                now,
            )
            .await?;

        if disposition.bans_contributor() {
            warn!(claim_id = %claim_id, contributor = %claim.contributor, "Malicious disposition");
            self.profiles.ban(claim.contributor, now).await?;
        }

        info!(
            claim_id = %claim_id,
            disposition = %disposition,
            stake_return = %record.stake_return,
            payout = %record.payout,
            tier = %profile.tier,
            "Claim settled"
        );
        Ok(record)
    }

    /// Gate settlement on review state.
    ///
    /// Forfeiture of an expired or abandoned claim needs no review. A
    /// submitted claim needs the tier's human decision, except Low-tier
    /// submissions, which may instead ride an auto-merge-eligible verdict.
    /// A claim handed back to Active by a rejection can still be settled
    /// on any forfeiting disposition. Full payout requires an explicit
    /// approval path.
    fn check_permitted(
        &self,
        claim: &Claim,
        bounty: &Bounty,
        verdict: Option<&ReviewVerdict>,
        disposition: &Disposition,
    ) -> Result<()> {
        match claim.status {
            ClaimStatus::Expired | ClaimStatus::Abandoned => {
                if matches!(disposition, Disposition::Merged) {
                    return Err(LedgerError::SettlementNotPermitted(format!(
                        "claim {} is {}, cannot settle as merged",
                        claim.id, claim.status
                    )));
                }
                Ok(())
            }
            ClaimStatus::Active => {
                let rejected = verdict.and_then(|v| v.human).is_some();
                if !rejected || matches!(disposition, Disposition::Merged) {
                    return Err(LedgerError::SettlementNotPermitted(format!(
                        "claim {} is {} without a concluded rejection",
                        claim.id, claim.status
                    )));
                }
                Ok(())
            }
            ClaimStatus::Submitted => {
                let human = verdict.and_then(|v| v.human);
                let auto_eligible = verdict
                    .map(|v| v.is_eligible_for_auto_merge())
                    .unwrap_or(false);

                let decided = if bounty.tier.requires_human_decision() {
                    human.is_some()
                } else {
                    human.is_some() || auto_eligible
                };
                if !decided {
                    return Err(LedgerError::SettlementNotPermitted(format!(
                        "claim {} has no concluded review",
                        claim.id
                    )));
                }

                if matches!(disposition, Disposition::Merged) {
                    // Full payout requires the tier's review thresholds on
                    // top of an approval: automated score, community review
                    // count, human decision where the tier demands one.
                    let rigor = verdict
                        .map(|v| v.meets_review_rigor(bounty))
                        .unwrap_or(false);
                    if !rigor {
                        return Err(LedgerError::SettlementNotPermitted(format!(
                            "claim {} has not met the bounty's review thresholds",
                            claim.id
                        )));
                    }
                    let approved = human == Some(HumanDecision::Approve)
                        || (!bounty.tier.requires_human_decision() && auto_eligible);
                    if !approved {
                        return Err(LedgerError::SettlementNotPermitted(format!(
                            "claim {} was not approved for merge",
                            claim.id
                        )));
                    }
                }
                Ok(())
            }
            other => Err(LedgerError::SettlementNotPermitted(format!(
                "claim {} is {}",
                claim.id, other
            ))),
        }
    }

    async fn conclude_claim(&self, claim: &Claim, disposition: &Disposition) -> Result<()> {
        if !matches!(
            claim.status,
            ClaimStatus::Submitted | ClaimStatus::Active
        ) {
            return Ok(());
        }
        let mut claim = claim.clone();
        claim.status = match disposition {
            Disposition::Abandoned | Disposition::Malicious => ClaimStatus::Abandoned,
            _ => ClaimStatus::Settled,
        };
        claim.version += 1;
        self.store.put_claim(claim).await
    }

    /// Merged work closes the bounty; anything else puts the posting back
    /// on the board.
    async fn conclude_bounty(
        &self,
        bounty: &Bounty,
        claim: &Claim,
        disposition: &Disposition,
    ) -> Result<()> {
        if claim.status == ClaimStatus::Expired || claim.status == ClaimStatus::Abandoned {
            // The sweep or abandonment already reopened it.
            return Ok(());
        }
        if matches!(disposition, Disposition::Merged) {
            self.registry
                .transition(bounty.id, BountyStatus::Settled, bounty.version)
                .await?;
            return Ok(());
        }

        let mut bounty = bounty.clone();
        if matches!(
            bounty.status,
            BountyStatus::Submitted | BountyStatus::UnderReview
        ) {
            bounty = self
                .registry
                .transition(bounty.id, BountyStatus::Claimed, bounty.version)
                .await?;
        }
        if bounty.status == BountyStatus::Claimed {
            self.registry
                .transition(bounty.id, BountyStatus::Open, bounty.version)
                .await?;
        }
        Ok(())
    }

    /// Pool balance sanity check: posted rewards plus escrowed stakes
    /// must be covered before a settlement run.
    pub async fn pool_balance(&self) -> Result<WattAmount> {
        self.gateway.get_balance(WalletAddress::bounty_pool()).await
    }
}

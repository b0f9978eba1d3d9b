use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use watt_storage::LedgerStore;
use watt_types::{ContributorProfile, Result, WalletAddress};

/// Maintains contributor reputation state.
///
/// Profiles are recomputed after every settlement that touches the
/// contributor and read fresh wherever a tier or ban check matters; the
/// tier recorded here is never cached on a claim.
pub struct ProfileTracker {
    store: Arc<dyn LedgerStore>,
}

impl ProfileTracker {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn get_or_create(
        &self,
        wallet: WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<ContributorProfile> {
        match self.store.get_profile(wallet).await? {
            Some(profile) => Ok(profile),
            None => {
                let profile = ContributorProfile::new(wallet, now);
                self.store.put_profile(profile.clone()).await?;
                Ok(profile)
            }
        }
    }

    pub async fn is_banned(&self, wallet: WalletAddress) -> Result<bool> {
        Ok(self
            .store
            .get_profile(wallet)
            .await?
            .map(|p| p.banned)
            .unwrap_or(false))
    }

    pub async fn ban(&self, wallet: WalletAddress, now: DateTime<Utc>) -> Result<()> {
        let mut profile = self.get_or_create(wallet, now).await?;
        profile.banned = true;
        profile.updated_at = now;
        warn!(%wallet, "Contributor banned");
        self.store.put_profile(profile).await
    }

    /// Fold one settlement outcome into the profile and rederive the tier.
    /// `score` is the weighted verdict score when one was recorded;
    /// `completed` marks dispositions that count as a finished bounty.
    pub async fn record_settlement(
        &self,
        wallet: WalletAddress,
        score: Option<f64>,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<ContributorProfile> {
        let mut profile = self.get_or_create(wallet, now).await?;
        let previous_tier = profile.tier;
        profile.record_settlement(score, completed, now);

        if profile.tier != previous_tier {
            info!(
                %wallet,
                from = %previous_tier,
                to = %profile.tier,
                completed = profile.completed_bounties,
                average = profile.average_score(),
                "Contributor tier changed"
            );
        }
        self.store.put_profile(profile.clone()).await?;
        Ok(profile)
    }
}

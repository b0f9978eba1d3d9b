use crate::AutomatedReviewService;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use watt_types::{DimensionScore, LedgerError, Result, Submission};

/// Scripted scorer used by tests and local runs: returns whatever was
/// last scripted, or fails when marked unavailable.
pub struct ScriptedReviewService {
    response: RwLock<Vec<DimensionScore>>,
    unavailable: AtomicBool,
}

impl Default for ScriptedReviewService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReviewService {
    pub fn new() -> Self {
        Self {
            response: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn script(&self, dimensions: Vec<DimensionScore>) {
        let mut response = self.response.write().await;
        *response = dimensions;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AutomatedReviewService for ScriptedReviewService {
    async fn evaluate(&self, _submission: &Submission) -> Result<Vec<DimensionScore>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::ReviewServiceUnavailable(
                "scorer offline".to_string(),
            ));
        }
        Ok(self.response.read().await.clone())
    }
}

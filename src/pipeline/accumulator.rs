//! Batch accumulator
//!
//! Tracks the open collection window per (district, constituency) key. Each
//! admitted submission bumps the window's counter; once the configured limit
//! is reached the caller triggers analysis and a fresh window opens on the
//! next admit.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::storage::FeedbackStore;
use crate::types::Batch;

/// Admission front-end over the store's atomic find-and-increment
pub struct BatchAccumulator {
    store: Arc<dyn FeedbackStore>,
    limit: u32,
}

impl BatchAccumulator {
    /// The batch size limit is injected here, not hardcoded at call sites
    pub fn new(store: Arc<dyn FeedbackStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    /// Admit one submission for a key and return the post-increment batch
    ///
    /// Safe under concurrent admits for the same key: the increment and the
    /// fallback insert are atomic at the storage layer, so two submissions
    /// can neither double-create a collecting batch nor both observe the
    /// same pre-increment count.
    pub async fn admit(&self, district: &str, constituency: &str) -> Result<Batch> {
        let batch = self.store.admit_batch(district, constituency, self.limit).await?;
        debug!(
            batch_id = %batch.id,
            district,
            constituency,
            count = batch.count,
            limit = batch.limit,
            "admitted submission"
        );
        Ok(batch)
    }
}

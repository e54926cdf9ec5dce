//! Issue aggregator
//!
//! Folds the classified feedback of one completed batch into the running
//! global-issue records. Merging is per-item and keyed by the deterministic
//! issue key, so the same underlying problem reported across batches lands
//! on one record with an escalating priority tier.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::storage::FeedbackStore;
use crate::types::{issue_key, Annotation, BatchId, Contributor, Feedback};

/// Merges classified feedback into global issues
pub struct IssueAggregator {
    store: Arc<dyn FeedbackStore>,
}

impl IssueAggregator {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Claim one feedback row and merge it into its global issue
    ///
    /// The claim and the upsert run in one storage transaction, so a
    /// feedback can never be merged twice and concurrent batches resolving
    /// to the same key never lose updates. Returns `false` when the row was
    /// already claimed by an earlier or concurrent pass.
    pub async fn merge(
        &self,
        feedback: &Feedback,
        annotation: &Annotation,
        batch_id: BatchId,
    ) -> Result<bool> {
        let key = issue_key(&annotation.category, &annotation.main_issue);
        let contributor = Contributor {
            name: feedback.submitter.name.clone(),
            booth: feedback.submitter.booth.clone(),
            batch_id,
        };

        match self
            .store
            .annotate_and_merge(
                feedback.id,
                annotation,
                &key,
                &annotation.category,
                &annotation.main_issue,
                contributor,
            )
            .await?
        {
            Some(issue) => {
                debug!(
                    issue_key = %issue.issue_key,
                    total_reports = issue.total_reports,
                    priority = %issue.priority,
                    "merged feedback into global issue"
                );
                Ok(true)
            }
            None => {
                debug!(feedback_id = %feedback.id, "feedback already claimed, skipping");
                Ok(false)
            }
        }
    }
}

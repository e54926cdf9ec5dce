//! Feedback-to-issue pipeline
//!
//! Orchestrates the core flow: submission → batch accumulator (decides
//! whether to trigger) → classifier over the whole batch → issue aggregator
//! → store. One logical worker runs per batch-completion event; the only
//! true race conditions live behind the storage port's atomic operations.

pub mod accumulator;
pub mod aggregator;

use std::sync::Arc;

use tracing::{error, info};

use crate::classifier;
use crate::error::Result;
use crate::storage::FeedbackStore;
use crate::types::{BatchId, BatchStatus, Feedback, Submission};

use accumulator::BatchAccumulator;
use aggregator::IssueAggregator;

/// What a submission resulted in, surfaced as the intake status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Stored; the batch is still collecting
    Stored { remaining: u32 },
    /// The submission filled the batch and analysis ran
    Analyzed { batch_id: BatchId, limit: u32 },
}

impl SubmissionOutcome {
    /// Human-readable intake status message
    pub fn message(&self) -> String {
        match self {
            SubmissionOutcome::Stored { remaining } => {
                format!("Feedback stored. Waiting for {} more submissions.", remaining)
            }
            SubmissionOutcome::Analyzed { limit, .. } => {
                format!("Batch full ({}/{}) - analysis triggered.", limit, limit)
            }
        }
    }
}

/// The feedback-to-issue aggregation pipeline
pub struct Pipeline {
    store: Arc<dyn FeedbackStore>,
    accumulator: BatchAccumulator,
    aggregator: IssueAggregator,
}

impl Pipeline {
    pub fn new(store: Arc<dyn FeedbackStore>, batch_limit: u32) -> Self {
        let accumulator = BatchAccumulator::new(store.clone(), batch_limit);
        let aggregator = IssueAggregator::new(store.clone());
        Self {
            store,
            accumulator,
            aggregator,
        }
    }

    /// The store the pipeline writes to (reporting reads go through here)
    pub fn store(&self) -> &Arc<dyn FeedbackStore> {
        &self.store
    }

    /// Handle one submission end to end
    ///
    /// Validates, admits into the key's collecting batch, persists the raw
    /// feedback, and — when the admit filled the batch — runs the analysis
    /// for the whole batch before returning. On analysis failure the batch
    /// stays in `Processing` and the error surfaces to the caller; it can be
    /// retried via [`Pipeline::recover_stalled`].
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome> {
        submission.validate()?;

        let batch = self
            .accumulator
            .admit(&submission.district, &submission.constituency)
            .await?;

        let feedback = Feedback::from_submission(submission, batch.id);
        self.store.insert_feedback(&feedback).await?;

        if !batch.is_full() {
            return Ok(SubmissionOutcome::Stored {
                remaining: batch.remaining(),
            });
        }

        match self
            .store
            .transition_batch(batch.id, BatchStatus::Collecting, BatchStatus::Processing)
            .await
        {
            Ok(()) => {}
            Err(crate::error::CivicpulseError::InvalidTransition(_)) => {
                // A concurrent submission won the trigger. Its analysis read
                // may have run before our row landed, so sweep the batch for
                // unclaimed rows before deferring to the winner's run.
                self.annotate_unmerged(batch.id).await?;
                return Ok(SubmissionOutcome::Analyzed {
                    batch_id: batch.id,
                    limit: batch.limit,
                });
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.analyze_batch(batch.id).await {
            // Left in Processing for recover_stalled; never marked completed
            // with unmerged issues.
            error!(batch_id = %batch.id, error = %e, "batch analysis failed");
            return Err(e);
        }

        Ok(SubmissionOutcome::Analyzed {
            batch_id: batch.id,
            limit: batch.limit,
        })
    }

    /// Classify and aggregate every feedback row of a processing batch,
    /// then mark it completed
    ///
    /// Rows that already carry an annotation (from a prior partial attempt)
    /// are skipped, so re-running after a failure does not double-count.
    /// Completion is marked only after aggregation finishes.
    pub async fn analyze_batch(&self, batch_id: BatchId) -> Result<()> {
        info!(%batch_id, "analyzing batch");

        let merged = self.annotate_unmerged(batch_id).await?;
        self.store
            .transition_batch(batch_id, BatchStatus::Processing, BatchStatus::Completed)
            .await?;
        info!(%batch_id, merged, "batch completed");
        Ok(())
    }

    /// Classify and merge every unclaimed row of a batch, regardless of the
    /// batch's status
    ///
    /// Returns how many rows were merged by this call. The per-row claim is
    /// atomic at the storage layer, so concurrent sweeps of the same batch
    /// split the rows between them instead of double-counting.
    pub async fn annotate_unmerged(&self, batch_id: BatchId) -> Result<usize> {
        let rows = self.store.feedback_for_batch(batch_id).await?;
        let mut merged = 0usize;
        for feedback in &rows {
            if feedback.annotation.is_some() {
                continue;
            }
            let annotation = classifier::annotate(&feedback.text);
            if self.aggregator.merge(feedback, &annotation, batch_id).await? {
                merged += 1;
            }
        }
        Ok(merged)
    }

    /// Re-run analysis for batches stuck in `Processing`, and repair any
    /// completed batch still holding unclaimed rows
    ///
    /// A completed batch can hold an unclaimed row when a trigger-race loser
    /// crashed between inserting its row and sweeping the batch. Returns the
    /// number of batches recovered; safe to call repeatedly.
    pub async fn recover_stalled(&self) -> Result<usize> {
        let stalled = self.store.batches_with_status(BatchStatus::Processing).await?;
        for batch in &stalled {
            info!(batch_id = %batch.id, "recovering stalled batch");
            self.analyze_batch(batch.id).await?;
        }
        let mut recovered = stalled.len();

        for batch in self.store.batches_with_status(BatchStatus::Completed).await? {
            let merged = self.annotate_unmerged(batch.id).await?;
            if merged > 0 {
                info!(batch_id = %batch.id, merged, "repaired completed batch");
                recovered += 1;
            }
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::types::PriorityTier;

    fn submission(district: &str, constituency: &str, text: &str) -> Submission {
        Submission {
            district: district.to_string(),
            constituency: constituency.to_string(),
            name: None,
            age: None,
            booth_no: "1".to_string(),
            email: None,
            type_of_feedback: "Complaint".to_string(),
            feedback_text: text.to_string(),
            rating: None,
            solution: None,
        }
    }

    fn pipeline_with_limit(limit: u32) -> (Pipeline, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Pipeline::new(store.clone(), limit), store)
    }

    #[tokio::test]
    async fn test_submit_below_limit_reports_remaining() {
        let (pipeline, _) = pipeline_with_limit(3);
        let outcome = pipeline
            .submit(submission("Chennai", "Mylapore", "thanni varala"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Stored { remaining: 2 });
        assert!(outcome.message().contains("2 more"));
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_required_field() {
        let (pipeline, store) = pipeline_with_limit(3);
        let mut bad = submission("Chennai", "Mylapore", "thanni varala");
        bad.booth_no = String::new();
        assert!(pipeline.submit(bad).await.is_err());
        // Rejected pre-persistence: nothing stored.
        assert_eq!(store.feedback_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_batch_completes_and_annotates_everything() {
        let (pipeline, store) = pipeline_with_limit(3);
        for text in ["thanni varala", "water leak", "current cut for 3 days"] {
            pipeline
                .submit(submission("Chennai", "Mylapore", text))
                .await
                .unwrap();
        }

        let completed = store
            .batches_with_status(BatchStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);

        let rows = store.feedback_for_batch(completed[0].id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|f| f.annotation.is_some()));
    }

    #[tokio::test]
    async fn test_next_submission_opens_fresh_batch() {
        let (pipeline, store) = pipeline_with_limit(2);
        for text in ["garbage everywhere", "kuppai smell"] {
            pipeline
                .submit(submission("Chennai", "Mylapore", text))
                .await
                .unwrap();
        }
        let outcome = pipeline
            .submit(submission("Chennai", "Mylapore", "road damaged"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Stored { remaining: 1 });

        let collecting = store
            .batches_with_status(BatchStatus::Collecting)
            .await
            .unwrap();
        assert_eq!(collecting.len(), 1);
        assert_eq!(collecting[0].count, 1);
    }

    #[tokio::test]
    async fn test_issue_escalates_across_batches() {
        let (pipeline, store) = pipeline_with_limit(1);
        // Five single-feedback batches about water reach the MEDIUM tier.
        for _ in 0..5 {
            pipeline
                .submit(submission("Chennai", "Mylapore", "water supply problem"))
                .await
                .unwrap();
        }

        let issue = store
            .get_global_issue("water_water_supply_issue_in_the_area")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issue.total_reports, 5);
        assert_eq!(issue.priority, PriorityTier::Medium);
        assert_eq!(issue.batches.len(), 5);
    }

    /// Drive a batch into the state a trigger-race loser observes: the
    /// winner's analysis read ran before the loser's row was inserted, so
    /// the completed batch holds one unclaimed row.
    async fn stranded_row_batch(store: &Arc<MemoryStore>, pipeline: &Pipeline) -> BatchId {
        let batch = store.admit_batch("Chennai", "Mylapore", 2).await.unwrap();
        let winner = Feedback::from_submission(
            submission("Chennai", "Mylapore", "thanni varala"),
            batch.id,
        );
        store.insert_feedback(&winner).await.unwrap();
        store.admit_batch("Chennai", "Mylapore", 2).await.unwrap();
        store
            .transition_batch(batch.id, BatchStatus::Collecting, BatchStatus::Processing)
            .await
            .unwrap();
        pipeline.analyze_batch(batch.id).await.unwrap();

        // The loser's insert lands after the winner's read.
        let loser = Feedback::from_submission(
            submission("Chennai", "Mylapore", "water pipe leak"),
            batch.id,
        );
        store.insert_feedback(&loser).await.unwrap();
        batch.id
    }

    #[tokio::test]
    async fn test_trigger_race_loser_sweeps_its_late_row() {
        let (pipeline, store) = pipeline_with_limit(2);
        let batch_id = stranded_row_batch(&store, &pipeline).await;

        // The loser's continuation after losing the transition race.
        let swept = pipeline.annotate_unmerged(batch_id).await.unwrap();
        assert_eq!(swept, 1);

        let rows = store.feedback_for_batch(batch_id).await.unwrap();
        assert!(rows.iter().all(|f| f.annotation.is_some()));
        let issue = store
            .get_global_issue("water_water_supply_issue_in_the_area")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issue.total_reports, 2);

        // Sweeping again finds everything claimed already.
        assert_eq!(pipeline.annotate_unmerged(batch_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recover_repairs_completed_batch_with_unclaimed_row() {
        // If the loser also crashed before its sweep, recovery must find
        // the unclaimed row inside the completed batch.
        let (pipeline, store) = pipeline_with_limit(2);
        let batch_id = stranded_row_batch(&store, &pipeline).await;

        assert_eq!(pipeline.recover_stalled().await.unwrap(), 1);
        let rows = store.feedback_for_batch(batch_id).await.unwrap();
        assert!(rows.iter().all(|f| f.annotation.is_some()));
        let issue = store
            .get_global_issue("water_water_supply_issue_in_the_area")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issue.total_reports, 2);
        assert_eq!(pipeline.recover_stalled().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recover_stalled_completes_processing_batch() {
        let (pipeline, store) = pipeline_with_limit(2);
        // Simulate a batch that made it to Processing but whose analysis
        // never finished.
        let batch = store.admit_batch("Chennai", "Mylapore", 2).await.unwrap();
        let fb = Feedback::from_submission(submission("Chennai", "Mylapore", "thanni varala"), batch.id);
        store.insert_feedback(&fb).await.unwrap();
        store
            .transition_batch(batch.id, BatchStatus::Collecting, BatchStatus::Processing)
            .await
            .unwrap();

        let recovered = pipeline.recover_stalled().await.unwrap();
        assert_eq!(recovered, 1);

        let completed = store
            .batches_with_status(BatchStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(pipeline.recover_stalled().await.unwrap(), 0);
    }
}

//! Storage layer for the Civicpulse feedback service
//!
//! Provides the persistence port the pipeline is written against, plus two
//! implementations: a durable libSQL backend and an in-memory store used by
//! tests and ephemeral runs.

pub mod libsql;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Annotation, Batch, BatchId, BatchStatus, Contributor, Feedback, FeedbackId, GlobalIssue,
};

/// Persistence port for feedback, batches, and global issues
///
/// The two atomicity guarantees the pipeline relies on live here:
/// `admit_batch` must never race two collecting batches into existence for
/// the same key, and `merge_global_issue` must not lose updates when
/// concurrent batches resolve to the same issue key.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Atomically find the collecting batch for a (district, constituency)
    /// key and increment its count, or open a new batch (count=1) when none
    /// exists. Returns the post-increment state.
    async fn admit_batch(&self, district: &str, constituency: &str, limit: u32) -> Result<Batch>;

    /// Persist a raw feedback record
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()>;

    /// All feedback rows tagged with a batch id, in insertion order
    async fn feedback_for_batch(&self, batch_id: BatchId) -> Result<Vec<Feedback>>;

    /// Atomically claim a feedback row and merge it into its global issue
    ///
    /// The claim (setting the row's annotation) and the merge happen in one
    /// transaction: either both land or neither does, so re-running after a
    /// crash can never double-count a feedback. Returns the post-merge
    /// record, or `None` without merging when the row already carries an
    /// annotation (a prior or concurrent pass claimed it first).
    async fn annotate_and_merge(
        &self,
        id: FeedbackId,
        annotation: &Annotation,
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Result<Option<GlobalIssue>>;

    /// Advance a batch `from` one status `to` the next
    ///
    /// Errors when no batch matches (already advanced, or never existed),
    /// which keeps transitions monotonic.
    async fn transition_batch(
        &self,
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    ) -> Result<()>;

    /// Batches currently in the given status
    async fn batches_with_status(&self, status: BatchStatus) -> Result<Vec<Batch>>;

    /// All batches, newest first
    async fn list_batches(&self) -> Result<Vec<Batch>>;

    /// Atomically merge one classified feedback into its global issue:
    /// create on first occurrence, otherwise increment the report total,
    /// append the contributor, add the batch id (idempotent), and recompute
    /// the priority tier. Returns the post-merge record.
    async fn merge_global_issue(
        &self,
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Result<GlobalIssue>;

    /// Look up a global issue by key
    async fn get_global_issue(&self, issue_key: &str) -> Result<Option<GlobalIssue>>;

    /// Global issues sorted by (priority tier, total reports) descending
    async fn list_global_issues(&self) -> Result<Vec<GlobalIssue>>;
}

//! In-memory feedback store
//!
//! A mutex-guarded fake of the persistence port. Every port operation takes
//! the single lock, which trivially gives the same atomicity the libSQL
//! backend provides with transactions. Used by unit and pipeline tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CivicpulseError, Result};
use crate::storage::FeedbackStore;
use crate::types::{
    Annotation, Batch, BatchId, BatchStatus, Contributor, Feedback, FeedbackId, GlobalIssue,
};

/// In-memory implementation of [`FeedbackStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    feedbacks: Vec<Feedback>,
    batches: Vec<Batch>,
    issues: Vec<GlobalIssue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored feedback rows (test helper)
    pub async fn feedback_count(&self) -> usize {
        self.inner.lock().await.feedbacks.len()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn admit_batch(&self, district: &str, constituency: &str, limit: u32) -> Result<Batch> {
        let mut inner = self.inner.lock().await;
        if let Some(batch) = inner.batches.iter_mut().find(|b| {
            b.district == district
                && b.constituency == constituency
                && b.status == BatchStatus::Collecting
        }) {
            batch.count += 1;
            return Ok(batch.clone());
        }

        let batch = Batch::open(district, constituency, limit);
        inner.batches.push(batch.clone());
        Ok(batch)
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.inner.lock().await.feedbacks.push(feedback.clone());
        Ok(())
    }

    async fn feedback_for_batch(&self, batch_id: BatchId) -> Result<Vec<Feedback>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .feedbacks
            .iter()
            .filter(|f| f.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn annotate_and_merge(
        &self,
        id: FeedbackId,
        annotation: &Annotation,
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Result<Option<GlobalIssue>> {
        // Claim and merge under the one lock, mirroring the libSQL
        // backend's single transaction.
        let mut inner = self.inner.lock().await;
        {
            let feedback = inner
                .feedbacks
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| CivicpulseError::Other(format!("Feedback not found: {}", id)))?;
            if feedback.annotation.is_some() {
                return Ok(None);
            }
            feedback.annotation = Some(annotation.clone());
        }

        if let Some(issue) = inner.issues.iter_mut().find(|i| i.issue_key == issue_key) {
            issue.absorb(contributor);
            return Ok(Some(issue.clone()));
        }
        let issue = GlobalIssue::first_report(issue_key, category, issue_text, contributor);
        inner.issues.push(issue.clone());
        Ok(Some(issue))
    }

    async fn transition_batch(
        &self,
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .iter_mut()
            .find(|b| b.id == batch_id && b.status == from)
            .ok_or_else(|| {
                CivicpulseError::InvalidTransition(format!("{} ({} -> {})", batch_id, from, to))
            })?;
        batch.status = to;
        Ok(())
    }

    async fn batches_with_status(&self, status: BatchStatus) -> Result<Vec<Batch>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .batches
            .iter()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }

    async fn list_batches(&self) -> Result<Vec<Batch>> {
        let inner = self.inner.lock().await;
        let mut batches: Vec<Batch> = inner.batches.clone();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches)
    }

    async fn merge_global_issue(
        &self,
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Result<GlobalIssue> {
        let mut inner = self.inner.lock().await;
        if let Some(issue) = inner.issues.iter_mut().find(|i| i.issue_key == issue_key) {
            issue.absorb(contributor);
            return Ok(issue.clone());
        }

        let issue = GlobalIssue::first_report(issue_key, category, issue_text, contributor);
        inner.issues.push(issue.clone());
        Ok(issue)
    }

    async fn get_global_issue(&self, issue_key: &str) -> Result<Option<GlobalIssue>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .issues
            .iter()
            .find(|i| i.issue_key == issue_key)
            .cloned())
    }

    async fn list_global_issues(&self) -> Result<Vec<GlobalIssue>> {
        let inner = self.inner.lock().await;
        let mut issues: Vec<GlobalIssue> = inner.issues.clone();
        issues.sort_by(|a, b| {
            (b.priority, b.total_reports).cmp(&(a.priority, a.total_reports))
        });
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor() -> Contributor {
        Contributor {
            name: Some("Kumar".to_string()),
            booth: "12".to_string(),
            batch_id: BatchId::new(),
        }
    }

    #[tokio::test]
    async fn test_admit_reuses_open_batch() {
        let store = MemoryStore::new();
        let first = store.admit_batch("Chennai", "Mylapore", 5).await.unwrap();
        let second = store.admit_batch("Chennai", "Mylapore", 5).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.count, 2);
    }

    #[tokio::test]
    async fn test_admit_separate_keys_separate_batches() {
        let store = MemoryStore::new();
        let a = store.admit_batch("Chennai", "Mylapore", 5).await.unwrap();
        let b = store.admit_batch("Chennai", "Egmore", 5).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_transition_rejects_wrong_source_status() {
        let store = MemoryStore::new();
        let batch = store.admit_batch("Chennai", "Mylapore", 5).await.unwrap();
        store
            .transition_batch(batch.id, BatchStatus::Collecting, BatchStatus::Processing)
            .await
            .unwrap();

        // A second identical transition must fail: the batch moved on.
        let err = store
            .transition_batch(batch.id, BatchStatus::Collecting, BatchStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, CivicpulseError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_merge_creates_then_updates() {
        let store = MemoryStore::new();
        let created = store
            .merge_global_issue("water_x", "Water", "x", contributor())
            .await
            .unwrap();
        assert_eq!(created.total_reports, 1);

        let updated = store
            .merge_global_issue("water_x", "Water", "x", contributor())
            .await
            .unwrap();
        assert_eq!(updated.total_reports, 2);
        assert_eq!(updated.contributors.len(), 2);
    }

    #[tokio::test]
    async fn test_annotate_and_merge_claims_each_row_once() {
        let store = MemoryStore::new();
        let batch = store.admit_batch("Chennai", "Mylapore", 5).await.unwrap();
        let feedback = Feedback::from_submission(
            crate::types::Submission {
                district: "Chennai".to_string(),
                constituency: "Mylapore".to_string(),
                name: None,
                age: None,
                booth_no: "4".to_string(),
                email: None,
                type_of_feedback: "Complaint".to_string(),
                feedback_text: "thanni varala".to_string(),
                rating: None,
                solution: None,
            },
            batch.id,
        );
        store.insert_feedback(&feedback).await.unwrap();

        let annotation = crate::classifier::annotate(&feedback.text);
        let first = store
            .annotate_and_merge(
                feedback.id,
                &annotation,
                "water_x",
                "Water",
                "x",
                contributor(),
            )
            .await
            .unwrap();
        assert_eq!(first.unwrap().total_reports, 1);

        // Re-running after a crash must not double-count: the row is
        // already claimed, so nothing merges.
        let second = store
            .annotate_and_merge(
                feedback.id,
                &annotation,
                "water_x",
                "Water",
                "x",
                contributor(),
            )
            .await
            .unwrap();
        assert!(second.is_none());
        let issue = store.get_global_issue("water_x").await.unwrap().unwrap();
        assert_eq!(issue.total_reports, 1);
    }

    #[tokio::test]
    async fn test_list_sorted_by_tier_then_total() {
        let store = MemoryStore::new();
        for _ in 0..6 {
            store
                .merge_global_issue("water_x", "Water", "x", contributor())
                .await
                .unwrap();
        }
        for _ in 0..2 {
            store
                .merge_global_issue("road_y", "Road", "y", contributor())
                .await
                .unwrap();
        }
        store
            .merge_global_issue("other_z", "Other", "z", contributor())
            .await
            .unwrap();

        let issues = store.list_global_issues().await.unwrap();
        let keys: Vec<&str> = issues.iter().map(|i| i.issue_key.as_str()).collect();
        assert_eq!(keys, vec!["water_x", "road_y", "other_z"]);
    }
}

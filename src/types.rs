//! Core data types for the Civicpulse feedback service
//!
//! This module defines the fundamental data structures used throughout
//! civicpulse: raw feedback records, collection batches, classifier
//! annotations, and the running global-issue aggregates the admin reporting
//! layer reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CivicpulseError, Result};

/// Unique identifier for feedback records
///
/// Wraps a UUID to provide type safety and prevent mixing feedback IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub Uuid);

impl FeedbackId {
    /// Create a new random feedback ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a feedback ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| CivicpulseError::Other(format!("Invalid feedback ID '{}': {}", s, e)))?;
        Ok(Self(uuid))
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for collection batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    /// Create a new random batch ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a batch ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| CivicpulseError::Other(format!("Invalid batch ID '{}': {}", s, e)))?;
        Ok(Self(uuid))
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incoming submission payload from the form/API layer
///
/// Field names follow the public intake contract. Only `district`,
/// `constituency`, `booth_no`, and `feedback_text` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub district: String,
    pub constituency: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    pub booth_no: String,
    #[serde(default)]
    pub email: Option<String>,
    pub type_of_feedback: String,
    pub feedback_text: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub solution: Option<String>,
}

impl Submission {
    /// Validate required fields before anything is persisted
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("district", &self.district),
            ("constituency", &self.constituency),
            ("booth_no", &self.booth_no),
            ("feedback_text", &self.feedback_text),
        ] {
            if value.trim().is_empty() {
                return Err(CivicpulseError::InvalidSubmission(format!(
                    "{} is required",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Who submitted a piece of feedback
///
/// Everything except the booth number is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submitter {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub booth: String,
    pub email: Option<String>,
}

/// Per-feedback priority assigned by the classifier
///
/// Distinct from [`PriorityTier`], which is the aggregate escalation level
/// of a [`GlobalIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier output for one feedback text
///
/// Derived data, embedded in [`Feedback`]; attached exactly once when the
/// feedback's batch is analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub category: String,
    pub priority: Priority,
    pub main_issue: String,
    pub summary: String,
}

/// A single citizen feedback record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub district: String,
    pub constituency: String,
    pub submitter: Submitter,
    /// Free-form feedback type from the form ("Complaint", "Suggestion", ...)
    pub kind: String,
    /// Raw feedback text as submitted, possibly mixed-language
    pub text: String,
    pub rating: Option<u8>,
    pub solution: Option<String>,
    pub batch_id: BatchId,
    pub created_at: DateTime<Utc>,
    /// Set exactly once when the batch is analyzed
    pub annotation: Option<Annotation>,
}

impl Feedback {
    /// Build a feedback record from a validated submission and its batch
    pub fn from_submission(submission: Submission, batch_id: BatchId) -> Self {
        Self {
            id: FeedbackId::new(),
            district: submission.district,
            constituency: submission.constituency,
            submitter: Submitter {
                name: submission.name,
                age: submission.age,
                booth: submission.booth_no,
                email: submission.email,
            },
            kind: submission.type_of_feedback,
            text: submission.feedback_text,
            rating: submission.rating,
            solution: submission.solution,
            batch_id,
            created_at: Utc::now(),
            annotation: None,
        }
    }
}

/// Lifecycle of a collection batch
///
/// Transitions are monotonic: collecting → processing → completed.
/// A batch is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Collecting,
    Processing,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Collecting => "collecting",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "collecting" => Ok(BatchStatus::Collecting),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            other => Err(CivicpulseError::Other(format!(
                "Unknown batch status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One collection window for a (district, constituency) key
///
/// At most one batch per key is in `Collecting` state at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub district: String,
    pub constituency: String,
    pub count: u32,
    pub limit: u32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Open a new collecting batch with one admitted submission
    pub fn open(district: &str, constituency: &str, limit: u32) -> Self {
        Self {
            id: BatchId::new(),
            district: district.to_string(),
            constituency: constituency.to_string(),
            count: 1,
            limit,
            status: BatchStatus::Collecting,
            created_at: Utc::now(),
        }
    }

    /// Whether the batch has reached its configured size and should trigger
    /// analysis
    pub fn is_full(&self) -> bool {
        self.count >= self.limit
    }

    /// How many more submissions are needed before analysis triggers
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// Aggregate escalation level of a global issue
///
/// Recomputed from the running report total on every merge. Variant order
/// matters: the derived `Ord` drives the reporting sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityTier {
    /// Escalation thresholds over the running report total.
    /// Inclusive lower bounds, no gaps: 1–4 LOW, 5–9 MEDIUM, 10–19 HIGH,
    /// 20+ CRITICAL.
    pub fn from_total_reports(total: u64) -> Self {
        if total >= 20 {
            PriorityTier::Critical
        } else if total >= 10 {
            PriorityTier::High
        } else if total >= 5 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Low => "LOW",
            PriorityTier::Medium => "MEDIUM",
            PriorityTier::High => "HIGH",
            PriorityTier::Critical => "CRITICAL",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOW" => Ok(PriorityTier::Low),
            "MEDIUM" => Ok(PriorityTier::Medium),
            "HIGH" => Ok(PriorityTier::High),
            "CRITICAL" => Ok(PriorityTier::Critical),
            other => Err(CivicpulseError::Other(format!(
                "Unknown priority tier: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One submitter's contribution to a global issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub name: Option<String>,
    pub booth: String,
    pub batch_id: BatchId,
}

/// Running aggregate of one recurring issue across batches
///
/// Keyed by [`issue_key`]; at most one record per key. Created on first
/// occurrence, updated thereafter, never deleted by normal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalIssue {
    pub issue_key: String,
    pub category: String,
    pub issue_text: String,
    /// Monotonic counter: equals the number of feedback items merged in
    pub total_reports: u64,
    pub priority: PriorityTier,
    /// Contributing batch ids; set semantics, insertion order preserved
    pub batches: Vec<BatchId>,
    /// Append-only, unbounded
    pub contributors: Vec<Contributor>,
    pub last_updated: DateTime<Utc>,
}

impl GlobalIssue {
    /// First occurrence of an issue key: one report, LOW tier
    pub fn first_report(
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Self {
        Self {
            issue_key: issue_key.to_string(),
            category: category.to_string(),
            issue_text: issue_text.to_string(),
            total_reports: 1,
            priority: PriorityTier::Low,
            batches: vec![contributor.batch_id],
            contributors: vec![contributor],
            last_updated: Utc::now(),
        }
    }

    /// Fold one more classified feedback into this record
    pub fn absorb(&mut self, contributor: Contributor) {
        self.total_reports += 1;
        if !self.batches.contains(&contributor.batch_id) {
            self.batches.push(contributor.batch_id);
        }
        self.contributors.push(contributor);
        self.priority = PriorityTier::from_total_reports(self.total_reports);
        self.last_updated = Utc::now();
    }
}

/// Deterministic issue key merging feedback that describes the same
/// underlying problem, across batches
///
/// Pure function of (category, main issue): concatenated with an underscore,
/// spaces replaced by underscores, lowercased.
pub fn issue_key(category: &str, main_issue: &str) -> String {
    format!("{}_{}", category, main_issue)
        .replace(' ', "_")
        .to_lowercase()
}

//! Civicpulse - Citizen Feedback Aggregation Service
//!
//! Collects citizen feedback through an HTTP intake endpoint, batches
//! submissions per (district, constituency), runs a rule-based text
//! classifier over each completed batch, and merges the results into
//! deduplicated global-issue records with escalating priority tiers.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Feedback, Batch, GlobalIssue, ...)
//! - **Classifier**: Pure rule-based text annotation
//! - **Pipeline**: Batch accumulation, triggering, and issue aggregation
//! - **Storage**: Persistence port with libSQL and in-memory backends
//! - **Api**: axum HTTP surface for intake and reporting
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use civicpulse::{LibsqlStorage, Pipeline, Submission};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(LibsqlStorage::connect("civicpulse.db").await?);
//!     let pipeline = Pipeline::new(store, 15);
//!
//!     let outcome = pipeline.submit(Submission {
//!         district: "Chennai".into(),
//!         constituency: "Mylapore".into(),
//!         booth_no: "12".into(),
//!         type_of_feedback: "Complaint".into(),
//!         feedback_text: "thanni varala, romba kastam".into(),
//!         name: None, age: None, email: None, rating: None, solution: None,
//!     }).await?;
//!     println!("{}", outcome.message());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use error::{CivicpulseError, Result};
pub use pipeline::{Pipeline, SubmissionOutcome};
pub use storage::{libsql::LibsqlStorage, memory::MemoryStore, FeedbackStore};
pub use types::{
    issue_key, Annotation, Batch, BatchId, BatchStatus, Contributor, Feedback, FeedbackId,
    GlobalIssue, Priority, PriorityTier, Submission, Submitter,
};

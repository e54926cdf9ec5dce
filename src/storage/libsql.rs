//! LibSQL storage backend implementation
//!
//! Durable persistence for feedback, batches, and global issues. The two
//! atomicity guarantees of the port are carried by SQL: batch admission is a
//! single `UPDATE .. RETURNING` with an insert fallback guarded by a partial
//! unique index, and issue merging runs inside an immediate transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{CivicpulseError, Result};
use crate::storage::FeedbackStore;
use crate::types::{
    Annotation, Batch, BatchId, BatchStatus, Contributor, Feedback, FeedbackId, GlobalIssue,
    PriorityTier, Submitter,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS feedbacks (
    id TEXT PRIMARY KEY,
    district TEXT NOT NULL,
    constituency TEXT NOT NULL,
    submitter TEXT NOT NULL,
    kind TEXT NOT NULL,
    text TEXT NOT NULL,
    rating INTEGER,
    solution TEXT,
    batch_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    annotation TEXT
);
CREATE INDEX IF NOT EXISTS idx_feedbacks_batch ON feedbacks(batch_id);

CREATE TABLE IF NOT EXISTS batches (
    id TEXT PRIMARY KEY,
    district TEXT NOT NULL,
    constituency TEXT NOT NULL,
    count INTEGER NOT NULL,
    batch_limit INTEGER NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_batches_one_collecting
    ON batches(district, constituency) WHERE status = 'collecting';

CREATE TABLE IF NOT EXISTS global_issues (
    issue_key TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    issue_text TEXT NOT NULL,
    total_reports INTEGER NOT NULL,
    priority TEXT NOT NULL,
    batches TEXT NOT NULL,
    contributors TEXT NOT NULL,
    last_updated TEXT NOT NULL
);
"#;

const BATCH_COLUMNS: &str = "id, district, constituency, count, batch_limit, status, created_at";
const FEEDBACK_COLUMNS: &str =
    "id, district, constituency, submitter, kind, text, rating, solution, batch_id, created_at, annotation";
const ISSUE_COLUMNS: &str =
    "issue_key, category, issue_text, total_reports, priority, batches, contributors, last_updated";

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
    /// Held for the storage's lifetime: a shared-cache in-memory database is
    /// destroyed when its last connection closes, and every operation opens
    /// and drops its own connection.
    _keepalive: Connection,
}

impl LibsqlStorage {
    /// Open (or create) a local database file and run migrations
    pub async fn connect(path: &str) -> Result<Self> {
        info!("Connecting to libSQL database: {}", path);
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CivicpulseError::Database(format!("Failed to open database: {}", e)))?;

        let keepalive = db
            .connect()
            .map_err(|e| CivicpulseError::Database(format!("Failed to get connection: {}", e)))?;
        let storage = Self {
            db,
            _keepalive: keepalive,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Ephemeral in-memory database (tests and one-off commands)
    ///
    /// A plain `:memory:` database is per-connection, which is incompatible
    /// with the connection-per-operation design; a uniquely named
    /// shared-cache in-memory database is visible to every connection.
    pub async fn in_memory() -> Result<Self> {
        let uri = format!(
            "file:civicpulse-mem-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        );
        Self::connect(&uri).await
    }

    /// One connection per operation, with a busy timeout so concurrent
    /// writers wait instead of failing
    async fn conn(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| CivicpulseError::Database(format!("Failed to get connection: {}", e)))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;").await?;
        Ok(conn)
    }

    async fn run_migrations(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute_batch(SCHEMA).await.map_err(|e| {
            CivicpulseError::Database(format!("Failed to run migrations: {}", e))
        })?;
        debug!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for LibsqlStorage {
    async fn admit_batch(&self, district: &str, constituency: &str, limit: u32) -> Result<Batch> {
        let conn = self.conn().await?;

        // Find-and-increment, then insert on miss. If the insert loses a race
        // the partial unique index rejects it and the existing row is
        // authoritative, so we retry the increment.
        for _ in 0..3 {
            let mut rows = conn
                .query(
                    &format!(
                        "UPDATE batches SET count = count + 1
                         WHERE district = ?1 AND constituency = ?2 AND status = 'collecting'
                         RETURNING {}",
                        BATCH_COLUMNS
                    ),
                    params![district.to_string(), constituency.to_string()],
                )
                .await?;
            if let Some(row) = rows.next().await? {
                return row_to_batch(&row);
            }

            let batch = Batch::open(district, constituency, limit);
            let inserted = conn
                .execute(
                    &format!(
                        "INSERT INTO batches ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        BATCH_COLUMNS
                    ),
                    params![
                        batch.id.to_string(),
                        batch.district.clone(),
                        batch.constituency.clone(),
                        batch.count as i64,
                        batch.limit as i64,
                        batch.status.as_str(),
                        batch.created_at.to_rfc3339(),
                    ],
                )
                .await;

            match inserted {
                Ok(_) => {
                    debug!(batch_id = %batch.id, district, constituency, "opened new batch");
                    return Ok(batch);
                }
                Err(e) if e.to_string().contains("UNIQUE") => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(CivicpulseError::Database(format!(
            "Could not admit submission for ({}, {})",
            district, constituency
        )))
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            &format!(
                "INSERT INTO feedbacks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                FEEDBACK_COLUMNS
            ),
            params![
                feedback.id.to_string(),
                feedback.district.clone(),
                feedback.constituency.clone(),
                serde_json::to_string(&feedback.submitter)?,
                feedback.kind.clone(),
                feedback.text.clone(),
                feedback.rating.map(|r| r as i64),
                feedback.solution.clone(),
                feedback.batch_id.to_string(),
                feedback.created_at.to_rfc3339(),
                feedback
                    .annotation
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            ],
        )
        .await?;
        Ok(())
    }

    async fn feedback_for_batch(&self, batch_id: BatchId) -> Result<Vec<Feedback>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM feedbacks WHERE batch_id = ?1 ORDER BY rowid",
                    FEEDBACK_COLUMNS
                ),
                params![batch_id.to_string()],
            )
            .await?;

        let mut feedbacks = Vec::new();
        while let Some(row) = rows.next().await? {
            feedbacks.push(row_to_feedback(&row)?);
        }
        Ok(feedbacks)
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
        let conn = self.conn().await?;
        // Claim and merge in one transaction: a crash between the two can
        // never leave a merged-but-unannotated row (double-count on retry)
        // or an annotated-but-unmerged one (lost report).
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let claimed = tx
            .execute(
                "UPDATE feedbacks SET annotation = ?2 WHERE id = ?1 AND annotation IS NULL",
                params![id.to_string(), serde_json::to_string(annotation)?],
            )
            .await?;
        if claimed == 0 {
            tx.commit().await?;
            return Ok(None);
        }

        let issue = merge_issue_on(&tx, issue_key, category, issue_text, contributor).await?;
        tx.commit().await?;
        Ok(Some(issue))
    }

    async fn transition_batch(
        &self,
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    ) -> Result<()> {
        let conn = self.conn().await?;
        let affected = conn
            .execute(
                "UPDATE batches SET status = ?3 WHERE id = ?1 AND status = ?2",
                params![batch_id.to_string(), from.as_str(), to.as_str()],
            )
            .await?;
        if affected == 0 {
            return Err(CivicpulseError::InvalidTransition(format!(
                "{} ({} -> {})",
                batch_id, from, to
            )));
        }
        Ok(())
    }

    async fn batches_with_status(&self, status: BatchStatus) -> Result<Vec<Batch>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM batches WHERE status = ?1 ORDER BY created_at",
                    BATCH_COLUMNS
                ),
                params![status.as_str()],
            )
            .await?;

        let mut batches = Vec::new();
        while let Some(row) = rows.next().await? {
            batches.push(row_to_batch(&row)?);
        }
        Ok(batches)
    }

    async fn list_batches(&self) -> Result<Vec<Batch>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM batches ORDER BY created_at DESC", BATCH_COLUMNS),
                (),
            )
            .await?;

        let mut batches = Vec::new();
        while let Some(row) = rows.next().await? {
            batches.push(row_to_batch(&row)?);
        }
        Ok(batches)
    }

    async fn merge_global_issue(
        &self,
        issue_key: &str,
        category: &str,
        issue_text: &str,
        contributor: Contributor,
    ) -> Result<GlobalIssue> {
        let conn = self.conn().await?;
        // Immediate transaction: concurrent merges against the same key must
        // serialize, otherwise both read the same pre-increment total.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        let issue = merge_issue_on(&tx, issue_key, category, issue_text, contributor).await?;
        tx.commit().await?;
        Ok(issue)
    }

    async fn get_global_issue(&self, issue_key: &str) -> Result<Option<GlobalIssue>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM global_issues WHERE issue_key = ?1",
                    ISSUE_COLUMNS
                ),
                params![issue_key.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_issue(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_global_issues(&self) -> Result<Vec<GlobalIssue>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM global_issues
                     ORDER BY CASE priority
                         WHEN 'CRITICAL' THEN 4
                         WHEN 'HIGH' THEN 3
                         WHEN 'MEDIUM' THEN 2
                         ELSE 1
                     END DESC, total_reports DESC",
                    ISSUE_COLUMNS
                ),
                (),
            )
            .await?;

        let mut issues = Vec::new();
        while let Some(row) = rows.next().await? {
            issues.push(row_to_issue(&row)?);
        }
        Ok(issues)
    }
}

/// Per-key upsert for a global issue, run inside the caller's transaction
async fn merge_issue_on(
    conn: &Connection,
    issue_key: &str,
    category: &str,
    issue_text: &str,
    contributor: Contributor,
) -> Result<GlobalIssue> {
    let existing = {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM global_issues WHERE issue_key = ?1",
                    ISSUE_COLUMNS
                ),
                params![issue_key.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Some(row_to_issue(&row)?),
            None => None,
        }
    };

    match existing {
        Some(mut issue) => {
            issue.absorb(contributor);
            conn.execute(
                "UPDATE global_issues
                 SET total_reports = ?2, priority = ?3, batches = ?4,
                     contributors = ?5, last_updated = ?6
                 WHERE issue_key = ?1",
                params![
                    issue.issue_key.clone(),
                    issue.total_reports as i64,
                    issue.priority.as_str(),
                    serde_json::to_string(&issue.batches)?,
                    serde_json::to_string(&issue.contributors)?,
                    issue.last_updated.to_rfc3339(),
                ],
            )
            .await?;
            Ok(issue)
        }
        None => {
            let issue = GlobalIssue::first_report(issue_key, category, issue_text, contributor);
            conn.execute(
                &format!(
                    "INSERT INTO global_issues ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    ISSUE_COLUMNS
                ),
                params![
                    issue.issue_key.clone(),
                    issue.category.clone(),
                    issue.issue_text.clone(),
                    issue.total_reports as i64,
                    issue.priority.as_str(),
                    serde_json::to_string(&issue.batches)?,
                    serde_json::to_string(&issue.contributors)?,
                    issue.last_updated.to_rfc3339(),
                ],
            )
            .await?;
            Ok(issue)
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CivicpulseError::Database(format!("Invalid timestamp '{}': {}", s, e)))
}

fn row_to_batch(row: &Row) -> Result<Batch> {
    let id: String = row.get(0)?;
    let district: String = row.get(1)?;
    let constituency: String = row.get(2)?;
    let count: i64 = row.get(3)?;
    let limit: i64 = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Batch {
        id: BatchId::from_string(&id)?,
        district,
        constituency,
        count: count as u32,
        limit: limit as u32,
        status: BatchStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_feedback(row: &Row) -> Result<Feedback> {
    let id: String = row.get(0)?;
    let district: String = row.get(1)?;
    let constituency: String = row.get(2)?;
    let submitter_json: String = row.get(3)?;
    let submitter: Submitter = serde_json::from_str(&submitter_json)?;
    let kind: String = row.get(4)?;
    let text: String = row.get(5)?;
    let rating: Option<i64> = row.get(6)?;
    let solution: Option<String> = row.get(7)?;
    let batch_id: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let annotation_json: Option<String> = row.get(10)?;
    let annotation = annotation_json
        .map(|json| serde_json::from_str::<Annotation>(&json))
        .transpose()?;

    Ok(Feedback {
        id: FeedbackId::from_string(&id)?,
        district,
        constituency,
        submitter,
        kind,
        text,
        rating: rating.map(|r| r as u8),
        solution,
        batch_id: BatchId::from_string(&batch_id)?,
        created_at: parse_timestamp(&created_at)?,
        annotation,
    })
}

fn row_to_issue(row: &Row) -> Result<GlobalIssue> {
    let issue_key: String = row.get(0)?;
    let category: String = row.get(1)?;
    let issue_text: String = row.get(2)?;
    let total_reports: i64 = row.get(3)?;
    let priority: String = row.get(4)?;
    let batches_json: String = row.get(5)?;
    let contributors_json: String = row.get(6)?;
    let last_updated: String = row.get(7)?;

    Ok(GlobalIssue {
        issue_key,
        category,
        issue_text,
        total_reports: total_reports as u64,
        priority: PriorityTier::from_str(&priority)?,
        batches: serde_json::from_str(&batches_json)?,
        contributors: serde_json::from_str(&contributors_json)?,
        last_updated: parse_timestamp(&last_updated)?,
    })
}

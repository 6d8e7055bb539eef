//! Postgres-backed attempt ledger.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fga_model::{
    AddAttempt, AttemptId, AttemptStatus, BacklogSummary, GroupId, NewRequest,
    PictureId, RequestId, SubmitOutcome, SubmittedRequest, UserId,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AttemptLedger;
use crate::selector::day_start;
use crate::{LedgerError, MIGRATOR, Result};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl fmt::Debug for PostgresLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresLedger")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    user_id: String,
    picture_id: String,
    group_id: String,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for SubmittedRequest {
    type Error = LedgerError;

    fn try_from(row: RequestRow) -> Result<Self> {
        let corrupt = |e: fga_model::ModelError| {
            LedgerError::Corrupt(format!("request {}: {e}", row.id))
        };
        Ok(SubmittedRequest {
            id: RequestId(row.id),
            user_id: UserId::parse(&row.user_id).map_err(corrupt)?,
            picture_id: PictureId::parse(&row.picture_id).map_err(corrupt)?,
            group_id: GroupId::parse(&row.group_id).map_err(corrupt)?,
            submitted_at: row.submitted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: Uuid,
    request_id: Uuid,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    final_status: Option<String>,
}

impl TryFrom<AttemptRow> for AddAttempt {
    type Error = LedgerError;

    fn try_from(row: AttemptRow) -> Result<Self> {
        let final_status = row
            .final_status
            .as_deref()
            .map(AttemptStatus::parse)
            .transpose()
            .map_err(|e| {
                LedgerError::Corrupt(format!("attempt {}: {e}", row.id))
            })?;
        Ok(AddAttempt {
            id: AttemptId(row.id),
            request_id: RequestId(row.request_id),
            started_at: row.started_at,
            completed_at: row.completed_at,
            final_status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    total: i64,
    terminal: i64,
    eligible: i64,
    attempted_today: i64,
    in_flight: i64,
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

/// SQLSTATE of a database error, if any.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.to_string()),
        _ => None,
    }
}

impl PostgresLedger {
    /// Connect, verify the database answers, and return the ledger.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(|e| {
                LedgerError::Unavailable(format!("failed to connect to Postgres: {e}"))
            })?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                LedgerError::Unavailable(format!(
                    "attempt ledger failed Postgres health check: {e}"
                ))
            })?;
        info!("attempt ledger connected to Postgres");
        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("ledger migrations applied");
        Ok(())
    }

    async fn find_by_triple(&self, request: &NewRequest) -> Result<SubmittedRequest> {
        let row: RequestRow = sqlx::query_as(
            r#"
            SELECT id, user_id, picture_id, group_id, submitted_at
            FROM submitted_requests
            WHERE user_id = $1 AND picture_id = $2 AND group_id = $3
            "#,
        )
        .bind(request.user_id.as_str())
        .bind(request.picture_id.as_str())
        .bind(request.group_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}

#[async_trait]
impl AttemptLedger for PostgresLedger {
    async fn submit(
        &self,
        request: NewRequest,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let id = RequestId::new();
        let inserted: Option<RequestRow> = sqlx::query_as(
            r#"
            INSERT INTO submitted_requests
                (id, user_id, picture_id, group_id, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT uq_submitted_requests_triple DO NOTHING
            RETURNING id, user_id, picture_id, group_id, submitted_at
            "#,
        )
        .bind(id.to_uuid())
        .bind(request.user_id.as_str())
        .bind(request.picture_id.as_str())
        .bind(request.group_id.as_str())
        .bind(submitted_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                debug!(request_id = %id, "request submitted");
                Ok(SubmitOutcome {
                    request: row.try_into()?,
                    created: true,
                })
            }
            None => Ok(SubmitOutcome {
                request: self.find_by_triple(&request).await?,
                created: false,
            }),
        }
    }

    async fn eligible_requests(
        &self,
        today: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<SubmittedRequest>> {
        let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows: Vec<RequestRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.user_id, r.picture_id, r.group_id, r.submitted_at
            FROM submitted_requests r
            LEFT JOIN LATERAL (
                SELECT a.started_at, a.completed_at
                FROM add_attempts a
                WHERE a.request_id = r.id
                ORDER BY a.started_at DESC, a.id DESC
                LIMIT 1
            ) latest ON TRUE
            WHERE NOT EXISTS (
                    SELECT 1 FROM add_attempts p
                    WHERE p.request_id = r.id
                      AND p.final_status LIKE 'permstatus\_%'
                )
              AND (
                    latest.started_at IS NULL
                    OR (latest.completed_at IS NOT NULL
                        AND latest.started_at < $1)
                )
            ORDER BY r.submitted_at ASC, r.id ASC
            LIMIT $2
            "#,
        )
        .bind(day_start(today))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubmittedRequest::try_from).collect()
    }

    async fn open_attempt(
        &self,
        request_id: RequestId,
        started_at: DateTime<Utc>,
    ) -> Result<AddAttempt> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent openers of the same request.
        let exists: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM submitted_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(LedgerError::RequestNotFound(request_id));
        }

        let permanent: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM add_attempts
                WHERE request_id = $1 AND final_status LIKE 'permstatus\_%'
            )
            "#,
        )
        .bind(request_id.to_uuid())
        .fetch_one(&mut *tx)
        .await?;
        if permanent {
            return Err(LedgerError::Conflict {
                request_id,
                reason: "a permanent outcome is already recorded".into(),
            });
        }

        let attempt = AddAttempt::open(request_id, started_at);
        let inserted = sqlx::query(
            r#"
            INSERT INTO add_attempts (id, request_id, started_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(attempt.id.to_uuid())
        .bind(request_id.to_uuid())
        .bind(started_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err) => {
                return Err(match sqlstate(&err).as_deref() {
                    Some(UNIQUE_VIOLATION) => LedgerError::Conflict {
                        request_id,
                        reason: "an attempt is already open".into(),
                    },
                    Some(FOREIGN_KEY_VIOLATION) => {
                        LedgerError::RequestNotFound(request_id)
                    }
                    _ => LedgerError::Database(err),
                });
            }
        }

        tx.commit().await?;
        Ok(attempt)
    }

    async fn close_attempt(
        &self,
        attempt_id: AttemptId,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<AddAttempt> {
        let row: Option<AttemptRow> = sqlx::query_as(
            r#"
            UPDATE add_attempts
            SET completed_at = $2, final_status = $3
            WHERE id = $1 AND completed_at IS NULL
            RETURNING id, request_id, started_at, completed_at, final_status
            "#,
        )
        .bind(attempt_id.to_uuid())
        .bind(completed_at)
        .bind(status.code().into_owned())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(LedgerError::AttemptNotOpen(attempt_id))?
            .try_into()
    }

    async fn attempts_for(&self, request_id: RequestId) -> Result<Vec<AddAttempt>> {
        let rows: Vec<AttemptRow> = sqlx::query_as(
            r#"
            SELECT id, request_id, started_at, completed_at, final_status
            FROM add_attempts
            WHERE request_id = $1
            ORDER BY started_at ASC, id ASC
            "#,
        )
        .bind(request_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AddAttempt::try_from).collect()
    }

    async fn close_abandoned(
        &self,
        started_before: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        status: &AttemptStatus,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE add_attempts
            SET completed_at = $2, final_status = $3
            WHERE completed_at IS NULL AND started_at < $1
            "#,
        )
        .bind(started_before)
        .bind(completed_at)
        .bind(status.code().into_owned())
        .execute(&self.pool)
        .await?;

        let closed = result.rows_affected();
        if closed > 0 {
            warn!(closed, %started_before, "closed abandoned attempts");
        }
        Ok(closed)
    }

    async fn backlog_summary(&self, today: NaiveDate) -> Result<BacklogSummary> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            WITH classified AS (
                SELECT
                    EXISTS (
                        SELECT 1 FROM add_attempts p
                        WHERE p.request_id = r.id
                          AND p.final_status LIKE 'permstatus\_%'
                    ) AS terminal,
                    latest.started_at,
                    latest.completed_at
                FROM submitted_requests r
                LEFT JOIN LATERAL (
                    SELECT a.started_at, a.completed_at
                    FROM add_attempts a
                    WHERE a.request_id = r.id
                    ORDER BY a.started_at DESC, a.id DESC
                    LIMIT 1
                ) latest ON TRUE
            )
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE terminal) AS terminal,
                COUNT(*) FILTER (
                    WHERE NOT terminal
                      AND (started_at IS NULL
                           OR (completed_at IS NOT NULL AND started_at < $1))
                ) AS eligible,
                COUNT(*) FILTER (
                    WHERE NOT terminal
                      AND completed_at IS NOT NULL
                      AND started_at >= $1
                ) AS attempted_today,
                COUNT(*) FILTER (
                    WHERE NOT terminal
                      AND started_at IS NOT NULL
                      AND completed_at IS NULL
                ) AS in_flight
            FROM classified
            "#,
        )
        .bind(day_start(today))
        .fetch_one(&self.pool)
        .await?;

        Ok(BacklogSummary {
            total: count(row.total),
            terminal: count(row.terminal),
            eligible: count(row.eligible),
            attempted_today: count(row.attempted_today),
            in_flight: count(row.in_flight),
        })
    }
}

//! Participant repository implementation
//!
//! The capacity decision and the quota bump run inside transactions
//! that lock the owning event row, so two concurrent joins (or a join
//! racing a promotion) cannot both pass the same capacity check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::database::ParticipantStore;
use crate::models::{CreateParticipantRequest, Participant, ParticipantStatus};
use crate::utils::errors::{MusterError, Result};

const PARTICIPANT_COLUMNS: &str =
    "id, event_id, user_id, username, status, joined_at, created_at, updated_at";

/// Database row for a participant; status stays textual here.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ParticipantRow {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub username: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = MusterError;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        let status = ParticipantStatus::parse(&row.status).ok_or_else(|| {
            MusterError::Database(sqlx::Error::Decode(
                format!("invalid participant status: {}", row.status).into(),
            ))
        })?;
        Ok(Participant {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            username: row.username,
            status,
            joined_at: row.joined_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn confirmed_count(
        tx: &mut Transaction<'_, Postgres>,
        event_id: i64,
    ) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participants WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count.0)
    }
}

#[async_trait]
impl ParticipantStore for PgParticipantRepository {
    async fn create(&self, request: CreateParticipantRequest) -> Result<Participant> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            r#"
            INSERT INTO participants (event_id, user_id, username, status, joined_at,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(request.event_id)
        .bind(&request.user_id)
        .bind(&request.username)
        .bind(request.status.as_str())
        .bind(request.joined_at)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => row.try_into(),
            Err(err) => Err(self.map_unique_violation(err, request.event_id, &request.user_id).await),
        }
    }

    async fn register(
        &self,
        event_id: i64,
        user_id: &str,
        username: &str,
        force_waitlist: bool,
    ) -> Result<Participant> {
        let mut tx = self.pool.begin().await?;

        let event: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT max_slots FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let max_slots = match event {
            Some((max_slots,)) => max_slots,
            None => return Err(MusterError::EventNotFound { event_id }),
        };

        let existing = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = $1 AND user_id = $2"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = existing {
            let existing: Participant = existing.try_into()?;
            return Err(MusterError::ParticipantExists {
                status: existing.status,
            });
        }

        let confirmed = Self::confirmed_count(&mut tx, event_id).await?;
        let full = max_slots.map(|max| confirmed >= max as i64).unwrap_or(false);
        let status = if force_waitlist || full {
            ParticipantStatus::Waitlist
        } else {
            ParticipantStatus::Confirmed
        };

        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            r#"
            INSERT INTO participants (event_id, user_id, username, status, joined_at,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now(), now())
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(username)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn confirm_with_quota_bump(&self, participant_id: i64) -> Result<(Participant, bool)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1 FOR UPDATE"
        ))
        .bind(participant_id)
        .fetch_optional(&mut *tx)
        .await?;
        let participant: Participant = match row {
            Some(row) => row.try_into()?,
            None => return Err(MusterError::ParticipantNotFound),
        };

        let event: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT max_slots FROM events WHERE id = $1 FOR UPDATE")
                .bind(participant.event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let max_slots = match event {
            Some((max_slots,)) => max_slots,
            None => {
                return Err(MusterError::EventNotFound {
                    event_id: participant.event_id,
                })
            }
        };

        let confirmed = Self::confirmed_count(&mut tx, participant.event_id).await?;
        let full = max_slots.map(|max| confirmed >= max as i64).unwrap_or(false);
        if full {
            sqlx::query("UPDATE events SET max_slots = $2, updated_at = now() WHERE id = $1")
                .bind(participant.event_id)
                .bind(confirmed as i32 + 1)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            r#"
            UPDATE participants
            SET status = 'confirmed', updated_at = now()
            WHERE id = $1
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(participant_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((row.try_into()?, full))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_event(&self, event_id: i64) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = $1 \
             ORDER BY joined_at ASC, id ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_event_and_user(
        &self,
        event_id: i64,
        user_id: &str,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = $1 AND user_id = $2"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = $1 AND status = $2 \
             ORDER BY joined_at ASC, id ASC"
        ))
        .bind(event_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, participant: &Participant) -> Result<Participant> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            r#"
            UPDATE participants
            SET username = $2, status = $3, updated_at = now()
            WHERE id = $1
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(participant.id)
        .bind(&participant.username)
        .bind(participant.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participants WHERE event_id = $1 AND status = $2",
        )
        .bind(event_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}

impl PgParticipantRepository {
    /// A lost race on the `(event_id, user_id)` unique index is still a
    /// duplicate registration; report it with the surviving row's status.
    async fn map_unique_violation(
        &self,
        err: sqlx::Error,
        event_id: i64,
        user_id: &str,
    ) -> MusterError {
        let is_unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if !is_unique {
            return MusterError::Database(err);
        }
        match self.find_by_event_and_user(event_id, user_id).await {
            Ok(Some(existing)) => MusterError::ParticipantExists {
                status: existing.status,
            },
            _ => MusterError::Database(err),
        }
    }
}

//! Event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use crate::database::EventStore;
use crate::models::{
    CreateEventRequest, Event, FinalizeState, PromptState, REVIEW_WINDOW_HOURS,
};
use crate::utils::errors::Result;

const EVENT_COLUMNS: &str = "id, message_id, channel_id, private_channel_id, creator_id, title, \
     description, max_slots, scheduled_at, waitlist_auto, validation_prompt_sent_at, \
     finalized_at, created_at, updated_at";

/// Database row for an event; sentinel timestamps stay nullable here.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct EventRow {
    pub id: i64,
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
    pub private_channel_id: Option<String>,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub max_slots: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub waitlist_auto: bool,
    pub validation_prompt_sent_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            message_id: row.message_id,
            channel_id: row.channel_id,
            private_channel_id: row.private_channel_id,
            creator_id: row.creator_id,
            title: row.title,
            description: row.description,
            max_slots: row.max_slots,
            scheduled_at: row.scheduled_at,
            waitlist_auto: row.waitlist_auto,
            validation_prompt: match row.validation_prompt_sent_at {
                Some(at) => PromptState::Sent(at),
                None => PromptState::NotSent,
            },
            finalization: match row.finalized_at {
                Some(at) => FinalizeState::Finalized(at),
                None => FinalizeState::Open,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn sentinel(prompt: PromptState) -> Option<DateTime<Utc>> {
    match prompt {
        PromptState::Sent(at) => Some(at),
        PromptState::NotSent => None,
    }
}

fn finalized_sentinel(state: FinalizeState) -> Option<DateTime<Utc>> {
    match state {
        FinalizeState::Finalized(at) => Some(at),
        FinalizeState::Open => None,
    }
}

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventRepository {
    async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (message_id, channel_id, private_channel_id, creator_id, title,
                                description, max_slots, scheduled_at, waitlist_auto,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.message_id)
        .bind(request.channel_id)
        .bind(request.private_channel_id)
        .bind(request.creator_id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.max_slots)
        .bind(request.scheduled_at)
        .bind(request.waitlist_auto)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE message_id = $1"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_private_channel_id(&self, channel_id: &str) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE private_channel_id = $1"
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_creator(&self, creator_id: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE creator_id = $1 ORDER BY created_at ASC"
        ))
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET message_id = $2,
                channel_id = $3,
                private_channel_id = $4,
                title = $5,
                description = $6,
                max_slots = $7,
                scheduled_at = $8,
                waitlist_auto = $9,
                validation_prompt_sent_at = $10,
                finalized_at = $11,
                updated_at = now()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.message_id)
        .bind(&event.channel_id)
        .bind(&event.private_channel_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.max_slots)
        .bind(event.scheduled_at)
        .bind(event.waitlist_auto)
        .bind(sentinel(event.validation_prompt))
        .bind(finalized_sentinel(event.finalization))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_needing_validation_prompt(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let deadline = now + Duration::hours(REVIEW_WINDOW_HOURS);
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE scheduled_at IS NOT NULL
              AND scheduled_at > $1
              AND scheduled_at <= $2
              AND validation_prompt_sent_at IS NULL
              AND finalized_at IS NULL
            ORDER BY scheduled_at ASC
            "#
        ))
        .bind(now)
        .bind(deadline)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_started_unfinalized(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE scheduled_at IS NOT NULL
              AND scheduled_at <= $1
              AND finalized_at IS NULL
            ORDER BY scheduled_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_validation_prompt_sent(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        // Conditional single-statement update: only one of any number of
        // concurrent callers observes an affected row.
        let result = sqlx::query(
            r#"
            UPDATE events
            SET validation_prompt_sent_at = $2, updated_at = now()
            WHERE id = $1 AND validation_prompt_sent_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_finalized(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET finalized_at = $2, updated_at = now()
            WHERE id = $1 AND finalized_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

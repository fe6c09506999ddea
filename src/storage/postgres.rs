use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::traits::{ActivityLog, EventSink, MemoryStore};
use crate::lifecycle::AgentActivity;
use crate::types::{AgentId, AgentMemory, AlertRecord, Event};

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/V001__initial_schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PostgresStorage {
    async fn get_memory(&self, agent_id: AgentId) -> Result<Option<AgentMemory>> {
        let row = sqlx::query(
            r#"
            SELECT memory
            FROM agent_memories
            WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(serde_json::from_value(r.get("memory"))?)),
            None => Ok(None),
        }
    }

    async fn put_memory(&self, agent_id: AgentId, memory: &AgentMemory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_memories (agent_id, memory, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (agent_id)
            DO UPDATE SET memory = EXCLUDED.memory, updated_at = NOW()
            "#,
        )
        .bind(agent_id)
        .bind(serde_json::to_value(memory)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for PostgresStorage {
    async fn emit(&self, agent_id: AgentId, payload: &[AlertRecord]) -> Result<Event> {
        let event = Event::from_alerts(agent_id, payload)?;

        sqlx::query(
            r#"
            INSERT INTO events (id, agent_id, payload, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.id)
        .bind(event.agent_id)
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }
}

#[async_trait]
impl ActivityLog for PostgresStorage {
    async fn record_error(
        &self,
        agent_id: AgentId,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_errors (agent_id, message, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(agent_id)
        .bind(message)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn activity(&self, agent_id: AgentId) -> Result<AgentActivity> {
        let last_event_at: Option<DateTime<Utc>> = sqlx::query(
            r#"
            SELECT MAX(created_at) AS last_event_at
            FROM events
            WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?
        .get("last_event_at");

        let last_error = sqlx::query(
            r#"
            SELECT message, created_at
            FROM agent_errors
            WHERE agent_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(AgentActivity {
            last_event_at,
            last_error_at: last_error.as_ref().map(|r| r.get("created_at")),
            last_error: last_error.as_ref().map(|r| r.get("message")),
        })
    }

    async fn events(&self, agent_id: AgentId, limit: usize) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, payload, created_at
            FROM events
            WHERE agent_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Event {
                id: r.get("id"),
                agent_id: r.get("agent_id"),
                payload: r.get("payload"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

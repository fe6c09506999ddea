use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::interval::format_schedule;
use crate::agent::AgentError;
use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::storage::{ActivityLog, MemoryStore};
use crate::types::{AgentId, AgentMemory, Event, InboundSignal};

const DEFAULT_EVENT_LIMIT: usize = 20;

#[derive(Serialize)]
pub struct AgentStatusResponse {
    pub id: String,
    pub location: Option<String>,
    pub watch_alerts: bool,
    pub have_alerts: bool,
    pub state: String,
    pub current_interval_secs: u64,
    pub schedule: String,
    pub working: bool,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .dispatcher
            .agent_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect(),
    )
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<AgentId>,
) -> Result<Json<AgentStatusResponse>, ApiError> {
    let config = state
        .dispatcher
        .config(&agent_id)
        .ok_or_else(|| ApiError::NotFound(format!("Agent {} not found", agent_id)))?;

    let mut memory = state
        .storage
        .get_memory(agent_id)
        .await?
        .unwrap_or_else(|| AgentMemory::new(config));
    memory.reconcile(config);
    let activity = state.storage.activity(agent_id).await?;

    Ok(Json(AgentStatusResponse {
        id: agent_id.to_string(),
        location: memory.location.clone(),
        watch_alerts: memory.watch_alerts,
        have_alerts: memory.have_alerts,
        state: memory.state().as_str().to_string(),
        current_interval_secs: memory.current_interval.as_secs(),
        schedule: format_schedule(memory.current_interval),
        working: activity.working(config.expected_update_period, Utc::now()),
        last_event_at: activity.last_event_at,
        last_error: activity.last_error,
    }))
}

pub async fn get_agent_events(
    State(state): State<AppState>,
    Path(agent_id): Path<AgentId>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    if state.dispatcher.config(&agent_id).is_none() {
        return Err(ApiError::NotFound(format!("Agent {} not found", agent_id)));
    }

    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Ok(Json(state.storage.events(agent_id, limit).await?))
}

/// Accepts an upstream event payload carrying `location` and/or `conditions`.
pub async fn post_signal(
    State(state): State<AppState>,
    Path(agent_id): Path<AgentId>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let signal = InboundSignal::from_payload(&payload);
    if signal.is_empty() {
        return Err(ApiError::BadRequest(AgentError::InvalidSignal.to_string()));
    }

    if !state.dispatcher.dispatch(&agent_id, signal).await? {
        return Err(ApiError::NotFound(format!("Agent {} not found", agent_id)));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "queued" })),
    ))
}

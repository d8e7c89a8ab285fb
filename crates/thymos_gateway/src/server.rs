use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use thymos_bonds::{establish, EstablishOutcome, EstablishRequest};
use thymos_core::behavior::{BehaviorProfile, BehaviorType};
use thymos_core::bond::DecaySettings;
use thymos_core::pad::PadMood;
use thymos_core::plutchik::PlutchikState;
use thymos_core::proactive::ProactiveConfig;
use thymos_core::ThymosConfig;
use thymos_engine::phases::reset_phase;
use thymos_engine::{Engine, ProcessOutcome};
use thymos_store::SqliteStore;

use crate::error::ApiError;
use crate::types::{
    BehaviorView, BondView, CreateBehavior, CreateBond, DyadView, EmotionView, HistoryPage,
    HistoryQuery, IngestMessage, ProactiveConfigQuery, ProactiveConfigUpdate,
};

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<Engine>,
    /// Decay thresholds used when computing risk for read endpoints.
    pub decay: DecaySettings,
}

/// The gateway HTTP server.
///
/// Owns nothing but the shared state and the bind address; `start` spawns
/// the serve loop on a background task and returns its handle.
pub struct GatewayServer {
    state: AppState,
    addr: String,
}

impl GatewayServer {
    pub fn new(store: Arc<SqliteStore>, engine: Arc<Engine>, config: &ThymosConfig) -> Self {
        Self {
            state: AppState {
                store,
                engine,
                decay: config.bonds,
            },
            addr: config.gateway.addr.clone(),
        }
    }

    /// Start the server. This spawns a background task and returns the join handle.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let app = build_router(self.state);
        let addr = self.addr;

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!("Gateway failed to bind {}: {}", addr, e);
                    return;
                }
            };
            tracing::info!("Gateway listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Gateway server error: {}", e);
            }
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/agents/:agent_id/messages", post(ingest_message))
        .route("/v1/agents/:agent_id/emotions", get(get_emotions))
        .route(
            "/v1/agents/:agent_id/behaviors",
            get(list_behaviors).post(create_behavior),
        )
        .route(
            "/v1/agents/:agent_id/behaviors/:behavior_type/history",
            get(behavior_history),
        )
        .route("/v1/bonds", post(create_bond))
        .route("/v1/bonds/:id", get(get_bond))
        .route("/v1/bonds/:id/interaction", post(record_bond_interaction))
        .route("/v1/users/:user_id/bonds", get(list_user_bonds))
        .route(
            "/v1/users/:user_id/proactive-config",
            get(get_proactive_config).put(put_proactive_config),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /v1/agents/{agent_id}/messages — run one user message through the
/// full pipeline and return the routing outcome.
async fn ingest_message(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<IngestMessage>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }
    if body.body.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "message body must not be empty".to_string(),
        ));
    }

    let outcome = state
        .engine
        .process_message(&agent_id, &body.user_id, &body.body)
        .await?;
    Ok(Json(outcome))
}

/// GET /v1/agents/{agent_id}/emotions — current state, mood, dyads, stability.
/// Agents with no stored state read as neutral.
async fn get_emotions(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<EmotionView>, ApiError> {
    let (plutchik, mood) = match state.store.load_emotional_state(&agent_id).await? {
        Some(pair) => pair,
        None => {
            let neutral = PlutchikState::neutral();
            let mood = PadMood::from_plutchik(&neutral);
            (neutral, mood)
        }
    };

    let dyads = plutchik
        .active_dyads()
        .into_iter()
        .map(|(dyad, level)| DyadView { dyad, level })
        .collect();

    Ok(Json(EmotionView {
        agent_id,
        stability: plutchik.stability(),
        description: plutchik.describe(),
        mood,
        dyads,
        state: plutchik,
    }))
}

async fn list_behaviors(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Vec<BehaviorView>>, ApiError> {
    let profiles = state.store.profiles_for_agent(&agent_id).await?;
    Ok(Json(profiles.into_iter().map(BehaviorView::from).collect()))
}

/// POST /v1/agents/{agent_id}/behaviors — create a profile, or reactivate a
/// deactivated one from phase 1. An already-active duplicate is a conflict.
async fn create_behavior(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<CreateBehavior>,
) -> Result<Json<BehaviorView>, ApiError> {
    let now = Utc::now();

    match state.store.get_profile(&agent_id, body.behavior_type).await? {
        Some(existing) if existing.is_active => Err(ApiError::Conflict(format!(
            "behavior {} is already active for agent {}",
            body.behavior_type.as_str(),
            agent_id
        ))),
        Some(mut profile) => {
            // Reactivation starts the ladder over.
            profile.is_active = true;
            profile.consent_granted = body.consent_granted;
            reset_phase(&mut profile, now);
            state.store.save_profile(&profile).await?;
            Ok(Json(BehaviorView::from(profile)))
        }
        None => {
            let mut profile = BehaviorProfile::new(agent_id.as_str(), body.behavior_type);
            profile.consent_granted = body.consent_granted;
            state.store.save_profile(&profile).await?;
            Ok(Json(BehaviorView::from(profile)))
        }
    }
}

/// GET /v1/agents/{agent_id}/behaviors/{behavior_type}/history — paginated
/// trigger-log slice, newest first.
async fn behavior_history(
    State(state): State<AppState>,
    Path((agent_id, behavior_type)): Path<(String, String)>,
    Query(page): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let behavior_type = BehaviorType::parse_str(&behavior_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown behavior type: {behavior_type}")))?;

    let limit = page.limit.unwrap_or(50).clamp(1, 500);
    let offset = page.offset.unwrap_or(0).max(0);

    let events = state
        .store
        .behavior_history(&agent_id, behavior_type, limit, offset)
        .await?;

    Ok(Json(HistoryPage {
        behavior_type,
        limit,
        offset,
        events,
    }))
}

/// POST /v1/bonds — tier eligibility, slot claiming, queueing.
///
/// 201 with the bond when a slot is claimed, 400 when requirements are not
/// met, 409 when the pair is already bonded, 409 with the queue entry when
/// the tier is full.
async fn create_bond(
    State(state): State<AppState>,
    Json(body): Json<CreateBond>,
) -> Result<Response, ApiError> {
    let request = EstablishRequest {
        user_id: body.user_id,
        agent_id: body.agent_id,
        tier: body.tier,
        metrics: body.metrics,
    };
    let now = Utc::now();

    match establish(&state.store, &request, now).await? {
        EstablishOutcome::Created(bond) => {
            let view = BondView::compute(bond, &state.decay, now);
            Ok((StatusCode::CREATED, Json(view)).into_response())
        }
        EstablishOutcome::AlreadyBonded(bond) => Err(ApiError::Conflict(format!(
            "a {} bond already exists for this pair ({})",
            bond.tier.as_str(),
            bond.id
        ))),
        EstablishOutcome::Queued(entry) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": format!("{} tier is full for this agent", entry.tier.as_str()),
                "queue_entry": entry,
            })),
        )
            .into_response()),
        EstablishOutcome::Ineligible(reasons) => Err(ApiError::BadRequest(reasons.join("; "))),
    }
}

async fn get_bond(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BondView>, ApiError> {
    let bond = state
        .store
        .get_bond(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("bond {} not found", id)))?;

    Ok(Json(BondView::compute(bond, &state.decay, Utc::now())))
}

async fn list_user_bonds(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BondView>>, ApiError> {
    let now = Utc::now();
    let bonds = state.store.bonds_for_user(&user_id).await?;
    Ok(Json(
        bonds
            .into_iter()
            .map(|b| BondView::compute(b, &state.decay, now))
            .collect(),
    ))
}

/// POST /v1/bonds/{id}/interaction — record activity, resetting the decay
/// ladder and bumping the interaction count.
async fn record_bond_interaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BondView>, ApiError> {
    let mut bond = state
        .store
        .get_bond(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("bond {} not found", id)))?;

    let now = Utc::now();
    bond.record_interaction(now);
    state.store.update_bond(&bond).await?;

    Ok(Json(BondView::compute(bond, &state.decay, now)))
}

/// GET /v1/users/{user_id}/proactive-config?agent_id=... — stored config or
/// the defaults when the pair has never been configured.
async fn get_proactive_config(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ProactiveConfigQuery>,
) -> Result<Json<ProactiveConfig>, ApiError> {
    let agent_id = query
        .agent_id
        .ok_or_else(|| ApiError::BadRequest("agent_id query parameter is required".to_string()))?;

    let config = state
        .store
        .get_proactive_config(&user_id, &agent_id)
        .await?
        .unwrap_or_else(|| ProactiveConfig::defaults(user_id.as_str(), agent_id.as_str()));

    Ok(Json(config))
}

/// PUT /v1/users/{user_id}/proactive-config — replace the row after
/// validating the quiet window and weekday list.
async fn put_proactive_config(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<ProactiveConfigUpdate>,
) -> Result<Json<ProactiveConfig>, ApiError> {
    let config = body.into_config(&user_id, Utc::now());
    config
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.store.upsert_proactive_config(&config).await?;
    Ok(Json(config))
}

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::search::extractor::{extract, ExtractedFilters};
use crate::search::query::SearchQuery;
use crate::search::results::{view, Candidate, ResultFilter, SortOrder};
use crate::search::session::{FilterOutcome, PromptOutcome, SearchMode, SearchSession};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: SearchMode,
}

#[derive(Debug, Deserialize)]
pub struct FilterValueRequest {
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    pub sort: Option<SortOrder>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub role: Option<String>,
    pub company_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub total: usize,
    pub candidates: Vec<Candidate>,
}

/// POST /api/v1/search/extract
pub async fn handle_extract(Json(req): Json<PromptRequest>) -> Json<ExtractedFilters> {
    let extracted = extract(&req.prompt);
    if extracted.is_empty() {
        debug!("Prompt yielded no filters");
    }
    Json(extracted)
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SearchSession>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(session))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchSession>, AppError> {
    Ok(Json(state.sessions.get(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_remove_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchSession>, AppError> {
    Ok(Json(state.sessions.reset(id).await?))
}

/// PUT /api/v1/sessions/:id/mode
pub async fn handle_set_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<SearchSession>, AppError> {
    Ok(Json(state.sessions.set_mode(id, req.mode).await?))
}

/// POST /api/v1/sessions/:id/prompt
pub async fn handle_apply_prompt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptOutcome>, AppError> {
    Ok(Json(state.sessions.apply_prompt(id, &req.prompt).await?))
}

/// PUT /api/v1/sessions/:id/filters/:key
pub async fn handle_update_filter(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<FilterValueRequest>,
) -> Result<Json<FilterOutcome>, AppError> {
    if key.trim().is_empty() {
        return Err(AppError::Validation("Filter key must not be blank".to_string()));
    }
    Ok(Json(state.sessions.apply_filter(id, &key, req.value).await?))
}

/// POST /api/v1/sessions/:id/search
/// A failed search clears the stored results before the error is returned.
/// Results are dropped with 409 if the session was reset or edited while the
/// backend call was in flight.
pub async fn handle_search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ResultsResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let query = SearchQuery::for_session(&session)?;
    if session.mode == SearchMode::Manual && session.filters.is_empty() {
        warn!(session_id = %id, "Manual search submitted with no filters");
    }
    let bearer = bearer_token(&headers);

    match state.candidates.search(&query, bearer).await {
        Ok(candidates) => {
            info!(
                session_id = %id,
                mode = ?session.mode,
                filters = session.filters.len(),
                total = candidates.len(),
                "Search completed"
            );
            let stored = state
                .sessions
                .store_results(id, session.revision, candidates)
                .await?
                .ok_or_else(|| {
                    warn!(session_id = %id, "Session changed during search, results discarded");
                    AppError::Conflict(
                        "Search session changed while the search was running".to_string(),
                    )
                })?;
            Ok(Json(ResultsResponse {
                total: stored.results.len(),
                candidates: stored.results,
            }))
        }
        Err(e) => {
            warn!(session_id = %id, "Search failed, clearing results");
            state
                .sessions
                .store_results(id, session.revision, Vec::new())
                .await?;
            Err(e.into())
        }
    }
}

/// GET /api/v1/sessions/:id/results
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ResultsQuery>,
) -> Result<Json<ResultsResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let filter = ResultFilter {
        location: params.location,
        experience: params.experience,
        role: params.role,
        company_type: params.company_type,
    };
    let candidates = view(&session.results, &filter, params.sort.unwrap_or_default());
    Ok(Json(ResultsResponse {
        total: candidates.len(),
        candidates,
    }))
}

/// GET /api/v1/sessions/:id/results/:index
/// `index` is the position in the stored (backend-ordered) result list.
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Candidate>, AppError> {
    let session = state.sessions.get(id).await?;
    session
        .results
        .into_iter()
        .nth(index)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No candidate at position {index}")))
}

/// The auth scheme is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim_start())
}

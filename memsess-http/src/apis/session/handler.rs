use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use memsess_core::{AttributeValue, Principal};
use tower_cookies::Cookies;
use tracing::debug;

use super::types::{AttributeView, HealthResponse, SessionView};
use crate::{ApiJson, ErrorResponse, ServerState};

pub async fn handle_health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.session_manager().session_count().await,
    })
}

/// Bind the caller's session, creating one if the request carried none
pub async fn handle_get_session(
    State(state): State<ServerState>,
    cookies: Cookies,
) -> Result<Json<SessionView>, ErrorResponse> {
    let session = state.binder.bind_for_request(&cookies).await?;
    Ok(Json(SessionView::from_session(&session).await))
}

pub async fn handle_get_attribute(
    State(state): State<ServerState>,
    cookies: Cookies,
    Path(key): Path<String>,
) -> Result<Json<AttributeView>, ErrorResponse> {
    let session = state.binder.bind_for_request(&cookies).await?;
    match session.get(&key).await {
        Some(value) => Ok(Json(AttributeView { key, value })),
        None => Err(ErrorResponse::not_found(
            format!("Attribute '{}' is not set", key),
            "attribute_not_found",
        )),
    }
}

pub async fn handle_put_attribute(
    State(state): State<ServerState>,
    cookies: Cookies,
    Path(key): Path<String>,
    ApiJson(value): ApiJson<AttributeValue>,
) -> Result<Json<AttributeView>, ErrorResponse> {
    let session = state.binder.bind_for_request(&cookies).await?;
    session.set(key.clone(), value.clone()).await;
    Ok(Json(AttributeView { key, value }))
}

pub async fn handle_delete_attribute(
    State(state): State<ServerState>,
    cookies: Cookies,
    Path(key): Path<String>,
) -> Result<Json<AttributeView>, ErrorResponse> {
    let session = state.binder.bind_for_request(&cookies).await?;
    match session.remove(&key).await {
        Some(value) => Ok(Json(AttributeView { key, value })),
        None => Err(ErrorResponse::not_found(
            format!("Attribute '{}' is not set", key),
            "attribute_not_found",
        )),
    }
}

pub async fn handle_login(
    State(state): State<ServerState>,
    cookies: Cookies,
    ApiJson(principal): ApiJson<Principal>,
) -> Result<Json<SessionView>, ErrorResponse> {
    if principal.username.trim().is_empty() {
        return Err(ErrorResponse::invalid_request("username must not be empty".to_string()));
    }
    let session = state.binder.bind_for_login(principal, &cookies).await?;
    Ok(Json(SessionView::from_session(&session).await))
}

/// Logging out without a session is not an error
pub async fn handle_logout(State(state): State<ServerState>, cookies: Cookies) -> StatusCode {
    if !state.binder.unbind(&cookies).await {
        debug!("Logout without a session cookie");
    }
    StatusCode::NO_CONTENT
}

//! HTTP shell: axum routes that translate requests into [`GameService`] calls.
//!
//! Every game route answers with the [`Reply`] envelope. Non-fatal game failures still answer
//! 200 so the browser client can show the message; storage failures answer 500 and malformed
//! requests 400. The Portuguese paths of the first client live in [`legacy`].

pub mod legacy;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::game::{GameService, Reply};

const INVALID_DATA: &str = "Invalid data.";

type Shared = Arc<GameService>;

#[derive(Debug, Default, Deserialize)]
pub struct NewSessionBody {
    pub character_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CharacterBody {
    pub character_id: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExploreQuery {
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(alias = "direcao")]
    pub direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(alias = "acao")]
    pub action: Option<String>,
}

pub(crate) fn respond<T: Serialize>(reply: Reply<T>) -> Response {
    let status = if reply.fatal {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(reply)).into_response()
}

fn bad_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(Reply::<()>::invalid_request(INVALID_DATA)),
    )
        .into_response()
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

pub async fn health(State(svc): State<Shared>) -> Response {
    let report = svc.health().await;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(Reply::ok(report))).into_response()
}

pub async fn create_session(
    State(svc): State<Shared>,
    body: Option<Json<NewSessionBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    respond(svc.create_session(body.character_id).await.into())
}

pub async fn get_session(State(svc): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    respond(svc.session(&id).await.into())
}

pub async fn get_inventory(State(svc): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    respond(svc.inventory(&id).await.into())
}

pub async fn select_character(
    State(svc): State<Shared>,
    UrlPath(id): UrlPath<String>,
    body: Result<Json<CharacterBody>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => respond(svc.select_character(&id, body.character_id).await.into()),
        Err(rejection) => {
            warn!("character selection rejected: {}", rejection);
            bad_request()
        }
    }
}

pub async fn list_characters(State(svc): State<Shared>) -> Response {
    respond(svc.list_characters().await.into())
}

pub async fn explore(State(svc): State<Shared>, Query(query): Query<ExploreQuery>) -> Response {
    let (Some(id), Some(direction)) = (non_empty(query.session_id), non_empty(query.direction))
    else {
        return bad_request();
    };
    respond(svc.move_session(&id, &direction).await.into())
}

pub async fn action(
    State(svc): State<Shared>,
    body: Result<Json<ActionBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return bad_request();
    };
    let (Some(id), Some(action)) = (non_empty(body.session_id), non_empty(body.action)) else {
        return bad_request();
    };
    respond(svc.resolve_turn(&id, &action).await.into())
}

/// All API routes, plus the static client as fallback when `static_dir` exists.
pub fn router(service: Shared, server: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/nova-sessao", post(legacy::nova_sessao))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/inventory", get(get_inventory))
        .route("/sessions/:id/character", post(select_character))
        .route("/characters", get(list_characters))
        .route("/personagens", get(legacy::personagens))
        .route("/explore", get(explore))
        .route("/explorar", get(legacy::explorar))
        .route("/action", post(action))
        .route("/acao", post(legacy::acao));

    if let Some(dir) = server.static_dir.as_deref() {
        if Path::new(dir).is_dir() {
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            warn!("static_dir {} not found; serving API only", dir);
        }
    }

    app.layer(CorsLayer::permissive()).with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(service: Shared, server: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", server.bind, server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Game server listening on http://{}", addr);
    axum::serve(listener, router(service, server)).await?;
    Ok(())
}

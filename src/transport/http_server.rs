use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    common::{errors::ApiError, types::SessionId},
    player::Sessions,
    server::AppState,
    transport::{middleware::add_response_headers, websocket_server::websocket_handler},
};

const API_V1: &str = "/v1";

pub fn router(state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/sessions", get(get_sessions))
        .route("/sessions/{session_id}", get(get_session))
        .route("/websocket", get(websocket_handler));

    Router::new()
        .nest(API_V1, v1_routes)
        .route("/version", get(get_version))
        .fallback(route_not_found)
        .layer(middleware::from_fn(add_response_headers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /version
pub async fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::not_found("No such route", uri.path())),
    )
}

/// GET /v1/sessions
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<Sessions> {
    Json(Sessions {
        sessions: state.query_all().await,
    })
}

/// GET /v1/sessions/{session_id}
pub async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if session_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(
                "Session id must not be empty",
                format!("{}/sessions/{}", API_V1, session_id),
            )),
        )
            .into_response();
    }
    let snapshot = state.query_state(&SessionId::from(session_id)).await;
    (StatusCode::OK, Json(snapshot)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{server::notifier::Origin, voice::testing::Harness};

    #[tokio::test]
    async fn test_session_endpoint_does_not_register_unknown_ids() {
        let h = Harness::new();
        let response = get_session(Path("g9".to_owned()), State(h.app.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.app.registry.is_empty());

        let response = get_session(Path(" ".to_owned()), State(h.app.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sessions_endpoint_lists_snapshots() {
        let h = Harness::new();
        h.app
            .join(&"g1".into(), &"lobby".into(), Origin::default())
            .await;

        let Json(body) = get_sessions(State(h.app.clone())).await;
        assert_eq!(body.sessions.len(), 1);
        assert!(body.sessions[0].connected);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = route_not_found(Uri::from_static("/v2/nope"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

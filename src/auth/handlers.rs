use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{CreateUserRequest, CreatedUserResponse, HealthResponse, PublicUser},
        extractors::{AuthUser, MaybeAuthUser},
        identity::CreateUserParams,
        services::issue_user,
    },
    error::AuthError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", delete(delete_user))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[instrument(skip_all, fields(username = %payload.username))]
pub async fn create_user(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), AuthError> {
    let params = CreateUserParams {
        username: payload.username,
        is_staff: payload.is_staff,
    };
    let created = issue_user(state.store.as_ref(), actor.as_ref(), params).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[instrument(skip_all, fields(user_id = tracing::field::Empty))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AuthError> {
    if !actor.is_staff {
        return Err(AuthError::InsufficientPrivilege);
    }
    let Path(id) = id.map_err(|rej| AuthError::InvalidUserId(rej.body_text()))?;
    tracing::Span::current().record("user_id", tracing::field::display(id));
    let deleted = state
        .store
        .delete_user(id)
        .await
        .map_err(|e| AuthError::store("delete user", e))?;
    if !deleted {
        return Err(AuthError::UserNotFound);
    }
    info!(actor_id = %actor.id, user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "unavailable" }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::build_app, auth::services::bootstrap_staff_user, store::MemoryTokenStore};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn create_req(token: Option<&str>, username: &str) -> Request<Body> {
        let mut builder = Request::post("/api/v1/users").header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let body = serde_json::json!({ "username": username, "is_staff": false });
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn me_req(token: &str) -> Request<Body> {
        Request::get("/api/v1/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn app_with_root() -> (Router, MemoryTokenStore, String) {
        let store = MemoryTokenStore::new();
        let root = bootstrap_staff_user(&store, "root").await.unwrap();
        let app = build_app(AppState::in_memory(store.clone()));
        (app, store, root.token.token)
    }

    #[tokio::test]
    async fn create_user_then_authenticate_as_them() {
        let (app, _store, root_token) = app_with_root().await;

        let (status, body) = send(&app, create_req(Some(&root_token), "alice")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["is_staff"], false);
        assert_eq!(body["token"]["name"], "Default Token");
        assert!(body["token"]["expires_at"].is_null());
        assert!(body["user"]["created_at"].is_string());
        assert!(body["token"]["created_at"].is_string());
        assert!(body.get("created_at").is_none());

        let alice_token = body["token"]["token"].as_str().unwrap().to_string();
        let (status, me) = send(&app, me_req(&alice_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
        assert_eq!(me["is_staff"], false);
    }

    #[tokio::test]
    async fn create_user_without_credentials_is_401() {
        let (app, _store, _) = app_with_root().await;
        let (status, body) = send(&app, create_req(None, "bob")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authorization_required");
    }

    #[tokio::test]
    async fn create_user_as_regular_user_is_403() {
        let (app, _store, root_token) = app_with_root().await;
        let (_, body) = send(&app, create_req(Some(&root_token), "carol")).await;
        let carol_token = body["token"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, create_req(Some(&carol_token), "dave")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "insufficient_privilege");
    }

    #[tokio::test]
    async fn duplicate_username_is_409() {
        let (app, _store, root_token) = app_with_root().await;
        let (status, _) = send(&app, create_req(Some(&root_token), "erin")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, create_req(Some(&root_token), "erin")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "duplicate_username");
    }

    #[tokio::test]
    async fn invalid_token_is_401_invalid_token() {
        let (app, _store, _) = app_with_root().await;
        let (status, body) = send(&app, me_req("nonexistent-secret")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");

        let (status, body) = send(&app, create_req(Some("nonexistent-secret"), "frank")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
    }

    #[tokio::test]
    async fn me_without_header_is_401() {
        let (app, _store, _) = app_with_root().await;
        let req = Request::get("/api/v1/me").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authorization_required");
    }

    #[tokio::test]
    async fn delete_user_revokes_their_tokens() {
        let (app, store, root_token) = app_with_root().await;
        let (_, body) = send(&app, create_req(Some(&root_token), "gina")).await;
        let id = body["user"]["id"].as_str().unwrap().to_string();
        let gina_token = body["token"]["token"].as_str().unwrap().to_string();

        let req = Request::delete(format!("/api/v1/users/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {root_token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.user_count(), 1);

        let (status, body) = send(&app, me_req(&gina_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");

        let req = Request::delete(format!("/api/v1/users/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {root_token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_with_malformed_id_is_json_400() {
        let (app, _store, root_token) = app_with_root().await;
        let req = Request::delete("/api/v1/users/not-a-uuid")
            .header(header::AUTHORIZATION, format!("Bearer {root_token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["details"].as_str().unwrap().starts_with("invalid user id"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _store, _) = app_with_root().await;
        let req = Request::get("/api/v1/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

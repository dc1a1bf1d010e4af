use crate::api::{self, chat, tasks};
use crate::auth::{self, auth_middleware};
use crate::state::SharedState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: SharedState) -> Router {
    // Everything in here needs a bearer token. `route_layer` keeps the
    // check off unmatched paths so they still fall through to 404.
    let protected = Router::new()
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/:id/complete", patch(tasks::toggle_complete))
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/history", get(chat::history))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/logout", post(auth::logout))
        .merge(protected)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tasks::tests::{test_state, test_user};
    use crate::auth::create_token;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn send(state: &SharedState, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router(state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn unknown_paths_are_404_without_a_token() {
        let (state, _dir) = test_state();

        let (status, _) = send(&state, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _dir) = test_state();

        let (status, body) = send(&state, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let (state, _dir) = test_state();

        let (status, body) = send(&state, "/api/tasks", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Missing or invalid token");

        let (status, body) = send(&state, "/api/tasks", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Invalid token");

        let (status, _) = send(&state, "/api/chat/history", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_for_unknown_user_is_rejected() {
        let (state, _dir) = test_state();
        let token = create_token(&test_user("ghost"), &state.settings.jwt_secret, 60).unwrap();

        let (status, body) = send(&state, "/api/tasks", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "User not found");
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler() {
        let (state, _dir) = test_state();
        let user = test_user("u1");
        assert!(state.store.insert_user(&user).unwrap());
        let token = create_token(&user, &state.settings.jwt_secret, 60).unwrap();

        let (status, body) = send(&state, "/api/tasks", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }
}

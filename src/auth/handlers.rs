use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{ApiResponse, LoginData, LoginRequest, MeData, SignUpData, SignUpRequest},
        jwt::{AuthUser, JwtKeys},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError::UnsupportedMediaType),
        Err(e) => {
            warn!(error = %e, "rejected request body");
            Err(ApiError::InvalidInput)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SignUpData>>), ApiError> {
    let req = json_body(payload)?;

    let user = state
        .auth
        .sign_up(&req.email, &req.password, &req.confirm_password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "user created",
            SignUpData { user_id: user.id },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginData>>, ApiError> {
    let req = json_body(payload)?;

    let user = state.auth.login(&req.email, &req.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id, &user.email, state.auth.clock().now())
        .map_err(|e| {
            error!(error = %e, user_id = user.id, "jwt sign failed");
            ApiError::from(e)
        })?;

    info!(user_id = user.id, "token issued");
    Ok(Json(ApiResponse::success(
        "login successful",
        LoginData {
            user_id: user.id,
            token,
        },
    )))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(claims): AuthUser) -> Json<ApiResponse<MeData>> {
    Json(ApiResponse::success(
        "ok",
        MeData {
            user_id: claims.sub,
            email: claims.email,
        },
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::build_app;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        send(app, req.body(body).unwrap()).await
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn signup_body(email: &str, password: &str, confirm: &str) -> Value {
        json!({"email": email, "password": password, "confirm_password": confirm})
    }

    async fn register(app: &Router, email: &str, password: &str) -> i64 {
        let (status, body) = call(
            app,
            Method::POST,
            "/signup",
            Some(signup_body(email, password, password)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["user_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn signup_creates_user() {
        let app = build_app(AppState::fake("secret"));
        let (status, body) = call(
            &app,
            Method::POST,
            "/signup",
            Some(signup_body("test@example.com", "password123", "password123")),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "user created");
        assert_eq!(body["data"]["user_id"], 1);
    }

    #[tokio::test]
    async fn signup_validation_failures_are_bad_requests() {
        let cases = [
            ("Empty email", "", "password123", "password123", "email is required"),
            (
                "Empty password",
                "les@test.com",
                "",
                "",
                "password must be at least 8 characters long",
            ),
            (
                "Invalid email format",
                "test@",
                "password123",
                "password123",
                "invalid email",
            ),
            (
                "Password less than 8",
                "test123@example.com",
                "ppp",
                "ppp",
                "password must be at least 8 characters long",
            ),
            (
                "Password and confirm do not match",
                "test123@example.com",
                "password123",
                "password1234",
                "password and confirm password do not match",
            ),
        ];

        let app = build_app(AppState::fake("secret"));
        for (name, email, password, confirm, expected) in cases {
            let (status, body) = call(
                &app,
                Method::POST,
                "/signup",
                Some(signup_body(email, password, confirm)),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
            assert_eq!(body["status"], "failed", "{name}");
            assert_eq!(body["message"], expected, "{name}");
        }
    }

    #[tokio::test]
    async fn signup_with_registered_email_is_not_available() {
        let app = build_app(AppState::fake("secret"));
        register(&app, "test@example.com", "password123").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/signup",
            Some(signup_body("test@example.com", "password123", "password123")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "email is not available");
    }

    #[tokio::test]
    async fn wrong_content_type_is_415() {
        let app = build_app(AppState::fake("secret"));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(
                signup_body("test@example.com", "password123", "password123").to_string(),
            ))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            body["message"],
            "invalid content type, expected application/json"
        );
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_input() {
        let app = build_app(AppState::fake("secret"));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid input");
    }

    #[tokio::test]
    async fn non_post_is_method_not_allowed() {
        let app = build_app(AppState::fake("secret"));
        for uri in ["/signup", "/login"] {
            let (status, _) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        }
    }

    #[tokio::test]
    async fn login_returns_token_for_user() {
        let app = build_app(AppState::fake("secret"));
        let user_id = register(&app, "test@example.com", "password123").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "Test@Example.com", "password": "password123"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["user_id"], user_id);
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_failures_look_identical() {
        let app = build_app(AppState::fake("secret"));
        register(&app, "test@example.com", "password123").await;

        let mut bodies = Vec::new();
        for (email, password) in [
            ("", "password123"),
            ("test@example.com", ""),
            ("test@example.com", "wrong-password"),
            ("nobody@example.com", "password123"),
            ("invalidemail", "password123"),
        ] {
            let (status, body) = call(
                &app,
                Method::POST,
                "/login",
                Some(json!({"email": email, "password": password})),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
            bodies.push(body);
        }
        let expected = json!({"status": "failed", "message": "invalid credentials"});
        assert!(bodies.iter().all(|b| *b == expected), "{bodies:?}");
    }

    #[tokio::test]
    async fn login_without_secret_fails_closed() {
        let app = build_app(AppState::fake(""));
        register(&app, "test@example.com", "password123").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "test@example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "an internal error occurred");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn me_echoes_token_claims() {
        let app = build_app(AppState::fake("secret"));
        let user_id = register(&app, "test@example.com", "password123").await;
        let (_, body) = call(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "test@example.com", "password": "password123"})),
        )
        .await;
        let token = body["data"]["token"].as_str().unwrap().to_owned();

        let req = Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user_id"], user_id);
        assert_eq!(body["data"]["email"], "test@example.com");

        let (status, body) = call(&app, Method::GET, "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid or expired token");
    }
}

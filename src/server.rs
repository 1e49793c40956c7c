//!
//! miniboard HTTP server
//! ---------------------
//! Axum-based JSON API for the social-posting service.
//!
//! Responsibilities:
//! - Session transport: an HTTP-only `token` cookie carrying the signed
//!   credential, set on register/login and cleared on logout.
//! - The authentication checkpoint: every route except register, login,
//!   logout and the API root resolves a `Principal` from the cookie before
//!   any handler logic runs.
//! - Post creation, fetch, owner-gated update, and the like toggle.
//! - Profile fetch and multipart profile-picture upload, with uploaded
//!   images served back under `/public`.
//! - Uniform `{success, message, data}` envelope on every response; panics
//!   inside a handler become a 500 envelope without crashing the process.

use std::net::SocketAddr;
use std::path::Path as FsPath;

use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{AppConfig, MAX_CONTENT_BYTES, MAX_UPLOAD_BYTES};
use crate::error::{AppError, AppResult};
use crate::identity::{authorize_owner, hash_password, verify_password, Principal, TokenService};
use crate::models::SafeUser;
use crate::store::{NewUser, SharedStore};

const SESSION_COOKIE: &str = "token";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tokens: std::sync::Arc<TokenService>,
}

impl AppState {
    pub fn new(store: SharedStore, tokens: TokenService) -> Self {
        Self { store, tokens: std::sync::Arc::new(tokens) }
    }
}

/// Start the miniboard HTTP server with the given configuration.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = SharedStore::new(&config.data_root)?;
    let tokens = TokenService::new(
        config.jwt_secret.clone(),
        chrono::Duration::days(config.token_ttl_days),
    );
    let state = AppState::new(store, tokens);
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the application router. Exposed separately from `run` so tests can
/// drive the full HTTP surface without binding a socket.
pub fn router(state: AppState) -> Router {
    let public_dir = state.store.public_dir();
    Router::new()
        .route("/api", get(api_root))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/profile", get(profile))
        .route("/api/post", post(create_post))
        .route("/api/post/{id}", get(get_post))
        .route("/api/update/{id}", put(update_post))
        .route("/api/like/{id}", post(toggle_like))
        .route("/api/upload", post(upload))
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

// --- Uniform response envelope ---

fn ok_env(message: &str, data: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({"success": true, "message": message, "data": data}))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("request failed: {}", self.message());
        }
        let body = json!({"success": false, "message": self.message(), "data": {}});
        (status, Json(body)).into_response()
    }
}

fn handle_panic(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "panic"
    };
    error!(target: "panic", "handler panic: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"success": false, "message": "Server error", "data": {}})),
    )
        .into_response()
}

// --- Session transport ---

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie")?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, token
    ))
    .expect("cookie value")
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE
    ))
    .expect("cookie value")
}

/// The authentication checkpoint. Resolving a `Principal` extracts the
/// session cookie and verifies the credential; any failure rejects the
/// request as `Unauthenticated` before the handler body runs.
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parse_cookie(&parts.headers, SESSION_COOKIE)
            .ok_or_else(|| AppError::unauthenticated("Not authenticated"))?;
        state.tokens.verify(&token)
    }
}

// --- Request payloads ---

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreatePostPayload {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdatePostPayload {
    #[serde(default)]
    content: Option<String>,
}

// --- Handlers ---

async fn api_root() -> impl IntoResponse {
    ok_env("API root", json!({}))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password required"));
    }
    let password_hash = hash_password(&payload.password).map_err(AppError::from)?;
    let user = state.store.create_user(NewUser {
        username: payload.username,
        name: payload.name,
        age: payload.age,
        email: payload.email,
        password_hash,
    })?;
    let principal = Principal { user_id: user.id, email: user.email.clone() };
    let token = state.tokens.issue(&principal)?;
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&token));
    info!(user = %user.id, "registered");
    Ok((
        headers,
        ok_env("Registered", json!({"user": SafeUser::from(&user)})),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password required"));
    }
    // Unknown email and wrong password are indistinguishable to the caller.
    let user = state
        .store
        .find_user_by_email(&payload.email)
        .ok_or_else(AppError::invalid_credentials)?;
    if !verify_password(&user.password_hash, &payload.password) {
        return Err(AppError::invalid_credentials());
    }
    let principal = Principal { user_id: user.id, email: user.email.clone() };
    let token = state.tokens.issue(&principal)?;
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&token));
    info!(user = %user.id, "logged in");
    Ok((
        headers,
        ok_env("Logged in", json!({"user": SafeUser::from(&user)})),
    ))
}

async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", clear_session_cookie());
    (headers, ok_env("Logged out", json!({})))
}

async fn profile(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let user = state
        .store
        .get_user(principal.user_id)
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let posts = state.store.posts_for_user(user.id)?;
    Ok(ok_env(
        "Profile fetched",
        json!({"user": SafeUser::from(&user), "posts": posts}),
    ))
}

async fn create_post(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreatePostPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.content.is_empty() {
        return Err(AppError::validation("Content required"));
    }
    if payload.content.len() > MAX_CONTENT_BYTES {
        return Err(AppError::validation("Content too long"));
    }
    let post = state.store.create_post(principal.user_id, payload.content)?;
    Ok(ok_env("Post created", json!({"post": post})))
}

fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    // A malformed id names nothing; report it the same way as an absent post.
    raw.parse::<Uuid>()
        .map_err(|_| AppError::not_found("Post not found"))
}

async fn get_post(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_post_id(&id)?;
    let post = state
        .store
        .get_post(id)
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    let owner = state.store.get_user(post.owner).map(|u| SafeUser::from(&u));
    Ok(ok_env("Post fetched", json!({"post": post, "owner": owner})))
}

async fn update_post(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostPayload>,
) -> AppResult<impl IntoResponse> {
    let id = parse_post_id(&id)?;
    // Existence first, then ownership: a missing post must never leak
    // whether the caller would have owned it.
    let post = state
        .store
        .get_post(id)
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    authorize_owner(post.owner, &principal)?;
    let post = match payload.content {
        Some(content) => {
            if content.len() > MAX_CONTENT_BYTES {
                return Err(AppError::validation("Content too long"));
            }
            state.store.update_content(id, content)?
        }
        None => post,
    };
    Ok(ok_env("Post updated", json!({"post": post})))
}

async fn toggle_like(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_post_id(&id)?;
    let post = state.store.toggle_like(id, principal.user_id)?;
    Ok(ok_env("Toggled like", json!({"post": post})))
}

async fn upload(
    State(state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut saved: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::validation("Upload failed"))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let ext = field
            .file_name()
            .and_then(|n| FsPath::new(n).extension().and_then(|e| e.to_str()))
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::validation("Upload failed"))?;
        let filename = format!("{}{}", random_hex16()?, ext);
        let path = state.store.uploads_dir().join(&filename);
        tokio::fs::write(&path, &bytes).await.map_err(AppError::from)?;
        saved = Some(filename);
        break;
    }
    let Some(filename) = saved else {
        return Err(AppError::validation("File required"));
    };
    let user = state.store.set_profile_pic(principal.user_id, &filename)?;
    info!(user = %user.id, file = %filename, "profile picture uploaded");
    Ok(ok_env(
        "Uploaded",
        json!({"filename": filename, "user": SafeUser::from(&user)}),
    ))
}

fn random_hex16() -> AppResult<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| AppError::server(e.to_string()))?;
    let mut out = String::with_capacity(32);
    use std::fmt::Write as _;
    for b in &bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    Ok(out)
}

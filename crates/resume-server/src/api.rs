use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use resume_shared::constants::APP_NAME;
use resume_shared::{Identity, Role};
use resume_store::{Database, StoreError, User};

use crate::auth::{hash_password_blocking, verify_password_blocking, AuthUser, TokenIssuer};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::{reports, users};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: TokenIssuer,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours),
            config: Arc::new(config),
        }
    }

    /// Lock the database. Never hold the guard across an `.await`.
    ///
    /// A handler that panicked while holding the lock leaves no open
    /// transaction behind, so a poisoned lock is taken over as is.
    pub fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| {
            warn!("Database lock was poisoned by a panicking request, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// `Json` whose rejections use the API's `{"error": ...}` body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub fn build_router(state: AppState) -> Router {
    let origins = if state.config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            state
                .config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/report", post(reports::create_report))
        .route("/report/:id", delete(reports::delete_report))
        .route("/report/:id/pdf", get(reports::report_pdf))
        .route("/my-reports", get(reports::my_reports))
        .route("/summary", get(reports::summary))
        .route("/summary/pdf", get(reports::summary_pdf))
        .route("/weekly-stats", get(reports::weekly_stats))
        .route("/admin/weekly-stats", get(reports::admin_weekly_stats))
        .route("/current-offering", get(reports::current_offering))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Registration & login ───

#[derive(Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

#[derive(Serialize)]
struct UserCreatedResponse {
    msg: &'static str,
    id: i64,
    username: String,
    role: Role,
}

impl From<User> for UserCreatedResponse {
    fn from(user: User) -> Self {
        Self {
            msg: "User created",
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

fn registration_refused(caller: Option<&Identity>) -> ServerError {
    match caller {
        Some(identity) => {
            warn!(user_id = identity.user_id, "Non-admin tried to register a user");
            ServerError::Forbidden("Only an administrator can create users".into())
        }
        None => ServerError::Forbidden("Authentication required to create a user".into()),
    }
}

/// Create an account. The very first account needs no token (bootstrap)
/// and defaults to `admin`; after that only an admin may register users.
async fn register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), ServerError> {
    let caller = caller.map(|AuthUser(identity)| identity);
    let caller_is_admin = caller.as_ref().is_some_and(Identity::is_admin);

    // Refuse early, before paying for a password hash.
    let existing_users = state.db().count_users()?;
    if existing_users > 0 && !caller_is_admin {
        return Err(registration_refused(caller.as_ref()));
    }

    let new_user = users::validate_new_user(
        req.username.as_deref(),
        req.password.as_deref(),
        req.role.as_deref(),
    )?;
    let hash = hash_password_blocking(new_user.password).await?;

    // Count and insert under one lock: two concurrent bootstrap requests
    // must not both become admin.
    let (user, bootstrap) = {
        let db = state.db();
        let bootstrap = db.count_users()? == 0;
        if !bootstrap && !caller_is_admin {
            return Err(registration_refused(caller.as_ref()));
        }
        let default_role = if bootstrap { Role::Admin } else { Role::Section };
        let role = new_user.role.unwrap_or(default_role);
        (db.create_user(&new_user.username, &hash, role)?, bootstrap)
    };

    info!(user_id = user.id, username = %user.username, role = %user.role, bootstrap, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    id: i64,
    username: String,
    role: Role,
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ServerError::BadRequest(
            "Username and password are required".into(),
        ));
    };

    let lookup = state.db().get_user_by_username(username.trim());
    let user = match lookup {
        Ok(user) => Some(user),
        Err(StoreError::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    let verified = match user {
        Some(user) => verify_password_blocking(password, user.password_hash.clone())
            .await
            .then_some(user),
        None => None,
    };
    let Some(user) = verified else {
        warn!(username = %username, "Failed login attempt");
        return Err(ServerError::Unauthorized("Invalid credentials".into()));
    };

    let access_token = state.tokens.issue(&user)?;
    info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

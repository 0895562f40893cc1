//! Account management handlers (administrators only, except reading one's
//! own profile).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use resume_shared::constants::{PASSWORD_MIN_LEN, USERNAME_MIN_LEN};
use resume_shared::{Identity, Role};
use resume_store::{StoreError, User, UserUpdate};

use crate::api::AppState;
use crate::api::JsonBody;
use crate::auth::{hash_password_blocking, AuthUser};
use crate::error::ServerError;

/// Checked input for a new account. `role` is `None` when the request
/// left it to the endpoint's default.
#[derive(Debug)]
pub(crate) struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Option<Role>,
}

pub(crate) fn validate_new_user(
    username: Option<&str>,
    password: Option<&str>,
    role: Option<&str>,
) -> Result<NewUser, ServerError> {
    let username = username.map(str::trim).unwrap_or_default();
    let password = password.unwrap_or_default();
    if username.is_empty() || password.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    Ok(NewUser {
        username: check_username(username)?,
        password: check_password(password)?,
        role: role.map(parse_role).transpose()?,
    })
}

fn check_username(raw: &str) -> Result<String, ServerError> {
    let username = raw.trim();
    if username.chars().count() < USERNAME_MIN_LEN {
        return Err(ServerError::BadRequest(format!(
            "Invalid username (min {USERNAME_MIN_LEN} characters)"
        )));
    }
    Ok(username.to_string())
}

fn check_password(raw: &str) -> Result<String, ServerError> {
    if raw.chars().count() < PASSWORD_MIN_LEN {
        return Err(ServerError::BadRequest(format!(
            "Password too short (min {PASSWORD_MIN_LEN} characters)"
        )));
    }
    Ok(raw.to_string())
}

fn parse_role(raw: &str) -> Result<Role, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest("Invalid role (admin, section, viewer)".into()))
}


fn require_admin(identity: &Identity, action: &str) -> Result<(), ServerError> {
    if identity.is_admin() {
        return Ok(());
    }
    warn!(user_id = identity.user_id, action, "Admin-only action refused");
    Err(ServerError::Forbidden(
        "Only an administrator can manage users".into(),
    ))
}

fn user_not_found(e: StoreError) -> ServerError {
    match e {
        StoreError::NotFound => ServerError::NotFound("User not found".into()),
        other => other.into(),
    }
}

// ─── Handlers ───

pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<User>>, ServerError> {
    require_admin(&identity, "list_users")?;
    Ok(Json(state.db().list_users()?))
}

/// Admins may read any account, everyone else only their own.
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ServerError> {
    if !identity.is_admin() && identity.user_id != id {
        warn!(user_id = identity.user_id, target = id, "Profile read refused");
        return Err(ServerError::Forbidden(
            "Only administrators or the account owner can read a profile".into(),
        ));
    }

    let user = state.db().get_user(id).map_err(user_not_found)?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    username: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    msg: &'static str,
    id: i64,
    username: String,
    role: Role,
}

impl UserResponse {
    fn new(msg: &'static str, user: User) -> Self {
        Self {
            msg,
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    require_admin(&identity, "create_user")?;

    let new_user = validate_new_user(
        req.username.as_deref(),
        req.password.as_deref(),
        req.role.as_deref(),
    )?;
    let hash = hash_password_blocking(new_user.password).await?;
    let role = new_user.role.unwrap_or(Role::Section);
    let user = state.db().create_user(&new_user.username, &hash, role)?;

    info!(
        admin_id = identity.user_id,
        user_id = user.id,
        username = %user.username,
        role = %user.role,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(UserResponse::new("User created", user))))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    username: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

/// Partial update; absent fields are left untouched.
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    require_admin(&identity, "update_user")?;

    let username = req.username.as_deref().map(check_username).transpose()?;
    let role = req.role.as_deref().map(parse_role).transpose()?;
    let password_hash = match req.password.as_deref() {
        Some(raw) => Some(hash_password_blocking(check_password(raw)?).await?),
        None => None,
    };
    let update = UserUpdate {
        username,
        password_hash,
        role,
    };

    let user = state.db().update_user(id, &update).map_err(user_not_found)?;

    info!(admin_id = identity.user_id, user_id = user.id, "User updated");
    Ok(Json(UserResponse::new("User updated", user)))
}

#[derive(Serialize)]
pub struct UserDeletedResponse {
    msg: String,
    id: i64,
}

/// Delete an account; its reports and weekly aggregates go with it.
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<UserDeletedResponse>, ServerError> {
    require_admin(&identity, "delete_user")?;

    let db = state.db();
    let user = db.get_user(id).map_err(user_not_found)?;
    if !db.delete_user(id)? {
        return Err(ServerError::NotFound("User not found".into()));
    }

    info!(admin_id = identity.user_id, user_id = id, username = %user.username, "User deleted");
    Ok(Json(UserDeletedResponse {
        msg: format!("User {} deleted", user.username),
        id,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::build_router;
    use crate::auth::verify_password;
    use crate::test_support::{call, call_raw, seed_user, test_state};

    use super::*;

    #[test]
    fn new_user_validation() {
        let ok = validate_new_user(Some("  nord "), Some("secret1"), None).unwrap();
        assert_eq!(ok.username, "nord");
        assert_eq!(ok.role, None);

        let viewer = validate_new_user(Some("lecteur"), Some("secret1"), Some("viewer")).unwrap();
        assert_eq!(viewer.role, Some(Role::Viewer));

        for (username, password, role) in [
            (None, Some("secret1"), None),
            (Some("nord"), None, None),
            (Some("  ab "), Some("secret1"), None),
            (Some("nord"), Some("12345"), None),
            (Some("nord"), Some("secret1"), Some("superuser")),
        ] {
            assert!(matches!(
                validate_new_user(username, password, role),
                Err(ServerError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn user_management_is_admin_only() {
        let state = test_state();
        let (section, section_token) = seed_user(&state, "section-nord", Role::Section);
        let (_, viewer_token) = seed_user(&state, "lecteur", Role::Viewer);
        let app = build_router(state);

        for (method, uri) in [
            ("GET", "/users".to_string()),
            ("DELETE", format!("/users/{}", section.id)),
        ] {
            for token in [section_token.as_str(), viewer_token.as_str()] {
                let (status, _) = call(&app, method, &uri, Some(token), None).await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            }
        }

        let (status, _) = call(
            &app,
            "POST",
            "/users",
            Some(&section_token),
            Some(json!({ "username": "autre", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_creates_and_lists_users() {
        let state = test_state();
        let (_, admin) = seed_user(&state, "admin", Role::Admin);
        let app = build_router(state);

        let (status, body) = call(
            &app,
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "username": "section-sud", "password": "secret1", "role": "viewer" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "viewer");

        let (status, _) = call(
            &app,
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "username": "section-sud", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn mistyped_user_body_gets_a_json_error() {
        let state = test_state();
        let (nord, _) = seed_user(&state, "section-nord", Role::Section);
        let (_, admin) = seed_user(&state, "admin", Role::Admin);
        let app = build_router(state);

        let (status, body) = call_raw(
            &app,
            "POST",
            "/users",
            Some(&admin),
            r#"{"username": ["a"], "password": "secret1"}"#,
            Some("application/json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call_raw(
            &app,
            "PUT",
            &format!("/users/{}", nord.id),
            Some(&admin),
            "role=viewer",
            Some("application/x-www-form-urlencoded"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn profile_is_readable_by_owner() {
        let state = test_state();
        let (nord, nord_token) = seed_user(&state, "section-nord", Role::Section);
        let (sud, _) = seed_user(&state, "section-sud", Role::Section);
        let (_, admin) = seed_user(&state, "admin", Role::Admin);
        let app = build_router(state);

        let (status, body) =
            call(&app, "GET", &format!("/users/{}", nord.id), Some(&nord_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "section-nord");

        let (status, _) =
            call(&app, "GET", &format!("/users/{}", sud.id), Some(&nord_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "GET", "/users/999", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_updates_user() {
        let state = test_state();
        let (nord, _) = seed_user(&state, "section-nord", Role::Section);
        let (_, admin) = seed_user(&state, "admin", Role::Admin);
        let app = build_router(state.clone());
        let uri = format!("/users/{}", nord.id);

        let (status, body) = call(
            &app,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({ "username": " section-nord-2 ", "role": "viewer", "password": "nouveau1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "section-nord-2");
        assert_eq!(body["role"], "viewer");

        let stored = state.db().get_user(nord.id).unwrap();
        assert!(verify_password("nouveau1", &stored.password_hash));

        let (status, _) = call(
            &app,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({ "role": "superuser" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({ "username": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "PUT",
            "/users/999",
            Some(&admin),
            Some(json!({ "role": "viewer" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let state = test_state();
        let (nord, nord_token) = seed_user(&state, "section-nord", Role::Section);
        let (_, admin) = seed_user(&state, "admin", Role::Admin);
        let app = build_router(state.clone());

        let (status, _) = call(
            &app,
            "POST",
            "/report",
            Some(&nord_token),
            Some(json!({ "date": "2024-03-03", "preacher": "A", "total_attendees": 12 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/users/{}", nord.id);
        let (status, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/summary", Some(&admin), None).await;
        assert_eq!(body, json!([]));

        let (status, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateUserRequest, UserFilter,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{self, NewUser},
    },
    error::ApiError,
    response::{ApiJson, ApiResponse, Page, SearchRequest},
    state::AppState,
    types::IdRequest,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", post(get_me))
        .route("/searchUser", post(search_user))
        .route("/updateUser", post(update_user))
        .route("/deleteUser", post(delete_user))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

fn check_identifiers(email: &Option<String>, phone: &Option<String>) -> Result<(), ApiError> {
    if email.is_none() && phone.is_none() {
        return Err(ApiError::Validation("Please provide email or phone".into()));
    }
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Please provide a valid email".into()));
        }
    }
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(ApiError::Validation(
                "Please provide a valid 10-digit phone number".into(),
            ));
        }
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    payload.email = normalize_email(payload.email);
    check_identifiers(&payload.email, &payload.phone)?;

    if payload.password.len() < 6 {
        warn!("password too short");
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    if repo::exists_by_email_or_phone(
        &state.db,
        payload.email.as_deref(),
        payload.phone.as_deref(),
    )
    .await?
    {
        warn!("registration for taken identifier");
        return Err(ApiError::Conflict(
            "User already exists with this email or phone".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = repo::create(
        &state.db,
        NewUser {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            password_hash,
            role: payload.role,
            gender: payload.gender,
            account_id: payload.account_id,
        },
    )
    .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::created(
        "User registered successfully",
        AuthResponse {
            token,
            user: user.into(),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    payload.email = normalize_email(payload.email);
    if payload.email.is_none() && payload.phone.is_none() {
        return Err(ApiError::Validation("Please provide email or phone".into()));
    }

    // Unknown identifier and bad password produce the same error so callers
    // cannot probe which accounts exist.
    let user = match (&payload.email, &payload.phone) {
        (Some(email), _) => repo::find_by_email(&state.db, email).await?,
        (None, Some(phone)) => repo::find_by_phone(&state.db, phone).await?,
        (None, None) => unreachable!(),
    }
    .ok_or_else(|| {
        warn!("login for unknown identifier");
        ApiError::Auth("Invalid credentials".into())
    })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Auth("Invalid credentials".into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse {
        success: true,
        status_code: 200,
        message: Some("Login successful".into()),
        data: Some(AuthResponse {
            token,
            user: user.into(),
        }),
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state, body))]
pub async fn search_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(body): ApiJson<SearchRequest<UserFilter>>,
) -> Result<ApiResponse<Page<PublicUser>>, ApiError> {
    let filter = body.search.unwrap_or_default();
    let (users, total) = repo::search(&state.db, &filter, &body.params).await?;
    let docs = users.into_iter().map(PublicUser::from).collect();
    Ok(ApiResponse::ok(Page::new(docs, total, &body.params)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("User ID is required".into()))?;

    let mut user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if let Some(name) = payload.name {
        user.name = Some(name);
    }
    if let Some(email) = normalize_email(payload.email) {
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Please provide a valid email".into()));
        }
        user.email = Some(email);
    }
    if let Some(phone) = payload.phone {
        if !is_valid_phone(&phone) {
            return Err(ApiError::Validation(
                "Please provide a valid 10-digit phone number".into(),
            ));
        }
        user.phone = Some(phone);
    }
    // Re-hash only when a new password value arrives.
    if let Some(password) = payload.password {
        if password.len() < 6 {
            return Err(ApiError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }
        user.password_hash = hash_password(&password)?;
    }
    if let Some(role) = payload.role {
        user.role = Some(role);
    }
    if let Some(gender) = payload.gender {
        user.gender = Some(gender);
    }
    if let Some(account_id) = payload.account_id {
        user.account_id = Some(account_id);
    }

    repo::update(&state.db, &user).await?;

    info!(user_id = %user.id, "user updated");
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("User ID is required".into()))?;

    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }

    info!(user_id = %id, "user deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("9876543210"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("98765432100"));
        assert!(!is_valid_phone("98765abc10"));
    }

    #[test]
    fn identifiers_require_at_least_one() {
        assert!(check_identifiers(&None, &None).is_err());
        assert!(check_identifiers(&Some("a@b.co".into()), &None).is_ok());
        assert!(check_identifiers(&None, &Some("9876543210".into())).is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email(Some("  USER@Example.COM ".into())),
            Some("user@example.com".into())
        );
        assert_eq!(normalize_email(Some("  ".into())), None);
        assert_eq!(normalize_email(None), None);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn login_failures_are_indistinguishable() {
        let mut state = AppState::fake();
        state.db = crate::state::test_db().await;

        register(
            State(state.clone()),
            ApiJson(RegisterRequest {
                name: Some("Asha".into()),
                email: Some("asha@example.com".into()),
                phone: None,
                password: "correct-password".into(),
                role: None,
                gender: None,
                account_id: None,
            }),
        )
        .await
        .expect("register");

        let unknown = login(
            State(state.clone()),
            ApiJson(LoginRequest {
                email: Some("ghost@example.com".into()),
                phone: None,
                password: "correct-password".into(),
            }),
        )
        .await
        .unwrap_err();
        let wrong = login(
            State(state),
            ApiJson(LoginRequest {
                email: Some("asha@example.com".into()),
                phone: None,
                password: "wrong-password".into(),
            }),
        )
        .await
        .unwrap_err();

        // Unknown identifier and bad password answer with the same envelope.
        assert!(matches!(&unknown, ApiError::Auth(m) if m == "Invalid credentials"));
        assert!(matches!(&wrong, ApiError::Auth(m) if m == "Invalid credentials"));
    }

    #[test]
    fn public_user_never_serializes_password() {
        let user = crate::auth::repo::User {
            id: uuid::Uuid::new_v4(),
            name: Some("Asha".into()),
            email: Some("asha@example.com".into()),
            phone: None,
            password_hash: "$argon2id$secret".into(),
            role: None,
            gender: None,
            account_id: None,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(json.contains("asha@example.com"));
    }
}

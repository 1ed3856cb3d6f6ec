use axum::{extract::State, routing::post, Router};
use tracing::{info, instrument};

use crate::{
    accounts::{
        dto::{AccountDto, AccountFilter, AddAccountRequest, UpdateAccountRequest},
        repo,
    },
    auth::jwt::AuthUser,
    error::ApiError,
    response::{ApiJson, ApiResponse, Page, SearchRequest},
    state::AppState,
    types::IdRequest,
};

// Accounts are a shared resource: any authenticated user may mutate them.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/addAccount", post(add_account))
        .route("/updateAccount", post(update_account))
        .route("/searchAccount", post(search_account))
        .route("/deleteAccount", post(delete_account))
}

#[instrument(skip(state, payload))]
pub async fn add_account(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<AddAccountRequest>,
) -> Result<ApiResponse<AccountDto>, ApiError> {
    let account_name = payload
        .account_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Account name is required".into()))?;

    let account = repo::create(
        &state.db,
        account_name.trim(),
        payload.status.unwrap_or(true),
    )
    .await?;

    info!(account_id = %account.id, "account created");
    Ok(ApiResponse::created(
        "Account added successfully",
        account.into(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> Result<ApiResponse<AccountDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Account ID is required".into()))?;
    let account_name = payload
        .account_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Account name is required".into()))?;

    let mut account = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;
    account.account_name = account_name.trim().to_string();
    if let Some(status) = payload.status {
        account.status = status;
    }

    let account = repo::update(&state.db, &account).await?;

    info!(account_id = %account.id, "account updated");
    Ok(ApiResponse {
        success: true,
        status_code: 200,
        message: Some("Account updated successfully".into()),
        data: Some(account.into()),
    })
}

#[instrument(skip(state, body))]
pub async fn search_account(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(body): ApiJson<SearchRequest<AccountFilter>>,
) -> Result<ApiResponse<Page<AccountDto>>, ApiError> {
    let filter = body.search.unwrap_or_default();
    let (accounts, total) = repo::search(&state.db, &filter, &body.params).await?;
    let docs = accounts.into_iter().map(AccountDto::from).collect();
    Ok(ApiResponse::ok(Page::new(docs, total, &body.params)))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Account ID is required".into()))?;

    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    info!(account_id = %id, "account deleted");
    Ok(ApiResponse::message("Account deleted successfully"))
}

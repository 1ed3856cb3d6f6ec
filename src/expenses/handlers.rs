use axum::{extract::State, routing::post, Router};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    expenses::{
        dto::{
            AddExpenseRequest, CategoryTotal, ExpenseDto, ExpenseFilter, ExpenseStats,
            ExpenseStatsRequest, PaymentMethodTotal, ReimbursementTotal, UpdateExpenseRequest,
        },
        repo::{self, NewExpense, StatsWindow},
    },
    response::{ApiJson, ApiResponse, Page, SearchRequest},
    state::AppState,
    types::{IdRequest, Reimbursement},
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/addExpense", post(add_expense))
        .route("/getExpenses", post(search_expenses))
        .route("/searchExpense", post(search_expenses))
        .route("/getExpense", post(get_expense))
        .route("/updateExpense", post(update_expense))
        .route("/deleteExpense", post(delete_expense))
        .route("/stats", post(expense_stats))
}

fn check_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::Validation("Amount cannot be negative".into()));
    }
    Ok(amount)
}

#[instrument(skip(state, payload))]
pub async fn add_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<AddExpenseRequest>,
) -> Result<ApiResponse<ExpenseDto>, ApiError> {
    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Please provide a title".into()))?;
    let amount = check_amount(
        payload
            .amount
            .ok_or_else(|| ApiError::Validation("Please provide an amount".into()))?,
    )?;
    let category = payload
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Please provide a category".into()))?;
    let payment_method = payload
        .payment_method
        .ok_or_else(|| ApiError::Validation("Please provide a payment method".into()))?;

    // Owner comes from the token; any owner field in the body is ignored.
    let expense = repo::create(
        &state.db,
        NewExpense {
            title: title.trim().to_string(),
            amount,
            date: payload.date,
            category: category.trim().to_string(),
            payment_method,
            reimbursement: payload.reimbursement.unwrap_or(Reimbursement::No),
            description: payload.description,
            proof_url: payload.proof_url,
            user_id,
        },
    )
    .await?;

    info!(expense_id = %expense.id, user_id = %user_id, "expense created");
    Ok(ApiResponse::created(
        "Expense added successfully",
        expense.into(),
    ))
}

#[instrument(skip(state, body))]
pub async fn search_expenses(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(body): ApiJson<SearchRequest<ExpenseFilter>>,
) -> Result<ApiResponse<Page<ExpenseDto>>, ApiError> {
    let filter = body.search.unwrap_or_default();
    let (rows, total) = repo::search(&state.db, &filter, &body.params).await?;
    let docs = rows.into_iter().map(ExpenseDto::from).collect();
    Ok(ApiResponse::ok(Page::new(docs, total, &body.params)))
}

#[instrument(skip(state))]
pub async fn get_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<ExpenseDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Expense ID is required".into()))?;

    let expense = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))?;
    Ok(ApiResponse::ok(expense.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateExpenseRequest>,
) -> Result<ApiResponse<ExpenseDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Expense ID is required".into()))?;

    let mut expense = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))?;

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("Please provide a title".into()));
        }
        expense.title = title.trim().to_string();
    }
    if let Some(amount) = payload.amount {
        expense.amount = check_amount(amount)?;
    }
    if let Some(date) = payload.date {
        expense.date = date;
    }
    if let Some(category) = payload.category {
        if category.trim().is_empty() {
            return Err(ApiError::Validation("Please provide a category".into()));
        }
        expense.category = category.trim().to_string();
    }
    if let Some(method) = payload.payment_method {
        expense.payment_method = method;
    }
    if let Some(reimbursement) = payload.reimbursement {
        expense.reimbursement = reimbursement;
    }
    if let Some(description) = payload.description {
        expense.description = Some(description);
    }
    if let Some(proof_url) = payload.proof_url {
        expense.proof_url = Some(proof_url);
    }

    if !repo::update(&state.db, &expense).await? {
        return Err(ApiError::NotFound("Expense not found".into()));
    }
    let updated = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))?;

    info!(expense_id = %id, user_id = %user_id, "expense updated");
    Ok(ApiResponse {
        success: true,
        status_code: 200,
        message: Some("Expense updated successfully".into()),
        data: Some(updated.into()),
    })
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Expense ID is required".into()))?;

    if !repo::delete_owned(&state.db, id, user_id).await? {
        return Err(ApiError::NotFound("Expense not found".into()));
    }

    info!(expense_id = %id, user_id = %user_id, "expense deleted");
    Ok(ApiResponse::message("Expense deleted successfully"))
}

#[instrument(skip(state, payload))]
pub async fn expense_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ExpenseStatsRequest>,
) -> Result<ApiResponse<ExpenseStats>, ApiError> {
    // Defaults to the caller; an explicit search.userId overrides for
    // administrative lookups (ungated, see DESIGN.md).
    let scope = payload.search.unwrap_or_default();
    let window = StatsWindow {
        user_id: scope.user_id.unwrap_or(user_id),
        start: payload.start_date,
        end: payload.end_date,
    };

    let total_expenses = repo::stats_count(&state.db, &window).await?;
    let total_amount = repo::stats_total(&state.db, &window).await?;
    let by_category = repo::stats_by_category(&state.db, &window)
        .await?
        .into_iter()
        .map(|(category, total, count)| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    let by_payment_method = repo::stats_by_payment_method(&state.db, &window)
        .await?
        .into_iter()
        .map(|(payment_method, total, count)| PaymentMethodTotal {
            payment_method,
            total,
            count,
        })
        .collect();
    let by_reimbursement = repo::stats_by_reimbursement(&state.db, &window)
        .await?
        .into_iter()
        .map(|(reimbursement, total, count)| ReimbursementTotal {
            reimbursement,
            total,
            count,
        })
        .collect();

    Ok(ApiResponse::ok(ExpenseStats {
        total_expenses,
        total_amount,
        by_category,
        by_payment_method,
        by_reimbursement,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_must_be_finite_and_non_negative() {
        assert!(check_amount(0.0).is_ok());
        assert!(check_amount(125.50).is_ok());
        assert!(check_amount(-1.0).is_err());
        assert!(check_amount(f64::NAN).is_err());
        assert!(check_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn stats_request_parses_dates_and_scope() {
        let body: ExpenseStatsRequest = serde_json::from_str(
            r#"{"startDate":"2026-01-01T00:00:00Z","search":{"userId":"0a0b0c0d-0e0f-4a4b-8c8d-0e0f0a0b0c0d"}}"#,
        )
        .unwrap();
        assert!(body.start_date.is_some());
        assert!(body.end_date.is_none());
        assert!(body.search.unwrap().user_id.is_some());
    }

    #[test]
    fn empty_stats_are_zeros_not_errors() {
        let stats = ExpenseStats {
            total_expenses: 0,
            total_amount: 0.0,
            by_category: vec![],
            by_payment_method: vec![],
            by_reimbursement: vec![],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalExpenses"], 0);
        assert_eq!(json["totalAmount"], 0.0);
        assert!(json["byCategory"].as_array().unwrap().is_empty());
    }
}

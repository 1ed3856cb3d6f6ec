use axum::{extract::State, routing::post, Router};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    cash_records::{
        dto::{
            AddCashRecordRequest, CashPaymentMethodTotal, CashRecordDto, CashRecordFilter,
            CashRecordStats, CashStatsRequest, UpdateCashRecordRequest,
        },
        repo::{self, CashStatsWindow, NewCashRecord},
    },
    error::ApiError,
    response::{ApiJson, ApiResponse, Page, SearchRequest},
    state::AppState,
    types::{CashMethod, IdRequest},
};

pub fn cash_record_routes() -> Router<AppState> {
    Router::new()
        .route("/addCashRecord", post(add_cash_record))
        .route("/searchCashRecords", post(search_cash_records))
        .route("/searchCashRecord", post(get_cash_record))
        .route("/updateCashRecord", post(update_cash_record))
        .route("/deleteCashRecord", post(delete_cash_record))
        .route("/statsCashRecord", post(cash_record_stats))
}

fn check_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::Validation("Amount cannot be negative".into()));
    }
    Ok(amount)
}

/// Split grouped sums into (in, out, net). Missing directions read as zero.
fn cash_totals(rows: &[(CashMethod, f64)]) -> (f64, f64, f64) {
    let total_in = rows
        .iter()
        .find(|(m, _)| *m == CashMethod::CashIn)
        .map(|(_, t)| *t)
        .unwrap_or(0.0);
    let total_out = rows
        .iter()
        .find(|(m, _)| *m == CashMethod::CashOut)
        .map(|(_, t)| *t)
        .unwrap_or(0.0);
    (total_in, total_out, total_in - total_out)
}

#[instrument(skip(state, payload))]
pub async fn add_cash_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<AddCashRecordRequest>,
) -> Result<ApiResponse<CashRecordDto>, ApiError> {
    let amount = check_amount(
        payload
            .amount
            .ok_or_else(|| ApiError::Validation("Please provide an amount".into()))?,
    )?;
    let payment_method = payload
        .payment_method
        .ok_or_else(|| ApiError::Validation("Please provide a payment method".into()))?;
    let cash_method = payload.cash_method.ok_or_else(|| {
        ApiError::Validation("Please specify cash method (cashIn or cashOut)".into())
    })?;
    let account_id = payload
        .account_id
        .ok_or_else(|| ApiError::Validation("Please provide an account ID".into()))?;

    let record = repo::create(
        &state.db,
        NewCashRecord {
            amount,
            date: payload.date,
            payment_method,
            description: payload.description,
            proof_url: payload.proof_url,
            cash_method,
            account_id,
            user_id,
        },
    )
    .await?;

    info!(record_id = %record.id, user_id = %user_id, "cash record created");
    Ok(ApiResponse::created(
        "Cash record added successfully",
        record.into(),
    ))
}

#[instrument(skip(state, body))]
pub async fn search_cash_records(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(body): ApiJson<SearchRequest<CashRecordFilter>>,
) -> Result<ApiResponse<Page<CashRecordDto>>, ApiError> {
    let filter = body.search.unwrap_or_default();
    let (rows, total) = repo::search(&state.db, &filter, &body.params).await?;
    let docs = rows.into_iter().map(CashRecordDto::from).collect();
    Ok(ApiResponse::ok(Page::new(docs, total, &body.params)))
}

#[instrument(skip(state))]
pub async fn get_cash_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<CashRecordDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Cash record ID is required".into()))?;

    let record = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cash record not found".into()))?;
    Ok(ApiResponse::ok(record.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_cash_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateCashRecordRequest>,
) -> Result<ApiResponse<CashRecordDto>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Cash record ID is required".into()))?;

    let mut record = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cash record not found".into()))?;

    if let Some(amount) = payload.amount {
        record.amount = check_amount(amount)?;
    }
    if let Some(date) = payload.date {
        record.date = date;
    }
    if let Some(method) = payload.payment_method {
        record.payment_method = method;
    }
    if let Some(description) = payload.description {
        record.description = Some(description);
    }
    if let Some(proof_url) = payload.proof_url {
        record.proof_url = Some(proof_url);
    }
    if let Some(cash_method) = payload.cash_method {
        record.cash_method = cash_method;
    }
    if let Some(account_id) = payload.account_id {
        record.account_id = account_id;
    }

    if !repo::update(&state.db, &record).await? {
        return Err(ApiError::NotFound("Cash record not found".into()));
    }
    let updated = repo::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cash record not found".into()))?;

    info!(record_id = %id, user_id = %user_id, "cash record updated");
    Ok(ApiResponse {
        success: true,
        status_code: 200,
        message: Some("Cash record updated successfully".into()),
        data: Some(updated.into()),
    })
}

#[instrument(skip(state))]
pub async fn delete_cash_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<IdRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Cash record ID is required".into()))?;

    if !repo::delete_owned(&state.db, id, user_id).await? {
        return Err(ApiError::NotFound("Cash record not found".into()));
    }

    info!(record_id = %id, user_id = %user_id, "cash record deleted");
    Ok(ApiResponse::message("Cash record deleted successfully"))
}

#[instrument(skip(state, payload))]
pub async fn cash_record_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CashStatsRequest>,
) -> Result<ApiResponse<CashRecordStats>, ApiError> {
    let scope = payload.search.unwrap_or_default();
    let window = CashStatsWindow {
        user_id: scope.user_id.unwrap_or(user_id),
        account_id: scope.account_id,
        start: payload.start_date,
        end: payload.end_date,
    };

    let total_records = repo::stats_count(&state.db, &window).await?;
    let by_cash_method = repo::stats_by_cash_method(&state.db, &window).await?;
    let (total_in, total_out, net_balance) = cash_totals(&by_cash_method);
    let by_payment_method = repo::stats_by_payment_method(&state.db, &window)
        .await?
        .into_iter()
        .map(|(payment_method, total, count)| CashPaymentMethodTotal {
            payment_method,
            total,
            count,
        })
        .collect();

    Ok(ApiResponse::ok(CashRecordStats {
        total_records,
        total_in,
        total_out,
        net_balance,
        by_payment_method,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_balance_is_in_minus_out() {
        let rows = vec![(CashMethod::CashIn, 1500.0), (CashMethod::CashOut, 400.5)];
        let (total_in, total_out, net) = cash_totals(&rows);
        assert_eq!(total_in, 1500.0);
        assert_eq!(total_out, 400.5);
        assert_eq!(net, 1099.5);
    }

    #[test]
    fn missing_directions_read_as_zero() {
        let (total_in, total_out, net) = cash_totals(&[]);
        assert_eq!((total_in, total_out, net), (0.0, 0.0, 0.0));

        let only_out = vec![(CashMethod::CashOut, 75.0)];
        let (total_in, total_out, net) = cash_totals(&only_out);
        assert_eq!(total_in, 0.0);
        assert_eq!(total_out, 75.0);
        assert_eq!(net, -75.0);
    }

    #[test]
    fn stats_request_takes_epoch_millis_bounds() {
        let body: CashStatsRequest =
            serde_json::from_str(r#"{"startDate":1700000000000,"endDate":1700086400000}"#).unwrap();
        assert_eq!(body.start_date, Some(1_700_000_000_000));
        assert_eq!(body.end_date, Some(1_700_086_400_000));
    }
}

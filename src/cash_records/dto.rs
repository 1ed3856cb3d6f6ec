use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cash_records::repo::CashRecordExpanded;
use crate::types::{AccountSummary, CashMethod, OwnerSummary, PaymentMethod};

/// All cash record timestamps travel as epoch milliseconds, unlike expense
/// dates which are calendar timestamps.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCashRecordRequest {
    pub amount: Option<f64>,
    pub date: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub cash_method: Option<CashMethod>,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCashRecordRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
    pub amount: Option<f64>,
    pub date: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub cash_method: Option<CashMethod>,
    pub account_id: Option<Uuid>,
}

/// Allow-listed search keys for cash record queries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRecordFilter {
    pub user_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub cash_method: Option<CashMethod>,
    pub payment_method: Option<PaymentMethod>,
}

/// Wire shape of a cash record, owner and account expanded to summaries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRecordDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub amount: f64,
    pub date: i64,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub cash_method: CashMethod,
    #[serde(rename = "accountId")]
    pub account: AccountSummary,
    #[serde(rename = "userId")]
    pub user: OwnerSummary,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<CashRecordExpanded> for CashRecordDto {
    fn from(r: CashRecordExpanded) -> Self {
        Self {
            id: r.id,
            amount: r.amount,
            date: r.date,
            payment_method: r.payment_method,
            description: r.description,
            proof_url: r.proof_url,
            cash_method: r.cash_method,
            account: AccountSummary {
                id: r.account_id,
                account_name: r.account_name,
                status: r.account_status,
            },
            user: OwnerSummary {
                id: r.user_id,
                name: r.user_name,
                email: r.user_email,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashStatsScope {
    pub user_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashStatsRequest {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub search: Option<CashStatsScope>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRecordStats {
    pub total_records: i64,
    pub total_in: f64,
    pub total_out: f64,
    pub net_balance: f64,
    pub by_payment_method: Vec<CashPaymentMethodTotal>,
}

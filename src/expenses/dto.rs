use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::expenses::repo::ExpenseWithOwner;
use crate::types::{OwnerSummary, PaymentMethod, Reimbursement};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub reimbursement: Option<Reimbursement>,
    pub description: Option<String>,
    pub proof_url: Option<String>,
}

/// Partial update; unset fields keep their stored values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub amount: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub reimbursement: Option<Reimbursement>,
    pub description: Option<String>,
    pub proof_url: Option<String>,
}

/// Allow-listed search keys for expense queries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilter {
    pub user_id: Option<Uuid>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub reimbursement: Option<Reimbursement>,
    pub title: Option<String>,
}

/// Wire shape of an expense, with the owner expanded to a summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub reimbursement: Reimbursement,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    #[serde(rename = "userId")]
    pub user: OwnerSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ExpenseWithOwner> for ExpenseDto {
    fn from(e: ExpenseWithOwner) -> Self {
        Self {
            id: e.id,
            title: e.title,
            amount: e.amount,
            date: e.date,
            category: e.category,
            payment_method: e.payment_method,
            reimbursement: e.reimbursement,
            description: e.description,
            proof_url: e.proof_url,
            user: OwnerSummary {
                id: e.user_id,
                name: e.user_name,
                email: e.user_email,
            },
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsScope {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatsRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub search: Option<StatsScope>,
}

#[derive(Debug, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ReimbursementTotal {
    pub reimbursement: Reimbursement,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStats {
    pub total_expenses: i64,
    pub total_amount: f64,
    pub by_category: Vec<CategoryTotal>,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub by_reimbursement: Vec<ReimbursementTotal>,
}

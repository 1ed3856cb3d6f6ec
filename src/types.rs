use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of payment methods shared by expenses and cash records. Wire
/// and database labels both keep the display spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[serde(rename = "Cash")]
    #[sqlx(rename = "Cash")]
    Cash,
    #[serde(rename = "Credit Card")]
    #[sqlx(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    #[sqlx(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "UPI")]
    #[sqlx(rename = "UPI")]
    Upi,
    #[serde(rename = "Bank Transfer")]
    #[sqlx(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Other")]
    #[sqlx(rename = "Other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reimbursement")]
pub enum Reimbursement {
    #[serde(rename = "Yes")]
    #[sqlx(rename = "Yes")]
    Yes,
    #[serde(rename = "No")]
    #[sqlx(rename = "No")]
    No,
}

impl Default for Reimbursement {
    fn default() -> Self {
        Reimbursement::No
    }
}

/// Whether a ledger entry increases or decreases an account's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cash_method")]
pub enum CashMethod {
    #[serde(rename = "cashIn")]
    #[sqlx(rename = "cashIn")]
    CashIn,
    #[serde(rename = "cashOut")]
    #[sqlx(rename = "cashOut")]
    CashOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_status")]
pub enum RoleStatus {
    #[serde(rename = "active")]
    #[sqlx(rename = "active")]
    Active,
    #[serde(rename = "inactive")]
    #[sqlx(rename = "inactive")]
    Inactive,
    #[serde(rename = "suspended")]
    #[sqlx(rename = "suspended")]
    Suspended,
}

impl Default for RoleStatus {
    fn default() -> Self {
        RoleStatus::Active
    }
}

/// Body shape shared by every fetch/update/delete-by-id endpoint. The id is
/// optional so a missing `_id` can surface as a 400 instead of a parse error.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
}

/// Display-friendly owner expansion embedded in expense and cash record
/// responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Display-friendly account expansion for cash record responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub account_name: String,
    pub status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_keeps_display_spelling() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"Bank Transfer\""
        );
        let parsed: PaymentMethod = serde_json::from_str("\"UPI\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Upi);
        assert!(serde_json::from_str::<PaymentMethod>("\"Bitcoin\"").is_err());
    }

    #[test]
    fn cash_method_labels() {
        assert_eq!(
            serde_json::to_string(&CashMethod::CashIn).unwrap(),
            "\"cashIn\""
        );
        let parsed: CashMethod = serde_json::from_str("\"cashOut\"").unwrap();
        assert_eq!(parsed, CashMethod::CashOut);
    }
}

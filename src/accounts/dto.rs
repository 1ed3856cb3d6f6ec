use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo::Account;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAccountRequest {
    pub account_name: Option<String>,
    pub status: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
    pub account_name: Option<String>,
    pub status: Option<bool>,
}

/// Allow-listed search keys: name is a case-insensitive substring match,
/// status an exact match.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFilter {
    pub account_name: Option<String>,
    pub status: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub account_name: String,
    pub status: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Account> for AccountDto {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            account_name: a.account_name,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

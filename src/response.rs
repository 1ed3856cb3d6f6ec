use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ApiError;

/// JSON body extractor that reports malformed input through the normalized
/// 400 envelope instead of axum's default rejection body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Success envelope: `{success:true, statusCode, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            status_code: 200,
            message: None,
            data: Some(data),
        }
    }

    pub fn created(message: &str, data: T) -> Self {
        Self {
            success: true,
            status_code: 201,
            message: Some(message.to_string()),
            data: Some(data),
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            status_code: 200,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Pagination controls shared by every search endpoint. Sort maps JSON field
/// names to 1 (ascending) or -1 (descending), mirroring the client contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
    pub sort: Option<HashMap<String, i64>>,
}

/// Ceilings keep `offset()` well inside i64 range no matter what the client
/// sends.
const MAX_PAGE: i64 = 1_000_000;
const MAX_LIMIT: i64 = 100;

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            sort: None,
        }
    }
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// Build an ORDER BY clause from the allow-list of (json name, column)
    /// pairs. Unknown fields are dropped; with none left the default wins.
    pub fn order_by(&self, allowed: &[(&str, &str)], default: &str) -> String {
        let mut clauses = Vec::new();
        if let Some(sort) = &self.sort {
            for (name, column) in allowed {
                if let Some(dir) = sort.get(*name) {
                    let dir = if *dir < 0 { "DESC" } else { "ASC" };
                    clauses.push(format!("{column} {dir}"));
                }
            }
        }
        if clauses.is_empty() {
            default.to_string()
        } else {
            clauses.join(", ")
        }
    }
}

/// Body shape of every search endpoint: pagination controls plus an
/// entity-specific allow-listed filter.
#[derive(Debug, Deserialize)]
pub struct SearchRequest<F> {
    #[serde(flatten)]
    pub params: PageParams,
    pub search: Option<F>,
}

/// One page of results plus total-count metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub limit: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: i64, params: &PageParams) -> Self {
        let limit = params.limit();
        let page = params.page();
        let total_pages = (total_docs + limit - 1) / limit;
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_prev_page: page > 1,
            has_next_page: page < total_pages,
        }
    }
}

/// Escape `%`, `_` and `\` so user input only ever matches literally inside
/// an ILIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_to_first_page_of_ten() {
        let params: PageParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn page_params_clamp_to_one() {
        let params: PageParams = serde_json::from_str(r#"{"page":0,"limit":-5}"#).unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn huge_page_and_limit_cannot_overflow_offset() {
        let params: PageParams = serde_json::from_str(&format!(
            r#"{{"page":{max},"limit":{max}}}"#,
            max = i64::MAX
        ))
        .unwrap();
        assert_eq!(params.page(), MAX_PAGE);
        assert_eq!(params.limit(), MAX_LIMIT);
        assert_eq!(params.offset(), (MAX_PAGE - 1) * MAX_LIMIT);
        assert!(params.offset() > 0);
    }

    #[test]
    fn page_metadata() {
        let params: PageParams = serde_json::from_str(r#"{"page":2,"limit":10}"#).unwrap();
        let page = Page::new(vec![1, 2, 3], 23, &params);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page);
        assert!(page.has_next_page);

        let empty: Page<i64> = Page::new(vec![], 0, &PageParams::default());
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev_page);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn order_by_respects_allow_list() {
        let params: PageParams =
            serde_json::from_str(r#"{"sort":{"createdAt":-1,"bogus; DROP TABLE":1}}"#).unwrap();
        let order = params.order_by(&[("createdAt", "created_at")], "created_at DESC");
        assert_eq!(order, "created_at DESC");

        let none = PageParams::default().order_by(&[("createdAt", "created_at")], "date ASC");
        assert_eq!(none, "date ASC");
    }

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::created("Expense added successfully", 1))
            .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["statusCode"], 201);
        assert_eq!(json["message"], "Expense added successfully");
        assert_eq!(json["data"], 1);
    }
}

use axum::{
    extract::{DefaultBodyLimit, Host, Multipart, Path, State},
    http::HeaderMap,
    routing::{delete, post},
    Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    response::ApiResponse,
    state::AppState,
    storage::is_safe_filename,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/upload/:filename", delete(delete_file))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub mimetype: String,
}

/// Keep only the extension of the client-supplied name; the stored name is
/// always a fresh UUID so uploads can never collide or traverse.
fn stored_name(original: &str) -> String {
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => Uuid::new_v4().to_string(),
    }
}

fn request_scheme(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
}

#[instrument(skip(state, headers, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Host(host): Host,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if body.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".into()));
        }

        let filename = stored_name(&original_name);
        let size = body.len();
        state
            .storage
            .put_object(&filename, body)
            .await
            .map_err(ApiError::Internal)?;

        let url = format!("{}://{}/uploads/{}", request_scheme(&headers), host, filename);
        info!(user_id = %user_id, %filename, size, "file uploaded");
        return Ok(ApiResponse::created(
            "File uploaded successfully",
            UploadedFile {
                url,
                filename,
                original_name,
                size,
                mimetype,
            },
        ));
    }

    Err(ApiError::Validation("No file uploaded".into()))
}

#[instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(filename): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    if !is_safe_filename(&filename) {
        return Err(ApiError::Validation("Invalid filename".into()));
    }

    let removed = state
        .storage
        .delete_object(&filename)
        .await
        .map_err(ApiError::Internal)?;
    if !removed {
        return Err(ApiError::NotFound("File not found".into()));
    }

    info!(user_id = %user_id, %filename, "file deleted");
    Ok(ApiResponse::message("File deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_keeps_only_a_clean_extension() {
        let name = stored_name("receipt.PNG");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + 4);

        let name = stored_name("../../etc/passwd");
        assert!(is_safe_filename(&name));

        let name = stored_name("archive.tar.gz");
        assert!(name.ends_with(".gz"));
    }

    #[test]
    fn stored_name_without_extension_is_bare_uuid() {
        let name = stored_name("README");
        assert_eq!(name.len(), 36);
        assert!(Uuid::parse_str(&name).is_ok());
    }

    #[test]
    fn scheme_falls_back_to_http() {
        let headers = HeaderMap::new();
        assert_eq!(request_scheme(&headers), "http");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(request_scheme(&headers), "https");
    }
}

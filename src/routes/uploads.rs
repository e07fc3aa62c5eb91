use std::path::Path as FsPath;

use axum::{Json, Router, extract::Multipart, extract::State};
use serde::Serialize;
use tower_http::services::ServeDir;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    state::AppState,
};

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Serialize, ToSchema)]
pub struct UploadedFile {
    pub url: String,
}

// POST / accepts new files; anything else under the prefix falls through to
// static serving of the upload directory.
pub fn router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(upload_image))
        .fallback_service(ServeDir::new(&config.upload_dir))
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored, public URL returned", body = ApiResponse<UploadedFile>),
        (status = 400, description = "Missing file field or unsupported extension"),
    ),
    security(("bearer_auth" = [])),
    tag = "Uploads"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    _user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadedFile>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let extension = FsPath::new(&original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| AppError::BadRequest("File has no extension".into()))?;

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Unsupported file type: .{extension}"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let dir = FsPath::new(&state.config.upload_dir);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| AppError::Internal(err.into()))?;
        tokio::fs::write(dir.join(&file_name), &bytes)
            .await
            .map_err(|err| AppError::Internal(err.into()))?;

        let uploaded = UploadedFile {
            url: format!("/uploads/{file_name}"),
        };
        return Ok(Json(ApiResponse::success("Uploaded", uploaded, None)));
    }

    Err(AppError::BadRequest("Missing 'file' field".into()))
}

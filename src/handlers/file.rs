use axum::{body::Bytes, extract::State, Json};
use serde::de::DeserializeOwned;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{
    CreateFileRequest, DeleteFileRequest, FileRecord, FileResponse, GetFileRequest,
    ListFilesRequest,
};
use crate::services::{DeleteOutcome, FileService};
use crate::AppState;

const MISSING_FILE_NAME: &str = "Please make sure to provide file_name!";
const MISSING_CREATE_FIELDS: &str = "Please make sure to provide file_type and file_size!";
const FALLBACK_MESSAGE: &str = "It is working fine";

/// Parse a JSON body. Clients may omit the body and the content type.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Get one file with a download URL
/// GET /get {"file_name"}
pub async fn get_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<FileResponse>>> {
    let req: GetFileRequest = parse_body(&body)?;
    let file_name = req
        .into_file_name()
        .ok_or_else(|| AppError::BadRequest(MISSING_FILE_NAME.to_string()))?;

    let file = FileService::get_file(&state.db, state.storage.as_ref(), &file_name).await?;
    Ok(Json(ApiResponse::from_option(file)))
}

/// List all files, oldest first
/// GET /list
pub async fn list_files(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>> {
    let _: ListFilesRequest = parse_body(&body)?;

    let files = FileService::list_files(&state.db, state.storage.as_ref()).await?;
    Ok(Json(ApiResponse::success(files)))
}

/// Register a file and hand back an upload URL
/// POST /create {"file_size", "file_type"}
pub async fn create_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<String>>> {
    let req: CreateFileRequest = parse_body(&body)?;
    let new_file = req
        .into_new_file()
        .ok_or_else(|| AppError::BadRequest(MISSING_CREATE_FIELDS.to_string()))?;

    let url = FileService::create_file(&state.db, state.storage.as_ref(), new_file).await?;
    Ok(Json(ApiResponse::from_option(url)))
}

/// Delete a file and its object
/// DELETE /delete {"file_name"}
pub async fn delete_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<FileRecord>>> {
    let req: DeleteFileRequest = parse_body(&body)?;
    let file_name = req
        .into_file_name()
        .ok_or_else(|| AppError::BadRequest(MISSING_FILE_NAME.to_string()))?;

    match FileService::delete_file(&state.db, state.storage.as_ref(), &file_name).await? {
        DeleteOutcome::Deleted(file) => Ok(Json(ApiResponse::success(file))),
        DeleteOutcome::NotFound => Ok(Json(ApiResponse::from_option(None))),
        DeleteOutcome::PartiallyDeleted(file) => Err(AppError::PartialDelete(file.file_name)),
    }
}

/// Any other path or method
pub async fn fallback() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success(FALLBACK_MESSAGE))
}

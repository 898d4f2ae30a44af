use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File metadata record
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct FileRecord {
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// File record with a presigned download link
#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

impl FileResponse {
    pub fn new(file: FileRecord, url: String) -> Self {
        Self {
            file_name: file.file_name,
            created_at: file.created_at,
            url,
        }
    }
}

/// Body of `GET /get` and `DELETE /delete`
#[derive(Debug, Default, Deserialize)]
pub struct FileNameRequest {
    pub file_name: Option<String>,
}

pub type GetFileRequest = FileNameRequest;
pub type DeleteFileRequest = FileNameRequest;

impl FileNameRequest {
    /// The requested key, or `None` when it is absent or empty
    pub fn into_file_name(self) -> Option<String> {
        self.file_name.filter(|name| !name.is_empty())
    }
}

/// Body of `GET /list`. It carries no fields, but it still has to be JSON.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesRequest {}

/// Body of `POST /create`
#[derive(Debug, Default, Deserialize)]
pub struct CreateFileRequest {
    pub file_size: Option<u64>,
    pub file_type: Option<String>,
}

impl CreateFileRequest {
    /// Both fields must be present, with a non-zero size and a non-empty type
    pub fn into_new_file(self) -> Option<NewFile> {
        let file_size = self.file_size.filter(|size| *size > 0)?;
        let file_type = self.file_type.filter(|ty| !ty.is_empty())?;
        Some(NewFile {
            file_size,
            file_type,
        })
    }
}

/// Validated upload announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub file_size: u64,
    pub file_type: String,
}

impl NewFile {
    /// Everything after the last `/` of the content type.
    ///
    /// Only right for plain `type/subtype` values: `text/plain; charset=utf-8`
    /// yields `plain; charset=utf-8`.
    pub fn extension(&self) -> &str {
        self.file_type.rsplit('/').next().unwrap_or_default()
    }
}

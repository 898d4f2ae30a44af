use chrono::Utc;
use std::time::Duration;

use crate::db::Database;
use crate::error::Result;
use crate::models::{FileRecord, FileResponse, NewFile};
use crate::storage::BlobStore;

/// Lifetime of a presigned upload URL
const UPLOAD_URL_EXPIRES: Duration = Duration::from_secs(60);

/// Lifetime of a presigned download URL
const DOWNLOAD_URL_EXPIRES: Duration = Duration::from_secs(24 * 3600);

const FILE_ID_LENGTH: usize = 10;

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Object and record are both gone
    Deleted(FileRecord),
    /// No record with that name; the blob store was not touched
    NotFound,
    /// The object was deleted but removing the record failed
    PartiallyDeleted(FileRecord),
}

/// File service
pub struct FileService;

impl FileService {
    /// Get one file with a download URL, `None` if there is no such record
    pub async fn get_file(
        db: &Database,
        storage: &dyn BlobStore,
        file_name: &str,
    ) -> Result<Option<FileResponse>> {
        match Self::find_one(db, file_name).await? {
            Some(file) => Ok(Some(Self::with_download_url(storage, file).await?)),
            None => Ok(None),
        }
    }

    /// List every file, oldest first
    pub async fn list_files(db: &Database, storage: &dyn BlobStore) -> Result<Vec<FileResponse>> {
        let mut files = Self::find_all(db).await?;
        // sort_by is stable: equal timestamps keep store order
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut result = Vec::with_capacity(files.len());
        for file in files {
            result.push(Self::with_download_url(storage, file).await?);
        }
        Ok(result)
    }

    /// Record a new file and return a URL the client can upload it to.
    ///
    /// Returns `None` when the record could not be inserted. The upload
    /// itself happens later, outside this service.
    pub async fn create_file(
        db: &Database,
        storage: &dyn BlobStore,
        new_file: NewFile,
    ) -> Result<Option<String>> {
        let pool = db.pool().await?;
        let file = FileRecord {
            file_name: Self::generate_file_name(&new_file),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query("INSERT INTO files (file_name, created_at) VALUES (?, ?)")
            .bind(&file.file_name)
            .bind(file.created_at)
            .execute(pool)
            .await;
        if let Err(e) = inserted {
            tracing::error!("Failed to insert file {}: {:?}", file.file_name, e);
            return Ok(None);
        }

        let url = storage
            .upload_url(
                &file.file_name,
                &new_file.file_type,
                new_file.file_size,
                UPLOAD_URL_EXPIRES,
            )
            .await?;

        tracing::info!(
            "Created file {} ({} bytes, {})",
            file.file_name,
            new_file.file_size,
            new_file.file_type
        );
        Ok(Some(url))
    }

    /// Delete the object, then its record
    pub async fn delete_file(
        db: &Database,
        storage: &dyn BlobStore,
        file_name: &str,
    ) -> Result<DeleteOutcome> {
        let Some(file) = Self::find_one(db, file_name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        storage.delete(&file.file_name).await?;

        match Self::remove(db, &file.file_name).await {
            Ok(removed) => {
                if removed == 0 {
                    tracing::debug!("Record {} was already removed", file.file_name);
                }
                tracing::info!("Deleted file {} from {}", file.file_name, storage.storage_type());
                Ok(DeleteOutcome::Deleted(file))
            }
            Err(e) => {
                tracing::error!(
                    "Object {} deleted but its record was not: {:?}",
                    file.file_name,
                    e
                );
                Ok(DeleteOutcome::PartiallyDeleted(file))
            }
        }
    }

    async fn find_one(db: &Database, file_name: &str) -> Result<Option<FileRecord>> {
        let file: Option<FileRecord> =
            sqlx::query_as("SELECT file_name, created_at FROM files WHERE file_name = ?")
                .bind(file_name)
                .fetch_optional(db.pool().await?)
                .await?;
        Ok(file)
    }

    async fn find_all(db: &Database) -> Result<Vec<FileRecord>> {
        let files: Vec<FileRecord> =
            sqlx::query_as("SELECT file_name, created_at FROM files ORDER BY rowid")
                .fetch_all(db.pool().await?)
                .await?;
        Ok(files)
    }

    /// Rows removed. Zero means someone else removed the record first.
    async fn remove(db: &Database, file_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM files WHERE file_name = ?")
            .bind(file_name)
            .execute(db.pool().await?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn with_download_url(storage: &dyn BlobStore, file: FileRecord) -> Result<FileResponse> {
        let url = storage
            .download_url(&file.file_name, DOWNLOAD_URL_EXPIRES)
            .await?;
        Ok(FileResponse::new(file, url))
    }

    /// `<random id>.<extension>`
    fn generate_file_name(new_file: &NewFile) -> String {
        format!(
            "{}.{}",
            nanoid::nanoid!(FILE_ID_LENGTH),
            new_file.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_database;
    use crate::error::AppError;
    use crate::storage::memory::MemoryStorage;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};

    fn png(file_size: u64) -> NewFile {
        NewFile {
            file_size,
            file_type: "image/png".to_string(),
        }
    }

    async fn insert(db: &Database, file_name: &str, created_at: DateTime<Utc>) {
        sqlx::query("INSERT INTO files (file_name, created_at) VALUES (?, ?)")
            .bind(file_name)
            .bind(created_at)
            .execute(db.pool().await.unwrap())
            .await
            .unwrap();
    }

    fn key_from_upload_url(url: &str) -> String {
        url.trim_start_matches("memory://upload/")
            .split('?')
            .next()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let db = memory_database();
        let storage = MemoryStorage::default();

        let url = FileService::create_file(&db, &storage, png(1024))
            .await
            .unwrap()
            .unwrap();
        assert!(url.contains("content-type=image/png"));
        assert!(url.contains("content-length=1024"));
        assert!(url.contains("expires=60"));

        let key = key_from_upload_url(&url);
        assert!(key.ends_with(".png"));
        assert_eq!(key.len(), FILE_ID_LENGTH + ".png".len());

        let stored = FileService::find_one(&db, &key).await.unwrap().unwrap();
        let file = FileService::get_file(&db, &storage, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.file_name, stored.file_name);
        assert_eq!(file.created_at, stored.created_at);
        assert_eq!(file.url, format!("memory://download/{}?expires=86400", key));
    }

    #[tokio::test]
    async fn test_extension_follows_file_type() {
        let db = memory_database();
        let storage = MemoryStorage::default();

        for (file_type, ext) in [("video/mp4", ".mp4"), ("application/pdf", ".pdf")] {
            let new_file = NewFile {
                file_size: 1,
                file_type: file_type.to_string(),
            };
            let url = FileService::create_file(&db, &storage, new_file)
                .await
                .unwrap()
                .unwrap();
            assert!(key_from_upload_url(&url).ends_with(ext));
        }
    }

    #[tokio::test]
    async fn test_get_missing_file() {
        let db = memory_database();
        let storage = MemoryStorage::default();

        let file = FileService::get_file(&db, &storage, "nope.png").await.unwrap();
        assert!(file.is_none());
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_created_at() {
        let db = memory_database();
        let storage = MemoryStorage::default();

        assert!(FileService::list_files(&db, &storage).await.unwrap().is_empty());

        let t = |secs: i64| Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        insert(&db, "c.png", t(30)).await;
        insert(&db, "a.png", t(10)).await;
        insert(&db, "tie-1.png", t(20)).await;
        insert(&db, "tie-2.png", t(20)).await;

        let files = FileService::list_files(&db, &storage).await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["a.png", "tie-1.png", "tie-2.png", "c.png"]);
        assert!(files.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert!(files.iter().all(|f| !f.url.is_empty()));
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_record() {
        let db = memory_database();
        let storage = MemoryStorage::default();
        insert(&db, "a.png", Utc::now()).await;
        storage.put("a.png");

        let outcome = FileService::delete_file(&db, &storage, "a.png").await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(ref f) if f.file_name == "a.png"));

        assert!(!storage.exists("a.png").await.unwrap());
        assert!(FileService::get_file(&db, &storage, "a.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_file_skips_blob_store() {
        let db = memory_database();
        let storage = MemoryStorage::default();

        let outcome = FileService::delete_file(&db, &storage, "nope.png").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_blob_delete_keeps_record() {
        let db = memory_database();
        let storage = MemoryStorage::default();
        insert(&db, "a.png", Utc::now()).await;
        storage.fail_deletes();

        let err = FileService::delete_file(&db, &storage, "a.png").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(FileService::find_one(&db, "a.png").await.unwrap().is_some());
    }

    /// Runs a statement against the metadata store while "deleting" the object
    struct SqlOnDeleteStorage {
        db: Database,
        sql: &'static str,
    }

    #[async_trait]
    impl BlobStore for SqlOnDeleteStorage {
        async fn delete(&self, _key: &str) -> Result<()> {
            sqlx::query(self.sql)
                .execute(self.db.pool().await?)
                .await?;
            Ok(())
        }

        async fn exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }

        async fn upload_url(&self, _: &str, _: &str, _: u64, _: Duration) -> Result<String> {
            Err(AppError::Internal("unused".to_string()))
        }

        async fn download_url(&self, _: &str, _: Duration) -> Result<String> {
            Err(AppError::Internal("unused".to_string()))
        }

        fn storage_type(&self) -> &'static str {
            "sql"
        }
    }

    #[tokio::test]
    async fn test_partial_delete_is_reported() {
        let db = memory_database();
        insert(&db, "a.png", Utc::now()).await;
        let storage = SqlOnDeleteStorage {
            db: db.clone(),
            sql: "DROP TABLE files",
        };

        let outcome = FileService::delete_file(&db, &storage, "a.png").await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::PartiallyDeleted(ref f) if f.file_name == "a.png"));
    }

    #[tokio::test]
    async fn test_delete_when_record_already_removed() {
        let db = memory_database();
        insert(&db, "a.png", Utc::now()).await;
        let storage = SqlOnDeleteStorage {
            db: db.clone(),
            sql: "DELETE FROM files",
        };

        let outcome = FileService::delete_file(&db, &storage, "a.png").await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(ref f) if f.file_name == "a.png"));
        assert_eq!(FileService::remove(&db, "a.png").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_returns_none_when_insert_fails() {
        let db = memory_database();
        let storage = MemoryStorage::default();
        sqlx::query("DROP TABLE files")
            .execute(db.pool().await.unwrap())
            .await
            .unwrap();

        let url = FileService::create_file(&db, &storage, png(10)).await.unwrap();
        assert!(url.is_none());
        assert!(storage.calls().is_empty());
    }
}

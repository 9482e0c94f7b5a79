//! Repository for media records.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::MediaRow;
use crate::models::media::encode_data;
use elpx_storage::{MediaData, MediaRecord};
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Reads and writes media records.
///
/// Only the metadata map is ever updated in place; filenames are fixed once a
/// record exists (replacing a file keeps its canonical name).
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_u64(id: u64) -> Result<i64> {
        i64::try_from(id).or_raise(|| ErrorKind::InvalidData("media id"))
    }

    /// Insert a new record and return it with its assigned id.
    pub async fn insert(&self, filename: &str, source: &str, data: &MediaData) -> Result<MediaRecord> {
        let row: MediaRow = sqlx::query_as(include_str!("../queries/insert_media.sql"))
            .bind(filename)
            .bind(source)
            .bind(encode_data(data)?)
            .bind(UtcDateTime::now().unix_timestamp())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let record = MediaRecord::try_from(row)?;
        tracing::debug!(media_id = record.id, filename, "Inserted media record");
        Ok(record)
    }

    pub async fn get(&self, id: u64) -> Result<Option<MediaRecord>> {
        let row: Option<MediaRow> = sqlx::query_as(include_str!("../queries/get_media.sql"))
            .bind(Self::sqlx_hates_u64(id)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(MediaRecord::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<MediaRecord>> {
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/list_media.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(MediaRecord::try_from).collect()
    }

    /// Persist the record's metadata map, replacing the stored one.
    pub async fn save_data(&self, record: &MediaRecord) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/update_media_data.sql"))
            .bind(Self::sqlx_hates_u64(record.id)?)
            .bind(encode_data(&record.data)?)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound(record.id));
        }
        Ok(())
    }

    /// Delete a record. Returns whether it existed.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_media.sql"))
            .bind(Self::sqlx_hates_u64(id)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let mut data = MediaData::new();
        data.insert("teacher_mode_visible".to_string(), "0".to_string());
        let inserted = repo.insert("a1.elpx", "Fractions.elpx", &data).await.unwrap();
        assert_eq!(inserted.filename, "a1.elpx");
        assert_eq!(inserted.data, data);

        let fetched = repo.get(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert!(repo.get(inserted.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filename_is_unique() {
        let repo = repo().await;
        repo.insert("a1.elpx", "One.elpx", &MediaData::new()).await.unwrap();
        let err = repo.insert("a1.elpx", "Two.elpx", &MediaData::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_save_data() {
        let repo = repo().await;
        let mut record = repo.insert("a1.elpx", "One.elpx", &MediaData::new()).await.unwrap();
        record.data.insert("has_preview".to_string(), "1".to_string());
        repo.save_data(&record).await.unwrap();
        assert_eq!(repo.get(record.id).await.unwrap().unwrap().data, record.data);
    }

    #[tokio::test]
    async fn test_save_data_missing_record() {
        let repo = repo().await;
        let record = MediaRecord::new(42, "gone.elpx", "gone.elpx");
        let err = repo.save_data(&record).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(42)));
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let repo = repo().await;
        let first = repo.insert("a1.elpx", "One.elpx", &MediaData::new()).await.unwrap();
        let second = repo.insert("b2.png", "Two.png", &MediaData::new()).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), vec![first.clone(), second.clone()]);

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());
        assert_eq!(repo.list().await.unwrap(), vec![second]);
        assert!(repo.get(first.id).await.unwrap().is_none());
    }
}

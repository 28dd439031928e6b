//! facescan-db — durable enrollment records.
//!
//! SQLite-backed [`ProfileRepository`]: remembers which enrollment images
//! belong to which user so the in-memory profile cache can be rebuilt after
//! a restart. Descriptors themselves are not persisted; they are
//! re-extracted from the recorded images during rehydration.

use async_trait::async_trait;
use chrono::Utc;
use facescan_engine::{ProfileRepository, RepositoryError};
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}

pub struct EnrollmentDb {
    conn: Connection,
}

impl EnrollmentDb {
    pub async fn open(path: &str) -> Result<Self, DbError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).await?;
        let db = Self { conn };
        db.init().await?;
        tracing::info!(path, "enrollment database opened");
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<(), DbError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS enrollments (
                         id TEXT PRIMARY KEY,
                         user_id TEXT NOT NULL,
                         image_ref TEXT NOT NULL,
                         created_at TEXT NOT NULL
                     );
                     CREATE INDEX IF NOT EXISTS idx_enrollments_user
                         ON enrollments(user_id);",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Replace the user's enrollment set in one transaction. Re-enrollment
    /// replaces the whole set, mirroring how profile installs behave.
    pub async fn save_enrollment(
        &self,
        user_id: &str,
        image_refs: &[String],
    ) -> Result<(), DbError> {
        let user_id = user_id.to_string();
        let refs = image_refs.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM enrollments WHERE user_id = ?1", [&user_id])?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO enrollments (id, user_id, image_ref, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )?;
                    let now = Utc::now().to_rfc3339();
                    for image_ref in &refs {
                        stmt.execute(rusqlite::params![
                            Uuid::new_v4().to_string(),
                            user_id,
                            image_ref,
                            now
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Delete the user's enrollment records, returning how many were removed.
    pub async fn forget(&self, user_id: &str) -> Result<usize, DbError> {
        let user_id = user_id.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let removed =
                    conn.execute("DELETE FROM enrollments WHERE user_id = ?1", [&user_id])?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }

    pub async fn count(&self, user_id: &str) -> Result<usize, DbError> {
        let user_id = user_id.to_string();
        let count = self
            .conn
            .call(move |conn| {
                let count: usize = conn.query_row(
                    "SELECT COUNT(*) FROM enrollments WHERE user_id = ?1",
                    [&user_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ProfileRepository for EnrollmentDb {
    async fn load_enrollment_images(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let user_id = user_id.to_string();
        let refs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT image_ref FROM enrollments WHERE user_id = ?1 ORDER BY rowid",
                )?;
                let rows = stmt.query_map([&user_id], |row| row.get::<_, String>(0))?;
                let mut refs = Vec::new();
                for row in rows {
                    refs.push(row?);
                }
                Ok(refs)
            })
            .await
            .map_err(|e| RepositoryError::Backend {
                reason: e.to_string(),
            })?;

        if refs.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_preserves_order() {
        let db = EnrollmentDb::open_in_memory().await.unwrap();
        let refs = vec![
            "front.jpg".to_string(),
            "left.jpg".to_string(),
            "right.jpg".to_string(),
        ];
        db.save_enrollment("alice", &refs).await.unwrap();

        let loaded = db.load_enrollment_images("alice").await.unwrap();
        assert_eq!(loaded, refs);
        assert_eq!(db.count("alice").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let db = EnrollmentDb::open_in_memory().await.unwrap();
        let err = db.load_enrollment_images("ghost").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_reenrollment_replaces_previous_set() {
        let db = EnrollmentDb::open_in_memory().await.unwrap();
        db.save_enrollment("alice", &["old-1.jpg".to_string(), "old-2.jpg".to_string()])
            .await
            .unwrap();
        db.save_enrollment("alice", &["new.jpg".to_string()])
            .await
            .unwrap();

        let loaded = db.load_enrollment_images("alice").await.unwrap();
        assert_eq!(loaded, vec!["new.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_forget() {
        let db = EnrollmentDb::open_in_memory().await.unwrap();
        db.save_enrollment("alice", &["a.jpg".to_string()])
            .await
            .unwrap();

        assert_eq!(db.forget("alice").await.unwrap(), 1);
        assert_eq!(db.forget("alice").await.unwrap(), 0);
        assert!(db.load_enrollment_images("alice").await.is_err());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let db = EnrollmentDb::open_in_memory().await.unwrap();
        db.save_enrollment("alice", &["a.jpg".to_string()])
            .await
            .unwrap();
        db.save_enrollment("bob", &["b.jpg".to_string()])
            .await
            .unwrap();

        db.forget("alice").await.unwrap();
        assert_eq!(
            db.load_enrollment_images("bob").await.unwrap(),
            vec!["b.jpg".to_string()]
        );
    }
}

use crate::models::{
    format_timestamp, parse_timestamp, CommentRecord, NewComment, NewPost, PostDetail,
    PostRecord, PostSummary, PostUpdate,
};
use crate::password::{BcryptHasher, PasswordHasher};
use crate::StoreError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS post (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        title         TEXT    NOT NULL,
        content       TEXT    NOT NULL,
        created_at    TEXT    NOT NULL,
        views         INTEGER NOT NULL DEFAULT 0,
        tags          TEXT,
        url           TEXT,
        thumbnail_url TEXT,
        password_hash TEXT    NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS comment (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id       INTEGER NOT NULL REFERENCES post(id) ON DELETE CASCADE,
        content       TEXT    NOT NULL,
        created_at    TEXT    NOT NULL,
        password_hash TEXT    NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_post_created_at ON post(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_comment_post ON comment(post_id, created_at)",
];

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.created_at, p.views, p.tags, p.url, p.thumbnail_url";

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
    hasher: Arc<dyn PasswordHasher>,
}

impl PostStore {
    pub fn new(pool: SqlitePool, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { pool, hasher }
    }

    /// Open (creating if needed) the database at `url` and make sure the
    /// schema exists. In-memory databases get a single connection so every
    /// query sees the same data.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_hasher(url, Arc::new(BcryptHasher::default())).await
    }

    pub async fn connect_with_hasher(
        url: &str,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool, hasher);
        store.init_schema().await?;
        info!(%url, max_connections, "store.connected");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent: safe to call on every startup.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // posts
    // ---------------------------------------------------------------

    /// All posts, newest first, with comment counts.
    pub async fn list_posts(&self) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, COUNT(c.id) AS comment_count
             FROM post p LEFT JOIN comment c ON c.post_id = p.id
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(summary_from_row).collect()
    }

    /// Fetch a post with its comments and count the view.
    pub async fn get_post(&self, id: i64) -> Result<PostDetail, StoreError> {
        let res = sqlx::query("UPDATE post SET views = views + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::PostNotFound);
        }

        let post = self.fetch_post(id).await?;
        let rows = sqlx::query(
            "SELECT id, post_id, content, created_at FROM comment
             WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(post_id = id, views = post.views, "store.post.read");
        Ok(PostDetail { post, comments })
    }

    pub async fn create_post(&self, new: NewPost) -> Result<PostRecord, StoreError> {
        let password_hash = self.hash(&new.password).await?;
        let tags = encode_tags(&new.tags)?;

        let res = sqlx::query(
            "INSERT INTO post (title, content, created_at, views, tags, url, thumbnail_url, password_hash)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7)",
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(format_timestamp(&Utc::now()))
        .bind(tags)
        .bind(&new.url)
        .bind(&new.thumbnail_url)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        let id = res.last_insert_rowid();
        info!(post_id = id, "store.post.created");
        self.fetch_post(id).await
    }

    pub async fn update_post(&self, id: i64, update: PostUpdate) -> Result<PostRecord, StoreError> {
        self.verify_post_password(id, &update.password).await?;
        let tags = encode_tags(&update.tags)?;

        sqlx::query(
            "UPDATE post SET title = ?1, content = ?2, tags = ?3, url = ?4, thumbnail_url = ?5
             WHERE id = ?6",
        )
        .bind(&update.title)
        .bind(&update.content)
        .bind(tags)
        .bind(&update.url)
        .bind(&update.thumbnail_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!(post_id = id, "store.post.updated");
        self.fetch_post(id).await
    }

    /// Delete a post and, with it, all of its comments.
    pub async fn delete_post(&self, id: i64, password: &str) -> Result<(), StoreError> {
        self.verify_post_password(id, password).await?;

        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM comment WHERE post_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM post WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(post_id = id, comments_removed = removed, "store.post.deleted");
        Ok(())
    }

    pub async fn verify_post_password(&self, id: i64, password: &str) -> Result<(), StoreError> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password_hash FROM post WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let hash = hash.ok_or(StoreError::PostNotFound)?;
        self.check_password(password, hash, StoreError::PasswordMismatch)
            .await
            .inspect_err(|e| {
                if matches!(e, StoreError::PasswordMismatch) {
                    warn!(post_id = id, "store.post.password_mismatch");
                }
            })
    }

    /// Posts created in `[start, end)`, newest first, with comment counts.
    pub async fn posts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, COUNT(c.id) AS comment_count
             FROM post p LEFT JOIN comment c ON c.post_id = p.id
             WHERE p.created_at >= ?1 AND p.created_at < ?2
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(format_timestamp(&start))
            .bind(format_timestamp(&end))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(summary_from_row).collect()
    }

    // ---------------------------------------------------------------
    // comments
    // ---------------------------------------------------------------

    pub async fn create_comment(&self, new: NewComment) -> Result<CommentRecord, StoreError> {
        self.ensure_post(new.post_id).await?;
        let password_hash = self.hash(&new.password).await?;

        let res = sqlx::query(
            "INSERT INTO comment (post_id, content, created_at, password_hash)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(new.post_id)
        .bind(&new.content)
        .bind(format_timestamp(&Utc::now()))
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        let id = res.last_insert_rowid();
        info!(comment_id = id, post_id = new.post_id, "store.comment.created");
        self.fetch_comment(id).await
    }

    pub async fn update_comment(
        &self,
        id: i64,
        password: Option<&str>,
        content: Option<&str>,
    ) -> Result<CommentRecord, StoreError> {
        let hash = self.comment_hash(id).await?;
        let (Some(password), Some(content)) = (non_empty(password), non_empty(content)) else {
            return Err(StoreError::MissingField("Password and content required"));
        };
        self.check_password(password, hash, StoreError::CommentPasswordMismatch)
            .await?;

        sqlx::query("UPDATE comment SET content = ?1 WHERE id = ?2")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(comment_id = id, "store.comment.updated");
        self.fetch_comment(id).await
    }

    pub async fn delete_comment(&self, id: i64, password: Option<&str>) -> Result<(), StoreError> {
        let hash = self.comment_hash(id).await?;
        let Some(password) = non_empty(password) else {
            return Err(StoreError::MissingField("Password required"));
        };
        self.check_password(password, hash, StoreError::CommentPasswordMismatch)
            .await?;

        sqlx::query("DELETE FROM comment WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!(comment_id = id, "store.comment.deleted");
        Ok(())
    }

    /// A page of a post's comments, oldest first.
    pub async fn list_comments(
        &self,
        post_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        self.ensure_post(post_id).await?;
        let rows = sqlx::query(
            "SELECT id, post_id, content, created_at FROM comment
             WHERE post_id = ?1 ORDER BY created_at ASC, id ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(post_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect()
    }

    // ---------------------------------------------------------------
    // helpers
    // ---------------------------------------------------------------

    async fn fetch_post(&self, id: i64) -> Result<PostRecord, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM post p WHERE p.id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::PostNotFound)?;
        post_from_row(&row)
    }

    async fn fetch_comment(&self, id: i64) -> Result<CommentRecord, StoreError> {
        let row = sqlx::query("SELECT id, post_id, content, created_at FROM comment WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::CommentNotFound)?;
        comment_from_row(&row)
    }

    async fn ensure_post(&self, id: i64) -> Result<(), StoreError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM post WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        exists.map(|_| ()).ok_or(StoreError::PostNotFound)
    }

    async fn comment_hash(&self, id: i64) -> Result<String, StoreError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM comment WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        hash.ok_or(StoreError::CommentNotFound)
    }

    // bcrypt is CPU-bound; keep it off the async workers.
    async fn hash(&self, password: &str) -> Result<String, StoreError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| StoreError::Hash(e.to_string()))?
    }

    async fn check_password(
        &self,
        password: &str,
        hash: String,
        mismatch: StoreError,
    ) -> Result<(), StoreError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| StoreError::Hash(e.to_string()))??;
        if matched {
            Ok(())
        } else {
            Err(mismatch)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn encode_tags(tags: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(tags).map_err(|e| StoreError::Corrupt(format!("tags: {e}")))
}

fn decode_tags(raw: Option<String>) -> Result<Vec<String>, StoreError> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) if text.is_empty() || text == "null" => Ok(Vec::new()),
        Some(text) => {
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(format!("tags: {e}")))
        }
    }
}

fn timestamp_from_row(row: &SqliteRow) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get("created_at")?;
    parse_timestamp(&raw).ok_or_else(|| StoreError::Corrupt(format!("created_at: {raw}")))
}

fn post_from_row(row: &SqliteRow) -> Result<PostRecord, StoreError> {
    Ok(PostRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: timestamp_from_row(row)?,
        views: row.try_get("views")?,
        tags: decode_tags(row.try_get("tags")?)?,
        url: row.try_get("url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<PostSummary, StoreError> {
    Ok(PostSummary {
        post: post_from_row(row)?,
        comment_count: row.try_get("comment_count")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<CommentRecord, StoreError> {
    Ok(CommentRecord {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        content: row.try_get("content")?,
        created_at: timestamp_from_row(row)?,
    })
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthorRepository;
use crate::error::{AppError, Result};
use crate::models::{AccountInfo, Author, AuthorSummary, NewAuthor, ProfileUpdate, SocialLinks};
use crate::query::escape_like;

const AUTHOR_COLUMNS: &str =
    "id, username, fullname, profile_img, bio, social_links, total_posts, total_reads, joined_at";

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: Uuid,
    username: String,
    fullname: String,
    profile_img: String,
    bio: String,
    social_links: Json<SocialLinks>,
    total_posts: i64,
    total_reads: i64,
    joined_at: DateTime<Utc>,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: row.id,
            username: row.username,
            fullname: row.fullname,
            profile_img: row.profile_img,
            bio: row.bio,
            social_links: row.social_links.0,
            account_info: AccountInfo {
                total_posts: row.total_posts,
                total_reads: row.total_reads,
            },
            joined_at: row.joined_at,
        }
    }
}

/// Repository for author accounts and their denormalized totals
#[derive(Clone)]
pub struct PgAuthorRepository {
    pool: PgPool,
}

impl PgAuthorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn bump(&self, column: &str, author_id: Uuid) -> Result<()> {
        let sql = format!(
            "UPDATE authors SET {column} = {column} + 1 WHERE id = $1",
            column = column
        );
        let result = sqlx::query(&sql).bind(author_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("author {}", author_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for PgAuthorRepository {
    async fn insert_author(&self, author: NewAuthor) -> Result<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            r#"
            INSERT INTO authors (id, username, fullname, profile_img, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(author.id)
        .bind(&author.username)
        .bind(&author.fullname)
        .bind(&author.profile_img)
        .bind(&author.bio)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_author(&self, author_id: Uuid) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "SELECT {} FROM authors WHERE id = $1",
            AUTHOR_COLUMNS
        ))
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Author::from))
    }

    async fn find_author_by_username(&self, username: &str) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "SELECT {} FROM authors WHERE username = $1",
            AUTHOR_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Author::from))
    }

    async fn search_authors(&self, query: &str, limit: i64) -> Result<Vec<AuthorSummary>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT username, fullname, profile_img
            FROM authors
            WHERE username ILIKE $1 ESCAPE '\'
            ORDER BY username
            LIMIT $2
            "#,
        )
        .bind(format!("%{}%", escape_like(query)))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, fullname, profile_img)| AuthorSummary {
                username,
                fullname,
                profile_img,
            })
            .collect())
    }

    async fn update_profile(&self, author_id: Uuid, update: ProfileUpdate) -> Result<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            r#"
            UPDATE authors
            SET username = $2,
                bio = $3,
                social_links = $4
            WHERE id = $1
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        ))
        .bind(author_id)
        .bind(&update.username)
        .bind(&update.bio)
        .bind(Json(&update.social_links))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Author::from)
            .ok_or_else(|| AppError::NotFound(format!("author {}", author_id)))
    }

    async fn increment_total_posts(&self, author_id: Uuid) -> Result<()> {
        self.bump("total_posts", author_id).await
    }

    async fn increment_total_reads(&self, author_id: Uuid) -> Result<()> {
        self.bump("total_reads", author_id).await
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PostRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Activity, AuthorSummary, LikeRecount, NewPost, Post, PostChanges, PostContent, PostState,
    PostUpdate,
};
use crate::query::{PostFilter, PostSort};

const POST_COLUMNS: &str = r#"
    p.id, p.slug, p.author_id, p.title, p.description, p.banner, p.content, p.tags, p.state,
    p.total_likes, p.total_reads, p.published_at, p.created_at, p.updated_at,
    a.username AS author_username, a.fullname AS author_fullname,
    a.profile_img AS author_profile_img
"#;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    slug: String,
    author_id: Uuid,
    title: String,
    description: String,
    banner: String,
    content: Json<PostContent>,
    tags: Vec<String>,
    state: PostState,
    total_likes: i64,
    total_reads: i64,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_username: String,
    author_fullname: String,
    author_profile_img: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            slug: row.slug,
            author_id: row.author_id,
            author: AuthorSummary {
                username: row.author_username,
                fullname: row.author_fullname,
                profile_img: row.author_profile_img,
            },
            title: row.title,
            description: row.description,
            banner: row.banner,
            content: row.content.0,
            tags: row.tags,
            state: row.state,
            activity: Activity {
                total_likes: row.total_likes,
                total_reads: row.total_reads,
            },
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Posts table, joined with authors for the embedded summary
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select_where(condition: &str) -> String {
        format!(
            "SELECT {} FROM posts p JOIN authors a ON a.id = p.author_id WHERE {}",
            POST_COLUMNS, condition
        )
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            WITH p AS (
                INSERT INTO posts (id, slug, author_id, title, description, banner, content, tags,
                                   state, published_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                        CASE WHEN $9 = 'published' THEN NOW() END)
                RETURNING *
            )
            SELECT {}
            FROM p JOIN authors a ON a.id = p.author_id
            "#,
            POST_COLUMNS
        ))
        .bind(post.id)
        .bind(&post.slug)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.banner)
        .bind(Json(&post.content))
        .bind(&post.tags)
        .bind(post.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_post(&self, slug: &str, changes: PostChanges) -> Result<PostUpdate> {
        // Lock the row so concurrent saves agree on who published first.
        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT published_at FROM posts WHERE slug = $1 FOR UPDATE")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((previous_published_at,)) = previous else {
            return Err(AppError::NotFound(format!("post {}", slug)));
        };
        let first_publish =
            changes.state == PostState::Published && previous_published_at.is_none();

        sqlx::query(
            r#"
            UPDATE posts
            SET title = $2,
                description = $3,
                banner = $4,
                content = $5,
                tags = $6,
                state = $7,
                published_at = CASE WHEN $8 THEN NOW() ELSE published_at END,
                updated_at = NOW()
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.banner)
        .bind(Json(&changes.content))
        .bind(&changes.tags)
        .bind(changes.state)
        .bind(first_publish)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let post = self
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", slug)))?;

        Ok(PostUpdate {
            post,
            first_publish,
        })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&Self::select_where("p.slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&Self::select_where("p.id = $1"))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Post::from))
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT");
        builder.push(POST_COLUMNS);
        builder.push(" FROM posts p JOIN authors a ON a.id = p.author_id");
        filter.push_where(&mut builder);
        builder.push(sort.order_by_sql());
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        filter.push_where(&mut builder);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn increment_reads(&self, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE posts SET total_reads = total_reads + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        Ok(())
    }

    async fn adjust_likes(&self, post_id: Uuid, delta: i64) -> Result<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE posts
            SET total_likes = GREATEST(total_likes + $2, 0)
            WHERE id = $1
            RETURNING total_likes
            "#,
        )
        .bind(post_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        total.ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    async fn set_total_likes(&self, post_id: Uuid, total_likes: i64) -> Result<()> {
        let result = sqlx::query("UPDATE posts SET total_likes = $2 WHERE id = $1")
            .bind(post_id)
            .bind(total_likes.max(0))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        Ok(())
    }

    async fn recount_likes(&self, post_id: Uuid) -> Result<LikeRecount> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            WITH previous AS (
                SELECT id, total_likes FROM posts WHERE id = $1 FOR UPDATE
            )
            UPDATE posts p
            SET total_likes = (
                SELECT COUNT(*)
                FROM post_engagements e
                WHERE e.post_id = $1 AND e.kind = 'like'
            )
            FROM previous
            WHERE p.id = previous.id
            RETURNING previous.total_likes, p.total_likes
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        let (previous, total_likes) =
            row.ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
        Ok(LikeRecount {
            previous,
            total_likes,
        })
    }

    async fn list_post_ids(&self, after: Option<Uuid>, limit: i64) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT id
            FROM posts
            WHERE $1::uuid IS NULL OR id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

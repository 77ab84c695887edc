//! Listing predicate shared by the page fetch, its count and trending.
//!
//! A `PostFilter` renders to SQL for the Postgres repository and evaluates
//! directly against a `Post` for the in-memory one. Listing and counting
//! always go through the same value so the two numbers agree for a given
//! filter snapshot.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Post, PostState};

/// Conjunctive filter over published posts. Drafts never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostFilter {
    /// Exact tag match
    #[serde(default)]
    pub tag: Option<String>,
    /// Case-insensitive substring of the title
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub author: Option<Uuid>,
    /// Slug to leave out, so a post never shows up in its own "similar" list
    #[serde(default)]
    pub eliminate_blog: Option<String>,
}

impl PostFilter {
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn by_author(author: Uuid) -> Self {
        Self {
            author: Some(author),
            ..Default::default()
        }
    }

    /// Blank strings mean "no condition"; tags are stored lowercase.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        Self {
            tag: clean(self.tag).map(|t| t.to_lowercase()),
            query: clean(self.query),
            author: self.author,
            eliminate_blog: clean(self.eliminate_blog),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        if post.state != PostState::Published {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !post.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(query) = &self.query {
            if !post.title.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }
        if let Some(author) = self.author {
            if post.author_id != author {
                return false;
            }
        }
        if let Some(excluded) = &self.eliminate_blog {
            if &post.slug == excluded {
                return false;
            }
        }
        true
    }

    /// Append ` WHERE ...` for a query whose posts table is aliased `p`.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE p.state = ");
        builder.push_bind(PostState::Published.as_str());

        if let Some(tag) = &self.tag {
            builder.push(" AND ");
            builder.push_bind(tag.clone());
            builder.push(" = ANY(p.tags)");
        }
        if let Some(query) = &self.query {
            builder.push(" AND p.title ILIKE ");
            builder.push_bind(format!("%{}%", escape_like(query)));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(author) = self.author {
            builder.push(" AND p.author_id = ");
            builder.push_bind(author);
        }
        if let Some(excluded) = &self.eliminate_blog {
            builder.push(" AND p.slug <> ");
            builder.push_bind(excluded.clone());
        }
    }
}

/// Escape LIKE wildcards so user input only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    /// Newest first; id breaks ties so offsets are deterministic
    Latest,
    /// Most read, then most liked, then newest
    Trending,
}

impl PostSort {
    pub fn order_by_sql(&self) -> &'static str {
        match self {
            Self::Latest => " ORDER BY p.published_at DESC, p.id DESC",
            Self::Trending => {
                " ORDER BY p.total_reads DESC, p.total_likes DESC, p.published_at DESC, p.id DESC"
            }
        }
    }

    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let latest = b.published_at.cmp(&a.published_at).then_with(|| b.id.cmp(&a.id));
        match self {
            Self::Latest => latest,
            Self::Trending => b
                .activity
                .total_reads
                .cmp(&a.activity.total_reads)
                .then_with(|| b.activity.total_likes.cmp(&a.activity.total_likes))
                .then(latest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, AuthorSummary, PostContent};
    use chrono::{Duration, Utc};

    fn post(slug: &str, title: &str, tags: &[&str], state: PostState) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            author_id: Uuid::nil(),
            author: AuthorSummary::default(),
            title: title.to_string(),
            description: String::new(),
            banner: String::new(),
            content: PostContent::default(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            state,
            activity: Activity::default(),
            published_at: (state == PostState::Published).then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn drafts_never_match() {
        let draft = post("d", "Draft", &["tech"], PostState::Draft);
        assert!(!PostFilter::default().matches(&draft));
        assert!(!PostFilter::with_tag("tech").matches(&draft));
    }

    #[test]
    fn conditions_are_conjunctive() {
        let p = post("rust-intro", "Intro to Rust", &["tech", "rust"], PostState::Published);
        let filter = PostFilter {
            tag: Some("rust".into()),
            query: Some("INTRO".into()),
            author: Some(Uuid::nil()),
            eliminate_blog: None,
        };
        assert!(filter.matches(&p));

        let wrong_tag = PostFilter {
            tag: Some("go".into()),
            ..filter.clone()
        };
        assert!(!wrong_tag.matches(&p));

        let excluded = PostFilter {
            eliminate_blog: Some("rust-intro".into()),
            ..filter
        };
        assert!(!excluded.matches(&p));
    }

    #[test]
    fn normalized_drops_blank_conditions() {
        let filter = PostFilter {
            tag: Some(" Tech ".into()),
            query: Some("   ".into()),
            author: None,
            eliminate_blog: Some(String::new()),
        }
        .normalized();
        assert_eq!(filter, PostFilter::with_tag("tech"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }

    #[test]
    fn sql_rendering_binds_every_condition() {
        let filter = PostFilter {
            tag: Some("tech".into()),
            query: Some("rust".into()),
            author: Some(Uuid::nil()),
            eliminate_blog: Some("skip-me".into()),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        filter.push_where(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM posts p WHERE p.state = $1 AND $2 = ANY(p.tags) \
             AND p.title ILIKE $3 ESCAPE '\\' AND p.author_id = $4 AND p.slug <> $5"
        );
    }

    #[test]
    fn trending_orders_by_reads_then_likes_then_recency() {
        let now = Utc::now();
        let mut a = post("a", "A", &[], PostState::Published);
        a.activity = Activity {
            total_reads: 10,
            total_likes: 1,
        };
        let mut b = post("b", "B", &[], PostState::Published);
        b.activity = Activity {
            total_reads: 10,
            total_likes: 5,
        };
        let mut c = post("c", "C", &[], PostState::Published);
        c.activity = Activity {
            total_reads: 10,
            total_likes: 5,
        };
        c.published_at = Some(now + Duration::seconds(5));

        let mut posts = vec![a, b, c];
        posts.sort_by(|x, y| PostSort::Trending.compare(x, y));
        let order: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }
}

/// Publishing Service Library
///
/// Content-engagement core of the publishing platform: the draft/publish
/// lifecycle of posts, slug assignment, the like ledger with its cached
/// counters, read accounting and filtered listings.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Posts, authors, likes and notifications
/// - `query`: Listing filter and sort orders
/// - `services`: Business logic layer
/// - `db`: Repository traits with Postgres and in-memory implementations
/// - `middleware`: Bearer-token authentication extractors
/// - `jobs`: Background like reconciliation
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use db::Repositories;
use services::{AuthorService, EngagementService, ListingLimits, PostService};
use sqlx::PgPool;

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub engagement: EngagementService,
    pub authors: AuthorService,
    /// Present when running against Postgres; used by readiness checks
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(repos: Repositories, limits: ListingLimits) -> Self {
        Self {
            posts: PostService::new(repos.clone(), limits),
            engagement: EngagementService::new(repos.clone()),
            authors: AuthorService::new(repos),
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}

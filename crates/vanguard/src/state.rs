//! Application state shared across all handlers.

use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sqlx::PgPool;

use crate::config::{Config, RateLimitConfig};
use crate::coordinator::Coordinator;
use crate::points_cache::PointsCache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub db: PgPool,
    /// Redis connection pool
    pub redis: RedisPool,
    /// Application configuration
    pub config: Arc<Config>,
    /// Rate limit configuration
    pub rate_limit_config: Arc<RateLimitConfig>,
    /// Submission Coordinator (C6)
    pub coordinator: Arc<Coordinator>,
    /// Contest Points Cache (C7)
    pub points_cache: PointsCache,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        db: PgPool,
        redis: RedisPool,
        config: Config,
        rate_limit_config: RateLimitConfig,
        coordinator: Arc<Coordinator>,
        points_cache: PointsCache,
    ) -> Self {
        Self {
            db,
            redis,
            config: Arc::new(config),
            rate_limit_config: Arc::new(rate_limit_config),
            coordinator,
            points_cache,
        }
    }
}

/// Database models for Huddle
///
/// This module contains all database models and their SQL operations. Every
/// operation is generic over [`sqlx::PgExecutor`] so it can run against the
/// pool directly or inside a transaction.
///
/// # Models
///
/// - `user`: User accounts, credentials and reset tokens
/// - `group`: Groups, their slugs and owned games
/// - `game`: Games, always owned by one group
/// - `membership`: Member and join-request rows shared by groups and games
///
/// # Example
///
/// ```no_run
/// use huddle_shared::models::group::{Group, NewGroup};
/// use huddle_shared::models::Page;
/// use huddle_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let group = Group::create(&pool, &NewGroup {
///     name: "Chess Club".to_string(),
///     description: "Weekly blitz".to_string(),
/// }).await?;
///
/// let first_page = Group::list(&pool, Page::default()).await?;
/// # Ok(())
/// # }
/// ```

pub mod game;
pub mod group;
pub mod membership;
pub mod user;

use serde::{Deserialize, Serialize};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Upper bound on the page size a caller may ask for
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page selector for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.clamped()
    }

    /// Forces `page >= 1` and `1 <= limit <= MAX_PAGE_SIZE`
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// SQL `LIMIT` value
    pub fn limit(&self) -> i64 {
        i64::from(self.clamped().limit)
    }

    /// SQL `OFFSET` value
    pub fn offset(&self) -> i64 {
        let page = self.clamped();
        i64::from(page.page - 1) * i64::from(page.limit)
    }

    /// Slice bounds of this page within `len` items, for in-memory listing
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = (self.offset() as usize).min(len);
        let end = (start + self.limit() as usize).min(len);
        start..end
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,

    pub total: i64,

    pub page: u32,

    pub limit: u32,
}

impl<T> Paginated<T> {
    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        i64::from(self.page) * i64::from(self.limit) < self.total
    }

    /// Whether a page precedes this one
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

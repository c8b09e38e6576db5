//! The authoritative catalog as seen by the pagination layer.

use async_trait::async_trait;

use crate::catalog::{Article, FetchWindow, OrderBy, Predicate, Tag};
use crate::error::RepositoryError;

/// Storage collaborator queried on cache misses.
///
/// Implementations must apply `order_by` exactly as given; the planner always
/// ends it with an `id` term so results are totally ordered.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Number of articles matching `filter`.
    async fn count(&self, filter: &Predicate) -> Result<u64, RepositoryError>;

    /// Articles matching `filter`, ordered, then windowed.
    async fn find_many(
        &self,
        filter: &Predicate,
        order_by: &[OrderBy],
        window: FetchWindow,
    ) -> Result<Vec<Article>, RepositoryError>;

    /// Tags whose name is one of `names`. Unknown names are simply absent.
    async fn find_tags(&self, names: &[String]) -> Result<Vec<Tag>, RepositoryError>;
}

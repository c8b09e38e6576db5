//! In-memory catalog.
//!
//! Evaluates predicates directly. Backs the binary when it serves a snapshot
//! file, and the test suites.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{
    Article, CatalogRepository, FetchWindow, OrderBy, Predicate, SortOrder, Sortable, Tag,
};
use crate::error::RepositoryError;
use crate::lock::rw_read;

const SOURCE: &str = "catalog::memory";

/// On-disk shape of a catalog snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    articles: RwLock<Vec<Article>>,
    tags: RwLock<Vec<Tag>>,
}

impl InMemoryCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            articles: RwLock::new(snapshot.articles),
            tags: RwLock::new(snapshot.tags),
        }
    }

    /// Loads a JSON snapshot (`{"tags": [...], "articles": [...]}`).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            RepositoryError::Unavailable(format!("reading {}: {err}", path.display()))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&raw).map_err(|err| {
            RepositoryError::Query(format!("parsing {}: {err}", path.display()))
        })?;
        Ok(Self::new(snapshot))
    }

    pub fn len(&self) -> usize {
        rw_read(&self.articles, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compare_rows(a: &Article, b: &Article, order_by: &[OrderBy]) -> Ordering {
    for term in order_by {
        let ordering = a.sort_value(term.field).compare(&b.sort_value(term.field));
        let ordering = match term.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn count(&self, filter: &Predicate) -> Result<u64, RepositoryError> {
        let articles = rw_read(&self.articles, SOURCE, "count");
        Ok(articles.iter().filter(|article| filter.matches(article)).count() as u64)
    }

    async fn find_many(
        &self,
        filter: &Predicate,
        order_by: &[OrderBy],
        window: FetchWindow,
    ) -> Result<Vec<Article>, RepositoryError> {
        let mut rows: Vec<Article> = rw_read(&self.articles, SOURCE, "find_many")
            .iter()
            .filter(|article| filter.matches(article))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b, order_by));
        Ok(rows
            .into_iter()
            .skip(window.skip as usize)
            .take(window.take as usize)
            .collect())
    }

    async fn find_tags(&self, names: &[String]) -> Result<Vec<Tag>, RepositoryError> {
        let tags = rw_read(&self.tags, SOURCE, "find_tags");
        Ok(tags
            .iter()
            .filter(|tag| names.iter().any(|name| name.eq_ignore_ascii_case(&tag.name)))
            .cloned()
            .collect())
    }
}

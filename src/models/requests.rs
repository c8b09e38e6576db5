//! Request DTOs for the listing API
//!
//! Query-string parameters of `GET /articles`, before normalization.

use serde::Deserialize;

use crate::catalog::{ListingFilters, SortField, SortOrder, SortSpec, TagMode};
use crate::listing::ListingQuery;

/// Query parameters for GET /articles
///
/// # Fields
/// - `page`: 1-based offset page (default 1)
/// - `limit`: Page size; clamped by the service
/// - `sort_by` / `sort_order`: Ordering, `publishedAt desc` by default
/// - `source`: Source id filter
/// - `tags`: Comma-separated tag names
/// - `tag_mode`: `any` (default) or `all`
/// - `search`: Case-insensitive title substring
/// - `min_quality`: Lower bound on quality score
/// - `after` / `before`: Opaque cursors, passed through untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub source: Option<i64>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub tag_mode: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub min_quality: Option<f64>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

impl ListingRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.page == Some(0) {
            return Some("Page numbers start at 1".to_string());
        }
        if let Some(min_quality) = self.min_quality {
            if !min_quality.is_finite() {
                return Some("minQuality must be a finite number".to_string());
            }
        }
        None
    }

    /// Parses the request into a listing query.
    pub fn into_query(self) -> Result<ListingQuery, String> {
        if let Some(error_msg) = self.validate() {
            return Err(error_msg);
        }

        let defaults = SortSpec::default();
        let field = match self.sort_by.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => value.parse::<SortField>()?,
            None => defaults.field,
        };
        let order = match self.sort_order.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => value.parse::<SortOrder>()?,
            None => defaults.order,
        };
        let tag_mode = match self.tag_mode.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => value.parse::<TagMode>()?,
            None => TagMode::default(),
        };
        let tags = self
            .tags
            .map(|tags| tags.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        Ok(ListingQuery {
            filters: ListingFilters {
                source_id: self.source,
                tags,
                tag_mode,
                search: self.search,
                min_quality: self.min_quality,
            },
            sort: SortSpec::new(field, order),
            page: self.page.unwrap_or(1),
            limit: self.limit,
            after: self.after.filter(|token| !token.is_empty()),
            before: self.before.filter(|token| !token.is_empty()),
        })
    }
}

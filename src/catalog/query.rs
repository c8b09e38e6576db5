//! Query model shared by the planner, the listing service and repositories.
//!
//! Predicates are structured values rather than SQL text: SQL executors
//! render them, the in-memory catalog evaluates them directly.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::cache::{generate_cache_key, SENTINEL_ALL, SENTINEL_NONE, SENTINEL_NOT_APPLICABLE};
use crate::catalog::{Article, Sortable};

// == Sorting ==
/// Columns a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    PublishedAt,
    CreatedAt,
    QualityScore,
    Title,
    Id,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::PublishedAt => "publishedAt",
            SortField::CreatedAt => "createdAt",
            SortField::QualityScore => "qualityScore",
            SortField::Title => "title",
            SortField::Id => "id",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "publishedAt" | "published_at" => Ok(SortField::PublishedAt),
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "qualityScore" | "quality_score" => Ok(SortField::QualityScore),
            "title" => Ok(SortField::Title),
            "id" => Ok(SortField::Id),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

/// Requested ordering; `id` is always appended as the tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortField::PublishedAt, SortOrder::Desc)
    }
}

/// One ordering term handed to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: SortField,
    pub order: SortOrder,
}

/// Rows to skip and take after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub skip: u64,
    pub take: u64,
}

// == Sort Values ==
/// A typed boundary value for keyset comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortValue {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SortValue {
    /// Total order used by keyset predicates.
    ///
    /// Integers and floats compare numerically; other mixed kinds fall back to
    /// a fixed kind rank so the order stays total.
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Int(a), SortValue::Float(b)) => (*a as f64).total_cmp(b),
            (SortValue::Float(a), SortValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Timestamp(a), SortValue::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Int(_) | SortValue::Float(_) => 0,
            SortValue::Text(_) => 1,
            SortValue::Timestamp(_) => 2,
        }
    }
}

// == Predicates ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Eq,
    Gt,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
        }
    }
}

/// A WHERE clause over articles.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    Everything,
    /// Matches no row
    Nothing,
    Compare {
        field: SortField,
        op: CompareOp,
        value: SortValue,
    },
    SourceIs(i64),
    /// At least one of the tag ids
    TagsAny(Vec<i64>),
    /// Every one of the tag ids
    TagsAll(Vec<i64>),
    /// Case-insensitive substring of the title
    TitleContains(String),
    MinQuality(f64),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction that folds away `Everything` and short-circuits `Nothing`.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Nothing, _) | (_, Predicate::Nothing) => Predicate::Nothing,
            (Predicate::Everything, p) | (p, Predicate::Everything) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Predicate::Nothing)
    }

    pub fn matches(&self, article: &Article) -> bool {
        match self {
            Predicate::Everything => true,
            Predicate::Nothing => false,
            Predicate::Compare { field, op, value } => {
                op.holds(article.sort_value(*field).compare(value))
            }
            Predicate::SourceIs(source_id) => article.source_id == *source_id,
            Predicate::TagsAny(ids) => ids.iter().any(|id| article.tags.contains(id)),
            Predicate::TagsAll(ids) => ids.iter().all(|id| article.tags.contains(id)),
            Predicate::TitleContains(needle) => {
                article.title.to_lowercase().contains(&needle.to_lowercase())
            }
            Predicate::MinQuality(min) => article.quality_score >= *min,
            Predicate::And(parts) => parts.iter().all(|part| part.matches(article)),
            Predicate::Or(parts) => parts.iter().any(|part| part.matches(article)),
        }
    }
}

// == Filters ==
/// How several tag filters combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    #[default]
    Any,
    All,
}

impl TagMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagMode::Any => "any",
            TagMode::All => "all",
        }
    }
}

impl FromStr for TagMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "any" | "or" => Ok(TagMode::Any),
            "all" | "and" => Ok(TagMode::All),
            other => Err(format!("unknown tag mode '{other}'")),
        }
    }
}

/// Filter dimensions of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilters {
    pub source_id: Option<i64>,
    /// Tag names; resolved to ids before querying
    pub tags: Vec<String>,
    pub tag_mode: TagMode,
    pub search: Option<String>,
    pub min_quality: Option<f64>,
}

impl ListingFilters {
    /// Canonical form: tags trimmed, lower-cased, de-duplicated and sorted;
    /// blank search dropped.
    pub fn normalized(mut self) -> Self {
        let tags: BTreeSet<String> = self
            .tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        self.tags = tags.into_iter().collect();
        self.search = self
            .search
            .map(|search| search.trim().to_lowercase())
            .filter(|search| !search.is_empty());
        self
    }

    /// Cache key parameters, with sentinels for absent dimensions.
    ///
    /// Free-text values are JSON-quoted so a tag or search term can never
    /// spell a separator or a sentinel.
    pub fn cache_params(&self) -> Vec<(&'static str, String)> {
        let filters = self.clone().normalized();
        let has_tags = !filters.tags.is_empty();
        vec![
            (
                "source",
                filters
                    .source_id
                    .map_or_else(|| SENTINEL_ALL.to_string(), |id| id.to_string()),
            ),
            (
                "tags",
                if has_tags {
                    Value::from(filters.tags.clone()).to_string()
                } else {
                    SENTINEL_NONE.to_string()
                },
            ),
            (
                "tagMode",
                if has_tags {
                    filters.tag_mode.as_str().to_string()
                } else {
                    SENTINEL_NOT_APPLICABLE.to_string()
                },
            ),
            (
                "search",
                filters
                    .search
                    .map_or_else(
                        || SENTINEL_NONE.to_string(),
                        |search| Value::from(search).to_string(),
                    ),
            ),
            (
                "minQuality",
                filters
                    .min_quality
                    .map_or_else(|| SENTINEL_NOT_APPLICABLE.to_string(), |q| q.to_string()),
            ),
        ]
    }

    /// Short, order-independent digest of the active filters.
    pub fn fingerprint(&self) -> String {
        let canonical = generate_cache_key("filters", self.cache_params());
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(&digest[..8])
    }

    /// Everything except the tag filter, which needs resolved ids.
    pub fn base_predicate(&self) -> Predicate {
        let filters = self.clone().normalized();
        let mut predicate = Predicate::Everything;
        if let Some(source_id) = filters.source_id {
            predicate = predicate.and(Predicate::SourceIs(source_id));
        }
        if let Some(search) = filters.search {
            predicate = predicate.and(Predicate::TitleContains(search));
        }
        if let Some(min) = filters.min_quality {
            predicate = predicate.and(Predicate::MinQuality(min));
        }
        predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(id: i64, source_id: i64, tags: Vec<i64>, quality_score: f64) -> Article {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Article {
            id,
            title: format!("Rust article {id}"),
            source_id,
            tags,
            published_at: at,
            created_at: at,
            quality_score,
        }
    }

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("publishedAt".parse::<SortField>(), Ok(SortField::PublishedAt));
        assert_eq!("quality_score".parse::<SortField>(), Ok(SortField::QualityScore));
        assert!("views".parse::<SortField>().is_err());
        assert_eq!("DESC".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert_eq!("and".parse::<TagMode>(), Ok(TagMode::All));
    }

    #[test]
    fn test_sort_value_ordering() {
        assert_eq!(SortValue::Int(1).compare(&SortValue::Int(2)), Ordering::Less);
        assert_eq!(SortValue::Float(2.0).compare(&SortValue::Int(2)), Ordering::Equal);
        assert_eq!(
            SortValue::Text("b".into()).compare(&SortValue::Text("a".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn test_and_folds_identities() {
        let source = Predicate::SourceIs(1);
        assert_eq!(Predicate::Everything.and(source.clone()), source);
        assert_eq!(source.clone().and(Predicate::Nothing), Predicate::Nothing);

        let combined = source
            .clone()
            .and(Predicate::MinQuality(0.5))
            .and(Predicate::TagsAny(vec![1]));
        assert_eq!(
            combined,
            Predicate::And(vec![source, Predicate::MinQuality(0.5), Predicate::TagsAny(vec![1])])
        );
    }

    #[test]
    fn test_predicate_matching() {
        let row = article(5, 2, vec![10, 11], 0.8);

        assert!(Predicate::SourceIs(2).matches(&row));
        assert!(Predicate::TagsAny(vec![11, 99]).matches(&row));
        assert!(!Predicate::TagsAll(vec![11, 99]).matches(&row));
        assert!(Predicate::TitleContains("rust".into()).matches(&row));
        assert!(!Predicate::MinQuality(0.9).matches(&row));
        assert!(Predicate::Compare {
            field: SortField::Id,
            op: CompareOp::Gt,
            value: SortValue::Int(4),
        }
        .matches(&row));
        assert!(!Predicate::Nothing.matches(&row));
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = ListingFilters {
            tags: vec!["Rust".into(), "go".into(), "rust".into()],
            ..Default::default()
        };
        let b = ListingFilters {
            tags: vec!["go".into(), " rust ".into()],
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }

    #[test]
    fn test_fingerprint_changes_with_filters() {
        let all = ListingFilters::default();
        let one_source = ListingFilters {
            source_id: Some(3),
            ..Default::default()
        };
        assert_ne!(all.fingerprint(), one_source.fingerprint());
    }

    #[test]
    fn test_cache_params_use_sentinels() {
        let params = ListingFilters::default().cache_params();
        assert_eq!(
            params,
            vec![
                ("source", "all".to_string()),
                ("tags", "none".to_string()),
                ("tagMode", "n/a".to_string()),
                ("search", "none".to_string()),
                ("minQuality", "n/a".to_string()),
            ]
        );
    }

    #[test]
    fn test_tag_names_cannot_collide_through_separators() {
        let joined = ListingFilters {
            tags: vec!["a,b".into()],
            ..Default::default()
        };
        let split = ListingFilters {
            tags: vec!["a".into(), "b".into()],
            ..Default::default()
        };

        assert_ne!(joined.cache_params(), split.cache_params());
        assert_ne!(joined.fingerprint(), split.fingerprint());
        assert_eq!(split.cache_params()[1], ("tags", r#"["a","b"]"#.to_string()));
    }

    #[test]
    fn test_literal_sentinel_values_stay_distinct() {
        let named_none = ListingFilters {
            tags: vec!["none".into()],
            search: Some("none".into()),
            ..Default::default()
        };

        assert_ne!(named_none.fingerprint(), ListingFilters::default().fingerprint());
        assert_eq!(named_none.cache_params()[3], ("search", r#""none""#.to_string()));
    }

    #[test]
    fn test_base_predicate_skips_tags() {
        let filters = ListingFilters {
            source_id: Some(1),
            tags: vec!["rust".into()],
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(filters.base_predicate(), Predicate::SourceIs(1));
    }
}

//! Catalog records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{SortField, SortValue};

/// A listed catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub source_id: i64,
    /// Tag ids attached to the article
    #[serde(default)]
    pub tags: Vec<i64>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub quality_score: f64,
}

/// A tag as stored by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Rows that can be placed on a keyset page.
///
/// `id` is the unique tie-breaker appended to every ordering.
pub trait Sortable {
    fn id(&self) -> i64;

    fn sort_value(&self, field: SortField) -> SortValue;
}

impl Sortable for Article {
    fn id(&self) -> i64 {
        self.id
    }

    fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::PublishedAt => SortValue::Timestamp(self.published_at),
            SortField::CreatedAt => SortValue::Timestamp(self.created_at),
            SortField::QualityScore => SortValue::Float(self.quality_score),
            SortField::Title => SortValue::Text(self.title.clone()),
            SortField::Id => SortValue::Int(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_article_wire_format_is_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let article = Article {
            id: 1,
            title: "Keyset pagination".to_string(),
            source_id: 3,
            tags: vec![10],
            published_at: at,
            created_at: at,
            quality_score: 0.5,
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["sourceId"], 3);
        assert_eq!(json["qualityScore"], 0.5);
        assert!(json.get("publishedAt").is_some());
    }

    #[test]
    fn test_sort_values() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let article = Article {
            id: 9,
            title: "t".to_string(),
            source_id: 1,
            tags: Vec::new(),
            published_at: at,
            created_at: at,
            quality_score: 2.5,
        };

        assert_eq!(article.sort_value(SortField::Id), SortValue::Int(9));
        assert_eq!(article.sort_value(SortField::QualityScore), SortValue::Float(2.5));
        assert_eq!(article.sort_value(SortField::PublishedAt), SortValue::Timestamp(at));
    }
}

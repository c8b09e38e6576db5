//! Cache key generation.
//!
//! Keys are built from a base name and a parameter map. Parameters are sorted
//! by name before joining, so caller ordering never changes the key.

use std::collections::BTreeMap;

/// Sentinel for an unrestricted dimension (e.g. any source).
pub const SENTINEL_ALL: &str = "all";

/// Sentinel for an empty dimension (e.g. no tag filter, no cursor).
pub const SENTINEL_NONE: &str = "none";

/// Sentinel for a dimension that does not apply (e.g. tag mode without tags).
pub const SENTINEL_NOT_APPLICABLE: &str = "n/a";

/// Builds `base:k1=v1:k2=v2` with parameters in ascending name order.
///
/// Duplicate names keep the last value supplied.
pub fn generate_cache_key<I, K, V>(base: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(name, value)| (name.into(), value.to_string()))
        .collect();

    let mut key = String::from(base);
    for (name, value) in &sorted {
        key.push(':');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_params_are_sorted_by_name() {
        let key = generate_cache_key("articles", [("sortBy", "title"), ("page", "2")]);
        assert_eq!(key, "articles:page=2:sortBy=title");
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let forward = generate_cache_key("articles", [("a", 1), ("b", 2), ("c", 3)]);
        let backward = generate_cache_key("articles", [("c", 3), ("b", 2), ("a", 1)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_hash_map_params() {
        let mut params = HashMap::new();
        params.insert("page".to_string(), "1".to_string());
        params.insert("limit".to_string(), "20".to_string());

        assert_eq!(
            generate_cache_key("articles", params),
            "articles:limit=20:page=1"
        );
    }

    #[test]
    fn test_no_params_is_base_only() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(generate_cache_key("articles", empty), "articles");
    }

    #[test]
    fn test_sentinels_keep_shape_stable() {
        let key = generate_cache_key(
            "articles",
            [("source", SENTINEL_ALL), ("tags", SENTINEL_NONE), ("tagMode", SENTINEL_NOT_APPLICABLE)],
        );
        assert_eq!(key, "articles:source=all:tagMode=n/a:tags=none");
    }
}

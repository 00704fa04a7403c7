use crate::record::{Document, FlatRecord};
use indexmap::IndexMap;
use serde_json::Value;

pub const DEFAULT_SEPARATOR: char = '_';

/// Flattens nested documents into single-level records.
///
/// A leaf at path `k1, k2, ..., kn` becomes the key `k1_k2_..._kn`. Arrays
/// are leaves. When two paths join to the same key, the deeper path wins;
/// at equal depth the first one seen is kept. The key keeps the position at
/// which it was first produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flattener {
    separator: char,
}

impl Flattener {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn flatten(&self, document: &Document) -> FlatRecord {
        self.flatten_with_collisions(document).0
    }

    /// Like [`Flattener::flatten`], also returning the keys that collided.
    pub fn flatten_with_collisions(&self, document: &Document) -> (FlatRecord, Vec<String>) {
        let mut leaves: IndexMap<String, (usize, &Value)> = IndexMap::new();
        let mut collisions = Vec::new();
        self.walk(document, None, 1, &mut leaves, &mut collisions);

        let mut record = FlatRecord::new();
        for (key, (_, value)) in leaves {
            record.insert(key, value.clone());
        }
        (record, collisions)
    }

    fn walk<'a>(
        &self,
        map: &'a Document,
        prefix: Option<&str>,
        depth: usize,
        leaves: &mut IndexMap<String, (usize, &'a Value)>,
        collisions: &mut Vec<String>,
    ) {
        for (key, value) in map {
            let path = match prefix {
                Some(parent) => format!("{}{}{}", parent, self.separator, key),
                None => key.clone(),
            };

            match value {
                Value::Object(child) => self.walk(child, Some(&path), depth + 1, leaves, collisions),
                leaf => match leaves.get_mut(&path) {
                    Some(existing) => {
                        log::debug!("flattened key '{}' produced by more than one path", path);
                        if depth > existing.0 {
                            *existing = (depth, leaf);
                        }
                        collisions.push(path);
                    }
                    None => {
                        leaves.insert(path, (depth, leaf));
                    }
                },
            }
        }
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

/// Flattens with the default `_` separator.
pub fn flatten(document: &Document) -> FlatRecord {
    Flattener::default().flatten(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test documents must be objects"),
        }
    }

    fn pairs(record: &FlatRecord) -> Vec<(String, Value)> {
        record.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_nested_paths_are_joined() {
        let record = flatten(&doc(json!({"a": {"b": 1, "c": 2}})));
        assert_eq!(
            pairs(&record),
            vec![("a_b".to_string(), json!(1)), ("a_c".to_string(), json!(2))]
        );
    }

    #[test]
    fn test_flat_input_is_unchanged() {
        let input = doc(json!({"zeta": "z", "alpha": 1.5, "flag": false, "none": null}));
        let record = flatten(&input);

        let expected: Vec<(String, Value)> =
            input.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(pairs(&record), expected);
    }

    #[test]
    fn test_deep_nesting_and_arrays_are_leaves() {
        let input = doc(json!({
            "invoice": {
                "vendor": {"name": "Fuji", "address": {"city": "Tokyo"}},
                "lines": [{"sku": "A1"}, {"sku": "B2"}]
            },
            "pages": 3
        }));
        let record = flatten(&input);

        let keys: Vec<_> = record.keys().collect();
        assert_eq!(
            keys,
            vec!["invoice_vendor_name", "invoice_vendor_address_city", "invoice_lines", "pages"]
        );
        assert_eq!(record.get("invoice_lines"), Some(&json!([{"sku": "A1"}, {"sku": "B2"}])));
        assert!(record.iter().all(|(_, v)| !v.is_object()));
    }

    #[test]
    fn test_empty_documents() {
        assert!(flatten(&Document::new()).is_empty());
        assert!(flatten(&doc(json!({"a": {}}))).is_empty());
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let input = doc(json!({"b": {"y": 1, "x": 2}, "a": [1, 2], "c": {"z": {"w": "v"}}}));
        assert_eq!(pairs(&flatten(&input)), pairs(&flatten(&input)));
    }

    #[test]
    fn test_collision_prefers_deeper_path() {
        let (record, collisions) = Flattener::default()
            .flatten_with_collisions(&doc(json!({"a_b": "literal", "a": {"b": "nested"}})));

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a_b"), Some(&json!("nested")));
        assert_eq!(collisions, vec!["a_b".to_string()]);

        let (record, _) = Flattener::default()
            .flatten_with_collisions(&doc(json!({"a": {"b": "nested"}, "a_b": "literal"})));
        assert_eq!(record.get("a_b"), Some(&json!("nested")));
    }

    #[test]
    fn test_collision_at_equal_depth_keeps_first() {
        let record = flatten(&doc(json!({"a_b": {"c": 1}, "a": {"b_c": 2}})));
        assert_eq!(record.get("a_b_c"), Some(&json!(1)));
    }

    #[test]
    fn test_custom_separator() {
        let record = Flattener::new('.').flatten(&doc(json!({"a": {"b": 1}})));
        assert_eq!(record.get("a.b"), Some(&json!(1)));
    }
}

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

/// Column that names the file a record was extracted from.
pub const SOURCE_FILE_KEY: &str = "source_file";

/// A single-level row of extracted values.
///
/// Values are never JSON objects; arrays and scalars are stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: IndexMap<String, Value>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a leaf value, replacing an existing value in place.
    pub(crate) fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        debug_assert!(!value.is_object(), "flat records never hold objects");
        self.fields.insert(key, value)
    }

    pub fn set_source_file(&mut self, file_name: &str) {
        self.fields
            .insert(SOURCE_FILE_KEY.to_string(), Value::String(file_name.to_string()));
    }

    pub fn source_file(&self) -> Option<&str> {
        self.fields.get(SOURCE_FILE_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Records accumulated for one batch, in the order files completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<FlatRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: FlatRecord) {
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlatRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of all keys, in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for record in &self.records {
            columns.extend(record.keys());
        }
        columns.into_iter().map(str::to_string).collect()
    }
}

impl FromIterator<FlatRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = FlatRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a FlatRecord;
    type IntoIter = std::slice::Iter<'a, FlatRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

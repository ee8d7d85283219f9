//! Search documents and index statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field name to value map produced by an indexing strategy.
pub type DocumentFields = BTreeMap<String, serde_json::Value>;

/// A document pushed to the external index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// External document id (the queue task's item key).
    pub id: String,
    /// Indexed field values.
    pub fields: DocumentFields,
}

impl SearchDocument {
    pub fn new(id: impl Into<String>, fields: DocumentFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Concatenate every string value for full-text indexing.
    ///
    /// Arrays of strings are flattened; numbers and booleans are skipped.
    pub fn searchable_text(&self) -> String {
        let mut parts = Vec::new();
        for value in self.fields.values() {
            collect_text(value, &mut parts);
        }
        parts.join(" ")
    }
}

fn collect_text<'a>(value: &'a serde_json::Value, parts: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => parts.push(s),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_text(item, parts);
            }
        }
        _ => {}
    }
}

/// Statistics reported by the search engine for one index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    /// Number of live documents.
    pub entry_count: u64,
    /// Last time the index was written to, if ever.
    pub last_updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_searchable_text() {
        let mut fields = DocumentFields::new();
        fields.insert("title".into(), json!("Coffee"));
        fields.insert("price".into(), json!(12));
        fields.insert("tags".into(), json!(["arabica", "roasted"]));

        let doc = SearchDocument::new("1_en", fields);
        assert_eq!(doc.searchable_text(), "arabica roasted Coffee");
    }

    #[test]
    fn test_searchable_text_empty() {
        let doc = SearchDocument::new("1_en", DocumentFields::new());
        assert_eq!(doc.searchable_text(), "");
    }
}

//! Tantivy schema definition for synchronized documents.
//!
//! Every index uses the same three fields:
//! - doc_id: primary key used for replace and delete
//! - text: concatenated string values for full-text search
//! - payload: the original field map as JSON

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    schema: Schema,
    /// Primary key: the item key (STRING | STORED)
    pub doc_id: Field,
    /// Searchable text (TEXT)
    pub text: Field,
    /// Field map serialized as JSON (STORED)
    pub payload: Field,
}

impl DocumentSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a DocumentSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let doc_id = schema
            .get_field("doc_id")
            .map_err(|_| SearchError::SchemaMismatch("missing doc_id field".into()))?;
        let text = schema
            .get_field("text")
            .map_err(|_| SearchError::SchemaMismatch("missing text field".into()))?;
        let payload = schema
            .get_field("payload")
            .map_err(|_| SearchError::SchemaMismatch("missing payload field".into()))?;

        Ok(Self {
            schema,
            doc_id,
            text,
            payload,
        })
    }
}

/// Build the document schema.
pub fn build_document_schema() -> DocumentSchema {
    let mut schema_builder = Schema::builder();

    let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
    let text = schema_builder.add_text_field("text", TEXT);
    let payload = schema_builder.add_text_field("payload", STORED);

    let schema = schema_builder.build();

    DocumentSchema {
        schema,
        doc_id,
        text,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_schema() {
        let schema = build_document_schema();
        assert!(schema.schema().get_field("doc_id").is_ok());
        assert!(schema.schema().get_field("text").is_ok());
        assert!(schema.schema().get_field("payload").is_ok());
    }

    #[test]
    fn test_from_schema() {
        let original = build_document_schema();
        let rebuilt = DocumentSchema::from_schema(original.schema().clone()).unwrap();
        assert_eq!(rebuilt.doc_id, original.doc_id);
        assert_eq!(rebuilt.payload, original.payload);
    }

    #[test]
    fn test_from_schema_missing_field() {
        let mut builder = Schema::builder();
        builder.add_text_field("doc_id", STRING | STORED);
        let result = DocumentSchema::from_schema(builder.build());
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }
}

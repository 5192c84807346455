//! Tantivy schema definition for page search.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct PageSchema {
    schema: Schema,
    /// Primary key: page identifier (STRING | STORED)
    pub identifier: Field,
    /// Page title from frontmatter, or the identifier (TEXT | STORED)
    pub title: Field,
    /// Markdown body (TEXT)
    pub body: Field,
}

impl PageSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a PageSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let identifier = schema
            .get_field("identifier")
            .map_err(|_| SearchError::SchemaMismatch("missing identifier field".into()))?;
        let title = schema
            .get_field("title")
            .map_err(|_| SearchError::SchemaMismatch("missing title field".into()))?;
        let body = schema
            .get_field("body")
            .map_err(|_| SearchError::SchemaMismatch("missing body field".into()))?;

        Ok(Self {
            schema,
            identifier,
            title,
            body,
        })
    }
}

/// Build the page search schema.
///
/// Schema fields:
/// - identifier: STRING | STORED - exact-match key used for replace/delete
/// - title: TEXT | STORED - searchable and returned with hits
/// - body: TEXT - searchable markdown content
pub fn build_page_schema() -> PageSchema {
    let mut schema_builder = Schema::builder();

    let identifier = schema_builder.add_text_field("identifier", STRING | STORED);
    let title = schema_builder.add_text_field("title", TEXT | STORED);
    let body = schema_builder.add_text_field("body", TEXT);

    PageSchema {
        schema: schema_builder.build(),
        identifier,
        title,
        body,
    }
}

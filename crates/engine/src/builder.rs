//! Fallback document builder

use scribe_core::{Document, DocumentBuilder, IndexConnection, Indexable, ScribeResult};

/// Builds a document from every text field the object exposes
///
/// Fields are added in the order `Indexable::text_fields` returns them;
/// absent values become empty strings so the field is still present.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDocumentBuilder;

impl DocumentBuilder for DefaultDocumentBuilder {
    fn build(
        &self,
        object: &dyn Indexable,
        _connection: &dyn IndexConnection,
    ) -> ScribeResult<Document> {
        let mut doc = Document::new();
        for (name, value) in object.text_fields() {
            doc.push_field(name, value.unwrap_or_default());
        }
        Ok(doc)
    }
}

//! Applies one operation record to an index connection
//!
//! - `Add`: resolve, build, set id, tag resolver, `add`
//! - `Modify`: resolve, build, set id, tag resolver, `replace` (upsert)
//! - `Delete`: `delete` by id, no resolution
//!
//! A resolver that returns nothing yields `ScribeError::Unresolved`; the
//! caller decides whether to drop or requeue the record.

use crate::registry::Registry;
use scribe_core::{
    Document, IndexConnection, OperationKind, OperationRecord, ScribeError, ScribeResult,
};
use std::sync::Arc;

/// Stateless record applier shared by the worker and the synchronous path
#[derive(Debug, Clone)]
pub struct OperationProcessor {
    registry: Arc<Registry>,
}

impl OperationProcessor {
    /// Processor looking collaborators up in `registry`
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Collaborator registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Apply `record` to `connection`
    pub fn process(
        &self,
        record: &OperationRecord,
        connection: &mut dyn IndexConnection,
    ) -> ScribeResult<()> {
        match record.kind {
            OperationKind::Add => {
                let doc = self.document(record, &*connection)?;
                connection.add(doc)
            }
            OperationKind::Modify => {
                let doc = self.document(record, &*connection)?;
                connection.replace(doc)
            }
            OperationKind::Delete => connection.delete(record.document_id()),
        }
    }

    fn document(
        &self,
        record: &OperationRecord,
        connection: &dyn IndexConnection,
    ) -> ScribeResult<Document> {
        let resolver = self.registry.resolver(&record.resolver_tag)?;
        let object = resolver
            .resolve(record.document_id())
            .ok_or_else(|| ScribeError::unresolved(record.document_id().as_str()))?;
        let builder = self.registry.builder(object.kind())?;

        let mut doc = builder.build(object.as_ref(), connection)?;
        doc.id = Some(record.document_id().clone());
        doc.tag_resolver(&record.resolver_tag);
        Ok(doc)
    }
}

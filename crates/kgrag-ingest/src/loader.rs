//! Full-replace knowledge import.
//!
//! An import run verifies the store is reachable, deletes everything in it,
//! then recreates every entity and relationship from the document. Records
//! that cannot be created are folded into the [`ImportReport`] and never
//! abort the batch.
//!
//! The store is empty or partially populated while an import runs. Readers
//! that query it concurrently can see that state; keeping them out is the
//! operator's job.

use std::collections::HashSet;
use std::path::Path;

use kgrag_core::label::{entity_label, relationship_label};
use kgrag_core::types::{
    Entity, ImportReport, ItemFailure, ItemKind, ItemOutcome, KnowledgeDocument, RawRelationship,
};
use kgrag_graph::{GraphError, KnowledgeStore, LabelMode};

use crate::error::{IngestError, Result};

/// Builds the knowledge graph from import documents.
pub struct Loader<S> {
    store: S,
    provision_indexes: bool,
    verify_counts: bool,
}

impl<S: KnowledgeStore> Loader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            provision_indexes: true,
            verify_counts: true,
        }
    }

    /// Skip lookup-index provisioning after the load.
    pub fn without_indexes(mut self) -> Self {
        self.provision_indexes = false;
        self
    }

    /// Skip reading back node and relationship counts after the load.
    pub fn without_verification(mut self) -> Self {
        self.verify_counts = false;
        self
    }

    /// Import a document file from disk.
    pub async fn import_path(&self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Read knowledge document");
        self.import_bytes(&bytes).await
    }

    /// Parse and import a JSON document.
    ///
    /// Missing or malformed `entities` / `relationships` members are logged
    /// and read as empty; only invalid JSON syntax is an error.
    pub async fn import_bytes(&self, bytes: &[u8]) -> Result<ImportReport> {
        let (doc, warnings) = KnowledgeDocument::from_slice(bytes)?;
        if !warnings.is_empty() {
            tracing::warn!(
                missing_entities = warnings.missing_entities,
                missing_relationships = warnings.missing_relationships,
                malformed_entities = warnings.malformed_entities.len(),
                malformed_relationships = warnings.malformed_relationships.len(),
                "Knowledge document is malformed; continuing with what was readable"
            );
        }

        let digest = blake3::hash(bytes).to_hex().to_string();
        let mut report = self.import(&doc).await?;
        report.document_digest = Some(digest);
        Ok(report)
    }

    /// Replace the store contents with `doc`.
    pub async fn import(&self, doc: &KnowledgeDocument) -> Result<ImportReport> {
        self.store
            .verify_connectivity()
            .await
            .map_err(IngestError::Connectivity)?;

        let mut report = ImportReport::new(doc.entities.len(), doc.relationships.len());
        tracing::info!(
            entities = report.entities_total,
            relationships = report.relationships_total,
            "Starting full-replace import"
        );

        self.store.clear().await.map_err(IngestError::from_store)?;
        tracing::info!("Cleared existing graph");

        let mut created = HashSet::with_capacity(doc.entities.len());
        let mut use_procedure = true;
        for entity in &doc.entities {
            let outcome = self.create_entity(entity, &created, &mut use_procedure).await;
            if outcome.is_ok() {
                created.insert(entity.name.clone());
            }
            report.record_entity(outcome);
        }
        tracing::info!(
            created = report.entities_created,
            total = report.entities_total,
            "Created entities"
        );

        for raw in &doc.relationships {
            let outcome = self.create_relationship(raw).await;
            report.record_relationship(outcome);
        }
        tracing::info!(
            created = report.relationships_created,
            total = report.relationships_total,
            "Created relationships"
        );

        if self.provision_indexes {
            if let Err(e) = self.store.ensure_indexes().await {
                tracing::warn!(error = %e, "Index creation failed; continuing without indexes");
            }
        }

        if self.verify_counts {
            match self.store.counts().await {
                Ok(counts) => {
                    tracing::info!(
                        entities = counts.entities,
                        relationships = counts.relationships,
                        "Verified graph contents"
                    );
                    report.verified = Some(counts);
                }
                Err(e) => tracing::warn!(error = %e, "Could not verify graph contents"),
            }
        }

        report.finish();
        tracing::info!(
            entities_created = report.entities_created,
            entities_total = report.entities_total,
            relationships_created = report.relationships_created,
            relationships_total = report.relationships_total,
            failures = report.failures.len(),
            "Import complete"
        );
        Ok(report)
    }

    /// Create one entity, falling back to an inlined label when the
    /// label-attachment procedure is unavailable.
    ///
    /// Once the store reports the procedure missing it is not tried again
    /// for the rest of the batch. Any other failure fails only this entity.
    async fn create_entity(
        &self,
        entity: &Entity,
        created: &HashSet<String>,
        use_procedure: &mut bool,
    ) -> ItemOutcome {
        let fail = |reason: String| ItemFailure::new(ItemKind::Entity, entity.name.clone(), reason);

        entity.validate().map_err(|missing| fail(missing.to_string()))?;
        if created.contains(&entity.name) {
            return Err(fail("duplicate entity name".to_string()));
        }

        let label = entity_label(&entity.entity_type);

        let mode = if *use_procedure {
            LabelMode::Procedure
        } else {
            LabelMode::Inline
        };
        let result = match self.store.create_entity(entity, &label, mode).await {
            Err(GraphError::Capability(reason)) => {
                tracing::warn!(%reason, "Label procedure unavailable; inlining labels for this import");
                *use_procedure = false;
                self.store.create_entity(entity, &label, LabelMode::Inline).await
            }
            other => other,
        };

        result.map_err(|e| {
            tracing::error!(name = %entity.name, error = %e, "Failed to create entity");
            fail(e.to_string())
        })
    }

    async fn create_relationship(&self, raw: &RawRelationship) -> ItemOutcome {
        let relationship = raw.normalize().map_err(|missing| {
            tracing::warn!(relationship = %raw.describe(), "Skipping invalid relationship");
            ItemFailure::new(ItemKind::Relationship, raw.describe(), missing.to_string())
        })?;

        let key = raw.describe();
        let label = relationship_label(&relationship.rel_type);
        match self.store.create_relationship(&relationship, &label).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(relationship = %key, "Endpoint not found, relationship skipped");
                Err(ItemFailure::new(
                    ItemKind::Relationship,
                    key,
                    "unresolved endpoint",
                ))
            }
            Err(e) => {
                tracing::error!(relationship = %key, error = %e, "Failed to create relationship");
                Err(ItemFailure::new(ItemKind::Relationship, key, e.to_string()))
            }
        }
    }
}

//! CORPORA Workspace - Taxonomy Aggregate
//!
//! The aggregate root owning all intents, tags, and examples for one
//! dataset, with canonical-document load/serialize and the flattened
//! tabular export. Conversion pipelines build a [`Workspace`], register
//! labels and annotated text through its stores, then serialize it.

pub mod document;
pub mod flatten;
pub mod intents;
pub mod store;
pub mod tags;

pub use document::WorkspaceDocument;
pub use flatten::{
    FlatTable, EXAMPLE_METADATA_PREFIX, FQN_DELIMITER, INTENT_METADATA_PREFIX,
};
pub use intents::{IntentHierarchy, IntentOptions};
pub use store::{ExampleOptions, ExampleStore, EXAMPLE_ID_PREFIX};
pub use tags::TagRegistry;

use corpora_core::{CorporaResult, DocumentError, TagFilterSet};
use tracing::debug;

/// The aggregate root owning all intents, tags, and examples for one
/// dataset.
///
/// All operations are synchronous in-memory mutations. A workspace is built
/// by one logical thread of control per run; parallel ingestion means
/// separate instances whose documents are merged externally.
#[derive(Debug, Default)]
pub struct Workspace {
    pub tags: TagRegistry,
    pub intents: IntentHierarchy,
    pub examples: ExampleStore,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a workspace by replaying a canonical document.
    ///
    /// Entities are inserted directly into the stores - the hierarchy
    /// builder's creation logic does not run - so a previously-built tree
    /// round-trips through the document unchanged. Intents are indexed
    /// simultaneously by name and by id.
    pub fn load(document: WorkspaceDocument) -> CorporaResult<Self> {
        let mut workspace = Self::new();
        for tag in document.tags {
            workspace.tags.insert(tag);
        }
        for intent in document.intents {
            workspace.intents.insert(intent);
        }
        for example in document.examples {
            workspace.examples.add(example)?;
        }
        debug!(
            examples = workspace.examples.len(),
            intents = workspace.intents.len(),
            tags = workspace.tags.len(),
            "loaded workspace document"
        );
        Ok(workspace)
    }

    /// Parse and load a canonical document from JSON text.
    pub fn from_json_str(json: &str) -> CorporaResult<Self> {
        let document: WorkspaceDocument =
            serde_json::from_str(json).map_err(|err| DocumentError::Malformed {
                reason: err.to_string(),
            })?;
        Self::load(document)
    }

    /// Produce the canonical document: examples in ascending `created_at`
    /// order (stable, so ties keep registration order), then tags and
    /// intents, each omitted from the wire form when empty.
    pub fn to_document(&self) -> WorkspaceDocument {
        let mut examples: Vec<_> = self.examples.iter().cloned().collect();
        examples.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        WorkspaceDocument {
            examples,
            tags: self.tags.iter().cloned().collect(),
            intents: self.intents.iter().cloned().collect(),
        }
    }

    /// Serialize the canonical document to JSON text.
    pub fn to_json_string(&self) -> CorporaResult<String> {
        serde_json::to_string_pretty(&self.to_document()).map_err(|err| {
            DocumentError::Malformed {
                reason: err.to_string(),
            }
            .into()
        })
    }

    /// Flatten to a row-per-example table, optionally tag-filtered.
    pub fn flatten(&self, filters: Option<&TagFilterSet>) -> CorporaResult<FlatTable> {
        flatten::flatten(self, filters)
    }
}

//! Canonical workspace document.

use corpora_core::{Example, Intent, Tag};
use serde::{Deserialize, Serialize};

/// The canonical hierarchical JSON document consumed and produced by the
/// workspace load/serialize operations.
///
/// `tags` and `intents` are omitted from the wire form when empty; all three
/// arrays default to empty on load so partial documents parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<Intent>,
}

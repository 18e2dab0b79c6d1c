//! Intent hierarchy builder.
//!
//! Builds a forest of named intents from ordered root-to-leaf name paths.
//! Intents are deduplicated by bare name, not by path: a name reached through
//! two different paths resolves to the node created first, which keeps its
//! original parent (first-seen placement).

use corpora_core::{CorporaResult, Intent, LookupError, Metadata, Tag, ValidationError};
use std::collections::HashMap;
use tracing::debug;

/// Options applied to intents created during a hierarchy walk.
///
/// When `id` is set, every node newly created by that call receives the same
/// id, not only the leaf; callers passing explicit ids are expected to pass
/// single-element paths.
#[derive(Debug, Clone, Default)]
pub struct IntentOptions {
    pub id: Option<String>,
    pub tags: Vec<Tag>,
    pub metadata: Metadata,
}

/// Get-or-create store of named, optionally-parented intent nodes.
///
/// Intents live in a creation-ordered arena; the name and id indices both
/// point into that one ownership set.
#[derive(Debug, Default)]
pub struct IntentHierarchy {
    intents: Vec<Intent>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl IntentHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Iterate intents in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    /// Pure lookup by name.
    pub fn lookup_name(&self, name: &str) -> Option<&Intent> {
        self.by_name.get(name).map(|&idx| &self.intents[idx])
    }

    /// Pure lookup by id.
    pub fn lookup(&self, intent_id: &str) -> Option<&Intent> {
        self.by_id.get(intent_id).map(|&idx| &self.intents[idx])
    }

    /// Strict accessor by id.
    pub fn get(&self, intent_id: &str) -> CorporaResult<&Intent> {
        self.lookup(intent_id).ok_or_else(|| {
            LookupError::IntentNotFound {
                id: intent_id.to_string(),
            }
            .into()
        })
    }

    /// Walk a root-to-leaf name path, creating missing nodes, and return the
    /// leaf.
    ///
    /// Each name is looked up by name alone; an existing node is reused
    /// as-is (its parent, tags and metadata are not updated). Missing nodes
    /// are created with the previous level's id as parent, the id
    /// `intent-{n}` (`n` = current intent count) or the caller-supplied one,
    /// and the passed tags/metadata. Blank (`""`) elements truncate the walk
    /// at that level; the result is `None` when nothing remains.
    pub fn get_or_create<S: AsRef<str>>(
        &mut self,
        path: &[S],
        options: IntentOptions,
    ) -> Option<&Intent> {
        let mut parent_id: Option<String> = None;
        let mut leaf: Option<usize> = None;
        for name in path {
            let name = name.as_ref();
            if name.is_empty() {
                break;
            }
            let idx = match self.by_name.get(name).copied() {
                Some(idx) => idx,
                None => self.create(name, parent_id.take(), &options),
            };
            parent_id = Some(self.intents[idx].id.clone());
            leaf = Some(idx);
        }
        leaf.map(|idx| &self.intents[idx])
    }

    /// One-element walk with default options.
    pub fn get_or_create_name(&mut self, name: &str) -> Option<&Intent> {
        self.get_or_create(&[name], IntentOptions::default())
    }

    /// Register a fully-formed intent, e.g. when replaying a document.
    pub fn insert(&mut self, intent: Intent) -> &Intent {
        let idx = self.index(intent);
        &self.intents[idx]
    }

    /// Attach a tag to an intent. An existing tag of equal name is replaced
    /// in place, otherwise the tag is appended. Returns the stored tag.
    pub fn tag_intent(&mut self, intent_id: &str, tag: Tag) -> CorporaResult<&Tag> {
        let idx = self
            .by_id
            .get(intent_id)
            .copied()
            .ok_or(LookupError::IntentNotFound {
                id: intent_id.to_string(),
            })?;
        let tags = &mut self.intents[idx].tags;
        match tags.iter().position(|existing| existing.name == tag.name) {
            Some(pos) => {
                tags[pos] = tag;
                Ok(&tags[pos])
            }
            None => {
                tags.push(tag);
                let pos = tags.len() - 1;
                Ok(&tags[pos])
            }
        }
    }

    /// Root-to-leaf, delimiter-joined name of an intent, resolved by walking
    /// parent references up to a root.
    ///
    /// Unknown ids anywhere in the chain fail the lookup; a circular parent
    /// chain (possible only in a hand-crafted document) is a validation
    /// error rather than a hang.
    pub fn fully_qualified_name(&self, intent_id: &str, delimiter: &str) -> CorporaResult<String> {
        let mut names: Vec<&str> = Vec::new();
        let mut current = intent_id;
        let mut steps = 0usize;
        loop {
            let intent = self.get(current)?;
            names.push(&intent.name);
            match &intent.parent_intent_id {
                Some(parent) => {
                    steps += 1;
                    if steps > self.intents.len() {
                        return Err(ValidationError::CircularParentChain {
                            id: intent_id.to_string(),
                        }
                        .into());
                    }
                    current = parent;
                }
                None => break,
            }
        }
        names.reverse();
        Ok(names.join(delimiter))
    }

    fn create(&mut self, name: &str, parent_intent_id: Option<String>, options: &IntentOptions) -> usize {
        let id = options
            .id
            .clone()
            .unwrap_or_else(|| format!("intent-{}", self.intents.len()));
        debug!(id = %id, name = %name, parent = ?parent_intent_id, "registering intent");
        self.index(Intent {
            id,
            name: name.to_string(),
            metadata: options.metadata.clone(),
            tags: options.tags.clone(),
            parent_intent_id,
        })
    }

    fn index(&mut self, intent: Intent) -> usize {
        let idx = self.intents.len();
        self.by_name.insert(intent.name.clone(), idx);
        self.by_id.insert(intent.id.clone(), idx);
        self.intents.push(intent);
        idx
    }
}

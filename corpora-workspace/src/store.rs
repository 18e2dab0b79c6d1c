//! Example store with content-addressed ids.

use chrono::Utc;
use corpora_core::{
    prefixed_content_id, Context, CorporaResult, Example, IntentRef, Metadata, Tag, Timestamp,
    ValidationError,
};
use std::collections::HashMap;
use tracing::debug;

/// Prefix for derived example ids.
pub const EXAMPLE_ID_PREFIX: &str = "ex";

/// Options for example creation.
#[derive(Debug, Clone, Default)]
pub struct ExampleOptions {
    pub id: Option<String>,
    pub created_at: Option<Timestamp>,
    pub intents: Vec<IntentRef>,
    pub tags: Vec<Tag>,
    pub metadata: Metadata,
    pub context: Option<Context>,
}

/// Get-or-create store of annotated text units keyed by id.
#[derive(Debug, Default)]
pub struct ExampleStore {
    examples: Vec<Example>,
    by_id: HashMap<String, usize>,
    aliased: usize,
}

impl ExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Iterate examples in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    /// Pure lookup by id.
    pub fn lookup(&self, id: &str) -> Option<&Example> {
        self.by_id.get(id).map(|&idx| &self.examples[idx])
    }

    /// Number of `get_or_create` calls that landed on an existing example.
    pub fn aliased(&self) -> usize {
        self.aliased
    }

    /// Return the example with the resolved id, creating it if absent.
    ///
    /// Without an explicit id the id is derived from `text` alone, so
    /// identical text collides onto one example regardless of differing
    /// context or timestamps; the later call's fields are dropped and the
    /// collision is counted in [`ExampleStore::aliased`].
    pub fn get_or_create(&mut self, text: &str, options: ExampleOptions) -> &Example {
        let id = options
            .id
            .clone()
            .unwrap_or_else(|| prefixed_content_id(text, EXAMPLE_ID_PREFIX));
        if let Some(idx) = self.by_id.get(&id).copied() {
            self.aliased += 1;
            debug!(id = %id, "example id already registered, aliasing");
            return &self.examples[idx];
        }
        let example = Example {
            id,
            text: text.to_string(),
            created_at: options.created_at.unwrap_or_else(Utc::now),
            intents: options.intents,
            tags: options.tags,
            metadata: options.metadata,
            context: options.context,
        };
        let idx = self.index(example);
        &self.examples[idx]
    }

    /// Register a fully-constructed example unconditionally, keyed by its
    /// id, overwriting any previous entry with the same id.
    pub fn add(&mut self, example: Example) -> CorporaResult<()> {
        if example.id.is_empty() {
            return Err(ValidationError::MissingExampleId.into());
        }
        match self.by_id.get(&example.id).copied() {
            Some(idx) => self.examples[idx] = example,
            None => {
                self.index(example);
            }
        }
        Ok(())
    }

    fn index(&mut self, example: Example) -> usize {
        let idx = self.examples.len();
        self.by_id.insert(example.id.clone(), idx);
        self.examples.push(example);
        idx
    }
}

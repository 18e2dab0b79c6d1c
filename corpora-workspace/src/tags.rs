//! Tag registry with get-or-create semantics.

use corpora_core::{validate_color, CorporaResult, Tag};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Pick a random `#rrggbb` color for a new tag.
fn random_color() -> String {
    let mut rng = rand::thread_rng();
    format!("#{:06x}", rng.gen_range(0..0x100_0000))
}

/// Get-or-create store of named tags with auto-assigned display colors.
///
/// Tags live in a creation-ordered arena; the name and id indices both point
/// into that one ownership set.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Pure lookup by name or id.
    pub fn lookup(&self, key: &str) -> Option<&Tag> {
        self.by_name
            .get(key)
            .or_else(|| self.by_id.get(key))
            .map(|&idx| &self.tags[idx])
    }

    /// Return the tag with this name, creating it if absent.
    ///
    /// An existing tag is returned unchanged: a differing `color` argument
    /// never mutates the stored color. New tags get the id `tag-{n}` where
    /// `n` is the current registry size, and the supplied color (validated
    /// as `#rrggbb`) or a random one.
    pub fn get_or_create(&mut self, name: &str, color: Option<&str>) -> CorporaResult<&Tag> {
        if let Some(idx) = self.by_name.get(name).copied() {
            return Ok(&self.tags[idx]);
        }
        let color = match color {
            Some(color) => {
                validate_color(color)?;
                color.to_string()
            }
            None => random_color(),
        };
        let tag = Tag {
            id: format!("tag-{}", self.tags.len()),
            name: name.to_string(),
            color,
        };
        Ok(self.create(tag))
    }

    /// Register a fully-formed tag, e.g. when replaying a document.
    pub fn insert(&mut self, tag: Tag) -> &Tag {
        self.create(tag)
    }

    fn create(&mut self, tag: Tag) -> &Tag {
        debug!(id = %tag.id, name = %tag.name, "registering tag");
        let idx = self.tags.len();
        self.by_name.insert(tag.name.clone(), idx);
        self.by_id.insert(tag.id.clone(), idx);
        self.tags.push(tag);
        &self.tags[idx]
    }
}

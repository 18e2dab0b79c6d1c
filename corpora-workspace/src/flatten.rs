//! Flattened tabular export of a workspace.

use corpora_core::{CorporaResult, Example, FilterLevel, Metadata, TagFilterSet};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::Workspace;

/// Delimiter joining intent names into a fully qualified name.
pub const FQN_DELIMITER: &str = "/";

/// Prefix for columns derived from intent metadata keys.
pub const INTENT_METADATA_PREFIX: &str = "intent_metadata-";

/// Prefix for columns derived from example metadata keys.
pub const EXAMPLE_METADATA_PREFIX: &str = "example_metadata-";

/// A row-per-example table with string-typed cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatTable {
    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// The cells of a named column, row by row.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }
}

/// Tag names attached to the intents an example references.
fn intent_tag_names<'a>(
    workspace: &'a Workspace,
    example: &Example,
) -> CorporaResult<Vec<&'a str>> {
    let mut names = Vec::new();
    for reference in &example.intents {
        let intent = workspace.intents.get(&reference.intent_id)?;
        names.extend(intent.tags.iter().map(|tag| tag.name.as_str()));
    }
    Ok(names)
}

pub(crate) fn flatten(
    workspace: &Workspace,
    filters: Option<&TagFilterSet>,
) -> CorporaResult<FlatTable> {
    // Rows come out in the same order the canonical document uses.
    let mut ordered: Vec<&Example> = workspace.examples.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    // Intent-level and utterance-level filters are evaluated independently
    // and intersected.
    let mut kept: Vec<&Example> = Vec::new();
    for example in ordered {
        if let Some(filters) = filters {
            let utterance_tags: Vec<&str> =
                example.tags.iter().map(|tag| tag.name.as_str()).collect();
            let intent_tags = intent_tag_names(workspace, example)?;
            if !filters.level(FilterLevel::Utterance).allows(&utterance_tags)
                || !filters.level(FilterLevel::Intent).allows(&intent_tags)
            {
                continue;
            }
        }
        kept.push(example);
    }

    // Every distinct metadata key across the kept rows becomes a column.
    let mut intent_keys: BTreeSet<&str> = BTreeSet::new();
    let mut example_keys: BTreeSet<&str> = BTreeSet::new();
    for example in &kept {
        example_keys.extend(example.metadata.keys().map(String::as_str));
        for reference in &example.intents {
            let intent = workspace.intents.get(&reference.intent_id)?;
            intent_keys.extend(intent.metadata.keys().map(String::as_str));
        }
    }

    let mut columns = vec![
        "id".to_string(),
        "text".to_string(),
        "created_at".to_string(),
        "fully_qualified_intent_name".to_string(),
    ];
    columns.extend(
        intent_keys
            .iter()
            .map(|key| format!("{INTENT_METADATA_PREFIX}{key}")),
    );
    columns.extend(
        example_keys
            .iter()
            .map(|key| format!("{EXAMPLE_METADATA_PREFIX}{key}")),
    );

    let mut rows = Vec::with_capacity(kept.len());
    for example in &kept {
        let name = match example.intents.first() {
            Some(reference) => workspace
                .intents
                .fully_qualified_name(&reference.intent_id, FQN_DELIMITER)?,
            None => String::new(),
        };

        // Metadata merged across referenced intents; later intents win.
        let mut intent_metadata = Metadata::new();
        for reference in &example.intents {
            let intent = workspace.intents.get(&reference.intent_id)?;
            intent_metadata.extend(
                intent
                    .metadata
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }

        let mut row = vec![
            example.id.clone(),
            example.text.clone(),
            example.created_at.to_rfc3339(),
            name,
        ];
        row.extend(
            intent_keys
                .iter()
                .map(|&key| intent_metadata.get(key).cloned().unwrap_or_default()),
        );
        row.extend(
            example_keys
                .iter()
                .map(|&key| example.metadata.get(key).cloned().unwrap_or_default()),
        );
        rows.push(row);
    }

    debug!(
        rows = rows.len(),
        columns = columns.len(),
        "flattened workspace"
    );
    Ok(FlatTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use crate::{ExampleOptions, IntentOptions, Workspace};
    use corpora_core::{IntentRef, Metadata, TagFilterSet};

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_metadata_keys_become_columns() {
        let mut workspace = Workspace::new();
        let intent_id = workspace
            .intents
            .get_or_create(
                &["billing"],
                IntentOptions {
                    metadata: metadata(&[("a", "1"), ("b", "2")]),
                    ..Default::default()
                },
            )
            .unwrap()
            .id
            .clone();
        workspace.examples.get_or_create(
            "pay my bill",
            ExampleOptions {
                intents: vec![IntentRef::new(&intent_id)],
                metadata: metadata(&[("c", "3")]),
                ..Default::default()
            },
        );

        let table = workspace.flatten(None).unwrap();
        assert_eq!(
            table.columns,
            vec![
                "id",
                "text",
                "created_at",
                "fully_qualified_intent_name",
                "intent_metadata-a",
                "intent_metadata-b",
                "example_metadata-c",
            ]
        );
        let row = &table.rows[0];
        assert_eq!(row[table.column_index("intent_metadata-a").unwrap()], "1");
        assert_eq!(row[table.column_index("intent_metadata-b").unwrap()], "2");
        assert_eq!(row[table.column_index("example_metadata-c").unwrap()], "3");
    }

    #[test]
    fn test_unlabelled_example_has_empty_intent_name() {
        let mut workspace = Workspace::new();
        workspace
            .examples
            .get_or_create("hello there", ExampleOptions::default());
        let table = workspace.flatten(None).unwrap();
        assert_eq!(table.column("fully_qualified_intent_name").unwrap(), vec![""]);
    }

    #[test]
    fn test_fully_qualified_name_joins_path() {
        let mut workspace = Workspace::new();
        let leaf = workspace
            .intents
            .get_or_create(
                &["billing", "billing_issues", "payment_late"],
                IntentOptions::default(),
            )
            .unwrap()
            .id
            .clone();
        workspace.examples.get_or_create(
            "my payment is late",
            ExampleOptions {
                intents: vec![IntentRef::new(&leaf)],
                ..Default::default()
            },
        );
        let table = workspace.flatten(None).unwrap();
        assert_eq!(
            table.column("fully_qualified_intent_name").unwrap(),
            vec!["billing/billing_issues/payment_late"]
        );
    }

    #[test]
    fn test_utterance_include_filter_keeps_tagged_rows() {
        let mut workspace = Workspace::new();
        let tag = workspace
            .tags
            .get_or_create("Test", Some("#112233"))
            .unwrap()
            .clone();
        for n in 0..10 {
            let tags = if n < 5 { vec![tag.clone()] } else { vec![] };
            workspace.examples.get_or_create(
                &format!("utterance number {n}"),
                ExampleOptions {
                    tags,
                    ..Default::default()
                },
            );
        }

        let mut filters = TagFilterSet::default();
        filters.set("utterance", "include", "Test").unwrap();
        let table = workspace.flatten(Some(&filters)).unwrap();
        assert_eq!(table.rows.len(), 5);
    }

    #[test]
    fn test_intent_exclude_filter_drops_rows() {
        let mut workspace = Workspace::new();
        let deprecated = workspace
            .tags
            .get_or_create("Deprecated", Some("#445566"))
            .unwrap()
            .clone();
        let old = workspace
            .intents
            .get_or_create(
                &["legacy"],
                IntentOptions {
                    tags: vec![deprecated],
                    ..Default::default()
                },
            )
            .unwrap()
            .id
            .clone();
        let current = workspace
            .intents
            .get_or_create(&["billing"], IntentOptions::default())
            .unwrap()
            .id
            .clone();

        workspace.examples.get_or_create(
            "legacy utterance",
            ExampleOptions {
                intents: vec![IntentRef::new(&old)],
                ..Default::default()
            },
        );
        workspace.examples.get_or_create(
            "billing utterance",
            ExampleOptions {
                intents: vec![IntentRef::new(&current)],
                ..Default::default()
            },
        );

        let mut filters = TagFilterSet::default();
        filters.set("intent", "exclude", ["Deprecated"]).unwrap();
        let table = workspace.flatten(Some(&filters)).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "billing utterance");
    }

    #[test]
    fn test_missing_metadata_renders_empty_cells() {
        let mut workspace = Workspace::new();
        workspace.examples.get_or_create(
            "with metadata",
            ExampleOptions {
                metadata: metadata(&[("source", "mail")]),
                ..Default::default()
            },
        );
        workspace
            .examples
            .get_or_create("without metadata", ExampleOptions::default());

        let table = workspace.flatten(None).unwrap();
        let column = table.column("example_metadata-source").unwrap();
        assert!(column.contains(&"mail"));
        assert!(column.contains(&""));
    }
}

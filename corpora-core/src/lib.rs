//! CORPORA Core - Entity Types
//!
//! Pure data structures with no behavior. The workspace crate depends on this.
//! This crate contains ONLY data types, identity hashing, and validation -
//! no registry or serialization logic.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// String-valued metadata attached to intents and examples.
/// The value type is `String`, so a non-string metadata value is rejected at
/// the serde boundary rather than by runtime checks.
pub type Metadata = BTreeMap<String, String>;

/// Number of hex characters kept from the SHA-256 digest when deriving ids.
pub const CONTENT_ID_LEN: usize = 20;

/// Compute a deterministic content id from text.
///
/// SHA-256 over the UTF-8 bytes, hex-encoded and truncated to
/// [`CONTENT_ID_LEN`] characters. Equal text always yields equal output, so
/// re-running a conversion over the same source assigns the same ids.
pub fn content_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(CONTENT_ID_LEN);
    id
}

/// Compute a prefixed content id, e.g. `ex-b94d27b9934d3e08a52e`.
pub fn prefixed_content_id(text: &str, prefix: &str) -> String {
    format!("{}-{}", prefix, content_id(text))
}

// ============================================================================
// ENUMS
// ============================================================================

/// Grouping type of a conversation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Conversation,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::Conversation => write!(f, "conversation"),
        }
    }
}

impl FromStr for ContextType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(ContextType::Conversation),
            other => Err(ValidationError::InvalidContextType {
                value: other.to_string(),
            }),
        }
    }
}

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    Client,
    Expert,
}

impl fmt::Display for ContextRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextRole::Client => write!(f, "client"),
            ContextRole::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for ContextRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(ContextRole::Client),
            "expert" => Ok(ContextRole::Expert),
            other => Err(ValidationError::InvalidContextRole {
                value: other.to_string(),
            }),
        }
    }
}

/// Level a tag filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLevel {
    Intent,
    Utterance,
}

impl fmt::Display for FilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterLevel::Intent => write!(f, "intent"),
            FilterLevel::Utterance => write!(f, "utterance"),
        }
    }
}

impl FromStr for FilterLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intent" => Ok(FilterLevel::Intent),
            "utterance" => Ok(FilterLevel::Utterance),
            other => Err(ValidationError::InvalidFilterLevel {
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of a tag filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Include,
    Exclude,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Include => write!(f, "include"),
            FilterKind::Exclude => write!(f, "exclude"),
        }
    }
}

impl FromStr for FilterKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "include" => Ok(FilterKind::Include),
            "exclude" => Ok(FilterKind::Exclude),
            other => Err(ValidationError::InvalidFilterKind {
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid context type: {value} (accepted: \"conversation\")")]
    InvalidContextType { value: String },

    #[error("Invalid context role: {value} (accepted: \"client\", \"expert\")")]
    InvalidContextRole { value: String },

    #[error("Invalid tag color: {value} (expected \"#rrggbb\")")]
    InvalidColor { value: String },

    #[error("Invalid tag filter level: {value} (accepted: \"intent\", \"utterance\")")]
    InvalidFilterLevel { value: String },

    #[error("Invalid tag filter kind: {value} (accepted: \"include\", \"exclude\")")]
    InvalidFilterKind { value: String },

    #[error("Example has no id")]
    MissingExampleId,

    #[error("Circular parent chain through intent {id}")]
    CircularParentChain { id: String },
}

/// Lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Intent not found: {id}")]
    IntentNotFound { id: String },
}

/// Canonical document errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Malformed workspace document: {reason}")]
    Malformed { reason: String },
}

/// Master error type for all CORPORA errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorporaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Result type alias for CORPORA operations.
pub type CorporaResult<T> = Result<T, CorporaError>;

// ============================================================================
// ENTITIES
// ============================================================================

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new("^#[0-9a-fA-F]{6}$").expect("Invalid hex color regex"));

/// Validate a `#rrggbb` tag color string.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor {
            value: color.to_string(),
        })
    }
}

/// A named, colored label attachable to intents and examples,
/// independent of the intent hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Tag {
    /// Construct a tag, validating the color format.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let color = color.into();
        validate_color(&color)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            color,
        })
    }
}

/// Lightweight reference to an intent by id, as carried on examples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentRef {
    pub intent_id: String,
}

impl IntentRef {
    pub fn new(intent_id: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
        }
    }
}

impl From<&Intent> for IntentRef {
    fn from(intent: &Intent) -> Self {
        Self {
            intent_id: intent.id.clone(),
        }
    }
}

/// A node in the intent label hierarchy.
/// Intents form a forest: each node references at most one parent by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_intent_id: Option<String>,
}

impl Intent {
    /// Create a root intent with no tags or metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: Metadata::new(),
            tags: Vec::new(),
            parent_intent_id: None,
        }
    }

    /// Set the parent intent id.
    pub fn with_parent(mut self, parent_intent_id: impl Into<String>) -> Self {
        self.parent_intent_id = Some(parent_intent_id.into());
        self
    }

    /// Set the attached tags.
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Back-reference grouping several examples into one ordered conversation.
/// Owns no examples itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<ContextType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContextRole>,
}

impl Context {
    /// Parse a context from its wire fields, rejecting out-of-range
    /// `type`/`role` values.
    pub fn new(
        context_id: Option<String>,
        context_type: Option<&str>,
        role: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let context_type = context_type.map(ContextType::from_str).transpose()?;
        let role = role.map(ContextRole::from_str).transpose()?;
        Ok(Self {
            context_id,
            context_type,
            role,
        })
    }

    /// Conversation context with the given id and participant role.
    pub fn conversation(context_id: impl Into<String>, role: ContextRole) -> Self {
        Self {
            context_id: Some(context_id.into()),
            context_type: Some(ContextType::Conversation),
            role: Some(role),
        }
    }
}

/// One annotated unit of text (an utterance), optionally linked to a
/// conversation via [`Context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub text: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub intents: Vec<IntentRef>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl Example {
    /// Create an unlabelled example.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at,
            intents: Vec::new(),
            tags: Vec::new(),
            metadata: Metadata::new(),
            context: None,
        }
    }

    /// Set the referenced intents.
    pub fn with_intents(mut self, intents: Vec<IntentRef>) -> Self {
        self.intents = intents;
        self
    }

    /// Set the attached tags.
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the conversation context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

// ============================================================================
// TAG FILTERS
// ============================================================================

/// Ordered tag names, accepted either as a sequence or as a single
/// comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNames(pub Vec<String>);

impl From<&str> for TagNames {
    fn from(value: &str) -> Self {
        Self(value.split(',').map(str::to_string).collect())
    }
}

impl From<String> for TagNames {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for TagNames {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<&[&str]> for TagNames {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TagNames {
    fn from(value: [&str; N]) -> Self {
        Self::from(&value[..])
    }
}

/// Include/exclude tag-name lists for one filter level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TagFilter {
    /// Whether a row carrying `tag_names` passes this filter.
    /// Any excluded tag drops the row; a non-empty include list requires at
    /// least one listed tag.
    pub fn allows(&self, tag_names: &[&str]) -> bool {
        if tag_names
            .iter()
            .any(|name| self.exclude.iter().any(|excluded| excluded == name))
        {
            return false;
        }
        if !self.include.is_empty() {
            return tag_names
                .iter()
                .any(|name| self.include.iter().any(|included| included == name));
        }
        true
    }
}

/// Tag filters for both levels of the flattened export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilterSet {
    #[serde(default)]
    pub intent: TagFilter,
    #[serde(default)]
    pub utterance: TagFilter,
}

impl TagFilterSet {
    /// Replace one include/exclude list, validating the level and kind names.
    pub fn set(
        &mut self,
        level: &str,
        kind: &str,
        values: impl Into<TagNames>,
    ) -> Result<(), ValidationError> {
        let level: FilterLevel = level.parse()?;
        let kind: FilterKind = kind.parse()?;
        let TagNames(names) = values.into();
        let filter = match level {
            FilterLevel::Intent => &mut self.intent,
            FilterLevel::Utterance => &mut self.utterance,
        };
        match kind {
            FilterKind::Include => filter.include = names,
            FilterKind::Exclude => filter.exclude = names,
        }
        Ok(())
    }

    /// The filter for one level.
    pub fn level(&self, level: FilterLevel) -> &TagFilter {
        match level {
            FilterLevel::Intent => &self.intent,
            FilterLevel::Utterance => &self.utterance,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_deterministic() {
        let id1 = content_id("pay my bill");
        let id2 = content_id("pay my bill");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_content_id_length_and_charset() {
        let id = content_id("hello world");
        assert_eq!(id.len(), CONTENT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        // SHA-256 of "hello world" starts with b94d27b9934d3e08a52e
        assert_eq!(id, "b94d27b9934d3e08a52e");
    }

    #[test]
    fn test_content_id_empty_text() {
        // Empty input is valid and hashes deterministically.
        assert_eq!(content_id(""), content_id(""));
        assert_eq!(content_id("").len(), CONTENT_ID_LEN);
    }

    #[test]
    fn test_prefixed_content_id_format() {
        let text = "pay my bill";
        assert_eq!(
            prefixed_content_id(text, "ex"),
            format!("ex-{}", content_id(text))
        );
    }

    #[test]
    fn test_context_type_rejects_unknown_value() {
        let result = "document".parse::<ContextType>();
        assert_eq!(
            result,
            Err(ValidationError::InvalidContextType {
                value: "document".to_string()
            })
        );
    }

    #[test]
    fn test_context_role_rejects_unknown_value() {
        let result = "bot".parse::<ContextRole>();
        assert_eq!(
            result,
            Err(ValidationError::InvalidContextRole {
                value: "bot".to_string()
            })
        );
    }

    #[test]
    fn test_context_new_conversation_client() {
        let context = Context::new(
            Some("conv-1".to_string()),
            Some("conversation"),
            Some("client"),
        )
        .unwrap();
        assert_eq!(context.context_type, Some(ContextType::Conversation));
        assert_eq!(context.role, Some(ContextRole::Client));
    }

    #[test]
    fn test_context_new_rejects_bad_role() {
        let result = Context::new(None, Some("conversation"), Some("bot"));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidContextRole { .. })
        ));
    }

    #[test]
    fn test_context_serde_uses_type_key() {
        let context = Context::conversation("conv-1", ContextRole::Expert);
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["type"], "conversation");
        assert_eq!(json["role"], "expert");
        assert_eq!(json["context_id"], "conv-1");
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#a1B2c3").is_ok());
        assert!(validate_color("a1b2c3").is_err());
        assert!(validate_color("#a1b2c").is_err());
        assert!(validate_color("#a1b2c3d4").is_err());
        assert!(validate_color("#gghhii").is_err());
    }

    #[test]
    fn test_tag_new_rejects_bad_color() {
        let result = Tag::new("tag-0", "Test", "red");
        assert_eq!(
            result,
            Err(ValidationError::InvalidColor {
                value: "red".to_string()
            })
        );
    }

    #[test]
    fn test_intent_ref_from_intent() {
        let intent = Intent::new("intent-3", "billing");
        let reference = IntentRef::from(&intent);
        assert_eq!(reference.intent_id, "intent-3");
    }

    #[test]
    fn test_example_serde_shape() {
        let example = Example::new("ex-abc", "hello", Utc::now())
            .with_intents(vec![IntentRef::new("intent-0")]);
        let json = serde_json::to_value(&example).unwrap();
        assert_eq!(json["intents"][0]["intent_id"], "intent-0");
        // No context was attached, so the key is omitted on the wire.
        assert!(json.get("context").is_none());

        let with_context =
            example.with_context(Context::conversation("conv-1", ContextRole::Client));
        let json = serde_json::to_value(&with_context).unwrap();
        assert_eq!(json["context"]["type"], "conversation");
        assert_eq!(json["context"]["role"], "client");
    }

    #[test]
    fn test_filter_set_rejects_unknown_level() {
        let mut filters = TagFilterSet::default();
        let err = filters.set("bogus", "include", "Test").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("bogus"));
        assert!(msg.contains("intent"));
        assert!(msg.contains("utterance"));
    }

    #[test]
    fn test_filter_set_rejects_unknown_kind() {
        let mut filters = TagFilterSet::default();
        let err = filters.set("intent", "drop", "Test").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("drop"));
        assert!(msg.contains("include"));
        assert!(msg.contains("exclude"));
    }

    #[test]
    fn test_filter_set_accepts_comma_separated_string() {
        let mut filters = TagFilterSet::default();
        filters.set("utterance", "include", "Test,Holdout").unwrap();
        assert_eq!(filters.utterance.include, vec!["Test", "Holdout"]);
    }

    #[test]
    fn test_filter_set_accepts_name_sequence() {
        let mut filters = TagFilterSet::default();
        filters
            .set("intent", "exclude", vec!["Deprecated".to_string()])
            .unwrap();
        assert_eq!(filters.intent.exclude, vec!["Deprecated"]);
    }

    #[test]
    fn test_tag_filter_allows() {
        let filter = TagFilter {
            include: vec!["Test".to_string()],
            exclude: vec!["Broken".to_string()],
        };
        assert!(filter.allows(&["Test"]));
        assert!(filter.allows(&["Test", "Other"]));
        assert!(!filter.allows(&["Other"]));
        assert!(!filter.allows(&["Test", "Broken"]));
        assert!(!filter.allows(&[]));
    }

    #[test]
    fn test_tag_filter_empty_include_keeps_all() {
        let filter = TagFilter {
            include: vec![],
            exclude: vec!["Broken".to_string()],
        };
        assert!(filter.allows(&[]));
        assert!(filter.allows(&["Anything"]));
        assert!(!filter.allows(&["Broken"]));
    }

    #[test]
    fn test_validation_error_display_invalid_color() {
        let err = ValidationError::InvalidColor {
            value: "blue".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("blue"));
        assert!(msg.contains("#rrggbb"));
    }

    #[test]
    fn test_lookup_error_display_intent_not_found() {
        let err = LookupError::IntentNotFound {
            id: "intent-9".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Intent not found"));
        assert!(msg.contains("intent-9"));
    }

    #[test]
    fn test_corpora_error_from_variants() {
        let validation = CorporaError::from(ValidationError::MissingExampleId);
        assert!(matches!(validation, CorporaError::Validation(_)));

        let lookup = CorporaError::from(LookupError::IntentNotFound {
            id: "intent-1".to_string(),
        });
        assert!(matches!(lookup, CorporaError::Lookup(_)));

        let document = CorporaError::from(DocumentError::Malformed {
            reason: "expected string".to_string(),
        });
        assert!(matches!(document, CorporaError::Document(_)));
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

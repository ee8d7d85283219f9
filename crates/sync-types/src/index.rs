//! Index definitions.
//!
//! An [`IndexDefinition`] declares which subset of the repository an external
//! search index cares about and which indexing strategy builds its documents.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Suffix marking an included path as "this node and everything below it".
pub const WILDCARD_MARKER: &str = "%";

/// A subtree rule attached to an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedPath {
    /// Exact tree path, or a path ending in [`WILDCARD_MARKER`].
    pub alias_path: String,

    /// Allowed content types. Empty means any content type.
    #[serde(default)]
    pub content_type_names: Vec<String>,

    /// Identifier assigned by configuration storage.
    #[serde(default)]
    pub identifier: String,
}

impl IncludedPath {
    pub fn new(alias_path: impl Into<String>) -> Self {
        Self {
            alias_path: alias_path.into(),
            content_type_names: Vec::new(),
            identifier: String::new(),
        }
    }

    /// Restrict the path to the given content types.
    pub fn with_content_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_type_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Whether the path covers a whole subtree.
    pub fn is_wildcard(&self) -> bool {
        self.alias_path.ends_with(WILDCARD_MARKER)
    }

    /// The subtree root of a wildcard path, without marker or trailing separator.
    ///
    /// `"/path/%"` and `"/path%"` both yield `"/path"`; `"/%"` yields `""`.
    pub fn wildcard_prefix(&self) -> Option<&str> {
        self.alias_path
            .strip_suffix(WILDCARD_MARKER)
            .map(|prefix| prefix.trim_end_matches('/'))
    }
}

/// Declaration of one external search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Identifier assigned by configuration storage.
    pub id: i32,

    /// Unique, case-insensitive index name.
    pub name: String,

    /// Website channel the index belongs to.
    #[serde(default)]
    pub channel_name: String,

    /// Name of the indexing strategy used to build documents.
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,

    /// Languages the index accepts. Empty means nothing matches.
    #[serde(default)]
    pub language_names: Vec<String>,

    /// Subtree rules for page items, in configuration order.
    #[serde(default)]
    pub included_paths: Vec<IncludedPath>,

    /// Content types accepted for reusable (non-page) items.
    #[serde(default)]
    pub reusable_content_type_names: Vec<String>,
}

fn default_strategy_name() -> String {
    "default".to_string()
}

impl IndexDefinition {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            channel_name: String::new(),
            strategy_name: default_strategy_name(),
            language_names: Vec::new(),
            included_paths: Vec::new(),
            reusable_content_type_names: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = channel_name.into();
        self
    }

    pub fn with_strategy(mut self, strategy_name: impl Into<String>) -> Self {
        self.strategy_name = strategy_name.into();
        self
    }

    /// Add a language; duplicates (case-insensitive) are ignored.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !self
            .language_names
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&language))
        {
            self.language_names.push(language);
        }
        self
    }

    pub fn with_path(mut self, path: IncludedPath) -> Self {
        self.included_paths.push(path);
        self
    }

    /// Add a reusable content type; duplicates (case-insensitive) are ignored.
    pub fn with_reusable_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        if !self
            .reusable_content_type_names
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&content_type))
        {
            self.reusable_content_type_names.push(content_type);
        }
        self
    }

    /// Lookup key used for case-insensitive name comparison.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Reject definitions that could never be addressed.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(SyncError::missing("index name"));
        }
        if self.strategy_name.trim().is_empty() {
            return Err(SyncError::InvalidArgument(format!(
                "index '{}' has no strategy",
                self.name
            )));
        }
        Ok(())
    }
}

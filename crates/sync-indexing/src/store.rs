//! Definition store.
//!
//! Persists index definitions as a TOML file:
//!
//! ```toml
//! [[index]]
//! id = 1
//! name = "Products"
//! language_names = ["en"]
//!
//! [[index.included_paths]]
//! alias_path = "/Products/%"
//! content_type_names = ["Product"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sync_types::IndexDefinition;

use crate::error::IndexingError;
use crate::registry::{validate_definitions, IndexRegistry};

/// On-disk layout of the definitions file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(rename = "index", default)]
    pub indices: Vec<IndexDefinition>,
}

/// Loads and saves index definitions.
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    path: PathBuf,
}

impl DefinitionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every definition. A missing file yields an empty list.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed files, and on duplicate names or ids.
    pub fn load(&self) -> Result<Vec<IndexDefinition>, IndexingError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No definitions file, starting empty");
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let definitions = parse_definitions(&raw)?;
        info!(
            path = %self.path.display(),
            count = definitions.len(),
            "Loaded index definitions"
        );
        Ok(definitions)
    }

    /// Load the file and publish its contents to `registry` in one swap.
    pub fn load_into(&self, registry: &IndexRegistry) -> Result<usize, IndexingError> {
        let definitions = self.load()?;
        let count = definitions.len();
        registry.set_indices(definitions)?;
        Ok(count)
    }

    /// Write definitions, replacing the file.
    pub fn save(&self, definitions: &[IndexDefinition]) -> Result<(), IndexingError> {
        let file = DefinitionFile {
            indices: definitions.to_vec(),
        };
        let raw = toml::to_string_pretty(&file)
            .map_err(|e| IndexingError::Store(format!("serialize definitions: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, raw)?;

        info!(
            path = %self.path.display(),
            count = definitions.len(),
            "Saved index definitions"
        );
        Ok(())
    }

    /// Write the registry's current snapshot.
    pub fn save_registry(&self, registry: &IndexRegistry) -> Result<(), IndexingError> {
        let definitions: Vec<IndexDefinition> = registry
            .get_all_indices()
            .iter()
            .map(|d| d.as_ref().clone())
            .collect();
        self.save(&definitions)
    }
}

/// Parse and validate a definitions document.
pub fn parse_definitions(raw: &str) -> Result<Vec<IndexDefinition>, IndexingError> {
    let file: DefinitionFile =
        toml::from_str(raw).map_err(|e| IndexingError::Store(format!("parse definitions: {e}")))?;

    validate_definitions(&file.indices)?;
    Ok(file.indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::IncludedPath;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[[index]]
id = 1
name = "Products"
language_names = ["en", "cz"]
reusable_content_type_names = ["Banner"]

[[index.included_paths]]
alias_path = "/Products/%"
content_type_names = ["Product"]

[[index]]
id = 2
name = "Articles"
strategy_name = "articles"
language_names = ["en"]

[[index.included_paths]]
alias_path = "/Blog/%"
"#;

    #[test]
    fn test_parse_definitions() {
        let defs = parse_definitions(SAMPLE).unwrap();
        assert_eq!(defs.len(), 2);

        assert_eq!(defs[0].name, "Products");
        assert_eq!(defs[0].strategy_name, "default");
        assert_eq!(defs[0].language_names, vec!["en", "cz"]);
        assert_eq!(defs[0].included_paths[0].alias_path, "/Products/%");
        assert_eq!(defs[0].included_paths[0].content_type_names, vec!["Product"]);
        assert_eq!(defs[0].reusable_content_type_names, vec!["Banner"]);

        assert_eq!(defs[1].strategy_name, "articles");
        assert!(defs[1].included_paths[0].content_type_names.is_empty());
    }

    #[test]
    fn test_parse_rejects_duplicate_names() {
        let raw = r#"
[[index]]
id = 1
name = "Products"

[[index]]
id = 2
name = "PRODUCTS"
"#;
        assert!(matches!(
            parse_definitions(raw),
            Err(IndexingError::DuplicateIndex(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_definitions("[[index]]\nname = 3"),
            Err(IndexingError::Store(_))
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = DefinitionStore::new(dir.path().join("missing.toml"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_into_registry() {
        let dir = TempDir::new().unwrap();
        let store = DefinitionStore::new(dir.path().join("nested").join("indexes.toml"));

        let source = IndexRegistry::with_indices(vec![IndexDefinition::new(7, "Products")
            .with_language("en")
            .with_path(IncludedPath::new("/Products/%").with_content_types(["Product"]))])
        .unwrap();
        store.save_registry(&source).unwrap();

        let target = IndexRegistry::new();
        assert_eq!(store.load_into(&target).unwrap(), 1);

        let loaded = target.get_index("products").unwrap().unwrap();
        assert_eq!(loaded.id, 7);
        assert_eq!(loaded.included_paths[0].content_type_names, vec!["Product"]);
    }
}

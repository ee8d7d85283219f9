//! Match engine.
//!
//! Decides whether a content item belongs to an index. Rules are evaluated in
//! order and short-circuit:
//!
//! 1. Language: the item's language must be one of the index languages
//!    (case-insensitive). An index without languages matches nothing.
//! 2. Path (page items only): some included path must match the item's tree
//!    path, either exactly or as a wildcard subtree.
//! 3. Content type: that same included path must allow the item's content
//!    type, where an empty allowlist allows everything.
//!
//! Reusable items have no tree path; they skip rule 2 and must instead have a
//! content type listed in the index's reusable content types.
//!
//! Every comparison folds case the same way, with Unicode lowercasing, so
//! `"/Café"` and `"/CAFÉ"` are the same path whether or not it is a wildcard.

use sync_types::{ContentItem, IncludedPath, IndexDefinition};

use crate::error::IndexingError;

/// Whether `item` is of interest to `index`.
///
/// # Errors
///
/// Returns an invalid-argument error if the item lacks a content type or
/// language, or carries an empty tree path.
pub fn is_match(item: &ContentItem, index: &IndexDefinition) -> Result<bool, IndexingError> {
    item.validate()?;

    if !language_matches(&item.language, &index.language_names) {
        return Ok(false);
    }

    let matched = match &item.tree_path {
        Some(tree_path) => index.included_paths.iter().any(|path| {
            path_matches(path, tree_path) && content_type_allowed(path, &item.content_type)
        }),
        None => index
            .reusable_content_type_names
            .iter()
            .any(|t| same_text(t, &item.content_type)),
    };
    Ok(matched)
}

/// Case-insensitive membership; an empty language set matches nothing.
pub fn language_matches(language: &str, languages: &[String]) -> bool {
    languages.iter().any(|l| same_text(l, language))
}

/// Whether an included path covers `tree_path`.
///
/// Exact paths compare case-insensitively. A wildcard path `"/a/%"` covers
/// `"/a"` itself and everything below `"/a/"`, but not siblings sharing a
/// string prefix such as `"/ab"`.
pub fn path_matches(path: &IncludedPath, tree_path: &str) -> bool {
    match path.wildcard_prefix() {
        Some(prefix) => {
            let prefix = fold(prefix);
            let tree_path = fold(tree_path);
            if !prefix.is_empty() && tree_path == prefix {
                return true;
            }
            tree_path
                .strip_prefix(&prefix)
                .is_some_and(|rest| rest.starts_with('/'))
        }
        None => same_text(&path.alias_path, tree_path),
    }
}

/// Whether the included path allows the content type.
pub fn content_type_allowed(path: &IncludedPath, content_type: &str) -> bool {
    path.content_type_names.is_empty()
        || path
            .content_type_names
            .iter()
            .any(|t| same_text(t, content_type))
}

fn same_text(a: &str, b: &str) -> bool {
    fold(a) == fold(b)
}

/// Per-character Unicode lowercasing, independent of position in the word.
fn fold(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

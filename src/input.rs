//! Entity list loading
//!
//! The input is a plain text file with one entity per line. Surrounding
//! whitespace is trimmed; blank lines and lines starting with `#` are ignored.

use crate::api::Entity;
use crate::TrawlError;
use std::path::Path;

/// Parses entity names from list text, preserving order and duplicates
pub fn parse_entities(content: &str) -> Vec<Entity> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Entity::new)
        .collect()
}

/// Reads the entity list at `path`
///
/// # Returns
///
/// * `Ok(Vec<Entity>)` - Entities in file order
/// * `Err(TrawlError)` - The file could not be read or holds no entity
pub fn load_entities(path: &Path) -> Result<Vec<Entity>, TrawlError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TrawlError::Input(format!("{}: {}", path.display(), e)))?;
    let entities = parse_entities(&content);
    if entities.is_empty() {
        return Err(TrawlError::Input(format!(
            "{}: no entities listed",
            path.display()
        )));
    }
    Ok(entities)
}

//! Dense bidirectional mapping between identifiers and positions.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Users or items, numbered `0..len()` in load order.
#[derive(Debug, Clone, Default)]
pub struct Index {
    ids: Vec<String>,
    positions: HashMap<String, u32>,
}

impl Index {
    /// Build from identifiers; duplicates keep their first position.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for id in ids {
            let id = id.into();
            if index.positions.contains_key(&id) {
                continue;
            }
            index.positions.insert(id.clone(), index.ids.len() as u32);
            index.ids.push(id);
        }
        index
    }

    /// Load from a file with one identifier per line (first tab field).
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open index file: {}", path.display()))?;

        let mut ids = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if let Some(id) = line.split('\t').next().map(str::trim).filter(|s| !s.is_empty()) {
                ids.push(id.to_string());
            }
        }

        Ok(Self::from_ids(ids))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<u32> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Identifier at `pos`. Panics on out-of-range positions, which only
    /// arise from mixing indexes.
    pub fn id(&self, pos: u32) -> &str {
        &self.ids[pos as usize]
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_load_order() {
        let index = Index::from_ids(["b", "a", "c", "a"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.position("b"), Some(0));
        assert_eq!(index.position("a"), Some(1));
        assert_eq!(index.id(2), "c");
        assert!(index.position("z").is_none());
    }

    #[test]
    fn test_load_ignores_extra_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("users.txt");
        std::fs::write(&path, "u1\tAlice\nu2\n\nu3\textra\tfields\n")?;

        let index = Index::load(&path)?;
        assert_eq!(index.ids().collect::<Vec<_>>(), vec!["u1", "u2", "u3"]);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Index::load(Path::new("/nonexistent/users.txt")).is_err());
    }
}

//! Item feature assignments.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use super::Index;

/// Features per item position.
#[derive(Debug, Clone, Default)]
pub struct FeatureData {
    features: Vec<Vec<String>>,
}

impl FeatureData {
    /// Load `item \t feature [\t value]` lines; unknown items are ignored.
    pub fn load(path: &Path, items: &Index) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open feature file: {}", path.display()))?;

        let mut features = vec![Vec::new(); items.len()];
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            let mut fields = line.split('\t');
            if let (Some(item), Some(feature)) = (fields.next(), fields.next()) {
                if let Some(i) = items.position(item.trim()) {
                    features[i as usize].push(feature.trim().to_string());
                }
            }
        }

        Ok(Self { features })
    }

    pub fn features(&self, item: u32) -> &[String] {
        self.features
            .get(item as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_features(&self, item: u32) -> bool {
        !self.features(item).is_empty()
    }
}

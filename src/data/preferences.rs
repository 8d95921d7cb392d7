//! Sparse user-item preference matrix.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use super::Index;

/// Observed `(user, item, score)` triples, queryable by either side.
///
/// Both views hold `(position, score)` pairs sorted by position, so
/// membership checks are binary searches.
#[derive(Debug, Clone)]
pub struct PreferenceData {
    by_user: Vec<Vec<(u32, f64)>>,
    by_item: Vec<Vec<(u32, f64)>>,
    num_preferences: usize,
}

impl PreferenceData {
    /// Build from positional triples. Repeated pairs keep the last score.
    pub fn from_triples<I>(num_users: usize, num_items: usize, triples: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32, f64)>,
    {
        let mut by_user: Vec<Vec<(u32, f64)>> = vec![Vec::new(); num_users];
        for (u, i, score) in triples {
            by_user[u as usize].push((i, score));
        }

        let mut by_item: Vec<Vec<(u32, f64)>> = vec![Vec::new(); num_items];
        let mut num_preferences = 0;
        for (u, prefs) in by_user.iter_mut().enumerate() {
            // Stable sort, then keep the last occurrence of each item.
            prefs.sort_by_key(|&(i, _)| i);
            let mut deduped: Vec<(u32, f64)> = Vec::with_capacity(prefs.len());
            for &(i, score) in prefs.iter() {
                match deduped.last_mut() {
                    Some(last) if last.0 == i => last.1 = score,
                    _ => deduped.push((i, score)),
                }
            }
            *prefs = deduped;

            for &(i, score) in prefs.iter() {
                by_item[i as usize].push((u as u32, score));
            }
            num_preferences += prefs.len();
        }

        Self {
            by_user,
            by_item,
            num_preferences,
        }
    }

    /// Load `user \t item [\t score]` lines. Unknown identifiers are skipped.
    pub fn load(path: &Path, users: &Index, items: &Index) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open preferences file: {}", path.display()))?;

        let mut triples = Vec::new();
        let mut skipped = 0usize;

        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(user), Some(item)) = (fields.next(), fields.next()) else {
                anyhow::bail!("{}:{}: expected user and item fields", path.display(), n + 1);
            };
            let score = match fields.next() {
                Some(raw) => raw.trim().parse::<f64>().with_context(|| {
                    format!("{}:{}: bad score {:?}", path.display(), n + 1, raw)
                })?,
                None => 1.0,
            };

            match (users.position(user.trim()), items.position(item.trim())) {
                (Some(u), Some(i)) => triples.push((u, i, score)),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(file = %path.display(), skipped, "preferences with unknown user or item");
        }

        Ok(Self::from_triples(users.len(), items.len(), triples))
    }

    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    pub fn num_items(&self) -> usize {
        self.by_item.len()
    }

    pub fn num_preferences(&self) -> usize {
        self.num_preferences
    }

    /// `(item, score)` pairs of user `u`, sorted by item.
    pub fn user_preferences(&self, u: u32) -> &[(u32, f64)] {
        self.by_user.get(u as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(user, score)` pairs of item `i`, sorted by user.
    pub fn item_preferences(&self, i: u32) -> &[(u32, f64)] {
        self.by_item.get(i as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn score(&self, u: u32, i: u32) -> Option<f64> {
        let prefs = self.user_preferences(u);
        prefs
            .binary_search_by_key(&i, |&(item, _)| item)
            .ok()
            .map(|idx| prefs[idx].1)
    }

    pub fn contains(&self, u: u32, i: u32) -> bool {
        self.score(u, i).is_some()
    }

    pub fn users_with_preferences(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_user
            .iter()
            .enumerate()
            .filter(|(_, prefs)| !prefs.is_empty())
            .map(|(u, _)| u as u32)
    }

    pub fn items_with_preferences(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_item
            .iter()
            .enumerate()
            .filter(|(_, prefs)| !prefs.is_empty())
            .map(|(i, _)| i as u32)
    }
}

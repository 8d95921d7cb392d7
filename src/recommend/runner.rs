//! Generates recommendation lists for the target population.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;

use super::{Filters, Recommendation, Recommender};
use crate::data::Index;
use crate::store::RecommendationFormat;

/// Targets computed in parallel per chunk; chunks are written in order.
const CHUNK_SIZE: usize = 256;

pub struct RecommenderRunner {
    users: Arc<Index>,
    items: Arc<Index>,
    targets: Arc<Vec<String>>,
    filters: Arc<Filters>,
    max_length: usize,
}

impl RecommenderRunner {
    pub fn new(
        users: Arc<Index>,
        items: Arc<Index>,
        targets: Arc<Vec<String>>,
        filters: Arc<Filters>,
        max_length: usize,
    ) -> Self {
        Self {
            users,
            items,
            targets,
            filters,
            max_length,
        }
    }

    /// List for one target. Users outside the index get an empty list.
    pub fn recommend(&self, recommender: &dyn Recommender, user: &str) -> Recommendation {
        let items = match self.users.position(user) {
            Some(u) => recommender
                .recommend(u, self.max_length, &|i| self.filters.allows(u, i))
                .into_iter()
                .map(|(i, score)| (self.items.id(i).to_string(), score))
                .collect(),
            None => Vec::new(),
        };
        Recommendation {
            user: user.to_string(),
            items,
        }
    }

    /// Write every target's list to `out` in target order. Returns the
    /// number of lists written.
    pub fn run<W: Write>(
        &self,
        recommender: &dyn Recommender,
        format: RecommendationFormat,
        out: &mut W,
    ) -> Result<usize> {
        for chunk in self.targets.chunks(CHUNK_SIZE) {
            let lists: Vec<Recommendation> = chunk
                .par_iter()
                .map(|user| self.recommend(recommender, user))
                .collect();
            for list in &lists {
                format
                    .write(out, list)
                    .with_context(|| format!("Failed to write recommendations for {}", list.user))?;
            }
        }
        Ok(self.targets.len())
    }
}

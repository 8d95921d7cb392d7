//! Neighborhood-based collaborative filtering.
//!
//! ```text
//! ub: score(u, i) = Σ_{v ∈ N(u)} sim(u, v)^q · r(v, i)
//! ib: score(u, i) = Σ_{j ∈ I(u)} Σ_{i ∈ N(j)} sim(j, i)^q · r(u, j)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::neighborhood::Neighborhood;
use super::Recommender;
use crate::data::PreferenceData;

pub struct UserNeighborhoodRecommender {
    data: Arc<PreferenceData>,
    neighborhood: Box<dyn Neighborhood>,
    q: i32,
}

impl UserNeighborhoodRecommender {
    pub fn new(data: Arc<PreferenceData>, neighborhood: Box<dyn Neighborhood>, q: i32) -> Self {
        Self {
            data,
            neighborhood,
            q,
        }
    }
}

impl Recommender for UserNeighborhoodRecommender {
    fn score(&self, user: u32) -> Vec<(u32, f64)> {
        let mut scores: HashMap<u32, f64> = HashMap::new();
        for (v, sim) in self.neighborhood.neighbors(user) {
            let w = sim.powi(self.q);
            for &(i, r) in self.data.user_preferences(v) {
                *scores.entry(i).or_insert(0.0) += w * r;
            }
        }
        scores.into_iter().collect()
    }

    fn describe(&self) -> String {
        format!("ub(q={}, {})", self.q, self.neighborhood.describe())
    }
}

pub struct ItemNeighborhoodRecommender {
    data: Arc<PreferenceData>,
    neighborhood: Box<dyn Neighborhood>,
    q: i32,
}

impl ItemNeighborhoodRecommender {
    pub fn new(data: Arc<PreferenceData>, neighborhood: Box<dyn Neighborhood>, q: i32) -> Self {
        Self {
            data,
            neighborhood,
            q,
        }
    }
}

impl Recommender for ItemNeighborhoodRecommender {
    fn score(&self, user: u32) -> Vec<(u32, f64)> {
        let mut scores: HashMap<u32, f64> = HashMap::new();
        for &(j, r) in self.data.user_preferences(user) {
            for (i, sim) in self.neighborhood.neighbors(j) {
                *scores.entry(i).or_insert(0.0) += sim.powi(self.q) * r;
            }
        }
        scores.into_iter().collect()
    }

    fn describe(&self) -> String {
        format!("ib(q={}, {})", self.q, self.neighborhood.describe())
    }
}

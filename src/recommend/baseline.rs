//! Non-personalized baselines.

use std::sync::Arc;

use rand::prelude::*;

use super::Recommender;
use crate::data::PreferenceData;

/// Uniformly random scores over every item, reproducible per user.
pub struct RandomRecommender {
    num_items: usize,
    seed: u64,
}

impl RandomRecommender {
    pub fn new(num_items: usize, seed: u64) -> Self {
        Self { num_items, seed }
    }
}

impl Recommender for RandomRecommender {
    fn score(&self, user: u32) -> Vec<(u32, f64)> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ u64::from(user).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        (0..self.num_items as u32).map(|i| (i, rng.gen::<f64>())).collect()
    }

    fn describe(&self) -> String {
        format!("random(seed={})", self.seed)
    }
}

/// Items ranked by how many users interacted with them.
pub struct PopularityRecommender {
    data: Arc<PreferenceData>,
}

impl PopularityRecommender {
    pub fn new(data: Arc<PreferenceData>) -> Self {
        Self { data }
    }
}

impl Recommender for PopularityRecommender {
    fn score(&self, _user: u32) -> Vec<(u32, f64)> {
        self.data
            .items_with_preferences()
            .map(|i| (i, self.data.item_preferences(i).len() as f64))
            .collect()
    }

    fn describe(&self) -> String {
        "pop".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_is_reproducible() {
        let rec = RandomRecommender::new(20, 7);
        assert_eq!(rec.score(3), rec.score(3));
        assert_ne!(rec.score(3), rec.score(4));
        assert_eq!(rec.recommend(3, 5, &|_| true).len(), 5);
    }

    #[test]
    fn test_popularity() {
        let data = Arc::new(PreferenceData::from_triples(
            3,
            3,
            [(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0), (0, 2, 1.0), (1, 2, 1.0)],
        ));
        let rec = PopularityRecommender::new(data);
        assert_eq!(rec.recommend(0, 10, &|_| true), vec![(0, 3.0), (2, 2.0)]);
        assert_eq!(rec.recommend(0, 10, &|i| i != 0), vec![(2, 2.0)]);
    }
}

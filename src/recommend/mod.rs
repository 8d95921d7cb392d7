//! Recommendation components assembled by the factories.
//!
//! ```text
//! PreferenceData ─→ Similarity ─→ Neighborhood ─→ ub / ib ─┐
//!        │                                                  │
//!        ├─→ Factorizer (hkv, pzt, plsa) ─→ Factorization ─→ mf ─┤
//!        ├─→ FmLearner (rmse, bpr) ─→ PreferenceFm ─────→ fm ─┼─→ Recommender ─→ RecommenderRunner
//!        └─→ random, pop ──────────────────────────────────────┘
//! ```
//!
//! Everything works on dense positions from the shared indexes; identifiers
//! only reappear when the runner writes lists out.

mod baseline;
mod factorization;
mod filters;
mod fm;
mod knn;
mod neighborhood;
mod runner;
mod similarity;

pub use baseline::{PopularityRecommender, RandomRecommender};
pub use factorization::{
    Factorization, Factorizer, HkvFactorizer, MfRecommender, PlsaFactorizer, PztFactorizer,
};
pub use filters::{Filters, ItemFilter};
pub use fm::{BprLearner, FmHyper, FmLearner, FmRecommender, PreferenceFm, RmseLearner};
pub use knn::{ItemNeighborhoodRecommender, UserNeighborhoodRecommender};
pub use neighborhood::{
    CachedNeighborhood, InvertedNeighborhood, Neighborhood, ThresholdNeighborhood,
    TopKNeighborhood,
};
pub use runner::RecommenderRunner;
pub use similarity::{Side, Similarity, SimilarityKind};

use std::cmp::Ordering;

/// A ranked list for one user, as written to and read from artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub user: String,
    /// `(item, score)` pairs, best first.
    pub items: Vec<(String, f64)>,
}

/// A fitted recommender over dense positions.
pub trait Recommender: Send + Sync {
    /// Candidate items for `user` with their scores, in no particular order.
    /// Items left out are not candidates.
    fn score(&self, user: u32) -> Vec<(u32, f64)>;

    /// Canonical rendering of the resolved configuration.
    fn describe(&self) -> String;

    /// Best `max_length` candidates accepted by `allow`, best first.
    fn recommend(&self, user: u32, max_length: usize, allow: &dyn Fn(u32) -> bool) -> Vec<(u32, f64)> {
        let candidates = self
            .score(user)
            .into_iter()
            .filter(|&(item, _)| allow(item))
            .collect();
        top_n(candidates, max_length)
    }
}

/// Order by descending score, ties by ascending position.
pub(crate) fn by_score_desc(a: &(u32, f64), b: &(u32, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Keep the `n` best entries, sorted best first.
pub(crate) fn top_n(mut scored: Vec<(u32, f64)>, n: usize) -> Vec<(u32, f64)> {
    if n == 0 {
        return Vec::new();
    }
    if scored.len() > n {
        scored.select_nth_unstable_by(n - 1, by_score_desc);
        scored.truncate(n);
    }
    scored.sort_by(by_score_desc);
    scored
}

//! Neighborhoods: the elements a user or item borrows preferences from.

use dashmap::DashMap;
use rayon::prelude::*;

use super::similarity::Similarity;
use super::top_n;

/// Neighbors of an element with their similarity, strongest first.
pub trait Neighborhood: Send + Sync {
    fn neighbors(&self, x: u32) -> Vec<(u32, f64)>;

    fn describe(&self) -> String;
}

/// The `k` most similar elements.
pub struct TopKNeighborhood {
    similarity: Similarity,
    k: usize,
}

impl TopKNeighborhood {
    pub fn new(similarity: Similarity, k: usize) -> Self {
        Self { similarity, k }
    }

    fn population(&self) -> usize {
        self.similarity.population()
    }
}

impl Neighborhood for TopKNeighborhood {
    fn neighbors(&self, x: u32) -> Vec<(u32, f64)> {
        top_n(self.similarity.similar(x), self.k)
    }

    fn describe(&self) -> String {
        format!("knn(k={}, {})", self.k, self.similarity.describe())
    }
}

/// Every element at least `threshold` similar.
pub struct ThresholdNeighborhood {
    similarity: Similarity,
    threshold: f64,
}

impl ThresholdNeighborhood {
    pub fn new(similarity: Similarity, threshold: f64) -> Self {
        Self {
            similarity,
            threshold,
        }
    }
}

impl Neighborhood for ThresholdNeighborhood {
    fn neighbors(&self, x: u32) -> Vec<(u32, f64)> {
        let kept: Vec<_> = self
            .similarity
            .similar(x)
            .into_iter()
            .filter(|&(_, s)| s >= self.threshold)
            .collect();
        let n = kept.len();
        top_n(kept, n)
    }

    fn describe(&self) -> String {
        format!("threshold(t={}, {})", self.threshold, self.similarity.describe())
    }
}

/// `y` is a neighbor of `x` when `x` is among the top-k of `y`.
///
/// Built eagerly: every element's top-k is computed once at construction.
pub struct InvertedNeighborhood {
    lists: Vec<Vec<(u32, f64)>>,
    description: String,
}

impl InvertedNeighborhood {
    pub fn new(inner: TopKNeighborhood) -> Self {
        let size = inner.population();
        let forward: Vec<Vec<(u32, f64)>> = (0..size as u32)
            .into_par_iter()
            .map(|y| inner.neighbors(y))
            .collect();

        let mut lists = vec![Vec::new(); size];
        for (y, hood) in forward.into_iter().enumerate() {
            for (x, s) in hood {
                lists[x as usize].push((y as u32, s));
            }
        }
        for list in &mut lists {
            let n = list.len();
            *list = top_n(std::mem::take(list), n);
        }

        Self {
            lists,
            description: format!("inverted({})", inner.describe()),
        }
    }
}

impl Neighborhood for InvertedNeighborhood {
    fn neighbors(&self, x: u32) -> Vec<(u32, f64)> {
        self.lists.get(x as usize).cloned().unwrap_or_default()
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Memoizes another neighborhood; safe to query from many threads.
pub struct CachedNeighborhood {
    inner: Box<dyn Neighborhood>,
    memo: DashMap<u32, Vec<(u32, f64)>>,
}

impl CachedNeighborhood {
    pub fn new(inner: Box<dyn Neighborhood>) -> Self {
        Self {
            inner,
            memo: DashMap::new(),
        }
    }
}

impl Neighborhood for CachedNeighborhood {
    fn neighbors(&self, x: u32) -> Vec<(u32, f64)> {
        if let Some(hit) = self.memo.get(&x) {
            return hit.clone();
        }
        let computed = self.inner.neighbors(x);
        self.memo.insert(x, computed.clone());
        computed
    }

    fn describe(&self) -> String {
        format!("cached({})", self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PreferenceData;
    use crate::recommend::similarity::{Side, SimilarityKind};
    use std::sync::Arc;

    fn similarity() -> Similarity {
        // u0 overlaps u1 on two items and u2 on one.
        let data = Arc::new(PreferenceData::from_triples(
            4,
            3,
            [
                (0, 0, 1.0),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 1.0),
                (2, 1, 1.0),
                (2, 2, 1.0),
                (3, 2, 1.0),
            ],
        ));
        Similarity::new(data, Side::Users, SimilarityKind::SetJaccard, true)
    }

    #[test]
    fn test_top_k() {
        let hood = TopKNeighborhood::new(similarity(), 1);
        assert_eq!(hood.neighbors(0), vec![(1, 1.0)]);
        assert_eq!(hood.describe(), "knn(k=1, set-jaccard(dense=true))");
    }

    #[test]
    fn test_threshold() {
        let hood = ThresholdNeighborhood::new(similarity(), 0.5);
        let ids: Vec<u32> = hood.neighbors(0).into_iter().map(|(y, _)| y).collect();
        assert_eq!(ids, vec![1]);

        let loose = ThresholdNeighborhood::new(similarity(), 0.1);
        let ids: Vec<u32> = loose.neighbors(0).into_iter().map(|(y, _)| y).collect();
        assert_eq!(ids, vec![1, 2], "strongest first");
    }

    #[test]
    fn test_inverted() {
        // Top-1: u0 -> u1, u1 -> u0, u2 -> u3 (1/2 beats 1/3), u3 -> u2.
        let hood = InvertedNeighborhood::new(TopKNeighborhood::new(similarity(), 1));
        assert_eq!(hood.neighbors(0), vec![(1, 1.0)]);
        assert_eq!(hood.neighbors(2), vec![(3, 0.5)]);
        assert!(hood.describe().starts_with("inverted(knn(k=1"));
    }

    #[test]
    fn test_cached_matches_inner() {
        let plain = TopKNeighborhood::new(similarity(), 2);
        let cached = CachedNeighborhood::new(Box::new(TopKNeighborhood::new(similarity(), 2)));
        for x in 0..4 {
            assert_eq!(cached.neighbors(x), plain.neighbors(x));
            assert_eq!(cached.neighbors(x), plain.neighbors(x), "second lookup hits the memo");
        }
        assert_eq!(cached.memo.len(), 4);
    }
}

//! Preference-based similarities between users or between items.
//!
//! | Kind        | sim(a, b)                                  |
//! |-------------|--------------------------------------------|
//! | set-cosine  | `|a∩b| / (|a|^α · |b|^(1-α))`              |
//! | vec-cosine  | `a·b / (‖a‖ · ‖b‖)`                        |
//! | set-jaccard | `|a∩b| / (|a| + |b| - |a∩b|)`              |
//! | vec-jaccard | `a·b / (‖a‖² + ‖b‖² - a·b)`                |
//!
//! For user similarity `a` and `b` are user rows; for item similarity they
//! are item columns. `α = 0.5` gives the symmetric cosine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::PreferenceData;

/// Which side of the preference matrix is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Users,
    Items,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimilarityKind {
    SetCosine { alpha: f64 },
    VectorCosine,
    SetJaccard,
    VectorJaccard,
}

impl SimilarityKind {
    fn is_set(self) -> bool {
        matches!(self, Self::SetCosine { .. } | Self::SetJaccard)
    }
}

/// A similarity over one side of a preference matrix.
pub struct Similarity {
    data: Arc<PreferenceData>,
    side: Side,
    kind: SimilarityKind,
    /// Accumulate intersections into a dense buffer instead of a map.
    dense: bool,
    /// `|x|` for set kinds, `‖x‖²` for vector kinds.
    norms: Vec<f64>,
}

impl Similarity {
    pub fn new(data: Arc<PreferenceData>, side: Side, kind: SimilarityKind, dense: bool) -> Self {
        let size = match side {
            Side::Users => data.num_users(),
            Side::Items => data.num_items(),
        };
        let norms = (0..size as u32)
            .map(|x| {
                let v = Self::row(&data, side, x);
                if kind.is_set() {
                    v.len() as f64
                } else {
                    v.iter().map(|&(_, s)| s * s).sum()
                }
            })
            .collect();

        Self {
            data,
            side,
            kind,
            dense,
            norms,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> SimilarityKind {
        self.kind
    }

    /// Number of elements on the compared side.
    pub fn population(&self) -> usize {
        self.norms.len()
    }

    /// Every element with non-zero similarity to `x`, excluding `x`,
    /// sorted by position.
    pub fn similar(&self, x: u32) -> Vec<(u32, f64)> {
        let mut out: Vec<(u32, f64)> = if self.dense {
            self.intersect_dense(x)
        } else {
            self.intersect_sparse(x)
        }
        .into_iter()
        .filter(|&(y, _)| y != x)
        .map(|(y, inter)| (y, self.normalize(x, y, inter)))
        .filter(|&(_, s)| s > 0.0)
        .collect();

        out.sort_by_key(|&(y, _)| y);
        out
    }

    pub fn describe(&self) -> String {
        match self.kind {
            SimilarityKind::SetCosine { alpha } => {
                format!("set-cosine(alpha={alpha}, dense={})", self.dense)
            }
            SimilarityKind::VectorCosine => format!("vec-cosine(dense={})", self.dense),
            SimilarityKind::SetJaccard => format!("set-jaccard(dense={})", self.dense),
            SimilarityKind::VectorJaccard => format!("vec-jaccard(dense={})", self.dense),
        }
    }

    fn row(data: &PreferenceData, side: Side, x: u32) -> &[(u32, f64)] {
        match side {
            Side::Users => data.user_preferences(x),
            Side::Items => data.item_preferences(x),
        }
    }

    fn column(&self, j: u32) -> &[(u32, f64)] {
        match self.side {
            Side::Users => self.data.item_preferences(j),
            Side::Items => self.data.user_preferences(j),
        }
    }

    fn contribution(&self, a: f64, b: f64) -> f64 {
        if self.kind.is_set() {
            1.0
        } else {
            a * b
        }
    }

    fn intersect_dense(&self, x: u32) -> Vec<(u32, f64)> {
        let mut acc = vec![0.0; self.population()];
        let mut seen = vec![false; self.population()];
        let mut touched = Vec::new();
        for &(j, a) in Self::row(&self.data, self.side, x) {
            for &(y, b) in self.column(j) {
                if !seen[y as usize] {
                    seen[y as usize] = true;
                    touched.push(y);
                }
                acc[y as usize] += self.contribution(a, b);
            }
        }
        touched.into_iter().map(|y| (y, acc[y as usize])).collect()
    }

    fn intersect_sparse(&self, x: u32) -> Vec<(u32, f64)> {
        let mut acc: HashMap<u32, f64> = HashMap::new();
        for &(j, a) in Self::row(&self.data, self.side, x) {
            for &(y, b) in self.column(j) {
                *acc.entry(y).or_insert(0.0) += self.contribution(a, b);
            }
        }
        acc.into_iter().collect()
    }

    fn normalize(&self, x: u32, y: u32, inter: f64) -> f64 {
        let nx = self.norms[x as usize];
        let ny = self.norms[y as usize];
        let den = match self.kind {
            SimilarityKind::SetCosine { alpha } => nx.powf(alpha) * ny.powf(1.0 - alpha),
            SimilarityKind::VectorCosine => (nx * ny).sqrt(),
            SimilarityKind::SetJaccard | SimilarityKind::VectorJaccard => nx + ny - inter,
        };
        if den > 0.0 {
            inter / den
        } else {
            0.0
        }
    }
}

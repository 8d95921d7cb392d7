//! Latent factor models for implicit feedback.
//!
//! All three factorizers produce a [`Factorization`] whose score is the dot
//! product `p_u · q_i`:
//!
//! - `hkv`: alternating least squares with confidence `c = 1 + alpha * r`,
//!   each row solved exactly by Cholesky.
//! - `pzt`: the same objective, minimized one coordinate at a time.
//! - `plsa`: probabilistic latent semantic analysis by EM, where
//!   `p_u = p(z|u)` and `q_i = p(i|z)`.

use std::sync::Arc;

use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Recommender;
use crate::data::PreferenceData;

const INIT_SEED: u64 = 0;

/// A fitted factor model, persisted per experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factorization {
    pub label: String,
    pub k: usize,
    pub user_factors: Vec<Vec<f64>>,
    pub item_factors: Vec<Vec<f64>>,
}

impl Factorization {
    pub fn score(&self, user: u32, item: u32) -> f64 {
        dot(&self.user_factors[user as usize], &self.item_factors[item as usize])
    }
}

/// Fits a [`Factorization`] from training preferences.
pub trait Factorizer: Send + Sync {
    fn factorize(&self, data: &PreferenceData) -> Factorization;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct HkvFactorizer {
    pub k: usize,
    pub reg: f64,
    pub alpha: f64,
    pub num_iter: usize,
}

impl Factorizer for HkvFactorizer {
    fn factorize(&self, data: &PreferenceData) -> Factorization {
        let mut rng = StdRng::seed_from_u64(INIT_SEED);
        let mut users = random_rows(&mut rng, data.num_users(), self.k, 0.1);
        let mut items = random_rows(&mut rng, data.num_items(), self.k, 0.1);

        for iter in 0..self.num_iter {
            users = self.sweep(&items, &users, |u| data.user_preferences(u));
            items = self.sweep(&users, &items, |i| data.item_preferences(i));
            debug!(iter, "hkv sweep");
        }

        Factorization {
            label: self.describe(),
            k: self.k,
            user_factors: users,
            item_factors: items,
        }
    }

    fn describe(&self) -> String {
        format!(
            "hkv(k={}, reg={}, alpha={}, numIter={})",
            self.k, self.reg, self.alpha, self.num_iter
        )
    }
}

impl HkvFactorizer {
    /// Solve every row of one side with the other side held fixed.
    fn sweep<'a, F>(&self, fixed: &[Vec<f64>], current: &[Vec<f64>], prefs: F) -> Vec<Vec<f64>>
    where
        F: Fn(u32) -> &'a [(u32, f64)] + Sync,
    {
        let k = self.k;
        let gram = gram(fixed, k);

        (0..current.len() as u32)
            .into_par_iter()
            .map(|x| {
                let mut a = gram.clone();
                let mut b = vec![0.0; k];
                for &(j, r) in prefs(x) {
                    let y = &fixed[j as usize];
                    let c = 1.0 + self.alpha * r;
                    for f in 0..k {
                        b[f] += c * y[f];
                        for g in 0..k {
                            a[f * k + g] += (c - 1.0) * y[f] * y[g];
                        }
                    }
                }
                for f in 0..k {
                    a[f * k + f] += self.reg;
                }
                cholesky_solve(&a, &b, k).unwrap_or_else(|| current[x as usize].clone())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PztFactorizer {
    pub k: usize,
    pub reg: f64,
    pub alpha: f64,
    pub num_iter: usize,
}

impl Factorizer for PztFactorizer {
    fn factorize(&self, data: &PreferenceData) -> Factorization {
        let mut rng = StdRng::seed_from_u64(INIT_SEED);
        let mut users = random_rows(&mut rng, data.num_users(), self.k, 0.1);
        let mut items = random_rows(&mut rng, data.num_items(), self.k, 0.1);

        for iter in 0..self.num_iter {
            self.sweep(&items, &mut users, |u| data.user_preferences(u));
            self.sweep(&users, &mut items, |i| data.item_preferences(i));
            debug!(iter, "pzt sweep");
        }

        Factorization {
            label: self.describe(),
            k: self.k,
            user_factors: users,
            item_factors: items,
        }
    }

    fn describe(&self) -> String {
        format!(
            "pzt(k={}, reg={}, alpha={}, numIter={})",
            self.k, self.reg, self.alpha, self.num_iter
        )
    }
}

impl PztFactorizer {
    /// One pass of coordinate updates over every row of one side.
    fn sweep<'a, F>(&self, fixed: &[Vec<f64>], rows: &mut [Vec<f64>], prefs: F)
    where
        F: Fn(u32) -> &'a [(u32, f64)] + Sync,
    {
        let k = self.k;
        let gram = gram(fixed, k);

        rows.par_iter_mut().enumerate().for_each(|(x, row)| {
            let observed = prefs(x as u32);
            let mut predictions: Vec<f64> = observed
                .iter()
                .map(|&(j, _)| dot(row, &fixed[j as usize]))
                .collect();

            for f in 0..k {
                let gx: f64 = (0..k).map(|g| gram[f * k + g] * row[g]).sum();
                let mut num = -(gx - gram[f * k + f] * row[f]);
                let mut den = gram[f * k + f] + self.reg;
                for (&(j, r), &q) in observed.iter().zip(&predictions) {
                    let y = fixed[j as usize][f];
                    let c = 1.0 + self.alpha * r;
                    let rest = q - row[f] * y;
                    num += c * y - (c - 1.0) * y * rest;
                    den += (c - 1.0) * y * y;
                }
                let updated = num / den;
                let delta = updated - row[f];
                row[f] = updated;
                for (&(j, _), q) in observed.iter().zip(predictions.iter_mut()) {
                    *q += delta * fixed[j as usize][f];
                }
            }
        });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlsaFactorizer {
    pub k: usize,
    pub num_iter: usize,
}

impl Factorizer for PlsaFactorizer {
    fn factorize(&self, data: &PreferenceData) -> Factorization {
        let k = self.k;
        let mut rng = StdRng::seed_from_u64(INIT_SEED);

        let mut p_z_u = random_rows(&mut rng, data.num_users(), k, 1.0);
        p_z_u.iter_mut().for_each(|row| normalize(row));
        let mut p_i_z = random_rows(&mut rng, data.num_items(), k, 1.0);
        normalize_columns(&mut p_i_z, k);

        for iter in 0..self.num_iter {
            // Posterior q(z|u,i) ∝ p(z|u) p(i|z), from the previous estimates.
            let posterior = |u: u32, i: u32| -> Vec<f64> {
                let mut q: Vec<f64> = (0..k)
                    .map(|z| p_z_u[u as usize][z] * p_i_z[i as usize][z])
                    .collect();
                normalize(&mut q);
                q
            };

            let next_users: Vec<Vec<f64>> = (0..data.num_users() as u32)
                .into_par_iter()
                .map(|u| {
                    let mut row = vec![0.0; k];
                    for &(i, r) in data.user_preferences(u) {
                        for (acc, q) in row.iter_mut().zip(posterior(u, i)) {
                            *acc += r * q;
                        }
                    }
                    normalize(&mut row);
                    row
                })
                .collect();

            let mut next_items: Vec<Vec<f64>> = (0..data.num_items() as u32)
                .into_par_iter()
                .map(|i| {
                    let mut row = vec![0.0; k];
                    for &(u, r) in data.item_preferences(i) {
                        for (acc, q) in row.iter_mut().zip(posterior(u, i)) {
                            *acc += r * q;
                        }
                    }
                    row
                })
                .collect();
            normalize_columns(&mut next_items, k);

            p_z_u = next_users;
            p_i_z = next_items;
            debug!(iter, "plsa em step");
        }

        Factorization {
            label: self.describe(),
            k,
            user_factors: p_z_u,
            item_factors: p_i_z,
        }
    }

    fn describe(&self) -> String {
        format!("plsa(k={}, numIter={})", self.k, self.num_iter)
    }
}

/// Scores every item by its factor dot product with the user.
pub struct MfRecommender {
    factorization: Arc<Factorization>,
}

impl MfRecommender {
    pub fn new(factorization: Arc<Factorization>) -> Self {
        Self { factorization }
    }
}

impl Recommender for MfRecommender {
    fn score(&self, user: u32) -> Vec<(u32, f64)> {
        let Some(p) = self.factorization.user_factors.get(user as usize) else {
            return Vec::new();
        };
        self.factorization
            .item_factors
            .iter()
            .enumerate()
            .map(|(i, q)| (i as u32, dot(p, q)))
            .collect()
    }

    fn describe(&self) -> String {
        format!("mf({})", self.factorization.label)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn random_rows(rng: &mut StdRng, n: usize, k: usize, scale: f64) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..k).map(|_| rng.gen::<f64>() * scale).collect())
        .collect()
}

/// `Σ_j y_j y_jᵀ`, row-major `k × k`.
fn gram(rows: &[Vec<f64>], k: usize) -> Vec<f64> {
    let mut g = vec![0.0; k * k];
    for y in rows {
        for f in 0..k {
            for h in 0..k {
                g[f * k + h] += y[f] * y[h];
            }
        }
    }
    g
}

/// Solve `A x = b` for symmetric positive definite `A` (row-major `k × k`).
/// `None` when `A` is not positive definite.
fn cholesky_solve(a: &[f64], b: &[f64], k: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; k * k];
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = (0..j).map(|p| l[i * k + p] * l[j * k + p]).sum();
            if i == j {
                let d = a[i * k + i] - s;
                if d <= 0.0 {
                    return None;
                }
                l[i * k + i] = d.sqrt();
            } else {
                l[i * k + j] = (a[i * k + j] - s) / l[j * k + j];
            }
        }
    }

    // L y = b, then Lᵀ x = y.
    let mut y = vec![0.0; k];
    for i in 0..k {
        let s: f64 = (0..i).map(|p| l[i * k + p] * y[p]).sum();
        y[i] = (b[i] - s) / l[i * k + i];
    }
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let s: f64 = (i + 1..k).map(|p| l[p * k + i] * x[p]).sum();
        x[i] = (y[i] - s) / l[i * k + i];
    }
    Some(x)
}

fn normalize(row: &mut [f64]) {
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        row.iter_mut().for_each(|v| *v /= total);
    }
}

fn normalize_columns(rows: &mut [Vec<f64>], k: usize) {
    let mut totals = vec![0.0; k];
    for row in rows.iter() {
        for (t, v) in totals.iter_mut().zip(row) {
            *t += v;
        }
    }
    for row in rows.iter_mut() {
        for (v, t) in row.iter_mut().zip(&totals) {
            if *t > 0.0 {
                *v /= t;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two disjoint communities: users 0-1 on items 0-1, users 2-3 on items 2-3.
    fn blocks() -> PreferenceData {
        PreferenceData::from_triples(
            4,
            4,
            [
                (0, 0, 1.0),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 1.0),
                (2, 2, 1.0),
                (2, 3, 1.0),
                (3, 2, 1.0),
                (3, 3, 1.0),
            ],
        )
    }

    fn assert_separates_blocks(f: &Factorization) {
        assert!(f.score(0, 1) > f.score(0, 2), "{}: user 0 prefers its block", f.label);
        assert!(f.score(3, 2) > f.score(3, 1), "{}: user 3 prefers its block", f.label);
    }

    #[test]
    fn test_cholesky_solve() {
        // [[4, 2], [2, 3]] x = [2, 1] -> x = [0.5, 0]
        let x = cholesky_solve(&[4.0, 2.0, 2.0, 3.0], &[2.0, 1.0], 2).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
        assert!(cholesky_solve(&[0.0, 0.0, 0.0, 0.0], &[1.0, 1.0], 2).is_none());
    }

    #[test]
    fn test_hkv_separates_blocks() {
        let hkv = HkvFactorizer { k: 2, reg: 0.1, alpha: 10.0, num_iter: 10 };
        let f = hkv.factorize(&blocks());
        assert_eq!(f.user_factors.len(), 4);
        assert_eq!(f.item_factors[0].len(), 2);
        assert_separates_blocks(&f);
        assert_eq!(f.label, "hkv(k=2, reg=0.1, alpha=10, numIter=10)");
    }

    #[test]
    fn test_pzt_separates_blocks() {
        let pzt = PztFactorizer { k: 2, reg: 0.1, alpha: 10.0, num_iter: 20 };
        assert_separates_blocks(&pzt.factorize(&blocks()));
    }

    #[test]
    fn test_plsa_distributions() {
        let plsa = PlsaFactorizer { k: 2, num_iter: 100 };
        let f = plsa.factorize(&blocks());
        for row in &f.user_factors {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9, "p(z|u) sums to one");
        }
        for z in 0..2 {
            let column: f64 = f.item_factors.iter().map(|row| row[z]).sum();
            assert!((column - 1.0).abs() < 1e-9, "p(i|z) sums to one");
        }
        assert_separates_blocks(&f);
    }

    #[test]
    fn test_mf_recommender() {
        let f = Factorization {
            label: "fixed".to_string(),
            k: 1,
            user_factors: vec![vec![1.0]],
            item_factors: vec![vec![0.2], vec![0.9], vec![0.5]],
        };
        let rec = MfRecommender::new(Arc::new(f));
        let ids: Vec<u32> = rec.recommend(0, 2, &|_| true).into_iter().map(|(i, _)| i).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(rec.score(7).is_empty(), "unknown user");
        assert_eq!(rec.describe(), "mf(fixed)");
    }
}

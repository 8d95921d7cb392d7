//! Factorization machines over one-hot `(user, item)` features.
//!
//! Feature `u` is user `u`, feature `num_users + i` is item `i`, so a
//! prediction is `b + w_u + w_i + ⟨m_u, m_i⟩`.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::factorization::dot;
use super::Recommender;
use crate::data::PreferenceData;

const INIT_SEED: u64 = 0;
/// Upper bound on rejection-sampling attempts for one negative item.
const MAX_NEGATIVE_DRAWS: usize = 64;

/// A fitted factorization machine, persisted per experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceFm {
    pub label: String,
    pub num_users: usize,
    pub bias: f64,
    pub weights: Vec<f64>,
    pub factors: Vec<Vec<f64>>,
}

impl PreferenceFm {
    fn init(label: String, num_users: usize, num_items: usize, k: usize, sdev: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(INIT_SEED);
        let n = num_users + num_items;
        Self {
            label,
            num_users,
            bias: 0.0,
            weights: vec![0.0; n],
            factors: (0..n)
                .map(|_| (0..k).map(|_| gaussian(&mut rng) * sdev).collect())
                .collect(),
        }
    }

    fn item_feature(&self, item: u32) -> usize {
        self.num_users + item as usize
    }

    pub fn num_items(&self) -> usize {
        self.weights.len() - self.num_users
    }

    pub fn predict(&self, user: u32, item: u32) -> f64 {
        let (u, i) = (user as usize, self.item_feature(item));
        self.bias + self.weights[u] + self.weights[i] + dot(&self.factors[u], &self.factors[i])
    }
}

/// Trains a [`PreferenceFm`] from training preferences.
pub trait FmLearner: Send + Sync {
    fn learn(&self, data: &PreferenceData) -> PreferenceFm;

    fn describe(&self) -> String;
}

/// Shared SGD hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct FmHyper {
    pub learn_rate: f64,
    pub num_iter: usize,
    pub reg_b: f64,
    pub reg_w: f64,
    pub reg_m: f64,
    pub k: usize,
    pub sdev: f64,
}

impl FmHyper {
    fn render(&self) -> String {
        format!(
            "k={}, learnRate={}, numIter={}, regB={}, regW={}, regM={}, sdev={}",
            self.k, self.learn_rate, self.num_iter, self.reg_b, self.reg_w, self.reg_m, self.sdev
        )
    }
}

/// Pointwise squared loss: observed pairs target 1, sampled negatives 0.
#[derive(Debug, Clone, Copy)]
pub struct RmseLearner {
    pub hyper: FmHyper,
    /// Sampled negatives per observed preference.
    pub negative_prop: f64,
}

impl FmLearner for RmseLearner {
    fn learn(&self, data: &PreferenceData) -> PreferenceFm {
        let h = self.hyper;
        let mut fm = PreferenceFm::init(self.describe(), data.num_users(), data.num_items(), h.k, h.sdev);
        let mut rng = StdRng::seed_from_u64(INIT_SEED + 1);

        for iter in 0..h.num_iter {
            let mut examples: Vec<(u32, u32, f64)> = Vec::new();
            for u in data.users_with_preferences() {
                let prefs = data.user_preferences(u);
                examples.extend(prefs.iter().map(|&(i, _)| (u, i, 1.0)));
                let wanted = (prefs.len() as f64 * self.negative_prop).round() as usize;
                for _ in 0..wanted {
                    if let Some(j) = sample_negative(&mut rng, data, u) {
                        examples.push((u, j, 0.0));
                    }
                }
            }
            examples.shuffle(&mut rng);

            let mut loss = 0.0;
            for (u, i, target) in examples {
                let err = fm.predict(u, i) - target;
                loss += err * err;
                step(&mut fm, &h, u, i, err);
            }
            debug!(iter, loss, "fm rmse epoch");
        }
        fm
    }

    fn describe(&self) -> String {
        format!("rmse({}, negativeProp={})", self.hyper.render(), self.negative_prop)
    }
}

/// Bayesian personalized ranking: observed items above sampled negatives.
#[derive(Debug, Clone, Copy)]
pub struct BprLearner {
    pub hyper: FmHyper,
}

impl FmLearner for BprLearner {
    fn learn(&self, data: &PreferenceData) -> PreferenceFm {
        let h = self.hyper;
        let mut fm = PreferenceFm::init(self.describe(), data.num_users(), data.num_items(), h.k, h.sdev);
        let mut rng = StdRng::seed_from_u64(INIT_SEED + 1);

        let mut pairs: Vec<(u32, u32)> = data
            .users_with_preferences()
            .flat_map(|u| data.user_preferences(u).iter().map(move |&(i, _)| (u, i)))
            .collect();

        for iter in 0..h.num_iter {
            pairs.shuffle(&mut rng);
            let mut objective = 0.0;
            for &(u, i) in &pairs {
                let Some(j) = sample_negative(&mut rng, data, u) else {
                    continue;
                };
                let x = fm.predict(u, i) - fm.predict(u, j);
                let g = 1.0 / (1.0 + x.exp());
                objective += -(1.0 + (-x).exp()).ln();

                let (uf, fi, fj) = (u as usize, fm.item_feature(i), fm.item_feature(j));
                let (wi, wj) = (fm.weights[fi], fm.weights[fj]);
                fm.weights[fi] = wi + h.learn_rate * (g - h.reg_w * wi);
                fm.weights[fj] = wj + h.learn_rate * (-g - h.reg_w * wj);
                for f in 0..h.k {
                    let (mu, mi, mj) = (fm.factors[uf][f], fm.factors[fi][f], fm.factors[fj][f]);
                    fm.factors[uf][f] += h.learn_rate * (g * (mi - mj) - h.reg_m * mu);
                    fm.factors[fi][f] += h.learn_rate * (g * mu - h.reg_m * mi);
                    fm.factors[fj][f] += h.learn_rate * (-g * mu - h.reg_m * mj);
                }
            }
            debug!(iter, objective, "fm bpr epoch");
        }
        fm
    }

    fn describe(&self) -> String {
        format!("bpr({})", self.hyper.render())
    }
}

/// One squared-loss gradient step on `(u, i)` with residual `err`.
fn step(fm: &mut PreferenceFm, h: &FmHyper, u: u32, i: u32, err: f64) {
    let (uf, fi) = (u as usize, fm.item_feature(i));
    let (wu, wi) = (fm.weights[uf], fm.weights[fi]);
    fm.bias -= h.learn_rate * (err + h.reg_b * fm.bias);
    fm.weights[uf] = wu - h.learn_rate * (err + h.reg_w * wu);
    fm.weights[fi] = wi - h.learn_rate * (err + h.reg_w * wi);
    for f in 0..h.k {
        let (mu, mi) = (fm.factors[uf][f], fm.factors[fi][f]);
        fm.factors[uf][f] -= h.learn_rate * (err * mi + h.reg_m * mu);
        fm.factors[fi][f] -= h.learn_rate * (err * mu + h.reg_m * mi);
    }
}

/// An item `user` has no preference for, if one turns up quickly.
fn sample_negative(rng: &mut StdRng, data: &PreferenceData, user: u32) -> Option<u32> {
    let n = data.num_items() as u32;
    if n == 0 || data.user_preferences(user).len() >= n as usize {
        return None;
    }
    (0..MAX_NEGATIVE_DRAWS)
        .map(|_| rng.gen_range(0..n))
        .find(|&j| !data.contains(user, j))
}

/// Standard normal draw (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Scores every item with the fitted machine.
pub struct FmRecommender {
    fm: Arc<PreferenceFm>,
}

impl FmRecommender {
    pub fn new(fm: Arc<PreferenceFm>) -> Self {
        Self { fm }
    }
}

impl Recommender for FmRecommender {
    fn score(&self, user: u32) -> Vec<(u32, f64)> {
        if user as usize >= self.fm.num_users {
            return Vec::new();
        }
        (0..self.fm.num_items() as u32)
            .map(|i| (i, self.fm.predict(user, i)))
            .collect()
    }

    fn describe(&self) -> String {
        format!("fm({})", self.fm.label)
    }
}

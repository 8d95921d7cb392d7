//! Parallel fold of per-user metric values into an aggregate.
//!
//! Users are split across rayon workers. Each worker folds its share into a
//! fresh accumulator, emitting one row per user as it goes; partial
//! accumulators are then merged pairwise in whatever grouping rayon picks.
//! `combine` must therefore be associative and commutative.

use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;

use super::metrics::Metric;
use crate::recommend::Recommendation;

/// Running state of one metric over a set of users.
pub trait Accumulator: Send + Sized {
    /// Absorb one user's list; returns that user's value.
    fn absorb(&mut self, rec: &Recommendation) -> f64;

    /// Merge the state of a disjoint set of users.
    fn combine(self, other: Self) -> Self;

    fn aggregate(&self) -> f64;
}

/// Mean over the whole target population.
///
/// Users without a list count as zero: the sum is divided by `population`,
/// not by the number of lists absorbed.
pub struct AverageAccumulator {
    metric: Arc<Metric>,
    population: usize,
    sum: f64,
    absorbed: usize,
}

impl AverageAccumulator {
    pub fn new(metric: Arc<Metric>, population: usize) -> Self {
        Self {
            metric,
            population,
            sum: 0.0,
            absorbed: 0,
        }
    }

    pub fn absorbed(&self) -> usize {
        self.absorbed
    }
}

impl Accumulator for AverageAccumulator {
    fn absorb(&mut self, rec: &Recommendation) -> f64 {
        let value = self.metric.evaluate(rec);
        self.sum += value;
        self.absorbed += 1;
        value
    }

    fn combine(mut self, other: Self) -> Self {
        self.sum += other.sum;
        self.absorbed += other.absorbed;
        self
    }

    fn aggregate(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.sum / self.population as f64
        }
    }
}

/// Fold `lists` into accumulators seeded by `seed`, calling `emit` with
/// each user's value, and return the merged accumulator.
///
/// `emit` runs on worker threads in no particular order. The first emit
/// error stops the fold and is returned.
pub fn fold_parallel<A, S, E>(lists: &[Recommendation], seed: S, emit: E) -> Result<A>
where
    A: Accumulator,
    S: Fn() -> A + Sync + Send,
    E: Fn(&str, f64) -> Result<()> + Sync + Send,
{
    lists
        .par_iter()
        .try_fold(&seed, |mut acc, rec| {
            let value = acc.absorb(rec);
            emit(&rec.user, value)?;
            Ok::<A, anyhow::Error>(acc)
        })
        .try_reduce(&seed, |a, b| Ok(a.combine(b)))
}

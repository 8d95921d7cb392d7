//! Batch drivers for the two commands.
//!
//! Both read experiment lines lazily and attempt every one of them; a
//! failure is logged and counted, never fatal to the batch. Only problems
//! with the run itself (unreadable input, a closed output) stop it.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, info_span, warn};

use crate::context::RunContext;
use crate::evaluation::{fold_parallel, Accumulator, AverageAccumulator, Metric, RowSink};
use crate::factory::{build_filters, Registry, VariantFactory};
use crate::params::{self, ParameterSet};
use crate::recommend::{Recommendation, RecommenderRunner};
use crate::store::{ArtifactStore, RecommendationFormat};

/// Experiments whose name starts with this are rebuilt even when their
/// artifact exists.
pub const ALWAYS_RERUN_PREFIX: &str = "test";

pub const ARTIFACT_EXTENSION: &str = ".rec";

/// What happened to one experiment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Artifact already present.
    Skipped,
    /// Unresolvable configuration, missing data, or a failed write.
    Failed,
    /// Artifact written, or metrics emitted.
    Built,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Built => self.built += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.built + self.skipped + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} built, {} skipped, {} failed",
            self.built, self.skipped, self.failed
        )
    }
}

/// Builds recommenders and writes their lists as artifacts.
pub struct RecommendationBatch {
    registry: Registry,
    artifacts: ArtifactStore,
    format: RecommendationFormat,
    runner: RecommenderRunner,
}

impl RecommendationBatch {
    /// Fails on bad process configuration: unknown format or filter, or
    /// unreadable shared data.
    pub fn new(ctx: Arc<RunContext>) -> Result<Self> {
        let props = ctx.properties();
        let format: RecommendationFormat = props.format.parse()?;
        let filters = build_filters(&ctx, &props.filters)?;
        info!(filters = %filters.describe(), %format, "recommendation batch ready");

        let runner = RecommenderRunner::new(
            ctx.users()?,
            ctx.items()?,
            ctx.target_users()?,
            Arc::new(filters),
            props.max_length,
        );

        Ok(Self {
            artifacts: ArtifactStore::new(&props.recommendation_path, ARTIFACT_EXTENSION),
            format,
            runner,
            registry: Registry::new(ctx),
        })
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn run<R: BufRead>(&self, input: R) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        for entry in params::read(input) {
            let params = entry.context("Failed to read experiment list")?;
            summary.record(self.run_one(&params));
        }
        Ok(summary)
    }

    pub fn run_one(&self, params: &ParameterSet) -> Outcome {
        let name = params.name();
        let _span = info_span!("experiment", experiment = name).entered();

        if !ArtifactStore::accepts(name) {
            error!("experiment name cannot be used as an artifact name");
            return Outcome::Failed;
        }

        if self.artifacts.exists(name) && !name.starts_with(ALWAYS_RERUN_PREFIX) {
            info!("artifact exists, skipping");
            return Outcome::Skipped;
        }

        let recommender = match self.registry.recommenders().create(params) {
            Ok(Some(recommender)) => recommender,
            Ok(None) => {
                warn!("no recommender could be built");
                return Outcome::Failed;
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "recommender construction failed");
                return Outcome::Failed;
            }
        };
        info!(recommender = %recommender.describe(), "running");

        let written = self.artifacts.write(name, |out| {
            let lists = self.runner.run(recommender.as_ref(), self.format, out)?;
            info!(lists, "recommendations written");
            Ok(())
        });
        match written {
            Ok(()) => Outcome::Built,
            Err(err) => {
                error!(error = %format!("{err:#}"), "recommendation run failed");
                Outcome::Failed
            }
        }
    }
}

/// Evaluates recommendation artifacts against a fixed list of metrics.
pub struct MetricsBatch {
    ctx: Arc<RunContext>,
    artifacts: ArtifactStore,
    format: RecommendationFormat,
    metrics: Vec<(String, Arc<Metric>)>,
}

impl MetricsBatch {
    /// Resolve every metric line of `definitions`; unresolvable ones are
    /// logged and dropped.
    pub fn new<R: BufRead>(ctx: Arc<RunContext>, definitions: R) -> Result<Self> {
        let registry = Registry::new(ctx.clone());
        let mut metrics = Vec::new();
        for entry in params::read(definitions) {
            let params = entry.context("Failed to read metric definitions")?;
            let _span = info_span!("metric", definition = params.name()).entered();
            match registry.metrics().create(&params)? {
                Some(metric) => {
                    info!(metric = %metric.describe(), "metric ready");
                    metrics.push((params.name().to_string(), Arc::new(metric)));
                }
                None => warn!("metric dropped"),
            }
        }

        let props = ctx.properties();
        Ok(Self {
            artifacts: ArtifactStore::new(&props.recommendation_path, ARTIFACT_EXTENSION),
            format: props.format.parse()?,
            metrics,
            ctx,
        })
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(name, _)| name.as_str())
    }

    pub fn run<R: BufRead, W: Write + Send>(
        &self,
        input: R,
        sink: &RowSink<W>,
    ) -> Result<BatchSummary> {
        let targets = self.ctx.target_users()?;
        let mut summary = BatchSummary::default();
        for entry in params::read(input) {
            let params = entry.context("Failed to read experiment list")?;
            summary.record(self.evaluate(params.name(), &targets, sink)?);
        }
        sink.flush()?;
        Ok(summary)
    }

    /// Emit every metric for experiment `name`, one row per target user.
    /// Errors are sink failures; problems with the artifact are reported as
    /// [`Outcome::Failed`].
    fn evaluate<W: Write + Send>(
        &self,
        name: &str,
        targets: &[String],
        sink: &RowSink<W>,
    ) -> Result<Outcome> {
        let _span = info_span!("experiment", experiment = name).entered();

        if !ArtifactStore::accepts(name) {
            error!("experiment name cannot be used as an artifact name");
            return Ok(Outcome::Failed);
        }

        let lists = match self.artifacts.open(name) {
            Ok(Some(reader)) => self.format.read_all(reader),
            Ok(None) => {
                warn!(path = %self.artifacts.path(name).display(), "no recommendations to evaluate");
                return Ok(Outcome::Failed);
            }
            Err(err) => Err(err),
        };
        let lists = match lists {
            Ok(lists) => lists,
            Err(err) => {
                error!(error = %format!("{err:#}"), "unreadable recommendations");
                return Ok(Outcome::Failed);
            }
        };

        let lists = align_to_targets(lists, targets);

        for (metric_name, metric) in &self.metrics {
            let acc = fold_parallel(
                &lists,
                || AverageAccumulator::new(metric.clone(), targets.len()),
                |user, value| sink.emit(name, metric_name, user, value),
            )?;
            sink.emit(name, metric_name, "", acc.aggregate())?;
        }
        Ok(Outcome::Built)
    }
}

/// One list per target user, in target order. Users absent from the
/// artifact get an empty list; lists for non-targets are dropped.
fn align_to_targets(lists: Vec<Recommendation>, targets: &[String]) -> Vec<Recommendation> {
    let mut by_user: HashMap<String, Recommendation> = lists
        .into_iter()
        .map(|list| (list.user.clone(), list))
        .collect();
    let aligned: Vec<Recommendation> = targets
        .iter()
        .map(|user| {
            by_user.remove(user).unwrap_or_else(|| Recommendation {
                user: user.clone(),
                items: Vec::new(),
            })
        })
        .collect();
    if !by_user.is_empty() {
        debug!(ignored = by_user.len(), "lists for non-target users");
    }
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use std::io::Cursor;

    fn batch(fx: &Fixture) -> RecommendationBatch {
        RecommendationBatch::new(fx.ctx.clone()).unwrap()
    }

    #[test]
    fn test_knn_scenario_writes_artifact() -> Result<()> {
        let fx = Fixture::new();
        let batch = batch(&fx);
        let line = "knn-rec recommender=ub neighborhood=knn neighborhood.k=5 \
                    neighborhood.sim=cosine neighborhood.sim.alpha=0.5 q=1\n";

        let summary = batch.run(Cursor::new(line))?;
        assert_eq!(summary, BatchSummary { built: 1, skipped: 0, failed: 0 });

        let path = fx.dir.path().join("recommendations/knn-rec.rec");
        let lists = RecommendationFormat::Simple.read_all(std::io::BufReader::new(std::fs::File::open(path)?))?;
        assert!(!lists.is_empty());
        for list in &lists {
            assert!(list.items.len() <= 100);
            assert!(list.items.windows(2).all(|w| w[0].1 >= w[1].1), "sorted by score");
        }
        // u1 trained on i1, i2, i3; notInTrain removes them.
        let u1 = lists.iter().find(|l| l.user == "u1").unwrap();
        assert!(u1.items.iter().all(|(i, _)| !["i1", "i2", "i3"].contains(&i.as_str())));
        Ok(())
    }

    #[test]
    fn test_existing_artifact_is_skipped() -> Result<()> {
        let fx = Fixture::new();
        let batch = batch(&fx);
        let input = "foo recommender=pop\ntest_foo recommender=pop\n";

        let first = batch.run(Cursor::new(input))?;
        assert_eq!(first, BatchSummary { built: 2, skipped: 0, failed: 0 });

        let second = batch.run(Cursor::new(input))?;
        assert_eq!(second, BatchSummary { built: 1, skipped: 1, failed: 0 });
        assert_eq!(batch.run_one(&ParameterSet::parse("foo recommender=pop")?), Outcome::Skipped);
        assert_eq!(batch.run_one(&ParameterSet::parse("test_foo recommender=pop")?), Outcome::Built);
        Ok(())
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() -> Result<()> {
        let fx = Fixture::new();
        let batch = batch(&fx);
        let input = "\
bad recommender=svd
# comment
half recommender=ub neighborhood=knn neighborhood.sim=pearson
good recommender=random seed=1
";
        let summary = batch.run(Cursor::new(input))?;
        assert_eq!(summary, BatchSummary { built: 1, skipped: 0, failed: 2 });
        assert!(!batch.artifacts().exists("bad"));
        assert!(!batch.artifacts().exists("half"));
        assert!(batch.artifacts().exists("good"));
        assert_eq!(summary.total(), 3);
        Ok(())
    }

    #[test]
    fn test_unknown_format_or_filter_fails_startup() {
        let fx = Fixture::new();
        let mut props = fx.ctx.properties().clone();
        props.format = "zip".to_string();
        assert!(RecommendationBatch::new(Arc::new(RunContext::new(props.clone()))).is_err());

        props.format = "simple".to_string();
        props.filters = vec!["bogus".to_string()];
        assert!(RecommendationBatch::new(Arc::new(RunContext::new(props))).is_err());
    }

    #[test]
    fn test_precision_rows_and_mean() -> Result<()> {
        let fx = Fixture::new();
        batch(&fx).run(Cursor::new("pop recommender=pop\n"))?;

        let metrics = MetricsBatch::new(
            fx.ctx.clone(),
            Cursor::new("p10 metric=prec cutoff=10 rel=bin rel.threshold=4\nbroken metric=map rel=bin\n"),
        )?;
        assert_eq!(metrics.metric_names().collect::<Vec<_>>(), vec!["p10"]);

        let sink = RowSink::new(Vec::new());
        let summary = metrics.run(Cursor::new("pop\n"), &sink)?;
        assert_eq!(summary.built, 1);

        let text = String::from_utf8(sink.into_inner())?;
        let rows: Vec<Vec<&str>> = text.lines().map(|l| l.split('\t').collect()).collect();
        let targets = fx.ctx.target_users()?.len();
        assert_eq!(targets, 4);
        assert_eq!(rows.len(), targets + 1, "one row per user plus the aggregate");

        let (aggregate, per_user) = rows.split_last().unwrap();
        assert_eq!(aggregate[..3], ["pop", "p10", ""], "aggregate comes last");
        let values: Vec<f64> = per_user.iter().map(|r| r[3].parse().unwrap()).collect();
        let mean = values.iter().sum::<f64>() / targets as f64;
        let reported: f64 = aggregate[3].parse()?;
        assert!((reported - mean).abs() < 1e-12, "{reported} vs {mean}");
        assert!(per_user.iter().all(|r| r[0] == "pop" && r[1] == "p10" && !r[2].is_empty()));
        Ok(())
    }

    #[test]
    fn test_unlisted_target_gets_a_row() -> Result<()> {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("targetUsers.txt"), "u1\nu2\nu3\nu4\nghost\n")?;
        batch(&fx).run(Cursor::new("pop recommender=pop\n"))?;

        let metrics = MetricsBatch::new(
            fx.ctx.clone(),
            Cursor::new("p10 metric=prec cutoff=10 rel=bin rel.threshold=4\n"),
        )?;
        let sink = RowSink::new(Vec::new());
        metrics.run(Cursor::new("pop\n"), &sink)?;

        let text = String::from_utf8(sink.into_inner())?;
        let rows: Vec<Vec<&str>> = text.lines().map(|l| l.split('\t').collect()).collect();
        let (aggregate, per_user) = rows.split_last().unwrap();
        assert_eq!(per_user.len(), 5, "{text}");

        let ghost = per_user.iter().find(|r| r[2] == "ghost").unwrap();
        assert_eq!(ghost[3].parse::<f64>()?, 0.0);

        let values: Vec<f64> = per_user.iter().map(|r| r[3].parse().unwrap()).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let reported: f64 = aggregate[3].parse()?;
        assert!((reported - mean).abs() < 1e-12, "{reported} vs {mean}");
        Ok(())
    }

    #[test]
    fn test_path_like_names_fail() -> Result<()> {
        let fx = Fixture::new();
        let batch = batch(&fx);
        let summary = batch.run(Cursor::new("a/b recommender=pop\n../escape recommender=pop\n"))?;
        assert_eq!(summary, BatchSummary { built: 0, skipped: 0, failed: 2 });
        assert!(!fx.dir.path().join("escape.rec").exists());

        let metrics = MetricsBatch::new(fx.ctx.clone(), Cursor::new("q metric=numq\n"))?;
        let sink = RowSink::new(Vec::new());
        let summary = metrics.run(Cursor::new("../escape\n"), &sink)?;
        assert_eq!(summary.failed, 1);
        assert!(sink.into_inner().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_artifact_is_counted_and_skipped_over() -> Result<()> {
        let fx = Fixture::new();
        batch(&fx).run(Cursor::new("pop recommender=pop\n"))?;
        let metrics = MetricsBatch::new(fx.ctx.clone(), Cursor::new("q metric=numq\n"))?;

        let sink = RowSink::new(Vec::new());
        let summary = metrics.run(Cursor::new("ghost\npop\n"), &sink)?;
        assert_eq!(summary, BatchSummary { built: 1, skipped: 0, failed: 1 });

        let text = String::from_utf8(sink.into_inner())?;
        assert!(text.ends_with("pop\tq\t\t1.0\n"), "{text}");
        Ok(())
    }
}

use tracing::warn;

use super::{unrecognized, BuildResult, RelevanceFactory, VariantFactory};
use crate::evaluation::{Metric, MetricKind, RelevanceKind};
use crate::params::ParameterSet;

const DEFAULT_CUTOFF: usize = 10;

/// Metrics, selected by the `metric` key of a metric line:
///
/// ```text
/// p10 metric=prec cutoff=10 rel=bin rel.threshold=4
/// ```
///
/// Every metric except `numq` and `numret` needs a relevance model under
/// `rel`. `recall` and `fscore` need one that knows the relevant count;
/// `ndcg` needs graded `ndcg` relevance.
pub struct MetricFactory {
    relevance: RelevanceFactory,
}

impl MetricFactory {
    pub fn new(relevance: RelevanceFactory) -> Self {
        Self { relevance }
    }

    pub fn relevance(&self) -> &RelevanceFactory {
        &self.relevance
    }
}

impl VariantFactory for MetricFactory {
    type Output = Metric;

    fn family(&self) -> &'static str {
        "metric"
    }

    fn variants(&self) -> &'static [&'static str] {
        &["prec", "recall", "fscore", "hitrate", "onecall", "rr", "ndcg", "numq", "numret"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Metric> {
        let Some(name) = params.get("metric") else {
            return Ok(None);
        };
        let kind = match name {
            "prec" => MetricKind::Precision,
            "recall" => MetricKind::Recall,
            "fscore" => MetricKind::FScore,
            "hitrate" | "onecall" => MetricKind::HitRate,
            "rr" => MetricKind::ReciprocalRank,
            "ndcg" => MetricKind::Ndcg,
            "numq" => MetricKind::NumQueries,
            "numret" => MetricKind::NumRetrieved,
            _ => return unrecognized(self.family(), name, params),
        };
        let cutoff = params.parse_or::<usize>("cutoff", DEFAULT_CUTOFF)?;

        if !kind.needs_relevance() {
            return Ok(Some(Metric::new(kind, cutoff, None)));
        }

        let Some(rel) = params.subset("rel") else {
            return Ok(None);
        };
        let Some(model) = self.relevance.build(&rel)? else {
            return Ok(None);
        };

        let compatible = match kind {
            MetricKind::Recall | MetricKind::FScore => model.is_ideal(),
            MetricKind::Ndcg => matches!(model.kind(), RelevanceKind::Ndcg { .. }),
            _ => true,
        };
        if !compatible {
            warn!(
                metric = name,
                relevance = %model.describe(),
                parameter = %params.path("rel"),
                "relevance model unsuitable for metric"
            );
            return Ok(None);
        }

        Ok(Some(Metric::new(kind, cutoff, Some(model))))
    }
}

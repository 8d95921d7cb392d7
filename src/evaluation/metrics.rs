//! Per-user ranking metrics.
//!
//! | Metric   | Value for one list                                   |
//! |----------|------------------------------------------------------|
//! | prec     | relevant in top-k / k                                |
//! | recall   | relevant in top-k / all relevant                     |
//! | fscore   | harmonic mean of prec and recall                     |
//! | hitrate  | 1 if any relevant in top-k                           |
//! | rr       | 1 / rank of the first relevant in top-k              |
//! | ndcg     | DCG@k / IDCG@k, discount `1 / log₂(rank + 1)`        |
//! | numq     | 1 if the list is non-empty                           |
//! | numret   | list length                                          |

use std::sync::Arc;

use super::relevance::{RelevanceModel, UserRelevance};
use crate::recommend::Recommendation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Precision,
    Recall,
    FScore,
    HitRate,
    ReciprocalRank,
    Ndcg,
    NumQueries,
    NumRetrieved,
}

impl MetricKind {
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Precision => "prec",
            MetricKind::Recall => "recall",
            MetricKind::FScore => "fscore",
            MetricKind::HitRate => "hitrate",
            MetricKind::ReciprocalRank => "rr",
            MetricKind::Ndcg => "ndcg",
            MetricKind::NumQueries => "numq",
            MetricKind::NumRetrieved => "numret",
        }
    }

    /// Whether the metric judges items at all.
    pub fn needs_relevance(self) -> bool {
        !matches!(self, MetricKind::NumQueries | MetricKind::NumRetrieved)
    }
}

/// A metric with its cutoff and relevance model.
pub struct Metric {
    kind: MetricKind,
    cutoff: usize,
    relevance: Option<Arc<RelevanceModel>>,
}

impl Metric {
    /// `relevance` must be present when [`MetricKind::needs_relevance`].
    pub fn new(kind: MetricKind, cutoff: usize, relevance: Option<Arc<RelevanceModel>>) -> Self {
        Self {
            kind,
            cutoff,
            relevance,
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn describe(&self) -> String {
        match &self.relevance {
            Some(rel) => format!("{}@{}({})", self.kind.label(), self.cutoff, rel.describe()),
            None => format!("{}@{}", self.kind.label(), self.cutoff),
        }
    }

    /// Value of the metric for one user's list.
    pub fn evaluate(&self, rec: &Recommendation) -> f64 {
        let ranked: Vec<&str> = rec.items.iter().map(|(item, _)| item.as_str()).collect();
        let top = &ranked[..ranked.len().min(self.cutoff)];
        let judged = self.relevance.as_ref().map(|model| model.for_user(&rec.user));

        match (self.kind, &judged) {
            (MetricKind::NumQueries, _) => {
                if ranked.is_empty() {
                    0.0
                } else {
                    1.0
                }
            }
            (MetricKind::NumRetrieved, _) => ranked.len() as f64,
            (_, None) => 0.0,
            (MetricKind::Precision, Some(rel)) => precision(top, rel, self.cutoff),
            (MetricKind::Recall, Some(rel)) => recall(top, rel),
            (MetricKind::FScore, Some(rel)) => {
                let p = precision(top, rel, self.cutoff);
                let r = recall(top, rel);
                if p + r > 0.0 {
                    2.0 * p * r / (p + r)
                } else {
                    0.0
                }
            }
            (MetricKind::HitRate, Some(rel)) => {
                if hits(top, rel) > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            (MetricKind::ReciprocalRank, Some(rel)) => top
                .iter()
                .position(|item| rel.is_relevant(item))
                .map_or(0.0, |rank| 1.0 / (rank as f64 + 1.0)),
            (MetricKind::Ndcg, Some(rel)) => ndcg(top, rel, self.cutoff),
        }
    }
}

fn hits(top: &[&str], rel: &UserRelevance<'_>) -> usize {
    top.iter().filter(|item| rel.is_relevant(item)).count()
}

fn precision(top: &[&str], rel: &UserRelevance<'_>, cutoff: usize) -> f64 {
    if cutoff == 0 {
        return 0.0;
    }
    hits(top, rel) as f64 / cutoff as f64
}

fn recall(top: &[&str], rel: &UserRelevance<'_>) -> f64 {
    match rel.relevant_count() {
        Some(n) if n > 0 => hits(top, rel) as f64 / n as f64,
        _ => 0.0,
    }
}

fn discount(rank: usize) -> f64 {
    1.0 / (rank as f64 + 2.0).log2()
}

fn ndcg(top: &[&str], rel: &UserRelevance<'_>, cutoff: usize) -> f64 {
    let dcg: f64 = top
        .iter()
        .enumerate()
        .map(|(rank, item)| rel.gain(item) * discount(rank))
        .sum();
    let idcg: f64 = rel
        .ideal_gains()
        .into_iter()
        .take(cutoff)
        .enumerate()
        .map(|(rank, g)| g * discount(rank))
        .sum();

    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Index, PreferenceData};
    use crate::evaluation::relevance::RelevanceKind;

    fn relevance(kind: RelevanceKind) -> Arc<RelevanceModel> {
        let users = Arc::new(Index::from_ids(["u"]));
        let items = Arc::new(Index::from_ids(["a", "b", "c", "d", "e"]));
        // Relevant at threshold 4: a (5) and c (4).
        let test = Arc::new(PreferenceData::from_triples(
            1,
            5,
            [(0, 0, 5.0), (0, 1, 2.0), (0, 2, 4.0)],
        ));
        Arc::new(RelevanceModel::new(kind, test, users, items))
    }

    fn list(items: &[&str]) -> Recommendation {
        Recommendation {
            user: "u".to_string(),
            items: items.iter().map(|i| (i.to_string(), 1.0)).collect(),
        }
    }

    fn binary(kind: MetricKind, cutoff: usize) -> Metric {
        Metric::new(kind, cutoff, Some(relevance(RelevanceKind::Binary { threshold: 4.0 })))
    }

    #[test]
    fn test_precision_divides_by_cutoff() {
        let m = binary(MetricKind::Precision, 4);
        assert_eq!(m.evaluate(&list(&["b", "a", "e"])), 0.25);
        assert_eq!(m.evaluate(&list(&[])), 0.0);
    }

    #[test]
    fn test_recall_and_fscore() {
        let rec = list(&["a", "b", "d", "c"]);
        assert_eq!(binary(MetricKind::Recall, 2).evaluate(&rec), 0.5);
        assert_eq!(binary(MetricKind::Recall, 10).evaluate(&rec), 1.0);

        // p@2 = 0.5, r@2 = 0.5
        assert!((binary(MetricKind::FScore, 2).evaluate(&rec) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hitrate_and_rr() {
        let rec = list(&["b", "d", "c"]);
        assert_eq!(binary(MetricKind::HitRate, 2).evaluate(&rec), 0.0);
        assert_eq!(binary(MetricKind::HitRate, 3).evaluate(&rec), 1.0);
        assert!((binary(MetricKind::ReciprocalRank, 3).evaluate(&rec) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(binary(MetricKind::ReciprocalRank, 2).evaluate(&rec), 0.0);
    }

    #[test]
    fn test_ndcg() {
        let m = Metric::new(
            MetricKind::Ndcg,
            10,
            Some(relevance(RelevanceKind::Ndcg { threshold: 4.0 })),
        );
        // Gains: a = 3, c = 1.
        assert!((m.evaluate(&list(&["a", "c"])) - 1.0).abs() < 1e-12, "ideal order");

        let swapped = m.evaluate(&list(&["c", "a"]));
        let expected = (1.0 + 3.0 / 3f64.log2()) / (3.0 + 1.0 / 3f64.log2());
        assert!((swapped - expected).abs() < 1e-12, "got {swapped}");
    }

    #[test]
    fn test_counting_metrics() {
        let q = Metric::new(MetricKind::NumQueries, 10, None);
        let ret = Metric::new(MetricKind::NumRetrieved, 10, None);
        assert_eq!(q.evaluate(&list(&["x"])), 1.0);
        assert_eq!(q.evaluate(&list(&[])), 0.0);
        assert_eq!(ret.evaluate(&list(&["x", "y", "z"])), 3.0);
        assert_eq!(ret.describe(), "numret@10");
    }

    #[test]
    fn test_describe() {
        assert_eq!(binary(MetricKind::Precision, 10).describe(), "prec@10(bin(threshold=4))");
    }
}

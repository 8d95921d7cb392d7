//! Metric evaluation of recommendation artifacts.
//!
//! ```text
//! RelevanceModel ─→ Metric ─→ AverageAccumulator ─→ fold_parallel ─→ RowSink
//! ```

mod aggregate;
mod metrics;
mod relevance;
mod sink;

pub use aggregate::{fold_parallel, Accumulator, AverageAccumulator};
pub use metrics::{Metric, MetricKind};
pub use relevance::{RelevanceKind, RelevanceModel, UserRelevance};
pub use sink::RowSink;

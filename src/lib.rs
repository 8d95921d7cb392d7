//! rankbench - offline recommender-system experiments
//!
//! Reads line-oriented experiment lists, resolves each line into a
//! recommender or a metric, runs it, and persists or reports the result.
//!
//! # Architecture
//!
//! ```text
//! experiment list → params::read → ParameterSet → factory::Registry → component
//!                                                          │
//!             recommendations: RecommenderRunner → ArtifactStore (<name>.rec)
//!             metrics: artifact → fold_parallel → RowSink (stdout)
//! ```
//!
//! # Experiment lines
//!
//! ```text
//! # one experiment per line, dotted keys configure nested components
//! knn-rec recommender=ub neighborhood=knn neighborhood.k=5 neighborhood.sim=cosine
//! ==
//! everything between two == lines is ignored
//! ==
//! p10 metric=prec cutoff=10 rel=bin rel.threshold=4
//! ```
//!
//! Shared datasets (indexes, train and test preferences) are loaded once
//! into a [`RunContext`] and shared read-only by every component.

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod experiment;
pub mod factory;
pub mod params;
pub mod recommend;
pub mod store;

#[cfg(test)]
mod fixture;

pub use config::Properties;
pub use context::RunContext;
pub use error::ParamError;
pub use experiment::{BatchSummary, MetricsBatch, Outcome, RecommendationBatch};
pub use factory::{BuildError, Registry, VariantFactory};
pub use params::ParameterSet;

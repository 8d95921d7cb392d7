//! Resolution of parameter sets into components.
//!
//! Every component family has one factory. A factory dispatches on a variant
//! name, reads typed parameters with family defaults, and resolves nested
//! configuration through other factories:
//!
//! ```text
//! recommender ─┬─ ub / ib ─→ neighborhood ─→ similarity
//!              ├─ mf ─────→ factorizer
//!              ├─ fm ─────→ fm learner
//!              └─ random / pop
//! metric ──────→ relevance model
//! ```
//!
//! Resolution is all-or-nothing. [`VariantFactory::build`] keeps failures
//! typed so nested calls can short-circuit with `?` and `let ... else`;
//! [`VariantFactory::create`] is the boundary where configuration problems
//! become a logged absence and only resource failures remain errors.

mod fm;
mod factorization;
mod filter;
mod metric;
mod neighborhood;
mod recommender;
mod relevance;
mod similarity;

pub use factorization::FactorizerFactory;
pub use filter::build_filters;
pub use fm::FmLearnerFactory;
pub use metric::MetricFactory;
pub use neighborhood::NeighborhoodFactory;
pub use recommender::RecommenderFactory;
pub use relevance::RelevanceFactory;
pub use similarity::SimilarityFactory;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::context::RunContext;
use crate::error::ParamError;
use crate::params::ParameterSet;
use crate::recommend::Side;
use crate::store::ModelStore;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Bad or missing parameter. Recoverable: the component is skipped.
    #[error(transparent)]
    Config(#[from] ParamError),

    /// Missing data file, failed model write, and the like.
    #[error(transparent)]
    Resource(#[from] anyhow::Error),
}

/// `Ok(None)` is absence: an unrecognized variant or missing nested set.
pub type BuildResult<T> = Result<Option<T>, BuildError>;

pub trait VariantFactory {
    type Output;

    /// Component family, for diagnostics.
    fn family(&self) -> &'static str;

    /// Variant names this factory recognizes.
    fn variants(&self) -> &'static [&'static str];

    fn build(&self, params: &ParameterSet) -> BuildResult<Self::Output>;

    /// Build, collapsing configuration failures into a logged absence.
    fn create(&self, params: &ParameterSet) -> anyhow::Result<Option<Self::Output>> {
        match self.build(params) {
            Ok(Some(component)) => Ok(Some(component)),
            Ok(None) => {
                warn!(family = self.family(), variant = params.name(), "no component built");
                Ok(None)
            }
            Err(BuildError::Config(err)) => {
                warn!(
                    family = self.family(),
                    parameter = err.path().unwrap_or_default(),
                    %err,
                    "invalid configuration"
                );
                Ok(None)
            }
            Err(BuildError::Resource(err)) => Err(err),
        }
    }
}

/// Log an unrecognized variant name and return absence.
pub(crate) fn unrecognized<T>(
    family: &'static str,
    variant: &str,
    params: &ParameterSet,
) -> BuildResult<T> {
    warn!(
        family,
        variant,
        location = params.location(),
        "unrecognized variant"
    );
    Ok(None)
}

/// All top-level factories, wired over one run context.
pub struct Registry {
    recommenders: RecommenderFactory,
    metrics: MetricFactory,
}

impl Registry {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        let models = ModelStore::new(&ctx.properties().model_path);
        let user_hood = NeighborhoodFactory::new(SimilarityFactory::new(ctx.clone(), Side::Users));
        let item_hood = NeighborhoodFactory::new(SimilarityFactory::new(ctx.clone(), Side::Items));

        Self {
            recommenders: RecommenderFactory::new(
                ctx.clone(),
                user_hood,
                item_hood,
                FactorizerFactory,
                FmLearnerFactory,
                models,
            ),
            metrics: MetricFactory::new(RelevanceFactory::new(ctx)),
        }
    }

    pub fn recommenders(&self) -> &RecommenderFactory {
        &self.recommenders
    }

    pub fn metrics(&self) -> &MetricFactory {
        &self.metrics
    }

    /// Every family with its variant names.
    pub fn catalog(&self) -> Vec<(&'static str, &'static [&'static str])> {
        let (user_hood, item_hood) = self.recommenders.neighborhoods();
        vec![
            (self.recommenders.family(), self.recommenders.variants()),
            (user_hood.family(), user_hood.variants()),
            (item_hood.family(), item_hood.variants()),
            (user_hood.similarity().family(), user_hood.similarity().variants()),
            (item_hood.similarity().family(), item_hood.similarity().variants()),
            (FactorizerFactory.family(), FactorizerFactory.variants()),
            (FmLearnerFactory.family(), FmLearnerFactory.variants()),
            (self.metrics.family(), self.metrics.variants()),
            (self.metrics.relevance().family(), self.metrics.relevance().variants()),
        ]
    }
}

use std::sync::Arc;

use super::{unrecognized, BuildResult, VariantFactory};
use crate::context::RunContext;
use crate::params::ParameterSet;
use crate::recommend::{Side, Similarity, SimilarityKind};

const DEFAULT_ALPHA: f64 = 0.5;

/// User or item similarities over the training preferences.
pub struct SimilarityFactory {
    ctx: Arc<RunContext>,
    side: Side,
}

impl SimilarityFactory {
    pub fn new(ctx: Arc<RunContext>, side: Side) -> Self {
        Self { ctx, side }
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl VariantFactory for SimilarityFactory {
    type Output = Similarity;

    fn family(&self) -> &'static str {
        match self.side {
            Side::Users => "user similarity",
            Side::Items => "item similarity",
        }
    }

    fn variants(&self) -> &'static [&'static str] {
        &["cosine", "set-cosine", "vec-cosine", "jaccard", "set-jaccard", "vec-jaccard"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Similarity> {
        let kind = match params.name() {
            "cosine" | "set-cosine" => SimilarityKind::SetCosine {
                alpha: params.double_or("alpha", DEFAULT_ALPHA)?,
            },
            "vec-cosine" => SimilarityKind::VectorCosine,
            "jaccard" | "set-jaccard" => SimilarityKind::SetJaccard,
            "vec-jaccard" => SimilarityKind::VectorJaccard,
            _ => return unrecognized(self.family(), params.name(), params),
        };
        let dense = params.boolean_or("dense", true)?;

        Ok(Some(Similarity::new(self.ctx.train()?, self.side, kind, dense)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::BuildError;
    use crate::fixture::Fixture;

    fn build(line: &str) -> BuildResult<Similarity> {
        let fx = Fixture::new();
        let factory = SimilarityFactory::new(fx.ctx.clone(), Side::Users);
        factory.build(&ParameterSet::parse(line).unwrap())
    }

    #[test]
    fn test_defaults() {
        let sim = build("cosine").unwrap().unwrap();
        assert_eq!(sim.kind(), SimilarityKind::SetCosine { alpha: 0.5 });
        assert_eq!(sim.describe(), "set-cosine(alpha=0.5, dense=true)");
        assert_eq!(sim.side(), Side::Users);
    }

    #[test]
    fn test_parameters() {
        let sim = build("set-cosine alpha=0.3 dense=false").unwrap().unwrap();
        assert_eq!(sim.describe(), "set-cosine(alpha=0.3, dense=false)");
        assert_eq!(build("vec-jaccard").unwrap().unwrap().kind(), SimilarityKind::VectorJaccard);
        assert_eq!(build("jaccard").unwrap().unwrap().kind(), SimilarityKind::SetJaccard);
    }

    #[test]
    fn test_unrecognized_is_absent() {
        assert!(build("pearson").unwrap().is_none());
    }

    #[test]
    fn test_malformed_alpha() {
        assert!(matches!(build("cosine alpha=high"), Err(BuildError::Config(_))));
    }
}

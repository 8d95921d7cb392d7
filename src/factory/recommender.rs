use std::sync::Arc;

use anyhow::Context;

use super::{
    unrecognized, BuildResult, FactorizerFactory, FmLearnerFactory, NeighborhoodFactory,
    VariantFactory,
};
use crate::context::RunContext;
use crate::params::ParameterSet;
use crate::recommend::{
    FmRecommender, ItemNeighborhoodRecommender, MfRecommender, PopularityRecommender,
    RandomRecommender, Recommender, UserNeighborhoodRecommender,
};
use crate::store::ModelStore;

/// Recommenders, selected by the `recommender` key of an experiment line:
///
/// ```text
/// knn-rec recommender=ub q=1 neighborhood=knn neighborhood.k=5 neighborhood.sim=cosine
/// mf-rec  recommender=mf mf=hkv mf.k=20
/// ```
///
/// `mf` and `fm` save the fitted model under the experiment name before
/// returning; a failed save fails the build.
pub struct RecommenderFactory {
    ctx: Arc<RunContext>,
    user_hood: NeighborhoodFactory,
    item_hood: NeighborhoodFactory,
    factorizer: FactorizerFactory,
    fm: FmLearnerFactory,
    models: ModelStore,
}

impl RecommenderFactory {
    pub fn new(
        ctx: Arc<RunContext>,
        user_hood: NeighborhoodFactory,
        item_hood: NeighborhoodFactory,
        factorizer: FactorizerFactory,
        fm: FmLearnerFactory,
        models: ModelStore,
    ) -> Self {
        Self {
            ctx,
            user_hood,
            item_hood,
            factorizer,
            fm,
            models,
        }
    }

    pub fn neighborhoods(&self) -> (&NeighborhoodFactory, &NeighborhoodFactory) {
        (&self.user_hood, &self.item_hood)
    }
}

impl VariantFactory for RecommenderFactory {
    type Output = Box<dyn Recommender>;

    fn family(&self) -> &'static str {
        "recommender"
    }

    fn variants(&self) -> &'static [&'static str] {
        &["random", "pop", "ub", "ib", "mf", "fm"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Box<dyn Recommender>> {
        let Some(variant) = params.get("recommender") else {
            return Ok(None);
        };

        let recommender: Box<dyn Recommender> = match variant {
            "random" => {
                let seed = params.parse_or::<u64>("seed", 0)?;
                Box::new(RandomRecommender::new(self.ctx.items()?.len(), seed))
            }
            "pop" => Box::new(PopularityRecommender::new(self.ctx.train()?)),
            "ub" => {
                let q = params.parse_or::<i32>("q", 1)?;
                let Some(hood) = params.subset("neighborhood") else {
                    return Ok(None);
                };
                let Some(hood) = self.user_hood.build(&hood)? else {
                    return Ok(None);
                };
                Box::new(UserNeighborhoodRecommender::new(self.ctx.train()?, hood, q))
            }
            "ib" => {
                let q = params.parse_or::<i32>("q", 1)?;
                let Some(hood) = params.subset("neighborhood") else {
                    return Ok(None);
                };
                let Some(hood) = self.item_hood.build(&hood)? else {
                    return Ok(None);
                };
                Box::new(ItemNeighborhoodRecommender::new(self.ctx.train()?, hood, q))
            }
            "mf" => {
                let Some(mf) = params.subset("mf") else {
                    return Ok(None);
                };
                let Some(factorizer) = self.factorizer.build(&mf)? else {
                    return Ok(None);
                };
                let train = self.ctx.train()?;
                let factorization = factorizer.factorize(&train);
                self.models
                    .save(params.name(), &factorization)
                    .with_context(|| format!("Failed to save model for {}", params.name()))?;
                Box::new(MfRecommender::new(Arc::new(factorization)))
            }
            "fm" => {
                let Some(fm) = params.subset("fm") else {
                    return Ok(None);
                };
                let Some(learner) = self.fm.build(&fm)? else {
                    return Ok(None);
                };
                let train = self.ctx.train()?;
                let machine = learner.learn(&train);
                self.models
                    .save(params.name(), &machine)
                    .with_context(|| format!("Failed to save model for {}", params.name()))?;
                Box::new(FmRecommender::new(Arc::new(machine)))
            }
            _ => return unrecognized(self.family(), variant, params),
        };

        Ok(Some(recommender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{BuildError, Registry};
    use crate::fixture::Fixture;
    use crate::recommend::Factorization;

    fn describe(fx: &Fixture, line: &str) -> Option<String> {
        Registry::new(fx.ctx.clone())
            .recommenders()
            .build(&ParameterSet::parse(line).unwrap())
            .unwrap()
            .map(|r| r.describe())
    }

    #[test]
    fn test_user_knn_line() {
        let fx = Fixture::new();
        let line = "knn-rec recommender=ub neighborhood=knn neighborhood.k=5 \
                    neighborhood.sim=cosine neighborhood.sim.alpha=0.5 q=1";
        assert_eq!(
            describe(&fx, line).as_deref(),
            Some("ub(q=1, knn(k=5, set-cosine(alpha=0.5, dense=true)))")
        );
    }

    #[test]
    fn test_item_knn_and_baselines() {
        let fx = Fixture::new();
        assert_eq!(
            describe(&fx, "x recommender=ib q=2 neighborhood=knn neighborhood.sim=vec-cosine").as_deref(),
            Some("ib(q=2, knn(k=10, vec-cosine(dense=true)))")
        );
        assert_eq!(describe(&fx, "x recommender=pop").as_deref(), Some("pop"));
        assert_eq!(describe(&fx, "x recommender=random seed=3").as_deref(), Some("random(seed=3)"));
    }

    #[test]
    fn test_mf_saves_model() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let described = describe(&fx, "mf-rec recommender=mf mf=hkv mf.k=2 mf.numIter=2");
        assert_eq!(described.as_deref(), Some("mf(hkv(k=2, reg=1, alpha=1, numIter=2))"));

        let store = ModelStore::new(fx.dir.path().join("models"));
        let saved: Factorization = store.load("mf-rec")?.unwrap();
        assert_eq!(saved.user_factors.len(), 4);
        assert_eq!(saved.item_factors.len(), 6);
        Ok(())
    }

    #[test]
    fn test_fm_saves_model() {
        let fx = Fixture::new();
        let described = describe(&fx, "fm-rec recommender=fm fm=bpr fm.k=2 fm.numIter=3");
        assert!(described.unwrap().starts_with("fm(bpr(k=2"));
        assert!(fx.dir.path().join("models/fm-rec").is_file());
    }

    #[test]
    fn test_failed_model_save_fails_build() -> anyhow::Result<()> {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("models"), "not a directory")?;
        let params = ParameterSet::parse("mf-rec recommender=mf mf=plsa mf.k=2 mf.numIter=1")?;
        let result = Registry::new(fx.ctx.clone()).recommenders().build(&params);
        assert!(matches!(result, Err(BuildError::Resource(_))));
        Ok(())
    }

    #[test]
    fn test_absence_at_every_level() {
        let fx = Fixture::new();
        for line in [
            "x recommender=svd",
            "x recommender=ub",
            "x recommender=ub neighborhood=nearest neighborhood.sim=cosine",
            "x recommender=ub neighborhood=knn neighborhood.sim=pearson",
            "x recommender=mf mf=svd",
            "x recommender=fm fm=warp",
            "x neighborhood=knn",
        ] {
            assert!(describe(&fx, line).is_none(), "{line}");
        }
    }
}

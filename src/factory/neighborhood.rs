use super::{unrecognized, BuildResult, SimilarityFactory, VariantFactory};
use crate::error::ParamError;
use crate::params::ParameterSet;
use crate::recommend::{
    CachedNeighborhood, InvertedNeighborhood, Neighborhood, Side, Similarity,
    ThresholdNeighborhood, TopKNeighborhood,
};

/// User or item neighborhoods.
///
/// | Variant   | Parameters                                 |
/// |-----------|--------------------------------------------|
/// | knn       | `k` (users 100, items 10), `sim`, `cached` |
/// | threshold | `t` (required), `sim`, `cached`            |
/// | inverted  | `k`, `sim`; never cached                   |
pub struct NeighborhoodFactory {
    similarity: SimilarityFactory,
}

impl NeighborhoodFactory {
    pub fn new(similarity: SimilarityFactory) -> Self {
        Self { similarity }
    }

    pub fn similarity(&self) -> &SimilarityFactory {
        &self.similarity
    }

    fn default_k(&self) -> usize {
        match self.similarity.side() {
            Side::Users => 100,
            Side::Items => 10,
        }
    }

    fn positive_k(&self, params: &ParameterSet) -> Result<usize, ParamError> {
        let k = params.parse_or::<usize>("k", self.default_k())?;
        if k == 0 {
            return Err(ParamError::Malformed {
                path: params.path("k"),
                value: k.to_string(),
                expected: "positive neighborhood size",
            });
        }
        Ok(k)
    }

    fn nested_similarity(&self, params: &ParameterSet) -> BuildResult<Similarity> {
        let Some(sim) = params.subset("sim") else {
            return Ok(None);
        };
        self.similarity.build(&sim)
    }
}

impl VariantFactory for NeighborhoodFactory {
    type Output = Box<dyn Neighborhood>;

    fn family(&self) -> &'static str {
        match self.similarity.side() {
            Side::Users => "user neighborhood",
            Side::Items => "item neighborhood",
        }
    }

    fn variants(&self) -> &'static [&'static str] {
        &["knn", "threshold", "inverted"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Box<dyn Neighborhood>> {
        let hood: Box<dyn Neighborhood> = match params.name() {
            "knn" => {
                let k = self.positive_k(params)?;
                let Some(sim) = self.nested_similarity(params)? else {
                    return Ok(None);
                };
                Box::new(TopKNeighborhood::new(sim, k))
            }
            "threshold" => {
                let t = params.double("t")?;
                let Some(sim) = self.nested_similarity(params)? else {
                    return Ok(None);
                };
                Box::new(ThresholdNeighborhood::new(sim, t))
            }
            "inverted" => {
                let k = self.positive_k(params)?;
                let Some(sim) = self.nested_similarity(params)? else {
                    return Ok(None);
                };
                return Ok(Some(Box::new(InvertedNeighborhood::new(TopKNeighborhood::new(sim, k)))));
            }
            _ => return unrecognized(self.family(), params.name(), params),
        };

        if params.boolean_or("cached", false)? {
            Ok(Some(Box::new(CachedNeighborhood::new(hood))))
        } else {
            Ok(Some(hood))
        }
    }
}

use super::{unrecognized, BuildResult, VariantFactory};
use crate::params::ParameterSet;
use crate::recommend::{Factorizer, HkvFactorizer, PlsaFactorizer, PztFactorizer};

const DEFAULT_K: usize = 50;
const DEFAULT_REG: f64 = 1.0;
const DEFAULT_ALPHA: f64 = 1.0;
const ALS_ITERATIONS: usize = 20;
const EM_ITERATIONS: usize = 100;

/// Matrix factorization algorithms: `hkv`, `pzt`, `plsa`.
pub struct FactorizerFactory;

impl VariantFactory for FactorizerFactory {
    type Output = Box<dyn Factorizer>;

    fn family(&self) -> &'static str {
        "factorization"
    }

    fn variants(&self) -> &'static [&'static str] {
        &["hkv", "pzt", "plsa"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Box<dyn Factorizer>> {
        let k = params.parse_or::<usize>("k", DEFAULT_K)?;
        let factorizer: Box<dyn Factorizer> = match params.name() {
            "hkv" => Box::new(HkvFactorizer {
                k,
                reg: params.double_or("reg", DEFAULT_REG)?,
                alpha: params.double_or("alpha", DEFAULT_ALPHA)?,
                num_iter: params.parse_or("numIter", ALS_ITERATIONS)?,
            }),
            "pzt" => Box::new(PztFactorizer {
                k,
                reg: params.double_or("reg", DEFAULT_REG)?,
                alpha: params.double_or("alpha", DEFAULT_ALPHA)?,
                num_iter: params.parse_or("numIter", ALS_ITERATIONS)?,
            }),
            "plsa" => Box::new(PlsaFactorizer {
                k,
                num_iter: params.parse_or("numIter", EM_ITERATIONS)?,
            }),
            _ => return unrecognized(self.family(), params.name(), params),
        };
        Ok(Some(factorizer))
    }
}

use super::{unrecognized, BuildResult, VariantFactory};
use crate::params::ParameterSet;
use crate::recommend::{BprLearner, FmHyper, FmLearner, RmseLearner};

/// Factorization machine learners: `rmse`, `bpr`.
pub struct FmLearnerFactory;

impl FmLearnerFactory {
    fn hyper(params: &ParameterSet) -> Result<FmHyper, crate::error::ParamError> {
        Ok(FmHyper {
            learn_rate: params.double_or("learnRate", 0.01)?,
            num_iter: params.parse_or("numIter", 50)?,
            reg_b: params.double_or("regB", 0.01)?,
            reg_w: params.double_or("regW", 0.01)?,
            reg_m: params.double_or("regM", 0.01)?,
            k: params.parse_or("k", 100)?,
            sdev: params.double_or("sdev", 0.1)?,
        })
    }
}

impl VariantFactory for FmLearnerFactory {
    type Output = Box<dyn FmLearner>;

    fn family(&self) -> &'static str {
        "factorization machine"
    }

    fn variants(&self) -> &'static [&'static str] {
        &["rmse", "bpr"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Box<dyn FmLearner>> {
        let learner: Box<dyn FmLearner> = match params.name() {
            "rmse" => Box::new(RmseLearner {
                hyper: Self::hyper(params)?,
                negative_prop: params.double_or("negativeProp", 2.0)?,
            }),
            "bpr" => Box::new(BprLearner {
                hyper: Self::hyper(params)?,
            }),
            _ => return unrecognized(self.family(), params.name(), params),
        };
        Ok(Some(learner))
    }
}

use std::sync::Arc;

use super::{unrecognized, BuildResult, VariantFactory};
use crate::context::RunContext;
use crate::evaluation::{RelevanceKind, RelevanceModel};
use crate::params::ParameterSet;

const DEFAULT_THRESHOLD: f64 = 1.0;

/// Relevance models over the test split: `bin`, `none`, `bck`, `ndcg`, `err`.
pub struct RelevanceFactory {
    ctx: Arc<RunContext>,
}

impl RelevanceFactory {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx }
    }
}

impl VariantFactory for RelevanceFactory {
    type Output = Arc<RelevanceModel>;

    fn family(&self) -> &'static str {
        "relevance model"
    }

    fn variants(&self) -> &'static [&'static str] {
        &["bin", "none", "bck", "ndcg", "err"]
    }

    fn build(&self, params: &ParameterSet) -> BuildResult<Arc<RelevanceModel>> {
        let threshold = params.double_or("threshold", DEFAULT_THRESHOLD)?;
        let kind = match params.name() {
            "bin" => RelevanceKind::Binary { threshold },
            "none" => RelevanceKind::NoRelevance,
            "bck" => RelevanceKind::Background {
                threshold,
                background: params.double("background")?,
            },
            "ndcg" => RelevanceKind::Ndcg { threshold },
            "err" => RelevanceKind::Err { threshold },
            _ => return unrecognized(self.family(), params.name(), params),
        };

        Ok(Some(Arc::new(RelevanceModel::new(
            kind,
            self.ctx.test()?,
            self.ctx.users()?,
            self.ctx.items()?,
        ))))
    }
}

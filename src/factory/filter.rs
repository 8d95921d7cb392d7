use anyhow::{bail, Result};

use crate::context::RunContext;
use crate::recommend::{Filters, ItemFilter};

const FEATURE_FILTER_PREFIX: &str = "withFeatures_";

/// Candidate filters named in the run properties.
///
/// Unlike experiment components these are process configuration: an unknown
/// name is an error, not an absence.
pub fn build_filters(ctx: &RunContext, names: &[String]) -> Result<Filters> {
    let mut filters = Vec::with_capacity(names.len());
    for name in names {
        let filter = match name.as_str() {
            "all" => ItemFilter::All,
            "notInTrain" => ItemFilter::NotInTrain(ctx.train()?),
            other => match other.strip_prefix(FEATURE_FILTER_PREFIX) {
                Some(features) if !features.is_empty() => ItemFilter::WithFeatures {
                    name: features.to_string(),
                    data: ctx.features(features)?,
                },
                _ => bail!("Unknown filter: {other}"),
            },
        };
        filters.push(filter);
    }
    Ok(Filters::new(filters))
}

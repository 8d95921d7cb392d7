//! Candidate filters applied before ranking.

use std::sync::Arc;

use crate::data::{FeatureData, PreferenceData};

pub enum ItemFilter {
    /// Every item is a candidate.
    All,
    /// Items the user already has in training are excluded.
    NotInTrain(Arc<PreferenceData>),
    /// Only items with at least one feature in the named feature set.
    WithFeatures { name: String, data: Arc<FeatureData> },
}

impl ItemFilter {
    pub fn allows(&self, user: u32, item: u32) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::NotInTrain(train) => !train.contains(user, item),
            ItemFilter::WithFeatures { data, .. } => data.has_features(item),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ItemFilter::All => "all".to_string(),
            ItemFilter::NotInTrain(_) => "notInTrain".to_string(),
            ItemFilter::WithFeatures { name, .. } => format!("withFeatures_{name}"),
        }
    }
}

/// Conjunction of filters: an item must pass every one.
#[derive(Default)]
pub struct Filters {
    filters: Vec<ItemFilter>,
}

impl Filters {
    pub fn new(filters: Vec<ItemFilter>) -> Self {
        Self { filters }
    }

    pub fn allows(&self, user: u32, item: u32) -> bool {
        self.filters.iter().all(|f| f.allows(user, item))
    }

    pub fn describe(&self) -> String {
        let names: Vec<String> = self.filters.iter().map(ItemFilter::describe).collect();
        names.join(" & ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Index;

    #[test]
    fn test_conjunction() -> anyhow::Result<()> {
        let train = Arc::new(PreferenceData::from_triples(1, 3, [(0, 0, 1.0)]));

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genre.txt");
        std::fs::write(&path, "i0\tdrama\ni2\tcomedy\n")?;
        let items = Index::from_ids(["i0", "i1", "i2"]);
        let features = Arc::new(FeatureData::load(&path, &items)?);

        let filters = Filters::new(vec![
            ItemFilter::NotInTrain(train),
            ItemFilter::WithFeatures { name: "genre".to_string(), data: features },
        ]);
        assert!(!filters.allows(0, 0), "seen in training");
        assert!(!filters.allows(0, 1), "no features");
        assert!(filters.allows(0, 2));
        assert_eq!(filters.describe(), "notInTrain & withFeatures_genre");
        Ok(())
    }

    #[test]
    fn test_empty_allows_everything() {
        assert!(Filters::default().allows(3, 4));
        assert!(ItemFilter::All.allows(0, 0));
    }
}

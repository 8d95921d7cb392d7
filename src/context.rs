//! Shared, read-only run state threaded through every factory.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::Properties;
use crate::data::{FeatureData, Index, PreferenceData};

/// Everything a component may depend on, loaded on first use.
///
/// Datasets are shared by `Arc` and never mutated once loaded, so any number
/// of concurrently built components can hold them.
pub struct RunContext {
    properties: Properties,
    users: OnceCell<Arc<Index>>,
    items: OnceCell<Arc<Index>>,
    train: OnceCell<Arc<PreferenceData>>,
    test: OnceCell<Arc<PreferenceData>>,
    target_users: OnceCell<Arc<Vec<String>>>,
    features: DashMap<String, Arc<FeatureData>>,
}

impl RunContext {
    pub fn new(properties: Properties) -> Self {
        Self {
            properties,
            users: OnceCell::new(),
            items: OnceCell::new(),
            train: OnceCell::new(),
            test: OnceCell::new(),
            target_users: OnceCell::new(),
            features: DashMap::new(),
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn users(&self) -> Result<Arc<Index>> {
        self.users
            .get_or_try_init(|| -> Result<_> {
                let index = Index::load(&self.properties.users_file)?;
                info!(users = index.len(), "loaded user index");
                Ok(Arc::new(index))
            })
            .cloned()
    }

    pub fn items(&self) -> Result<Arc<Index>> {
        self.items
            .get_or_try_init(|| -> Result<_> {
                let index = Index::load(&self.properties.items_file)?;
                info!(items = index.len(), "loaded item index");
                Ok(Arc::new(index))
            })
            .cloned()
    }

    /// Training preferences, the input of every recommender.
    pub fn train(&self) -> Result<Arc<PreferenceData>> {
        self.train
            .get_or_try_init(|| self.load_preferences(&self.properties.train_file, "train"))
            .cloned()
    }

    /// Held-out preferences, the ground truth of every relevance model.
    pub fn test(&self) -> Result<Arc<PreferenceData>> {
        self.test
            .get_or_try_init(|| self.load_preferences(&self.properties.test_file, "test"))
            .cloned()
    }

    /// Users to recommend for and evaluate over.
    ///
    /// Read from the target-users file when present, otherwise every user
    /// with test preferences.
    pub fn target_users(&self) -> Result<Arc<Vec<String>>> {
        self.target_users
            .get_or_try_init(|| -> Result<_> {
                let path = &self.properties.target_users_file;
                let targets: Vec<String> = if path.exists() {
                    let content = fs::read_to_string(path).with_context(|| {
                        format!("Failed to read target users: {}", path.display())
                    })?;
                    let mut seen = HashSet::new();
                    content
                        .lines()
                        .filter_map(|line| line.split('\t').next())
                        .map(str::trim)
                        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
                        .map(str::to_string)
                        .collect()
                } else {
                    let users = self.users()?;
                    self.test()?
                        .users_with_preferences()
                        .map(|u| users.id(u).to_string())
                        .collect()
                };
                info!(targets = targets.len(), "resolved target users");
                Ok(Arc::new(targets))
            })
            .cloned()
    }

    /// Item features from feature file `name`, loaded once per name.
    pub fn features(&self, name: &str) -> Result<Arc<FeatureData>> {
        if let Some(data) = self.features.get(name) {
            return Ok(data.clone());
        }
        let items = self.items()?;
        let data = Arc::new(FeatureData::load(&self.properties.feature_file(name), &items)?);
        self.features.insert(name.to_string(), data.clone());
        Ok(data)
    }

    fn load_preferences(
        &self,
        path: &std::path::Path,
        label: &'static str,
    ) -> Result<Arc<PreferenceData>> {
        let users = self.users()?;
        let items = self.items()?;
        let data = PreferenceData::load(path, &users, &items)?;
        info!(
            split = label,
            preferences = data.num_preferences(),
            "loaded preferences"
        );
        Ok(Arc::new(data))
    }
}

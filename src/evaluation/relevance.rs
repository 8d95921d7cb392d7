//! Relevance judgments derived from held-out preferences.
//!
//! | Model | Relevant when           | Gain                                      |
//! |-------|-------------------------|-------------------------------------------|
//! | bin   | `r >= t`                | 1                                         |
//! | none  | always                  | 1                                         |
//! | bck   | `r >= t`                | 1, judged non-relevant 0, unjudged `b`    |
//! | ndcg  | `r >= t`                | `2^(r - t + 1) - 1`                       |
//! | err   | `r >= t`                | ndcg gain / the user's largest ndcg gain  |

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{Index, PreferenceData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelevanceKind {
    Binary { threshold: f64 },
    NoRelevance,
    Background { threshold: f64, background: f64 },
    Ndcg { threshold: f64 },
    Err { threshold: f64 },
}

/// Judges recommended items against the test split.
pub struct RelevanceModel {
    kind: RelevanceKind,
    test: Arc<PreferenceData>,
    users: Arc<Index>,
    items: Arc<Index>,
}

impl RelevanceModel {
    pub fn new(
        kind: RelevanceKind,
        test: Arc<PreferenceData>,
        users: Arc<Index>,
        items: Arc<Index>,
    ) -> Self {
        Self {
            kind,
            test,
            users,
            items,
        }
    }

    pub fn kind(&self) -> RelevanceKind {
        self.kind
    }

    /// Whether every relevant item is known up front, so recall-style
    /// metrics have a denominator.
    pub fn is_ideal(&self) -> bool {
        matches!(
            self.kind,
            RelevanceKind::Binary { .. }
                | RelevanceKind::Background { .. }
                | RelevanceKind::Ndcg { .. }
                | RelevanceKind::Err { .. }
        )
    }

    pub fn describe(&self) -> String {
        match self.kind {
            RelevanceKind::Binary { threshold } => format!("bin(threshold={threshold})"),
            RelevanceKind::NoRelevance => "none".to_string(),
            RelevanceKind::Background { threshold, background } => {
                format!("bck(threshold={threshold}, background={background})")
            }
            RelevanceKind::Ndcg { threshold } => format!("ndcg(threshold={threshold})"),
            RelevanceKind::Err { threshold } => format!("err(threshold={threshold})"),
        }
    }

    /// Judgments for one user.
    pub fn for_user(&self, user: &str) -> UserRelevance<'_> {
        let threshold = match self.kind {
            RelevanceKind::Binary { threshold }
            | RelevanceKind::Background { threshold, .. }
            | RelevanceKind::Ndcg { threshold }
            | RelevanceKind::Err { threshold } => threshold,
            RelevanceKind::NoRelevance => {
                return UserRelevance {
                    model: self,
                    gains: HashMap::new(),
                    judged: HashMap::new(),
                    everything: true,
                };
            }
        };

        let prefs = self
            .users
            .position(user)
            .map(|u| self.test.user_preferences(u))
            .unwrap_or(&[]);

        let mut gains: HashMap<String, f64> = prefs
            .iter()
            .filter(|&&(_, r)| r >= threshold)
            .map(|&(i, r)| {
                let gain = match self.kind {
                    RelevanceKind::Ndcg { .. } | RelevanceKind::Err { .. } => {
                        2f64.powf(r - threshold + 1.0) - 1.0
                    }
                    _ => 1.0,
                };
                (self.items.id(i).to_string(), gain)
            })
            .collect();

        if let RelevanceKind::Err { .. } = self.kind {
            let max = gains.values().copied().fold(0.0, f64::max);
            if max > 0.0 {
                gains.values_mut().for_each(|g| *g /= max);
            }
        }

        let judged = match self.kind {
            RelevanceKind::Background { .. } => prefs
                .iter()
                .map(|&(i, r)| (self.items.id(i).to_string(), r))
                .collect(),
            _ => HashMap::new(),
        };

        UserRelevance {
            model: self,
            gains,
            judged,
            everything: false,
        }
    }
}

/// One user's relevant items and their gains.
pub struct UserRelevance<'a> {
    model: &'a RelevanceModel,
    /// Relevant items only.
    gains: HashMap<String, f64>,
    /// Every test preference, kept only where unjudged items matter.
    judged: HashMap<String, f64>,
    everything: bool,
}

impl UserRelevance<'_> {
    pub fn is_relevant(&self, item: &str) -> bool {
        self.everything || self.gains.contains_key(item)
    }

    pub fn gain(&self, item: &str) -> f64 {
        if self.everything {
            return 1.0;
        }
        if let Some(&g) = self.gains.get(item) {
            return g;
        }
        match self.model.kind {
            RelevanceKind::Background { background, .. } if !self.judged.contains_key(item) => {
                background
            }
            _ => 0.0,
        }
    }

    /// Number of relevant items, when the model knows it.
    pub fn relevant_count(&self) -> Option<usize> {
        self.model.is_ideal().then_some(self.gains.len())
    }

    /// Gains of every relevant item, largest first.
    pub fn ideal_gains(&self) -> Vec<f64> {
        let mut gains: Vec<f64> = self.gains.values().copied().collect();
        gains.sort_by(|a, b| b.total_cmp(a));
        gains
    }
}

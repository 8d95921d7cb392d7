//! Immutable, hierarchical parameter sets.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{error, warn};

use crate::error::ParamError;

/// A named bag of `key=value` parameters.
///
/// Created once per configuration line, or derived from another set through
/// [`subset`](Self::subset). Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Dotted prefix of this set inside its top-level line, for diagnostics.
    /// Empty for top-level sets, `"neighborhood.sim."` for derived ones.
    parent: String,
    name: String,
    entries: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Build a top-level set. Fails only when `name` is empty.
    pub fn new(
        name: impl Into<String>,
        entries: BTreeMap<String, String>,
    ) -> Result<Self, ParamError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ParamError::EmptyName);
        }
        Ok(Self {
            parent: String::new(),
            name,
            entries,
        })
    }

    /// Parse one configuration line.
    ///
    /// The first whitespace-separated token is the name. Every other token
    /// must be exactly `key=value` with both sides non-empty; anything else
    /// is logged and dropped without affecting the rest of the line.
    pub fn parse(line: &str) -> Result<Self, ParamError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(ParamError::EmptyName)?;

        let mut entries = BTreeMap::new();
        for token in tokens {
            let parts: Vec<&str> = token.split('=').collect();
            match parts.as_slice() {
                [key, value] if !key.is_empty() && !value.is_empty() => {
                    entries.insert((*key).to_string(), (*value).to_string());
                }
                _ => error!(experiment = name, token, "malformed parameter"),
            }
        }

        Self::new(name, entries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Where this set sits in its top-level line, e.g. `neighborhood.sim`.
    /// Empty for a top-level set.
    pub fn location(&self) -> &str {
        self.parent.trim_end_matches('.')
    }

    /// Dotted path of `key` relative to the top-level line.
    pub fn path(&self, key: &str) -> String {
        format!("{}{}", self.parent, key)
    }

    /// Extract the nested configuration stored under `prefix`.
    ///
    /// The derived set is named by the value of `prefix` and holds every
    /// `prefix.`-key with the prefix stripped. `None` when `prefix` itself is
    /// absent; the absence is logged.
    pub fn subset(&self, prefix: &str) -> Option<ParameterSet> {
        let sub_name = self.get(prefix)?;
        let dotted = format!("{prefix}.");

        let entries = self
            .entries
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&dotted).map(|rest| (rest.to_string(), v.clone())))
            .collect();

        Some(ParameterSet {
            parent: format!("{}{}", self.parent, dotted),
            name: sub_name.to_string(),
            entries,
        })
    }

    /// Look up a required parameter, logging when it is missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = self.entries.get(key).map(String::as_str);
        if value.is_none() {
            error!(parameter = %self.path(key), "parameter not present");
        }
        value
    }

    /// Look up an optional parameter. Never logs.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(default)
    }

    /// Parse a required parameter into `T`.
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Result<T, ParamError> {
        match self.get(key) {
            Some(raw) => self.convert(key, raw),
            None => Err(ParamError::Missing {
                path: self.path(key),
            }),
        }
    }

    /// Parse an optional parameter into `T`, falling back to `default`.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ParamError> {
        match self.entries.get(key) {
            Some(raw) => self.convert(key, raw),
            None => Ok(default),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64, ParamError> {
        self.parse_value(key)
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, ParamError> {
        self.parse_or(key, default)
    }

    pub fn double(&self, key: &str) -> Result<f64, ParamError> {
        self.parse_value(key)
    }

    pub fn double_or(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        self.parse_or(key, default)
    }

    /// Booleans accept `true`/`false` in any letter case.
    pub fn boolean(&self, key: &str) -> Result<bool, ParamError> {
        let raw = self.get(key).ok_or_else(|| ParamError::Missing {
            path: self.path(key),
        })?;
        self.convert_bool(key, raw)
    }

    pub fn boolean_or(&self, key: &str, default: bool) -> Result<bool, ParamError> {
        match self.entries.get(key) {
            Some(raw) => self.convert_bool(key, raw),
            None => Ok(default),
        }
    }

    fn convert<T: FromStr>(&self, key: &str, raw: &str) -> Result<T, ParamError> {
        raw.parse().map_err(|_| {
            let err = ParamError::Malformed {
                path: self.path(key),
                value: raw.to_string(),
                expected: type_name::<T>(),
            };
            warn!(%err, "malformed parameter value");
            err
        })
    }

    fn convert_bool(&self, key: &str, raw: &str) -> Result<bool, ParamError> {
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            let err = ParamError::Malformed {
                path: self.path(key),
                value: raw.to_string(),
                expected: "bool",
            };
            warn!(%err, "malformed parameter value");
            Err(err)
        }
    }
}

/// Equality covers the name and the entries; the diagnostic prefix is ignored.
impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.entries == other.entries
    }
}

impl Eq for ParameterSet {}

/// Renders back into the line syntax it was parsed from.
impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.entries {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knn_line() -> ParameterSet {
        ParameterSet::parse(
            "knn-rec recommender=ub neighborhood=knn neighborhood.k=5 \
             neighborhood.sim=cosine neighborhood.sim.alpha=0.5 q=1",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_name_and_entries() {
        let params = knn_line();
        assert_eq!(params.name(), "knn-rec");
        assert_eq!(params.entries().len(), 6);
        assert_eq!(params.get("recommender"), Some("ub"));
        assert_eq!(params.get("neighborhood.sim.alpha"), Some("0.5"));
    }

    #[test]
    fn test_malformed_token_is_skipped() {
        let params = ParameterSet::parse("exp a=1 bad=a=b b=2 lonely c=").unwrap();
        assert_eq!(params.name(), "exp");
        let keys: Vec<_> = params.entries().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(ParameterSet::parse("   "), Err(ParamError::EmptyName));
    }

    #[test]
    fn test_subset_strips_prefix() {
        let params = knn_line();
        let hood = params.subset("neighborhood").unwrap();
        assert_eq!(hood.name(), "knn");
        assert_eq!(hood.get("k"), Some("5"));
        assert_eq!(hood.get("sim"), Some("cosine"));
        assert_eq!(hood.get("sim.alpha"), Some("0.5"));
        assert!(hood.get("recommender").is_none());

        let sim = hood.subset("sim").unwrap();
        assert_eq!(sim.name(), "cosine");
        assert_eq!(sim.entries().len(), 1);
        assert_eq!(sim.path("alpha"), "neighborhood.sim.alpha");
        assert_eq!(sim.location(), "neighborhood.sim");
        assert_eq!(params.location(), "");
    }

    #[test]
    fn test_subset_is_pure() {
        let params = knn_line();
        let before = params.clone();
        assert_eq!(params.subset("neighborhood"), params.subset("neighborhood"));
        assert_eq!(params, before);
    }

    #[test]
    fn test_subset_absent_prefix() {
        let params = knn_line();
        assert!(params.subset("mf").is_none());
    }

    #[test]
    fn test_subset_does_not_match_longer_keys() {
        let params = ParameterSet::parse("x rel=bin relx=3 rel.threshold=4").unwrap();
        let rel = params.subset("rel").unwrap();
        assert_eq!(rel.entries().len(), 1);
        assert_eq!(rel.get("threshold"), Some("4"));
    }

    #[test]
    fn test_typed_accessors() {
        let params = ParameterSet::parse("x k=20 alpha=0.3 cached=TRUE dense=no").unwrap();
        assert_eq!(params.int("k"), Ok(20));
        assert_eq!(params.int_or("missing", 10), Ok(10));
        assert_eq!(params.double("alpha"), Ok(0.3));
        assert_eq!(params.double_or("missing", 0.5), Ok(0.5));
        assert_eq!(params.boolean("cached"), Ok(true));
        assert_eq!(params.boolean_or("missing", false), Ok(false));
        assert!(matches!(
            params.boolean_or("dense", true),
            Err(ParamError::Malformed { .. })
        ));
        assert_eq!(params.parse_or::<usize>("k", 1), Ok(20));
    }

    #[test]
    fn test_typed_accessor_errors_carry_path() {
        let params = ParameterSet::parse("x neighborhood=knn neighborhood.k=ten").unwrap();
        let hood = params.subset("neighborhood").unwrap();

        let err = hood.parse_or::<usize>("k", 10).unwrap_err();
        assert_eq!(err.path(), Some("neighborhood.k"));

        let err = hood.double("t").unwrap_err();
        assert_eq!(
            err,
            ParamError::Missing {
                path: "neighborhood.t".to_string()
            }
        );
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let params = ParameterSet::parse("x k=-5").unwrap();
        assert!(params.parse_or::<usize>("k", 10).is_err());
    }

    #[test]
    fn test_get_or_default() {
        let params = ParameterSet::parse("x format=trec").unwrap();
        assert_eq!(params.get_or("format", "simple"), "trec");
        assert_eq!(params.get_or("other", "simple"), "simple");
    }

    #[test]
    fn test_display_reparses() {
        let params = knn_line();
        let again = ParameterSet::parse(&params.to_string()).unwrap();
        assert_eq!(params, again);
    }
}

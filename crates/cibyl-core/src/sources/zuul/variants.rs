//! Lookups of well-known job variables across a variant's hierarchy.

use super::transactions::VariantResponse;
use crate::sources::SourceResult;
use serde_json::Value;
use tracing::debug;

/// Finds the first defined variable among a list of candidate names.
///
/// Terms are tried in order, so earlier names win over later ones.
#[derive(Debug, Clone)]
pub struct VariableSearch {
    search_terms: Vec<String>,
}

impl VariableSearch {
    pub fn new<I, S>(search_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_terms: search_terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search_terms(&self) -> &[String] {
        &self.search_terms
    }

    pub fn search(&self, variant: &VariantResponse) -> SourceResult<Option<Value>> {
        let variables = variant.variables(true)?;
        Ok(self
            .search_terms
            .iter()
            .find_map(|term| variables.get(term).cloned()))
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

pub struct ReleaseSearch(VariableSearch);

impl ReleaseSearch {
    pub const DEFAULT_SEARCH_TERMS: [&'static str; 3] = ["rhos_release_version", "osp_release", "release"];

    pub fn new() -> Self {
        Self(VariableSearch::new(Self::DEFAULT_SEARCH_TERMS))
    }

    pub fn with_terms(search: VariableSearch) -> Self {
        Self(search)
    }

    /// The release as text, `None` when unset.
    pub fn search(&self, variant: &VariantResponse) -> SourceResult<Option<String>> {
        debug!("searching for release on variant '{}'", variant.name());
        Ok(self.0.search(variant)?.filter(|v| !is_unset(v)).map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }
}

impl Default for ReleaseSearch {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Featureset
// ---------------------------------------------------------------------------

pub struct FeatureSetSearch(VariableSearch);

impl FeatureSetSearch {
    pub const DEFAULT_SEARCH_TERMS: [&'static str; 1] = ["featureset"];

    pub fn new() -> Self {
        Self(VariableSearch::new(Self::DEFAULT_SEARCH_TERMS))
    }

    pub fn search(&self, variant: &VariantResponse) -> SourceResult<Option<String>> {
        debug!("searching for featureset on variant '{}'", variant.name());
        Ok(self.0.search(variant)?.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }
}

impl Default for FeatureSetSearch {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FeatureSetOverridesSearch(VariableSearch);

impl FeatureSetOverridesSearch {
    pub const DEFAULT_SEARCH_TERMS: [&'static str; 1] = ["featureset_override"];

    pub fn new() -> Self {
        Self(VariableSearch::new(Self::DEFAULT_SEARCH_TERMS))
    }

    pub fn search(&self, variant: &VariantResponse) -> SourceResult<Option<serde_json::Map<String, Value>>> {
        debug!("searching for overrides on variant '{}'", variant.name());
        Ok(match self.0.search(variant)? {
            Some(Value::Object(overrides)) => Some(overrides),
            _ => None,
        })
    }
}

impl Default for FeatureSetOverridesSearch {
    fn default() -> Self {
        Self::new()
    }
}

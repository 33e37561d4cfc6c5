//! Attribute filters over the target universe.
//!
//! A filter has the form `KEY=value` and keeps only targets whose declared
//! attribute `KEY` equals `value`, ignoring case. Several filters narrow the
//! set one after another, so they combine as a logical AND.
//!
//! ```ignore
//! let filters = FilterSet::parse(["SPLIT_KEYBOARD=yes", "MCU=RP2040"]);
//! let kept = FilterEngine::new(&store).apply(targets, &filters)?;
//! ```

use crate::build::Target;
use crate::rules::{AttributeMap, ConfigStore, StoreError};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Attribute set by split keyboards.
pub const SPLIT_KEYBOARD: &str = "SPLIT_KEYBOARD";

fn filter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<key>[A-Z0-9_]+)\s*=\s*(?P<value>[^#]+)$").expect("filter regex is valid")
    })
}

/// A parsed `KEY=value` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    key: String,
    value: String,
}

impl FilterExpression {
    /// Create a filter from an already split key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Parse a raw filter string.
    ///
    /// Returns `None` when the string does not match `KEY=value`, where KEY is
    /// uppercase alphanumerics or underscore and value contains no `#`.
    /// Trailing whitespace of the value is dropped, so an all-blank value
    /// parses to an empty value that only matches an attribute set to `""`.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = filter_regex().captures(raw)?;
        Some(Self::new(&caps["key"], caps["value"].trim_end()))
    }

    /// The `SPLIT_KEYBOARD=yes` shortcut.
    pub fn split_keyboard() -> Self {
        Self::new(SPLIT_KEYBOARD, "yes")
    }

    /// Attribute key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Expected value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether an attribute map satisfies this filter.
    ///
    /// An unset key never matches.
    pub fn matches(&self, attrs: &AttributeMap) -> bool {
        attrs.get(&self.key).is_some_and(|v| v.to_lowercase() == self.value.to_lowercase())
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered filters combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSet {
    expressions: Vec<FilterExpression>,
}

impl FilterSet {
    /// Create an empty set, which keeps every target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw filter strings, silently dropping malformed ones.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for raw in raw {
            let raw = raw.as_ref();
            match FilterExpression::parse(raw) {
                Some(expr) => set.push(expr),
                None => debug!(filter = raw, "ignoring malformed filter"),
            }
        }
        set
    }

    /// Append a filter.
    pub fn push(&mut self, expr: FilterExpression) {
        self.expressions.push(expr);
    }

    /// Builder form of [`FilterSet::push`].
    pub fn with(mut self, expr: FilterExpression) -> Self {
        self.push(expr);
        self
    }

    /// Filters in application order.
    pub fn expressions(&self) -> &[FilterExpression] {
        &self.expressions
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Whether the set has no filters.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

/// Narrows targets by their declared attributes.
pub struct FilterEngine<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> FilterEngine<'a> {
    /// Create an engine that looks attributes up in `store`.
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Apply every filter in order, keeping the input order of targets.
    ///
    /// With no filters the input is returned unchanged.
    pub fn apply(
        &self,
        targets: Vec<Target>,
        filters: &FilterSet,
    ) -> Result<Vec<Target>, StoreError> {
        let mut candidates = targets;

        for expr in filters.expressions() {
            let mut kept = Vec::with_capacity(candidates.len());
            for target in candidates {
                if expr.matches(&self.store.attributes(&target)?) {
                    kept.push(target);
                }
            }
            debug!(filter = %expr, remaining = kept.len(), "applied filter");
            candidates = kept;
        }

        Ok(candidates)
    }

    /// Parse raw filter strings and apply them.
    pub fn apply_raw<S: AsRef<str>>(
        &self,
        targets: Vec<Target>,
        raw_filters: &[S],
    ) -> Result<Vec<Target>, StoreError> {
        self.apply(targets, &FilterSet::parse(raw_filters))
    }

    /// Whether a target is declared as a split keyboard.
    pub fn is_split(&self, target: &Target) -> Result<bool, StoreError> {
        Ok(FilterExpression::split_keyboard().matches(&self.store.attributes(target)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MemoryStore;

    fn targets(ids: &[&str]) -> Vec<Target> {
        ids.iter().map(|id| Target::new(*id)).collect()
    }

    fn ids(targets: &[Target]) -> Vec<&str> {
        targets.iter().map(Target::id).collect()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with("kb/a", "MCU", "atmega32u4")
            .with("kb/b", "SPLIT_KEYBOARD", "yes")
            .with("kb/b", "MCU", "RP2040")
            .with("kb/c", "SPLIT_KEYBOARD", "no")
            .with("kb/c", "MCU", "rp2040")
    }

    #[test]
    fn test_parse_valid() {
        let expr = FilterExpression::parse("SPLIT_KEYBOARD=yes").unwrap();
        assert_eq!(expr.key(), "SPLIT_KEYBOARD");
        assert_eq!(expr.value(), "yes");
    }

    #[test]
    fn test_parse_allows_spaces_around_equals() {
        let expr = FilterExpression::parse("MCU = STM32F303").unwrap();
        assert_eq!(expr.key(), "MCU");
        assert_eq!(expr.value(), "STM32F303");
    }

    #[test]
    fn test_parse_trims_trailing_whitespace() {
        let expr = FilterExpression::parse("SPLIT_KEYBOARD=yes  ").unwrap();
        assert_eq!(expr.value(), "yes");
    }

    #[test]
    fn test_parse_value_keeps_inner_spaces() {
        let expr = FilterExpression::parse("OPT_DEFS=-DA -DB").unwrap();
        assert_eq!(expr.value(), "-DA -DB");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(FilterExpression::parse("not-a-filter").is_none());
        assert!(FilterExpression::parse("split_keyboard=yes").is_none());
        assert!(FilterExpression::parse("KEY=").is_none());
        assert!(FilterExpression::parse("KEY=a#b").is_none());
        assert!(FilterExpression::parse("=yes").is_none());
    }

    #[test]
    fn test_parse_blank_value_is_kept() {
        let expr = FilterExpression::parse("DEFAULT_FOLDER=   ").unwrap();
        assert_eq!(expr.key(), "DEFAULT_FOLDER");
        assert_eq!(expr.value(), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterExpression::split_keyboard().to_string(), "SPLIT_KEYBOARD=yes");
    }

    #[test]
    fn test_filter_set_drops_malformed() {
        let set = FilterSet::parse(["MCU=RP2040", "not-a-filter", "SPLIT_KEYBOARD=yes"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.expressions()[0].key(), "MCU");
        assert_eq!(set.expressions()[1].key(), "SPLIT_KEYBOARD");
    }

    #[test]
    fn test_matches_case_insensitive() {
        let expr = FilterExpression::parse("SPLIT_KEYBOARD=Yes").unwrap();
        for value in ["yes", "YES", "yEs"] {
            let mut attrs = AttributeMap::new();
            attrs.insert(SPLIT_KEYBOARD.to_string(), value.to_string());
            assert!(expr.matches(&attrs), "should match {}", value);
        }
    }

    #[test]
    fn test_missing_key_never_matches() {
        let expr = FilterExpression::new("SPLIT_KEYBOARD", "");
        assert!(!expr.matches(&AttributeMap::new()));
    }

    #[test]
    fn test_apply_no_filters_is_identity() {
        let store = store();
        let universe = targets(&["kb/c", "kb/a", "kb/b"]);
        let result = FilterEngine::new(&store).apply(universe.clone(), &FilterSet::new()).unwrap();
        assert_eq!(result, universe);
    }

    #[test]
    fn test_apply_single_filter() {
        let store = store();
        let result = FilterEngine::new(&store)
            .apply_raw(targets(&["kb/a", "kb/b", "kb/c"]), &["SPLIT_KEYBOARD=yes"])
            .unwrap();
        assert_eq!(ids(&result), vec!["kb/b"]);
    }

    #[test]
    fn test_apply_filters_combine_with_and() {
        let store = store();
        let engine = FilterEngine::new(&store);
        let universe = targets(&["kb/a", "kb/b", "kb/c"]);

        let rp2040 = engine.apply_raw(universe.clone(), &["MCU=rp2040"]).unwrap();
        assert_eq!(ids(&rp2040), vec!["kb/b", "kb/c"]);

        let both = engine.apply_raw(universe, &["MCU=rp2040", "SPLIT_KEYBOARD=no"]).unwrap();
        assert_eq!(ids(&both), vec!["kb/c"]);
    }

    #[test]
    fn test_apply_malformed_filter_is_ignored() {
        let store = store();
        let universe = targets(&["kb/a", "kb/b", "kb/c"]);
        let result = FilterEngine::new(&store).apply_raw(universe.clone(), &["not-a-filter"]).unwrap();
        assert_eq!(result, universe);
    }

    #[test]
    fn test_apply_blank_value_matches_only_empty_attribute() {
        let store = MemoryStore::new().with("kb/a", "DEFAULT_FOLDER", "");
        let result = FilterEngine::new(&store)
            .apply_raw(targets(&["kb/a", "kb/b"]), &["DEFAULT_FOLDER=   "])
            .unwrap();
        assert_eq!(ids(&result), vec!["kb/a"]);
    }

    #[test]
    fn test_apply_keeps_input_order() {
        let store = store();
        let result = FilterEngine::new(&store)
            .apply_raw(targets(&["kb/c", "kb/b"]), &["MCU=RP2040"])
            .unwrap();
        assert_eq!(ids(&result), vec!["kb/c", "kb/b"]);
    }

    #[test]
    fn test_apply_impossible_value_empties_set() {
        let store = store();
        let result = FilterEngine::new(&store)
            .apply_raw(targets(&["kb/a", "kb/b", "kb/c"]), &["MCU=impossible_value"])
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_is_split() {
        let store = store();
        let engine = FilterEngine::new(&store);
        assert!(engine.is_split(&Target::new("kb/b")).unwrap());
        assert!(!engine.is_split(&Target::new("kb/c")).unwrap());
        assert!(!engine.is_split(&Target::new("kb/a")).unwrap());
    }
}

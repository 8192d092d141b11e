//! Query filters for stored metrics.
//!
//! A [`MetricFilter`] describes which metrics a retrieve call should return
//! and in which order. Filters apply their criteria in a fixed pipeline:
//! name set, name pattern, kind set, time range, exact labels, label
//! filters, metadata filters, value filters, source allow-list,
//! correlation-id allow-list, then sort and offset/limit.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Metric, MetricKind, MetricName, TimeRange};

/// A string matching operator applied to a label or metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum StringMatch {
    /// Value equals the operand.
    Equals(String),
    /// Value differs from the operand (also matches when the key is absent).
    NotEquals(String),
    /// Value contains the operand.
    Contains(String),
    /// Value does not contain the operand (also matches when absent).
    NotContains(String),
    /// Value starts with the operand.
    StartsWith(String),
    /// Value ends with the operand.
    EndsWith(String),
    /// Value matches the operand as a regular expression.
    Regex(String),
    /// Value is one of the operands.
    In(Vec<String>),
    /// Value is none of the operands (also matches when absent).
    NotIn(Vec<String>),
}

impl StringMatch {
    /// Whether a missing key satisfies this operator.
    const fn matches_absent(&self) -> bool {
        matches!(self, Self::NotEquals(_) | Self::NotContains(_) | Self::NotIn(_))
    }
}

/// A filter on one label or metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// The label or metadata key to inspect.
    pub key: String,
    /// The matching operator.
    pub matcher: StringMatch,
    /// Whether matching is case sensitive. Defaults to true.
    pub case_sensitive: bool,
}

impl FieldFilter {
    /// Creates a case-sensitive field filter.
    #[must_use]
    pub fn new(key: impl Into<String>, matcher: StringMatch) -> Self {
        Self {
            key: key.into(),
            matcher,
            case_sensitive: true,
        }
    }

    /// Makes this filter case-insensitive and returns self for chaining.
    #[must_use]
    pub const fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Evaluates the filter against a key/value map.
    #[must_use]
    pub fn matches(&self, fields: &HashMap<String, String>) -> bool {
        let Some(actual) = fields.get(&self.key) else {
            return self.matcher.matches_absent();
        };

        let fold = |s: &str| {
            if self.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        let actual = fold(actual);

        match &self.matcher {
            StringMatch::Equals(want) => actual == fold(want),
            StringMatch::NotEquals(want) => actual != fold(want),
            StringMatch::Contains(want) => actual.contains(&fold(want)),
            StringMatch::NotContains(want) => !actual.contains(&fold(want)),
            StringMatch::StartsWith(want) => actual.starts_with(&fold(want)),
            StringMatch::EndsWith(want) => actual.ends_with(&fold(want)),
            StringMatch::Regex(pattern) => {
                match RegexBuilder::new(pattern)
                    .case_insensitive(!self.case_sensitive)
                    .build()
                {
                    Ok(re) => re.is_match(&actual),
                    Err(err) => {
                        debug!(pattern, error = %err, "invalid field regex, matching nothing");
                        false
                    }
                }
            }
            StringMatch::In(set) => set.iter().any(|want| actual == fold(want)),
            StringMatch::NotIn(set) => !set.iter().any(|want| actual == fold(want)),
        }
    }
}

/// A numeric matching operator applied to a metric's comparison scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum NumberMatch {
    /// Value equals the operand (within `f64::EPSILON`).
    Equals(f64),
    /// Value differs from the operand.
    NotEquals(f64),
    /// Value is strictly greater than the operand.
    GreaterThan(f64),
    /// Value is strictly less than the operand.
    LessThan(f64),
    /// Value lies in the inclusive range.
    Between(f64, f64),
    /// Value lies outside the inclusive range.
    NotBetween(f64, f64),
    /// Value equals one of the operands.
    In(Vec<f64>),
    /// Value equals none of the operands.
    NotIn(Vec<f64>),
}

impl NumberMatch {
    fn eq_eps(a: f64, b: f64) -> bool {
        (a - b).abs() < f64::EPSILON
    }

    /// Evaluates the operator against a value.
    #[must_use]
    pub fn matches(&self, value: f64) -> bool {
        match self {
            Self::Equals(want) => Self::eq_eps(value, *want),
            Self::NotEquals(want) => !Self::eq_eps(value, *want),
            Self::GreaterThan(want) => value > *want,
            Self::LessThan(want) => value < *want,
            Self::Between(lo, hi) => value >= *lo && value <= *hi,
            Self::NotBetween(lo, hi) => value < *lo || value > *hi,
            Self::In(set) => set.iter().any(|want| Self::eq_eps(value, *want)),
            Self::NotIn(set) => !set.iter().any(|want| Self::eq_eps(value, *want)),
        }
    }
}

/// A filter on the metric's numeric comparison value.
///
/// The scalar is extracted per value variant: numbers use their value,
/// histograms the bucket sum, distributions the mean of their samples.
/// Metrics without a numeric value (empty distributions) never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFilter {
    /// The matching operator.
    pub matcher: NumberMatch,
}

impl ValueFilter {
    /// Creates a value filter from an operator.
    #[must_use]
    pub const fn new(matcher: NumberMatch) -> Self {
        Self { matcher }
    }

    /// Evaluates the filter against a metric.
    #[must_use]
    pub fn matches(&self, metric: &Metric) -> bool {
        metric
            .value
            .numeric_value()
            .is_some_and(|v| self.matcher.matches(v))
    }
}

/// The field a sort applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by record timestamp.
    Timestamp,
    /// Sort by metric name.
    Name,
    /// Sort by the numeric comparison value.
    Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort specification with an optional secondary tie-breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Primary sort field.
    pub field: SortField,
    /// Primary sort direction.
    pub direction: SortDirection,
    /// Applied when the primary comparison ties.
    pub secondary: Option<Box<SortSpec>>,
}

impl SortSpec {
    /// Creates a sort spec without a secondary sort.
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self {
            field,
            direction,
            secondary: None,
        }
    }

    /// Attaches a secondary tie-breaker and returns self for chaining.
    #[must_use]
    pub fn then(mut self, field: SortField, direction: SortDirection) -> Self {
        self.secondary = Some(Box::new(Self::new(field, direction)));
        self
    }

    /// Compares two metrics under this spec, falling through to the
    /// secondary sort on ties.
    #[must_use]
    pub fn compare(&self, a: &Metric, b: &Metric) -> Ordering {
        let ordering = match self.field {
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
            SortField::Name => a.name.as_str().cmp(b.name.as_str()),
            SortField::Value => {
                let av = a.value.numeric_value();
                let bv = b.value.numeric_value();
                av.partial_cmp(&bv).unwrap_or(Ordering::Equal)
            }
        };
        let ordering = match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        match (&ordering, &self.secondary) {
            (Ordering::Equal, Some(secondary)) => secondary.compare(a, b),
            _ => ordering,
        }
    }
}

/// A composite query filter.
///
/// All criteria are optional; the default filter matches everything. Empty
/// collection fields are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFilter {
    /// Exact name allow-list.
    pub names: Vec<MetricName>,
    /// Regex applied to the metric name; an invalid pattern is skipped.
    pub name_pattern: Option<String>,
    /// Kind allow-list.
    pub kinds: Vec<MetricKind>,
    /// Inclusive timestamp range.
    pub time_range: Option<TimeRange>,
    /// Exact-match label map: every entry must be present and equal.
    pub labels: HashMap<String, String>,
    /// Advanced label filters, all of which must match.
    pub label_filters: Vec<FieldFilter>,
    /// Metadata filters, all of which must match.
    pub metadata_filters: Vec<FieldFilter>,
    /// Numeric value filters, all of which must match.
    pub value_filters: Vec<ValueFilter>,
    /// Source allow-list.
    pub sources: Vec<String>,
    /// Correlation-id allow-list.
    pub correlation_ids: Vec<String>,
    /// Sort applied after filtering.
    pub sort: Option<SortSpec>,
    /// Maximum number of results, applied after `offset`.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: Option<usize>,
}

impl MetricFilter {
    /// Creates a match-all filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to the given names.
    #[must_use]
    pub fn with_names(mut self, names: Vec<MetricName>) -> Self {
        self.names = names;
        self
    }

    /// Restricts results to names matching the regex pattern.
    #[must_use]
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    /// Restricts results to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<MetricKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Restricts results to the inclusive time range.
    #[must_use]
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Requires an exact label match.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds an advanced label filter.
    #[must_use]
    pub fn with_label_filter(mut self, filter: FieldFilter) -> Self {
        self.label_filters.push(filter);
        self
    }

    /// Adds a metadata filter.
    #[must_use]
    pub fn with_metadata_filter(mut self, filter: FieldFilter) -> Self {
        self.metadata_filters.push(filter);
        self
    }

    /// Adds a numeric value filter.
    #[must_use]
    pub fn with_value_filter(mut self, filter: ValueFilter) -> Self {
        self.value_filters.push(filter);
        self
    }

    /// Restricts results to the given sources.
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Restricts results to the given correlation ids.
    #[must_use]
    pub fn with_correlation_ids(mut self, ids: Vec<String>) -> Self {
        self.correlation_ids = ids;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Evaluates the per-metric criteria (everything before sort/slice).
    #[must_use]
    pub fn matches(&self, metric: &Metric) -> bool {
        if !self.names.is_empty() && !self.names.contains(&metric.name) {
            return false;
        }

        if let Some(pattern) = &self.name_pattern {
            // An unparseable pattern skips this criterion rather than
            // excluding everything.
            match RegexBuilder::new(pattern).build() {
                Ok(re) => {
                    if !re.is_match(metric.name.as_str()) {
                        return false;
                    }
                }
                Err(err) => {
                    debug!(pattern, error = %err, "invalid name pattern, criterion skipped");
                }
            }
        }

        if !self.kinds.is_empty() && !self.kinds.contains(&metric.kind) {
            return false;
        }

        if let Some(range) = &self.time_range {
            if !range.contains(metric.timestamp) {
                return false;
            }
        }

        for (key, value) in &self.labels {
            if metric.labels.get(key) != Some(value) {
                return false;
            }
        }

        if !self.label_filters.iter().all(|f| f.matches(&metric.labels)) {
            return false;
        }

        if !self
            .metadata_filters
            .iter()
            .all(|f| f.matches(&metric.metadata))
        {
            return false;
        }

        if !self.value_filters.iter().all(|f| f.matches(metric)) {
            return false;
        }

        if !self.sources.is_empty() {
            let Some(source) = &metric.source else {
                return false;
            };
            if !self.sources.contains(source) {
                return false;
            }
        }

        if !self.correlation_ids.is_empty() {
            let Some(id) = &metric.correlation_id else {
                return false;
            };
            if !self.correlation_ids.contains(id) {
                return false;
            }
        }

        true
    }

    /// Runs the full pipeline over a materialized snapshot: per-metric
    /// criteria in order, then stable sort, then offset/limit slicing.
    #[must_use]
    pub fn apply(&self, metrics: Vec<Metric>) -> Vec<Metric> {
        let mut selected: Vec<Metric> = metrics.into_iter().filter(|m| self.matches(m)).collect();

        if let Some(sort) = &self.sort {
            selected.sort_by(|a, b| sort.compare(a, b));
        }

        let offset = self.offset.unwrap_or(0);
        if offset > 0 {
            selected = if offset >= selected.len() {
                Vec::new()
            } else {
                selected.split_off(offset)
            };
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistogramBuckets, MetricValue};
    use chrono::Utc;
    use test_case::test_case;

    fn metric(name: &str, kind: MetricKind, value: f64) -> Metric {
        Metric::new(
            MetricName::new(name).unwrap(),
            kind,
            MetricValue::Number { value },
        )
    }

    mod string_match_tests {
        use super::*;
        use test_case::test_case;

        fn fields(key: &str, value: &str) -> HashMap<String, String> {
            let mut map = HashMap::new();
            map.insert(key.to_string(), value.to_string());
            map
        }

        #[test_case(StringMatch::Equals("api".into()), true; "equals hit")]
        #[test_case(StringMatch::Equals("web".into()), false; "equals miss")]
        #[test_case(StringMatch::NotEquals("web".into()), true; "not equals hit")]
        #[test_case(StringMatch::Contains("p".into()), true; "contains hit")]
        #[test_case(StringMatch::NotContains("z".into()), true; "not contains hit")]
        #[test_case(StringMatch::StartsWith("a".into()), true; "starts with hit")]
        #[test_case(StringMatch::EndsWith("i".into()), true; "ends with hit")]
        #[test_case(StringMatch::Regex("^a.i$".into()), true; "regex hit")]
        #[test_case(StringMatch::In(vec!["api".into(), "web".into()]), true; "in hit")]
        #[test_case(StringMatch::NotIn(vec!["web".into()]), true; "not in hit")]
        fn operators_against_api(matcher: StringMatch, expected: bool) {
            let filter = FieldFilter::new("service", matcher);
            assert_eq!(filter.matches(&fields("service", "api")), expected);
        }

        #[test]
        fn absent_key_matches_only_negated_operators() {
            let empty = HashMap::new();

            let positive = FieldFilter::new("service", StringMatch::Equals("api".into()));
            assert!(!positive.matches(&empty));

            let negated = FieldFilter::new("service", StringMatch::NotEquals("api".into()));
            assert!(negated.matches(&empty));

            let not_in = FieldFilter::new("service", StringMatch::NotIn(vec!["api".into()]));
            assert!(not_in.matches(&empty));
        }

        #[test]
        fn case_insensitive_matching() {
            let filter = FieldFilter::new("service", StringMatch::Equals("API".into()))
                .case_insensitive();
            assert!(filter.matches(&fields("service", "api")));

            let sensitive = FieldFilter::new("service", StringMatch::Equals("API".into()));
            assert!(!sensitive.matches(&fields("service", "api")));
        }

        #[test]
        fn invalid_field_regex_matches_nothing() {
            let filter = FieldFilter::new("service", StringMatch::Regex("(unclosed".into()));
            assert!(!filter.matches(&fields("service", "api")));
        }
    }

    mod number_match_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(NumberMatch::Equals(5.0), 5.0, true)]
        #[test_case(NumberMatch::NotEquals(5.0), 6.0, true)]
        #[test_case(NumberMatch::GreaterThan(5.0), 6.0, true)]
        #[test_case(NumberMatch::GreaterThan(5.0), 5.0, false)]
        #[test_case(NumberMatch::LessThan(5.0), 4.0, true)]
        #[test_case(NumberMatch::Between(1.0, 10.0), 10.0, true; "between inclusive")]
        #[test_case(NumberMatch::NotBetween(1.0, 10.0), 10.5, true)]
        #[test_case(NumberMatch::In(vec![1.0, 2.0]), 2.0, true)]
        #[test_case(NumberMatch::NotIn(vec![1.0, 2.0]), 3.0, true)]
        fn operators(matcher: NumberMatch, value: f64, expected: bool) {
            assert_eq!(matcher.matches(value), expected);
        }

        #[test]
        fn value_filter_uses_histogram_sum() {
            let buckets = HistogramBuckets::new(vec![1.0], vec![4], 42.0, 4).unwrap();
            let metric = Metric::new(
                MetricName::new("latency").unwrap(),
                MetricKind::Histogram,
                MetricValue::Histogram { buckets, samples: 4 },
            );

            assert!(ValueFilter::new(NumberMatch::Equals(42.0)).matches(&metric));
        }

        #[test]
        fn empty_distribution_never_matches() {
            let metric = Metric::new(
                MetricName::new("spread").unwrap(),
                MetricKind::Distribution,
                MetricValue::Distribution {
                    values: vec![],
                    percentiles: HashMap::new(),
                },
            );

            assert!(!ValueFilter::new(NumberMatch::GreaterThan(f64::MIN)).matches(&metric));
        }
    }

    mod pipeline_tests {
        use super::*;

        fn sample_set() -> Vec<Metric> {
            vec![
                metric("requests.total", MetricKind::Counter, 100.0),
                metric("errors.total", MetricKind::Counter, 5.0),
                metric("memory.used", MetricKind::Gauge, 512.0),
                metric("cpu.load", MetricKind::Gauge, 0.75),
            ]
        }

        #[test]
        fn default_filter_matches_everything() {
            let results = MetricFilter::new().apply(sample_set());
            assert_eq!(results.len(), 4);
        }

        #[test]
        fn kind_filter_with_other_fields_unset() {
            let results = MetricFilter::new()
                .with_kinds(vec![MetricKind::Counter])
                .apply(sample_set());

            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|m| m.kind == MetricKind::Counter));
        }

        #[test]
        fn name_set_filter() {
            let results = MetricFilter::new()
                .with_names(vec![MetricName::new("cpu.load").unwrap()])
                .apply(sample_set());

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].name.as_str(), "cpu.load");
        }

        #[test]
        fn name_pattern_filter() {
            let results = MetricFilter::new()
                .with_name_pattern(r"\.total$")
                .apply(sample_set());

            assert_eq!(results.len(), 2);
        }

        #[test]
        fn invalid_name_pattern_is_skipped_silently() {
            let results = MetricFilter::new()
                .with_name_pattern("(unclosed")
                .apply(sample_set());

            // The broken criterion is dropped, everything passes through.
            assert_eq!(results.len(), 4);
        }

        #[test]
        fn exact_label_map_requires_all_entries() {
            let tagged = metric("tagged", MetricKind::Gauge, 1.0)
                .label("env", "prod")
                .unwrap()
                .label("region", "us-east")
                .unwrap();
            let other = metric("other", MetricKind::Gauge, 2.0)
                .label("env", "prod")
                .unwrap();

            let results = MetricFilter::new()
                .with_label("env", "prod")
                .with_label("region", "us-east")
                .apply(vec![tagged, other]);

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].name.as_str(), "tagged");
        }

        #[test]
        fn time_range_filter_is_inclusive() {
            let now = Utc::now();
            let old = metric("old", MetricKind::Gauge, 1.0).at(now - chrono::Duration::hours(2));
            let edge = metric("edge", MetricKind::Gauge, 2.0).at(now - chrono::Duration::hours(1));
            let fresh = metric("fresh", MetricKind::Gauge, 3.0).at(now);

            let range = TimeRange::new(now - chrono::Duration::hours(1), now).unwrap();
            let results = MetricFilter::new()
                .with_time_range(range)
                .apply(vec![old, edge, fresh]);

            assert_eq!(results.len(), 2);
        }

        #[test]
        fn source_and_correlation_allow_lists() {
            let a = metric("a", MetricKind::Gauge, 1.0).with_source("collector");
            let b = metric("b", MetricKind::Gauge, 2.0).with_source("ingest");
            let c = metric("c", MetricKind::Gauge, 3.0);

            let by_source = MetricFilter::new()
                .with_sources(vec!["collector".to_string()])
                .apply(vec![a.clone(), b.clone(), c.clone()]);
            assert_eq!(by_source.len(), 1);
            assert_eq!(by_source[0].name.as_str(), "a");

            let tagged = c.with_correlation_id("batch-7");
            let by_corr = MetricFilter::new()
                .with_correlation_ids(vec!["batch-7".to_string()])
                .apply(vec![a, b, tagged]);
            assert_eq!(by_corr.len(), 1);
            assert_eq!(by_corr[0].name.as_str(), "c");
        }

        #[test]
        fn value_filters_are_anded() {
            let results = MetricFilter::new()
                .with_value_filter(ValueFilter::new(NumberMatch::GreaterThan(1.0)))
                .with_value_filter(ValueFilter::new(NumberMatch::LessThan(200.0)))
                .apply(sample_set());

            assert_eq!(results.len(), 2); // 100.0 and 5.0
        }

        #[test]
        fn sort_then_offset_then_limit() {
            let results = MetricFilter::new()
                .with_sort(SortSpec::new(SortField::Value, SortDirection::Descending))
                .with_offset(1)
                .with_limit(2)
                .apply(sample_set());

            // Sorted by value desc: 512, 100, 5, 0.75 -> skip 512, take two.
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].value.numeric_value(), Some(100.0));
            assert_eq!(results[1].value.numeric_value(), Some(5.0));
        }

        #[test]
        fn offset_past_end_yields_empty() {
            let results = MetricFilter::new().with_offset(100).apply(sample_set());
            assert!(results.is_empty());
        }

        #[test]
        fn secondary_sort_breaks_ties() {
            let now = Utc::now();
            let a = metric("alpha", MetricKind::Gauge, 1.0).at(now);
            let b = metric("beta", MetricKind::Gauge, 1.0).at(now);

            let spec = SortSpec::new(SortField::Value, SortDirection::Ascending)
                .then(SortField::Name, SortDirection::Descending);
            let results = MetricFilter::new()
                .with_sort(spec)
                .apply(vec![a, b]);

            assert_eq!(results[0].name.as_str(), "beta");
            assert_eq!(results[1].name.as_str(), "alpha");
        }

        #[test]
        fn filter_serialization_roundtrip() {
            let original = MetricFilter::new()
                .with_kinds(vec![MetricKind::Counter])
                .with_label("env", "prod")
                .with_value_filter(ValueFilter::new(NumberMatch::Between(1.0, 10.0)))
                .with_limit(5);

            let json = serde_json::to_string(&original).unwrap();
            let parsed: MetricFilter = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, original);
        }
    }
}

//! Per-cluster attribute statistics.
//!
//! The kind of each field is decided by the first member's value: numbers get
//! min/max/mean/median, strings and booleans get a distinct count and the most
//! frequent values. Fields whose first value is null are skipped.
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use crate::feature::{AttributeValue, Feature};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of most frequent values kept for categorical fields.
pub const TOP_CATEGORIES: usize = 3;

/// Summaries keyed by attribute name.
pub type AttributeSummary = BTreeMap<String, FieldSummary>;

/// Statistics for one attribute field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "camelCase"))]
pub enum FieldSummary {
    /// Numeric field.
    Numeric(NumericSummary),
    /// String or boolean field.
    Categorical(CategoricalSummary),
}

/// Numeric statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NumericSummary {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Middle value; mean of the two middle values for an even count.
    pub median: f64,
    /// Number of numeric values seen.
    pub count: usize,
}

/// Categorical statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CategoricalSummary {
    /// Number of distinct values.
    pub distinct: usize,
    /// Most frequent values, highest count first.
    pub top: Vec<CategoryShare>,
}

/// Frequency of one categorical value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CategoryShare {
    /// The value, as text.
    pub value: String,
    /// Number of members holding it.
    pub count: usize,
    /// Share of non-null values, 0-100.
    pub percentage: f64,
}

/// Summarizes the attributes of a cluster's members.
///
/// Only keys present on the first member are considered.
#[must_use]
pub fn summarize_attributes(members: &[Feature]) -> AttributeSummary {
    let Some(first) = members.first() else {
        return AttributeSummary::new();
    };

    first
        .attributes
        .iter()
        .filter_map(|(key, value)| {
            let summary = match value {
                AttributeValue::Null => return None,
                AttributeValue::Number(_) => FieldSummary::Numeric(numeric_summary(members, key)?),
                AttributeValue::Bool(_) | AttributeValue::Text(_) => {
                    FieldSummary::Categorical(categorical_summary(members, key))
                }
            };
            Some((key.clone(), summary))
        })
        .collect()
}

fn numeric_summary(members: &[Feature], key: &str) -> Option<NumericSummary> {
    let mut values: Vec<f64> = members
        .iter()
        .filter_map(|member| member.attribute(key).and_then(AttributeValue::as_number))
        .filter(|value| value.is_finite())
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };

    Some(NumericSummary {
        min: values[0],
        max: values[count - 1],
        mean,
        median,
        count,
    })
}

fn categorical_summary(members: &[Feature], key: &str) -> CategoricalSummary {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;
    for value in members.iter().filter_map(|member| member.attribute(key)) {
        if value.is_null() {
            continue;
        }
        *counts.entry(value.to_string()).or_default() += 1;
        total += 1;
    }

    let distinct = counts.len();
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // Stable sort keeps the map's ascending value order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let top = ranked
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(value, count)| CategoryShare {
            value,
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();

    CategoricalSummary { distinct, top }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn member(kind: &str, height: f64) -> Feature {
        Feature::point(0.0, 0.0)
            .with_attribute("kind", kind)
            .with_attribute("height", height)
    }

    #[test]
    fn test_numeric_summary() {
        let members = vec![
            member("a", 4.0),
            member("a", 1.0),
            member("b", 3.0),
            member("c", 2.0),
        ];
        let summary = summarize_attributes(&members);

        let FieldSummary::Numeric(height) = &summary["height"] else {
            panic!("height should be numeric");
        };
        assert_relative_eq!(height.min, 1.0);
        assert_relative_eq!(height.max, 4.0);
        assert_relative_eq!(height.mean, 2.5);
        assert_relative_eq!(height.median, 2.5);
        assert_eq!(height.count, 4);
    }

    #[test]
    fn test_odd_median() {
        let members = vec![member("a", 9.0), member("a", 1.0), member("a", 5.0)];
        let summary = summarize_attributes(&members);
        let FieldSummary::Numeric(height) = &summary["height"] else {
            panic!("height should be numeric");
        };
        assert_relative_eq!(height.median, 5.0);
    }

    #[test]
    fn test_categorical_top_values() {
        let members = vec![
            member("park", 0.0),
            member("school", 0.0),
            member("park", 0.0),
            member("clinic", 0.0),
            member("school", 0.0),
            member("park", 0.0),
            member("library", 0.0),
        ];
        let summary = summarize_attributes(&members);

        let FieldSummary::Categorical(kind) = &summary["kind"] else {
            panic!("kind should be categorical");
        };
        assert_eq!(kind.distinct, 4);
        assert_eq!(kind.top.len(), TOP_CATEGORIES);
        assert_eq!(kind.top[0].value, "park");
        assert_eq!(kind.top[0].count, 3);
        assert_relative_eq!(kind.top[0].percentage, 300.0 / 7.0);
        assert_eq!(kind.top[1].value, "school");
        // clinic and library tie at one; ascending value order wins
        assert_eq!(kind.top[2].value, "clinic");
    }

    #[test]
    fn test_booleans_are_categorical() {
        let members = vec![
            Feature::point(0.0, 0.0).with_attribute("open", true),
            Feature::point(0.0, 0.0).with_attribute("open", false),
            Feature::point(0.0, 0.0).with_attribute("open", true),
        ];
        let summary = summarize_attributes(&members);
        let FieldSummary::Categorical(open) = &summary["open"] else {
            panic!("open should be categorical");
        };
        assert_eq!(open.distinct, 2);
        assert_eq!(open.top[0].value, "true");
        assert_eq!(open.top[0].count, 2);
    }

    #[test]
    fn test_keys_follow_first_member() {
        let members = vec![
            Feature::point(0.0, 0.0)
                .with_attribute("a", 1.0)
                .with_attribute("skip", AttributeValue::Null),
            Feature::point(0.0, 0.0)
                .with_attribute("a", "not a number")
                .with_attribute("b", 2.0),
            Feature::point(0.0, 0.0).with_attribute("a", 3.0),
        ];
        let summary = summarize_attributes(&members);

        assert_eq!(summary.keys().collect::<Vec<_>>(), vec!["a"]);
        let FieldSummary::Numeric(a) = &summary["a"] else {
            panic!("a should be numeric");
        };
        assert_eq!(a.count, 2);
        assert_relative_eq!(a.mean, 2.0);
    }

    #[test]
    fn test_no_members() {
        assert!(summarize_attributes(&[]).is_empty());
    }
}

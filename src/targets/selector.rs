// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Label selector evaluation against object labels.

use crate::error::{LookoutError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

/// Check that every requirement of the selector is well formed
pub fn validate(selector: &LabelSelector) -> Result<()> {
    for requirement in selector.match_expressions.iter().flatten() {
        operator(requirement)?;
    }
    Ok(())
}

/// Evaluate the selector. An empty selector matches everything.
pub fn matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> Result<bool> {
    let labels_match = selector
        .match_labels
        .iter()
        .flatten()
        .all(|(key, value)| labels.get(key) == Some(value));
    if !labels_match {
        return Ok(false);
    }

    for requirement in selector.match_expressions.iter().flatten() {
        if !operator(requirement)?.matches(requirement, labels) {
            return Ok(false);
        }
    }
    Ok(true)
}

enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl Operator {
    fn matches(&self, requirement: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&requirement.key);
        let values = requirement.values.as_deref().unwrap_or_default();
        match self {
            Operator::In => value.is_some_and(|v| values.contains(v)),
            Operator::NotIn => value.map_or(true, |v| !values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

fn operator(requirement: &LabelSelectorRequirement) -> Result<Operator> {
    let has_values = requirement.values.as_ref().is_some_and(|v| !v.is_empty());
    let op = match requirement.operator.as_str() {
        "In" => Operator::In,
        "NotIn" => Operator::NotIn,
        "Exists" => Operator::Exists,
        "DoesNotExist" => Operator::DoesNotExist,
        other => {
            return Err(LookoutError::ValidationError(format!(
                "unsupported selector operator '{}' for key '{}'",
                other, requirement.key
            )))
        }
    };
    match op {
        Operator::In | Operator::NotIn if !has_values => Err(LookoutError::ValidationError(format!(
            "selector operator {} on key '{}' requires values",
            requirement.operator, requirement.key
        ))),
        Operator::Exists | Operator::DoesNotExist if has_values => {
            Err(LookoutError::ValidationError(format!(
                "selector operator {} on key '{}' must not have values",
                requirement.operator, requirement.key
            )))
        }
        op => Ok(op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn expression(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| v.to_string()).collect())
            },
        }
    }

    fn selector(match_labels: &[(&str, &str)], expressions: Vec<LabelSelectorRequirement>) -> LabelSelector {
        LabelSelector {
            match_labels: if match_labels.is_empty() { None } else { Some(labels(match_labels)) },
            match_expressions: if expressions.is_empty() { None } else { Some(expressions) },
        }
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let s = selector(&[], vec![]);
        assert!(matches(&s, &labels(&[])).unwrap());
        assert!(matches(&s, &labels(&[("app", "web")])).unwrap());
    }

    #[test]
    fn test_match_labels() {
        let s = selector(&[("app", "web"), ("tier", "front")], vec![]);
        assert!(matches(&s, &labels(&[("app", "web"), ("tier", "front"), ("x", "y")])).unwrap());
        assert!(!matches(&s, &labels(&[("app", "web")])).unwrap());
        assert!(!matches(&s, &labels(&[("app", "db"), ("tier", "front")])).unwrap());
    }

    #[test]
    fn test_in_and_not_in() {
        let s = selector(&[], vec![expression("env", "In", &["prod", "staging"])]);
        assert!(matches(&s, &labels(&[("env", "prod")])).unwrap());
        assert!(!matches(&s, &labels(&[("env", "dev")])).unwrap());
        assert!(!matches(&s, &labels(&[])).unwrap());

        let s = selector(&[], vec![expression("env", "NotIn", &["dev"])]);
        assert!(matches(&s, &labels(&[("env", "prod")])).unwrap());
        assert!(matches(&s, &labels(&[])).unwrap());
        assert!(!matches(&s, &labels(&[("env", "dev")])).unwrap());
    }

    #[test]
    fn test_exists_and_does_not_exist() {
        let s = selector(&[], vec![expression("gpu", "Exists", &[])]);
        assert!(matches(&s, &labels(&[("gpu", "")])).unwrap());
        assert!(!matches(&s, &labels(&[])).unwrap());

        let s = selector(&[], vec![expression("gpu", "DoesNotExist", &[])]);
        assert!(matches(&s, &labels(&[])).unwrap());
        assert!(!matches(&s, &labels(&[("gpu", "a100")])).unwrap());
    }

    #[test]
    fn test_labels_and_expressions_combine() {
        let s = selector(&[("app", "web")], vec![expression("env", "In", &["prod"])]);
        assert!(matches(&s, &labels(&[("app", "web"), ("env", "prod")])).unwrap());
        assert!(!matches(&s, &labels(&[("app", "web"), ("env", "dev")])).unwrap());
    }

    #[test]
    fn test_malformed_requirements() {
        assert!(validate(&selector(&[], vec![expression("env", "In", &[])])).is_err());
        assert!(validate(&selector(&[], vec![expression("env", "Exists", &["x"])])).is_err());
        assert!(validate(&selector(&[], vec![expression("env", "Gt", &["1"])])).is_err());
        assert!(validate(&selector(&[], vec![expression("env", "In", &["a"])])).is_ok());
    }
}

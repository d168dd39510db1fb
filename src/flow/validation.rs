//! Field validators — pure checks over a field value and the current draft.
//!
//! A step owns a list of `FieldRule`s. Every rule is evaluated so the host can
//! show all inline errors at once; within one rule the first failing check
//! supplies the reason.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::draft::{Draft, is_blank_value};

/// Outcome of validating a step: `ok` plus every failing field with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    /// A passing result with no errors.
    pub fn valid() -> Self {
        Self {
            ok: true,
            errors: BTreeMap::new(),
        }
    }

    /// Record a failing field. The first reason recorded for a field is kept.
    pub fn reject(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.ok = false;
        self.errors.entry(field.into()).or_insert_with(|| reason.into());
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            return write!(f, "valid");
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, reason)| format!("{field}: {reason}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Signature for ad-hoc checks: `Some(reason)` on failure.
pub type CustomCheck = Arc<dyn Fn(&Value, &Draft) -> Option<String> + Send + Sync>;

/// A single predicate applied to one field.
#[derive(Clone)]
pub enum Check {
    /// Value must be present and non-blank.
    Required,
    /// Number (or numeric string) within an inclusive range.
    NumberRange { min: Option<f64>, max: Option<f64> },
    /// Text length in characters within an inclusive range.
    Length { min: Option<usize>, max: Option<usize> },
    /// Text must match the pattern; `message` is the reason on mismatch.
    Pattern { regex: Regex, message: String },
    /// Text must be one of the listed options.
    OneOf(BTreeSet<String>),
    /// List must hold an item count within an inclusive range.
    Count { min: Option<usize>, max: Option<usize> },
    /// Value must be among the options allowed for the value of another field,
    /// e.g. city given province.
    DependsOn {
        field: String,
        allowed: BTreeMap<String, BTreeSet<String>>,
    },
    Custom(CustomCheck),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::NumberRange { min, max } => write!(f, "NumberRange({min:?}..={max:?})"),
            Self::Length { min, max } => write!(f, "Length({min:?}..={max:?})"),
            Self::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Self::OneOf(options) => write!(f, "OneOf({options:?})"),
            Self::Count { min, max } => write!(f, "Count({min:?}..={max:?})"),
            Self::DependsOn { field, .. } => write!(f, "DependsOn({field})"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl Check {
    /// Apply this check to a present, non-blank value.
    fn apply(&self, value: &Value, draft: &Draft) -> Result<(), String> {
        match self {
            Self::Required => Ok(()),
            Self::NumberRange { min, max } => {
                let n = as_number(value).ok_or_else(|| "must be a number".to_string())?;
                let below = min.is_some_and(|m| n < m);
                let above = max.is_some_and(|m| n > m);
                if below || above {
                    Err(range_message(*min, *max, ""))
                } else {
                    Ok(())
                }
            }
            Self::Length { min, max } => {
                let s = value.as_str().ok_or_else(|| "must be text".to_string())?;
                let len = s.trim().chars().count();
                let short = min.is_some_and(|m| len < m);
                let long = max.is_some_and(|m| len > m);
                if short || long {
                    Err(range_message(*min, *max, " characters"))
                } else {
                    Ok(())
                }
            }
            Self::Pattern { regex, message } => match as_text(value) {
                Some(text) if regex.is_match(&text) => Ok(()),
                _ => Err(message.clone()),
            },
            Self::OneOf(options) => match as_text(value) {
                Some(text) if options.contains(&text) => Ok(()),
                _ => Err(format!(
                    "must be one of: {}",
                    options.iter().cloned().collect::<Vec<_>>().join(", ")
                )),
            },
            Self::Count { min, max } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| "must be a list".to_string())?;
                let n = items.len();
                let few = min.is_some_and(|m| n < m);
                let many = max.is_some_and(|m| n > m);
                if few || many {
                    Err(count_message(*min, *max))
                } else {
                    Ok(())
                }
            }
            Self::DependsOn { field, allowed } => {
                let parent = draft
                    .get(field)
                    .filter(|v| !is_blank_value(v))
                    .and_then(as_text)
                    .ok_or_else(|| format!("requires {field} to be selected first"))?;
                let text = as_text(value);
                let permitted = allowed
                    .get(&parent)
                    .zip(text.as_ref())
                    .is_some_and(|(options, t)| options.contains(t));
                if permitted {
                    Ok(())
                } else {
                    Err(format!("is not available for the selected {field}"))
                }
            }
            Self::Custom(f) => match f(value, draft) {
                Some(reason) => Err(reason),
                None => Ok(()),
            },
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn range_message<T: fmt::Display>(min: Option<T>, max: Option<T>, unit: &str) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("must be between {lo} and {hi}{unit}"),
        (Some(lo), None) => format!("must be at least {lo}{unit}"),
        (None, Some(hi)) => format!("must be at most {hi}{unit}"),
        (None, None) => "is out of range".to_string(),
    }
}

fn count_message(min: Option<usize>, max: Option<usize>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => format!("must contain exactly {lo} items"),
        (Some(lo), Some(hi)) => format!("must contain between {lo} and {hi} items"),
        (Some(lo), None) => format!("must contain at least {lo} items"),
        (None, Some(hi)) => format!("must contain at most {hi} items"),
        (None, None) => "has an invalid number of items".to_string(),
    }
}

/// The checks for one field, built fluently.
///
/// A rule without `required()` is optional: a blank value passes without
/// running the remaining checks.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub checks: Vec<Check>,
}

impl FieldRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            checks: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.checks.insert(0, Check::Required);
        self
    }

    pub fn number_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.checks.push(Check::NumberRange { min, max });
        self
    }

    pub fn at_least(self, min: f64) -> Self {
        self.number_range(Some(min), None)
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.checks.push(Check::Length { min, max });
        self
    }

    pub fn pattern(mut self, regex: Regex, message: impl Into<String>) -> Self {
        self.checks.push(Check::Pattern {
            regex,
            message: message.into(),
        });
        self
    }

    pub fn one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checks
            .push(Check::OneOf(options.into_iter().map(Into::into).collect()));
        self
    }

    pub fn count(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.checks.push(Check::Count { min, max });
        self
    }

    /// Every item of a list must be one of `options`.
    pub fn each_one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: BTreeSet<String> = options.into_iter().map(Into::into).collect();
        self.checks.push(Check::Custom(Arc::new(move |value, _| {
            let Some(items) = value.as_array() else {
                return Some("must be a list".to_string());
            };
            items
                .iter()
                .find(|item| !as_text(item).is_some_and(|t| options.contains(&t)))
                .map(|bad| format!("contains an unknown option: {bad}"))
        })));
        self
    }

    pub fn depends_on(
        mut self,
        field: impl Into<String>,
        allowed: BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        self.checks.push(Check::DependsOn {
            field: field.into(),
            allowed,
        });
        self
    }

    pub fn custom(
        mut self,
        f: impl Fn(&Value, &Draft) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.checks.push(Check::Custom(Arc::new(f)));
        self
    }

    pub fn is_required(&self) -> bool {
        self.checks.iter().any(|c| matches!(c, Check::Required))
    }

    /// Validate this field against `draft`. `Err` carries the first failing reason.
    pub fn validate(&self, draft: &Draft) -> Result<(), String> {
        let value = draft.get(&self.field).filter(|v| !is_blank_value(v));
        let Some(value) = value else {
            return if self.is_required() {
                Err("is required".to_string())
            } else {
                Ok(())
            };
        };
        self.checks.iter().try_for_each(|c| c.apply(value, draft))
    }
}

/// Run every rule and collect all failures.
pub fn validate_rules(rules: &[FieldRule], draft: &Draft) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for rule in rules {
        if let Err(reason) = rule.validate(draft) {
            result.reject(&rule.field, reason);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(v: Value) -> Draft {
        Draft::from_object(v).unwrap()
    }

    fn provinces() -> BTreeMap<String, BTreeSet<String>> {
        let mut m = BTreeMap::new();
        m.insert(
            "Punjab".to_string(),
            ["Kamra", "Attock"].into_iter().map(String::from).collect(),
        );
        m
    }

    #[test]
    fn required_rejects_blank() {
        let rule = FieldRule::new("firstName").required();
        assert_eq!(rule.validate(&draft(json!({}))), Err("is required".into()));
        assert_eq!(
            rule.validate(&draft(json!({"firstName": "  "}))),
            Err("is required".into())
        );
        assert!(rule.validate(&draft(json!({"firstName": "Ali"}))).is_ok());
    }

    #[test]
    fn optional_field_skips_checks_when_blank() {
        let rule = FieldRule::new("nickname").length(Some(3), None);
        assert!(rule.validate(&draft(json!({}))).is_ok());
        assert!(rule.validate(&draft(json!({"nickname": ""}))).is_ok());
        assert!(rule.validate(&draft(json!({"nickname": "ab"}))).is_err());
    }

    #[test]
    fn number_range_accepts_numeric_strings() {
        let rule = FieldRule::new("age").required().at_least(18.0);
        assert_eq!(
            rule.validate(&draft(json!({"age": "16"}))),
            Err("must be at least 18".into())
        );
        assert!(rule.validate(&draft(json!({"age": "18"}))).is_ok());
        assert!(rule.validate(&draft(json!({"age": 40}))).is_ok());
        assert_eq!(
            rule.validate(&draft(json!({"age": "old"}))),
            Err("must be a number".into())
        );
    }

    #[test]
    fn bounded_range_message() {
        let rule = FieldRule::new("guests").number_range(Some(1.0), Some(16.0));
        assert_eq!(
            rule.validate(&draft(json!({"guests": 20}))),
            Err("must be between 1 and 16".into())
        );
    }

    #[test]
    fn pattern_matches_numbers_and_text() {
        let rule = FieldRule::new("phone")
            .required()
            .pattern(Regex::new(r"^\d{11}$").unwrap(), "must be 11 digits");
        assert!(rule.validate(&draft(json!({"phone": "03001234567"}))).is_ok());
        assert!(rule.validate(&draft(json!({"phone": 30012345678_u64}))).is_ok());
        assert_eq!(
            rule.validate(&draft(json!({"phone": "0300-123"}))),
            Err("must be 11 digits".into())
        );
    }

    #[test]
    fn one_of_lists_options() {
        let rule = FieldRule::new("guestType").one_of(["any_guest", "experienced_guest"]);
        assert!(rule.validate(&draft(json!({"guestType": "any_guest"}))).is_ok());
        let err = rule
            .validate(&draft(json!({"guestType": "vip"})))
            .unwrap_err();
        assert!(err.starts_with("must be one of:"));
        assert!(err.contains("experienced_guest"));
    }

    #[test]
    fn count_range() {
        let photos = FieldRule::new("photos").required().count(Some(5), None);
        let four = json!({"photos": ["1", "2", "3", "4"]});
        let five = json!({"photos": ["1", "2", "3", "4", "5"]});
        assert_eq!(
            photos.validate(&draft(four)),
            Err("must contain at least 5 items".into())
        );
        assert!(photos.validate(&draft(five)).is_ok());

        let highlights = FieldRule::new("highlights").required().count(Some(1), Some(2));
        assert_eq!(
            highlights.validate(&draft(json!({"highlights": ["a", "b", "c"]}))),
            Err("must contain between 1 and 2 items".into())
        );
    }

    #[test]
    fn each_one_of_reports_unknown_item() {
        let rule = FieldRule::new("amenities").each_one_of(["wifi", "tv"]);
        assert!(rule.validate(&draft(json!({"amenities": ["wifi"]}))).is_ok());
        let err = rule
            .validate(&draft(json!({"amenities": ["wifi", "pool"]})))
            .unwrap_err();
        assert!(err.contains("pool"));
    }

    #[test]
    fn each_one_of_rejects_a_single_value() {
        let rule = FieldRule::new("amenities").each_one_of(["wifi", "tv"]);
        assert_eq!(
            rule.validate(&draft(json!({"amenities": "helipad"}))),
            Err("must be a list".into())
        );
        assert_eq!(
            rule.validate(&draft(json!({"amenities": "wifi"}))),
            Err("must be a list".into())
        );
    }

    #[test]
    fn depends_on_checks_parent_value() {
        let rule = FieldRule::new("city").required().depends_on("province", provinces());
        assert!(
            rule.validate(&draft(json!({"province": "Punjab", "city": "Kamra"})))
                .is_ok()
        );
        assert_eq!(
            rule.validate(&draft(json!({"province": "Punjab", "city": "Lahore"}))),
            Err("is not available for the selected province".into())
        );
        assert_eq!(
            rule.validate(&draft(json!({"city": "Kamra"}))),
            Err("requires province to be selected first".into())
        );
    }

    #[test]
    fn validate_rules_reports_every_failure() {
        let rules = vec![
            FieldRule::new("firstName").required(),
            FieldRule::new("lastName").required(),
            FieldRule::new("age").required().at_least(18.0),
        ];
        let result = validate_rules(&rules, &draft(json!({"age": 12})));
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.error_for("age"), Some("must be at least 18"));
        assert_eq!(result.error_for("firstName"), Some("is required"));
    }

    #[test]
    fn custom_check_sees_draft() {
        let rule = FieldRule::new("confirmEmail").required().custom(|value, draft| {
            (draft.get("email") != Some(value)).then(|| "must match email".to_string())
        });
        let ok = draft(json!({"email": "a@b.co", "confirmEmail": "a@b.co"}));
        let bad = draft(json!({"email": "a@b.co", "confirmEmail": "x@b.co"}));
        assert!(rule.validate(&ok).is_ok());
        assert_eq!(rule.validate(&bad), Err("must match email".into()));
    }

    #[test]
    fn display_lists_errors() {
        let mut r = ValidationResult::valid();
        assert_eq!(r.to_string(), "valid");
        r.reject("age", "must be at least 18");
        r.reject("age", "ignored second reason");
        assert_eq!(r.to_string(), "age: must be at least 18");
    }
}

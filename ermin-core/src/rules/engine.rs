use super::conversion::{convert, TypedValue};
use super::syntax::{collapse_whitespace, normalize_whitespace};
use crate::config::ValidationConfig;
use crate::types::*;

/// Result of matching one value against an allowed-values set.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedMatch {
    Exact,
    /// Matches a literal option only when case is ignored
    IgnoringCase(String),
    NoMatch,
}

// RuleEngine - evaluates one cell value against one ColumnRule.
//
// Checks run in a fixed order and the first failing check wins, so a cell
// produces at most one Finding:
//   1. emptiness       -> Missing
//   2. type conversion -> TypeMismatch
//   3. numeric bounds  -> OutOfRange
//   4. allowed values  -> InvalidFormat
//   5. format pattern  -> InvalidFormat
// A case-only allowed-value match is a Warning and does not stop step 5.
pub struct RuleEngine<'a> {
    config: &'a ValidationConfig,
}

impl<'a> RuleEngine<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        self.config
    }

    /// Value autofix writes into a missing cell of this field.
    pub fn fill_value<'r>(&'r self, rule: &'r ColumnRule) -> &'r str {
        match &rule.default {
            Some(default) if self.config.repair.use_field_defaults => default,
            _ => &self.config.repair.sentinel,
        }
    }

    /// Whitespace-collapsed form of a non-blank value, if it differs.
    pub fn whitespace_repair(&self, value: &str) -> Option<String> {
        let collapsed = collapse_whitespace(value);
        (!collapsed.is_empty() && collapsed != value).then_some(collapsed)
    }

    /// Evaluate `value` against `rule`. The returned finding carries kind,
    /// severity, value, description and suggestion; the caller adds the
    /// row/column location.
    pub fn evaluate(&self, rule: &ColumnRule, value: &str) -> Option<Finding> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return self.check_missing(rule, value);
        }
        if self.config.strictness.accept_sentinel && trimmed == self.config.repair.sentinel {
            return None;
        }

        // Patterns see the value with whitespace runs collapsed but list
        // spacing kept; type and allowed-value checks see the normalized form.
        let collapsed = collapse_whitespace(value);
        let normalized = normalize_whitespace(value);
        let items: Vec<&str> = if rule.list {
            normalized.split(',').map(str::trim).collect()
        } else {
            vec![normalized.as_str()]
        };

        // Literal options are explicit exceptions to the declared type.
        if !rule.list {
            if let Some(allowed) = &rule.allowed {
                let exact_literal = allowed.options.iter().any(|o| {
                    matches!(o, ChoiceOption::Literal(lit) if normalize_whitespace(lit) == normalized)
                });
                if exact_literal {
                    return self.check_pattern(rule, value, &collapsed).err();
                }
            }
        }

        let typed = match self.check_type(rule, value, &items) {
            Ok(typed) => typed,
            Err(finding) => return Some(finding),
        };

        if let Some(finding) = self.check_bounds(rule, value, &typed) {
            return Some(finding);
        }

        let case_warning = match self.check_allowed(rule, value, &items) {
            Ok(warning) => warning,
            Err(finding) => return Some(finding),
        };

        let checked = case_warning
            .as_ref()
            .and_then(|w| w.suggestion.clone())
            .unwrap_or(collapsed);
        if let Err(finding) = self.check_pattern(rule, value, &checked) {
            return Some(finding);
        }

        case_warning
    }

    fn check_missing(&self, rule: &ColumnRule, value: &str) -> Option<Finding> {
        let severity = if rule.required {
            Severity::Error
        } else {
            self.config.strictness.optional_missing_severity()?
        };
        let description = if rule.required {
            "Required field is empty."
        } else {
            "Optional field is empty."
        };
        Some(
            Finding::new(FindingKind::Missing, severity, description)
                .with_value(value)
                .with_suggestion(self.fill_value(rule)),
        )
    }

    fn check_type(
        &self,
        rule: &ColumnRule,
        value: &str,
        items: &[&str],
    ) -> Result<Vec<TypedValue>, Finding> {
        let mut typed = Vec::with_capacity(items.len());
        for item in items {
            match convert(rule.value_type, item) {
                Ok(v) => typed.push(v),
                Err(e) => {
                    let description = if rule.list {
                        format!(
                            "One or more values in list do not match expected format (\"{}\"): {}",
                            rule.value_type, value
                        )
                    } else {
                        e.to_string()
                    };
                    return Err(Finding::new(FindingKind::TypeMismatch, Severity::Error, description)
                        .with_value(value));
                }
            }
        }
        Ok(typed)
    }

    fn check_bounds(&self, rule: &ColumnRule, value: &str, typed: &[TypedValue]) -> Option<Finding> {
        if rule.min.is_none() && rule.max.is_none() {
            return None;
        }
        for number in typed.iter().filter_map(TypedValue::as_f64) {
            let description = match (rule.min, rule.max) {
                (Some(min), _) if number < min => format!("Value {number} is below the minimum {min}."),
                (_, Some(max)) if number > max => format!("Value {number} is above the maximum {max}."),
                _ => continue,
            };
            return Some(Finding::new(FindingKind::OutOfRange, Severity::Error, description).with_value(value));
        }
        None
    }

    /// Ok(None) when every item matches exactly, Ok(Some(warning)) when some
    /// only match ignoring case, Err on any non-matching item.
    fn check_allowed(
        &self,
        rule: &ColumnRule,
        value: &str,
        items: &[&str],
    ) -> Result<Option<Finding>, Finding> {
        let Some(allowed) = &rule.allowed else {
            return Ok(None);
        };

        let mut canonical: Vec<String> = Vec::with_capacity(items.len());
        let mut case_mismatch = false;
        for item in items {
            match self.match_allowed(allowed, item) {
                AllowedMatch::Exact => canonical.push(item.to_string()),
                AllowedMatch::IgnoringCase(literal) => {
                    case_mismatch = true;
                    canonical.push(literal);
                }
                AllowedMatch::NoMatch => {
                    let description = format!(
                        "Invalid value: \"{}\". Accepted syntax: {}.",
                        normalize_whitespace(value),
                        rule.syntax
                    );
                    return Err(
                        Finding::new(FindingKind::InvalidFormat, Severity::Error, description).with_value(value),
                    );
                }
            }
        }

        if !case_mismatch {
            return Ok(None);
        }
        let suggestion = canonical.join(",");
        let description = format!(
            "Value \"{}\" matches an accepted value only when ignoring case; expected \"{}\".",
            normalize_whitespace(value),
            suggestion
        );
        Ok(Some(
            Finding::new(FindingKind::InvalidFormat, Severity::Warning, description)
                .with_value(value)
                .with_suggestion(suggestion),
        ))
    }

    /// Match one item against the options of an allowed-values set.
    pub fn match_allowed(&self, allowed: &AllowedValues, item: &str) -> AllowedMatch {
        let mut folded: Option<&str> = None;
        for option in &allowed.options {
            let matched = match option {
                ChoiceOption::Literal(literal) => {
                    let literal_form = normalize_whitespace(literal);
                    if literal_form == item {
                        true
                    } else {
                        if folded.is_none() && literal_form.to_lowercase() == item.to_lowercase() {
                            folded = Some(literal.as_str());
                        }
                        false
                    }
                }
                ChoiceOption::Typed(value_type) => convert(*value_type, item).is_ok(),
                ChoiceOption::Prefixed { prefix, value_type } => item
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| convert(*value_type, rest).is_ok()),
                ChoiceOption::Suffixed { suffix, value_type } => item
                    .strip_suffix(suffix.as_str())
                    .is_some_and(|rest| convert(*value_type, rest).is_ok()),
            };
            if matched {
                return AllowedMatch::Exact;
            }
        }

        match folded {
            Some(literal) if self.config.strictness.case_insensitive_values => {
                AllowedMatch::IgnoringCase(literal.to_string())
            }
            _ => AllowedMatch::NoMatch,
        }
    }

    fn check_pattern(&self, rule: &ColumnRule, value: &str, collapsed: &str) -> Result<(), Finding> {
        match &rule.pattern {
            Some(pattern) if !pattern.is_match(collapsed) => {
                let description = format!(
                    "Value \"{}\" does not match pattern \"{}\".",
                    collapsed, pattern.source
                );
                Err(Finding::new(FindingKind::InvalidFormat, Severity::Error, description).with_value(value))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::syntax::parse_syntax;

    fn ermin_rule(name: &str, syntax: &str) -> ColumnRule {
        let parsed = parse_syntax(syntax).unwrap();
        let mut rule = ColumnRule::new(name, parsed.value_type);
        rule.list = parsed.list;
        rule.allowed = parsed.allowed;
        rule.syntax = syntax.to_string();
        rule
    }

    fn method_rule() -> ColumnRule {
        ColumnRule::new("method", ValueType::Categorical)
            .required()
            .with_allowed(AllowedValues::literals(["measured", "estimated"]))
    }

    #[test]
    fn test_text_value_passes() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        assert_eq!(engine.evaluate(&ermin_rule("name", "{text}"), "abc123"), None);
    }

    #[test]
    fn test_required_empty_is_missing_error() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("name", "{text}").required();

        for value in ["", "   "] {
            let finding = engine.evaluate(&rule, value).unwrap();
            assert_eq!(finding.kind, FindingKind::Missing);
            assert_eq!(finding.severity, Severity::Error);
            assert_eq!(finding.description, "Required field is empty.");
            assert_eq!(finding.suggestion.as_deref(), Some("NULL"));
        }
    }

    #[test]
    fn test_optional_empty_depends_on_strictness() {
        let rule = ermin_rule("notes", "{text}");

        let config = ValidationConfig::default();
        assert_eq!(RuleEngine::new(&config).evaluate(&rule, ""), None);

        let mut config = ValidationConfig::default();
        config.strictness.optional_missing = crate::config::OptionalMissing::Warning;
        let finding = RuleEngine::new(&config).evaluate(&rule, "").unwrap();
        assert_eq!(finding.kind, FindingKind::Missing);
        assert_eq!(finding.severity, Severity::Warning);
    }

    #[test]
    fn test_fill_value_prefers_field_default() {
        let rule = ermin_rule("units", "{text}").required().with_default("tonnes");

        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        assert_eq!(engine.fill_value(&rule), "tonnes");

        let mut config = ValidationConfig::default();
        config.repair.use_field_defaults = false;
        let engine = RuleEngine::new(&config);
        assert_eq!(engine.fill_value(&rule), "NULL");
    }

    #[test]
    fn test_sentinel_accepted_when_configured() {
        let rule = ColumnRule::new("co2_tonnes", ValueType::Float).required();

        let config = ValidationConfig::default();
        let finding = RuleEngine::new(&config).evaluate(&rule, "NULL").unwrap();
        assert_eq!(finding.kind, FindingKind::TypeMismatch);

        let mut config = ValidationConfig::default();
        config.strictness.accept_sentinel = true;
        assert_eq!(RuleEngine::new(&config).evaluate(&rule, "NULL"), None);
    }

    #[test]
    fn test_sentinel_rejected_where_syntax_does_not_list_it() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);

        let qty = ermin_rule("qty", "{float}").required();
        assert_eq!(engine.evaluate(&qty, "NULL").unwrap().kind, FindingKind::TypeMismatch);

        let units = ermin_rule("units", "[tonnes|kilograms]").required();
        assert_eq!(engine.evaluate(&units, "NULL").unwrap().kind, FindingKind::InvalidFormat);
    }

    #[test]
    fn test_type_mismatch() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let finding = engine
            .evaluate(&ColumnRule::new("co2_tonnes", ValueType::Float), "12 t")
            .unwrap();
        assert_eq!(finding.kind, FindingKind::TypeMismatch);
        assert_eq!(finding.description, "Could not convert this value to a float: \"12 t\"");
        assert_eq!(finding.value.as_deref(), Some("12 t"));
    }

    #[test]
    fn test_out_of_range() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ColumnRule::new("co2_tonnes", ValueType::Float).with_bounds(Some(0.0), Some(1e6));

        assert_eq!(engine.evaluate(&rule, "0"), None);
        assert_eq!(engine.evaluate(&rule, "1000000"), None);
        let low = engine.evaluate(&rule, "-0.5").unwrap();
        assert_eq!(low.kind, FindingKind::OutOfRange);
        assert_eq!(low.description, "Value -0.5 is below the minimum 0.");
        let high = engine.evaluate(&rule, "2e6").unwrap();
        assert_eq!(high.kind, FindingKind::OutOfRange);
    }

    #[test]
    fn test_option_list_values() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("uncertainty", "[RMSE|NRMSE|MAE|MAPE|SD|HIST|CI{float}|other]");
        for value in ["RMSE", "NRMSE", "MAE", "MAPE", "SD", "HIST", "CI.9", "CI.95", "CI0.95", "CI9999", "other"] {
            assert_eq!(engine.evaluate(&rule, value), None, "{value} should be accepted");
        }

        let finding = engine.evaluate(&rule, "CI").unwrap();
        assert_eq!(finding.kind, FindingKind::InvalidFormat);
        assert_eq!(
            finding.description,
            "Invalid value: \"CI\". Accepted syntax: [RMSE|NRMSE|MAE|MAPE|SD|HIST|CI{float}|other]."
        );
    }

    #[test]
    fn test_suffixed_option() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("version", "[RMSE|{float}_version]");
        assert_eq!(engine.evaluate(&rule, "0.0001_version"), None);
        assert!(engine.evaluate(&rule, "0.0001version").is_some());
        assert!(engine.evaluate(&rule, "RMS").is_some());
    }

    #[test]
    fn test_single_character_options() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("tier", "[1|2|3]");
        assert_eq!(engine.evaluate(&rule, "2"), None);
        assert!(engine.evaluate(&rule, "22").is_some());
    }

    #[test]
    fn test_float_or_null_option() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("emission_quantity", "[{float}|NULL]");
        assert_eq!(engine.evaluate(&rule, "12.5"), None);
        assert_eq!(engine.evaluate(&rule, "NULL"), None);
        assert!(engine.evaluate(&rule, "lots").is_some());
    }

    #[test]
    fn test_case_mismatch_strict_is_error() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let finding = engine.evaluate(&method_rule(), "Measured").unwrap();
        assert_eq!(finding.kind, FindingKind::InvalidFormat);
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.suggestion, None);
    }

    #[test]
    fn test_case_mismatch_lenient_is_warning_with_suggestion() {
        let mut config = ValidationConfig::default();
        config.strictness.case_insensitive_values = true;
        let engine = RuleEngine::new(&config);
        let finding = engine.evaluate(&method_rule(), "Measured").unwrap();
        assert_eq!(finding.kind, FindingKind::InvalidFormat);
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.suggestion.as_deref(), Some("measured"));

        assert_eq!(engine.evaluate(&method_rule(), "measured"), None);
        assert_eq!(engine.evaluate(&method_rule(), "guessed").unwrap().severity, Severity::Error);
    }

    #[test]
    fn test_allowed_literal_with_comma_space() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let allowed = crate::rules::syntax::parse_allowed_values("Land Use, Forestry|Energy").unwrap();
        let rule = ColumnRule::new("sector", ValueType::Categorical).with_allowed(allowed);

        assert_eq!(engine.evaluate(&rule, "Land Use, Forestry"), None);
        assert_eq!(engine.evaluate(&rule, "Land  Use,Forestry"), None);
        assert_eq!(engine.evaluate(&rule, "Energy"), None);
        assert_eq!(engine.evaluate(&rule, "Forestry").unwrap().kind, FindingKind::InvalidFormat);
    }

    #[test]
    fn test_case_suggestion_keeps_literal_spelling() {
        let mut config = ValidationConfig::default();
        config.strictness.case_insensitive_values = true;
        let engine = RuleEngine::new(&config);
        let rule = ColumnRule::new("sector", ValueType::Categorical)
            .with_allowed(AllowedValues::literals(["Land Use, Forestry", "Energy"]));

        let finding = engine.evaluate(&rule, "land use, forestry").unwrap();
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.suggestion.as_deref(), Some("Land Use, Forestry"));
    }

    #[test]
    fn test_list_values() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let floats = ermin_rule("quantities", "{float},...");
        assert_eq!(engine.evaluate(&floats, "2008,-234.3,0.9, .111"), None);
        assert_eq!(engine.evaluate(&floats, "2"), None);

        let finding = engine.evaluate(&floats, "2008, abc").unwrap();
        assert_eq!(finding.kind, FindingKind::TypeMismatch);
        assert_eq!(
            finding.description,
            "One or more values in list do not match expected format (\"{float}\"): 2008, abc"
        );

        let texts = ermin_rule("labels", "{text},...");
        assert_eq!(engine.evaluate(&texts, "2008,x-234.3,0.9, .111"), None);
    }

    #[test]
    fn test_whitespace_ignored_when_checking() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ermin_rule("category", "{unfccc_cat}");
        assert_eq!(engine.evaluate(&rule, "3.D    Agricultural Soils"), None);
        let finding = engine.evaluate(&rule, "3.D Cultural Soils").unwrap();
        assert_eq!(finding.description, "Invalid UNFCCC category: \"3.D Cultural Soils\".");
    }

    #[test]
    fn test_pattern() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ColumnRule::new("facility_id", ValueType::String)
            .with_pattern(FieldPattern::new(r"FAC-\d{4}").unwrap());
        assert_eq!(engine.evaluate(&rule, "FAC-0001"), None);
        let finding = engine.evaluate(&rule, "FAC-1").unwrap();
        assert_eq!(finding.kind, FindingKind::InvalidFormat);
        assert_eq!(finding.description, "Value \"FAC-1\" does not match pattern \"FAC-\\d{4}\".");
        // the pattern must match the whole value
        assert!(engine.evaluate(&rule, "XFAC-0001").is_some());
    }

    #[test]
    fn test_pattern_sees_comma_spacing() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ColumnRule::new("contact", ValueType::String)
            .with_pattern(FieldPattern::new(r"[A-Z][a-z]+, [A-Z][a-z]+").unwrap());

        assert_eq!(engine.evaluate(&rule, "Smith, John"), None);
        assert_eq!(engine.evaluate(&rule, "  Smith,   John "), None);
        let finding = engine.evaluate(&rule, "Smith,John").unwrap();
        assert_eq!(finding.kind, FindingKind::InvalidFormat);
        assert_eq!(
            finding.description,
            "Value \"Smith,John\" does not match pattern \"[A-Z][a-z]+, [A-Z][a-z]+\"."
        );
    }

    #[test]
    fn test_first_failing_check_wins() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        let rule = ColumnRule::new("year", ValueType::Integer)
            .with_bounds(Some(1990.0), Some(2100.0))
            .with_pattern(FieldPattern::new(r"\d{4}").unwrap());
        assert_eq!(engine.evaluate(&rule, "abc").unwrap().kind, FindingKind::TypeMismatch);
        assert_eq!(engine.evaluate(&rule, "1800").unwrap().kind, FindingKind::OutOfRange);
        assert_eq!(engine.evaluate(&rule, "02000").unwrap().kind, FindingKind::InvalidFormat);
        assert_eq!(engine.evaluate(&rule, "2000"), None);
    }

    #[test]
    fn test_whitespace_repair() {
        let config = ValidationConfig::default();
        let engine = RuleEngine::new(&config);
        assert_eq!(engine.whitespace_repair("  a   b "), Some("a b".to_string()));
        assert_eq!(engine.whitespace_repair("a b"), None);
        assert_eq!(engine.whitespace_repair("   "), None);
    }
}

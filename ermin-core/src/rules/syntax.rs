// ERMIN "Value syntax" parsing.
//
// Recognized forms:
//   {text} {float} {integer} {timestamp} {doi} {url} {wkt} {unfccc_cat}
//   {float},...                      comma-delimited list of one type
//   [20-year|100-year]               literal options
//   [{float}|NULL]                   typed and literal options mixed
//   [RMSE|CI{float}|{float}_version] literal prefix/suffix around a type
// Nested lists are not supported.

use crate::types::{AllowedValues, ChoiceOption, ValueType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unknown value type \"{0}\"")]
    UnknownType(String),
    #[error("malformed value syntax \"{0}\"")]
    Malformed(String),
    #[error("option list \"{0}\" has no options")]
    EmptyOptions(String),
}

/// Rule parts implied by a syntax string.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSyntax {
    pub value_type: ValueType,
    pub list: bool,
    pub allowed: Option<AllowedValues>,
}

impl ValueSyntax {
    fn of(value_type: ValueType) -> Self {
        Self {
            value_type,
            list: false,
            allowed: None,
        }
    }
}

/// Collapse whitespace runs to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `collapse_whitespace`, then drop spaces after commas. Values and syntax
/// strings are compared in this form.
pub fn normalize_whitespace(text: &str) -> String {
    collapse_whitespace(text).replace(", ", ",")
}

pub fn parse_syntax(text: &str) -> Result<ValueSyntax, SyntaxError> {
    let syntax = normalize_whitespace(text);

    if syntax.is_empty() {
        return Ok(ValueSyntax::of(ValueType::String));
    }

    if syntax.starts_with('[') {
        return parse_option_list(&syntax);
    }

    if let Some(base) = syntax.strip_suffix(",...") {
        let value_type = parse_braced_type(base)?;
        return Ok(ValueSyntax {
            value_type,
            list: true,
            allowed: None,
        });
    }

    if syntax.starts_with('{') {
        return parse_braced_type(&syntax).map(ValueSyntax::of);
    }

    // Free-text descriptions carry no machine-checkable constraint.
    tracing::debug!(syntax = %syntax, "unrecognized syntax treated as free text");
    Ok(ValueSyntax::of(ValueType::String))
}

fn parse_braced_type(text: &str) -> Result<ValueType, SyntaxError> {
    let inner = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .filter(|t| !t.contains(['{', '}']))
        .ok_or_else(|| SyntaxError::Malformed(text.to_string()))?;
    type_from_name(inner)
}

fn type_from_name(name: &str) -> Result<ValueType, SyntaxError> {
    match ValueType::from_name(name) {
        Some(ValueType::Categorical) | None => Err(SyntaxError::UnknownType(format!("{{{name}}}"))),
        Some(ty) => Ok(ty),
    }
}

fn parse_option_list(syntax: &str) -> Result<ValueSyntax, SyntaxError> {
    let body = syntax
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .filter(|s| !s.contains(['[', ']']))
        .ok_or_else(|| SyntaxError::Malformed(syntax.to_string()))?;

    let options = body
        .split('|')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(parse_option)
        .collect::<Result<Vec<_>, _>>()?;

    if options.is_empty() {
        return Err(SyntaxError::EmptyOptions(syntax.to_string()));
    }

    Ok(ValueSyntax {
        value_type: ValueType::Categorical,
        list: false,
        allowed: Some(AllowedValues { options }),
    })
}

/// Parse an `Allowed values` cell: options separated by `|` or `;`, each in
/// the same form as inside an option list.
pub fn parse_allowed_values(text: &str) -> Result<AllowedValues, SyntaxError> {
    let options = text
        .split(['|', ';'])
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(parse_option)
        .collect::<Result<Vec<_>, _>>()?;
    if options.is_empty() {
        return Err(SyntaxError::EmptyOptions(text.to_string()));
    }
    Ok(AllowedValues { options })
}

fn parse_option(option: &str) -> Result<ChoiceOption, SyntaxError> {
    let (Some(open), Some(close)) = (option.find('{'), option.find('}')) else {
        return Ok(ChoiceOption::Literal(option.to_string()));
    };
    if close < open {
        return Err(SyntaxError::Malformed(option.to_string()));
    }
    let value_type = type_from_name(&option[open + 1..close])?;
    let before = &option[..open];
    let after = &option[close + 1..];

    match (before.is_empty(), after.is_empty()) {
        (true, true) => Ok(ChoiceOption::Typed(value_type)),
        (false, true) => Ok(ChoiceOption::Prefixed {
            prefix: before.to_string(),
            value_type,
        }),
        (true, false) => Ok(ChoiceOption::Suffixed {
            suffix: after.to_string(),
            value_type,
        }),
        (false, false) => Err(SyntaxError::Malformed(option.to_string())),
    }
}

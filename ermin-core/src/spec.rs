// SpecModel: field rules parsed from a spec table.
//
// One spec row describes one field. Header names are matched
// case-insensitively so both the ERMIN specification export
// ("Structured name", "Required", "Value syntax", ...) and hand-written
// typed specs ("name", "required", "type", "allowed values", "min", ...)
// load through the same path.

use crate::error::SpecFormatError;
use crate::rules::conversion::parse_float;
use crate::rules::syntax::{normalize_whitespace, parse_allowed_values, parse_syntax};
use crate::table::Table;
use crate::types::{ColumnRule, FieldPattern, ValueType};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const NAME_HEADERS: &[&str] = &["structured name", "name", "field", "field name"];
const REQUIRED_HEADERS: &[&str] = &["required"];
const SYNTAX_HEADERS: &[&str] = &["value syntax", "syntax"];
const TYPE_HEADERS: &[&str] = &["type", "expected type"];
const ALLOWED_HEADERS: &[&str] = &["allowed values"];
const PATTERN_HEADERS: &[&str] = &["pattern", "format pattern"];
const MIN_HEADERS: &[&str] = &["min", "minimum"];
const MAX_HEADERS: &[&str] = &["max", "maximum"];
const DEFAULT_HEADERS: &[&str] = &["default"];

/// Column positions of the recognized spec headers.
struct SpecColumns {
    name: usize,
    required: usize,
    syntax: Option<usize>,
    value_type: Option<usize>,
    allowed: Option<usize>,
    pattern: Option<usize>,
    min: Option<usize>,
    max: Option<usize>,
    default: Option<usize>,
}

impl SpecColumns {
    fn locate(headers: &[String]) -> Result<Self, SpecFormatError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
        };

        Ok(Self {
            name: find(NAME_HEADERS).ok_or(SpecFormatError::MissingColumn("Structured name"))?,
            required: find(REQUIRED_HEADERS).ok_or(SpecFormatError::MissingColumn("Required"))?,
            syntax: find(SYNTAX_HEADERS),
            value_type: find(TYPE_HEADERS),
            allowed: find(ALLOWED_HEADERS),
            pattern: find(PATTERN_HEADERS),
            min: find(MIN_HEADERS),
            max: find(MAX_HEADERS),
            default: find(DEFAULT_HEADERS),
        })
    }
}

/// Ordered field rules keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct SpecModel {
    rules: Vec<ColumnRule>,
    index: HashMap<String, usize>,
}

impl SpecModel {
    /// Build a model from already-constructed rules, keeping their order.
    pub fn new(rules: Vec<ColumnRule>) -> Result<Self, SpecFormatError> {
        if rules.is_empty() {
            return Err(SpecFormatError::Empty);
        }
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), i).is_some() {
                return Err(SpecFormatError::DuplicateField(rule.name.clone()));
            }
        }
        Ok(Self { rules, index })
    }

    /// Parse a spec table into rules.
    pub fn load(spec_table: &Table) -> Result<Self, SpecFormatError> {
        let columns = SpecColumns::locate(&spec_table.headers)?;
        let mut rules = Vec::new();

        for (i, row) in spec_table.rows.iter().enumerate() {
            let name = row[columns.name].trim();
            if name.is_empty() {
                continue;
            }
            rules.push(parse_rule(i + 1, name, row, &columns)?);
        }

        let model = Self::new(rules)?;
        debug!(
            fields = model.len(),
            required = model.required_rules().count(),
            "loaded spec"
        );
        Ok(model)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, SpecFormatError> {
        let table = Table::from_csv_path(path)?;
        Self::load(&table)
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&ColumnRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn required_rules(&self) -> impl Iterator<Item = &ColumnRule> {
        self.rules.iter().filter(|rule| rule.required)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_required(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "required" => Some(true),
        "no" | "n" | "false" | "0" | "optional" | "" => Some(false),
        _ => None,
    }
}

fn cell_text(row: &[String], column: Option<usize>) -> &str {
    column.map(|c| row[c].trim()).unwrap_or("")
}

fn parse_rule(
    row_number: usize,
    name: &str,
    row: &[String],
    columns: &SpecColumns,
) -> Result<ColumnRule, SpecFormatError> {
    let invalid = |message: String| SpecFormatError::InvalidField {
        row: row_number,
        field: name.to_string(),
        message,
    };
    let cell = |column: Option<usize>| cell_text(row, column);

    let required_text = row[columns.required].trim();
    let required = parse_required(required_text).unwrap_or_else(|| {
        warn!(field = name, value = required_text, "unrecognized Required flag, treating field as optional");
        false
    });

    let syntax_text = normalize_whitespace(cell(columns.syntax));
    let syntax = parse_syntax(&syntax_text).map_err(|e| invalid(e.to_string()))?;

    let mut rule = ColumnRule::new(name, syntax.value_type);
    rule.required = required;
    rule.list = syntax.list;
    rule.allowed = syntax.allowed;

    let type_text = cell(columns.value_type);
    if !type_text.is_empty() {
        rule.value_type = ValueType::from_name(type_text)
            .ok_or_else(|| invalid(format!("unknown type \"{type_text}\"")))?;
    }

    let allowed_text = cell(columns.allowed);
    if !allowed_text.is_empty() {
        rule.allowed = Some(parse_allowed_values(allowed_text).map_err(|e| invalid(e.to_string()))?);
    }

    if rule.value_type == ValueType::Categorical && rule.allowed.is_none() {
        return Err(invalid("categorical field has no allowed values".to_string()));
    }

    let pattern_text = cell(columns.pattern);
    if !pattern_text.is_empty() {
        let pattern = FieldPattern::new(pattern_text)
            .map_err(|e| invalid(format!("invalid pattern \"{pattern_text}\": {e}")))?;
        rule.pattern = Some(pattern);
    }

    let bound = |text: &str, label: &str| -> Result<Option<f64>, SpecFormatError> {
        if text.is_empty() {
            return Ok(None);
        }
        parse_float(text)
            .map(Some)
            .map_err(|_| invalid(format!("{label} \"{text}\" is not a number")))
    };
    rule.min = bound(cell(columns.min), "min")?;
    rule.max = bound(cell(columns.max), "max")?;

    if (rule.min.is_some() || rule.max.is_some()) && !rule.value_type.is_numeric() {
        return Err(invalid(format!(
            "min/max bounds require a numeric type, not {}",
            rule.value_type
        )));
    }
    if let (Some(min), Some(max)) = (rule.min, rule.max) {
        if min > max {
            return Err(invalid(format!("min {min} is greater than max {max}")));
        }
    }

    let default_text = cell(columns.default);
    if !default_text.is_empty() {
        rule.default = Some(default_text.to_string());
    }

    rule.syntax = if !syntax_text.is_empty() {
        syntax_text
    } else if let Some(allowed) = &rule.allowed {
        allowed.to_string()
    } else {
        rule.value_type.to_string()
    };

    Ok(rule)
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== RULE TYPES =====
// Built once by SpecModel from the spec table and read-only afterwards.

/// Declared kind of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Categorical,
    /// ISO 8601 date or timestamp, year precision upwards
    Date,
    Doi,
    Url,
    /// Well-known-text geometry
    Wkt,
    UnfcccCategory,
}

impl ValueType {
    /// Parse a type name as written in the `Type` column of a spec.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" | "str" => ValueType::String,
            "integer" | "int" => ValueType::Integer,
            "float" | "number" | "numeric" | "decimal" | "double" => ValueType::Float,
            "categorical" | "category" | "enum" => ValueType::Categorical,
            "date" | "timestamp" | "datetime" => ValueType::Date,
            "doi" => ValueType::Doi,
            "url" => ValueType::Url,
            "wkt" => ValueType::Wkt,
            "unfccc_cat" | "unfccc_category" => ValueType::UnfcccCategory,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// Name used in messages, matching the ERMIN `{...}` syntax names.
    pub fn syntax_name(self) -> &'static str {
        match self {
            ValueType::String => "text",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Categorical => "categorical",
            ValueType::Date => "timestamp",
            ValueType::Doi => "doi",
            ValueType::Url => "url",
            ValueType::Wkt => "wkt",
            ValueType::UnfcccCategory => "unfccc_cat",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.syntax_name())
    }
}

/// One accepted alternative in an allowed-values set.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceOption {
    /// Exact text, e.g. `measured`
    Literal(String),
    /// Any value of a type, e.g. `{float}` in `[{float}|NULL]`
    Typed(ValueType),
    /// Literal prefix followed by a value, e.g. `CI{float}`
    Prefixed { prefix: String, value_type: ValueType },
    /// Value followed by a literal suffix, e.g. `{float}_version`
    Suffixed { suffix: String, value_type: ValueType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllowedValues {
    pub options: Vec<ChoiceOption>,
}

impl AllowedValues {
    pub fn literals<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: values
                .into_iter()
                .map(|v| ChoiceOption::Literal(v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl fmt::Display for AllowedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .options
            .iter()
            .map(|option| match option {
                ChoiceOption::Literal(text) => text.clone(),
                ChoiceOption::Typed(ty) => ty.to_string(),
                ChoiceOption::Prefixed { prefix, value_type } => format!("{prefix}{value_type}"),
                ChoiceOption::Suffixed { suffix, value_type } => format!("{value_type}{suffix}"),
            })
            .collect();
        write!(f, "[{}]", rendered.join("|"))
    }
}

/// Anchored regular expression a value must match in full.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub source: String,
    pub regex: Regex,
}

impl FieldPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRule {
    pub name: String,
    pub required: bool,
    pub value_type: ValueType,
    /// Value is a comma-delimited list of `value_type`
    pub list: bool,
    pub allowed: Option<AllowedValues>,
    pub pattern: Option<FieldPattern>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Per-field fill value from the spec's `Default` column
    pub default: Option<String>,
    /// Human-readable syntax, echoed in findings
    pub syntax: String,
}

impl ColumnRule {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            required: false,
            value_type,
            list: false,
            allowed: None,
            pattern: None,
            min: None,
            max: None,
            default: None,
            syntax: value_type.to_string(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_allowed(mut self, allowed: AllowedValues) -> Self {
        self.syntax = allowed.to_string();
        self.allowed = Some(allowed);
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_pattern(mut self, pattern: FieldPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

// ===== FINDINGS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    Missing,
    TypeMismatch,
    OutOfRange,
    InvalidFormat,
    /// Input column not described by the spec
    UnexpectedColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
        }
    }
}

/// A single detected issue in one cell, or in one column when `row` is None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub column: String,
    /// Position of the column in the input header, if present there
    pub column_index: Option<usize>,
    /// Zero-based data row index; None for structural findings
    pub row: Option<usize>,
    pub kind: FindingKind,
    pub severity: Severity,
    pub value: Option<String>,
    pub description: String,
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            column: String::new(),
            column_index: None,
            row: None,
            kind,
            severity,
            value: None,
            description: description.into(),
            suggestion: None,
        }
    }

    pub fn at_cell(mut self, row: usize, column: &str, column_index: usize) -> Self {
        self.row = Some(row);
        self.column = column.to_string();
        self.column_index = Some(column_index);
        self
    }

    pub fn for_column(mut self, column: &str, column_index: Option<usize>) -> Self {
        self.column = column.to_string();
        self.column_index = column_index;
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_structural(&self) -> bool {
        self.row.is_none()
    }
}

/// One change applied to the table by autofix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub column: String,
    /// None when a whole column was added
    pub row: Option<usize>,
    pub from: Option<String>,
    pub to: String,
}

// Typed conversion of raw cell strings.
//
// Every declared ValueType has one pure conversion function. Callers get a
// Result back and decide how to report a failure; nothing here panics or logs.

use super::unfccc::is_valid_unfccc_category;
use crate::types::ValueType;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(IsoTimestamp),
}

impl TypedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Integer(i) => Some(*i as f64),
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimestampPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// ISO 8601 timestamp of any precision from a bare year upwards. Missing
/// components are filled with their first valid value.
#[derive(Debug, Clone, PartialEq)]
pub struct IsoTimestamp {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
    pub precision: TimestampPrecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Could not convert this value to a float: \"{0}\"")]
    Float(String),
    #[error("Could not convert this value to an integer: \"{0}\"")]
    Integer(String),
    #[error("Invalid ISO format timestamp: \"{0}\". Format is \"YYYY-[MM-[DD[*HH[:MM[:SS[.fff[fff]]]][+HH:MM[:SS[.ffffff]]]]]]\".")]
    Timestamp(String),
    #[error("Invalid DOI format: \"{0}\".")]
    Doi(String),
    #[error("Invalid URL format: \"{0}\".")]
    Url(String),
    #[error("Invalid WKT geometry: \"{0}\".")]
    Wkt(String),
    #[error("Invalid UNFCCC category: \"{0}\".")]
    UnfcccCategory(String),
}

/// Convert `value` to the declared type.
pub fn convert(value_type: ValueType, value: &str) -> Result<TypedValue, ConversionError> {
    match value_type {
        ValueType::String | ValueType::Categorical => Ok(TypedValue::Text(value.to_string())),
        ValueType::Integer => parse_integer(value).map(TypedValue::Integer),
        ValueType::Float => parse_float(value).map(TypedValue::Float),
        ValueType::Date => parse_timestamp(value).map(TypedValue::Timestamp),
        ValueType::Doi => {
            if is_valid_doi(value) {
                Ok(TypedValue::Text(value.to_string()))
            } else {
                Err(ConversionError::Doi(value.to_string()))
            }
        }
        ValueType::Url => {
            if is_valid_http_url(value) {
                Ok(TypedValue::Text(value.to_string()))
            } else {
                Err(ConversionError::Url(value.to_string()))
            }
        }
        ValueType::Wkt => {
            if is_valid_wkt(value) {
                Ok(TypedValue::Text(value.to_string()))
            } else {
                Err(ConversionError::Wkt(value.to_string()))
            }
        }
        ValueType::UnfcccCategory => {
            if is_valid_unfccc_category(value) {
                Ok(TypedValue::Text(value.to_string()))
            } else {
                Err(ConversionError::UnfcccCategory(value.to_string()))
            }
        }
    }
}

pub fn parse_integer(value: &str) -> Result<i64, ConversionError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ConversionError::Integer(value.to_string()))
}

/// Finite floats only; `inf` and `NaN` are rejected.
pub fn parse_float(value: &str) -> Result<f64, ConversionError> {
    match value.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(ConversionError::Float(value.to_string())),
    }
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<y>\d{4})(?:-(?P<mo>\d{2})(?:-(?P<d>\d{2})(?:[T ](?P<h>\d{2})(?::(?P<mi>\d{2})(?::(?P<s>\d{2})(?:\.(?P<f>\d{6}|\d{3}))?)?)?(?P<tz>Z|[+-]\d{2}:\d{2}(?::\d{2}(?:\.\d{6})?)?)?)?)?)?$",
        )
        .expect("timestamp regex is valid")
    })
}

pub fn parse_timestamp(value: &str) -> Result<IsoTimestamp, ConversionError> {
    let err = || ConversionError::Timestamp(value.to_string());
    let caps = timestamp_regex().captures(value).ok_or_else(err)?;

    let num = |name: &str| -> Option<u32> { caps.name(name).and_then(|m| m.as_str().parse().ok()) };

    let year: i32 = caps["y"].parse().map_err(|_| err())?;
    let month = num("mo");
    let day = num("d");
    let hour = num("h");
    let minute = num("mi");
    let second = num("s");
    let micros = caps.name("f").map(|m| {
        let digits = m.as_str();
        let n: u32 = digits.parse().unwrap_or(0);
        if digits.len() == 3 {
            n * 1000
        } else {
            n
        }
    });

    let precision = match (month, day, hour, minute, second) {
        (None, ..) => TimestampPrecision::Year,
        (Some(_), None, ..) => TimestampPrecision::Month,
        (Some(_), Some(_), None, ..) => TimestampPrecision::Day,
        (Some(_), Some(_), Some(_), None, _) => TimestampPrecision::Hour,
        (Some(_), Some(_), Some(_), Some(_), None) => TimestampPrecision::Minute,
        _ => TimestampPrecision::Second,
    };

    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1)).ok_or_else(err)?;
    let time = NaiveTime::from_hms_micro_opt(
        hour.unwrap_or(0),
        minute.unwrap_or(0),
        second.unwrap_or(0),
        micros.unwrap_or(0),
    )
    .ok_or_else(err)?;

    let offset = match caps.name("tz").map(|m| m.as_str()) {
        None => None,
        Some("Z") => FixedOffset::east_opt(0),
        Some(tz) => Some(parse_offset(tz).ok_or_else(err)?),
    };

    Ok(IsoTimestamp {
        datetime: NaiveDateTime::new(date, time),
        offset,
        precision,
    })
}

/// `+HH:MM[:SS[.ffffff]]`; fractional seconds are accepted but dropped.
fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let mut parts = tz[1..].split(':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = parts.next()?.parse().ok()?;
    let seconds: i32 = match parts.next() {
        Some(s) => s.split('.').next()?.parse().ok()?,
        None => 0,
    };
    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
}

/// `doi:10.<registrant>[.<sub>]/<suffix>`, case-insensitive. Registrant codes
/// must be alphanumeric.
pub fn is_valid_doi(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^doi:10\.[a-z0-9]+(\.[a-z0-9]+)?/[a-z0-9.\-_]+$").expect("doi regex is valid")
    });
    re.is_match(&value.trim().to_lowercase())
}

pub fn is_valid_http_url(value: &str) -> bool {
    let lower = value.to_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return false;
    }
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => {
            let mut labels = domain.split('.');
            let tld = labels.next_back().unwrap_or("");
            let has_parent = labels.all(|label| !label.is_empty()) && domain.contains('.');
            let tld_ok = tld.len() >= 2
                && (tld.chars().all(|c| c.is_ascii_alphabetic())
                    || (tld.starts_with("xn--") && tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')));
            has_parent && tld_ok
        }
        None => false,
    }
}

const WKT_GEOMETRIES: &[&str] = &[
    "GEOMETRYCOLLECTION",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "MULTIPOINT",
    "LINESTRING",
    "POLYGON",
    "POINT",
];

/// Structural WKT check: known geometry keyword, optional dimension marker,
/// then `EMPTY` or a balanced body of numeric coordinates.
pub fn is_valid_wkt(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    let Some(keyword) = WKT_GEOMETRIES.iter().find(|k| upper.starts_with(**k)) else {
        return false;
    };
    let mut rest = upper[keyword.len()..].trim_start();
    for dim in ["ZM", "Z", "M"] {
        if let Some(stripped) = rest.strip_prefix(dim) {
            if stripped.starts_with([' ', '(']) || stripped.is_empty() {
                rest = stripped.trim_start();
                break;
            }
        }
    }
    if rest == "EMPTY" {
        return true;
    }
    let Some(body) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) else {
        return false;
    };
    if !is_balanced(body) {
        return false;
    }

    if *keyword == "GEOMETRYCOLLECTION" {
        return split_top_level(body).iter().all(|member| is_valid_wkt(member));
    }

    body.split(|c: char| c == '(' || c == ')' || c == ',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .all(|chunk| {
            let coords: Vec<&str> = chunk.split_whitespace().collect();
            (2..=4).contains(&coords.len()) && coords.iter().all(|c| parse_float(c).is_ok())
        })
}

fn is_balanced(body: &str) -> bool {
    let mut depth = 0i32;
    for c in body.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts
}

// ERMIN Core Library
//
// Validates emissions-report tables against a field specification and
// repairs what can be repaired (missing values, optionally case/whitespace).
// Main interface is ValidationProcessor for files, TableChecker for tables.

pub mod types;
pub mod error;
pub mod config;
pub mod table;
pub mod spec;
pub mod rules;
pub mod checker;
pub mod report;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{ConfigError, ErminError, ErminResult, InputLoadError, OutputError, SpecFormatError};
pub use config::{OptionalMissing, RepairConfig, StrictnessConfig, ValidationConfig};
pub use table::Table;
pub use spec::SpecModel;
pub use rules::{convert, RuleEngine, TypedValue};
pub use checker::{CheckOutcome, TableChecker};
pub use report::{JsonReport, ReportFormatter, DEFAULT_SUMMARY_LIMIT};
pub use processor::{StepProfiler, ValidationProcessor, ValidationRun};

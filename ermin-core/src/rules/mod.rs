pub mod conversion;
pub mod engine;
pub mod syntax;
pub mod unfccc;

pub use conversion::{convert, ConversionError, IsoTimestamp, TimestampPrecision, TypedValue};
pub use engine::{AllowedMatch, RuleEngine};
pub use syntax::{parse_allowed_values, parse_syntax, SyntaxError, ValueSyntax};

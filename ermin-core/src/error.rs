use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the field specification. Checking never starts when
/// one of these is raised.
#[derive(Debug, Error)]
pub enum SpecFormatError {
    #[error("failed to read spec file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed spec table: {0}")]
    Table(#[source] InputLoadError),

    #[error("spec is missing required column \"{0}\"")]
    MissingColumn(&'static str),

    #[error("spec row {row}, field \"{field}\": {message}")]
    InvalidField {
        row: usize,
        field: String,
        message: String,
    },

    #[error("spec defines field \"{0}\" more than once")]
    DuplicateField(String),

    #[error("spec defines no fields")]
    Empty,
}

impl From<InputLoadError> for SpecFormatError {
    fn from(err: InputLoadError) -> Self {
        match err {
            InputLoadError::Io { path, source } => SpecFormatError::Io { path, source },
            other => SpecFormatError::Table(other),
        }
    }
}

/// Fatal problems with the input data table.
#[derive(Debug, Error)]
pub enum InputLoadError {
    #[error("failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("input header contains column \"{0}\" more than once")]
    DuplicateColumn(String),

    #[error("input line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level error for a validation run.
#[derive(Debug, Error)]
pub enum ErminError {
    #[error(transparent)]
    Spec(#[from] SpecFormatError),

    #[error(transparent)]
    Input(#[from] InputLoadError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ErminResult<T> = std::result::Result<T, ErminError>;

// All validation logic is in ermin-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod console;
pub mod overrides;

// Re-export core types for convenience
pub use ermin_core::*;

pub use overrides::{resolve_autofix, ConfigOverrides};

use ermin_core::ValidationConfig;

/// Config values set from command-line flags. Flags only ever tighten or
/// enable options; leaving a flag off keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sentinel: Option<String>,
    pub case_insensitive: bool,
    pub strict_extra_columns: bool,
    pub normalize: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ValidationConfig) {
        if let Some(sentinel) = &self.sentinel {
            config.repair.sentinel = sentinel.clone();
        }
        if self.case_insensitive {
            config.strictness.case_insensitive_values = true;
        }
        if self.strict_extra_columns {
            config.strictness.report_extra_columns = true;
        }
        if self.normalize {
            config.repair.normalize_values = true;
        }
    }
}

/// Autofix runs when asked for, or implicitly when an output file is
/// requested, unless explicitly disabled.
pub fn resolve_autofix(autofix: bool, no_autofix: bool, has_output: bool) -> bool {
    !no_autofix && (autofix || has_output)
}

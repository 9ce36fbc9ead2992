use crate::checker::{CheckOutcome, TableChecker};
use crate::config::ValidationConfig;
use crate::error::{ErminResult, SpecFormatError};
use crate::report::fingerprint;
use crate::spec::SpecModel;
use crate::table::Table;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        info!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    /// Per-step table with each step's share of the total, empty when
    /// profiling is off.
    pub fn summary(&self) -> String {
        if !self.enabled || self.timings.is_empty() {
            return String::new();
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let mut out = String::from("Performance Summary:\n");
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            out.push_str(&format!(
                "   {:.<35} {:.0}ms ({:.1}%)\n",
                step,
                duration.as_millis(),
                percentage
            ));
        }
        out.push_str(&format!("   {:.<35} {:.0}ms\n", "Total", total.as_millis()));
        out
    }
}

/// Everything a caller needs to report on one run.
#[derive(Debug)]
pub struct ValidationRun {
    pub spec: SpecModel,
    /// SHA-256 of the spec file as read
    pub spec_fingerprint: String,
    pub outcome: CheckOutcome,
    pub timings: Vec<(String, Duration)>,
    pub profile_summary: String,
}

/// File-to-file pipeline: spec file + input CSV -> findings + repaired CSV.
pub struct ValidationProcessor {
    config: ValidationConfig,
    profile: bool,
}

impl ValidationProcessor {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            profile: false,
        }
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Run the whole pipeline.
    ///
    /// The repaired table is written whenever `output_path` is given, even
    /// when errors were found; only load and write failures are fatal.
    pub fn run(
        &self,
        spec_path: &Path,
        input_path: &Path,
        output_path: Option<&Path>,
        autofix: bool,
    ) -> ErminResult<ValidationRun> {
        let mut profiler = StepProfiler::new(self.profile);

        let (spec, spec_fingerprint) =
            profiler.time_step("Load spec", || Self::load_spec(spec_path))?;
        let table = profiler.time_step("Load input", || Table::from_csv_path(input_path))?;

        let checker = TableChecker::new(&spec, &self.config);
        let outcome = profiler.time_step("Check table", || checker.check(table, autofix));
        debug!(
            warnings = outcome.warnings.len(),
            errors = outcome.errors.len(),
            repairs = outcome.repairs.len(),
            "check finished"
        );

        if let Some(output_path) = output_path {
            profiler.time_step("Write output", || outcome.table.to_csv_path(output_path))?;
            info!(path = %output_path.display(), "wrote repaired table");
        }

        Ok(ValidationRun {
            spec_fingerprint,
            outcome,
            timings: profiler.timings().to_vec(),
            profile_summary: profiler.summary(),
            spec,
        })
    }

    /// Load a spec file, returning the model and the file's fingerprint.
    pub fn load_spec(path: &Path) -> Result<(SpecModel, String), SpecFormatError> {
        let bytes = fs::read(path).map_err(|source| SpecFormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Table::from_reader(bytes.as_slice())?;
        let spec = SpecModel::load(&table)?;
        debug!(path = %path.display(), fields = spec.len(), "loaded spec file");
        Ok((spec, fingerprint(&bytes)))
    }
}

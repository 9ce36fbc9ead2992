//! End-to-end validation tests against the CSV fixtures.
//!
//! Fixtures live in `test_fixtures/`:
//!
//! - `specs/emissions_spec.csv`: typed spec (type, allowed values, pattern, bounds)
//! - `specs/ermin_spec.csv`: ERMIN spec export using `Value syntax`
//! - `inputs/*.csv`: data tables checked against those specs
//! - `configs/lenient.yaml`: case-insensitive, extra columns reported, `NA` sentinel

use ermin_core::*;
use std::path::PathBuf;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn load_spec(name: &str) -> SpecModel {
    let path = fixtures_dir().join("specs").join(name);
    SpecModel::from_csv_path(&path).unwrap_or_else(|e| panic!("Bad spec fixture {}: {e}", path.display()))
}

fn load_input(name: &str) -> Table {
    let path = fixtures_dir().join("inputs").join(name);
    Table::from_csv_path(&path).unwrap_or_else(|e| panic!("Bad input fixture {}: {e}", path.display()))
}

fn lenient_config() -> ValidationConfig {
    ValidationConfig::load_from_file(fixtures_dir().join("configs/lenient.yaml")).expect("Invalid lenient.yaml")
}

/// (row, column, kind) of each finding, for compact assertions
fn locate(findings: &[Finding]) -> Vec<(Option<usize>, &str, FindingKind)> {
    findings
        .iter()
        .map(|f| (f.row, f.column.as_str(), f.kind))
        .collect()
}

/// Write a table out and read it back the way a second run would
fn reload(table: &Table) -> Table {
    let file = tempfile::NamedTempFile::new().unwrap();
    table.to_csv_path(file.path()).unwrap();
    Table::from_csv_path(file.path()).unwrap()
}

// ============================================================================
// Spec loading
// ============================================================================

mod spec_loading {
    use super::*;

    #[test]
    fn typed_spec_fields() {
        let spec = load_spec("emissions_spec.csv");
        assert_eq!(spec.len(), 7);
        assert_eq!(spec.required_rules().count(), 4);

        let year = spec.get("reporting_year").unwrap();
        assert_eq!(year.value_type, ValueType::Integer);
        assert_eq!((year.min, year.max), (Some(1990.0), Some(2100.0)));
        assert_eq!(spec.get("units").unwrap().default.as_deref(), Some("tonnes"));
    }

    #[test]
    fn ermin_spec_fields() {
        let spec = load_spec("ermin_spec.csv");
        assert_eq!(spec.len(), 13, "section divider rows must be skipped");
        assert_eq!(spec.required_rules().count(), 6);
        assert!(spec.get("monthly_quantities").unwrap().list);
        assert_eq!(spec.get("sector").unwrap().value_type, ValueType::UnfcccCategory);
        assert_eq!(spec.get("gwp").unwrap().syntax, "[20-year|100-year]");
    }
}

// ============================================================================
// Typed emissions spec
// ============================================================================

mod emissions_checks {
    use super::*;

    #[test]
    fn valid_input_has_no_findings() {
        let spec = load_spec("emissions_spec.csv");
        let config = ValidationConfig::default();
        let outcome = TableChecker::new(&spec, &config).check(load_input("emissions_valid.csv"), false);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    }

    #[test]
    fn invalid_input_default_strictness() {
        let spec = load_spec("emissions_spec.csv");
        let config = ValidationConfig::default();
        let outcome = TableChecker::new(&spec, &config).check(load_input("emissions_invalid.csv"), false);

        assert!(outcome.warnings.is_empty(), "extra columns are tolerated by default");
        assert_eq!(
            locate(&outcome.errors),
            vec![
                (Some(1), "co2_tonnes", FindingKind::Missing),
                (Some(2), "co2_tonnes", FindingKind::OutOfRange),
                (Some(3), "co2_tonnes", FindingKind::TypeMismatch),
                (Some(4), "method", FindingKind::InvalidFormat),
                (Some(5), "facility_id", FindingKind::InvalidFormat),
                (Some(6), "reporting_year", FindingKind::OutOfRange),
                (Some(7), "report_date", FindingKind::TypeMismatch),
                (Some(8), "method", FindingKind::InvalidFormat),
                (Some(8), "source_url", FindingKind::TypeMismatch),
            ]
        );
    }

    #[test]
    fn invalid_input_lenient_config() {
        let spec = load_spec("emissions_spec.csv");
        let config = lenient_config();
        let outcome = TableChecker::new(&spec, &config).check(load_input("emissions_invalid.csv"), false);

        assert_eq!(
            locate(&outcome.warnings),
            vec![
                (None, "notes", FindingKind::UnexpectedColumn),
                (Some(4), "method", FindingKind::InvalidFormat),
            ]
        );
        assert_eq!(outcome.warnings[1].suggestion.as_deref(), Some("measured"));
        assert_eq!(outcome.errors.len(), 8);
    }

    #[test]
    fn report_lines_use_one_based_rows() {
        let spec = load_spec("emissions_spec.csv");
        let config = ValidationConfig::default();
        let outcome = TableChecker::new(&spec, &config).check(load_input("emissions_invalid.csv"), false);

        let text = ReportFormatter::format(&outcome.warnings, &outcome.errors);
        assert_eq!(text.lines().count(), 9);
        assert_eq!(
            text.lines().next().unwrap(),
            "Error: row 2, column co2_tonnes: Required field is empty."
        );
    }

    #[test]
    fn missing_required_columns_are_added() {
        let spec = load_spec("emissions_spec.csv");
        let config = ValidationConfig::default();
        let checker = TableChecker::new(&spec, &config);
        let outcome = checker.check(load_input("emissions_missing_columns.csv"), true);

        assert_eq!(
            locate(&outcome.errors),
            vec![
                (None, "co2_tonnes", FindingKind::Missing),
                (None, "method", FindingKind::Missing),
            ]
        );
        assert_eq!(
            outcome.table.headers,
            vec!["facility_id", "reporting_year", "units", "co2_tonnes", "method"]
        );
        assert_eq!(outcome.table.column_values("method").unwrap(), vec!["NULL", "NULL"]);
        // optional blank cells are left alone
        assert_eq!(outcome.table.cell(0, 2), Some(""));

        // the sentinel is not a float or an allowed method, so the filled
        // cells re-check as ordinary value errors rather than Missing
        let recheck = checker.check(reload(&outcome.table), false);
        assert_eq!(
            locate(&recheck.errors),
            vec![
                (Some(1), "co2_tonnes", FindingKind::TypeMismatch),
                (Some(1), "method", FindingKind::InvalidFormat),
                (Some(2), "co2_tonnes", FindingKind::TypeMismatch),
                (Some(2), "method", FindingKind::InvalidFormat),
            ]
        );
    }

    #[test]
    fn accept_sentinel_lets_repaired_table_recheck_clean() {
        let spec = load_spec("emissions_spec.csv");
        let mut config = ValidationConfig::default();
        config.strictness.accept_sentinel = true;
        let checker = TableChecker::new(&spec, &config);
        let outcome = checker.check(load_input("emissions_missing_columns.csv"), true);

        let recheck = checker.check(reload(&outcome.table), false);
        assert_eq!(recheck.finding_count(), 0, "{:?}", recheck.errors);
    }

    #[test]
    fn repaired_table_round_trip() {
        let spec = load_spec("emissions_spec.csv");
        let config = ValidationConfig::default();
        let checker = TableChecker::new(&spec, &config);
        let outcome = checker.check(load_input("emissions_invalid.csv"), true);

        assert_eq!(outcome.repairs.len(), 1);
        assert_eq!(outcome.table.cell(1, 1), Some("NULL"));
        // rows and column order are preserved
        assert_eq!(outcome.table.row_count(), 9);
        assert_eq!(outcome.table.headers.last().map(String::as_str), Some("notes"));

        let recheck = checker.check(reload(&outcome.table), false);
        assert!(recheck.errors.iter().all(|f| f.kind != FindingKind::Missing));
        assert_eq!(recheck.errors.len(), outcome.errors.len());
        assert_eq!(
            (recheck.errors[0].row, recheck.errors[0].kind),
            (Some(1), FindingKind::TypeMismatch)
        );
    }

    #[test]
    fn lenient_repair_is_idempotent() {
        let spec = load_spec("emissions_spec.csv");
        let config = lenient_config();
        let checker = TableChecker::new(&spec, &config);

        let once = checker.check(load_input("emissions_invalid.csv"), true);
        assert_eq!(once.table.cell(1, 1), Some("NA"));
        assert_eq!(once.table.cell(4, 2), Some("measured"));

        let twice = checker.check(once.table.clone(), true);
        assert_eq!(twice.table, once.table);
        assert!(twice.repairs.is_empty());
    }
}

// ============================================================================
// ERMIN value-syntax spec
// ============================================================================

mod ermin_checks {
    use super::*;

    #[test]
    fn sample_findings() {
        let spec = load_spec("ermin_spec.csv");
        let config = ValidationConfig::default();
        let outcome = TableChecker::new(&spec, &config).check(load_input("ermin_sample.csv"), false);

        assert!(outcome.warnings.is_empty());
        assert_eq!(
            locate(&outcome.errors),
            vec![
                (Some(2), "source_name", FindingKind::Missing),
                (Some(2), "start_time", FindingKind::TypeMismatch),
                (Some(2), "emission_quantity", FindingKind::InvalidFormat),
                (Some(2), "emission_quantity_units", FindingKind::InvalidFormat),
                (Some(2), "gwp", FindingKind::InvalidFormat),
                (Some(2), "uncertainty_type", FindingKind::InvalidFormat),
                (Some(2), "monthly_quantities", FindingKind::TypeMismatch),
                (Some(2), "geometry", FindingKind::TypeMismatch),
                (Some(2), "reference", FindingKind::TypeMismatch),
                (Some(2), "data_url", FindingKind::TypeMismatch),
            ]
        );

        let gwp = &outcome.errors[4];
        assert_eq!(
            gwp.description,
            "Invalid value: \"50-year\". Accepted syntax: [20-year|100-year]."
        );
    }

    #[test]
    fn normalize_collapses_whitespace_in_spec_columns() {
        let spec = load_spec("ermin_spec.csv");
        let mut config = ValidationConfig::default();
        config.repair.normalize_values = true;
        let outcome = TableChecker::new(&spec, &config).check(load_input("ermin_sample.csv"), true);

        assert_eq!(outcome.table.cell(0, 2), Some("3.D Agricultural Soils"));
        // only whitespace runs are collapsed; list spacing stays as written
        assert_eq!(outcome.table.cell(0, 9), Some("1.5, 2,3.25"));
        assert_eq!(outcome.table.cell(2, 1), Some("NULL"));
    }
}

// ============================================================================
// File pipeline
// ============================================================================

mod pipeline {
    use super::*;

    #[test]
    fn processor_writes_output_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = fixtures_dir().join("specs/emissions_spec.csv");
        let input_path = fixtures_dir().join("inputs/emissions_invalid.csv");
        let output_path = dir.path().join("repaired.csv");
        let report_path = dir.path().join("report.json");

        let run = ValidationProcessor::new(ValidationConfig::default())
            .run(&spec_path, &input_path, Some(&output_path), true)
            .unwrap();
        assert!(run.outcome.has_errors());

        JsonReport::new(
            &run.outcome,
            &spec_path,
            run.spec_fingerprint.clone(),
            &input_path,
            Some(&output_path),
        )
        .write_to(&report_path)
        .unwrap();

        let written = Table::from_csv_path(&output_path).unwrap();
        assert_eq!(written, run.outcome.table);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["counts"]["errors"], 9);
        assert_eq!(report["counts"]["repairs"], 1);
        assert_eq!(report["spec_fingerprint"].as_str().unwrap().len(), 64);
        assert_eq!(report["repairs"][0]["to"], "NULL");
    }

    #[test]
    fn ragged_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("ragged.csv");
        std::fs::write(&input_path, "facility_id,co2_tonnes\nFAC-0001,1,extra\n").unwrap();

        let result = ValidationProcessor::new(ValidationConfig::default()).run(
            &fixtures_dir().join("specs/emissions_spec.csv"),
            &input_path,
            None,
            false,
        );
        assert!(matches!(
            result,
            Err(ErminError::Input(InputLoadError::RaggedRow { line: 2, expected: 2, found: 3 }))
        ));
    }
}

use crate::config::ValidationConfig;
use crate::rules::RuleEngine;
use crate::spec::SpecModel;
use crate::table::Table;
use crate::types::*;
use tracing::debug;

/// Result of checking one table.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub warnings: Vec<Finding>,
    pub errors: Vec<Finding>,
    /// The input table, repaired in place when autofix was requested
    pub table: Table,
    pub repairs: Vec<Repair>,
}

impl CheckOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finding_count(&self) -> usize {
        self.warnings.len() + self.errors.len()
    }
}

// TableChecker - drives the RuleEngine over a whole table.
//
// Column presence is checked first, then every row against every spec field
// in spec order. All findings are collected; nothing short-circuits.
pub struct TableChecker<'a> {
    spec: &'a SpecModel,
    engine: RuleEngine<'a>,
}

impl<'a> TableChecker<'a> {
    pub fn new(spec: &'a SpecModel, config: &'a ValidationConfig) -> Self {
        Self {
            spec,
            engine: RuleEngine::new(config),
        }
    }

    fn config(&self) -> &ValidationConfig {
        self.engine.config()
    }

    /// Findings for `table` in report order, without changing anything.
    pub fn inspect(&self, table: &Table) -> Vec<Finding> {
        let mut findings = self.check_columns(table);

        let located: Vec<(&ColumnRule, usize)> = self
            .spec
            .rules()
            .iter()
            .filter_map(|rule| table.column_index(&rule.name).map(|index| (rule, index)))
            .collect();

        for (row_index, row) in table.rows.iter().enumerate() {
            for (rule, column_index) in &located {
                if let Some(finding) = self.engine.evaluate(rule, &row[*column_index]) {
                    findings.push(finding.at_cell(row_index, &rule.name, *column_index));
                }
            }
        }

        debug!(
            rows = table.row_count(),
            fields = located.len(),
            findings = findings.len(),
            "checked table"
        );
        findings
    }

    fn check_columns(&self, table: &Table) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .spec
            .required_rules()
            .filter(|rule| table.column_index(&rule.name).is_none())
            .map(|rule| {
                Finding::new(FindingKind::Missing, Severity::Error, "Missing this required column.")
                    .for_column(&rule.name, None)
                    .with_suggestion(self.engine.fill_value(rule))
            })
            .collect();

        if self.config().strictness.report_extra_columns {
            for (index, header) in table.headers.iter().enumerate() {
                if !self.spec.contains(header) {
                    findings.push(
                        Finding::new(
                            FindingKind::UnexpectedColumn,
                            Severity::Warning,
                            "Column is not defined in the field specification.",
                        )
                        .for_column(header, Some(index)),
                    );
                }
            }
        }

        findings
    }

    /// Check `table` and, with `autofix`, repair it.
    ///
    /// Findings always describe the table as it was passed in.
    pub fn check(&self, mut table: Table, autofix: bool) -> CheckOutcome {
        let findings = self.inspect(&table);
        let repairs = if autofix {
            self.repair(&mut table, &findings)
        } else {
            Vec::new()
        };

        let (errors, warnings): (Vec<Finding>, Vec<Finding>) = findings
            .into_iter()
            .partition(|finding| finding.severity == Severity::Error);

        CheckOutcome {
            warnings,
            errors,
            table,
            repairs,
        }
    }

    /// Apply the repair policy for `findings` to `table`.
    pub fn repair(&self, table: &mut Table, findings: &[Finding]) -> Vec<Repair> {
        let repair_config = &self.config().repair;
        let mut repairs = Vec::new();

        for finding in findings {
            let Some(suggestion) = &finding.suggestion else {
                continue;
            };
            match (finding.kind, finding.row, finding.column_index) {
                (FindingKind::Missing, None, None) => {
                    if !repair_config.add_missing_columns {
                        continue;
                    }
                    table.add_column(&finding.column, suggestion);
                    repairs.push(Repair {
                        column: finding.column.clone(),
                        row: None,
                        from: None,
                        to: suggestion.clone(),
                    });
                }
                (kind, Some(row), Some(column)) => {
                    if kind != FindingKind::Missing && !repair_config.normalize_values {
                        continue;
                    }
                    let Some(current) = table.cell(row, column) else {
                        continue;
                    };
                    if current == suggestion.as_str() {
                        continue;
                    }
                    repairs.push(Repair {
                        column: finding.column.clone(),
                        row: Some(row),
                        from: Some(current.to_string()),
                        to: suggestion.clone(),
                    });
                    table.set_cell(row, column, suggestion.as_str());
                }
                _ => {}
            }
        }

        if repair_config.normalize_values {
            repairs.extend(self.collapse_whitespace(table));
        }

        debug!(repairs = repairs.len(), "applied repairs");
        repairs
    }

    fn collapse_whitespace(&self, table: &mut Table) -> Vec<Repair> {
        let mut repairs = Vec::new();
        for rule in self.spec.rules() {
            let Some(column) = table.column_index(&rule.name) else {
                continue;
            };
            for (row_index, row) in table.rows.iter_mut().enumerate() {
                if let Some(collapsed) = self.engine.whitespace_repair(&row[column]) {
                    repairs.push(Repair {
                        column: rule.name.clone(),
                        row: Some(row_index),
                        from: Some(std::mem::replace(&mut row[column], collapsed.clone())),
                        to: collapsed,
                    });
                }
            }
        }
        repairs
    }
}

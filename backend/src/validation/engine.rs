//! Generic tabular validation engine.
//!
//! The engine knows nothing about workers. It takes raw rows plus a
//! declarative [`RuleSet`] and produces a [`ValidationResult`]:
//!
//! ```text
//! RawRow[] ──▶ header precondition ──▶ per-row fold ──▶ accepted rows
//!                (MISSING_COLUMN)        │                 + findings
//!                                        ├─ required cells  + summary
//!                                        ├─ column checks (document order)
//!                                        └─ cross-field checks (given order)
//! ```
//!
//! Only [`Severity::Error`] findings keep a row out of the accepted set.
//! Warnings and info are advisory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::parser::RawRow;

/// Row number of the header line; data rows start at 2.
pub const HEADER_ROW: usize = 1;

// =============================================================================
// Findings
// =============================================================================

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the row from the accepted set.
    Error,
    /// Advisory, row is still accepted.
    Warning,
    /// Advisory, not counted as a warning row.
    Info,
}

/// Machine-readable finding code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingColumn,
    RequiredField,
    InvalidFormat,
    InvalidValue,
    OutOfRange,
    FutureDate,
    ImplausibleAge,
    ValueTooShort,
    ValueTooLong,
    PossibleTypo,
    SelfReference,
    MissingDeactivationReason,
    UnexpectedDeactivationReason,
    DateBeforeHire,
    MissingContactForChannel,
    NoContactMethod,
    InconsistentStatus,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingColumn => "MISSING_COLUMN",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidValue => "INVALID_VALUE",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::FutureDate => "FUTURE_DATE",
            Self::ImplausibleAge => "IMPLAUSIBLE_AGE",
            Self::ValueTooShort => "VALUE_TOO_SHORT",
            Self::ValueTooLong => "VALUE_TOO_LONG",
            Self::PossibleTypo => "POSSIBLE_TYPO",
            Self::SelfReference => "SELF_REFERENCE",
            Self::MissingDeactivationReason => "MISSING_DEACTIVATION_REASON",
            Self::UnexpectedDeactivationReason => "UNEXPECTED_DEACTIVATION_REASON",
            Self::DateBeforeHire => "DATE_BEFORE_HIRE",
            Self::MissingContactForChannel => "MISSING_CONTACT_FOR_CHANNEL",
            Self::NoContactMethod => "NO_CONTACT_METHOD",
            Self::InconsistentStatus => "INCONSISTENT_STATUS",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single classified finding about one cell or one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// 1-indexed file line (header = 1).
    pub row: usize,
    pub column: String,
    pub message: String,
    /// Original cell value.
    pub value: String,
    pub severity: Severity,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_fix: Option<String>,
}

impl ValidationError {
    pub fn new(
        severity: Severity,
        code: ErrorCode,
        row: usize,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row,
            column: column.into(),
            message: message.into(),
            value: String::new(),
            severity,
            code,
            suggested_fix: None,
        }
    }

    pub fn error(code: ErrorCode, row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, row, column, message)
    }

    pub fn warning(code: ErrorCode, row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, row, column, message)
    }

    pub fn info(code: ErrorCode, row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, row, column, message)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}, column '{}'", self.row, self.column)?;
        if !self.value.is_empty() {
            write!(f, " (value '{}')", self.value)?;
        }
        write!(f, ": [{}] {}", self.code, self.message)?;
        if let Some(ref fix) = self.suggested_fix {
            write!(f, " (did you mean '{}'?)", fix)?;
        }
        Ok(())
    }
}

// =============================================================================
// Typed values
// =============================================================================

/// A cell after acceptance and transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    List(Vec<String>),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// An accepted row: typed values keyed by internal column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRow {
    /// 1-indexed file line this row came from.
    pub row: usize,
    pub values: BTreeMap<String, CellValue>,
}

impl ValidatedRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column).filter(|v| !v.is_null())
    }

    /// Text form of a value; non-text scalars are rendered.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::List(items) => Some(items.join(", ")),
            CellValue::Null => None,
        }
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            CellValue::Bool(b) => Some(*b),
            CellValue::Text(s) => super::primitives::parse_bool(s),
            _ => None,
        }
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        match self.get(column)? {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => super::primitives::parse_date(s),
            _ => None,
        }
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            CellValue::Number(n) => Some(*n),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => super::primitives::parse_number(s),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            CellValue::Integer(i) => Some(*i),
            CellValue::Text(s) => super::primitives::parse_integer(s),
            _ => None,
        }
    }

    pub fn list(&self, column: &str) -> Vec<String> {
        match self.get(column) {
            Some(CellValue::List(items)) => items.clone(),
            Some(CellValue::Text(s)) => super::primitives::split_tags(s).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Everything a contextual check gets to look at for one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    /// Trimmed cell value, never empty.
    pub value: &'a str,
    /// The cell exactly as written in the file; what findings report.
    pub original: &'a str,
    /// The whole raw row, for cross-referencing companion cells.
    pub row: &'a RawRow,
    pub row_number: usize,
    pub column: &'a str,
}

impl CellContext<'_> {
    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> ValidationError {
        ValidationError::error(code, self.row_number, self.column, message).with_value(self.original)
    }

    pub fn warning(&self, code: ErrorCode, message: impl Into<String>) -> ValidationError {
        ValidationError::warning(code, self.row_number, self.column, message).with_value(self.original)
    }

    pub fn info(&self, code: ErrorCode, message: impl Into<String>) -> ValidationError {
        ValidationError::info(code, self.row_number, self.column, message).with_value(self.original)
    }
}

pub type SimpleCheckFn = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;
pub type ContextCheckFn = Box<dyn Fn(&CellContext<'_>) -> Vec<ValidationError> + Send + Sync>;
pub type TransformFn = Box<dyn Fn(&str) -> CellValue + Send + Sync>;
pub type CrossFieldFn = Box<dyn Fn(&ValidatedRow) -> Vec<ValidationError> + Send + Sync>;

/// How a column decides acceptance. A column carries at most one.
pub enum Check {
    /// Value-only check; a message means an error-severity finding with `code`.
    Simple { code: ErrorCode, check: SimpleCheckFn },
    /// Row-aware check returning fully classified findings.
    Contextual(ContextCheckFn),
}

impl Check {
    pub fn run(&self, ctx: &CellContext<'_>) -> Vec<ValidationError> {
        match self {
            Check::Simple { code, check } => check(ctx.value)
                .map(|message| vec![ctx.error(*code, message)])
                .unwrap_or_default(),
            Check::Contextual(check) => check(ctx),
        }
    }
}

/// Validation and transformation rule for one column.
#[derive(Default)]
pub struct ColumnRule {
    pub required: bool,
    pub check: Option<Check>,
    pub transform: Option<TransformFn>,
}

impl ColumnRule {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Value-only check. Ignored if a contextual check is already set.
    pub fn validate<F>(mut self, code: ErrorCode, check: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        if !matches!(self.check, Some(Check::Contextual(_))) {
            self.check = Some(Check::Simple {
                code,
                check: Box::new(check),
            });
        }
        self
    }

    /// Row-aware check; takes precedence over any value-only check.
    pub fn with_context<F>(mut self, check: F) -> Self
    where
        F: Fn(&CellContext<'_>) -> Vec<ValidationError> + Send + Sync + 'static,
    {
        self.check = Some(Check::Contextual(Box::new(check)));
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> CellValue + Send + Sync + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    fn apply(&self, value: &str) -> CellValue {
        match &self.transform {
            Some(transform) => transform(value),
            None => CellValue::Text(value.to_string()),
        }
    }
}

impl fmt::Debug for ColumnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = match &self.check {
            None => "none",
            Some(Check::Simple { .. }) => "simple",
            Some(Check::Contextual(_)) => "contextual",
        };
        f.debug_struct("ColumnRule")
            .field("required", &self.required)
            .field("check", &check)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// A named row-level check run after every column passed.
pub struct CrossFieldValidator {
    pub name: &'static str,
    pub check: CrossFieldFn,
}

/// Declarative description of a tabular file.
#[derive(Default)]
pub struct RuleSet {
    columns: Vec<(String, ColumnRule)>,
    required_columns: Vec<String>,
    header_display_names: Vec<(String, String)>,
    cross_field_validators: Vec<CrossFieldValidator>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column with its human label. Required rules also register the
    /// column as a required header.
    pub fn column(mut self, key: impl Into<String>, display_name: impl Into<String>, rule: ColumnRule) -> Self {
        let key = key.into();
        if rule.required {
            self = self.require_column(key.clone());
        }
        self.header_display_names.push((key.clone(), display_name.into()));
        self.columns.push((key, rule));
        self
    }

    pub fn require_column(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.required_columns.contains(&key) {
            self.required_columns.push(key);
        }
        self
    }

    pub fn cross_field<F>(mut self, name: &'static str, check: F) -> Self
    where
        F: Fn(&ValidatedRow) -> Vec<ValidationError> + Send + Sync + 'static,
    {
        self.cross_field_validators.push(CrossFieldValidator {
            name,
            check: Box::new(check),
        });
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnRule)> {
        self.columns.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    pub fn is_required_column(&self, key: &str) -> bool {
        self.required_columns.iter().any(|c| c == key)
    }

    pub fn cross_field_validators(&self) -> &[CrossFieldValidator] {
        &self.cross_field_validators
    }

    /// (key, display name) pairs in document order.
    pub fn header_display_names(&self) -> &[(String, String)] {
        &self.header_display_names
    }

    /// Human label for a column key, falling back to the key itself.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.header_display_names
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d.as_str())
            .unwrap_or(key)
    }

    /// Internal key for a file header, matched by display name or key,
    /// case-insensitively and ignoring surrounding whitespace.
    pub fn resolve_header(&self, header: &str) -> Option<&str> {
        let wanted = header.trim().to_lowercase();
        self.header_display_names
            .iter()
            .find(|(key, display)| key.to_lowercase() == wanted || display.to_lowercase() == wanted)
            .map(|(key, _)| key.as_str())
    }

    /// Re-key rows from file headers to internal keys. Unknown headers are
    /// kept verbatim so they show up (and are ignored) downstream.
    pub fn resolve_headers(&self, rows: Vec<RawRow>) -> Vec<RawRow> {
        rows.into_iter()
            .map(|row| {
                row.map_keys(|header| {
                    self.resolve_header(header)
                        .map(str::to_string)
                        .unwrap_or_else(|| header.to_string())
                })
            })
            .collect()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("columns", &self.columns)
            .field("required_columns", &self.required_columns)
            .field(
                "cross_field_validators",
                &self.cross_field_validators.iter().map(|v| v.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// =============================================================================
// Result
// =============================================================================

/// Aggregate counts over one validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub accepted_rows: Vec<ValidatedRow>,
    /// Every finding, all severities, in processing order.
    pub errors: Vec<ValidationError>,
    /// No error-severity finding exists.
    pub success: bool,
    pub summary: ValidationSummary,
    pub error_row_numbers: BTreeSet<usize>,
    pub warning_row_numbers: BTreeSet<usize>,
}

impl ValidationResult {
    fn empty() -> Self {
        Self {
            accepted_rows: Vec::new(),
            errors: Vec::new(),
            success: true,
            summary: ValidationSummary::default(),
            error_row_numbers: BTreeSet::new(),
            warning_row_numbers: BTreeSet::new(),
        }
    }

    /// True when the run stopped at the header precondition.
    pub fn has_missing_columns(&self) -> bool {
        self.errors.iter().any(|e| e.code == ErrorCode::MissingColumn)
    }

    pub fn findings_for_row(&self, row: usize) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.row == row)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.severity == Severity::Warning)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Per-row accumulator. Findings are folded in one at a time; the row's
/// classification follows from what has been absorbed so far.
#[derive(Debug, Default)]
struct RowState {
    findings: Vec<ValidationError>,
    has_error: bool,
    has_warning: bool,
}

impl RowState {
    fn absorb(mut self, finding: ValidationError) -> Self {
        match finding.severity {
            Severity::Error => self.has_error = true,
            Severity::Warning => self.has_warning = true,
            Severity::Info => {}
        }
        self.findings.push(finding);
        self
    }

    fn absorb_all(self, findings: impl IntoIterator<Item = ValidationError>) -> Self {
        findings.into_iter().fold(self, RowState::absorb)
    }
}

/// Data rows occupy lines 2.. (line 1 is the header).
pub fn row_number(index: usize) -> usize {
    index + 2
}

/// File line of a row, or its position-derived number when the row was not
/// read from a file.
fn line_of(raw: &RawRow, index: usize) -> usize {
    raw.line().unwrap_or_else(|| row_number(index))
}

/// Validate raw rows (already keyed by internal column names) against a rule set.
pub fn validate(rows: &[RawRow], rules: &RuleSet) -> ValidationResult {
    let mut result = ValidationResult::empty();

    let Some(first) = rows.first() else {
        return result;
    };

    // Header precondition: short-circuits the whole run.
    let missing: Vec<&String> = rules
        .required_columns()
        .iter()
        .filter(|c| !first.contains_key(c))
        .collect();

    if !missing.is_empty() {
        result.errors = missing
            .into_iter()
            .map(|column| {
                let label = rules.display_name(column);
                ValidationError::error(
                    ErrorCode::MissingColumn,
                    HEADER_ROW,
                    label,
                    format!("Required column '{}' is missing from the header", label),
                )
            })
            .collect();
        result.success = false;
        result.error_row_numbers = rows
            .iter()
            .enumerate()
            .map(|(index, raw)| line_of(raw, index))
            .collect();
        result.summary = ValidationSummary {
            total_rows: rows.len(),
            valid_rows: 0,
            error_rows: rows.len(),
            warning_rows: 0,
        };
        return result;
    }

    for (index, raw) in rows.iter().enumerate() {
        let number = line_of(raw, index);
        let (state, accepted) = validate_row(raw, number, rules);

        if state.has_error {
            result.error_row_numbers.insert(number);
        } else if state.has_warning {
            result.warning_row_numbers.insert(number);
        }
        if let Some(row) = accepted {
            result.accepted_rows.push(row);
        }
        result.errors.extend(state.findings);
    }

    result.success = result.error_row_numbers.is_empty();
    result.summary = ValidationSummary {
        total_rows: rows.len(),
        valid_rows: result.accepted_rows.len(),
        error_rows: result.error_row_numbers.len(),
        warning_rows: result.warning_row_numbers.len(),
    };
    result
}

fn validate_row(raw: &RawRow, number: usize, rules: &RuleSet) -> (RowState, Option<ValidatedRow>) {
    let mut state = RowState::default();
    let mut typed = ValidatedRow::new(number);

    // Required cells.
    for column in rules.required_columns() {
        if raw.non_empty(column).is_none() {
            state = state.absorb(required_finding(rules, column, number, raw));
        }
    }

    // Column rules, in document order.
    for (column, rule) in rules.columns() {
        if !raw.contains_key(column) && !rule.required {
            continue;
        }

        let Some(value) = raw.non_empty(column) else {
            if rule.required {
                // Already reported above unless the column was only marked
                // required on the rule itself.
                if !rules.is_required_column(column) {
                    state = state.absorb(required_finding(rules, column, number, raw));
                }
            } else {
                typed.values.insert(column.to_string(), CellValue::Null);
            }
            continue;
        };

        let findings = match &rule.check {
            Some(check) => check.run(&CellContext {
                value,
                original: raw.get(column).unwrap_or(value),
                row: raw,
                row_number: number,
                column,
            }),
            None => Vec::new(),
        };
        let blocked = findings.iter().any(ValidationError::is_blocking);
        state = state.absorb_all(findings);

        if !blocked {
            typed.values.insert(column.to_string(), rule.apply(value));
        }
    }

    // Cross-field rules only see rows whose cells all passed.
    if !state.has_error {
        for validator in rules.cross_field_validators() {
            state = state.absorb_all((validator.check)(&typed));
        }
    }

    let accepted = if state.has_error { None } else { Some(typed) };
    (state, accepted)
}

fn required_finding(rules: &RuleSet, column: &str, number: usize, raw: &RawRow) -> ValidationError {
    let label = rules.display_name(column);
    ValidationError::error(
        ErrorCode::RequiredField,
        number,
        column,
        format!("'{}' is required", label),
    )
    .with_value(raw.get(column).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells.iter().copied().collect()
    }

    fn rules() -> RuleSet {
        RuleSet::new()
            .column(
                "name",
                "Name",
                ColumnRule::required().with_context(|ctx| {
                    if ctx.value.len() < 2 {
                        vec![ctx.warning(ErrorCode::ValueTooShort, "very short name")]
                    } else {
                        Vec::new()
                    }
                }),
            )
            .column(
                "age",
                "Age",
                ColumnRule::optional()
                    .validate(ErrorCode::InvalidFormat, |v| {
                        v.parse::<i64>().err().map(|_| "not a number".to_string())
                    })
                    .transform(|v| CellValue::Integer(v.parse().unwrap_or_default())),
            )
            .column(
                "note",
                "Note",
                ColumnRule::optional().with_context(|ctx| {
                    vec![ctx.info(ErrorCode::InvalidValue, "notes are not imported")]
                }),
            )
            .cross_field("adult", |row| match row.integer("age") {
                Some(age) if age < 18 => vec![ValidationError::error(
                    ErrorCode::OutOfRange,
                    row.row,
                    "age",
                    "must be an adult",
                )],
                _ => Vec::new(),
            })
    }

    #[test]
    fn test_empty_input_is_success() {
        let result = validate(&[], &rules());
        assert!(result.success);
        assert_eq!(result.summary, ValidationSummary::default());
    }

    #[test]
    fn test_missing_required_column_short_circuits() {
        let rows = vec![row(&[("age", "30")]), row(&[("age", "x")])];
        let result = validate(&rows, &rules());

        assert!(!result.success);
        assert!(result.accepted_rows.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::MissingColumn);
        assert_eq!(result.errors[0].row, HEADER_ROW);
        assert_eq!(result.errors[0].column, "Name");
        assert_eq!(result.summary.error_rows, 2);
        assert_eq!(result.summary.total_rows, 2);
    }

    #[test]
    fn test_rows_are_exclusively_classified() {
        let rows = vec![
            row(&[("name", "Ada"), ("age", "36")]),
            row(&[("name", "B"), ("age", "40")]),
            row(&[("name", ""), ("age", "22")]),
            row(&[("name", "Cy"), ("age", "old")]),
            row(&[("name", "Di"), ("age", "12")]),
        ];
        let result = validate(&rows, &rules());

        assert!(!result.success);
        assert_eq!(result.summary.total_rows, 5);
        assert_eq!(result.summary.valid_rows, 2);
        assert_eq!(result.error_row_numbers, BTreeSet::from([4, 5, 6]));
        assert_eq!(result.warning_row_numbers, BTreeSet::from([3]));
        assert_eq!(
            result.summary.valid_rows + result.summary.error_rows,
            result.summary.total_rows
        );
        for accepted in &result.accepted_rows {
            assert!(!result.error_row_numbers.contains(&accepted.row));
        }
    }

    #[test]
    fn test_transform_applies_after_acceptance() {
        let rows = vec![row(&[("name", "Ada"), ("age", "36"), ("note", "")])];
        let result = validate(&rows, &rules());

        let accepted = &result.accepted_rows[0];
        assert_eq!(accepted.get("age"), Some(&CellValue::Integer(36)));
        assert_eq!(accepted.values.get("note"), Some(&CellValue::Null));
        assert_eq!(accepted.text("name").as_deref(), Some("Ada"));
    }

    #[test]
    fn test_info_never_blocks() {
        let rows = vec![row(&[("name", "Ada"), ("note", "hello")])];
        let result = validate(&rows, &rules());

        assert!(result.success);
        assert_eq!(result.accepted_rows.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Info);
        assert!(result.warning_row_numbers.is_empty());
    }

    #[test]
    fn test_required_reported_once() {
        let rows = vec![row(&[("name", "  ")])];
        let result = validate(&rows, &rules());

        let required: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == ErrorCode::RequiredField)
            .collect();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].row, 2);
    }

    #[test]
    fn test_cross_field_skipped_when_cells_fail() {
        let rows = vec![row(&[("name", "Ada"), ("age", "ten")])];
        let result = validate(&rows, &rules());

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::InvalidFormat);
        assert_eq!(result.errors[0].value, "ten");
    }

    #[test]
    fn test_findings_use_file_lines() {
        let rows = vec![
            row(&[("name", "Ada")]).with_line(3),
            row(&[("name", "")]).with_line(7),
            row(&[("name", "Cy"), ("age", "x")]),
        ];
        let result = validate(&rows, &rules());

        assert_eq!(result.accepted_rows[0].row, 3);
        assert_eq!(result.error_row_numbers, BTreeSet::from([4, 7]));
        assert!(result.findings_for_row(7).all(|e| e.code == ErrorCode::RequiredField));
    }

    #[test]
    fn test_missing_column_rows_use_file_lines() {
        let rows = vec![row(&[("age", "30")]).with_line(5)];
        let result = validate(&rows, &rules());

        assert_eq!(result.error_row_numbers, BTreeSet::from([5]));
    }

    #[test]
    fn test_findings_keep_the_cell_as_written() {
        let rows = vec![row(&[("name", "  B "), ("age", " ten ")])];
        let result = validate(&rows, &rules());

        let short = result.errors.iter().find(|e| e.code == ErrorCode::ValueTooShort).unwrap();
        assert_eq!(short.value, "  B ");
        let format = result.errors.iter().find(|e| e.code == ErrorCode::InvalidFormat).unwrap();
        assert_eq!(format.value, " ten ");
    }

    #[test]
    fn test_contextual_check_wins_over_simple() {
        let rule = ColumnRule::optional()
            .with_context(|_| Vec::new())
            .validate(ErrorCode::InvalidFormat, |_| Some("always fails".into()));
        let rules = RuleSet::new().column("x", "X", rule);

        let result = validate(&[row(&[("x", "1")])], &rules);
        assert!(result.success);
    }

    #[test]
    fn test_resolve_headers_by_display_name() {
        let rules = rules();
        assert_eq!(rules.resolve_header(" NAME "), Some("name"));
        assert_eq!(rules.resolve_header("age"), Some("age"));
        assert_eq!(rules.resolve_header("Shoe Size"), None);

        let rows = rules.resolve_headers(vec![row(&[("Name", "Ada"), ("Shoe Size", "38")])]);
        assert_eq!(rows[0].get("name"), Some("Ada"));
        assert_eq!(rows[0].get("Shoe Size"), Some("38"));
    }

    #[test]
    fn test_finding_display() {
        let finding = ValidationError::warning(ErrorCode::PossibleTypo, 3, "email", "domain looks misspelled")
            .with_value("a@gmial.com")
            .with_fix("a@gmail.com");
        let msg = finding.to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("POSSIBLE_TYPO"));
        assert!(msg.contains("a@gmail.com"));
    }
}

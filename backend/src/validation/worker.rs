//! Worker rule set: the concrete columns, checks and cross-field rules for
//! bulk worker files.
//!
//! Column keys are the internal names used by the record transformer; the
//! display names are what templates print and what uploaded headers are
//! matched against.

use chrono::{NaiveDate, Utc};

use super::engine::{CellValue, ColumnRule, ErrorCode, RuleSet, ValidatedRow, ValidationError};
use super::primitives::{
    is_bool, is_date, is_email, is_identifier, is_one_of, is_phone, normalize_code,
    normalize_email, normalize_phone, parse_bool, parse_date, parse_integer, parse_number,
    split_tags, suggest_email,
};

pub const GENDERS: &[&str] = &["male", "female", "non_binary", "other", "prefer_not_to_say"];
pub const CONTACT_METHODS: &[&str] = &["email", "sms", "phone", "whatsapp"];
pub const CONSENT_STATUSES: &[&str] = &["granted", "denied", "pending"];
pub const EMPLOYMENT_TYPES: &[&str] = &["full_time", "part_time", "contractor", "temporary", "intern"];
pub const EMPLOYMENT_STATUSES: &[&str] = &["active", "on_leave", "suspended", "terminated"];
pub const STRESS_LEVELS: &[&str] = &["low", "medium", "high"];

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_TEXT_LENGTH: usize = 255;
pub const MIN_PLAUSIBLE_AGE: u32 = 18;
pub const MAX_PLAUSIBLE_AGE: u32 = 100;

/// Dates that should not precede the hire date.
pub const ACTIVITY_DATE_COLUMNS: &[&str] = &[
    "last_active_date",
    "last_interaction_date",
    "last_engagement_date",
];

/// Worker rules evaluated against today's date.
pub fn worker_rules() -> RuleSet {
    worker_rules_at(Utc::now().date_naive())
}

/// Worker rules with an explicit reference date for age and future checks.
pub fn worker_rules_at(today: NaiveDate) -> RuleSet {
    RuleSet::new()
        // Identity
        .column("first_name", "First Name", name_rule())
        .column("last_name", "Last Name", name_rule())
        .column("external_id", "Employee ID", identifier_rule())
        .column("date_of_birth", "Date of Birth", birth_date_rule(today))
        .column("gender", "Gender", enum_rule(GENDERS))
        .column("tags", "Tags", tags_rule())
        .column("is_active", "Active", bool_rule())
        .column("deactivation_reason", "Deactivation Reason", text_rule(MAX_TEXT_LENGTH))
        // Contact
        .column("email", "Email", email_rule())
        .column("phone", "Phone", phone_rule())
        .column("preferred_contact_method", "Preferred Contact Method", enum_rule(CONTACT_METHODS))
        .column("communication_consent", "Communication Consent", bool_rule())
        .column("email_opt_in", "Email Opt-In", bool_rule())
        .column("sms_opt_in", "SMS Opt-In", bool_rule())
        .column("consent_status", "Consent Status", enum_rule(CONSENT_STATUSES))
        // Employment
        .column("job_title", "Job Title", text_rule(MAX_TEXT_LENGTH))
        .column("department", "Department", text_rule(MAX_TEXT_LENGTH))
        .column("location", "Location", text_rule(MAX_TEXT_LENGTH))
        .column("employment_type", "Employment Type", enum_rule(EMPLOYMENT_TYPES))
        .column("employment_status", "Employment Status", enum_rule(EMPLOYMENT_STATUSES))
        .column("hire_date", "Hire Date", hire_date_rule(today))
        .column("manager_id", "Manager ID", manager_rule())
        // Engagement
        .column("last_active_date", "Last Active Date", date_rule())
        .column("last_interaction_date", "Last Interaction Date", date_rule())
        .column("last_engagement_date", "Last Engagement Date", date_rule())
        .column("engagement_score", "Engagement Score", number_rule(0.0, 100.0))
        // Wellbeing
        .column("wellbeing_score", "Wellbeing Score", number_rule(0.0, 10.0))
        .column("stress_level", "Stress Level", enum_rule(STRESS_LEVELS))
        .column("needs_support", "Needs Support", bool_rule())
        // Gamification
        .column("points", "Points", integer_rule(0))
        .column("level", "Level", integer_rule(1))
        .column("badges", "Badges", tags_rule())
        // Row-level rules, in evaluation order
        .cross_field("active_deactivation_reason", check_deactivation_reason)
        .cross_field("activity_after_hire", check_dates_after_hire)
        .cross_field("consent_contact", check_consent_contact)
        .cross_field("employment_status_active", check_employment_status)
}

// =============================================================================
// Column rules
// =============================================================================

fn name_rule() -> ColumnRule {
    ColumnRule::required()
        .with_context(|ctx| {
            let len = ctx.value.chars().count();
            if len > MAX_NAME_LENGTH {
                vec![ctx.error(
                    ErrorCode::ValueTooLong,
                    format!("must be at most {} characters", MAX_NAME_LENGTH),
                )]
            } else if len < MIN_NAME_LENGTH {
                vec![ctx.warning(
                    ErrorCode::ValueTooShort,
                    format!("shorter than {} characters, check for a truncated name", MIN_NAME_LENGTH),
                )]
            } else {
                Vec::new()
            }
        })
        .transform(|v| CellValue::Text(v.trim().to_string()))
}

fn identifier_rule() -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::InvalidFormat, |v| {
            (!is_identifier(v)).then(|| "letters, digits, '.', '_' or '-' only, 64 characters max".to_string())
        })
        .transform(|v| CellValue::Text(v.trim().to_string()))
}

fn manager_rule() -> ColumnRule {
    ColumnRule::optional()
        .with_context(|ctx| {
            if !is_identifier(ctx.value) {
                return vec![ctx.error(
                    ErrorCode::InvalidFormat,
                    "letters, digits, '.', '_' or '-' only, 64 characters max",
                )];
            }
            match ctx.row.non_empty("external_id") {
                Some(own) if own == ctx.value => {
                    vec![ctx.warning(ErrorCode::SelfReference, "worker is listed as their own manager")]
                }
                _ => Vec::new(),
            }
        })
        .transform(|v| CellValue::Text(v.trim().to_string()))
}

fn birth_date_rule(today: NaiveDate) -> ColumnRule {
    ColumnRule::optional()
        .with_context(move |ctx| {
            let Some(date) = parse_date(ctx.value) else {
                return vec![ctx.error(ErrorCode::InvalidFormat, "expected a date like 1990-04-12")];
            };
            if date > today {
                return vec![ctx.error(ErrorCode::FutureDate, "date of birth is in the future")];
            }
            match today.years_since(date) {
                Some(age) if age < MIN_PLAUSIBLE_AGE => vec![ctx.warning(
                    ErrorCode::ImplausibleAge,
                    format!("worker would be {} years old (under {})", age, MIN_PLAUSIBLE_AGE),
                )],
                Some(age) if age > MAX_PLAUSIBLE_AGE => vec![ctx.warning(
                    ErrorCode::ImplausibleAge,
                    format!("worker would be {} years old (over {})", age, MAX_PLAUSIBLE_AGE),
                )],
                _ => Vec::new(),
            }
        })
        .transform(date_value)
}

fn hire_date_rule(today: NaiveDate) -> ColumnRule {
    ColumnRule::optional()
        .with_context(move |ctx| match parse_date(ctx.value) {
            None => vec![ctx.error(ErrorCode::InvalidFormat, "expected a date like 2021-09-01")],
            Some(date) if date > today => {
                vec![ctx.warning(ErrorCode::FutureDate, "hire date is in the future")]
            }
            Some(_) => Vec::new(),
        })
        .transform(date_value)
}

fn email_rule() -> ColumnRule {
    ColumnRule::optional()
        .with_context(|ctx| {
            if !is_email(ctx.value) {
                return vec![ctx.error(ErrorCode::InvalidFormat, "not a valid email address")];
            }
            match suggest_email(ctx.value) {
                Some(fixed) => vec![ctx
                    .warning(ErrorCode::PossibleTypo, "email domain looks like a misspelled provider")
                    .with_fix(normalize_email(&fixed))],
                None => Vec::new(),
            }
        })
        .transform(|v| CellValue::Text(normalize_email(v)))
}

fn phone_rule() -> ColumnRule {
    ColumnRule::required()
        .validate(ErrorCode::InvalidFormat, |v| {
            (!is_phone(v)).then(|| "expected 7 to 15 digits, optionally starting with '+'".to_string())
        })
        .transform(|v| CellValue::Text(normalize_phone(v)))
}

fn enum_rule(allowed: &'static [&'static str]) -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::InvalidValue, move |v| {
            (!is_one_of(v, allowed)).then(|| format!("expected one of: {}", allowed.join(", ")))
        })
        .transform(|v| CellValue::Text(normalize_code(v)))
}

fn bool_rule() -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::InvalidFormat, |v| {
            (!is_bool(v)).then(|| "expected yes/no, true/false or 1/0".to_string())
        })
        .transform(|v| parse_bool(v).map(CellValue::Bool).unwrap_or(CellValue::Null))
}

fn date_rule() -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::InvalidFormat, |v| {
            (!is_date(v)).then(|| "expected a date like 2024-01-31".to_string())
        })
        .transform(date_value)
}

fn number_rule(min: f64, max: f64) -> ColumnRule {
    ColumnRule::optional()
        .with_context(move |ctx| match parse_number(ctx.value) {
            None => vec![ctx.error(ErrorCode::InvalidFormat, "not a number")],
            Some(n) if n < min || n > max => vec![ctx.error(
                ErrorCode::OutOfRange,
                format!("must be between {} and {}", min, max),
            )],
            Some(_) => Vec::new(),
        })
        .transform(|v| parse_number(v).map(CellValue::Number).unwrap_or(CellValue::Null))
}

fn integer_rule(min: i64) -> ColumnRule {
    ColumnRule::optional()
        .with_context(move |ctx| match parse_integer(ctx.value) {
            None => vec![ctx.error(ErrorCode::InvalidFormat, "not a whole number")],
            Some(n) if n < min => {
                vec![ctx.error(ErrorCode::OutOfRange, format!("must be at least {}", min))]
            }
            Some(_) => Vec::new(),
        })
        .transform(|v| parse_integer(v).map(CellValue::Integer).unwrap_or(CellValue::Null))
}

fn tags_rule() -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::InvalidFormat, |v| split_tags(v).err())
        .transform(|v| CellValue::List(split_tags(v).unwrap_or_default()))
}

fn text_rule(max: usize) -> ColumnRule {
    ColumnRule::optional()
        .validate(ErrorCode::ValueTooLong, move |v| {
            (v.chars().count() > max).then(|| format!("must be at most {} characters", max))
        })
        .transform(|v| CellValue::Text(v.trim().to_string()))
}

fn date_value(v: &str) -> CellValue {
    parse_date(v).map(CellValue::Date).unwrap_or(CellValue::Null)
}

// =============================================================================
// Cross-field rules
// =============================================================================

/// Inactive workers should say why; active ones should not carry a reason.
pub fn check_deactivation_reason(row: &ValidatedRow) -> Vec<ValidationError> {
    let reason = row.text("deactivation_reason");
    match (row.flag("is_active"), reason) {
        (Some(false), None) => vec![ValidationError::warning(
            ErrorCode::MissingDeactivationReason,
            row.row,
            "deactivation_reason",
            "inactive worker has no deactivation reason",
        )],
        (Some(true), Some(reason)) => vec![ValidationError::warning(
            ErrorCode::UnexpectedDeactivationReason,
            row.row,
            "deactivation_reason",
            "active worker carries a deactivation reason",
        )
        .with_value(reason)
        .with_fix("clear the deactivation reason, or set Active to 'no'")],
        _ => Vec::new(),
    }
}

/// Activity dates that precede the hire date are suspicious.
pub fn check_dates_after_hire(row: &ValidatedRow) -> Vec<ValidationError> {
    let Some(hired) = row.date("hire_date") else {
        return Vec::new();
    };

    ACTIVITY_DATE_COLUMNS
        .iter()
        .filter_map(|column| {
            let date = row.date(column)?;
            (date < hired).then(|| {
                ValidationError::warning(
                    ErrorCode::DateBeforeHire,
                    row.row,
                    *column,
                    format!("{} is before the hire date {}", date, hired),
                )
                .with_value(date.format("%Y-%m-%d").to_string())
            })
        })
        .collect()
}

/// Opted-in channels need their contact field; consent needs some contact.
pub fn check_consent_contact(row: &ValidatedRow) -> Vec<ValidationError> {
    let email = row.text("email");
    let phone = row.text("phone");
    let mut findings = Vec::new();

    if row.flag("email_opt_in") == Some(true) && email.is_none() {
        findings.push(ValidationError::error(
            ErrorCode::MissingContactForChannel,
            row.row,
            "email",
            "opted in to email but no email address is given",
        ));
    }
    if row.flag("sms_opt_in") == Some(true) && phone.is_none() {
        findings.push(ValidationError::error(
            ErrorCode::MissingContactForChannel,
            row.row,
            "phone",
            "opted in to SMS but no phone number is given",
        ));
    }

    if let Some(method) = row.text("preferred_contact_method") {
        let (column, present) = match method.as_str() {
            "email" => ("email", email.is_some()),
            _ => ("phone", phone.is_some()),
        };
        if !present {
            findings.push(
                ValidationError::error(
                    ErrorCode::MissingContactForChannel,
                    row.row,
                    column,
                    format!("preferred contact method is {} but no {} is given", method, column),
                )
                .with_value(method),
            );
        }
    }

    if row.flag("communication_consent") == Some(true) && email.is_none() && phone.is_none() {
        findings.push(ValidationError::warning(
            ErrorCode::NoContactMethod,
            row.row,
            "communication_consent",
            "consent given but the worker has no email or phone",
        ));
    }

    findings
}

/// A terminated worker flagged active is probably a stale export.
pub fn check_employment_status(row: &ValidatedRow) -> Vec<ValidationError> {
    match (row.text("employment_status").as_deref(), row.flag("is_active")) {
        (Some("terminated"), Some(true)) => vec![ValidationError::warning(
            ErrorCode::InconsistentStatus,
            row.row,
            "employment_status",
            "terminated worker is marked active",
        )
        .with_value("terminated")
        .with_fix("set Active to 'no'")],
        _ => Vec::new(),
    }
}

/// Example rows for the sample file, keyed by internal column name.
pub fn sample_rows() -> Vec<Vec<(&'static str, &'static str)>> {
    vec![
        vec![
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("external_id", "EMP-0001"),
            ("date_of_birth", "1985-12-10"),
            ("gender", "female"),
            ("tags", "night shift, \"first aid, level 2\""),
            ("is_active", "yes"),
            ("email", "ada.lovelace@example.com"),
            ("phone", "+44 20 7946 0018"),
            ("preferred_contact_method", "email"),
            ("communication_consent", "yes"),
            ("email_opt_in", "yes"),
            ("sms_opt_in", "no"),
            ("consent_status", "granted"),
            ("job_title", "Shift Lead"),
            ("department", "Operations"),
            ("location", "London"),
            ("employment_type", "full_time"),
            ("employment_status", "active"),
            ("hire_date", "2019-03-01"),
            ("last_active_date", "2024-05-02"),
            ("last_interaction_date", "2024-04-28"),
            ("last_engagement_date", "2024-04-15"),
            ("engagement_score", "82.5"),
            ("wellbeing_score", "7"),
            ("stress_level", "low"),
            ("needs_support", "no"),
            ("points", "1250"),
            ("level", "4"),
            ("badges", "mentor, safety champion"),
        ],
        vec![
            ("first_name", "Grace"),
            ("last_name", "Hopper"),
            ("external_id", "EMP-0002"),
            ("date_of_birth", "1979-06-21"),
            ("is_active", "no"),
            ("deactivation_reason", "Resigned"),
            ("phone", "+1 202 555 0143"),
            ("preferred_contact_method", "sms"),
            ("sms_opt_in", "yes"),
            ("job_title", "Forklift Operator"),
            ("department", "Warehouse"),
            ("employment_type", "part_time"),
            ("employment_status", "terminated"),
            ("hire_date", "2020-11-16"),
            ("manager_id", "EMP-0001"),
            ("points", "300"),
            ("level", "2"),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawRow;
    use crate::validation::engine::{validate, Severity};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn row(cells: &[(&str, &str)]) -> RawRow {
        let mut row: RawRow = [("first_name", "Ada"), ("last_name", "Lovelace"), ("phone", "+44 20 7946 0018")]
            .into_iter()
            .collect();
        for (k, v) in cells {
            row.insert(*k, *v);
        }
        row
    }

    fn findings(cells: &[(&str, &str)]) -> Vec<ValidationError> {
        validate(&[row(cells)], &worker_rules_at(today())).errors
    }

    fn codes(cells: &[(&str, &str)]) -> Vec<(ErrorCode, Severity)> {
        findings(cells).into_iter().map(|f| (f.code, f.severity)).collect()
    }

    #[test]
    fn test_every_column_can_be_patched() {
        let rules = worker_rules_at(today());
        for (column, _) in rules.columns() {
            assert!(
                crate::models::WORKER_COLUMNS.contains(&column),
                "{} is not patchable",
                column
            );
        }
        assert_eq!(rules.columns().count(), crate::models::WORKER_COLUMNS.len());
    }

    #[test]
    fn test_minimal_row_is_clean() {
        assert!(findings(&[]).is_empty());
    }

    #[test]
    fn test_short_name_is_only_a_warning() {
        let result = validate(&[row(&[("first_name", "A")])], &worker_rules_at(today()));
        assert!(result.success);
        assert_eq!(result.accepted_rows.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::ValueTooShort);
        assert_eq!(result.errors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_date_of_birth_checks() {
        assert_eq!(
            codes(&[("date_of_birth", "31/02/1990")]),
            vec![(ErrorCode::InvalidFormat, Severity::Error)]
        );
        assert_eq!(
            codes(&[("date_of_birth", "2030-01-01")]),
            vec![(ErrorCode::FutureDate, Severity::Error)]
        );
        assert_eq!(
            codes(&[("date_of_birth", "2010-01-01")]),
            vec![(ErrorCode::ImplausibleAge, Severity::Warning)]
        );
        assert_eq!(
            codes(&[("date_of_birth", "1900-01-01")]),
            vec![(ErrorCode::ImplausibleAge, Severity::Warning)]
        );
        assert!(codes(&[("date_of_birth", "1990-04-12")]).is_empty());
    }

    #[test]
    fn test_email_typo_suggests_fix() {
        let found = findings(&[("email", "Ada@Gmial.com")]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::PossibleTypo);
        assert_eq!(found[0].severity, Severity::Warning);
        assert_eq!(found[0].suggested_fix.as_deref(), Some("ada@gmail.com"));

        assert_eq!(
            codes(&[("email", "ada@")]),
            vec![(ErrorCode::InvalidFormat, Severity::Error)]
        );
    }

    #[test]
    fn test_values_are_transformed() {
        let result = validate(
            &[row(&[
                ("is_active", "Yes"),
                ("tags", "a, \"b, c\""),
                ("email", " ADA@example.com "),
                ("gender", "Non-Binary"),
                ("points", "12"),
            ])],
            &worker_rules_at(today()),
        );
        let accepted = &result.accepted_rows[0];

        assert_eq!(accepted.flag("is_active"), Some(true));
        assert_eq!(accepted.list("tags"), vec!["a", "b, c"]);
        assert_eq!(accepted.text("email").as_deref(), Some("ada@example.com"));
        assert_eq!(accepted.text("gender").as_deref(), Some("non_binary"));
        assert_eq!(accepted.text("phone").as_deref(), Some("+442079460018"));
        assert_eq!(accepted.integer("points"), Some(12));
    }

    #[test]
    fn test_deactivation_reason_consistency() {
        assert_eq!(
            codes(&[("is_active", "no")]),
            vec![(ErrorCode::MissingDeactivationReason, Severity::Warning)]
        );

        let found = findings(&[("is_active", "yes"), ("deactivation_reason", "Retired")]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::UnexpectedDeactivationReason);
        assert!(found[0].suggested_fix.is_some());

        assert!(codes(&[("is_active", "no"), ("deactivation_reason", "Retired")]).is_empty());
    }

    #[test]
    fn test_activity_dates_before_hire() {
        let found = codes(&[
            ("hire_date", "2022-01-10"),
            ("last_active_date", "2021-12-01"),
            ("last_interaction_date", "2023-01-01"),
            ("last_engagement_date", "2020-05-05"),
        ]);
        assert_eq!(
            found,
            vec![
                (ErrorCode::DateBeforeHire, Severity::Warning),
                (ErrorCode::DateBeforeHire, Severity::Warning),
            ]
        );
    }

    #[test]
    fn test_opt_in_without_email_is_an_error() {
        let result = validate(&[row(&[("email_opt_in", "yes")])], &worker_rules_at(today()));
        assert!(!result.success);
        assert!(result.accepted_rows.is_empty());
        assert_eq!(result.errors[0].code, ErrorCode::MissingContactForChannel);
        assert_eq!(result.errors[0].column, "email");
    }

    #[test]
    fn test_preferred_email_without_email_is_an_error() {
        assert_eq!(
            codes(&[("preferred_contact_method", "Email")]),
            vec![(ErrorCode::MissingContactForChannel, Severity::Error)]
        );
        assert!(codes(&[("preferred_contact_method", "sms")]).is_empty());
    }

    #[test]
    fn test_consent_without_any_contact_is_a_warning() {
        let row = ValidatedRow::new(7).with("communication_consent", CellValue::Bool(true));
        let found = check_consent_contact(&row);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::NoContactMethod);
        assert_eq!(found[0].severity, Severity::Warning);
        assert_eq!(found[0].row, 7);
    }

    #[test]
    fn test_terminated_but_active() {
        assert_eq!(
            codes(&[("employment_status", "terminated"), ("is_active", "true")]),
            vec![(ErrorCode::InconsistentStatus, Severity::Warning)]
        );
    }

    #[test]
    fn test_manager_self_reference() {
        assert_eq!(
            codes(&[("external_id", "EMP-9"), ("manager_id", "EMP-9")]),
            vec![(ErrorCode::SelfReference, Severity::Warning)]
        );
    }

    #[test]
    fn test_out_of_range_scores() {
        assert_eq!(
            codes(&[("wellbeing_score", "11")]),
            vec![(ErrorCode::OutOfRange, Severity::Error)]
        );
        assert_eq!(
            codes(&[("level", "0")]),
            vec![(ErrorCode::OutOfRange, Severity::Error)]
        );
    }

    #[test]
    fn test_non_numbers_are_format_errors() {
        assert_eq!(
            codes(&[("engagement_score", "high")]),
            vec![(ErrorCode::InvalidFormat, Severity::Error)]
        );
        assert_eq!(
            codes(&[("points", "12.5")]),
            vec![(ErrorCode::InvalidFormat, Severity::Error)]
        );
        assert_eq!(
            codes(&[("points", "-3")]),
            vec![(ErrorCode::OutOfRange, Severity::Error)]
        );
    }

    #[test]
    fn test_future_hire_date_only_warns() {
        let result = validate(&[row(&[("hire_date", "2024-09-02")])], &worker_rules_at(today()));

        assert!(result.success);
        assert_eq!(result.accepted_rows.len(), 1);
        assert_eq!(
            result.errors.iter().map(|f| (f.code, f.severity)).collect::<Vec<_>>(),
            vec![(ErrorCode::FutureDate, Severity::Warning)]
        );
        assert_eq!(result.warning_row_numbers, std::collections::BTreeSet::from([2]));

        assert_eq!(
            codes(&[("hire_date", "next monday")]),
            vec![(ErrorCode::InvalidFormat, Severity::Error)]
        );
    }

    #[test]
    fn test_sample_rows_validate_cleanly() {
        let rules = worker_rules_at(today());
        let rows: Vec<RawRow> = sample_rows()
            .into_iter()
            .map(|cells| cells.into_iter().collect())
            .collect();
        let result = validate(&rows, &rules);

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.summary.valid_rows, rows.len());
        assert!(result.warnings().count() == 0, "{:?}", result.errors);
    }
}

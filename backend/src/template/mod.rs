//! Blank templates and sample files rendered from a [`RuleSet`].
//!
//! Headers are the rule set's display names, in column order, so a generated
//! file always resolves back to the same internal keys on import.

use crate::error::{CsvError, CsvResult};
use crate::validation::{sample_rows, worker_rules, RuleSet};

/// Header-only CSV for `rules`.
pub fn generate_template(rules: &RuleSet) -> CsvResult<Vec<u8>> {
    generate_sample(rules, &[])
}

/// CSV with a header row plus one line per example row.
///
/// Example rows are keyed by internal column name; columns an example does
/// not mention are left empty, keys unknown to `rules` are dropped.
pub fn generate_sample(rules: &RuleSet, rows: &[Vec<(&str, &str)>]) -> CsvResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(rules.header_display_names().iter().map(|(_, display)| display))?;

    for row in rows {
        let record = rules.header_display_names().iter().map(|(key, _)| {
            row.iter()
                .find(|(k, _)| *k == key.as_str())
                .map(|(_, v)| *v)
                .unwrap_or("")
        });
        writer.write_record(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| CsvError::Io(e.into_error()))
}

pub fn worker_template() -> CsvResult<Vec<u8>> {
    generate_template(&worker_rules())
}

pub fn worker_sample() -> CsvResult<Vec<u8>> {
    generate_sample(&worker_rules(), &sample_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bytes_auto;
    use crate::validation::{validate, ColumnRule, ErrorCode};

    #[test]
    fn test_template_header_matches_display_names() {
        let rules = worker_rules();
        let bytes = generate_template(&rules).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let header = text.lines().next().unwrap();
        assert!(header.starts_with("First Name,Last Name,Employee ID"));
        assert_eq!(text.lines().count(), 1);
        assert_eq!(header.split(',').count(), rules.header_display_names().len());
    }

    #[test]
    fn test_sample_round_trips_through_validation() {
        let rules = worker_rules();
        let parsed = parse_bytes_auto(&worker_sample().unwrap()).unwrap();
        let rows = rules.resolve_headers(parsed.rows);

        let result = validate(&rows, &rules);

        assert!(!result.errors.iter().any(|e| e.code == ErrorCode::MissingColumn));
        assert!(result.success, "sample has findings: {:?}", result.errors);
        assert_eq!(result.summary.valid_rows, sample_rows().len());
    }

    #[test]
    fn test_quoted_cells_survive() {
        let rules = RuleSet::new().column("tags", "Tags", ColumnRule::optional());
        let bytes = generate_sample(&rules, &[vec![("tags", "a, \"b, c\"")]]).unwrap();
        let parsed = parse_bytes_auto(&bytes).unwrap();

        assert_eq!(parsed.rows[0].get("Tags"), Some("a, \"b, c\""));
    }

    #[test]
    fn test_unknown_sample_keys_are_dropped() {
        let rules = RuleSet::new().column("first_name", "First Name", ColumnRule::required());
        let bytes = generate_sample(&rules, &[vec![("first_name", "Ada"), ("shoe_size", "38")]]).unwrap();

        assert_eq!(String::from_utf8(bytes).unwrap(), "First Name\nAda\n");
    }
}

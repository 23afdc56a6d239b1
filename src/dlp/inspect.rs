use indexmap::IndexMap;

use super::patterns::PatternSet;
use super::scanner;
use super::{FieldReport, InspectionVerdict, ScanObserver};

/// Scan every decoded form field and aggregate the results.
///
/// Fields are visited in map order; only flagged fields produce a report.
pub fn inspect(
    fields: &IndexMap<String, String>,
    rules: &PatternSet,
    observer: &dyn ScanObserver,
) -> InspectionVerdict {
    let mut reports = Vec::new();
    for (name, value) in fields {
        let result = scanner::scan(value, rules, observer);
        observer.field_inspected(name, result.clean);
        if !result.clean {
            reports.push(FieldReport {
                field_name: name.clone(),
                clean: false,
                violations: result.hits,
            });
        }
    }
    InspectionVerdict {
        clean: reports.is_empty(),
        reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlp::NoopObserver;
    use crate::dlp::patterns::Rule;

    fn sample_rules() -> PatternSet {
        PatternSet::from_rules(vec![
            Rule::new("Sensitivity Marker (Confidential)", "confidential", false).unwrap(),
            Rule::new("Test Pattern 1", "post", false).unwrap(),
        ])
        .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_fields_is_clean() {
        let verdict = inspect(&IndexMap::new(), &sample_rules(), &NoopObserver);
        assert!(verdict.clean);
        assert!(verdict.reports.is_empty());
    }

    #[test]
    fn clean_fields_produce_no_reports() {
        let verdict = inspect(
            &fields(&[("name", "Alice"), ("comment", "hello")]),
            &sample_rules(),
            &NoopObserver,
        );
        assert!(verdict.clean);
        assert!(verdict.reports.is_empty());
    }

    #[test]
    fn only_flagged_fields_are_reported() {
        let verdict = inspect(
            &fields(&[
                ("name", "Alice"),
                ("comment", "confidential data"),
                ("subject", "Re: post"),
            ]),
            &sample_rules(),
            &NoopObserver,
        );
        assert!(!verdict.clean);
        let names: Vec<&str> = verdict
            .reports
            .iter()
            .map(|r| r.field_name.as_str())
            .collect();
        assert_eq!(names, vec!["comment", "subject"]);
        assert!(verdict.reports.iter().all(|r| !r.clean));
        assert_eq!(
            verdict.reports[0].violations[0].rule_id,
            "Sensitivity Marker (Confidential)"
        );
        assert_eq!(verdict.reports[1].violations[0].rule_id, "Test Pattern 1");
    }

    #[test]
    fn field_with_several_rule_hits_keeps_all() {
        let verdict = inspect(
            &fields(&[("comment", "confidential post")]),
            &sample_rules(),
            &NoopObserver,
        );
        assert_eq!(verdict.reports.len(), 1);
        assert_eq!(verdict.reports[0].violations.len(), 2);
    }
}

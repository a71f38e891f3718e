use crate::models::{AuthorityRules, IdentityRecord, RecordValidationResult, ValidationIssue, ValidationIssueType};

pub struct RecordValidator;

impl RecordValidator {
    /// Explain a record's validity. Only the first-name and ID-length
    /// checks decide `is_valid`; the rest are reported alongside.
    pub fn validate(record: &IdentityRecord, rules: &AuthorityRules) -> RecordValidationResult {
        let mut issues = Vec::new();
        let mut is_valid = true;

        if record.first_name.is_empty() {
            is_valid = false;
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::MissingField,
                message: "First name is missing".to_string(),
            });
        }

        let id_length = record.national_id.chars().count();
        if id_length != rules.national_id_length {
            is_valid = false;
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::NationalId,
                message: format!(
                    "National ID has {} characters, expected {}",
                    id_length, rules.national_id_length
                ),
            });
        }

        if !record.national_id.is_empty() && !record.national_id.chars().all(|c| c.is_ascii_digit()) {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::NationalId,
                message: "National ID contains non-digit characters".to_string(),
            });
        }

        if record.birth_date.is_empty() {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::BirthDate,
                message: "Birth date not found".to_string(),
            });
        } else if record.birth_date_parsed.is_none() {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::BirthDate,
                message: format!("Birth date {} is not a calendar date", record.birth_date),
            });
        }

        RecordValidationResult { is_valid, issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> IdentityRecord {
        IdentityRecord {
            first_name: "Ahmad".to_string(),
            national_id: "01234567890".to_string(),
            birth_date: "20-7-2003".to_string(),
            birth_date_parsed: NaiveDate::from_ymd_opt(2003, 7, 20),
            is_valid: true,
            ..IdentityRecord::default()
        }
    }

    #[test]
    fn test_complete_record_has_no_issues() {
        let result = RecordValidator::validate(&record(), &AuthorityRules::default());
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_missing_name_and_short_id() {
        let mut r = record();
        r.first_name.clear();
        r.national_id = "0123".to_string();

        let result = RecordValidator::validate(&r, &AuthorityRules::default());
        assert!(!result.is_valid);
        let types: Vec<ValidationIssueType> = result.issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(types, vec![ValidationIssueType::MissingField, ValidationIssueType::NationalId]);
    }

    #[test]
    fn test_soft_issues_keep_validity() {
        let mut r = record();
        r.national_id = "0123456789X".to_string();
        r.birth_date = "31-2-2003".to_string();
        r.birth_date_parsed = None;

        let result = RecordValidator::validate(&r, &AuthorityRules::default());
        assert!(result.is_valid);
        assert_eq!(result.issues.len(), 2);
    }
}

use chrono::{Local, NaiveDate};

use crate::models::{ExpiryCheckResult, TentativeDates, ValidationIssue, ValidationIssueType};
use crate::processing::extractors::find_dates;

pub struct ExpiryValidator;

impl ExpiryValidator {
    /// Advisory check of the speculative expiry date. Never touches the
    /// record's validity.
    pub fn check(dates: &TentativeDates, today: NaiveDate) -> ExpiryCheckResult {
        let mut issues = Vec::new();

        let Some(raw) = dates.expiry.as_deref() else {
            return ExpiryCheckResult { expiry_date: None, appears_expired: false, issues };
        };

        let expiry_date = Self::parse_date(raw);
        let appears_expired = match expiry_date {
            Some(date) => date < today,
            None => {
                issues.push(ValidationIssue {
                    issue_type: ValidationIssueType::Expiry,
                    message: format!("Tentative expiry date {} is not a calendar date", raw),
                });
                false
            }
        };

        if appears_expired {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::Expiry,
                message: format!("Tentative expiry date {} is in the past", raw),
            });
        }

        ExpiryCheckResult { expiry_date, appears_expired, issues }
    }

    pub fn check_today(dates: &TentativeDates) -> ExpiryCheckResult {
        Self::check(dates, Local::now().date_naive())
    }

    // Either D-M-YYYY or YYYYMMDD, whichever the heuristic picked up
    fn parse_date(raw: &str) -> Option<NaiveDate> {
        find_dates(raw).first().and_then(|d| d.to_naive_date())
    }
}

use std::collections::BTreeMap;

use encoding_rs::Encoding;
use log::debug;

use crate::models::{AnnotationKind, AuthorityRules, FieldAnnotation, IdentityRecord, RecoveredPayload, PAYLOAD_DELIMITER};
use crate::processing::binary_analysis::BinaryFieldAnalyzer;
use crate::processing::codepage::{is_latin1, latin1_encode};
use crate::processing::extractors::{parse_dmy, split_birth_info};

// Fixed positions in the authority's payload layout
const FIRST_NAME: usize = 0;
const FAMILY_NAME: usize = 1;
const FATHER_NAME: usize = 2;
const MOTHER_NAME: usize = 3;
const BIRTH_INFO: usize = 4;
const NATIONAL_ID: usize = 5;

/// Turns a `#`-delimited payload into an [`IdentityRecord`].
pub struct FieldParser {
    rules: AuthorityRules,
    encoding: &'static Encoding,
}

impl FieldParser {
    /// `encoding` is the national code page, used to re-derive field bytes
    /// from text that has already been recovered.
    pub fn new(rules: AuthorityRules, encoding: &'static Encoding) -> Self {
        FieldParser { rules, encoding }
    }

    pub fn rules(&self) -> &AuthorityRules {
        &self.rules
    }

    /// `None` when there is nothing to parse.
    pub fn parse(&self, text: &str) -> Option<IdentityRecord> {
        if text.trim().is_empty() {
            return None;
        }

        let pieces: Vec<&str> = text.split(PAYLOAD_DELIMITER).collect();
        let fields = pieces.iter().map(|f| f.trim().to_string()).collect();
        let raw_fields = pieces.iter().map(|f| self.field_bytes(f)).collect();

        Some(self.build(text.to_string(), fields, raw_fields))
    }

    /// Like [`parse`](Self::parse), but trailing fields are analysed from
    /// the exact decoder bytes instead of re-encoded text.
    pub fn parse_payload(&self, payload: &RecoveredPayload) -> Option<IdentityRecord> {
        if payload.text.trim().is_empty() {
            return None;
        }

        let fields = payload.fields.iter().map(|f| f.text.text.trim().to_string()).collect();
        let raw_fields = payload.fields.iter().map(|f| f.raw.clone()).collect();

        Some(self.build(payload.text.clone(), fields, raw_fields))
    }

    fn build(&self, raw_payload: String, fields: Vec<String>, raw_fields: Vec<Vec<u8>>) -> IdentityRecord {
        let field = |index: usize| fields.get(index).cloned().unwrap_or_default();

        let first_name = field(FIRST_NAME);
        let national_id = field(NATIONAL_ID);
        let birth_info = field(BIRTH_INFO);
        let (birth_place, birth_date) = split_birth_info(&birth_info);
        let birth_date_parsed = parse_dmy(&birth_date);
        let gender = self.rules.gender_for_id(&national_id);

        let is_valid = national_id.chars().count() == self.rules.national_id_length && !first_name.is_empty();

        let mut annotations = BTreeMap::new();
        for (index, raw) in raw_fields.iter().enumerate().skip(self.rules.known_field_count) {
            annotations.insert(index, BinaryFieldAnalyzer::annotate(raw));
        }

        let tentative_dates = match raw_fields.last() {
            Some(last) if raw_fields.len() > self.rules.known_field_count => {
                BinaryFieldAnalyzer::last_field_dates(last)
            }
            _ => Default::default(),
        };

        if let Some(bag) = raw_fields.len().checked_sub(1).and_then(|last| annotations.get_mut(&last)) {
            if let Some(issue) = &tentative_dates.issue {
                bag.push(FieldAnnotation::new(AnnotationKind::TentativeIssueDate, issue.as_str()));
            }
            if let Some(expiry) = &tentative_dates.expiry {
                bag.push(FieldAnnotation::new(AnnotationKind::TentativeExpiryDate, expiry.as_str()));
            }
        }

        debug!(
            "Parsed {} field(s): national ID length {}, valid {}",
            fields.len(),
            national_id.chars().count(),
            is_valid
        );

        IdentityRecord {
            first_name,
            family_name: field(FAMILY_NAME),
            father_name: field(FATHER_NAME),
            mother_name: field(MOTHER_NAME),
            birth_info,
            birth_place,
            birth_date,
            birth_date_parsed,
            national_id,
            gender,
            fields,
            raw_payload,
            annotations,
            tentative_dates,
            is_valid,
        }
    }

    /// Text still in pass-through form maps back byte for byte; recovered
    /// national-script text is re-encoded with the code page.
    fn field_bytes(&self, field: &str) -> Vec<u8> {
        if is_latin1(field) {
            latin1_encode(field)
        } else {
            let (bytes, _, _) = self.encoding.encode(field);
            bytes.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenderRule, TentativeDates};
    use chrono::NaiveDate;

    fn parser() -> FieldParser {
        FieldParser::new(AuthorityRules::default(), encoding_rs::WINDOWS_1256)
    }

    #[test]
    fn test_parse_full_record() {
        let record = parser()
            .parse("Ahmad#Al-Said#Omar#Fatima#Damascus 20-7-2003#01234567890#xx#yy")
            .unwrap();

        assert_eq!(record.first_name, "Ahmad");
        assert_eq!(record.family_name, "Al-Said");
        assert_eq!(record.father_name, "Omar");
        assert_eq!(record.mother_name, "Fatima");
        assert_eq!(record.birth_place, "Damascus");
        assert_eq!(record.birth_date, "20-7-2003");
        assert_eq!(record.birth_date_parsed, NaiveDate::from_ymd_opt(2003, 7, 20));
        assert_eq!(record.national_id, "01234567890");
        assert_eq!(record.gender.as_deref(), Some("Female"));
        assert!(record.is_valid());
        assert_eq!(record.field_count(), 8);
        assert_eq!(record.full_name(), "Ahmad Omar Al-Said");
        assert_eq!(record.annotations.keys().copied().collect::<Vec<_>>(), vec![6, 7]);
    }

    #[test]
    fn test_parse_empty_is_no_data() {
        assert!(parser().parse("").is_none());
        assert!(parser().parse("  \n ").is_none());
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let record = parser().parse("Ahmad#Al-Said").unwrap();
        assert_eq!(record.father_name, "");
        assert_eq!(record.national_id, "");
        assert_eq!(record.birth_date_parsed, None);
        assert_eq!(record.gender, None);
        assert!(!record.is_valid());
        assert!(record.annotations.is_empty());
        assert_eq!(record.tentative_dates, TentativeDates::default());
    }

    #[test]
    fn test_validity_needs_first_name_and_id_length() {
        assert!(!parser().parse("#Al-Said#Omar#Fatima#Homs 1-1-1990#01234567891").unwrap().is_valid());
        assert!(!parser().parse("Ahmad#Al-Said#Omar#Fatima#Homs 1-1-1990#0123456789").unwrap().is_valid());
        assert!(parser().parse(" Ahmad #Al-Said#Omar#Fatima#Homs 1-1-1990# 01234567891 ").unwrap().is_valid());
    }

    #[test]
    fn test_fourteen_digit_rule_can_be_configured() {
        let mut rules = AuthorityRules::default();
        rules.national_id_length = 14;
        rules.gender_rules.push(GenderRule {
            id_length: 14,
            digit_position: 12,
            odd_label: "M".to_string(),
            even_label: "F".to_string(),
        });
        let parser = FieldParser::new(rules, encoding_rs::WINDOWS_1256);
        let record = parser.parse("Ahmad#A#B#C#D#29901011234521").unwrap();
        assert_eq!(record.gender.as_deref(), Some("F"));
        assert!(record.is_valid());
    }

    #[test]
    fn test_trailing_field_dates_are_tentative() {
        let record = parser()
            .parse("Ahmad#Al-Said#Omar#Fatima#Damascus 20-7-2003#01234567890#X1#1-2-2020 1-2-2030")
            .unwrap();
        assert_eq!(record.tentative_dates.issue.as_deref(), Some("1-2-2020"));
        assert_eq!(record.tentative_dates.expiry.as_deref(), Some("1-2-2030"));
        assert!(record.annotations[&7].iter().any(|a| a.kind == AnnotationKind::Date));

        let tentative: Vec<(AnnotationKind, &str)> = record.annotations[&7]
            .iter()
            .filter(|a| matches!(a.kind, AnnotationKind::TentativeIssueDate | AnnotationKind::TentativeExpiryDate))
            .map(|a| (a.kind, a.detail.as_str()))
            .collect();
        assert_eq!(
            tentative,
            vec![
                (AnnotationKind::TentativeIssueDate, "1-2-2020"),
                (AnnotationKind::TentativeExpiryDate, "1-2-2030"),
            ]
        );
        // Earlier trailing fields carry no tentative labels
        assert!(record.annotations[&6]
            .iter()
            .all(|a| !matches!(a.kind, AnnotationKind::TentativeIssueDate | AnnotationKind::TentativeExpiryDate)));
    }

    #[test]
    fn test_arabic_fields_are_reencoded_for_analysis() {
        let p = parser();
        assert_eq!(p.field_bytes("أحمد"), vec![0xC3, 0xCD, 0xE3, 0xCF]);
        assert_eq!(p.field_bytes("\u{00ff}A"), vec![0xFF, b'A']);
    }
}

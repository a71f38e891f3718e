use serde::{Deserialize, Serialize};

/// Barcode payload delimiter dictated by the issuing authority's layout.
pub const PAYLOAD_DELIMITER: char = '#';

/// Layout conventions of the authority that issues the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityRules {
    pub authority_name: String,
    /// Required length of the national ID field for a record to be valid
    pub national_id_length: usize,
    /// Positions 0..known_field_count carry fixed semantic meaning
    pub known_field_count: usize,
    pub gender_rules: Vec<GenderRule>,
}

/// Parity convention: the digit at `digit_position` of an ID of
/// `id_length` digits selects the gender label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderRule {
    pub id_length: usize,
    pub digit_position: usize,
    pub odd_label: String,
    pub even_label: String,
}

impl Default for AuthorityRules {
    fn default() -> Self {
        AuthorityRules {
            authority_name: "SYR".to_string(),
            national_id_length: 11,
            known_field_count: 6,
            gender_rules: vec![GenderRule {
                id_length: 11,
                digit_position: 10,
                odd_label: "Male".to_string(),
                even_label: "Female".to_string(),
            }],
        }
    }
}

impl AuthorityRules {
    pub fn gender_rule_for(&self, id_length: usize) -> Option<&GenderRule> {
        self.gender_rules.iter().find(|rule| rule.id_length == id_length)
    }

    /// Resolve gender from a national ID. `None` when no rule matches the
    /// length or the selected character is not a digit.
    pub fn gender_for_id(&self, national_id: &str) -> Option<String> {
        let digits: Vec<char> = national_id.chars().collect();
        let rule = self.gender_rule_for(digits.len())?;
        let digit = digits.get(rule.digit_position)?.to_digit(10)?;

        if digit % 2 == 1 {
            Some(rule.odd_label.clone())
        } else {
            Some(rule.even_label.clone())
        }
    }
}

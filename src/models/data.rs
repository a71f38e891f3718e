use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::config::Enhancement;

/// Axis-aligned rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Mean horizontal gradient magnitude inside the rectangle (advisory)
    pub gradient_energy: f32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolFormat {
    Pdf417,
    QrCode,
    DataMatrix,
    Aztec,
    Code128,
    Code39,
    Other(String),
}

impl fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolFormat::Pdf417 => write!(f, "PDF417"),
            SymbolFormat::QrCode => write!(f, "QR Code"),
            SymbolFormat::DataMatrix => write!(f, "Data Matrix"),
            SymbolFormat::Aztec => write!(f, "Aztec"),
            SymbolFormat::Code128 => write!(f, "Code 128"),
            SymbolFormat::Code39 => write!(f, "Code 39"),
            SymbolFormat::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Exact decoder output. `bytes` is never reinterpreted as text here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDecodeResult {
    pub bytes: Vec<u8>,
    pub format: SymbolFormat,
    pub locator_points: Option<Vec<(f32, f32)>>,
    /// Heuristic 0-100, advisory only
    pub confidence: u8,
}

/// Where in the fallback cascade a decode succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadeStage {
    Candidate { index: usize, rotation: u16 },
    FullFrame,
    Inverted,
    Enhanced(Enhancement),
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CascadeStage::Candidate { index, rotation: 0 } => write!(f, "candidate region #{}", index),
            CascadeStage::Candidate { index, rotation } => {
                write!(f, "candidate region #{} rotated {}°", index, rotation)
            }
            CascadeStage::FullFrame => write!(f, "full frame"),
            CascadeStage::Inverted => write!(f, "inverted full frame"),
            CascadeStage::Enhanced(enhancement) => write!(f, "enhanced full frame ({:?})", enhancement),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratedDecode {
    pub result: RawDecodeResult,
    pub stage: CascadeStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodePageChoice {
    /// Bytes were accepted as the national code page
    Target,
    /// Plausibility check failed; bytes shown as Latin-1
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveredText {
    pub text: String,
    pub code_page: CodePageChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadField {
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub text: RecoveredText,
}

/// A raw payload recovered field by field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveredPayload {
    pub text: String,
    pub fields: Vec<PayloadField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    Date,
    NumericSequence,
    Base64Text,
    HashLikeLength,
    BiometricBlobLength,
    Entropy,
    LikelyEncrypted,
    LikelyCompressed,
    HexSequence,
    TentativeIssueDate,
    TentativeExpiryDate,
}

/// One heuristic observation about an opaque field. Never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAnnotation {
    pub kind: AnnotationKind,
    pub detail: String,
}

impl FieldAnnotation {
    pub fn new(kind: AnnotationKind, detail: impl Into<String>) -> Self {
        FieldAnnotation { kind, detail: detail.into() }
    }
}

/// Speculative dates read from the trailing field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TentativeDates {
    pub issue: Option<String>,
    pub expiry: Option<String>,
}

/// Structured national-ID data. Positions 0-5 of the payload map to the
/// named attributes; everything else is kept in `fields` and annotated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentityRecord {
    pub first_name: String,
    pub family_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub birth_info: String,
    pub birth_place: String,
    pub birth_date: String,
    pub birth_date_parsed: Option<NaiveDate>,
    pub national_id: String,
    pub gender: Option<String>,
    pub fields: Vec<String>,
    pub raw_payload: String,
    pub annotations: BTreeMap<usize, Vec<FieldAnnotation>>,
    pub tentative_dates: TentativeDates,
    pub is_valid: bool,
}

impl IdentityRecord {
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// First name, father's name, family name, in the card's reading order.
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.father_name, &self.family_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub issue_type: ValidationIssueType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssueType {
    MissingField,
    NationalId,
    BirthDate,
    Expiry,
}

#[derive(Debug)]
pub struct RecordValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug)]
pub struct ExpiryCheckResult {
    pub expiry_date: Option<NaiveDate>,
    pub appears_expired: bool,
    pub issues: Vec<ValidationIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_skips_missing_parts() {
        let record = IdentityRecord {
            first_name: "Ahmad".to_string(),
            family_name: "Al-Said".to_string(),
            ..IdentityRecord::default()
        };
        assert_eq!(record.full_name(), "Ahmad Al-Said");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(
            CascadeStage::Candidate { index: 1, rotation: 90 }.to_string(),
            "candidate region #1 rotated 90°"
        );
        assert_eq!(CascadeStage::Inverted.to_string(), "inverted full frame");
    }
}

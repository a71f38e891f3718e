use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;

use crate::models::{AnnotationKind, FieldAnnotation, TentativeDates};
use crate::processing::codepage::latin1_decode;
use crate::processing::extractors::{find_dates, BASE64_PATTERN, DIGIT_RUN_PATTERN, HEX_RUN_PATTERN};

const HASH_LIKE_LENGTHS: [usize; 3] = [16, 20, 32];
const BLOB_MIN_LENGTH: usize = 100;
const ENCRYPTED_ENTROPY: f64 = 7.5;
const COMPRESSED_ENTROPY: f64 = 6.0;
const UNIFORM_REFERENCE_MAX_LEN: usize = 2048;

/// Best-effort labelling of payload fields nobody has documented. Every
/// annotation is a guess; none of them affects record validity.
pub struct BinaryFieldAnalyzer;

impl BinaryFieldAnalyzer {
    pub fn annotate(bytes: &[u8]) -> Vec<FieldAnnotation> {
        let text = latin1_decode(bytes);
        let mut annotations = Vec::new();

        for date in find_dates(&text) {
            annotations.push(FieldAnnotation::new(AnnotationKind::Date, date.text));
        }

        for run in DIGIT_RUN_PATTERN.find_iter(&text) {
            annotations.push(FieldAnnotation::new(AnnotationKind::NumericSequence, run.as_str()));
        }

        if let Some(decoded) = Self::probe_base64(&text) {
            annotations.push(FieldAnnotation::new(AnnotationKind::Base64Text, decoded));
        }

        annotations.extend(Self::byte_patterns(bytes));

        for run in HEX_RUN_PATTERN.find_iter(&text) {
            annotations.push(FieldAnnotation::new(AnnotationKind::HexSequence, run.as_str()));
        }

        debug!("Annotated {}-byte field with {} label(s)", bytes.len(), annotations.len());
        annotations
    }

    /// Dates in the trailing field: two or more give issue and expiry, a
    /// single one is taken as the expiry.
    pub fn last_field_dates(bytes: &[u8]) -> TentativeDates {
        let dates = find_dates(&latin1_decode(bytes));
        match dates.as_slice() {
            [] => TentativeDates::default(),
            [only] => TentativeDates { issue: None, expiry: Some(only.text.clone()) },
            [first, second, ..] => TentativeDates {
                issue: Some(first.text.clone()),
                expiry: Some(second.text.clone()),
            },
        }
    }

    /// Bits-per-byte estimate on a 0..8 scale. The Miller-Madow corrected
    /// entropy of the field is compared with what random bytes of the same
    /// length would give (or log2 of the length, if lower), so short random
    /// fields score close to 8.0 despite repeated bytes.
    pub fn normalized_entropy(bytes: &[u8]) -> f64 {
        let len = bytes.len();
        if len < 2 {
            return 0.0;
        }
        let reference = Self::expected_uniform_entropy(len).min((len.min(256) as f64).log2());
        let corrected = Self::shannon_entropy(bytes) + Self::miller_madow(Self::distinct_bytes(bytes) as f64, len);
        (corrected / reference * 8.0).min(8.0)
    }

    pub fn shannon_entropy(bytes: &[u8]) -> f64 {
        if bytes.is_empty() {
            return 0.0;
        }
        let total = bytes.len() as f64;
        Self::histogram(bytes)
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| {
                let p = count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    fn histogram(bytes: &[u8]) -> [usize; 256] {
        let mut histogram = [0usize; 256];
        for &b in bytes {
            histogram[b as usize] += 1;
        }
        histogram
    }

    fn distinct_bytes(bytes: &[u8]) -> usize {
        Self::histogram(bytes).iter().filter(|&&count| count > 0).count()
    }

    // Small-sample bias of the plug-in estimate, in bits
    fn miller_madow(occupied: f64, len: usize) -> f64 {
        (occupied - 1.0) / (2.0 * len as f64 * std::f64::consts::LN_2)
    }

    /// Mean corrected entropy of `len` independent uniform bytes. Each byte
    /// value's count is Binomial(len, 1/256).
    fn expected_uniform_entropy(len: usize) -> f64 {
        // Indistinguishable from 8 bits at this length
        if len > UNIFORM_REFERENCE_MAX_LEN {
            return 8.0;
        }
        let n = len as f64;
        let q: f64 = 1.0 / 256.0;
        let odds = q / (1.0 - q);

        let mut pmf = (1.0 - q).powf(n);
        let mut per_symbol = 0.0;
        for k in 1..=len {
            pmf *= (n - k as f64 + 1.0) / k as f64 * odds;
            let share = k as f64 / n;
            per_symbol -= pmf * share * share.log2();
        }

        let occupied = 256.0 * (1.0 - (1.0 - q).powf(n));
        256.0 * per_symbol + Self::miller_madow(occupied, len)
    }

    fn probe_base64(text: &str) -> Option<String> {
        let candidate = text.trim();
        if candidate.len() < 4 || candidate.len() % 4 != 0 || !BASE64_PATTERN.is_match(candidate) {
            return None;
        }
        let decoded = STANDARD.decode(candidate).ok()?;
        let decoded = String::from_utf8_lossy(&decoded).into_owned();
        if decoded.trim().is_empty() {
            None
        } else {
            Some(decoded)
        }
    }

    fn byte_patterns(bytes: &[u8]) -> Vec<FieldAnnotation> {
        let mut annotations = Vec::new();
        if bytes.is_empty() {
            return annotations;
        }

        let len = bytes.len();
        if HASH_LIKE_LENGTHS.contains(&len) {
            annotations.push(FieldAnnotation::new(
                AnnotationKind::HashLikeLength,
                format!("{} bytes, hash-like length", len),
            ));
        } else if len > BLOB_MIN_LENGTH {
            annotations.push(FieldAnnotation::new(
                AnnotationKind::BiometricBlobLength,
                format!("{} bytes, possible biometric or signature data", len),
            ));
        }

        let entropy = Self::normalized_entropy(bytes);
        annotations.push(FieldAnnotation::new(AnnotationKind::Entropy, format!("{:.2}", entropy)));
        if entropy > ENCRYPTED_ENTROPY {
            annotations.push(FieldAnnotation::new(AnnotationKind::LikelyEncrypted, "likely encrypted or random"));
        } else if entropy > COMPRESSED_ENTROPY {
            annotations.push(FieldAnnotation::new(AnnotationKind::LikelyCompressed, "likely compressed or encoded"));
        }

        annotations
    }
}

use encoding_rs::Encoding;
use log::debug;

use crate::models::{CodePageChoice, PayloadField, RecoveredPayload, RecoveredText, TextConfig};
use crate::processing::codepage::{self, latin1_decode};
use crate::utils::ScanResult;

/// Character census of a candidate reinterpretation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScriptScore {
    pub total: usize,
    pub script: usize,
    pub valid: usize,
}

impl ScriptScore {
    pub fn valid_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }

    pub fn script_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.script as f64 / self.total as f64
        }
    }
}

/// Reinterprets decoder bytes as national code page text, keeping the
/// result only when it looks like real text in the target script.
pub struct TextRecoveryEngine {
    encoding: &'static Encoding,
    config: TextConfig,
}

impl TextRecoveryEngine {
    pub fn new(config: TextConfig) -> ScanResult<Self> {
        let encoding = codepage::resolve(&config.target_code_page)?;
        Ok(TextRecoveryEngine { encoding, config })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn recover(&self, bytes: &[u8]) -> RecoveredText {
        if bytes.is_empty() {
            return RecoveredText { text: String::new(), code_page: CodePageChoice::PassThrough };
        }

        let (candidate, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        let score = self.score(&candidate);

        if self.is_plausible(&score) {
            RecoveredText { text: candidate.into_owned(), code_page: CodePageChoice::Target }
        } else {
            RecoveredText { text: latin1_decode(bytes), code_page: CodePageChoice::PassThrough }
        }
    }

    /// Split on the delimiter byte first and recover every field on its
    /// own, so binary trailing fields cannot veto the name fields.
    pub fn recover_payload(&self, bytes: &[u8], delimiter: u8) -> RecoveredPayload {
        let fields: Vec<PayloadField> = bytes
            .split(|&b| b == delimiter)
            .map(|raw| PayloadField { raw: raw.to_vec(), text: self.recover(raw) })
            .collect();

        let accepted = fields.iter().filter(|f| f.text.code_page == CodePageChoice::Target).count();
        debug!(
            "Recovered {} field(s), {} as {}",
            fields.len(),
            accepted,
            self.encoding.name()
        );

        let text = fields
            .iter()
            .map(|f| f.text.text.as_str())
            .collect::<Vec<_>>()
            .join(&(delimiter as char).to_string());

        RecoveredPayload { text, fields }
    }

    pub fn score(&self, text: &str) -> ScriptScore {
        let mut score = ScriptScore::default();
        for c in text.chars() {
            score.total += 1;
            if self.in_script(c) {
                score.script += 1;
                score.valid += 1;
            } else if c.is_whitespace() || c.is_ascii_digit() || matches!(c, '-' | '/' | ',' | '.') {
                score.valid += 1;
            }
        }
        score
    }

    pub fn is_plausible(&self, score: &ScriptScore) -> bool {
        score.script > 0
            && score.valid_ratio() > self.config.min_valid_ratio
            && score.script_ratio() > self.config.min_script_ratio
    }

    fn in_script(&self, c: char) -> bool {
        let code = u32::from(c);
        code >= self.config.script_range_start && code <= self.config.script_range_end
    }
}

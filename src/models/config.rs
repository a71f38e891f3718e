use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::data::SymbolFormat;
use crate::models::rules::AuthorityRules;
use crate::utils::{ScanError, ScanResult};

/// Pipeline configuration, passed to the scanner at construction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub region: RegionConfig,
    pub decoder: DecoderConfig,
    pub orchestrator: OrchestratorConfig,
    pub text: TextConfig,
    pub authority: AuthorityRules,
}

impl ScanConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> ScanResult<Self> {
        serde_json::from_str(raw).map_err(|e| ScanError::Config(format!("Invalid config: {}", e)))
    }
}

/// Tuning for the barcode region proposal stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub max_candidates: usize,
    pub gradient_blur_sigma: f32,
    pub threshold_blur_sigma: f32,
    /// Rectangular closing element (width x height), sized to bar spacing
    pub close_kernel_width: u32,
    pub close_kernel_height: u32,
    pub cleanup_iterations: u8,
    pub min_side: u32,
    pub min_area_ratio: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub padding_ratio: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig {
            max_candidates: 6,
            gradient_blur_sigma: 1.1,
            threshold_blur_sigma: 1.7,
            close_kernel_width: 21,
            close_kernel_height: 7,
            cleanup_iterations: 2,
            min_side: 20,
            min_area_ratio: 0.0005,
            min_aspect: 0.3,
            max_aspect: 1.2,
            padding_ratio: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderBackend {
    Rxing,
    CommandLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliOutputMode {
    /// stdout carries the symbol bytes verbatim
    Raw,
    /// stdout carries the symbol bytes as base64 text
    Base64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub backend: DecoderBackend,
    /// Format that earns the confidence bonus for this document type
    pub expected_format: SymbolFormat,
    pub cli_program: String,
    /// `{input}` is replaced with the path of the image to decode
    pub cli_args: Vec<String>,
    pub cli_output: CliOutputMode,
    pub cli_format: SymbolFormat,
    pub cli_trim_trailing_newline: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            backend: DecoderBackend::Rxing,
            expected_format: SymbolFormat::Pdf417,
            cli_program: "zbarimg".to_string(),
            cli_args: vec![
                "--quiet".to_string(),
                "--raw".to_string(),
                "-Sbinary".to_string(),
                "{input}".to_string(),
            ],
            cli_output: CliOutputMode::Raw,
            cli_format: SymbolFormat::Pdf417,
            cli_trim_trailing_newline: true,
        }
    }
}

/// Photometric enhancements tried after the inversion fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Enhancement {
    Contrast,
    AdaptiveThreshold,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub enhancements: Vec<Enhancement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// encoding_rs label of the national code page
    pub target_code_page: String,
    pub script_range_start: u32,
    pub script_range_end: u32,
    pub min_valid_ratio: f64,
    pub min_script_ratio: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        TextConfig {
            target_code_page: "windows-1256".to_string(),
            script_range_start: 0x0600,
            script_range_end: 0x06FF,
            min_valid_ratio: 0.70,
            min_script_ratio: 0.30,
        }
    }
}

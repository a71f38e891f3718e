use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Command;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;
use log::debug;
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintType, DecodeHintValue, Luma8LuminanceSource, MultiFormatReader,
    Reader, ResultPoint,
};

use crate::models::{CliOutputMode, DecoderBackend, DecoderConfig, RawDecodeResult, SymbolFormat};
use crate::processing::codepage::latin1_encode;
use crate::processing::image::ImageProcessor;
use crate::utils::{ScanError, ScanResult};

/// Decodes one barcode symbol from an image and hands back its bytes
/// untouched. Failures of any kind surface as `None`.
pub trait SymbolDecoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn decode(&self, image: &RgbImage) -> Option<RawDecodeResult>;
}

pub fn decoder_from_config(config: &DecoderConfig) -> Box<dyn SymbolDecoder> {
    match config.backend {
        DecoderBackend::Rxing => Box::new(RxingSymbolDecoder::new(config.expected_format.clone())),
        DecoderBackend::CommandLine => Box::new(CommandLineSymbolDecoder::from_config(config)),
    }
}

/// Start at 50; +20 for text, +20 for four or more locator points, +10 for
/// the expected format; capped at 100.
pub fn confidence_score(has_text: bool, point_count: usize, format: &SymbolFormat, expected: &SymbolFormat) -> u8 {
    let mut score: u32 = 50;
    if has_text {
        score += 20;
    }
    if point_count >= 4 {
        score += 20;
    }
    if format == expected {
        score += 10;
    }
    score.min(100) as u8
}

/// In-process decoder covering the stacked, matrix and linear formats seen
/// on identity cards.
pub struct RxingSymbolDecoder {
    expected_format: SymbolFormat,
    formats: HashSet<BarcodeFormat>,
}

impl RxingSymbolDecoder {
    pub fn new(expected_format: SymbolFormat) -> Self {
        let formats: HashSet<BarcodeFormat> = [
            BarcodeFormat::PDF_417,
            BarcodeFormat::CODE_39,
            BarcodeFormat::CODE_128,
            BarcodeFormat::QR_CODE,
            BarcodeFormat::DATA_MATRIX,
            BarcodeFormat::AZTEC,
        ]
        .into_iter()
        .collect();

        RxingSymbolDecoder { expected_format, formats }
    }

    fn map_format(format: &BarcodeFormat) -> SymbolFormat {
        match format {
            BarcodeFormat::PDF_417 => SymbolFormat::Pdf417,
            BarcodeFormat::QR_CODE => SymbolFormat::QrCode,
            BarcodeFormat::DATA_MATRIX => SymbolFormat::DataMatrix,
            BarcodeFormat::AZTEC => SymbolFormat::Aztec,
            BarcodeFormat::CODE_128 => SymbolFormat::Code128,
            BarcodeFormat::CODE_39 => SymbolFormat::Code39,
            other => SymbolFormat::Other(format!("{:?}", other)),
        }
    }

    fn try_decode(&self, image: &RgbImage) -> Result<RawDecodeResult, String> {
        let (width, height) = image.dimensions();
        let pixels = ImageProcessor::grayscale(image).into_raw();

        let source = Luma8LuminanceSource::new(pixels, width, height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiFormatReader::default();

        let mut hints = HashMap::new();
        hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(self.formats.clone()),
        );

        let result = reader
            .decode_with_hints(&mut bitmap, &hints)
            .map_err(|e| e.to_string())?;

        let text = result.getText();
        let raw = result.getRawBytes();
        // Raw symbol bytes win; decoded text only as a byte-preserving fallback
        let bytes = if raw.is_empty() { latin1_encode(text) } else { raw.to_vec() };

        let points: Vec<(f32, f32)> = result
            .getRXingResultPoints()
            .iter()
            .map(|p| (p.getX(), p.getY()))
            .collect();
        let format = Self::map_format(result.getBarcodeFormat());
        let confidence = confidence_score(!text.trim().is_empty(), points.len(), &format, &self.expected_format);

        debug!(
            "rxing decoded {} ({} raw bytes, {} text chars, confidence {})",
            format,
            raw.len(),
            text.chars().count(),
            confidence
        );

        Ok(RawDecodeResult {
            bytes,
            format,
            locator_points: if points.is_empty() { None } else { Some(points) },
            confidence,
        })
    }
}

impl SymbolDecoder for RxingSymbolDecoder {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &RgbImage) -> Option<RawDecodeResult> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        match catch_unwind(AssertUnwindSafe(|| self.try_decode(image))) {
            Ok(Ok(result)) if !result.bytes.is_empty() => Some(result),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                debug!("rxing: no symbol ({})", e);
                None
            }
            Err(_) => {
                debug!("rxing: decoder panicked on {}x{} image", image.width(), image.height());
                None
            }
        }
    }
}

/// Runs an external barcode tool on a temporary PNG and reads the symbol
/// bytes from its stdout.
pub struct CommandLineSymbolDecoder {
    program: String,
    args: Vec<String>,
    output: CliOutputMode,
    format: SymbolFormat,
    expected_format: SymbolFormat,
    trim_trailing_newline: bool,
}

impl CommandLineSymbolDecoder {
    pub fn from_config(config: &DecoderConfig) -> Self {
        CommandLineSymbolDecoder {
            program: config.cli_program.clone(),
            args: config.cli_args.clone(),
            output: config.cli_output,
            format: config.cli_format.clone(),
            expected_format: config.expected_format.clone(),
            trim_trailing_newline: config.cli_trim_trailing_newline,
        }
    }

    fn run(&self, image: &RgbImage) -> ScanResult<Option<RawDecodeResult>> {
        let temp_file = ImageProcessor::save_to_temp_png(image)?;
        let input = temp_file.path().to_string_lossy().to_string();
        let args: Vec<String> = self.args.iter().map(|arg| arg.replace("{input}", &input)).collect();

        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            debug!("{}: exited with {} (no symbol)", self.program, output.status);
            return Ok(None);
        }

        let bytes = match self.output {
            CliOutputMode::Raw => {
                let mut bytes = output.stdout;
                if self.trim_trailing_newline {
                    if bytes.last() == Some(&b'\n') {
                        bytes.pop();
                    }
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                }
                bytes
            }
            CliOutputMode::Base64 => {
                let encoded = String::from_utf8_lossy(&output.stdout);
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ScanError::Decoder(format!("{} returned invalid base64: {}", self.program, e)))?
            }
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        let confidence = confidence_score(true, 0, &self.format, &self.expected_format);
        Ok(Some(RawDecodeResult {
            bytes,
            format: self.format.clone(),
            locator_points: None,
            confidence,
        }))
    }
}

impl SymbolDecoder for CommandLineSymbolDecoder {
    fn name(&self) -> &'static str {
        "command-line"
    }

    fn decode(&self, image: &RgbImage) -> Option<RawDecodeResult> {
        match self.run(image) {
            Ok(result) => result,
            Err(e) => {
                debug!("{}: {}", self.program, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrchestratorConfig, RegionConfig};
    use crate::processing::codepage::latin1_decode;
    use crate::processing::{DecodeOrchestrator, RegionCandidateFinder};
    use image::Rgb;
    use rxing::{EncodeHintType, EncodeHintValue, MultiFormatWriter, Writer};

    const MODULE_PX: u32 = 3;
    const QUIET_ZONE_PX: u32 = 30;

    fn card_payload() -> Vec<u8> {
        encoding_rs::WINDOWS_1256
            .encode("أحمد#السعيد#عمر#فاطمة#دمشق 20-7-2003#01234567891")
            .0
            .into_owned()
    }

    /// Byte-compacted PDF417 of `bytes` on a white card.
    fn render_pdf417(bytes: &[u8]) -> RgbImage {
        let mut hints = HashMap::new();
        hints.insert(EncodeHintType::CHARACTER_SET, EncodeHintValue::CharacterSet("ISO-8859-1".to_string()));
        hints.insert(EncodeHintType::PDF417_COMPACTION, EncodeHintValue::Pdf417Compaction("2".to_string()));
        hints.insert(EncodeHintType::MARGIN, EncodeHintValue::Margin("0".to_string()));

        let matrix = MultiFormatWriter
            .encode_with_hints(&latin1_decode(bytes), &BarcodeFormat::PDF_417, 0, 0, &hints)
            .unwrap();

        let width = matrix.getWidth() * MODULE_PX + 2 * QUIET_ZONE_PX;
        let height = matrix.getHeight() * MODULE_PX + 2 * QUIET_ZONE_PX;
        RgbImage::from_fn(width, height, |x, y| {
            let inside = x >= QUIET_ZONE_PX
                && y >= QUIET_ZONE_PX
                && x < width - QUIET_ZONE_PX
                && y < height - QUIET_ZONE_PX;
            if inside && matrix.get((x - QUIET_ZONE_PX) / MODULE_PX, (y - QUIET_ZONE_PX) / MODULE_PX) {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn test_rxing_returns_pdf417_bytes_unchanged() {
        let bytes = card_payload();
        assert!(bytes.iter().any(|&b| b >= 0x80));

        let result = RxingSymbolDecoder::new(SymbolFormat::Pdf417)
            .decode(&render_pdf417(&bytes))
            .unwrap();
        assert_eq!(result.bytes, bytes);
        assert_eq!(result.format, SymbolFormat::Pdf417);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_cascade_decodes_rendered_card() {
        let bytes = card_payload();
        let img = render_pdf417(&bytes);
        let (width, height) = img.dimensions();

        let regions = RegionCandidateFinder::new(RegionConfig::default()).find(&img);
        assert!(regions
            .iter()
            .all(|r| r.width > 0 && r.height > 0 && r.x + r.width <= width && r.y + r.height <= height));

        let orchestrator = DecodeOrchestrator::new(
            RegionCandidateFinder::new(RegionConfig::default()),
            Box::new(RxingSymbolDecoder::new(SymbolFormat::Pdf417)),
            OrchestratorConfig::default(),
        );
        let decoded = orchestrator.run(&img).unwrap();
        assert_eq!(decoded.result.bytes, bytes);
        assert_eq!(decoded.result.format, SymbolFormat::Pdf417);

        // Upside down is found by the rotation or frame fallbacks
        let flipped = ImageProcessor::rotate(&img, 180);
        assert_eq!(orchestrator.run(&flipped).unwrap().result.bytes, bytes);
    }

    #[test]
    fn test_confidence_scoring() {
        let pdf = SymbolFormat::Pdf417;
        assert_eq!(confidence_score(false, 0, &SymbolFormat::QrCode, &pdf), 50);
        assert_eq!(confidence_score(true, 0, &SymbolFormat::QrCode, &pdf), 70);
        assert_eq!(confidence_score(true, 3, &pdf, &pdf), 80);
        assert_eq!(confidence_score(true, 4, &pdf, &pdf), 100);
        assert_eq!(confidence_score(false, 8, &pdf, &pdf), 80);
    }

    #[test]
    fn test_rxing_finds_nothing_in_blank_image() {
        let decoder = RxingSymbolDecoder::new(SymbolFormat::Pdf417);
        let img = RgbImage::from_pixel(120, 80, Rgb([255, 255, 255]));
        assert_eq!(decoder.decode(&img), None);
        assert_eq!(decoder.decode(&RgbImage::new(0, 0)), None);
    }

    #[test]
    fn test_backend_selection() {
        let mut config = DecoderConfig::default();
        assert_eq!(decoder_from_config(&config).name(), "rxing");
        config.backend = DecoderBackend::CommandLine;
        assert_eq!(decoder_from_config(&config).name(), "command-line");
    }

    #[cfg(unix)]
    fn shell_decoder(script: &str, output: CliOutputMode) -> CommandLineSymbolDecoder {
        CommandLineSymbolDecoder::from_config(&DecoderConfig {
            backend: DecoderBackend::CommandLine,
            cli_program: "sh".to_string(),
            cli_args: vec!["-c".to_string(), script.to_string(), "{input}".to_string()],
            cli_output: output,
            ..DecoderConfig::default()
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_cli_raw_output_keeps_high_bytes() {
        let decoder = shell_decoder(r"printf 'Ahmad#\307\344\n'", CliOutputMode::Raw);
        let result = decoder.decode(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(result.bytes, vec![b'A', b'h', b'm', b'a', b'd', b'#', 0xC7, 0xE4]);
        assert_eq!(result.format, SymbolFormat::Pdf417);
        assert_eq!(result.confidence, 80);
        assert_eq!(result.locator_points, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_cli_base64_output_is_decoded() {
        let decoder = shell_decoder("echo QWhtYWQjMDEyMzQ1Njc4OTA=", CliOutputMode::Base64);
        let result = decoder.decode(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(result.bytes, b"Ahmad#01234567890".to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn test_cli_receives_image_path() {
        let decoder = shell_decoder(r#"test -s "$0" && printf found"#, CliOutputMode::Raw);
        let result = decoder.decode(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(result.bytes, b"found".to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn test_cli_failure_is_not_found() {
        assert_eq!(shell_decoder("exit 4", CliOutputMode::Raw).decode(&RgbImage::new(4, 4)), None);
        assert_eq!(shell_decoder("printf ''", CliOutputMode::Raw).decode(&RgbImage::new(4, 4)), None);
        assert_eq!(
            shell_decoder("echo '***not base64***'", CliOutputMode::Base64).decode(&RgbImage::new(4, 4)),
            None
        );

        let mut missing = shell_decoder("true", CliOutputMode::Raw);
        missing.program = "definitely-not-a-barcode-tool".to_string();
        assert_eq!(missing.decode(&RgbImage::new(4, 4)), None);
    }
}

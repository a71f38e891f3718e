use std::path::Path;

use image::RgbImage;
use log::{info, warn};
use serde::Serialize;

use crate::models::{IdentityRecord, OrchestratedDecode, RecoveredPayload, ScanConfig, PAYLOAD_DELIMITER};
use crate::processing::{
    decoder_from_config, CancelToken, DecodeOrchestrator, FieldParser, ImageProcessor, RegionCandidateFinder,
    SymbolDecoder, TextRecoveryEngine,
};
use crate::utils::ScanResult;

/// Everything one scan produced, from the decoder hit down to the parsed
/// record. Any level may be missing when the one above it came up empty.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub decode: Option<OrchestratedDecode>,
    pub payload: Option<RecoveredPayload>,
    pub record: Option<IdentityRecord>,
}

impl ScanReport {
    pub fn barcode_found(&self) -> bool {
        self.decode.is_some()
    }
}

pub struct IdScanner {
    orchestrator: DecodeOrchestrator,
    text_engine: TextRecoveryEngine,
    parser: FieldParser,
}

impl IdScanner {
    pub fn new(config: ScanConfig) -> ScanResult<Self> {
        let decoder = decoder_from_config(&config.decoder);
        Self::with_decoder(config, decoder)
    }

    /// Build around a caller-supplied decoder; the config's decoder section
    /// is ignored.
    pub fn with_decoder(config: ScanConfig, decoder: Box<dyn SymbolDecoder>) -> ScanResult<Self> {
        let text_engine = TextRecoveryEngine::new(config.text)?;
        let parser = FieldParser::new(config.authority, text_engine.encoding());
        let orchestrator = DecodeOrchestrator::new(
            RegionCandidateFinder::new(config.region),
            decoder,
            config.orchestrator,
        );

        Ok(IdScanner { orchestrator, text_engine, parser })
    }

    pub fn parser(&self) -> &FieldParser {
        &self.parser
    }

    pub fn scan(&self, image: &RgbImage) -> ScanReport {
        let decode = self.orchestrator.run(image);
        self.finish(decode)
    }

    pub fn scan_cancellable(&self, image: &RgbImage, cancel: &CancelToken) -> ScanResult<ScanReport> {
        let decode = self.orchestrator.run_cancellable(image, cancel)?;
        Ok(self.finish(decode))
    }

    pub fn scan_path(&self, image_path: &Path) -> ScanResult<ScanReport> {
        info!("Scanning {:?} with {}", image_path, self.orchestrator.decoder().name());
        let image = ImageProcessor::load(image_path)?;
        Ok(self.scan(&image))
    }

    /// Skip the image stages and parse bytes already read off a symbol.
    pub fn scan_payload(&self, bytes: &[u8]) -> ScanReport {
        let (payload, record) = self.interpret(bytes);
        ScanReport { decode: None, payload, record }
    }

    fn finish(&self, decode: Option<OrchestratedDecode>) -> ScanReport {
        match decode {
            Some(decode) => {
                let (payload, record) = self.interpret(&decode.result.bytes);
                ScanReport { decode: Some(decode), payload, record }
            }
            None => ScanReport { decode: None, payload: None, record: None },
        }
    }

    fn interpret(&self, bytes: &[u8]) -> (Option<RecoveredPayload>, Option<IdentityRecord>) {
        if bytes.is_empty() {
            warn!("Empty payload, nothing to parse");
            return (None, None);
        }

        let payload = self.text_engine.recover_payload(bytes, PAYLOAD_DELIMITER as u8);
        let record = self.parser.parse_payload(&payload);
        if let Some(record) = &record {
            info!(
                "Parsed {} field(s), national ID {} ({})",
                record.field_count(),
                record.national_id,
                if record.is_valid() { "valid" } else { "invalid" }
            );
        }
        (Some(payload), record)
    }
}

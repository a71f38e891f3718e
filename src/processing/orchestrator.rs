use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbImage;
use log::{debug, info};

use crate::models::{CascadeStage, OrchestratedDecode, OrchestratorConfig, RawDecodeResult, Region};
use crate::processing::decoder::SymbolDecoder;
use crate::processing::image::ImageProcessor;
use crate::processing::region::RegionCandidateFinder;
use crate::utils::{ScanError, ScanResult};

/// Clockwise rotations tried on every candidate region, in order.
pub const CANDIDATE_ROTATIONS: [u16; 4] = [0, 90, 180, 270];

/// Shared flag a caller flips to stop a running cascade at the next stage
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, next: &'static str) -> ScanResult<()> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled(next))
        } else {
            Ok(())
        }
    }
}

/// Tries the decoder on progressively more expensive views of the frame
/// and stops at the first hit: candidate regions (each in four
/// orientations), the whole frame, the inverted frame, then any configured
/// enhancements.
pub struct DecodeOrchestrator {
    finder: RegionCandidateFinder,
    decoder: Box<dyn SymbolDecoder>,
    config: OrchestratorConfig,
}

impl DecodeOrchestrator {
    pub fn new(finder: RegionCandidateFinder, decoder: Box<dyn SymbolDecoder>, config: OrchestratorConfig) -> Self {
        DecodeOrchestrator { finder, decoder, config }
    }

    pub fn decoder(&self) -> &dyn SymbolDecoder {
        self.decoder.as_ref()
    }

    /// `None` means no barcode was found anywhere.
    pub fn run(&self, image: &RgbImage) -> Option<OrchestratedDecode> {
        self.run_cancellable(image, &CancelToken::new()).unwrap_or(None)
    }

    pub fn run_cancellable(&self, image: &RgbImage, cancel: &CancelToken) -> ScanResult<Option<OrchestratedDecode>> {
        cancel.check("region search")?;
        let regions = self.finder.find(image);
        self.run_with_regions(image, &regions, cancel)
    }

    /// The cascade proper, over an already computed candidate list.
    pub fn run_with_regions(
        &self,
        image: &RgbImage,
        regions: &[Region],
        cancel: &CancelToken,
    ) -> ScanResult<Option<OrchestratedDecode>> {
        info!("Trying {} candidate region(s) with {}", regions.len(), self.decoder.name());
        for (index, region) in regions.iter().enumerate() {
            cancel.check("candidate region")?;
            let cropped = ImageProcessor::crop(image, region);
            for rotation in CANDIDATE_ROTATIONS {
                let view = if rotation == 0 { cropped.clone() } else { ImageProcessor::rotate(&cropped, rotation) };
                let stage = CascadeStage::Candidate { index: index + 1, rotation };
                if let Some(found) = self.attempt(&view, stage) {
                    return Ok(Some(found));
                }
            }
        }

        cancel.check("full frame")?;
        info!("Trying full frame");
        if let Some(found) = self.attempt(image, CascadeStage::FullFrame) {
            return Ok(Some(found));
        }

        cancel.check("inverted frame")?;
        info!("Trying inverted frame");
        if let Some(found) = self.attempt(&ImageProcessor::invert(image), CascadeStage::Inverted) {
            return Ok(Some(found));
        }

        for &enhancement in &self.config.enhancements {
            cancel.check("enhanced frame")?;
            info!("Trying {:?} enhancement", enhancement);
            let enhanced = ImageProcessor::enhance(image, enhancement);
            if let Some(found) = self.attempt(&enhanced, CascadeStage::Enhanced(enhancement)) {
                return Ok(Some(found));
            }
        }

        info!("No barcode found");
        Ok(None)
    }

    fn attempt(&self, view: &RgbImage, stage: CascadeStage) -> Option<OrchestratedDecode> {
        match self.decoder.decode(view) {
            Some(result) => {
                Self::log_hit(&result, stage);
                Some(OrchestratedDecode { result, stage })
            }
            None => {
                debug!("No symbol at {}", stage);
                None
            }
        }
    }

    fn log_hit(result: &RawDecodeResult, stage: CascadeStage) {
        info!(
            "Decoded {} ({} bytes, confidence {}) at {}",
            result.format,
            result.bytes.len(),
            result.confidence,
            stage
        );
    }
}

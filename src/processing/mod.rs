pub mod binary_analysis;
pub mod codepage;
pub mod decoder;
pub mod extractors;
pub mod field_parser;
pub mod image;
pub mod orchestrator;
pub mod region;
pub mod text_recovery;

pub use binary_analysis::BinaryFieldAnalyzer;
pub use decoder::{decoder_from_config, CommandLineSymbolDecoder, RxingSymbolDecoder, SymbolDecoder};
pub use field_parser::FieldParser;
pub use image::ImageProcessor;
pub use orchestrator::{CancelToken, DecodeOrchestrator};
pub use region::RegionCandidateFinder;
pub use text_recovery::TextRecoveryEngine;

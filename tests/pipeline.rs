use idscan::models::{CascadeStage, CodePageChoice, RawDecodeResult, ScanConfig, SymbolFormat};
use idscan::processing::{CancelToken, ImageProcessor, SymbolDecoder};
use idscan::utils::ScanError;
use idscan::IdScanner;
use image::{Rgb, RgbImage};

/// Reads a fixed payload, but only off a light-on-dark card (the frame
/// has to be inverted first).
struct InvertedCardDecoder {
    payload: Vec<u8>,
}

impl SymbolDecoder for InvertedCardDecoder {
    fn name(&self) -> &'static str {
        "inverted-card"
    }

    fn decode(&self, image: &RgbImage) -> Option<RawDecodeResult> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || image.get_pixel(0, 0)[0] < 200 {
            return None;
        }
        Some(RawDecodeResult {
            bytes: self.payload.clone(),
            format: SymbolFormat::Pdf417,
            locator_points: Some(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]),
            confidence: 100,
        })
    }
}

fn payload() -> Vec<u8> {
    let (names, _, _) = encoding_rs::WINDOWS_1256.encode("أحمد#السعيد#عمر#فاطمة#دمشق الشام 20-7-2003#");
    let mut bytes = names.into_owned();
    bytes.extend_from_slice(b"01234567890#QUJDRA==#12-3-2019 12-3-2029");
    bytes
}

fn scanner() -> IdScanner {
    IdScanner::with_decoder(ScanConfig::default(), Box::new(InvertedCardDecoder { payload: payload() })).unwrap()
}

fn dark_card() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([20, 20, 20]))
}

#[test]
fn test_scan_image_end_to_end() {
    let report = scanner().scan(&dark_card());

    let decode = report.decode.as_ref().unwrap();
    assert_eq!(decode.stage, CascadeStage::Inverted);
    assert_eq!(decode.result.bytes, payload());

    let recovered = report.payload.as_ref().unwrap();
    assert_eq!(recovered.fields.len(), 8);
    assert_eq!(recovered.fields[0].text.code_page, CodePageChoice::Target);
    assert_eq!(recovered.fields[5].text.code_page, CodePageChoice::PassThrough);

    let record = report.record.as_ref().unwrap();
    assert_eq!(record.first_name, "أحمد");
    assert_eq!(record.father_name, "عمر");
    assert_eq!(record.mother_name, "فاطمة");
    assert_eq!(record.national_id, "01234567890");
    assert_eq!(record.gender.as_deref(), Some("Female"));
    assert!(record.is_valid());
    assert_eq!(record.tentative_dates.issue.as_deref(), Some("12-3-2019"));
    assert_eq!(record.tentative_dates.expiry.as_deref(), Some("12-3-2029"));
    assert_eq!(record.annotations.keys().copied().collect::<Vec<_>>(), vec![6, 7]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["record"]["national_id"], "01234567890");
}

#[test]
fn test_no_symbol_and_empty_symbol() {
    // Mid grey: neither the frame nor its inversion is light enough
    let report = scanner().scan(&RgbImage::from_pixel(64, 48, Rgb([100, 100, 100])));
    assert!(!report.barcode_found());
    assert!(report.record.is_none());

    let scanner = IdScanner::with_decoder(
        ScanConfig::default(),
        Box::new(InvertedCardDecoder { payload: Vec::new() }),
    )
    .unwrap();
    let report = scanner.scan(&dark_card());
    assert!(report.barcode_found());
    assert!(report.payload.is_none());
    assert!(report.record.is_none());
}

#[test]
fn test_scan_path_and_cancellation() {
    let scanner = scanner();
    let file = ImageProcessor::save_to_temp_png(&dark_card()).unwrap();
    let report = scanner.scan_path(file.path()).unwrap();
    assert!(report.record.is_some());

    let missing = scanner.scan_path(std::path::Path::new("no/such/card.png"));
    assert!(matches!(missing, Err(ScanError::ImageLoad { .. })));

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        scanner.scan_cancellable(&dark_card(), &cancel),
        Err(ScanError::Cancelled(_))
    ));
}

use std::path::Path;

use idscan::models::ScanConfig;
use idscan::utils::ScanError;
use idscan::IdScanner;

fn main() -> Result<(), ScanError> {
    env_logger::init();

    println!("ID Payload Demo");
    println!("---------------");

    let scanner = IdScanner::new(ScanConfig::default())?;

    let payload_path = Path::new("test_data/payload.bin");
    let bytes = if payload_path.exists() {
        println!("Reading payload from {:?}...", payload_path);
        std::fs::read(payload_path)?
    } else {
        println!("No payload at {:?}, using a built-in sample.", payload_path);
        sample_payload()
    };

    println!("Parsing {} bytes...", bytes.len());
    let report = scanner.scan_payload(&bytes);

    let Some(record) = report.record else {
        println!("\nNo data in payload.");
        return Ok(());
    };

    println!("\nRECORD:");
    println!("  Name: {}", record.full_name());
    println!("  Mother: {}", record.mother_name);
    println!("  Born: {} ({})", record.birth_place, record.birth_date);
    println!("  National ID: {}", record.national_id);
    println!("  Gender: {}", record.gender.as_deref().unwrap_or("unknown"));
    println!("  Record is {}", if record.is_valid() { "VALID" } else { "INVALID" });

    if let Some(payload) = report.payload {
        println!("\nFIELDS:");
        for (index, field) in payload.fields.iter().enumerate() {
            println!("  {:>2} [{:?}] {}", index, field.text.code_page, field.text.text);
        }
    }

    Ok(())
}

// Windows-1256 names followed by an opaque trailing field
fn sample_payload() -> Vec<u8> {
    let (names, _, _) = encoding_rs::WINDOWS_1256.encode("أحمد#السعيد#عمر#فاطمة#دمشق الشام 20-7-2003#");
    let mut bytes = names.into_owned();
    bytes.extend_from_slice(b"01234567891#20210105 20310105");
    bytes
}

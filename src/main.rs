// National ID barcode scanner
// Finds the card's barcode, decodes it and prints the parsed identity record

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use idscan::{
    models::{DecoderBackend, ScanConfig, ValidationIssue, ValidationIssueType},
    utils::{ScanError, ScanResult},
    validation::{ExpiryValidator, RecordValidator},
    IdScanner, ScanReport,
};
use log::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DecoderArg {
    Rxing,
    CommandLine,
}

impl From<DecoderArg> for DecoderBackend {
    fn from(arg: DecoderArg) -> Self {
        match arg {
            DecoderArg::Rxing => DecoderBackend::Rxing,
            DecoderArg::CommandLine => DecoderBackend::CommandLine,
        }
    }
}

#[derive(Parser)]
#[command(name = "idscan", version, about = "Scan national ID card barcodes")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Barcode decoder backend (overrides the configuration)
    #[arg(short, long, value_enum)]
    decoder: Option<DecoderArg>,

    /// Print each report as JSON
    #[arg(long)]
    json: bool,

    /// Inputs are raw barcode payloads, not images
    #[arg(long)]
    payload: bool,

    /// Images (or payload files with --payload) to scan
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn issue_tag(issue: &ValidationIssue) -> &'static str {
    match issue.issue_type {
        ValidationIssueType::MissingField => "MISSING",
        ValidationIssueType::NationalId => "NATIONAL ID",
        ValidationIssueType::BirthDate => "BIRTH DATE",
        ValidationIssueType::Expiry => "EXPIRY",
    }
}

// Function to print a detailed scan report
fn print_detailed_report(path: &Path, report: &ScanReport, scanner: &IdScanner) {
    println!("\n===============================================");
    println!("      ID CARD SCAN REPORT: {}", path.display());
    println!("===============================================\n");

    match &report.decode {
        Some(decode) => {
            println!("BARCODE:");
            println!("  Format: {}", decode.result.format);
            println!("  Found at: {}", decode.stage);
            println!("  Bytes: {}", decode.result.bytes.len());
            println!("  Confidence: {}", decode.result.confidence);
        }
        None if report.payload.is_some() => println!("BARCODE: (payload file)"),
        None => {
            println!("No barcode found.");
            return;
        }
    }

    let Some(record) = &report.record else {
        println!("\nNo data in barcode payload.");
        return;
    };

    println!("\nIDENTITY:");
    println!("  First Name: {}", record.first_name);
    println!("  Family Name: {}", record.family_name);
    println!("  Father's Name: {}", record.father_name);
    println!("  Mother's Name: {}", record.mother_name);
    println!("  Full Name: {}", record.full_name());
    println!("  Place of Birth: {}", record.birth_place);
    println!("  Date of Birth: {}", record.birth_date);
    println!("  National ID: {}", record.national_id);
    println!("  Gender: {}", record.gender.as_deref().unwrap_or("unknown"));
    println!("  Fields: {}", record.field_count());

    if !record.annotations.is_empty() {
        println!("\nADDITIONAL FIELDS (heuristic):");
        for (index, annotations) in &record.annotations {
            println!("  Field {}:", index);
            for annotation in annotations {
                println!("    - {:?}: {}", annotation.kind, annotation.detail);
            }
        }
    }

    if let Some(issue) = &record.tentative_dates.issue {
        println!("  Tentative Date of Issue: {}", issue);
    }
    if let Some(expiry) = &record.tentative_dates.expiry {
        println!("  Tentative Date of Expiry: {}", expiry);
    }

    let validation = RecordValidator::validate(record, scanner.parser().rules());
    let expiry = ExpiryValidator::check_today(&record.tentative_dates);
    let issues: Vec<&ValidationIssue> = validation.issues.iter().chain(expiry.issues.iter()).collect();
    if !issues.is_empty() {
        println!("\nISSUES FOUND:");
        for issue in issues {
            println!("  - [{}] {}", issue_tag(issue), issue.message);
        }
    }

    println!(
        "\nRecord: {}",
        if record.is_valid() { "VALID" } else { "INVALID" }
    );
}

fn scan_one(scanner: &IdScanner, path: &Path, payload: bool) -> ScanResult<ScanReport> {
    if payload {
        let bytes = std::fs::read(path)?;
        Ok(scanner.scan_payload(&bytes))
    } else {
        scanner.scan_path(path)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(decoder) = args.decoder {
        config.decoder.backend = decoder.into();
    }

    let scanner = IdScanner::new(config)?;

    for path in &args.images {
        info!("Processing {:?}", path);

        // One worker per file keeps the main thread free; files go one at a time
        let outcome = std::thread::scope(|s| {
            s.spawn(|| scan_one(&scanner, path, args.payload))
                .join()
                .unwrap_or_else(|_| Err(ScanError::Decoder(format!("worker panicked on {:?}", path))))
        });

        match outcome {
            Ok(report) if args.json => println!("{}", serde_json::to_string_pretty(&report)?),
            Ok(report) => print_detailed_report(path, &report, &scanner),
            Err(err) => error!("Error scanning {:?}: {}", path, err),
        }
    }

    Ok(())
}

pub mod id_scanner;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;

pub use id_scanner::{IdScanner, ScanReport};

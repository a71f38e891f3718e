pub mod error;

pub use error::{ScanError, ScanResult};

pub mod expiry;
pub mod record;

pub use expiry::ExpiryValidator;
pub use record::RecordValidator;

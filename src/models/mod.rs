pub mod config;
pub mod data;
pub mod rules;

pub use config::*;
pub use data::*;
pub use rules::*;

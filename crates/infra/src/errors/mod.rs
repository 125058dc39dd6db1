//! Infrastructure error conversions

mod conversions;

pub use conversions::{error_for_response, InfraError};

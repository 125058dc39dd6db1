//! Report generation: status parsing, trigger service and its ports

pub mod ports;
pub mod service;
pub mod status;

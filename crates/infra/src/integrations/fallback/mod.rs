//! Smart-fallback edge function client

mod client;

pub use client::SmartFallbackClient;

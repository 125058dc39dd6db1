//! HTTP transport shared by every remote adapter

mod client;

pub use client::{HttpClient, HttpClientBuilder};

//! Report generation workflow (n8n webhook) client

mod client;

pub use client::N8nWorkflowClient;

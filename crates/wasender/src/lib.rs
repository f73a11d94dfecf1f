//! WASender WhatsApp API client library.
//!
//! This crate provides a Rust client for the WASender HTTP API. It supports:
//!
//! - Sending text and media messages
//! - Checking whether a number is registered on WhatsApp
//! - Listing and looking up contacts
//! - Decoding the webhook payloads WASender posts for incoming messages
//!
//! # Example
//!
//! ```no_run
//! use wasender::{SendMessageRequest, WaSenderClient, WaSenderConfig};
//!
//! # async fn example() -> Result<(), wasender::WaSenderError> {
//! let config = WaSenderConfig::new("https://www.wasenderapi.com", "api-key");
//! let client = WaSenderClient::new(config)?;
//!
//! let sent = client
//!     .send_message(&SendMessageRequest::text("+31612345678", "Hallo!"))
//!     .await?;
//! println!("accepted: {}", sent.success);
//!
//! let registered = client.on_whatsapp("31612345678@s.whatsapp.net").await?;
//! println!("on WhatsApp: {}", registered);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::WaSenderClient;
pub use config::WaSenderConfig;
pub use error::WaSenderError;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

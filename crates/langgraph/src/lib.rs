//! Client for a LangGraph-compatible agent runtime.
//!
//! Covers the small part of the platform API the admin backend uses:
//! threads, blocking runs and assistant management.
//!
//! # Example
//!
//! ```no_run
//! use langgraph::{LangGraphClient, LangGraphConfig, RunRequest, ThreadMetadata};
//!
//! # async fn example() -> Result<(), langgraph::LangGraphError> {
//! let client = LangGraphClient::new(LangGraphConfig::from_env()?)?;
//! let thread_id = client.create_thread(&ThreadMetadata::whatsapp("user-1")).await?;
//! let request = RunRequest::user_message(&client.config().assistant_id, "Waar is melk goedkoop?");
//! let reply = client.run_wait(&thread_id, &request).await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{LangGraphClient, NO_RESPONSE};
pub use config::LangGraphConfig;
pub use error::LangGraphError;
pub use types::*;

//! draftloop - interactive document drafting
//!
//! Given a document type, draftloop asks a text generator for a template,
//! collects the user's details, produces a draft, and revises it on
//! feedback until the user says they are satisfied.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`] - Session data model and the drafting state machine
//! - [`generator`] - Text generation backends behind the [`Generator`] trait
//! - [`channel`] - Human input behind the [`UserChannel`] trait
//! - [`prompts`] - Prompt composition for each generating state
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Scripted test doubles for both collaborators
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use draftloop::{create_generator, DraftConfig, SessionController, TerminalChannel};
//!
//! let config = DraftConfig::load(".".as_ref())?;
//! let generator = create_generator(&config.generator)?;
//! let channel = Arc::new(TerminalChannel::stdio());
//!
//! let mut controller = SessionController::new("invoice", generator, channel)
//!     .with_predicate(config.predicate());
//! let session = controller.run().await?;
//! println!("{}", session.document());
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod generator;
pub mod prompts;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use error::{DraftError, Result};

pub use channel::{ChannelError, TerminalChannel, UserChannel};
pub use config::DraftConfig;
pub use generator::{create_generator, Generator, GeneratorConfig, GeneratorError};
pub use session::{
    KeywordPredicate, Role, SatisfactionPredicate, Session, SessionController, SessionState,
    TranscriptEntry,
};

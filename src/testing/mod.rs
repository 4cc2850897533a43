//! Testing infrastructure for draftloop.
//!
//! Test doubles for the two capabilities a session consumes, so the state
//! machine can be exercised without a model API or a terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use draftloop::session::SessionController;
//! use draftloop::testing::{ScriptedChannel, ScriptedGenerator};
//!
//! let generator = Arc::new(
//!     ScriptedGenerator::new()
//!         .then_respond("T")
//!         .then_respond("Q")
//!         .then_respond("D1")
//!         .then_respond("Any feedback?"),
//! );
//! let channel = Arc::new(ScriptedChannel::new(["Client: Acme", "looks good"]));
//!
//! let mut controller = SessionController::new("invoice", generator, channel);
//! let session = controller.run().await?;
//! assert_eq!(session.document(), "D1");
//! ```

pub mod mocks;

pub use mocks::*;

//! Call dispatch.
//!
//! Classifies inbound call names and routes them to the owning namespace's
//! upstream execution context.

pub mod classify;
pub mod dispatcher;
pub mod outcome;

pub use classify::{classify, CallKind};
pub use dispatcher::Dispatcher;
pub use outcome::ExecutionOutcome;

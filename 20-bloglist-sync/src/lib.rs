//! Client-side state synchronization for small CRUD list apps.
//!
//! A blog list or anecdote board keeps a local, rank-ordered copy of the
//! backend's records. User actions go to the backend first; only confirmed
//! results reach the local copy, and each outcome posts a short-lived status
//! message. Each module covers one concern:
//!
//! - [`resource`] defines the record types (`Blog`, `Anecdote`) and the
//!   [`resource::Resource`] trait the rest of the crate is generic over.
//! - [`store`] holds the observable, rank-ordered collection.
//! - [`gateway`] talks to the REST backend and classifies failures.
//! - [`notification`] keeps the single auto-expiring status message.
//! - [`session`] owns the bearer credential and persists it between runs.
//! - [`board`] composes the pieces into user-level actions.
//! - [`server`] is an in-memory reference backend used by the CLI and tests.
//! - [`cli`] and [`shell`] provide the command-line front end.

pub mod board;
pub mod cli;
pub mod error;
pub mod gateway;
pub mod notification;
pub mod resource;
pub mod server;
pub mod session;
pub mod shell;
pub mod store;

pub use error::{Error, Result};

//! Domain logic for the batch video-generation worker.
//!
//! Pure functions and constants with no internal crate dependencies, shared
//! by the repository layer, the worker pipeline and the HTTP API.

pub mod callback;
pub mod error;
pub mod failure;
pub mod settlement;
pub mod signing;
pub mod types;
pub mod video_model;

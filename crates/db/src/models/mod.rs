//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are created by this crate, a create DTO.

pub mod batch_job;
pub mod credit;
pub mod status;
pub mod video_task;

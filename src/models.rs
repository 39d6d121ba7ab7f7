//! Board domain model: stories, tasks, phases, milestones, and the API
//! payloads built from them.
//!
//! Entities mirror the board's relational schema (integer ids, parent-id
//! foreign keys, ISO-8601 timestamp strings assigned by the store).

mod entities;
mod requests;

pub use entities::*;
pub use requests::*;

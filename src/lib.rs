//! Enrollment of school students in weekly therapy sessions, and their attendance.
//!
//! [`manager::RosterManager`] owns the `sqlite3` database. Schedule collisions within a student's
//! set of sessions are detected by [`schedule::check_schedule`].

pub mod cli;
pub mod display;
pub mod error;
pub mod manager;
pub mod models;
pub mod roster;
pub mod schedule;
pub mod schema;
pub mod settings;

pub use error::{StoreError, StoreResult};
pub use manager::RosterManager;
pub use settings::Settings;

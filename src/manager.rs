use crate::error::{StoreError, StoreResult};
use crate::schema;
use crate::settings::Settings;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::{debug, info};

mod attendance;
mod catalog;
mod queries;
mod students;

pub use attendance::{RollCall, RollCallEntry, RollCallQuery};
pub use catalog::NameFilter;
pub use queries::{DashboardFilter, ScheduleRow, StudentFilter, StudentRow};

/// The kinds of record that can be archived, restored, and permanently deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordKind {
    School,
    Diagnosis,
    Therapy,
    Student,
}

impl RecordKind {
    pub fn entity(self) -> &'static str {
        match self {
            RecordKind::School => "school",
            RecordKind::Diagnosis => "diagnosis",
            RecordKind::Therapy => "therapy",
            RecordKind::Student => "student",
        }
    }

    fn not_found(self, id: i32) -> StoreError {
        StoreError::NotFound {
            entity: self.entity(),
            id,
        }
    }
}

/// The manager for recording, modifying, and retrieving enrollment and attendance data.
pub struct RosterManager {
    db: SqliteConnection,
}

impl RosterManager {
    /// Opens the `sqlite3` database at `database_url`, creating any missing tables.
    pub fn open(database_url: &str) -> StoreResult<Self> {
        let mut db =
            SqliteConnection::establish(database_url).map_err(|source| StoreError::Connection {
                url: database_url.to_string(),
                source,
            })?;

        db.batch_execute("PRAGMA foreign_keys = ON;")?;
        db.batch_execute(schema::CREATE_TABLES)?;

        debug!(database_url, "opened roster database");

        Ok(Self { db })
    }

    /// Opens the database named by the loaded [`Settings`].
    pub fn connect(settings: &Settings) -> StoreResult<Self> {
        Self::open(&settings.database.url)
    }

    /// A private database that disappears when the manager is dropped.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(":memory:")
    }

    /// Archives a record. Archived records stay in the database and can be restored.
    pub fn archive(&mut self, kind: RecordKind, record_id: i32) -> StoreResult<()> {
        self.set_active(kind, record_id, false)
    }

    /// Brings an archived record back into the active lists.
    pub fn restore(&mut self, kind: RecordKind, record_id: i32) -> StoreResult<()> {
        self.set_active(kind, record_id, true)
    }

    fn set_active(&mut self, kind: RecordKind, record_id: i32, active: bool) -> StoreResult<()> {
        use schema::{diagnoses, schools, students, therapies};

        let updated = match kind {
            RecordKind::School => diesel::update(schools::table.find(record_id))
                .set(schools::active.eq(active))
                .execute(&mut self.db)?,
            RecordKind::Diagnosis => diesel::update(diagnoses::table.find(record_id))
                .set(diagnoses::active.eq(active))
                .execute(&mut self.db)?,
            RecordKind::Therapy => diesel::update(therapies::table.find(record_id))
                .set(therapies::active.eq(active))
                .execute(&mut self.db)?,
            RecordKind::Student => diesel::update(students::table.find(record_id))
                .set(students::active.eq(active))
                .execute(&mut self.db)?,
        };

        if updated == 0 {
            return Err(kind.not_found(record_id));
        }

        info!(kind = kind.entity(), id = record_id, active, "updated active flag");
        Ok(())
    }

    /// Removes a record for good and returns its name.
    ///
    /// Schools, diagnoses, and therapies that are still referenced are left untouched and a
    /// [`StoreError::ReferentialBlock`] is returned. Deleting a student also deletes its
    /// enrollments and their attendance.
    pub fn delete_permanently(&mut self, kind: RecordKind, record_id: i32) -> StoreResult<String> {
        let name = match kind {
            RecordKind::School => self.delete_school(record_id),
            RecordKind::Diagnosis => self.delete_diagnosis(record_id),
            RecordKind::Therapy => self.delete_therapy(record_id),
            RecordKind::Student => self.delete_student(record_id),
        }?;

        info!(kind = kind.entity(), id = record_id, %name, "permanently deleted");
        Ok(name)
    }
}

/// Trims `value` and rejects it if nothing is left.
fn required(field: &'static str, value: &str) -> StoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::invalid(field, "must not be blank"));
    }
    Ok(value.to_string())
}

/// Trims an optional value, treating a blank one as absent.
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// A `LIKE` pattern matching any value that contains `needle`.
fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim())
}

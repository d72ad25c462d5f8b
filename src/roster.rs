//! Bulk student import from a CSV roster.
//!
//! The roster has a header row with the columns `full_name`, `school`, `grade`, `transport`, and
//! `diagnosis`. Schools and diagnoses are referenced by name and must already exist.

use crate::manager::RosterManager;
use crate::models::{GradeLevel, Student, StudentForm};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterRow {
    pub full_name: String,
    pub school: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub transport: Option<bool>,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

/// Reads every row of a roster file.
pub fn read_roster(path: impl AsRef<Path>) -> Result<Vec<RosterRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open roster {}", path.display()))?;

    parse_roster(file)
}

pub fn parse_roster(input: impl Read) -> Result<Vec<RosterRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);

    reader
        .deserialize::<RosterRow>()
        .enumerate()
        // Row 1 is the header.
        .map(|(index, row)| row.with_context(|| format!("malformed roster row {}", index + 2)))
        .collect()
}

/// Creates one student per row, in order. The first row that fails stops the import; students
/// created from earlier rows are kept.
pub fn import_roster(
    manager: &mut RosterManager,
    rows: &[RosterRow],
    today: NaiveDate,
) -> Result<Vec<Student>> {
    let mut created = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let line = index + 2;
        let form = resolve_row(manager, row).with_context(|| format!("roster row {line}"))?;

        let student = manager
            .create_student(&form, &[], today)
            .with_context(|| format!("roster row {line}"))?;
        created.push(student);
    }

    Ok(created)
}

fn resolve_row(manager: &mut RosterManager, row: &RosterRow) -> Result<StudentForm> {
    let school = manager
        .find_school(&row.school)?
        .ok_or_else(|| anyhow!("unknown school `{}`", row.school))?;

    let diagnosis_id = match row.diagnosis.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(
            manager
                .find_diagnosis(name)?
                .ok_or_else(|| anyhow!("unknown diagnosis `{name}`"))?
                .id,
        ),
    };

    let grade = match row.grade.as_deref().map(str::trim) {
        None | Some("") => GradeLevel::default(),
        Some(grade) => grade.parse().map_err(|err: String| anyhow!(err))?,
    };

    Ok(StudentForm {
        full_name: row.full_name.clone(),
        school_id: school.id,
        grade,
        transport: row.transport.unwrap_or(false),
        diagnosis_id,
    })
}

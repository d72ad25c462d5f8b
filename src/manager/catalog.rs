//! Schools, diagnoses, and therapies: the reference lists students and enrollments point at.

use super::{RecordKind, RosterManager, contains_pattern, optional, required};
use crate::error::{StoreError, StoreResult, on_unique_violation};
use crate::models::{Diagnosis, DiagnosisForm, School, SchoolForm, Therapy, TherapyForm};
use crate::schema::{diagnoses, enrollments, schools, students, therapies};
use diesel::prelude::*;
use tracing::info;

/// Which records a listing returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    /// List archived records instead of active ones.
    pub archived: bool,
    /// Only keep records whose name contains this text, ignoring case.
    pub name: Option<String>,
}

impl NameFilter {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn archived() -> Self {
        Self {
            archived: true,
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            archived: false,
            name: Some(name.into()),
        }
    }

    fn pattern(&self) -> Option<String> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(contains_pattern)
    }
}

impl RosterManager {
    pub fn create_school(&mut self, form: &SchoolForm) -> StoreResult<School> {
        let form = SchoolForm {
            name: required("name", &form.name)?,
        };

        let school = diesel::insert_into(schools::table)
            .values(&form)
            .returning(School::as_returning())
            .get_result(&mut self.db)
            .map_err(on_unique_violation("school", "name", &form.name))?;

        info!(id = school.id, name = %school.name, "created school");
        Ok(school)
    }

    pub fn update_school(&mut self, school_id: i32, form: &SchoolForm) -> StoreResult<School> {
        let form = SchoolForm {
            name: required("name", &form.name)?,
        };

        diesel::update(schools::table.find(school_id))
            .set(&form)
            .returning(School::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(on_unique_violation("school", "name", &form.name))?
            .ok_or_else(|| RecordKind::School.not_found(school_id))
    }

    pub fn school(&mut self, school_id: i32) -> StoreResult<School> {
        schools::table
            .find(school_id)
            .select(School::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| RecordKind::School.not_found(school_id))
    }

    /// Looks a school up by its exact name.
    pub fn find_school(&mut self, school_name: &str) -> StoreResult<Option<School>> {
        Ok(schools::table
            .filter(schools::name.eq(school_name.trim()))
            .select(School::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Lists schools ordered by name.
    pub fn schools(&mut self, filter: &NameFilter) -> StoreResult<Vec<School>> {
        let mut query = schools::table
            .filter(schools::active.eq(!filter.archived))
            .order(schools::name.asc())
            .select(School::as_select())
            .into_boxed();

        if let Some(pattern) = filter.pattern() {
            query = query.filter(schools::name.like(pattern));
        }

        Ok(query.load(&mut self.db)?)
    }

    pub(super) fn delete_school(&mut self, school_id: i32) -> StoreResult<String> {
        self.db.immediate_transaction(|conn| {
            let school = schools::table
                .find(school_id)
                .select(School::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| RecordKind::School.not_found(school_id))?;

            let count: i64 = students::table
                .filter(students::school_id.eq(school_id))
                .count()
                .get_result(conn)?;

            if count > 0 {
                return Err(StoreError::ReferentialBlock {
                    entity: "school",
                    name: school.name,
                    dependents: "students",
                    count,
                });
            }

            diesel::delete(schools::table.find(school_id)).execute(conn)?;
            Ok(school.name)
        })
    }

    pub fn create_diagnosis(&mut self, form: &DiagnosisForm) -> StoreResult<Diagnosis> {
        let form = DiagnosisForm {
            name: required("name", &form.name)?,
            code: optional(form.code.as_deref()),
        };

        let diagnosis = diesel::insert_into(diagnoses::table)
            .values(&form)
            .returning(Diagnosis::as_returning())
            .get_result(&mut self.db)
            .map_err(on_unique_violation("diagnosis", "name", &form.name))?;

        info!(id = diagnosis.id, name = %diagnosis.name, "created diagnosis");
        Ok(diagnosis)
    }

    pub fn update_diagnosis(
        &mut self,
        diagnosis_id: i32,
        form: &DiagnosisForm,
    ) -> StoreResult<Diagnosis> {
        let form = DiagnosisForm {
            name: required("name", &form.name)?,
            code: optional(form.code.as_deref()),
        };

        diesel::update(diagnoses::table.find(diagnosis_id))
            .set(&form)
            .returning(Diagnosis::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(on_unique_violation("diagnosis", "name", &form.name))?
            .ok_or_else(|| RecordKind::Diagnosis.not_found(diagnosis_id))
    }

    pub fn diagnosis(&mut self, diagnosis_id: i32) -> StoreResult<Diagnosis> {
        diagnoses::table
            .find(diagnosis_id)
            .select(Diagnosis::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| RecordKind::Diagnosis.not_found(diagnosis_id))
    }

    /// Looks a diagnosis up by its exact name or, failing that, its code.
    pub fn find_diagnosis(&mut self, name_or_code: &str) -> StoreResult<Option<Diagnosis>> {
        let needle = name_or_code.trim();

        let by_name = diagnoses::table
            .filter(diagnoses::name.eq(needle))
            .select(Diagnosis::as_select())
            .first(&mut self.db)
            .optional()?;
        if by_name.is_some() {
            return Ok(by_name);
        }

        Ok(diagnoses::table
            .filter(diagnoses::code.eq(needle))
            .order(diagnoses::id.asc())
            .select(Diagnosis::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Lists diagnoses ordered by name.
    pub fn diagnoses(&mut self, filter: &NameFilter) -> StoreResult<Vec<Diagnosis>> {
        let mut query = diagnoses::table
            .filter(diagnoses::active.eq(!filter.archived))
            .order(diagnoses::name.asc())
            .select(Diagnosis::as_select())
            .into_boxed();

        if let Some(pattern) = filter.pattern() {
            query = query.filter(diagnoses::name.like(pattern));
        }

        Ok(query.load(&mut self.db)?)
    }

    pub(super) fn delete_diagnosis(&mut self, diagnosis_id: i32) -> StoreResult<String> {
        self.db.immediate_transaction(|conn| {
            let diagnosis = diagnoses::table
                .find(diagnosis_id)
                .select(Diagnosis::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| RecordKind::Diagnosis.not_found(diagnosis_id))?;

            let count: i64 = students::table
                .filter(students::diagnosis_id.eq(diagnosis_id))
                .count()
                .get_result(conn)?;

            if count > 0 {
                return Err(StoreError::ReferentialBlock {
                    entity: "diagnosis",
                    name: diagnosis.name,
                    dependents: "students",
                    count,
                });
            }

            diesel::delete(diagnoses::table.find(diagnosis_id)).execute(conn)?;
            Ok(diagnosis.name)
        })
    }

    pub fn create_therapy(&mut self, form: &TherapyForm) -> StoreResult<Therapy> {
        let form = TherapyForm {
            name: required("name", &form.name)?,
            code: optional(form.code.as_deref()),
            color: form.color,
        };

        let therapy = diesel::insert_into(therapies::table)
            .values(&form)
            .returning(Therapy::as_returning())
            .get_result(&mut self.db)
            .map_err(on_unique_violation("therapy", "name", &form.name))?;

        info!(id = therapy.id, name = %therapy.name, "created therapy");
        Ok(therapy)
    }

    pub fn update_therapy(&mut self, therapy_id: i32, form: &TherapyForm) -> StoreResult<Therapy> {
        let form = TherapyForm {
            name: required("name", &form.name)?,
            code: optional(form.code.as_deref()),
            color: form.color,
        };

        diesel::update(therapies::table.find(therapy_id))
            .set(&form)
            .returning(Therapy::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(on_unique_violation("therapy", "name", &form.name))?
            .ok_or_else(|| RecordKind::Therapy.not_found(therapy_id))
    }

    pub fn therapy(&mut self, therapy_id: i32) -> StoreResult<Therapy> {
        therapy_by_id(&mut self.db, therapy_id)
    }

    /// Looks a therapy up by its exact name or, failing that, its short code.
    pub fn find_therapy(&mut self, name_or_code: &str) -> StoreResult<Option<Therapy>> {
        let needle = name_or_code.trim();

        let by_name = therapies::table
            .filter(therapies::name.eq(needle))
            .select(Therapy::as_select())
            .first(&mut self.db)
            .optional()?;
        if by_name.is_some() {
            return Ok(by_name);
        }

        Ok(therapies::table
            .filter(therapies::code.eq(needle))
            .order(therapies::id.asc())
            .select(Therapy::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Lists therapies ordered by name.
    pub fn therapies(&mut self, filter: &NameFilter) -> StoreResult<Vec<Therapy>> {
        let mut query = therapies::table
            .filter(therapies::active.eq(!filter.archived))
            .order(therapies::name.asc())
            .select(Therapy::as_select())
            .into_boxed();

        if let Some(pattern) = filter.pattern() {
            query = query.filter(therapies::name.like(pattern));
        }

        Ok(query.load(&mut self.db)?)
    }

    pub(super) fn delete_therapy(&mut self, therapy_id: i32) -> StoreResult<String> {
        self.db.immediate_transaction(|conn| {
            let therapy = therapy_by_id(conn, therapy_id)?;

            let count: i64 = enrollments::table
                .filter(enrollments::therapy_id.eq(therapy_id))
                .count()
                .get_result(conn)?;

            if count > 0 {
                return Err(StoreError::ReferentialBlock {
                    entity: "therapy",
                    name: therapy.name,
                    dependents: "enrollments",
                    count,
                });
            }

            diesel::delete(therapies::table.find(therapy_id)).execute(conn)?;
            Ok(therapy.name)
        })
    }
}

pub(super) fn therapy_by_id(conn: &mut SqliteConnection, therapy_id: i32) -> StoreResult<Therapy> {
    therapies::table
        .find(therapy_id)
        .select(Therapy::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| RecordKind::Therapy.not_found(therapy_id))
}

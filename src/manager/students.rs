//! Students and their weekly enrollment sets.

use super::catalog::therapy_by_id;
use super::{RecordKind, RosterManager, required};
use crate::error::{StoreError, StoreResult, on_unique_violation};
use crate::models::{
    Enrollment, EnrollmentChanges, EnrollmentDraft, EnrollmentStatus, NewEnrollment, Student,
    StudentForm, Therapy, Weekday,
};
use crate::schedule::{ScheduleEntry, check_schedule};
use crate::schema::{attendance, counters, diagnoses, enrollments, schools, students};
use chrono::{NaiveDate, NaiveTime};
use diesel::dsl::max;
use diesel::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Name of the counter holding the highest enrollment number ever issued.
const ENROLLMENT_NUMBER_COUNTER: &str = "student_enrollment_number";

impl RosterManager {
    /// Creates a student together with its initial enrollments.
    ///
    /// The whole submission is rejected if the enrollments collide with each other, and nothing is
    /// written in that case. The new student receives the next enrollment number.
    pub fn create_student(
        &mut self,
        form: &StudentForm,
        drafts: &[EnrollmentDraft],
        today: NaiveDate,
    ) -> StoreResult<Student> {
        let form = clean_form(form)?;

        let student = self
            .db
            .immediate_transaction(|conn| -> StoreResult<Student> {
                check_references(conn, &form)?;
                let plan = plan_enrollments(conn, &[], drafts)?;

                let number = next_enrollment_number(conn)?;
                let student = diesel::insert_into(students::table)
                    .values((&form, students::enrollment_number.eq(number)))
                    .returning(Student::as_returning())
                    .get_result(conn)?;

                apply_plan(conn, student.id, plan, today)?;
                Ok(student)
            })
            .inspect_err(|err| debug!(%err, "rejected new student"))?;

        info!(
            id = student.id,
            number = student.enrollment_number,
            name = %student.full_name,
            "created student"
        );
        Ok(student)
    }

    /// Updates a student's fields and applies a set of enrollment changes in one step.
    ///
    /// Existing enrollments that no draft mentions are kept as they are and still take part in
    /// the schedule check.
    pub fn update_student(
        &mut self,
        student_id: i32,
        form: &StudentForm,
        drafts: &[EnrollmentDraft],
        today: NaiveDate,
    ) -> StoreResult<Student> {
        let form = clean_form(form)?;

        let student = self
            .db
            .immediate_transaction(|conn| -> StoreResult<Student> {
                let existing: Vec<Enrollment> = enrollments::table
                    .filter(enrollments::student_id.eq(student_id))
                    .order(enrollments::id.asc())
                    .select(Enrollment::as_select())
                    .load(conn)?;

                let student = diesel::update(students::table.find(student_id))
                    .set(&form)
                    .returning(Student::as_returning())
                    .get_result(conn)
                    .optional()?
                    .ok_or_else(|| RecordKind::Student.not_found(student_id))?;

                check_references(conn, &form)?;
                let plan = plan_enrollments(conn, &existing, drafts)?;
                apply_plan(conn, student.id, plan, today)?;
                Ok(student)
            })
            .inspect_err(|err| debug!(student_id, %err, "rejected student update"))?;

        info!(id = student.id, name = %student.full_name, "updated student");
        Ok(student)
    }

    pub fn student(&mut self, student_id: i32) -> StoreResult<Student> {
        students::table
            .find(student_id)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| RecordKind::Student.not_found(student_id))
    }

    /// A student's enrollments with their therapies, ordered by weekday and start time.
    pub fn student_enrollments(&mut self, student_id: i32) -> StoreResult<Vec<(Enrollment, Therapy)>> {
        use crate::schema::therapies;

        let mut rows: Vec<(Enrollment, Therapy)> = enrollments::table
            .inner_join(therapies::table)
            .filter(enrollments::student_id.eq(student_id))
            .select((Enrollment::as_select(), Therapy::as_select()))
            .load(&mut self.db)?;

        rows.sort_by_key(|(enrollment, _)| (enrollment.weekday, enrollment.start_time));
        Ok(rows)
    }

    pub(super) fn delete_student(&mut self, student_id: i32) -> StoreResult<String> {
        self.db.immediate_transaction(|conn| {
            let student = students::table
                .find(student_id)
                .select(Student::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| RecordKind::Student.not_found(student_id))?;

            let owned = enrollments::table
                .filter(enrollments::student_id.eq(student_id))
                .select(enrollments::id);

            let records = diesel::delete(attendance::table)
                .filter(attendance::enrollment_id.eq_any(owned))
                .execute(conn)?;
            let sessions = diesel::delete(enrollments::table)
                .filter(enrollments::student_id.eq(student_id))
                .execute(conn)?;
            diesel::delete(students::table.find(student_id)).execute(conn)?;

            debug!(student_id, sessions, records, "removed enrollments with student");
            Ok(student.full_name)
        })
    }
}

fn clean_form(form: &StudentForm) -> StoreResult<StudentForm> {
    Ok(StudentForm {
        full_name: required("full name", &form.full_name)?,
        ..form.clone()
    })
}

/// Students may only be placed in active schools and given active diagnoses.
fn check_references(conn: &mut SqliteConnection, form: &StudentForm) -> StoreResult<()> {
    let school_active: Option<bool> = schools::table
        .find(form.school_id)
        .select(schools::active)
        .first(conn)
        .optional()?;

    match school_active {
        None => {
            return Err(StoreError::invalid(
                "school",
                format!("school {} does not exist", form.school_id),
            ));
        }
        Some(false) => {
            return Err(StoreError::invalid(
                "school",
                format!("school {} is archived", form.school_id),
            ));
        }
        Some(true) => {}
    }

    if let Some(diagnosis_id) = form.diagnosis_id {
        let diagnosis_active: Option<bool> = diagnoses::table
            .find(diagnosis_id)
            .select(diagnoses::active)
            .first(conn)
            .optional()?;

        match diagnosis_active {
            None => {
                return Err(StoreError::invalid(
                    "diagnosis",
                    format!("diagnosis {diagnosis_id} does not exist"),
                ));
            }
            Some(false) => {
                return Err(StoreError::invalid(
                    "diagnosis",
                    format!("diagnosis {diagnosis_id} is archived"),
                ));
            }
            Some(true) => {}
        }
    }

    Ok(())
}

/// Issues the next enrollment number. Numbers of deleted students are never handed out again.
fn next_enrollment_number(conn: &mut SqliteConnection) -> StoreResult<i32> {
    let highest: Option<i32> = students::table
        .select(max(students::enrollment_number))
        .first(conn)?;

    let issued: Option<i32> = counters::table
        .find(ENROLLMENT_NUMBER_COUNTER)
        .select(counters::value)
        .first(conn)
        .optional()?;

    let next = highest.max(issued).unwrap_or(0) + 1;

    diesel::replace_into(counters::table)
        .values((
            counters::name.eq(ENROLLMENT_NUMBER_COUNTER),
            counters::value.eq(next),
        ))
        .execute(conn)?;

    Ok(next)
}

/// Where a candidate enrollment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Kept,
    Edited(i32),
    Added,
}

/// An enrollment as it will exist once the submission is saved.
#[derive(Debug, Clone)]
struct Candidate {
    origin: Origin,
    therapy: Therapy,
    weekday: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    status: EnrollmentStatus,
}

impl Candidate {
    fn schedule_entry(&self) -> ScheduleEntry {
        ScheduleEntry::new(self.therapy.name.clone(), self.weekday, self.start, self.end)
    }
}

/// The validated outcome of a submission.
#[derive(Debug, Default)]
struct Plan {
    candidates: Vec<Candidate>,
    removals: Vec<i32>,
}

/// Resolves the drafts against the student's current enrollments and validates the result.
fn plan_enrollments(
    conn: &mut SqliteConnection,
    existing: &[Enrollment],
    drafts: &[EnrollmentDraft],
) -> StoreResult<Plan> {
    let mut edits: HashMap<i32, &EnrollmentDraft> = HashMap::new();
    let mut additions = Vec::new();

    for draft in drafts {
        match draft.id {
            Some(id) => {
                if !existing.iter().any(|enrollment| enrollment.id == id) {
                    return Err(StoreError::NotFound {
                        entity: "enrollment",
                        id,
                    });
                }
                edits.insert(id, draft);
            }
            // An unused blank row at the end of a form.
            None if draft.remove || draft.is_blank() => {}
            None => additions.push(draft),
        }
    }

    let mut plan = Plan::default();

    for enrollment in existing {
        match edits.get(&enrollment.id) {
            Some(draft) if draft.remove => plan.removals.push(enrollment.id),
            Some(draft) => {
                let candidate = resolve_draft(conn, draft, Some(enrollment.therapy_id))?;
                plan.candidates.push(Candidate {
                    origin: Origin::Edited(enrollment.id),
                    ..candidate
                });
            }
            None => plan.candidates.push(Candidate {
                origin: Origin::Kept,
                therapy: therapy_by_id(conn, enrollment.therapy_id)?,
                weekday: enrollment.weekday,
                start: enrollment.start_time,
                end: enrollment.end_time,
                status: enrollment.status,
            }),
        }
    }

    for draft in additions {
        plan.candidates.push(resolve_draft(conn, draft, None)?);
    }

    let mut therapies = HashSet::new();
    for candidate in &plan.candidates {
        if !therapies.insert(candidate.therapy.id) {
            return Err(StoreError::Uniqueness {
                entity: "enrollment",
                field: "therapy",
                value: candidate.therapy.name.clone(),
            });
        }
    }

    let schedule: Vec<ScheduleEntry> = plan.candidates.iter().map(Candidate::schedule_entry).collect();
    check_schedule(&schedule)?;

    Ok(plan)
}

/// Turns a filled-in draft into a candidate. `current_therapy` is the therapy the enrollment
/// already has, which stays allowed even after that therapy is archived.
fn resolve_draft(
    conn: &mut SqliteConnection,
    draft: &EnrollmentDraft,
    current_therapy: Option<i32>,
) -> StoreResult<Candidate> {
    let therapy_id = draft
        .therapy_id
        .ok_or_else(|| StoreError::invalid("therapy", "is required"))?;
    let weekday = draft
        .weekday
        .ok_or_else(|| StoreError::invalid("weekday", "is required"))?;
    let start = draft
        .start
        .ok_or_else(|| StoreError::invalid("start time", "is required"))?;
    let end = draft
        .end
        .ok_or_else(|| StoreError::invalid("end time", "is required"))?;

    if end < start {
        return Err(StoreError::invalid(
            "end time",
            format!(
                "{} is before the start time {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            ),
        ));
    }

    let therapy = therapy_by_id(conn, therapy_id).map_err(|err| match err {
        StoreError::NotFound { id, .. } => {
            StoreError::invalid("therapy", format!("therapy {id} does not exist"))
        }
        other => other,
    })?;

    if !therapy.active && current_therapy != Some(therapy.id) {
        return Err(StoreError::invalid(
            "therapy",
            format!("`{}` is archived", therapy.name),
        ));
    }

    Ok(Candidate {
        origin: Origin::Added,
        therapy,
        weekday,
        start,
        end,
        status: draft.status,
    })
}

fn apply_plan(
    conn: &mut SqliteConnection,
    student_id: i32,
    plan: Plan,
    today: NaiveDate,
) -> StoreResult<()> {
    if !plan.removals.is_empty() {
        diesel::delete(attendance::table)
            .filter(attendance::enrollment_id.eq_any(&plan.removals))
            .execute(conn)?;
        diesel::delete(enrollments::table)
            .filter(enrollments::id.eq_any(&plan.removals))
            .execute(conn)?;
    }

    for candidate in plan.candidates {
        let unique = on_unique_violation("enrollment", "therapy", &candidate.therapy.name);

        match candidate.origin {
            Origin::Kept => {}
            Origin::Edited(enrollment_id) => {
                diesel::update(enrollments::table.find(enrollment_id))
                    .set(&EnrollmentChanges {
                        therapy_id: candidate.therapy.id,
                        weekday: candidate.weekday,
                        start_time: candidate.start,
                        end_time: candidate.end,
                        status: candidate.status,
                    })
                    .execute(conn)
                    .map_err(unique)?;
            }
            Origin::Added => {
                diesel::insert_into(enrollments::table)
                    .values(&NewEnrollment {
                        student_id,
                        therapy_id: candidate.therapy.id,
                        weekday: candidate.weekday,
                        start_time: candidate.start,
                        end_time: candidate.end,
                        created_on: today,
                        status: candidate.status,
                    })
                    .execute(conn)
                    .map_err(unique)?;
            }
        }
    }

    Ok(())
}

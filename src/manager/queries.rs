use super::{RosterManager, contains_pattern};
use crate::error::StoreResult;
use crate::models::{Enrollment, Shift, Student, Therapy, Weekday};
use crate::schema::{diagnoses, enrollments, schools, students, therapies};
use diesel::prelude::*;

/// Narrows the weekly schedule overview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Part of the student's name, ignoring case.
    pub name: Option<String>,
    pub school_id: Option<i32>,
    pub weekday: Option<Weekday>,
    pub shift: Option<Shift>,
}

/// One weekly session in the schedule overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub enrollment: Enrollment,
    pub student: String,
    pub school: String,
    pub therapy: Therapy,
}

/// Narrows a student listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub archived: bool,
    pub name: Option<String>,
    pub school_id: Option<i32>,
    /// Only students enrolled in this therapy.
    pub therapy_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub student: Student,
    pub school: String,
    pub diagnosis: Option<String>,
}

impl RosterManager {
    /// Every enrollment of an active student, ordered by weekday and start time.
    pub fn dashboard(&mut self, filter: &DashboardFilter) -> StoreResult<Vec<ScheduleRow>> {
        let mut query = enrollments::table
            .inner_join(students::table.inner_join(schools::table))
            .inner_join(therapies::table)
            .filter(students::active.eq(true))
            .select((
                Enrollment::as_select(),
                students::full_name,
                schools::name,
                Therapy::as_select(),
            ))
            .into_boxed();

        if let Some(name) = filter.name.as_deref().filter(|name| !name.trim().is_empty()) {
            query = query.filter(students::full_name.like(contains_pattern(name)));
        }
        if let Some(school_id) = filter.school_id {
            query = query.filter(students::school_id.eq(school_id));
        }
        if let Some(weekday) = filter.weekday {
            query = query.filter(enrollments::weekday.eq(weekday));
        }

        let mut rows: Vec<ScheduleRow> = query
            .load::<(Enrollment, String, String, Therapy)>(&mut self.db)?
            .into_iter()
            .map(|(enrollment, student, school, therapy)| ScheduleRow {
                enrollment,
                student,
                school,
                therapy,
            })
            .collect();

        if let Some(shift) = filter.shift {
            rows.retain(|row| shift.contains(row.enrollment.start_time));
        }
        rows.sort_by_key(|row| (row.enrollment.weekday, row.enrollment.start_time));

        Ok(rows)
    }

    /// Lists students ordered by name. A student enrolled in the filtered therapy appears once.
    pub fn students(&mut self, filter: &StudentFilter) -> StoreResult<Vec<StudentRow>> {
        let mut query = students::table
            .inner_join(schools::table)
            .left_join(diagnoses::table)
            .filter(students::active.eq(!filter.archived))
            .order(students::full_name.asc())
            .select((
                Student::as_select(),
                schools::name,
                diagnoses::name.nullable(),
            ))
            .into_boxed();

        if let Some(name) = filter.name.as_deref().filter(|name| !name.trim().is_empty()) {
            query = query.filter(students::full_name.like(contains_pattern(name)));
        }
        if let Some(school_id) = filter.school_id {
            query = query.filter(students::school_id.eq(school_id));
        }
        if let Some(therapy_id) = filter.therapy_id {
            let enrolled = enrollments::table
                .filter(enrollments::therapy_id.eq(therapy_id))
                .select(enrollments::student_id);
            query = query.filter(students::id.eq_any(enrolled));
        }

        Ok(query
            .load::<(Student, String, Option<String>)>(&mut self.db)?
            .into_iter()
            .map(|(student, school, diagnosis)| StudentRow {
                student,
                school,
                diagnosis,
            })
            .collect())
    }
}

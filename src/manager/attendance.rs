//! Daily attendance: the roll call for a date and the records taken from it.

use super::{RecordKind, RosterManager};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AttendanceRecord, AttendanceStatus, Enrollment, EnrollmentStatus, NewAttendance, Shift,
    StudentAttendance, Therapy, Weekday,
};
use crate::schema::{attendance, enrollments, students, therapies};
use chrono::{NaiveDate, NaiveTime};
use diesel::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Selects the sessions that make up a roll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollCallQuery {
    pub date: NaiveDate,
    pub therapy_id: Option<i32>,
    pub shift: Option<Shift>,
}

impl RollCallQuery {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            therapy_id: None,
            shift: None,
        }
    }
}

/// One session due on the roll call date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollCallEntry {
    pub enrollment_id: i32,
    pub student: String,
    pub therapy: Therapy,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// What has already been recorded for this session on the date, if anything.
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollCall {
    pub date: NaiveDate,
    /// `None` on weekends, when nothing is scheduled.
    pub weekday: Option<Weekday>,
    /// Set for every date other than today. A locked roll call is read-only unless backfilling.
    pub locked: bool,
    pub entries: Vec<RollCallEntry>,
}

impl RosterManager {
    /// Records the attendance of one session on one date, replacing any earlier record for the
    /// same session and date.
    pub fn record_attendance(
        &mut self,
        enrollment_id: i32,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> StoreResult<AttendanceRecord> {
        let exists: i64 = enrollments::table
            .find(enrollment_id)
            .count()
            .get_result(&mut self.db)?;
        if exists == 0 {
            return Err(StoreError::NotFound {
                entity: "enrollment",
                id: enrollment_id,
            });
        }

        upsert_attendance(&mut self.db, enrollment_id, date, status)?;

        let record = attendance::table
            .filter(attendance::enrollment_id.eq(enrollment_id))
            .filter(attendance::date.eq(date))
            .select(AttendanceRecord::as_select())
            .first(&mut self.db)?;

        info!(enrollment_id, %date, %status, "recorded attendance");
        Ok(record)
    }

    /// Lists the active sessions of active students that fall on `query.date`, ordered by start
    /// time and then student name.
    pub fn roll_call(&mut self, query: &RollCallQuery, today: NaiveDate) -> StoreResult<RollCall> {
        let weekday = Weekday::of(query.date);

        let entries = match weekday {
            Some(weekday) => roll_call_entries(&mut self.db, query, weekday)?,
            None => Vec::new(),
        };

        Ok(RollCall {
            date: query.date,
            weekday,
            locked: query.date != today,
            entries,
        })
    }

    /// Saves a roll call. Marks for sessions that are not part of the roll call are skipped.
    ///
    /// Returns the number of records saved. Roll calls for any day but `today` are refused unless
    /// `backfill` is set.
    pub fn record_roll_call(
        &mut self,
        query: &RollCallQuery,
        marks: &[(i32, AttendanceStatus)],
        today: NaiveDate,
        backfill: bool,
    ) -> StoreResult<usize> {
        let roll_call = self.roll_call(query, today)?;

        if roll_call.locked && !backfill {
            return Err(StoreError::invalid(
                "date",
                format!(
                    "the roll call for {} is locked, only {today} can be recorded",
                    query.date
                ),
            ));
        }

        let due: HashSet<i32> = roll_call
            .entries
            .iter()
            .map(|entry| entry.enrollment_id)
            .collect();
        let date = query.date;

        let saved = self.db.immediate_transaction(|conn| {
            let mut saved = 0;

            for &(enrollment_id, status) in marks {
                if !due.contains(&enrollment_id) {
                    warn!(enrollment_id, %date, "skipping mark for a session not due on this date");
                    continue;
                }

                upsert_attendance(conn, enrollment_id, date, status)?;
                saved += 1;
            }

            Ok::<_, StoreError>(saved)
        })?;

        info!(%date, saved, "saved roll call");
        Ok(saved)
    }

    /// Retrieves a student's attendance over every recorded date.
    pub fn student_attendance(&mut self, student_id: i32) -> StoreResult<StudentAttendance> {
        let exists: i64 = students::table
            .find(student_id)
            .count()
            .get_result(&mut self.db)?;
        if exists == 0 {
            return Err(RecordKind::Student.not_found(student_id));
        }

        // Join attendance with enrollments to find every record belonging to the student.
        let records = attendance::table
            .inner_join(enrollments::table)
            .filter(enrollments::student_id.eq(student_id))
            .order(attendance::date.asc())
            .select((attendance::date, attendance::status))
            .load::<(NaiveDate, AttendanceStatus)>(&mut self.db)?;

        let mut summary = StudentAttendance::default();

        for (date, status) in records {
            match status {
                AttendanceStatus::Present => summary.present.push(date),
                AttendanceStatus::ExcusedAbsent => summary.excused.push(date),
                AttendanceStatus::Absent => summary.absent.push(date),
            }
        }

        Ok(summary)
    }
}

/// Inserts the record, or updates the status if one already exists for the session and date.
fn upsert_attendance(
    conn: &mut SqliteConnection,
    enrollment_id: i32,
    date: NaiveDate,
    status: AttendanceStatus,
) -> QueryResult<usize> {
    diesel::insert_into(attendance::table)
        .values(&NewAttendance {
            enrollment_id,
            date,
            status,
        })
        .on_conflict((attendance::enrollment_id, attendance::date))
        .do_update()
        .set(attendance::status.eq(status))
        .execute(conn)
}

fn roll_call_entries(
    conn: &mut SqliteConnection,
    query: &RollCallQuery,
    weekday: Weekday,
) -> QueryResult<Vec<RollCallEntry>> {
    let mut sessions = enrollments::table
        .inner_join(students::table)
        .inner_join(therapies::table)
        .filter(students::active.eq(true))
        .filter(enrollments::status.eq(EnrollmentStatus::Active))
        .filter(enrollments::weekday.eq(weekday))
        .select((
            Enrollment::as_select(),
            students::full_name,
            Therapy::as_select(),
        ))
        .into_boxed();

    if let Some(therapy_id) = query.therapy_id {
        sessions = sessions.filter(enrollments::therapy_id.eq(therapy_id));
    }

    let mut rows: Vec<(Enrollment, String, Therapy)> = sessions.load(conn)?;

    if let Some(shift) = query.shift {
        rows.retain(|(enrollment, _, _)| shift.contains(enrollment.start_time));
    }
    rows.sort_by(|(a, a_name, _), (b, b_name, _)| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a_name.cmp(b_name))
    });

    let ids: Vec<i32> = rows.iter().map(|(enrollment, _, _)| enrollment.id).collect();
    let recorded: HashMap<i32, AttendanceStatus> = attendance::table
        .filter(attendance::date.eq(query.date))
        .filter(attendance::enrollment_id.eq_any(&ids))
        .select((attendance::enrollment_id, attendance::status))
        .load::<(i32, AttendanceStatus)>(conn)?
        .into_iter()
        .collect();

    Ok(rows
        .into_iter()
        .map(|(enrollment, student, therapy)| RollCallEntry {
            enrollment_id: enrollment.id,
            student,
            therapy,
            start: enrollment.start_time,
            end: enrollment.end_time,
            status: recorded.get(&enrollment.id).copied(),
        })
        .collect())
}

use crate::schema::{attendance, diagnoses, enrollments, schools, students, therapies};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use std::fmt;
use std::str::FromStr;

/// Declares a fieldless enum that is stored in a `Text` column as a short code and shown to people
/// with a label.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            diesel::AsExpression,
            diesel::FromSqlRow,
            clap::ValueEnum,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The code written to the database.
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            /// Accepts the stored code, the label, or the command-line name, ignoring case.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code().eq_ignore_ascii_case(s) || v.label().eq_ignore_ascii_case(s))
                    .or_else(|| <Self as clap::ValueEnum>::from_str(s, true).ok())
                    .ok_or_else(|| format!("unknown {} `{s}`", stringify!($name)))
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.code());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let code = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
                Self::from_code(&code)
                    .ok_or_else(|| format!("unknown {} code `{code}`", stringify!($name)).into())
            }
        }
    };
}

text_enum! {
    /// A school day on which a weekly session can be scheduled.
    pub enum Weekday {
        Monday => ("MON", "Monday"),
        Tuesday => ("TUE", "Tuesday"),
        Wednesday => ("WED", "Wednesday"),
        Thursday => ("THU", "Thursday"),
        Friday => ("FRI", "Friday"),
    }
}

impl Weekday {
    /// The scheduling weekday of a calendar date, or `None` on weekends.
    pub fn of(date: NaiveDate) -> Option<Self> {
        match date.weekday() {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

text_enum! {
    pub enum GradeLevel {
        NurseryI => ("NURSERY_I", "Nursery I"),
        NurseryII => ("NURSERY_II", "Nursery II"),
        ToddlerI => ("TODDLER_I", "Toddler I"),
        ToddlerII => ("TODDLER_II", "Toddler II"),
        PreKI => ("PRE_I", "Pre-K I"),
        PreKII => ("PRE_II", "Pre-K II"),
        FirstGrade => ("1ST", "1st grade"),
        SecondGrade => ("2ND", "2nd grade"),
        ThirdGrade => ("3RD", "3rd grade"),
        FourthGrade => ("4TH", "4th grade"),
        FifthGrade => ("5TH", "5th grade"),
        Undefined => ("ND", "Undefined"),
    }
}

impl Default for GradeLevel {
    fn default() -> Self {
        GradeLevel::Undefined
    }
}

text_enum! {
    pub enum EnrollmentStatus {
        Active => ("ACTIVE", "Active"),
        Inactive => ("INACTIVE", "Inactive"),
        Waitlisted => ("WAITLIST", "Waitlisted"),
        Completed => ("DONE", "Completed"),
    }
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        EnrollmentStatus::Active
    }
}

text_enum! {
    /// The attendance outcome of one session on one date.
    pub enum AttendanceStatus {
        Present => ("P", "Present"),
        Absent => ("A", "Absent"),
        ExcusedAbsent => ("EA", "Excused absence"),
    }
}

text_enum! {
    /// The badge color a therapy is tagged with in listings.
    pub enum BadgeColor {
        Primary => ("primary", "Blue"),
        Success => ("success", "Green"),
        Warning => ("warning", "Yellow"),
        Danger => ("danger", "Red"),
        Info => ("info", "Cyan"),
        Secondary => ("secondary", "Grey"),
        Dark => ("dark", "Black"),
    }
}

impl Default for BadgeColor {
    fn default() -> Self {
        BadgeColor::Primary
    }
}

/// Half of the school day a session starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    /// Returns whether a session starting at `start` belongs to this shift. Morning sessions start
    /// before noon.
    pub fn contains(self, start: NaiveTime) -> bool {
        match self {
            Shift::Morning => start.hour() < 12,
            Shift::Afternoon => start.hour() >= 12,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = schools)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct School {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schools)]
pub struct SchoolForm {
    pub name: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = diagnoses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Diagnosis {
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub active: bool,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = diagnoses, treat_none_as_null = true)]
pub struct DiagnosisForm {
    pub name: String,
    pub code: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = therapies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Therapy {
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub color: BadgeColor,
    pub active: bool,
}

impl Therapy {
    /// The short code if one is set, the full name otherwise.
    pub fn short_name(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = therapies, treat_none_as_null = true)]
pub struct TherapyForm {
    pub name: String,
    pub code: Option<String>,
    pub color: BadgeColor,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: i32,
    pub full_name: String,
    pub school_id: i32,
    pub grade: GradeLevel,
    pub transport: bool,
    pub active: bool,
    pub diagnosis_id: Option<i32>,
    /// Assigned on creation and never changed afterwards.
    pub enrollment_number: i32,
}

/// The editable fields of a [`Student`].
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = students, treat_none_as_null = true)]
pub struct StudentForm {
    pub full_name: String,
    pub school_id: i32,
    pub grade: GradeLevel,
    pub transport: bool,
    pub diagnosis_id: Option<i32>,
}

impl From<&Student> for StudentForm {
    fn from(student: &Student) -> Self {
        Self {
            full_name: student.full_name.clone(),
            school_id: student.school_id,
            grade: student.grade,
            transport: student.transport,
            diagnosis_id: student.diagnosis_id,
        }
    }
}

/// A weekly session of one student in one therapy.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Enrollment {
    pub id: i32,
    pub student_id: i32,
    pub therapy_id: i32,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_on: NaiveDate,
    pub status: EnrollmentStatus,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = enrollments)]
pub struct NewEnrollment {
    pub student_id: i32,
    pub therapy_id: i32,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_on: NaiveDate,
    pub status: EnrollmentStatus,
}

/// Everything about an [`Enrollment`] that can change after it is created.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = enrollments)]
pub struct EnrollmentChanges {
    pub therapy_id: i32,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: EnrollmentStatus,
}

/// One row of a submitted enrollment set.
///
/// A draft with an `id` edits (or, with `remove`, deletes) that existing enrollment. A draft
/// without one adds a new enrollment, unless it is entirely blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentDraft {
    pub id: Option<i32>,
    pub therapy_id: Option<i32>,
    pub weekday: Option<Weekday>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub status: EnrollmentStatus,
    pub remove: bool,
}

impl EnrollmentDraft {
    /// A new active enrollment with every field filled in.
    pub fn new(therapy_id: i32, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            therapy_id: Some(therapy_id),
            weekday: Some(weekday),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Marks the existing enrollment `id` for deletion.
    pub fn removal(id: i32) -> Self {
        Self {
            id: Some(id),
            remove: true,
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.therapy_id.is_none()
            && self.weekday.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = attendance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttendanceRecord {
    pub id: i32,
    pub enrollment_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = attendance)]
pub struct NewAttendance {
    pub enrollment_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// A student's recorded sessions, split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentAttendance {
    pub present: Vec<NaiveDate>,
    pub excused: Vec<NaiveDate>,
    pub absent: Vec<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_code() {
        for weekday in Weekday::ALL {
            assert_eq!(Weekday::from_code(weekday.code()), Some(*weekday));
        }
        for grade in GradeLevel::ALL {
            assert_eq!(GradeLevel::from_code(grade.code()), Some(*grade));
        }
        assert_eq!(AttendanceStatus::from_code("X"), None);
    }

    #[test]
    fn from_str_accepts_code_label_and_cli_name() {
        assert_eq!("mon".parse::<Weekday>(), Ok(Weekday::Monday));
        assert_eq!("Friday".parse::<Weekday>(), Ok(Weekday::Friday));
        assert_eq!("excused-absent".parse::<AttendanceStatus>(), Ok(AttendanceStatus::ExcusedAbsent));
        assert_eq!("1st grade".parse::<GradeLevel>(), Ok(GradeLevel::FirstGrade));
        assert!("saturday".parse::<Weekday>().is_err());
    }

    #[test]
    fn weekends_have_no_scheduling_weekday() {
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();

        assert_eq!(Weekday::of(saturday), None);
        assert_eq!(Weekday::of(saturday.succ_opt().unwrap()), None);
        assert_eq!(Weekday::of(monday), Some(Weekday::Monday));
    }

    #[test]
    fn noon_starts_the_afternoon() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let before = NaiveTime::from_hms_opt(11, 59, 0).unwrap();

        assert!(Shift::Afternoon.contains(noon));
        assert!(!Shift::Morning.contains(noon));
        assert!(Shift::Morning.contains(before));
    }
}

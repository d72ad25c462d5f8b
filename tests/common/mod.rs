#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use therapy_roster::RosterManager;
use therapy_roster::models::{
    BadgeColor, EnrollmentDraft, GradeLevel, School, SchoolForm, Student, StudentForm, Therapy,
    TherapyForm, Weekday,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// A Monday.
pub fn monday() -> NaiveDate {
    date(2025, 3, 17)
}

pub fn session(therapy: &Therapy, weekday: Weekday, start: (u32, u32), end: (u32, u32)) -> EnrollmentDraft {
    EnrollmentDraft::new(therapy.id, weekday, time(start.0, start.1), time(end.0, end.1))
}

pub fn student_form(full_name: &str, school: &School) -> StudentForm {
    StudentForm {
        full_name: full_name.to_string(),
        school_id: school.id,
        grade: GradeLevel::FirstGrade,
        transport: false,
        diagnosis_id: None,
    }
}

/// A fresh in-memory roster with one school and three therapies.
pub struct Fixture {
    pub manager: RosterManager,
    pub school: School,
    pub speech: Therapy,
    pub music: Therapy,
    pub riding: Therapy,
}

impl Fixture {
    pub fn new() -> Self {
        let mut manager = RosterManager::in_memory().expect("open in-memory roster");

        let school = manager
            .create_school(&SchoolForm {
                name: "North Elementary".to_string(),
            })
            .expect("create school");

        let mut therapy = |name: &str, code: &str, color| {
            manager
                .create_therapy(&TherapyForm {
                    name: name.to_string(),
                    code: Some(code.to_string()),
                    color,
                })
                .expect("create therapy")
        };
        let speech = therapy("Speech therapy", "Speech", BadgeColor::Primary);
        let music = therapy("Music therapy", "Music", BadgeColor::Success);
        let riding = therapy("Equine therapy", "Equine", BadgeColor::Warning);

        Self {
            manager,
            school,
            speech,
            music,
            riding,
        }
    }

    pub fn add_student(&mut self, full_name: &str, sessions: &[EnrollmentDraft]) -> Student {
        let form = student_form(full_name, &self.school);
        self.manager
            .create_student(&form, sessions, monday())
            .expect("create student")
    }
}

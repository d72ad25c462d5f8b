mod common;

use assert_matches::assert_matches;
use common::{Fixture, date, monday, session};
use therapy_roster::StoreError;
use therapy_roster::manager::{RecordKind, RollCallQuery};
use therapy_roster::models::{AttendanceStatus, EnrollmentDraft, EnrollmentStatus, Shift, Weekday};

/// Ana and Bruno both start at 08:00 on Monday, Eva in the afternoon. Carla is waitlisted and
/// Davi is archived, so neither is due.
struct Week {
    fixture: Fixture,
    ana: i32,
    ana_speech: i32,
    ana_music: i32,
    bruno_riding: i32,
    eva_music: i32,
}

fn enrollment_of(fixture: &mut Fixture, student_id: i32, therapy_id: i32) -> i32 {
    fixture
        .manager
        .student_enrollments(student_id)
        .unwrap()
        .into_iter()
        .find(|(_, therapy)| therapy.id == therapy_id)
        .map(|(enrollment, _)| enrollment.id)
        .unwrap()
}

fn week() -> Week {
    let mut fixture = Fixture::new();
    let (speech, music, riding) = (
        fixture.speech.clone(),
        fixture.music.clone(),
        fixture.riding.clone(),
    );

    let eva = fixture.add_student(
        "Eva Prado",
        &[session(&music, Weekday::Monday, (14, 0), (15, 0))],
    );
    let bruno = fixture.add_student(
        "Bruno Lima",
        &[session(&riding, Weekday::Monday, (8, 0), (9, 0))],
    );
    let ana = fixture.add_student(
        "Ana Souza",
        &[
            session(&speech, Weekday::Monday, (8, 0), (9, 0)),
            session(&music, Weekday::Tuesday, (10, 0), (11, 0)),
        ],
    );
    fixture.add_student(
        "Carla Dias",
        &[EnrollmentDraft {
            status: EnrollmentStatus::Waitlisted,
            ..session(&speech, Weekday::Monday, (7, 30), (8, 0))
        }],
    );
    let davi = fixture.add_student(
        "Davi Rocha",
        &[session(&music, Weekday::Monday, (13, 0), (14, 0))],
    );
    fixture.manager.archive(RecordKind::Student, davi.id).unwrap();

    Week {
        ana: ana.id,
        ana_speech: enrollment_of(&mut fixture, ana.id, speech.id),
        ana_music: enrollment_of(&mut fixture, ana.id, music.id),
        bruno_riding: enrollment_of(&mut fixture, bruno.id, riding.id),
        eva_music: enrollment_of(&mut fixture, eva.id, music.id),
        fixture,
    }
}

fn due(week: &mut Week, query: &RollCallQuery) -> Vec<(String, i32)> {
    week.fixture
        .manager
        .roll_call(query, monday())
        .unwrap()
        .entries
        .into_iter()
        .map(|entry| (entry.student, entry.enrollment_id))
        .collect()
}

#[test]
fn roll_call_lists_active_sessions_by_time_then_name() {
    let mut week = week();

    let roll_call = week
        .fixture
        .manager
        .roll_call(&RollCallQuery::on(monday()), monday())
        .unwrap();

    assert_eq!(roll_call.weekday, Some(Weekday::Monday));
    assert!(!roll_call.locked);
    let students: Vec<&str> = roll_call
        .entries
        .iter()
        .map(|entry| entry.student.as_str())
        .collect();
    assert_eq!(students, ["Ana Souza", "Bruno Lima", "Eva Prado"]);
    assert!(roll_call.entries.iter().all(|entry| entry.status.is_none()));
}

#[test]
fn roll_call_can_be_narrowed() {
    let mut week = week();
    let riding = week.fixture.riding.id;

    let afternoon = due(
        &mut week,
        &RollCallQuery {
            shift: Some(Shift::Afternoon),
            ..RollCallQuery::on(monday())
        },
    );
    let ridden = due(
        &mut week,
        &RollCallQuery {
            therapy_id: Some(riding),
            ..RollCallQuery::on(monday())
        },
    );

    assert_eq!(afternoon, [("Eva Prado".to_string(), week.eva_music)]);
    assert_eq!(ridden, [("Bruno Lima".to_string(), week.bruno_riding)]);
}

#[test]
fn weekends_have_no_roll_call() {
    let mut week = week();
    let saturday = date(2025, 3, 15);

    let roll_call = week
        .fixture
        .manager
        .roll_call(&RollCallQuery::on(saturday), saturday)
        .unwrap();

    assert_eq!(roll_call.weekday, None);
    assert!(roll_call.entries.is_empty());
}

#[test]
fn recording_twice_keeps_the_last_status() {
    let mut week = week();
    let manager = &mut week.fixture.manager;

    manager
        .record_attendance(week.ana_speech, monday(), AttendanceStatus::Absent)
        .unwrap();
    let record = manager
        .record_attendance(week.ana_speech, monday(), AttendanceStatus::Present)
        .unwrap();

    assert_eq!(record.status, AttendanceStatus::Present);
    let summary = manager.student_attendance(week.ana).unwrap();
    assert_eq!(summary.present, [monday()]);
    assert!(summary.absent.is_empty());

    let roll_call = manager.roll_call(&RollCallQuery::on(monday()), monday()).unwrap();
    assert_eq!(roll_call.entries[0].enrollment_id, week.ana_speech);
    assert_eq!(roll_call.entries[0].status, Some(AttendanceStatus::Present));
}

#[test]
fn recording_for_a_missing_session_is_not_found() {
    let mut week = week();

    let err = week
        .fixture
        .manager
        .record_attendance(404, monday(), AttendanceStatus::Present)
        .unwrap_err();

    assert_matches!(err, StoreError::NotFound { entity: "enrollment", id: 404 });
}

#[test]
fn roll_call_skips_marks_for_sessions_not_due() {
    let mut week = week();
    let marks = [
        (week.ana_speech, AttendanceStatus::Present),
        (week.bruno_riding, AttendanceStatus::ExcusedAbsent),
        // Tuesday session.
        (week.ana_music, AttendanceStatus::Absent),
    ];

    let saved = week
        .fixture
        .manager
        .record_roll_call(&RollCallQuery::on(monday()), &marks, monday(), false)
        .unwrap();

    assert_eq!(saved, 2);
    let summary = week.fixture.manager.student_attendance(week.ana).unwrap();
    assert_eq!(summary.present, [monday()]);
    assert!(summary.absent.is_empty());
}

#[test]
fn other_days_are_locked_unless_backfilling() {
    let mut week = week();
    let last_monday = date(2025, 3, 10);
    let query = RollCallQuery::on(last_monday);
    let marks = [(week.ana_speech, AttendanceStatus::Absent)];

    assert!(week.fixture.manager.roll_call(&query, monday()).unwrap().locked);

    let err = week
        .fixture
        .manager
        .record_roll_call(&query, &marks, monday(), false)
        .unwrap_err();
    assert_matches!(err, StoreError::Invalid { field: "date", .. });
    assert!(
        week.fixture
            .manager
            .student_attendance(week.ana)
            .unwrap()
            .absent
            .is_empty()
    );

    let saved = week
        .fixture
        .manager
        .record_roll_call(&query, &marks, monday(), true)
        .unwrap();
    assert_eq!(saved, 1);
    assert_eq!(
        week.fixture.manager.student_attendance(week.ana).unwrap().absent,
        [last_monday]
    );
}

#[test]
fn student_attendance_is_grouped_by_outcome() {
    let mut week = week();
    let tuesday = date(2025, 3, 18);
    let next_monday = date(2025, 3, 24);
    let manager = &mut week.fixture.manager;

    manager
        .record_attendance(week.ana_speech, next_monday, AttendanceStatus::ExcusedAbsent)
        .unwrap();
    manager
        .record_attendance(week.ana_music, tuesday, AttendanceStatus::Absent)
        .unwrap();
    manager
        .record_attendance(week.ana_speech, monday(), AttendanceStatus::Present)
        .unwrap();
    manager
        .record_attendance(week.bruno_riding, monday(), AttendanceStatus::Absent)
        .unwrap();

    let summary = manager.student_attendance(week.ana).unwrap();

    assert_eq!(summary.present, [monday()]);
    assert_eq!(summary.absent, [tuesday]);
    assert_eq!(summary.excused, [next_monday]);
}

#[test]
fn attendance_of_a_missing_student_is_not_found() {
    let mut week = week();

    let err = week.fixture.manager.student_attendance(500).unwrap_err();

    assert_matches!(err, StoreError::NotFound { entity: "student", id: 500 });
}

mod common;

use common::{Fixture, monday};
use therapy_roster::manager::StudentFilter;
use therapy_roster::models::{DiagnosisForm, GradeLevel};
use therapy_roster::roster::{import_roster, parse_roster};

#[test]
fn imports_rows_in_order() {
    let mut fixture = Fixture::new();
    let autism = fixture
        .manager
        .create_diagnosis(&DiagnosisForm {
            name: "Autism spectrum disorder".to_string(),
            code: Some("ASD".to_string()),
        })
        .unwrap();
    let rows = parse_roster(
        "full_name,school,grade,transport,diagnosis\n\
         Ana Souza,North Elementary,2nd grade,true,ASD\n\
         Bruno Lima,North Elementary,,,\n"
            .as_bytes(),
    )
    .unwrap();

    let created = import_roster(&mut fixture.manager, &rows, monday()).unwrap();

    assert_eq!(created.len(), 2);
    assert_eq!(created[0].enrollment_number, 1);
    assert_eq!(created[0].grade, GradeLevel::SecondGrade);
    assert!(created[0].transport);
    assert_eq!(created[0].diagnosis_id, Some(autism.id));
    assert_eq!(created[1].grade, GradeLevel::Undefined);
    assert_eq!(created[1].diagnosis_id, None);
}

#[test]
fn stops_at_the_first_bad_row() {
    let mut fixture = Fixture::new();
    let rows = parse_roster(
        "full_name,school,grade,transport,diagnosis\n\
         Ana Souza,North Elementary,,,\n\
         Bruno Lima,Atlantis,,,\n\
         Carla Dias,North Elementary,,,\n"
            .as_bytes(),
    )
    .unwrap();

    let err = import_roster(&mut fixture.manager, &rows, monday()).unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("roster row 3"), "{message}");
    assert!(message.contains("Atlantis"), "{message}");
    let names: Vec<String> = fixture
        .manager
        .students(&StudentFilter::default())
        .unwrap()
        .into_iter()
        .map(|row| row.student.full_name)
        .collect();
    assert_eq!(names, ["Ana Souza"]);
}

//! Table definitions for the roster database.
//!
//! The `table!` declarations below must stay in sync with [`CREATE_TABLES`], which is applied every
//! time a connection is opened.

/// DDL for every table, safe to run against an existing database.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS diagnoses (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    code TEXT,
    active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS therapies (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    code TEXT,
    color TEXT NOT NULL DEFAULT 'primary',
    active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    full_name TEXT NOT NULL,
    school_id INTEGER NOT NULL REFERENCES schools (id) ON DELETE RESTRICT,
    grade TEXT NOT NULL DEFAULT 'ND',
    transport BOOLEAN NOT NULL DEFAULT 0,
    active BOOLEAN NOT NULL DEFAULT 1,
    diagnosis_id INTEGER REFERENCES diagnoses (id) ON DELETE RESTRICT,
    enrollment_number INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS enrollments (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    student_id INTEGER NOT NULL REFERENCES students (id) ON DELETE CASCADE,
    therapy_id INTEGER NOT NULL REFERENCES therapies (id) ON DELETE RESTRICT,
    weekday TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    created_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    UNIQUE (student_id, therapy_id)
);

CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    enrollment_id INTEGER NOT NULL REFERENCES enrollments (id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    UNIQUE (enrollment_id, date)
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY NOT NULL,
    value INTEGER NOT NULL
);
"#;

diesel::table! {
    schools (id) {
        id -> Integer,
        name -> Text,
        active -> Bool,
    }
}

diesel::table! {
    diagnoses (id) {
        id -> Integer,
        name -> Text,
        code -> Nullable<Text>,
        active -> Bool,
    }
}

diesel::table! {
    therapies (id) {
        id -> Integer,
        name -> Text,
        code -> Nullable<Text>,
        color -> Text,
        active -> Bool,
    }
}

diesel::table! {
    students (id) {
        id -> Integer,
        full_name -> Text,
        school_id -> Integer,
        grade -> Text,
        transport -> Bool,
        active -> Bool,
        diagnosis_id -> Nullable<Integer>,
        enrollment_number -> Integer,
    }
}

diesel::table! {
    enrollments (id) {
        id -> Integer,
        student_id -> Integer,
        therapy_id -> Integer,
        weekday -> Text,
        start_time -> Time,
        end_time -> Time,
        created_on -> Date,
        status -> Text,
    }
}

diesel::table! {
    attendance (id) {
        id -> Integer,
        enrollment_id -> Integer,
        date -> Date,
        status -> Text,
    }
}

diesel::table! {
    counters (name) {
        name -> Text,
        value -> Integer,
    }
}

diesel::joinable!(students -> schools (school_id));
diesel::joinable!(students -> diagnoses (diagnosis_id));
diesel::joinable!(enrollments -> students (student_id));
diesel::joinable!(enrollments -> therapies (therapy_id));
diesel::joinable!(attendance -> enrollments (enrollment_id));

diesel::allow_tables_to_appear_in_same_query!(
    attendance,
    counters,
    diagnoses,
    enrollments,
    schools,
    students,
    therapies,
);

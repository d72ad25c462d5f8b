//! This module contains the command-line interface [`Cli`] parser for managing therapy enrollments
//! and attendance records, and [`execute`], which carries a parsed command out.

use crate::display;
use crate::manager::{
    DashboardFilter, NameFilter, RecordKind, RollCallQuery, RosterManager, StudentFilter,
};
use crate::models::{
    AttendanceStatus, BadgeColor, DiagnosisForm, EnrollmentDraft, EnrollmentStatus, GradeLevel,
    SchoolForm, Shift, StudentForm, TherapyForm, Weekday,
};
use crate::roster;
use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "therapy-roster", version)]
pub struct Cli {
    /// The different commands available for managing enrollments and attendance.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add, edit, or list schools.
    #[command(subcommand)]
    School(SchoolCommand),

    /// Add, edit, or list diagnoses.
    #[command(subcommand)]
    Diagnosis(DiagnosisCommand),

    /// Add, edit, or list therapies.
    #[command(subcommand)]
    Therapy(TherapyCommand),

    /// Add, edit, list, or show students and their weekly sessions.
    #[command(subcommand)]
    Student(StudentCommand),

    /// Archive a record. It stays stored and can be restored.
    Archive { kind: RecordKind, id: i32 },

    /// Restore an archived record.
    Restore { kind: RecordKind, id: i32 },

    /// Permanently delete a record.
    Delete {
        kind: RecordKind,
        id: i32,
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Show the weekly schedule of all active students.
    Dashboard(DashboardArgs),

    /// Show the sessions due on a date and their attendance.
    RollCall(RollCallArgs),

    /// Record attendance for sessions of a roll call.
    TakeRoll {
        #[command(flatten)]
        roll_call: RollCallArgs,

        /// Attendance to record, as `ENROLLMENT=STATUS`.
        #[arg(
            long = "mark",
            value_name = "ENROLLMENT=STATUS",
            value_parser = parse_mark,
            required = true
        )]
        marks: Vec<(i32, AttendanceStatus)>,

        /// Allow recording a roll call for a day other than today.
        #[arg(long)]
        backfill: bool,
    },

    /// Record the attendance of a single session.
    Mark {
        enrollment: i32,
        status: AttendanceStatus,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Create students from a CSV roster.
    ImportRoster { file_path: PathBuf },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// List archived records instead of active ones.
    #[arg(long)]
    pub archived: bool,

    /// Only list records whose name contains this text.
    #[arg(long)]
    pub name: Option<String>,
}

impl From<&ListArgs> for NameFilter {
    fn from(args: &ListArgs) -> Self {
        NameFilter {
            archived: args.archived,
            name: args.name.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SchoolCommand {
    Add { name: String },
    Edit { id: i32, name: String },
    List(ListArgs),
}

#[derive(Subcommand, Debug)]
pub enum DiagnosisCommand {
    Add {
        name: String,
        /// Short code, for example `ASD`.
        #[arg(long)]
        code: Option<String>,
    },
    Edit {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_code")]
        code: Option<String>,
        #[arg(long)]
        clear_code: bool,
    },
    List(ListArgs),
}

#[derive(Subcommand, Debug)]
pub enum TherapyCommand {
    Add {
        name: String,
        /// Short name shown in schedules.
        #[arg(long)]
        code: Option<String>,
        #[arg(long, value_enum, default_value_t = BadgeColor::Primary)]
        color: BadgeColor,
    },
    Edit {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_code")]
        code: Option<String>,
        #[arg(long)]
        clear_code: bool,
        #[arg(long, value_enum)]
        color: Option<BadgeColor>,
    },
    List(ListArgs),
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    /// Add a student, optionally with weekly sessions.
    Add {
        full_name: String,
        #[arg(long)]
        school: i32,
        #[arg(long, value_enum, default_value_t = GradeLevel::Undefined)]
        grade: GradeLevel,
        /// The student uses school transport.
        #[arg(long)]
        transport: bool,
        #[arg(long)]
        diagnosis: Option<i32>,
        /// A weekly session, as `THERAPY,DAY,START,END[,STATUS]`.
        #[arg(long = "enroll", value_name = "SESSION", value_parser = parse_session)]
        sessions: Vec<EnrollmentDraft>,
    },

    /// Change a student's details and sessions. Sessions that are not mentioned stay as they are.
    Edit {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        school: Option<i32>,
        #[arg(long, value_enum)]
        grade: Option<GradeLevel>,
        #[arg(long)]
        transport: Option<bool>,
        #[arg(long, conflicts_with = "no_diagnosis")]
        diagnosis: Option<i32>,
        #[arg(long)]
        no_diagnosis: bool,
        /// A new weekly session, as `THERAPY,DAY,START,END[,STATUS]`.
        #[arg(long = "enroll", value_name = "SESSION", value_parser = parse_session)]
        sessions: Vec<EnrollmentDraft>,
        /// Replace an existing session, as `ENROLLMENT=THERAPY,DAY,START,END[,STATUS]`.
        #[arg(long, value_name = "ENROLLMENT=SESSION", value_parser = parse_reschedule)]
        reschedule: Vec<EnrollmentDraft>,
        /// Remove an existing session.
        #[arg(long, value_name = "ENROLLMENT")]
        unenroll: Vec<i32>,
    },

    List {
        #[arg(long)]
        archived: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        school: Option<i32>,
        #[arg(long)]
        therapy: Option<i32>,
    },

    /// Show a student's details, sessions, and attendance totals.
    Show { id: i32 },
}

#[derive(Args, Debug, Default)]
pub struct DashboardArgs {
    /// Part of the student's name.
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub school: Option<i32>,
    #[arg(long, value_enum)]
    pub day: Option<Weekday>,
    #[arg(long, value_enum)]
    pub shift: Option<Shift>,
}

#[derive(Args, Debug, Default)]
pub struct RollCallArgs {
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub therapy: Option<i32>,
    #[arg(long, value_enum)]
    pub shift: Option<Shift>,
}

impl RollCallArgs {
    fn query(&self, today: NaiveDate) -> RollCallQuery {
        RollCallQuery {
            date: self.date.unwrap_or(today),
            therapy_id: self.therapy,
            shift: self.shift,
        }
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|err| format!("invalid {field} `{value}`: {err}"))
}

/// Parses `THERAPY,DAY,START,END[,STATUS]` into a new session.
pub fn parse_session(spec: &str) -> Result<EnrollmentDraft, String> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();

    let (therapy, day, start, end, status) = match parts.as_slice() {
        [therapy, day, start, end] => (therapy, day, start, end, None),
        [therapy, day, start, end, status] => (therapy, day, start, end, Some(status)),
        _ => return Err(format!("expected THERAPY,DAY,START,END[,STATUS], got `{spec}`")),
    };

    let therapy_id = therapy
        .parse::<i32>()
        .map_err(|err| format!("invalid therapy id `{therapy}`: {err}"))?;
    let weekday: Weekday = day.parse()?;
    let status: EnrollmentStatus = match status {
        Some(status) => status.parse()?,
        None => EnrollmentStatus::default(),
    };

    Ok(EnrollmentDraft {
        status,
        ..EnrollmentDraft::new(
            therapy_id,
            weekday,
            parse_time("start time", start)?,
            parse_time("end time", end)?,
        )
    })
}

/// Parses `ENROLLMENT=THERAPY,DAY,START,END[,STATUS]` into an edit of an existing session.
pub fn parse_reschedule(spec: &str) -> Result<EnrollmentDraft, String> {
    let (id, session) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected ENROLLMENT=SESSION, got `{spec}`"))?;

    let id = id
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("invalid enrollment id `{id}`: {err}"))?;

    Ok(EnrollmentDraft {
        id: Some(id),
        ..parse_session(session)?
    })
}

/// Parses `ENROLLMENT=STATUS`.
pub fn parse_mark(spec: &str) -> Result<(i32, AttendanceStatus), String> {
    let (id, status) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected ENROLLMENT=STATUS, got `{spec}`"))?;

    let id = id
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("invalid enrollment id `{id}`: {err}"))?;

    Ok((id, status.parse()?))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} y/[N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Carries out a parsed command. `today` decides the default date of attendance commands and the
/// creation date of new enrollments.
pub fn execute(command: Command, manager: &mut RosterManager, today: NaiveDate) -> Result<()> {
    match command {
        Command::School(command) => match command {
            SchoolCommand::Add { name } => {
                let school = manager.create_school(&SchoolForm { name })?;
                println!("Added school {} ({}).", school.name, school.id);
            }
            SchoolCommand::Edit { id, name } => {
                let school = manager.update_school(id, &SchoolForm { name })?;
                println!("Updated school {} ({}).", school.name, school.id);
            }
            SchoolCommand::List(args) => display::show_schools(manager, &(&args).into())?,
        },

        Command::Diagnosis(command) => match command {
            DiagnosisCommand::Add { name, code } => {
                let diagnosis = manager.create_diagnosis(&DiagnosisForm { name, code })?;
                println!("Added diagnosis {} ({}).", diagnosis.name, diagnosis.id);
            }
            DiagnosisCommand::Edit {
                id,
                name,
                code,
                clear_code,
            } => {
                let current = manager.diagnosis(id)?;
                let form = DiagnosisForm {
                    name: name.unwrap_or(current.name),
                    code: if clear_code { None } else { code.or(current.code) },
                };
                let diagnosis = manager.update_diagnosis(id, &form)?;
                println!("Updated diagnosis {} ({}).", diagnosis.name, diagnosis.id);
            }
            DiagnosisCommand::List(args) => display::show_diagnoses(manager, &(&args).into())?,
        },

        Command::Therapy(command) => match command {
            TherapyCommand::Add { name, code, color } => {
                let therapy = manager.create_therapy(&TherapyForm { name, code, color })?;
                println!("Added therapy {} ({}).", therapy.name, therapy.id);
            }
            TherapyCommand::Edit {
                id,
                name,
                code,
                clear_code,
                color,
            } => {
                let current = manager.therapy(id)?;
                let form = TherapyForm {
                    name: name.unwrap_or(current.name),
                    code: if clear_code { None } else { code.or(current.code) },
                    color: color.unwrap_or(current.color),
                };
                let therapy = manager.update_therapy(id, &form)?;
                println!("Updated therapy {} ({}).", therapy.name, therapy.id);
            }
            TherapyCommand::List(args) => display::show_therapies(manager, &(&args).into())?,
        },

        Command::Student(command) => execute_student(command, manager, today)?,

        Command::Archive { kind, id } => {
            manager.archive(kind, id)?;
            println!("Archived {} {id}.", kind.entity());
        }
        Command::Restore { kind, id } => {
            manager.restore(kind, id)?;
            println!("Restored {} {id}.", kind.entity());
        }
        Command::Delete { kind, id, yes } => {
            if !yes && !confirm(&format!("Permanently delete {} {id}?", kind.entity()))? {
                println!("Deletion canceled.");
                return Ok(());
            }
            let name = manager.delete_permanently(kind, id)?;
            println!("Deleted {} \"{name}\" permanently.", kind.entity());
        }

        Command::Dashboard(args) => {
            let filter = DashboardFilter {
                name: args.name,
                school_id: args.school,
                weekday: args.day,
                shift: args.shift,
            };
            display::show_dashboard(manager, &filter)?;
        }
        Command::RollCall(args) => display::show_roll_call(manager, &args.query(today), today)?,
        Command::TakeRoll {
            roll_call,
            marks,
            backfill,
        } => {
            let query = roll_call.query(today);
            let saved = manager.record_roll_call(&query, &marks, today, backfill)?;
            println!("Saved attendance for {saved} sessions on {}.", query.date);
        }
        Command::Mark {
            enrollment,
            status,
            date,
        } => {
            let record = manager.record_attendance(enrollment, date.unwrap_or(today), status)?;
            println!(
                "Marked enrollment {} as {} on {}.",
                record.enrollment_id, record.status, record.date
            );
        }

        Command::ImportRoster { file_path } => {
            let rows = roster::read_roster(&file_path)?;
            let created = roster::import_roster(manager, &rows, today)?;
            println!("Imported {} students from {}.", created.len(), file_path.display());
        }
    }

    Ok(())
}

fn execute_student(
    command: StudentCommand,
    manager: &mut RosterManager,
    today: NaiveDate,
) -> Result<()> {
    match command {
        StudentCommand::Add {
            full_name,
            school,
            grade,
            transport,
            diagnosis,
            sessions,
        } => {
            let form = StudentForm {
                full_name,
                school_id: school,
                grade,
                transport,
                diagnosis_id: diagnosis,
            };
            let student = manager.create_student(&form, &sessions, today)?;
            println!(
                "Added student {} with number {} ({}).",
                student.full_name, student.enrollment_number, student.id
            );
        }
        StudentCommand::Edit {
            id,
            name,
            school,
            grade,
            transport,
            diagnosis,
            no_diagnosis,
            sessions,
            reschedule,
            unenroll,
        } => {
            if name.is_none()
                && school.is_none()
                && grade.is_none()
                && transport.is_none()
                && diagnosis.is_none()
                && !no_diagnosis
                && sessions.is_empty()
                && reschedule.is_empty()
                && unenroll.is_empty()
            {
                bail!("nothing to change for student {id}");
            }

            let current = manager.student(id)?;
            let mut form = StudentForm::from(&current);
            if let Some(name) = name {
                form.full_name = name;
            }
            if let Some(school) = school {
                form.school_id = school;
            }
            if let Some(grade) = grade {
                form.grade = grade;
            }
            if let Some(transport) = transport {
                form.transport = transport;
            }
            if no_diagnosis {
                form.diagnosis_id = None;
            } else if diagnosis.is_some() {
                form.diagnosis_id = diagnosis;
            }

            let drafts: Vec<EnrollmentDraft> = reschedule
                .into_iter()
                .chain(unenroll.into_iter().map(EnrollmentDraft::removal))
                .chain(sessions)
                .collect();

            let student = manager.update_student(id, &form, &drafts, today)?;
            println!("Updated student {} ({}).", student.full_name, student.id);
        }
        StudentCommand::List {
            archived,
            name,
            school,
            therapy,
        } => {
            let filter = StudentFilter {
                archived,
                name,
                school_id: school,
                therapy_id: therapy,
            };
            display::show_students(manager, &filter)?;
        }
        StudentCommand::Show { id } => display::show_student_info(manager, id)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_with_and_without_status() {
        let draft = parse_session("3, tue, 08:00, 09:30").unwrap();
        assert_eq!(draft.therapy_id, Some(3));
        assert_eq!(draft.weekday, Some(Weekday::Tuesday));
        assert_eq!(draft.start, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(draft.end, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(draft.status, EnrollmentStatus::Active);
        assert_eq!(draft.id, None);

        let waitlisted = parse_session("3,friday,14:00,15:00,waitlisted").unwrap();
        assert_eq!(waitlisted.status, EnrollmentStatus::Waitlisted);
    }

    #[test]
    fn rejects_malformed_sessions() {
        assert!(parse_session("3,mon,08:00").is_err());
        assert!(parse_session("x,mon,08:00,09:00").is_err());
        assert!(parse_session("3,sat,08:00,09:00").is_err());
        assert!(parse_session("3,mon,8am,09:00").is_err());
    }

    #[test]
    fn reschedule_targets_existing_enrollment() {
        let draft = parse_reschedule("12=4,wed,10:00,11:00").unwrap();
        assert_eq!(draft.id, Some(12));
        assert_eq!(draft.therapy_id, Some(4));
        assert!(!draft.remove);
    }

    #[test]
    fn parses_marks() {
        assert_eq!(parse_mark("7=absent"), Ok((7, AttendanceStatus::Absent)));
        assert_eq!(parse_mark("7=EA"), Ok((7, AttendanceStatus::ExcusedAbsent)));
        assert!(parse_mark("7").is_err());
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "therapy-roster",
            "student",
            "add",
            "Ana Souza",
            "--school",
            "1",
            "--enroll",
            "2,mon,08:00,09:00",
            "--enroll",
            "3,mon,09:00,10:00",
        ])
        .unwrap();

        match cli.command {
            Command::Student(StudentCommand::Add { sessions, school, .. }) => {
                assert_eq!(school, 1);
                assert_eq!(sessions.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
